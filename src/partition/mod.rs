//! Partition lifecycle
//!
//! The on-disk layout is a two-level `year/month` tree of Parquet files
//! named `<type>_<from_day>_<to_day>.parquet`. This module owns the naming
//! contract, the placement decision for incoming batches (including the
//! overflow close-and-split under the size-based policy), and the discovery
//! of partitions relevant to a query.

mod discover;
mod locator;
mod types;

pub use discover::{discover, discover_all};
pub use locator::{CloseOut, PartitionLocator, Placement};
pub use types::{
    last_day_of_month, sanitize_type_tag, DayRange, PartitionKey, PartitionName, DEFAULT_TYPE_TAG,
    PARTITION_EXT,
};

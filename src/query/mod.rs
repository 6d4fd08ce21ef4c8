//! Query engine
//!
//! DuckDB-backed analytical queries over the current set of partition
//! files. The dataset view is recomputed from a full discovery pass every
//! time it is needed; an empty store is a "no data" outcome, not an error.

mod engine;

pub use engine::{QueryEngine, QueryOutcome, Statistics};

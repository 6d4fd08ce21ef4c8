//! Record batch handling
//!
//! Turns semi-structured JSON records into rectangular Arrow batches and
//! reconciles schema drift between batches before they are merged.
//!
//! # Overview
//!
//! This module provides:
//! - Flattening of nested JSON objects into dotted columns
//! - Arrow schema inference and JSON to RecordBatch conversion
//! - Schema unification (typed-null widening) across divergent batches

mod normalize;
mod unify;

pub use normalize::{flatten_records, infer_schema, json_to_arrow};
pub use unify::{check_compatible, unify};

#[cfg(test)]
mod tests;

//! # parqstream
//!
//! A local JSON-to-Parquet analytical store. Batches of semi-structured
//! records are normalized into Arrow, stamped with logical-date, ingestion
//! and type metadata, and persisted as Parquet partition files under a
//! `year/month` tree. Ad-hoc SQL runs over the accumulated partitions
//! through an embedded DuckDB engine.
//!
//! ## Quick Start
//!
//! ```rust,ignore
//! use parqstream::{IngestEngine, QueryEngine, StoreConfig};
//! use std::sync::Arc;
//!
//! let config = Arc::new(StoreConfig::with_data_dir("data/parquet"));
//!
//! let ingest = IngestEngine::new(Arc::clone(&config))?;
//! ingest.append(&serde_json::json!([{"id": "a", "level": "INFO"}]), None, Some("log"))?;
//!
//! let query = QueryEngine::new(config)?;
//! let result = query.execute_sql("SELECT * FROM all_records", Some(10))?;
//! ```
//!
//! ## Architecture
//!
//! ```text
//! ingest batch ──► normalize ──► stamp ──► locate partition ──► unify ──► rewrite file
//!                                              │ (overflow: close + rename)
//! query ──► discover partitions ──► register view ──► DuckDB ──► rows
//! ```

#![warn(clippy::all)]
#![warn(clippy::pedantic)]
#![allow(clippy::module_name_repetitions)]
#![allow(clippy::must_use_candidate)]
#![allow(clippy::missing_errors_doc)]
#![allow(clippy::missing_panics_doc)]
#![allow(clippy::cast_possible_truncation)]
#![allow(clippy::cast_sign_loss)]

// ============================================================================
// Module declarations
// ============================================================================

/// Error types for the store
pub mod error;

/// Store configuration
pub mod config;

/// JSON normalization and schema unification
pub mod batch;

/// Parquet read/write primitives
pub mod storage;

/// Partition naming, placement, and discovery
pub mod partition;

/// Append engine
pub mod ingest;

/// DuckDB query engine
pub mod query;

/// Test data generation
pub mod testdata;

/// Command-line interface
pub mod cli;

// ============================================================================
// Re-exports
// ============================================================================

pub use config::{PartitionPolicy, StoreConfig};
pub use error::{Error, Result};
pub use ingest::{IngestEngine, IngestReceipt};
pub use query::{QueryEngine, QueryOutcome};

/// Crate version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Crate name
pub const NAME: &str = env!("CARGO_PKG_NAME");

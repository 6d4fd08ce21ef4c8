//! Store configuration
//!
//! This module contains the configuration structures for the store:
//! storage layout, partition policy, Parquet tuning, the stamped field
//! names, DuckDB session settings, and query limits. A config can be
//! loaded from a YAML file or constructed with defaults.

use crate::error::{Error, Result};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

// ============================================================================
// Top-Level Store Config
// ============================================================================

/// Complete store configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StoreConfig {
    /// Root directory for partition files
    #[serde(default = "default_data_dir")]
    pub data_dir: PathBuf,

    /// Partition policy (fixed calendar ranges or size-based overflow)
    #[serde(default)]
    pub partition: PartitionPolicy,

    /// Parquet writer settings
    #[serde(default)]
    pub parquet: ParquetConfig,

    /// Names of the stamped columns persisted in every record
    #[serde(default)]
    pub fields: FieldNames,

    /// DuckDB session settings
    #[serde(default)]
    pub duckdb: DuckDbConfig,

    /// Query limits
    #[serde(default)]
    pub query: QueryLimits,
}

impl Default for StoreConfig {
    fn default() -> Self {
        Self {
            data_dir: default_data_dir(),
            partition: PartitionPolicy::default(),
            parquet: ParquetConfig::default(),
            fields: FieldNames::default(),
            duckdb: DuckDbConfig::default(),
            query: QueryLimits::default(),
        }
    }
}

impl StoreConfig {
    /// Load configuration from a YAML file
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let content = std::fs::read_to_string(path).map_err(|e| {
            Error::config(format!("Failed to read config {}: {e}", path.display()))
        })?;
        let config: Self = serde_yaml::from_str(&content)?;
        config.validate()?;
        Ok(config)
    }

    /// Create a config rooted at the given data directory, defaults elsewhere
    pub fn with_data_dir(data_dir: impl Into<PathBuf>) -> Self {
        Self {
            data_dir: data_dir.into(),
            ..Self::default()
        }
    }

    /// Validate configuration values
    pub fn validate(&self) -> Result<()> {
        match self.partition {
            PartitionPolicy::FixedRange { days_per_file } => {
                if days_per_file == 0 || days_per_file > 31 {
                    return Err(Error::config(format!(
                        "days_per_file must be between 1 and 31, got {days_per_file}"
                    )));
                }
            }
            PartitionPolicy::SizeBased { max_rows_per_file } => {
                if max_rows_per_file == 0 {
                    return Err(Error::config("max_rows_per_file must be greater than 0"));
                }
            }
        }
        Ok(())
    }
}

fn default_data_dir() -> PathBuf {
    PathBuf::from("data/parquet")
}

// ============================================================================
// Partition Policy
// ============================================================================

/// How day ranges are assigned to partition files within a month.
///
/// Both policies share the same on-disk naming contract
/// (`<type>_<from>_<to>.parquet` under `<year>/<month>/`); they differ only
/// in how the day range of the target file is chosen.
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum PartitionPolicy {
    /// Ranges computed purely from the calendar; no metadata read
    FixedRange {
        #[serde(default = "default_days_per_file")]
        days_per_file: u32,
    },

    /// A file accepts rows until it would exceed the limit, then splits
    SizeBased {
        #[serde(default = "default_max_rows_per_file")]
        max_rows_per_file: usize,
    },
}

impl Default for PartitionPolicy {
    fn default() -> Self {
        Self::FixedRange {
            days_per_file: default_days_per_file(),
        }
    }
}

fn default_days_per_file() -> u32 {
    20
}

fn default_max_rows_per_file() -> usize {
    100_000
}

// ============================================================================
// Parquet Config
// ============================================================================

/// Parquet writer settings
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ParquetConfig {
    /// Compression codec: zstd, snappy, gzip, or none
    #[serde(default = "default_compression")]
    pub compression: String,

    /// Rows per row group
    #[serde(default = "default_row_group_size")]
    pub row_group_size: usize,
}

impl Default for ParquetConfig {
    fn default() -> Self {
        Self {
            compression: default_compression(),
            row_group_size: default_row_group_size(),
        }
    }
}

fn default_compression() -> String {
    "zstd".to_string()
}

fn default_row_group_size() -> usize {
    100_000
}

// ============================================================================
// Stamped Field Names
// ============================================================================

/// Names of the columns stamped onto every ingested row.
///
/// These names are a persisted contract: discovery parses them out of
/// file content and query predicates reference them. Changing them on an
/// existing store is a breaking schema change.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FieldNames {
    /// The date the data is about (client-supplied logical date)
    #[serde(default = "default_date_field")]
    pub date_field: String,

    /// Wall-clock time the data was received
    #[serde(default = "default_ingested_at_field")]
    pub ingested_at_field: String,

    /// Unique identifier per record
    #[serde(default = "default_id_field")]
    pub id_field: String,

    /// Client-supplied data category
    #[serde(default = "default_type_field")]
    pub type_field: String,
}

impl Default for FieldNames {
    fn default() -> Self {
        Self {
            date_field: default_date_field(),
            ingested_at_field: default_ingested_at_field(),
            id_field: default_id_field(),
            type_field: default_type_field(),
        }
    }
}

fn default_date_field() -> String {
    "data_date".to_string()
}

fn default_ingested_at_field() -> String {
    "ingested_at".to_string()
}

fn default_id_field() -> String {
    "record_id".to_string()
}

fn default_type_field() -> String {
    "data_type".to_string()
}

// ============================================================================
// DuckDB Config
// ============================================================================

/// DuckDB session settings
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DuckDbConfig {
    /// Database file path; in-memory when absent
    #[serde(default)]
    pub database: Option<PathBuf>,

    /// Memory limit passed to the session
    #[serde(default = "default_memory_limit")]
    pub memory_limit: String,

    /// Number of threads for the session
    #[serde(default = "default_threads")]
    pub threads: u32,
}

impl Default for DuckDbConfig {
    fn default() -> Self {
        Self {
            database: None,
            memory_limit: default_memory_limit(),
            threads: default_threads(),
        }
    }
}

fn default_memory_limit() -> String {
    "2GB".to_string()
}

fn default_threads() -> u32 {
    4
}

// ============================================================================
// Query Limits
// ============================================================================

/// Result size limits applied at the query boundary
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct QueryLimits {
    /// Default LIMIT when the caller does not specify one
    #[serde(default = "default_limit")]
    pub default_limit: usize,

    /// Hard cap on returned rows
    #[serde(default = "default_max_results")]
    pub max_results: usize,
}

impl Default for QueryLimits {
    fn default() -> Self {
        Self {
            default_limit: default_limit(),
            max_results: default_max_results(),
        }
    }
}

fn default_limit() -> usize {
    100
}

fn default_max_results() -> usize {
    10_000
}

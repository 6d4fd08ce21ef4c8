//! Parquet file reader
//!
//! Whole-table reads of partition files plus metadata-only row counts.

use crate::error::{Error, Result};
use arrow::compute::concat_batches;
use arrow::datatypes::SchemaRef;
use arrow::record_batch::RecordBatch;
use parquet::arrow::arrow_reader::ParquetRecordBatchReaderBuilder;
use std::fs::File;
use std::path::Path;

/// Read an entire partition file into one RecordBatch
pub fn read_partition(path: impl AsRef<Path>) -> Result<RecordBatch> {
    let path = path.as_ref();
    let file = File::open(path).map_err(|e| Error::Ingest {
        message: format!("Failed to open {}: {e}", path.display()),
    })?;

    let builder = ParquetRecordBatchReaderBuilder::try_new(file)?;
    let schema = builder.schema().clone();
    let reader = builder.build()?;

    let batches: Vec<RecordBatch> = reader.collect::<std::result::Result<_, _>>()?;
    concat_batches(&schema, &batches).map_err(Error::from)
}

/// Row count of a partition file, read from Parquet metadata only
pub fn partition_row_count(path: impl AsRef<Path>) -> Result<usize> {
    let path = path.as_ref();
    let file = File::open(path).map_err(|e| Error::Ingest {
        message: format!("Failed to open {}: {e}", path.display()),
    })?;

    let builder = ParquetRecordBatchReaderBuilder::try_new(file)?;
    Ok(builder.metadata().file_metadata().num_rows() as usize)
}

/// Arrow schema of a partition file, without reading row data
pub fn partition_schema(path: impl AsRef<Path>) -> Result<SchemaRef> {
    let path = path.as_ref();
    let file = File::open(path).map_err(|e| Error::Ingest {
        message: format!("Failed to open {}: {e}", path.display()),
    })?;

    let builder = ParquetRecordBatchReaderBuilder::try_new(file)?;
    Ok(builder.schema().clone())
}

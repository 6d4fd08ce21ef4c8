//! Append engine
//!
//! Owns the full ingestion path: normalize the incoming payload, stamp the
//! metadata columns, locate the target partition, merge with any existing
//! rows under a widened schema, and rewrite the file in place. All
//! file-system mutation on the ingestion side happens here, under a
//! per-partition-group lock so concurrent appends to the same group cannot
//! interleave their read-merge-write sequences.

use crate::batch::{check_compatible, flatten_records, json_to_arrow, unify};
use crate::config::StoreConfig;
use crate::error::{Error, Result};
use crate::partition::{discover_all, sanitize_type_tag, PartitionKey, PartitionLocator};
use crate::storage::{
    partition_row_count, partition_schema, read_partition, replace_partition, ParquetWriterConfig,
};
use arrow::array::{ArrayRef, StringArray, TimestampMicrosecondArray};
use arrow::compute::concat_batches;
use arrow::datatypes::{DataType, Field, Schema, TimeUnit};
use arrow::record_batch::RecordBatch;
use chrono::{DateTime, NaiveDate, NaiveDateTime, Utc};
use serde::Serialize;
use serde_json::Value;
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex, PoisonError};
use std::time::Instant;


/// Result of a successful append
#[derive(Debug, Clone, Serialize)]
pub struct IngestReceipt {
    /// Rows written by this call
    pub records_processed: usize,
    /// Target partition file name
    pub file: String,
    /// Full path of the target partition file
    pub path: PathBuf,
    /// File size after the rewrite, in bytes
    pub file_size_bytes: u64,
    /// Elapsed wall-clock time
    pub duration_ms: u64,
}

/// Result of ingesting a JSON/JSONL file in chunks
#[derive(Debug, Clone, Serialize)]
pub struct FileIngestReport {
    /// Rows ingested across all chunks
    pub total_records: usize,
    /// Chunks written
    pub chunks: usize,
    /// Chunks that failed and were skipped
    pub errors: usize,
}

/// Read-only statistics for one partition file
#[derive(Debug, Clone, Serialize)]
pub struct PartitionStats {
    pub file_name: String,
    pub path: PathBuf,
    pub row_count: usize,
    pub file_size_bytes: u64,
    pub columns: Vec<String>,
    pub modified: Option<DateTime<Utc>>,
}

/// Parse a client-supplied logical date.
///
/// Accepts RFC 3339, `YYYY-MM-DDTHH:MM:SS`, or a bare `YYYY-MM-DD`
/// (interpreted as midnight UTC).
pub fn parse_data_date(raw: &str) -> Result<DateTime<Utc>> {
    if let Ok(dt) = DateTime::parse_from_rfc3339(raw) {
        return Ok(dt.with_timezone(&Utc));
    }
    if let Ok(dt) = NaiveDateTime::parse_from_str(raw, "%Y-%m-%dT%H:%M:%S") {
        return Ok(dt.and_utc());
    }
    if let Ok(date) = NaiveDate::parse_from_str(raw, "%Y-%m-%d") {
        if let Some(dt) = date.and_hms_opt(0, 0, 0) {
            return Ok(dt.and_utc());
        }
    }
    Err(Error::invalid_date(
        raw,
        "expected RFC 3339 or YYYY-MM-DD",
    ))
}

/// The append engine
pub struct IngestEngine {
    config: Arc<StoreConfig>,
    locator: PartitionLocator,
    writer_config: ParquetWriterConfig,
    group_locks: Mutex<HashMap<String, Arc<Mutex<()>>>>,
}

impl IngestEngine {
    /// Create an engine over the configured storage root
    pub fn new(config: Arc<StoreConfig>) -> Result<Self> {
        std::fs::create_dir_all(&config.data_dir)?;

        let locator = PartitionLocator::new(
            &config.data_dir,
            config.partition,
            config.fields.date_field.clone(),
        );
        let writer_config = ParquetWriterConfig::from_store(&config.parquet)?;

        Ok(Self {
            config,
            locator,
            writer_config,
            group_locks: Mutex::new(HashMap::new()),
        })
    }

    /// Append a batch of records to its partition file.
    ///
    /// `records` is a JSON object or array of objects. `data_date` defaults
    /// to the current time, `data_type` to the default tag. Either the whole
    /// rewritten file lands or the prior file is left untouched.
    pub fn append(
        &self,
        records: &Value,
        data_date: Option<DateTime<Utc>>,
        data_type: Option<&str>,
    ) -> Result<IngestReceipt> {
        let start = Instant::now();

        let rows = flatten_records(records)?;
        if rows.is_empty() {
            return Err(Error::EmptyBatch);
        }

        let date = data_date.unwrap_or_else(Utc::now);
        let tag = sanitize_type_tag(data_type.unwrap_or(""));
        let batch = self.build_stamped_batch(&rows, date, &tag)?;

        let key = PartitionKey::new(date.date_naive(), tag.clone());
        let lock = self.group_lock(&key.group_id());
        let _guard = lock.lock().unwrap_or_else(PoisonError::into_inner);

        let placement = self
            .locator
            .locate(date.date_naive(), &tag, batch.num_rows())?;
        std::fs::create_dir_all(&placement.dir)?;

        if let Some(close_out) = &placement.close_out {
            tracing::info!(
                from = %close_out.from.display(),
                to = %close_out.to.display(),
                "Partition overflow, closing file at its actual day range"
            );
            std::fs::rename(&close_out.from, &close_out.to)?;
        }

        let combined = if placement.path.exists() {
            let existing = read_partition(&placement.path)?;
            check_compatible(existing.schema().as_ref(), batch.schema().as_ref())?;
            let (existing, incoming) = unify(&existing, &batch)?;
            concat_batches(&existing.schema(), [&existing, &incoming])?
        } else {
            batch
        };

        let file_size_bytes = replace_partition(&placement.path, &combined, &self.writer_config)?;

        let receipt = IngestReceipt {
            records_processed: rows.len(),
            file: placement.file_name,
            path: placement.path,
            file_size_bytes,
            duration_ms: start.elapsed().as_millis() as u64,
        };

        tracing::info!(
            records = receipt.records_processed,
            file = %receipt.file,
            size_bytes = receipt.file_size_bytes,
            duration_ms = receipt.duration_ms,
            "Ingested batch"
        );

        Ok(receipt)
    }

    /// Ingest a JSON-array or JSONL file in chunks.
    ///
    /// Failed chunks are logged and counted, not fatal; the report carries
    /// the totals.
    pub fn ingest_file(
        &self,
        path: &Path,
        chunk_size: usize,
        data_date: Option<DateTime<Utc>>,
        data_type: Option<&str>,
    ) -> Result<FileIngestReport> {
        let content = std::fs::read_to_string(path)?;
        self.ingest_content(&content, chunk_size, data_date, data_type)
    }

    /// Ingest JSON-array or JSONL content in chunks
    pub fn ingest_content(
        &self,
        content: &str,
        chunk_size: usize,
        data_date: Option<DateTime<Utc>>,
        data_type: Option<&str>,
    ) -> Result<FileIngestReport> {
        let records = parse_records_payload(content)?;

        let chunk_size = chunk_size.max(1);
        let mut report = FileIngestReport {
            total_records: 0,
            chunks: 0,
            errors: 0,
        };

        for chunk in records.chunks(chunk_size) {
            let payload = Value::Array(chunk.to_vec());
            match self.append(&payload, data_date, data_type) {
                Ok(receipt) => {
                    report.total_records += receipt.records_processed;
                    report.chunks += 1;
                }
                Err(e) => {
                    tracing::warn!(error = %e, "Chunk ingestion failed, skipping");
                    report.errors += 1;
                }
            }
        }

        Ok(report)
    }

    /// Statistics for every partition file under the root
    pub fn file_stats(&self) -> Result<Vec<PartitionStats>> {
        let mut files = discover_all(&self.config.data_dir)?;
        files.sort();

        let mut stats = Vec::with_capacity(files.len());
        for path in files {
            let row_count = partition_row_count(&path)?;
            let schema = partition_schema(&path)?;
            let metadata = std::fs::metadata(&path)?;
            let modified = metadata.modified().ok().map(DateTime::<Utc>::from);

            stats.push(PartitionStats {
                file_name: path
                    .file_name()
                    .map(|n| n.to_string_lossy().into_owned())
                    .unwrap_or_default(),
                path,
                row_count,
                file_size_bytes: metadata.len(),
                columns: schema.fields().iter().map(|f| f.name().clone()).collect(),
                modified,
            });
        }

        Ok(stats)
    }

    /// Storage root this engine writes under
    pub fn data_dir(&self) -> &Path {
        &self.config.data_dir
    }

    /// Build the rectangular batch with the four stamped columns appended.
    ///
    /// Client-supplied `data_date` / `ingested_at` / `data_type` columns are
    /// replaced by the engine's stamp. The identifier column is kept when
    /// the client provides one, copied from a conventional `id` column
    /// otherwise, and synthesized as a UUID per row as the last resort;
    /// it is always stored as a string column.
    fn build_stamped_batch(
        &self,
        rows: &[Value],
        date: DateTime<Utc>,
        type_tag: &str,
    ) -> Result<RecordBatch> {
        let fields_config = &self.config.fields;
        let user_batch = json_to_arrow(rows, None)?;
        let num_rows = user_batch.num_rows();

        let mut fields: Vec<Field> = Vec::new();
        let mut columns: Vec<ArrayRef> = Vec::new();

        let user_schema = user_batch.schema();
        for (idx, field) in user_schema.fields().iter().enumerate() {
            let name = field.name();
            if name == &fields_config.date_field
                || name == &fields_config.ingested_at_field
                || name == &fields_config.type_field
                || name == &fields_config.id_field
            {
                continue;
            }
            fields.push(field.as_ref().clone());
            columns.push(Arc::clone(user_batch.column(idx)));
        }

        let id_array = self.record_id_column(&user_batch, num_rows)?;
        fields.push(Field::new(&fields_config.id_field, DataType::Utf8, true));
        columns.push(id_array);

        let date_micros = vec![date.timestamp_micros(); num_rows];
        fields.push(Field::new(
            &fields_config.date_field,
            DataType::Timestamp(TimeUnit::Microsecond, None),
            true,
        ));
        columns.push(Arc::new(TimestampMicrosecondArray::from(date_micros)));

        let ingested_micros = vec![Utc::now().timestamp_micros(); num_rows];
        fields.push(Field::new(
            &fields_config.ingested_at_field,
            DataType::Timestamp(TimeUnit::Microsecond, None),
            true,
        ));
        columns.push(Arc::new(TimestampMicrosecondArray::from(ingested_micros)));

        let tags = vec![type_tag.to_string(); num_rows];
        fields.push(Field::new(&fields_config.type_field, DataType::Utf8, true));
        columns.push(Arc::new(StringArray::from(tags)));

        RecordBatch::try_new(Arc::new(Schema::new(fields)), columns).map_err(Error::from)
    }

    /// Identifier column: client `record_id`, else `id`, else fresh UUIDs
    fn record_id_column(&self, user_batch: &RecordBatch, num_rows: usize) -> Result<ArrayRef> {
        let id_field = &self.config.fields.id_field;

        let source = user_batch
            .schema()
            .index_of(id_field)
            .or_else(|_| user_batch.schema().index_of("id"))
            .ok();

        if let Some(idx) = source {
            let cast = arrow::compute::cast(user_batch.column(idx), &DataType::Utf8)?;
            return Ok(cast);
        }

        let ids: Vec<String> = (0..num_rows)
            .map(|_| uuid::Uuid::new_v4().to_string())
            .collect();
        Ok(Arc::new(StringArray::from(ids)))
    }

    /// Mutex guarding one `(year, month, type)` group
    fn group_lock(&self, group: &str) -> Arc<Mutex<()>> {
        let mut locks = self
            .group_locks
            .lock()
            .unwrap_or_else(PoisonError::into_inner);
        Arc::clone(locks.entry(group.to_string()).or_default())
    }
}

/// Parse file content as a JSON array, a single object, or JSONL
fn parse_records_payload(content: &str) -> Result<Vec<Value>> {
    match serde_json::from_str::<Value>(content) {
        Ok(Value::Array(records)) => Ok(records),
        Ok(obj @ Value::Object(_)) => Ok(vec![obj]),
        Ok(_) => Err(Error::normalize(
            "file must contain a JSON object, array, or JSONL",
        )),
        Err(_) => {
            let mut records = Vec::new();
            for (line_no, line) in content.lines().enumerate() {
                let line = line.trim();
                if line.is_empty() {
                    continue;
                }
                let record: Value = serde_json::from_str(line).map_err(|e| {
                    Error::normalize(format!("invalid JSON on line {}: {e}", line_no + 1))
                })?;
                records.push(record);
            }
            Ok(records)
        }
    }
}

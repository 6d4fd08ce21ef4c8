//! DuckDB-based query engine
//!
//! Registers the discovered partition files as one logical relation
//! (`all_records`) and answers SQL plus a set of structured query shapes
//! over it.

use crate::config::StoreConfig;
use crate::error::{Error, Result};
use crate::ingest::parse_data_date;
use crate::partition::discover_all;
use duckdb::Connection;
use serde::Serialize;
use serde_json::Value;
use std::sync::Arc;
use std::time::Instant;

/// Name of the relation exposing all partition files to SQL
const VIEW_NAME: &str = "all_records";

/// Aggregation functions accepted by [`QueryEngine::aggregate`]
const AGGREGATE_FUNCTIONS: &[&str] = &["COUNT", "SUM", "AVG", "MIN", "MAX"];

/// Result of one query
#[derive(Debug, Clone, Serialize)]
pub struct QueryOutcome {
    /// Result rows as JSON objects
    pub rows: Vec<Value>,
    /// Number of rows returned
    pub row_count: usize,
    /// Column names of the result
    pub columns: Vec<String>,
    /// Elapsed wall-clock time
    pub duration_ms: u64,
    /// The SQL that ran
    pub query: String,
    /// True when the store holds no partitions at all
    pub no_data: bool,
}

impl QueryOutcome {
    fn no_data(query: impl Into<String>) -> Self {
        Self {
            rows: Vec::new(),
            row_count: 0,
            columns: Vec::new(),
            duration_ms: 0,
            query: query.into(),
            no_data: true,
        }
    }
}

/// Dataset statistics
#[derive(Debug, Clone, Serialize)]
pub struct Statistics {
    pub total_records: i64,
    pub earliest: Option<String>,
    pub latest: Option<String>,
    pub monthly_distribution: Vec<Value>,
    pub schema: Vec<Value>,
    pub file_count: usize,
}

/// Query engine over the partition store
pub struct QueryEngine {
    conn: Connection,
    config: Arc<StoreConfig>,
}

impl QueryEngine {
    /// Open a DuckDB session with the configured tuning applied
    pub fn new(config: Arc<StoreConfig>) -> Result<Self> {
        let conn = match &config.duckdb.database {
            Some(path) => Connection::open(path)?,
            None => Connection::open_in_memory()?,
        };

        conn.execute_batch(&format!(
            "SET memory_limit = '{}'; SET threads TO {};",
            config.duckdb.memory_limit, config.duckdb.threads
        ))?;

        Ok(Self { conn, config })
    }

    /// Recompute the dataset view from a full discovery pass.
    ///
    /// Returns the number of files registered. With zero files the view is
    /// dropped so stale registrations cannot answer queries.
    fn refresh_view(&self) -> Result<usize> {
        let files = discover_all(&self.config.data_dir)?;

        if files.is_empty() {
            self.conn
                .execute_batch(&format!("DROP VIEW IF EXISTS {VIEW_NAME};"))?;
            return Ok(0);
        }

        let quoted: Vec<String> = files
            .iter()
            .map(|p| format!("'{}'", p.to_string_lossy().replace('\'', "''")))
            .collect();

        self.conn.execute_batch(&format!(
            "CREATE OR REPLACE VIEW {VIEW_NAME} AS \
             SELECT * FROM read_parquet([{}], union_by_name = true);",
            quoted.join(", ")
        ))?;

        tracing::debug!(files = files.len(), "Registered partition view");
        Ok(files.len())
    }

    /// Execute raw SQL against the dataset view.
    ///
    /// A safety LIMIT is appended when the caller asks for one and the
    /// statement has none of its own.
    pub fn execute_sql(&self, query: &str, limit: Option<usize>) -> Result<QueryOutcome> {
        if self.refresh_view()? == 0 {
            return Ok(QueryOutcome::no_data(query));
        }

        let mut sql = query.trim().trim_end_matches(';').to_string();
        if let Some(limit) = limit {
            let capped = limit.min(self.config.query.max_results);
            if !sql.to_uppercase().contains("LIMIT") {
                sql = format!("{sql} LIMIT {capped}");
            }
        }

        self.run(&sql)
    }

    /// Look up a single record by its identifier
    pub fn query_by_id(&self, record_id: &str) -> Result<QueryOutcome> {
        if self.refresh_view()? == 0 {
            return Ok(QueryOutcome::no_data("query_by_id"));
        }

        let id_field = &self.config.fields.id_field;
        let escaped = record_id.replace('\'', "''");
        let sql = format!(
            "SELECT * FROM {VIEW_NAME} WHERE \"{id_field}\" = '{escaped}' LIMIT 1"
        );
        self.run(&sql)
    }

    /// Records whose logical date falls in `[start, end)`
    pub fn query_by_date_range(
        &self,
        start: &str,
        end: &str,
        limit: Option<usize>,
    ) -> Result<QueryOutcome> {
        let start = parse_data_date(start)?;
        let end = parse_data_date(end)?;

        if self.refresh_view()? == 0 {
            return Ok(QueryOutcome::no_data("query_by_date_range"));
        }

        let date_field = &self.config.fields.date_field;
        let limit = self.effective_limit(limit);
        let sql = format!(
            "SELECT * FROM {VIEW_NAME} \
             WHERE \"{date_field}\" >= '{}' AND \"{date_field}\" < '{}' \
             ORDER BY \"{date_field}\" DESC LIMIT {limit}",
            start.format("%Y-%m-%d %H:%M:%S"),
            end.format("%Y-%m-%d %H:%M:%S"),
        );
        self.run(&sql)
    }

    /// Records from the last `hours` hours of logical time
    pub fn query_recent(&self, hours: u32, limit: Option<usize>) -> Result<QueryOutcome> {
        if self.refresh_view()? == 0 {
            return Ok(QueryOutcome::no_data("query_recent"));
        }

        let date_field = &self.config.fields.date_field;
        let limit = self.effective_limit(limit);
        let sql = format!(
            "SELECT * FROM {VIEW_NAME} \
             WHERE \"{date_field}\" >= NOW() - INTERVAL '{hours} hours' \
             ORDER BY \"{date_field}\" DESC LIMIT {limit}"
        );
        self.run(&sql)
    }

    /// Free-text search across text-typed columns, or one named column
    pub fn search(
        &self,
        term: &str,
        column: Option<&str>,
        limit: Option<usize>,
    ) -> Result<QueryOutcome> {
        if self.refresh_view()? == 0 {
            return Ok(QueryOutcome::no_data("search"));
        }

        let escaped = term.replace('\'', "''");
        let limit = self.effective_limit(limit);
        let columns = self.describe_columns()?;

        let targets: Vec<String> = match column {
            Some(name) => {
                if !columns.iter().any(|(col, _)| col == name) {
                    return Err(Error::query(format!("Unknown column: {name}")));
                }
                vec![name.to_string()]
            }
            None => {
                let text_columns: Vec<String> = columns
                    .iter()
                    .filter(|(_, dtype)| {
                        let upper = dtype.to_uppercase();
                        ["VARCHAR", "TEXT", "STRING", "CHAR"]
                            .iter()
                            .any(|t| upper.contains(t))
                    })
                    .map(|(col, _)| col.clone())
                    .collect();

                if text_columns.is_empty() {
                    columns.iter().map(|(col, _)| col.clone()).collect()
                } else {
                    text_columns
                }
            }
        };

        let conditions: Vec<String> = targets
            .iter()
            .map(|col| {
                format!(
                    "CAST(\"{}\" AS VARCHAR) ILIKE '%{escaped}%'",
                    col.replace('"', "\"\"")
                )
            })
            .collect();

        let sql = format!(
            "SELECT * FROM {VIEW_NAME} WHERE {} LIMIT {limit}",
            conditions.join(" OR ")
        );
        self.run(&sql)
    }

    /// Aggregation over one column, grouped by another
    pub fn aggregate(
        &self,
        group_by: &str,
        function: &str,
        column: &str,
    ) -> Result<QueryOutcome> {
        if self.refresh_view()? == 0 {
            return Ok(QueryOutcome::no_data("aggregate"));
        }

        let function = function.to_uppercase();
        if !AGGREGATE_FUNCTIONS.contains(&function.as_str()) {
            return Err(Error::query(format!(
                "Unsupported aggregate function: {function}"
            )));
        }

        let columns = self.describe_columns()?;
        if !columns.iter().any(|(col, _)| col == group_by) {
            return Err(Error::query(format!("Unknown column: {group_by}")));
        }
        if column != "*" && !columns.iter().any(|(col, _)| col == column) {
            return Err(Error::query(format!("Unknown column: {column}")));
        }

        let agg_target = if column == "*" {
            "*".to_string()
        } else {
            format!("\"{}\"", column.replace('"', "\"\""))
        };
        let group = format!("\"{}\"", group_by.replace('"', "\"\""));

        let sql = format!(
            "SELECT {group}, {function}({agg_target}) AS result \
             FROM {VIEW_NAME} GROUP BY {group} ORDER BY result DESC LIMIT 100"
        );
        self.run(&sql)
    }

    /// Dataset statistics: totals, logical-date bounds, monthly distribution,
    /// and the current unified schema
    pub fn statistics(&self) -> Result<Statistics> {
        let file_count = self.refresh_view()?;
        if file_count == 0 {
            return Ok(Statistics {
                total_records: 0,
                earliest: None,
                latest: None,
                monthly_distribution: Vec::new(),
                schema: Vec::new(),
                file_count: 0,
            });
        }

        let total_records: i64 = self
            .conn
            .query_row(&format!("SELECT COUNT(*) FROM {VIEW_NAME}"), [], |row| {
                row.get(0)
            })?;

        let date_field = &self.config.fields.date_field;
        let (earliest, latest) = self.conn.query_row(
            &format!(
                "SELECT MIN(\"{date_field}\"), MAX(\"{date_field}\") FROM {VIEW_NAME}"
            ),
            [],
            |row| {
                let min: duckdb::types::Value = row.get(0)?;
                let max: duckdb::types::Value = row.get(1)?;
                Ok((duckdb_value_to_string(min), duckdb_value_to_string(max)))
            },
        )?;

        let monthly = self.run(&format!(
            "SELECT DATE_TRUNC('month', \"{date_field}\") AS month, COUNT(*) AS count \
             FROM {VIEW_NAME} GROUP BY month ORDER BY month DESC LIMIT 12"
        ))?;

        let schema = self.run(&format!("DESCRIBE {VIEW_NAME}"))?;

        Ok(Statistics {
            total_records,
            earliest,
            latest,
            monthly_distribution: monthly.rows,
            schema: schema.rows,
            file_count,
        })
    }

    /// Column names and DuckDB types of the dataset view
    fn describe_columns(&self) -> Result<Vec<(String, String)>> {
        let mut stmt = self.conn.prepare(&format!("DESCRIBE {VIEW_NAME}"))?;
        let columns = stmt
            .query_map([], |row| {
                let name: String = row.get(0)?;
                let dtype: String = row.get(1)?;
                Ok((name, dtype))
            })?
            .filter_map(std::result::Result::ok)
            .collect();
        Ok(columns)
    }

    /// Run a statement and materialize the result rows as JSON objects
    fn run(&self, sql: &str) -> Result<QueryOutcome> {
        let start = Instant::now();

        let mut stmt = self.conn.prepare(sql)?;
        let mut rows = stmt.query([])?;

        let mut columns: Vec<String> = Vec::new();
        let mut data: Vec<Value> = Vec::new();

        while let Some(row) = rows.next()? {
            if columns.is_empty() {
                columns = row
                    .as_ref()
                    .column_names()
                    .iter()
                    .map(ToString::to_string)
                    .collect();
            }

            let mut record = serde_json::Map::new();
            for (idx, name) in columns.iter().enumerate() {
                let value: duckdb::types::Value = row.get(idx)?;
                record.insert(name.clone(), duckdb_value_to_json(value));
            }
            data.push(Value::Object(record));
        }

        Ok(QueryOutcome {
            row_count: data.len(),
            rows: data,
            columns,
            duration_ms: start.elapsed().as_millis() as u64,
            query: sql.to_string(),
            no_data: false,
        })
    }

    fn effective_limit(&self, limit: Option<usize>) -> usize {
        limit
            .unwrap_or(self.config.query.default_limit)
            .min(self.config.query.max_results)
    }
}

/// Convert a DuckDB value to JSON
fn duckdb_value_to_json(value: duckdb::types::Value) -> Value {
    use duckdb::types::Value as Db;

    match value {
        Db::Null => Value::Null,
        Db::Boolean(b) => Value::Bool(b),
        Db::TinyInt(i) => Value::Number(i.into()),
        Db::SmallInt(i) => Value::Number(i.into()),
        Db::Int(i) => Value::Number(i.into()),
        Db::BigInt(i) => Value::Number(i.into()),
        Db::HugeInt(i) => Value::String(i.to_string()),
        Db::UTinyInt(i) => Value::Number(i.into()),
        Db::USmallInt(i) => Value::Number(i.into()),
        Db::UInt(i) => Value::Number(i.into()),
        Db::UBigInt(i) => Value::Number(i.into()),
        Db::Float(f) => {
            serde_json::Number::from_f64(f64::from(f)).map_or(Value::Null, Value::Number)
        }
        Db::Double(f) => serde_json::Number::from_f64(f).map_or(Value::Null, Value::Number),
        Db::Text(s) => Value::String(s),
        Db::Blob(b) => Value::String(String::from_utf8_lossy(&b).into_owned()),
        Db::Timestamp(unit, i) => {
            let micros = timestamp_to_micros(unit, i);
            chrono::DateTime::from_timestamp_micros(micros)
                .map(|dt| Value::String(dt.format("%Y-%m-%dT%H:%M:%S%.6fZ").to_string()))
                .unwrap_or(Value::Number(i.into()))
        }
        Db::Date32(d) => {
            // Days since epoch (719163 is the number of days from 1 CE to 1970-01-01)
            chrono::NaiveDate::from_num_days_from_ce_opt(d + 719_163)
                .map(|date| Value::String(date.format("%Y-%m-%d").to_string()))
                .unwrap_or(Value::Number(d.into()))
        }
        Db::Time64(unit, t) => {
            let micros = timestamp_to_micros(unit, t);
            let secs = micros / 1_000_000;
            let sub = micros % 1_000_000;
            Value::String(format!(
                "{:02}:{:02}:{:02}.{:06}",
                secs / 3600,
                (secs % 3600) / 60,
                secs % 60,
                sub
            ))
        }
        other => Value::String(format!("{other:?}")),
    }
}

/// Convert a DuckDB value to a display string (for min/max bounds)
fn duckdb_value_to_string(value: duckdb::types::Value) -> Option<String> {
    use duckdb::types::Value as Db;

    match value {
        Db::Null => None,
        Db::Text(s) => Some(s),
        Db::BigInt(i) => Some(i.to_string()),
        Db::Int(i) => Some(i.to_string()),
        Db::Timestamp(unit, i) => {
            let micros = timestamp_to_micros(unit, i);
            chrono::DateTime::from_timestamp_micros(micros)
                .map(|dt| dt.format("%Y-%m-%dT%H:%M:%S%.6fZ").to_string())
        }
        Db::Date32(d) => chrono::NaiveDate::from_num_days_from_ce_opt(d + 719_163)
            .map(|date| date.format("%Y-%m-%d").to_string()),
        other => Some(format!("{other:?}")),
    }
}

fn timestamp_to_micros(unit: duckdb::types::TimeUnit, value: i64) -> i64 {
    use duckdb::types::TimeUnit;

    match unit {
        TimeUnit::Second => value.saturating_mul(1_000_000),
        TimeUnit::Millisecond => value.saturating_mul(1_000),
        TimeUnit::Microsecond => value,
        TimeUnit::Nanosecond => value / 1_000,
    }
}

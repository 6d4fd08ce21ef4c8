//! Ingest-then-query integration tests
//!
//! Exercises the DuckDB engine over real partition files written by the
//! append engine, including schema drift across partitions.

use chrono::{DateTime, NaiveDate, Utc};
use parqstream::config::{PartitionPolicy, StoreConfig};
use parqstream::ingest::IngestEngine;
use parqstream::query::QueryEngine;
use serde_json::{json, Value};
use std::sync::Arc;
use tempfile::TempDir;

fn store() -> (TempDir, Arc<StoreConfig>) {
    let dir = TempDir::new().unwrap();
    let mut config = StoreConfig::with_data_dir(dir.path());
    config.partition = PartitionPolicy::FixedRange { days_per_file: 20 };
    (dir, Arc::new(config))
}

fn date(y: i32, m: u32, d: u32) -> DateTime<Utc> {
    NaiveDate::from_ymd_opt(y, m, d)
        .unwrap()
        .and_hms_opt(0, 0, 0)
        .unwrap()
        .and_utc()
}

fn seeded() -> (TempDir, Arc<StoreConfig>) {
    let (dir, config) = store();
    let engine = IngestEngine::new(Arc::clone(&config)).unwrap();

    engine
        .append(
            &json!([
                {"id": "log_001", "level": "INFO", "message": "Application started"},
                {"id": "log_002", "level": "ERROR", "message": "Connection failed"},
                {"id": "log_003", "level": "WARN", "message": "Slow query detected"},
            ]),
            Some(date(2025, 10, 5)),
            Some("log"),
        )
        .unwrap();

    engine
        .append(
            &json!([
                {"id": "evt_001", "user_id": "user123", "action": "login"},
                {"id": "evt_002", "user_id": "user456", "action": "purchase"},
            ]),
            Some(date(2025, 10, 15)),
            Some("event"),
        )
        .unwrap();

    (dir, config)
}

#[test]
fn test_empty_store_is_no_data_not_error() {
    let (_dir, config) = store();
    let engine = QueryEngine::new(config).unwrap();

    let outcome = engine
        .execute_sql("SELECT * FROM all_records", Some(10))
        .unwrap();
    assert!(outcome.no_data);
    assert_eq!(outcome.row_count, 0);

    let stats = engine.statistics().unwrap();
    assert_eq!(stats.total_records, 0);
    assert_eq!(stats.file_count, 0);
}

#[test]
fn test_sql_over_all_partitions() {
    let (_dir, config) = seeded();
    let engine = QueryEngine::new(config).unwrap();

    let outcome = engine
        .execute_sql("SELECT * FROM all_records ORDER BY data_date", None)
        .unwrap();
    assert_eq!(outcome.row_count, 5);
    assert!(outcome.columns.iter().any(|c| c == "record_id"));
    assert!(outcome.columns.iter().any(|c| c == "data_type"));
}

#[test]
fn test_sql_safety_limit_is_appended() {
    let (_dir, config) = seeded();
    let engine = QueryEngine::new(config).unwrap();

    let outcome = engine
        .execute_sql("SELECT * FROM all_records", Some(2))
        .unwrap();
    assert_eq!(outcome.row_count, 2);
    assert!(outcome.query.contains("LIMIT 2"));
}

#[test]
fn test_query_by_id() {
    let (_dir, config) = seeded();
    let engine = QueryEngine::new(config).unwrap();

    let outcome = engine.query_by_id("log_002").unwrap();
    assert_eq!(outcome.row_count, 1);
    assert_eq!(outcome.rows[0]["level"], "ERROR");

    let missing = engine.query_by_id("nope").unwrap();
    assert_eq!(missing.row_count, 0);
}

#[test]
fn test_query_by_date_range() {
    let (_dir, config) = seeded();
    let engine = QueryEngine::new(config).unwrap();

    let outcome = engine
        .query_by_date_range("2025-10-01", "2025-10-10", None)
        .unwrap();
    assert_eq!(outcome.row_count, 3);
    assert!(outcome
        .rows
        .iter()
        .all(|row| row["data_type"] == "log"));

    assert!(engine
        .query_by_date_range("bogus", "2025-10-10", None)
        .is_err());
}

#[test]
fn test_type_filter_via_sql() {
    let (_dir, config) = seeded();
    let engine = QueryEngine::new(config).unwrap();

    let outcome = engine
        .execute_sql(
            "SELECT * FROM all_records WHERE data_type = 'event' ORDER BY record_id",
            None,
        )
        .unwrap();
    assert_eq!(outcome.row_count, 2);
    assert_eq!(outcome.rows[0]["record_id"], "evt_001");
}

#[test]
fn test_schema_drift_union_across_partitions() {
    // log rows have level/message, event rows have user_id/action; the
    // view must expose the union with nulls where a column is absent
    let (_dir, config) = seeded();
    let engine = QueryEngine::new(config).unwrap();

    let outcome = engine
        .execute_sql(
            "SELECT level, action FROM all_records WHERE record_id = 'evt_001'",
            None,
        )
        .unwrap();
    assert_eq!(outcome.row_count, 1);
    assert_eq!(outcome.rows[0]["action"], "login");
    assert_eq!(outcome.rows[0]["level"], Value::Null);
}

#[test]
fn test_search_across_text_columns() {
    let (_dir, config) = seeded();
    let engine = QueryEngine::new(config).unwrap();

    let outcome = engine.search("connection", None, None).unwrap();
    assert_eq!(outcome.row_count, 1);
    assert_eq!(outcome.rows[0]["record_id"], "log_002");

    // Single-quote injection attempts are escaped, not executed
    let quoted = engine.search("it'; DROP TABLE x; --", None, None).unwrap();
    assert_eq!(quoted.row_count, 0);
}

#[test]
fn test_search_specific_column() {
    let (_dir, config) = seeded();
    let engine = QueryEngine::new(config).unwrap();

    let outcome = engine.search("login", Some("action"), None).unwrap();
    assert_eq!(outcome.row_count, 1);

    assert!(engine.search("x", Some("no_such_column"), None).is_err());
}

#[test]
fn test_aggregate_by_type() {
    let (_dir, config) = seeded();
    let engine = QueryEngine::new(config).unwrap();

    let outcome = engine.aggregate("data_type", "count", "*").unwrap();
    assert_eq!(outcome.row_count, 2);
    assert_eq!(outcome.rows[0]["result"], 3);
    assert_eq!(outcome.rows[0]["data_type"], "log");

    assert!(engine.aggregate("data_type", "EXPLODE", "*").is_err());
    assert!(engine.aggregate("no_such_column", "count", "*").is_err());
}

#[test]
fn test_statistics() {
    let (_dir, config) = seeded();
    let engine = QueryEngine::new(config).unwrap();

    let stats = engine.statistics().unwrap();
    assert_eq!(stats.total_records, 5);
    assert_eq!(stats.file_count, 2);
    assert!(stats.earliest.unwrap().starts_with("2025-10-05"));
    assert!(stats.latest.unwrap().starts_with("2025-10-15"));
    assert!(!stats.schema.is_empty());
    assert!(!stats.monthly_distribution.is_empty());
}

#[test]
fn test_view_refresh_sees_new_partitions() {
    let (_dir, config) = seeded();
    let ingest = IngestEngine::new(Arc::clone(&config)).unwrap();
    let query = QueryEngine::new(config).unwrap();

    let before = engine_count(&query);
    ingest
        .append(
            &json!([{"id": "txn_001", "amount": 99.99}]),
            Some(date(2025, 11, 2)),
            Some("transaction"),
        )
        .unwrap();

    // The view is recomputed on every query; the new partition shows up
    // without reconstructing the engine
    let after = engine_count(&query);
    assert_eq!(after, before + 1);
}

fn engine_count(engine: &QueryEngine) -> i64 {
    let outcome = engine
        .execute_sql("SELECT COUNT(*) AS n FROM all_records", None)
        .unwrap();
    outcome.rows[0]["n"].as_i64().unwrap()
}

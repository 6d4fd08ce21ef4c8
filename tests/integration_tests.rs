//! End-to-end partition lifecycle tests
//!
//! Drives the library API the way the HTTP facade does: ingest batches,
//! watch partition files split and rename, then discover them back.

use chrono::{DateTime, NaiveDate, Utc};
use parqstream::config::{PartitionPolicy, StoreConfig};
use parqstream::ingest::IngestEngine;
use parqstream::partition::{discover, discover_all};
use serde_json::{json, Value};
use std::sync::Arc;
use tempfile::TempDir;

fn store(policy: PartitionPolicy) -> (TempDir, Arc<StoreConfig>) {
    let dir = TempDir::new().unwrap();
    let mut config = StoreConfig::with_data_dir(dir.path());
    config.partition = policy;
    (dir, Arc::new(config))
}

fn date(y: i32, m: u32, d: u32) -> DateTime<Utc> {
    NaiveDate::from_ymd_opt(y, m, d)
        .unwrap()
        .and_hms_opt(0, 0, 0)
        .unwrap()
        .and_utc()
}

fn naive(y: i32, m: u32, d: u32) -> NaiveDate {
    NaiveDate::from_ymd_opt(y, m, d).unwrap()
}

fn records(prefix: &str, from: usize, to: usize) -> Value {
    let items: Vec<Value> = (from..=to)
        .map(|i| json!({"id": format!("{prefix}_{i:03}"), "message": format!("message {i}")}))
        .collect();
    Value::Array(items)
}

#[test]
fn test_size_based_lifecycle() {
    let (dir, config) = store(PartitionPolicy::SizeBased {
        max_rows_per_file: 100,
    });
    let engine = IngestEngine::new(config).unwrap();

    // Initial file creation
    let r1 = engine
        .append(&records("log", 1, 50), Some(date(2025, 10, 5)), Some("log"))
        .unwrap();
    assert_eq!(r1.records_processed, 50);
    assert_eq!(r1.file, "log_05_31.parquet");

    // Append within the limit lands in the same file
    let r2 = engine
        .append(&records("log", 51, 80), Some(date(2025, 10, 8)), Some("log"))
        .unwrap();
    assert_eq!(r2.file, "log_05_31.parquet");

    // Overflow: old file is closed at its actual last day, a new file opens
    let r3 = engine
        .append(
            &records("log", 81, 120),
            Some(date(2025, 10, 12)),
            Some("log"),
        )
        .unwrap();
    assert_eq!(r3.file, "log_12_31.parquet");
    assert!(dir.path().join("2025/10/log_05_08.parquet").exists());

    // A different type in the same month is independent
    let r4 = engine
        .append(
            &records("evt", 1, 60),
            Some(date(2025, 10, 5)),
            Some("event"),
        )
        .unwrap();
    assert_eq!(r4.file, "event_05_31.parquet");

    // Historical data goes to its own month directory
    let r5 = engine
        .append(
            &records("log", 1, 30),
            Some(date(2025, 9, 15)),
            Some("log"),
        )
        .unwrap();
    assert!(dir.path().join("2025/09").join(&r5.file).exists());

    // Full tree holds exactly the four partition files
    let all = discover_all(dir.path()).unwrap();
    assert_eq!(all.len(), 4);
}

#[test]
fn test_day_ranges_never_overlap_beyond_boundary() {
    let (dir, config) = store(PartitionPolicy::SizeBased {
        max_rows_per_file: 30,
    });
    let engine = IngestEngine::new(config).unwrap();

    // A forward-moving ingest sequence with several overflows
    let days = [2, 2, 5, 9, 9, 13, 18, 22, 27];
    for (i, day) in days.iter().enumerate() {
        engine
            .append(
                &records("log", i * 20 + 1, i * 20 + 20),
                Some(date(2025, 10, *day)),
                Some("log"),
            )
            .unwrap();
    }

    let mut ranges: Vec<(u32, u32)> = discover_all(dir.path())
        .unwrap()
        .into_iter()
        .map(|p| {
            let name = p.file_name().unwrap().to_str().unwrap().to_string();
            let parsed = parqstream::partition::PartitionName::parse(&name).unwrap();
            (parsed.range.from_day, parsed.range.to_day)
        })
        .collect();
    ranges.sort_unstable();

    for pair in ranges.windows(2) {
        let (_, prev_to) = pair[0];
        let (next_from, _) = pair[1];
        assert!(
            next_from >= prev_to,
            "ranges overlap beyond a boundary day: {ranges:?}"
        );
    }
}

#[test]
fn test_row_conservation_across_overflow() {
    let (dir, config) = store(PartitionPolicy::SizeBased {
        max_rows_per_file: 100,
    });
    let engine = IngestEngine::new(config).unwrap();

    let mut expected_total = 0;
    for (day, n) in [(5, 50), (8, 30), (12, 40), (20, 90), (25, 10)] {
        let receipt = engine
            .append(
                &records("log", expected_total + 1, expected_total + n),
                Some(date(2025, 10, day)),
                Some("log"),
            )
            .unwrap();
        assert_eq!(receipt.records_processed, n);
        expected_total += n;
    }

    let total: usize = discover_all(dir.path())
        .unwrap()
        .iter()
        .map(|p| parqstream::storage::partition_row_count(p).unwrap())
        .sum();
    assert_eq!(total, expected_total);
}

#[test]
fn test_fixed_range_lifecycle() {
    let (dir, config) = store(PartitionPolicy::FixedRange { days_per_file: 20 });
    let engine = IngestEngine::new(config).unwrap();

    engine
        .append(&records("log", 1, 3), Some(date(2025, 10, 5)), Some("log"))
        .unwrap();
    engine
        .append(
            &json!([{"id": "evt_001", "action": "login"}]),
            Some(date(2025, 10, 15)),
            Some("event"),
        )
        .unwrap();
    engine
        .append(
            &json!([{"id": "txn_001", "amount": 99.99, "currency": "USD"}]),
            Some(date(2025, 10, 25)),
            Some("transaction"),
        )
        .unwrap();
    engine
        .append(
            &json!([{"id": "old_log_001", "message": "old entry"}]),
            Some(date(2025, 9, 10)),
            Some("log"),
        )
        .unwrap();

    assert!(dir.path().join("2025/10/log_01_20.parquet").exists());
    assert!(dir.path().join("2025/10/event_01_20.parquet").exists());
    assert!(dir.path().join("2025/10/transaction_21_31.parquet").exists());
    assert!(dir.path().join("2025/09/log_01_20.parquet").exists());
}

#[test]
fn test_discovery_filters_match_reference_scenario() {
    let (dir, config) = store(PartitionPolicy::FixedRange { days_per_file: 20 });
    let engine = IngestEngine::new(config).unwrap();

    engine
        .append(&records("log", 1, 2), Some(date(2025, 9, 10)), Some("log"))
        .unwrap();
    engine
        .append(&records("log", 3, 4), Some(date(2025, 10, 10)), Some("log"))
        .unwrap();
    engine
        .append(
            &records("evt", 1, 2),
            Some(date(2025, 10, 10)),
            Some("event"),
        )
        .unwrap();

    let files = discover(
        dir.path(),
        Some(naive(2025, 10, 1)),
        Some(naive(2025, 10, 31)),
        Some("log"),
    )
    .unwrap();

    assert_eq!(files, vec![dir.path().join("2025/10/log_01_20.parquet")]);
}

#[test]
fn test_concurrent_appends_conserve_rows() {
    let (dir, config) = store(PartitionPolicy::SizeBased {
        max_rows_per_file: 10_000,
    });
    let engine = Arc::new(IngestEngine::new(config).unwrap());

    let handles: Vec<_> = (0..8)
        .map(|worker| {
            let engine = Arc::clone(&engine);
            std::thread::spawn(move || {
                for batch in 0..5 {
                    let base = worker * 1000 + batch * 100;
                    engine
                        .append(
                            &records("log", base + 1, base + 25),
                            Some(date(2025, 10, 5)),
                            Some("log"),
                        )
                        .unwrap();
                }
            })
        })
        .collect();

    for handle in handles {
        handle.join().unwrap();
    }

    // 8 workers x 5 batches x 25 rows, none lost to racing rewrites
    let total: usize = discover_all(dir.path())
        .unwrap()
        .iter()
        .map(|p| parqstream::storage::partition_row_count(p).unwrap())
        .sum();
    assert_eq!(total, 8 * 5 * 25);
}

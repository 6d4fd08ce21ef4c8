//! Partition placement
//!
//! Maps `(date, type, pending-row-count)` plus the current on-disk state to
//! the partition file an incoming batch belongs to. Under the size-based
//! policy an overflow produces a rename instruction closing the previous
//! file to its actually-occupied day range; executing that rename (and any
//! other mutation) is the append engine's job, not this module's.

use super::types::{last_day_of_month, DayRange, PartitionKey, PartitionName};
use crate::config::PartitionPolicy;
use crate::error::{Error, Result};
use crate::storage::{partition_row_count, read_partition};
use arrow::array::TimestampMicrosecondArray;
use chrono::{DateTime, Datelike, NaiveDate};
use std::path::{Path, PathBuf};

/// Rename instruction closing an overflowed partition to its true range
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CloseOut {
    pub from: PathBuf,
    pub to: PathBuf,
}

/// Placement decision for an incoming batch
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Placement {
    /// Directory holding the group's files (`<root>/<year>/<month>`)
    pub dir: PathBuf,
    /// Target partition file name
    pub file_name: String,
    /// Full target path
    pub path: PathBuf,
    /// Rename to execute before writing, when an overflow closed a file
    pub close_out: Option<CloseOut>,
}

/// Resolves the target partition file for a batch
#[derive(Debug, Clone)]
pub struct PartitionLocator {
    root: PathBuf,
    policy: PartitionPolicy,
    date_field: String,
}

impl PartitionLocator {
    /// Create a locator over the given storage root
    pub fn new(root: impl Into<PathBuf>, policy: PartitionPolicy, date_field: impl Into<String>) -> Self {
        Self {
            root: root.into(),
            policy,
            date_field: date_field.into(),
        }
    }

    /// Locate the partition file for a batch of `incoming_rows` rows dated
    /// `date` with the given (already sanitized) type tag.
    ///
    /// Placement is re-derived from the file system on every call; no
    /// cached index exists to go stale.
    pub fn locate(&self, date: NaiveDate, type_tag: &str, incoming_rows: usize) -> Result<Placement> {
        let key = PartitionKey::new(date, type_tag);
        let dir = key.month_dir(&self.root);

        match self.policy {
            PartitionPolicy::FixedRange { days_per_file } => {
                Ok(Self::locate_fixed(&dir, &key, date, days_per_file))
            }
            PartitionPolicy::SizeBased { max_rows_per_file } => {
                self.locate_sized(&dir, &key, date, incoming_rows, max_rows_per_file)
            }
        }
    }

    /// Fixed-calendar placement: a pure function of the date, no metadata read
    fn locate_fixed(dir: &Path, key: &PartitionKey, date: NaiveDate, days_per_file: u32) -> Placement {
        let day = date.day();
        let last = last_day_of_month(key.year, key.month);

        let from_day = (day - 1) / days_per_file * days_per_file + 1;
        let to_day = (from_day + days_per_file - 1).min(last);

        let name = PartitionName::new(key.type_tag.clone(), DayRange::new(from_day, to_day));
        let file_name = name.file_name();
        Placement {
            dir: dir.to_path_buf(),
            path: dir.join(&file_name),
            file_name,
            close_out: None,
        }
    }

    /// Size-based placement with overflow close-and-split
    fn locate_sized(
        &self,
        dir: &Path,
        key: &PartitionKey,
        date: NaiveDate,
        incoming_rows: usize,
        max_rows_per_file: usize,
    ) -> Result<Placement> {
        let day = date.day();
        let last = last_day_of_month(key.year, key.month);

        // Most recent file whose range contains the day. After an overflow
        // the boundary day sits in both the closed file and its successor;
        // only the successor (greatest from_day) is open for appends.
        let entries = Self::list_group(dir, &key.type_tag)?;
        let current = entries
            .iter()
            .filter(|(name, _)| name.range.contains(day))
            .max_by_key(|(name, _)| name.range.from_day);

        let Some((name, path)) = current else {
            return Ok(Self::fresh_placement(dir, key, day, last));
        };

        let current_rows = partition_row_count(path)?;
        if current_rows + incoming_rows <= max_rows_per_file {
            return Ok(Placement {
                dir: dir.to_path_buf(),
                file_name: name.file_name(),
                path: path.clone(),
                close_out: None,
            });
        }

        // Overflow: close the file at the last day it actually holds, then
        // open a fresh file from the incoming date.
        let actual_last = self.actual_last_day(path)?;
        let closed = PartitionName::new(
            key.type_tag.clone(),
            DayRange::new(name.range.from_day, actual_last.max(name.range.from_day)),
        );
        let fresh = PartitionName::new(key.type_tag.clone(), DayRange::new(day, last));

        if fresh.file_name() == name.file_name() {
            // A full single-day file on the month's final stretch cannot
            // split any further; keep appending in place.
            return Ok(Placement {
                dir: dir.to_path_buf(),
                file_name: name.file_name(),
                path: path.clone(),
                close_out: None,
            });
        }

        let close_out = if closed.file_name() == name.file_name() {
            None
        } else {
            Some(CloseOut {
                from: path.clone(),
                to: dir.join(closed.file_name()),
            })
        };

        let file_name = fresh.file_name();
        Ok(Placement {
            dir: dir.to_path_buf(),
            path: dir.join(&file_name),
            file_name,
            close_out,
        })
    }

    fn fresh_placement(dir: &Path, key: &PartitionKey, from_day: u32, last: u32) -> Placement {
        let name = PartitionName::new(key.type_tag.clone(), DayRange::new(from_day, last));
        let file_name = name.file_name();
        Placement {
            dir: dir.to_path_buf(),
            path: dir.join(&file_name),
            file_name,
            close_out: None,
        }
    }

    /// Partition files of one `(year, month, type)` group, sorted by range
    fn list_group(dir: &Path, type_tag: &str) -> Result<Vec<(PartitionName, PathBuf)>> {
        let mut entries = Vec::new();

        let read_dir = match std::fs::read_dir(dir) {
            Ok(rd) => rd,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(entries),
            Err(e) => return Err(e.into()),
        };

        for entry in read_dir {
            let entry = entry?;
            let file_name = entry.file_name();
            let Some(file_name) = file_name.to_str() else {
                continue;
            };
            if let Some(name) = PartitionName::parse(file_name) {
                if name.type_tag == type_tag {
                    entries.push((name, entry.path()));
                }
            }
        }

        entries.sort_by_key(|(name, _)| name.range.from_day);
        Ok(entries)
    }

    /// True maximum day present in the file's logical-date column
    fn actual_last_day(&self, path: &Path) -> Result<u32> {
        let batch = read_partition(path)?;
        let idx = batch.schema().index_of(&self.date_field)?;
        let column = batch.column(idx);

        let timestamps = column
            .as_any()
            .downcast_ref::<TimestampMicrosecondArray>()
            .ok_or_else(|| {
                Error::ingest(format!(
                    "Column '{}' in {} is not a microsecond timestamp",
                    self.date_field,
                    path.display()
                ))
            })?;

        let max_micros = arrow::compute::max(timestamps).ok_or_else(|| {
            Error::ingest(format!(
                "Partition {} has no values in '{}'",
                path.display(),
                self.date_field
            ))
        })?;

        let dt = DateTime::from_timestamp_micros(max_micros).ok_or_else(|| {
            Error::ingest(format!(
                "Out-of-range timestamp in {}: {max_micros}",
                path.display()
            ))
        })?;

        Ok(dt.day())
    }
}

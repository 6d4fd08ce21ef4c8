//! Partition naming types
//!
//! A partition file is identified by `(year, month, type-tag, day-range)`.
//! The file name encodes the tag and the inclusive day range; the year and
//! month are encoded by the directory the file lives in.

use chrono::{Datelike, NaiveDate};
use once_cell::sync::Lazy;
use regex::Regex;
use std::path::{Path, PathBuf};

/// Tag used when the client supplies no data type
pub const DEFAULT_TYPE_TAG: &str = "default";

/// Extension of partition files
pub const PARTITION_EXT: &str = "parquet";

/// File name pattern: `<tag>_<from:2>_<to:2>.parquet`
static PARTITION_FILE_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"^([a-z0-9_-]+)_(\d{2})_(\d{2})\.parquet$").expect("valid partition file regex")
});

/// Sanitize a client-supplied data type into a partition type-tag.
///
/// Lower-cases and keeps only alphanumerics, `_` and `-`. An empty or
/// fully-rejected input falls back to [`DEFAULT_TYPE_TAG`].
pub fn sanitize_type_tag(raw: &str) -> String {
    let tag: String = raw
        .trim()
        .to_lowercase()
        .chars()
        .filter(|c| c.is_ascii_alphanumeric() || *c == '_' || *c == '-')
        .collect();

    if tag.is_empty() {
        DEFAULT_TYPE_TAG.to_string()
    } else {
        tag
    }
}

/// Inclusive day range within one month
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DayRange {
    pub from_day: u32,
    pub to_day: u32,
}

impl DayRange {
    /// Create a range; `from_day` must not exceed `to_day`
    pub fn new(from_day: u32, to_day: u32) -> Self {
        debug_assert!(from_day >= 1 && from_day <= to_day);
        Self { from_day, to_day }
    }

    /// Whether the given day of month falls inside this range
    pub fn contains(&self, day: u32) -> bool {
        day >= self.from_day && day <= self.to_day
    }

    /// Whether two ranges share any day beyond a single boundary day
    pub fn overlaps_beyond_boundary(&self, other: &DayRange) -> bool {
        let from = self.from_day.max(other.from_day);
        let to = self.to_day.min(other.to_day);
        to > from
    }
}

/// Parsed partition file name
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PartitionName {
    pub type_tag: String,
    pub range: DayRange,
}

impl PartitionName {
    pub fn new(type_tag: impl Into<String>, range: DayRange) -> Self {
        Self {
            type_tag: type_tag.into(),
            range,
        }
    }

    /// Render the on-disk file name, e.g. `log_05_31.parquet`
    pub fn file_name(&self) -> String {
        format!(
            "{}_{:02}_{:02}.{PARTITION_EXT}",
            self.type_tag, self.range.from_day, self.range.to_day
        )
    }

    /// Parse a file name back into its parts; `None` for foreign files
    pub fn parse(file_name: &str) -> Option<Self> {
        let caps = PARTITION_FILE_RE.captures(file_name)?;
        let type_tag = caps.get(1)?.as_str().to_string();
        let from_day: u32 = caps.get(2)?.as_str().parse().ok()?;
        let to_day: u32 = caps.get(3)?.as_str().parse().ok()?;
        if from_day < 1 || from_day > to_day || to_day > 31 {
            return None;
        }
        Some(Self {
            type_tag,
            range: DayRange { from_day, to_day },
        })
    }
}

/// The `(year, month, type)` group a batch belongs to
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PartitionKey {
    pub year: i32,
    pub month: u32,
    pub type_tag: String,
}

impl PartitionKey {
    /// Build the key for a logical date and an already-sanitized tag
    pub fn new(date: NaiveDate, type_tag: impl Into<String>) -> Self {
        Self {
            year: date.year(),
            month: date.month(),
            type_tag: type_tag.into(),
        }
    }

    /// Directory holding this group's partition files
    pub fn month_dir(&self, root: &Path) -> PathBuf {
        root.join(format!("{:04}", self.year))
            .join(format!("{:02}", self.month))
    }

    /// Stable identifier used for per-group locking
    pub fn group_id(&self) -> String {
        format!("{:04}/{:02}/{}", self.year, self.month, self.type_tag)
    }
}

/// Last day of the month containing the given date
pub fn last_day_of_month(year: i32, month: u32) -> u32 {
    let (next_year, next_month) = if month == 12 {
        (year + 1, 1)
    } else {
        (year, month + 1)
    };

    NaiveDate::from_ymd_opt(next_year, next_month, 1)
        .and_then(|d| d.pred_opt())
        .map_or(31, |d| d.day())
}

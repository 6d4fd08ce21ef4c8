//! Partition discovery
//!
//! Enumerates the partition files that can contain rows matching a date
//! range and/or type filter. Year and month directories that cannot overlap
//! the range are pruned by calendar comparison alone; no file is opened.
//! Day-range pruning within a surviving month is deliberately left to the
//! execution engine's row-level filtering.

use super::types::{sanitize_type_tag, PartitionName, PARTITION_EXT};
use crate::error::Result;
use chrono::{Datelike, NaiveDate};
use std::path::{Path, PathBuf};

/// Every partition file under the root, recursively.
///
/// A missing root yields an empty list, not an error.
pub fn discover_all(root: &Path) -> Result<Vec<PathBuf>> {
    let mut files = Vec::new();
    collect_recursive(root, &mut files)?;
    Ok(files)
}

/// Partition files that can contain rows in `[start, end]` of the given type.
///
/// With no filters this is equivalent to [`discover_all`]. Result order is
/// not significant; callers treat the list as a set.
pub fn discover(
    root: &Path,
    start: Option<NaiveDate>,
    end: Option<NaiveDate>,
    type_filter: Option<&str>,
) -> Result<Vec<PathBuf>> {
    if start.is_none() && end.is_none() && type_filter.is_none() {
        return discover_all(root);
    }

    let type_tag = type_filter.map(sanitize_type_tag);
    let mut files = Vec::new();

    for (year, year_dir) in numbered_subdirs(root)? {
        let year = year as i32;
        if let Some(start) = start {
            if year < start.year() {
                continue;
            }
        }
        if let Some(end) = end {
            if year > end.year() {
                continue;
            }
        }

        for (month, month_dir) in numbered_subdirs(&year_dir)? {
            if let Some(start) = start {
                if year == start.year() && month < start.month() {
                    continue;
                }
            }
            if let Some(end) = end {
                if year == end.year() && month > end.month() {
                    continue;
                }
            }

            for (file_name, path) in partition_files(&month_dir)? {
                if let Some(ref tag) = type_tag {
                    match PartitionName::parse(&file_name) {
                        Some(name) if name.type_tag == *tag => {}
                        _ => continue,
                    }
                }
                files.push(path);
            }
        }
    }

    Ok(files)
}

/// Immediate subdirectories whose names parse as numbers (years or months);
/// an absent parent directory yields no entries
fn numbered_subdirs(dir: &Path) -> Result<Vec<(u32, PathBuf)>> {
    let mut dirs = Vec::new();

    let read_dir = match std::fs::read_dir(dir) {
        Ok(rd) => rd,
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(dirs),
        Err(e) => return Err(e.into()),
    };

    for entry in read_dir {
        let entry = entry?;
        if !entry.file_type()?.is_dir() {
            continue;
        }
        let name = entry.file_name();
        let Some(name) = name.to_str() else {
            continue;
        };
        if let Ok(number) = name.parse::<u32>() {
            dirs.push((number, entry.path()));
        }
    }

    dirs.sort_by_key(|(number, _)| *number);
    Ok(dirs)
}

/// Parquet files directly inside a month directory
fn partition_files(dir: &Path) -> Result<Vec<(String, PathBuf)>> {
    let mut files = Vec::new();

    let read_dir = match std::fs::read_dir(dir) {
        Ok(rd) => rd,
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(files),
        Err(e) => return Err(e.into()),
    };

    for entry in read_dir {
        let entry = entry?;
        let path = entry.path();
        if path.extension().and_then(|e| e.to_str()) != Some(PARTITION_EXT) {
            continue;
        }
        let name = entry.file_name();
        if let Some(name) = name.to_str() {
            files.push((name.to_string(), path));
        }
    }

    Ok(files)
}

fn collect_recursive(dir: &Path, files: &mut Vec<PathBuf>) -> Result<()> {
    let read_dir = match std::fs::read_dir(dir) {
        Ok(rd) => rd,
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(()),
        Err(e) => return Err(e.into()),
    };

    for entry in read_dir {
        let entry = entry?;
        let path = entry.path();
        if entry.file_type()?.is_dir() {
            collect_recursive(&path, files)?;
        } else if path.extension().and_then(|e| e.to_str()) == Some(PARTITION_EXT) {
            files.push(path);
        }
    }

    Ok(())
}

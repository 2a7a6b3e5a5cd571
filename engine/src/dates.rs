//! Date classification.
//!
//! A candidate's bucket is the calendar date of its filesystem modification
//! time. The bucket directory is named `YYYY-MM-DD` and destination file
//! names start with the same date without separators.

use chrono::{DateTime, Local, NaiveDate, Utc};
use serde::Serialize;
use std::fmt;
use std::fs;
use std::path::Path;
use std::time::SystemTime;

use crate::error::EngineError;

/// Which clock a modification time is converted with.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize)]
pub enum DateBasis {
    /// The machine's local timezone
    #[default]
    Local,
    /// UTC regardless of the local timezone
    Utc,
}

/// A destination date bucket.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
pub struct DateBucket {
    date: NaiveDate,
}

impl DateBucket {
    pub fn new(date: NaiveDate) -> Self {
        DateBucket { date }
    }

    pub fn from_system_time(time: SystemTime, basis: DateBasis) -> Self {
        let date = match basis {
            DateBasis::Local => DateTime::<Local>::from(time).date_naive(),
            DateBasis::Utc => DateTime::<Utc>::from(time).date_naive(),
        };
        DateBucket { date }
    }

    pub fn date(&self) -> NaiveDate {
        self.date
    }

    /// Directory name, e.g. `2024-01-15`.
    pub fn dir_name(&self) -> String {
        self.date.format("%Y-%m-%d").to_string()
    }

    /// File name prefix, e.g. `20240115`.
    pub fn compact(&self) -> String {
        self.date.format("%Y%m%d").to_string()
    }
}

impl fmt::Display for DateBucket {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.dir_name())
    }
}

/// Classify a file by its modification date.
///
/// # Errors
/// Returns `EngineError::TimestampUnavailable` when the file's metadata or
/// modification time cannot be read (the file vanished, permissions, or a
/// platform without mtime support).
pub fn classify(path: &Path, basis: DateBasis) -> Result<DateBucket, EngineError> {
    let modified = fs::metadata(path)
        .and_then(|metadata| metadata.modified())
        .map_err(|e| EngineError::TimestampUnavailable {
            path: path.to_path_buf(),
            source: e,
        })?;

    Ok(DateBucket::from_system_time(modified, basis))
}

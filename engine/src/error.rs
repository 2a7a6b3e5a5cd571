//! Error types for the sorting engine.
//!
//! `EngineError` covers two groups of failures:
//! - setup errors, which prevent a job from being planned or run at all
//! - per-file errors, which the job converts into an `Outcome` for the
//!   candidate that hit them and never lets past the candidate boundary

use std::io;
use std::path::PathBuf;
use thiserror::Error;

use crate::model::JobState;

/// Errors produced by the engine.
///
/// Setup errors (see [`EngineError::is_setup_error`]) are returned from
/// `create_job`, `plan_job` and `run_job`. Every other variant is produced
/// while processing a single candidate and ends up as the reason string of
/// a skipped outcome.
#[derive(Debug, Error)]
pub enum EngineError {
    /// Input directory does not exist
    #[error("Input directory not found: {}", path.display())]
    InputNotFound { path: PathBuf },

    /// Input path exists but is not a directory
    #[error("Input path is not a directory: {}", path.display())]
    InputNotDirectory { path: PathBuf },

    /// Input directory cannot be inspected (permissions)
    #[error("Input directory access denied: {}: {source}", path.display())]
    InputAccessDenied { path: PathBuf, source: io::Error },

    /// Failed to enumerate the input tree at its root
    #[error("Failed to enumerate directory: {}: {source}", path.display())]
    EnumerationFailed { path: PathBuf, source: io::Error },

    /// Path is empty or otherwise unusable
    #[error("Invalid path: {} ({reason})", path.display())]
    InvalidPath { path: PathBuf, reason: String },

    /// Lifecycle function called on a job in the wrong state
    #[error("Job is {actual:?}; expected {expected}")]
    InvalidState {
        actual: JobState,
        expected: &'static str,
    },

    /// Modification time of a candidate could not be read
    #[error("Cannot read modification time: {}: {source}", path.display())]
    TimestampUnavailable { path: PathBuf, source: io::Error },

    /// Failed to read from a file
    #[error("Failed to read file: {}: {source}", path.display())]
    ReadError { path: PathBuf, source: io::Error },

    /// Failed to write to a destination file
    #[error("Failed to write file: {}: {source}", path.display())]
    WriteError { path: PathBuf, source: io::Error },

    /// Failed to create or list a bucket directory
    #[error("Failed to create directory: {}: {source}", path.display())]
    DirectoryCreationFailed { path: PathBuf, source: io::Error },
}

impl EngineError {
    /// True for errors that stop a job before any outcome is produced.
    pub fn is_setup_error(&self) -> bool {
        matches!(
            self,
            Self::InputNotFound { .. }
                | Self::InputNotDirectory { .. }
                | Self::InputAccessDenied { .. }
                | Self::EnumerationFailed { .. }
                | Self::InvalidPath { .. }
                | Self::InvalidState { .. }
        )
    }
}

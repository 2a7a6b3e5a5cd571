//! Core data model for sorting jobs.
//!
//! This module defines the main data structures for one engine invocation:
//! - SortJob: the whole run, owning its candidates and digest cache
//! - Candidate: a media file discovered under the input root
//! - Outcome / OutcomeRecord: what happened to one candidate
//! - RunSummary: aggregate totals for a run
//! - JobState, CancelToken: lifecycle and cooperative stop

use serde::Serialize;
use std::path::PathBuf;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::{Duration, SystemTime};
use uuid::Uuid;

use crate::cache::FolderHashCache;
use crate::config::SortOptions;

/// One sorting run over an input tree.
///
/// A SortJob encompasses:
/// - Input and output roots plus the options the run uses
/// - Every candidate found by planning, with its outcome once processed
/// - The digest cache for the buckets visited so far
/// - Running totals and lifecycle state
#[derive(Debug)]
pub struct SortJob {
    /// Unique identifier, attached to every log line of the run
    pub id: Uuid,

    pub input_root: PathBuf,
    pub output_root: PathBuf,
    pub options: SortOptions,

    /// Candidates in discovery order
    pub candidates: Vec<Candidate>,

    pub state: JobState,

    /// Index of the next candidate to process
    pub(crate) cursor: usize,

    pub(crate) cache: FolderHashCache,

    pub(crate) summary: RunSummary,

    pub(crate) cancel: CancelToken,

    pub start_time: Option<SystemTime>,
    pub end_time: Option<SystemTime>,
}

impl SortJob {
    /// Number of candidates found by planning.
    pub fn total(&self) -> usize {
        self.candidates.len()
    }

    /// Totals so far; final once the job is Completed or Cancelled.
    pub fn summary(&self) -> RunSummary {
        self.summary
    }

    /// Wall-clock time between the first and last processed step.
    ///
    /// `None` until the job has finished.
    pub fn elapsed(&self) -> Option<Duration> {
        let start = self.start_time?;
        self.end_time?.duration_since(start).ok()
    }

    pub fn cache(&self) -> &FolderHashCache {
        &self.cache
    }

    /// Share a stop flag with this job. It is checked between candidates.
    pub fn set_cancel_token(&mut self, token: CancelToken) {
        self.cancel = token;
    }

    pub fn cancel_token(&self) -> CancelToken {
        self.cancel.clone()
    }
}

/// A media file discovered under the input root.
#[derive(Debug, Clone)]
pub struct Candidate {
    pub source_path: PathBuf,

    /// Lowercased, without the leading dot
    pub extension: String,

    /// Set once the candidate has been processed
    pub outcome: Option<Outcome>,
}

impl Candidate {
    pub fn new(source_path: PathBuf, extension: String) -> Self {
        Candidate {
            source_path,
            extension,
            outcome: None,
        }
    }
}

/// What happened to one candidate.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Outcome {
    /// Copied into its bucket under a new name
    Copied {
        file_name: String,
        destination: PathBuf,
    },
    /// Bucket already holds a file with the same content
    SkippedDuplicate { bucket: String },
    /// Modification time could not be read
    SkippedUnreadableDate { reason: String },
    /// Reading, hashing or writing failed
    SkippedCopyError { reason: String },
}

impl Outcome {
    pub fn is_copied(&self) -> bool {
        matches!(self, Outcome::Copied { .. })
    }

    /// Short label for display.
    pub fn label(&self) -> &'static str {
        match self {
            Outcome::Copied { .. } => "copied",
            Outcome::SkippedDuplicate { .. } => "duplicate",
            Outcome::SkippedUnreadableDate { .. } => "unreadable date",
            Outcome::SkippedCopyError { .. } => "copy error",
        }
    }
}

/// A per-candidate result, tagged for progress reporting.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct OutcomeRecord {
    /// 1-based position in discovery order
    pub index: usize,
    pub total: usize,
    pub source_path: PathBuf,
    pub outcome: Outcome,
}

/// Aggregate totals for one run.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct RunSummary {
    pub total: usize,
    pub copied: usize,
    pub skipped: usize,
    /// True if a stop request ended the run before every candidate was seen
    pub cancelled: bool,
}

impl RunSummary {
    /// Candidates processed so far.
    pub fn processed(&self) -> usize {
        self.copied + self.skipped
    }
}

/// The lifecycle state of a job.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum JobState {
    /// Created, not yet enumerated
    Pending,
    /// Candidates enumerated, nothing processed
    Planned,
    /// Processing candidates
    Running,
    /// Every candidate processed
    Completed,
    /// Stopped early on request
    Cancelled,
}

impl JobState {
    /// Returns true if this state is terminal (no further changes expected).
    pub fn is_terminal(&self) -> bool {
        matches!(self, JobState::Completed | JobState::Cancelled)
    }
}

/// Cooperative stop flag shared between a job and whoever controls it.
#[derive(Debug, Clone, Default)]
pub struct CancelToken(Arc<AtomicBool>);

impl CancelToken {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn cancel(&self) {
        self.0.store(true, Ordering::SeqCst);
    }

    pub fn is_cancelled(&self) -> bool {
        self.0.load(Ordering::SeqCst)
    }
}

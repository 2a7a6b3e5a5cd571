//! Progress reporting trait.
//!
//! This module defines the ProgressCallback trait, which keeps the engine
//! free of any UI concerns. The CLI and the background worker both
//! subscribe to a run through it.

use crate::model::{OutcomeRecord, RunSummary, SortJob};

/// Trait for receiving progress updates from a sorting job.
///
/// All methods are called synchronously by `run_job`, on the thread that
/// runs the job. Implementations that hand updates to another thread
/// should do so without blocking.
pub trait ProgressCallback: Send {
    /// Called once before the first candidate, with the planned total known.
    fn on_run_started(&self, job: &SortJob);

    /// Called after each candidate has been processed.
    fn on_candidate_completed(&self, job: &SortJob, record: &OutcomeRecord);

    /// Called once when the run is complete or was cancelled.
    fn on_run_completed(&self, job: &SortJob, summary: &RunSummary);
}

//! Job orchestration module.
//!
//! This module provides the job lifecycle:
//! - Creating a job from input/output paths
//! - Planning a job (enumerating media candidates)
//! - Processing candidates one at a time, either pulled through
//!   `SortJob::outcomes` or driven by `run_job` with a progress callback
//!
//! Candidates are processed strictly in order. A candidate's digest is
//! registered in its bucket's cached set before the next candidate is
//! checked, which is what keeps two identical inputs from both landing in
//! the same bucket. Any parallel version needs a per-bucket lock around
//! check, copy and register.

use std::fs;
use std::io;
use std::path::Path;
use std::time::SystemTime;
use tracing::{debug, info, info_span, warn};
use uuid::Uuid;

use crate::cache::FolderHashCache;
use crate::checksums::compute_file_digest;
use crate::config::{CollisionPolicy, SortOptions};
use crate::dates;
use crate::error::EngineError;
use crate::fs_ops;
use crate::model::{CancelToken, JobState, Outcome, OutcomeRecord, RunSummary, SortJob};
use crate::naming;
use crate::progress::ProgressCallback;

/// Create a new sorting job.
///
/// Validates that the input root exists, is a directory and can be listed.
/// The output root may not exist yet; it is created when the first bucket
/// is.
///
/// # Errors
/// Returns a setup error (`InputNotFound`, `InputNotDirectory`,
/// `InputAccessDenied`, `InvalidPath`) if the paths are unusable.
pub fn create_job<P: AsRef<Path>, Q: AsRef<Path>>(
    input_root: P,
    output_root: Q,
    options: SortOptions,
) -> Result<SortJob, EngineError> {
    let input_root = input_root.as_ref();
    let output_root = output_root.as_ref();

    match fs::metadata(input_root) {
        Ok(metadata) => {
            if !metadata.is_dir() {
                return Err(EngineError::InputNotDirectory {
                    path: input_root.to_path_buf(),
                });
            }
        }
        Err(e) if e.kind() == io::ErrorKind::NotFound => {
            return Err(EngineError::InputNotFound {
                path: input_root.to_path_buf(),
            });
        }
        Err(e) => {
            return Err(EngineError::InputAccessDenied {
                path: input_root.to_path_buf(),
                source: e,
            });
        }
    }

    fs::read_dir(input_root).map_err(|e| EngineError::InputAccessDenied {
        path: input_root.to_path_buf(),
        source: e,
    })?;

    if output_root.as_os_str().is_empty() {
        return Err(EngineError::InvalidPath {
            path: output_root.to_path_buf(),
            reason: "Output path is empty".to_string(),
        });
    }
    if output_root.exists() && !output_root.is_dir() {
        return Err(EngineError::InvalidPath {
            path: output_root.to_path_buf(),
            reason: "Output path exists but is not a directory".to_string(),
        });
    }

    let job = SortJob {
        id: Uuid::new_v4(),
        input_root: input_root.to_path_buf(),
        output_root: output_root.to_path_buf(),
        cache: FolderHashCache::new(options.algorithm),
        options,
        candidates: Vec::new(),
        state: JobState::Pending,
        cursor: 0,
        summary: RunSummary::default(),
        cancel: CancelToken::new(),
        start_time: None,
        end_time: None,
    };

    info!(
        run_id = %job.id,
        "Created job {} -> {}",
        job.input_root.display(),
        job.output_root.display()
    );
    Ok(job)
}

/// Plan a job by enumerating the input tree.
///
/// Populates `job.candidates` with every file whose extension is on the
/// allowlist, in discovery order. The whole list is collected before any
/// processing so progress can be reported against a fixed total.
///
/// # Errors
/// Returns `InvalidState` unless the job is Pending, and
/// `EnumerationFailed` if the input root cannot be read.
pub fn plan_job(job: &mut SortJob) -> Result<(), EngineError> {
    if job.state != JobState::Pending {
        return Err(EngineError::InvalidState {
            actual: job.state,
            expected: "Pending",
        });
    }

    job.candidates = fs_ops::enumerate_candidates(&job.input_root, &job.options)?;
    job.summary = RunSummary {
        total: job.candidates.len(),
        ..RunSummary::default()
    };
    job.state = JobState::Planned;

    info!(run_id = %job.id, "Planned {} media candidates", job.candidates.len());
    Ok(())
}

/// Run a planned job to the end.
///
/// Invokes progress callbacks at appropriate points. Individual candidate
/// failures are recorded as outcomes and do NOT stop the run; a set cancel
/// token stops it between candidates.
///
/// # Errors
/// Returns `InvalidState` unless the job is Planned.
pub fn run_job(
    job: &mut SortJob,
    progress_callback: Option<&dyn ProgressCallback>,
) -> Result<RunSummary, EngineError> {
    if job.state != JobState::Planned {
        return Err(EngineError::InvalidState {
            actual: job.state,
            expected: "Planned",
        });
    }

    if let Some(callback) = progress_callback {
        callback.on_run_started(job);
    }

    while let Some(record) = job.process_next() {
        if let Some(callback) = progress_callback {
            callback.on_candidate_completed(job, &record);
        }
    }

    let summary = job.summary();
    if let Some(callback) = progress_callback {
        callback.on_run_completed(job, &summary);
    }

    Ok(summary)
}

/// Create, plan and run a job in one call.
pub fn sort_media<P: AsRef<Path>, Q: AsRef<Path>>(
    input_root: P,
    output_root: Q,
    options: SortOptions,
    progress_callback: Option<&dyn ProgressCallback>,
) -> Result<RunSummary, EngineError> {
    let mut job = create_job(input_root, output_root, options)?;
    plan_job(&mut job)?;
    run_job(&mut job, progress_callback)
}

/// Pull-based view of a job's remaining outcomes.
///
/// Each call to `next` processes exactly one candidate.
pub struct Outcomes<'a> {
    job: &'a mut SortJob,
}

impl Iterator for Outcomes<'_> {
    type Item = OutcomeRecord;

    fn next(&mut self) -> Option<Self::Item> {
        self.job.process_next()
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        let remaining = self.job.candidates.len().saturating_sub(self.job.cursor);
        (0, Some(remaining))
    }
}

impl SortJob {
    /// Iterate over outcomes, processing candidates lazily.
    pub fn outcomes(&mut self) -> Outcomes<'_> {
        Outcomes { job: self }
    }

    /// Process the next candidate and return its record.
    ///
    /// Returns `None` once every candidate is done, when the cancel token
    /// is set, or if the job was never planned.
    pub fn process_next(&mut self) -> Option<OutcomeRecord> {
        match self.state {
            JobState::Planned => {
                self.state = JobState::Running;
                self.start_time = Some(SystemTime::now());
            }
            JobState::Running => {}
            _ => return None,
        }

        let span = info_span!("sort_run", run_id = %self.id);
        let _guard = span.enter();

        if self.cursor >= self.candidates.len() {
            self.finish(JobState::Completed);
            return None;
        }
        if self.cancel.is_cancelled() {
            self.finish(JobState::Cancelled);
            return None;
        }

        let index = self.cursor;
        let outcome = self.process_candidate(index);
        self.cursor += 1;

        if outcome.is_copied() {
            self.summary.copied += 1;
        } else {
            self.summary.skipped += 1;
        }

        let candidate = &mut self.candidates[index];
        candidate.outcome = Some(outcome.clone());

        Some(OutcomeRecord {
            index: index + 1,
            total: self.summary.total,
            source_path: candidate.source_path.clone(),
            outcome,
        })
    }

    fn finish(&mut self, state: JobState) {
        self.state = state;
        self.end_time = Some(SystemTime::now());
        self.summary.cancelled = state == JobState::Cancelled;

        if self.cache.unhashable_existing() > 0 {
            warn!(
                "{} existing files could not be hashed and were left out of duplicate checks",
                self.cache.unhashable_existing()
            );
        }
        info!(
            total = self.summary.total,
            copied = self.summary.copied,
            skipped = self.summary.skipped,
            cancelled = self.summary.cancelled,
            "Run finished"
        );
    }

    /// Classify, deduplicate, name and copy one candidate.
    fn process_candidate(&mut self, index: usize) -> Outcome {
        let candidate = &self.candidates[index];
        let source = candidate.source_path.as_path();

        let bucket = match dates::classify(source, self.options.date_basis) {
            Ok(bucket) => bucket,
            Err(e) => {
                warn!("Skipping {}: {}", source.display(), e);
                return Outcome::SkippedUnreadableDate {
                    reason: e.to_string(),
                };
            }
        };

        let bucket_dir = self.output_root.join(bucket.dir_name());
        if let Err(e) = self.cache.get_or_build(&bucket_dir) {
            warn!("Skipping {}: {}", source.display(), e);
            return Outcome::SkippedCopyError {
                reason: e.to_string(),
            };
        }

        let digest = match compute_file_digest(source, self.options.algorithm) {
            Ok(digest) => digest,
            Err(e) => {
                warn!("Skipping {}: {}", source.display(), e);
                return Outcome::SkippedCopyError {
                    reason: e.to_string(),
                };
            }
        };

        if self.cache.contains(&bucket_dir, &digest) {
            debug!("{} already present in {}", source.display(), bucket);
            return Outcome::SkippedDuplicate {
                bucket: bucket.dir_name(),
            };
        }

        let policy = self.options.collision_policy;
        let file_name =
            match naming::allocate_name(&bucket_dir, &bucket, &candidate.extension, policy) {
                Ok(name) => name,
                Err(e) => {
                    warn!("Skipping {}: {}", source.display(), e);
                    return Outcome::SkippedCopyError {
                        reason: e.to_string(),
                    };
                }
            };

        let destination = bucket_dir.join(&file_name);
        let overwrite = policy == CollisionPolicy::Overwrite;
        match fs_ops::copy_file_with_metadata(source, &destination, overwrite) {
            Ok(bytes) => {
                debug!(
                    "Copied {} -> {} ({} bytes)",
                    source.display(),
                    destination.display(),
                    bytes
                );
                self.cache.add(&bucket_dir, digest);
                Outcome::Copied {
                    file_name,
                    destination,
                }
            }
            Err(e) => {
                warn!("Copy failed for {}: {}", source.display(), e);
                Outcome::SkippedCopyError {
                    reason: e.to_string(),
                }
            }
        }
    }
}

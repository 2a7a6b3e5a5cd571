//! # MediaSort Engine - Date-Bucketed Media Import
//!
//! A headless engine that imports photos and videos from an input tree into
//! date-named folders, skipping files whose content is already there.
//! Designed as the foundation for multiple front ends (CLI, GUI, automation).
//!
//! ## Overview
//!
//! For each media file found under the input root, the engine:
//! - buckets it by the calendar date of its modification time (`YYYY-MM-DD`)
//! - skips it if a file with the same content digest is already in that bucket
//! - otherwise copies it in as `YYYYMMDD-NNNN.ext`, where `NNNN` is one more
//!   than the number of files already in the bucket
//!
//! Per-file failures become outcomes and never stop a run. Only an unusable
//! input root is reported as an error.
//!
//! ## Basic Usage
//!
//! ```no_run
//! use engine::{create_job, plan_job, Outcome, SortOptions};
//!
//! # fn main() -> Result<(), Box<dyn std::error::Error>> {
//! let mut job = create_job("/media/card/DCIM", "/photos", SortOptions::default())?;
//! plan_job(&mut job)?;
//!
//! for record in job.outcomes() {
//!     if let Outcome::Copied { file_name, .. } = &record.outcome {
//!         println!("[{}/{}] {}", record.index, record.total, file_name);
//!     }
//! }
//!
//! let summary = job.summary();
//! println!("{} copied, {} skipped", summary.copied, summary.skipped);
//! # Ok(())
//! # }
//! ```
//!
//! ## Modules
//!
//! - **model**: Core data structures (SortJob, Candidate, Outcome, RunSummary)
//! - **config**: Run options and the default extension allowlist
//! - **error**: Error types and handling
//! - **checksums**: Streaming content digests
//! - **dates**: Date classification
//! - **cache**: Per-bucket digest cache
//! - **naming**: Destination name allocation
//! - **fs_ops**: Low-level filesystem operations
//! - **job**: Job orchestration (create, plan, run)
//! - **progress**: Progress callback trait
//! - **worker**: Background execution with channel-based updates

pub mod cache;
pub mod checksums;
pub mod config;
pub mod dates;
pub mod error;
pub mod fs_ops;
pub mod job;
pub mod model;
pub mod naming;
pub mod progress;
pub mod worker;

// Re-export main types and functions
pub use cache::FolderHashCache;
pub use checksums::{compute_file_digest, ChecksumAlgorithm, ContentDigest};
pub use config::{CollisionPolicy, SortOptions, DEFAULT_EXTENSIONS};
pub use dates::{classify, DateBasis, DateBucket};
pub use error::EngineError;
pub use job::{create_job, plan_job, run_job, sort_media, Outcomes};
pub use model::{
    CancelToken, Candidate, JobState, Outcome, OutcomeRecord, RunSummary, SortJob,
};
pub use naming::{allocate_name, format_name};
pub use progress::ProgressCallback;
pub use worker::{spawn_run, ChannelProgress, RunEvent, RunHandle};

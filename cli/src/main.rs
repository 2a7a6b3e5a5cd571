//! MediaSort - Command-line interface for the sorting engine.
//!
//! Imports media from a source tree into date-named folders under the
//! destination, skipping content that is already there. Prints one line per
//! file above a progress bar, then a summary.

use chrono::Local;
use clap::Parser;
use engine::{
    create_job, plan_job, run_job, ChecksumAlgorithm, CollisionPolicy, DateBasis, Outcome,
    OutcomeRecord, ProgressCallback, RunSummary, SortJob, SortOptions,
};
use indicatif::{ProgressBar, ProgressStyle};
use std::path::PathBuf;
use tracing::debug;
use tracing_subscriber::EnvFilter;

/// MediaSort - sort photos and videos into dated folders
#[derive(Parser, Debug)]
#[command(name = "mediasort")]
#[command(version = "0.1.0")]
#[command(about = "Copy media into YYYY-MM-DD folders, skipping duplicates")]
struct Args {
    /// Source directory (searched recursively)
    #[arg(long, value_name = "PATH")]
    src: PathBuf,

    /// Destination directory (created if missing)
    #[arg(long, value_name = "PATH")]
    dst: PathBuf,

    /// Comma-separated extensions to import (default: jpg,jpeg,png,mp4,cr3,cr2,mov)
    #[arg(long, value_name = "EXT", value_delimiter = ',')]
    ext: Vec<String>,

    /// Digest algorithm for duplicate detection: md5, sha256, blake3
    #[arg(long, value_name = "ALGORITHM", default_value = "sha256")]
    hash: String,

    /// What to do when the next sequential name is taken: advance or overwrite
    #[arg(long, value_name = "POLICY", default_value = "advance")]
    on_collision: String,

    /// Bucket by UTC date instead of local date
    #[arg(long)]
    utc: bool,

    /// Enable verbose output
    #[arg(long)]
    verbose: bool,

    /// Print the final summary as JSON on stdout
    #[arg(long)]
    json: bool,
}

/// CLI implementation of ProgressCallback for displaying sorting progress
struct CliProgress {
    bar: ProgressBar,
}

impl CliProgress {
    fn new() -> Self {
        let bar = ProgressBar::hidden();
        bar.set_style(
            ProgressStyle::with_template("{bar:30.cyan/blue} {pos}/{len} [{elapsed_precise}] {msg}")
                .unwrap_or_else(|_| ProgressStyle::default_bar()),
        );
        CliProgress { bar }
    }

    fn format_record(record: &OutcomeRecord) -> String {
        let source = record.source_path.display();
        let prefix = format!("[{}/{}]", record.index, record.total);
        match &record.outcome {
            Outcome::Copied { file_name, .. } => format!("{} {} → {}", prefix, source, file_name),
            Outcome::SkippedDuplicate { bucket } => {
                format!("{} {} → skipped: identical file already in {}", prefix, source, bucket)
            }
            Outcome::SkippedUnreadableDate { reason } => {
                format!("{} {} → skipped: modification date unreadable ({})", prefix, source, reason)
            }
            Outcome::SkippedCopyError { reason } => {
                format!("{} error: {} ({})", prefix, source, reason)
            }
        }
    }

    fn format_duration(elapsed: std::time::Duration) -> String {
        let secs = elapsed.as_secs();
        let hours = secs / 3600;
        let mins = (secs % 3600) / 60;
        let secs = secs % 60;

        if hours > 0 {
            format!("{}h {}m {}s", hours, mins, secs)
        } else if mins > 0 {
            format!("{}m {}s", mins, secs)
        } else {
            format!("{}s", secs)
        }
    }
}

impl ProgressCallback for CliProgress {
    fn on_run_started(&self, job: &SortJob) {
        eprintln!("=== Sort started: {} ===", Local::now().format("%Y-%m-%d %H:%M:%S"));
        eprintln!("  Source: {}", job.input_root.display());
        eprintln!("  Destination: {}", job.output_root.display());
        eprintln!("  Media files: {}", job.total());
        eprintln!();

        if job.total() > 0 {
            self.bar.set_length(job.total() as u64);
            self.bar.set_draw_target(indicatif::ProgressDrawTarget::stderr());
        }
    }

    fn on_candidate_completed(&self, _job: &SortJob, record: &OutcomeRecord) {
        self.bar.println(Self::format_record(record));
        self.bar.set_message(record.outcome.label());
        self.bar.inc(1);
    }

    fn on_run_completed(&self, job: &SortJob, summary: &RunSummary) {
        self.bar.finish_and_clear();

        if summary.total == 0 {
            eprintln!("No media files to copy.");
            return;
        }

        eprintln!(
            "=== Done: {} total, {} copied, {} skipped ===",
            summary.total, summary.copied, summary.skipped
        );
        if summary.cancelled {
            eprintln!(
                "Stopped early: {} of {} files were not processed",
                summary.total - summary.processed(),
                summary.total
            );
        }
        if let Some(elapsed) = job.elapsed() {
            eprintln!("Elapsed: {}", Self::format_duration(elapsed));
        }

        let failures: Vec<_> = job
            .candidates
            .iter()
            .filter_map(|c| match &c.outcome {
                Some(Outcome::SkippedCopyError { reason }) => Some((&c.source_path, reason)),
                _ => None,
            })
            .collect();
        if !failures.is_empty() {
            eprintln!();
            eprintln!("Failed files:");
            for (path, reason) in failures {
                eprintln!("  {}: {}", path.display(), reason);
            }
        }
    }
}

/// Parse and validate command-line arguments, then run the job
fn main() {
    let args = Args::parse();
    init_tracing(args.verbose);

    let exit_code = match run_cli(&args) {
        Ok(report) => {
            if args.json {
                match serde_json::to_string_pretty(&report.summary) {
                    Ok(json) => println!("{}", json),
                    Err(e) => eprintln!("Error: failed to encode summary: {}", e),
                }
            }
            if report.copy_errors > 0 {
                eprintln!("Error: {} file(s) failed to copy", report.copy_errors);
                2
            } else {
                0
            }
        }
        Err(msg) => {
            eprintln!("Error: {}", msg);
            2
        }
    };

    std::process::exit(exit_code);
}

/// Install the stderr log subscriber. `RUST_LOG` wins over `--verbose`.
fn init_tracing(verbose: bool) {
    let default_level = if verbose { "info" } else { "warn" };
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level));

    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .try_init();
}

/// Map command-line arguments onto engine options
fn build_options(args: &Args) -> Result<SortOptions, String> {
    let algorithm = ChecksumAlgorithm::from_str(&args.hash).ok_or_else(|| {
        format!(
            "Invalid hash algorithm '{}'. Must be 'md5', 'sha256', or 'blake3'",
            args.hash
        )
    })?;

    let collision_policy = CollisionPolicy::from_str(&args.on_collision).ok_or_else(|| {
        format!(
            "Invalid collision policy '{}'. Must be 'advance' or 'overwrite'",
            args.on_collision
        )
    })?;

    let mut options = SortOptions::default()
        .with_algorithm(algorithm)
        .with_collision_policy(collision_policy)
        .with_date_basis(if args.utc { DateBasis::Utc } else { DateBasis::Local });

    if !args.ext.is_empty() {
        options = options.with_extensions(&args.ext);
        if options.extensions.is_empty() {
            return Err("Extension list is empty".to_string());
        }
    }

    Ok(options)
}

/// Result of a run that got past setup
#[derive(Debug)]
struct RunReport {
    summary: RunSummary,
    /// Candidates that ended in a copy error
    copy_errors: usize,
}

/// Main CLI logic - separated for testability
///
/// Setup and argument errors come back as `Err`. Per-file copy errors do
/// not: the summary is still returned so it can be reported.
fn run_cli(args: &Args) -> Result<RunReport, String> {
    let options = build_options(args)?;
    debug!(?options, "Resolved options");

    let mut job = create_job(&args.src, &args.dst, options)
        .map_err(|e| format!("Job creation failed: {}", e))?;

    plan_job(&mut job).map_err(|e| format!("Job planning failed: {}", e))?;

    let progress = CliProgress::new();
    let summary =
        run_job(&mut job, Some(&progress)).map_err(|e| format!("Job execution failed: {}", e))?;

    let copy_errors = job
        .candidates
        .iter()
        .filter(|c| matches!(c.outcome, Some(Outcome::SkippedCopyError { .. })))
        .count();

    Ok(RunReport {
        summary,
        copy_errors,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use filetime::FileTime;
    use std::fs;
    use tempfile::TempDir;

    fn args(src: PathBuf, dst: PathBuf) -> Args {
        Args {
            src,
            dst,
            ext: Vec::new(),
            hash: "sha256".to_string(),
            on_collision: "advance".to_string(),
            utc: true,
            verbose: false,
            json: false,
        }
    }

    fn write_dated(path: &std::path::Path, content: &[u8], unix_secs: i64) {
        fs::write(path, content).expect("Failed to write file");
        filetime::set_file_mtime(path, FileTime::from_unix_time(unix_secs, 0))
            .expect("Failed to set mtime");
    }

    // 2024-01-15 12:00:00 UTC
    const JAN_15_NOON_UTC: i64 = 1_705_320_000;

    #[test]
    fn test_cli_with_valid_directories() {
        let src_dir = TempDir::new().expect("Failed to create temp dir");
        let dst_dir = TempDir::new().expect("Failed to create temp dir");
        write_dated(&src_dir.path().join("photo.jpg"), b"hello", JAN_15_NOON_UTC);

        let report = run_cli(&args(src_dir.path().to_path_buf(), dst_dir.path().to_path_buf()))
            .expect("CLI should succeed with valid directories");
        let summary = report.summary;
        assert_eq!(report.copy_errors, 0);
        assert_eq!((summary.total, summary.copied, summary.skipped), (1, 1, 0));
        assert!(dst_dir
            .path()
            .join("2024-01-15")
            .join("20240115-0001.jpg")
            .exists());
    }

    #[test]
    fn test_cli_second_run_skips_everything() {
        let src_dir = TempDir::new().expect("Failed to create temp dir");
        let dst_dir = TempDir::new().expect("Failed to create temp dir");
        write_dated(&src_dir.path().join("a.png"), b"a", JAN_15_NOON_UTC);
        write_dated(&src_dir.path().join("b.mov"), b"b", JAN_15_NOON_UTC);

        let a = args(src_dir.path().to_path_buf(), dst_dir.path().to_path_buf());
        run_cli(&a).expect("First run should succeed");
        let summary = run_cli(&a).expect("Second run should succeed").summary;
        assert_eq!(summary.copied, 0);
        assert_eq!(summary.skipped, 2);
    }

    #[test]
    fn test_cli_empty_source() {
        let src_dir = TempDir::new().expect("Failed to create temp dir");
        let dst_dir = TempDir::new().expect("Failed to create temp dir");

        let summary = run_cli(&args(src_dir.path().to_path_buf(), dst_dir.path().join("out")))
            .expect("Empty source is not an error")
            .summary;
        assert_eq!(summary, RunSummary::default());
        assert!(!dst_dir.path().join("out").exists());
    }

    #[test]
    fn test_cli_custom_extensions() {
        let src_dir = TempDir::new().expect("Failed to create temp dir");
        let dst_dir = TempDir::new().expect("Failed to create temp dir");
        write_dated(&src_dir.path().join("photo.jpg"), b"jpg", JAN_15_NOON_UTC);
        write_dated(&src_dir.path().join("photo.webp"), b"webp", JAN_15_NOON_UTC);

        let mut a = args(src_dir.path().to_path_buf(), dst_dir.path().to_path_buf());
        a.ext = vec![".WEBP".to_string()];
        let summary = run_cli(&a).expect("CLI should succeed").summary;
        assert_eq!(summary.total, 1);
        assert!(dst_dir
            .path()
            .join("2024-01-15")
            .join("20240115-0001.webp")
            .exists());
    }

    #[test]
    fn test_cli_reports_copy_failures() {
        let src_dir = TempDir::new().expect("Failed to create temp dir");
        let dst_dir = TempDir::new().expect("Failed to create temp dir");
        write_dated(&src_dir.path().join("photo.jpg"), b"x", JAN_15_NOON_UTC);
        write_dated(&src_dir.path().join("other.jpg"), b"y", JAN_15_NOON_UTC + 86_400);
        fs::write(dst_dir.path().join("2024-01-15"), b"not a folder").expect("Failed to write");

        // The summary survives a copy error so --json can still report it
        let report = run_cli(&args(src_dir.path().to_path_buf(), dst_dir.path().to_path_buf()))
            .expect("Copy errors are reported, not raised");
        assert_eq!(report.copy_errors, 1);
        assert_eq!(
            (report.summary.total, report.summary.copied, report.summary.skipped),
            (2, 1, 1)
        );
        let json = serde_json::to_value(report.summary).expect("Failed to encode summary");
        assert_eq!(json["copied"], 1);
        assert_eq!(json["skipped"], 1);
    }

    #[test]
    fn test_cli_rejects_missing_source() {
        let dst_dir = TempDir::new().expect("Failed to create temp dir");

        let result = run_cli(&args(
            PathBuf::from("/nonexistent/path"),
            dst_dir.path().to_path_buf(),
        ));
        assert!(result.is_err(), "CLI should reject missing source");
    }

    #[test]
    fn test_cli_rejects_invalid_hash_algorithm() {
        let src_dir = TempDir::new().expect("Failed to create temp dir");
        let dst_dir = TempDir::new().expect("Failed to create temp dir");

        let mut a = args(src_dir.path().to_path_buf(), dst_dir.path().to_path_buf());
        a.hash = "crc32".to_string();
        assert!(run_cli(&a).is_err(), "CLI should reject invalid hash algorithm");
    }

    #[test]
    fn test_cli_rejects_invalid_collision_policy() {
        let src_dir = TempDir::new().expect("Failed to create temp dir");
        let dst_dir = TempDir::new().expect("Failed to create temp dir");

        let mut a = args(src_dir.path().to_path_buf(), dst_dir.path().to_path_buf());
        a.on_collision = "ask".to_string();
        assert!(run_cli(&a).is_err(), "CLI should reject invalid collision policy");
    }

    #[test]
    fn test_build_options_maps_flags() {
        let mut a = args(PathBuf::from("in"), PathBuf::from("out"));
        a.hash = "BLAKE3".to_string();
        a.on_collision = "overwrite".to_string();
        a.utc = false;

        let options = build_options(&a).expect("Options should parse");
        assert_eq!(options.algorithm, ChecksumAlgorithm::Blake3);
        assert_eq!(options.collision_policy, CollisionPolicy::Overwrite);
        assert_eq!(options.date_basis, DateBasis::Local);
        assert_eq!(options.extensions.len(), engine::DEFAULT_EXTENSIONS.len());
    }

    #[test]
    fn test_format_record() {
        let record = OutcomeRecord {
            index: 2,
            total: 5,
            source_path: PathBuf::from("in/photo.jpg"),
            outcome: Outcome::Copied {
                file_name: "20240115-0001.jpg".to_string(),
                destination: PathBuf::from("out/2024-01-15/20240115-0001.jpg"),
            },
        };
        let line = CliProgress::format_record(&record);
        assert!(line.starts_with("[2/5]"));
        assert!(line.ends_with("20240115-0001.jpg"));
    }

    #[test]
    fn test_args_parse_extension_list() {
        let parsed = Args::try_parse_from([
            "mediasort", "--src", "in", "--dst", "out", "--ext", "jpg,heic",
        ])
        .expect("Args should parse");
        assert_eq!(parsed.ext, vec!["jpg".to_string(), "heic".to_string()]);
        assert_eq!(parsed.hash, "sha256");
        assert_eq!(parsed.on_collision, "advance");
    }
}

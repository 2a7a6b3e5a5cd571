//! Filesystem operations module.
//!
//! This module provides low-level operations for:
//! - Enumerating media candidates under the input tree
//! - Listing and counting regular files in a bucket
//! - Creating bucket directories
//! - Copying files with modification time preservation

use std::fs::{self, OpenOptions};
use std::io::{self, BufWriter, Read, Write};
use std::path::{Path, PathBuf};
use tracing::warn;
use walkdir::WalkDir;

use crate::checksums::CHUNK_SIZE;
use crate::config::SortOptions;
use crate::error::EngineError;
use crate::model::Candidate;

/// Recursively enumerate the input tree and return every media candidate.
///
/// Entries are visited sorted by file name within each directory, so the
/// candidate order is stable across runs. Unreadable entries below the root
/// are logged and skipped.
///
/// # Errors
/// Returns `EngineError::EnumerationFailed` if the root itself cannot be read.
pub fn enumerate_candidates(
    input_root: &Path,
    options: &SortOptions,
) -> Result<Vec<Candidate>, EngineError> {
    let mut candidates = Vec::new();

    for entry in WalkDir::new(input_root).sort_by_file_name() {
        let entry = match entry {
            Ok(entry) => entry,
            Err(e) if e.depth() == 0 => {
                return Err(EngineError::EnumerationFailed {
                    path: input_root.to_path_buf(),
                    source: io::Error::from(e),
                });
            }
            Err(e) => {
                warn!("Skipping unreadable entry under {}: {}", input_root.display(), e);
                continue;
            }
        };

        // walkdir reports a symlink's own type; accept links that resolve to a file
        let is_file = entry.file_type().is_file()
            || (entry.path_is_symlink() && entry.path().is_file());
        if !is_file {
            continue;
        }

        let Some(extension) = options.media_extension(entry.path()) else {
            continue;
        };

        candidates.push(Candidate::new(entry.into_path(), extension));
    }

    Ok(candidates)
}

/// List the regular files directly inside `dir`.
pub fn list_regular_files(dir: &Path) -> Result<Vec<PathBuf>, EngineError> {
    let entries = fs::read_dir(dir).map_err(|e| EngineError::ReadError {
        path: dir.to_path_buf(),
        source: e,
    })?;

    let mut files = Vec::new();
    for entry in entries {
        let entry = entry.map_err(|e| EngineError::ReadError {
            path: dir.to_path_buf(),
            source: e,
        })?;
        // Follows symlinks, matching what a plain "is this a file" check sees
        if entry.path().is_file() {
            files.push(entry.path());
        }
    }
    files.sort();
    Ok(files)
}

/// Number of regular files directly inside `dir`.
pub fn count_regular_files(dir: &Path) -> Result<usize, EngineError> {
    list_regular_files(dir).map(|files| files.len())
}

/// Ensure `dir` exists as a directory, creating it and its parents if needed.
///
/// # Errors
/// Returns `EngineError::DirectoryCreationFailed` if creation fails or the
/// path exists but is not a directory.
pub fn ensure_dir_exists(dir: &Path) -> Result<(), EngineError> {
    match fs::metadata(dir) {
        Ok(metadata) => {
            if metadata.is_dir() {
                Ok(())
            } else {
                Err(EngineError::DirectoryCreationFailed {
                    path: dir.to_path_buf(),
                    source: io::Error::new(
                        io::ErrorKind::AlreadyExists,
                        "Path exists but is not a directory",
                    ),
                })
            }
        }
        Err(e) if e.kind() == io::ErrorKind::NotFound => {
            fs::create_dir_all(dir).map_err(|e| EngineError::DirectoryCreationFailed {
                path: dir.to_path_buf(),
                source: e,
            })
        }
        Err(e) => Err(EngineError::DirectoryCreationFailed {
            path: dir.to_path_buf(),
            source: e,
        }),
    }
}

/// Stream `reader` into `writer`, attributing each failure to its side.
///
/// Read failures are reported against `src`, write and flush failures
/// against `dst`.
pub fn copy_stream<R: Read, W: Write>(
    mut reader: R,
    mut writer: W,
    src: &Path,
    dst: &Path,
) -> Result<u64, EngineError> {
    let mut buffer = vec![0u8; CHUNK_SIZE];
    let mut total = 0u64;

    loop {
        let n = match reader.read(&mut buffer) {
            Ok(0) => break,
            Ok(n) => n,
            Err(e) if e.kind() == io::ErrorKind::Interrupted => continue,
            Err(e) => {
                return Err(EngineError::ReadError {
                    path: src.to_path_buf(),
                    source: e,
                })
            }
        };
        writer
            .write_all(&buffer[..n])
            .map_err(|e| EngineError::WriteError {
                path: dst.to_path_buf(),
                source: e,
            })?;
        total += n as u64;
    }

    writer.flush().map_err(|e| EngineError::WriteError {
        path: dst.to_path_buf(),
        source: e,
    })?;
    Ok(total)
}

/// Copy a file from source to destination, preserving its modification time.
///
/// With `overwrite` false the destination is opened with create-new
/// semantics and an existing file is reported as a `WriteError` instead of
/// being replaced. If the copy fails after the destination was opened, the
/// partial file is removed.
///
/// # Returns
/// Number of bytes copied
pub fn copy_file_with_metadata(src: &Path, dst: &Path, overwrite: bool) -> Result<u64, EngineError> {
    let src_file = fs::File::open(src).map_err(|e| EngineError::ReadError {
        path: src.to_path_buf(),
        source: e,
    })?;

    let src_metadata = src_file.metadata().map_err(|e| EngineError::ReadError {
        path: src.to_path_buf(),
        source: e,
    })?;

    let mut open_options = OpenOptions::new();
    open_options.write(true);
    if overwrite {
        open_options.create(true).truncate(true);
    } else {
        open_options.create_new(true);
    }
    let dst_file = open_options.open(dst).map_err(|e| EngineError::WriteError {
        path: dst.to_path_buf(),
        source: e,
    })?;

    let result = copy_stream(src_file, BufWriter::new(dst_file), src, dst);
    let bytes_copied = match result {
        Ok(bytes) => bytes,
        Err(e) => {
            if let Err(remove_err) = fs::remove_file(dst) {
                warn!("Could not remove partial copy {}: {}", dst.display(), remove_err);
            }
            return Err(e);
        }
    };

    // The bytes are already in place; a failed timestamp update does not undo the copy
    if let Ok(mtime) = src_metadata.modified() {
        if let Err(e) = filetime::set_file_mtime(dst, filetime::FileTime::from_system_time(mtime)) {
            warn!("Could not preserve modification time on {}: {}", dst.display(), e);
        }
    }

    Ok(bytes_copied)
}

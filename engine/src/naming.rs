//! Destination name allocation.
//!
//! Names look like `20240115-0004.jpg`: the bucket date without separators,
//! a four-digit sequence, and the candidate's lowercased extension. The
//! sequence is one more than the number of regular files already in the
//! bucket. It is never derived from the names that are there.

use std::path::Path;

use crate::config::CollisionPolicy;
use crate::dates::DateBucket;
use crate::error::EngineError;
use crate::fs_ops;

/// Format a destination file name.
///
/// `extension` may be given with or without its leading dot.
pub fn format_name(bucket: &DateBucket, sequence: usize, extension: &str) -> String {
    let extension = extension.trim_start_matches('.').to_lowercase();
    if extension.is_empty() {
        format!("{}-{:04}", bucket.compact(), sequence)
    } else {
        format!("{}-{:04}.{}", bucket.compact(), sequence, extension)
    }
}

/// Allocate the next destination name in `bucket_dir`.
///
/// Read-then-decide: two processes sorting into the same bucket at once
/// can compute the same name. Under `CollisionPolicy::Advance` the copy
/// step opens the destination with create-new semantics, so a lost race
/// becomes a copy error instead of an overwrite.
pub fn allocate_name(
    bucket_dir: &Path,
    bucket: &DateBucket,
    extension: &str,
    policy: CollisionPolicy,
) -> Result<String, EngineError> {
    let mut sequence = fs_ops::count_regular_files(bucket_dir)? + 1;
    let mut name = format_name(bucket, sequence, extension);

    if policy == CollisionPolicy::Advance {
        while bucket_dir.join(&name).exists() {
            sequence += 1;
            name = format_name(bucket, sequence, extension);
        }
    }

    Ok(name)
}

//! Per-bucket digest cache.
//!
//! Each bucket's digest set is read from disk at most once per run, the
//! first time a candidate lands in it. After that the set only grows, through
//! `add`, as the run copies files in. It is never re-read mid-run.

use std::collections::{HashMap, HashSet};
use std::path::{Path, PathBuf};
use tracing::{debug, warn};

use crate::checksums::{compute_file_digest, ChecksumAlgorithm, ContentDigest};
use crate::error::EngineError;
use crate::fs_ops;

/// Lazily built map from bucket directory to the digests of its files.
#[derive(Debug)]
pub struct FolderHashCache {
    algorithm: ChecksumAlgorithm,
    entries: HashMap<PathBuf, HashSet<ContentDigest>>,
    unhashable_existing: usize,
}

impl FolderHashCache {
    pub fn new(algorithm: ChecksumAlgorithm) -> Self {
        FolderHashCache {
            algorithm,
            entries: HashMap::new(),
            unhashable_existing: 0,
        }
    }

    pub fn algorithm(&self) -> ChecksumAlgorithm {
        self.algorithm
    }

    /// Digest set for `bucket_dir`, building it on first access.
    ///
    /// The first call creates the directory if needed and hashes every
    /// regular file in it. Files that cannot be hashed are left out of the
    /// set and logged; they are counted in `unhashable_existing`.
    ///
    /// # Errors
    /// Returns an error if the directory cannot be created or listed. Nothing
    /// is cached in that case, so a later call retries.
    pub fn get_or_build(&mut self, bucket_dir: &Path) -> Result<&HashSet<ContentDigest>, EngineError> {
        if !self.entries.contains_key(bucket_dir) {
            let digests = self.build(bucket_dir)?;
            self.entries.insert(bucket_dir.to_path_buf(), digests);
        }
        Ok(&self.entries[bucket_dir])
    }

    fn build(&mut self, bucket_dir: &Path) -> Result<HashSet<ContentDigest>, EngineError> {
        fs_ops::ensure_dir_exists(bucket_dir)?;

        let mut digests = HashSet::new();
        for file in fs_ops::list_regular_files(bucket_dir)? {
            match compute_file_digest(&file, self.algorithm) {
                Ok(digest) => {
                    digests.insert(digest);
                }
                Err(e) => {
                    self.unhashable_existing += 1;
                    warn!("Existing file left out of duplicate check: {}", e);
                }
            }
        }

        debug!(
            "Loaded {} digests for bucket {}",
            digests.len(),
            bucket_dir.display()
        );
        Ok(digests)
    }

    /// Register a digest for a file just copied into `bucket_dir`.
    ///
    /// Returns false if the digest was already present.
    pub fn add(&mut self, bucket_dir: &Path, digest: ContentDigest) -> bool {
        self.entries
            .entry(bucket_dir.to_path_buf())
            .or_default()
            .insert(digest)
    }

    pub fn contains(&self, bucket_dir: &Path, digest: &ContentDigest) -> bool {
        self.entries
            .get(bucket_dir)
            .map_or(false, |digests| digests.contains(digest))
    }

    pub fn is_loaded(&self, bucket_dir: &Path) -> bool {
        self.entries.contains_key(bucket_dir)
    }

    /// Number of buckets loaded so far.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Existing bucket files that could not be hashed while building sets.
    pub fn unhashable_existing(&self) -> usize {
        self.unhashable_existing
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;

    #[test]
    fn test_build_creates_missing_bucket() {
        let temp_dir = tempfile::tempdir().expect("Failed to create temp dir");
        let bucket = temp_dir.path().join("out").join("2024-01-15");

        let mut cache = FolderHashCache::new(ChecksumAlgorithm::Sha256);
        let digests = cache.get_or_build(&bucket).expect("Failed to build");
        assert!(digests.is_empty());
        assert!(bucket.is_dir());
        assert!(cache.is_loaded(&bucket));
    }

    #[test]
    fn test_build_hashes_existing_files() {
        let temp_dir = tempfile::tempdir().expect("Failed to create temp dir");
        let bucket = temp_dir.path().join("2024-01-15");
        fs::create_dir(&bucket).expect("Failed to create bucket");
        fs::write(bucket.join("20240115-0001.jpg"), b"one").expect("Failed to write");
        fs::write(bucket.join("20240115-0002.jpg"), b"two").expect("Failed to write");
        // Identical content collapses to one digest
        fs::write(bucket.join("copy.jpg"), b"two").expect("Failed to write");

        let mut cache = FolderHashCache::new(ChecksumAlgorithm::Sha256);
        assert_eq!(cache.get_or_build(&bucket).unwrap().len(), 2);

        let one = compute_file_digest(&bucket.join("20240115-0001.jpg"), ChecksumAlgorithm::Sha256)
            .unwrap();
        assert!(cache.contains(&bucket, &one));
    }

    #[test]
    fn test_set_is_not_reread_from_disk() {
        let temp_dir = tempfile::tempdir().expect("Failed to create temp dir");
        let bucket = temp_dir.path().join("2024-01-15");

        let mut cache = FolderHashCache::new(ChecksumAlgorithm::Sha256);
        cache.get_or_build(&bucket).expect("Failed to build");

        // A file appearing behind the cache's back is not picked up
        let late = bucket.join("late.jpg");
        fs::write(&late, b"late").expect("Failed to write");
        let late_digest = compute_file_digest(&late, ChecksumAlgorithm::Sha256).unwrap();

        assert!(cache.get_or_build(&bucket).unwrap().is_empty());
        assert!(!cache.contains(&bucket, &late_digest));

        assert!(cache.add(&bucket, late_digest.clone()));
        assert!(cache.contains(&bucket, &late_digest));
        assert!(!cache.add(&bucket, late_digest));
        assert_eq!(cache.get_or_build(&bucket).unwrap().len(), 1);
    }

    #[test]
    fn test_buckets_are_independent() {
        let temp_dir = tempfile::tempdir().expect("Failed to create temp dir");
        let jan = temp_dir.path().join("2024-01-15");
        let feb = temp_dir.path().join("2024-02-01");

        let mut cache = FolderHashCache::new(ChecksumAlgorithm::Md5);
        cache.get_or_build(&jan).unwrap();
        cache.get_or_build(&feb).unwrap();

        let digest = ContentDigest::new(ChecksumAlgorithm::Md5, "00".repeat(16));
        cache.add(&jan, digest.clone());
        assert!(cache.contains(&jan, &digest));
        assert!(!cache.contains(&feb, &digest));
        assert_eq!(cache.len(), 2);
    }

    #[test]
    fn test_bucket_path_occupied_by_file() {
        let temp_dir = tempfile::tempdir().expect("Failed to create temp dir");
        let bucket = temp_dir.path().join("2024-01-15");
        fs::write(&bucket, b"squatter").expect("Failed to write");

        let mut cache = FolderHashCache::new(ChecksumAlgorithm::Sha256);
        assert!(cache.get_or_build(&bucket).is_err());
        assert!(!cache.is_loaded(&bucket));
        assert!(cache.is_empty());
    }

    #[cfg(unix)]
    #[test]
    fn test_unhashable_existing_file_is_skipped() {
        use std::os::unix::fs::PermissionsExt;

        let temp_dir = tempfile::tempdir().expect("Failed to create temp dir");
        let bucket = temp_dir.path().join("2024-01-15");
        fs::create_dir(&bucket).expect("Failed to create bucket");
        let locked = bucket.join("locked.jpg");
        fs::write(&locked, b"secret").expect("Failed to write");
        fs::write(bucket.join("open.jpg"), b"open").expect("Failed to write");
        fs::set_permissions(&locked, fs::Permissions::from_mode(0o000)).expect("chmod failed");

        // Root can read anything; only assert when the permission actually bites
        if fs::File::open(&locked).is_err() {
            let mut cache = FolderHashCache::new(ChecksumAlgorithm::Sha256);
            assert_eq!(cache.get_or_build(&bucket).unwrap().len(), 1);
            assert_eq!(cache.unhashable_existing(), 1);
        }

        fs::set_permissions(&locked, fs::Permissions::from_mode(0o644)).expect("chmod failed");
    }
}

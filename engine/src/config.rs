//! Run options.

use std::fmt;
use std::path::Path;

use crate::checksums::ChecksumAlgorithm;
use crate::dates::DateBasis;

/// Extensions recognized as media when no allowlist is given.
pub const DEFAULT_EXTENSIONS: &[&str] = &["jpg", "jpeg", "png", "mp4", "cr3", "cr2", "mov"];

/// What to do when the allocated destination name is already taken.
///
/// A name can be taken when files in a bucket were deleted or renamed
/// outside the sequential pattern, since the sequence comes from the file
/// count rather than from existing names.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum CollisionPolicy {
    /// Step the sequence number forward until a free name is found
    #[default]
    Advance,
    /// Write over the existing file
    Overwrite,
}

impl CollisionPolicy {
    /// Parse policy from string
    pub fn from_str(s: &str) -> Option<Self> {
        match s.to_lowercase().as_str() {
            "advance" => Some(Self::Advance),
            "overwrite" => Some(Self::Overwrite),
            _ => None,
        }
    }
}

impl fmt::Display for CollisionPolicy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CollisionPolicy::Advance => write!(f, "advance"),
            CollisionPolicy::Overwrite => write!(f, "overwrite"),
        }
    }
}

/// Options for one sorting run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SortOptions {
    /// Lowercased extensions without the leading dot
    pub extensions: Vec<String>,
    pub algorithm: ChecksumAlgorithm,
    pub collision_policy: CollisionPolicy,
    pub date_basis: DateBasis,
}

impl Default for SortOptions {
    fn default() -> Self {
        SortOptions {
            extensions: DEFAULT_EXTENSIONS.iter().map(|e| e.to_string()).collect(),
            algorithm: ChecksumAlgorithm::default(),
            collision_policy: CollisionPolicy::default(),
            date_basis: DateBasis::default(),
        }
    }
}

impl SortOptions {
    /// Replace the extension allowlist. Entries are lowercased and a
    /// leading dot is dropped, so `".JPG"` and `"jpg"` are the same entry.
    pub fn with_extensions<I, S>(mut self, extensions: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let mut normalized: Vec<String> = Vec::new();
        for ext in extensions {
            let ext = ext.as_ref().trim().trim_start_matches('.').to_lowercase();
            if !ext.is_empty() && !normalized.contains(&ext) {
                normalized.push(ext);
            }
        }
        self.extensions = normalized;
        self
    }

    pub fn with_algorithm(mut self, algorithm: ChecksumAlgorithm) -> Self {
        self.algorithm = algorithm;
        self
    }

    pub fn with_collision_policy(mut self, policy: CollisionPolicy) -> Self {
        self.collision_policy = policy;
        self
    }

    pub fn with_date_basis(mut self, basis: DateBasis) -> Self {
        self.date_basis = basis;
        self
    }

    /// Lowercased extension of `path` if it is on the allowlist.
    pub fn media_extension(&self, path: &Path) -> Option<String> {
        let ext = path.extension()?.to_str()?.to_lowercase();
        if self.extensions.iter().any(|allowed| *allowed == ext) {
            Some(ext)
        } else {
            None
        }
    }
}

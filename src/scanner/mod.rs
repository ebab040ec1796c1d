//! Scanner module for directory traversal and content hashing.
//!
//! - [`filter`]: exclude-pattern and size-bound filtering
//! - [`walker`]: deterministic multi-root traversal using jwalk
//! - [`hasher`]: bounded-prefix content hashing
//!
//! # Example
//!
//! ```no_run
//! use dupesweep::scanner::{ContentHasher, HashAlgorithm, PathFilter, Walker};
//! use std::path::PathBuf;
//!
//! let filter = PathFilter::new(&["*.tmp".to_string()], 0, 0);
//! let walker = Walker::new(vec![PathBuf::from(".")], filter);
//! let hasher = ContentHasher::new(HashAlgorithm::Blake3);
//!
//! for candidate in walker.walk().filter_map(Result::ok) {
//!     let record = hasher.record(candidate);
//!     println!("{} {}", record.content_hash, record.path.display());
//! }
//! ```

pub mod filter;
pub mod hasher;
pub mod walker;

use std::path::{Path, PathBuf};
use std::time::SystemTime;

use serde::{Deserialize, Serialize};

pub use filter::PathFilter;
pub use hasher::{ContentHasher, HashAlgorithm, DEFAULT_PREFIX_LIMIT, FALLBACK_PREFIX};
pub use walker::{Candidate, Walker};

/// A hashed file discovered by a scan.
///
/// `path` is the unique key within one scan result.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FileRecord {
    /// Path as discovered under its include root
    pub path: PathBuf,
    /// File size in bytes
    pub size: u64,
    /// Last modification time
    pub modified: SystemTime,
    /// Hex digest of the content prefix (or a `meta:` fallback)
    pub content_hash: String,
    /// Lower-case extension with leading dot, empty if none
    pub extension: String,
}

impl FileRecord {
    /// Create a record, deriving the extension from the path.
    #[must_use]
    pub fn new(path: PathBuf, size: u64, modified: SystemTime, content_hash: String) -> Self {
        let extension = extension_of(&path);
        Self {
            path,
            size,
            modified,
            content_hash,
            extension,
        }
    }

    /// Whether the content hash is the metadata fallback.
    #[must_use]
    pub fn is_fallback_hash(&self) -> bool {
        self.content_hash.starts_with(FALLBACK_PREFIX)
    }
}

/// Lower-case extension of `path` with its leading dot.
#[must_use]
pub fn extension_of(path: &Path) -> String {
    path.extension()
        .map(|ext| format!(".{}", ext.to_string_lossy().to_lowercase()))
        .unwrap_or_default()
}

/// Errors that can occur during directory scanning.
///
/// These never fail a scan; the finder counts and logs them.
#[derive(thiserror::Error, Debug)]
pub enum ScanError {
    /// Permission was denied when accessing a file or directory.
    #[error("Permission denied: {0}")]
    PermissionDenied(PathBuf),

    /// The path vanished between listing and inspection.
    #[error("Path not found: {0}")]
    NotFound(PathBuf),

    /// An I/O error occurred while accessing a file.
    #[error("I/O error for {path}: {source}")]
    Io {
        /// Path where the error occurred
        path: PathBuf,
        /// The underlying I/O error
        #[source]
        source: std::io::Error,
    },
}

impl ScanError {
    /// Classify an I/O error for `path`.
    pub(crate) fn from_io(path: &Path, error: std::io::Error) -> Self {
        match error.kind() {
            std::io::ErrorKind::PermissionDenied => Self::PermissionDenied(path.to_path_buf()),
            std::io::ErrorKind::NotFound => Self::NotFound(path.to_path_buf()),
            _ => Self::Io {
                path: path.to_path_buf(),
                source: error,
            },
        }
    }
}

//! Multi-root directory walker built on jwalk.
//!
//! # Overview
//!
//! [`Walker`] visits every regular file under a list of include roots and
//! yields the ones that pass its [`PathFilter`] as [`Candidate`]s.
//!
//! - Roots are visited in the given order; inside a root the walk is
//!   depth-first with directory entries sorted by file name.
//! - Symlinks are never followed and symlink entries are skipped.
//! - Hidden files are included.
//! - A root that does not exist is skipped with a warning; a root that is
//!   a regular file is itself a candidate.
//! - A file reached through two roots (duplicate or nested) is yielded
//!   once, at its first occurrence.
//!
//! # Example
//!
//! ```no_run
//! use dupesweep::scanner::{PathFilter, Walker};
//! use std::path::PathBuf;
//!
//! let walker = Walker::new(
//!     vec![PathBuf::from("/home/user/Photos"), PathBuf::from("/mnt/backup")],
//!     PathFilter::new(&["*.tmp".to_string()], 0, 0),
//! );
//! for entry in walker.walk() {
//!     match entry {
//!         Ok(file) => println!("{}: {} bytes", file.path.display(), file.size),
//!         Err(e) => eprintln!("Warning: {}", e),
//!     }
//! }
//! ```

use std::collections::HashSet;
use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use std::time::SystemTime;

use jwalk::{Parallelism, WalkDir};

use super::{PathFilter, ScanError};
use crate::cancel::CancellationToken;

/// A file that passed filtering and awaits hashing.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Candidate {
    /// Path as discovered under its include root
    pub path: PathBuf,
    /// File size in bytes
    pub size: u64,
    /// Last modification time (epoch if unavailable)
    pub modified: SystemTime,
}

/// Candidate paired with the key used for cross-root deduplication.
type Keyed = Result<(PathBuf, Candidate), ScanError>;

/// Directory walker for file discovery across several roots.
#[derive(Debug, Clone)]
pub struct Walker {
    roots: Vec<PathBuf>,
    filter: PathFilter,
    threads: usize,
    cancel: Option<CancellationToken>,
}

impl Walker {
    /// Create a walker over `roots`, in that order.
    #[must_use]
    pub fn new(roots: Vec<PathBuf>, filter: PathFilter) -> Self {
        Self {
            roots,
            filter,
            threads: 0,
            cancel: None,
        }
    }

    /// Number of directory-reading threads; `0` uses the rayon default pool.
    #[must_use]
    pub fn with_threads(mut self, threads: usize) -> Self {
        self.threads = threads;
        self
    }

    /// Stop yielding entries once `token` is cancelled.
    #[must_use]
    pub fn with_cancellation(mut self, token: CancellationToken) -> Self {
        self.cancel = Some(token);
        self
    }

    fn is_cancelled(&self) -> bool {
        self.cancel.as_ref().is_some_and(CancellationToken::is_cancelled)
    }

    /// Walk all roots, yielding candidates and per-entry errors.
    ///
    /// Errors never stop iteration; cancellation does.
    pub fn walk(&self) -> impl Iterator<Item = Result<Candidate, ScanError>> + '_ {
        let mut seen: HashSet<PathBuf> = HashSet::new();

        self.roots
            .iter()
            .flat_map(move |root| self.walk_root(root))
            .take_while(move |_| !self.is_cancelled())
            .filter_map(move |item| match item {
                Ok((key, candidate)) => {
                    if seen.insert(key) {
                        Some(Ok(candidate))
                    } else {
                        log::trace!("Already visited: {}", candidate.path.display());
                        None
                    }
                }
                Err(e) => Some(Err(e)),
            })
    }

    fn walk_root<'a>(&'a self, root: &'a Path) -> Box<dyn Iterator<Item = Keyed> + 'a> {
        let metadata = match fs::metadata(root) {
            Ok(m) => m,
            Err(e) => {
                log::warn!("Skipping include path {}: {}", root.display(), e);
                return Box::new(std::iter::empty());
            }
        };
        let canonical_root = fs::canonicalize(root).unwrap_or_else(|_| root.to_path_buf());

        if metadata.is_file() {
            return Box::new(
                self.inspect(root.to_path_buf(), canonical_root)
                    .into_iter(),
            );
        }
        if !metadata.is_dir() {
            log::warn!("Skipping include path {}: not a file or directory", root.display());
            return Box::new(std::iter::empty());
        }

        log::debug!("Walking {}", root.display());

        let mut walk_dir = WalkDir::new(root)
            .follow_links(false)
            .skip_hidden(false)
            .sort(true);
        if self.threads > 0 {
            walk_dir = walk_dir.parallelism(Parallelism::RayonNewPool(self.threads));
        }

        Box::new(
            walk_dir
                .into_iter()
                .take_while(move |_| !self.is_cancelled())
                .filter_map(move |entry| match entry {
                    Ok(entry) => {
                        let file_type = entry.file_type();
                        if file_type.is_dir() {
                            return None;
                        }
                        let path = entry.path();
                        if file_type.is_symlink() {
                            log::trace!("Skipping symlink: {}", path.display());
                            return None;
                        }
                        let key = match path.strip_prefix(root) {
                            Ok(relative) => canonical_root.join(relative),
                            Err(_) => path.clone(),
                        };
                        self.inspect(path, key)
                    }
                    Err(e) => Some(Err(Self::convert_jwalk_error(root, &e))),
                }),
        )
    }

    /// Apply the filter to one file and read its metadata.
    fn inspect(&self, path: PathBuf, key: PathBuf) -> Option<Keyed> {
        if self.filter.is_excluded(&path) {
            log::trace!("Excluded by pattern: {}", path.display());
            return None;
        }

        let metadata = match fs::symlink_metadata(&path) {
            Ok(m) => m,
            Err(e) => {
                log::debug!("Cannot stat {}: {}", path.display(), e);
                return Some(Err(ScanError::from_io(&path, e)));
            }
        };
        if !metadata.is_file() {
            return None;
        }

        let size = metadata.len();
        if !self.filter.passes_size(size) {
            log::trace!("Excluded by size ({} bytes): {}", size, path.display());
            return None;
        }

        let modified = metadata.modified().unwrap_or(SystemTime::UNIX_EPOCH);
        Some(Ok((
            key,
            Candidate {
                path,
                size,
                modified,
            },
        )))
    }

    fn convert_jwalk_error(root: &Path, error: &jwalk::Error) -> ScanError {
        let path = error.path().map_or_else(|| root.to_path_buf(), Path::to_path_buf);
        let kind = error
            .io_error()
            .map_or(io::ErrorKind::Other, io::Error::kind);
        log::debug!("Walker error for {}: {}", path.display(), error);
        ScanError::from_io(&path, io::Error::new(kind, error.to_string()))
    }
}

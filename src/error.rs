//! Boundary errors for the scan pipeline.
//!
//! Everything inside the pipeline recovers locally: unreadable entries are
//! skipped, undecodable media drops out of clustering, and executor failures
//! become per-item log statuses. The only errors that stop an operation
//! before it starts are the configuration errors defined here.

use std::path::PathBuf;

use thiserror::Error;

/// A `ScanConfig` that cannot be run.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum ConfigError {
    /// No usable include path was given.
    #[error("no include paths configured")]
    NoIncludePaths,

    /// The similarity threshold is not a number in `[0, 1]`.
    #[error("similarity threshold {0} is outside [0, 1]")]
    InvalidThreshold(f64),

    /// The minimum size bound exceeds a non-zero maximum.
    #[error("minimum size {min} exceeds maximum size {max}")]
    InvalidSizeBounds {
        /// Configured lower bound in bytes
        min: u64,
        /// Configured upper bound in bytes
        max: u64,
    },

    /// A preset or log name that would escape its directory.
    #[error("invalid name '{0}': names may not contain path separators")]
    InvalidName(String),
}

/// Errors raised while resolving a single file operation.
///
/// These never abort a plan; the executor turns them into `fail` log
/// entries carrying the error's message.
#[derive(Debug, Error)]
pub enum ActionError {
    /// Move, copy and rename require a target.
    #[error("missing target for {0}")]
    MissingTarget(PathBuf),

    /// Every `name (n).ext` candidate up to the attempt bound was taken.
    #[error("no free name for {path} after {attempts} attempts")]
    ConflictExhausted {
        /// The path that was already taken
        path: PathBuf,
        /// Number of suffixed candidates probed
        attempts: u32,
    },

    /// Trash operation failed.
    #[error("trash operation failed for {path}: {message}")]
    TrashFailed {
        /// File that could not be recycled
        path: PathBuf,
        /// Message reported by the platform trash
        message: String,
    },

    /// The original location of an undone move is occupied again.
    #[error("refusing to overwrite {0}")]
    SourceOccupied(PathBuf),

    /// General I/O error.
    #[error("I/O error for {path}: {source}")]
    Io {
        /// Path where the error occurred
        path: PathBuf,
        /// The underlying I/O error
        #[source]
        source: std::io::Error,
    },
}

impl ActionError {
    /// Wrap an I/O error with the path it concerns.
    pub(crate) fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Self::Io {
            path: path.into(),
            source,
        }
    }
}

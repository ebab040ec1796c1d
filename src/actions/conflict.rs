//! Target collision handling for move, copy and rename.

use std::fmt;
use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::ActionError;

/// Upper bound for `name (n).ext` probing.
pub const MAX_RENAME_ATTEMPTS: u32 = 9999;

/// What to do when a target path is already taken.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ConflictPolicy {
    /// Leave the item alone
    #[default]
    Skip,
    /// Remove the existing target first
    Overwrite,
    /// Pick the first free `name (n).ext`
    Rename,
}

impl fmt::Display for ConflictPolicy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Skip => "skip",
            Self::Overwrite => "overwrite",
            Self::Rename => "rename",
        };
        f.write_str(name)
    }
}

impl FromStr for ConflictPolicy {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "skip" => Ok(Self::Skip),
            "overwrite" => Ok(Self::Overwrite),
            "rename" => Ok(Self::Rename),
            other => Err(format!("unknown conflict policy: {other}")),
        }
    }
}

/// Outcome of [`resolve_conflict`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Resolution {
    /// Write to this path
    Use(PathBuf),
    /// Do not touch the item
    Skip,
}

/// Whether anything, including a dangling symlink, occupies `path`.
pub(crate) fn occupied(path: &Path) -> bool {
    fs::symlink_metadata(path).is_ok()
}

/// `dir/name (n).ext` for `target = dir/name.ext`.
///
/// The extension starts at the last dot of the file name, unless that dot
/// is its first character (`.bashrc` has no extension).
#[must_use]
pub fn numbered_candidate(target: &Path, n: u32) -> PathBuf {
    let name = target
        .file_name()
        .map(|name| name.to_string_lossy().into_owned())
        .unwrap_or_default();
    let (stem, ext) = match name.rfind('.') {
        Some(dot) if dot > 0 => name.split_at(dot),
        _ => (name.as_str(), ""),
    };
    target.with_file_name(format!("{stem} ({n}){ext}"))
}

/// Decide where an operation aimed at `target` should write.
///
/// A free target is used as is. Otherwise `policy` applies; `attempts` is
/// clamped to `1..=9999`.
///
/// # Errors
///
/// - [`ActionError::Io`] if an existing target cannot be removed for
///   [`ConflictPolicy::Overwrite`]
/// - [`ActionError::ConflictExhausted`] if no numbered name is free
pub fn resolve_conflict(
    target: &Path,
    policy: ConflictPolicy,
    attempts: u32,
) -> Result<Resolution, ActionError> {
    if !occupied(target) {
        return Ok(Resolution::Use(target.to_path_buf()));
    }

    match policy {
        ConflictPolicy::Skip => {
            log::debug!("Target exists, skipping: {}", target.display());
            Ok(Resolution::Skip)
        }
        ConflictPolicy::Overwrite => {
            log::debug!("Overwriting existing target: {}", target.display());
            match fs::remove_file(target) {
                Ok(()) => Ok(Resolution::Use(target.to_path_buf())),
                Err(e) if e.kind() == io::ErrorKind::NotFound => {
                    Ok(Resolution::Use(target.to_path_buf()))
                }
                Err(e) => Err(ActionError::io(target, e)),
            }
        }
        ConflictPolicy::Rename => {
            let attempts = attempts.clamp(1, MAX_RENAME_ATTEMPTS);
            (1..=attempts)
                .map(|n| numbered_candidate(target, n))
                .find(|candidate| !occupied(candidate))
                .map(Resolution::Use)
                .ok_or_else(|| ActionError::ConflictExhausted {
                    path: target.to_path_buf(),
                    attempts,
                })
        }
    }
}

//! Exclusion of discovered files by glob pattern and size.
//!
//! Patterns use shell glob syntax where `*` does not cross a path
//! separator. Each pattern is tried against the file's base name and then
//! against its full path; either match excludes the file.

use std::path::Path;

use glob::{MatchOptions, Pattern};

const MATCH_OPTIONS: MatchOptions = MatchOptions {
    case_sensitive: true,
    require_literal_separator: true,
    require_literal_leading_dot: false,
};

/// Decides whether a discovered file takes part in a scan.
#[derive(Debug, Clone, Default)]
pub struct PathFilter {
    patterns: Vec<Pattern>,
    min_size: u64,
    max_size: u64,
}

impl PathFilter {
    /// Build a filter. A size bound of `0` means unbounded on that side.
    ///
    /// Empty patterns are ignored; malformed ones are logged and ignored.
    #[must_use]
    pub fn new(patterns: &[String], min_size: u64, max_size: u64) -> Self {
        let patterns = patterns
            .iter()
            .map(|p| p.trim())
            .filter(|p| !p.is_empty())
            .filter_map(|p| match Pattern::new(p) {
                Ok(pattern) => Some(pattern),
                Err(e) => {
                    log::warn!("Invalid exclude pattern '{}': {}", p, e);
                    None
                }
            })
            .collect();

        Self {
            patterns,
            min_size,
            max_size,
        }
    }

    /// Whether `path` matches an exclude pattern.
    #[must_use]
    pub fn is_excluded(&self, path: &Path) -> bool {
        let base = path.file_name().map(|n| n.to_string_lossy());
        let full = path.to_string_lossy();

        self.patterns.iter().any(|pattern| {
            base.as_deref()
                .is_some_and(|b| pattern.matches_with(b, MATCH_OPTIONS))
                || pattern.matches_with(&full, MATCH_OPTIONS)
        })
    }

    /// Whether `size` lies within the configured bounds.
    #[must_use]
    pub fn passes_size(&self, size: u64) -> bool {
        if self.min_size > 0 && size < self.min_size {
            return false;
        }
        if self.max_size > 0 && size > self.max_size {
            return false;
        }
        true
    }

    /// Number of usable patterns.
    #[must_use]
    pub fn pattern_count(&self) -> usize {
        self.patterns.len()
    }
}

//! Duplicate detection module.
//!
//! This module provides functionality for:
//! - Exact grouping by content hash
//! - First-fit perceptual clustering
//! - Scan orchestration ([`DuplicateFinder`])

pub mod finder;
pub mod groups;

pub use finder::{DuplicateFinder, FinderError, ScanConfig, ScanMode, ScanSummary};
pub use groups::{
    cluster_by_fingerprint, group_exact, threshold_bits, DuplicateGroup, DEFAULT_THRESHOLD_BITS,
};

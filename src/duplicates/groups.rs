//! Grouping of hashed files into duplicate groups.
//!
//! Two strategies exist:
//!
//! - [`group_exact`] partitions records by content hash.
//! - [`cluster_by_fingerprint`] runs a single greedy first-fit pass over
//!   perceptual fingerprints.
//!
//! Both keep scan order: groups appear in the order their first member was
//! seen, and members keep their relative order.

use std::collections::HashMap;
use std::path::PathBuf;

use serde::{Deserialize, Serialize};

use super::finder::FinderError;
use crate::cancel::CancellationToken;
use crate::media::Fingerprint;
use crate::scanner::FileRecord;

/// Hamming threshold used when the similarity threshold is `0`.
pub const DEFAULT_THRESHOLD_BITS: u32 = 10;

/// A set of files considered duplicates of each other.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DuplicateGroup {
    /// Shared content hash, or the first member's path for perceptual
    /// clusters
    pub group_id: String,
    /// Members in scan order
    pub files: Vec<FileRecord>,
}

impl DuplicateGroup {
    /// Create a group.
    #[must_use]
    pub fn new(group_id: impl Into<String>, files: Vec<FileRecord>) -> Self {
        Self {
            group_id: group_id.into(),
            files,
        }
    }

    /// Number of files in this group.
    #[must_use]
    pub fn len(&self) -> usize {
        self.files.len()
    }

    /// Check if this group is empty.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.files.is_empty()
    }

    /// Total size of all files in this group.
    #[must_use]
    pub fn total_size(&self) -> u64 {
        self.files.iter().map(|f| f.size).sum()
    }

    /// Bytes freed by removing every member but the first.
    #[must_use]
    pub fn wasted_space(&self) -> u64 {
        match self.files.first() {
            Some(first) => self.total_size().saturating_sub(first.size),
            None => 0,
        }
    }

    /// Number of redundant copies.
    #[must_use]
    pub fn duplicate_count(&self) -> usize {
        self.files.len().saturating_sub(1)
    }

    /// Paths of the members.
    #[must_use]
    pub fn paths(&self) -> Vec<PathBuf> {
        self.files.iter().map(|f| f.path.clone()).collect()
    }
}

/// Convert a similarity threshold in `[0, 1]` to a Hamming distance.
///
/// `round((1 - t) * 64)` clamped to `[0, 64]`; `0` (and NaN) select
/// [`DEFAULT_THRESHOLD_BITS`].
#[must_use]
pub fn threshold_bits(similarity: f64) -> u32 {
    if similarity == 0.0 || similarity.is_nan() {
        return DEFAULT_THRESHOLD_BITS;
    }
    let bits = ((1.0 - similarity) * 64.0).round().clamp(0.0, 64.0);
    bits as u32
}

/// Partition `records` by content hash.
///
/// Only buckets with at least two members become groups. Groups are ordered
/// by the first appearance of their hash.
#[must_use]
pub fn group_exact(records: impl IntoIterator<Item = FileRecord>) -> Vec<DuplicateGroup> {
    let mut order: Vec<String> = Vec::new();
    let mut buckets: HashMap<String, Vec<FileRecord>> = HashMap::new();

    for record in records {
        let bucket = buckets.entry(record.content_hash.clone()).or_default();
        if bucket.is_empty() {
            order.push(record.content_hash.clone());
        }
        bucket.push(record);
    }

    let groups: Vec<DuplicateGroup> = order
        .into_iter()
        .filter_map(|hash| {
            let files = buckets.remove(&hash)?;
            (files.len() >= 2).then(|| DuplicateGroup::new(hash, files))
        })
        .collect();

    log::debug!("Exact grouping produced {} groups", groups.len());
    groups
}

/// Greedy first-fit clustering of fingerprinted records.
///
/// Each record, in order, is compared with the first member of every open
/// bucket in creation order and joins the first one within `threshold_bits`;
/// otherwise it opens a new bucket. Buckets with at least two members are
/// returned in creation order, identified by their first member's path.
///
/// # Errors
///
/// Returns [`FinderError::Interrupted`] if `cancel` fires between two
/// records.
pub fn cluster_by_fingerprint(
    items: Vec<(FileRecord, Fingerprint)>,
    threshold_bits: u32,
    cancel: Option<&CancellationToken>,
) -> Result<Vec<DuplicateGroup>, FinderError> {
    // (reference fingerprint, members)
    let mut buckets: Vec<(Fingerprint, Vec<FileRecord>)> = Vec::new();

    for (record, fp) in items {
        if cancel.is_some_and(CancellationToken::is_cancelled) {
            return Err(FinderError::Interrupted);
        }

        match buckets
            .iter_mut()
            .find(|(reference, _)| reference.distance(fp) <= threshold_bits)
        {
            Some((_, members)) => members.push(record),
            None => buckets.push((fp, vec![record])),
        }
    }

    let groups: Vec<DuplicateGroup> = buckets
        .into_iter()
        .filter(|(_, members)| members.len() >= 2)
        .map(|(_, members)| {
            let id = members[0].path.to_string_lossy().into_owned();
            DuplicateGroup::new(id, members)
        })
        .collect();

    log::debug!(
        "Perceptual clustering at {} bits produced {} groups",
        threshold_bits,
        groups.len()
    );
    Ok(groups)
}

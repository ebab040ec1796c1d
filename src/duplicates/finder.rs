//! Scan orchestration.
//!
//! # Overview
//!
//! [`DuplicateFinder::find_duplicates`] runs one scan:
//!
//! 1. **Validate** the [`ScanConfig`]
//! 2. **Walk** the include roots ([`Walker`]), reporting `walking` progress
//! 3. **Hash** every candidate on a rayon pool, reporting `hashing` progress
//! 4. **Group** exactly by hash (`basic`, `text`) or by perceptual
//!    fingerprint (`image`, `video`)
//! 5. Report `done` with the group count
//!
//! Unreadable entries never fail a scan; they are counted in the
//! [`ScanSummary`]. A scan fails only on invalid configuration or
//! cancellation.
//!
//! # Example
//!
//! ```no_run
//! use dupesweep::duplicates::{DuplicateFinder, ScanConfig, ScanMode};
//! use std::path::PathBuf;
//!
//! let config = ScanConfig::new(vec![PathBuf::from("/home/user/Pictures")])
//!     .with_mode(ScanMode::Image)
//!     .with_similarity_threshold(0.9);
//!
//! let finder = DuplicateFinder::with_defaults();
//! let (groups, summary) = finder.find_duplicates(&config)?;
//! println!("{} groups, {} reclaimable", groups.len(), summary.reclaimable_display());
//! # Ok::<(), dupesweep::duplicates::FinderError>(())
//! ```

use std::fmt;
use std::path::PathBuf;
use std::str::FromStr;
use std::sync::{Arc, Mutex, PoisonError};
use std::time::{Duration, Instant};

use bytesize::ByteSize;
use rayon::prelude::*;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use super::groups::{cluster_by_fingerprint, group_exact, threshold_bits, DuplicateGroup};
use crate::cancel::CancellationToken;
use crate::config::Settings;
use crate::error::ConfigError;
use crate::media::{Fingerprint, PerceptualHasher, IMAGE_EXTENSIONS, VIDEO_EXTENSIONS};
use crate::progress::{Progress, ProgressSink, Stage};
use crate::scanner::{Candidate, ContentHasher, FileRecord, HashAlgorithm, PathFilter, Walker};

/// How files are compared.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ScanMode {
    /// Exact content hash over all files
    #[default]
    Basic,
    /// Perceptual similarity over image files
    Image,
    /// Perceptual similarity over one frame of each video
    Video,
    /// Exact content hash (alias of basic)
    Text,
}

impl ScanMode {
    /// Extensions considered by similarity modes; `None` for exact modes.
    #[must_use]
    pub fn media_extensions(self) -> Option<&'static [&'static str]> {
        match self {
            Self::Image => Some(IMAGE_EXTENSIONS),
            Self::Video => Some(VIDEO_EXTENSIONS),
            Self::Basic | Self::Text => None,
        }
    }

    /// Whether this mode clusters by fingerprint.
    #[must_use]
    pub fn is_similarity(self) -> bool {
        self.media_extensions().is_some()
    }
}

impl fmt::Display for ScanMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Basic => write!(f, "basic"),
            Self::Image => write!(f, "image"),
            Self::Video => write!(f, "video"),
            Self::Text => write!(f, "text"),
        }
    }
}

impl FromStr for ScanMode {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "basic" | "" => Ok(Self::Basic),
            "image" => Ok(Self::Image),
            "video" => Ok(Self::Video),
            "text" => Ok(Self::Text),
            other => Err(format!("unknown scan mode: {other}")),
        }
    }
}

/// Parameters of one scan.
///
/// Everything except the progress sink and the cancellation token is
/// serializable, which is what scan presets store.
#[derive(Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ScanConfig {
    /// Roots to scan, in order. Duplicates are allowed.
    pub include_paths: Vec<PathBuf>,
    /// Glob patterns matched against base name and full path.
    pub exclude_patterns: Vec<String>,
    /// Comparison mode.
    pub mode: ScanMode,
    /// Worker threads for walking and hashing; `0` uses the rayon default.
    pub concurrency: usize,
    /// Smallest file size considered, `0` for no bound.
    pub min_size: u64,
    /// Largest file size considered, `0` for no bound.
    pub max_size: u64,
    /// Content hash algorithm.
    pub hash_algorithm: HashAlgorithm,
    /// Similarity threshold in `[0, 1]` for similarity modes.
    pub similarity_threshold: f64,
    /// Receiver of progress events.
    #[serde(skip)]
    pub progress: Option<Arc<dyn ProgressSink>>,
    /// Token checked while walking, hashing and clustering.
    #[serde(skip)]
    pub cancel: Option<CancellationToken>,
}

impl fmt::Debug for ScanConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ScanConfig")
            .field("include_paths", &self.include_paths)
            .field("exclude_patterns", &self.exclude_patterns)
            .field("mode", &self.mode)
            .field("concurrency", &self.concurrency)
            .field("min_size", &self.min_size)
            .field("max_size", &self.max_size)
            .field("hash_algorithm", &self.hash_algorithm)
            .field("similarity_threshold", &self.similarity_threshold)
            .field("progress", &self.progress.as_ref().map(|_| "<sink>"))
            .field("cancel", &self.cancel)
            .finish()
    }
}

impl PartialEq for ScanConfig {
    fn eq(&self, other: &Self) -> bool {
        self.include_paths == other.include_paths
            && self.exclude_patterns == other.exclude_patterns
            && self.mode == other.mode
            && self.concurrency == other.concurrency
            && self.min_size == other.min_size
            && self.max_size == other.max_size
            && self.hash_algorithm == other.hash_algorithm
            && self.similarity_threshold == other.similarity_threshold
    }
}

impl Default for ScanConfig {
    fn default() -> Self {
        Self {
            include_paths: Vec::new(),
            exclude_patterns: Vec::new(),
            mode: ScanMode::Basic,
            concurrency: 0,
            min_size: 0,
            max_size: 0,
            hash_algorithm: HashAlgorithm::Blake3,
            similarity_threshold: 0.0,
            progress: None,
            cancel: None,
        }
    }
}

impl ScanConfig {
    /// Scan `include_paths` with default settings.
    #[must_use]
    pub fn new(include_paths: Vec<PathBuf>) -> Self {
        Self {
            include_paths,
            ..Self::default()
        }
    }

    /// Set the exclude patterns.
    #[must_use]
    pub fn with_exclude_patterns(mut self, patterns: Vec<String>) -> Self {
        self.exclude_patterns = patterns;
        self
    }

    /// Set the comparison mode.
    #[must_use]
    pub fn with_mode(mut self, mode: ScanMode) -> Self {
        self.mode = mode;
        self
    }

    /// Set the worker thread count.
    #[must_use]
    pub fn with_concurrency(mut self, threads: usize) -> Self {
        self.concurrency = threads;
        self
    }

    /// Set both size bounds (`0` = unbounded).
    #[must_use]
    pub fn with_size_bounds(mut self, min: u64, max: u64) -> Self {
        self.min_size = min;
        self.max_size = max;
        self
    }

    /// Set the content hash algorithm.
    #[must_use]
    pub fn with_hash_algorithm(mut self, algorithm: HashAlgorithm) -> Self {
        self.hash_algorithm = algorithm;
        self
    }

    /// Set the similarity threshold.
    #[must_use]
    pub fn with_similarity_threshold(mut self, threshold: f64) -> Self {
        self.similarity_threshold = threshold;
        self
    }

    /// Set the progress sink.
    #[must_use]
    pub fn with_progress(mut self, sink: Arc<dyn ProgressSink>) -> Self {
        self.progress = Some(sink);
        self
    }

    /// Set the cancellation token.
    #[must_use]
    pub fn with_cancellation(mut self, token: CancellationToken) -> Self {
        self.cancel = Some(token);
        self
    }

    /// Check that the configuration can be run.
    ///
    /// # Errors
    ///
    /// Returns the first violated constraint.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self
            .include_paths
            .iter()
            .all(|p| p.as_os_str().is_empty())
        {
            return Err(ConfigError::NoIncludePaths);
        }
        if !(0.0..=1.0).contains(&self.similarity_threshold) {
            return Err(ConfigError::InvalidThreshold(self.similarity_threshold));
        }
        if self.min_size > 0 && self.max_size > 0 && self.min_size > self.max_size {
            return Err(ConfigError::InvalidSizeBounds {
                min: self.min_size,
                max: self.max_size,
            });
        }
        Ok(())
    }

    fn is_cancelled(&self) -> bool {
        self.cancel.as_ref().is_some_and(CancellationToken::is_cancelled)
    }

    fn report(&self, stage: Stage, files: usize, groups: usize) {
        if let Some(sink) = &self.progress {
            sink.on_progress(Progress::new(stage, files, groups));
        }
    }
}

/// Errors that stop a scan.
#[derive(Debug, Error)]
pub enum FinderError {
    /// The configuration is invalid.
    #[error(transparent)]
    Config(#[from] ConfigError),

    /// The cancellation token fired.
    #[error("Scan interrupted")]
    Interrupted,
}

/// Statistics of a finished scan.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ScanSummary {
    /// Files that passed filtering and were hashed
    pub total_files: usize,
    /// Their combined size in bytes
    pub total_size: u64,
    /// Traversal entries skipped because of I/O errors
    pub skipped_entries: usize,
    /// Records whose hash is the metadata fallback
    pub fallback_hashes: usize,
    /// Media files that could not be fingerprinted
    pub media_failures: usize,
    /// Number of groups found
    pub duplicate_groups: usize,
    /// Members beyond the first of every group
    pub duplicate_files: usize,
    /// Bytes held by those members
    pub reclaimable_space: u64,
    /// Wall time of the scan
    pub scan_duration: Duration,
}

impl ScanSummary {
    /// Reclaimable space in human-readable form.
    #[must_use]
    pub fn reclaimable_display(&self) -> String {
        ByteSize(self.reclaimable_space).to_string()
    }

    /// Total size in human-readable form.
    #[must_use]
    pub fn total_size_display(&self) -> String {
        ByteSize(self.total_size).to_string()
    }

    fn record_groups(&mut self, groups: &[DuplicateGroup]) {
        self.duplicate_groups = groups.len();
        self.duplicate_files = groups.iter().map(DuplicateGroup::duplicate_count).sum();
        self.reclaimable_space = groups.iter().map(DuplicateGroup::wasted_space).sum();
    }
}

/// Hash results shared between pool workers.
#[derive(Default)]
struct ScanAccumulator {
    records: Vec<(usize, FileRecord)>,
    hashed: usize,
}

impl ScanAccumulator {
    /// Store `record` and return the running count. A poisoned lock is
    /// recovered; it still holds every record pushed so far.
    fn push(shared: &Mutex<Self>, index: usize, record: FileRecord) -> usize {
        let mut acc = shared.lock().unwrap_or_else(PoisonError::into_inner);
        acc.records.push((index, record));
        acc.hashed += 1;
        acc.hashed
    }
}

/// Runs scans with a fixed set of engine settings.
#[derive(Debug, Clone)]
pub struct DuplicateFinder {
    settings: Settings,
    perceptual: PerceptualHasher,
}

impl DuplicateFinder {
    /// Create a finder; the perceptual hasher is derived from `settings`.
    #[must_use]
    pub fn new(settings: Settings) -> Self {
        let perceptual = PerceptualHasher::from_settings(&settings);
        Self {
            settings,
            perceptual,
        }
    }

    /// Create a finder with default settings.
    #[must_use]
    pub fn with_defaults() -> Self {
        Self::new(Settings::default())
    }

    /// Replace the perceptual hasher.
    #[must_use]
    pub fn with_perceptual_hasher(mut self, hasher: PerceptualHasher) -> Self {
        self.perceptual = hasher;
        self
    }

    /// Settings this finder was built with.
    #[must_use]
    pub fn settings(&self) -> &Settings {
        &self.settings
    }

    /// Run a scan.
    ///
    /// # Errors
    ///
    /// - [`FinderError::Config`] if `config` fails validation
    /// - [`FinderError::Interrupted`] if the cancellation token fires
    pub fn find_duplicates(
        &self,
        config: &ScanConfig,
    ) -> Result<(Vec<DuplicateGroup>, ScanSummary), FinderError> {
        let started = Instant::now();
        config.validate()?;
        if config.is_cancelled() {
            return Err(FinderError::Interrupted);
        }

        log::info!(
            "Starting {} scan of {} path(s)",
            config.mode,
            config.include_paths.len()
        );
        let mut summary = ScanSummary::default();

        let candidates = self.walk(config, &mut summary)?;
        let records = self.hash_all(config, candidates)?;

        summary.total_files = records.len();
        summary.total_size = records.iter().map(|r| r.size).sum();
        summary.fallback_hashes = records.iter().filter(|r| r.is_fallback_hash()).count();
        log::info!(
            "Hashed {} files ({})",
            summary.total_files,
            summary.total_size_display()
        );

        config.report(Stage::Grouping, summary.total_files, 0);
        let groups = if config.mode.is_similarity() {
            self.group_similar(config, records, &mut summary)?
        } else {
            group_exact(records)
        };

        summary.record_groups(&groups);
        summary.scan_duration = started.elapsed();
        config.report(Stage::Done, summary.total_files, groups.len());

        log::info!(
            "Scan complete: {} groups, {} duplicate files, {} reclaimable in {:.2?}",
            summary.duplicate_groups,
            summary.duplicate_files,
            summary.reclaimable_display(),
            summary.scan_duration
        );
        Ok((groups, summary))
    }

    fn walk(
        &self,
        config: &ScanConfig,
        summary: &mut ScanSummary,
    ) -> Result<Vec<Candidate>, FinderError> {
        let batch = self.settings.progress_batch.max(1);
        let filter = PathFilter::new(&config.exclude_patterns, config.min_size, config.max_size);
        let mut walker =
            Walker::new(config.include_paths.clone(), filter).with_threads(config.concurrency);
        if let Some(token) = &config.cancel {
            walker = walker.with_cancellation(token.clone());
        }

        config.report(Stage::Walking, 0, 0);
        let mut candidates = Vec::new();
        for entry in walker.walk() {
            match entry {
                Ok(candidate) => {
                    candidates.push(candidate);
                    if candidates.len() % batch == 0 {
                        config.report(Stage::Walking, candidates.len(), 0);
                    }
                }
                Err(e) => {
                    log::debug!("Skipping entry: {}", e);
                    summary.skipped_entries += 1;
                }
            }
        }

        if config.is_cancelled() {
            return Err(FinderError::Interrupted);
        }
        log::debug!(
            "Walk found {} candidates, skipped {} entries",
            candidates.len(),
            summary.skipped_entries
        );
        Ok(candidates)
    }

    fn hash_all(
        &self,
        config: &ScanConfig,
        candidates: Vec<Candidate>,
    ) -> Result<Vec<FileRecord>, FinderError> {
        let batch = self.settings.progress_batch.max(1);
        let hasher = ContentHasher::new(config.hash_algorithm)
            .with_prefix_limit(self.settings.hash_prefix_bytes);
        let accumulator = Mutex::new(ScanAccumulator {
            records: Vec::with_capacity(candidates.len()),
            hashed: 0,
        });

        run_pooled(config.concurrency, || {
            candidates
                .into_par_iter()
                .enumerate()
                .for_each(|(index, candidate)| {
                    if config.is_cancelled() {
                        return;
                    }
                    let record = hasher.record(candidate);

                    let hashed = ScanAccumulator::push(&accumulator, index, record);
                    if hashed % batch == 0 {
                        config.report(Stage::Hashing, hashed, 0);
                    }
                });
        });

        if config.is_cancelled() {
            return Err(FinderError::Interrupted);
        }

        let mut records = accumulator
            .into_inner()
            .map(|acc| acc.records)
            .unwrap_or_else(|poisoned| poisoned.into_inner().records);
        records.sort_unstable_by_key(|(index, _)| *index);
        Ok(records.into_iter().map(|(_, record)| record).collect())
    }

    fn group_similar(
        &self,
        config: &ScanConfig,
        records: Vec<FileRecord>,
        summary: &mut ScanSummary,
    ) -> Result<Vec<DuplicateGroup>, FinderError> {
        let extensions = config.mode.media_extensions().unwrap_or_default();
        let media: Vec<FileRecord> = records
            .into_iter()
            .filter(|r| extensions.contains(&r.extension.as_str()))
            .collect();
        log::info!(
            "Fingerprinting {} {} files",
            media.len(),
            config.mode
        );

        let fingerprinted: Vec<(FileRecord, Option<Fingerprint>)> =
            run_pooled(config.concurrency, || {
                media
                    .into_par_iter()
                    .map(|record| {
                        if config.is_cancelled() {
                            return (record, None);
                        }
                        match self.perceptual.fingerprint(&record.path) {
                            Ok(fp) => (record, Some(fp)),
                            Err(e) => {
                                log::debug!("Excluding {}: {}", record.path.display(), e);
                                (record, None)
                            }
                        }
                    })
                    .collect()
            });

        if config.is_cancelled() {
            return Err(FinderError::Interrupted);
        }

        let total = fingerprinted.len();
        let items: Vec<(FileRecord, Fingerprint)> = fingerprinted
            .into_iter()
            .filter_map(|(record, fp)| fp.map(|fp| (record, fp)))
            .collect();
        summary.media_failures = total - items.len();

        let bits = threshold_bits(config.similarity_threshold);
        cluster_by_fingerprint(items, bits, config.cancel.as_ref())
    }
}

/// Run `op` on a pool of `threads` workers, or on the global pool for `0`.
fn run_pooled<R, F>(threads: usize, op: F) -> R
where
    R: Send,
    F: FnOnce() -> R + Send,
{
    if threads == 0 {
        return op();
    }
    match rayon::ThreadPoolBuilder::new().num_threads(threads).build() {
        Ok(pool) => pool.install(op),
        Err(e) => {
            log::warn!(
                "Failed to create thread pool ({}), using global pool with {} threads",
                e,
                rayon::current_num_threads()
            );
            op()
        }
    }
}

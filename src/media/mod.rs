//! Perceptual fingerprints for images and videos.
//!
//! # Overview
//!
//! Media files are reduced to a 64-bit average hash:
//!
//! 1. decode the file (images via `image`, videos via one frame extracted by
//!    an external decoder, see [`video`])
//! 2. downscale to a thumbnail whose longest side is at most `max_side`
//!    (optionally cached on disk, see [`thumbnail`])
//! 3. reduce the thumbnail to an 8×8 grayscale grid
//! 4. set bit *i* (row-major) iff pixel *i* is at least the grid mean
//!
//! Visually similar files have fingerprints with a small Hamming distance.
//!
//! # Example
//!
//! ```no_run
//! use dupesweep::media::PerceptualHasher;
//! use std::path::Path;
//!
//! let hasher = PerceptualHasher::new(128);
//! let a = hasher.fingerprint(Path::new("a.jpg"))?;
//! let b = hasher.fingerprint(Path::new("b.jpg"))?;
//! println!("{a} vs {b}: {} bits apart", a.distance(b));
//! # Ok::<(), dupesweep::media::MediaError>(())
//! ```

pub mod thumbnail;
pub mod video;

use std::fmt;
use std::path::{Path, PathBuf};
use std::str::FromStr;

use image::imageops::FilterType;
use image::{DynamicImage, GenericImageView};
use thiserror::Error;

use crate::config::Settings;
use crate::scanner::{extension_of, FileRecord};

pub use thumbnail::ThumbnailCache;
pub use video::FrameExtractor;

/// Extensions decoded as still images.
pub const IMAGE_EXTENSIONS: &[&str] = &[".jpg", ".jpeg", ".png", ".gif", ".bmp", ".webp"];

/// Extensions handled by frame extraction.
pub const VIDEO_EXTENSIONS: &[&str] = &[".mp4", ".mov", ".avi", ".mkv", ".wmv"];

/// Default longest side of generated thumbnails.
pub const DEFAULT_THUMBNAIL_SIDE: u32 = 128;

/// Errors raised while producing a thumbnail or fingerprint.
#[derive(Debug, Error)]
pub enum MediaError {
    /// The extension is neither a known image nor video type.
    #[error("unsupported media type: {0}")]
    Unsupported(PathBuf),

    /// The image could not be decoded.
    #[error("failed to decode {path}: {source}")]
    Decode {
        /// File that failed to decode
        path: PathBuf,
        /// Decoder error
        #[source]
        source: image::ImageError,
    },

    /// The frame decoder binary could not be started.
    #[error("frame decoder not found: {0}")]
    DecoderMissing(PathBuf),

    /// The frame decoder was still running at the deadline and was killed.
    #[error("frame extraction for {path} timed out after {secs}s")]
    DecoderTimeout {
        /// Video being decoded
        path: PathBuf,
        /// Configured timeout in seconds
        secs: u64,
    },

    /// The frame decoder exited unsuccessfully.
    #[error("frame extraction for {path} failed: {status}")]
    DecoderFailed {
        /// Video being decoded
        path: PathBuf,
        /// Exit status as reported by the OS
        status: String,
    },

    /// Filesystem error.
    #[error("I/O error for {path}: {source}")]
    Io {
        /// Path where the error occurred
        path: PathBuf,
        /// The underlying I/O error
        #[source]
        source: std::io::Error,
    },
}

/// Which decoder a file is routed to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MediaKind {
    /// Still image
    Image,
    /// Video
    Video,
}

impl MediaKind {
    /// Classify a path by its (case-insensitive) extension.
    #[must_use]
    pub fn from_path(path: &Path) -> Option<Self> {
        Self::from_extension(&extension_of(path))
    }

    /// Classify a lower-case extension with leading dot.
    #[must_use]
    pub fn from_extension(ext: &str) -> Option<Self> {
        if IMAGE_EXTENSIONS.contains(&ext) {
            Some(Self::Image)
        } else if VIDEO_EXTENSIONS.contains(&ext) {
            Some(Self::Video)
        } else {
            None
        }
    }
}

/// 64-bit average-hash fingerprint.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Fingerprint(pub u64);

impl Fingerprint {
    /// Number of differing bits, in `0..=64`.
    #[must_use]
    pub fn distance(self, other: Self) -> u32 {
        (self.0 ^ other.0).count_ones()
    }
}

impl fmt::Display for Fingerprint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:016x}", self.0)
    }
}

impl FromStr for Fingerprint {
    type Err = std::num::ParseIntError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        u64::from_str_radix(s, 16).map(Self)
    }
}

/// Average hash of an already decoded image.
#[must_use]
pub fn average_hash(img: &DynamicImage) -> Fingerprint {
    let grid = img.resize_exact(8, 8, FilterType::Triangle).to_luma8();
    let total: u32 = grid.pixels().map(|p| u32::from(p.0[0])).sum();
    let mean = total / 64;

    let bits = grid
        .pixels()
        .enumerate()
        .filter(|(_, p)| u32::from(p.0[0]) >= mean)
        .fold(0u64, |acc, (i, _)| acc | (1u64 << i));
    Fingerprint(bits)
}

/// Hamming distance between two hex-encoded fingerprints.
///
/// Strings of different length are maximally distant (64). Non-hex
/// characters count as zero nibbles.
#[must_use]
pub fn hamming_distance_hex(a: &str, b: &str) -> u32 {
    if a.len() != b.len() {
        return 64;
    }
    let nibble = |c: char| c.to_digit(16).unwrap_or(0);
    let dist: u32 = a
        .chars()
        .zip(b.chars())
        .map(|(x, y)| (nibble(x) ^ nibble(y)).count_ones())
        .sum();
    dist.min(64)
}

/// Shrink `img` so its longest side is at most `max_side`.
///
/// Images that already fit are returned unchanged.
#[must_use]
pub fn make_thumbnail(img: DynamicImage, max_side: u32) -> DynamicImage {
    let (w, h) = img.dimensions();
    if w <= max_side && h <= max_side {
        return img;
    }
    img.resize(max_side, max_side, FilterType::Triangle)
}

/// Produces thumbnails and fingerprints for media files.
#[derive(Debug, Clone)]
pub struct PerceptualHasher {
    cache: Option<ThumbnailCache>,
    frames: FrameExtractor,
    max_side: u32,
}

impl Default for PerceptualHasher {
    fn default() -> Self {
        Self::new(DEFAULT_THUMBNAIL_SIDE)
    }
}

impl PerceptualHasher {
    /// Create an uncached hasher using `ffmpeg` from `PATH`.
    #[must_use]
    pub fn new(max_side: u32) -> Self {
        Self {
            cache: None,
            frames: FrameExtractor::default(),
            max_side: max_side.max(1),
        }
    }

    /// Build a hasher from engine settings.
    #[must_use]
    pub fn from_settings(settings: &Settings) -> Self {
        let mut hasher = Self::new(settings.thumbnail_side)
            .with_frame_extractor(FrameExtractor::from_settings(settings));
        if settings.use_thumbnail_cache {
            hasher = hasher.with_cache(ThumbnailCache::new(&settings.thumbnail_dir));
        }
        hasher
    }

    /// Reuse thumbnails from `cache`.
    #[must_use]
    pub fn with_cache(mut self, cache: ThumbnailCache) -> Self {
        self.cache = Some(cache);
        self
    }

    /// Use `frames` for video decoding.
    #[must_use]
    pub fn with_frame_extractor(mut self, frames: FrameExtractor) -> Self {
        self.frames = frames;
        self
    }

    /// Longest side of produced thumbnails.
    #[must_use]
    pub fn max_side(&self) -> u32 {
        self.max_side
    }

    /// Thumbnail of `path`, from the cache when possible.
    ///
    /// # Errors
    ///
    /// Fails for unsupported extensions, undecodable images and failed
    /// frame extraction.
    pub fn thumbnail(&self, path: &Path) -> Result<DynamicImage, MediaError> {
        let kind = MediaKind::from_path(path)
            .ok_or_else(|| MediaError::Unsupported(path.to_path_buf()))?;

        let generate = || -> Result<DynamicImage, MediaError> {
            let full = match kind {
                MediaKind::Image => image::open(path).map_err(|source| MediaError::Decode {
                    path: path.to_path_buf(),
                    source,
                })?,
                MediaKind::Video => self.frames.extract_frame(path)?,
            };
            Ok(make_thumbnail(full, self.max_side))
        };

        match &self.cache {
            Some(cache) => cache.get_or_insert_with(path, self.max_side, generate),
            None => generate(),
        }
    }

    /// Fingerprint of `path`.
    ///
    /// # Errors
    ///
    /// See [`PerceptualHasher::thumbnail`].
    pub fn fingerprint(&self, path: &Path) -> Result<Fingerprint, MediaError> {
        let thumb = self.thumbnail(path)?;
        let fp = average_hash(&thumb);
        log::trace!("Fingerprint {} for {}", fp, path.display());
        Ok(fp)
    }

    /// Approximate similarity of a group in percent, using the first file
    /// as reference.
    ///
    /// Returns 100 for groups of at most one file and 0 when the reference
    /// or every other member cannot be fingerprinted.
    #[must_use]
    pub fn estimate_group_similarity(&self, files: &[FileRecord]) -> f64 {
        let Some((first, rest)) = files.split_first() else {
            return 100.0;
        };
        if rest.is_empty() {
            return 100.0;
        }
        let reference = match self.fingerprint(&first.path) {
            Ok(fp) => fp,
            Err(e) => {
                log::debug!("Cannot fingerprint reference {}: {}", first.path.display(), e);
                return 0.0;
            }
        };

        let scores: Vec<f64> = rest
            .iter()
            .filter_map(|f| self.fingerprint(&f.path).ok())
            .map(|fp| 100.0 * (1.0 - f64::from(reference.distance(fp)) / 64.0))
            .collect();

        if scores.is_empty() {
            return 0.0;
        }
        scores.iter().sum::<f64>() / scores.len() as f64
    }
}

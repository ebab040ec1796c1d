//! Disk cache of generated thumbnails.
//!
//! Entries are PNG files keyed by `(original_path, max_side)`. The file name
//! is the original path with separators replaced by `__` and `:` by `_`,
//! followed by `_<max_side>.png`; names that would be too long for common
//! filesystems use the BLAKE3 digest of the path instead.
//!
//! Entries are never invalidated when the source changes. Concurrent
//! writers of the same entry race; the last rename wins.

use std::fs;
use std::io::{self, BufWriter, Write};
use std::path::{Path, PathBuf};
use std::time::SystemTime;

use image::{DynamicImage, ImageFormat};
use tempfile::NamedTempFile;

use super::MediaError;

/// Longest encoded name kept verbatim.
const MAX_NAME_LEN: usize = 200;

/// Thumbnail store rooted at one directory.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ThumbnailCache {
    dir: PathBuf,
}

impl ThumbnailCache {
    /// Create a cache in `dir`. The directory is created on first store.
    #[must_use]
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    /// Cache directory.
    #[must_use]
    pub fn dir(&self) -> &Path {
        &self.dir
    }

    /// Location of the entry for `original` at `max_side`.
    #[must_use]
    pub fn cache_path(&self, original: &Path, max_side: u32) -> PathBuf {
        let mut name = original
            .to_string_lossy()
            .replace(['/', '\\'], "__")
            .replace(':', "_");
        if name.len() > MAX_NAME_LEN {
            name = blake3::hash(original.to_string_lossy().as_bytes())
                .to_hex()
                .to_string();
        }
        self.dir.join(format!("{name}_{max_side}.png"))
    }

    /// Cached thumbnail, if present and decodable.
    #[must_use]
    pub fn load(&self, original: &Path, max_side: u32) -> Option<DynamicImage> {
        let path = self.cache_path(original, max_side);
        if !path.exists() {
            return None;
        }
        match image::open(&path) {
            Ok(img) => Some(img),
            Err(e) => {
                log::debug!("Ignoring unreadable thumbnail {}: {}", path.display(), e);
                None
            }
        }
    }

    /// Write `img` as the entry for `original`.
    ///
    /// The PNG is written to a temporary file in the cache directory and
    /// renamed into place.
    ///
    /// # Errors
    ///
    /// Returns an error if the directory cannot be created or the image
    /// cannot be encoded or written.
    pub fn store(
        &self,
        original: &Path,
        max_side: u32,
        img: &DynamicImage,
    ) -> Result<PathBuf, MediaError> {
        let io_err = |source: io::Error| MediaError::Io {
            path: self.dir.clone(),
            source,
        };

        fs::create_dir_all(&self.dir).map_err(io_err)?;
        let target = self.cache_path(original, max_side);

        let tmp = NamedTempFile::new_in(&self.dir).map_err(io_err)?;
        {
            let mut writer = BufWriter::new(tmp.as_file());
            DynamicImage::ImageRgba8(img.to_rgba8())
                .write_to(&mut writer, ImageFormat::Png)
                .map_err(|source| MediaError::Decode {
                    path: target.clone(),
                    source,
                })?;
            writer.flush().map_err(io_err)?;
        }
        tmp.persist(&target).map_err(|e| io_err(e.error))?;

        log::trace!("Cached thumbnail {}", target.display());
        Ok(target)
    }

    /// Return the cached entry or generate, store and return it.
    ///
    /// A failed store is logged; the generated image is still returned.
    ///
    /// # Errors
    ///
    /// Propagates the error of `generate`.
    pub fn get_or_insert_with<F>(
        &self,
        original: &Path,
        max_side: u32,
        generate: F,
    ) -> Result<DynamicImage, MediaError>
    where
        F: FnOnce() -> Result<DynamicImage, MediaError>,
    {
        if let Some(img) = self.load(original, max_side) {
            return Ok(img);
        }
        let img = generate()?;
        if let Err(e) = self.store(original, max_side, &img) {
            log::warn!("Failed to cache thumbnail for {}: {}", original.display(), e);
        }
        Ok(img)
    }

    /// Delete the oldest entries until at most `max_entries` remain.
    ///
    /// Returns the number of removed files. A missing directory counts as
    /// empty.
    ///
    /// # Errors
    ///
    /// Returns an error if the directory cannot be listed.
    pub fn prune(&self, max_entries: usize) -> io::Result<usize> {
        let listing = match fs::read_dir(&self.dir) {
            Ok(listing) => listing,
            Err(e) if e.kind() == io::ErrorKind::NotFound => return Ok(0),
            Err(e) => return Err(e),
        };

        let mut entries: Vec<(SystemTime, PathBuf)> = listing
            .filter_map(Result::ok)
            .map(|entry| entry.path())
            .filter(|path| path.extension().is_some_and(|ext| ext == "png"))
            .map(|path| {
                let modified = fs::metadata(&path)
                    .and_then(|m| m.modified())
                    .unwrap_or(SystemTime::UNIX_EPOCH);
                (modified, path)
            })
            .collect();

        if entries.len() <= max_entries {
            return Ok(0);
        }
        entries.sort();

        let excess = entries.len() - max_entries;
        let mut removed = 0;
        for (_, path) in entries.into_iter().take(excess) {
            match fs::remove_file(&path) {
                Ok(()) => removed += 1,
                Err(e) => log::debug!("Failed to prune {}: {}", path.display(), e),
            }
        }
        log::debug!("Pruned {} thumbnails from {}", removed, self.dir.display());
        Ok(removed)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use filetime::{set_file_mtime, FileTime};
    use image::RgbImage;
    use tempfile::TempDir;

    #[test]
    fn test_cache_path_encoding() {
        let cache = ThumbnailCache::new("/cache");
        let path = cache.cache_path(Path::new("/photos/a.jpg"), 128);
        assert_eq!(path, Path::new("/cache/__photos__a.jpg_128.png"));

        let path = cache.cache_path(Path::new("C:\\pics\\b.png"), 64);
        assert_eq!(path, Path::new("/cache/C___pics__b.png_64.png"));
    }

    #[test]
    fn test_cache_path_long_name_uses_digest() {
        let cache = ThumbnailCache::new("/cache");
        let long = format!("/{}/x.jpg", "d".repeat(300));
        let path = cache.cache_path(Path::new(&long), 128);
        let name = path.file_name().unwrap().to_string_lossy().into_owned();
        assert_eq!(name.len(), 64 + "_128.png".len());
    }

    #[test]
    fn test_store_and_load() {
        let dir = TempDir::new().unwrap();
        let cache = ThumbnailCache::new(dir.path().join("thumbs"));
        let original = Path::new("/photos/cat.jpg");
        let img =
            DynamicImage::ImageRgb8(RgbImage::from_pixel(4, 3, image::Rgb([10, 20, 30])));

        assert!(cache.load(original, 128).is_none());
        let stored = cache.store(original, 128, &img).unwrap();
        assert!(stored.exists());

        let loaded = cache.load(original, 128).unwrap();
        assert_eq!(loaded.to_rgb8(), img.to_rgb8());
        assert!(cache.load(original, 64).is_none());
    }

    #[test]
    fn test_get_or_insert_with_generates_once() {
        let dir = TempDir::new().unwrap();
        let cache = ThumbnailCache::new(dir.path());
        let original = Path::new("/videos/clip.mp4");
        let img = DynamicImage::ImageRgb8(RgbImage::new(2, 2));

        let first = cache.get_or_insert_with(original, 32, || Ok(img.clone()));
        assert!(first.is_ok());

        let second = cache.get_or_insert_with(original, 32, || {
            Err(MediaError::Unsupported(original.to_path_buf()))
        });
        assert!(second.is_ok());
    }

    #[test]
    fn test_prune_removes_oldest() {
        let dir = TempDir::new().unwrap();
        let cache = ThumbnailCache::new(dir.path());
        let img = DynamicImage::ImageRgb8(RgbImage::new(1, 1));

        let mut stored = Vec::new();
        for (i, name) in ["/a.jpg", "/b.jpg", "/c.jpg"].iter().enumerate() {
            let path = cache.store(Path::new(name), 8, &img).unwrap();
            set_file_mtime(&path, FileTime::from_unix_time(1_000 + i as i64, 0)).unwrap();
            stored.push(path);
        }

        assert_eq!(cache.prune(5).unwrap(), 0);
        assert_eq!(cache.prune(1).unwrap(), 2);
        assert!(!stored[0].exists());
        assert!(!stored[1].exists());
        assert!(stored[2].exists());
    }

    #[test]
    fn test_prune_missing_dir() {
        let cache = ThumbnailCache::new("/nonexistent/dupesweep/thumbs");
        assert_eq!(cache.prune(0).unwrap(), 0);
    }
}

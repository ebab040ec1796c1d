//! Engine settings.
//!
//! Settings are layered with figment, lowest priority first:
//!
//! 1. Built-in defaults ([`Settings::default`])
//! 2. `config.toml` in the platform config directory
//! 3. `DUPESWEEP_*` environment variables (e.g. `DUPESWEEP_FFMPEG_PATH`)
//!
//! None of this is process-wide state: callers load a [`Settings`] value and
//! hand it to the finder, hashers and executor explicitly.

use std::path::{Path, PathBuf};

use anyhow::Result;
use directories::ProjectDirs;
use figment::providers::{Env, Format, Serialized, Toml};
use figment::Figment;
use serde::{Deserialize, Serialize};

/// Prefix for environment overrides.
pub const ENV_PREFIX: &str = "DUPESWEEP_";

/// Environment variable naming the video frame decoder binary.
pub const FFMPEG_ENV: &str = "DUPESWEEP_FFMPEG_PATH";

/// Engine-wide tunables and well-known directories.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Settings {
    /// Directory receiving one JSON record per execution.
    pub log_dir: PathBuf,
    /// Directory holding cached thumbnails.
    pub thumbnail_dir: PathBuf,
    /// Directory holding scan and policy presets.
    pub preset_dir: PathBuf,
    /// Frame decoder binary; `None` means `ffmpeg` from `PATH`.
    pub ffmpeg_path: Option<PathBuf>,
    /// Seconds before a running frame decoder is killed.
    pub video_timeout_secs: u64,
    /// Seek position of the extracted video frame.
    pub video_seek: String,
    /// Number of leading bytes fed to the content hash.
    pub hash_prefix_bytes: u64,
    /// Files between two progress events.
    pub progress_batch: usize,
    /// Longest side of generated thumbnails.
    pub thumbnail_side: u32,
    /// Upper bound for `name (n)` probing during conflict resolution.
    pub rename_attempts: u32,
    /// Reuse decoded thumbnails across fingerprint requests.
    pub use_thumbnail_cache: bool,
}

impl Default for Settings {
    fn default() -> Self {
        let tmp = std::env::temp_dir();
        Self {
            log_dir: tmp.join("dupesweep_logs"),
            thumbnail_dir: tmp.join("dupesweep_thumbs"),
            preset_dir: tmp.join("dupesweep_presets"),
            ffmpeg_path: None,
            video_timeout_secs: 15,
            video_seek: "00:00:01.000".to_string(),
            hash_prefix_bytes: 1 << 20,
            progress_batch: 200,
            thumbnail_side: 128,
            rename_attempts: 9999,
            use_thumbnail_cache: true,
        }
    }
}

impl Settings {
    /// Load settings from the default config file and the environment.
    ///
    /// Never fails: any problem is logged and defaults are used instead.
    pub fn load() -> Self {
        let path = Self::config_path();
        match Self::load_from(path.as_deref()) {
            Ok(settings) => settings,
            Err(e) => {
                log::debug!("Failed to load settings, using defaults: {}", e);
                Self::default()
            }
        }
    }

    /// Load settings from an explicit TOML file (if any) plus the environment.
    ///
    /// # Errors
    ///
    /// Returns an error if the file or an environment value does not parse.
    pub fn load_from(path: Option<&Path>) -> Result<Self> {
        let mut figment = Figment::from(Serialized::defaults(Self::default()));
        if let Some(path) = path {
            if path.exists() {
                log::debug!("Loading settings from {}", path.display());
                figment = figment.merge(Toml::file(path));
            }
        }
        let settings = figment.merge(Env::prefixed(ENV_PREFIX)).extract()?;
        Ok(settings)
    }

    /// Default platform-specific location of `config.toml`.
    #[must_use]
    pub fn config_path() -> Option<PathBuf> {
        ProjectDirs::from("org", "dupesweep", "dupesweep")
            .map(|dirs| dirs.config_dir().join("config.toml"))
    }

    /// Resolve the frame decoder binary.
    ///
    /// The `DUPESWEEP_FFMPEG_PATH` variable wins over the configured value so
    /// that hosts which skip [`Settings::load`] still honor it.
    #[must_use]
    pub fn ffmpeg_binary(&self) -> PathBuf {
        std::env::var_os(FFMPEG_ENV)
            .filter(|v| !v.is_empty())
            .map(PathBuf::from)
            .or_else(|| self.ffmpeg_path.clone())
            .unwrap_or_else(|| PathBuf::from("ffmpeg"))
    }
}

//! Named scan and policy presets stored as JSON files.
//!
//! A store is a directory holding `<name>_scan.json` and
//! `<name>_policy.json` files. Names are plain file-name fragments: empty
//! names, `.`/`..` and anything containing a path separator are rejected.
//!
//! ```no_run
//! use dupesweep::presets::{PresetStore, ScanPreset};
//! use dupesweep::duplicates::ScanConfig;
//!
//! let store = PresetStore::new("/tmp/dupesweep_presets");
//! store.save_scan(&ScanPreset::new("photos", ScanConfig::new(vec!["/home/me/Pictures".into()])))?;
//! println!("{:?}", store.list_scans()?);
//! # Ok::<(), anyhow::Error>(())
//! ```

use std::fs;
use std::io::{self, Write};
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use tempfile::NamedTempFile;

use crate::config::Settings;
use crate::duplicates::ScanConfig;
use crate::error::ConfigError;
use crate::policy::Policy;

const SCAN_SUFFIX: &str = "_scan.json";
const POLICY_SUFFIX: &str = "_policy.json";

/// A saved scan configuration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ScanPreset {
    /// Preset name
    pub name: String,
    /// Stored configuration, without progress sink or token
    pub config: ScanConfig,
}

impl ScanPreset {
    /// Create a preset.
    #[must_use]
    pub fn new(name: impl Into<String>, config: ScanConfig) -> Self {
        Self {
            name: name.into(),
            config,
        }
    }
}

/// A saved policy.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PolicyPreset {
    /// Preset name
    pub name: String,
    /// Stored policy
    pub policy: Policy,
}

impl PolicyPreset {
    /// Create a preset.
    #[must_use]
    pub fn new(name: impl Into<String>, policy: Policy) -> Self {
        Self {
            name: name.into(),
            policy,
        }
    }
}

/// Check that `name` can be used as a file-name fragment.
///
/// # Errors
///
/// Returns [`ConfigError::InvalidName`] for empty names, `.`/`..` and
/// names containing `/` or `\`.
pub fn validate_name(name: &str) -> Result<(), ConfigError> {
    let trimmed = name.trim();
    if trimmed.is_empty()
        || trimmed == "."
        || trimmed == ".."
        || name.contains(['/', '\\'])
        || name.contains('\0')
    {
        return Err(ConfigError::InvalidName(name.to_string()));
    }
    Ok(())
}

/// Directory of presets.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PresetStore {
    dir: PathBuf,
}

impl PresetStore {
    /// Store rooted at `dir`. Nothing is created until the first save.
    #[must_use]
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    /// Store at the configured preset directory.
    #[must_use]
    pub fn from_settings(settings: &Settings) -> Self {
        Self::new(settings.preset_dir.clone())
    }

    /// Root directory.
    #[must_use]
    pub fn dir(&self) -> &Path {
        &self.dir
    }

    fn path_for(&self, name: &str, suffix: &str) -> Result<PathBuf> {
        validate_name(name)?;
        Ok(self.dir.join(format!("{name}{suffix}")))
    }

    fn write<T: Serialize>(&self, path: &Path, value: &T) -> Result<()> {
        fs::create_dir_all(&self.dir)
            .with_context(|| format!("Failed to create preset directory: {}", self.dir.display()))?;
        let json = serde_json::to_string_pretty(value).context("Failed to serialize preset")?;

        let mut tmp = NamedTempFile::new_in(&self.dir)
            .with_context(|| format!("Failed to create temp file in {}", self.dir.display()))?;
        tmp.write_all(json.as_bytes())
            .with_context(|| format!("Failed to write preset: {}", path.display()))?;
        tmp.persist(path)
            .with_context(|| format!("Failed to save preset: {}", path.display()))?;
        log::debug!("Saved preset {}", path.display());
        Ok(())
    }

    fn read<T: DeserializeOwned>(path: &Path) -> Result<T> {
        let content = fs::read_to_string(path)
            .with_context(|| format!("Failed to read preset: {}", path.display()))?;
        serde_json::from_str(&content)
            .with_context(|| format!("Failed to parse preset: {}", path.display()))
    }

    fn list(&self, suffix: &str) -> Result<Vec<String>> {
        let entries = match fs::read_dir(&self.dir) {
            Ok(entries) => entries,
            Err(e) if e.kind() == io::ErrorKind::NotFound => return Ok(Vec::new()),
            Err(e) => {
                return Err(e).with_context(|| {
                    format!("Failed to list presets in {}", self.dir.display())
                })
            }
        };

        let mut names: Vec<String> = entries
            .filter_map(|entry| entry.ok())
            .filter(|entry| entry.file_type().is_ok_and(|t| t.is_file()))
            .filter_map(|entry| {
                let file_name = entry.file_name().to_string_lossy().into_owned();
                file_name
                    .strip_suffix(suffix)
                    .filter(|name| !name.is_empty())
                    .map(str::to_string)
            })
            .collect();
        names.sort();
        Ok(names)
    }

    fn remove(&self, name: &str, suffix: &str) -> Result<bool> {
        let path = self.path_for(name, suffix)?;
        match fs::remove_file(&path) {
            Ok(()) => {
                log::debug!("Deleted preset {}", path.display());
                Ok(true)
            }
            Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(false),
            Err(e) => {
                Err(e).with_context(|| format!("Failed to delete preset: {}", path.display()))
            }
        }
    }

    /// Save a scan preset, replacing one of the same name.
    ///
    /// # Errors
    ///
    /// Returns an error for invalid names or if the file cannot be written.
    pub fn save_scan(&self, preset: &ScanPreset) -> Result<PathBuf> {
        let path = self.path_for(&preset.name, SCAN_SUFFIX)?;
        self.write(&path, preset)?;
        Ok(path)
    }

    /// Load the scan preset `name`.
    ///
    /// # Errors
    ///
    /// Returns an error for invalid names or missing or malformed files.
    pub fn load_scan(&self, name: &str) -> Result<ScanPreset> {
        Self::read(&self.path_for(name, SCAN_SUFFIX)?)
    }

    /// Names of all scan presets, sorted.
    ///
    /// # Errors
    ///
    /// Returns an error if the directory exists but cannot be read.
    pub fn list_scans(&self) -> Result<Vec<String>> {
        self.list(SCAN_SUFFIX)
    }

    /// Delete the scan preset `name`; `false` if it did not exist.
    ///
    /// # Errors
    ///
    /// Returns an error for invalid names or if removal fails.
    pub fn delete_scan(&self, name: &str) -> Result<bool> {
        self.remove(name, SCAN_SUFFIX)
    }

    /// Save a policy preset, replacing one of the same name.
    ///
    /// # Errors
    ///
    /// Returns an error for invalid names or if the file cannot be written.
    pub fn save_policy(&self, preset: &PolicyPreset) -> Result<PathBuf> {
        let path = self.path_for(&preset.name, POLICY_SUFFIX)?;
        self.write(&path, preset)?;
        Ok(path)
    }

    /// Load the policy preset `name`.
    ///
    /// # Errors
    ///
    /// Returns an error for invalid names or missing or malformed files.
    pub fn load_policy(&self, name: &str) -> Result<PolicyPreset> {
        Self::read(&self.path_for(name, POLICY_SUFFIX)?)
    }

    /// Names of all policy presets, sorted.
    ///
    /// # Errors
    ///
    /// Returns an error if the directory exists but cannot be read.
    pub fn list_policies(&self) -> Result<Vec<String>> {
        self.list(POLICY_SUFFIX)
    }

    /// Delete the policy preset `name`; `false` if it did not exist.
    ///
    /// # Errors
    ///
    /// Returns an error for invalid names or if removal fails.
    pub fn delete_policy(&self, name: &str) -> Result<bool> {
        self.remove(name, POLICY_SUFFIX)
    }
}

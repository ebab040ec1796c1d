//! Execution records and their on-disk form.
//!
//! Every executor or undo run yields an [`ExecResult`]: one
//! [`ExecLogEntry`] per plan item, in submission order. Results are saved
//! as `YYYYMMDD_HHMMSS_exec.json` files wrapped in an envelope carrying a
//! SHA-256 checksum of the compact record, which [`ExecResult::load`]
//! verifies.

use std::fmt;
use std::fs::{self, OpenOptions};
use std::io::{self, Write};
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};

use crate::policy::ActionType;

/// Outcome of one item.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ExecStatus {
    /// The operation was applied (or simulated in a dry run)
    Success,
    /// The operation was attempted and failed
    Fail,
    /// The operation was not attempted
    Skipped,
}

impl fmt::Display for ExecStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Success => "success",
            Self::Fail => "fail",
            Self::Skipped => "skipped",
        };
        f.write_str(name)
    }
}

/// Whether a result came from executing a plan or undoing one.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LogKind {
    /// Produced by the executor
    #[default]
    Execution,
    /// Produced by undo; never undone itself
    Undo,
}

/// Record of one processed item.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ExecLogEntry {
    /// When the item finished
    pub timestamp: DateTime<Utc>,
    /// Operation
    pub action: ActionType,
    /// File operated on
    pub source: PathBuf,
    /// Resolved destination, if any
    pub target: Option<PathBuf>,
    /// Outcome
    pub status: ExecStatus,
    /// Detail, empty on plain success
    #[serde(default)]
    pub message: String,
}

impl ExecLogEntry {
    /// Entry stamped with the current time.
    #[must_use]
    pub fn new(
        action: ActionType,
        source: impl Into<PathBuf>,
        target: Option<PathBuf>,
        status: ExecStatus,
        message: impl Into<String>,
    ) -> Self {
        Self {
            timestamp: Utc::now(),
            action,
            source: source.into(),
            target,
            status,
            message: message.into(),
        }
    }

    /// Whether the operation went through.
    #[must_use]
    pub fn is_success(&self) -> bool {
        self.status == ExecStatus::Success
    }
}

/// Ordered outcome of an execution or undo run.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ExecResult {
    /// Source of the entries
    #[serde(default)]
    pub kind: LogKind,
    /// Nothing on disk was changed
    #[serde(default)]
    pub dry_run: bool,
    /// One entry per item, in submission order
    pub entries: Vec<ExecLogEntry>,
}

/// Envelope for saved logs to include integrity checks.
#[derive(Debug, Serialize, Deserialize)]
struct LogEnvelope {
    /// SHA256 checksum of the compact serialized result.
    checksum: String,
    result: ExecResult,
}

fn checksum_of(result: &ExecResult) -> Result<String> {
    let json =
        serde_json::to_string(result).context("Failed to serialize log for checksum calculation")?;
    let mut hasher = Sha256::new();
    hasher.update(json.as_bytes());
    Ok(format!("{:x}", hasher.finalize()))
}

impl ExecResult {
    /// Empty result.
    #[must_use]
    pub fn new(kind: LogKind, dry_run: bool) -> Self {
        Self {
            kind,
            dry_run,
            entries: Vec::new(),
        }
    }

    /// Append an entry.
    pub fn push(&mut self, entry: ExecLogEntry) {
        self.entries.push(entry);
    }

    /// Number of entries.
    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Check if no item was processed.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    fn count(&self, status: ExecStatus) -> usize {
        self.entries.iter().filter(|e| e.status == status).count()
    }

    /// Number of successful items.
    #[must_use]
    pub fn success_count(&self) -> usize {
        self.count(ExecStatus::Success)
    }

    /// Number of failed items.
    #[must_use]
    pub fn fail_count(&self) -> usize {
        self.count(ExecStatus::Fail)
    }

    /// Number of skipped items.
    #[must_use]
    pub fn skipped_count(&self) -> usize {
        self.count(ExecStatus::Skipped)
    }

    /// Check if nothing failed.
    #[must_use]
    pub fn all_succeeded(&self) -> bool {
        self.fail_count() == 0
    }

    /// Human-readable summary of the run.
    #[must_use]
    pub fn summary(&self) -> String {
        let verb = match (self.kind, self.dry_run) {
            (LogKind::Undo, _) => "Undid",
            (LogKind::Execution, true) => "Would process",
            (LogKind::Execution, false) => "Processed",
        };
        format!(
            "{} {} item(s): {} succeeded, {} failed, {} skipped",
            verb,
            self.len(),
            self.success_count(),
            self.fail_count(),
            self.skipped_count()
        )
    }

    /// Serialize to a pretty-printed JSON envelope with a checksum.
    ///
    /// # Errors
    ///
    /// Returns an error if serialization fails.
    pub fn to_json(&self) -> Result<String> {
        let envelope = LogEnvelope {
            checksum: checksum_of(self)?,
            result: self.clone(),
        };
        serde_json::to_string_pretty(&envelope).context("Failed to serialize log envelope")
    }

    /// Parse and verify a JSON envelope.
    ///
    /// # Errors
    ///
    /// Returns an error if the text is not an envelope or the checksum does
    /// not match.
    pub fn from_json(content: &str) -> Result<Self> {
        let envelope: LogEnvelope = serde_json::from_str(content)
            .context("Failed to parse execution log. The file might be corrupted.")?;

        if checksum_of(&envelope.result)? != envelope.checksum {
            anyhow::bail!("Execution log integrity check failed: checksum mismatch");
        }
        Ok(envelope.result)
    }

    /// Write the result into `dir` under a timestamped name.
    ///
    /// The directory is created if needed. A name already taken within the
    /// same second gets a numeric suffix.
    ///
    /// # Errors
    ///
    /// Returns an error if the directory or file cannot be written.
    pub fn persist(&self, dir: &Path) -> Result<PathBuf> {
        fs::create_dir_all(dir)
            .with_context(|| format!("Failed to create log directory: {}", dir.display()))?;
        let json = self.to_json()?;

        let stamp = Utc::now().format("%Y%m%d_%H%M%S").to_string();
        let mut attempt = 0u32;
        loop {
            let name = if attempt == 0 {
                format!("{stamp}_exec.json")
            } else {
                format!("{stamp}_{attempt}_exec.json")
            };
            let path = dir.join(name);

            match OpenOptions::new().write(true).create_new(true).open(&path) {
                Ok(mut file) => {
                    file.write_all(json.as_bytes())
                        .with_context(|| format!("Failed to write log: {}", path.display()))?;
                    log::info!("Execution log written to {}", path.display());
                    return Ok(path);
                }
                Err(e) if e.kind() == io::ErrorKind::AlreadyExists && attempt < 1000 => {
                    attempt += 1;
                }
                Err(e) => {
                    return Err(e)
                        .with_context(|| format!("Failed to create log: {}", path.display()))
                }
            }
        }
    }

    /// Load and verify a saved result.
    ///
    /// # Errors
    ///
    /// Returns an error if the file is unreadable, malformed or tampered
    /// with.
    pub fn load(path: &Path) -> Result<Self> {
        let content = fs::read_to_string(path)
            .with_context(|| format!("Failed to read execution log: {}", path.display()))?;
        Self::from_json(&content)
            .with_context(|| format!("Invalid execution log: {}", path.display()))
    }
}

//! Plan execution.
//!
//! Items are processed one at a time, in plan order. Each item is
//! independent: a failure becomes a `fail` entry and the run continues.
//!
//! ```no_run
//! use dupesweep::actions::{execute, ExecuteOptions};
//! use dupesweep::policy::build_plan;
//! # let groups: Vec<dupesweep::duplicates::DuplicateGroup> = Vec::new();
//! # let policy = dupesweep::policy::Policy::default();
//!
//! let plan = build_plan(&groups, &policy);
//! let result = execute(&plan, &ExecuteOptions::default().with_dry_run(true));
//! println!("{}", result.summary());
//! ```

use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use super::conflict::{resolve_conflict, ConflictPolicy, Resolution, MAX_RENAME_ATTEMPTS};
use super::journal::{ExecLogEntry, ExecResult, ExecStatus, LogKind};
use crate::config::Settings;
use crate::error::ActionError;
use crate::policy::{ActionType, PlanItem, Policy};

/// How a plan is applied.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ExecuteOptions {
    /// Record what would happen without touching the filesystem
    pub dry_run: bool,
    /// Behavior when a target is already taken
    pub conflict_policy: ConflictPolicy,
    /// Bound for `name (n).ext` probing
    pub rename_attempts: u32,
}

impl Default for ExecuteOptions {
    fn default() -> Self {
        Self {
            dry_run: false,
            conflict_policy: ConflictPolicy::Skip,
            rename_attempts: MAX_RENAME_ATTEMPTS,
        }
    }
}

impl ExecuteOptions {
    /// Defaults with the rename bound from `settings`.
    #[must_use]
    pub fn from_settings(settings: &Settings) -> Self {
        Self::default().with_rename_attempts(settings.rename_attempts)
    }

    /// Defaults with the dry-run flag of `policy`'s action.
    #[must_use]
    pub fn for_policy(policy: &Policy) -> Self {
        Self::default().with_dry_run(policy.action.dry_run)
    }

    /// Set dry-run mode.
    #[must_use]
    pub fn with_dry_run(mut self, dry_run: bool) -> Self {
        self.dry_run = dry_run;
        self
    }

    /// Set the conflict policy.
    #[must_use]
    pub fn with_conflict_policy(mut self, policy: ConflictPolicy) -> Self {
        self.conflict_policy = policy;
        self
    }

    /// Set the rename bound.
    #[must_use]
    pub fn with_rename_attempts(mut self, attempts: u32) -> Self {
        self.rename_attempts = attempts;
        self
    }
}

/// Callback for execution progress.
pub trait ExecProgressCallback: Send + Sync {
    /// Called before each item.
    fn on_before_item(&self, item: &PlanItem, index: usize, total: usize);

    /// Called with the entry recorded for the item.
    fn on_item_done(&self, entry: &ExecLogEntry);

    /// Called when the run completes.
    fn on_complete(&self, result: &ExecResult);
}

enum Outcome {
    Done(Option<PathBuf>),
    Skipped(&'static str),
}

/// Apply `plan` and record every outcome.
#[must_use]
pub fn execute(plan: &[PlanItem], options: &ExecuteOptions) -> ExecResult {
    execute_with_callback(plan, options, None)
}

/// Apply `plan`, reporting each item to `callback`.
#[must_use]
pub fn execute_with_callback(
    plan: &[PlanItem],
    options: &ExecuteOptions,
    callback: Option<&dyn ExecProgressCallback>,
) -> ExecResult {
    let mut result = ExecResult::new(LogKind::Execution, options.dry_run);
    let total = plan.len();

    log::info!(
        "Executing {} item(s){}",
        total,
        if options.dry_run { " (dry run)" } else { "" }
    );

    for (index, item) in plan.iter().enumerate() {
        if let Some(cb) = callback {
            cb.on_before_item(item, index, total);
        }

        let entry = if options.dry_run {
            ExecLogEntry::new(
                item.action,
                &item.source.path,
                item.target.clone(),
                ExecStatus::Success,
                "dry-run",
            )
        } else {
            apply_item(item, options)
        };

        if let Some(cb) = callback {
            cb.on_item_done(&entry);
        }
        result.push(entry);
    }

    log::info!("{}", result.summary());
    if let Some(cb) = callback {
        cb.on_complete(&result);
    }
    result
}

fn apply_item(item: &PlanItem, options: &ExecuteOptions) -> ExecLogEntry {
    let source = &item.source.path;

    let outcome = match item.action {
        ActionType::Delete => fs::remove_file(source)
            .map(|()| Outcome::Done(None))
            .map_err(|e| ActionError::io(source, e)),
        ActionType::Recycle => trash::delete(source)
            .map(|()| Outcome::Done(None))
            .map_err(|e| ActionError::TrashFailed {
                path: source.clone(),
                message: e.to_string(),
            }),
        ActionType::Move | ActionType::Copy | ActionType::Rename => {
            transfer(item, options)
        }
        ActionType::Mark => Ok(Outcome::Skipped("unsupported action")),
    };

    match outcome {
        Ok(Outcome::Done(target)) => {
            log::debug!("{} {}", item.action, source.display());
            ExecLogEntry::new(item.action, source, target, ExecStatus::Success, "")
        }
        Ok(Outcome::Skipped(reason)) => {
            log::debug!("Skipped {}: {}", source.display(), reason);
            ExecLogEntry::new(
                item.action,
                source,
                item.target.clone(),
                ExecStatus::Skipped,
                reason,
            )
        }
        Err(e) => {
            log::warn!("{} failed: {}", item.action, e);
            ExecLogEntry::new(
                item.action,
                source,
                item.target.clone(),
                ExecStatus::Fail,
                e.to_string(),
            )
        }
    }
}

fn transfer(item: &PlanItem, options: &ExecuteOptions) -> Result<Outcome, ActionError> {
    let source = &item.source.path;
    let target = item
        .target
        .as_deref()
        .ok_or_else(|| ActionError::MissingTarget(source.clone()))?;

    if target == source.as_path() {
        return Ok(Outcome::Skipped("target equals source"));
    }

    // The source must exist before an overwrite may remove the target
    fs::symlink_metadata(source).map_err(|e| ActionError::io(source, e))?;

    if matches!(item.action, ActionType::Move | ActionType::Copy) {
        if let Some(parent) = target.parent().filter(|p| !p.as_os_str().is_empty()) {
            fs::create_dir_all(parent).map_err(|e| ActionError::io(parent, e))?;
        }
    }

    let resolved = match resolve_conflict(target, options.conflict_policy, options.rename_attempts)?
    {
        Resolution::Use(path) => path,
        Resolution::Skip => return Ok(Outcome::Skipped("conflict: exists")),
    };

    match item.action {
        ActionType::Copy => {
            fs::copy(source, &resolved).map_err(|e| ActionError::io(source, e))?;
        }
        ActionType::Move => move_file(source, &resolved)?,
        _ => fs::rename(source, &resolved).map_err(|e| ActionError::io(source, e))?,
    }
    Ok(Outcome::Done(Some(resolved)))
}

/// Rename, or copy then remove when the rename crosses devices.
pub(crate) fn move_file(source: &Path, target: &Path) -> Result<(), ActionError> {
    match fs::rename(source, target) {
        Ok(()) => Ok(()),
        Err(rename_err) => {
            log::debug!(
                "Rename {} -> {} failed ({}), copying instead",
                source.display(),
                target.display(),
                rename_err
            );
            fs::copy(source, target).map_err(|e| ActionError::io(source, e))?;
            if let Err(e) = fs::remove_file(source) {
                // Leave the source as the only copy
                if let Err(cleanup) = fs::remove_file(target) {
                    if cleanup.kind() != io::ErrorKind::NotFound {
                        log::warn!(
                            "Could not remove partial copy {}: {}",
                            target.display(),
                            cleanup
                        );
                    }
                }
                return Err(ActionError::io(source, e));
            }
            Ok(())
        }
    }
}

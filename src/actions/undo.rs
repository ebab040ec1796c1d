//! Reversal of execution results.
//!
//! Entries are replayed last to first. Moves and renames are put back,
//! copies are removed, and deletions stay as they are. Undo entries keep
//! the source and target of the entry they reverse.

use std::fs;
use std::path::Path;

use super::conflict::occupied;
use super::executor::move_file;
use super::journal::{ExecLogEntry, ExecResult, ExecStatus, LogKind};
use crate::error::ActionError;
use crate::policy::ActionType;

/// Reverse `result`.
///
/// Only `success` entries of a real execution are reversed. Entries of a
/// dry run, of an undo result, or with any other status come back as
/// `skipped`.
#[must_use]
pub fn undo(result: &ExecResult) -> ExecResult {
    let mut undone = ExecResult::new(LogKind::Undo, false);

    for entry in result.entries.iter().rev() {
        let reason = if result.kind == LogKind::Undo {
            Some("undo results cannot be undone")
        } else if result.dry_run {
            Some("dry-run")
        } else if entry.status != ExecStatus::Success {
            Some("not applied")
        } else {
            None
        };

        let record = match reason {
            Some(reason) => skipped(entry, reason),
            None => reverse(entry),
        };
        undone.push(record);
    }

    log::info!("{}", undone.summary());
    undone
}

fn skipped(entry: &ExecLogEntry, reason: &str) -> ExecLogEntry {
    ExecLogEntry::new(
        entry.action,
        &entry.source,
        entry.target.clone(),
        ExecStatus::Skipped,
        reason,
    )
}

fn reverse(entry: &ExecLogEntry) -> ExecLogEntry {
    let outcome = match entry.action {
        ActionType::Move | ActionType::Rename => put_back(entry),
        ActionType::Copy => remove_copy(entry),
        ActionType::Delete => return skipped(entry, "cannot undo delete"),
        ActionType::Recycle => return skipped(entry, "cannot undo recycle"),
        ActionType::Mark => return skipped(entry, "unsupported"),
    };

    match outcome {
        Ok(()) => {
            log::debug!("Undid {} of {}", entry.action, entry.source.display());
            ExecLogEntry::new(
                entry.action,
                &entry.source,
                entry.target.clone(),
                ExecStatus::Success,
                "",
            )
        }
        Err(e) => {
            log::warn!("Undo of {} failed: {}", entry.action, e);
            ExecLogEntry::new(
                entry.action,
                &entry.source,
                entry.target.clone(),
                ExecStatus::Fail,
                e.to_string(),
            )
        }
    }
}

fn put_back(entry: &ExecLogEntry) -> Result<(), ActionError> {
    let target = entry
        .target
        .as_deref()
        .ok_or_else(|| ActionError::MissingTarget(entry.source.clone()))?;
    let source: &Path = &entry.source;

    if occupied(source) {
        return Err(ActionError::SourceOccupied(source.to_path_buf()));
    }
    if let Some(parent) = source.parent().filter(|p| !p.as_os_str().is_empty()) {
        fs::create_dir_all(parent).map_err(|e| ActionError::io(parent, e))?;
    }
    move_file(target, source)
}

fn remove_copy(entry: &ExecLogEntry) -> Result<(), ActionError> {
    let target = entry
        .target
        .as_deref()
        .ok_or_else(|| ActionError::MissingTarget(entry.source.clone()))?;
    fs::remove_file(target).map_err(|e| ActionError::io(target, e))
}

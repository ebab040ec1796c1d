//! Keep rules, action templates and plan generation.
//!
//! A [`Policy`] picks one keeper per duplicate group with its [`KeepRule`]
//! and applies its [`Action`] to every other member. [`build_plan`] is pure:
//! it never touches the filesystem and the same input always yields the
//! same plan.
//!
//! ```
//! use dupesweep::policy::{build_plan, Policy};
//!
//! let policy = Policy::default();
//! let plan = build_plan(&[], &policy);
//! assert!(plan.is_empty());
//! ```

use std::fmt;
use std::path::{Path, PathBuf};
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::duplicates::DuplicateGroup;
use crate::scanner::FileRecord;

/// File operation applied to non-kept members.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ActionType {
    /// Remove permanently
    Delete,
    /// Move to the platform trash
    Recycle,
    /// Move into a destination directory
    Move,
    /// Copy into a destination directory
    Copy,
    /// Append a suffix to the file name
    Rename,
    /// Record only, no filesystem effect
    Mark,
}

impl ActionType {
    /// Whether the action writes to a target path.
    #[must_use]
    pub fn needs_target(self) -> bool {
        matches!(self, Self::Move | Self::Copy | Self::Rename)
    }
}

impl fmt::Display for ActionType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Delete => "delete",
            Self::Recycle => "recycle",
            Self::Move => "move",
            Self::Copy => "copy",
            Self::Rename => "rename",
            Self::Mark => "mark",
        };
        f.write_str(name)
    }
}

impl FromStr for ActionType {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "delete" => Ok(Self::Delete),
            "recycle" | "trash" => Ok(Self::Recycle),
            "move" => Ok(Self::Move),
            "copy" => Ok(Self::Copy),
            "rename" => Ok(Self::Rename),
            "mark" => Ok(Self::Mark),
            other => Err(format!("unknown action: {other}")),
        }
    }
}

/// Which member of a group survives.
///
/// The first set flag wins, in field order. With no flag set the first
/// member is kept.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct KeepRule {
    /// Keep the most recently modified file
    pub keep_newest: bool,
    /// Keep the least recently modified file
    pub keep_oldest: bool,
    /// Keep the file with the shortest parent directory path
    pub keep_shortest_dir: bool,
}

impl KeepRule {
    /// Rule keeping the newest file.
    #[must_use]
    pub fn newest() -> Self {
        Self {
            keep_newest: true,
            ..Self::default()
        }
    }

    /// Rule keeping the oldest file.
    #[must_use]
    pub fn oldest() -> Self {
        Self {
            keep_oldest: true,
            ..Self::default()
        }
    }

    /// Rule keeping the file closest to the filesystem root.
    #[must_use]
    pub fn shortest_dir() -> Self {
        Self {
            keep_shortest_dir: true,
            ..Self::default()
        }
    }
}

/// Operation template with its parameters.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Action {
    /// Operation
    #[serde(rename = "type")]
    pub action_type: ActionType,
    /// Destination for move and copy; empty means none
    #[serde(default)]
    pub destination_dir: PathBuf,
    /// Suffix appended by rename
    #[serde(default)]
    pub rename_suffix: String,
    /// Preview only
    #[serde(default)]
    pub dry_run: bool,
}

impl Action {
    /// Action of `action_type` with no parameters.
    #[must_use]
    pub fn new(action_type: ActionType) -> Self {
        Self {
            action_type,
            destination_dir: PathBuf::new(),
            rename_suffix: String::new(),
            dry_run: false,
        }
    }

    /// Set the move/copy destination.
    #[must_use]
    pub fn with_destination(mut self, dir: impl Into<PathBuf>) -> Self {
        self.destination_dir = dir.into();
        self
    }

    /// Set the rename suffix.
    #[must_use]
    pub fn with_suffix(mut self, suffix: impl Into<String>) -> Self {
        self.rename_suffix = suffix.into();
        self
    }

    /// Mark as preview only.
    #[must_use]
    pub fn with_dry_run(mut self, dry_run: bool) -> Self {
        self.dry_run = dry_run;
        self
    }

    /// Planned target for `source`, if the action has one.
    #[must_use]
    pub fn target_for(&self, source: &Path) -> Option<PathBuf> {
        match self.action_type {
            ActionType::Move | ActionType::Copy => {
                if self.destination_dir.as_os_str().is_empty() {
                    return None;
                }
                let name = source.file_name()?;
                Some(self.destination_dir.join(name))
            }
            ActionType::Rename => {
                let mut target = source.as_os_str().to_os_string();
                target.push(&self.rename_suffix);
                Some(PathBuf::from(target))
            }
            ActionType::Delete | ActionType::Recycle | ActionType::Mark => None,
        }
    }
}

/// Named keep rule plus action.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Policy {
    /// Display name
    pub name: String,
    /// Free-form description
    #[serde(default)]
    pub description: String,
    /// Keeper selection
    #[serde(default)]
    pub rule: KeepRule,
    /// Operation for the other members
    pub action: Action,
}

impl Default for Policy {
    /// Keep the newest file, preview deleting the rest.
    fn default() -> Self {
        Self::keep_one_delete()
    }
}

impl Policy {
    /// Create a policy.
    #[must_use]
    pub fn new(name: impl Into<String>, rule: KeepRule, action: Action) -> Self {
        Self {
            name: name.into(),
            description: String::new(),
            rule,
            action,
        }
    }

    /// Set the description.
    #[must_use]
    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = description.into();
        self
    }

    /// Keep the newest file of each group and (in preview) delete the rest.
    #[must_use]
    pub fn keep_one_delete() -> Self {
        Self::new(
            "keep-one-delete",
            KeepRule::newest(),
            Action::new(ActionType::Delete).with_dry_run(true),
        )
        .with_description("Keep one file per group, delete the others (preview)")
    }

    /// Keep the newest file and (in preview) move the rest into `dir`.
    #[must_use]
    pub fn move_to(dir: impl Into<PathBuf>) -> Self {
        Self::new(
            "move-duplicates",
            KeepRule::newest(),
            Action::new(ActionType::Move)
                .with_destination(dir)
                .with_dry_run(true),
        )
        .with_description("Move duplicates into an archive directory (preview)")
    }

    /// Keep the newest file and (in preview) append `.dup` to the rest.
    #[must_use]
    pub fn add_suffix() -> Self {
        Self::new(
            "add-suffix",
            KeepRule::newest(),
            Action::new(ActionType::Rename)
                .with_suffix(".dup")
                .with_dry_run(true),
        )
        .with_description("Append a .dup suffix to duplicates (preview)")
    }
}

/// One planned operation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PlanItem {
    /// Group the source belongs to
    pub group_id: String,
    /// File to operate on
    pub source: FileRecord,
    /// Destination path, for move, copy and rename
    pub target: Option<PathBuf>,
    /// Operation
    pub action: ActionType,
}

/// Index of the member `rule` keeps. Ties go to the lowest index.
///
/// Returns `0` for an empty slice.
#[must_use]
pub fn select_keeper(files: &[FileRecord], rule: &KeepRule) -> usize {
    if rule.keep_newest {
        best_index(files, |a, b| a.modified > b.modified)
    } else if rule.keep_oldest {
        best_index(files, |a, b| a.modified < b.modified)
    } else if rule.keep_shortest_dir {
        best_index(files, |a, b| parent_len(&a.path) < parent_len(&b.path))
    } else {
        0
    }
}

/// First index no later member is strictly `better` than.
fn best_index<F>(files: &[FileRecord], better: F) -> usize
where
    F: Fn(&FileRecord, &FileRecord) -> bool,
{
    files
        .iter()
        .enumerate()
        .skip(1)
        .fold(0, |best, (i, f)| if better(f, &files[best]) { i } else { best })
}

fn parent_len(path: &Path) -> usize {
    path.parent().map_or(0, |p| p.as_os_str().len())
}

/// Expand `groups` into an ordered plan.
///
/// Groups with fewer than two members are ignored. Items follow group
/// order, then member order, skipping each group's keeper.
#[must_use]
pub fn build_plan(groups: &[DuplicateGroup], policy: &Policy) -> Vec<PlanItem> {
    let plan: Vec<PlanItem> = groups
        .iter()
        .filter(|g| g.files.len() >= 2)
        .flat_map(|group| {
            let keeper = select_keeper(&group.files, &policy.rule);
            log::trace!(
                "Group {}: keeping {}",
                group.group_id,
                group.files[keeper].path.display()
            );
            group
                .files
                .iter()
                .enumerate()
                .filter(move |(i, _)| *i != keeper)
                .map(move |(_, file)| PlanItem {
                    group_id: group.group_id.clone(),
                    source: file.clone(),
                    target: policy.action.target_for(&file.path),
                    action: policy.action.action_type,
                })
        })
        .collect();

    log::debug!(
        "Policy '{}' planned {} {} operation(s)",
        policy.name,
        plan.len(),
        policy.action.action_type
    );
    plan
}

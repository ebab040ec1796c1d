use dupesweep::actions::{execute, undo, ExecResult, ExecStatus, ExecuteOptions, LogKind};
use dupesweep::duplicates::{DuplicateFinder, ScanConfig};
use dupesweep::policy::{build_plan, Action, ActionType, KeepRule, Policy};
use std::fs;
use std::path::Path;
use tempfile::tempdir;

fn populate(root: &Path) {
    fs::create_dir_all(root.join("one")).unwrap();
    fs::create_dir_all(root.join("two")).unwrap();
    fs::write(root.join("one/a.txt"), b"alpha").unwrap();
    fs::write(root.join("two/a.txt"), b"alpha").unwrap();
    fs::write(root.join("two/b.txt"), b"alpha").unwrap();
}

fn plan_for(root: &Path, action: Action) -> Vec<dupesweep::policy::PlanItem> {
    let (groups, _) = DuplicateFinder::with_defaults()
        .find_duplicates(&ScanConfig::new(vec![root.to_path_buf()]))
        .unwrap();
    build_plan(&groups, &Policy::new("test", KeepRule::default(), action))
}

#[test]
fn test_move_then_undo_restores_tree() {
    let dir = tempdir().unwrap();
    let data = dir.path().join("data");
    populate(&data);
    let archive = dir.path().join("archive");

    let plan = plan_for(&data, Action::new(ActionType::Move).with_destination(&archive));
    let options = ExecuteOptions::default()
        .with_conflict_policy(dupesweep::actions::ConflictPolicy::Rename);
    let result = execute(&plan, &options);
    assert_eq!(result.success_count(), 2);
    assert!(!data.join("two/a.txt").exists());
    assert!(archive.join("a.txt").exists());

    // Round-trip through the journal
    let log = result.persist(&dir.path().join("logs")).unwrap();
    let undone = undo(&ExecResult::load(&log).unwrap());

    assert_eq!(undone.kind, LogKind::Undo);
    assert_eq!(undone.success_count(), 2);
    assert_eq!(fs::read(data.join("two/a.txt")).unwrap(), b"alpha");
    assert_eq!(fs::read(data.join("two/b.txt")).unwrap(), b"alpha");
    assert!(fs::read_dir(&archive).unwrap().next().is_none());
}

#[test]
fn test_copy_then_undo_removes_copies() {
    let dir = tempdir().unwrap();
    let data = dir.path().join("data");
    populate(&data);
    let copies = dir.path().join("copies");

    let plan = plan_for(&data, Action::new(ActionType::Copy).with_destination(&copies));
    let result = execute(
        &plan,
        &ExecuteOptions::default().with_conflict_policy(dupesweep::actions::ConflictPolicy::Rename),
    );
    assert_eq!(result.success_count(), 2);

    let undone = undo(&result);
    assert_eq!(undone.success_count(), 2);
    assert!(fs::read_dir(&copies).unwrap().next().is_none());
    assert!(data.join("two/a.txt").exists());
}

#[test]
fn test_delete_is_not_undoable() {
    let dir = tempdir().unwrap();
    let data = dir.path().join("data");
    populate(&data);

    let plan = plan_for(&data, Action::new(ActionType::Delete));
    let result = execute(&plan, &ExecuteOptions::default());
    assert_eq!(result.success_count(), 2);

    let undone = undo(&result);
    assert_eq!(undone.skipped_count(), 2);
    assert!(undone
        .entries
        .iter()
        .all(|e| e.status == ExecStatus::Skipped && e.message == "cannot undo delete"));
    assert!(!data.join("two/a.txt").exists());
}

#[test]
fn test_undo_of_undo_does_nothing() {
    let dir = tempdir().unwrap();
    let data = dir.path().join("data");
    populate(&data);

    let plan = plan_for(&data, Action::new(ActionType::Rename).with_suffix(".old"));
    let result = execute(&plan, &ExecuteOptions::default());
    let undone = undo(&result);
    assert_eq!(undone.success_count(), 2);
    assert!(data.join("two/a.txt").exists());

    let again = undo(&undone);
    assert_eq!(again.skipped_count(), 2);
    assert!(data.join("two/a.txt").exists());
    assert!(!data.join("two/a.txt.old").exists());
}

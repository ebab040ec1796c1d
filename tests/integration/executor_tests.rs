use dupesweep::actions::{execute, ConflictPolicy, ExecResult, ExecStatus, ExecuteOptions};
use dupesweep::duplicates::{DuplicateFinder, ScanConfig};
use dupesweep::policy::{build_plan, Action, ActionType, KeepRule, Policy};
use filetime::{set_file_mtime, FileTime};
use std::fs;
use std::path::{Path, PathBuf};
use tempfile::tempdir;

fn write(path: &Path, content: &[u8]) -> PathBuf {
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent).unwrap();
    }
    fs::write(path, content).unwrap();
    path.to_path_buf()
}

fn scan(root: &Path) -> Vec<dupesweep::duplicates::DuplicateGroup> {
    let (groups, _) = DuplicateFinder::with_defaults()
        .find_duplicates(&ScanConfig::new(vec![root.to_path_buf()]))
        .unwrap();
    groups
}

#[test]
fn test_move_conflict_rename_scenario() {
    let dir = tempdir().unwrap();
    let photos = dir.path().join("photos");
    let archive = dir.path().join("archive");
    let keep = write(&photos.join("a/photo.jpg"), b"jpeg bytes");
    let dup = write(&photos.join("b/photo.jpg"), b"jpeg bytes");
    write(&archive.join("photo.jpg"), b"someone else");
    set_file_mtime(&keep, FileTime::from_unix_time(2_000_000, 0)).unwrap();
    set_file_mtime(&dup, FileTime::from_unix_time(1_000_000, 0)).unwrap();

    let groups = scan(&photos);
    assert_eq!(groups.len(), 1);

    let policy = Policy::new(
        "archive",
        KeepRule::newest(),
        Action::new(ActionType::Move).with_destination(&archive),
    );
    let plan = build_plan(&groups, &policy);
    assert_eq!(plan.len(), 1);
    assert_eq!(plan[0].source.path, dup);
    assert_eq!(plan[0].target, Some(archive.join("photo.jpg")));

    let options = ExecuteOptions::default().with_conflict_policy(ConflictPolicy::Rename);
    let result = execute(&plan, &options);

    assert_eq!(result.entries[0].status, ExecStatus::Success);
    assert_eq!(result.entries[0].target, Some(archive.join("photo (1).jpg")));
    assert!(keep.exists());
    assert!(!dup.exists());
    assert_eq!(
        fs::read(archive.join("photo (1).jpg")).unwrap(),
        b"jpeg bytes"
    );
    assert_eq!(fs::read(archive.join("photo.jpg")).unwrap(), b"someone else");
}

#[test]
fn test_delete_keeps_one_copy_per_group() {
    let dir = tempdir().unwrap();
    write(&dir.path().join("x/1.bin"), b"first");
    write(&dir.path().join("x/2.bin"), b"first");
    write(&dir.path().join("x/3.bin"), b"first");
    write(&dir.path().join("y/1.bin"), b"second");
    write(&dir.path().join("y/2.bin"), b"second");

    let groups = scan(dir.path());
    let policy = Policy::new("purge", KeepRule::default(), Action::new(ActionType::Delete));
    let result = execute(&build_plan(&groups, &policy), &ExecuteOptions::default());

    assert_eq!(result.success_count(), 3);
    assert!(dir.path().join("x/1.bin").exists());
    assert!(dir.path().join("y/1.bin").exists());
    assert!(!dir.path().join("x/2.bin").exists());
    assert!(!dir.path().join("x/3.bin").exists());
    assert!(!dir.path().join("y/2.bin").exists());
}

#[test]
fn test_default_policy_is_a_preview() {
    let dir = tempdir().unwrap();
    let a = write(&dir.path().join("a"), b"same");
    let b = write(&dir.path().join("b"), b"same");
    set_file_mtime(&b, FileTime::from_unix_time(1_000_000, 0)).unwrap();

    let policy = Policy::default();
    let plan = build_plan(&scan(dir.path()), &policy);
    let result = execute(&plan, &ExecuteOptions::for_policy(&policy));

    assert!(result.dry_run);
    assert_eq!(result.success_count(), 1);
    assert_eq!(result.entries[0].message, "dry-run");
    assert!(a.exists() && b.exists());
}

#[test]
fn test_rename_suffix_and_persisted_log() {
    let dir = tempdir().unwrap();
    let a = write(&dir.path().join("data/a.txt"), b"x");
    let b = write(&dir.path().join("data/b.txt"), b"x");
    set_file_mtime(&a, FileTime::from_unix_time(2_000_000, 0)).unwrap();
    set_file_mtime(&b, FileTime::from_unix_time(1_000_000, 0)).unwrap();

    let policy = Policy::add_suffix();
    let plan = build_plan(&scan(&dir.path().join("data")), &policy);
    let result = execute(&plan, &ExecuteOptions::default());
    assert_eq!(result.entries[0].status, ExecStatus::Success);
    assert!(dir.path().join("data/b.txt.dup").exists());
    assert!(!b.exists());

    let log = result.persist(&dir.path().join("logs")).unwrap();
    let loaded = ExecResult::load(&log).unwrap();
    assert_eq!(loaded, result);
}

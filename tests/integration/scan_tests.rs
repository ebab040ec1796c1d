use dupesweep::duplicates::{DuplicateFinder, FinderError, ScanConfig, ScanMode};
use dupesweep::scanner::HashAlgorithm;
use dupesweep::CancellationToken;
use std::fs;
use std::path::{Path, PathBuf};
use tempfile::tempdir;

fn write(dir: &Path, name: &str, content: &[u8]) -> PathBuf {
    let path = dir.join(name);
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent).unwrap();
    }
    fs::write(&path, content).unwrap();
    path
}

#[test]
fn test_scan_empty_directory() {
    let dir = tempdir().unwrap();
    let finder = DuplicateFinder::with_defaults();

    let (groups, summary) = finder
        .find_duplicates(&ScanConfig::new(vec![dir.path().to_path_buf()]))
        .unwrap();

    assert!(groups.is_empty());
    assert_eq!(summary.total_files, 0);
    assert_eq!(summary.duplicate_groups, 0);
}

#[test]
fn test_two_roots_with_exclusion() {
    let dir = tempdir().unwrap();
    let root_a = dir.path().join("a");
    let root_b = dir.path().join("b");
    write(&root_a, "one.txt", b"same bytes");
    write(&root_b, "two.txt", b"same bytes");
    write(&root_b, "three.tmp", b"same bytes");

    let config = ScanConfig::new(vec![root_a.clone(), root_b.clone()])
        .with_exclude_patterns(vec!["*.tmp".to_string()]);
    let (groups, summary) = DuplicateFinder::with_defaults()
        .find_duplicates(&config)
        .unwrap();

    assert_eq!(summary.total_files, 2);
    assert_eq!(groups.len(), 1);
    assert_eq!(
        groups[0].paths(),
        vec![root_a.join("one.txt"), root_b.join("two.txt")]
    );
}

#[test]
fn test_overlapping_roots_count_files_once() {
    let dir = tempdir().unwrap();
    write(dir.path(), "x/a.bin", b"payload");
    write(dir.path(), "x/b.bin", b"payload");

    let config = ScanConfig::new(vec![
        dir.path().to_path_buf(),
        dir.path().join("x"),
        dir.path().to_path_buf(),
    ]);
    let (groups, summary) = DuplicateFinder::with_defaults()
        .find_duplicates(&config)
        .unwrap();

    assert_eq!(summary.total_files, 2);
    assert_eq!(groups.len(), 1);
    assert_eq!(groups[0].len(), 2);
}

#[test]
fn test_missing_root_is_skipped() {
    let dir = tempdir().unwrap();
    write(dir.path(), "a.txt", b"dup");
    write(dir.path(), "b.txt", b"dup");

    let config = ScanConfig::new(vec![
        dir.path().join("does-not-exist"),
        dir.path().to_path_buf(),
    ]);
    let (groups, _) = DuplicateFinder::with_defaults()
        .find_duplicates(&config)
        .unwrap();
    assert_eq!(groups.len(), 1);
}

#[test]
fn test_file_root_is_a_candidate() {
    let dir = tempdir().unwrap();
    let a = write(dir.path(), "a.txt", b"dup");
    let b = write(dir.path(), "sub/b.txt", b"dup");

    let config = ScanConfig::new(vec![a.clone(), dir.path().join("sub")]);
    let (groups, _) = DuplicateFinder::with_defaults()
        .find_duplicates(&config)
        .unwrap();
    assert_eq!(groups.len(), 1);
    assert_eq!(groups[0].paths(), vec![a, b]);
}

#[test]
fn test_size_bounds() {
    let dir = tempdir().unwrap();
    write(dir.path(), "small1", b"ab");
    write(dir.path(), "small2", b"ab");
    write(dir.path(), "big1", &[7u8; 100]);
    write(dir.path(), "big2", &[7u8; 100]);

    let config = ScanConfig::new(vec![dir.path().to_path_buf()]).with_size_bounds(10, 0);
    let (groups, summary) = DuplicateFinder::with_defaults()
        .find_duplicates(&config)
        .unwrap();
    assert_eq!(summary.total_files, 2);
    assert_eq!(groups.len(), 1);
    assert_eq!(groups[0].files[0].size, 100);

    let config = ScanConfig::new(vec![dir.path().to_path_buf()]).with_size_bounds(0, 10);
    let (groups, _) = DuplicateFinder::with_defaults()
        .find_duplicates(&config)
        .unwrap();
    assert_eq!(groups.len(), 1);
    assert_eq!(groups[0].files[0].size, 2);
}

#[test]
fn test_empty_files_group_together() {
    let dir = tempdir().unwrap();
    write(dir.path(), "e1", b"");
    write(dir.path(), "e2", b"");

    let (groups, _) = DuplicateFinder::with_defaults()
        .find_duplicates(&ScanConfig::new(vec![dir.path().to_path_buf()]))
        .unwrap();
    assert_eq!(groups.len(), 1);
    assert_eq!(groups[0].total_size(), 0);
}

#[test]
fn test_hash_algorithms_agree_on_grouping() {
    let dir = tempdir().unwrap();
    write(dir.path(), "a", b"one");
    write(dir.path(), "b", b"one");
    write(dir.path(), "c", b"two");

    for algorithm in [HashAlgorithm::Blake3, HashAlgorithm::Sha256, HashAlgorithm::Sha1] {
        let config =
            ScanConfig::new(vec![dir.path().to_path_buf()]).with_hash_algorithm(algorithm);
        let (groups, _) = DuplicateFinder::with_defaults()
            .find_duplicates(&config)
            .unwrap();
        assert_eq!(groups.len(), 1, "{algorithm}");
        assert_eq!(groups[0].len(), 2, "{algorithm}");
    }
}

#[test]
fn test_image_mode_ignores_non_images() {
    let dir = tempdir().unwrap();
    write(dir.path(), "a.txt", b"dup");
    write(dir.path(), "b.txt", b"dup");

    let config = ScanConfig::new(vec![dir.path().to_path_buf()]).with_mode(ScanMode::Image);
    let (groups, summary) = DuplicateFinder::with_defaults()
        .find_duplicates(&config)
        .unwrap();
    assert!(groups.is_empty());
    assert_eq!(summary.total_files, 2);
}

#[test]
fn test_cancelled_token_interrupts() {
    let dir = tempdir().unwrap();
    write(dir.path(), "a", b"x");
    let token = CancellationToken::new();
    token.cancel();

    let config = ScanConfig::new(vec![dir.path().to_path_buf()]).with_cancellation(token);
    let result = DuplicateFinder::with_defaults().find_duplicates(&config);
    assert!(matches!(result, Err(FinderError::Interrupted)));
}

#[cfg(unix)]
#[test]
fn test_symlinks_are_not_followed() {
    let dir = tempdir().unwrap();
    let real = write(dir.path(), "real.txt", b"content");
    std::os::unix::fs::symlink(&real, dir.path().join("link.txt")).unwrap();
    std::os::unix::fs::symlink(dir.path(), dir.path().join("loop")).unwrap();

    let (groups, summary) = DuplicateFinder::with_defaults()
        .find_duplicates(&ScanConfig::new(vec![dir.path().to_path_buf()]))
        .unwrap();
    assert!(groups.is_empty());
    assert_eq!(summary.total_files, 1);
}

use dupesweep::actions::ExecuteOptions;
use dupesweep::duplicates::{DuplicateFinder, FinderError, ScanConfig};
use dupesweep::media::PerceptualHasher;
use dupesweep::{ConfigError, Settings};
use std::fs;
use std::path::PathBuf;
use tempfile::tempdir;

#[test]
fn test_settings_from_toml_file() {
    let dir = tempdir().unwrap();
    let path = dir.path().join("config.toml");
    fs::write(
        &path,
        r#"
thumbnail_side = 64
progress_batch = 10
use_thumbnail_cache = false
ffmpeg_path = "/opt/ffmpeg/bin/ffmpeg"
"#,
    )
    .unwrap();

    let settings = Settings::load_from(Some(&path)).unwrap();
    assert_eq!(settings.thumbnail_side, 64);
    assert_eq!(settings.progress_batch, 10);
    assert!(!settings.use_thumbnail_cache);
    assert_eq!(
        settings.ffmpeg_path,
        Some(PathBuf::from("/opt/ffmpeg/bin/ffmpeg"))
    );
    // untouched fields keep their defaults
    assert_eq!(settings.video_timeout_secs, 15);

    assert_eq!(PerceptualHasher::from_settings(&settings).max_side(), 64);
}

#[test]
fn test_environment_overrides_file() {
    let dir = tempdir().unwrap();
    let path = dir.path().join("config.toml");
    fs::write(&path, "rename_attempts = 5\n").unwrap();

    std::env::set_var("DUPESWEEP_RENAME_ATTEMPTS", "42");
    let settings = Settings::load_from(Some(&path));
    std::env::remove_var("DUPESWEEP_RENAME_ATTEMPTS");

    let settings = settings.unwrap();
    assert_eq!(settings.rename_attempts, 42);
    assert_eq!(ExecuteOptions::from_settings(&settings).rename_attempts, 42);
}

#[test]
fn test_malformed_file_is_an_error() {
    let dir = tempdir().unwrap();
    let path = dir.path().join("config.toml");
    fs::write(&path, "thumbnail_side = \"huge\"\n").unwrap();
    assert!(Settings::load_from(Some(&path)).is_err());
}

#[test]
fn test_invalid_scan_configs_fail_before_scanning() {
    let finder = DuplicateFinder::with_defaults();

    let err = finder.find_duplicates(&ScanConfig::default()).unwrap_err();
    assert!(matches!(err, FinderError::Config(ConfigError::NoIncludePaths)));

    let config = ScanConfig::new(vec![PathBuf::from("/tmp")]).with_similarity_threshold(1.5);
    let err = finder.find_duplicates(&config).unwrap_err();
    assert!(matches!(
        err,
        FinderError::Config(ConfigError::InvalidThreshold(_))
    ));

    let config = ScanConfig::new(vec![PathBuf::from("/tmp")]).with_size_bounds(100, 10);
    let err = finder.find_duplicates(&config).unwrap_err();
    assert!(matches!(
        err,
        FinderError::Config(ConfigError::InvalidSizeBounds { min: 100, max: 10 })
    ));
}

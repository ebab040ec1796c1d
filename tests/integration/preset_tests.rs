use dupesweep::duplicates::{ScanConfig, ScanMode};
use dupesweep::policy::{Action, ActionType, KeepRule, Policy};
use dupesweep::presets::{PolicyPreset, PresetStore, ScanPreset};
use dupesweep::scanner::HashAlgorithm;
use dupesweep::Settings;
use std::fs;
use std::path::PathBuf;
use tempfile::tempdir;

#[test]
fn test_presets_survive_a_new_store() {
    let dir = tempdir().unwrap();
    let settings = Settings {
        preset_dir: dir.path().join("presets"),
        ..Settings::default()
    };

    let config = ScanConfig::new(vec![PathBuf::from("/srv/media"), PathBuf::from("/mnt/backup")])
        .with_exclude_patterns(vec!["*.tmp".to_string(), ".git".to_string()])
        .with_mode(ScanMode::Video)
        .with_size_bounds(1024, 0)
        .with_hash_algorithm(HashAlgorithm::Sha256)
        .with_similarity_threshold(0.85);
    let policy = Policy::new(
        "archive-old",
        KeepRule::oldest(),
        Action::new(ActionType::Move).with_destination("/mnt/archive"),
    )
    .with_description("Keep the original, archive later copies");

    {
        let store = PresetStore::from_settings(&settings);
        store
            .save_scan(&ScanPreset::new("media", config.clone()))
            .unwrap();
        store
            .save_policy(&PolicyPreset::new("archive", policy.clone()))
            .unwrap();
    }

    let store = PresetStore::from_settings(&settings);
    assert_eq!(store.list_scans().unwrap(), vec!["media"]);
    assert_eq!(store.list_policies().unwrap(), vec!["archive"]);
    assert_eq!(store.load_scan("media").unwrap().config, config);
    assert_eq!(store.load_policy("archive").unwrap().policy, policy);

    let on_disk = fs::read_to_string(dir.path().join("presets/archive_policy.json")).unwrap();
    assert!(on_disk.contains("\"type\": \"move\""));
    assert!(on_disk.contains("\"keep_oldest\": true"));
}

#[test]
fn test_saving_replaces_existing_preset() {
    let dir = tempdir().unwrap();
    let store = PresetStore::new(dir.path());

    store
        .save_policy(&PolicyPreset::new("p", Policy::default()))
        .unwrap();
    store
        .save_policy(&PolicyPreset::new("p", Policy::add_suffix()))
        .unwrap();

    assert_eq!(store.list_policies().unwrap(), vec!["p"]);
    assert_eq!(store.load_policy("p").unwrap().policy, Policy::add_suffix());
}

#[test]
fn test_corrupt_preset_is_an_error() {
    let dir = tempdir().unwrap();
    fs::write(dir.path().join("broken_scan.json"), "{ not json").unwrap();
    let store = PresetStore::new(dir.path());

    assert_eq!(store.list_scans().unwrap(), vec!["broken"]);
    let err = store.load_scan("broken").unwrap_err();
    assert!(format!("{err:#}").contains("Failed to parse preset"));
}

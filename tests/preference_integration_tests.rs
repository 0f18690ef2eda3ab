//! Integration tests for PreferenceStore over file-backed storage
//!
//! These tests verify:
//! - The on-disk record shape (schema version, camelCase non-default fields, timestamp)
//! - Preferences survive a new store instance over the same directory
//! - Hand-edited records with bad fields keep their good fields
//! - An unwritable directory degrades to `false` instead of an error

use camino::Utf8PathBuf;
use serde_json::Value;
use std::fs;
use std::sync::Arc;
use tempfile::TempDir;
use uuidgen::models::{ConfigUpdate, GenerationConfig, Theme};
use uuidgen::services::{FileStorage, PREFERENCES_SCHEMA_VERSION, PreferenceStore};

const KEY: &str = "uuid-generator-preferences";

fn create_test_store() -> (TempDir, Utf8PathBuf, PreferenceStore) {
    let temp_dir = TempDir::new().unwrap();
    let dir = Utf8PathBuf::try_from(temp_dir.path().join("preferences")).unwrap();
    let store = PreferenceStore::new(Arc::new(FileStorage::new(&dir)), KEY);
    (temp_dir, dir, store)
}

#[test]
fn test_record_shape_on_disk() {
    let (_temp_dir, dir, store) = create_test_store();

    let config = GenerationConfig::default().merged(
        &ConfigUpdate::default()
            .with_count(25)
            .with_braces(true)
            .with_theme(Theme::Dark),
    );
    assert!(store.save(&config));

    let raw = fs::read_to_string(dir.join(format!("{}.json", KEY))).unwrap();
    let record: Value = serde_json::from_str(&raw).unwrap();

    assert_eq!(record["schemaVersion"], PREFERENCES_SCHEMA_VERSION);
    assert!(record["lastModified"].is_string());

    let fields = record["config"].as_object().unwrap();
    assert_eq!(fields.len(), 3);
    assert_eq!(fields["count"], 25);
    assert_eq!(fields["includeBraces"], true);
    assert_eq!(fields["theme"], "dark");
}

#[test]
fn test_preferences_survive_new_store_instance() {
    let (_temp_dir, dir, store) = create_test_store();

    let config = GenerationConfig::default().merged(
        &ConfigUpdate::default()
            .with_count(500)
            .with_upper_case(true)
            .with_commas(true),
    );
    assert!(store.save(&config));
    drop(store);

    let reopened = PreferenceStore::new(Arc::new(FileStorage::new(&dir)), KEY);
    let restored = GenerationConfig::default().merged(&reopened.load());
    assert_eq!(restored, config);
}

#[test]
fn test_hand_edited_record_keeps_good_fields() {
    let (_temp_dir, dir, store) = create_test_store();
    fs::create_dir_all(&dir).unwrap();
    fs::write(
        dir.join(format!("{}.json", KEY)),
        r#"{
            "schemaVersion": "1",
            "config": {
                "count": 2000,
                "version": "v1",
                "upperCase": true,
                "includeQuotes": "yes",
                "theme": "light"
            },
            "lastModified": "2024-01-01T00:00:00Z"
        }"#,
    )
    .unwrap();

    let report = store.load_report();
    assert_eq!(report.update.upper_case, Some(true));
    assert_eq!(report.update.theme, Some(Theme::Light));
    assert_eq!(report.update.count, None);
    assert_eq!(report.update.version, None);
    assert_eq!(report.update.include_quotes, None);

    let mut dropped = report.dropped_fields.clone();
    dropped.sort();
    assert_eq!(dropped, vec!["count", "includeQuotes", "version"]);
}

#[test]
fn test_directory_blocked_by_file_degrades() {
    let temp_dir = TempDir::new().unwrap();
    let blocker = Utf8PathBuf::try_from(temp_dir.path().join("not-a-dir")).unwrap();
    fs::write(&blocker, "occupied").unwrap();

    let store = PreferenceStore::new(Arc::new(FileStorage::new(&blocker)), KEY);
    assert!(!store.is_available());
    assert!(!store.save(&GenerationConfig::default()));
    assert!(store.load().is_empty());
}

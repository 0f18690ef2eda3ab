use crate::models::{ConfigUpdate, GenerationConfig, MAX_COUNT, MIN_COUNT, Theme, UuidVersion};
use camino::{Utf8Path, Utf8PathBuf};
use chrono::{DateTime, Utc};
use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::HashMap;
use std::fs;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};
use thiserror::Error;

/// Current layout of the persisted preferences record.
pub const PREFERENCES_SCHEMA_VERSION: &str = "1";

/// Errors raised by a [`KeyValueStorage`] backend.
///
/// These never leave [`PreferenceStore`]; they are logged and turned into `false` / empty
/// results there.
#[derive(Error, Debug)]
pub enum StorageError {
    #[error("Storage is unavailable")]
    Unavailable,

    #[error("Storage quota exceeded: {needed} bytes needed, {limit} allowed")]
    QuotaExceeded { needed: usize, limit: usize },

    #[error("Storage I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Preferences serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

/// Minimal string key-value store holding the preferences record.
#[cfg_attr(test, mockall::automock)]
pub trait KeyValueStorage: Send + Sync {
    fn is_available(&self) -> bool;
    fn get(&self, key: &str) -> Result<Option<String>, StorageError>;
    fn set(&self, key: &str, value: &str) -> Result<(), StorageError>;
    fn remove(&self, key: &str) -> Result<(), StorageError>;
}

/// Stores each key as `<directory>/<key>.json`.
#[derive(Debug, Clone)]
pub struct FileStorage {
    directory: Utf8PathBuf,
}

impl FileStorage {
    pub fn new<P: AsRef<Utf8Path>>(directory: P) -> Self {
        Self {
            directory: directory.as_ref().to_path_buf(),
        }
    }

    pub fn directory(&self) -> &Utf8Path {
        &self.directory
    }

    /// File backing `key`. Characters outside `[A-Za-z0-9._-]` are replaced with `_`.
    pub fn path_for(&self, key: &str) -> Utf8PathBuf {
        let file_name: String = key
            .chars()
            .map(|c| {
                if c.is_ascii_alphanumeric() || matches!(c, '-' | '_' | '.') {
                    c
                } else {
                    '_'
                }
            })
            .collect();
        self.directory.join(format!("{}.json", file_name))
    }
}

impl KeyValueStorage for FileStorage {
    fn is_available(&self) -> bool {
        if fs::create_dir_all(&self.directory).is_err() {
            return false;
        }

        let probe = self.directory.join(".write-probe");
        let writable = fs::write(&probe, b"ok").is_ok();
        let _ = fs::remove_file(&probe);
        writable
    }

    fn get(&self, key: &str) -> Result<Option<String>, StorageError> {
        let path = self.path_for(key);
        if !path.exists() {
            return Ok(None);
        }
        Ok(Some(fs::read_to_string(&path)?))
    }

    fn set(&self, key: &str, value: &str) -> Result<(), StorageError> {
        fs::create_dir_all(&self.directory)?;
        fs::write(self.path_for(key), value)?;
        Ok(())
    }

    fn remove(&self, key: &str) -> Result<(), StorageError> {
        let path = self.path_for(key);
        if path.exists() {
            fs::remove_file(&path)?;
        }
        Ok(())
    }
}

/// In-process storage with an optional size quota and a disable switch.
///
/// Used when no data directory is wanted and to exercise quota / disabled-storage
/// behaviour.
#[derive(Debug, Default)]
pub struct MemoryStorage {
    entries: Mutex<HashMap<String, String>>,
    quota_bytes: Option<usize>,
    disabled: AtomicBool,
}

impl MemoryStorage {
    pub fn new() -> Self {
        Self::default()
    }

    /// Reject writes whose value is larger than `bytes`.
    pub fn with_quota(bytes: usize) -> Self {
        Self {
            quota_bytes: Some(bytes),
            ..Self::default()
        }
    }

    pub fn set_disabled(&self, disabled: bool) {
        self.disabled.store(disabled, Ordering::SeqCst);
    }

    fn check_enabled(&self) -> Result<(), StorageError> {
        if self.disabled.load(Ordering::SeqCst) {
            Err(StorageError::Unavailable)
        } else {
            Ok(())
        }
    }
}

impl KeyValueStorage for MemoryStorage {
    fn is_available(&self) -> bool {
        !self.disabled.load(Ordering::SeqCst)
    }

    fn get(&self, key: &str) -> Result<Option<String>, StorageError> {
        self.check_enabled()?;
        let entries = self.entries.lock().map_err(|_| StorageError::Unavailable)?;
        Ok(entries.get(key).cloned())
    }

    fn set(&self, key: &str, value: &str) -> Result<(), StorageError> {
        self.check_enabled()?;
        if let Some(limit) = self.quota_bytes {
            if value.len() > limit {
                return Err(StorageError::QuotaExceeded {
                    needed: value.len(),
                    limit,
                });
            }
        }
        let mut entries = self.entries.lock().map_err(|_| StorageError::Unavailable)?;
        entries.insert(key.to_string(), value.to_string());
        Ok(())
    }

    fn remove(&self, key: &str) -> Result<(), StorageError> {
        self.check_enabled()?;
        let mut entries = self.entries.lock().map_err(|_| StorageError::Unavailable)?;
        entries.remove(key);
        Ok(())
    }
}

/// On-disk shape of the preferences record.
///
/// `config` only ever contains fields that differ from [`GenerationConfig::default`],
/// keyed by their camelCase names.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PersistedPreferences {
    pub schema_version: String,
    pub config: IndexMap<String, Value>,
    pub last_modified: DateTime<Utc>,
}

impl PersistedPreferences {
    /// Build a record from the non-default fields of `config`.
    pub fn from_config(config: &GenerationConfig) -> Self {
        let diff = config.diff_from_default();
        let mut fields = IndexMap::new();

        if let Some(count) = diff.count {
            fields.insert("count".to_string(), Value::from(count));
        }
        if let Some(version) = diff.version {
            fields.insert("version".to_string(), Value::from(version.as_str()));
        }
        if let Some(theme) = diff.theme {
            fields.insert("theme".to_string(), Value::from(theme.as_str()));
        }
        for (name, value) in [
            ("includeHyphens", diff.include_hyphens),
            ("includeBraces", diff.include_braces),
            ("includeQuotes", diff.include_quotes),
            ("upperCase", diff.upper_case),
            ("separateWithCommas", diff.separate_with_commas),
        ] {
            if let Some(flag) = value {
                fields.insert(name.to_string(), Value::from(flag));
            }
        }

        Self {
            schema_version: PREFERENCES_SCHEMA_VERSION.to_string(),
            config: fields,
            last_modified: Utc::now(),
        }
    }
}

/// Outcome of reading the preferences record, with what had to be discarded.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct LoadReport {
    pub update: ConfigUpdate,
    pub dropped_fields: Vec<String>,
    pub schema_version: Option<String>,
}

/// Validate the fields of a persisted `config` object one by one.
///
/// Fields with the wrong type, out-of-range values or unknown names are dropped
/// individually; the rest are kept.
pub fn validate_fields(fields: &serde_json::Map<String, Value>) -> (ConfigUpdate, Vec<String>) {
    let mut update = ConfigUpdate::default();
    let mut dropped = Vec::new();

    for (name, value) in fields {
        let accepted = match name.as_str() {
            "count" => value
                .as_u64()
                .filter(|c| (MIN_COUNT as u64..=MAX_COUNT as u64).contains(c))
                .map(|c| update.count = Some(c as u32))
                .is_some(),
            "version" => value
                .as_str()
                .and_then(UuidVersion::parse)
                .filter(|v| v.is_supported())
                .map(|v| update.version = Some(v))
                .is_some(),
            "theme" => value
                .as_str()
                .and_then(Theme::parse)
                .map(|t| update.theme = Some(t))
                .is_some(),
            "includeHyphens" => value.as_bool().map(|b| update.include_hyphens = Some(b)).is_some(),
            "includeBraces" => value.as_bool().map(|b| update.include_braces = Some(b)).is_some(),
            "includeQuotes" => value.as_bool().map(|b| update.include_quotes = Some(b)).is_some(),
            "upperCase" => value.as_bool().map(|b| update.upper_case = Some(b)).is_some(),
            "separateWithCommas" => value
                .as_bool()
                .map(|b| update.separate_with_commas = Some(b))
                .is_some(),
            _ => false,
        };

        if !accepted {
            dropped.push(name.clone());
        }
    }

    (update, dropped)
}

/// Persists the user's non-default configuration under a single storage key.
///
/// Every operation is best-effort. Storage problems (disabled storage, quota, I/O,
/// corrupt JSON) are logged and reported as `false` or an empty update, never as an
/// error, because losing preferences must not break generation.
#[derive(Clone)]
pub struct PreferenceStore {
    storage: Arc<dyn KeyValueStorage>,
    key: String,
}

impl PreferenceStore {
    pub fn new(storage: Arc<dyn KeyValueStorage>, key: impl Into<String>) -> Self {
        Self {
            storage,
            key: key.into(),
        }
    }

    pub fn key(&self) -> &str {
        &self.key
    }

    pub fn is_available(&self) -> bool {
        self.storage.is_available()
    }

    /// Persist the non-default fields of `config`. Returns `false` on any failure.
    pub fn save(&self, config: &GenerationConfig) -> bool {
        if !self.storage.is_available() {
            tracing::warn!("Preferences not saved: storage unavailable");
            return false;
        }

        let record = PersistedPreferences::from_config(config);
        let json = match serde_json::to_string(&record) {
            Ok(json) => json,
            Err(e) => {
                tracing::warn!("Preferences not saved: {}", StorageError::from(e));
                return false;
            }
        };

        match self.storage.set(&self.key, &json) {
            Ok(()) => {
                tracing::debug!(
                    "Saved {} preference field(s) under {}",
                    record.config.len(),
                    self.key
                );
                true
            }
            Err(e) => {
                tracing::warn!("Preferences not saved: {}", e);
                false
            }
        }
    }

    /// Restore the persisted partial configuration. Empty on any failure.
    pub fn load(&self) -> ConfigUpdate {
        self.load_report().update
    }

    /// Like [`load`](Self::load) but also reports which fields were discarded.
    pub fn load_report(&self) -> LoadReport {
        let raw = match self.storage.get(&self.key) {
            Ok(Some(raw)) => raw,
            Ok(None) => return LoadReport::default(),
            Err(e) => {
                tracing::warn!("Preferences not loaded: {}", e);
                return LoadReport::default();
            }
        };

        let root: Value = match serde_json::from_str(&raw) {
            Ok(root) => root,
            Err(e) => {
                tracing::warn!("Ignoring corrupt preferences under {}: {}", self.key, e);
                return LoadReport::default();
            }
        };

        let Some(root) = root.as_object() else {
            tracing::warn!("Ignoring preferences under {}: not a JSON object", self.key);
            return LoadReport::default();
        };

        let schema_version = root
            .get("schemaVersion")
            .and_then(Value::as_str)
            .map(str::to_string);

        let fields = match (root.get("config"), schema_version.as_deref()) {
            (Some(Value::Object(fields)), _) => fields,
            // Records written before the envelope existed were a flat field map
            (None, None) => root,
            _ => {
                tracing::warn!("Ignoring preferences under {}: malformed config", self.key);
                return LoadReport {
                    schema_version,
                    ..LoadReport::default()
                };
            }
        };

        if schema_version.as_deref() != Some(PREFERENCES_SCHEMA_VERSION) {
            tracing::info!(
                "Migrating preferences from schema {:?} to {}",
                schema_version,
                PREFERENCES_SCHEMA_VERSION
            );
        }

        let (update, dropped_fields) = validate_fields(fields);
        if !dropped_fields.is_empty() {
            tracing::debug!("Dropped invalid preference fields: {:?}", dropped_fields);
        }

        LoadReport {
            update,
            dropped_fields,
            schema_version,
        }
    }

    /// Remove the persisted record. Errors are logged and swallowed.
    pub fn clear(&self) {
        if let Err(e) = self.storage.remove(&self.key) {
            tracing::warn!("Failed to clear preferences: {}", e);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    const KEY: &str = "uuid-generator-preferences";

    fn memory_store() -> (Arc<MemoryStorage>, PreferenceStore) {
        let storage = Arc::new(MemoryStorage::new());
        let store = PreferenceStore::new(storage.clone(), KEY);
        (storage, store)
    }

    #[test]
    fn test_save_only_non_default_fields() {
        let (storage, store) = memory_store();
        let config = GenerationConfig::default().merged(
            &ConfigUpdate::default()
                .with_count(5)
                .with_theme(Theme::Dark)
                .with_upper_case(true),
        );

        assert!(store.save(&config));

        let raw = storage.get(KEY).unwrap().unwrap();
        let record: PersistedPreferences = serde_json::from_str(&raw).unwrap();
        assert_eq!(record.schema_version, PREFERENCES_SCHEMA_VERSION);
        assert_eq!(
            record.config.keys().collect::<Vec<_>>(),
            vec!["count", "theme", "upperCase"]
        );
    }

    #[test]
    fn test_round_trip() {
        let (_storage, store) = memory_store();
        let config = GenerationConfig::default().merged(
            &ConfigUpdate::default()
                .with_count(5)
                .with_theme(Theme::Dark)
                .with_upper_case(true),
        );
        store.save(&config);

        let loaded = store.load();
        assert_eq!(
            loaded,
            ConfigUpdate::default()
                .with_count(5)
                .with_theme(Theme::Dark)
                .with_upper_case(true)
        );
        assert_eq!(loaded.version, None);
    }

    #[test]
    fn test_missing_key_loads_empty() {
        let (_storage, store) = memory_store();
        assert!(store.load().is_empty());
    }

    #[test]
    fn test_corrupt_json_loads_empty() {
        let (storage, store) = memory_store();
        storage.set(KEY, "invalid-json").unwrap();
        assert!(store.load().is_empty());
    }

    #[test]
    fn test_invalid_fields_dropped_individually() {
        let (storage, store) = memory_store();
        storage
            .set(
                KEY,
                r#"{"schemaVersion":"1","config":{"count":5000,"theme":"dark","upperCase":"yes","includeBraces":true,"version":"v1","mystery":1},"lastModified":"2024-01-01T00:00:00Z"}"#,
            )
            .unwrap();

        let report = store.load_report();
        assert_eq!(
            report.update,
            ConfigUpdate::default()
                .with_theme(Theme::Dark)
                .with_braces(true)
        );
        let mut dropped = report.dropped_fields.clone();
        dropped.sort();
        assert_eq!(dropped, vec!["count", "mystery", "upperCase", "version"]);
    }

    #[test]
    fn test_non_integer_count_dropped() {
        let (storage, store) = memory_store();
        storage
            .set(KEY, r#"{"schemaVersion":"1","config":{"count":2.5}}"#)
            .unwrap();
        assert_eq!(store.load().count, None);
    }

    #[test]
    fn test_legacy_flat_record_migrates() {
        let (storage, store) = memory_store();
        storage.set(KEY, r#"{"count":7,"upperCase":true}"#).unwrap();

        let report = store.load_report();
        assert_eq!(report.schema_version, None);
        assert_eq!(
            report.update,
            ConfigUpdate::default().with_count(7).with_upper_case(true)
        );
    }

    #[test]
    fn test_malformed_config_loads_empty() {
        let (storage, store) = memory_store();
        storage
            .set(KEY, r#"{"schemaVersion":"1","config":[1,2,3]}"#)
            .unwrap();
        assert!(store.load().is_empty());

        storage.set(KEY, "[]").unwrap();
        assert!(store.load().is_empty());
    }

    #[test]
    fn test_quota_exceeded_returns_false() {
        let storage = Arc::new(MemoryStorage::with_quota(10));
        let store = PreferenceStore::new(storage, KEY);
        assert!(!store.save(&GenerationConfig::default()));
    }

    #[test]
    fn test_disabled_storage() {
        let (storage, store) = memory_store();
        storage.set_disabled(true);

        assert!(!store.is_available());
        assert!(!store.save(&GenerationConfig::default()));
        assert!(store.load().is_empty());
        store.clear();
    }

    #[test]
    fn test_clear_swallows_errors() {
        let mut storage = MockKeyValueStorage::new();
        storage
            .expect_remove()
            .times(1)
            .returning(|_| Err(StorageError::Unavailable));

        let store = PreferenceStore::new(Arc::new(storage), KEY);
        store.clear();
    }

    #[test]
    fn test_get_error_loads_empty() {
        let mut storage = MockKeyValueStorage::new();
        storage.expect_get().returning(|_| {
            Err(StorageError::Io(std::io::Error::other("disk on fire")))
        });

        let store = PreferenceStore::new(Arc::new(storage), KEY);
        assert!(store.load().is_empty());
    }

    #[test]
    fn test_file_storage_round_trip() {
        let temp_dir = TempDir::new().unwrap();
        let dir = Utf8PathBuf::try_from(temp_dir.path().join("prefs")).unwrap();
        let storage = Arc::new(FileStorage::new(&dir));
        let store = PreferenceStore::new(storage.clone(), KEY);

        assert!(store.is_available());

        let config = GenerationConfig::default().merged(&ConfigUpdate::default().with_count(12));
        assert!(store.save(&config));
        assert!(storage.path_for(KEY).exists());
        assert_eq!(store.load(), ConfigUpdate::default().with_count(12));

        store.clear();
        assert!(!storage.path_for(KEY).exists());
        assert!(store.load().is_empty());
    }

    #[test]
    fn test_file_storage_sanitizes_key() {
        let storage = FileStorage::new("/tmp/prefs");
        assert_eq!(
            storage.path_for("../escape me"),
            Utf8PathBuf::from("/tmp/prefs/.._escape_me.json")
        );
    }
}

use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Application settings loaded from `uuidgen.yaml`.
///
/// Every section has defaults, so an empty or missing file yields a working setup.
/// Unlike the user preferences record these are operator settings: batching, debounce
/// intervals, performance thresholds and storage location.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AppSettings {
    pub generation: GenerationSettings,
    pub timing: TimingSettings,
    pub performance: PerformanceSettings,
    pub storage: StorageSettings,
    pub logging: LoggingSettings,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct GenerationSettings {
    /// Counts above this value are produced in chunks with a yield in between.
    pub chunk_threshold: u32,

    /// Identifiers per chunk on the chunked path.
    pub chunk_size: u32,

    /// Use `uuid::Uuid::new_v4` per identifier.
    pub native_enabled: bool,

    /// Use one batched `getrandom` fill per chunk.
    pub byte_fill_enabled: bool,
}

impl Default for GenerationSettings {
    fn default() -> Self {
        Self {
            chunk_threshold: 100,
            chunk_size: 50,
            native_enabled: true,
            byte_fill_enabled: true,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct TimingSettings {
    pub regenerate_debounce_ms: u64,
    pub save_debounce_ms: u64,
}

impl Default for TimingSettings {
    fn default() -> Self {
        Self {
            regenerate_debounce_ms: 300,
            save_debounce_ms: 500,
        }
    }
}

impl TimingSettings {
    pub fn regenerate_debounce(&self) -> Duration {
        Duration::from_millis(self.regenerate_debounce_ms)
    }

    pub fn save_debounce(&self) -> Duration {
        Duration::from_millis(self.save_debounce_ms)
    }
}

/// Warning and error limits for one operation class, in milliseconds.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Threshold {
    pub warning_ms: f64,
    pub error_ms: f64,
}

impl Threshold {
    pub const fn new(warning_ms: f64, error_ms: f64) -> Self {
        Self {
            warning_ms,
            error_ms,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PerformanceSettings {
    pub generation: Threshold,
    pub formatting: Threshold,
    pub total: Threshold,

    /// Consecutive slow samples needed before a warning is raised.
    pub consecutive_warning_limit: u32,

    pub sample_history: usize,
    pub alert_history: usize,

    /// How many of the latest alerts feed the aggregated health status.
    pub health_window: usize,
}

impl Default for PerformanceSettings {
    fn default() -> Self {
        Self {
            generation: Threshold::new(25.0, 50.0),
            formatting: Threshold::new(10.0, 25.0),
            total: Threshold::new(40.0, 50.0),
            consecutive_warning_limit: 3,
            sample_history: 100,
            alert_history: 20,
            health_window: 5,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct StorageSettings {
    /// Directory holding the preferences record. Relative paths resolve against the
    /// data directory.
    pub directory: String,

    /// Storage key of the preferences record.
    pub preferences_key: String,
}

impl Default for StorageSettings {
    fn default() -> Self {
        Self {
            directory: "preferences".to_string(),
            preferences_key: "uuid-generator-preferences".to_string(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingSettings {
    pub directory: String,
    pub file_prefix: String,
    pub debug: bool,
    pub console: bool,
}

impl Default for LoggingSettings {
    fn default() -> Self {
        Self {
            directory: "logs".to_string(),
            file_prefix: "uuidgen".to_string(),
            debug: false,
            console: false,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_settings() {
        let settings = AppSettings::default();
        assert_eq!(settings.generation.chunk_threshold, 100);
        assert_eq!(settings.generation.chunk_size, 50);
        assert_eq!(settings.timing.regenerate_debounce(), Duration::from_millis(300));
        assert_eq!(settings.timing.save_debounce(), Duration::from_millis(500));
        assert_eq!(settings.performance.consecutive_warning_limit, 3);
        assert_eq!(settings.performance.sample_history, 100);
        assert_eq!(settings.performance.alert_history, 20);
    }

    #[test]
    fn test_partial_yaml_uses_defaults() {
        let yaml = "timing:\n  regenerate_debounce_ms: 50\n";
        let settings: AppSettings = serde_yaml_ng::from_str(yaml).unwrap();

        assert_eq!(settings.timing.regenerate_debounce_ms, 50);
        assert_eq!(settings.timing.save_debounce_ms, 500);
        assert_eq!(settings.generation, GenerationSettings::default());
    }
}

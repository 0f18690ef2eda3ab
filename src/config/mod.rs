use crate::models::AppSettings;
use anyhow::{Context, Result};
use camino::{Utf8Path, Utf8PathBuf};
use config::{Config, Environment, File, FileFormat};
use std::fs;

/// File name of the operator settings inside the data directory.
pub const SETTINGS_FILE: &str = "uuidgen.yaml";

/// Prefix for environment overrides, e.g. `UUIDGEN__TIMING__SAVE_DEBOUNCE_MS=750`.
pub const ENV_PREFIX: &str = "UUIDGEN";

/// Configuration manager for the data directory.
///
/// Owns the directory holding:
/// - Settings (`uuidgen.yaml`): batching, debounce intervals, performance thresholds, storage
/// - Preferences (`preferences/` by default): the user's persisted generator configuration
///
/// Settings are layered: built-in defaults, then the YAML file, then `UUIDGEN__*`
/// environment variables.
#[derive(Debug, Clone)]
pub struct ConfigManager {
    config_dir: Utf8PathBuf,
    settings_path: Utf8PathBuf,
}

impl ConfigManager {
    /// Create a new ConfigManager rooted at `config_dir`, creating it if needed.
    pub fn new<P: AsRef<Utf8Path>>(config_dir: P) -> Result<Self> {
        let config_dir = config_dir.as_ref().to_path_buf();

        if !config_dir.exists() {
            fs::create_dir_all(&config_dir)
                .with_context(|| format!("Failed to create config directory: {}", config_dir))?;
        }

        Ok(Self {
            settings_path: config_dir.join(SETTINGS_FILE),
            config_dir,
        })
    }

    /// Load settings from the file and the process environment.
    ///
    /// # Returns
    /// The merged AppSettings; defaults when the file doesn't exist
    pub fn load_settings(&self) -> Result<AppSettings> {
        self.load_settings_with(Self::environment())
    }

    /// Load settings with a caller-supplied environment source.
    pub fn load_settings_with(&self, environment: Environment) -> Result<AppSettings> {
        if !self.settings_path.exists() {
            tracing::info!(
                "Settings file not found at {}, using defaults",
                self.settings_path
            );
        }

        let settings: AppSettings = Config::builder()
            .add_source(
                File::from(self.settings_path.as_std_path())
                    .format(FileFormat::Yaml)
                    .required(false),
            )
            .add_source(environment)
            .build()
            .with_context(|| format!("Failed to read settings: {}", self.settings_path))?
            .try_deserialize()
            .with_context(|| format!("Failed to parse settings: {}", self.settings_path))?;

        tracing::debug!("Loaded settings from {}", self.settings_path);
        Ok(settings)
    }

    /// The `UUIDGEN__SECTION__FIELD` environment source.
    pub fn environment() -> Environment {
        Environment::with_prefix(ENV_PREFIX)
            .separator("__")
            .try_parsing(true)
    }

    /// Save settings as YAML.
    pub fn save_settings(&self, settings: &AppSettings) -> Result<()> {
        let yaml_string =
            serde_yaml_ng::to_string(settings).context("Failed to serialize settings to YAML")?;

        fs::write(&self.settings_path, yaml_string)
            .with_context(|| format!("Failed to write settings: {}", self.settings_path))?;

        tracing::info!("Saved settings to {}", self.settings_path);
        Ok(())
    }

    /// Write the default settings file unless one already exists.
    ///
    /// # Returns
    /// `true` if a file was written
    pub fn ensure_settings_file(&self) -> Result<bool> {
        if self.settings_path.exists() {
            return Ok(false);
        }
        self.save_settings(&AppSettings::default())?;
        Ok(true)
    }

    /// Directory for the preferences record, resolved against the config directory.
    pub fn preferences_dir(&self, settings: &AppSettings) -> Utf8PathBuf {
        self.resolve(&settings.storage.directory)
    }

    /// Directory for log files, resolved against the config directory.
    pub fn log_dir(&self, settings: &AppSettings) -> Utf8PathBuf {
        self.resolve(&settings.logging.directory)
    }

    fn resolve(&self, path: &str) -> Utf8PathBuf {
        let path = Utf8Path::new(path);
        if path.is_absolute() {
            path.to_path_buf()
        } else {
            self.config_dir.join(path)
        }
    }

    pub fn settings_path(&self) -> &Utf8Path {
        &self.settings_path
    }

    /// Get the configuration directory path.
    pub fn config_dir(&self) -> &Utf8Path {
        &self.config_dir
    }
}

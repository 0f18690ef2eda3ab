use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use thiserror::Error;

/// Smallest number of identifiers a single generation cycle may produce.
pub const MIN_COUNT: u32 = 1;

/// Largest number of identifiers a single generation cycle may produce.
pub const MAX_COUNT: u32 = 1000;

/// UUID version selector.
///
/// Only [`UuidVersion::V4`] can be generated. `V1` is a recognised value so that
/// requests for it can be rejected with a proper error instead of a parse failure.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum UuidVersion {
    V1,
    #[default]
    V4,
}

impl UuidVersion {
    /// Whether identifiers of this version can actually be generated.
    pub fn is_supported(self) -> bool {
        matches!(self, UuidVersion::V4)
    }

    pub fn as_str(self) -> &'static str {
        match self {
            UuidVersion::V1 => "v1",
            UuidVersion::V4 => "v4",
        }
    }

    /// Parse the persisted / command-line spelling (`"v4"`, `"v1"`).
    pub fn parse(value: &str) -> Option<Self> {
        match value.trim().to_ascii_lowercase().as_str() {
            "v1" => Some(UuidVersion::V1),
            "v4" => Some(UuidVersion::V4),
            _ => None,
        }
    }
}

impl fmt::Display for UuidVersion {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Colour theme. Not used by generation; carried so it round-trips through preferences.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Theme {
    Light,
    Dark,
    #[default]
    System,
}

impl Theme {
    pub fn as_str(self) -> &'static str {
        match self {
            Theme::Light => "light",
            Theme::Dark => "dark",
            Theme::System => "system",
        }
    }

    pub fn parse(value: &str) -> Option<Self> {
        match value.trim().to_ascii_lowercase().as_str() {
            "light" => Some(Theme::Light),
            "dark" => Some(Theme::Dark),
            "system" => Some(Theme::System),
            _ => None,
        }
    }
}

impl fmt::Display for Theme {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Output formatting switches.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FormatFlags {
    pub include_hyphens: bool,
    pub include_braces: bool,
    pub include_quotes: bool,
    pub upper_case: bool,
    pub separate_with_commas: bool,
}

impl Default for FormatFlags {
    fn default() -> Self {
        Self {
            include_hyphens: true,
            include_braces: false,
            include_quotes: false,
            upper_case: false,
            separate_with_commas: false,
        }
    }
}

/// Validation failures for a candidate [`GenerationConfig`].
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ConfigError {
    #[error("Count must be between 1 and 1000, got {0}")]
    InvalidCount(u32),

    #[error("UUID version {0} is not supported, only v4 can be generated")]
    UnsupportedVersion(UuidVersion),
}

/// Complete configuration for one generation cycle.
///
/// Treated as a value: the coordinator never edits a live config field by field,
/// it builds a new candidate with [`GenerationConfig::merged`], validates it and
/// swaps the whole object in.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GenerationConfig {
    pub count: u32,
    pub version: UuidVersion,
    pub format: FormatFlags,
    pub theme: Theme,
}

impl Default for GenerationConfig {
    fn default() -> Self {
        Self {
            count: MIN_COUNT,
            version: UuidVersion::V4,
            format: FormatFlags::default(),
            theme: Theme::System,
        }
    }
}

impl GenerationConfig {
    /// Check the count range and version support.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if !(MIN_COUNT..=MAX_COUNT).contains(&self.count) {
            return Err(ConfigError::InvalidCount(self.count));
        }
        if !self.version.is_supported() {
            return Err(ConfigError::UnsupportedVersion(self.version));
        }
        Ok(())
    }

    /// Build a new config with every `Some` field of `update` applied.
    ///
    /// The result is not validated.
    pub fn merged(&self, update: &ConfigUpdate) -> Self {
        let format = FormatFlags {
            include_hyphens: update.include_hyphens.unwrap_or(self.format.include_hyphens),
            include_braces: update.include_braces.unwrap_or(self.format.include_braces),
            include_quotes: update.include_quotes.unwrap_or(self.format.include_quotes),
            upper_case: update.upper_case.unwrap_or(self.format.upper_case),
            separate_with_commas: update
                .separate_with_commas
                .unwrap_or(self.format.separate_with_commas),
        };

        Self {
            count: update.count.unwrap_or(self.count),
            version: update.version.unwrap_or(self.version),
            format,
            theme: update.theme.unwrap_or(self.theme),
        }
    }

    /// Whether moving from `self` to `other` requires new identifiers.
    pub fn needs_regeneration(&self, other: &GenerationConfig) -> bool {
        self.count != other.count || self.version != other.version
    }

    /// Whether moving from `self` to `other` only changes how identifiers are rendered.
    pub fn needs_reformat(&self, other: &GenerationConfig) -> bool {
        self.format != other.format
    }

    /// The fields of `self` that differ from the default configuration.
    pub fn diff_from_default(&self) -> ConfigUpdate {
        fn pick<T>(changed: bool, value: T) -> Option<T> {
            changed.then_some(value)
        }

        let defaults = GenerationConfig::default();

        ConfigUpdate {
            count: pick(self.count != defaults.count, self.count),
            version: pick(self.version != defaults.version, self.version),
            theme: pick(self.theme != defaults.theme, self.theme),
            include_hyphens: pick(
                self.format.include_hyphens != defaults.format.include_hyphens,
                self.format.include_hyphens,
            ),
            include_braces: pick(
                self.format.include_braces != defaults.format.include_braces,
                self.format.include_braces,
            ),
            include_quotes: pick(
                self.format.include_quotes != defaults.format.include_quotes,
                self.format.include_quotes,
            ),
            upper_case: pick(
                self.format.upper_case != defaults.format.upper_case,
                self.format.upper_case,
            ),
            separate_with_commas: pick(
                self.format.separate_with_commas != defaults.format.separate_with_commas,
                self.format.separate_with_commas,
            ),
        }
    }
}

/// A partial configuration: requests from the front end and restored preferences.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ConfigUpdate {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub count: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub version: Option<UuidVersion>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub theme: Option<Theme>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub include_hyphens: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub include_braces: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub include_quotes: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub upper_case: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub separate_with_commas: Option<bool>,
}

impl ConfigUpdate {
    pub fn is_empty(&self) -> bool {
        *self == ConfigUpdate::default()
    }

    pub fn with_count(mut self, count: u32) -> Self {
        self.count = Some(count);
        self
    }

    pub fn with_version(mut self, version: UuidVersion) -> Self {
        self.version = Some(version);
        self
    }

    pub fn with_theme(mut self, theme: Theme) -> Self {
        self.theme = Some(theme);
        self
    }

    pub fn with_hyphens(mut self, include: bool) -> Self {
        self.include_hyphens = Some(include);
        self
    }

    pub fn with_braces(mut self, include: bool) -> Self {
        self.include_braces = Some(include);
        self
    }

    pub fn with_quotes(mut self, include: bool) -> Self {
        self.include_quotes = Some(include);
        self
    }

    pub fn with_upper_case(mut self, upper: bool) -> Self {
        self.upper_case = Some(upper);
        self
    }

    pub fn with_commas(mut self, separate: bool) -> Self {
        self.separate_with_commas = Some(separate);
        self
    }

    /// Number of fields set in this update.
    pub fn field_count(&self) -> usize {
        [
            self.count.is_some(),
            self.version.is_some(),
            self.theme.is_some(),
            self.include_hyphens.is_some(),
            self.include_braces.is_some(),
            self.include_quotes.is_some(),
            self.upper_case.is_some(),
            self.separate_with_commas.is_some(),
        ]
        .iter()
        .filter(|set| **set)
        .count()
    }
}

/// Wall-clock cost of producing a [`GenerationResult`].
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Timing {
    pub generation_ms: f64,
    pub format_ms: f64,
}

impl Timing {
    pub fn total_ms(&self) -> f64 {
        self.generation_ms + self.format_ms
    }
}

/// Output of one successful generate-and-format cycle.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GenerationResult {
    /// Canonical lowercase hyphenated identifiers, in generation order.
    pub identifiers: Vec<String>,
    pub formatted_output: String,
    pub timing: Timing,
    pub generated_at: DateTime<Utc>,
}

impl GenerationResult {
    pub fn len(&self) -> usize {
        self.identifiers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.identifiers.is_empty()
    }
}

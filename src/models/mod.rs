//! Data models for uuidgen.
//!
//! - [`GenerationConfig`]: The configuration of one generation cycle (count, version,
//!   format flags, theme). Replaced wholesale, never edited field by field.
//! - [`ConfigUpdate`]: A partial configuration, used both for front-end requests and for
//!   preferences restored from storage
//! - [`GenerationResult`]: Identifiers, their formatted rendering and timing
//! - [`AppSettings`]: Operator settings loaded from `uuidgen.yaml`

pub mod generation;
pub mod settings;

pub use generation::{
    ConfigError, ConfigUpdate, FormatFlags, GenerationConfig, GenerationResult, MAX_COUNT,
    MIN_COUNT, Theme, Timing, UuidVersion,
};
pub use settings::{
    AppSettings, GenerationSettings, LoggingSettings, PerformanceSettings, StorageSettings,
    Threshold, TimingSettings,
};

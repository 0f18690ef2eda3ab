// uuidgen - Batch UUID v4 generation
//
// This is the library crate containing the generation pipeline, preference persistence
// and clipboard handling. The binary crate (main.rs) provides the command line front end.

pub mod cli;
pub mod config;
pub mod coordinator;
pub mod logging;
pub mod metrics;
pub mod models;
pub mod services;
pub mod state;

// Re-export commonly used types for convenience
pub use config::ConfigManager;
pub use coordinator::{CopyOutcome, GenerationCoordinator, RegenerateOutcome};
pub use metrics::{HealthStatus, PerformanceHealth, PerformanceMonitor};
pub use models::{
    AppSettings, ConfigError, ConfigUpdate, FormatFlags, GenerationConfig, GenerationResult,
    UuidVersion,
};
pub use services::{GenerationError, IdentifierGenerator, UuidFormatter};
pub use state::{ErrorKind, GeneratorState, StateChange, StateStore};

/// Application version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Application name
pub const APP_NAME: &str = env!("CARGO_PKG_NAME");

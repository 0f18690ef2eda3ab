//! Services module - Pure business logic for identifier generation.
//!
//! The services hold no generator state of their own and know nothing about how results
//! are presented. The [`GenerationCoordinator`](crate::coordinator::GenerationCoordinator)
//! wires them together.
//!
//! # Components
//!
//! - [`IdentifierGenerator`]: Produces batches of random v4 identifiers from an ordered chain
//!   of secure [`UuidProvider`]s, chunking large batches with cooperative yields.
//!
//! - [`UuidFormatter`]: Renders identifiers with the user's [`FormatFlags`](crate::models::FormatFlags)
//!   (hyphens, case, quotes, braces, comma separation) and validates canonical forms.
//!
//! - [`PreferenceStore`]: Persists the non-default parts of the configuration as a versioned
//!   JSON record over a [`KeyValueStorage`] backend, dropping invalid fields on load.
//!
//! - [`ClipboardService`]: Copies text with a native helper first and an OSC 52 terminal
//!   sequence second, reporting one boolean.
//!
//! # Usage Example
//!
//! ```ignore
//! use uuidgen::models::{FormatFlags, GenerationSettings, UuidVersion};
//! use uuidgen::services::{IdentifierGenerator, UuidFormatter};
//!
//! let generator = IdentifierGenerator::new(&GenerationSettings::default());
//! let identifiers = generator.generate(5, UuidVersion::V4).await?;
//!
//! let flags = FormatFlags { upper_case: true, ..FormatFlags::default() };
//! let output = UuidFormatter::new().format_all(&identifiers, &flags);
//! ```

pub mod clipboard;
pub mod formatter;
pub mod generator;
pub mod preferences;

pub use clipboard::{
    ClipboardCommand, ClipboardError, ClipboardService, CommandClipboard, FallbackClipboard,
    NativeClipboard, Osc52Clipboard,
};
pub use formatter::UuidFormatter;
pub use generator::{
    ByteFillProvider, GenerationError, IdentifierGenerator, NativeUuidProvider,
    PseudoRandomProvider, UuidProvider, uuid_from_random_bytes,
};
pub use preferences::{
    FileStorage, KeyValueStorage, LoadReport, MemoryStorage, PREFERENCES_SCHEMA_VERSION,
    PersistedPreferences, PreferenceStore, StorageError, validate_fields,
};

// Generation coordinator module
//
// Owns the generator state and turns configuration edits, regeneration requests and
// copy requests into calls on the services, the performance monitor and the state store.

pub mod debounce;

pub use debounce::Debouncer;

use crate::metrics::{OperationClass, PerformanceHealth, PerformanceMonitor};
use crate::models::{
    AppSettings, ConfigError, ConfigUpdate, GenerationConfig, GenerationResult, Timing,
    TimingSettings,
};
use crate::services::{
    ClipboardService, FileStorage, GenerationError, IdentifierGenerator, PreferenceStore,
    UuidFormatter,
};
use crate::state::{GeneratorState, StateChange, StateStore};
use camino::Utf8Path;
use chrono::Utc;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Instant;
use tokio::sync::broadcast;

/// Result of a [`GenerationCoordinator::regenerate`] request.
#[derive(Debug, Clone, PartialEq)]
pub enum RegenerateOutcome {
    /// A cycle ran and replaced the result
    Completed(GenerationResult),

    /// Another cycle was in flight (or the coordinator was torn down); nothing ran
    Skipped,
}

impl RegenerateOutcome {
    pub fn is_completed(&self) -> bool {
        matches!(self, RegenerateOutcome::Completed(_))
    }
}

/// What a copy request put on the clipboard.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CopyOutcome {
    pub success: bool,

    /// Text handed to the clipboard; empty when there was nothing to copy
    pub content: String,
}

/// Holds the in-flight flag for the lifetime of one generation cycle.
struct GenerationGuard<'a> {
    flag: &'a AtomicBool,
}

impl<'a> GenerationGuard<'a> {
    fn acquire(flag: &'a AtomicBool) -> Option<Self> {
        flag.compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
            .ok()
            .map(|_| Self { flag })
    }
}

impl Drop for GenerationGuard<'_> {
    fn drop(&mut self) {
        self.flag.store(false, Ordering::Release);
    }
}

struct CoordinatorInner {
    store: StateStore,
    generator: IdentifierGenerator,
    formatter: UuidFormatter,
    preferences: PreferenceStore,
    clipboard: ClipboardService,
    monitor: Arc<PerformanceMonitor>,
    generating: AtomicBool,
    torn_down: AtomicBool,
    regenerate_timer: Debouncer,
    save_timer: Debouncer,
}

/// Coordinates generation, formatting, persistence and copying for one generator.
///
/// Cheap to clone; clones share the same state. Consumers read
/// [`snapshot()`](Self::snapshot) or [`subscribe()`](Self::subscribe) and submit requests
/// through the methods below, they never touch the state directly.
///
/// # Cycles
///
/// At most one generation cycle is in flight. A [`regenerate()`](Self::regenerate) that
/// arrives while one is running is dropped and reported as [`RegenerateOutcome::Skipped`].
/// Count and version edits schedule a regeneration after the regenerate debounce; format
/// flag edits re-render the existing identifiers immediately through
/// [`reformat()`](Self::reformat), which never produces new identifiers.
///
/// Debounced timers need a Tokio runtime; requests made outside one are logged and dropped.
#[derive(Clone)]
pub struct GenerationCoordinator {
    inner: Arc<CoordinatorInner>,
}

impl GenerationCoordinator {
    /// Create a coordinator whose initial configuration is restored from `preferences`.
    pub fn new(
        generator: IdentifierGenerator,
        preferences: PreferenceStore,
        clipboard: ClipboardService,
        monitor: Arc<PerformanceMonitor>,
        timing: &TimingSettings,
    ) -> Self {
        let report = preferences.load_report();
        if !report.dropped_fields.is_empty() {
            tracing::warn!(
                "Ignored invalid saved preferences: {}",
                report.dropped_fields.join(", ")
            );
        }

        let restored = GenerationConfig::default().merged(&report.update);
        let config = match restored.validate() {
            Ok(()) => restored,
            Err(e) => {
                tracing::warn!("Saved preferences rejected, using defaults: {}", e);
                GenerationConfig::default()
            }
        };

        tracing::info!(
            "Coordinator ready: count={}, version={}, providers={:?}",
            config.count,
            config.version,
            generator.provider_names()
        );

        Self {
            inner: Arc::new(CoordinatorInner {
                store: StateStore::new(config),
                generator,
                formatter: UuidFormatter::new(),
                preferences,
                clipboard,
                monitor,
                generating: AtomicBool::new(false),
                torn_down: AtomicBool::new(false),
                regenerate_timer: Debouncer::new("regeneration", timing.regenerate_debounce()),
                save_timer: Debouncer::new("preference save", timing.save_debounce()),
            }),
        }
    }

    /// Build the default service stack: OS-backed providers, file preferences under
    /// `preferences_dir` and the system clipboard.
    pub fn from_settings(settings: &AppSettings, preferences_dir: &Utf8Path) -> Self {
        let storage = Arc::new(FileStorage::new(preferences_dir));
        Self::new(
            IdentifierGenerator::new(&settings.generation),
            PreferenceStore::new(storage, settings.storage.preferences_key.clone()),
            ClipboardService::system(),
            Arc::new(PerformanceMonitor::new(settings.performance.clone())),
            &settings.timing,
        )
    }

    /// Run the first generation cycle.
    pub async fn initialize(&self) -> Result<RegenerateOutcome, GenerationError> {
        tracing::info!("Initial generation");
        self.regenerate().await
    }

    pub fn snapshot(&self) -> GeneratorState {
        self.inner.store.snapshot()
    }

    pub fn config(&self) -> GenerationConfig {
        self.inner.store.read(|state| state.config)
    }

    pub fn subscribe(&self) -> broadcast::Receiver<StateChange> {
        self.inner.store.subscribe()
    }

    pub fn monitor(&self) -> &Arc<PerformanceMonitor> {
        &self.inner.monitor
    }

    pub fn health(&self) -> PerformanceHealth {
        self.inner.monitor.health()
    }

    pub fn is_generating(&self) -> bool {
        self.inner.generating.load(Ordering::Acquire)
    }

    pub fn is_torn_down(&self) -> bool {
        self.inner.torn_down.load(Ordering::Acquire)
    }

    /// Whether a debounced regeneration is waiting to fire.
    pub fn regeneration_pending(&self) -> bool {
        self.inner.regenerate_timer.is_pending()
    }

    /// Whether a debounced preference save is waiting to fire.
    pub fn save_pending(&self) -> bool {
        self.inner.save_timer.is_pending()
    }

    /// Apply a partial configuration change.
    ///
    /// The merged candidate is validated as a whole. On failure the active configuration
    /// is kept, the message is stored as the visible error and the error is returned.
    /// On success:
    ///
    /// - count or version changed: a regeneration is scheduled after the regenerate debounce
    /// - only format flags changed: the current identifiers are re-rendered right away
    /// - anything changed: a preference save is scheduled after the save debounce
    pub fn update_config(&self, update: ConfigUpdate) -> Result<GenerationConfig, ConfigError> {
        let previous = self.config();
        let candidate = previous.merged(&update);

        if let Err(e) = candidate.validate() {
            tracing::warn!("Rejected configuration update: {}", e);
            self.inner.store.set_validation_error(e.to_string());
            return Err(e);
        }

        if candidate == previous {
            return Ok(previous);
        }

        self.inner.store.set_config(candidate);
        tracing::debug!("Configuration updated: {:?}", candidate);

        if self.is_torn_down() {
            return Ok(candidate);
        }

        if previous.needs_regeneration(&candidate) {
            self.schedule_regeneration();
        } else if previous.needs_reformat(&candidate) {
            self.reformat();
        }
        self.schedule_save();

        Ok(candidate)
    }

    fn schedule_regeneration(&self) {
        let coordinator = self.clone();
        self.inner.regenerate_timer.schedule(async move {
            if let Err(e) = coordinator.regenerate().await {
                tracing::debug!("Debounced regeneration failed: {}", e);
            }
        });
    }

    fn schedule_save(&self) {
        let coordinator = self.clone();
        self.inner.save_timer.schedule(async move {
            if !coordinator.is_torn_down() {
                coordinator.save_preferences();
            }
        });
    }

    /// Generate a fresh set of identifiers for the current configuration.
    ///
    /// Uses the configuration as it was when the cycle started. If the format flags
    /// change while the cycle runs, the finished result is re-rendered with the new
    /// flags before this returns.
    ///
    /// # Errors
    ///
    /// Returns the [`GenerationError`] of a failed cycle. The previous result stays in
    /// place and the message becomes the visible error.
    pub async fn regenerate(&self) -> Result<RegenerateOutcome, GenerationError> {
        if self.is_torn_down() {
            return Ok(RegenerateOutcome::Skipped);
        }

        let Some(_guard) = GenerationGuard::acquire(&self.inner.generating) else {
            tracing::debug!("Generation already in flight, dropping request");
            return Ok(RegenerateOutcome::Skipped);
        };

        let config = self.config();
        self.inner.store.begin_generation();
        let cycle_start = Instant::now();

        let generated = self
            .inner
            .monitor
            .time_async(
                OperationClass::Generation,
                "generate",
                self.inner.generator.generate(config.count, config.version),
            )
            .await;

        let identifiers = match generated.result {
            Ok(identifiers) => identifiers,
            Err(e) => {
                tracing::error!("Generation of {} identifiers failed: {}", config.count, e);
                if self.is_torn_down() {
                    self.inner.store.abort_generation();
                } else {
                    self.inner.store.fail_generation(e.to_string());
                    self.refresh_health();
                }
                return Err(e);
            }
        };

        let formatted = self.inner.monitor.time(OperationClass::Formatting, "format", || {
            self.inner.formatter.format_all(&identifiers, &config.format)
        });
        self.inner
            .monitor
            .record(OperationClass::Total, "generate+format", cycle_start.elapsed());

        if self.is_torn_down() {
            tracing::debug!("Discarding generation finished after teardown");
            self.inner.store.abort_generation();
            return Ok(RegenerateOutcome::Skipped);
        }

        let result = GenerationResult {
            identifiers,
            formatted_output: formatted.result,
            timing: Timing {
                generation_ms: generated.duration_ms,
                format_ms: formatted.duration_ms,
            },
            generated_at: Utc::now(),
        };

        tracing::info!(
            "Generated {} identifiers in {:.2}ms",
            result.len(),
            result.timing.total_ms()
        );
        self.inner.store.finish_generation(result.clone());
        self.refresh_health();

        if self.config().format != config.format {
            tracing::debug!("Format flags changed during generation, reformatting");
            self.reformat();
            if let Some(current) = self.inner.store.read(|state| state.result.clone()) {
                return Ok(RegenerateOutcome::Completed(current));
            }
        }

        Ok(RegenerateOutcome::Completed(result))
    }

    /// Re-render the current identifiers with the active format flags.
    ///
    /// Never generates. Returns `false` when there is nothing to reformat.
    pub fn reformat(&self) -> bool {
        if self.is_torn_down() {
            return false;
        }

        let rendered = self.inner.store.rerender_output(|identifiers, flags| {
            let formatted = self.inner.monitor.time(OperationClass::Formatting, "reformat", || {
                self.inner.formatter.format_all(identifiers, flags)
            });
            (formatted.result, formatted.duration_ms)
        });

        if rendered {
            self.refresh_health();
        }
        rendered
    }

    /// Copy the whole formatted output.
    pub async fn copy_all(&self) -> CopyOutcome {
        let content = self
            .inner
            .store
            .read(|state| state.result.as_ref().map(|r| (r.formatted_output.clone(), r.len())));

        let Some((content, count)) = content else {
            self.inner.store.set_notice("Nothing to copy yet");
            return CopyOutcome {
                success: false,
                content: String::new(),
            };
        };

        let success = self.inner.clipboard.copy(&content).await;
        let noun = if count == 1 { "identifier" } else { "identifiers" };
        self.notify_copy(success, &format!("Copied {} {}", count, noun));

        CopyOutcome { success, content }
    }

    /// Copy one identifier rendered with the active format flags.
    ///
    /// `identifier` must be a canonical hyphenated UUID; anything else is refused.
    pub async fn copy_single(&self, identifier: &str) -> CopyOutcome {
        if !self.inner.formatter.is_valid_canonical_uuid(identifier) {
            tracing::warn!("Refusing to copy malformed identifier {:?}", identifier);
            self.inner.store.set_notice("Copy failed: not a valid identifier");
            return CopyOutcome {
                success: false,
                content: String::new(),
            };
        }

        let flags = self.config().format;
        let content = self.inner.formatter.format_one(identifier, &flags);
        let success = self.inner.clipboard.copy(&content).await;
        self.notify_copy(success, "Copied identifier");

        CopyOutcome { success, content }
    }

    fn notify_copy(&self, success: bool, message: &str) {
        if success {
            self.inner.store.set_notice(message);
        } else {
            self.inner
                .store
                .set_notice("Copy failed: clipboard unavailable");
        }
    }

    fn save_preferences(&self) -> bool {
        let config = self.config();
        let saved = self.inner.preferences.save(&config);
        if saved {
            self.inner.store.mark_preferences_saved();
        } else {
            self.inner
                .store
                .set_notice("Preferences could not be saved");
        }
        saved
    }

    /// Save preferences now, replacing any pending debounced save.
    pub fn flush_preferences(&self) -> bool {
        self.inner.save_timer.cancel();
        self.save_preferences()
    }

    /// Forget saved preferences and return to the default configuration.
    pub fn reset_preferences(&self) {
        self.inner.save_timer.cancel();
        self.inner.preferences.clear();

        let previous = self.config();
        let defaults = GenerationConfig::default();
        self.inner.store.reset_config(defaults);
        tracing::info!("Preferences reset to defaults");

        if self.is_torn_down() {
            return;
        }

        if previous.needs_regeneration(&defaults) {
            self.schedule_regeneration();
        } else if previous.needs_reformat(&defaults) {
            self.reformat();
        }
    }

    /// Clear the visible error.
    pub fn dismiss_error(&self) {
        self.inner.store.clear_error();
    }

    /// Identifiers from the non-cryptographic fallback, for when no secure source exists.
    ///
    /// Never used implicitly by [`regenerate()`](Self::regenerate).
    pub fn fallback_identifiers(&self, count: u32) -> Result<Vec<String>, GenerationError> {
        self.inner.generator.generate_insecure(count)
    }

    /// Cancel pending timers. Later timers, regenerations and reformats do nothing.
    pub fn teardown(&self) {
        if self.inner.torn_down.swap(true, Ordering::AcqRel) {
            return;
        }

        let regeneration = self.inner.regenerate_timer.cancel();
        let save = self.inner.save_timer.cancel();
        tracing::info!(
            "Coordinator torn down (cancelled regeneration: {}, cancelled save: {})",
            regeneration,
            save
        );
        self.inner.monitor.log_summary();
    }

    fn refresh_health(&self) {
        self.inner.store.set_health(self.inner.monitor.health());
    }
}

// State management module
//
// This module provides the StateStore which wraps GeneratorState with thread-safe access
// using Arc<RwLock<T>> and emits change events for front-end updates.

use crate::metrics::{HealthStatus, PerformanceHealth};
use crate::models::{FormatFlags, GenerationConfig, GenerationResult};
use chrono::{DateTime, Utc};
use std::sync::{Arc, RwLock, RwLockReadGuard, RwLockWriteGuard};
use tokio::sync::broadcast;

/// Change events emitted when state is modified
///
/// These events let a front end react to the coordinator without polling snapshots.
#[derive(Clone, Debug, PartialEq)]
pub enum StateChange {
    /// The active configuration was replaced
    ConfigChanged {
        needs_regeneration: bool,
        needs_reformat: bool,
    },

    /// A generation cycle has started
    GenerationStarted { count: u32 },

    /// A generation cycle has ended, successfully or not
    GenerationFinished { succeeded: bool },

    /// A new set of identifiers replaced the previous result
    ResultReplaced { count: usize, total_ms: f64 },

    /// Existing identifiers were re-rendered with new format flags
    OutputReformatted { format_ms: f64 },

    /// The user-visible error changed (`None` once dismissed or resolved)
    ErrorChanged { message: Option<String> },

    /// Performance health moved to a different status
    HealthChanged { status: HealthStatus },

    /// A transient notification for the user (copy outcome, storage problems)
    Notice { message: String },

    /// Preferences were written to storage
    PreferencesSaved,

    /// Preferences were cleared and the configuration reset to defaults
    StateReset,
}

/// Where the visible error came from
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ErrorKind {
    /// A rejected configuration update; cleared by the next accepted one
    Validation,

    /// A failed generation cycle; cleared by a successful cycle or a dismissal
    Generation,
}

/// Everything the front end can observe about the generator.
#[derive(Clone, Debug, PartialEq)]
pub struct GeneratorState {
    pub config: GenerationConfig,
    pub result: Option<GenerationResult>,
    pub is_generating: bool,

    /// Dismissible error banner text
    pub last_error: Option<String>,
    pub error_kind: Option<ErrorKind>,

    /// Latest transient notification
    pub notice: Option<String>,

    pub health: PerformanceHealth,

    /// Number of generation cycles that replaced the result
    pub completed_generations: u64,

    pub preferences_saved_at: Option<DateTime<Utc>>,
}

impl GeneratorState {
    pub fn new(config: GenerationConfig) -> Self {
        Self {
            config,
            result: None,
            is_generating: false,
            last_error: None,
            error_kind: None,
            notice: None,
            health: PerformanceHealth {
                status: HealthStatus::Good,
                message: String::new(),
            },
            completed_generations: 0,
            preferences_saved_at: None,
        }
    }

    pub fn identifier_count(&self) -> usize {
        self.result.as_ref().map(|r| r.len()).unwrap_or(0)
    }

    fn clear_error(&mut self) {
        self.last_error = None;
        self.error_kind = None;
    }
}

impl Default for GeneratorState {
    fn default() -> Self {
        Self::new(GenerationConfig::default())
    }
}

/// Thread-safe state store with event emission
///
/// Owned by the [`GenerationCoordinator`](crate::coordinator::GenerationCoordinator).
/// Consumers read snapshots and subscribe to [`StateChange`] events; only the coordinator
/// mutates state, through [`update()`](Self::update) and the helpers built on it.
pub struct StateStore {
    /// The generator state protected by RwLock for thread-safe access
    state: Arc<RwLock<GeneratorState>>,

    /// Broadcast channel for emitting state change events
    state_tx: broadcast::Sender<StateChange>,
}

impl StateStore {
    /// Create a store around `config` with a broadcast buffer of 100 events
    pub fn new(config: GenerationConfig) -> Self {
        let (state_tx, _) = broadcast::channel(100);
        Self {
            state: Arc::new(RwLock::new(GeneratorState::new(config))),
            state_tx,
        }
    }

    fn read_guard(&self) -> RwLockReadGuard<'_, GeneratorState> {
        self.state.read().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    fn write_guard(&self) -> RwLockWriteGuard<'_, GeneratorState> {
        self.state.write().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    /// Clone of the whole state
    pub fn snapshot(&self) -> GeneratorState {
        self.read_guard().clone()
    }

    /// Execute a function with read access to the state
    pub fn read<F, R>(&self, f: F) -> R
    where
        F: FnOnce(&GeneratorState) -> R,
    {
        let state = self.read_guard();
        f(&state)
    }

    /// Update the state and emit change events
    ///
    /// Captures the old state, applies `update_fn`, diffs the two and broadcasts one event
    /// per detected change. Returns the emitted events.
    pub fn update<F>(&self, update_fn: F) -> Vec<StateChange>
    where
        F: FnOnce(&mut GeneratorState),
    {
        let mut state = self.write_guard();
        let old_state = state.clone();

        update_fn(&mut state);

        let changes = Self::detect_changes(&old_state, &state);
        drop(state);

        for change in &changes {
            // Nobody listening is fine
            let _ = self.state_tx.send(change.clone());
        }

        changes
    }

    /// Subscribe to state change events
    pub fn subscribe(&self) -> broadcast::Receiver<StateChange> {
        self.state_tx.subscribe()
    }

    fn emit(&self, change: StateChange) -> StateChange {
        let _ = self.state_tx.send(change.clone());
        change
    }

    fn detect_changes(old: &GeneratorState, new: &GeneratorState) -> Vec<StateChange> {
        let mut changes = Vec::new();

        if old.config != new.config {
            changes.push(StateChange::ConfigChanged {
                needs_regeneration: old.config.needs_regeneration(&new.config),
                needs_reformat: old.config.needs_reformat(&new.config),
            });
        }

        if old.is_generating != new.is_generating {
            if new.is_generating {
                changes.push(StateChange::GenerationStarted {
                    count: new.config.count,
                });
            } else {
                changes.push(StateChange::GenerationFinished {
                    succeeded: new.completed_generations > old.completed_generations,
                });
            }
        }

        if old.completed_generations != new.completed_generations {
            if let Some(result) = &new.result {
                changes.push(StateChange::ResultReplaced {
                    count: result.len(),
                    total_ms: result.timing.total_ms(),
                });
            }
        } else if let (Some(old_result), Some(new_result)) = (&old.result, &new.result) {
            if old_result.formatted_output != new_result.formatted_output {
                changes.push(StateChange::OutputReformatted {
                    format_ms: new_result.timing.format_ms,
                });
            }
        }

        if old.last_error != new.last_error {
            changes.push(StateChange::ErrorChanged {
                message: new.last_error.clone(),
            });
        }

        if old.health.status != new.health.status {
            changes.push(StateChange::HealthChanged {
                status: new.health.status,
            });
        }

        if old.notice != new.notice {
            if let Some(message) = &new.notice {
                changes.push(StateChange::Notice {
                    message: message.clone(),
                });
            }
        }

        if old.preferences_saved_at != new.preferences_saved_at && new.preferences_saved_at.is_some()
        {
            changes.push(StateChange::PreferencesSaved);
        }

        changes
    }

    // Convenience methods for the coordinator's state transitions

    /// Replace the configuration; an accepted update clears a validation error only
    pub fn set_config(&self, config: GenerationConfig) -> Vec<StateChange> {
        self.update(|state| {
            state.config = config;
            if state.error_kind == Some(ErrorKind::Validation) {
                state.clear_error();
            }
        })
    }

    pub fn begin_generation(&self) -> Vec<StateChange> {
        self.update(|state| {
            state.is_generating = true;
        })
    }

    /// Store a completed result and leave the generating state
    pub fn finish_generation(&self, result: GenerationResult) -> Vec<StateChange> {
        self.update(|state| {
            state.result = Some(result);
            state.is_generating = false;
            state.clear_error();
            state.completed_generations += 1;
        })
    }

    /// Leave the generating state with an error, keeping the previous result
    pub fn fail_generation(&self, message: String) -> Vec<StateChange> {
        self.update(|state| {
            state.is_generating = false;
            state.last_error = Some(message);
            state.error_kind = Some(ErrorKind::Generation);
        })
    }

    /// Leave the generating state without touching the result or the error
    pub fn abort_generation(&self) -> Vec<StateChange> {
        self.update(|state| {
            state.is_generating = false;
        })
    }

    /// Re-render the current identifiers under a single write lock
    ///
    /// `render` gets the identifiers and the active flags and returns the new output with
    /// its formatting time in milliseconds. Returns `false` when there is no result.
    pub fn rerender_output<F>(&self, render: F) -> bool
    where
        F: FnOnce(&[String], &FormatFlags) -> (String, f64),
    {
        let mut rendered = false;
        self.update(|state| {
            let flags = state.config.format;
            if let Some(result) = state.result.as_mut() {
                let (formatted_output, format_ms) = render(&result.identifiers, &flags);
                result.formatted_output = formatted_output;
                result.timing.format_ms = format_ms;
                rendered = true;
            }
        });
        rendered
    }

    pub fn set_validation_error(&self, message: String) -> Vec<StateChange> {
        self.update(|state| {
            state.last_error = Some(message);
            state.error_kind = Some(ErrorKind::Validation);
        })
    }

    pub fn clear_error(&self) -> Vec<StateChange> {
        self.update(GeneratorState::clear_error)
    }

    pub fn set_health(&self, health: PerformanceHealth) -> Vec<StateChange> {
        self.update(|state| {
            state.health = health;
        })
    }

    /// Publish a notification. Repeating the same text still emits an event.
    pub fn set_notice(&self, message: impl Into<String>) -> Vec<StateChange> {
        let message = message.into();
        let mut changes = self.update(|state| {
            state.notice = Some(message.clone());
        });

        if changes.is_empty() {
            changes.push(self.emit(StateChange::Notice { message }));
        }
        changes
    }

    pub fn mark_preferences_saved(&self) -> Vec<StateChange> {
        self.update(|state| {
            state.preferences_saved_at = Some(Utc::now());
        })
    }

    /// Reset to `config` after a preferences reset
    pub fn reset_config(&self, config: GenerationConfig) -> Vec<StateChange> {
        let mut changes = self.update(|state| {
            state.config = config;
            state.clear_error();
            state.preferences_saved_at = None;
        });

        changes.push(self.emit(StateChange::StateReset));
        changes
    }
}

impl Default for StateStore {
    fn default() -> Self {
        Self::new(GenerationConfig::default())
    }
}

// Performance monitoring module
//
// Times generation and formatting, keeps a bounded history of samples and alerts,
// and derives a good / warning / critical health status from them.

use crate::models::{PerformanceSettings, Threshold};
use serde::Serialize;
use std::collections::VecDeque;
use std::fmt;
use std::future::Future;
use std::sync::Mutex;
use std::time::{Duration, Instant};

/// Operation classes with their own thresholds and slow-sample counters.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum OperationClass {
    Generation,
    Formatting,
    Total,
}

impl OperationClass {
    pub const ALL: [OperationClass; 3] = [
        OperationClass::Generation,
        OperationClass::Formatting,
        OperationClass::Total,
    ];

    fn index(self) -> usize {
        match self {
            OperationClass::Generation => 0,
            OperationClass::Formatting => 1,
            OperationClass::Total => 2,
        }
    }
}

impl fmt::Display for OperationClass {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            OperationClass::Generation => f.write_str("generation"),
            OperationClass::Formatting => f.write_str("formatting"),
            OperationClass::Total => f.write_str("total"),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum HealthStatus {
    #[default]
    Good,
    Warning,
    Critical,
}

impl fmt::Display for HealthStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            HealthStatus::Good => f.write_str("good"),
            HealthStatus::Warning => f.write_str("warning"),
            HealthStatus::Critical => f.write_str("critical"),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum AlertLevel {
    Warning,
    Error,
}

/// One timed operation.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TimingSample {
    pub class: OperationClass,
    pub label: String,
    pub duration_ms: f64,
}

/// A threshold breach.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PerformanceAlert {
    pub sequence: u64,
    pub class: OperationClass,
    pub level: AlertLevel,
    pub label: String,
    pub duration_ms: f64,
    pub threshold_ms: f64,
}

/// Aggregated health as shown to the user.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PerformanceHealth {
    pub status: HealthStatus,
    pub message: String,
}

/// Value returned by a timed closure together with how long it took.
#[derive(Debug, Clone, PartialEq)]
pub struct Timed<T> {
    pub result: T,
    pub duration_ms: f64,
}

#[derive(Debug, Default)]
struct MonitorState {
    samples: VecDeque<TimingSample>,
    alerts: VecDeque<PerformanceAlert>,
    consecutive_slow: [u32; 3],
    /// Alert sequence number at which each class last had a fast sample.
    recovered_at: [u64; 3],
    next_sequence: u64,
}

/// Performance monitor with bounded history and flap suppression.
///
/// A sample at or above the error threshold raises a critical alert immediately.
/// Samples between the warning and error thresholds only raise a warning once
/// `consecutive_warning_limit` of them arrive in a row for the same class, so one
/// slow frame does not flicker a warning at the user. A fast sample resets the
/// counter and clears the class's active alerts.
///
/// Created explicitly and shared with the coordinator through an `Arc`; [`clear`]
/// resets it between tests.
///
/// [`clear`]: PerformanceMonitor::clear
#[derive(Debug)]
pub struct PerformanceMonitor {
    settings: PerformanceSettings,
    state: Mutex<MonitorState>,
}

impl PerformanceMonitor {
    pub fn new(settings: PerformanceSettings) -> Self {
        Self {
            settings,
            state: Mutex::new(MonitorState::default()),
        }
    }

    pub fn threshold(&self, class: OperationClass) -> Threshold {
        match class {
            OperationClass::Generation => self.settings.generation,
            OperationClass::Formatting => self.settings.formatting,
            OperationClass::Total => self.settings.total,
        }
    }

    /// Time a synchronous closure and record the sample.
    pub fn time<T, F>(&self, class: OperationClass, label: &str, f: F) -> Timed<T>
    where
        F: FnOnce() -> T,
    {
        let start = Instant::now();
        let result = f();
        let duration = start.elapsed();
        Timed {
            result,
            duration_ms: self.record(class, label, duration),
        }
    }

    /// Time a future and record the sample.
    pub async fn time_async<T, Fut>(&self, class: OperationClass, label: &str, fut: Fut) -> Timed<T>
    where
        Fut: Future<Output = T>,
    {
        let start = Instant::now();
        let result = fut.await;
        let duration = start.elapsed();
        Timed {
            result,
            duration_ms: self.record(class, label, duration),
        }
    }

    /// Record an externally measured duration. Returns it in milliseconds.
    pub fn record(&self, class: OperationClass, label: &str, duration: Duration) -> f64 {
        let duration_ms = duration.as_secs_f64() * 1000.0;
        self.record_ms(class, label, duration_ms);
        duration_ms
    }

    /// Record a sample given in milliseconds and evaluate it against the thresholds.
    pub fn record_ms(&self, class: OperationClass, label: &str, duration_ms: f64) {
        let threshold = self.threshold(class);
        let Ok(mut guard) = self.state.lock() else {
            tracing::warn!("Performance monitor state poisoned, dropping sample");
            return;
        };
        let state = &mut *guard;

        state.samples.push_back(TimingSample {
            class,
            label: label.to_string(),
            duration_ms,
        });
        while state.samples.len() > self.settings.sample_history {
            state.samples.pop_front();
        }

        let idx = class.index();
        let alert = if duration_ms >= threshold.error_ms {
            state.consecutive_slow[idx] = 0;
            Some((AlertLevel::Error, threshold.error_ms))
        } else if duration_ms >= threshold.warning_ms {
            state.consecutive_slow[idx] += 1;
            if state.consecutive_slow[idx] >= self.settings.consecutive_warning_limit {
                state.consecutive_slow[idx] = 0;
                Some((AlertLevel::Warning, threshold.warning_ms))
            } else {
                None
            }
        } else {
            state.consecutive_slow[idx] = 0;
            state.recovered_at[idx] = state.next_sequence;
            None
        };

        if let Some((level, threshold_ms)) = alert {
            state.next_sequence += 1;
            let sequence = state.next_sequence;

            match level {
                AlertLevel::Error => tracing::error!(
                    "{} ({}) took {:.2}ms, over the {:.0}ms error threshold",
                    label,
                    class,
                    duration_ms,
                    threshold_ms
                ),
                AlertLevel::Warning => tracing::warn!(
                    "{} ({}) slow for {} consecutive samples, last {:.2}ms",
                    label,
                    class,
                    self.settings.consecutive_warning_limit,
                    duration_ms
                ),
            }

            state.alerts.push_back(PerformanceAlert {
                sequence,
                class,
                level,
                label: label.to_string(),
                duration_ms,
                threshold_ms,
            });
            while state.alerts.len() > self.settings.alert_history {
                state.alerts.pop_front();
            }
        }
    }

    /// Alerts inside the health window whose class has not recovered since.
    fn active_alerts(&self, state: &MonitorState) -> Vec<PerformanceAlert> {
        state
            .alerts
            .iter()
            .rev()
            .take(self.settings.health_window)
            .filter(|a| a.sequence > state.recovered_at[a.class.index()])
            .cloned()
            .collect()
    }

    pub fn health(&self) -> PerformanceHealth {
        let Ok(state) = self.state.lock() else {
            return PerformanceHealth {
                status: HealthStatus::Good,
                message: "Performance data unavailable".to_string(),
            };
        };
        let active = self.active_alerts(&state);
        drop(state);

        if let Some(alert) = active.iter().find(|a| a.level == AlertLevel::Error) {
            PerformanceHealth {
                status: HealthStatus::Critical,
                message: format!(
                    "{} took {:.1}ms (limit {:.0}ms)",
                    alert.label, alert.duration_ms, alert.threshold_ms
                ),
            }
        } else if let Some(alert) = active.first() {
            PerformanceHealth {
                status: HealthStatus::Warning,
                message: format!(
                    "{} is running slowly ({:.1}ms, target {:.0}ms)",
                    alert.label, alert.duration_ms, alert.threshold_ms
                ),
            }
        } else {
            PerformanceHealth {
                status: HealthStatus::Good,
                message: "Performance is within budget".to_string(),
            }
        }
    }

    pub fn has_active_issues(&self) -> bool {
        self.health().status != HealthStatus::Good
    }

    pub fn samples(&self) -> Vec<TimingSample> {
        self.state
            .lock()
            .map(|s| s.samples.iter().cloned().collect())
            .unwrap_or_default()
    }

    pub fn alerts(&self) -> Vec<PerformanceAlert> {
        self.state
            .lock()
            .map(|s| s.alerts.iter().cloned().collect())
            .unwrap_or_default()
    }

    /// Current consecutive slow-sample count for a class.
    pub fn consecutive_slow(&self, class: OperationClass) -> u32 {
        self.state
            .lock()
            .map(|s| s.consecutive_slow[class.index()])
            .unwrap_or(0)
    }

    /// Average duration of the retained samples of a class.
    pub fn average_ms(&self, class: OperationClass) -> f64 {
        let samples = self.samples();
        let durations: Vec<f64> = samples
            .iter()
            .filter(|s| s.class == class)
            .map(|s| s.duration_ms)
            .collect();
        if durations.is_empty() {
            0.0
        } else {
            durations.iter().sum::<f64>() / durations.len() as f64
        }
    }

    /// Drop all history, counters and alerts.
    pub fn clear(&self) {
        if let Ok(mut state) = self.state.lock() {
            *state = MonitorState::default();
        }
    }

    /// Log metrics summary
    pub fn log_summary(&self) {
        let health = self.health();
        tracing::info!("=== Performance Summary ===");
        for class in OperationClass::ALL {
            tracing::info!("{}: avg {:.2}ms", class, self.average_ms(class));
        }
        tracing::info!(
            "Samples: {}, alerts: {}, health: {} ({})",
            self.samples().len(),
            self.alerts().len(),
            health.status,
            health.message
        );
    }
}

impl Default for PerformanceMonitor {
    fn default() -> Self {
        Self::new(PerformanceSettings::default())
    }
}

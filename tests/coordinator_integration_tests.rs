//! Integration tests for GenerationCoordinator
//!
//! These tests verify:
//! - Format flag changes reformat existing identifiers without regenerating
//! - At most one generation cycle runs at a time
//! - A cycle uses the configuration it started with; edits made mid-cycle apply afterwards
//! - Reformatting never writes output for stale identifiers
//! - Count edits are debounced into a single regeneration
//! - Rejected updates keep the active configuration
//! - The clipboard content contract for bulk and single copies
//! - Teardown cancels pending work

use async_trait::async_trait;
use std::sync::{Arc, Mutex};
use std::time::Duration;
use uuidgen::metrics::PerformanceMonitor;
use uuidgen::models::{GenerationSettings, PerformanceSettings, TimingSettings};
use uuidgen::services::{
    ClipboardError, ClipboardService, FallbackClipboard, IdentifierGenerator, MemoryStorage,
    NativeClipboard, PreferenceStore,
};
use uuidgen::{
    ConfigError, ConfigUpdate, GenerationCoordinator, RegenerateOutcome, StateChange,
    UuidFormatter,
};

/// Native clipboard double that records what it was given.
#[derive(Clone, Default)]
struct RecordingClipboard {
    copied: Arc<Mutex<Vec<String>>>,
}

impl RecordingClipboard {
    fn last(&self) -> Option<String> {
        self.copied.lock().unwrap().last().cloned()
    }
}

#[async_trait]
impl NativeClipboard for RecordingClipboard {
    fn name(&self) -> &'static str {
        "recording"
    }

    fn is_available(&self) -> bool {
        true
    }

    async fn write_text(&self, text: &str) -> Result<(), ClipboardError> {
        self.copied.lock().unwrap().push(text.to_string());
        Ok(())
    }
}

struct NoFallback;

impl FallbackClipboard for NoFallback {
    fn is_available(&self) -> bool {
        false
    }

    fn copy_text(&self, _text: &str) -> bool {
        false
    }
}

fn create_coordinator() -> (GenerationCoordinator, RecordingClipboard) {
    let clipboard = RecordingClipboard::default();
    let coordinator = GenerationCoordinator::new(
        IdentifierGenerator::new(&GenerationSettings::default()),
        PreferenceStore::new(Arc::new(MemoryStorage::new()), "prefs"),
        ClipboardService::new(Box::new(clipboard.clone()), Box::new(NoFallback)),
        Arc::new(PerformanceMonitor::new(PerformanceSettings::default())),
        &TimingSettings::default(),
    );
    (coordinator, clipboard)
}

#[tokio::test]
async fn test_flag_change_keeps_identifiers() {
    let (coordinator, _clipboard) = create_coordinator();

    coordinator
        .update_config(ConfigUpdate::default().with_count(103))
        .unwrap();
    let RegenerateOutcome::Completed(first) = coordinator.regenerate().await.unwrap() else {
        panic!("expected a completed cycle");
    };
    assert_eq!(first.len(), 103);

    coordinator
        .update_config(ConfigUpdate::default().with_hyphens(false))
        .unwrap();

    let state = coordinator.snapshot();
    let current = state.result.unwrap();
    assert_eq!(current.identifiers, first.identifiers);
    assert_eq!(state.completed_generations, 1);

    let lines: Vec<&str> = current.formatted_output.lines().collect();
    assert_eq!(lines.len(), 103);
    assert!(lines.iter().all(|line| line.len() == 32 && !line.contains('-')));
    coordinator.teardown();
}

#[tokio::test]
async fn test_concurrent_regenerations_run_once() {
    let (coordinator, _clipboard) = create_coordinator();
    coordinator
        .update_config(ConfigUpdate::default().with_count(1000))
        .unwrap();

    let (a, b) = tokio::join!(coordinator.regenerate(), coordinator.regenerate());
    let outcomes = [a.unwrap(), b.unwrap()];

    let completed = outcomes.iter().filter(|o| o.is_completed()).count();
    assert_eq!(completed, 1);
    assert!(outcomes.contains(&RegenerateOutcome::Skipped));
    assert_eq!(coordinator.snapshot().completed_generations, 1);
    assert!(!coordinator.is_generating());
    coordinator.teardown();
}

#[tokio::test(start_paused = true)]
async fn test_mid_cycle_edits_apply_after_cycle() {
    let (coordinator, _clipboard) = create_coordinator();
    coordinator
        .update_config(ConfigUpdate::default().with_count(1000))
        .unwrap();

    let editor = coordinator.clone();
    let (outcome, _) = tokio::join!(coordinator.regenerate(), async move {
        tokio::task::yield_now().await;
        assert!(editor.is_generating());
        editor
            .update_config(ConfigUpdate::default().with_count(5).with_upper_case(true))
            .unwrap();
    });

    let RegenerateOutcome::Completed(result) = outcome.unwrap() else {
        panic!("expected a completed cycle");
    };
    let config = coordinator.config();
    assert_eq!(config.count, 5);
    assert_eq!(result.len(), 1000);
    assert!(result.identifiers.iter().all(|id| *id == id.to_lowercase()));

    // Flags changed mid-cycle: the finished cycle is re-rendered with them
    let expected = UuidFormatter::new().format_all(&result.identifiers, &config.format);
    assert_eq!(result.formatted_output, expected);
    assert_eq!(result.formatted_output, result.formatted_output.to_uppercase());
    assert_eq!(coordinator.snapshot().result, Some(result));
    assert_eq!(coordinator.snapshot().completed_generations, 1);

    // The count edit only lands on the next cycle
    assert!(coordinator.regeneration_pending());
    tokio::time::sleep(Duration::from_millis(400)).await;

    let state = coordinator.snapshot();
    assert_eq!(state.completed_generations, 2);
    assert_eq!(state.identifier_count(), 5);
    let output = state.result.unwrap().formatted_output;
    assert_eq!(output, output.to_uppercase());
    coordinator.teardown();
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn test_reformat_racing_cycles_matches_identifiers() {
    let (coordinator, _clipboard) = create_coordinator();
    coordinator
        .update_config(ConfigUpdate::default().with_upper_case(true).with_count(200))
        .unwrap();

    let reformatter = {
        let coordinator = coordinator.clone();
        tokio::task::spawn_blocking(move || {
            for _ in 0..500 {
                coordinator.reformat();
            }
        })
    };
    for _ in 0..20 {
        coordinator.regenerate().await.unwrap();
    }
    reformatter.await.unwrap();

    let state = coordinator.snapshot();
    let result = state.result.unwrap();
    let expected = UuidFormatter::new().format_all(&result.identifiers, &state.config.format);
    assert_eq!(result.formatted_output, expected);
    coordinator.teardown();
}

#[tokio::test(start_paused = true)]
async fn test_rapid_count_edits_regenerate_once() {
    let (coordinator, _clipboard) = create_coordinator();
    let mut rx = coordinator.subscribe();

    for count in [2, 3, 4, 5, 6] {
        coordinator
            .update_config(ConfigUpdate::default().with_count(count))
            .unwrap();
        tokio::time::sleep(Duration::from_millis(50)).await;
    }

    tokio::time::sleep(Duration::from_secs(1)).await;

    let mut replaced = 0;
    while let Ok(event) = rx.try_recv() {
        if matches!(event, StateChange::ResultReplaced { .. }) {
            replaced += 1;
        }
    }
    assert_eq!(replaced, 1);
    assert_eq!(coordinator.snapshot().identifier_count(), 6);
}

#[tokio::test]
async fn test_rejected_update_keeps_config() {
    let (coordinator, _clipboard) = create_coordinator();
    coordinator
        .update_config(ConfigUpdate::default().with_count(10).with_braces(true))
        .unwrap();
    let before = coordinator.config();

    let err = coordinator
        .update_config(ConfigUpdate::default().with_count(1001).with_upper_case(true))
        .unwrap_err();

    assert_eq!(err, ConfigError::InvalidCount(1001));
    assert_eq!(coordinator.config(), before);
    assert_eq!(
        coordinator.snapshot().last_error.as_deref(),
        Some("Count must be between 1 and 1000, got 1001")
    );
    coordinator.teardown();
}

#[tokio::test]
async fn test_copy_content_contract() {
    let (coordinator, clipboard) = create_coordinator();
    coordinator
        .update_config(
            ConfigUpdate::default()
                .with_count(3)
                .with_quotes(true)
                .with_commas(true),
        )
        .unwrap();
    coordinator.regenerate().await.unwrap();

    let bulk = coordinator.copy_all().await;
    let state = coordinator.snapshot();
    let result = state.result.unwrap();
    assert!(bulk.success);
    assert_eq!(bulk.content, result.formatted_output);
    assert_eq!(clipboard.last().as_deref(), Some(result.formatted_output.as_str()));
    assert_eq!(bulk.content.matches(", ").count(), 2);

    let single = coordinator.copy_single(&result.identifiers[1]).await;
    let expected =
        UuidFormatter::new().format_one(&result.identifiers[1], &coordinator.config().format);
    assert!(single.success);
    assert_eq!(single.content, expected);
    assert_eq!(single.content, format!("\"{}\"", result.identifiers[1]));
    assert_eq!(clipboard.last(), Some(expected));
    coordinator.teardown();
}

#[tokio::test]
async fn test_copy_before_generation() {
    let (coordinator, clipboard) = create_coordinator();

    let outcome = coordinator.copy_all().await;
    assert!(!outcome.success);
    assert!(outcome.content.is_empty());
    assert!(clipboard.last().is_none());
}

#[tokio::test(start_paused = true)]
async fn test_teardown_cancels_pending_regeneration() {
    let (coordinator, _clipboard) = create_coordinator();

    coordinator
        .update_config(ConfigUpdate::default().with_count(50))
        .unwrap();
    assert!(coordinator.regeneration_pending());
    assert!(coordinator.save_pending());

    coordinator.teardown();
    assert!(!coordinator.regeneration_pending());
    assert!(!coordinator.save_pending());

    tokio::time::sleep(Duration::from_secs(1)).await;
    assert!(coordinator.snapshot().result.is_none());
    assert!(!coordinator.reformat());
}

#[tokio::test]
async fn test_health_good_after_fast_cycles() {
    let (coordinator, _clipboard) = create_coordinator();
    for _ in 0..3 {
        coordinator.regenerate().await.unwrap();
    }

    assert_eq!(coordinator.health().status, uuidgen::HealthStatus::Good);
    assert_eq!(coordinator.monitor().samples().len(), 9);
    coordinator.teardown();
}

// crates/lexicon-service/tests/service_unit.rs
// ============================================================================
// Module: Lexicon Service Unit Tests
// Description: Async API dispatch, thresholds, and degradation behavior.
// Purpose: Validate that reads degrade to defaults and writes report errors.
// ============================================================================

//! ## Overview
//! Drives [`LexiconService`] over a plaintext `SQLite` engine with a manual
//! clock and an in-memory event sink.

#![allow(
    clippy::panic,
    clippy::unwrap_used,
    clippy::expect_used,
    clippy::use_debug,
    reason = "Test-only assertions and helpers are permitted."
)]

use std::sync::Arc;
use std::time::Duration;

use lexicon_core::Component;
use lexicon_core::LanguageTag;
use lexicon_core::ManualClock;
use lexicon_core::MemoryEventSink;
use lexicon_core::Severity;
use lexicon_core::StoreError;
use lexicon_core::Timestamp;
use lexicon_core::WordSource;
use lexicon_service::LexiconService;
use lexicon_service::ServiceSettings;
use lexicon_store_sqlite::SqliteStoreConfig;
use lexicon_store_sqlite::StoreEngine;
use lexicon_store_sqlite::StoreRuntime;
use tempfile::TempDir;

// ============================================================================
// SECTION: Helpers
// ============================================================================

const DAY_MS: i64 = 86_400_000;

struct Harness {
    _temp: TempDir,
    engine: Arc<StoreEngine>,
    clock: Arc<ManualClock>,
    events: Arc<MemoryEventSink>,
    service: LexiconService,
}

fn harness() -> Harness {
    let temp = TempDir::new().unwrap();
    let clock = Arc::new(ManualClock::new(Timestamp::from_unix_millis(1_000)));
    let events = Arc::new(MemoryEventSink::new());
    let runtime = StoreRuntime::new(clock.clone(), events.clone());
    let config = SqliteStoreConfig::for_path(temp.path().join("lexicon.db"));
    let engine = Arc::new(StoreEngine::open(config, None, runtime).unwrap());
    let service = LexiconService::from_engine(&engine, ServiceSettings::default());
    Harness {
        _temp: temp,
        engine,
        clock,
        events,
        service,
    }
}

fn en() -> LanguageTag {
    LanguageTag::new("en").unwrap()
}

// ============================================================================
// SECTION: Vocabulary
// ============================================================================

#[tokio::test(flavor = "multi_thread")]
async fn suggestions_respect_minimum_frequency() {
    let h = harness();
    for _ in 0 .. 3 {
        h.service.learn_display(en(), "Hello".to_string(), WordSource::Typed).await.unwrap();
    }
    h.service.learn_display(en(), "Help".to_string(), WordSource::Typed).await.unwrap();

    let suggestions = h.service.suggest_prefix(en(), "HEL".to_string(), 5).await;
    let words: Vec<_> = suggestions.iter().map(|word| word.word_normalized.as_str()).collect();
    assert_eq!(words, vec!["hello"]);
    assert_eq!(suggestions[0].word_display, "Hello");
    assert_eq!(suggestions[0].frequency, 3);

    assert_eq!(h.service.word_count().await, 2);
    assert_eq!(h.service.word_count_by_language(en()).await, 2);
    assert!((h.service.average_frequency(None).await - 2.0).abs() < f64::EPSILON);
}

#[tokio::test(flavor = "multi_thread")]
async fn empty_prefix_and_zero_limit_return_nothing() {
    let h = harness();
    for _ in 0 .. 2 {
        h.service.learn_display(en(), "hello".to_string(), WordSource::Typed).await.unwrap();
    }
    assert!(h.service.suggest_prefix(en(), String::new(), 5).await.is_empty());
    assert!(h.service.suggest_prefix(en(), "he".to_string(), 0).await.is_empty());
}

#[tokio::test(flavor = "multi_thread")]
async fn cleanup_uses_configured_age() {
    let h = harness();
    h.service.learn_display(en(), "once".to_string(), WordSource::Typed).await.unwrap();
    h.service.learn_display(en(), "twice".to_string(), WordSource::Typed).await.unwrap();
    h.service.learn_display(en(), "twice".to_string(), WordSource::Typed).await.unwrap();

    h.clock.advance_millis(89 * DAY_MS);
    assert_eq!(h.service.cleanup_vocabulary().await.unwrap(), 0);

    h.clock.advance_millis(2 * DAY_MS);
    assert_eq!(h.service.cleanup_vocabulary().await.unwrap(), 1);
    let remaining = h.service.export_language(en()).await;
    assert_eq!(remaining.len(), 1);
    assert_eq!(remaining[0].word_normalized, "twice");
}

#[tokio::test(flavor = "multi_thread")]
async fn custom_settings_change_thresholds() {
    let h = harness();
    let service = LexiconService::from_engine(
        &h.engine,
        ServiceSettings {
            suggestion_min_frequency: 1,
            cleanup_max_age: Duration::from_secs(60),
        },
    );
    service.learn_display(en(), "solo".to_string(), WordSource::Typed).await.unwrap();
    assert_eq!(service.suggest_prefix(en(), "so".to_string(), 5).await.len(), 1);

    h.clock.advance_millis(61_000);
    assert_eq!(service.cleanup_vocabulary().await.unwrap(), 1);
}

// ============================================================================
// SECTION: Other Stores
// ============================================================================

#[tokio::test(flavor = "multi_thread")]
async fn predictions_follow_observed_pairs() {
    let h = harness();
    for _ in 0 .. 2 {
        h.service.observe_pair(en(), "good".to_string(), "morning".to_string()).await.unwrap();
    }
    h.service.observe_pair(en(), "good".to_string(), "night".to_string()).await.unwrap();
    let next = h.service.predict(en(), "good".to_string(), 5).await;
    assert_eq!(next, vec!["morning".to_string(), "night".to_string()]);
    assert!(h.service.predict(en(), "bad".to_string(), 5).await.is_empty());
}

#[tokio::test(flavor = "multi_thread")]
async fn overlay_and_key_mappings_round_trip_through_service() {
    let h = harness();
    h.service.increment_user_frequency(en(), "hello".to_string()).await.unwrap();
    let entry = h.service.increment_user_frequency(en(), "hello".to_string()).await.unwrap();
    assert_eq!(entry.frequency, 2);
    assert_eq!(h.service.user_frequency(en(), "hello".to_string()).await.unwrap().frequency, 2);
    assert_eq!(h.service.clear_all_user_frequencies().await.unwrap(), 1);
    assert!(h.service.user_frequency(en(), "hello".to_string()).await.is_none());

    h.service.set_key_mapping("a".to_string(), "α".to_string()).await.unwrap();
    h.service.set_key_mapping("a".to_string(), "ä".to_string()).await.unwrap();
    assert_eq!(h.service.key_mapping("a".to_string()).await.unwrap().custom_symbol, "ä");
    assert_eq!(h.service.key_mappings().await.len(), 1);
    assert!(h.service.clear_key_mapping("a".to_string()).await.unwrap());
    assert!(h.service.key_mapping("a".to_string()).await.is_none());
}

#[tokio::test(flavor = "multi_thread")]
async fn clipboard_flow_through_service() {
    let h = harness();
    let first = h.service.record_clipboard("first".to_string()).await.unwrap();
    h.clock.advance_millis(10);
    h.service.record_clipboard("second".to_string()).await.unwrap();
    assert!(h.service.toggle_pin(first.id, true).await.unwrap());

    assert_eq!(h.service.clear_unpinned_clipboard().await.unwrap(), 1);
    let pinned = h.service.clipboard_pinned().await;
    assert_eq!(pinned.len(), 1);
    assert_eq!(pinned[0].content, "first");
    assert_eq!(h.service.clipboard_recent(10).await.len(), 1);
    assert!(h.service.delete_clipboard_item(first.id).await.unwrap());
    assert!(h.service.clipboard_recent(10).await.is_empty());
}

// ============================================================================
// SECTION: Degradation
// ============================================================================

#[tokio::test(flavor = "multi_thread")]
async fn closed_store_degrades_reads_and_fails_writes() {
    let h = harness();
    h.service.learn_display(en(), "secretword".to_string(), WordSource::Typed).await.unwrap();
    h.service.learn_display(en(), "secretword".to_string(), WordSource::Typed).await.unwrap();
    h.engine.close().unwrap();

    assert!(h.service.suggest_prefix(en(), "secret".to_string(), 5).await.is_empty());
    assert_eq!(h.service.word_count().await, 0);
    assert!(h.service.clipboard_recent(5).await.is_empty());
    assert!(h.service.key_mapping("a".to_string()).await.is_none());

    let Err(err) =
        h.service.learn_display(en(), "secretword".to_string(), WordSource::Typed).await
    else {
        panic!("expected write on closed store to fail");
    };
    assert!(matches!(err, StoreError::Io(_)));
    let Err(err) = h.service.record_clipboard("copied secret".to_string()).await else {
        panic!("expected clipboard write on closed store to fail");
    };
    assert!(matches!(err, StoreError::Io(_)));

    assert!(h.events.contains("suggest_prefix", Severity::Error));
    assert!(h.events.contains("learn", Severity::Error));
    for event in h.events.events() {
        let key = event.key.clone().unwrap_or_default();
        assert!(!key.contains("secret"), "unredacted key: {key}");
        assert!(!event.message.contains("secret"), "leaked content: {}", event.message);
    }
    let clipboard_event =
        h.events.events().into_iter().find(|event| event.component == Component::Clipboard);
    assert!(clipboard_event.is_some_and(|event| event.key.is_none()));
}

#[tokio::test(flavor = "multi_thread")]
async fn invalid_input_is_a_write_error_not_a_panic() {
    let h = harness();
    let Err(err) = h.service.learn(en(), String::new(), String::new(), WordSource::Typed).await
    else {
        panic!("expected empty word to be rejected");
    };
    assert!(matches!(err, StoreError::Invalid(_)));
    assert!(h.events.contains("learn", Severity::Error));
}

// crates/lexicon-store-sqlite/tests/overlay_unit.rs
// ============================================================================
// Module: Frequency Overlay Unit Tests
// Description: Per-user counts kept apart from learned vocabulary.
// Purpose: Validate overlay counting, ranking, and concurrent increments.
// ============================================================================

//! ## Overview
//! Overlay counts share the store file with learned words but never touch
//! them.

#![allow(
    clippy::panic,
    clippy::unwrap_used,
    clippy::expect_used,
    clippy::use_debug,
    reason = "Test-only assertions and helpers are permitted."
)]

use std::sync::Arc;
use std::thread;

use lexicon_core::FrequencyOverlay;
use lexicon_core::LanguageTag;
use lexicon_core::ManualClock;
use lexicon_core::NoopEventSink;
use lexicon_core::Timestamp;
use lexicon_core::VocabularyStore;
use lexicon_core::WordSource;
use lexicon_store_sqlite::SqliteFrequencyOverlay;
use lexicon_store_sqlite::SqliteStoreConfig;
use lexicon_store_sqlite::SqliteVocabularyStore;
use lexicon_store_sqlite::StoreEngine;
use lexicon_store_sqlite::StoreRuntime;
use tempfile::TempDir;

// ============================================================================
// SECTION: Helpers
// ============================================================================

fn open(temp: &TempDir) -> (Arc<StoreEngine>, Arc<ManualClock>) {
    let clock = Arc::new(ManualClock::new(Timestamp::from_unix_millis(1)));
    let runtime = StoreRuntime::new(clock.clone(), Arc::new(NoopEventSink));
    let config = SqliteStoreConfig::for_path(temp.path().join("lexicon.db"));
    (Arc::new(StoreEngine::open(config, None, runtime).unwrap()), clock)
}

fn en() -> LanguageTag {
    LanguageTag::new("en").unwrap()
}

// ============================================================================
// SECTION: Counting
// ============================================================================

#[test]
fn overlay_counts_independently_of_vocabulary() {
    let temp = TempDir::new().unwrap();
    let (engine, _clock) = open(&temp);
    let overlay = SqliteFrequencyOverlay::new(Arc::clone(&engine));
    let vocabulary = SqliteVocabularyStore::new(engine);

    vocabulary.learn(&en(), "hello", "hello", WordSource::Typed).unwrap();
    assert!(overlay.get(&en(), "hello").unwrap().is_none());

    overlay.increment_frequency(&en(), "hello").unwrap();
    overlay.increment_frequency(&en(), "hello").unwrap();
    overlay.increment_frequency(&en(), "world").unwrap();
    assert_eq!(overlay.get(&en(), "hello").unwrap().unwrap().frequency, 2);
    assert_eq!(vocabulary.get_word(&en(), "hello").unwrap().unwrap().frequency, 1);

    let top = overlay.top(&en(), 1).unwrap();
    assert_eq!(top[0].word_normalized, "hello");

    vocabulary.clear_all().unwrap();
    assert_eq!(overlay.top(&en(), 10).unwrap().len(), 2);
    assert_eq!(overlay.clear_all().unwrap(), 2);
}

#[test]
fn increments_refresh_last_used_and_clear_by_language() {
    let temp = TempDir::new().unwrap();
    let (engine, clock) = open(&temp);
    let overlay = SqliteFrequencyOverlay::new(engine);
    let de = LanguageTag::new("de").unwrap();
    overlay.increment_frequency(&en(), "hello").unwrap();
    clock.advance_millis(9);
    let entry = overlay.increment_frequency(&en(), "hello").unwrap();
    overlay.increment_frequency(&de, "hallo").unwrap();

    assert_eq!(entry.frequency, 2);
    assert_eq!(entry.last_used.as_unix_millis(), 10);
    assert!(overlay.get(&de, "hello").unwrap().is_none());
    assert_eq!(overlay.clear_language(&en()).unwrap(), 1);
    assert_eq!(overlay.top(&de, 10).unwrap().len(), 1);
}

// ============================================================================
// SECTION: Concurrency
// ============================================================================

#[test]
fn concurrent_increments_lose_no_updates() {
    let temp = TempDir::new().unwrap();
    let (engine, _clock) = open(&temp);
    let overlay = Arc::new(SqliteFrequencyOverlay::new(engine));
    let handles: Vec<_> = (0 .. 8)
        .map(|_| {
            let overlay = Arc::clone(&overlay);
            thread::spawn(move || {
                for _ in 0 .. 25 {
                    overlay.increment_frequency(&en(), "busy").unwrap();
                }
            })
        })
        .collect();
    for handle in handles {
        handle.join().unwrap();
    }
    assert_eq!(overlay.get(&en(), "busy").unwrap().unwrap().frequency, 200);
}

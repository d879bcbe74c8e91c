// crates/lexicon-store-sqlite/tests/bigrams_unit.rs
// ============================================================================
// Module: Word Pair Store Unit Tests
// Description: Pair counting, follower ranking, and concurrent observation.
// Purpose: Validate the co-occurrence repository over a real store file.
// ============================================================================

//! ## Overview
//! Each test opens a fresh plaintext store with a manual clock so recency
//! ties are deterministic.

#![allow(
    clippy::panic,
    clippy::unwrap_used,
    clippy::expect_used,
    clippy::use_debug,
    reason = "Test-only assertions and helpers are permitted."
)]

use std::sync::Arc;
use std::thread;

use lexicon_core::CooccurrenceStore;
use lexicon_core::LanguageTag;
use lexicon_core::ManualClock;
use lexicon_core::NoopEventSink;
use lexicon_core::StoreError;
use lexicon_core::Timestamp;
use lexicon_store_sqlite::SqliteCooccurrenceStore;
use lexicon_store_sqlite::SqliteStoreConfig;
use lexicon_store_sqlite::StoreEngine;
use lexicon_store_sqlite::StoreRuntime;
use tempfile::TempDir;

// ============================================================================
// SECTION: Helpers
// ============================================================================

fn open(temp: &TempDir) -> (SqliteCooccurrenceStore, Arc<ManualClock>) {
    let clock = Arc::new(ManualClock::new(Timestamp::from_unix_millis(1)));
    let runtime = StoreRuntime::new(clock.clone(), Arc::new(NoopEventSink));
    let config = SqliteStoreConfig::for_path(temp.path().join("lexicon.db"));
    let engine = Arc::new(StoreEngine::open(config, None, runtime).unwrap());
    (SqliteCooccurrenceStore::new(engine), clock)
}

fn en() -> LanguageTag {
    LanguageTag::new("en").unwrap()
}

// ============================================================================
// SECTION: Ranking
// ============================================================================

#[test]
fn predict_orders_followers_by_frequency_then_recency() {
    let temp = TempDir::new().unwrap();
    let (bigrams, clock) = open(&temp);
    bigrams.observe_pair(&en(), "good", "night").unwrap();
    clock.advance_millis(1);
    for _ in 0 .. 3 {
        bigrams.observe_pair(&en(), "good", "morning").unwrap();
    }
    clock.advance_millis(1);
    bigrams.observe_pair(&en(), "good", "luck").unwrap();
    bigrams.observe_pair(&LanguageTag::new("de").unwrap(), "good", "zzz").unwrap();

    let predicted = bigrams.predict(&en(), "good", 5).unwrap();
    assert_eq!(predicted, vec!["morning", "luck", "night"]);
    assert_eq!(bigrams.predict(&en(), "good", 1).unwrap(), vec!["morning"]);
    assert!(bigrams.predict(&en(), "good", 0).unwrap().is_empty());
    assert!(bigrams.predict(&en(), "unknown", 5).unwrap().is_empty());
}

#[test]
fn pair_counts_and_clearing_are_scoped_by_language() {
    let temp = TempDir::new().unwrap();
    let (bigrams, clock) = open(&temp);
    let de = LanguageTag::new("de").unwrap();
    bigrams.observe_pair(&en(), "good", "morning").unwrap();
    clock.advance_millis(4);
    let pair = bigrams.observe_pair(&en(), "good", "morning").unwrap();
    bigrams.observe_pair(&en(), "good", "night").unwrap();
    bigrams.observe_pair(&de, "guten", "morgen").unwrap();

    assert_eq!(pair.frequency, 2);
    assert_eq!(pair.last_used.as_unix_millis(), 5);
    assert_eq!(bigrams.get_pair(&en(), "good", "morning").unwrap(), Some(pair));
    assert!(bigrams.get_pair(&de, "good", "morning").unwrap().is_none());
    assert_eq!(bigrams.pair_count(Some(&en())).unwrap(), 2);
    assert_eq!(bigrams.pair_count(None).unwrap(), 3);

    assert_eq!(bigrams.clear_language(&en()).unwrap(), 2);
    assert_eq!(bigrams.pair_count(None).unwrap(), 1);
    assert_eq!(bigrams.clear_all().unwrap(), 1);
}

#[test]
fn empty_words_are_rejected() {
    let temp = TempDir::new().unwrap();
    let (bigrams, _clock) = open(&temp);
    let Err(err) = bigrams.observe_pair(&en(), "", "morning") else {
        panic!("expected an empty leading word to fail");
    };
    assert!(matches!(err, StoreError::Invalid(_)));
    assert_eq!(bigrams.pair_count(None).unwrap(), 0);
}

// ============================================================================
// SECTION: Concurrency
// ============================================================================

#[test]
fn concurrent_observations_lose_no_updates() {
    let temp = TempDir::new().unwrap();
    let (bigrams, _clock) = open(&temp);
    let bigrams = Arc::new(bigrams);
    let handles: Vec<_> = (0 .. 8)
        .map(|_| {
            let bigrams = Arc::clone(&bigrams);
            thread::spawn(move || {
                for _ in 0 .. 25 {
                    bigrams.observe_pair(&en(), "thank", "you").unwrap();
                }
            })
        })
        .collect();
    for handle in handles {
        handle.join().unwrap();
    }
    let pair = bigrams.get_pair(&en(), "thank", "you").unwrap().unwrap();
    assert_eq!(pair.frequency, 200);
    assert_eq!(bigrams.pair_count(None).unwrap(), 1);
}

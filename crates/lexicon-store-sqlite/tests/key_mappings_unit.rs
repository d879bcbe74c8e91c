// crates/lexicon-store-sqlite/tests/key_mappings_unit.rs
// ============================================================================
// Module: Key Mapping Store Unit Tests
// Description: Replace-on-write mappings keyed by base key.
// Purpose: Validate mapping replacement, listing order, and clearing.
// ============================================================================

//! ## Overview
//! Each test opens a fresh plaintext store with a manual clock.

#![allow(
    clippy::panic,
    clippy::unwrap_used,
    clippy::expect_used,
    clippy::use_debug,
    reason = "Test-only assertions and helpers are permitted."
)]

use std::sync::Arc;

use lexicon_core::KeyMappingStore;
use lexicon_core::ManualClock;
use lexicon_core::NoopEventSink;
use lexicon_core::StoreError;
use lexicon_core::Timestamp;
use lexicon_store_sqlite::SqliteKeyMappingStore;
use lexicon_store_sqlite::SqliteStoreConfig;
use lexicon_store_sqlite::StoreEngine;
use lexicon_store_sqlite::StoreRuntime;
use tempfile::TempDir;

// ============================================================================
// SECTION: Helpers
// ============================================================================

fn open(temp: &TempDir) -> (SqliteKeyMappingStore, Arc<ManualClock>) {
    let clock = Arc::new(ManualClock::new(Timestamp::from_unix_millis(1)));
    let runtime = StoreRuntime::new(clock.clone(), Arc::new(NoopEventSink));
    let config = SqliteStoreConfig::for_path(temp.path().join("lexicon.db"));
    let engine = Arc::new(StoreEngine::open(config, None, runtime).unwrap());
    (SqliteKeyMappingStore::new(engine), clock)
}

// ============================================================================
// SECTION: Mappings
// ============================================================================

#[test]
fn key_mappings_replace_and_clear() {
    let temp = TempDir::new().unwrap();
    let (mappings, clock) = open(&temp);
    mappings.set("e", "é").unwrap();
    clock.advance_millis(5);
    let replaced = mappings.set("e", "ë").unwrap();
    mappings.set("a", "à").unwrap();

    assert_eq!(replaced.custom_symbol, "ë");
    assert_eq!(replaced.created_at.as_unix_millis(), 6);
    assert_eq!(mappings.get("e").unwrap().unwrap().custom_symbol, "ë");
    let keys: Vec<String> = mappings.all().unwrap().into_iter().map(|m| m.base_key).collect();
    assert_eq!(keys, vec!["a".to_string(), "e".to_string()]);

    assert!(mappings.clear("e").unwrap());
    assert!(!mappings.clear("e").unwrap());
    assert_eq!(mappings.clear_all().unwrap(), 1);
}

#[test]
fn empty_keys_and_symbols_are_rejected() {
    let temp = TempDir::new().unwrap();
    let (mappings, _clock) = open(&temp);
    let Err(err) = mappings.set("", "x") else {
        panic!("expected an empty base key to fail");
    };
    assert!(matches!(err, StoreError::Invalid(_)));
    assert!(mappings.set("x", "").is_err());
    assert!(mappings.all().unwrap().is_empty());
}

#[test]
fn missing_mapping_reads_as_none() {
    let temp = TempDir::new().unwrap();
    let (mappings, _clock) = open(&temp);
    assert!(mappings.get("q").unwrap().is_none());
    assert_eq!(mappings.clear_all().unwrap(), 0);
}

// crates/lexicon-store-sqlite/tests/clipboard_unit.rs
// ============================================================================
// Module: Clipboard Store Unit Tests
// Description: Clipboard dedupe, pinning, and unpinned eviction.
// Purpose: Validate clipboard history bounds over a real store file.
// ============================================================================

//! ## Overview
//! Each test opens a fresh plaintext store with a manual clock so eviction
//! order is deterministic.

#![allow(
    clippy::panic,
    clippy::unwrap_used,
    clippy::expect_used,
    clippy::use_debug,
    reason = "Test-only assertions and helpers are permitted."
)]

use std::sync::Arc;

use lexicon_core::ClipboardItemId;
use lexicon_core::ClipboardStore;
use lexicon_core::ManualClock;
use lexicon_core::NoopEventSink;
use lexicon_core::StoreError;
use lexicon_core::Timestamp;
use lexicon_store_sqlite::MAX_UNPINNED_CLIPBOARD_ITEMS;
use lexicon_store_sqlite::SqliteClipboardStore;
use lexicon_store_sqlite::SqliteStoreConfig;
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

// ============================================================================
// SECTION: Clipboard
// ============================================================================

#[test]
fn duplicate_content_keeps_one_item() {
    let temp = TempDir::new().unwrap();
    let (engine, clock) = open(&temp);
    let clipboard = SqliteClipboardStore::new(engine);
    let first = clipboard.add("hello").unwrap();
    clock.advance_millis(10);
    let second = clipboard.add("hello").unwrap();

    assert_eq!(first.id, second.id);
    assert_eq!(
        second.content_hash,
        "2cf24dba5fb0a30e26e83b2ac5b9e29e1b161e5c1fa7425e73043362938b9824"
    );
    assert_eq!(second.timestamp.as_unix_millis(), 11);
    assert_eq!(clipboard.recent(10).unwrap().len(), 1);
}

#[test]
fn duplicate_content_keeps_pin_state() {
    let temp = TempDir::new().unwrap();
    let (engine, clock) = open(&temp);
    let clipboard = SqliteClipboardStore::new(engine);
    let item = clipboard.add("pinned text").unwrap();
    assert!(clipboard.toggle_pin(item.id, true).unwrap());
    clock.advance_millis(1);
    let again = clipboard.add("pinned text").unwrap();
    assert!(again.is_pinned);
}

#[test]
fn unpinned_history_is_capped_oldest_first() {
    let temp = TempDir::new().unwrap();
    let (engine, clock) = open(&temp);
    let clipboard = SqliteClipboardStore::new(engine);
    let keeper = clipboard.add("keeper").unwrap();
    clipboard.toggle_pin(keeper.id, true).unwrap();
    for index in 0 ..= MAX_UNPINNED_CLIPBOARD_ITEMS {
        clock.advance_millis(1);
        clipboard.add(&format!("item {index}")).unwrap();
    }

    assert_eq!(clipboard.unpinned_count().unwrap(), 100);
    let recent = clipboard.recent(200).unwrap();
    assert!(recent.iter().all(|item| item.content != "item 0"));
    assert_eq!(recent[0].content, "item 100");
    assert_eq!(clipboard.pinned().unwrap().len(), 1);
}

#[test]
fn unpinning_reapplies_the_cap() {
    let temp = TempDir::new().unwrap();
    let (engine, clock) = open(&temp);
    let clipboard = SqliteClipboardStore::with_capacity(engine, 2);
    let old = clipboard.add("old").unwrap();
    clipboard.toggle_pin(old.id, true).unwrap();
    for content in ["a", "b"] {
        clock.advance_millis(1);
        clipboard.add(content).unwrap();
    }
    assert_eq!(clipboard.unpinned_count().unwrap(), 2);

    assert!(clipboard.toggle_pin(old.id, false).unwrap());
    assert_eq!(clipboard.unpinned_count().unwrap(), 2);
    let contents: Vec<String> =
        clipboard.recent(10).unwrap().into_iter().map(|item| item.content).collect();
    assert_eq!(contents, vec!["b".to_string(), "a".to_string()]);
}

#[test]
fn pin_delete_and_clear_report_outcomes() {
    let temp = TempDir::new().unwrap();
    let (engine, _clock) = open(&temp);
    let clipboard = SqliteClipboardStore::new(engine);
    let missing = ClipboardItemId::from_raw(404);
    assert!(!clipboard.toggle_pin(missing, true).unwrap());
    assert!(!clipboard.delete(missing).unwrap());

    let pinned = clipboard.add("pin").unwrap();
    clipboard.toggle_pin(pinned.id, true).unwrap();
    clipboard.add("loose one").unwrap();
    clipboard.add("loose two").unwrap();
    assert_eq!(clipboard.clear_all_unpinned().unwrap(), 2);
    assert_eq!(clipboard.recent(10).unwrap().len(), 1);
    assert!(clipboard.delete(pinned.id).unwrap());
    assert!(clipboard.pinned().unwrap().is_empty());
}

#[test]
fn clipboard_rejects_empty_content() {
    let temp = TempDir::new().unwrap();
    let (engine, _clock) = open(&temp);
    let clipboard = SqliteClipboardStore::new(engine);
    let Err(err) = clipboard.add("") else {
        panic!("expected empty content to fail");
    };
    assert!(matches!(err, StoreError::Invalid(_)));
}

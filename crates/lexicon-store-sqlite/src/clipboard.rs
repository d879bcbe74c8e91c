// crates/lexicon-store-sqlite/src/clipboard.rs
// ============================================================================
// Module: Clipboard Store
// Description: Recent clipboard history with dedup, pinning, and a size cap.
// Purpose: Retain copied text for quick re-insertion without unbounded growth.
// Dependencies: lexicon-core, rusqlite
// ============================================================================

//! ## Overview
//! Items are unique by the SHA-256 fingerprint of their content. Copying the
//! same text again refreshes the existing item's timestamp (moving it to the
//! top) and keeps its pin state.
//!
//! After every add and every unpin, the oldest unpinned items beyond
//! [`MAX_UNPINNED_CLIPBOARD_ITEMS`] are deleted in the same transaction.
//! Pinned items are never evicted and do not count toward the cap.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::sync::Arc;

use lexicon_core::ClipboardItem;
use lexicon_core::ClipboardItemId;
use lexicon_core::ClipboardStore;
use lexicon_core::ContentFingerprint;
use lexicon_core::StoreError;
use lexicon_core::Timestamp;
use lexicon_core::core::text::validate_clipboard_content;
use rusqlite::Connection;
use rusqlite::Row;
use rusqlite::params;

use crate::engine::StoreEngine;
use crate::error::SqliteStoreError;
use crate::error::affected;
use crate::error::counter_from_sql;
use crate::error::db_error;
use crate::error::limit_to_sql;

// ============================================================================
// SECTION: Constants
// ============================================================================

/// Maximum number of unpinned items retained.
pub const MAX_UNPINNED_CLIPBOARD_ITEMS: usize = 100;

/// Column list shared by every clipboard query.
const CLIPBOARD_COLUMNS: &str = "id, content, content_hash, timestamp, is_pinned";

// ============================================================================
// SECTION: Store
// ============================================================================

/// `SQLite`-backed clipboard history.
#[derive(Clone)]
pub struct SqliteClipboardStore {
    /// Shared engine.
    engine: Arc<StoreEngine>,
    /// Unpinned item cap.
    capacity: usize,
}

impl SqliteClipboardStore {
    /// Creates a store with the standard cap.
    #[must_use]
    pub const fn new(engine: Arc<StoreEngine>) -> Self {
        Self::with_capacity(engine, MAX_UNPINNED_CLIPBOARD_ITEMS)
    }

    /// Creates a store with a custom unpinned cap.
    #[must_use]
    pub const fn with_capacity(engine: Arc<StoreEngine>, capacity: usize) -> Self {
        Self {
            engine,
            capacity,
        }
    }

    /// Records copied content and evicts beyond the cap.
    ///
    /// # Errors
    ///
    /// Returns [`SqliteStoreError`] when validation or the write fails.
    pub fn record(&self, content: &str) -> Result<ClipboardItem, SqliteStoreError> {
        validate_clipboard_content(content)?;
        let fingerprint = ContentFingerprint::of(content);
        let now = self.engine.now();
        self.engine.with_transaction(|tx| {
            let item = tx
                .query_row(
                    &format!(
                        "INSERT INTO clipboard_items (content, content_hash, timestamp, is_pinned)
                         VALUES (?1, ?2, ?3, 0)
                         ON CONFLICT (content_hash) DO UPDATE SET timestamp = excluded.timestamp
                         RETURNING {CLIPBOARD_COLUMNS}"
                    ),
                    params![content, fingerprint.as_str(), now.as_unix_millis()],
                    map_clipboard_row,
                )
                .map_err(db_error)?;
            evict_unpinned(tx, self.capacity)?;
            Ok(item)
        })
    }

    /// Sets the pin state; unpinning re-applies the cap.
    ///
    /// # Errors
    ///
    /// Returns [`SqliteStoreError`] when the write fails.
    pub fn set_pinned(&self, id: ClipboardItemId, pinned: bool) -> Result<bool, SqliteStoreError> {
        self.engine.with_transaction(|tx| {
            let updated = tx
                .execute(
                    "UPDATE clipboard_items SET is_pinned = ?1 WHERE id = ?2",
                    params![pinned, id.get()],
                )
                .map_err(db_error)?;
            if updated == 0 {
                return Ok(false);
            }
            if !pinned {
                evict_unpinned(tx, self.capacity)?;
            }
            Ok(true)
        })
    }

    /// Deletes an item.
    ///
    /// # Errors
    ///
    /// Returns [`SqliteStoreError`] when the write fails.
    pub fn remove(&self, id: ClipboardItemId) -> Result<bool, SqliteStoreError> {
        self.engine.with_transaction(|tx| {
            let removed = tx
                .execute("DELETE FROM clipboard_items WHERE id = ?1", params![id.get()])
                .map_err(db_error)?;
            Ok(removed > 0)
        })
    }

    /// Deletes every unpinned item.
    ///
    /// # Errors
    ///
    /// Returns [`SqliteStoreError`] when the write fails.
    pub fn remove_unpinned(&self) -> Result<u64, SqliteStoreError> {
        self.engine.with_transaction(|tx| {
            let removed = tx
                .execute("DELETE FROM clipboard_items WHERE is_pinned = 0", [])
                .map_err(db_error)?;
            Ok(affected(removed))
        })
    }

    /// Returns up to `limit` items, newest first.
    ///
    /// # Errors
    ///
    /// Returns [`SqliteStoreError`] when the query fails.
    pub fn newest(&self, limit: usize) -> Result<Vec<ClipboardItem>, SqliteStoreError> {
        if limit == 0 {
            return Ok(Vec::new());
        }
        self.engine.with_connection(|connection| {
            query_items(
                connection,
                &format!(
                    "SELECT {CLIPBOARD_COLUMNS} FROM clipboard_items
                     ORDER BY timestamp DESC, id DESC LIMIT ?1"
                ),
                params![limit_to_sql(limit)],
            )
        })
    }

    /// Returns pinned items, newest first.
    ///
    /// # Errors
    ///
    /// Returns [`SqliteStoreError`] when the query fails.
    pub fn pinned_items(&self) -> Result<Vec<ClipboardItem>, SqliteStoreError> {
        self.engine.with_connection(|connection| {
            query_items(
                connection,
                &format!(
                    "SELECT {CLIPBOARD_COLUMNS} FROM clipboard_items WHERE is_pinned = 1
                     ORDER BY timestamp DESC, id DESC"
                ),
                [],
            )
        })
    }

    /// Counts unpinned items.
    ///
    /// # Errors
    ///
    /// Returns [`SqliteStoreError`] when the query fails.
    pub fn count_unpinned(&self) -> Result<u64, SqliteStoreError> {
        self.engine.with_connection(|connection| {
            let count: i64 = connection
                .query_row("SELECT COUNT(*) FROM clipboard_items WHERE is_pinned = 0", [], |row| {
                    row.get(0)
                })
                .map_err(db_error)?;
            counter_from_sql(count, "clipboard count")
        })
    }
}

impl ClipboardStore for SqliteClipboardStore {
    fn add(&self, content: &str) -> Result<ClipboardItem, StoreError> {
        self.record(content).map_err(StoreError::from)
    }

    fn toggle_pin(&self, id: ClipboardItemId, pinned: bool) -> Result<bool, StoreError> {
        self.set_pinned(id, pinned).map_err(StoreError::from)
    }

    fn delete(&self, id: ClipboardItemId) -> Result<bool, StoreError> {
        self.remove(id).map_err(StoreError::from)
    }

    fn clear_all_unpinned(&self) -> Result<u64, StoreError> {
        self.remove_unpinned().map_err(StoreError::from)
    }

    fn recent(&self, limit: usize) -> Result<Vec<ClipboardItem>, StoreError> {
        self.newest(limit).map_err(StoreError::from)
    }

    fn pinned(&self) -> Result<Vec<ClipboardItem>, StoreError> {
        self.pinned_items().map_err(StoreError::from)
    }

    fn unpinned_count(&self) -> Result<u64, StoreError> {
        self.count_unpinned().map_err(StoreError::from)
    }
}

// ============================================================================
// SECTION: Helpers
// ============================================================================

/// Deletes the oldest unpinned items beyond `capacity`.
fn evict_unpinned(connection: &Connection, capacity: usize) -> Result<u64, SqliteStoreError> {
    let removed = connection
        .execute(
            "DELETE FROM clipboard_items WHERE id IN (
                 SELECT id FROM clipboard_items WHERE is_pinned = 0
                 ORDER BY timestamp DESC, id DESC
                 LIMIT -1 OFFSET ?1
             )",
            params![limit_to_sql(capacity)],
        )
        .map_err(db_error)?;
    Ok(affected(removed))
}

/// Maps a row selected with [`CLIPBOARD_COLUMNS`].
fn map_clipboard_row(row: &Row<'_>) -> rusqlite::Result<ClipboardItem> {
    Ok(ClipboardItem {
        id: ClipboardItemId::from_raw(row.get(0)?),
        content: row.get(1)?,
        content_hash: row.get(2)?,
        timestamp: Timestamp::from_unix_millis(row.get(3)?),
        is_pinned: row.get(4)?,
    })
}

/// Runs an item query.
fn query_items(
    connection: &Connection,
    sql: &str,
    args: impl rusqlite::Params,
) -> Result<Vec<ClipboardItem>, SqliteStoreError> {
    let mut statement = connection.prepare(sql).map_err(db_error)?;
    let rows = statement.query_map(args, map_clipboard_row).map_err(db_error)?;
    rows.map(|row| row.map_err(db_error)).collect()
}

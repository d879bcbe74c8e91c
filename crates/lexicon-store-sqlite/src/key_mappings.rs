// crates/lexicon-store-sqlite/src/key_mappings.rs
// ============================================================================
// Module: Key Mapping Store
// Description: Custom symbol overrides per physical key.
// Purpose: Persist language-independent long-press or swap symbols.
// Dependencies: lexicon-core, rusqlite
// ============================================================================

//! ## Overview
//! Custom symbol overrides per physical key.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::sync::Arc;

use lexicon_core::CustomKeyMapping;
use lexicon_core::KeyMappingStore;
use lexicon_core::StoreError;
use lexicon_core::Timestamp;
use lexicon_core::core::text::validate_key_mapping_part;
use rusqlite::OptionalExtension;
use rusqlite::Row;
use rusqlite::params;

use crate::engine::StoreEngine;
use crate::error::SqliteStoreError;
use crate::error::affected;
use crate::error::db_error;

// ============================================================================
// SECTION: Store
// ============================================================================

/// `SQLite`-backed key mapping store.
#[derive(Clone)]
pub struct SqliteKeyMappingStore {
    /// Shared engine.
    engine: Arc<StoreEngine>,
}

impl SqliteKeyMappingStore {
    /// Creates a store over an open engine.
    #[must_use]
    pub const fn new(engine: Arc<StoreEngine>) -> Self {
        Self {
            engine,
        }
    }

    /// Sets or replaces a mapping.
    ///
    /// # Errors
    ///
    /// Returns [`SqliteStoreError`] when validation or the write fails.
    pub fn upsert(
        &self,
        base_key: &str,
        custom_symbol: &str,
    ) -> Result<CustomKeyMapping, SqliteStoreError> {
        validate_key_mapping_part("base_key", base_key)?;
        validate_key_mapping_part("custom_symbol", custom_symbol)?;
        let now = self.engine.now();
        self.engine.with_transaction(|tx| {
            tx.query_row(
                "INSERT INTO custom_key_mappings (base_key, custom_symbol, created_at)
                 VALUES (?1, ?2, ?3)
                 ON CONFLICT (base_key) DO UPDATE SET
                     custom_symbol = excluded.custom_symbol,
                     created_at = excluded.created_at
                 RETURNING base_key, custom_symbol, created_at",
                params![base_key, custom_symbol, now.as_unix_millis()],
                map_mapping_row,
            )
            .map_err(db_error)
        })
    }

    /// Returns the mapping for a key.
    ///
    /// # Errors
    ///
    /// Returns [`SqliteStoreError`] when the query fails.
    pub fn find(&self, base_key: &str) -> Result<Option<CustomKeyMapping>, SqliteStoreError> {
        self.engine.with_connection(|connection| {
            connection
                .query_row(
                    "SELECT base_key, custom_symbol, created_at FROM custom_key_mappings
                     WHERE base_key = ?1",
                    params![base_key],
                    map_mapping_row,
                )
                .optional()
                .map_err(db_error)
        })
    }

    /// Returns every mapping ordered by key.
    ///
    /// # Errors
    ///
    /// Returns [`SqliteStoreError`] when the query fails.
    pub fn list(&self) -> Result<Vec<CustomKeyMapping>, SqliteStoreError> {
        self.engine.with_connection(|connection| {
            let mut statement = connection
                .prepare(
                    "SELECT base_key, custom_symbol, created_at FROM custom_key_mappings
                     ORDER BY base_key",
                )
                .map_err(db_error)?;
            let rows = statement.query_map([], map_mapping_row).map_err(db_error)?;
            rows.map(|row| row.map_err(db_error)).collect()
        })
    }

    /// Removes one mapping, or every mapping.
    ///
    /// # Errors
    ///
    /// Returns [`SqliteStoreError`] when the write fails.
    pub fn remove(&self, base_key: Option<&str>) -> Result<u64, SqliteStoreError> {
        self.engine.with_transaction(|tx| {
            let removed = match base_key {
                Some(base_key) => tx.execute(
                    "DELETE FROM custom_key_mappings WHERE base_key = ?1",
                    params![base_key],
                ),
                None => tx.execute("DELETE FROM custom_key_mappings", []),
            }
            .map_err(db_error)?;
            Ok(affected(removed))
        })
    }
}

impl KeyMappingStore for SqliteKeyMappingStore {
    fn set(&self, base_key: &str, custom_symbol: &str) -> Result<CustomKeyMapping, StoreError> {
        self.upsert(base_key, custom_symbol).map_err(StoreError::from)
    }

    fn get(&self, base_key: &str) -> Result<Option<CustomKeyMapping>, StoreError> {
        self.find(base_key).map_err(StoreError::from)
    }

    fn all(&self) -> Result<Vec<CustomKeyMapping>, StoreError> {
        self.list().map_err(StoreError::from)
    }

    fn clear(&self, base_key: &str) -> Result<bool, StoreError> {
        self.remove(Some(base_key)).map(|removed| removed > 0).map_err(StoreError::from)
    }

    fn clear_all(&self) -> Result<u64, StoreError> {
        self.remove(None).map_err(StoreError::from)
    }
}

/// Maps a mapping row.
fn map_mapping_row(row: &Row<'_>) -> rusqlite::Result<CustomKeyMapping> {
    Ok(CustomKeyMapping {
        base_key: row.get(0)?,
        custom_symbol: row.get(1)?,
        created_at: Timestamp::from_unix_millis(row.get(2)?),
    })
}

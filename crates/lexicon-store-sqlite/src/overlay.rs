// crates/lexicon-store-sqlite/src/overlay.rs
// ============================================================================
// Module: Per-user Frequency Overlay
// Description: Frequency ledger kept apart from the base vocabulary.
// Purpose: Allow resetting user adaptation without losing learned words.
// Dependencies: lexicon-core, rusqlite
// ============================================================================

//! ## Overview
//! `user_word_frequencies` is seeded from `learned_words` once, by the v4->v5
//! migration. After that the two ledgers never touch each other: clearing
//! the overlay leaves the vocabulary intact and vice versa.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::sync::Arc;

use lexicon_core::FrequencyOverlay;
use lexicon_core::LanguageTag;
use lexicon_core::StoreError;
use lexicon_core::Timestamp;
use lexicon_core::UserWordFrequency;
use lexicon_core::core::text::validate_word;
use rusqlite::OptionalExtension;
use rusqlite::Row;
use rusqlite::params;

use crate::engine::StoreEngine;
use crate::error::SqliteStoreError;
use crate::error::affected;
use crate::error::counter_from_sql;
use crate::error::db_error;
use crate::error::limit_to_sql;
use crate::vocabulary::parse_language;

/// Column list shared by every overlay query.
const OVERLAY_COLUMNS: &str = "id, language_tag, word_normalized, frequency, last_used";

// ============================================================================
// SECTION: Store
// ============================================================================

/// `SQLite`-backed frequency overlay.
#[derive(Clone)]
pub struct SqliteFrequencyOverlay {
    /// Shared engine.
    engine: Arc<StoreEngine>,
}

impl SqliteFrequencyOverlay {
    /// Creates an overlay over an open engine.
    #[must_use]
    pub const fn new(engine: Arc<StoreEngine>) -> Self {
        Self {
            engine,
        }
    }

    /// Inserts with frequency 1 or increments the entry.
    ///
    /// # Errors
    ///
    /// Returns [`SqliteStoreError`] when validation or the write fails.
    pub fn bump(
        &self,
        language: &LanguageTag,
        word_normalized: &str,
    ) -> Result<UserWordFrequency, SqliteStoreError> {
        validate_word("word_normalized", word_normalized)?;
        let now = self.engine.now();
        self.engine.with_transaction(|tx| {
            let row = tx
                .query_row(
                    &format!(
                        "INSERT INTO user_word_frequencies
                             (language_tag, word_normalized, frequency, last_used)
                         VALUES (?1, ?2, 1, ?3)
                         ON CONFLICT (language_tag, word_normalized) DO UPDATE SET
                             frequency = frequency + 1,
                             last_used = excluded.last_used
                         RETURNING {OVERLAY_COLUMNS}"
                    ),
                    params![language.as_str(), word_normalized, now.as_unix_millis()],
                    map_overlay_row,
                )
                .map_err(db_error)?;
            build_entry(row)
        })
    }

    /// Looks up a single entry.
    ///
    /// # Errors
    ///
    /// Returns [`SqliteStoreError`] when the query fails.
    pub fn find(
        &self,
        language: &LanguageTag,
        word_normalized: &str,
    ) -> Result<Option<UserWordFrequency>, SqliteStoreError> {
        self.engine.with_connection(|connection| {
            connection
                .query_row(
                    &format!(
                        "SELECT {OVERLAY_COLUMNS} FROM user_word_frequencies
                         WHERE language_tag = ?1 AND word_normalized = ?2"
                    ),
                    params![language.as_str(), word_normalized],
                    map_overlay_row,
                )
                .optional()
                .map_err(db_error)?
                .map(build_entry)
                .transpose()
        })
    }

    /// Returns the most frequent entries of a language.
    ///
    /// # Errors
    ///
    /// Returns [`SqliteStoreError`] when the query fails.
    pub fn most_frequent(
        &self,
        language: &LanguageTag,
        limit: usize,
    ) -> Result<Vec<UserWordFrequency>, SqliteStoreError> {
        if limit == 0 {
            return Ok(Vec::new());
        }
        self.engine.with_connection(|connection| {
            let mut statement = connection
                .prepare(&format!(
                    "SELECT {OVERLAY_COLUMNS} FROM user_word_frequencies
                     WHERE language_tag = ?1
                     ORDER BY frequency DESC, last_used DESC, id ASC
                     LIMIT ?2"
                ))
                .map_err(db_error)?;
            let rows = statement
                .query_map(params![language.as_str(), limit_to_sql(limit)], map_overlay_row)
                .map_err(db_error)?;
            let mut entries = Vec::new();
            for row in rows {
                entries.push(build_entry(row.map_err(db_error)?)?);
            }
            Ok(entries)
        })
    }

    /// Deletes entries of one language, or every entry.
    ///
    /// # Errors
    ///
    /// Returns [`SqliteStoreError`] when the write fails.
    pub fn reset(&self, language: Option<&LanguageTag>) -> Result<u64, SqliteStoreError> {
        self.engine.with_transaction(|tx| {
            let removed = match language {
                Some(language) => tx.execute(
                    "DELETE FROM user_word_frequencies WHERE language_tag = ?1",
                    params![language.as_str()],
                ),
                None => tx.execute("DELETE FROM user_word_frequencies", []),
            }
            .map_err(db_error)?;
            Ok(affected(removed))
        })
    }
}

impl FrequencyOverlay for SqliteFrequencyOverlay {
    fn increment_frequency(
        &self,
        language: &LanguageTag,
        word_normalized: &str,
    ) -> Result<UserWordFrequency, StoreError> {
        self.bump(language, word_normalized).map_err(StoreError::from)
    }

    fn get(
        &self,
        language: &LanguageTag,
        word_normalized: &str,
    ) -> Result<Option<UserWordFrequency>, StoreError> {
        self.find(language, word_normalized).map_err(StoreError::from)
    }

    fn top(
        &self,
        language: &LanguageTag,
        limit: usize,
    ) -> Result<Vec<UserWordFrequency>, StoreError> {
        self.most_frequent(language, limit).map_err(StoreError::from)
    }

    fn clear_language(&self, language: &LanguageTag) -> Result<u64, StoreError> {
        self.reset(Some(language)).map_err(StoreError::from)
    }

    fn clear_all(&self) -> Result<u64, StoreError> {
        self.reset(None).map_err(StoreError::from)
    }
}

// ============================================================================
// SECTION: Helpers
// ============================================================================

/// Raw `user_word_frequencies` row.
struct OverlayRow {
    /// Row id.
    id: i64,
    /// Stored language tag.
    language_tag: String,
    /// Stored lookup form.
    word_normalized: String,
    /// Stored frequency.
    frequency: i64,
    /// Stored recency (unix ms).
    last_used: i64,
}

/// Maps a row selected with [`OVERLAY_COLUMNS`].
fn map_overlay_row(row: &Row<'_>) -> rusqlite::Result<OverlayRow> {
    Ok(OverlayRow {
        id: row.get(0)?,
        language_tag: row.get(1)?,
        word_normalized: row.get(2)?,
        frequency: row.get(3)?,
        last_used: row.get(4)?,
    })
}

/// Validates and converts a raw row.
fn build_entry(row: OverlayRow) -> Result<UserWordFrequency, SqliteStoreError> {
    Ok(UserWordFrequency {
        id: row.id,
        language: parse_language(row.language_tag)?,
        word_normalized: row.word_normalized,
        frequency: counter_from_sql(row.frequency, "frequency")?,
        last_used: Timestamp::from_unix_millis(row.last_used),
    })
}

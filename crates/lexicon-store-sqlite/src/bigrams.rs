// crates/lexicon-store-sqlite/src/bigrams.rs
// ============================================================================
// Module: Co-occurrence Store
// Description: Per-language word-pair counters.
// Purpose: Feed next-word prediction from observed word sequences.
// Dependencies: lexicon-core, rusqlite
// ============================================================================

//! ## Overview
//! Pairs are keyed by `(language_tag, word_a, word_b)` and counted with a
//! single upsert. There is no age-based cleanup; pairs leave the store only
//! through language or full clears.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::sync::Arc;

use lexicon_core::CooccurrenceStore;
use lexicon_core::LanguageTag;
use lexicon_core::StoreError;
use lexicon_core::Timestamp;
use lexicon_core::UserWordBigram;
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

// ============================================================================
// SECTION: Constants
// ============================================================================

/// Column list shared by every pair query.
const BIGRAM_COLUMNS: &str = "id, language_tag, word_a, word_b, frequency, last_used";

// ============================================================================
// SECTION: Store
// ============================================================================

/// `SQLite`-backed co-occurrence store.
#[derive(Clone)]
pub struct SqliteCooccurrenceStore {
    /// Shared engine.
    engine: Arc<StoreEngine>,
}

impl SqliteCooccurrenceStore {
    /// Creates a store over an open engine.
    #[must_use]
    pub const fn new(engine: Arc<StoreEngine>) -> Self {
        Self {
            engine,
        }
    }

    /// Counts one occurrence of `word_b` after `word_a`.
    ///
    /// # Errors
    ///
    /// Returns [`SqliteStoreError`] when validation or the write fails.
    pub fn record_pair(
        &self,
        language: &LanguageTag,
        word_a: &str,
        word_b: &str,
    ) -> Result<UserWordBigram, SqliteStoreError> {
        validate_word("word_a", word_a)?;
        validate_word("word_b", word_b)?;
        let now = self.engine.now();
        self.engine.with_transaction(|tx| {
            let row = tx
                .query_row(
                    &format!(
                        "INSERT INTO user_word_bigrams
                             (language_tag, word_a, word_b, frequency, last_used)
                         VALUES (?1, ?2, ?3, 1, ?4)
                         ON CONFLICT (language_tag, word_a, word_b) DO UPDATE SET
                             frequency = frequency + 1,
                             last_used = excluded.last_used
                         RETURNING {BIGRAM_COLUMNS}"
                    ),
                    params![language.as_str(), word_a, word_b, now.as_unix_millis()],
                    map_bigram_row,
                )
                .map_err(db_error)?;
            build_bigram(row)
        })
    }

    /// Returns the most frequent followers of `word_a`.
    ///
    /// # Errors
    ///
    /// Returns [`SqliteStoreError`] when the query fails.
    pub fn followers(
        &self,
        language: &LanguageTag,
        word_a: &str,
        limit: usize,
    ) -> Result<Vec<String>, SqliteStoreError> {
        if limit == 0 {
            return Ok(Vec::new());
        }
        self.engine.with_connection(|connection| {
            let mut statement = connection
                .prepare(
                    "SELECT word_b FROM user_word_bigrams
                     WHERE language_tag = ?1 AND word_a = ?2
                     ORDER BY frequency DESC, last_used DESC, id ASC
                     LIMIT ?3",
                )
                .map_err(db_error)?;
            let rows = statement
                .query_map(params![language.as_str(), word_a, limit_to_sql(limit)], |row| {
                    row.get::<_, String>(0)
                })
                .map_err(db_error)?;
            rows.map(|row| row.map_err(db_error)).collect()
        })
    }

    /// Looks up a single pair.
    ///
    /// # Errors
    ///
    /// Returns [`SqliteStoreError`] when the query fails.
    pub fn find_pair(
        &self,
        language: &LanguageTag,
        word_a: &str,
        word_b: &str,
    ) -> Result<Option<UserWordBigram>, SqliteStoreError> {
        self.engine.with_connection(|connection| {
            connection
                .query_row(
                    &format!(
                        "SELECT {BIGRAM_COLUMNS} FROM user_word_bigrams
                         WHERE language_tag = ?1 AND word_a = ?2 AND word_b = ?3"
                    ),
                    params![language.as_str(), word_a, word_b],
                    map_bigram_row,
                )
                .optional()
                .map_err(db_error)?
                .map(build_bigram)
                .transpose()
        })
    }

    /// Counts pairs, optionally for one language.
    ///
    /// # Errors
    ///
    /// Returns [`SqliteStoreError`] when the query fails.
    pub fn count_pairs(&self, language: Option<&LanguageTag>) -> Result<u64, SqliteStoreError> {
        self.engine.with_connection(|connection| {
            let count: i64 = match language {
                Some(language) => connection.query_row(
                    "SELECT COUNT(*) FROM user_word_bigrams WHERE language_tag = ?1",
                    params![language.as_str()],
                    |row| row.get(0),
                ),
                None => connection.query_row(
                    "SELECT COUNT(*) FROM user_word_bigrams",
                    [],
                    |row| row.get(0),
                ),
            }
            .map_err(db_error)?;
            counter_from_sql(count, "pair count")
        })
    }

    /// Deletes pairs of one language, or all pairs.
    ///
    /// # Errors
    ///
    /// Returns [`SqliteStoreError`] when the write fails.
    pub fn remove_pairs(&self, language: Option<&LanguageTag>) -> Result<u64, SqliteStoreError> {
        self.engine.with_transaction(|tx| {
            let removed = match language {
                Some(language) => tx.execute(
                    "DELETE FROM user_word_bigrams WHERE language_tag = ?1",
                    params![language.as_str()],
                ),
                None => tx.execute("DELETE FROM user_word_bigrams", []),
            }
            .map_err(db_error)?;
            Ok(affected(removed))
        })
    }
}

impl CooccurrenceStore for SqliteCooccurrenceStore {
    fn observe_pair(
        &self,
        language: &LanguageTag,
        word_a: &str,
        word_b: &str,
    ) -> Result<UserWordBigram, StoreError> {
        self.record_pair(language, word_a, word_b).map_err(StoreError::from)
    }

    fn predict(
        &self,
        language: &LanguageTag,
        word_a: &str,
        limit: usize,
    ) -> Result<Vec<String>, StoreError> {
        self.followers(language, word_a, limit).map_err(StoreError::from)
    }

    fn get_pair(
        &self,
        language: &LanguageTag,
        word_a: &str,
        word_b: &str,
    ) -> Result<Option<UserWordBigram>, StoreError> {
        self.find_pair(language, word_a, word_b).map_err(StoreError::from)
    }

    fn pair_count(&self, language: Option<&LanguageTag>) -> Result<u64, StoreError> {
        self.count_pairs(language).map_err(StoreError::from)
    }

    fn clear_language(&self, language: &LanguageTag) -> Result<u64, StoreError> {
        self.remove_pairs(Some(language)).map_err(StoreError::from)
    }

    fn clear_all(&self) -> Result<u64, StoreError> {
        self.remove_pairs(None).map_err(StoreError::from)
    }
}

// ============================================================================
// SECTION: Helpers
// ============================================================================

/// Raw `user_word_bigrams` row.
struct BigramRow {
    /// Row id.
    id: i64,
    /// Stored language tag.
    language_tag: String,
    /// Preceding word.
    word_a: String,
    /// Following word.
    word_b: String,
    /// Stored frequency.
    frequency: i64,
    /// Stored recency (unix ms).
    last_used: i64,
}

/// Maps a row selected with [`BIGRAM_COLUMNS`].
fn map_bigram_row(row: &Row<'_>) -> rusqlite::Result<BigramRow> {
    Ok(BigramRow {
        id: row.get(0)?,
        language_tag: row.get(1)?,
        word_a: row.get(2)?,
        word_b: row.get(3)?,
        frequency: row.get(4)?,
        last_used: row.get(5)?,
    })
}

/// Validates and converts a raw row.
fn build_bigram(row: BigramRow) -> Result<UserWordBigram, SqliteStoreError> {
    Ok(UserWordBigram {
        id: row.id,
        language: parse_language(row.language_tag)?,
        word_a: row.word_a,
        word_b: row.word_b,
        frequency: counter_from_sql(row.frequency, "frequency")?,
        last_used: Timestamp::from_unix_millis(row.last_used),
    })
}

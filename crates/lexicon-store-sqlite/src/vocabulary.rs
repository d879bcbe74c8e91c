// crates/lexicon-store-sqlite/src/vocabulary.rs
// ============================================================================
// Module: Vocabulary Store
// Description: Learned words, their full-text mirror, merge and cleanup rules.
// Purpose: Persist typed vocabulary and serve prefix and fuzzy lookups.
// Dependencies: lexicon-core, rusqlite
// ============================================================================

//! ## Overview
//! Each learned word is one `learned_words` row plus one `learned_words_fts`
//! entry sharing its row id. The private [`WordIndexWriter`] is the only code
//! that writes either table, and it is only reachable inside an engine
//! transaction, so the two representations commit or roll back together.
//!
//! Frequency updates are single `INSERT .. ON CONFLICT DO UPDATE` statements:
//! concurrent `learn` calls for the same word never lose an increment.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::sync::Arc;

use lexicon_core::InputError;
use lexicon_core::LanguageTag;
use lexicon_core::LearnedWord;
use lexicon_core::SourceCount;
use lexicon_core::StoreError;
use lexicon_core::Timestamp;
use lexicon_core::VocabularyStore;
use lexicon_core::WordId;
use lexicon_core::WordImport;
use lexicon_core::WordSource;
use lexicon_core::core::text::validate_word;
use rusqlite::Connection;
use rusqlite::OptionalExtension;
use rusqlite::Row;
use rusqlite::ToSql;
use rusqlite::Transaction;
use rusqlite::params;

use crate::engine::StoreEngine;
use crate::error::SqliteStoreError;
use crate::error::affected;
use crate::error::counter_from_sql;
use crate::error::counter_to_sql;
use crate::error::db_error;
use crate::error::limit_to_sql;

// ============================================================================
// SECTION: Constants
// ============================================================================

/// Default minimum frequency for prefix suggestions; filters one-off typos.
pub const DEFAULT_SUGGESTION_MIN_FREQUENCY: u64 = 2;

/// Column list shared by every word query.
const WORD_COLUMNS: &str =
    "id, language_tag, word_normalized, word_display, frequency, last_used, source";

// ============================================================================
// SECTION: Store
// ============================================================================

/// `SQLite`-backed vocabulary store.
#[derive(Clone)]
pub struct SqliteVocabularyStore {
    /// Shared engine.
    engine: Arc<StoreEngine>,
}

impl SqliteVocabularyStore {
    /// Creates a store over an open engine.
    #[must_use]
    pub const fn new(engine: Arc<StoreEngine>) -> Self {
        Self {
            engine,
        }
    }

    /// Records one use of a word and returns the resulting row.
    ///
    /// # Errors
    ///
    /// Returns [`SqliteStoreError`] when validation or the write fails.
    pub fn learn_word(
        &self,
        language: &LanguageTag,
        word_normalized: &str,
        word_display: &str,
        source: WordSource,
    ) -> Result<LearnedWord, SqliteStoreError> {
        validate_word("word_normalized", word_normalized)?;
        validate_word("word_display", word_display)?;
        let now = self.engine.now();
        self.engine.with_transaction(|tx| {
            WordIndexWriter::new(tx).learn(language, word_normalized, word_display, source, now)
        })
    }

    /// Merges one imported word.
    ///
    /// # Errors
    ///
    /// Returns [`SqliteStoreError`] when validation or the write fails.
    pub fn merge_word(&self, word: &WordImport) -> Result<LearnedWord, SqliteStoreError> {
        validate_import(word)?;
        self.engine.with_transaction(|tx| WordIndexWriter::new(tx).merge(word))
    }

    /// Merges a batch of imported words atomically.
    ///
    /// # Errors
    ///
    /// Returns [`SqliteStoreError`] when any record is invalid or a write
    /// fails; nothing is applied in that case.
    pub fn merge_batch(&self, words: &[WordImport]) -> Result<usize, SqliteStoreError> {
        if words.is_empty() {
            return Ok(0);
        }
        for word in words {
            validate_import(word)?;
        }
        self.engine.with_transaction(|tx| {
            let writer = WordIndexWriter::new(tx);
            for word in words {
                writer.merge(word)?;
            }
            Ok(words.len())
        })
    }

    /// Returns frequent words starting with `prefix`.
    ///
    /// # Errors
    ///
    /// Returns [`SqliteStoreError`] when the query fails.
    pub fn prefix_matches(
        &self,
        language: &LanguageTag,
        prefix: &str,
        limit: usize,
        min_frequency: u64,
    ) -> Result<Vec<LearnedWord>, SqliteStoreError> {
        if prefix.is_empty() || limit == 0 {
            return Ok(Vec::new());
        }
        let min_frequency = i64::try_from(min_frequency).unwrap_or(i64::MAX);
        self.engine.with_connection(|connection| {
            query_words(
                connection,
                &format!(
                    "SELECT {WORD_COLUMNS} FROM learned_words
                     WHERE language_tag = ?1
                       AND substr(word_normalized, 1, length(?2)) = ?2
                       AND frequency >= ?3
                     ORDER BY frequency DESC, last_used DESC, id ASC
                     LIMIT ?4"
                ),
                params![language.as_str(), prefix, min_frequency, limit_to_sql(limit)],
            )
        })
    }

    /// Runs a full-text lookup against the search mirror.
    ///
    /// # Errors
    ///
    /// Returns [`SqliteStoreError`] when the query fails.
    pub fn full_text_matches(
        &self,
        language: &LanguageTag,
        query: &str,
        limit: usize,
    ) -> Result<Vec<LearnedWord>, SqliteStoreError> {
        let Some(match_expression) = fts_match_expression(query) else {
            return Ok(Vec::new());
        };
        if limit == 0 {
            return Ok(Vec::new());
        }
        self.engine.with_connection(|connection| {
            query_words(
                connection,
                "SELECT w.id, w.language_tag, w.word_normalized, w.word_display, w.frequency,
                        w.last_used, w.source
                 FROM learned_words_fts
                 JOIN learned_words w ON w.id = learned_words_fts.rowid
                 WHERE learned_words_fts MATCH ?1 AND w.language_tag = ?2
                 ORDER BY w.frequency DESC, w.last_used DESC, w.id ASC
                 LIMIT ?3",
                params![match_expression, language.as_str(), limit_to_sql(limit)],
            )
        })
    }

    /// Looks up a single word.
    ///
    /// # Errors
    ///
    /// Returns [`SqliteStoreError`] when the query fails.
    pub fn find_word(
        &self,
        language: &LanguageTag,
        word_normalized: &str,
    ) -> Result<Option<LearnedWord>, SqliteStoreError> {
        self.engine.with_connection(|connection| {
            connection
                .query_row(
                    &format!(
                        "SELECT {WORD_COLUMNS} FROM learned_words
                         WHERE language_tag = ?1 AND word_normalized = ?2"
                    ),
                    params![language.as_str(), word_normalized],
                    map_word_row,
                )
                .optional()
                .map_err(db_error)?
                .map(build_learned_word)
                .transpose()
        })
    }

    /// Deletes a word and its mirror entry.
    ///
    /// # Errors
    ///
    /// Returns [`SqliteStoreError`] when the write fails.
    pub fn remove_word(
        &self,
        language: &LanguageTag,
        word_normalized: &str,
    ) -> Result<bool, SqliteStoreError> {
        self.engine.with_transaction(|tx| {
            WordIndexWriter::new(tx)
                .delete_where(
                    "language_tag = ?1 AND word_normalized = ?2",
                    &[&language.as_str(), &word_normalized],
                )
                .map(|count| count > 0)
        })
    }

    /// Deletes every word of a language.
    ///
    /// # Errors
    ///
    /// Returns [`SqliteStoreError`] when the write fails.
    pub fn remove_language(&self, language: &LanguageTag) -> Result<u64, SqliteStoreError> {
        self.engine.with_transaction(|tx| {
            WordIndexWriter::new(tx).delete_where("language_tag = ?1", &[&language.as_str()])
        })
    }

    /// Deletes every word.
    ///
    /// # Errors
    ///
    /// Returns [`SqliteStoreError`] when the write fails.
    pub fn remove_all(&self) -> Result<u64, SqliteStoreError> {
        self.engine.with_transaction(|tx| WordIndexWriter::new(tx).delete_where("1 = 1", &[]))
    }

    /// Removes single-use words last used before `cutoff`.
    ///
    /// # Errors
    ///
    /// Returns [`SqliteStoreError`] when the write fails.
    pub fn remove_stale(&self, cutoff: Timestamp) -> Result<u64, SqliteStoreError> {
        let cutoff = cutoff.as_unix_millis();
        self.engine.with_transaction(|tx| {
            WordIndexWriter::new(tx).delete_where("frequency = 1 AND last_used < ?1", &[&cutoff])
        })
    }

    /// Returns every word of a language, most frequent first.
    ///
    /// # Errors
    ///
    /// Returns [`SqliteStoreError`] when the query fails.
    pub fn words_for_language(
        &self,
        language: &LanguageTag,
    ) -> Result<Vec<LearnedWord>, SqliteStoreError> {
        self.engine.with_connection(|connection| {
            query_words(
                connection,
                &format!(
                    "SELECT {WORD_COLUMNS} FROM learned_words WHERE language_tag = ?1
                     ORDER BY frequency DESC, last_used DESC, id ASC"
                ),
                params![language.as_str()],
            )
        })
    }

    /// Counts words, optionally for one language.
    ///
    /// # Errors
    ///
    /// Returns [`SqliteStoreError`] when the query fails.
    pub fn count_words(&self, language: Option<&LanguageTag>) -> Result<u64, SqliteStoreError> {
        self.engine.with_connection(|connection| {
            let count: i64 = match language {
                Some(language) => connection.query_row(
                    "SELECT COUNT(*) FROM learned_words WHERE language_tag = ?1",
                    params![language.as_str()],
                    |row| row.get(0),
                ),
                None => {
                    connection.query_row("SELECT COUNT(*) FROM learned_words", [], |row| row.get(0))
                }
            }
            .map_err(db_error)?;
            counter_from_sql(count, "word count")
        })
    }

    /// Average frequency, `0.0` when no words match.
    ///
    /// # Errors
    ///
    /// Returns [`SqliteStoreError`] when the query fails.
    pub fn mean_frequency(&self, language: Option<&LanguageTag>) -> Result<f64, SqliteStoreError> {
        self.engine.with_connection(|connection| {
            let average: Option<f64> = match language {
                Some(language) => connection.query_row(
                    "SELECT AVG(frequency) FROM learned_words WHERE language_tag = ?1",
                    params![language.as_str()],
                    |row| row.get(0),
                ),
                None => connection.query_row(
                    "SELECT AVG(frequency) FROM learned_words",
                    [],
                    |row| row.get(0),
                ),
            }
            .map_err(db_error)?;
            Ok(average.unwrap_or(0.0))
        })
    }

    /// Word counts per source, ordered by source label.
    ///
    /// # Errors
    ///
    /// Returns [`SqliteStoreError`] when the query fails or a stored label is
    /// unknown.
    pub fn source_counts(&self) -> Result<Vec<SourceCount>, SqliteStoreError> {
        self.engine.with_connection(|connection| {
            let mut statement = connection
                .prepare(
                    "SELECT source, COUNT(*) FROM learned_words GROUP BY source ORDER BY source",
                )
                .map_err(db_error)?;
            let rows = statement
                .query_map([], |row| Ok((row.get::<_, String>(0)?, row.get::<_, i64>(1)?)))
                .map_err(db_error)?;
            let mut counts = Vec::new();
            for row in rows {
                let (label, count) = row.map_err(db_error)?;
                counts.push(SourceCount {
                    source: parse_source(&label)?,
                    count: counter_from_sql(count, "source count")?,
                });
            }
            Ok(counts)
        })
    }
}

impl VocabularyStore for SqliteVocabularyStore {
    fn learn(
        &self,
        language: &LanguageTag,
        word_normalized: &str,
        word_display: &str,
        source: WordSource,
    ) -> Result<LearnedWord, StoreError> {
        self.learn_word(language, word_normalized, word_display, source).map_err(StoreError::from)
    }

    fn import_with_merge(&self, word: &WordImport) -> Result<LearnedWord, StoreError> {
        self.merge_word(word).map_err(StoreError::from)
    }

    fn import_batch(&self, words: &[WordImport]) -> Result<usize, StoreError> {
        self.merge_batch(words).map_err(StoreError::from)
    }

    fn suggest_prefix(
        &self,
        language: &LanguageTag,
        prefix: &str,
        limit: usize,
        min_frequency: u64,
    ) -> Result<Vec<LearnedWord>, StoreError> {
        self.prefix_matches(language, prefix, limit, min_frequency).map_err(StoreError::from)
    }

    fn search_fuzzy(
        &self,
        language: &LanguageTag,
        query: &str,
        limit: usize,
    ) -> Result<Vec<LearnedWord>, StoreError> {
        self.full_text_matches(language, query, limit).map_err(StoreError::from)
    }

    fn get_word(
        &self,
        language: &LanguageTag,
        word_normalized: &str,
    ) -> Result<Option<LearnedWord>, StoreError> {
        self.find_word(language, word_normalized).map_err(StoreError::from)
    }

    fn delete_word(
        &self,
        language: &LanguageTag,
        word_normalized: &str,
    ) -> Result<bool, StoreError> {
        self.remove_word(language, word_normalized).map_err(StoreError::from)
    }

    fn clear_language(&self, language: &LanguageTag) -> Result<u64, StoreError> {
        self.remove_language(language).map_err(StoreError::from)
    }

    fn clear_all(&self) -> Result<u64, StoreError> {
        self.remove_all().map_err(StoreError::from)
    }

    fn cleanup(&self, cutoff: Timestamp) -> Result<u64, StoreError> {
        self.remove_stale(cutoff).map_err(StoreError::from)
    }

    fn export_language(&self, language: &LanguageTag) -> Result<Vec<LearnedWord>, StoreError> {
        self.words_for_language(language).map_err(StoreError::from)
    }

    fn word_count(&self) -> Result<u64, StoreError> {
        self.count_words(None).map_err(StoreError::from)
    }

    fn word_count_by_language(&self, language: &LanguageTag) -> Result<u64, StoreError> {
        self.count_words(Some(language)).map_err(StoreError::from)
    }

    fn average_frequency(&self, language: Option<&LanguageTag>) -> Result<f64, StoreError> {
        self.mean_frequency(language).map_err(StoreError::from)
    }

    fn count_by_source(&self) -> Result<Vec<SourceCount>, StoreError> {
        self.source_counts().map_err(StoreError::from)
    }
}

// ============================================================================
// SECTION: Unit of Work
// ============================================================================

/// Writes words and their search mirror inside one transaction.
///
/// # Invariants
/// - Every row id in `learned_words` has exactly one mirror entry after each
///   method returns.
struct WordIndexWriter<'tx, 'conn> {
    /// Open engine transaction.
    tx: &'tx Transaction<'conn>,
}

impl<'tx, 'conn> WordIndexWriter<'tx, 'conn> {
    /// Wraps an open transaction.
    const fn new(tx: &'tx Transaction<'conn>) -> Self {
        Self {
            tx,
        }
    }

    /// Inserts with frequency 1 or increments, refreshing recency.
    fn learn(
        &self,
        language: &LanguageTag,
        word_normalized: &str,
        word_display: &str,
        source: WordSource,
        now: Timestamp,
    ) -> Result<LearnedWord, SqliteStoreError> {
        let row = self
            .tx
            .query_row(
                &format!(
                    "INSERT INTO learned_words
                         (language_tag, word_normalized, word_display, frequency, last_used, source)
                     VALUES (?1, ?2, ?3, 1, ?4, ?5)
                     ON CONFLICT (language_tag, word_normalized) DO UPDATE SET
                         frequency = frequency + 1,
                         last_used = excluded.last_used,
                         word_display = excluded.word_display,
                         source = excluded.source
                     RETURNING {WORD_COLUMNS}"
                ),
                params![
                    language.as_str(),
                    word_normalized,
                    word_display,
                    now.as_unix_millis(),
                    source.as_str()
                ],
                map_word_row,
            )
            .map_err(db_error)?;
        self.mirror(&row)?;
        build_learned_word(row)
    }

    /// Inserts or sums frequencies, keeping the later `last_used`.
    fn merge(&self, word: &WordImport) -> Result<LearnedWord, SqliteStoreError> {
        let frequency = counter_to_sql(word.frequency, "frequency")?;
        let row = self
            .tx
            .query_row(
                &format!(
                    "INSERT INTO learned_words
                         (language_tag, word_normalized, word_display, frequency, last_used, source)
                     VALUES (?1, ?2, ?3, ?4, ?5, ?6)
                     ON CONFLICT (language_tag, word_normalized) DO UPDATE SET
                         frequency = frequency + excluded.frequency,
                         last_used = max(last_used, excluded.last_used)
                     RETURNING {WORD_COLUMNS}"
                ),
                params![
                    word.language.as_str(),
                    word.word_normalized,
                    word.word_display,
                    frequency,
                    word.last_used.as_unix_millis(),
                    word.source.as_str()
                ],
                map_word_row,
            )
            .map_err(db_error)?;
        self.mirror(&row)?;
        build_learned_word(row)
    }

    /// Deletes matching words and their mirror entries.
    fn delete_where(&self, filter: &str, args: &[&dyn ToSql]) -> Result<u64, SqliteStoreError> {
        self.tx
            .execute(
                &format!(
                    "DELETE FROM learned_words_fts WHERE rowid IN
                         (SELECT id FROM learned_words WHERE {filter})"
                ),
                args,
            )
            .map_err(db_error)?;
        let removed = self
            .tx
            .execute(&format!("DELETE FROM learned_words WHERE {filter}"), args)
            .map_err(db_error)?;
        Ok(affected(removed))
    }

    /// Replaces the mirror entry for a word row.
    fn mirror(&self, row: &WordRow) -> Result<(), SqliteStoreError> {
        self.tx
            .execute("DELETE FROM learned_words_fts WHERE rowid = ?1", params![row.id])
            .map_err(db_error)?;
        self.tx
            .execute(
                "INSERT INTO learned_words_fts (rowid, word_normalized, word_display)
                 VALUES (?1, ?2, ?3)",
                params![row.id, row.word_normalized, row.word_display],
            )
            .map_err(db_error)?;
        Ok(())
    }
}

// ============================================================================
// SECTION: Helpers
// ============================================================================

/// Raw `learned_words` row.
struct WordRow {
    /// Row id.
    id: i64,
    /// Stored language tag.
    language_tag: String,
    /// Stored lookup form.
    word_normalized: String,
    /// Stored display form.
    word_display: String,
    /// Stored frequency.
    frequency: i64,
    /// Stored recency (unix ms).
    last_used: i64,
    /// Stored source label.
    source: String,
}

/// Maps a row selected with [`WORD_COLUMNS`].
fn map_word_row(row: &Row<'_>) -> rusqlite::Result<WordRow> {
    Ok(WordRow {
        id: row.get(0)?,
        language_tag: row.get(1)?,
        word_normalized: row.get(2)?,
        word_display: row.get(3)?,
        frequency: row.get(4)?,
        last_used: row.get(5)?,
        source: row.get(6)?,
    })
}

/// Validates and converts a raw row.
fn build_learned_word(row: WordRow) -> Result<LearnedWord, SqliteStoreError> {
    Ok(LearnedWord {
        id: WordId::from_raw(row.id),
        language: parse_language(row.language_tag)?,
        word_normalized: row.word_normalized,
        word_display: row.word_display,
        frequency: counter_from_sql(row.frequency, "frequency")?,
        last_used: Timestamp::from_unix_millis(row.last_used),
        source: parse_source(&row.source)?,
    })
}

/// Runs a word query and converts every row.
fn query_words(
    connection: &Connection,
    sql: &str,
    args: impl rusqlite::Params,
) -> Result<Vec<LearnedWord>, SqliteStoreError> {
    let mut statement = connection.prepare(sql).map_err(db_error)?;
    let rows = statement.query_map(args, map_word_row).map_err(db_error)?;
    let mut words = Vec::new();
    for row in rows {
        words.push(build_learned_word(row.map_err(db_error)?)?);
    }
    Ok(words)
}

/// Parses a stored language tag.
pub(crate) fn parse_language(raw: String) -> Result<LanguageTag, SqliteStoreError> {
    LanguageTag::new(raw)
        .map_err(|_| SqliteStoreError::Corrupt("invalid stored language tag".to_string()))
}

/// Parses a stored source label.
fn parse_source(label: &str) -> Result<WordSource, SqliteStoreError> {
    label.parse().map_err(|_| SqliteStoreError::Corrupt("unknown stored word source".to_string()))
}

/// Validates an imported record.
fn validate_import(word: &WordImport) -> Result<(), SqliteStoreError> {
    validate_word("word_normalized", &word.word_normalized)?;
    validate_word("word_display", &word.word_display)?;
    if word.frequency == 0 {
        return Err(InputError::OutOfRange("frequency").into());
    }
    Ok(())
}

/// Builds an FTS5 expression from free text.
///
/// Every alphanumeric run becomes a quoted prefix term, so user input can
/// never inject FTS operators. Terms are implicitly AND-ed.
fn fts_match_expression(query: &str) -> Option<String> {
    let terms: Vec<String> = query
        .split(|ch: char| !ch.is_alphanumeric())
        .filter(|term| !term.is_empty())
        .map(|term| format!("\"{}\"*", term.to_lowercase()))
        .collect();
    if terms.is_empty() { None } else { Some(terms.join(" ")) }
}

// ============================================================================
// SECTION: Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::fts_match_expression;

    #[test]
    fn fts_expression_quotes_every_term() {
        assert_eq!(fts_match_expression("Hel wor").as_deref(), Some("\"hel\"* \"wor\"*"));
        assert_eq!(
            fts_match_expression("a\" OR b NEAR(").as_deref(),
            Some("\"a\"* \"or\"* \"b\"* \"near\"*")
        );
    }

    #[test]
    fn fts_expression_rejects_punctuation_only_input() {
        assert_eq!(fts_match_expression(" *\"() "), None);
        assert_eq!(fts_match_expression(""), None);
    }
}

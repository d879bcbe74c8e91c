// crates/lexicon-store-sqlite/src/migrations.rs
// ============================================================================
// Module: Schema Migrator
// Description: Ordered, versioned schema chain for the lexicon store.
// Purpose: Evolve stores written by older releases without partial upgrades.
// Dependencies: lexicon-core, rusqlite
// ============================================================================

//! ## Overview
//! The store version lives in a single-row `store_meta` table. New files are
//! created at the v1 baseline and then walked through every step, so a fresh
//! store and an upgraded one end with identical schemas.
//!
//! Each step runs in its own `IMMEDIATE` transaction together with the version
//! bump. A failing step rolls back and leaves the file at the prior version.
//! Every statement checks for existing structures first, so re-running a step
//! against a partially hand-modified file is safe.

// ============================================================================
// SECTION: Imports
// ============================================================================

use lexicon_core::Component;
use lexicon_core::Severity;
use lexicon_core::StoreEventSink;
use lexicon_core::emit;
use rusqlite::Connection;
use rusqlite::OptionalExtension;
use rusqlite::Transaction;
use rusqlite::TransactionBehavior;
use rusqlite::params;

use crate::error::SqliteStoreError;
use crate::error::db_error;

// ============================================================================
// SECTION: Constants
// ============================================================================

/// Current schema version.
pub const SCHEMA_VERSION: i64 = 6;
/// Version new files are created at before the chain runs.
pub const BASELINE_VERSION: i64 = 1;

/// v1 baseline: words with a non-unique lookup index, their search mirror,
/// and clipboard history.
const BASELINE_SQL: &str = "
    CREATE TABLE IF NOT EXISTS learned_words (
        id INTEGER PRIMARY KEY AUTOINCREMENT,
        language_tag TEXT NOT NULL,
        word_normalized TEXT NOT NULL,
        word_display TEXT NOT NULL,
        frequency INTEGER NOT NULL DEFAULT 1 CHECK (frequency >= 1),
        last_used INTEGER NOT NULL,
        source TEXT NOT NULL
    );
    CREATE INDEX IF NOT EXISTS idx_learned_words_lookup
        ON learned_words (language_tag, word_normalized);
    CREATE VIRTUAL TABLE IF NOT EXISTS learned_words_fts USING fts5(
        word_normalized,
        word_display,
        tokenize = 'unicode61 remove_diacritics 2'
    );
    CREATE TABLE IF NOT EXISTS clipboard_items (
        id INTEGER PRIMARY KEY AUTOINCREMENT,
        content TEXT NOT NULL,
        content_hash TEXT NOT NULL UNIQUE,
        timestamp INTEGER NOT NULL,
        is_pinned INTEGER NOT NULL DEFAULT 0
    );";

// ============================================================================
// SECTION: Chain
// ============================================================================

/// Signature of a single schema step.
type StepFn = fn(&Transaction<'_>) -> Result<(), SqliteStoreError>;

/// One version-to-version transformation.
struct Migration {
    /// Version the step upgrades from; it produces `from + 1`.
    from: i64,
    /// Stable step name used in events.
    name: &'static str,
    /// Step body, executed inside the step transaction.
    apply: StepFn,
}

/// The ordered chain. Steps are contiguous from [`BASELINE_VERSION`] to
/// [`SCHEMA_VERSION`].
const MIGRATIONS: [Migration; 5] = [
    Migration {
        from: 1,
        name: "dedupe_learned_words",
        apply: dedupe_learned_words,
    },
    Migration {
        from: 2,
        name: "clipboard_pin_index",
        apply: clipboard_pin_index,
    },
    Migration {
        from: 3,
        name: "custom_key_mappings",
        apply: custom_key_mappings,
    },
    Migration {
        from: 4,
        name: "user_word_frequencies",
        apply: user_word_frequencies,
    },
    Migration {
        from: 5,
        name: "user_word_bigrams",
        apply: user_word_bigrams,
    },
];

/// Brings the store to [`SCHEMA_VERSION`] and returns the final version.
///
/// # Errors
///
/// Returns [`SqliteStoreError::VersionMismatch`] when the file was written by
/// a newer release, or the error of the first failing step.
pub fn migrate(
    connection: &mut Connection,
    events: &dyn StoreEventSink,
) -> Result<i64, SqliteStoreError> {
    migrate_to(connection, SCHEMA_VERSION, events)
}

/// Brings the store to `target` and returns the resulting version.
///
/// Stores already at or beyond `target` (but not beyond
/// [`SCHEMA_VERSION`]) are left unchanged.
///
/// # Errors
///
/// Returns [`SqliteStoreError`] when `target` is outside the chain, the file
/// reports an unknown version, or a step fails.
pub fn migrate_to(
    connection: &mut Connection,
    target: i64,
    events: &dyn StoreEventSink,
) -> Result<i64, SqliteStoreError> {
    if !(BASELINE_VERSION ..= SCHEMA_VERSION).contains(&target) {
        return Err(SqliteStoreError::Invalid(format!(
            "migration target out of range: {target}"
        )));
    }
    let mut version = read_or_init_version(connection)?;
    if version > SCHEMA_VERSION {
        emit(
            events,
            Component::Migration,
            Severity::Error,
            "migrate",
            None,
            format!("store version {version} is newer than supported {SCHEMA_VERSION}"),
        );
        return Err(SqliteStoreError::VersionMismatch(format!(
            "unsupported schema version: {version}"
        )));
    }
    if version < BASELINE_VERSION {
        return Err(SqliteStoreError::Corrupt(format!("invalid schema version: {version}")));
    }
    let start = version;
    for migration in MIGRATIONS.iter().filter(|step| step.from >= start && step.from < target) {
        if let Err(err) = apply_step(connection, migration) {
            emit(
                events,
                Component::Migration,
                Severity::Error,
                migration.name,
                None,
                format!("step v{} failed and was rolled back: {err}", migration.from),
            );
            return Err(err);
        }
        version = migration.from + 1;
        emit(
            events,
            Component::Migration,
            Severity::Info,
            migration.name,
            None,
            format!("store migrated to v{version}"),
        );
    }
    Ok(version)
}

/// Returns the recorded schema version without modifying the file.
///
/// # Errors
///
/// Returns [`SqliteStoreError`] when the file cannot be queried.
pub fn current_version(connection: &Connection) -> Result<Option<i64>, SqliteStoreError> {
    let has_meta: i64 = connection
        .query_row(
            "SELECT COUNT(*) FROM sqlite_master WHERE type = 'table' AND name = 'store_meta'",
            [],
            |row| row.get(0),
        )
        .map_err(db_error)?;
    if has_meta == 0 {
        return Ok(None);
    }
    connection
        .query_row("SELECT version FROM store_meta LIMIT 1", [], |row| row.get(0))
        .optional()
        .map_err(db_error)
}

/// Reads the version, creating the v1 baseline for new files.
fn read_or_init_version(connection: &mut Connection) -> Result<i64, SqliteStoreError> {
    let tx = connection.transaction_with_behavior(TransactionBehavior::Immediate).map_err(db_error)?;
    tx.execute_batch("CREATE TABLE IF NOT EXISTS store_meta (version INTEGER NOT NULL);")
        .map_err(db_error)?;
    let version: Option<i64> = tx
        .query_row("SELECT version FROM store_meta LIMIT 1", [], |row| row.get(0))
        .optional()
        .map_err(db_error)?;
    let version = match version {
        Some(version) => version,
        None => {
            tx.execute_batch(BASELINE_SQL).map_err(db_error)?;
            tx.execute("INSERT INTO store_meta (version) VALUES (?1)", params![BASELINE_VERSION])
                .map_err(db_error)?;
            BASELINE_VERSION
        }
    };
    tx.commit().map_err(db_error)?;
    Ok(version)
}

/// Runs one step and its version bump in a single exclusive transaction.
fn apply_step(connection: &mut Connection, migration: &Migration) -> Result<(), SqliteStoreError> {
    let tx = connection.transaction_with_behavior(TransactionBehavior::Immediate).map_err(db_error)?;
    let version: i64 = tx
        .query_row("SELECT version FROM store_meta LIMIT 1", [], |row| row.get(0))
        .map_err(db_error)?;
    if version != migration.from {
        return Err(SqliteStoreError::VersionMismatch(format!(
            "expected v{} before {}, found v{version}",
            migration.from, migration.name
        )));
    }
    (migration.apply)(&tx)?;
    tx.execute("UPDATE store_meta SET version = ?1", params![migration.from + 1])
        .map_err(db_error)?;
    tx.commit().map_err(db_error)
}

// ============================================================================
// SECTION: Steps
// ============================================================================

/// v1 -> v2: one row per `(language_tag, word_normalized)`.
///
/// The surviving row is the one with the highest frequency, then the most
/// recent use. The search mirror is rebuilt from the survivors and the lookup
/// index becomes unique.
fn dedupe_learned_words(tx: &Transaction<'_>) -> Result<(), SqliteStoreError> {
    tx.execute_batch(
        "DELETE FROM learned_words WHERE id IN (
             SELECT id FROM (
                 SELECT id, ROW_NUMBER() OVER (
                     PARTITION BY language_tag, word_normalized
                     ORDER BY frequency DESC, last_used DESC, id DESC
                 ) AS survivor_rank
                 FROM learned_words
             ) WHERE survivor_rank > 1
         );
         DELETE FROM learned_words_fts;
         INSERT INTO learned_words_fts (rowid, word_normalized, word_display)
             SELECT id, word_normalized, word_display FROM learned_words;
         DROP INDEX IF EXISTS idx_learned_words_lookup;
         CREATE UNIQUE INDEX IF NOT EXISTS idx_learned_words_unique
             ON learned_words (language_tag, word_normalized);
         CREATE INDEX IF NOT EXISTS idx_learned_words_cleanup
             ON learned_words (frequency, last_used);
         CREATE INDEX IF NOT EXISTS idx_learned_words_rank
             ON learned_words (language_tag, frequency DESC, last_used DESC);",
    )
    .map_err(db_error)
}

/// v2 -> v3: structural only.
fn clipboard_pin_index(tx: &Transaction<'_>) -> Result<(), SqliteStoreError> {
    tx.execute_batch(
        "CREATE INDEX IF NOT EXISTS idx_clipboard_items_pinned_time
             ON clipboard_items (is_pinned, timestamp);",
    )
    .map_err(db_error)
}

/// v3 -> v4: custom key mappings.
fn custom_key_mappings(tx: &Transaction<'_>) -> Result<(), SqliteStoreError> {
    tx.execute_batch(
        "CREATE TABLE IF NOT EXISTS custom_key_mappings (
             base_key TEXT PRIMARY KEY NOT NULL,
             custom_symbol TEXT NOT NULL,
             created_at INTEGER NOT NULL
         );",
    )
    .map_err(db_error)
}

/// v4 -> v5: per-user frequency overlay, seeded from learned words.
fn user_word_frequencies(tx: &Transaction<'_>) -> Result<(), SqliteStoreError> {
    tx.execute_batch(
        "CREATE TABLE IF NOT EXISTS user_word_frequencies (
             id INTEGER PRIMARY KEY AUTOINCREMENT,
             language_tag TEXT NOT NULL,
             word_normalized TEXT NOT NULL,
             frequency INTEGER NOT NULL DEFAULT 1 CHECK (frequency >= 1),
             last_used INTEGER NOT NULL
         );
         CREATE UNIQUE INDEX IF NOT EXISTS idx_user_word_frequencies_unique
             ON user_word_frequencies (language_tag, word_normalized);
         INSERT OR IGNORE INTO user_word_frequencies
             (language_tag, word_normalized, frequency, last_used)
             SELECT language_tag, word_normalized, frequency, last_used FROM learned_words;",
    )
    .map_err(db_error)
}

/// v5 -> v6: word-pair statistics.
fn user_word_bigrams(tx: &Transaction<'_>) -> Result<(), SqliteStoreError> {
    tx.execute_batch(
        "CREATE TABLE IF NOT EXISTS user_word_bigrams (
             id INTEGER PRIMARY KEY AUTOINCREMENT,
             language_tag TEXT NOT NULL,
             word_a TEXT NOT NULL,
             word_b TEXT NOT NULL,
             frequency INTEGER NOT NULL DEFAULT 1 CHECK (frequency >= 1),
             last_used INTEGER NOT NULL
         );
         CREATE UNIQUE INDEX IF NOT EXISTS idx_user_word_bigrams_unique
             ON user_word_bigrams (language_tag, word_a, word_b);
         CREATE INDEX IF NOT EXISTS idx_user_word_bigrams_predict
             ON user_word_bigrams (language_tag, word_a, frequency DESC);",
    )
    .map_err(db_error)
}

// ============================================================================
// SECTION: Tests
// ============================================================================

#[cfg(test)]
mod tests {
    #![allow(clippy::unwrap_used, reason = "Test-only assertions.")]

    use super::BASELINE_VERSION;
    use super::MIGRATIONS;
    use super::SCHEMA_VERSION;

    #[test]
    fn chain_is_contiguous() {
        let mut expected = BASELINE_VERSION;
        for step in &MIGRATIONS {
            assert_eq!(step.from, expected, "gap before {}", step.name);
            expected += 1;
        }
        assert_eq!(expected, SCHEMA_VERSION);
    }
}

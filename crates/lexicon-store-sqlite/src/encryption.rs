// crates/lexicon-store-sqlite/src/encryption.rs
// ============================================================================
// Module: Store Encryption Helpers
// Description: Plaintext detection, SQLCipher export, and export verification.
// Purpose: Provide the file-level primitives for one-way encryption migration.
// Dependencies: lexicon-core, rusqlite, zeroize
// ============================================================================

//! ## Overview
//! These helpers operate on store files, never on the shared engine. The
//! orchestration (credential persistence, rename, rollback) lives with the
//! service; this module only guarantees that an export either completes into
//! the target file or returns an error.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::collections::BTreeMap;
use std::fs::File;
use std::io::ErrorKind;
use std::io::Read;
use std::path::Path;

use lexicon_core::NoopEventSink;
use lexicon_core::Passphrase;
use rusqlite::Connection;
use rusqlite::OpenFlags;
use rusqlite::params;

use crate::config::SqliteStoreConfig;
use crate::engine::apply_key;
use crate::engine::open_connection;
use crate::engine::raw_key_literal;
use crate::error::SqliteStoreError;
use crate::error::db_error;
use crate::migrations;

// ============================================================================
// SECTION: Constants
// ============================================================================

/// Header every plaintext `SQLite` file starts with.
const SQLITE_HEADER: &[u8; 16] = b"SQLite format 3\0";

/// Tables compared when verifying an export.
const VERIFIED_TABLES: [&str; 6] = [
    "learned_words",
    "user_word_frequencies",
    "user_word_bigrams",
    "custom_key_mappings",
    "clipboard_items",
    "learned_words_fts",
];

// ============================================================================
// SECTION: Detection
// ============================================================================

/// Reports whether `path` is a plaintext `SQLite` file.
///
/// Missing and empty files are not plaintext stores. `SQLCipher` files have a
/// random first page and never carry the header.
///
/// # Errors
///
/// Returns [`SqliteStoreError::Io`] when the file exists but cannot be read.
pub fn is_plaintext_database(path: &Path) -> Result<bool, SqliteStoreError> {
    let mut file = match File::open(path) {
        Ok(file) => file,
        Err(err) if err.kind() == ErrorKind::NotFound => return Ok(false),
        Err(err) => return Err(SqliteStoreError::Io(err.to_string())),
    };
    let mut header = [0_u8; 16];
    match file.read_exact(&mut header) {
        Ok(()) => Ok(&header == SQLITE_HEADER),
        Err(err) if err.kind() == ErrorKind::UnexpectedEof => Ok(false),
        Err(err) => Err(SqliteStoreError::Io(err.to_string())),
    }
}

// ============================================================================
// SECTION: Export
// ============================================================================

/// Copies every table of the plaintext store at `source` into a new
/// encrypted file at `target`, keyed with `passphrase`, and returns the
/// fingerprint both files shared at export time.
///
/// The source is opened without pragmas and only read, so its bytes are
/// unchanged whatever happens afterwards. The copy is compared against the
/// source at the source's schema version and only then walked through the
/// schema chain under the new key.
///
/// # Errors
///
/// Returns [`SqliteStoreError`] when the source cannot be opened, `target`
/// already exists, the copy differs from the source, or a schema step on the
/// copy fails. A partial `target` may remain on error; callers own its
/// cleanup.
pub fn export_plaintext_to_encrypted(
    source: &SqliteStoreConfig,
    target: &Path,
    passphrase: &Passphrase,
) -> Result<StoreFingerprint, SqliteStoreError> {
    if target.exists() {
        return Err(SqliteStoreError::Invalid("export target already exists".to_string()));
    }
    let Some(target_str) = target.to_str() else {
        return Err(SqliteStoreError::Invalid("export target path is not utf-8".to_string()));
    };
    let connection = open_existing(&source.path, None)?;
    let source_print = fingerprint_of(&connection)?;
    let key = raw_key_literal(passphrase);
    connection
        .execute("ATTACH DATABASE ?1 AS encrypted KEY ?2", params![target_str, key.as_str()])
        .map_err(db_error)?;
    let exported = connection
        .query_row("SELECT sqlcipher_export('encrypted')", [], |_| Ok(()))
        .map_err(|err| SqliteStoreError::Encryption(format!("sqlcipher export failed: {err}")));
    let detached = connection.execute_batch("DETACH DATABASE encrypted;").map_err(db_error);
    exported?;
    detached?;
    connection.close().map_err(|(_, err)| db_error(err))?;

    let copy_print = read_fingerprint(target, Some(passphrase))?;
    if copy_print != source_print {
        return Err(SqliteStoreError::Corrupt(
            "encrypted copy does not match plaintext store".to_string(),
        ));
    }
    let mut copy = open_connection(&source.with_path(target), Some(passphrase))?;
    migrations::migrate(&mut copy, &NoopEventSink)?;
    copy.close().map_err(|(_, err)| db_error(err))?;
    Ok(source_print)
}

// ============================================================================
// SECTION: Verification
// ============================================================================

/// Schema version and per-table row counts of a store file.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StoreFingerprint {
    /// Recorded schema version.
    pub schema_version: Option<i64>,
    /// Row count per verified table.
    pub row_counts: BTreeMap<&'static str, i64>,
}

/// Reads the fingerprint of a store file, keyed when `passphrase` is set.
///
/// The file is never created or migrated. It is opened read-write so a
/// WAL-mode store can be read even when its shared-memory file is absent.
///
/// # Errors
///
/// Returns [`SqliteStoreError`] when the file cannot be opened or read.
pub fn read_fingerprint(
    path: &Path,
    passphrase: Option<&Passphrase>,
) -> Result<StoreFingerprint, SqliteStoreError> {
    let connection = open_existing(path, passphrase)?;
    fingerprint_of(&connection)
}

/// Opens an existing file without creating it or applying pragmas.
fn open_existing(
    path: &Path,
    passphrase: Option<&Passphrase>,
) -> Result<Connection, SqliteStoreError> {
    let flags = OpenFlags::SQLITE_OPEN_READ_WRITE | OpenFlags::SQLITE_OPEN_NO_MUTEX;
    let connection = Connection::open_with_flags(path, flags).map_err(db_error)?;
    if let Some(passphrase) = passphrase {
        apply_key(&connection, passphrase)?;
    }
    Ok(connection)
}

/// Reads the schema version and the row count of every verified table the
/// file has. Tables added by later schema steps are absent from the map.
fn fingerprint_of(connection: &Connection) -> Result<StoreFingerprint, SqliteStoreError> {
    let schema_version = migrations::current_version(connection)?;
    let mut row_counts = BTreeMap::new();
    for table in VERIFIED_TABLES {
        let present: i64 = connection
            .query_row(
                "SELECT COUNT(*) FROM sqlite_master WHERE type = 'table' AND name = ?1",
                params![table],
                |row| row.get(0),
            )
            .map_err(db_error)?;
        if present == 0 {
            continue;
        }
        let count: i64 = connection
            .query_row(&format!("SELECT COUNT(*) FROM {table}"), [], |row| row.get(0))
            .map_err(db_error)?;
        row_counts.insert(table, count);
    }
    Ok(StoreFingerprint {
        schema_version,
        row_counts,
    })
}

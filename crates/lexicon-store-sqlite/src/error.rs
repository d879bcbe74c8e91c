// crates/lexicon-store-sqlite/src/error.rs
// ============================================================================
// Module: SQLite Store Errors
// Description: Error taxonomy for the store engine and its repositories.
// Purpose: Keep engine failures typed and map them onto host-facing errors.
// Dependencies: lexicon-core, rusqlite, thiserror
// ============================================================================

//! ## Overview
//! Error taxonomy for the store engine and its repositories.

// ============================================================================
// SECTION: Imports
// ============================================================================

use lexicon_core::InputError;
use lexicon_core::StoreError;
use rusqlite::ErrorCode;
use thiserror::Error;

// ============================================================================
// SECTION: Errors
// ============================================================================

/// `SQLite` store errors.
///
/// # Invariants
/// - Error messages avoid embedding words, clipboard content, or key material.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum SqliteStoreError {
    /// Store I/O error.
    #[error("sqlite store io error: {0}")]
    Io(String),
    /// `SQLite` engine error.
    #[error("sqlite store db error: {0}")]
    Db(String),
    /// Stored rows fail to decode.
    #[error("sqlite store corruption: {0}")]
    Corrupt(String),
    /// Store schema version mismatch.
    #[error("sqlite store version mismatch: {0}")]
    VersionMismatch(String),
    /// Invalid input or configuration value.
    #[error("sqlite store invalid data: {0}")]
    Invalid(String),
    /// Cipher unavailable or key rejected.
    #[error("sqlite store encryption error: {0}")]
    Encryption(String),
    /// Request conflicts with the already open store.
    #[error("sqlite store configuration error: {0}")]
    Configuration(String),
}

impl From<SqliteStoreError> for StoreError {
    fn from(error: SqliteStoreError) -> Self {
        match error {
            SqliteStoreError::Io(message) => Self::Io(message),
            SqliteStoreError::Db(message) => Self::Store(message),
            SqliteStoreError::Corrupt(message) => Self::Corrupt(message),
            SqliteStoreError::VersionMismatch(message) => Self::VersionMismatch(message),
            SqliteStoreError::Invalid(message) => Self::Invalid(message),
            SqliteStoreError::Encryption(message) => Self::Encryption(message),
            SqliteStoreError::Configuration(message) => Self::Configuration(message),
        }
    }
}

impl From<InputError> for SqliteStoreError {
    fn from(error: InputError) -> Self {
        Self::Invalid(error.to_string())
    }
}

// ============================================================================
// SECTION: Helpers
// ============================================================================

/// Maps a `rusqlite` error onto the store taxonomy.
///
/// A file that cannot be read as a database is reported as an encryption
/// fault: it is either encrypted under another key or not a store at all.
pub(crate) fn db_error(err: rusqlite::Error) -> SqliteStoreError {
    if err.sqlite_error_code() == Some(ErrorCode::NotADatabase) {
        return SqliteStoreError::Encryption("store file is not readable with this key".to_string());
    }
    SqliteStoreError::Db(err.to_string())
}

/// Converts a stored integer counter to `u64`.
pub(crate) fn counter_from_sql(value: i64, field: &str) -> Result<u64, SqliteStoreError> {
    u64::try_from(value).map_err(|_| SqliteStoreError::Corrupt(format!("negative {field}")))
}

/// Converts a caller-supplied count to an `SQLite` integer.
pub(crate) fn counter_to_sql(value: u64, field: &str) -> Result<i64, SqliteStoreError> {
    i64::try_from(value).map_err(|_| SqliteStoreError::Invalid(format!("{field} too large")))
}

/// Converts a result limit to an `SQLite` `LIMIT` value.
pub(crate) fn limit_to_sql(limit: usize) -> i64 {
    i64::try_from(limit).unwrap_or(i64::MAX)
}

/// Converts an affected-row count.
pub(crate) fn affected(count: usize) -> u64 {
    u64::try_from(count).unwrap_or(u64::MAX)
}

// crates/lexicon-store-sqlite/src/engine.rs
// ============================================================================
// Module: Store Engine
// Description: Owner of the single physical store connection.
// Purpose: Open, key, migrate, and serialize access to the lexicon store.
// Dependencies: lexicon-core, rusqlite, zeroize
// ============================================================================

//! ## Overview
//! [`StoreEngine`] owns exactly one `SQLite` connection behind a mutex. An
//! encrypted store is keyed with the raw 32-byte passphrase before any other
//! statement runs; the engine then checks that the `SQLCipher` codec is
//! actually linked (fail closed) and that the key decrypts the schema.
//!
//! The passphrase is consumed by [`StoreEngine::open`] and wiped when that
//! call returns, on success and on failure alike. The engine never retains it.
//!
//! Repositories reach the connection only through
//! [`StoreEngine::with_connection`] and [`StoreEngine::with_transaction`]; the
//! mutex is released before either returns, so no caller can hold it across
//! an `.await`.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::path::Path;
use std::sync::Arc;
use std::sync::Mutex;
use std::time::Duration;

use lexicon_core::Clock;
use lexicon_core::Component;
use lexicon_core::NoopEventSink;
use lexicon_core::Passphrase;
use lexicon_core::Severity;
use lexicon_core::StoreEventSink;
use lexicon_core::SystemClock;
use lexicon_core::Timestamp;
use lexicon_core::emit;
use rusqlite::Connection;
use rusqlite::OpenFlags;
use rusqlite::OptionalExtension;
use rusqlite::Transaction;
use rusqlite::TransactionBehavior;
use zeroize::Zeroizing;

use crate::config::SqliteStoreConfig;
use crate::config::ensure_parent_dir;
use crate::config::validate_store_path;
use crate::error::SqliteStoreError;
use crate::error::db_error;
use crate::migrations;

// ============================================================================
// SECTION: Types
// ============================================================================

/// Encryption mode a store was opened with.
///
/// # Invariants
/// - Fixed for the lifetime of an engine.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EncryptionMode {
    /// `SQLCipher` keyed with a 32-byte raw key.
    Encrypted,
    /// Plain `SQLite` file.
    Plaintext,
}

impl EncryptionMode {
    /// Returns the mode implied by an optional passphrase.
    #[must_use]
    pub const fn for_passphrase(passphrase: Option<&Passphrase>) -> Self {
        match passphrase {
            Some(_) => Self::Encrypted,
            None => Self::Plaintext,
        }
    }

    /// Returns a stable label.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Encrypted => "encrypted",
            Self::Plaintext => "plaintext",
        }
    }
}

/// Shared collaborators injected into every engine.
#[derive(Clone)]
pub struct StoreRuntime {
    /// Time source for recency fields.
    pub clock: Arc<dyn Clock>,
    /// Destination for fault and lifecycle events.
    pub events: Arc<dyn StoreEventSink>,
}

impl StoreRuntime {
    /// Builds a runtime from explicit collaborators.
    #[must_use]
    pub fn new(clock: Arc<dyn Clock>, events: Arc<dyn StoreEventSink>) -> Self {
        Self {
            clock,
            events,
        }
    }

    /// Wall clock, events discarded.
    #[must_use]
    pub fn system() -> Self {
        Self::new(Arc::new(SystemClock), Arc::new(NoopEventSink))
    }

    /// Returns the current time.
    #[must_use]
    pub fn now(&self) -> Timestamp {
        self.clock.now()
    }
}

// ============================================================================
// SECTION: Engine
// ============================================================================

/// The single open lexicon store.
///
/// # Invariants
/// - Connection access is serialized through a mutex.
/// - The schema is at [`migrations::SCHEMA_VERSION`] once `open` returns.
/// - After [`StoreEngine::close`] every access fails with an I/O error.
pub struct StoreEngine {
    /// Store configuration.
    config: SqliteStoreConfig,
    /// Mode chosen at open.
    mode: EncryptionMode,
    /// Connection, `None` once closed.
    connection: Mutex<Option<Connection>>,
    /// Injected collaborators.
    runtime: StoreRuntime,
}

impl StoreEngine {
    /// Opens (creating if needed), keys, and migrates the store.
    ///
    /// # Errors
    ///
    /// Returns [`SqliteStoreError::Encryption`] when the cipher is missing or
    /// the key is rejected, [`SqliteStoreError::VersionMismatch`] for stores
    /// from newer releases, and other variants for path or I/O faults.
    pub fn open(
        config: SqliteStoreConfig,
        passphrase: Option<Passphrase>,
        runtime: StoreRuntime,
    ) -> Result<Self, SqliteStoreError> {
        let mode = EncryptionMode::for_passphrase(passphrase.as_ref());
        let opened = open_connection(&config, passphrase.as_ref());
        drop(passphrase);
        let mut connection = match opened {
            Ok(connection) => connection,
            Err(err) => {
                emit(
                    runtime.events.as_ref(),
                    Component::StorageEngine,
                    severity_for(&err),
                    "open",
                    None,
                    format!("{} store open failed: {err}", mode.as_str()),
                );
                return Err(err);
            }
        };
        migrations::migrate(&mut connection, runtime.events.as_ref())?;
        emit(
            runtime.events.as_ref(),
            Component::StorageEngine,
            Severity::Info,
            "open",
            None,
            format!("{} store ready", mode.as_str()),
        );
        Ok(Self {
            config,
            mode,
            connection: Mutex::new(Some(connection)),
            runtime,
        })
    }

    /// Returns the mode the store was opened with.
    #[must_use]
    pub const fn encryption_mode(&self) -> EncryptionMode {
        self.mode
    }

    /// Returns the store file path.
    #[must_use]
    pub fn path(&self) -> &Path {
        &self.config.path
    }

    /// Returns the configuration the store was opened with.
    #[must_use]
    pub const fn config(&self) -> &SqliteStoreConfig {
        &self.config
    }

    /// Returns the injected collaborators.
    #[must_use]
    pub const fn runtime(&self) -> &StoreRuntime {
        &self.runtime
    }

    /// Returns the current time from the injected clock.
    #[must_use]
    pub fn now(&self) -> Timestamp {
        self.runtime.now()
    }

    /// Runs `operation` with exclusive access to the connection.
    ///
    /// # Errors
    ///
    /// Returns [`SqliteStoreError::Io`] when the engine is closed or the mutex
    /// is poisoned, otherwise the error of `operation`.
    pub fn with_connection<T>(
        &self,
        operation: impl FnOnce(&Connection) -> Result<T, SqliteStoreError>,
    ) -> Result<T, SqliteStoreError> {
        let guard = self
            .connection
            .lock()
            .map_err(|_| SqliteStoreError::Io("sqlite connection mutex poisoned".to_string()))?;
        let Some(connection) = guard.as_ref() else {
            return Err(SqliteStoreError::Io("store is closed".to_string()));
        };
        operation(connection)
    }

    /// Runs `operation` inside an `IMMEDIATE` transaction and commits it.
    ///
    /// The transaction rolls back when `operation` fails.
    ///
    /// # Errors
    ///
    /// Returns [`SqliteStoreError`] from the lock, the transaction, or
    /// `operation`.
    pub fn with_transaction<T>(
        &self,
        operation: impl FnOnce(&Transaction<'_>) -> Result<T, SqliteStoreError>,
    ) -> Result<T, SqliteStoreError> {
        let mut guard = self
            .connection
            .lock()
            .map_err(|_| SqliteStoreError::Io("sqlite connection mutex poisoned".to_string()))?;
        let Some(connection) = guard.as_mut() else {
            return Err(SqliteStoreError::Io("store is closed".to_string()));
        };
        let tx = connection
            .transaction_with_behavior(TransactionBehavior::Immediate)
            .map_err(db_error)?;
        let value = operation(&tx)?;
        tx.commit().map_err(db_error)?;
        Ok(value)
    }

    /// Returns the recorded schema version.
    ///
    /// # Errors
    ///
    /// Returns [`SqliteStoreError`] when the version cannot be read.
    pub fn schema_version(&self) -> Result<i64, SqliteStoreError> {
        self.with_connection(|connection| {
            migrations::current_version(connection)?
                .ok_or_else(|| SqliteStoreError::Corrupt("store_meta missing".to_string()))
        })
    }

    /// Closes the connection. Later calls fail; closing twice is a no-op.
    ///
    /// # Errors
    ///
    /// Returns [`SqliteStoreError`] when `SQLite` refuses to close.
    pub fn close(&self) -> Result<(), SqliteStoreError> {
        let mut guard = self
            .connection
            .lock()
            .map_err(|_| SqliteStoreError::Io("sqlite connection mutex poisoned".to_string()))?;
        if let Some(connection) = guard.take() {
            connection.close().map_err(|(_, err)| db_error(err))?;
        }
        Ok(())
    }
}

// ============================================================================
// SECTION: Helpers
// ============================================================================

/// Opens an `SQLite` connection with secure defaults, keyed when requested.
pub(crate) fn open_connection(
    config: &SqliteStoreConfig,
    passphrase: Option<&Passphrase>,
) -> Result<Connection, SqliteStoreError> {
    validate_store_path(&config.path)?;
    ensure_parent_dir(&config.path)?;
    let flags = OpenFlags::SQLITE_OPEN_READ_WRITE
        | OpenFlags::SQLITE_OPEN_CREATE
        | OpenFlags::SQLITE_OPEN_FULL_MUTEX;
    let connection = Connection::open_with_flags(&config.path, flags).map_err(db_error)?;
    if let Some(passphrase) = passphrase {
        apply_key(&connection, passphrase)?;
    }
    verify_readable(&connection)?;
    apply_pragmas(&connection, config)?;
    Ok(connection)
}

/// Keys the connection and confirms the cipher codec is present.
pub(crate) fn apply_key(
    connection: &Connection,
    passphrase: &Passphrase,
) -> Result<(), SqliteStoreError> {
    let literal = raw_key_literal(passphrase);
    let statement = Zeroizing::new(format!("PRAGMA key = \"{}\";", literal.as_str()));
    connection
        .execute_batch(statement.as_str())
        .map_err(|_| SqliteStoreError::Encryption("failed to apply store key".to_string()))?;
    let cipher_version: Option<String> = connection
        .query_row("PRAGMA cipher_version;", [], |row| row.get(0))
        .optional()
        .map_err(db_error)?;
    match cipher_version {
        Some(version) if !version.is_empty() => Ok(()),
        _ => Err(SqliteStoreError::Encryption(
            "sqlcipher codec unavailable; refusing to open encrypted store".to_string(),
        )),
    }
}

/// Returns the `x'<hex>'` raw-key literal understood by `SQLCipher`.
pub(crate) fn raw_key_literal(passphrase: &Passphrase) -> Zeroizing<String> {
    Zeroizing::new(format!("x'{}'", passphrase.to_hex().as_str()))
}

/// Reads the schema, which fails when the key does not match the file.
fn verify_readable(connection: &Connection) -> Result<(), SqliteStoreError> {
    connection
        .query_row("SELECT COUNT(*) FROM sqlite_master;", [], |row| row.get::<_, i64>(0))
        .map(|_| ())
        .map_err(db_error)
}

/// Applies `SQLite` pragmas required for durability.
fn apply_pragmas(
    connection: &Connection,
    config: &SqliteStoreConfig,
) -> Result<(), SqliteStoreError> {
    connection.execute_batch("PRAGMA foreign_keys = ON;").map_err(db_error)?;
    connection
        .execute_batch(&format!("PRAGMA journal_mode = {};", config.journal_mode.pragma_value()))
        .map_err(db_error)?;
    connection
        .execute_batch(&format!("PRAGMA synchronous = {};", config.sync_mode.pragma_value()))
        .map_err(db_error)?;
    connection.busy_timeout(Duration::from_millis(config.busy_timeout_ms)).map_err(db_error)?;
    Ok(())
}

/// Chooses the event severity for an open failure.
const fn severity_for(error: &SqliteStoreError) -> Severity {
    match error {
        SqliteStoreError::Encryption(_) => Severity::Critical,
        _ => Severity::Error,
    }
}

// crates/lexicon-service/src/error.rs
// ============================================================================
// Module: Service Errors
// Description: Failures surfaced while bootstrapping the lexicon service.
// Purpose: Collapse config, vault, and store failures into one startup error.
// Dependencies: lexicon-config, lexicon-keyvault, lexicon-store-sqlite
// ============================================================================

//! ## Overview
//! Failures surfaced while bootstrapping the lexicon service.

use lexicon_config::ConfigError;
use lexicon_core::StoreError;
use lexicon_keyvault::KeyVaultError;
use lexicon_store_sqlite::SqliteStoreError;
use thiserror::Error;

/// Service startup errors.
///
/// # Invariants
/// - Messages never include passphrases, words, or clipboard content.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ServiceError {
    /// Configuration could not be loaded or applied.
    #[error("service config error: {0}")]
    Config(String),
    /// Key vault adapter failure.
    #[error("service key vault error: {0}")]
    KeyVault(String),
    /// Store open or access failure.
    #[error("service store error: {0}")]
    Store(String),
    /// Policy requires encryption but no passphrase is available.
    #[error("encryption required: {0}")]
    EncryptionRequired(String),
    /// Filesystem or worker failure.
    #[error("service io error: {0}")]
    Io(String),
}

impl From<ConfigError> for ServiceError {
    fn from(error: ConfigError) -> Self {
        Self::Config(error.to_string())
    }
}

impl From<KeyVaultError> for ServiceError {
    fn from(error: KeyVaultError) -> Self {
        Self::KeyVault(error.to_string())
    }
}

impl From<SqliteStoreError> for ServiceError {
    fn from(error: SqliteStoreError) -> Self {
        Self::Store(error.to_string())
    }
}

impl From<StoreError> for ServiceError {
    fn from(error: StoreError) -> Self {
        Self::Store(error.to_string())
    }
}

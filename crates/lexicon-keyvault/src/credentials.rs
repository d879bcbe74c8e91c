// crates/lexicon-keyvault/src/credentials.rs
// ============================================================================
// Module: Credential Store
// Description: Side-channel persistence of the wrapped storage passphrase.
// Purpose: Keep only ciphertext and nonce outside the vault.
// Dependencies: base64, lexicon-core, serde, serde_json, tempfile
// ============================================================================

//! ## Overview
//! The wrapped passphrase is a small versioned JSON record whose binary fields
//! are URL-safe Base64. [`FileCredentialStore`] replaces the record atomically
//! through a temporary file in the same directory, so a crash leaves either
//! the old record or the new one.
//!
//! Security posture: the record is ciphertext, but a truncated or oversized
//! file is treated as corrupt rather than partially parsed.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::fs;
use std::io::ErrorKind;
use std::io::Write;
use std::path::Path;
use std::path::PathBuf;
use std::sync::Mutex;

use base64::Engine;
use base64::engine::general_purpose::URL_SAFE;
use lexicon_core::SealedSecret;
use serde::Deserialize;
use serde::Serialize;
use tempfile::NamedTempFile;
use thiserror::Error;

// ============================================================================
// SECTION: Constants
// ============================================================================

/// Current credential record version.
pub const CREDENTIAL_RECORD_VERSION: u32 = 1;

/// Largest credential file accepted on load.
pub const MAX_CREDENTIAL_FILE_BYTES: u64 = 16 * 1024;

// ============================================================================
// SECTION: Errors
// ============================================================================

/// Credential store failures.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum CredentialError {
    /// Filesystem failure.
    #[error("credential io error: {0}")]
    Io(String),
    /// Record exists but cannot be decoded.
    #[error("credential record corrupt: {0}")]
    Corrupt(String),
}

// ============================================================================
// SECTION: Record
// ============================================================================

/// Persisted form of a wrapped passphrase.
///
/// # Invariants
/// - `ciphertext` and `nonce` are URL-safe Base64 with padding.
/// - Never contains the plaintext passphrase.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct WrappedPassphrase {
    /// Record format version.
    pub version: u32,
    /// Encoded ciphertext with authentication tag.
    pub ciphertext: String,
    /// Encoded nonce.
    pub nonce: String,
}

impl WrappedPassphrase {
    /// Encodes a sealed secret into a current-version record.
    #[must_use]
    pub fn from_sealed(sealed: &SealedSecret) -> Self {
        Self {
            version: CREDENTIAL_RECORD_VERSION,
            ciphertext: URL_SAFE.encode(&sealed.ciphertext),
            nonce: URL_SAFE.encode(&sealed.nonce),
        }
    }

    /// Decodes the record back into a sealed secret.
    ///
    /// # Errors
    ///
    /// Returns [`CredentialError::Corrupt`] for unknown versions or invalid
    /// Base64.
    pub fn to_sealed(&self) -> Result<SealedSecret, CredentialError> {
        if self.version != CREDENTIAL_RECORD_VERSION {
            return Err(CredentialError::Corrupt(format!(
                "unsupported credential record version {}",
                self.version
            )));
        }
        let ciphertext = URL_SAFE
            .decode(&self.ciphertext)
            .map_err(|err| CredentialError::Corrupt(format!("ciphertext: {err}")))?;
        let nonce = URL_SAFE
            .decode(&self.nonce)
            .map_err(|err| CredentialError::Corrupt(format!("nonce: {err}")))?;
        Ok(SealedSecret {
            ciphertext,
            nonce,
        })
    }
}

// ============================================================================
// SECTION: Store Trait
// ============================================================================

/// Side-channel storage for the wrapped passphrase.
pub trait CredentialStore: Send + Sync {
    /// Loads the record, if one is persisted.
    ///
    /// # Errors
    ///
    /// Returns [`CredentialError`] when the record cannot be read or decoded.
    fn load(&self) -> Result<Option<WrappedPassphrase>, CredentialError>;

    /// Replaces the persisted record.
    ///
    /// # Errors
    ///
    /// Returns [`CredentialError`] when the record cannot be written.
    fn save(&self, record: &WrappedPassphrase) -> Result<(), CredentialError>;

    /// Removes the persisted record. Missing records are not an error.
    ///
    /// # Errors
    ///
    /// Returns [`CredentialError`] when the record cannot be removed.
    fn clear(&self) -> Result<(), CredentialError>;
}

// ============================================================================
// SECTION: File Store
// ============================================================================

/// JSON file credential store.
#[derive(Debug, Clone)]
pub struct FileCredentialStore {
    /// Record path.
    path: PathBuf,
}

impl FileCredentialStore {
    /// Creates a store for the record at `path`.
    #[must_use]
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
        }
    }

    /// Returns the record path.
    #[must_use]
    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl CredentialStore for FileCredentialStore {
    fn load(&self) -> Result<Option<WrappedPassphrase>, CredentialError> {
        let metadata = match fs::metadata(&self.path) {
            Ok(metadata) => metadata,
            Err(err) if err.kind() == ErrorKind::NotFound => return Ok(None),
            Err(err) => return Err(CredentialError::Io(err.to_string())),
        };
        if metadata.len() > MAX_CREDENTIAL_FILE_BYTES {
            return Err(CredentialError::Corrupt("credential file exceeds size limit".to_string()));
        }
        let bytes = fs::read(&self.path).map_err(|err| CredentialError::Io(err.to_string()))?;
        serde_json::from_slice(&bytes)
            .map(Some)
            .map_err(|err| CredentialError::Corrupt(err.to_string()))
    }

    fn save(&self, record: &WrappedPassphrase) -> Result<(), CredentialError> {
        let parent = match self.path.parent() {
            Some(parent) if !parent.as_os_str().is_empty() => parent,
            _ => Path::new("."),
        };
        fs::create_dir_all(parent).map_err(|err| CredentialError::Io(err.to_string()))?;
        let payload =
            serde_json::to_vec(record).map_err(|err| CredentialError::Io(err.to_string()))?;
        let mut temp =
            NamedTempFile::new_in(parent).map_err(|err| CredentialError::Io(err.to_string()))?;
        temp.write_all(&payload).map_err(|err| CredentialError::Io(err.to_string()))?;
        temp.as_file().sync_all().map_err(|err| CredentialError::Io(err.to_string()))?;
        temp.persist(&self.path).map_err(|err| CredentialError::Io(err.error.to_string()))?;
        Ok(())
    }

    fn clear(&self) -> Result<(), CredentialError> {
        match fs::remove_file(&self.path) {
            Ok(()) => Ok(()),
            Err(err) if err.kind() == ErrorKind::NotFound => Ok(()),
            Err(err) => Err(CredentialError::Io(err.to_string())),
        }
    }
}

// ============================================================================
// SECTION: Memory Store
// ============================================================================

/// In-memory credential store for tests and ephemeral hosts.
#[derive(Debug, Default)]
pub struct MemoryCredentialStore {
    /// Current record.
    slot: Mutex<Option<WrappedPassphrase>>,
}

impl MemoryCredentialStore {
    /// Creates an empty store.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }
}

impl CredentialStore for MemoryCredentialStore {
    fn load(&self) -> Result<Option<WrappedPassphrase>, CredentialError> {
        let slot = self
            .slot
            .lock()
            .map_err(|_| CredentialError::Io("credential mutex poisoned".to_string()))?;
        Ok(slot.clone())
    }

    fn save(&self, record: &WrappedPassphrase) -> Result<(), CredentialError> {
        let mut slot = self
            .slot
            .lock()
            .map_err(|_| CredentialError::Io("credential mutex poisoned".to_string()))?;
        *slot = Some(record.clone());
        Ok(())
    }

    fn clear(&self) -> Result<(), CredentialError> {
        let mut slot = self
            .slot
            .lock()
            .map_err(|_| CredentialError::Io("credential mutex poisoned".to_string()))?;
        *slot = None;
        Ok(())
    }
}

// ============================================================================
// SECTION: Tests
// ============================================================================

#[cfg(test)]
mod tests {
    #![allow(clippy::unwrap_used, reason = "Test-only assertions.")]

    use lexicon_core::SealedSecret;

    use super::CREDENTIAL_RECORD_VERSION;
    use super::CredentialError;
    use super::WrappedPassphrase;

    #[test]
    fn record_encodes_url_safe() {
        let sealed = SealedSecret {
            ciphertext: vec![0xfb, 0xff, 0xfe],
            nonce: vec![0xfa; 12],
        };
        let record = WrappedPassphrase::from_sealed(&sealed);
        assert!(!record.ciphertext.contains('+') && !record.ciphertext.contains('/'));
        assert_eq!(record.to_sealed().unwrap(), sealed);
    }

    #[test]
    fn unknown_version_is_corrupt() {
        let record = WrappedPassphrase {
            version: CREDENTIAL_RECORD_VERSION + 1,
            ciphertext: String::new(),
            nonce: String::new(),
        };
        assert!(matches!(record.to_sealed(), Err(CredentialError::Corrupt(_))));
    }
}

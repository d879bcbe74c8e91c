// crates/lexicon-keyvault/src/adapter.rs
// ============================================================================
// Module: Key Vault Adapter
// Description: Produces the store passphrase from the vault and credentials.
// Purpose: Own the passphrase lifecycle: generate, wrap, persist, unwrap.
// Dependencies: lexicon-core, zeroize
// ============================================================================

//! ## Overview
//! The adapter never persists a plaintext passphrase. The first call
//! generates 32 random bytes, seals them under a vault-resident master key,
//! and saves the sealed record; later calls unseal the record.
//!
//! When a record exists but cannot be unsealed (master key evicted, record
//! corrupt, wrong length) the adapter generates a fresh passphrase under a
//! fresh master key and reports [`PassphraseOrigin::Regenerated`]. Any store
//! keyed with the old passphrase is then unreadable; callers decide what to do
//! with it.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::sync::Arc;

use lexicon_core::Component;
use lexicon_core::HardwareVault;
use lexicon_core::MasterKeyHandle;
use lexicon_core::PASSPHRASE_LEN;
use lexicon_core::Passphrase;
use lexicon_core::RandomError;
use lexicon_core::SecureRandom;
use lexicon_core::Severity;
use lexicon_core::StoreEventSink;
use lexicon_core::VaultError;
use lexicon_core::emit;
use thiserror::Error;
use zeroize::Zeroizing;

use crate::credentials::CredentialError;
use crate::credentials::CredentialStore;
use crate::credentials::WrappedPassphrase;

// ============================================================================
// SECTION: Constants
// ============================================================================

/// Master key alias used when the host configures none.
pub const DEFAULT_MASTER_KEY_ALIAS: &str = "lexicon_store_master_key";

// ============================================================================
// SECTION: Errors
// ============================================================================

/// Key vault adapter failures.
///
/// # Invariants
/// - Messages never include passphrase or key bytes.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum KeyVaultError {
    /// Vault operation failed.
    #[error("vault error: {0}")]
    Vault(String),
    /// Credential record could not be read or written.
    #[error("credential error: {0}")]
    Credentials(String),
    /// Secure random source failed.
    #[error("random error: {0}")]
    Random(String),
}

impl From<VaultError> for KeyVaultError {
    fn from(error: VaultError) -> Self {
        Self::Vault(error.to_string())
    }
}

impl From<CredentialError> for KeyVaultError {
    fn from(error: CredentialError) -> Self {
        Self::Credentials(error.to_string())
    }
}

impl From<RandomError> for KeyVaultError {
    fn from(error: RandomError) -> Self {
        Self::Random(error.to_string())
    }
}

// ============================================================================
// SECTION: Results
// ============================================================================

/// How an obtained passphrase came to be.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PassphraseOrigin {
    /// Unsealed from the persisted record.
    Unwrapped,
    /// Generated because no record existed.
    Generated,
    /// Generated because the persisted record could not be unsealed.
    Regenerated,
}

/// Passphrase returned by [`KeyVaultAdapter::obtain_passphrase`].
#[derive(Debug)]
pub struct ObtainedPassphrase {
    /// Store key.
    pub passphrase: Passphrase,
    /// Provenance of the key.
    pub origin: PassphraseOrigin,
}

/// Freshly generated passphrase together with its sealed record, not yet
/// persisted.
#[derive(Debug)]
pub struct SealedPassphrase {
    /// Store key.
    pub passphrase: Passphrase,
    /// Record to persist once the key is in use.
    pub record: WrappedPassphrase,
}

// ============================================================================
// SECTION: Adapter
// ============================================================================

/// Passphrase lifecycle over a vault and a credential store.
#[derive(Clone)]
pub struct KeyVaultAdapter {
    /// Master key holder.
    vault: Arc<dyn HardwareVault>,
    /// Sealed record persistence.
    credentials: Arc<dyn CredentialStore>,
    /// Passphrase source.
    random: Arc<dyn SecureRandom>,
    /// Audit sink.
    events: Arc<dyn StoreEventSink>,
    /// Master key alias.
    alias: String,
}

impl KeyVaultAdapter {
    /// Creates an adapter.
    #[must_use]
    pub fn new(
        vault: Arc<dyn HardwareVault>,
        credentials: Arc<dyn CredentialStore>,
        random: Arc<dyn SecureRandom>,
        events: Arc<dyn StoreEventSink>,
        alias: impl Into<String>,
    ) -> Self {
        Self {
            vault,
            credentials,
            random,
            events,
            alias: alias.into(),
        }
    }

    /// Returns the master key alias.
    #[must_use]
    pub fn alias(&self) -> &str {
        &self.alias
    }

    /// Reports whether the device has an authentication factor configured.
    #[must_use]
    pub fn device_passkey_satisfied(&self) -> bool {
        self.vault.device_passkey_satisfied()
    }

    /// Reports whether a sealed record is persisted.
    ///
    /// # Errors
    ///
    /// Returns [`KeyVaultError::Credentials`] when the store cannot be read.
    /// A corrupt record counts as persisted.
    pub fn has_persisted_credentials(&self) -> Result<bool, KeyVaultError> {
        match self.credentials.load() {
            Ok(record) => Ok(record.is_some()),
            Err(CredentialError::Corrupt(_)) => Ok(true),
            Err(err) => Err(err.into()),
        }
    }

    /// Returns the store passphrase, or `None` when the device has no
    /// passkey.
    ///
    /// # Errors
    ///
    /// Returns [`KeyVaultError`] when no passphrase can be produced at all:
    /// the vault, random source, or credential store is failing.
    pub fn obtain_passphrase(&self) -> Result<Option<ObtainedPassphrase>, KeyVaultError> {
        if !self.device_passkey_satisfied() {
            self.record(Severity::Warning, "device passkey not satisfied; encryption unavailable");
            return Ok(None);
        }
        let existing = match self.credentials.load() {
            Ok(record) => record,
            Err(CredentialError::Corrupt(reason)) => {
                self.record(
                    Severity::Critical,
                    format!("credential record corrupt ({reason}); regenerating passphrase"),
                );
                return self.regenerate().map(Some);
            }
            Err(err) => return Err(err.into()),
        };
        let Some(record) = existing else {
            let sealed = self.create_sealed_passphrase(false)?;
            self.persist(&sealed.record)?;
            self.record(Severity::Info, "generated store passphrase");
            return Ok(Some(ObtainedPassphrase {
                passphrase: sealed.passphrase,
                origin: PassphraseOrigin::Generated,
            }));
        };
        match self.unwrap_record(&record) {
            Ok(passphrase) => Ok(Some(ObtainedPassphrase {
                passphrase,
                origin: PassphraseOrigin::Unwrapped,
            })),
            Err(err) => {
                self.record(
                    Severity::Critical,
                    format!("credential unwrap failed ({err}); regenerating passphrase"),
                );
                self.regenerate().map(Some)
            }
        }
    }

    /// Generates a passphrase and seals it without persisting the record.
    ///
    /// With `fresh_master_key` the master key is replaced; otherwise an
    /// existing key under the alias is reused.
    ///
    /// # Errors
    ///
    /// Returns [`KeyVaultError`] when the vault or random source fails.
    pub fn create_sealed_passphrase(
        &self,
        fresh_master_key: bool,
    ) -> Result<SealedPassphrase, KeyVaultError> {
        let key = self.master_key_for_sealing(fresh_master_key)?;
        let mut bytes = Zeroizing::new([0_u8; PASSPHRASE_LEN]);
        self.random.fill(&mut bytes[..])?;
        let sealed = self.vault.encrypt(&key, &bytes[..])?;
        Ok(SealedPassphrase {
            passphrase: Passphrase::from_zeroizing(bytes),
            record: WrappedPassphrase::from_sealed(&sealed),
        })
    }

    /// Persists a sealed record, replacing any previous one.
    ///
    /// # Errors
    ///
    /// Returns [`KeyVaultError::Credentials`] when the write fails.
    pub fn persist(&self, record: &WrappedPassphrase) -> Result<(), KeyVaultError> {
        self.credentials.save(record).map_err(KeyVaultError::from)
    }

    /// Removes the persisted record.
    ///
    /// # Errors
    ///
    /// Returns [`KeyVaultError::Credentials`] when the removal fails.
    pub fn clear_credentials(&self) -> Result<(), KeyVaultError> {
        self.credentials.clear().map_err(KeyVaultError::from)
    }

    /// Replaces master key and record after an unreadable record.
    fn regenerate(&self) -> Result<ObtainedPassphrase, KeyVaultError> {
        let sealed = self.create_sealed_passphrase(true)?;
        self.persist(&sealed.record)?;
        self.record(
            Severity::Critical,
            "store passphrase regenerated; data keyed with the previous passphrase is unreadable",
        );
        Ok(ObtainedPassphrase {
            passphrase: sealed.passphrase,
            origin: PassphraseOrigin::Regenerated,
        })
    }

    /// Unseals a persisted record.
    fn unwrap_record(&self, record: &WrappedPassphrase) -> Result<Passphrase, KeyVaultError> {
        let sealed = record.to_sealed()?;
        let key = self
            .vault
            .master_key(&self.alias)?
            .ok_or_else(|| KeyVaultError::Vault(format!("master key {} missing", self.alias)))?;
        let plaintext = self.vault.decrypt(&key, &sealed)?;
        Passphrase::from_bytes(&plaintext)
            .map_err(|_| KeyVaultError::Vault("unsealed passphrase has wrong length".to_string()))
    }

    /// Returns the key to seal under.
    fn master_key_for_sealing(&self, fresh: bool) -> Result<MasterKeyHandle, KeyVaultError> {
        if !fresh && let Some(key) = self.vault.master_key(&self.alias)? {
            return Ok(key);
        }
        self.vault.generate_master_key(&self.alias).map_err(KeyVaultError::from)
    }

    /// Emits a key vault event.
    fn record(&self, severity: Severity, message: impl Into<String>) {
        emit(
            self.events.as_ref(),
            Component::KeyVault,
            severity,
            "obtain_passphrase",
            Some(self.alias.clone()),
            message,
        );
    }
}

// crates/lexicon-keyvault/tests/keyvault_unit.rs
// ============================================================================
// Module: Key Vault Adapter Unit Tests
// Description: Generate, unwrap, regenerate, and credential persistence.
// Purpose: Validate the passphrase lifecycle and its degraded paths.
// ============================================================================

//! ## Overview
//! Drives the key vault adapter over a software vault and file or memory
//! credential stores.

#![allow(
    clippy::panic,
    clippy::unwrap_used,
    clippy::expect_used,
    clippy::use_debug,
    reason = "Test-only assertions and helpers are permitted."
)]

use std::fs;
use std::sync::Arc;

use base64::Engine;
use base64::engine::general_purpose::URL_SAFE;
use lexicon_core::MemoryEventSink;
use lexicon_core::OsSecureRandom;
use lexicon_core::RandomError;
use lexicon_core::SecureRandom;
use lexicon_core::Severity;
use lexicon_keyvault::CredentialError;
use lexicon_keyvault::CredentialStore;
use lexicon_keyvault::DEFAULT_MASTER_KEY_ALIAS;
use lexicon_keyvault::FileCredentialStore;
use lexicon_keyvault::KeyVaultAdapter;
use lexicon_keyvault::KeyVaultError;
use lexicon_keyvault::MAX_CREDENTIAL_FILE_BYTES;
use lexicon_keyvault::MemoryCredentialStore;
use lexicon_keyvault::PassphraseOrigin;
use lexicon_keyvault::SoftwareVault;
use tempfile::TempDir;

// ============================================================================
// SECTION: Helpers
// ============================================================================

struct Harness {
    vault: Arc<SoftwareVault>,
    credentials: Arc<dyn CredentialStore>,
    events: Arc<MemoryEventSink>,
}

impl Harness {
    fn new(credentials: Arc<dyn CredentialStore>) -> Self {
        Self {
            vault: Arc::new(SoftwareVault::new(true)),
            credentials,
            events: Arc::new(MemoryEventSink::new()),
        }
    }

    fn adapter(&self) -> KeyVaultAdapter {
        KeyVaultAdapter::new(
            self.vault.clone(),
            Arc::clone(&self.credentials),
            Arc::new(OsSecureRandom),
            self.events.clone(),
            DEFAULT_MASTER_KEY_ALIAS,
        )
    }
}

struct FailingRandom;

impl SecureRandom for FailingRandom {
    fn fill(&self, _dest: &mut [u8]) -> Result<(), RandomError> {
        Err(RandomError("entropy exhausted".to_string()))
    }
}

// ============================================================================
// SECTION: Lifecycle
// ============================================================================

#[test]
fn round_trip_returns_the_original_bytes() {
    let harness = Harness::new(Arc::new(MemoryCredentialStore::new()));
    let first = harness.adapter().obtain_passphrase().unwrap().unwrap();
    assert_eq!(first.origin, PassphraseOrigin::Generated);

    let second = harness.adapter().obtain_passphrase().unwrap().unwrap();
    assert_eq!(second.origin, PassphraseOrigin::Unwrapped);
    assert_eq!(first.passphrase.as_bytes(), second.passphrase.as_bytes());
    assert_eq!(second.passphrase.as_bytes().len(), 32);
}

#[test]
fn missing_passkey_yields_none_without_side_effects() {
    let harness = Harness::new(Arc::new(MemoryCredentialStore::new()));
    harness.vault.set_passkey_satisfied(false);
    let adapter = harness.adapter();
    assert!(!adapter.device_passkey_satisfied());
    assert!(adapter.obtain_passphrase().unwrap().is_none());
    assert!(!adapter.has_persisted_credentials().unwrap());
    assert!(harness.events.contains("obtain_passphrase", Severity::Warning));
}

#[test]
fn evicted_master_key_regenerates() {
    let harness = Harness::new(Arc::new(MemoryCredentialStore::new()));
    let original = harness.adapter().obtain_passphrase().unwrap().unwrap();
    let original_record = harness.credentials.load().unwrap().unwrap();
    assert!(harness.vault.evict(DEFAULT_MASTER_KEY_ALIAS));

    let replacement = harness.adapter().obtain_passphrase().unwrap().unwrap();
    assert_eq!(replacement.origin, PassphraseOrigin::Regenerated);
    assert_ne!(original.passphrase.as_bytes(), replacement.passphrase.as_bytes());
    assert_ne!(harness.credentials.load().unwrap().unwrap(), original_record);
    assert!(harness.events.contains("obtain_passphrase", Severity::Critical));

    let again = harness.adapter().obtain_passphrase().unwrap().unwrap();
    assert_eq!(again.origin, PassphraseOrigin::Unwrapped);
    assert_eq!(again.passphrase.as_bytes(), replacement.passphrase.as_bytes());
}

#[test]
fn corrupt_record_file_regenerates() {
    let temp = TempDir::new().unwrap();
    let path = temp.path().join("credentials.json");
    fs::write(&path, b"{ not json").unwrap();
    let harness = Harness::new(Arc::new(FileCredentialStore::new(&path)));
    let adapter = harness.adapter();
    assert!(adapter.has_persisted_credentials().unwrap());

    let obtained = adapter.obtain_passphrase().unwrap().unwrap();
    assert_eq!(obtained.origin, PassphraseOrigin::Regenerated);
    assert!(harness.credentials.load().unwrap().is_some());
}

#[test]
fn random_failure_is_reported() {
    let harness = Harness::new(Arc::new(MemoryCredentialStore::new()));
    let adapter = KeyVaultAdapter::new(
        harness.vault.clone(),
        Arc::clone(&harness.credentials),
        Arc::new(FailingRandom),
        harness.events.clone(),
        DEFAULT_MASTER_KEY_ALIAS,
    );
    let Err(err) = adapter.obtain_passphrase() else {
        panic!("expected random failure to surface");
    };
    assert!(matches!(err, KeyVaultError::Random(_)));
    assert!(!adapter.has_persisted_credentials().unwrap());
}

#[test]
fn sealed_passphrase_is_not_persisted_until_asked() {
    let harness = Harness::new(Arc::new(MemoryCredentialStore::new()));
    let adapter = harness.adapter();
    let sealed = adapter.create_sealed_passphrase(true).unwrap();
    assert!(!adapter.has_persisted_credentials().unwrap());

    adapter.persist(&sealed.record).unwrap();
    let obtained = adapter.obtain_passphrase().unwrap().unwrap();
    assert_eq!(obtained.origin, PassphraseOrigin::Unwrapped);
    assert_eq!(obtained.passphrase.as_bytes(), sealed.passphrase.as_bytes());

    adapter.clear_credentials().unwrap();
    assert!(!adapter.has_persisted_credentials().unwrap());
}

// ============================================================================
// SECTION: File Credentials
// ============================================================================

#[test]
fn file_record_holds_only_encoded_ciphertext() {
    let temp = TempDir::new().unwrap();
    let path = temp.path().join("keys").join("credentials.json");
    let harness = Harness::new(Arc::new(FileCredentialStore::new(&path)));
    let obtained = harness.adapter().obtain_passphrase().unwrap().unwrap();

    let raw: serde_json::Value = serde_json::from_slice(&fs::read(&path).unwrap()).unwrap();
    assert_eq!(raw["version"], 1);
    let nonce = URL_SAFE.decode(raw["nonce"].as_str().unwrap()).unwrap();
    let ciphertext = URL_SAFE.decode(raw["ciphertext"].as_str().unwrap()).unwrap();
    assert_eq!(nonce.len(), 12);
    assert_eq!(ciphertext.len(), 32 + 16);
    assert_ne!(&ciphertext[.. 32], &obtained.passphrase.as_bytes()[..]);

    let leftovers = fs::read_dir(path.parent().unwrap()).unwrap().count();
    assert_eq!(leftovers, 1, "temporary files must not remain after save");
}

#[test]
fn file_store_rejects_oversized_records_and_clears_idempotently() {
    let temp = TempDir::new().unwrap();
    let path = temp.path().join("credentials.json");
    let size = usize::try_from(MAX_CREDENTIAL_FILE_BYTES).unwrap() + 1;
    fs::write(&path, vec![b' '; size]).unwrap();
    let store = FileCredentialStore::new(&path);
    assert!(matches!(store.load(), Err(CredentialError::Corrupt(_))));

    store.clear().unwrap();
    store.clear().unwrap();
    assert!(store.load().unwrap().is_none());
}

// crates/lexicon-keyvault/src/software.rs
// ============================================================================
// Module: Software Vault
// Description: In-process AES-256-GCM implementation of the vault boundary.
// Purpose: Stand in for hardware key storage in tests and unbacked hosts.
// Dependencies: aes-gcm, lexicon-core, zeroize
// ============================================================================

//! ## Overview
//! Master keys live only in process memory and vanish with it. Each
//! encryption draws a fresh 96-bit nonce from the injected random source; the
//! 128-bit tag is appended to the ciphertext.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::collections::BTreeMap;
use std::sync::Arc;
use std::sync::Mutex;
use std::sync::atomic::AtomicBool;
use std::sync::atomic::Ordering;

use aes_gcm::Aes256Gcm;
use aes_gcm::KeyInit;
use aes_gcm::Nonce;
use aes_gcm::aead::Aead;
use lexicon_core::HardwareVault;
use lexicon_core::MasterKeyHandle;
use lexicon_core::OsSecureRandom;
use lexicon_core::SealedSecret;
use lexicon_core::SecureRandom;
use lexicon_core::VaultError;
use zeroize::Zeroizing;

// ============================================================================
// SECTION: Constants
// ============================================================================

/// AES-256 key length.
const MASTER_KEY_LEN: usize = 32;
/// AES-GCM nonce length.
pub const NONCE_LEN: usize = 12;

// ============================================================================
// SECTION: Vault
// ============================================================================

/// Memory-resident key vault.
pub struct SoftwareVault {
    /// Master keys by alias.
    keys: Mutex<BTreeMap<String, Zeroizing<[u8; MASTER_KEY_LEN]>>>,
    /// Simulated device passkey state.
    passkey_satisfied: AtomicBool,
    /// Key and nonce source.
    random: Arc<dyn SecureRandom>,
}

impl SoftwareVault {
    /// Creates a vault backed by the operating system random source.
    #[must_use]
    pub fn new(passkey_satisfied: bool) -> Self {
        Self::with_random(Arc::new(OsSecureRandom), passkey_satisfied)
    }

    /// Creates a vault with an injected random source.
    #[must_use]
    pub fn with_random(random: Arc<dyn SecureRandom>, passkey_satisfied: bool) -> Self {
        Self {
            keys: Mutex::new(BTreeMap::new()),
            passkey_satisfied: AtomicBool::new(passkey_satisfied),
            random,
        }
    }

    /// Changes the simulated passkey state.
    pub fn set_passkey_satisfied(&self, satisfied: bool) {
        self.passkey_satisfied.store(satisfied, Ordering::SeqCst);
    }

    /// Drops a master key, as an OS would after a lock-screen reset.
    ///
    /// Returns whether a key was removed.
    pub fn evict(&self, alias: &str) -> bool {
        self.keys.lock().is_ok_and(|mut keys| keys.remove(alias).is_some())
    }

    /// Builds a cipher for the key behind `handle`.
    fn cipher(&self, handle: &MasterKeyHandle) -> Result<Aes256Gcm, VaultError> {
        let keys = self
            .keys
            .lock()
            .map_err(|_| VaultError::Unavailable("vault mutex poisoned".to_string()))?;
        let key = keys
            .get(handle.alias())
            .ok_or_else(|| VaultError::KeyMissing(handle.alias().to_string()))?;
        Aes256Gcm::new_from_slice(&key[..]).map_err(|_| VaultError::Crypto)
    }
}

impl HardwareVault for SoftwareVault {
    fn device_passkey_satisfied(&self) -> bool {
        self.passkey_satisfied.load(Ordering::SeqCst)
    }

    fn generate_master_key(&self, alias: &str) -> Result<MasterKeyHandle, VaultError> {
        let mut key = Zeroizing::new([0_u8; MASTER_KEY_LEN]);
        self.random
            .fill(&mut key[..])
            .map_err(|err| VaultError::Unavailable(err.to_string()))?;
        let mut keys = self
            .keys
            .lock()
            .map_err(|_| VaultError::Unavailable("vault mutex poisoned".to_string()))?;
        keys.insert(alias.to_string(), key);
        Ok(MasterKeyHandle::new(alias))
    }

    fn master_key(&self, alias: &str) -> Result<Option<MasterKeyHandle>, VaultError> {
        let keys = self
            .keys
            .lock()
            .map_err(|_| VaultError::Unavailable("vault mutex poisoned".to_string()))?;
        Ok(keys.contains_key(alias).then(|| MasterKeyHandle::new(alias)))
    }

    fn encrypt(
        &self,
        key: &MasterKeyHandle,
        plaintext: &[u8],
    ) -> Result<SealedSecret, VaultError> {
        let cipher = self.cipher(key)?;
        let mut nonce = [0_u8; NONCE_LEN];
        self.random.fill(&mut nonce).map_err(|err| VaultError::Unavailable(err.to_string()))?;
        let ciphertext =
            cipher.encrypt(Nonce::from_slice(&nonce), plaintext).map_err(|_| VaultError::Crypto)?;
        Ok(SealedSecret {
            ciphertext,
            nonce: nonce.to_vec(),
        })
    }

    fn decrypt(
        &self,
        key: &MasterKeyHandle,
        sealed: &SealedSecret,
    ) -> Result<Zeroizing<Vec<u8>>, VaultError> {
        if sealed.nonce.len() != NONCE_LEN {
            return Err(VaultError::Crypto);
        }
        let cipher = self.cipher(key)?;
        cipher
            .decrypt(Nonce::from_slice(&sealed.nonce), sealed.ciphertext.as_slice())
            .map(Zeroizing::new)
            .map_err(|_| VaultError::Crypto)
    }
}

// ============================================================================
// SECTION: Tests
// ============================================================================

#[cfg(test)]
mod tests {
    #![allow(clippy::unwrap_used, reason = "Test-only assertions.")]

    use lexicon_core::HardwareVault;
    use lexicon_core::VaultError;

    use super::NONCE_LEN;
    use super::SoftwareVault;

    #[test]
    fn sealed_secret_round_trips() {
        let vault = SoftwareVault::new(true);
        let key = vault.generate_master_key("k").unwrap();
        let sealed = vault.encrypt(&key, b"secret bytes").unwrap();
        assert_eq!(sealed.nonce.len(), NONCE_LEN);
        assert_eq!(sealed.ciphertext.len(), b"secret bytes".len() + 16);
        assert_eq!(vault.decrypt(&key, &sealed).unwrap().as_slice(), b"secret bytes");
    }

    #[test]
    fn nonces_are_fresh_per_encryption() {
        let vault = SoftwareVault::new(true);
        let key = vault.generate_master_key("k").unwrap();
        let first = vault.encrypt(&key, b"same").unwrap();
        let second = vault.encrypt(&key, b"same").unwrap();
        assert_ne!(first.nonce, second.nonce);
    }

    #[test]
    fn tampering_and_eviction_fail_decryption() {
        let vault = SoftwareVault::new(true);
        let key = vault.generate_master_key("k").unwrap();
        let mut sealed = vault.encrypt(&key, b"secret").unwrap();
        sealed.ciphertext[0] ^= 0x01;
        assert!(matches!(vault.decrypt(&key, &sealed), Err(VaultError::Crypto)));

        assert!(vault.evict("k"));
        assert!(vault.master_key("k").unwrap().is_none());
        assert!(matches!(vault.decrypt(&key, &sealed), Err(VaultError::KeyMissing(_))));
    }
}

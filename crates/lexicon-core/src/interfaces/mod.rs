// crates/lexicon-core/src/interfaces/mod.rs
// ============================================================================
// Module: Lexicon Interfaces
// Description: Store contracts and the capabilities the core consumes.
// Purpose: Define the seams between the service, storage, and key vault.
// Dependencies: crate::core, rand, thiserror, zeroize
// ============================================================================

//! ## Overview
//! Storage backends implement the store traits; hosts implement
//! [`HardwareVault`] over their platform keystore. Randomness is a capability
//! ([`SecureRandom`]) rather than ambient state so the key lifecycle can be
//! exercised with fakes.
//!
//! All store methods are synchronous and may block on I/O; the async service
//! façade moves them onto blocking workers.

// ============================================================================
// SECTION: Imports
// ============================================================================

use rand::RngCore;
use rand::rngs::OsRng;
use thiserror::Error;
use zeroize::Zeroizing;

use crate::core::ClipboardItem;
use crate::core::ClipboardItemId;
use crate::core::CustomKeyMapping;
use crate::core::InputError;
use crate::core::LanguageTag;
use crate::core::LearnedWord;
use crate::core::SourceCount;
use crate::core::Timestamp;
use crate::core::UserWordBigram;
use crate::core::UserWordFrequency;
use crate::core::WordImport;
use crate::core::WordSource;

// ============================================================================
// SECTION: Store Errors
// ============================================================================

/// Failure signal surfaced to the host for store operations.
///
/// # Invariants
/// - Variants are stable for programmatic handling.
/// - Messages never include word or clipboard text.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum StoreError {
    /// Store I/O error.
    #[error("store io error: {0}")]
    Io(String),
    /// Store data is corrupted or fails integrity checks.
    #[error("store corruption: {0}")]
    Corrupt(String),
    /// Store schema version is incompatible.
    #[error("store version mismatch: {0}")]
    VersionMismatch(String),
    /// Caller supplied invalid input.
    #[error("store invalid data: {0}")]
    Invalid(String),
    /// Storage engine reported an error.
    #[error("store error: {0}")]
    Store(String),
    /// Store could not be unlocked or its key was rejected.
    #[error("store encryption error: {0}")]
    Encryption(String),
    /// Store configuration conflicts with the running instance.
    #[error("store configuration error: {0}")]
    Configuration(String),
}

impl From<InputError> for StoreError {
    fn from(error: InputError) -> Self {
        Self::Invalid(error.to_string())
    }
}

// ============================================================================
// SECTION: Vocabulary Store
// ============================================================================

/// Learned-word persistence with prefix and full-text lookup.
pub trait VocabularyStore: Send + Sync {
    /// Records one use of a word: inserts with frequency 1 or atomically
    /// increments the existing row and refreshes its recency.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError`] when validation or the write fails.
    fn learn(
        &self,
        language: &LanguageTag,
        word_normalized: &str,
        word_display: &str,
        source: WordSource,
    ) -> Result<LearnedWord, StoreError>;

    /// Merges an imported word: frequencies are summed and `last_used` takes
    /// the later of the two timestamps.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError`] when validation or the write fails.
    fn import_with_merge(&self, word: &WordImport) -> Result<LearnedWord, StoreError>;

    /// Merges a batch of imported words in one all-or-nothing unit.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError`] when any record is invalid or the write fails;
    /// no record is applied in that case.
    fn import_batch(&self, words: &[WordImport]) -> Result<usize, StoreError>;

    /// Returns words starting with `prefix` with `frequency >= min_frequency`,
    /// most frequent then most recent first.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError`] when the query fails.
    fn suggest_prefix(
        &self,
        language: &LanguageTag,
        prefix: &str,
        limit: usize,
        min_frequency: u64,
    ) -> Result<Vec<LearnedWord>, StoreError>;

    /// Runs a full-text query against the search index, most frequent first.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError`] when the query fails.
    fn search_fuzzy(
        &self,
        language: &LanguageTag,
        query: &str,
        limit: usize,
    ) -> Result<Vec<LearnedWord>, StoreError>;

    /// Looks up a single word.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError`] when the query fails.
    fn get_word(
        &self,
        language: &LanguageTag,
        word_normalized: &str,
    ) -> Result<Option<LearnedWord>, StoreError>;

    /// Deletes a word and its search index entry.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError`] when the write fails.
    fn delete_word(&self, language: &LanguageTag, word_normalized: &str)
    -> Result<bool, StoreError>;

    /// Deletes every word of a language.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError`] when the write fails.
    fn clear_language(&self, language: &LanguageTag) -> Result<u64, StoreError>;

    /// Deletes every learned word.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError`] when the write fails.
    fn clear_all(&self) -> Result<u64, StoreError>;

    /// Removes words used exactly once whose `last_used` is before `cutoff`.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError`] when the write fails.
    fn cleanup(&self, cutoff: Timestamp) -> Result<u64, StoreError>;

    /// Returns every word of a language, most frequent first.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError`] when the query fails.
    fn export_language(&self, language: &LanguageTag) -> Result<Vec<LearnedWord>, StoreError>;

    /// Counts all learned words.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError`] when the query fails.
    fn word_count(&self) -> Result<u64, StoreError>;

    /// Counts learned words of a language.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError`] when the query fails.
    fn word_count_by_language(&self, language: &LanguageTag) -> Result<u64, StoreError>;

    /// Average frequency across all words, or one language; `0.0` when empty.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError`] when the query fails.
    fn average_frequency(&self, language: Option<&LanguageTag>) -> Result<f64, StoreError>;

    /// Word counts grouped by source.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError`] when the query fails.
    fn count_by_source(&self) -> Result<Vec<SourceCount>, StoreError>;
}

// ============================================================================
// SECTION: Co-occurrence Store
// ============================================================================

/// Word-pair statistics for next-word prediction.
pub trait CooccurrenceStore: Send + Sync {
    /// Records one occurrence of `word_b` following `word_a`.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError`] when validation or the write fails.
    fn observe_pair(
        &self,
        language: &LanguageTag,
        word_a: &str,
        word_b: &str,
    ) -> Result<UserWordBigram, StoreError>;

    /// Returns the most frequent followers of `word_a`.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError`] when the query fails.
    fn predict(
        &self,
        language: &LanguageTag,
        word_a: &str,
        limit: usize,
    ) -> Result<Vec<String>, StoreError>;

    /// Looks up a single pair.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError`] when the query fails.
    fn get_pair(
        &self,
        language: &LanguageTag,
        word_a: &str,
        word_b: &str,
    ) -> Result<Option<UserWordBigram>, StoreError>;

    /// Counts stored pairs, optionally for one language.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError`] when the query fails.
    fn pair_count(&self, language: Option<&LanguageTag>) -> Result<u64, StoreError>;

    /// Deletes every pair of a language.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError`] when the write fails.
    fn clear_language(&self, language: &LanguageTag) -> Result<u64, StoreError>;

    /// Deletes every pair.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError`] when the write fails.
    fn clear_all(&self) -> Result<u64, StoreError>;
}

// ============================================================================
// SECTION: Frequency Overlay
// ============================================================================

/// Independently resettable per-user frequency ledger.
pub trait FrequencyOverlay: Send + Sync {
    /// Inserts with frequency 1 or atomically increments the entry.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError`] when validation or the write fails.
    fn increment_frequency(
        &self,
        language: &LanguageTag,
        word_normalized: &str,
    ) -> Result<UserWordFrequency, StoreError>;

    /// Looks up a single entry.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError`] when the query fails.
    fn get(
        &self,
        language: &LanguageTag,
        word_normalized: &str,
    ) -> Result<Option<UserWordFrequency>, StoreError>;

    /// Returns the most frequent entries of a language.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError`] when the query fails.
    fn top(&self, language: &LanguageTag, limit: usize)
    -> Result<Vec<UserWordFrequency>, StoreError>;

    /// Deletes every entry of a language.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError`] when the write fails.
    fn clear_language(&self, language: &LanguageTag) -> Result<u64, StoreError>;

    /// Deletes every entry.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError`] when the write fails.
    fn clear_all(&self) -> Result<u64, StoreError>;
}

// ============================================================================
// SECTION: Clipboard Store
// ============================================================================

/// Clipboard history with deduplication, pinning, and capacity eviction.
pub trait ClipboardStore: Send + Sync {
    /// Records copied content; duplicate content refreshes the existing item.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError`] when validation or the write fails.
    fn add(&self, content: &str) -> Result<ClipboardItem, StoreError>;

    /// Sets the pin state of an item; returns `false` when it does not exist.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError`] when the write fails.
    fn toggle_pin(&self, id: ClipboardItemId, pinned: bool) -> Result<bool, StoreError>;

    /// Deletes an item; returns `false` when it does not exist.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError`] when the write fails.
    fn delete(&self, id: ClipboardItemId) -> Result<bool, StoreError>;

    /// Deletes every unpinned item.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError`] when the write fails.
    fn clear_all_unpinned(&self) -> Result<u64, StoreError>;

    /// Returns items newest first.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError`] when the query fails.
    fn recent(&self, limit: usize) -> Result<Vec<ClipboardItem>, StoreError>;

    /// Returns pinned items newest first.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError`] when the query fails.
    fn pinned(&self) -> Result<Vec<ClipboardItem>, StoreError>;

    /// Counts unpinned items.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError`] when the query fails.
    fn unpinned_count(&self) -> Result<u64, StoreError>;
}

// ============================================================================
// SECTION: Key Mapping Store
// ============================================================================

/// One custom symbol per physical key.
pub trait KeyMappingStore: Send + Sync {
    /// Sets or replaces the mapping for `base_key`.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError`] when validation or the write fails.
    fn set(&self, base_key: &str, custom_symbol: &str) -> Result<CustomKeyMapping, StoreError>;

    /// Returns the mapping for `base_key`.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError`] when the query fails.
    fn get(&self, base_key: &str) -> Result<Option<CustomKeyMapping>, StoreError>;

    /// Returns every mapping ordered by key.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError`] when the query fails.
    fn all(&self) -> Result<Vec<CustomKeyMapping>, StoreError>;

    /// Removes the mapping for `base_key`.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError`] when the write fails.
    fn clear(&self, base_key: &str) -> Result<bool, StoreError>;

    /// Removes every mapping.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError`] when the write fails.
    fn clear_all(&self) -> Result<u64, StoreError>;
}

// ============================================================================
// SECTION: Hardware Vault
// ============================================================================

/// Key vault errors.
///
/// # Invariants
/// - Messages never include key material.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum VaultError {
    /// Vault backend is unavailable.
    #[error("key vault unavailable: {0}")]
    Unavailable(String),
    /// Requested key does not exist.
    #[error("key vault key missing: {0}")]
    KeyMissing(String),
    /// Encryption or authenticated decryption failed.
    #[error("key vault cryptographic failure")]
    Crypto,
}

/// Opaque reference to a non-exportable master key held by a vault.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MasterKeyHandle {
    /// Vault alias of the key.
    alias: String,
}

impl MasterKeyHandle {
    /// Creates a handle for a vault alias.
    #[must_use]
    pub fn new(alias: impl Into<String>) -> Self {
        Self {
            alias: alias.into(),
        }
    }

    /// Returns the vault alias.
    #[must_use]
    pub fn alias(&self) -> &str {
        &self.alias
    }
}

/// Authenticated ciphertext and the nonce it was sealed with.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SealedSecret {
    /// Ciphertext with the authentication tag appended.
    pub ciphertext: Vec<u8>,
    /// Per-encryption random nonce.
    pub nonce: Vec<u8>,
}

/// Hardware-backed key store.
pub trait HardwareVault: Send + Sync {
    /// Reports whether the device has a screen lock or other authentication
    /// factor configured.
    fn device_passkey_satisfied(&self) -> bool;

    /// Generates (or replaces) a 256-bit non-exportable master key.
    ///
    /// # Errors
    ///
    /// Returns [`VaultError`] when the vault cannot create the key.
    fn generate_master_key(&self, alias: &str) -> Result<MasterKeyHandle, VaultError>;

    /// Looks up an existing master key.
    ///
    /// # Errors
    ///
    /// Returns [`VaultError`] when the vault cannot be queried.
    fn master_key(&self, alias: &str) -> Result<Option<MasterKeyHandle>, VaultError>;

    /// Encrypts `plaintext` under the key with a fresh random nonce.
    ///
    /// # Errors
    ///
    /// Returns [`VaultError`] when encryption fails.
    fn encrypt(&self, key: &MasterKeyHandle, plaintext: &[u8])
    -> Result<SealedSecret, VaultError>;

    /// Decrypts and authenticates a sealed secret.
    ///
    /// # Errors
    ///
    /// Returns [`VaultError`] when the key is missing or authentication fails.
    fn decrypt(
        &self,
        key: &MasterKeyHandle,
        sealed: &SealedSecret,
    ) -> Result<Zeroizing<Vec<u8>>, VaultError>;
}

// ============================================================================
// SECTION: Secure Random
// ============================================================================

/// Secure random failure.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("secure random source failed: {0}")]
pub struct RandomError(pub String);

/// Cryptographically secure random byte source.
pub trait SecureRandom: Send + Sync {
    /// Fills `dest` with random bytes.
    ///
    /// # Errors
    ///
    /// Returns [`RandomError`] when the source cannot produce bytes.
    fn fill(&self, dest: &mut [u8]) -> Result<(), RandomError>;
}

/// Operating system random source.
#[derive(Debug, Clone, Copy, Default)]
pub struct OsSecureRandom;

impl SecureRandom for OsSecureRandom {
    fn fill(&self, dest: &mut [u8]) -> Result<(), RandomError> {
        OsRng.try_fill_bytes(dest).map_err(|err| RandomError(err.to_string()))
    }
}

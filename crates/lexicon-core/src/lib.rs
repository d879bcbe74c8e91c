// crates/lexicon-core/src/lib.rs
// ============================================================================
// Module: Lexicon Core
// Description: Domain model, store contracts, key vault seams, and events.
// Purpose: Shared vocabulary for the keyboard learning datastore crates.
// Dependencies: rand, serde, serde_json, sha2, thiserror, zeroize
// ============================================================================

//! ## Overview
//! Lexicon core defines the records a software keyboard learns (words,
//! word pairs, per-user frequencies, key mappings, clipboard history), the
//! store traits those records are persisted through, and the capabilities the
//! encryption key lifecycle consumes (a hardware vault and a secure random
//! source). It carries no storage engine of its own.

// ============================================================================
// SECTION: Modules
// ============================================================================

pub mod audit;
pub mod core;
pub mod interfaces;

// ============================================================================
// SECTION: Re-Exports
// ============================================================================

pub use audit::Component;
pub use audit::FileEventSink;
pub use audit::MemoryEventSink;
pub use audit::NoopEventSink;
pub use audit::Severity;
pub use audit::StderrEventSink;
pub use audit::StoreEvent;
pub use audit::StoreEventParams;
pub use audit::StoreEventSink;
pub use audit::emit;
pub use crate::core::ClipboardItem;
pub use crate::core::ClipboardItemId;
pub use crate::core::Clock;
pub use crate::core::ContentFingerprint;
pub use crate::core::CustomKeyMapping;
pub use crate::core::InputError;
pub use crate::core::LanguageTag;
pub use crate::core::LearnedWord;
pub use crate::core::ManualClock;
pub use crate::core::PASSPHRASE_LEN;
pub use crate::core::Passphrase;
pub use crate::core::SourceCount;
pub use crate::core::SystemClock;
pub use crate::core::Timestamp;
pub use crate::core::UserWordBigram;
pub use crate::core::UserWordFrequency;
pub use crate::core::WordId;
pub use crate::core::WordImport;
pub use crate::core::WordSource;
pub use crate::core::normalize_word;
pub use crate::core::redact;
pub use crate::core::redact_word_key;
pub use interfaces::ClipboardStore;
pub use interfaces::CooccurrenceStore;
pub use interfaces::FrequencyOverlay;
pub use interfaces::HardwareVault;
pub use interfaces::KeyMappingStore;
pub use interfaces::MasterKeyHandle;
pub use interfaces::OsSecureRandom;
pub use interfaces::RandomError;
pub use interfaces::SealedSecret;
pub use interfaces::SecureRandom;
pub use interfaces::StoreError;
pub use interfaces::VaultError;
pub use interfaces::VocabularyStore;

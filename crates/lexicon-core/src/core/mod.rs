// crates/lexicon-core/src/core/mod.rs
// ============================================================================
// Module: Lexicon Core Types
// Description: Domain records, identifiers, time, hashing, and secrets.
// Purpose: Group the storage-agnostic data model.
// Dependencies: crate::core::*
// ============================================================================

//! ## Overview
//! Storage-agnostic types shared by the key vault adapter, the storage engine,
//! and the async service façade.

// ============================================================================
// SECTION: Modules
// ============================================================================

pub mod hashing;
pub mod identifiers;
pub mod model;
pub mod secret;
pub mod text;
pub mod time;

// ============================================================================
// SECTION: Re-Exports
// ============================================================================

pub use hashing::ContentFingerprint;
pub use hashing::redact;
pub use hashing::redact_word_key;
pub use identifiers::ClipboardItemId;
pub use identifiers::LanguageTag;
pub use identifiers::WordId;
pub use identifiers::WordSource;
pub use model::ClipboardItem;
pub use model::CustomKeyMapping;
pub use model::LearnedWord;
pub use model::SourceCount;
pub use model::UserWordBigram;
pub use model::UserWordFrequency;
pub use model::WordImport;
pub use secret::PASSPHRASE_LEN;
pub use secret::Passphrase;
pub use text::InputError;
pub use text::normalize_word;
pub use time::Clock;
pub use time::ManualClock;
pub use time::SystemClock;
pub use time::Timestamp;

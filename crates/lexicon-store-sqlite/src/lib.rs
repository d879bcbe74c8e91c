// crates/lexicon-store-sqlite/src/lib.rs
// ============================================================================
// Module: Lexicon SQLite Store
// Description: Versioned, optionally encrypted store for keyboard learning data.
// Purpose: Implement the lexicon store traits over SQLCipher.
// Dependencies: lexicon-core, rusqlite, serde, thiserror, zeroize
// ============================================================================

//! ## Overview
//! One physical file holds every lexicon table. [`StoreEngine`] owns its only
//! connection, keys it when a passphrase is supplied, and migrates it to the
//! current schema before anything else can touch it. [`StoreRegistry`] shares
//! one engine per process and refuses requests for a differently keyed store.
//! The repository types implement the `lexicon-core` store traits on top of
//! the engine.

// ============================================================================
// SECTION: Modules
// ============================================================================

pub mod bigrams;
pub mod clipboard;
pub mod config;
pub mod encryption;
pub mod engine;
pub mod error;
pub mod key_mappings;
pub mod migrations;
pub mod overlay;
pub mod registry;
pub mod vocabulary;

// ============================================================================
// SECTION: Re-Exports
// ============================================================================

pub use bigrams::SqliteCooccurrenceStore;
pub use clipboard::MAX_UNPINNED_CLIPBOARD_ITEMS;
pub use clipboard::SqliteClipboardStore;
pub use config::SqliteStoreConfig;
pub use config::SqliteStoreMode;
pub use config::SqliteSyncMode;
pub use config::journal_side_files;
pub use encryption::StoreFingerprint;
pub use encryption::export_plaintext_to_encrypted;
pub use encryption::is_plaintext_database;
pub use encryption::read_fingerprint;
pub use engine::EncryptionMode;
pub use engine::StoreEngine;
pub use engine::StoreRuntime;
pub use error::SqliteStoreError;
pub use key_mappings::SqliteKeyMappingStore;
pub use migrations::SCHEMA_VERSION;
pub use overlay::SqliteFrequencyOverlay;
pub use registry::StoreRegistry;
pub use vocabulary::DEFAULT_SUGGESTION_MIN_FREQUENCY;
pub use vocabulary::SqliteVocabularyStore;

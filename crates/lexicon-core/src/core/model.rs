// crates/lexicon-core/src/core/model.rs
// ============================================================================
// Module: Lexicon Data Model
// Description: Learned words, frequency overlays, bigrams, key mappings, clipboard items.
// Purpose: Owned snapshots of stored rows returned to hosts.
// Dependencies: serde, crate::core::{identifiers, time}
// ============================================================================

//! ## Overview
//! Plain data records mirroring the persisted entities. Values handed to the
//! host are owned copies; nothing here references live storage.

// ============================================================================
// SECTION: Imports
// ============================================================================

use serde::Deserialize;
use serde::Serialize;

use crate::core::identifiers::ClipboardItemId;
use crate::core::identifiers::LanguageTag;
use crate::core::identifiers::WordId;
use crate::core::identifiers::WordSource;
use crate::core::time::Timestamp;

// ============================================================================
// SECTION: Vocabulary
// ============================================================================

/// A word the keyboard has learned.
///
/// # Invariants
/// - At most one record per `(language, word_normalized)`.
/// - `frequency >= 1`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LearnedWord {
    /// Storage row id (shared with the search index entry).
    pub id: WordId,
    /// Language partition.
    pub language: LanguageTag,
    /// Lookup form of the word.
    pub word_normalized: String,
    /// Form shown to the user.
    pub word_display: String,
    /// Number of observed uses.
    pub frequency: u64,
    /// Time of the most recent use.
    pub last_used: Timestamp,
    /// How the word most recently entered the vocabulary.
    pub source: WordSource,
}

/// A word record supplied to bulk import or restore.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct WordImport {
    /// Language partition.
    pub language: LanguageTag,
    /// Lookup form of the word.
    pub word_normalized: String,
    /// Form shown to the user.
    pub word_display: String,
    /// Frequency to merge; must be at least 1.
    pub frequency: u64,
    /// Last-used time carried by the import.
    pub last_used: Timestamp,
    /// Provenance recorded for newly inserted rows.
    pub source: WordSource,
}

impl From<LearnedWord> for WordImport {
    fn from(word: LearnedWord) -> Self {
        Self {
            language: word.language,
            word_normalized: word.word_normalized,
            word_display: word.word_display,
            frequency: word.frequency,
            last_used: word.last_used,
            source: WordSource::Restored,
        }
    }
}

/// Per-source row count.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct SourceCount {
    /// Word source.
    pub source: WordSource,
    /// Number of learned words with this source.
    pub count: u64,
}

// ============================================================================
// SECTION: Overlay and Bigrams
// ============================================================================

/// Per-user frequency ledger entry, independent of [`LearnedWord`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UserWordFrequency {
    /// Storage row id.
    pub id: i64,
    /// Language partition.
    pub language: LanguageTag,
    /// Lookup form of the word.
    pub word_normalized: String,
    /// Number of observed uses.
    pub frequency: u64,
    /// Time of the most recent use.
    pub last_used: Timestamp,
}

/// Word-pair co-occurrence counter.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UserWordBigram {
    /// Storage row id.
    pub id: i64,
    /// Language partition.
    pub language: LanguageTag,
    /// Preceding word.
    pub word_a: String,
    /// Following word.
    pub word_b: String,
    /// Number of observed occurrences.
    pub frequency: u64,
    /// Time of the most recent occurrence.
    pub last_used: Timestamp,
}

// ============================================================================
// SECTION: Key Mappings
// ============================================================================

/// Custom symbol override for a physical key.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CustomKeyMapping {
    /// Physical key label (primary key).
    pub base_key: String,
    /// Symbol emitted instead of the default.
    pub custom_symbol: String,
    /// Time the mapping was last set.
    pub created_at: Timestamp,
}

// ============================================================================
// SECTION: Clipboard
// ============================================================================

/// Retained clipboard entry.
///
/// # Invariants
/// - `content_hash` is unique across stored items.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ClipboardItem {
    /// Storage row id.
    pub id: ClipboardItemId,
    /// Copied text.
    pub content: String,
    /// Lowercase hex SHA-256 of `content`.
    pub content_hash: String,
    /// Time of the most recent copy of this content.
    pub timestamp: Timestamp,
    /// Pinned items are exempt from eviction.
    pub is_pinned: bool,
}

// crates/lexicon-core/src/core/identifiers.rs
// ============================================================================
// Module: Lexicon Identifiers
// Description: Language tags, row identifiers, and word provenance labels.
// Purpose: Provide strongly typed, serializable keys with stable string forms.
// Dependencies: serde, crate::core::text
// ============================================================================

//! ## Overview
//! Identifiers used as storage keys. Language tags are validated on
//! construction because they partition every per-language table; row ids are
//! opaque integers assigned by the storage engine.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::fmt;
use std::str::FromStr;

use serde::Deserialize;
use serde::Serialize;

use crate::core::text::InputError;
use crate::core::text::MAX_LANGUAGE_TAG_BYTES;

// ============================================================================
// SECTION: Language Tag
// ============================================================================

/// BCP 47 style language tag partitioning vocabulary and bigram data.
///
/// # Invariants
/// - Non-empty, at most [`MAX_LANGUAGE_TAG_BYTES`] bytes.
/// - Only ASCII alphanumerics, `-`, and `_`.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct LanguageTag(String);

impl LanguageTag {
    /// Creates a validated language tag.
    ///
    /// # Errors
    ///
    /// Returns [`InputError`] when the tag is empty, too long, or contains
    /// characters outside the allowed set.
    pub fn new(tag: impl Into<String>) -> Result<Self, InputError> {
        let tag = tag.into();
        if tag.is_empty() {
            return Err(InputError::Empty("language tag"));
        }
        if tag.len() > MAX_LANGUAGE_TAG_BYTES {
            return Err(InputError::TooLong {
                field: "language tag",
                max: MAX_LANGUAGE_TAG_BYTES,
            });
        }
        if !tag.chars().all(|ch| ch.is_ascii_alphanumeric() || ch == '-' || ch == '_') {
            return Err(InputError::InvalidCharacters("language tag"));
        }
        Ok(Self(tag))
    }

    /// Returns the tag as a string slice.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for LanguageTag {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.0.fmt(f)
    }
}

impl TryFrom<String> for LanguageTag {
    type Error = InputError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::new(value)
    }
}

impl TryFrom<&str> for LanguageTag {
    type Error = InputError;

    fn try_from(value: &str) -> Result<Self, Self::Error> {
        Self::new(value)
    }
}

impl From<LanguageTag> for String {
    fn from(value: LanguageTag) -> Self {
        value.0
    }
}

// ============================================================================
// SECTION: Row Identifiers
// ============================================================================

/// Storage row identifier for a learned word.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct WordId(i64);

impl WordId {
    /// Wraps a raw row id.
    #[must_use]
    pub const fn from_raw(raw: i64) -> Self {
        Self(raw)
    }

    /// Returns the raw row id.
    #[must_use]
    pub const fn get(self) -> i64 {
        self.0
    }
}

impl fmt::Display for WordId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.0.fmt(f)
    }
}

/// Storage row identifier for a clipboard item.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ClipboardItemId(i64);

impl ClipboardItemId {
    /// Wraps a raw row id.
    #[must_use]
    pub const fn from_raw(raw: i64) -> Self {
        Self(raw)
    }

    /// Returns the raw row id.
    #[must_use]
    pub const fn get(self) -> i64 {
        self.0
    }
}

impl fmt::Display for ClipboardItemId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.0.fmt(f)
    }
}

// ============================================================================
// SECTION: Word Source
// ============================================================================

/// How a word entered the vocabulary.
///
/// # Invariants
/// - Labels returned by [`WordSource::as_str`] are persisted; never rename them.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum WordSource {
    /// Typed character by character by the user.
    Typed,
    /// Committed by accepting a suggestion strip entry.
    SuggestionAccepted,
    /// Brought in through a bulk import.
    Imported,
    /// Restored from a backup export.
    Restored,
}

impl WordSource {
    /// All known sources in label order.
    pub const ALL: [Self; 4] =
        [Self::Imported, Self::Restored, Self::SuggestionAccepted, Self::Typed];

    /// Returns the persisted label.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Typed => "typed",
            Self::SuggestionAccepted => "suggestion_accepted",
            Self::Imported => "imported",
            Self::Restored => "restored",
        }
    }
}

impl fmt::Display for WordSource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for WordSource {
    type Err = InputError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value {
            "typed" => Ok(Self::Typed),
            "suggestion_accepted" => Ok(Self::SuggestionAccepted),
            "imported" => Ok(Self::Imported),
            "restored" => Ok(Self::Restored),
            _ => Err(InputError::InvalidCharacters("word source")),
        }
    }
}

// ============================================================================
// SECTION: Tests
// ============================================================================

#[cfg(test)]
mod tests {
    #![allow(clippy::unwrap_used, reason = "Test-only assertions.")]

    use super::LanguageTag;
    use super::WordSource;
    use crate::core::text::InputError;

    #[test]
    fn language_tag_accepts_bcp47_shapes() {
        assert_eq!(LanguageTag::new("en").unwrap().as_str(), "en");
        assert_eq!(LanguageTag::new("pt-BR").unwrap().as_str(), "pt-BR");
        assert_eq!(LanguageTag::new("zh_Hant_TW").unwrap().as_str(), "zh_Hant_TW");
    }

    #[test]
    fn language_tag_rejects_bad_input() {
        assert!(matches!(LanguageTag::new(""), Err(InputError::Empty(_))));
        assert!(matches!(LanguageTag::new("e n"), Err(InputError::InvalidCharacters(_))));
        assert!(matches!(LanguageTag::new("a".repeat(36)), Err(InputError::TooLong { .. })));
    }

    #[test]
    fn word_source_labels_parse_back() {
        for source in WordSource::ALL {
            assert_eq!(source.as_str().parse::<WordSource>().unwrap(), source);
        }
        assert!("keyboard".parse::<WordSource>().is_err());
    }
}

// crates/lexicon-core/src/core/text.rs
// ============================================================================
// Module: Lexicon Text Limits
// Description: Input limits and normalization for words, clipboard text, and keys.
// Purpose: Reject oversized or empty inputs before they reach storage.
// Dependencies: thiserror
// ============================================================================

//! ## Overview
//! Every value written by the host passes through these checks. Limits are
//! hard caps; inputs beyond them are rejected rather than truncated so the
//! stored vocabulary never contains silently altered words.

// ============================================================================
// SECTION: Imports
// ============================================================================

use thiserror::Error;

// ============================================================================
// SECTION: Constants
// ============================================================================

/// Maximum language tag length in bytes.
pub const MAX_LANGUAGE_TAG_BYTES: usize = 35;
/// Maximum word length in characters (normalized or display form).
pub const MAX_WORD_CHARS: usize = 128;
/// Maximum clipboard content size in bytes.
pub const MAX_CLIPBOARD_CONTENT_BYTES: usize = 1024 * 1024;
/// Maximum length of a key mapping base key or symbol in characters.
pub const MAX_KEY_MAPPING_CHARS: usize = 32;

// ============================================================================
// SECTION: Errors
// ============================================================================

/// Input validation failures.
///
/// # Invariants
/// - Messages name the field, never the rejected value.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum InputError {
    /// Field was empty after trimming.
    #[error("{0} must not be empty")]
    Empty(&'static str),
    /// Field exceeded its limit.
    #[error("{field} exceeds limit of {max}")]
    TooLong {
        /// Field name.
        field: &'static str,
        /// Maximum permitted size.
        max: usize,
    },
    /// Field contained characters outside its allowed set.
    #[error("{0} contains invalid characters")]
    InvalidCharacters(&'static str),
    /// Numeric field was out of range.
    #[error("{0} is out of range")]
    OutOfRange(&'static str),
}

// ============================================================================
// SECTION: Normalization
// ============================================================================

/// Normalizes a display word into its lookup form (trimmed, lowercase).
#[must_use]
pub fn normalize_word(display: &str) -> String {
    display.trim().to_lowercase()
}

// ============================================================================
// SECTION: Validation
// ============================================================================

/// Validates a word (normalized or display form).
///
/// # Errors
///
/// Returns [`InputError`] when the word is empty, too long, or contains
/// control characters.
pub fn validate_word(field: &'static str, word: &str) -> Result<(), InputError> {
    if word.trim().is_empty() {
        return Err(InputError::Empty(field));
    }
    if word.chars().count() > MAX_WORD_CHARS {
        return Err(InputError::TooLong {
            field,
            max: MAX_WORD_CHARS,
        });
    }
    if word.chars().any(char::is_control) {
        return Err(InputError::InvalidCharacters(field));
    }
    Ok(())
}

/// Validates clipboard content size.
///
/// # Errors
///
/// Returns [`InputError`] when the content is empty or exceeds
/// [`MAX_CLIPBOARD_CONTENT_BYTES`].
pub const fn validate_clipboard_content(content: &str) -> Result<(), InputError> {
    if content.is_empty() {
        return Err(InputError::Empty("clipboard content"));
    }
    if content.len() > MAX_CLIPBOARD_CONTENT_BYTES {
        return Err(InputError::TooLong {
            field: "clipboard content",
            max: MAX_CLIPBOARD_CONTENT_BYTES,
        });
    }
    Ok(())
}

/// Validates a key mapping base key or symbol.
///
/// # Errors
///
/// Returns [`InputError`] when the value is empty or longer than
/// [`MAX_KEY_MAPPING_CHARS`].
pub fn validate_key_mapping_part(field: &'static str, value: &str) -> Result<(), InputError> {
    if value.is_empty() {
        return Err(InputError::Empty(field));
    }
    if value.chars().count() > MAX_KEY_MAPPING_CHARS {
        return Err(InputError::TooLong {
            field,
            max: MAX_KEY_MAPPING_CHARS,
        });
    }
    Ok(())
}

// ============================================================================
// SECTION: Tests
// ============================================================================

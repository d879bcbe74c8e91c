// crates/lexicon-core/src/core/hashing.rs
// ============================================================================
// Module: Lexicon Content Hashing
// Description: Clipboard fingerprints and redacted log keys.
// Purpose: Detect duplicate content without comparing full text.
// Dependencies: sha2
// ============================================================================

//! ## Overview
//! Clipboard items are deduplicated by a SHA-256 fingerprint of their raw
//! UTF-8 bytes. The same digest, truncated, is used to refer to words in
//! audit events so typed text never appears in logs.

// ============================================================================
// SECTION: Imports
// ============================================================================

use sha2::Digest;
use sha2::Sha256;

use crate::core::identifiers::LanguageTag;

// ============================================================================
// SECTION: Constants
// ============================================================================

/// Number of hex characters kept when redacting a value for logs.
const REDACTED_HEX_CHARS: usize = 12;

// ============================================================================
// SECTION: Fingerprints
// ============================================================================

/// Content fingerprint used as the clipboard uniqueness key.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct ContentFingerprint(String);

impl ContentFingerprint {
    /// Computes the fingerprint of raw content.
    #[must_use]
    pub fn of(content: &str) -> Self {
        Self(sha256_hex(content.as_bytes()))
    }

    /// Wraps a stored fingerprint value.
    #[must_use]
    pub const fn from_stored(value: String) -> Self {
        Self(value)
    }

    /// Returns the lowercase hex digest.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

/// Returns the lowercase hex SHA-256 digest of `bytes`.
#[must_use]
pub fn sha256_hex(bytes: &[u8]) -> String {
    let mut hasher = Sha256::new();
    hasher.update(bytes);
    hex_encode(&hasher.finalize())
}

// ============================================================================
// SECTION: Redaction
// ============================================================================

/// Returns a log-safe reference to a value: `sha256:<prefix>`.
#[must_use]
pub fn redact(value: &str) -> String {
    let digest = sha256_hex(value.as_bytes());
    format!("sha256:{}", &digest[.. REDACTED_HEX_CHARS])
}

/// Returns a log-safe key for a word in a language: `<tag>/sha256:<prefix>`.
#[must_use]
pub fn redact_word_key(language: &LanguageTag, word: &str) -> String {
    format!("{}/{}", language.as_str(), redact(word))
}

// ============================================================================
// SECTION: Hex Encoding
// ============================================================================

/// Encodes bytes as a lowercase hex string.
#[must_use]
pub fn hex_encode(bytes: &[u8]) -> String {
    const HEX: &[u8; 16] = b"0123456789abcdef";
    let mut out = String::with_capacity(bytes.len() * 2);
    for byte in bytes {
        out.push(HEX[(byte >> 4) as usize] as char);
        out.push(HEX[(byte & 0x0f) as usize] as char);
    }
    out
}

// ============================================================================
// SECTION: Tests
// ============================================================================

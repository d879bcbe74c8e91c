// crates/lexicon-core/src/core/secret.rs
// ============================================================================
// Module: Lexicon Store Passphrase
// Description: 32-byte store unlock secret with guaranteed wipe.
// Purpose: Carry the passphrase from the key vault to the store open path.
// Dependencies: zeroize, crate::core::hashing
// ============================================================================

//! ## Overview
//! [`Passphrase`] owns its bytes in a [`Zeroizing`] buffer, so every exit
//! path (success, error, panic unwind) wipes it. It deliberately implements
//! neither `Clone` nor `Display`, and its `Debug` output is redacted.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::fmt;

use zeroize::Zeroizing;

use crate::core::hashing::hex_encode;
use crate::core::text::InputError;

// ============================================================================
// SECTION: Constants
// ============================================================================

/// Passphrase length in bytes.
pub const PASSPHRASE_LEN: usize = 32;

// ============================================================================
// SECTION: Passphrase
// ============================================================================

/// Store unlock secret.
///
/// # Invariants
/// - Exactly [`PASSPHRASE_LEN`] bytes.
/// - Bytes are zeroed when the value is dropped.
pub struct Passphrase {
    /// Secret bytes.
    bytes: Zeroizing<[u8; PASSPHRASE_LEN]>,
}

impl Passphrase {
    /// Builds a passphrase from raw bytes, copying them into a wiped buffer.
    ///
    /// # Errors
    ///
    /// Returns [`InputError::OutOfRange`] when `bytes` is not exactly
    /// [`PASSPHRASE_LEN`] long.
    pub fn from_bytes(bytes: &[u8]) -> Result<Self, InputError> {
        if bytes.len() != PASSPHRASE_LEN {
            return Err(InputError::OutOfRange("passphrase length"));
        }
        let mut buffer = Zeroizing::new([0_u8; PASSPHRASE_LEN]);
        buffer.copy_from_slice(bytes);
        Ok(Self {
            bytes: buffer,
        })
    }

    /// Takes ownership of an already wiped buffer.
    #[must_use]
    pub const fn from_zeroizing(bytes: Zeroizing<[u8; PASSPHRASE_LEN]>) -> Self {
        Self {
            bytes,
        }
    }

    /// Returns the secret bytes.
    #[must_use]
    pub fn as_bytes(&self) -> &[u8; PASSPHRASE_LEN] {
        &self.bytes
    }

    /// Returns the lowercase hex form of the key, itself wiped on drop.
    #[must_use]
    pub fn to_hex(&self) -> Zeroizing<String> {
        Zeroizing::new(hex_encode(&self.bytes[..]))
    }
}

impl fmt::Debug for Passphrase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("Passphrase(<redacted>)")
    }
}

// ============================================================================
// SECTION: Tests
// ============================================================================

#[cfg(test)]
mod tests {
    #![allow(clippy::unwrap_used, clippy::use_debug, reason = "Test-only assertions.")]

    use super::PASSPHRASE_LEN;
    use super::Passphrase;

    #[test]
    fn passphrase_requires_exact_length() {
        assert!(Passphrase::from_bytes(&[7_u8; PASSPHRASE_LEN]).is_ok());
        assert!(Passphrase::from_bytes(&[7_u8; 16]).is_err());
    }

    #[test]
    fn passphrase_debug_is_redacted() {
        let passphrase = Passphrase::from_bytes(&[0xab_u8; PASSPHRASE_LEN]).unwrap();
        let rendered = format!("{passphrase:?}");
        assert!(!rendered.contains("ab"));
        assert_eq!(passphrase.to_hex().len(), PASSPHRASE_LEN * 2);
        assert!(passphrase.to_hex().starts_with("abab"));
    }
}

// crates/lexicon-keyvault/src/lib.rs
// ============================================================================
// Module: Lexicon Key Vault
// Description: Store passphrase lifecycle over a hardware vault boundary.
// Purpose: Produce a wiped-on-drop passphrase without persisting it in clear.
// Dependencies: aes-gcm, base64, lexicon-core, serde, serde_json, tempfile
// ============================================================================

//! ## Overview
//! [`KeyVaultAdapter`] combines a `HardwareVault`, a [`CredentialStore`] and a
//! secure random source into the passphrase used to key the store.
//! [`SoftwareVault`] implements the vault boundary in process memory for
//! tests and hosts without hardware key storage.

// ============================================================================
// SECTION: Modules
// ============================================================================

pub mod adapter;
pub mod credentials;
pub mod software;

// ============================================================================
// SECTION: Re-Exports
// ============================================================================

pub use adapter::DEFAULT_MASTER_KEY_ALIAS;
pub use adapter::KeyVaultAdapter;
pub use adapter::KeyVaultError;
pub use adapter::ObtainedPassphrase;
pub use adapter::PassphraseOrigin;
pub use adapter::SealedPassphrase;
pub use credentials::CREDENTIAL_RECORD_VERSION;
pub use credentials::CredentialError;
pub use credentials::CredentialStore;
pub use credentials::FileCredentialStore;
pub use credentials::MAX_CREDENTIAL_FILE_BYTES;
pub use credentials::MemoryCredentialStore;
pub use credentials::WrappedPassphrase;
pub use software::SoftwareVault;

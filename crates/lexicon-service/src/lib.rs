// crates/lexicon-service/src/lib.rs
// ============================================================================
// Module: Lexicon Service
// Description: Async host-facing API over the encrypted lexicon store.
// Purpose: Keep store I/O off the caller's thread and degrade reads to
//          defaults when the store is unhealthy.
// Dependencies: lexicon-config, lexicon-core, lexicon-keyvault,
//               lexicon-store-sqlite, tokio
// ============================================================================

//! ## Overview
//! [`open_service`] applies the configured encryption policy (including the
//! one-way plaintext migration) and returns a [`ServiceHandle`]. Every
//! [`LexiconService`] operation runs on the blocking pool; reads return an
//! empty or zero value on store failure, writes return the error. Both paths
//! emit an audit event with a redacted key.

// ============================================================================
// SECTION: Modules
// ============================================================================

pub mod bootstrap;
pub mod encryption;
pub mod error;
pub mod service;

// ============================================================================
// SECTION: Re-Exports
// ============================================================================

pub use bootstrap::BootstrapDeps;
pub use bootstrap::ServiceHandle;
pub use bootstrap::open_service;
pub use bootstrap::open_service_blocking;
pub use encryption::EncryptionMigrator;
pub use error::ServiceError;
pub use service::LexiconService;
pub use service::ServiceSettings;
pub use service::ServiceStores;

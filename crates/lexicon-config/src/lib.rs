// crates/lexicon-config/src/lib.rs
// ============================================================================
// Module: Lexicon Config Library
// Description: Canonical config model and validation for lexicon.toml.
// Purpose: Single source of truth for service configuration semantics.
// Dependencies: lexicon-core, lexicon-keyvault, lexicon-store-sqlite, serde, toml
// ============================================================================

//! ## Overview
//! `lexicon-config` defines the configuration model consumed by
//! `lexicon-service`: where the store lives, how it is encrypted, vocabulary
//! tuning, and where audit events go. Validation is strict and fail-closed.

// ============================================================================
// SECTION: Modules
// ============================================================================

pub mod config;

// ============================================================================
// SECTION: Re-Exports
// ============================================================================

pub use config::AuditConfig;
pub use config::AuditSinkKind;
pub use config::ConfigError;
pub use config::EncryptionConfig;
pub use config::EncryptionPolicy;
pub use config::LexiconConfig;
pub use config::VocabularyConfig;

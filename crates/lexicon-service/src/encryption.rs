// crates/lexicon-service/src/encryption.rs
// ============================================================================
// Module: Encryption Migration
// Description: One-way conversion of a plaintext store into an encrypted one.
// Purpose: Encrypt existing user data without ever risking the plaintext copy
//          before the encrypted copy is verified and its key is persisted.
// Dependencies: lexicon-core, lexicon-keyvault, lexicon-store-sqlite
// ============================================================================

//! ## Overview
//! The migration exports into a sibling temporary file, upgrades and verifies
//! the copy under the new key, persists the wrapped passphrase, and only then
//! renames the temporary file over the plaintext store. The plaintext store is
//! only ever read. Any failure before the rename removes the temporary file
//! and the credentials written by the attempt, leaving the plaintext store as
//! it was.
//!
//! The plaintext store must not be open while the migration runs.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::ffi::OsString;
use std::fs;
use std::io::ErrorKind;
use std::path::Path;
use std::path::PathBuf;

use lexicon_core::Component;
use lexicon_core::Severity;
use lexicon_core::StoreEventSink;
use lexicon_core::emit;
use lexicon_keyvault::KeyVaultAdapter;
use lexicon_store_sqlite::SCHEMA_VERSION;
use lexicon_store_sqlite::SqliteStoreConfig;
use lexicon_store_sqlite::export_plaintext_to_encrypted;
use lexicon_store_sqlite::is_plaintext_database;
use lexicon_store_sqlite::journal_side_files;
use lexicon_store_sqlite::read_fingerprint;

// ============================================================================
// SECTION: Constants
// ============================================================================

/// Suffix of the temporary export target.
const EXPORT_SUFFIX: &str = ".encrypting";

// ============================================================================
// SECTION: Migrator
// ============================================================================

/// Converts a plaintext store into an encrypted one in place.
pub struct EncryptionMigrator<'a> {
    /// Passphrase source.
    adapter: &'a KeyVaultAdapter,
    /// Store to convert.
    store: &'a SqliteStoreConfig,
    /// Audit sink.
    events: &'a dyn StoreEventSink,
}

impl<'a> EncryptionMigrator<'a> {
    /// Creates a migrator.
    #[must_use]
    pub const fn new(
        adapter: &'a KeyVaultAdapter,
        store: &'a SqliteStoreConfig,
        events: &'a dyn StoreEventSink,
    ) -> Self {
        Self {
            adapter,
            store,
            events,
        }
    }

    /// Returns the temporary export target for the store.
    #[must_use]
    pub fn export_target(&self) -> PathBuf {
        let mut name = OsString::from(self.store.path.as_os_str());
        name.push(EXPORT_SUFFIX);
        PathBuf::from(name)
    }

    /// Reports whether a migration would run: a plaintext store exists, no
    /// credentials are persisted, and the device passkey is satisfied.
    #[must_use]
    pub fn preconditions_met(&self) -> bool {
        if !self.adapter.device_passkey_satisfied() {
            return false;
        }
        if !matches!(is_plaintext_database(&self.store.path), Ok(true)) {
            return false;
        }
        matches!(self.adapter.has_persisted_credentials(), Ok(false))
    }

    /// Runs the migration. Returns `true` once the store file is encrypted
    /// and its credentials are persisted; `false` when preconditions are not
    /// met or any step failed.
    #[must_use]
    pub fn migrate_to_encrypted(&self) -> bool {
        if !self.preconditions_met() {
            self.record(Severity::Info, "encryption migration skipped: preconditions not met");
            return false;
        }
        let target = self.export_target();
        let mut persisted = false;
        match self.run(&target, &mut persisted) {
            Ok(()) => {
                self.record(Severity::Info, "plaintext store migrated to encrypted storage");
                true
            }
            Err(reason) => {
                remove_with_side_files(&target);
                if persisted && let Err(err) = self.adapter.clear_credentials() {
                    self.record(
                        Severity::Critical,
                        format!("failed to clear credentials after aborted migration: {err}"),
                    );
                }
                self.record(
                    Severity::Error,
                    format!("encryption migration aborted, plaintext store kept: {reason}"),
                );
                false
            }
        }
    }

    /// Export, verify, persist, swap. Errors after the rename are not
    /// returned: the store is encrypted at that point.
    fn run(&self, target: &Path, persisted: &mut bool) -> Result<(), String> {
        remove_with_side_files(target);
        let sealed =
            self.adapter.create_sealed_passphrase(true).map_err(|err| err.to_string())?;
        let exported = export_plaintext_to_encrypted(self.store, target, &sealed.passphrase)
            .map_err(|err| format!("export failed: {err}"))?;

        let source = read_fingerprint(&self.store.path, None)
            .map_err(|err| format!("plaintext fingerprint failed: {err}"))?;
        if source != exported {
            return Err("plaintext store changed during export".to_string());
        }
        let copy = read_fingerprint(target, Some(&sealed.passphrase))
            .map_err(|err| format!("encrypted copy unreadable: {err}"))?;
        if copy.schema_version != Some(SCHEMA_VERSION) {
            return Err("encrypted copy is not at the current schema version".to_string());
        }
        drop(sealed.passphrase);

        self.adapter.persist(&sealed.record).map_err(|err| err.to_string())?;
        *persisted = true;

        fs::rename(target, &self.store.path).map_err(|err| format!("rename failed: {err}"))?;
        for side_file in journal_side_files(&self.store.path) {
            if let Err(err) = remove_if_present(&side_file) {
                self.record(Severity::Warning, format!("stale journal file not removed: {err}"));
            }
        }
        Ok(())
    }

    /// Emits a migration event.
    fn record(&self, severity: Severity, message: impl Into<String>) {
        emit(self.events, Component::Migration, severity, "migrate_to_encrypted", None, message);
    }
}

// ============================================================================
// SECTION: Helpers
// ============================================================================

/// Removes a file, ignoring absence.
pub(crate) fn remove_if_present(path: &Path) -> std::io::Result<()> {
    match fs::remove_file(path) {
        Err(err) if err.kind() != ErrorKind::NotFound => Err(err),
        _ => Ok(()),
    }
}

/// Best-effort removal of a store file and its journal side files.
fn remove_with_side_files(path: &Path) {
    let _ = remove_if_present(path);
    for side_file in journal_side_files(path) {
        let _ = remove_if_present(&side_file);
    }
}

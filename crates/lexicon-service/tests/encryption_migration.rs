// crates/lexicon-service/tests/encryption_migration.rs
// ============================================================================
// Module: Encryption Migration Tests
// Description: Plaintext-to-encrypted conversion success and abort paths.
// Purpose: Validate that migration never loses the plaintext copy early.
// ============================================================================

//! ## Overview
//! Builds a plaintext store, then migrates it through a software vault and a
//! file credential store in the same temporary directory.

#![allow(
    clippy::panic,
    clippy::unwrap_used,
    clippy::expect_used,
    clippy::use_debug,
    reason = "Test-only assertions and helpers are permitted."
)]

use std::fs;
use std::path::Path;
use std::sync::Arc;

use lexicon_core::ClipboardStore;
use lexicon_core::LanguageTag;
use lexicon_core::MemoryEventSink;
use lexicon_core::NoopEventSink;
use lexicon_core::OsSecureRandom;
use lexicon_core::Severity;
use lexicon_core::VocabularyStore;
use lexicon_core::WordSource;
use lexicon_keyvault::CredentialError;
use lexicon_keyvault::CredentialStore;
use lexicon_keyvault::DEFAULT_MASTER_KEY_ALIAS;
use lexicon_keyvault::FileCredentialStore;
use lexicon_keyvault::KeyVaultAdapter;
use lexicon_keyvault::PassphraseOrigin;
use lexicon_keyvault::SoftwareVault;
use lexicon_keyvault::WrappedPassphrase;
use lexicon_service::EncryptionMigrator;
use lexicon_store_sqlite::EncryptionMode;
use lexicon_store_sqlite::SCHEMA_VERSION;
use lexicon_store_sqlite::SqliteClipboardStore;
use lexicon_store_sqlite::SqliteStoreConfig;
use lexicon_store_sqlite::SqliteVocabularyStore;
use lexicon_store_sqlite::StoreEngine;
use lexicon_store_sqlite::StoreRuntime;
use lexicon_store_sqlite::is_plaintext_database;
use lexicon_store_sqlite::migrations::migrate_to;
use lexicon_store_sqlite::read_fingerprint;
use rusqlite::Connection;
use tempfile::TempDir;

// ============================================================================
// SECTION: Helpers
// ============================================================================

struct Harness {
    temp: TempDir,
    config: SqliteStoreConfig,
    vault: Arc<SoftwareVault>,
    events: Arc<MemoryEventSink>,
    adapter: KeyVaultAdapter,
}

fn harness(passkey: bool) -> Harness {
    let temp = TempDir::new().unwrap();
    let config = SqliteStoreConfig::for_path(temp.path().join("lexicon.db"));
    let vault = Arc::new(SoftwareVault::new(passkey));
    let events = Arc::new(MemoryEventSink::new());
    let adapter = KeyVaultAdapter::new(
        vault.clone(),
        Arc::new(FileCredentialStore::new(temp.path().join("credentials.json"))),
        Arc::new(OsSecureRandom),
        events.clone(),
        DEFAULT_MASTER_KEY_ALIAS,
    );
    Harness {
        temp,
        config,
        vault,
        events,
        adapter,
    }
}

fn en() -> LanguageTag {
    LanguageTag::new("en").unwrap()
}

fn seed_plaintext(config: &SqliteStoreConfig) {
    let engine = Arc::new(StoreEngine::open(config.clone(), None, StoreRuntime::system()).unwrap());
    let vocabulary = SqliteVocabularyStore::new(Arc::clone(&engine));
    for _ in 0 .. 3 {
        vocabulary.learn(&en(), "keyboard", "Keyboard", WordSource::Typed).unwrap();
    }
    vocabulary.learn(&en(), "café", "Café", WordSource::Imported).unwrap();
    SqliteClipboardStore::new(Arc::clone(&engine)).add("copied text").unwrap();
    engine.close().unwrap();
}

/// Credential store whose writes always fail.
struct UnwritableCredentials;

impl CredentialStore for UnwritableCredentials {
    fn load(&self) -> Result<Option<WrappedPassphrase>, CredentialError> {
        Ok(None)
    }

    fn save(&self, _record: &WrappedPassphrase) -> Result<(), CredentialError> {
        Err(CredentialError::Io("read-only volume".to_string()))
    }

    fn clear(&self) -> Result<(), CredentialError> {
        Ok(())
    }
}

/// Writes a plaintext store that stops at schema `version` with one word.
fn seed_older_plaintext(config: &SqliteStoreConfig, version: i64) {
    let mut conn = Connection::open(&config.path).unwrap();
    assert_eq!(migrate_to(&mut conn, version, &NoopEventSink).unwrap(), version);
    conn.execute(
        "INSERT INTO learned_words
             (language_tag, word_normalized, word_display, frequency, last_used, source)
         VALUES ('en', 'legacy', 'Legacy', 2, 10, 'typed')",
        [],
    )
    .unwrap();
    conn.close().unwrap();
}

fn plaintext_version(path: &Path) -> i64 {
    let conn = Connection::open(path).unwrap();
    conn.query_row("SELECT version FROM store_meta LIMIT 1", [], |row| row.get(0)).unwrap()
}

fn credentials_path(temp: &TempDir) -> std::path::PathBuf {
    temp.path().join("credentials.json")
}

fn leftovers(dir: &Path) -> Vec<String> {
    fs::read_dir(dir)
        .unwrap()
        .map(|entry| entry.unwrap().file_name().to_string_lossy().into_owned())
        .filter(|name| name.contains(".encrypting"))
        .collect()
}

// ============================================================================
// SECTION: Success
// ============================================================================

#[test]
fn migration_encrypts_in_place_and_preserves_data() {
    let h = harness(true);
    seed_plaintext(&h.config);
    let migrator = EncryptionMigrator::new(&h.adapter, &h.config, h.events.as_ref());
    assert!(migrator.preconditions_met());
    assert!(migrator.migrate_to_encrypted());

    assert!(!is_plaintext_database(&h.config.path).unwrap());
    assert!(credentials_path(&h.temp).exists());
    assert!(leftovers(h.temp.path()).is_empty());
    assert!(h.events.contains("migrate_to_encrypted", Severity::Info));

    let obtained = h.adapter.obtain_passphrase().unwrap().unwrap();
    assert_eq!(obtained.origin, PassphraseOrigin::Unwrapped);
    let engine = Arc::new(
        StoreEngine::open(h.config.clone(), Some(obtained.passphrase), StoreRuntime::system())
            .unwrap(),
    );
    assert_eq!(engine.encryption_mode(), EncryptionMode::Encrypted);
    let vocabulary = SqliteVocabularyStore::new(Arc::clone(&engine));
    let word = vocabulary.get_word(&en(), "keyboard").unwrap().unwrap();
    assert_eq!(word.frequency, 3);
    assert_eq!(vocabulary.search_fuzzy(&en(), "cafe", 5).unwrap().len(), 1);
    let clipboard = SqliteClipboardStore::new(engine).recent(5).unwrap();
    assert_eq!(clipboard[0].content, "copied text");
}

#[test]
fn second_migration_is_a_no_op() {
    let h = harness(true);
    seed_plaintext(&h.config);
    let migrator = EncryptionMigrator::new(&h.adapter, &h.config, h.events.as_ref());
    assert!(migrator.migrate_to_encrypted());
    assert!(!migrator.preconditions_met());
    assert!(!migrator.migrate_to_encrypted());
}

#[test]
fn migration_upgrades_an_older_plaintext_store() {
    let h = harness(true);
    seed_older_plaintext(&h.config, 3);
    let migrator = EncryptionMigrator::new(&h.adapter, &h.config, h.events.as_ref());
    assert!(migrator.migrate_to_encrypted());

    let obtained = h.adapter.obtain_passphrase().unwrap().unwrap();
    let print = read_fingerprint(&h.config.path, Some(&obtained.passphrase)).unwrap();
    assert_eq!(print.schema_version, Some(SCHEMA_VERSION));
    assert_eq!(print.row_counts.get("learned_words"), Some(&1));
    assert_eq!(print.row_counts.get("user_word_frequencies"), Some(&1));
}

// ============================================================================
// SECTION: Skipped and Aborted
// ============================================================================

#[test]
fn migration_skipped_without_passkey() {
    let h = harness(false);
    seed_plaintext(&h.config);
    let migrator = EncryptionMigrator::new(&h.adapter, &h.config, h.events.as_ref());
    assert!(!migrator.migrate_to_encrypted());
    assert!(is_plaintext_database(&h.config.path).unwrap());
    assert!(!credentials_path(&h.temp).exists());
}

#[test]
fn migration_skipped_when_credentials_exist() {
    let h = harness(true);
    seed_plaintext(&h.config);
    let existing = h.adapter.obtain_passphrase().unwrap().unwrap();
    assert_eq!(existing.origin, PassphraseOrigin::Generated);
    let before = fs::read(credentials_path(&h.temp)).unwrap();

    let migrator = EncryptionMigrator::new(&h.adapter, &h.config, h.events.as_ref());
    assert!(!migrator.migrate_to_encrypted());
    assert!(is_plaintext_database(&h.config.path).unwrap());
    assert_eq!(fs::read(credentials_path(&h.temp)).unwrap(), before);
}

#[test]
fn migration_skipped_without_plaintext_store() {
    let h = harness(true);
    let migrator = EncryptionMigrator::new(&h.adapter, &h.config, h.events.as_ref());
    assert!(!migrator.migrate_to_encrypted());
    assert!(!h.config.path.exists());
}

#[test]
fn failed_export_keeps_plaintext_and_no_credentials() {
    let h = harness(true);
    seed_plaintext(&h.config);
    let migrator = EncryptionMigrator::new(&h.adapter, &h.config, h.events.as_ref());
    fs::create_dir(migrator.export_target()).unwrap();

    assert!(!migrator.migrate_to_encrypted());
    assert!(is_plaintext_database(&h.config.path).unwrap());
    assert!(!credentials_path(&h.temp).exists());
    assert!(h.events.contains("migrate_to_encrypted", Severity::Error));

    let engine = Arc::new(StoreEngine::open(h.config.clone(), None, StoreRuntime::system()).unwrap());
    let vocabulary = SqliteVocabularyStore::new(engine);
    assert_eq!(vocabulary.word_count().unwrap(), 2);
}

#[test]
fn lost_master_key_after_migration_regenerates() {
    let h = harness(true);
    seed_plaintext(&h.config);
    let migrator = EncryptionMigrator::new(&h.adapter, &h.config, h.events.as_ref());
    assert!(migrator.migrate_to_encrypted());

    assert!(h.vault.evict(DEFAULT_MASTER_KEY_ALIAS));
    let obtained = h.adapter.obtain_passphrase().unwrap().unwrap();
    assert_eq!(obtained.origin, PassphraseOrigin::Regenerated);
    let Err(err) =
        StoreEngine::open(h.config.clone(), Some(obtained.passphrase), StoreRuntime::system())
    else {
        panic!("expected the old store to be unreadable under a new key");
    };
    assert!(matches!(err, lexicon_store_sqlite::SqliteStoreError::Encryption(_)));
}

#[test]
fn failed_credential_save_leaves_older_plaintext_untouched() {
    let h = harness(true);
    seed_older_plaintext(&h.config, 3);
    let original = fs::read(&h.config.path).unwrap();
    let adapter = KeyVaultAdapter::new(
        h.vault.clone(),
        Arc::new(UnwritableCredentials),
        Arc::new(OsSecureRandom),
        h.events.clone(),
        DEFAULT_MASTER_KEY_ALIAS,
    );

    let migrator = EncryptionMigrator::new(&adapter, &h.config, h.events.as_ref());
    assert!(!migrator.migrate_to_encrypted());
    assert!(h.events.contains("migrate_to_encrypted", Severity::Error));

    assert_eq!(fs::read(&h.config.path).unwrap(), original);
    assert!(is_plaintext_database(&h.config.path).unwrap());
    assert_eq!(plaintext_version(&h.config.path), 3);
    assert!(leftovers(h.temp.path()).is_empty());
}

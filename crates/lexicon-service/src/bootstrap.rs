// crates/lexicon-service/src/bootstrap.rs
// ============================================================================
// Module: Service Bootstrap
// Description: Resolves the encryption policy and opens the shared store.
// Purpose: Turn configuration plus vault capabilities into a ready service.
// Dependencies: lexicon-config, lexicon-core, lexicon-keyvault,
//               lexicon-store-sqlite, tokio
// ============================================================================

//! ## Overview
//! Bootstrap decides, once per process, whether the store is opened keyed or
//! in plaintext:
//! - `disabled`: always plaintext.
//! - `preferred`: keyed when the device passkey is satisfied; an existing
//!   plaintext store is migrated first when allowed, otherwise kept.
//! - `required`: keyed or nothing.
//!
//! When the adapter had to generate a passphrase while a keyed store file
//! already exists, that file can never be opened again. It is renamed aside
//! (`<name>.unrecoverable-<millis>`) instead of being deleted, and a critical
//! event is emitted.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::ffi::OsString;
use std::fs;
use std::path::Path;
use std::path::PathBuf;
use std::sync::Arc;

use lexicon_config::EncryptionPolicy;
use lexicon_config::LexiconConfig;
use lexicon_core::Clock;
use lexicon_core::Component;
use lexicon_core::HardwareVault;
use lexicon_core::OsSecureRandom;
use lexicon_core::Passphrase;
use lexicon_core::SecureRandom;
use lexicon_core::Severity;
use lexicon_core::StoreEventSink;
use lexicon_core::SystemClock;
use lexicon_core::Timestamp;
use lexicon_core::emit;
use lexicon_keyvault::FileCredentialStore;
use lexicon_keyvault::KeyVaultAdapter;
use lexicon_keyvault::PassphraseOrigin;
use lexicon_store_sqlite::EncryptionMode;
use lexicon_store_sqlite::StoreEngine;
use lexicon_store_sqlite::StoreRegistry;
use lexicon_store_sqlite::StoreRuntime;
use lexicon_store_sqlite::is_plaintext_database;
use lexicon_store_sqlite::journal_side_files;

use crate::encryption::EncryptionMigrator;
use crate::encryption::remove_if_present;
use crate::error::ServiceError;
use crate::service::LexiconService;
use crate::service::ServiceSettings;

// ============================================================================
// SECTION: Inputs and Outputs
// ============================================================================

/// Capabilities injected into bootstrap.
#[derive(Clone)]
pub struct BootstrapDeps {
    /// Hardware key vault.
    pub vault: Arc<dyn HardwareVault>,
    /// Passphrase random source.
    pub random: Arc<dyn SecureRandom>,
    /// Store clock.
    pub clock: Arc<dyn Clock>,
    /// Audit sink.
    pub events: Arc<dyn StoreEventSink>,
}

impl BootstrapDeps {
    /// Uses the operating system random source and the system clock.
    #[must_use]
    pub fn new(vault: Arc<dyn HardwareVault>, events: Arc<dyn StoreEventSink>) -> Self {
        Self {
            vault,
            random: Arc::new(OsSecureRandom),
            clock: Arc::new(SystemClock),
            events,
        }
    }
}

/// A running service and the handles needed to manage it.
pub struct ServiceHandle {
    /// Host-facing API.
    pub service: LexiconService,
    /// Registry holding the open engine.
    pub registry: Arc<StoreRegistry>,
    /// The open engine.
    pub engine: Arc<StoreEngine>,
    /// Mode the store was opened with.
    pub encryption: EncryptionMode,
    /// How the passphrase was obtained, for keyed stores.
    pub passphrase_origin: Option<PassphraseOrigin>,
    /// Where an unrecoverable store file was moved, if one was.
    pub quarantined: Option<PathBuf>,
}

/// Outcome of the encryption decision.
struct KeyDecision {
    /// Passphrase to key the store with.
    passphrase: Option<Passphrase>,
    /// Passphrase provenance.
    origin: Option<PassphraseOrigin>,
    /// Quarantine location of an unreadable store.
    quarantined: Option<PathBuf>,
}

impl KeyDecision {
    /// Plaintext open.
    const fn plaintext() -> Self {
        Self {
            passphrase: None,
            origin: None,
            quarantined: None,
        }
    }
}

// ============================================================================
// SECTION: Entry Points
// ============================================================================

/// Opens the service on the blocking pool.
///
/// # Errors
///
/// Returns [`ServiceError`] when the policy cannot be satisfied or the store
/// cannot be opened.
pub async fn open_service(
    config: LexiconConfig,
    deps: BootstrapDeps,
) -> Result<ServiceHandle, ServiceError> {
    tokio::task::spawn_blocking(move || open_service_blocking(&config, &deps))
        .await
        .map_err(|err| ServiceError::Io(format!("bootstrap worker failed: {err}")))?
}

/// Opens the service on the calling thread.
///
/// # Errors
///
/// Returns [`ServiceError`] when the policy cannot be satisfied or the store
/// cannot be opened.
pub fn open_service_blocking(
    config: &LexiconConfig,
    deps: &BootstrapDeps,
) -> Result<ServiceHandle, ServiceError> {
    config.validate()?;
    let registry = Arc::new(StoreRegistry::new(StoreRuntime::new(
        Arc::clone(&deps.clock),
        Arc::clone(&deps.events),
    )));
    let decision = decide_encryption(config, deps)?;
    let engine = registry.get_or_open(&config.store, decision.passphrase)?;
    let settings = ServiceSettings {
        suggestion_min_frequency: config.vocabulary.suggestion_min_frequency,
        cleanup_max_age: config.vocabulary.cleanup_max_age(),
    };
    let service = LexiconService::from_engine(&engine, settings);
    emit(
        deps.events.as_ref(),
        Component::Service,
        Severity::Info,
        "open_service",
        None,
        format!("service ready ({} store)", engine.encryption_mode().as_str()),
    );
    Ok(ServiceHandle {
        service,
        encryption: engine.encryption_mode(),
        registry,
        engine,
        passphrase_origin: decision.origin,
        quarantined: decision.quarantined,
    })
}

// ============================================================================
// SECTION: Policy
// ============================================================================

/// Applies the encryption policy.
fn decide_encryption(
    config: &LexiconConfig,
    deps: &BootstrapDeps,
) -> Result<KeyDecision, ServiceError> {
    let policy = config.encryption.policy;
    if policy == EncryptionPolicy::Disabled {
        return Ok(KeyDecision::plaintext());
    }
    let adapter = KeyVaultAdapter::new(
        Arc::clone(&deps.vault),
        Arc::new(FileCredentialStore::new(config.encryption.credentials_path.clone())),
        Arc::clone(&deps.random),
        Arc::clone(&deps.events),
        config.encryption.master_key_alias.clone(),
    );
    let events = deps.events.as_ref();
    let store_path = &config.store.path;

    if is_plaintext_database(store_path)? {
        let migrated = config.encryption.migrate_plaintext
            && EncryptionMigrator::new(&adapter, &config.store, events).migrate_to_encrypted();
        if !migrated {
            return plaintext_fallback(policy, events, "existing plaintext store kept");
        }
    }

    let obtained = match adapter.obtain_passphrase() {
        Ok(Some(obtained)) => obtained,
        Ok(None) => return plaintext_fallback(policy, events, "device passkey not satisfied"),
        Err(err) if policy == EncryptionPolicy::Preferred && !store_path.exists() => {
            emit(
                events,
                Component::KeyVault,
                Severity::Error,
                "obtain_passphrase",
                None,
                format!("passphrase unavailable: {err}"),
            );
            return plaintext_fallback(policy, events, "key vault unavailable");
        }
        Err(err) => return Err(err.into()),
    };

    let quarantined = if obtained.origin != PassphraseOrigin::Unwrapped && store_path.exists() {
        Some(quarantine_store(store_path, deps.clock.now(), events)?)
    } else {
        None
    };
    Ok(KeyDecision {
        passphrase: Some(obtained.passphrase),
        origin: Some(obtained.origin),
        quarantined,
    })
}

/// Falls back to plaintext when the policy allows it.
fn plaintext_fallback(
    policy: EncryptionPolicy,
    events: &dyn StoreEventSink,
    reason: &str,
) -> Result<KeyDecision, ServiceError> {
    if policy == EncryptionPolicy::Required {
        emit(events, Component::Service, Severity::Critical, "open_service", None, reason);
        return Err(ServiceError::EncryptionRequired(reason.to_string()));
    }
    emit(
        events,
        Component::Service,
        Severity::Warning,
        "open_service",
        None,
        format!("opening unencrypted store: {reason}"),
    );
    Ok(KeyDecision::plaintext())
}

/// Moves a store that can no longer be decrypted out of the way.
fn quarantine_store(
    path: &Path,
    now: Timestamp,
    events: &dyn StoreEventSink,
) -> Result<PathBuf, ServiceError> {
    let mut name = OsString::from(path.as_os_str());
    name.push(format!(".unrecoverable-{}", now.as_unix_millis()));
    let target = PathBuf::from(name);
    fs::rename(path, &target).map_err(|err| ServiceError::Io(err.to_string()))?;
    for side_file in journal_side_files(path) {
        remove_if_present(&side_file).map_err(|err| ServiceError::Io(err.to_string()))?;
    }
    emit(
        events,
        Component::Service,
        Severity::Critical,
        "open_service",
        None,
        "store passphrase was replaced; unreadable store moved aside and a new store created",
    );
    Ok(target)
}

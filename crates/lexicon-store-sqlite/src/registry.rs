// crates/lexicon-store-sqlite/src/registry.rs
// ============================================================================
// Module: Store Registry
// Description: Construct-once holder for the process's store engine.
// Purpose: Share one engine and reject requests for a differently keyed store.
// Dependencies: lexicon-core
// ============================================================================

//! ## Overview
//! A [`StoreRegistry`] is created once by the host and passed to whatever
//! needs the store. The first [`StoreRegistry::get_or_open`] call opens the
//! engine while holding the registry mutex; concurrent callers wait and then
//! receive the same `Arc`. Every later request must ask for the same file and
//! the same encryption mode, otherwise it fails fast instead of opening a
//! second store and splitting the user's data.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::sync::Arc;
use std::sync::Mutex;

use lexicon_core::Component;
use lexicon_core::Passphrase;
use lexicon_core::Severity;
use lexicon_core::emit;

use crate::config::SqliteStoreConfig;
use crate::engine::EncryptionMode;
use crate::engine::StoreEngine;
use crate::engine::StoreRuntime;
use crate::error::SqliteStoreError;

// ============================================================================
// SECTION: Registry
// ============================================================================

/// Holder of the single open store.
///
/// # Invariants
/// - At most one engine is open through a registry at a time.
/// - Once open, the engine's path and encryption mode never change until
///   [`StoreRegistry::reset`].
pub struct StoreRegistry {
    /// Collaborators handed to the engine on open.
    runtime: StoreRuntime,
    /// The open engine, if any.
    slot: Mutex<Option<Arc<StoreEngine>>>,
}

impl StoreRegistry {
    /// Creates an empty registry.
    #[must_use]
    pub const fn new(runtime: StoreRuntime) -> Self {
        Self {
            runtime,
            slot: Mutex::new(None),
        }
    }

    /// Returns the open engine, opening it on first use.
    ///
    /// The passphrase is dropped (and wiped) before this returns, whether the
    /// engine was opened, reused, or rejected.
    ///
    /// # Errors
    ///
    /// Returns [`SqliteStoreError::Configuration`] when an engine is already
    /// open for another path or encryption mode, or the open error otherwise.
    pub fn get_or_open(
        &self,
        config: &SqliteStoreConfig,
        passphrase: Option<Passphrase>,
    ) -> Result<Arc<StoreEngine>, SqliteStoreError> {
        let requested = EncryptionMode::for_passphrase(passphrase.as_ref());
        let mut slot = self
            .slot
            .lock()
            .map_err(|_| SqliteStoreError::Io("store registry mutex poisoned".to_string()))?;
        if let Some(engine) = slot.as_ref() {
            drop(passphrase);
            return self.check_consistent(engine, config, requested).map(|()| Arc::clone(engine));
        }
        let engine = Arc::new(StoreEngine::open(config.clone(), passphrase, self.runtime.clone())?);
        *slot = Some(Arc::clone(&engine));
        Ok(engine)
    }

    /// Closes and forgets the open engine.
    ///
    /// Intended for test isolation and controlled re-initialization such as
    /// swapping in a freshly encrypted file.
    ///
    /// # Errors
    ///
    /// Returns [`SqliteStoreError`] when the engine fails to close.
    pub fn reset(&self) -> Result<(), SqliteStoreError> {
        let mut slot = self
            .slot
            .lock()
            .map_err(|_| SqliteStoreError::Io("store registry mutex poisoned".to_string()))?;
        if let Some(engine) = slot.take() {
            engine.close()?;
        }
        Ok(())
    }

    /// Rejects requests that disagree with the open engine.
    fn check_consistent(
        &self,
        engine: &StoreEngine,
        config: &SqliteStoreConfig,
        requested: EncryptionMode,
    ) -> Result<(), SqliteStoreError> {
        let message = if engine.encryption_mode() != requested {
            format!(
                "store already open as {}; {} requested",
                engine.encryption_mode().as_str(),
                requested.as_str()
            )
        } else if engine.path() != config.path.as_path() {
            "store already open at a different path".to_string()
        } else {
            return Ok(());
        };
        emit(
            self.runtime.events.as_ref(),
            Component::StorageEngine,
            Severity::Critical,
            "get_or_open",
            None,
            message.clone(),
        );
        Err(SqliteStoreError::Configuration(message))
    }
}

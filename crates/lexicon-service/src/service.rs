// crates/lexicon-service/src/service.rs
// ============================================================================
// Module: Lexicon Service
// Description: Async host-facing API over the lexicon stores.
// Purpose: Run store work off the async executor and apply the degradation
//          policy: reads fall back to defaults, writes report errors.
// Dependencies: lexicon-core, lexicon-store-sqlite, tokio
// ============================================================================

//! ## Overview
//! Every operation moves its arguments into a closure executed on
//! `tokio::task::spawn_blocking`. The store connection mutex is only taken
//! inside that closure and never held across an `.await`.
//!
//! Reads never fail from the host's point of view: a store fault yields the
//! empty or zero value and an error event. Writes return [`StoreError`] so the
//! host can decide whether the keystroke or copy event matters. Every fault is
//! emitted with a redacted key; clipboard content is never logged.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::sync::Arc;
use std::time::Duration;

use lexicon_core::ClipboardItem;
use lexicon_core::ClipboardItemId;
use lexicon_core::ClipboardStore;
use lexicon_core::Clock;
use lexicon_core::Component;
use lexicon_core::CooccurrenceStore;
use lexicon_core::CustomKeyMapping;
use lexicon_core::FrequencyOverlay;
use lexicon_core::KeyMappingStore;
use lexicon_core::LanguageTag;
use lexicon_core::LearnedWord;
use lexicon_core::Severity;
use lexicon_core::SourceCount;
use lexicon_core::StoreError;
use lexicon_core::StoreEventSink;
use lexicon_core::UserWordBigram;
use lexicon_core::UserWordFrequency;
use lexicon_core::VocabularyStore;
use lexicon_core::WordImport;
use lexicon_core::WordSource;
use lexicon_core::emit;
use lexicon_core::normalize_word;
use lexicon_core::redact;
use lexicon_core::redact_word_key;
use lexicon_store_sqlite::DEFAULT_SUGGESTION_MIN_FREQUENCY;
use lexicon_store_sqlite::SqliteClipboardStore;
use lexicon_store_sqlite::SqliteCooccurrenceStore;
use lexicon_store_sqlite::SqliteFrequencyOverlay;
use lexicon_store_sqlite::SqliteKeyMappingStore;
use lexicon_store_sqlite::SqliteVocabularyStore;
use lexicon_store_sqlite::StoreEngine;

// ============================================================================
// SECTION: Settings
// ============================================================================

/// Default age after which single-use words are cleaned up (90 days).
const DEFAULT_CLEANUP_MAX_AGE: Duration = Duration::from_secs(90 * 86_400);

/// Tuning applied by the service on top of the raw stores.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ServiceSettings {
    /// Minimum frequency for prefix suggestions.
    pub suggestion_min_frequency: u64,
    /// Age after which single-use words are removed by cleanup.
    pub cleanup_max_age: Duration,
}

impl Default for ServiceSettings {
    fn default() -> Self {
        Self {
            suggestion_min_frequency: DEFAULT_SUGGESTION_MIN_FREQUENCY,
            cleanup_max_age: DEFAULT_CLEANUP_MAX_AGE,
        }
    }
}

/// Store implementations backing a service.
#[derive(Clone)]
pub struct ServiceStores {
    /// Learned words.
    pub vocabulary: Arc<dyn VocabularyStore>,
    /// Word pairs.
    pub bigrams: Arc<dyn CooccurrenceStore>,
    /// Per-user frequency ledger.
    pub overlay: Arc<dyn FrequencyOverlay>,
    /// Clipboard history.
    pub clipboard: Arc<dyn ClipboardStore>,
    /// Custom key symbols.
    pub key_mappings: Arc<dyn KeyMappingStore>,
}

impl ServiceStores {
    /// Builds the `SQLite` repositories over one engine.
    #[must_use]
    pub fn sqlite(engine: &Arc<StoreEngine>) -> Self {
        Self {
            vocabulary: Arc::new(SqliteVocabularyStore::new(Arc::clone(engine))),
            bigrams: Arc::new(SqliteCooccurrenceStore::new(Arc::clone(engine))),
            overlay: Arc::new(SqliteFrequencyOverlay::new(Arc::clone(engine))),
            clipboard: Arc::new(SqliteClipboardStore::new(Arc::clone(engine))),
            key_mappings: Arc::new(SqliteKeyMappingStore::new(Arc::clone(engine))),
        }
    }
}

// ============================================================================
// SECTION: Service
// ============================================================================

/// Async façade over the lexicon stores.
#[derive(Clone)]
pub struct LexiconService {
    /// Backing stores.
    stores: ServiceStores,
    /// Audit sink.
    events: Arc<dyn StoreEventSink>,
    /// Time source for cleanup cutoffs.
    clock: Arc<dyn Clock>,
    /// Tuning.
    settings: ServiceSettings,
}

impl LexiconService {
    /// Creates a service over arbitrary store implementations.
    #[must_use]
    pub fn new(
        stores: ServiceStores,
        events: Arc<dyn StoreEventSink>,
        clock: Arc<dyn Clock>,
        settings: ServiceSettings,
    ) -> Self {
        Self {
            stores,
            events,
            clock,
            settings,
        }
    }

    /// Creates a service over an open engine, sharing its clock and sink.
    #[must_use]
    pub fn from_engine(engine: &Arc<StoreEngine>, settings: ServiceSettings) -> Self {
        let runtime = engine.runtime();
        Self::new(
            ServiceStores::sqlite(engine),
            Arc::clone(&runtime.events),
            Arc::clone(&runtime.clock),
            settings,
        )
    }

    /// Returns the active settings.
    #[must_use]
    pub const fn settings(&self) -> &ServiceSettings {
        &self.settings
    }

    // ------------------------------------------------------------------------
    // Vocabulary
    // ------------------------------------------------------------------------

    /// Learns one use of a word.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError`] when validation or the write fails.
    pub async fn learn(
        &self,
        language: LanguageTag,
        word_normalized: String,
        word_display: String,
        source: WordSource,
    ) -> Result<LearnedWord, StoreError> {
        let key = redact_word_key(&language, &word_normalized);
        let store = Arc::clone(&self.stores.vocabulary);
        self.write(Component::Vocabulary, "learn", Some(key), move || {
            store.learn(&language, &word_normalized, &word_display, source)
        })
        .await
    }

    /// Learns one use of a word given only its display form.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError`] when validation or the write fails.
    pub async fn learn_display(
        &self,
        language: LanguageTag,
        word_display: String,
        source: WordSource,
    ) -> Result<LearnedWord, StoreError> {
        let normalized = normalize_word(&word_display);
        let display = word_display.trim().to_string();
        self.learn(language, normalized, display, source).await
    }

    /// Merges an imported word.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError`] when validation or the write fails.
    pub async fn import_with_merge(&self, word: WordImport) -> Result<LearnedWord, StoreError> {
        let key = redact_word_key(&word.language, &word.word_normalized);
        let store = Arc::clone(&self.stores.vocabulary);
        self.write(Component::Vocabulary, "import_with_merge", Some(key), move || {
            store.import_with_merge(&word)
        })
        .await
    }

    /// Merges a batch of imported words atomically.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError`] when any record is invalid or the write fails;
    /// nothing is applied in that case.
    pub async fn import_batch(&self, words: Vec<WordImport>) -> Result<usize, StoreError> {
        let store = Arc::clone(&self.stores.vocabulary);
        self.write(Component::Vocabulary, "import_batch", None, move || store.import_batch(&words))
            .await
    }

    /// Returns the learned words of a language for backup.
    pub async fn export_language(&self, language: LanguageTag) -> Vec<LearnedWord> {
        let key = language.as_str().to_string();
        let store = Arc::clone(&self.stores.vocabulary);
        self.read(Component::Vocabulary, "export_language", Some(key), move || {
            store.export_language(&language)
        })
        .await
    }

    /// Returns prefix suggestions at or above the configured frequency.
    pub async fn suggest_prefix(
        &self,
        language: LanguageTag,
        prefix: String,
        limit: usize,
    ) -> Vec<LearnedWord> {
        let prefix = normalize_word(&prefix);
        let key = redact_word_key(&language, &prefix);
        let min_frequency = self.settings.suggestion_min_frequency;
        let store = Arc::clone(&self.stores.vocabulary);
        self.read(Component::Vocabulary, "suggest_prefix", Some(key), move || {
            store.suggest_prefix(&language, &prefix, limit, min_frequency)
        })
        .await
    }

    /// Returns full-text matches for free-form input.
    pub async fn search_fuzzy(
        &self,
        language: LanguageTag,
        query: String,
        limit: usize,
    ) -> Vec<LearnedWord> {
        let key = redact_word_key(&language, &query);
        let store = Arc::clone(&self.stores.vocabulary);
        self.read(Component::Vocabulary, "search_fuzzy", Some(key), move || {
            store.search_fuzzy(&language, &query, limit)
        })
        .await
    }

    /// Removes single-use words older than the configured age.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError`] when the delete fails.
    pub async fn cleanup_vocabulary(&self) -> Result<u64, StoreError> {
        let cutoff = self.clock.now().saturating_sub(self.settings.cleanup_max_age);
        let store = Arc::clone(&self.stores.vocabulary);
        self.write(Component::Vocabulary, "cleanup", None, move || store.cleanup(cutoff)).await
    }

    /// Deletes one learned word.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError`] when the delete fails.
    pub async fn delete_word(
        &self,
        language: LanguageTag,
        word_normalized: String,
    ) -> Result<bool, StoreError> {
        let key = redact_word_key(&language, &word_normalized);
        let store = Arc::clone(&self.stores.vocabulary);
        self.write(Component::Vocabulary, "delete_word", Some(key), move || {
            store.delete_word(&language, &word_normalized)
        })
        .await
    }

    /// Deletes every learned word of a language.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError`] when the delete fails.
    pub async fn clear_language(&self, language: LanguageTag) -> Result<u64, StoreError> {
        let key = language.as_str().to_string();
        let store = Arc::clone(&self.stores.vocabulary);
        self.write(Component::Vocabulary, "clear_language", Some(key), move || {
            store.clear_language(&language)
        })
        .await
    }

    /// Returns the total number of learned words.
    pub async fn word_count(&self) -> u64 {
        let store = Arc::clone(&self.stores.vocabulary);
        self.read(Component::Vocabulary, "word_count", None, move || store.word_count()).await
    }

    /// Returns the number of learned words in a language.
    pub async fn word_count_by_language(&self, language: LanguageTag) -> u64 {
        let key = language.as_str().to_string();
        let store = Arc::clone(&self.stores.vocabulary);
        self.read(Component::Vocabulary, "word_count_by_language", Some(key), move || {
            store.word_count_by_language(&language)
        })
        .await
    }

    /// Returns the mean frequency, 0.0 when there are no words.
    pub async fn average_frequency(&self, language: Option<LanguageTag>) -> f64 {
        let key = language.as_ref().map(|language| language.as_str().to_string());
        let store = Arc::clone(&self.stores.vocabulary);
        self.read(Component::Vocabulary, "average_frequency", key, move || {
            store.average_frequency(language.as_ref())
        })
        .await
    }

    /// Returns learned word counts per source.
    pub async fn count_by_source(&self) -> Vec<SourceCount> {
        let store = Arc::clone(&self.stores.vocabulary);
        self.read(Component::Vocabulary, "count_by_source", None, move || store.count_by_source())
            .await
    }

    // ------------------------------------------------------------------------
    // Co-occurrence
    // ------------------------------------------------------------------------

    /// Counts one occurrence of `word_b` after `word_a`.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError`] when validation or the write fails.
    pub async fn observe_pair(
        &self,
        language: LanguageTag,
        word_a: String,
        word_b: String,
    ) -> Result<UserWordBigram, StoreError> {
        let key = redact_word_key(&language, &word_a);
        let store = Arc::clone(&self.stores.bigrams);
        self.write(Component::Cooccurrence, "observe_pair", Some(key), move || {
            store.observe_pair(&language, &word_a, &word_b)
        })
        .await
    }

    /// Returns the likeliest next words after `word_a`.
    pub async fn predict(&self, language: LanguageTag, word_a: String, limit: usize) -> Vec<String> {
        let key = redact_word_key(&language, &word_a);
        let store = Arc::clone(&self.stores.bigrams);
        self.read(Component::Cooccurrence, "predict", Some(key), move || {
            store.predict(&language, &word_a, limit)
        })
        .await
    }

    // ------------------------------------------------------------------------
    // Frequency Overlay
    // ------------------------------------------------------------------------

    /// Increments the per-user frequency of a word.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError`] when validation or the write fails.
    pub async fn increment_user_frequency(
        &self,
        language: LanguageTag,
        word_normalized: String,
    ) -> Result<UserWordFrequency, StoreError> {
        let key = redact_word_key(&language, &word_normalized);
        let store = Arc::clone(&self.stores.overlay);
        self.write(Component::FrequencyOverlay, "increment_frequency", Some(key), move || {
            store.increment_frequency(&language, &word_normalized)
        })
        .await
    }

    /// Returns the per-user frequency entry of a word.
    pub async fn user_frequency(
        &self,
        language: LanguageTag,
        word_normalized: String,
    ) -> Option<UserWordFrequency> {
        let key = redact_word_key(&language, &word_normalized);
        let store = Arc::clone(&self.stores.overlay);
        self.read(Component::FrequencyOverlay, "get", Some(key), move || {
            store.get(&language, &word_normalized)
        })
        .await
    }

    /// Clears per-user frequencies of a language.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError`] when the delete fails.
    pub async fn clear_user_frequencies(&self, language: LanguageTag) -> Result<u64, StoreError> {
        let key = language.as_str().to_string();
        let store = Arc::clone(&self.stores.overlay);
        self.write(Component::FrequencyOverlay, "clear_language", Some(key), move || {
            store.clear_language(&language)
        })
        .await
    }

    /// Clears every per-user frequency.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError`] when the delete fails.
    pub async fn clear_all_user_frequencies(&self) -> Result<u64, StoreError> {
        let store = Arc::clone(&self.stores.overlay);
        self.write(Component::FrequencyOverlay, "clear_all", None, move || store.clear_all()).await
    }

    // ------------------------------------------------------------------------
    // Clipboard
    // ------------------------------------------------------------------------

    /// Records copied text.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError`] when validation or the write fails.
    pub async fn record_clipboard(&self, content: String) -> Result<ClipboardItem, StoreError> {
        let store = Arc::clone(&self.stores.clipboard);
        self.write(Component::Clipboard, "add", None, move || store.add(&content)).await
    }

    /// Returns the newest clipboard items.
    pub async fn clipboard_recent(&self, limit: usize) -> Vec<ClipboardItem> {
        let store = Arc::clone(&self.stores.clipboard);
        self.read(Component::Clipboard, "recent", None, move || store.recent(limit)).await
    }

    /// Returns pinned clipboard items.
    pub async fn clipboard_pinned(&self) -> Vec<ClipboardItem> {
        let store = Arc::clone(&self.stores.clipboard);
        self.read(Component::Clipboard, "pinned", None, move || store.pinned()).await
    }

    /// Sets the pin state of an item.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError`] when the write fails.
    pub async fn toggle_pin(&self, id: ClipboardItemId, pinned: bool) -> Result<bool, StoreError> {
        let store = Arc::clone(&self.stores.clipboard);
        self.write(Component::Clipboard, "toggle_pin", Some(id.get().to_string()), move || {
            store.toggle_pin(id, pinned)
        })
        .await
    }

    /// Deletes a clipboard item.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError`] when the delete fails.
    pub async fn delete_clipboard_item(&self, id: ClipboardItemId) -> Result<bool, StoreError> {
        let store = Arc::clone(&self.stores.clipboard);
        self.write(Component::Clipboard, "delete", Some(id.get().to_string()), move || {
            store.delete(id)
        })
        .await
    }

    /// Deletes every unpinned clipboard item.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError`] when the delete fails.
    pub async fn clear_unpinned_clipboard(&self) -> Result<u64, StoreError> {
        let store = Arc::clone(&self.stores.clipboard);
        self.write(Component::Clipboard, "clear_all_unpinned", None, move || {
            store.clear_all_unpinned()
        })
        .await
    }

    // ------------------------------------------------------------------------
    // Key Mappings
    // ------------------------------------------------------------------------

    /// Returns the mapping for a key.
    pub async fn key_mapping(&self, base_key: String) -> Option<CustomKeyMapping> {
        let key = redact(&base_key);
        let store = Arc::clone(&self.stores.key_mappings);
        self.read(Component::KeyMappings, "get", Some(key), move || store.get(&base_key)).await
    }

    /// Returns every mapping.
    pub async fn key_mappings(&self) -> Vec<CustomKeyMapping> {
        let store = Arc::clone(&self.stores.key_mappings);
        self.read(Component::KeyMappings, "all", None, move || store.all()).await
    }

    /// Sets or replaces a mapping.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError`] when validation or the write fails.
    pub async fn set_key_mapping(
        &self,
        base_key: String,
        custom_symbol: String,
    ) -> Result<CustomKeyMapping, StoreError> {
        let key = redact(&base_key);
        let store = Arc::clone(&self.stores.key_mappings);
        self.write(Component::KeyMappings, "set", Some(key), move || {
            store.set(&base_key, &custom_symbol)
        })
        .await
    }

    /// Removes a mapping.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError`] when the delete fails.
    pub async fn clear_key_mapping(&self, base_key: String) -> Result<bool, StoreError> {
        let key = redact(&base_key);
        let store = Arc::clone(&self.stores.key_mappings);
        self.write(Component::KeyMappings, "clear", Some(key), move || store.clear(&base_key))
            .await
    }

    /// Removes every mapping.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError`] when the delete fails.
    pub async fn clear_key_mappings(&self) -> Result<u64, StoreError> {
        let store = Arc::clone(&self.stores.key_mappings);
        self.write(Component::KeyMappings, "clear_all", None, move || store.clear_all()).await
    }

    // ------------------------------------------------------------------------
    // Dispatch
    // ------------------------------------------------------------------------

    /// Runs a read, substituting the default value on failure.
    async fn read<T, F>(
        &self,
        component: Component,
        operation: &'static str,
        key: Option<String>,
        work: F,
    ) -> T
    where
        T: Default + Send + 'static,
        F: FnOnce() -> Result<T, StoreError> + Send + 'static,
    {
        match run_blocking(work).await {
            Ok(value) => value,
            Err(err) => {
                emit(
                    self.events.as_ref(),
                    component,
                    Severity::Error,
                    operation,
                    key,
                    format!("read degraded to default: {err}"),
                );
                T::default()
            }
        }
    }

    /// Runs a write, reporting failures to the sink and the caller.
    async fn write<T, F>(
        &self,
        component: Component,
        operation: &'static str,
        key: Option<String>,
        work: F,
    ) -> Result<T, StoreError>
    where
        T: Send + 'static,
        F: FnOnce() -> Result<T, StoreError> + Send + 'static,
    {
        let result = run_blocking(work).await;
        if let Err(err) = &result {
            emit(
                self.events.as_ref(),
                component,
                Severity::Error,
                operation,
                key,
                format!("write failed: {err}"),
            );
        }
        result
    }
}

/// Executes store work on the blocking pool.
async fn run_blocking<T, F>(work: F) -> Result<T, StoreError>
where
    T: Send + 'static,
    F: FnOnce() -> Result<T, StoreError> + Send + 'static,
{
    tokio::task::spawn_blocking(work)
        .await
        .map_err(|err| StoreError::Io(format!("store worker failed: {err}")))?
}

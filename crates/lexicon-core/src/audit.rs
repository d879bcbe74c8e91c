// crates/lexicon-core/src/audit.rs
// ============================================================================
// Module: Lexicon Store Events
// Description: Structured, redacted events for store and key lifecycle faults.
// Purpose: Report faults to the host logging pipeline as JSON lines.
// Dependencies: serde, serde_json
// ============================================================================

//! ## Overview
//! Every fault carries a component tag, a severity, the operation name, and an
//! optional affected key. Keys are always pre-redacted by the caller (see
//! [`crate::core::redact_word_key`]); typed words and clipboard text never
//! reach a sink.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::fs::OpenOptions;
use std::io;
use std::io::Write;
use std::path::Path;
use std::sync::Mutex;
use std::time::SystemTime;
use std::time::UNIX_EPOCH;

use serde::Serialize;

// ============================================================================
// SECTION: Types
// ============================================================================

/// Component that raised an event.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Component {
    /// Passphrase wrapping and the hardware vault.
    KeyVault,
    /// Store open, keying, and pragmas.
    StorageEngine,
    /// Schema and encryption migrations.
    Migration,
    /// Learned words and search index.
    Vocabulary,
    /// Word-pair statistics.
    Cooccurrence,
    /// Per-user frequency ledger.
    FrequencyOverlay,
    /// Clipboard history.
    Clipboard,
    /// Custom key mappings.
    KeyMappings,
    /// Host-facing service.
    Service,
}

/// Event severity.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Severity {
    /// Informational lifecycle event.
    Info,
    /// Degraded but safe behavior.
    Warning,
    /// Operation failed.
    Error,
    /// Security fault or data-loss path.
    Critical,
}

/// Store event payload.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct StoreEvent {
    /// Event identifier.
    pub event: &'static str,
    /// Event timestamp (milliseconds since epoch).
    pub timestamp_ms: u128,
    /// Component that raised the event.
    pub component: Component,
    /// Event severity.
    pub severity: Severity,
    /// Operation name.
    pub operation: &'static str,
    /// Redacted affected key, when one applies.
    pub key: Option<String>,
    /// Human-readable detail without user content.
    pub message: String,
}

/// Inputs required to construct a store event.
pub struct StoreEventParams {
    /// Component that raised the event.
    pub component: Component,
    /// Event severity.
    pub severity: Severity,
    /// Operation name.
    pub operation: &'static str,
    /// Redacted affected key, when one applies.
    pub key: Option<String>,
    /// Human-readable detail without user content.
    pub message: String,
}

impl StoreEvent {
    /// Creates a new store event with a consistent timestamp.
    #[must_use]
    pub fn new(params: StoreEventParams) -> Self {
        let timestamp_ms =
            SystemTime::now().duration_since(UNIX_EPOCH).unwrap_or_default().as_millis();
        Self {
            event: "lexicon_store",
            timestamp_ms,
            component: params.component,
            severity: params.severity,
            operation: params.operation,
            key: params.key,
            message: params.message,
        }
    }
}

// ============================================================================
// SECTION: Trait
// ============================================================================

/// Sink for store events.
pub trait StoreEventSink: Send + Sync {
    /// Record a store event.
    fn record(&self, event: &StoreEvent);
}

/// Records an event built from its parts.
pub fn emit(
    sink: &dyn StoreEventSink,
    component: Component,
    severity: Severity,
    operation: &'static str,
    key: Option<String>,
    message: impl Into<String>,
) {
    sink.record(&StoreEvent::new(StoreEventParams {
        component,
        severity,
        operation,
        key,
        message: message.into(),
    }));
}

// ============================================================================
// SECTION: Sinks
// ============================================================================

/// Event sink that logs JSON lines to stderr.
pub struct StderrEventSink;

impl StoreEventSink for StderrEventSink {
    fn record(&self, event: &StoreEvent) {
        if let Ok(payload) = serde_json::to_string(event) {
            let _ = writeln!(std::io::stderr(), "{payload}");
        }
    }
}

/// Event sink that logs JSON lines to a file.
pub struct FileEventSink {
    /// File handle used for append-only logging.
    file: Mutex<std::fs::File>,
}

impl FileEventSink {
    /// Opens the event log file in append mode.
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be opened.
    pub fn new(path: &Path) -> io::Result<Self> {
        let file = OpenOptions::new().create(true).append(true).open(path)?;
        Ok(Self {
            file: Mutex::new(file),
        })
    }
}

impl StoreEventSink for FileEventSink {
    fn record(&self, event: &StoreEvent) {
        if let Ok(payload) = serde_json::to_string(event)
            && let Ok(mut file) = self.file.lock()
        {
            let _ = writeln!(file, "{payload}");
            let _ = file.flush();
        }
    }
}

/// No-op event sink.
pub struct NoopEventSink;

impl StoreEventSink for NoopEventSink {
    fn record(&self, _event: &StoreEvent) {}
}

/// Event sink that keeps events in memory for inspection.
#[derive(Default)]
pub struct MemoryEventSink {
    /// Recorded events in arrival order.
    events: Mutex<Vec<StoreEvent>>,
}

impl MemoryEventSink {
    /// Creates an empty sink.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns a copy of the recorded events.
    #[must_use]
    pub fn events(&self) -> Vec<StoreEvent> {
        self.events.lock().map(|events| events.clone()).unwrap_or_default()
    }

    /// Returns true when an event for `operation` at `severity` was recorded.
    #[must_use]
    pub fn contains(&self, operation: &str, severity: Severity) -> bool {
        self.events().iter().any(|event| event.operation == operation && event.severity == severity)
    }
}

impl StoreEventSink for MemoryEventSink {
    fn record(&self, event: &StoreEvent) {
        if let Ok(mut events) = self.events.lock() {
            events.push(event.clone());
        }
    }
}

// ============================================================================
// SECTION: Tests
// ============================================================================

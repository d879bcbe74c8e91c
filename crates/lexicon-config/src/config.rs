// crates/lexicon-config/src/config.rs
// ============================================================================
// Module: Lexicon Configuration
// Description: Configuration loading and validation for the lexicon service.
// Purpose: Provide strict, fail-closed config parsing with hard limits.
// Dependencies: lexicon-core, lexicon-keyvault, lexicon-store-sqlite, serde, toml
// ============================================================================

//! ## Overview
//! Configuration is loaded from a TOML file with strict size and path limits.
//! Every section is optional and falls back to defaults; values that are
//! present but inconsistent fail closed.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::env;
use std::fs;
use std::path::Path;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use lexicon_core::FileEventSink;
use lexicon_core::NoopEventSink;
use lexicon_core::StderrEventSink;
use lexicon_core::StoreEventSink;
use lexicon_keyvault::DEFAULT_MASTER_KEY_ALIAS;
use lexicon_store_sqlite::DEFAULT_SUGGESTION_MIN_FREQUENCY;
use lexicon_store_sqlite::SqliteStoreConfig;
use lexicon_store_sqlite::config::validate_store_path;
use serde::Deserialize;
use thiserror::Error;

// ============================================================================
// SECTION: Constants
// ============================================================================

/// Default configuration filename when no path is specified.
const DEFAULT_CONFIG_NAME: &str = "lexicon.toml";
/// Environment variable used to override the config path.
const CONFIG_ENV_VAR: &str = "LEXICON_CONFIG";
/// Maximum configuration file size in bytes.
const MAX_CONFIG_FILE_SIZE: usize = 64 * 1024;
/// Maximum length of a single path component.
const MAX_PATH_COMPONENT_LENGTH: usize = 255;
/// Maximum total path length.
const MAX_TOTAL_PATH_LENGTH: usize = 4096;
/// Default store file name.
const DEFAULT_STORE_PATH: &str = "lexicon.db";
/// Default credential record file name.
const DEFAULT_CREDENTIALS_PATH: &str = "lexicon-credentials.json";
/// Maximum master key alias length.
const MAX_ALIAS_LENGTH: usize = 128;
/// Default age after which single-use words are cleaned up.
const DEFAULT_CLEANUP_MAX_AGE_DAYS: u32 = 90;
/// Largest accepted cleanup age.
const MAX_CLEANUP_MAX_AGE_DAYS: u32 = 3650;
/// Largest accepted suggestion threshold.
const MAX_SUGGESTION_MIN_FREQUENCY: u64 = 1_000_000;
/// Seconds per day.
const SECONDS_PER_DAY: u64 = 86_400;

// ============================================================================
// SECTION: Root Config
// ============================================================================

/// Lexicon service configuration.
#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct LexiconConfig {
    /// Store file configuration.
    #[serde(default = "default_store_config")]
    pub store: SqliteStoreConfig,
    /// Encryption policy and key material locations.
    #[serde(default)]
    pub encryption: EncryptionConfig,
    /// Vocabulary tuning.
    #[serde(default)]
    pub vocabulary: VocabularyConfig,
    /// Audit event sink.
    #[serde(default)]
    pub audit: AuditConfig,
}

impl Default for LexiconConfig {
    fn default() -> Self {
        Self {
            store: default_store_config(),
            encryption: EncryptionConfig::default(),
            vocabulary: VocabularyConfig::default(),
            audit: AuditConfig::default(),
        }
    }
}

impl LexiconConfig {
    /// Loads configuration from `path`, `LEXICON_CONFIG`, or `lexicon.toml`.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError`] when the file cannot be read, exceeds limits,
    /// fails to parse, or fails validation.
    pub fn load(path: Option<&Path>) -> Result<Self, ConfigError> {
        let resolved = resolve_path(path)?;
        validate_path(&resolved)?;
        let bytes = fs::read(&resolved).map_err(|err| ConfigError::Io(err.to_string()))?;
        if bytes.len() > MAX_CONFIG_FILE_SIZE {
            return Err(ConfigError::Invalid("config file exceeds size limit".to_string()));
        }
        let content = std::str::from_utf8(&bytes)
            .map_err(|_| ConfigError::Invalid("config file must be utf-8".to_string()))?;
        Self::from_toml_str(content)
    }

    /// Parses and validates configuration text.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError`] when parsing or validation fails.
    pub fn from_toml_str(content: &str) -> Result<Self, ConfigError> {
        let config: Self =
            toml::from_str(content).map_err(|err| ConfigError::Parse(err.to_string()))?;
        config.validate()?;
        Ok(config)
    }

    /// Validates the configuration for internal consistency.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError`] when configuration is invalid.
    pub fn validate(&self) -> Result<(), ConfigError> {
        validate_store_path(&self.store.path)
            .map_err(|err| ConfigError::Invalid(format!("store.path: {err}")))?;
        if self.store.busy_timeout_ms == 0 {
            return Err(ConfigError::Invalid(
                "store.busy_timeout_ms must be greater than zero".to_string(),
            ));
        }
        self.encryption.validate(&self.store.path)?;
        self.vocabulary.validate()?;
        self.audit.validate()
    }
}

// ============================================================================
// SECTION: Encryption
// ============================================================================

/// Whether the store must, may, or must not be encrypted.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum EncryptionPolicy {
    /// Refuse to open without a passphrase.
    Required,
    /// Encrypt when the device allows it, otherwise run unencrypted.
    #[default]
    Preferred,
    /// Never encrypt.
    Disabled,
}

/// Encryption configuration.
#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct EncryptionConfig {
    /// Encryption policy.
    #[serde(default)]
    pub policy: EncryptionPolicy,
    /// Location of the wrapped passphrase record.
    #[serde(default = "default_credentials_path")]
    pub credentials_path: PathBuf,
    /// Vault alias of the master key.
    #[serde(default = "default_master_key_alias")]
    pub master_key_alias: String,
    /// Convert an existing plaintext store on first encrypted start.
    #[serde(default = "default_true")]
    pub migrate_plaintext: bool,
}

impl Default for EncryptionConfig {
    fn default() -> Self {
        Self {
            policy: EncryptionPolicy::default(),
            credentials_path: default_credentials_path(),
            master_key_alias: default_master_key_alias(),
            migrate_plaintext: true,
        }
    }
}

impl EncryptionConfig {
    /// Validates encryption configuration.
    fn validate(&self, store_path: &Path) -> Result<(), ConfigError> {
        validate_path(&self.credentials_path)?;
        if self.credentials_path.as_os_str().is_empty() {
            return Err(ConfigError::Invalid(
                "encryption.credentials_path must not be empty".to_string(),
            ));
        }
        if self.credentials_path == store_path {
            return Err(ConfigError::Invalid(
                "encryption.credentials_path must differ from store.path".to_string(),
            ));
        }
        let alias = self.master_key_alias.as_str();
        if alias.is_empty() || alias.len() > MAX_ALIAS_LENGTH {
            return Err(ConfigError::Invalid(
                "encryption.master_key_alias must be 1-128 bytes".to_string(),
            ));
        }
        if !alias.chars().all(|ch| ch.is_ascii_alphanumeric() || matches!(ch, '_' | '-' | '.')) {
            return Err(ConfigError::Invalid(
                "encryption.master_key_alias contains invalid characters".to_string(),
            ));
        }
        Ok(())
    }
}

// ============================================================================
// SECTION: Vocabulary
// ============================================================================

/// Vocabulary tuning.
#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct VocabularyConfig {
    /// Minimum frequency for prefix suggestions.
    #[serde(default = "default_suggestion_min_frequency")]
    pub suggestion_min_frequency: u64,
    /// Age in days after which single-use words are removed by cleanup.
    #[serde(default = "default_cleanup_max_age_days")]
    pub cleanup_max_age_days: u32,
}

impl Default for VocabularyConfig {
    fn default() -> Self {
        Self {
            suggestion_min_frequency: DEFAULT_SUGGESTION_MIN_FREQUENCY,
            cleanup_max_age_days: DEFAULT_CLEANUP_MAX_AGE_DAYS,
        }
    }
}

impl VocabularyConfig {
    /// Returns the cleanup age as a duration.
    #[must_use]
    pub fn cleanup_max_age(&self) -> Duration {
        Duration::from_secs(u64::from(self.cleanup_max_age_days) * SECONDS_PER_DAY)
    }

    /// Validates vocabulary configuration.
    fn validate(&self) -> Result<(), ConfigError> {
        if self.suggestion_min_frequency == 0
            || self.suggestion_min_frequency > MAX_SUGGESTION_MIN_FREQUENCY
        {
            return Err(ConfigError::Invalid(
                "vocabulary.suggestion_min_frequency must be between 1 and 1000000".to_string(),
            ));
        }
        if self.cleanup_max_age_days == 0 || self.cleanup_max_age_days > MAX_CLEANUP_MAX_AGE_DAYS {
            return Err(ConfigError::Invalid(
                "vocabulary.cleanup_max_age_days must be between 1 and 3650".to_string(),
            ));
        }
        Ok(())
    }
}

// ============================================================================
// SECTION: Audit
// ============================================================================

/// Audit sink selection.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum AuditSinkKind {
    /// Discard events.
    None,
    /// JSON lines on stderr.
    #[default]
    Stderr,
    /// JSON lines appended to a file.
    File,
}

/// Audit configuration.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct AuditConfig {
    /// Sink kind.
    #[serde(default)]
    pub sink: AuditSinkKind,
    /// Log file path for the file sink.
    #[serde(default)]
    pub path: Option<PathBuf>,
}

impl AuditConfig {
    /// Builds the configured sink.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError`] when the file sink cannot be opened.
    pub fn build_sink(&self) -> Result<Arc<dyn StoreEventSink>, ConfigError> {
        match self.sink {
            AuditSinkKind::None => Ok(Arc::new(NoopEventSink)),
            AuditSinkKind::Stderr => Ok(Arc::new(StderrEventSink)),
            AuditSinkKind::File => {
                let path = self.path.as_ref().ok_or_else(|| {
                    ConfigError::Invalid("file audit sink requires path".to_string())
                })?;
                let sink = FileEventSink::new(path).map_err(|err| ConfigError::Io(err.to_string()))?;
                Ok(Arc::new(sink))
            }
        }
    }

    /// Validates audit configuration.
    fn validate(&self) -> Result<(), ConfigError> {
        match (self.sink, self.path.as_ref()) {
            (AuditSinkKind::File, None) => {
                Err(ConfigError::Invalid("file audit sink requires path".to_string()))
            }
            (AuditSinkKind::File, Some(path)) => validate_path(path),
            (_, Some(_)) => {
                Err(ConfigError::Invalid("audit.path is only valid for the file sink".to_string()))
            }
            (_, None) => Ok(()),
        }
    }
}

// ============================================================================
// SECTION: Errors
// ============================================================================

/// Configuration errors.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ConfigError {
    /// I/O failure while reading configuration.
    #[error("config io error: {0}")]
    Io(String),
    /// TOML parsing error.
    #[error("config parse error: {0}")]
    Parse(String),
    /// Invalid configuration data.
    #[error("invalid config: {0}")]
    Invalid(String),
}

// ============================================================================
// SECTION: Helpers
// ============================================================================

/// Resolves the config path from the argument or environment defaults.
fn resolve_path(path: Option<&Path>) -> Result<PathBuf, ConfigError> {
    if let Some(path) = path {
        return Ok(path.to_path_buf());
    }
    if let Ok(env_path) = env::var(CONFIG_ENV_VAR) {
        if env_path.len() > MAX_TOTAL_PATH_LENGTH {
            return Err(ConfigError::Invalid("config path exceeds max length".to_string()));
        }
        return Ok(PathBuf::from(env_path));
    }
    Ok(PathBuf::from(DEFAULT_CONFIG_NAME))
}

/// Validates a path against length limits.
fn validate_path(path: &Path) -> Result<(), ConfigError> {
    if path.as_os_str().len() > MAX_TOTAL_PATH_LENGTH {
        return Err(ConfigError::Invalid("path exceeds max length".to_string()));
    }
    if path.components().any(|component| component.as_os_str().len() > MAX_PATH_COMPONENT_LENGTH)
    {
        return Err(ConfigError::Invalid("path component too long".to_string()));
    }
    Ok(())
}

/// Default store configuration.
fn default_store_config() -> SqliteStoreConfig {
    SqliteStoreConfig::for_path(DEFAULT_STORE_PATH)
}

/// Default credential record path.
fn default_credentials_path() -> PathBuf {
    PathBuf::from(DEFAULT_CREDENTIALS_PATH)
}

/// Default master key alias.
fn default_master_key_alias() -> String {
    DEFAULT_MASTER_KEY_ALIAS.to_string()
}

/// Default suggestion threshold.
const fn default_suggestion_min_frequency() -> u64 {
    DEFAULT_SUGGESTION_MIN_FREQUENCY
}

/// Default cleanup age.
const fn default_cleanup_max_age_days() -> u32 {
    DEFAULT_CLEANUP_MAX_AGE_DAYS
}

/// Serde helper for `true` defaults.
const fn default_true() -> bool {
    true
}

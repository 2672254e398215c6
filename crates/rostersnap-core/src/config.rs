//! Configuration module for Rostersnap.
//!
//! Provides typed configuration structs that map to the YAML configuration file,
//! with loading, environment overrides, validation, defaults, and a builder
//! pattern for programmatic use.

use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::domain::errors::RemoteError;

// ---------------------------------------------------------------------------
// Config struct with sub-sections
// ---------------------------------------------------------------------------

/// Top-level configuration for Rostersnap.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    pub storage: StorageConfig,
    pub sync: SyncConfig,
    pub validation: ValidationConfig,
    pub logging: LoggingConfig,
}

/// Remote bucket (Supabase Storage) settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct StorageConfig {
    /// Project base URL, e.g. `https://xyz.supabase.co`. `None` until configured.
    pub base_url: Option<String>,
    /// API key sent as `apikey` and bearer token. `None` until configured.
    pub api_key: Option<String>,
    /// Bucket holding the player photos.
    pub bucket: String,
    /// Maximum number of objects requested by a listing call.
    pub list_limit: u32,
}

/// Sync engine settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct SyncConfig {
    /// Directory of the local photo store. A leading `~` is expanded.
    pub photo_dir: PathBuf,
    /// Minimum spacing between consecutive remote requests (milliseconds).
    pub rate_limit_ms: u64,
    /// Attempts per remote operation, including the first.
    pub max_attempts: u32,
    /// Backoff before the first retry (milliseconds); doubles per attempt.
    pub retry_base_delay_ms: u64,
    /// Upper bound on a single backoff delay (milliseconds).
    pub retry_max_delay_ms: u64,
}

/// Downloaded content validation settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ValidationConfig {
    /// Files smaller than this are treated as error pages or empty bodies.
    pub min_size_bytes: u64,
    /// Files up to this size are also scanned for HTML error markers.
    pub inspect_limit_bytes: u64,
}

/// Logging / tracing settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    /// Log level: `trace`, `debug`, `info`, `warn`, or `error`.
    pub level: String,
}

// ---------------------------------------------------------------------------
// Config::load()
// ---------------------------------------------------------------------------

/// Environment variable overriding `storage.base_url`.
pub const ENV_BASE_URL: &str = "SUPABASE_URL";
/// Environment variable overriding `storage.api_key`.
pub const ENV_API_KEY: &str = "SUPABASE_ANON_KEY";
/// Environment variable overriding `storage.bucket`.
pub const ENV_BUCKET: &str = "SUPABASE_BUCKET";
/// Environment variable overriding `sync.rate_limit_ms`.
pub const ENV_RATE_LIMIT_MS: &str = "RATE_LIMIT_MS";

impl Config {
    /// Load configuration from a YAML file at `path`.
    pub fn load(path: &Path) -> anyhow::Result<Self> {
        let content = std::fs::read_to_string(path)?;
        let config: Config = serde_yaml::from_str(&content)?;
        Ok(config)
    }

    /// Try to load from `path`; fall back to [`Config::default`] on any error.
    pub fn load_or_default(path: &Path) -> Self {
        Self::load(path).unwrap_or_default()
    }

    /// Platform-appropriate default path for the configuration file.
    ///
    /// Typically `$XDG_CONFIG_HOME/rostersnap/config.yaml` on Linux.
    pub fn default_path() -> PathBuf {
        dirs::config_dir()
            .unwrap_or_else(|| PathBuf::from("~/.config"))
            .join("rostersnap")
            .join("config.yaml")
    }

    /// Applies overrides from the process environment.
    pub fn apply_env_overrides(&mut self) {
        self.apply_overrides_from(|key| std::env::var(key).ok());
    }

    /// Applies overrides from an arbitrary variable lookup.
    ///
    /// Blank values are ignored. An unparseable `RATE_LIMIT_MS` is ignored
    /// with a warning left to the caller's validation.
    pub fn apply_overrides_from<F>(&mut self, lookup: F)
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());

        if let Some(url) = get(ENV_BASE_URL) {
            self.storage.base_url = Some(url);
        }
        if let Some(key) = get(ENV_API_KEY) {
            self.storage.api_key = Some(key);
        }
        if let Some(bucket) = get(ENV_BUCKET) {
            self.storage.bucket = bucket;
        }
        if let Some(ms) = get(ENV_RATE_LIMIT_MS).and_then(|v| v.trim().parse().ok()) {
            self.sync.rate_limit_ms = ms;
        }
    }
}

// ---------------------------------------------------------------------------
// Derived runtime values
// ---------------------------------------------------------------------------

/// Connection details for the remote bucket, guaranteed complete.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StorageCredentials {
    /// Base URL without trailing slash
    pub base_url: String,
    pub api_key: String,
    pub bucket: String,
    pub list_limit: u32,
}

impl StorageConfig {
    /// Returns the connection details, or `NotConfigured` if the URL or
    /// key is missing or blank.
    pub fn credentials(&self) -> Result<StorageCredentials, RemoteError> {
        let base_url = non_blank(self.base_url.as_deref())
            .ok_or_else(|| RemoteError::NotConfigured("storage.base_url is not set".into()))?;
        let api_key = non_blank(self.api_key.as_deref())
            .ok_or_else(|| RemoteError::NotConfigured("storage.api_key is not set".into()))?;

        Ok(StorageCredentials {
            base_url: base_url.trim_end_matches('/').to_string(),
            api_key: api_key.to_string(),
            bucket: self.bucket.clone(),
            list_limit: self.list_limit,
        })
    }

    /// Returns true if both URL and key are present.
    pub fn is_configured(&self) -> bool {
        self.credentials().is_ok()
    }
}

fn non_blank(value: Option<&str>) -> Option<&str> {
    value.map(str::trim).filter(|v| !v.is_empty())
}

impl SyncConfig {
    /// Photo directory with a leading `~` expanded to the home directory.
    pub fn resolved_photo_dir(&self) -> PathBuf {
        match self.photo_dir.strip_prefix("~") {
            Ok(rest) => dirs::home_dir()
                .map(|home| home.join(rest))
                .unwrap_or_else(|| self.photo_dir.clone()),
            Err(_) => self.photo_dir.clone(),
        }
    }

    pub fn rate_limit(&self) -> Duration {
        Duration::from_millis(self.rate_limit_ms)
    }

    pub fn retry_base_delay(&self) -> Duration {
        Duration::from_millis(self.retry_base_delay_ms)
    }

    pub fn retry_max_delay(&self) -> Duration {
        Duration::from_millis(self.retry_max_delay_ms)
    }
}

// ---------------------------------------------------------------------------
// Defaults
// ---------------------------------------------------------------------------

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            base_url: None,
            api_key: None,
            bucket: "player-photos".to_string(),
            list_limit: 1000,
        }
    }
}

impl Default for SyncConfig {
    fn default() -> Self {
        Self {
            photo_dir: dirs::data_local_dir()
                .unwrap_or_else(|| PathBuf::from("~/.local/share"))
                .join("rostersnap")
                .join("photos"),
            rate_limit_ms: 200,
            max_attempts: 3,
            retry_base_delay_ms: 400,
            retry_max_delay_ms: 4000,
        }
    }
}

impl Default for ValidationConfig {
    fn default() -> Self {
        Self {
            min_size_bytes: 1024,
            inspect_limit_bytes: 64 * 1024,
        }
    }
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
        }
    }
}

// ---------------------------------------------------------------------------
// Config::validate()
// ---------------------------------------------------------------------------

/// A single validation error found in the configuration.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ValidationError {
    /// Dotted path to the offending field, e.g. `"sync.max_attempts"`.
    pub field: String,
    /// Human-readable explanation.
    pub message: String,
}

impl std::fmt::Display for ValidationError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}: {}", self.field, self.message)
    }
}

/// Valid values for `logging.level`.
pub const VALID_LOG_LEVELS: &[&str] = &["trace", "debug", "info", "warn", "error"];

impl Config {
    /// Validate the configuration and return all errors found.
    ///
    /// An empty vector means the configuration is valid. Missing storage
    /// credentials are not a validation error; they surface as
    /// `NotConfigured` when a sync is attempted.
    pub fn validate(&self) -> Vec<ValidationError> {
        let mut errors = Vec::new();
        let mut push = |field: &str, message: String| {
            errors.push(ValidationError {
                field: field.into(),
                message,
            })
        };

        // --- storage ---
        if self.storage.bucket.trim().is_empty() {
            push("storage.bucket", "must not be empty".into());
        }
        if self.storage.list_limit == 0 {
            push("storage.list_limit", "must be greater than 0".into());
        }
        if let Some(url) = non_blank(self.storage.base_url.as_deref()) {
            if !(url.starts_with("http://") || url.starts_with("https://")) {
                push(
                    "storage.base_url",
                    format!("must start with http:// or https://, got '{url}'"),
                );
            }
        }

        // --- sync ---
        if self.sync.max_attempts == 0 {
            push("sync.max_attempts", "must be at least 1".into());
        }
        if self.sync.retry_base_delay_ms == 0 {
            push("sync.retry_base_delay_ms", "must be greater than 0".into());
        }
        if self.sync.retry_max_delay_ms < self.sync.retry_base_delay_ms {
            push(
                "sync.retry_max_delay_ms",
                format!(
                    "retry_max_delay_ms ({}) must not be below retry_base_delay_ms ({})",
                    self.sync.retry_max_delay_ms, self.sync.retry_base_delay_ms
                ),
            );
        }

        // --- validation ---
        if self.validation.min_size_bytes == 0 {
            push("validation.min_size_bytes", "must be greater than 0".into());
        }
        if self.validation.inspect_limit_bytes < self.validation.min_size_bytes {
            push(
                "validation.inspect_limit_bytes",
                format!(
                    "inspect_limit_bytes ({}) must not be below min_size_bytes ({})",
                    self.validation.inspect_limit_bytes, self.validation.min_size_bytes
                ),
            );
        }

        // --- logging ---
        if !VALID_LOG_LEVELS.contains(&self.logging.level.as_str()) {
            push(
                "logging.level",
                format!(
                    "invalid level '{}'; valid options: {}",
                    self.logging.level,
                    VALID_LOG_LEVELS.join(", ")
                ),
            );
        }

        errors
    }
}

// ---------------------------------------------------------------------------
// ConfigBuilder
// ---------------------------------------------------------------------------

/// Builder for constructing a [`Config`] programmatically.
///
/// Starts from [`Config::default`] and allows selective overrides.
///
/// # Example
///
/// ```rust,no_run
/// use rostersnap_core::config::ConfigBuilder;
/// use std::path::PathBuf;
///
/// let config = ConfigBuilder::new()
///     .storage_base_url("https://xyz.supabase.co")
///     .storage_api_key("anon-key")
///     .sync_photo_dir(PathBuf::from("/data/photos"))
///     .build();
/// ```
#[derive(Debug, Clone)]
pub struct ConfigBuilder {
    config: Config,
}

impl ConfigBuilder {
    /// Create a new builder initialised with [`Config::default`] values.
    pub fn new() -> Self {
        Self {
            config: Config::default(),
        }
    }

    // --- storage ---

    pub fn storage_base_url(mut self, url: impl Into<String>) -> Self {
        self.config.storage.base_url = Some(url.into());
        self
    }

    pub fn storage_api_key(mut self, key: impl Into<String>) -> Self {
        self.config.storage.api_key = Some(key.into());
        self
    }

    pub fn storage_bucket(mut self, bucket: impl Into<String>) -> Self {
        self.config.storage.bucket = bucket.into();
        self
    }

    pub fn storage_list_limit(mut self, limit: u32) -> Self {
        self.config.storage.list_limit = limit;
        self
    }

    // --- sync ---

    pub fn sync_photo_dir(mut self, dir: PathBuf) -> Self {
        self.config.sync.photo_dir = dir;
        self
    }

    pub fn sync_rate_limit_ms(mut self, ms: u64) -> Self {
        self.config.sync.rate_limit_ms = ms;
        self
    }

    pub fn sync_max_attempts(mut self, n: u32) -> Self {
        self.config.sync.max_attempts = n;
        self
    }

    pub fn sync_retry_base_delay_ms(mut self, ms: u64) -> Self {
        self.config.sync.retry_base_delay_ms = ms;
        self
    }

    pub fn sync_retry_max_delay_ms(mut self, ms: u64) -> Self {
        self.config.sync.retry_max_delay_ms = ms;
        self
    }

    // --- validation ---

    pub fn validation_min_size_bytes(mut self, bytes: u64) -> Self {
        self.config.validation.min_size_bytes = bytes;
        self
    }

    pub fn validation_inspect_limit_bytes(mut self, bytes: u64) -> Self {
        self.config.validation.inspect_limit_bytes = bytes;
        self
    }

    // --- logging ---

    pub fn logging_level(mut self, level: impl Into<String>) -> Self {
        self.config.logging.level = level.into();
        self
    }

    // --- build ---

    /// Consume the builder and return the finished [`Config`].
    pub fn build(self) -> Config {
        self.config
    }

    /// Build and validate in one step. Returns `Err` with the list of
    /// validation errors if the configuration is invalid.
    pub fn build_validated(self) -> Result<Config, Vec<ValidationError>> {
        let config = self.build();
        let errors = config.validate();
        if errors.is_empty() {
            Ok(config)
        } else {
            Err(errors)
        }
    }
}

impl Default for ConfigBuilder {
    fn default() -> Self {
        Self::new()
    }
}

// ---------------------------------------------------------------------------
// Unit tests
// ---------------------------------------------------------------------------

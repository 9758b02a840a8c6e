//! Configuration module for addrsync.
//!
//! Provides typed configuration structs that map to the YAML configuration file,
//! with loading, validation, defaults, and a builder pattern for programmatic use.

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

// ---------------------------------------------------------------------------
// Config struct with sub-sections
// ---------------------------------------------------------------------------

/// Top-level configuration for addrsync.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    pub cloud: CloudConfig,
    pub upload: UploadConfig,
    pub logging: LoggingConfig,
}

/// Address book cloud service settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct CloudConfig {
    /// Base URL of the address book service.
    pub endpoint: String,
    /// Marketplace sent in the `Accept-PFM` header.
    pub preferred_marketplace: String,
    /// Value of the `User-Agent` header.
    pub user_agent: String,
    /// Display name given to every address book created in the cloud.
    pub address_book_name: String,
    /// Per-request timeout in seconds.
    pub request_timeout_secs: u64,
    /// Extra attempts for a request that hit a transport error or a 5xx.
    pub http_retry_count: u32,
    /// Pause between those attempts, in milliseconds.
    pub http_retry_delay_ms: u64,
}

/// Upload pipeline settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct UploadConfig {
    /// Maximum entries per upload request.
    pub batch_size: usize,
    /// Maximum addresses (phones or postal addresses) per entry.
    pub max_addresses_per_entry: usize,
    /// Character limit for names and for the combined postal address fields.
    pub max_field_characters: usize,
    /// Maximum length of an entry source id.
    pub max_entry_id_length: usize,
    /// First pause after a retryable failure, in milliseconds.
    pub retry_base_delay_ms: u64,
    /// Upper bound for the exponential pause, in milliseconds.
    pub retry_max_delay_ms: u64,
    /// Delete this device's cloud address books before the first upload.
    pub purge_on_start: bool,
    /// Delete an existing cloud book before re-uploading it.
    pub replace_existing: bool,
    /// Request account provisioning when the account is not provisioned.
    pub auto_provision: bool,
}

/// Logging / tracing settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    /// Log level: `trace`, `debug`, `info`, `warn`, or `error`.
    pub level: String,
    /// Output format: `text` or `json`.
    pub format: String,
}

// ---------------------------------------------------------------------------
// Config::load()
// ---------------------------------------------------------------------------

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
    /// Typically `$XDG_CONFIG_HOME/addrsync/config.yaml` on Linux.
    pub fn default_path() -> PathBuf {
        dirs::config_dir()
            .unwrap_or_else(|| PathBuf::from("~/.config"))
            .join("addrsync")
            .join("config.yaml")
    }
}

// ---------------------------------------------------------------------------
// Defaults
// ---------------------------------------------------------------------------

impl Default for CloudConfig {
    fn default() -> Self {
        Self {
            endpoint: "https://alexa-comms-mobile-service-na.amazon.com".to_string(),
            preferred_marketplace: "US".to_string(),
            user_agent: "AutoSDK/AddressBook/1.0".to_string(),
            address_book_name: "AutoSDK".to_string(),
            request_timeout_secs: 60,
            http_retry_count: 3,
            http_retry_delay_ms: 500,
        }
    }
}

impl Default for UploadConfig {
    fn default() -> Self {
        Self {
            batch_size: 100,
            max_addresses_per_entry: 30,
            max_field_characters: 1000,
            max_entry_id_length: 200,
            retry_base_delay_ms: 1_000,
            retry_max_delay_ms: 300_000,
            purge_on_start: true,
            replace_existing: true,
            auto_provision: false,
        }
    }
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
            format: "text".to_string(),
        }
    }
}

// ---------------------------------------------------------------------------
// Config::validate()
// ---------------------------------------------------------------------------

/// A single validation error found in the configuration.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ValidationError {
    /// Dotted path to the offending field, e.g. `"upload.batch_size"`.
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
const VALID_LOG_LEVELS: &[&str] = &["trace", "debug", "info", "warn", "error"];

/// Valid values for `logging.format`.
const VALID_LOG_FORMATS: &[&str] = &["text", "json"];

fn positive(errors: &mut Vec<ValidationError>, field: &str, value: u64) {
    if value == 0 {
        errors.push(ValidationError {
            field: field.into(),
            message: "must be greater than 0".into(),
        });
    }
}

fn not_blank(errors: &mut Vec<ValidationError>, field: &str, value: &str) {
    if value.trim().is_empty() {
        errors.push(ValidationError {
            field: field.into(),
            message: "must not be empty".into(),
        });
    }
}

impl Config {
    /// Validate the configuration and return all errors found.
    ///
    /// An empty vector means the configuration is valid.
    pub fn validate(&self) -> Vec<ValidationError> {
        let mut errors = Vec::new();

        // --- cloud ---
        if !(self.cloud.endpoint.starts_with("https://")
            || self.cloud.endpoint.starts_with("http://"))
        {
            errors.push(ValidationError {
                field: "cloud.endpoint".into(),
                message: format!("must be an http(s) URL, got '{}'", self.cloud.endpoint),
            });
        }
        not_blank(
            &mut errors,
            "cloud.preferred_marketplace",
            &self.cloud.preferred_marketplace,
        );
        not_blank(&mut errors, "cloud.user_agent", &self.cloud.user_agent);
        not_blank(
            &mut errors,
            "cloud.address_book_name",
            &self.cloud.address_book_name,
        );
        positive(
            &mut errors,
            "cloud.request_timeout_secs",
            self.cloud.request_timeout_secs,
        );

        // --- upload ---
        positive(&mut errors, "upload.batch_size", self.upload.batch_size as u64);
        positive(
            &mut errors,
            "upload.max_addresses_per_entry",
            self.upload.max_addresses_per_entry as u64,
        );
        positive(
            &mut errors,
            "upload.max_field_characters",
            self.upload.max_field_characters as u64,
        );
        positive(
            &mut errors,
            "upload.max_entry_id_length",
            self.upload.max_entry_id_length as u64,
        );
        positive(
            &mut errors,
            "upload.retry_base_delay_ms",
            self.upload.retry_base_delay_ms,
        );
        if self.upload.retry_max_delay_ms < self.upload.retry_base_delay_ms {
            errors.push(ValidationError {
                field: "upload.retry_max_delay_ms".into(),
                message: format!(
                    "must be at least retry_base_delay_ms ({})",
                    self.upload.retry_base_delay_ms
                ),
            });
        }

        // --- logging ---
        if !VALID_LOG_LEVELS.contains(&self.logging.level.as_str()) {
            errors.push(ValidationError {
                field: "logging.level".into(),
                message: format!(
                    "invalid log level '{}', expected one of: {}",
                    self.logging.level,
                    VALID_LOG_LEVELS.join(", ")
                ),
            });
        }
        if !VALID_LOG_FORMATS.contains(&self.logging.format.as_str()) {
            errors.push(ValidationError {
                field: "logging.format".into(),
                message: format!(
                    "invalid log format '{}', expected one of: {}",
                    self.logging.format,
                    VALID_LOG_FORMATS.join(", ")
                ),
            });
        }

        errors
    }
}

// ---------------------------------------------------------------------------
// ConfigBuilder
// ---------------------------------------------------------------------------

/// Fluent builder for [`Config`], starting from defaults.
#[derive(Debug, Clone)]
pub struct ConfigBuilder {
    config: Config,
}

impl ConfigBuilder {
    /// Start from [`Config::default`].
    pub fn new() -> Self {
        Self {
            config: Config::default(),
        }
    }

    // --- cloud ---

    pub fn cloud_endpoint(mut self, endpoint: impl Into<String>) -> Self {
        self.config.cloud.endpoint = endpoint.into();
        self
    }

    pub fn cloud_preferred_marketplace(mut self, marketplace: impl Into<String>) -> Self {
        self.config.cloud.preferred_marketplace = marketplace.into();
        self
    }

    pub fn cloud_user_agent(mut self, user_agent: impl Into<String>) -> Self {
        self.config.cloud.user_agent = user_agent.into();
        self
    }

    pub fn cloud_address_book_name(mut self, name: impl Into<String>) -> Self {
        self.config.cloud.address_book_name = name.into();
        self
    }

    pub fn cloud_request_timeout_secs(mut self, seconds: u64) -> Self {
        self.config.cloud.request_timeout_secs = seconds;
        self
    }

    pub fn cloud_http_retry_count(mut self, n: u32) -> Self {
        self.config.cloud.http_retry_count = n;
        self
    }

    pub fn cloud_http_retry_delay_ms(mut self, ms: u64) -> Self {
        self.config.cloud.http_retry_delay_ms = ms;
        self
    }

    // --- upload ---

    pub fn upload_batch_size(mut self, n: usize) -> Self {
        self.config.upload.batch_size = n;
        self
    }

    pub fn upload_max_addresses_per_entry(mut self, n: usize) -> Self {
        self.config.upload.max_addresses_per_entry = n;
        self
    }

    pub fn upload_max_field_characters(mut self, n: usize) -> Self {
        self.config.upload.max_field_characters = n;
        self
    }

    pub fn upload_max_entry_id_length(mut self, n: usize) -> Self {
        self.config.upload.max_entry_id_length = n;
        self
    }

    pub fn upload_retry_delays_ms(mut self, base: u64, max: u64) -> Self {
        self.config.upload.retry_base_delay_ms = base;
        self.config.upload.retry_max_delay_ms = max;
        self
    }

    pub fn upload_purge_on_start(mut self, enabled: bool) -> Self {
        self.config.upload.purge_on_start = enabled;
        self
    }

    pub fn upload_replace_existing(mut self, enabled: bool) -> Self {
        self.config.upload.replace_existing = enabled;
        self
    }

    pub fn upload_auto_provision(mut self, enabled: bool) -> Self {
        self.config.upload.auto_provision = enabled;
        self
    }

    // --- logging ---

    pub fn logging_level(mut self, level: impl Into<String>) -> Self {
        self.config.logging.level = level.into();
        self
    }

    pub fn logging_format(mut self, format: impl Into<String>) -> Self {
        self.config.logging.format = format.into();
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

//! TOML Configuration File Support
//!
//! Centralized configuration loading for the try-on client, reading an
//! optional TOML file at `~/.config/pet-tryon/tryon.toml`.
//!
//! # Configuration Priority
//!
//! Configuration values are loaded with the following priority (highest first):
//! 1. CLI arguments ([`ConfigOverrides`])
//! 2. Environment variables
//! 3. TOML configuration file
//! 4. Default values
//!
//! # Example Configuration
//!
//! ```toml
//! [backend]
//! base_url = "https://tryon.example.com"
//! request_timeout_secs = 90
//!
//! [catalog]
//! source = "static"
//! static_dir = "/srv/outfits"
//!
//! [progress]
//! interval_ms = 2000
//! messages = ["Preparing...", "Almost there..."]
//!
//! [session]
//! max_customer_name_len = 80
//! export_dir = "/home/me/Pictures"
//! ```
//!
//! # Environment Variables
//!
//! - `TRYON_BACKEND_URL`
//! - `TRYON_REQUEST_TIMEOUT` (seconds)
//! - `TRYON_CATALOG_DIR` (switches the catalog to the static source)
//! - `TRYON_PROGRESS_INTERVAL_MS`
//! - `TRYON_EXPORT_DIR`

use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::capture::DEFAULT_MAX_PHOTO_BYTES;
use crate::progress::{DEFAULT_PROGRESS_INTERVAL, DEFAULT_PROGRESS_MESSAGES};

/// Default backend location
pub const DEFAULT_BACKEND_URL: &str = "http://localhost:8001";

/// Default upper bound on the customer name, in characters
pub const DEFAULT_MAX_CUSTOMER_NAME_LEN: usize = 80;

// =============================================================================
// Error Types
// =============================================================================

/// Errors that can occur when loading configuration
#[derive(Debug, Error)]
pub enum ConfigError {
    /// Failed to read config file
    #[error("Failed to read config file at {path}: {source}")]
    ReadError {
        /// The path that was attempted
        path: PathBuf,
        /// The underlying IO error
        source: std::io::Error,
    },

    /// Failed to parse TOML
    #[error("Failed to parse TOML config: {0}")]
    ParseError(#[from] toml::de::Error),

    /// Invalid configuration value
    #[error("Invalid configuration: {0}")]
    ValidationError(String),
}

// =============================================================================
// Configuration Source Tracking
// =============================================================================

/// Tracks where the configuration came from
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum ConfigSource {
    /// Value from command-line argument
    Cli,
    /// Value from environment variable
    Env,
    /// Value from TOML configuration file
    File,
    /// Default value
    Default,
}

impl std::fmt::Display for ConfigSource {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Cli => write!(f, "CLI"),
            Self::Env => write!(f, "environment"),
            Self::File => write!(f, "config file"),
            Self::Default => write!(f, "default"),
        }
    }
}

/// Which catalog source to use
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CatalogSourceKind {
    /// `GET /api/outfits`
    #[default]
    Remote,
    /// Image files in a local directory
    Static,
}

// =============================================================================
// TOML Configuration Structures
// =============================================================================

/// Backend section of the TOML configuration
#[derive(Clone, Debug, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct BackendToml {
    /// Base URL of the try-on service
    pub base_url: Option<String>,

    /// Client-side request timeout in seconds
    pub request_timeout_secs: Option<u64>,
}

/// Catalog section of the TOML configuration
#[derive(Clone, Debug, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct CatalogToml {
    /// `remote` or `static`
    pub source: Option<CatalogSourceKind>,

    /// Directory for the static source
    pub static_dir: Option<PathBuf>,
}

/// Progress section of the TOML configuration
#[derive(Clone, Debug, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct ProgressToml {
    /// Milliseconds between progress lines
    pub interval_ms: Option<u64>,

    /// Progress lines, in order
    pub messages: Option<Vec<String>>,
}

/// Session section of the TOML configuration
#[derive(Clone, Debug, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct SessionToml {
    /// Maximum customer name length in characters
    pub max_customer_name_len: Option<usize>,

    /// Where exported images go
    pub export_dir: Option<PathBuf>,

    /// Largest accepted photo in bytes
    pub max_photo_bytes: Option<u64>,
}

/// Top-level TOML configuration structure
#[derive(Clone, Debug, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct TryOnToml {
    /// Backend configuration section
    pub backend: BackendToml,

    /// Catalog configuration section
    pub catalog: CatalogToml,

    /// Progress configuration section
    pub progress: ProgressToml,

    /// Session configuration section
    pub session: SessionToml,
}

// =============================================================================
// Resolved Settings
// =============================================================================

/// How to reach the backend
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct BackendSettings {
    /// Base URL, without the `/api` suffix
    pub base_url: String,
    /// Client-side timeout; `None` leaves it to the HTTP client
    pub request_timeout: Option<Duration>,
}

impl Default for BackendSettings {
    fn default() -> Self {
        Self {
            base_url: DEFAULT_BACKEND_URL.to_string(),
            request_timeout: None,
        }
    }
}

/// Where outfits come from
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct CatalogSettings {
    /// Source kind
    pub kind: CatalogSourceKind,
    /// Directory for the static source
    pub static_dir: Option<PathBuf>,
}

/// Progress schedule while generating
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ProgressSettings {
    /// Time between lines
    pub interval: Duration,
    /// Lines, in order
    pub messages: Vec<String>,
}

impl Default for ProgressSettings {
    fn default() -> Self {
        Self {
            interval: DEFAULT_PROGRESS_INTERVAL,
            messages: DEFAULT_PROGRESS_MESSAGES
                .iter()
                .map(|m| (*m).to_string())
                .collect(),
        }
    }
}

/// Per-session limits and locations
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct SessionSettings {
    /// Maximum customer name length in characters
    pub max_customer_name_len: usize,
    /// Default export directory
    pub export_dir: PathBuf,
    /// Largest accepted photo in bytes
    pub max_photo_bytes: u64,
}

impl Default for SessionSettings {
    fn default() -> Self {
        Self {
            max_customer_name_len: DEFAULT_MAX_CUSTOMER_NAME_LEN,
            export_dir: dirs::download_dir().unwrap_or_else(|| PathBuf::from(".")),
            max_photo_bytes: DEFAULT_MAX_PHOTO_BYTES,
        }
    }
}

// =============================================================================
// Main Configuration Struct
// =============================================================================

/// Centralized configuration for the try-on client
#[derive(Clone, Debug)]
pub struct TryOnConfig {
    /// Backend settings
    pub backend: BackendSettings,

    /// Catalog settings
    pub catalog: CatalogSettings,

    /// Progress settings
    pub progress: ProgressSettings,

    /// Session settings
    pub session: SessionSettings,

    /// Path to the config file that was loaded (if any)
    pub config_file_path: Option<PathBuf>,

    /// Source of configuration values
    source: ConfigSource,
}

impl Default for TryOnConfig {
    fn default() -> Self {
        Self {
            backend: BackendSettings::default(),
            catalog: CatalogSettings::default(),
            progress: ProgressSettings::default(),
            session: SessionSettings::default(),
            config_file_path: None,
            source: ConfigSource::Default,
        }
    }
}

impl TryOnConfig {
    /// Create a new configuration with default values
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Get the primary source of this configuration
    #[must_use]
    pub fn source(&self) -> ConfigSource {
        self.source
    }

    /// Set the configuration source
    pub fn set_source(&mut self, source: ConfigSource) {
        self.source = source;
    }

    /// Check values that would otherwise fail later at runtime
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::ValidationError`] naming the offending key.
    pub fn validate(&self) -> Result<(), ConfigError> {
        let url = &self.backend.base_url;
        if !(url.starts_with("http://") || url.starts_with("https://")) {
            return Err(ConfigError::ValidationError(format!(
                "backend.base_url must start with http:// or https:// (got '{url}')"
            )));
        }
        if self.backend.request_timeout == Some(Duration::ZERO) {
            return Err(ConfigError::ValidationError(
                "backend.request_timeout_secs must be greater than 0".to_string(),
            ));
        }
        if self.catalog.kind == CatalogSourceKind::Static && self.catalog.static_dir.is_none() {
            return Err(ConfigError::ValidationError(
                "catalog.static_dir is required when catalog.source = \"static\"".to_string(),
            ));
        }
        if self.progress.interval.is_zero() {
            return Err(ConfigError::ValidationError(
                "progress.interval_ms must be greater than 0".to_string(),
            ));
        }
        if self.session.max_customer_name_len == 0 {
            return Err(ConfigError::ValidationError(
                "session.max_customer_name_len must be greater than 0".to_string(),
            ));
        }
        if self.session.max_photo_bytes == 0 {
            return Err(ConfigError::ValidationError(
                "session.max_photo_bytes must be greater than 0".to_string(),
            ));
        }
        Ok(())
    }
}

// =============================================================================
// Configuration Loading
// =============================================================================

/// Get the default configuration file path
///
/// Returns `$XDG_CONFIG_HOME/pet-tryon/tryon.toml` or
/// `~/.config/pet-tryon/tryon.toml` if `XDG_CONFIG_HOME` is not set.
#[must_use]
pub fn default_config_path() -> Option<PathBuf> {
    dirs::config_dir().map(|p| p.join("pet-tryon").join("tryon.toml"))
}

/// Load configuration from all sources with proper priority
///
/// # Errors
///
/// Returns an error if the config file exists but cannot be parsed, or if the
/// resulting values are invalid. A missing config file is not an error.
pub fn load_config() -> Result<TryOnConfig, ConfigError> {
    load_config_from_path(default_config_path().as_deref())
}

/// Load configuration from a specific path, then the process environment
///
/// # Errors
///
/// See [`load_config`].
pub fn load_config_from_path(path: Option<&Path>) -> Result<TryOnConfig, ConfigError> {
    load_config_with_env(path, |key| std::env::var(key).ok())
}

/// Load configuration with a custom environment lookup
///
/// # Errors
///
/// See [`load_config`].
pub fn load_config_with_env(
    path: Option<&Path>,
    env: impl Fn(&str) -> Option<String>,
) -> Result<TryOnConfig, ConfigError> {
    let mut config = TryOnConfig::default();

    if let Some(config_path) = path {
        if config_path.exists() {
            let toml_content =
                std::fs::read_to_string(config_path).map_err(|e| ConfigError::ReadError {
                    path: config_path.to_path_buf(),
                    source: e,
                })?;

            let toml_config: TryOnToml = toml::from_str(&toml_content)?;
            apply_toml_config(&mut config, &toml_config);
            config.config_file_path = Some(config_path.to_path_buf());
            config.source = ConfigSource::File;

            tracing::info!(
                path = %config_path.display(),
                "Loaded configuration from file"
            );
        } else {
            tracing::debug!(
                path = %config_path.display(),
                "Config file not found, using defaults"
            );
        }
    }

    apply_env_config(&mut config, env)?;
    config.validate()?;

    Ok(config)
}

/// Apply TOML configuration values to the config struct
fn apply_toml_config(config: &mut TryOnConfig, toml: &TryOnToml) {
    if let Some(ref url) = toml.backend.base_url {
        config.backend.base_url = url.trim_end_matches('/').to_string();
    }
    if let Some(secs) = toml.backend.request_timeout_secs {
        config.backend.request_timeout = Some(Duration::from_secs(secs));
    }

    if let Some(kind) = toml.catalog.source {
        config.catalog.kind = kind;
    }
    if toml.catalog.static_dir.is_some() {
        config.catalog.static_dir = toml.catalog.static_dir.clone();
    }

    if let Some(ms) = toml.progress.interval_ms {
        config.progress.interval = Duration::from_millis(ms);
    }
    if let Some(ref messages) = toml.progress.messages {
        config.progress.messages = messages.clone();
    }

    if let Some(len) = toml.session.max_customer_name_len {
        config.session.max_customer_name_len = len;
    }
    if let Some(ref dir) = toml.session.export_dir {
        config.session.export_dir = dir.clone();
    }
    if let Some(bytes) = toml.session.max_photo_bytes {
        config.session.max_photo_bytes = bytes;
    }
}

fn parse_env<T: std::str::FromStr>(key: &str, value: &str) -> Result<T, ConfigError> {
    value
        .trim()
        .parse()
        .map_err(|_| ConfigError::ValidationError(format!("{key}: cannot parse '{value}'")))
}

/// Apply environment variable overrides to the config
fn apply_env_config(
    config: &mut TryOnConfig,
    env: impl Fn(&str) -> Option<String>,
) -> Result<(), ConfigError> {
    if let Some(url) = env("TRYON_BACKEND_URL") {
        config.backend.base_url = url.trim_end_matches('/').to_string();
        config.source = ConfigSource::Env;
    }
    if let Some(timeout) = env("TRYON_REQUEST_TIMEOUT") {
        let secs: u64 = parse_env("TRYON_REQUEST_TIMEOUT", &timeout)?;
        config.backend.request_timeout = Some(Duration::from_secs(secs));
        config.source = ConfigSource::Env;
    }
    if let Some(dir) = env("TRYON_CATALOG_DIR") {
        config.catalog.kind = CatalogSourceKind::Static;
        config.catalog.static_dir = Some(PathBuf::from(dir));
        config.source = ConfigSource::Env;
    }
    if let Some(interval) = env("TRYON_PROGRESS_INTERVAL_MS") {
        let ms: u64 = parse_env("TRYON_PROGRESS_INTERVAL_MS", &interval)?;
        config.progress.interval = Duration::from_millis(ms);
        config.source = ConfigSource::Env;
    }
    if let Some(dir) = env("TRYON_EXPORT_DIR") {
        config.session.export_dir = PathBuf::from(dir);
        config.source = ConfigSource::Env;
    }
    Ok(())
}

// =============================================================================
// CLI Override Support
// =============================================================================

/// Builder for applying CLI overrides to configuration
///
/// Use this after [`load_config`] to apply command-line argument overrides.
#[derive(Clone, Debug, Default)]
pub struct ConfigOverrides {
    /// Backend URL override
    pub backend_url: Option<String>,

    /// Request timeout override (seconds)
    pub request_timeout_secs: Option<u64>,

    /// Static catalog directory override
    pub catalog_dir: Option<PathBuf>,

    /// Progress interval override (milliseconds)
    pub progress_interval_ms: Option<u64>,

    /// Export directory override
    pub export_dir: Option<PathBuf>,
}

impl ConfigOverrides {
    /// Create a new empty set of overrides
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Set backend URL override
    #[must_use]
    pub fn with_backend_url(mut self, url: String) -> Self {
        self.backend_url = Some(url);
        self
    }

    /// Set request timeout override
    #[must_use]
    pub fn with_request_timeout_secs(mut self, secs: u64) -> Self {
        self.request_timeout_secs = Some(secs);
        self
    }

    /// Set static catalog directory override
    #[must_use]
    pub fn with_catalog_dir(mut self, dir: PathBuf) -> Self {
        self.catalog_dir = Some(dir);
        self
    }

    /// Set progress interval override
    #[must_use]
    pub fn with_progress_interval_ms(mut self, ms: u64) -> Self {
        self.progress_interval_ms = Some(ms);
        self
    }

    /// Set export directory override
    #[must_use]
    pub fn with_export_dir(mut self, dir: PathBuf) -> Self {
        self.export_dir = Some(dir);
        self
    }

    /// Apply overrides to a configuration and re-validate it
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::ValidationError`] if an override is invalid.
    pub fn apply(&self, config: &mut TryOnConfig) -> Result<(), ConfigError> {
        if self.backend_url.is_some()
            || self.request_timeout_secs.is_some()
            || self.catalog_dir.is_some()
            || self.progress_interval_ms.is_some()
            || self.export_dir.is_some()
        {
            config.source = ConfigSource::Cli;
        }

        if let Some(ref url) = self.backend_url {
            config.backend.base_url = url.trim_end_matches('/').to_string();
        }
        if let Some(secs) = self.request_timeout_secs {
            config.backend.request_timeout = Some(Duration::from_secs(secs));
        }
        if let Some(ref dir) = self.catalog_dir {
            config.catalog.kind = CatalogSourceKind::Static;
            config.catalog.static_dir = Some(dir.clone());
        }
        if let Some(ms) = self.progress_interval_ms {
            config.progress.interval = Duration::from_millis(ms);
        }
        if let Some(ref dir) = self.export_dir {
            config.session.export_dir = dir.clone();
        }

        config.validate()
    }
}

// =============================================================================
// Tests
// =============================================================================

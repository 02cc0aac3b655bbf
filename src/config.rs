//! Configuration file parser for ~/.config/taskflow/config.toml.
//!
//! The config file is optional; a missing file yields `Config::default()`.
//! Unknown keys are accepted by serde and logged as warnings so typos show up.
use secrecy::SecretString;
use serde::Deserialize;
use std::path::{Path, PathBuf};
use std::time::Duration;
use thiserror::Error;

/// Environment variable holding the bearer token. Takes precedence over the
/// `token` key of the config file.
pub const TOKEN_ENV: &str = "TASKFLOW_TOKEN";

// ============================================================================
// Error Types
// ============================================================================

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Failed to read config file: {0}")]
    Io(#[from] std::io::Error),

    #[error("Invalid TOML in config file: {0}")]
    Parse(#[from] toml::de::Error),

    #[error("Config file too large: {0}")]
    TooLarge(String),

    #[error("Invalid config value: {0}")]
    Invalid(String),
}

// ============================================================================
// Configuration
// ============================================================================

/// Client configuration.
///
/// All fields use `#[serde(default)]` so any subset of keys can be specified.
/// `Debug` masks the token.
#[derive(Clone, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Base URL of the todo API.
    pub base_url: String,

    /// Per-request timeout in seconds.
    pub request_timeout_secs: u64,

    /// How long a fetched task list is served from cache.
    pub task_cache_ttl_secs: u64,

    /// Number of categories whose task lists are cached.
    pub task_cache_capacity: usize,

    /// Bearer token from a previous login.
    pub token: Option<String>,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            base_url: "http://localhost:8080".to_string(),
            request_timeout_secs: 30,
            task_cache_ttl_secs: 60,
            task_cache_capacity: 16,
            token: None,
        }
    }
}

impl std::fmt::Debug for Config {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Config")
            .field("base_url", &self.base_url)
            .field("request_timeout_secs", &self.request_timeout_secs)
            .field("task_cache_ttl_secs", &self.task_cache_ttl_secs)
            .field("task_cache_capacity", &self.task_cache_capacity)
            .field("token", &self.token.as_ref().map(|_| "[REDACTED]"))
            .finish()
    }
}

impl Config {
    /// Maximum config file size (1 MB).
    const MAX_FILE_SIZE: u64 = 1_048_576;

    const KNOWN_KEYS: [&'static str; 5] = [
        "base_url",
        "request_timeout_secs",
        "task_cache_ttl_secs",
        "task_cache_capacity",
        "token",
    ];

    /// Default location: `~/.config/taskflow/config.toml`.
    pub fn default_path() -> Option<PathBuf> {
        let home = std::env::var_os("HOME")?;
        Some(
            PathBuf::from(home)
                .join(".config")
                .join("taskflow")
                .join("config.toml"),
        )
    }

    /// Load configuration from a TOML file.
    ///
    /// - Missing file → `Ok(Config::default())`
    /// - Empty file → `Ok(Config::default())`
    /// - Invalid TOML → `Err(ConfigError::Parse)` with line number info
    /// - Unknown keys → accepted, logged as warning
    /// - `request_timeout_secs = 0` → `Err(ConfigError::Invalid)`
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        match std::fs::metadata(path) {
            Ok(meta) if meta.len() > Self::MAX_FILE_SIZE => {
                return Err(ConfigError::TooLarge(format!(
                    "Config file is {} bytes (max {} bytes)",
                    meta.len(),
                    Self::MAX_FILE_SIZE
                )));
            }
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                tracing::debug!(path = %path.display(), "No config file found, using defaults");
                return Ok(Self::default());
            }
            Err(e) => return Err(ConfigError::Io(e)),
            Ok(_) => {}
        }

        let content = match std::fs::read_to_string(path) {
            Ok(c) => c,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                // Deleted between metadata and read
                tracing::debug!(path = %path.display(), "Config file disappeared, using defaults");
                return Ok(Self::default());
            }
            Err(e) => return Err(ConfigError::Io(e)),
        };

        Self::parse(&content, path)
    }

    fn parse(content: &str, path: &Path) -> Result<Self, ConfigError> {
        if content.trim().is_empty() {
            tracing::debug!(path = %path.display(), "Config file is empty, using defaults");
            return Ok(Self::default());
        }

        if let Ok(raw) = content.parse::<toml::Table>() {
            for key in raw.keys() {
                if !Self::KNOWN_KEYS.contains(&key.as_str()) {
                    tracing::warn!(key = %key, "Unknown key in config file, ignoring");
                }
            }
        }

        let config: Config = toml::from_str(content)?;
        if config.request_timeout_secs == 0 {
            return Err(ConfigError::Invalid(
                "request_timeout_secs must be at least 1".to_string(),
            ));
        }
        tracing::info!(path = %path.display(), base_url = %config.base_url, "Loaded configuration");
        Ok(config)
    }

    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_secs)
    }

    pub fn task_cache_ttl(&self) -> Duration {
        Duration::from_secs(self.task_cache_ttl_secs)
    }

    /// The bearer token to use: `TASKFLOW_TOKEN` if set and non-empty,
    /// otherwise the `token` key.
    pub fn token(&self) -> Option<SecretString> {
        self.resolve_token(std::env::var(TOKEN_ENV).ok())
    }

    fn resolve_token(&self, env_value: Option<String>) -> Option<SecretString> {
        env_value
            .filter(|t| !t.trim().is_empty())
            .or_else(|| self.token.clone().filter(|t| !t.trim().is_empty()))
            .map(|t| SecretString::from(t.trim().to_string()))
    }
}

// ============================================================================
// Tests
// ============================================================================

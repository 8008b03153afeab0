//! Configuration management for the command-line app.
//!
//! Settings come from an optional TOML file named by `HORIZON_TODO_CONFIG`,
//! then environment overrides. Secrets are read from the environment only.
//!
//! ```toml
//! [feed]
//! base_url = "https://jsonplaceholder.typicode.com"
//! limit = 200
//!
//! [firestore]
//! project_id = "my-project"
//!
//! [pagination]
//! page_size = 10
//!
//! [observability]
//! log_level = "info"
//! metrics = false
//! ```

use horizon_todo_core::todo::FEED_ID_CEILING;
use horizon_todo_feed::DEFAULT_BASE_URL as FEED_BASE_URL;
use horizon_todo_firestore::{
    DEFAULT_AUTH_BASE_URL, DEFAULT_BASE_URL as FIRESTORE_BASE_URL, DEFAULT_TOKEN_BASE_URL,
};
use serde::{Deserialize, Serialize};
use std::num::NonZeroUsize;
use std::path::Path;
use std::time::Duration;
use thiserror::Error;

/// Path of the TOML config file.
pub const CONFIG_PATH_VAR: &str = "HORIZON_TODO_CONFIG";
/// Page size override.
pub const PAGE_SIZE_VAR: &str = "HORIZON_TODO_PAGE_SIZE";
/// Log level override.
pub const LOG_LEVEL_VAR: &str = "HORIZON_TODO_LOG_LEVEL";
/// Metrics snapshot override (`true`/`false`, `1`/`0`).
pub const METRICS_VAR: &str = "HORIZON_TODO_METRICS";
/// Firebase project override.
pub const PROJECT_ID_VAR: &str = "FIREBASE_PROJECT_ID";
/// Firebase web API key.
pub const API_KEY_VAR: &str = "FIREBASE_API_KEY";

const LOG_LEVELS: [&str; 5] = ["trace", "debug", "info", "warn", "error"];

/// Configuration error
#[derive(Error, Debug)]
pub enum ConfigError {
    /// Environment variable not set
    #[error("Environment variable not set: {0}")]
    EnvVarNotSet(String),
    /// Failed to read or parse configuration
    #[error("Failed to parse configuration: {0}")]
    Parse(String),
    /// Configuration validation failed
    #[error("Configuration validation failed: {0}")]
    Validation(String),
}

/// Public Todo Feed configuration
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct FeedConfig {
    /// API root
    pub base_url: String,
    /// Number of records to request
    pub limit: usize,
    /// Request timeout in seconds
    pub timeout_secs: u64,
}

impl FeedConfig {
    /// Request timeout.
    #[must_use]
    pub const fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }

    fn validate(&self) -> Result<(), ConfigError> {
        if self.base_url.is_empty() {
            return Err(ConfigError::Validation("feed.base_url cannot be empty".to_string()));
        }
        if self.limit == 0 {
            return Err(ConfigError::Validation("feed.limit must be > 0".to_string()));
        }
        // Ids above the ceiling would be parsed back as remote ids.
        if self.limit > FEED_ID_CEILING as usize {
            return Err(ConfigError::Validation(format!(
                "feed.limit must be <= {FEED_ID_CEILING}"
            )));
        }
        if self.timeout_secs == 0 {
            return Err(ConfigError::Validation("feed.timeout_secs must be > 0".to_string()));
        }
        Ok(())
    }
}

impl Default for FeedConfig {
    fn default() -> Self {
        Self {
            base_url: FEED_BASE_URL.to_string(),
            limit: 200,
            timeout_secs: 10,
        }
    }
}

/// Firebase configuration
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct FirestoreConfig {
    /// Firebase project; required once signed in
    pub project_id: Option<String>,
    /// Collection holding the todo documents
    pub collection: String,
    /// Web API key (environment only)
    #[serde(skip)]
    pub api_key: Option<String>,
    /// Firestore API root
    pub base_url: String,
    /// Identity Toolkit API root
    pub auth_base_url: String,
    /// Secure Token API root, used to refresh id tokens
    pub token_base_url: String,
}

impl FirestoreConfig {
    /// Project id, or an error naming the variable to set.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError::EnvVarNotSet` if no project is configured.
    pub fn require_project_id(&self) -> Result<&str, ConfigError> {
        self.project_id
            .as_deref()
            .ok_or_else(|| ConfigError::EnvVarNotSet(PROJECT_ID_VAR.to_string()))
    }

    /// API key, or an error naming the variable to set.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError::EnvVarNotSet` if no key is configured.
    pub fn require_api_key(&self) -> Result<&str, ConfigError> {
        self.api_key
            .as_deref()
            .ok_or_else(|| ConfigError::EnvVarNotSet(API_KEY_VAR.to_string()))
    }

    fn validate(&self) -> Result<(), ConfigError> {
        if self.collection.is_empty() {
            return Err(ConfigError::Validation(
                "firestore.collection cannot be empty".to_string(),
            ));
        }
        if self.project_id.as_deref().is_some_and(str::is_empty) {
            return Err(ConfigError::Validation(
                "firestore.project_id cannot be empty".to_string(),
            ));
        }
        Ok(())
    }
}

impl Default for FirestoreConfig {
    fn default() -> Self {
        Self {
            project_id: None,
            collection: "todos".to_string(),
            api_key: None,
            base_url: FIRESTORE_BASE_URL.to_string(),
            auth_base_url: DEFAULT_AUTH_BASE_URL.to_string(),
            token_base_url: DEFAULT_TOKEN_BASE_URL.to_string(),
        }
    }
}

/// Pagination configuration
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct PaginationConfig {
    /// Records per page
    pub page_size: usize,
}

impl PaginationConfig {
    /// Page size as a non-zero value.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError::Validation` if the page size is zero.
    pub fn page_size(&self) -> Result<NonZeroUsize, ConfigError> {
        NonZeroUsize::new(self.page_size)
            .ok_or_else(|| ConfigError::Validation("pagination.page_size must be > 0".to_string()))
    }
}

impl Default for PaginationConfig {
    fn default() -> Self {
        Self { page_size: 10 }
    }
}

/// Observability configuration
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ObservabilityConfig {
    /// Log level (trace, debug, info, warn, error)
    pub log_level: String,
    /// Write a Prometheus snapshot to stderr after each command
    pub metrics: bool,
}

impl ObservabilityConfig {
    fn validate(&self) -> Result<(), ConfigError> {
        if !LOG_LEVELS.contains(&self.log_level.as_str()) {
            return Err(ConfigError::Validation(format!(
                "Invalid log level: {}. Must be one of: {}",
                self.log_level,
                LOG_LEVELS.join(", ")
            )));
        }
        Ok(())
    }
}

impl Default for ObservabilityConfig {
    fn default() -> Self {
        Self {
            log_level: "info".to_string(),
            metrics: false,
        }
    }
}

/// Complete app configuration
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    /// Public Todo Feed
    pub feed: FeedConfig,
    /// Firebase backends
    pub firestore: FirestoreConfig,
    /// Client-side pagination
    pub pagination: PaginationConfig,
    /// Logging and metrics
    pub observability: ObservabilityConfig,
}

impl AppConfig {
    /// Load configuration from the process environment.
    ///
    /// # Errors
    ///
    /// Returns error if the config file cannot be read, an override cannot be
    /// parsed, or the result is invalid.
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::load(|name| std::env::var(name).ok())
    }

    /// Load configuration, reading variables through `var`.
    ///
    /// # Errors
    ///
    /// Same as [`from_env`](Self::from_env).
    pub fn load(var: impl Fn(&str) -> Option<String>) -> Result<Self, ConfigError> {
        let mut config = match var(CONFIG_PATH_VAR) {
            Some(path) => Self::from_file(Path::new(&path))?,
            None => Self::default(),
        };
        config.apply_overrides(&var)?;
        config.validate()?;
        Ok(config)
    }

    /// Parse a TOML file. Missing sections and keys keep their defaults.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError::Parse` if the file cannot be read or parsed.
    pub fn from_file(path: &Path) -> Result<Self, ConfigError> {
        let text = std::fs::read_to_string(path)
            .map_err(|e| ConfigError::Parse(format!("{}: {e}", path.display())))?;
        Self::from_toml(&text)
    }

    /// Parse TOML text.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError::Parse` if the text is not a valid config.
    pub fn from_toml(text: &str) -> Result<Self, ConfigError> {
        toml::from_str(text).map_err(|e| ConfigError::Parse(e.to_string()))
    }

    fn apply_overrides(&mut self, var: &impl Fn(&str) -> Option<String>) -> Result<(), ConfigError> {
        if let Some(size) = var(PAGE_SIZE_VAR) {
            self.pagination.page_size = size
                .trim()
                .parse()
                .map_err(|_| ConfigError::Parse(format!("{PAGE_SIZE_VAR}={size} is not a number")))?;
        }
        if let Some(level) = var(LOG_LEVEL_VAR) {
            self.observability.log_level = level.trim().to_lowercase();
        }
        if let Some(flag) = var(METRICS_VAR) {
            self.observability.metrics = match flag.trim().to_lowercase().as_str() {
                "1" | "true" | "yes" | "on" => true,
                "0" | "false" | "no" | "off" | "" => false,
                _ => {
                    return Err(ConfigError::Parse(format!(
                        "{METRICS_VAR}={flag} is not a boolean"
                    )));
                }
            };
        }
        if let Some(project) = var(PROJECT_ID_VAR) {
            self.firestore.project_id = Some(project);
        }
        if let Some(key) = var(API_KEY_VAR) {
            self.firestore.api_key = Some(key);
        }
        Ok(())
    }

    /// Validate entire configuration
    ///
    /// # Errors
    ///
    /// Returns error if any section is invalid
    pub fn validate(&self) -> Result<(), ConfigError> {
        self.feed.validate()?;
        self.firestore.validate()?;
        self.pagination.page_size()?;
        self.observability.validate()?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    #![allow(clippy::unwrap_used)]

    use super::*;
    use std::collections::HashMap;

    fn vars(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| ((*k).to_string(), (*v).to_string()))
            .collect();
        move |name| map.get(name).cloned()
    }

    #[test]
    fn defaults_are_valid() {
        let config = AppConfig::load(vars(&[])).unwrap();
        assert_eq!(config.feed.base_url, "https://jsonplaceholder.typicode.com");
        assert_eq!(config.feed.limit, 200);
        assert_eq!(config.feed.timeout(), Duration::from_secs(10));
        assert_eq!(config.firestore.collection, "todos");
        assert_eq!(config.pagination.page_size().unwrap().get(), 10);
        assert_eq!(config.observability.log_level, "info");
        assert!(!config.observability.metrics);
        assert!(config.firestore.project_id.is_none());
        assert_eq!(config.firestore.token_base_url, "https://securetoken.googleapis.com");
    }

    #[test]
    fn feed_limit_stays_within_feed_id_range() {
        let config = AppConfig::from_toml("[feed]\nlimit = 200\n").unwrap();
        assert!(config.validate().is_ok());

        let config = AppConfig::from_toml("[feed]\nlimit = 201\n").unwrap();
        let err = config.validate().unwrap_err();
        assert!(matches!(err, ConfigError::Validation(_)));
        assert!(err.to_string().contains("feed.limit must be <= 200"));
    }

    #[test]
    fn metrics_flag_override() {
        let config = AppConfig::load(vars(&[(METRICS_VAR, "true")])).unwrap();
        assert!(config.observability.metrics);

        let err = AppConfig::load(vars(&[(METRICS_VAR, "sometimes")])).unwrap_err();
        assert!(matches!(err, ConfigError::Parse(_)));
    }

    #[test]
    fn partial_toml_keeps_defaults() {
        let config = AppConfig::from_toml(
            r#"
            [firestore]
            project_id = "demo"

            [pagination]
            page_size = 25
            "#,
        )
        .unwrap();
        assert_eq!(config.firestore.require_project_id().unwrap(), "demo");
        assert_eq!(config.pagination.page_size, 25);
        assert_eq!(config.feed, FeedConfig::default());
    }

    #[test]
    fn api_key_is_never_read_from_file() {
        let config = AppConfig::from_toml("[firestore]\napi_key = \"leaked\"\n").unwrap();
        assert_eq!(config.firestore.api_key, None);
        assert!(matches!(
            config.firestore.require_api_key(),
            Err(ConfigError::EnvVarNotSet(var)) if var == API_KEY_VAR
        ));
    }

    #[test]
    fn environment_overrides_apply() {
        let config = AppConfig::load(vars(&[
            (PAGE_SIZE_VAR, "5"),
            (LOG_LEVEL_VAR, "DEBUG"),
            (PROJECT_ID_VAR, "demo"),
            (API_KEY_VAR, "web-key"),
        ]))
        .unwrap();
        assert_eq!(config.pagination.page_size, 5);
        assert_eq!(config.observability.log_level, "debug");
        assert_eq!(config.firestore.project_id.as_deref(), Some("demo"));
        assert_eq!(config.firestore.require_api_key().unwrap(), "web-key");
    }

    #[test]
    fn zero_page_size_is_rejected() {
        let err = AppConfig::load(vars(&[(PAGE_SIZE_VAR, "0")])).unwrap_err();
        assert!(matches!(err, ConfigError::Validation(_)));

        let err = AppConfig::load(vars(&[(PAGE_SIZE_VAR, "ten")])).unwrap_err();
        assert!(matches!(err, ConfigError::Parse(_)));
    }

    #[test]
    fn unknown_log_level_is_rejected() {
        let err = AppConfig::load(vars(&[(LOG_LEVEL_VAR, "verbose")])).unwrap_err();
        assert!(err.to_string().contains("Invalid log level: verbose"));
    }

    #[test]
    fn missing_config_file_is_a_parse_error() {
        let err = AppConfig::load(vars(&[(CONFIG_PATH_VAR, "/nonexistent/horizon-todo.toml")]))
            .unwrap_err();
        assert!(matches!(err, ConfigError::Parse(_)));
    }

    #[test]
    fn test_config_error_display() {
        let err = ConfigError::EnvVarNotSet("TEST_VAR".to_string());
        assert_eq!(err.to_string(), "Environment variable not set: TEST_VAR");

        let err = ConfigError::Validation("test failed".to_string());
        assert_eq!(err.to_string(), "Configuration validation failed: test failed");
    }
}

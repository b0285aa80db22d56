//! Configuration management for the back-office client

use crate::types::UserSummary;
use serde::{Deserialize, Serialize};
use std::path::Path;
use std::time::Duration;

/// Main configuration structure
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
#[serde(default)]
pub struct Config {
    /// REST API configuration
    pub api: ApiConfig,

    /// Push channel configuration
    pub push: PushConfig,

    /// Order list configuration
    pub orders: OrdersConfig,

    /// Logging configuration
    pub logging: LoggingConfig,
}

/// REST API configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ApiConfig {
    /// Base URL of the REST API
    pub base_url: String,

    /// Bearer token, usually supplied through the environment
    #[serde(skip_serializing_if = "Option::is_none")]
    pub token: Option<String>,

    /// Request timeout in seconds
    pub request_timeout_seconds: u64,

    /// Maximum product lookups in flight while enriching orders
    pub max_concurrent_lookups: usize,

    /// Signed-in operator shown alongside the order list
    #[serde(skip_serializing_if = "Option::is_none")]
    pub user: Option<UserSummary>,
}

/// Push channel configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct PushConfig {
    /// WebSocket URL of the notification feed
    pub url: String,

    /// Buffered messages between the connection task and its subscriber
    pub buffer: usize,

    /// Reconnection behaviour after the connection drops
    pub reconnect: ReconnectConfig,
}

/// How the push channel reconnects
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Default)]
#[serde(rename_all = "snake_case")]
pub enum ReconnectMode {
    /// Stay disconnected
    None,
    /// Wait a fixed delay between attempts
    Fixed,
    /// Grow the delay geometrically up to a ceiling
    #[default]
    Backoff,
}

/// Reconnection settings
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ReconnectConfig {
    /// Reconnection mode
    pub mode: ReconnectMode,

    /// Delay for `fixed` mode in milliseconds
    pub delay_ms: u64,

    /// First delay for `backoff` mode in milliseconds
    pub initial_delay_ms: u64,

    /// Delay ceiling for `backoff` mode in milliseconds
    pub max_delay_ms: u64,

    /// Growth factor for `backoff` mode
    pub multiplier: f64,

    /// Consecutive failed attempts before giving up (unbounded when absent)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub max_attempts: Option<u32>,
}

/// Order list configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct OrdersConfig {
    /// Orders per page
    pub page_size: usize,
}

/// Logging configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    /// Log level
    pub level: String,

    /// Log format (json or pretty)
    pub format: String,
}

// Default value functions
fn default_base_url() -> String {
    "http://127.0.0.1:3000".to_string()
}

const fn default_request_timeout() -> u64 {
    30
}

const fn default_max_concurrent_lookups() -> usize {
    8
}

fn default_push_url() -> String {
    "ws://127.0.0.1:3000".to_string()
}

const fn default_push_buffer() -> usize {
    64
}

const fn default_reconnect_delay() -> u64 {
    2_000
}

const fn default_initial_delay() -> u64 {
    500
}

const fn default_max_delay() -> u64 {
    30_000
}

const fn default_multiplier() -> f64 {
    2.0
}

const fn default_page_size() -> usize {
    10
}

fn default_log_level() -> String {
    "info".to_string()
}

fn default_log_format() -> String {
    "pretty".to_string()
}

impl Default for ApiConfig {
    fn default() -> Self {
        Self {
            base_url: default_base_url(),
            token: None,
            request_timeout_seconds: default_request_timeout(),
            max_concurrent_lookups: default_max_concurrent_lookups(),
            user: None,
        }
    }
}

impl Default for PushConfig {
    fn default() -> Self {
        Self {
            url: default_push_url(),
            buffer: default_push_buffer(),
            reconnect: ReconnectConfig::default(),
        }
    }
}

impl Default for ReconnectConfig {
    fn default() -> Self {
        Self {
            mode: ReconnectMode::default(),
            delay_ms: default_reconnect_delay(),
            initial_delay_ms: default_initial_delay(),
            max_delay_ms: default_max_delay(),
            multiplier: default_multiplier(),
            max_attempts: None,
        }
    }
}

impl Default for OrdersConfig {
    fn default() -> Self {
        Self {
            page_size: default_page_size(),
        }
    }
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
            format: default_log_format(),
        }
    }
}

fn environment() -> config::Environment {
    config::Environment::with_prefix("BACKOFFICE")
        .prefix_separator("__")
        .separator("__")
}

impl ApiConfig {
    /// Get request timeout as Duration
    #[must_use]
    pub const fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_seconds)
    }
}

impl Config {
    /// Load configuration from `backoffice.toml` (optional) and the environment
    ///
    /// Environment keys use the `BACKOFFICE` prefix and `__` between
    /// sections, e.g. `BACKOFFICE__API__TOKEN`.
    ///
    /// # Errors
    ///
    /// Returns an error if configuration cannot be loaded, parsed or validated.
    pub fn load() -> crate::Result<Self> {
        Self::build(
            config::File::with_name("backoffice").required(false),
            environment(),
        )
    }

    /// Load configuration from an explicit file, still layering the environment on top
    ///
    /// # Errors
    ///
    /// Returns an error if the file is missing or invalid, or validation fails.
    pub fn load_from(path: &Path) -> crate::Result<Self> {
        Self::build(config::File::from(path).required(true), environment())
    }

    fn build<S>(file: S, environment: config::Environment) -> crate::Result<Self>
    where
        S: config::Source + Send + Sync + 'static,
    {
        let config: Self = config::Config::builder()
            .add_source(file)
            .add_source(environment)
            .build()?
            .try_deserialize()?;

        config.validate()?;
        Ok(config)
    }

    /// Check values that would make the client misbehave
    ///
    /// # Errors
    ///
    /// Returns [`crate::Error::Validation`] naming the offending field.
    pub fn validate(&self) -> crate::Result<()> {
        if self.orders.page_size == 0 {
            return Err(crate::Error::validation(
                "orders.page_size",
                "must be greater than zero",
            ));
        }
        if self.api.max_concurrent_lookups == 0 {
            return Err(crate::Error::validation(
                "api.max_concurrent_lookups",
                "must be greater than zero",
            ));
        }
        if self.push.buffer == 0 {
            return Err(crate::Error::validation(
                "push.buffer",
                "must be greater than zero",
            ));
        }
        let reconnect = &self.push.reconnect;
        if reconnect.mode == ReconnectMode::Backoff && reconnect.multiplier < 1.0 {
            return Err(crate::Error::validation(
                "push.reconnect.multiplier",
                "must be at least 1.0",
            ));
        }
        Ok(())
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::float_cmp)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use std::io::Write;

    #[test]
    fn test_config_default() {
        let config = Config::default();

        assert_eq!(config.api.base_url, "http://127.0.0.1:3000");
        assert!(config.api.token.is_none());
        assert_eq!(config.api.request_timeout(), Duration::from_secs(30));
        assert_eq!(config.api.max_concurrent_lookups, 8);

        assert_eq!(config.push.url, "ws://127.0.0.1:3000");
        assert_eq!(config.push.buffer, 64);
        assert_eq!(config.push.reconnect.mode, ReconnectMode::Backoff);
        assert_eq!(config.push.reconnect.multiplier, 2.0);

        assert_eq!(config.orders.page_size, 10);
        assert_eq!(config.logging.level, "info");
        assert_eq!(config.logging.format, "pretty");

        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_validate_rejects_zero_page_size() {
        let mut config = Config::default();
        config.orders.page_size = 0;

        let err = config.validate().unwrap_err();
        assert!(err.to_string().contains("orders.page_size"));
    }

    #[test]
    fn test_validate_rejects_shrinking_backoff() {
        let mut config = Config::default();
        config.push.reconnect.multiplier = 0.5;

        assert!(config.validate().is_err());

        config.push.reconnect.mode = ReconnectMode::Fixed;
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_partial_toml_keeps_defaults() {
        let config: Config = toml_like_source(
            r#"
            [orders]
            page_size = 25

            [push.reconnect]
            mode = "fixed"
            delay_ms = 250
            "#,
        );

        assert_eq!(config.orders.page_size, 25);
        assert_eq!(config.push.reconnect.mode, ReconnectMode::Fixed);
        assert_eq!(config.push.reconnect.delay_ms, 250);
        assert_eq!(config.push.url, "ws://127.0.0.1:3000");
        assert_eq!(config.api.max_concurrent_lookups, 8);
    }

    #[test]
    fn test_load_from_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("backoffice.toml");
        let mut file = std::fs::File::create(&path).unwrap();
        writeln!(file, "[api]\nbase_url = \"http://shop.test\"\n").unwrap();

        let config = Config::load_from(&path).unwrap();
        assert_eq!(config.api.base_url, "http://shop.test");
    }

    #[test]
    fn test_environment_overrides_file() {
        let env: config::Map<String, String> = [
            ("BACKOFFICE__API__TOKEN", "secret"),
            ("BACKOFFICE__API__USER__NAME", "Amira"),
            ("BACKOFFICE__ORDERS__PAGE_SIZE", "25"),
            ("BACKOFFICE__PUSH__RECONNECT__MODE", "none"),
            ("BACKOFFICE_API__BASE_URL", "http://ignored.test"),
            ("OTHER__API__REQUEST_TIMEOUT_SECONDS", "1"),
        ]
        .into_iter()
        .map(|(key, value)| (key.to_string(), value.to_string()))
        .collect();
        let file = config::File::from_str(
            "[orders]\npage_size = 5\n",
            config::FileFormat::Toml,
        );

        let config = Config::build(file, environment().source(Some(env))).unwrap();

        assert_eq!(config.api.token.as_deref(), Some("secret"));
        assert_eq!(config.api.user.unwrap().name, "Amira");
        assert_eq!(config.orders.page_size, 25);
        assert_eq!(config.push.reconnect.mode, ReconnectMode::None);
        assert_eq!(config.api.base_url, "http://127.0.0.1:3000");
        assert_eq!(config.api.request_timeout_seconds, 30);
    }

    #[test]
    fn test_environment_values_are_validated() {
        let env: config::Map<String, String> =
            std::iter::once(("BACKOFFICE__ORDERS__PAGE_SIZE".to_string(), "0".to_string()))
                .collect();
        let file = config::File::from_str("", config::FileFormat::Toml);

        let err = Config::build(file, environment().source(Some(env))).unwrap_err();
        assert!(err.to_string().contains("orders.page_size"));
    }

    #[test]
    fn test_load_from_missing_file_fails() {
        let result = Config::load_from(Path::new("/nonexistent/backoffice.toml"));
        assert!(matches!(result, Err(crate::Error::Configuration { .. })));
    }

    fn toml_like_source(text: &str) -> Config {
        config::Config::builder()
            .add_source(config::File::from_str(text, config::FileFormat::Toml))
            .build()
            .unwrap()
            .try_deserialize()
            .unwrap()
    }
}

//! Realtime configuration
//!
//! Precedence: environment variables (after `.env` is loaded) override the
//! optional YAML file, which overrides the built-in defaults.

use livewire::ReconnectPolicy;
use serde::{Deserialize, Serialize};
use std::path::Path;
use std::time::Duration;
use thiserror::Error;
use tracing::info;

pub const ENV_WS_URL: &str = "WS_URL";
pub const ENV_RECONNECT_INTERVAL_MS: &str = "WS_RECONNECT_INTERVAL_MS";
pub const ENV_MAX_RECONNECT_ATTEMPTS: &str = "WS_MAX_RECONNECT_ATTEMPTS";
pub const ENV_LOG_LEVEL: &str = "LOG_LEVEL";

const VALID_LOG_LEVELS: [&str; 5] = ["error", "warn", "info", "debug", "trace"];

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("Failed to load config file: {0}")]
    FileError(#[from] std::io::Error),

    #[error("Failed to parse YAML: {0}")]
    YamlError(#[from] serde_yaml::Error),

    #[error("Invalid number in {var}: '{value}'")]
    InvalidNumber { var: &'static str, value: String },

    #[error("Invalid configuration: {0}")]
    ValidationError(String),
}

pub type Result<T> = std::result::Result<T, ConfigError>;

/// Realtime client configuration
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RealtimeConfig {
    /// Base address every channel path is appended to
    #[serde(default = "default_ws_url")]
    pub ws_url: String,
    #[serde(default = "default_reconnect_interval_ms")]
    pub reconnect_interval_ms: u64,
    #[serde(default = "default_max_reconnect_attempts")]
    pub max_reconnect_attempts: usize,
    /// Log level (error, warn, info, debug, trace)
    #[serde(default = "default_log_level")]
    pub log_level: String,
}

fn default_ws_url() -> String {
    "ws://localhost:8000".to_string()
}

fn default_reconnect_interval_ms() -> u64 {
    3000
}

fn default_max_reconnect_attempts() -> usize {
    10
}

fn default_log_level() -> String {
    "info".to_string()
}

impl Default for RealtimeConfig {
    fn default() -> Self {
        Self {
            ws_url: default_ws_url(),
            reconnect_interval_ms: default_reconnect_interval_ms(),
            max_reconnect_attempts: default_max_reconnect_attempts(),
            log_level: default_log_level(),
        }
    }
}

impl RealtimeConfig {
    /// Defaults overridden by the process environment
    pub fn from_env() -> Result<Self> {
        dotenv::dotenv().ok();
        let mut config = Self::default();
        config.apply_overrides(|key| std::env::var(key).ok())?;
        config.validate()?;
        Ok(config)
    }

    /// Load configuration from a YAML file, then apply environment overrides
    pub fn load(config_path: impl AsRef<Path>) -> Result<Self> {
        dotenv::dotenv().ok();
        let yaml_content = std::fs::read_to_string(config_path)?;
        let mut config: RealtimeConfig = serde_yaml::from_str(&yaml_content)?;
        config.apply_overrides(|key| std::env::var(key).ok())?;
        config.validate()?;
        Ok(config)
    }

    /// Like [`load`](Self::load) when the file exists, [`from_env`](Self::from_env) otherwise
    pub fn load_or_default(config_path: impl AsRef<Path>) -> Result<Self> {
        let path = config_path.as_ref();
        if path.exists() {
            Self::load(path)
        } else {
            info!("No config file at {}, using defaults", path.display());
            Self::from_env()
        }
    }

    /// Apply overrides from `lookup` (normally the environment)
    pub fn apply_overrides<F>(&mut self, lookup: F) -> Result<()>
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(url) = lookup(ENV_WS_URL) {
            self.ws_url = url;
        }
        if let Some(raw) = lookup(ENV_RECONNECT_INTERVAL_MS) {
            self.reconnect_interval_ms = parse_number(ENV_RECONNECT_INTERVAL_MS, &raw)?;
        }
        if let Some(raw) = lookup(ENV_MAX_RECONNECT_ATTEMPTS) {
            self.max_reconnect_attempts = parse_number(ENV_MAX_RECONNECT_ATTEMPTS, &raw)?;
        }
        if let Some(level) = lookup(ENV_LOG_LEVEL) {
            self.log_level = level;
        }
        Ok(())
    }

    /// Validate configuration values
    pub fn validate(&self) -> Result<()> {
        if self.ws_url.trim().is_empty() {
            return Err(ConfigError::ValidationError("ws_url must not be empty".to_string()));
        }

        if !self.ws_url.starts_with("ws://") && !self.ws_url.starts_with("wss://") {
            return Err(ConfigError::ValidationError(format!(
                "ws_url must start with ws:// or wss:// (got '{}')",
                self.ws_url
            )));
        }

        if self.reconnect_interval_ms == 0 {
            return Err(ConfigError::ValidationError(
                "reconnect_interval_ms must be greater than 0".to_string(),
            ));
        }

        if !VALID_LOG_LEVELS.contains(&self.log_level.to_lowercase().as_str()) {
            return Err(ConfigError::ValidationError(format!(
                "log_level must be one of: {}",
                VALID_LOG_LEVELS.join(", ")
            )));
        }

        Ok(())
    }

    pub fn reconnect_interval(&self) -> Duration {
        Duration::from_millis(self.reconnect_interval_ms)
    }

    /// Reconnect policy applied to every channel
    pub fn reconnect_policy(&self) -> ReconnectPolicy {
        ReconnectPolicy::new(self.reconnect_interval(), self.max_reconnect_attempts)
    }

    /// Log configuration summary
    pub fn log(&self) {
        info!("Configuration loaded:");
        info!("  Realtime base URL: {}", self.ws_url);
        info!("  Reconnect interval: {} ms", self.reconnect_interval_ms);
        info!("  Max reconnect attempts: {}", self.max_reconnect_attempts);
        info!("  Log level: {}", self.log_level);
    }
}

fn parse_number<T: std::str::FromStr>(var: &'static str, raw: &str) -> Result<T> {
    raw.trim().parse().map_err(|_| ConfigError::InvalidNumber {
        var,
        value: raw.to_string(),
    })
}

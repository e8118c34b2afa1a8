//! Per-instance configuration, loaded once at startup.
//!
//! Grounded in `at-core::config::Config`: same `load`/`load_from` split, same
//! TOML-with-serde-defaults shape, same `ConfigError` via `thiserror`.

use std::collections::HashMap;
use std::path::PathBuf;

use cr_api_types::ModelEntry;
use serde::{Deserialize, Serialize};

/// Top-level configuration loaded from `~/.clawrouter/config.toml`. Unknown
/// fields are ignored, which `#[serde(default)]` on every section
/// gives us for free.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub server: ServerConfig,
    #[serde(default)]
    pub logging: LoggingConfig,
    /// Partial override of `cr_classifier::ScoringConfig`, merged over the
    /// built-in defaults by `cr-classifier`. Kept as an opaque JSON value
    /// here so `cr-core` doesn't need to depend on `cr-classifier`.
    #[serde(default)]
    pub routing_config: Option<serde_json::Value>,
    /// Replace or add catalog entries by id.
    #[serde(default)]
    pub model_overrides: Option<HashMap<String, ModelEntry>>,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            server: ServerConfig::default(),
            logging: LoggingConfig::default(),
            routing_config: None,
            model_overrides: None,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerConfig {
    #[serde(default = "default_port")]
    pub port: u16,
    #[serde(default = "default_host")]
    pub host: String,
    /// Wallet address surfaced by `GET /health`; settlement itself is out
    /// of scope for this crate.
    #[serde(default)]
    pub wallet_key: Option<String>,
}

fn default_port() -> u16 {
    18800
}

fn default_host() -> String {
    "127.0.0.1".to_string()
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            port: default_port(),
            host: default_host(),
            wallet_key: None,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoggingConfig {
    #[serde(default = "default_log_level")]
    pub level: String,
    #[serde(default)]
    pub json: bool,
}

fn default_log_level() -> String {
    "info".to_string()
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
            json: false,
        }
    }
}

impl Config {
    /// Load from `~/.clawrouter/config.toml`, falling back to defaults when
    /// the file does not exist.
    pub fn load() -> Result<Self, ConfigError> {
        let path = Self::default_path();
        if path.exists() {
            Self::load_from(path)
        } else {
            Ok(Config::default())
        }
    }

    pub fn load_from(path: impl Into<PathBuf>) -> Result<Self, ConfigError> {
        let path = path.into();
        let text = std::fs::read_to_string(&path).map_err(|e| ConfigError::Io(e.to_string()))?;
        toml::from_str(&text).map_err(|e| ConfigError::Parse(e.to_string()))
    }

    pub fn to_toml(&self) -> Result<String, ConfigError> {
        toml::to_string_pretty(self).map_err(|e| ConfigError::Parse(e.to_string()))
    }

    fn default_path() -> PathBuf {
        dirs::home_dir()
            .unwrap_or_else(|| PathBuf::from("."))
            .join(".clawrouter")
            .join("config.toml")
    }
}

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("io: {0}")]
    Io(String),
    #[error("parse: {0}")]
    Parse(String),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_config_binds_loopback_default_port() {
        let config = Config::default();
        assert_eq!(config.server.port, 18800);
        assert_eq!(config.server.host, "127.0.0.1");
    }

    #[test]
    fn load_from_missing_path_errors() {
        let result = Config::load_from("/nonexistent/clawrouter-config.toml");
        assert!(matches!(result, Err(ConfigError::Io(_))));
    }

    #[test]
    fn load_from_parses_partial_overrides() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.toml");
        std::fs::write(
            &path,
            r#"
            [server]
            port = 9999

            [logging]
            level = "debug"
            json = true
            "#,
        )
        .unwrap();

        let config = Config::load_from(&path).unwrap();
        assert_eq!(config.server.port, 9999);
        assert_eq!(config.logging.level, "debug");
        assert!(config.logging.json);
    }

    #[test]
    fn unknown_fields_are_ignored() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.toml");
        std::fs::write(&path, "unknown_top_level = true\n").unwrap();
        let config = Config::load_from(&path).unwrap();
        assert_eq!(config.server.port, default_port());
    }

    #[test]
    fn round_trips_through_toml() {
        let config = Config::default();
        let toml = config.to_toml().unwrap();
        let reparsed: Config = toml::from_str(&toml).unwrap();
        assert_eq!(reparsed.server.port, config.server.port);
    }
}

//! Client configuration.
//!
//! Loaded from `PETCONNECT_*` environment variables (after reading a `.env`
//! file when one exists). Nested keys use `__`, e.g.
//! `PETCONNECT_API__BASE_URL` or `PETCONNECT_AI__API_KEY`.

use std::path::PathBuf;
use std::time::Duration;

use config::{Config, ConfigError, Environment};
use secrecy::Secret;
use serde::Deserialize;

pub const DEFAULT_API_BASE_URL: &str = "http://localhost:8080";
pub const DEFAULT_TIMEOUT_SECS: u64 = 30;
pub const DEFAULT_AI_BASE_URL: &str = "https://generativelanguage.googleapis.com";
pub const DEFAULT_AI_MODEL: &str = "gemini-2.0-flash";

#[derive(Debug, Clone, Deserialize)]
pub struct ApiConfig {
    /// Backend origin, without a trailing path.
    pub base_url: String,
    /// Per-request timeout in seconds.
    pub timeout_secs: u64,
}

impl ApiConfig {
    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct StorageConfig {
    /// Session file. Front ends pick a platform location when unset.
    #[serde(default)]
    pub path: Option<PathBuf>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct AiConfig {
    pub base_url: String,
    pub model: String,
    /// Without a key the biography generator always falls back.
    #[serde(default)]
    pub api_key: Option<Secret<String>>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct LoggingConfig {
    /// trace, debug, info, warn or error
    pub level: String,
    /// json, pretty or compact
    pub format: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ClientConfig {
    pub api: ApiConfig,
    #[serde(default)]
    pub storage: StorageConfig,
    pub ai: AiConfig,
    pub logging: LoggingConfig,
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            api: ApiConfig {
                base_url: DEFAULT_API_BASE_URL.to_string(),
                timeout_secs: DEFAULT_TIMEOUT_SECS,
            },
            storage: StorageConfig::default(),
            ai: AiConfig {
                base_url: DEFAULT_AI_BASE_URL.to_string(),
                model: DEFAULT_AI_MODEL.to_string(),
                api_key: None,
            },
            logging: LoggingConfig {
                level: "info".to_string(),
                format: "pretty".to_string(),
            },
        }
    }
}

impl ClientConfig {
    /// Defaults pointed at another backend.
    pub fn with_base_url(base_url: impl Into<String>) -> Self {
        let mut config = Self::default();
        config.api.base_url = base_url.into();
        config
    }

    pub fn from_env() -> Result<Self, ConfigError> {
        dotenv::dotenv().ok();

        let settings = Config::builder()
            .set_default("api.base_url", DEFAULT_API_BASE_URL)?
            .set_default("api.timeout_secs", DEFAULT_TIMEOUT_SECS)?
            .set_default("ai.base_url", DEFAULT_AI_BASE_URL)?
            .set_default("ai.model", DEFAULT_AI_MODEL)?
            .set_default("logging.level", "info")?
            .set_default("logging.format", "pretty")?
            .add_source(
                Environment::with_prefix("PETCONNECT")
                    .prefix_separator("_")
                    .separator("__")
                    .try_parsing(true),
            );

        let config: ClientConfig = settings.build()?.try_deserialize()?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.api.base_url.trim().is_empty() {
            return Err(ConfigError::Message("api.base_url must not be empty".to_string()));
        }
        if self.api.timeout_secs == 0 {
            return Err(ConfigError::Message(
                "api.timeout_secs must be greater than zero".to_string(),
            ));
        }

        match self.logging.level.to_lowercase().as_str() {
            "trace" | "debug" | "info" | "warn" | "error" => {}
            _ => {
                return Err(ConfigError::Message(format!(
                    "Invalid log level: {}. Must be one of: trace, debug, info, warn, error",
                    self.logging.level
                )))
            }
        }

        match self.logging.format.to_lowercase().as_str() {
            "json" | "pretty" | "compact" => {}
            _ => {
                return Err(ConfigError::Message(format!(
                    "Invalid log format: {}. Must be one of: json, pretty, compact",
                    self.logging.format
                )))
            }
        }

        Ok(())
    }
}

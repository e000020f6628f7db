use serde::{Deserialize, Serialize};
use std::{collections::HashMap, path::PathBuf};

use super::loader::ConfigLoader;
use crate::errors::ConfigError;
use crate::infrastructure::container::ContainerOptions;
use crate::logging::{LogFormat, LoggingConfig};
use crate::rate_limit::RateLimitConfig;

// Configuration location constants
pub const USER_CONFIG_PATH: &str = "~/.config/ndulo";
pub const CONFIG_FILE_NAME: &str = "config.toml";

// Environment overrides
pub const ENV_LOG_LEVEL: &str = "NDULO_LOG_LEVEL";
pub const ENV_LOG_FORMAT: &str = "NDULO_LOG_FORMAT";
pub const ENV_STRICT_REGISTRATION: &str = "NDULO_STRICT_REGISTRATION";

/// Main Application Configuration
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct AppConfig {
    pub logging: LoggingConfig,
    pub container: ContainerOptions,
    pub rate_limit: RateLimitConfig,
}

/// Partial Application Configuration for loading from files
#[derive(Deserialize, Debug, Default)]
pub struct PartialAppConfig {
    logging: Option<LoggingConfig>,
    container: Option<ContainerOptions>,
    rate_limit: Option<RateLimitConfig>,
}

impl AppConfig {
    /// Load configuration from file and environment
    pub fn load() -> Result<Self, ConfigError> {
        ConfigLoader::new().load_config()
    }

    /// Load configuration with custom base path (for testing)
    pub fn load_with_base_path(base_path: PathBuf) -> Result<Self, ConfigError> {
        ConfigLoader::with_base_path(base_path).load_config()
    }

    /// Create AppConfig from partial config and environment
    pub fn from_partial_and_env(
        partial: Option<PartialAppConfig>,
        env_map: &HashMap<String, String>,
    ) -> Result<Self, ConfigError> {
        let partial = partial.unwrap_or_default();

        let mut logging = partial.logging.unwrap_or_default();
        if let Some(level) = env_map.get(ENV_LOG_LEVEL) {
            logging.level = level.clone();
        }
        if let Some(format) = env_map.get(ENV_LOG_FORMAT) {
            logging.format = parse_log_format(format)?;
        }

        let mut container = partial.container.unwrap_or_default();
        if let Some(strict) = env_map.get(ENV_STRICT_REGISTRATION) {
            container.strict_registration = parse_bool(ENV_STRICT_REGISTRATION, strict)?;
        }

        let config = AppConfig {
            logging,
            container,
            rate_limit: partial.rate_limit.unwrap_or_default(),
        };
        config.validate()?;
        Ok(config)
    }

    /// Validate the configuration
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.logging.level.trim().is_empty() {
            return Err(ConfigError::InvalidValue {
                key: "logging.level".to_string(),
                value: self.logging.level.clone(),
            });
        }
        if self.rate_limit.window_ms == 0 {
            return Err(ConfigError::InvalidValue {
                key: "rate_limit.window_ms".to_string(),
                value: "0".to_string(),
            });
        }
        if self.rate_limit.max_requests == 0 {
            return Err(ConfigError::InvalidValue {
                key: "rate_limit.max_requests".to_string(),
                value: "0".to_string(),
            });
        }
        Ok(())
    }

    /// Render the effective configuration as TOML.
    pub fn to_toml(&self) -> Result<String, ConfigError> {
        Ok(toml::to_string_pretty(self)?)
    }
}

fn parse_bool(key: &str, value: &str) -> Result<bool, ConfigError> {
    match value.trim().to_ascii_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Ok(true),
        "0" | "false" | "no" | "off" => Ok(false),
        _ => Err(ConfigError::InvalidValue {
            key: key.to_string(),
            value: value.to_string(),
        }),
    }
}

fn parse_log_format(value: &str) -> Result<LogFormat, ConfigError> {
    match value.trim().to_ascii_lowercase().as_str() {
        "pretty" => Ok(LogFormat::Pretty),
        "json" => Ok(LogFormat::Json),
        "compact" => Ok(LogFormat::Compact),
        _ => Err(ConfigError::InvalidValue {
            key: ENV_LOG_FORMAT.to_string(),
            value: value.to_string(),
        }),
    }
}

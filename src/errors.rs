use thiserror::Error;

use crate::infrastructure::container::ContainerError;
use crate::logging::LoggingError;

/// 顶层错误类型，统一配置、日志与依赖装配错误
#[derive(Debug, Error)]
pub enum NduloError {
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),
    #[error("Logging error: {0}")]
    Logging(#[from] LoggingError),
    #[error("Container error: {0}")]
    Container(#[from] ContainerError),
    #[error("I/O error while {0}: {1}")]
    IO(String, #[source] std::io::Error),
}

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Failed to read file '{0}': {1}")]
    FileRead(String, #[source] std::io::Error),
    #[error("Failed to write to path '{0}': {1}")]
    FileWrite(String, #[source] std::io::Error),
    #[error("Failed to parse TOML from file '{0}': {1}")]
    TomlParse(String, #[source] toml::de::Error),
    #[error("Invalid value '{value}' for {key}")]
    InvalidValue { key: String, value: String },
    #[error("Failed to serialize configuration: {0}")]
    Serialize(#[from] toml::ser::Error),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn config_error_converts_into_umbrella() {
        let err: NduloError = ConfigError::InvalidValue {
            key: "NDULO_STRICT_REGISTRATION".to_string(),
            value: "maybe".to_string(),
        }
        .into();
        assert!(matches!(err, NduloError::Config(_)));
        assert!(err.to_string().contains("NDULO_STRICT_REGISTRATION"));
    }

    #[test]
    fn container_error_keeps_its_message() {
        let err: NduloError = ContainerError::NotRegistered {
            token: "db".to_string(),
        }
        .into();
        assert!(err.to_string().contains("db"));
    }
}

use std::{collections::HashMap, env, fs, path::Path, path::PathBuf};

use super::app_config::{
    AppConfig, PartialAppConfig, CONFIG_FILE_NAME, ENV_LOG_FORMAT, ENV_LOG_LEVEL,
    ENV_STRICT_REGISTRATION, USER_CONFIG_PATH,
};
use crate::errors::ConfigError;

/// Configuration loader responsible for loading config from files and environment
pub struct ConfigLoader {
    base_path: Option<PathBuf>,
    explicit_path: Option<PathBuf>,
}

impl ConfigLoader {
    /// Create a new config loader with default paths
    pub fn new() -> Self {
        Self {
            base_path: None,
            explicit_path: None,
        }
    }

    /// Create a config loader with custom base path (for testing)
    pub fn with_base_path(base_path: PathBuf) -> Self {
        Self {
            base_path: Some(base_path),
            explicit_path: None,
        }
    }

    /// Load from an exact file, as given by `--config`.
    pub fn with_path(path: PathBuf) -> Self {
        Self {
            base_path: None,
            explicit_path: Some(path),
        }
    }

    /// Location of the config file this loader reads.
    pub fn config_path(&self) -> PathBuf {
        if let Some(path) = &self.explicit_path {
            return path.clone();
        }
        let base_dir = if let Some(base_path) = &self.base_path {
            base_path.join(USER_CONFIG_PATH.trim_start_matches("~/"))
        } else {
            PathBuf::from(shellexpand::tilde(USER_CONFIG_PATH).as_ref())
        };
        base_dir.join(CONFIG_FILE_NAME)
    }

    /// Load complete application configuration
    pub fn load_config(&self) -> Result<AppConfig, ConfigError> {
        self.load_with_env(&self.collect_env_vars())
    }

    /// Same as [`load_config`](Self::load_config) with an explicit environment.
    pub fn load_with_env(
        &self,
        env_map: &HashMap<String, String>,
    ) -> Result<AppConfig, ConfigError> {
        let config_path = self.config_path();
        let partial_config = self.load_partial_config(&config_path)?;
        if partial_config.is_none() {
            tracing::debug!("配置文件 {:?} 不存在，使用默认配置", config_path);
        }
        AppConfig::from_partial_and_env(partial_config, env_map)
    }

    /// Write the default configuration if no file exists yet.
    ///
    /// Returns the path and whether a file was created.
    pub fn initialize_config(&self) -> Result<(PathBuf, bool), ConfigError> {
        let config_path = self.config_path();
        if config_path.exists() {
            tracing::info!("配置文件已存在: {:?}", config_path);
            return Ok((config_path, false));
        }

        if let Some(config_dir) = config_path.parent() {
            fs::create_dir_all(config_dir).map_err(|e| {
                ConfigError::FileWrite(config_dir.to_string_lossy().to_string(), e)
            })?;
        }

        let content = AppConfig::default().to_toml()?;
        fs::write(&config_path, content).map_err(|e| {
            ConfigError::FileWrite(config_path.to_string_lossy().to_string(), e)
        })?;

        tracing::info!("已初始化配置文件: {:?}", config_path);
        Ok((config_path, true))
    }

    /// Load partial configuration from TOML file
    fn load_partial_config(
        &self,
        config_path: &Path,
    ) -> Result<Option<PartialAppConfig>, ConfigError> {
        if !config_path.exists() {
            return Ok(None);
        }

        let content = fs::read_to_string(config_path).map_err(|e| {
            ConfigError::FileRead(config_path.to_string_lossy().to_string(), e)
        })?;

        let partial_config: PartialAppConfig = toml::from_str(&content).map_err(|e| {
            ConfigError::TomlParse(config_path.to_string_lossy().to_string(), e)
        })?;

        Ok(Some(partial_config))
    }

    /// Collect relevant environment variables
    fn collect_env_vars(&self) -> HashMap<String, String> {
        let env_keys = [ENV_LOG_LEVEL, ENV_LOG_FORMAT, ENV_STRICT_REGISTRATION];

        let mut env_map = HashMap::new();
        for key in &env_keys {
            if let Ok(value) = env::var(key) {
                env_map.insert(key.to_string(), value);
            }
        }
        env_map
    }
}

impl Default for ConfigLoader {
    fn default() -> Self {
        Self::new()
    }
}

pub mod app_config;
pub mod loader;

pub use app_config::{AppConfig, PartialAppConfig, CONFIG_FILE_NAME, USER_CONFIG_PATH};
pub use loader::ConfigLoader;

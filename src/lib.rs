pub mod config;
pub mod errors;
pub mod infrastructure;
pub mod logging;
pub mod rate_limit;
pub mod result;

// Re-export commonly used items for convenience
pub use config::AppConfig;
pub use errors::NduloError;
pub use infrastructure::container::{
    ContainerError, ContainerOptions, ContainerStats, Resolver, Scope, ServiceContainer,
    ServiceLifetime, Token,
};
pub use result::{AppError, AppResult};

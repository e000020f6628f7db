//! 基础设施层
//!
//! 提供依赖注入容器。

// 容器实现
pub mod container;

// 重新导出API
pub use container::{
    ContainerError, ContainerOptions, ContainerStats, Resolver, Scope, ServiceContainer,
    ServiceLifetime, Token,
};

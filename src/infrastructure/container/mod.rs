//! 依赖注入容器
//!
//! 令牌与工厂及生命周期一起注册，解析时按需深度优先构造，
//! 并在解析过程中检测循环依赖。

mod error;
mod registry;
mod resolver;
mod scope;
mod service_container;
mod stack;
mod stats;
mod token;

pub use error::{ContainerError, CHAIN_SEPARATOR};
pub use resolver::Resolver;
pub use scope::Scope;
pub use service_container::{ContainerOptions, ServiceContainer};
pub use stats::ContainerStats;
pub use token::Token;

use serde::{Deserialize, Serialize};

/// 服务生命周期
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ServiceLifetime {
    /// 单例：整个容器共享一个实例
    #[default]
    Singleton,
    /// 作用域：每个作用域一个实例
    Scoped,
    /// 瞬态：每次解析都创建新实例
    Transient,
}

//! 容器错误类型
//!
//! 这些错误代表装配缺陷（未注册、循环依赖、重复注册），
//! 应在开发阶段修复，而不是在请求处理中恢复。

use thiserror::Error;

/// 渲染依赖环时使用的分隔符
pub const CHAIN_SEPARATOR: &str = " → ";

/// 依赖注入容器错误
#[derive(Debug, Error)]
pub enum ContainerError {
    /// 令牌未注册
    #[error(
        "token \"{token}\" has not been registered; \
         did you forget to call container.register(\"{token}\", ...)?"
    )]
    NotRegistered { token: String },

    /// 循环依赖，`chain` 以触发循环的令牌开始并结束
    #[error(
        "circular dependency detected: {}; \
         \"{token}\" depends on something that eventually depends on itself",
        .chain.join(CHAIN_SEPARATOR)
    )]
    CircularDependency { token: String, chain: Vec<String> },

    /// 严格模式下的重复注册
    #[error("token \"{token}\" is already registered; strict registration forbids overriding it")]
    AlreadyRegistered { token: String },

    /// 作用域已释放
    #[error("scope {scope_id} has been disposed; cannot resolve \"{token}\"")]
    ScopeDisposed { scope_id: uuid::Uuid, token: String },

    /// 同名令牌绑定了不同的值类型
    #[error("token \"{token}\" resolves to {found}, not {expected}")]
    TypeMismatch {
        token: String,
        expected: &'static str,
        found: &'static str,
    },

    /// 工厂自身失败（非容器错误）
    #[error("factory for \"{token}\" failed: {source}")]
    FactoryFailed {
        token: String,
        #[source]
        source: anyhow::Error,
    },
}

impl ContainerError {
    /// 错误涉及的令牌
    pub fn token(&self) -> &str {
        match self {
            ContainerError::NotRegistered { token }
            | ContainerError::CircularDependency { token, .. }
            | ContainerError::AlreadyRegistered { token }
            | ContainerError::ScopeDisposed { token, .. }
            | ContainerError::TypeMismatch { token, .. }
            | ContainerError::FactoryFailed { token, .. } => token,
        }
    }

    /// 渲染后的依赖环（`a → b → a`），仅循环依赖错误有值
    pub fn cycle_display(&self) -> Option<String> {
        match self {
            ContainerError::CircularDependency { chain, .. } => Some(chain.join(CHAIN_SEPARATOR)),
            _ => None,
        }
    }

    /// 是否为需要修改代码才能解决的装配错误（重试无效）
    pub fn is_wiring_defect(&self) -> bool {
        !matches!(self, ContainerError::FactoryFailed { .. })
    }
}

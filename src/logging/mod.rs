//! 日志系统
//!
//! 基于 `tracing-subscriber` 的初始化，以及 app / http / error 三个日志通道。
//! 通道即 tracing target，可以用 `RUST_LOG=ndulo::http=debug` 单独过滤。

use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::{Span, Subscriber};
use tracing_subscriber::registry::LookupSpan;
use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter, Layer};

/// 应用生命周期日志
pub const APP_LOG_TARGET: &str = "ndulo::app";
/// 请求处理日志
pub const HTTP_LOG_TARGET: &str = "ndulo::http";
/// 未处理错误日志
pub const ERROR_LOG_TARGET: &str = "ndulo::error";

/// 日志环境配置
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LoggingEnvironment {
    /// 开发环境
    #[default]
    Development,
    /// 测试环境
    Testing,
    /// 生产环境
    Production,
}

/// 日志格式配置
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LogFormat {
    /// 人类可读格式
    #[default]
    Pretty,
    /// JSON 格式
    Json,
    /// 紧凑格式
    Compact,
}

/// 日志配置
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    pub environment: LoggingEnvironment,
    /// 默认过滤指令，`RUST_LOG` 存在时以其为准
    pub level: String,
    pub format: LogFormat,
    pub show_target: bool,
    pub show_thread_ids: bool,
    pub show_timestamp: bool,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            environment: LoggingEnvironment::Development,
            level: "info".to_string(),
            format: LogFormat::Pretty,
            show_target: true,
            show_thread_ids: false,
            show_timestamp: true,
        }
    }
}

impl LoggingConfig {
    /// 创建开发环境配置
    pub fn development() -> Self {
        Self {
            level: "debug".to_string(),
            show_thread_ids: true,
            ..Self::default()
        }
    }

    /// 创建生产环境配置
    pub fn production() -> Self {
        Self {
            environment: LoggingEnvironment::Production,
            level: "info".to_string(),
            format: LogFormat::Json,
            show_target: false,
            show_thread_ids: false,
            show_timestamp: true,
        }
    }

    /// 创建测试环境配置
    pub fn testing() -> Self {
        Self {
            environment: LoggingEnvironment::Testing,
            level: "error".to_string(),
            format: LogFormat::Compact,
            show_target: false,
            show_thread_ids: false,
            show_timestamp: false,
        }
    }

    fn filter(&self) -> Result<EnvFilter, LoggingError> {
        match EnvFilter::try_from_default_env() {
            Ok(filter) => Ok(filter),
            Err(_) => EnvFilter::try_new(&self.level)
                .map_err(|e| LoggingError::InvalidFilter(self.level.clone(), e.to_string())),
        }
    }
}

#[derive(Debug, Error)]
pub enum LoggingError {
    #[error("Invalid log filter '{0}': {1}")]
    InvalidFilter(String, String),
}

fn fmt_layer<S>(config: &LoggingConfig) -> Box<dyn Layer<S> + Send + Sync>
where
    S: Subscriber + for<'a> LookupSpan<'a>,
{
    let layer = fmt::layer()
        .with_target(config.show_target)
        .with_thread_ids(config.show_thread_ids)
        .with_ansi(config.environment != LoggingEnvironment::Production);

    match (config.format, config.show_timestamp) {
        (LogFormat::Pretty, true) => layer.pretty().boxed(),
        (LogFormat::Pretty, false) => layer.pretty().without_time().boxed(),
        (LogFormat::Compact, true) => layer.compact().boxed(),
        (LogFormat::Compact, false) => layer.compact().without_time().boxed(),
        (LogFormat::Json, true) => layer.json().boxed(),
        (LogFormat::Json, false) => layer.json().without_time().boxed(),
    }
}

/// 初始化日志系统
///
/// 已安装全局 subscriber 时返回 `Ok(false)`，测试与嵌入方可重复调用。
pub fn init_logging(config: &LoggingConfig) -> Result<bool, LoggingError> {
    let filter = config.filter()?;
    let installed = tracing_subscriber::registry()
        .with(fmt_layer(config))
        .with(filter)
        .try_init()
        .is_ok();

    if installed {
        tracing::info!(
            target: APP_LOG_TARGET,
            environment = ?config.environment,
            level = %config.level,
            format = ?config.format,
            "Logging system initialized"
        );
    }
    Ok(installed)
}

/// 请求级 span，内部记录的事件都带上请求上下文
pub fn request_span(request_id: &str) -> Span {
    tracing::info_span!(target: HTTP_LOG_TARGET, "request", request_id = %request_id)
}

//! 统一结果类型与应用错误分类
//!
//! `map`、`and_then` 等组合子直接使用 `std::result::Result` 自带的方法，
//! 这里只补充错误类型、结果合并函数以及 [`response`] 中的协议转换。

mod app_error;
pub mod response;

pub use app_error::{
    AppError, AppErrorKind, AppErrorType, DatabaseOperation, UnauthorizedReason,
    ValidationFieldError,
};

/// 业务操作结果
pub type AppResult<T> = Result<T, AppError>;

/// 按顺序合并结果，遇到第一个错误即返回
pub fn combine<T, E, I>(results: I) -> Result<Vec<T>, E>
where
    I: IntoIterator<Item = Result<T, E>>,
{
    results.into_iter().collect()
}

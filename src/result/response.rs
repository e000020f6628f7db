//! 将 `AppResult` 翻译为协议层（HTTP）响应

use serde::Serialize;
use serde_json::{json, Map, Value};
use tracing::Level;

use super::{AppError, AppErrorKind, AppErrorType, AppResult};

use crate::logging::HTTP_LOG_TARGET;

/// 状态码与 JSON 响应体，交给 Web 框架适配层输出
#[derive(Debug, Clone, PartialEq)]
pub struct HandlerResponse {
    pub status: u16,
    pub body: Value,
}

pub fn error_status(error: &AppError) -> u16 {
    error.status_code
}

/// `{"success": true, "data": value}`
pub fn format_success_response<T: Serialize>(value: &T) -> Result<Value, serde_json::Error> {
    Ok(json!({
        "success": true,
        "data": serde_json::to_value(value)?,
    }))
}

/// `{"success": false, "error": {type, message, code?, details?, resource?, timestamp}}`
pub fn format_error_response(error: &AppError) -> Value {
    let mut body = Map::new();
    body.insert("type".into(), Value::from(error.error_type().as_str()));
    body.insert("message".into(), Value::from(error.message.as_str()));
    if let Some(code) = error.code() {
        body.insert("code".into(), Value::from(code));
    }
    if let AppErrorKind::Validation { errors } = &error.kind {
        body.insert("details".into(), json!(errors));
    }
    if let Some(resource) = error.resource() {
        body.insert("resource".into(), Value::from(resource));
    }
    body.insert("timestamp".into(), Value::from(error.timestamp.to_rfc3339()));

    json!({ "success": false, "error": body })
}

/// 将处理函数的结果转换为状态码与响应体
pub fn process_handler_result<T: Serialize>(
    result: &AppResult<T>,
) -> Result<HandlerResponse, serde_json::Error> {
    match result {
        Ok(value) => Ok(HandlerResponse {
            status: 200,
            body: format_success_response(value)?,
        }),
        Err(error) => Ok(HandlerResponse {
            status: error_status(error),
            body: format_error_response(error),
        }),
    }
}

/// 错误对应的日志级别
pub fn error_log_level(error: &AppError) -> Level {
    if error.status_code >= 500 {
        return Level::ERROR;
    }
    match error.error_type() {
        AppErrorType::Unauthorized
        | AppErrorType::Forbidden
        | AppErrorType::Validation
        | AppErrorType::NotFound => Level::INFO,
        _ => Level::WARN,
    }
}

/// 按 [`error_log_level`] 在 http 日志通道记录错误
pub fn log_app_error(error: &AppError) {
    let error_type = error.error_type().as_str();
    let component = error.component.as_deref().unwrap_or("-");
    let level = error_log_level(error);
    if level == Level::ERROR {
        tracing::error!(
            target: HTTP_LOG_TARGET,
            error_type,
            status = error.status_code,
            component,
            "{}",
            error.message
        );
    } else if level == Level::WARN {
        tracing::warn!(
            target: HTTP_LOG_TARGET,
            error_type,
            status = error.status_code,
            component,
            "{}",
            error.message
        );
    } else {
        tracing::info!(
            target: HTTP_LOG_TARGET,
            error_type,
            status = error.status_code,
            component,
            "{}",
            error.message
        );
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::result::ValidationFieldError;

    #[derive(Serialize)]
    struct User {
        id: u32,
        name: &'static str,
    }

    #[test]
    fn test_success_body() {
        let result: AppResult<User> = Ok(User { id: 1, name: "Ada" });
        let response = process_handler_result(&result).unwrap();

        assert_eq!(response.status, 200);
        assert_eq!(response.body, json!({"success": true, "data": {"id": 1, "name": "Ada"}}));
    }

    #[test]
    fn test_not_found_body() {
        let result: AppResult<User> =
            Err(AppError::not_found("User not found", Some("User"), Some("9")));
        let response = process_handler_result(&result).unwrap();

        assert_eq!(response.status, 404);
        assert_eq!(response.body["success"], false);
        assert_eq!(response.body["error"]["type"], "NOT_FOUND");
        assert_eq!(response.body["error"]["resource"], "User");
        assert!(response.body["error"].get("details").is_none());
        assert!(response.body["error"]["timestamp"].is_string());
    }

    #[test]
    fn test_validation_details_and_business_code() {
        let validation = AppError::validation(
            "Invalid input",
            vec![ValidationFieldError::new("email", "required")],
        );
        let body = format_error_response(&validation);
        assert_eq!(body["error"]["details"][0]["field"], "email");

        let business = AppError::business("Insufficient stock", Some("INSUFFICIENT_STOCK"));
        let body = format_error_response(&business);
        assert_eq!(body["error"]["code"], "INSUFFICIENT_STOCK");
    }

    #[test]
    fn test_log_levels() {
        assert_eq!(error_log_level(&AppError::internal("x", None)), Level::ERROR);
        assert_eq!(
            error_log_level(&AppError::external_service("x", "s", None, None)),
            Level::ERROR
        );
        assert_eq!(error_log_level(&AppError::not_found("x", None, None)), Level::INFO);
        assert_eq!(error_log_level(&AppError::unauthorized("x", None)), Level::INFO);
        assert_eq!(error_log_level(&AppError::validation("x", vec![])), Level::INFO);
        assert_eq!(error_log_level(&AppError::conflict("x", None, None)), Level::WARN);
        assert_eq!(error_log_level(&AppError::too_many_requests("x", 1)), Level::WARN);
    }
}

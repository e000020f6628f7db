//! 应用错误分类
//!
//! 每个 `AppError` 都带有类型、消息、HTTP 状态码和时间戳，
//! 由 `response` 模块翻译成协议层响应。

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::fmt;

use crate::infrastructure::container::ContainerError;

/// 单个字段的校验错误
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ValidationFieldError {
    pub field: String,
    pub message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub rule: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub value: Option<Value>,
}

impl ValidationFieldError {
    pub fn new(field: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            field: field.into(),
            message: message.into(),
            rule: None,
            value: None,
        }
    }

    pub fn with_rule(mut self, rule: impl Into<String>) -> Self {
        self.rule = Some(rule.into());
        self
    }

    pub fn with_value(mut self, value: Value) -> Self {
        self.value = Some(value);
        self
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum UnauthorizedReason {
    InvalidToken,
    ExpiredToken,
    MissingToken,
    InvalidCredentials,
    MissingCredentials,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum DatabaseOperation {
    Select,
    Insert,
    Update,
    Delete,
    Transaction,
}

/// [`AppError`] 各类别的附加数据
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "type")]
pub enum AppErrorKind {
    #[serde(rename = "VALIDATION_ERROR")]
    Validation { errors: Vec<ValidationFieldError> },
    #[serde(rename = "NOT_FOUND")]
    NotFound {
        resource: Option<String>,
        resource_id: Option<String>,
    },
    #[serde(rename = "UNAUTHORIZED")]
    Unauthorized { reason: Option<UnauthorizedReason> },
    #[serde(rename = "FORBIDDEN")]
    Forbidden { required_permission: Option<String> },
    #[serde(rename = "CONFLICT")]
    Conflict {
        conflicting_field: Option<String>,
        existing_value: Option<Value>,
    },
    #[serde(rename = "BUSINESS_ERROR")]
    Business { code: Option<String> },
    #[serde(rename = "DATABASE_ERROR")]
    Database {
        operation: Option<DatabaseOperation>,
        table: Option<String>,
        cause: Option<String>,
    },
    #[serde(rename = "EXTERNAL_SERVICE_ERROR")]
    ExternalService {
        service: String,
        operation: Option<String>,
        cause: Option<String>,
    },
    #[serde(rename = "INTERNAL_SERVER_ERROR")]
    Internal { cause: Option<String> },
}

/// 不带数据的错误类别，对应 [`AppErrorKind`]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum AppErrorType {
    Validation,
    NotFound,
    Unauthorized,
    Forbidden,
    Conflict,
    Business,
    Database,
    ExternalService,
    Internal,
}

impl AppErrorType {
    pub const fn as_str(self) -> &'static str {
        match self {
            AppErrorType::Validation => "VALIDATION_ERROR",
            AppErrorType::NotFound => "NOT_FOUND",
            AppErrorType::Unauthorized => "UNAUTHORIZED",
            AppErrorType::Forbidden => "FORBIDDEN",
            AppErrorType::Conflict => "CONFLICT",
            AppErrorType::Business => "BUSINESS_ERROR",
            AppErrorType::Database => "DATABASE_ERROR",
            AppErrorType::ExternalService => "EXTERNAL_SERVICE_ERROR",
            AppErrorType::Internal => "INTERNAL_SERVER_ERROR",
        }
    }
}

impl fmt::Display for AppErrorType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// 应用错误
#[derive(Debug, Clone, PartialEq, Serialize, thiserror::Error)]
#[error("{message}")]
pub struct AppError {
    #[serde(flatten)]
    pub kind: AppErrorKind,
    pub name: &'static str,
    pub message: String,
    pub status_code: u16,
    pub timestamp: DateTime<Utc>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub component: Option<String>,
    #[serde(skip_serializing_if = "Map::is_empty")]
    pub metadata: Map<String, Value>,
}

impl AppError {
    fn build(
        kind: AppErrorKind,
        name: &'static str,
        status_code: u16,
        message: impl Into<String>,
    ) -> Self {
        Self {
            kind,
            name,
            message: message.into(),
            status_code,
            timestamp: Utc::now(),
            component: None,
            metadata: Map::new(),
        }
    }

    /// 422：输入校验失败
    pub fn validation(message: impl Into<String>, errors: Vec<ValidationFieldError>) -> Self {
        Self::build(AppErrorKind::Validation { errors }, "ValidationError", 422, message)
    }

    /// 404：资源不存在
    pub fn not_found(
        message: impl Into<String>,
        resource: Option<&str>,
        resource_id: Option<&str>,
    ) -> Self {
        Self::build(
            AppErrorKind::NotFound {
                resource: resource.map(str::to_string),
                resource_id: resource_id.map(str::to_string),
            },
            "NotFoundError",
            404,
            message,
        )
    }

    /// 401：未认证
    pub fn unauthorized(message: impl Into<String>, reason: Option<UnauthorizedReason>) -> Self {
        Self::build(AppErrorKind::Unauthorized { reason }, "UnauthorizedError", 401, message)
    }

    /// 403：已认证但无权限
    pub fn forbidden(message: impl Into<String>, required_permission: Option<&str>) -> Self {
        Self::build(
            AppErrorKind::Forbidden {
                required_permission: required_permission.map(str::to_string),
            },
            "ForbiddenError",
            403,
            message,
        )
    }

    /// 409：数据冲突
    pub fn conflict(
        message: impl Into<String>,
        conflicting_field: Option<&str>,
        existing_value: Option<Value>,
    ) -> Self {
        Self::build(
            AppErrorKind::Conflict {
                conflicting_field: conflicting_field.map(str::to_string),
                existing_value,
            },
            "ConflictError",
            409,
            message,
        )
    }

    /// 400：违反业务规则
    pub fn business(message: impl Into<String>, code: Option<&str>) -> Self {
        Self::build(
            AppErrorKind::Business {
                code: code.map(str::to_string),
            },
            "BusinessError",
            400,
            message,
        )
    }

    /// 500：数据库操作失败
    pub fn database(
        message: impl Into<String>,
        operation: Option<DatabaseOperation>,
        table: Option<&str>,
        cause: Option<&dyn std::error::Error>,
    ) -> Self {
        Self::build(
            AppErrorKind::Database {
                operation,
                table: table.map(str::to_string),
                cause: cause.map(|e| e.to_string()),
            },
            "DatabaseError",
            500,
            message,
        )
    }

    /// 502：外部服务调用失败
    pub fn external_service(
        message: impl Into<String>,
        service: impl Into<String>,
        operation: Option<&str>,
        cause: Option<&dyn std::error::Error>,
    ) -> Self {
        Self::build(
            AppErrorKind::ExternalService {
                service: service.into(),
                operation: operation.map(str::to_string),
                cause: cause.map(|e| e.to_string()),
            },
            "ExternalServiceError",
            502,
            message,
        )
    }

    /// 500：内部错误
    pub fn internal(message: impl Into<String>, cause: Option<&dyn std::error::Error>) -> Self {
        Self::build(
            AppErrorKind::Internal {
                cause: cause.map(|e| e.to_string()),
            },
            "InternalServerError",
            500,
            message,
        )
    }

    /// 429：触发限流，`retry_after` 单位为秒
    pub fn too_many_requests(message: impl Into<String>, retry_after: u64) -> Self {
        Self::build(
            AppErrorKind::Business {
                code: Some("TOO_MANY_REQUESTS".to_string()),
            },
            "RateLimitError",
            429,
            message,
        )
        .with_metadata("retryAfter", Value::from(retry_after))
    }

    pub fn with_component(mut self, component: impl Into<String>) -> Self {
        self.component = Some(component.into());
        self
    }

    pub fn with_metadata(mut self, key: impl Into<String>, value: Value) -> Self {
        self.metadata.insert(key.into(), value);
        self
    }

    pub fn error_type(&self) -> AppErrorType {
        match self.kind {
            AppErrorKind::Validation { .. } => AppErrorType::Validation,
            AppErrorKind::NotFound { .. } => AppErrorType::NotFound,
            AppErrorKind::Unauthorized { .. } => AppErrorType::Unauthorized,
            AppErrorKind::Forbidden { .. } => AppErrorType::Forbidden,
            AppErrorKind::Conflict { .. } => AppErrorType::Conflict,
            AppErrorKind::Business { .. } => AppErrorType::Business,
            AppErrorKind::Database { .. } => AppErrorType::Database,
            AppErrorKind::ExternalService { .. } => AppErrorType::ExternalService,
            AppErrorKind::Internal { .. } => AppErrorType::Internal,
        }
    }

    /// 业务错误码（限流时为 `TOO_MANY_REQUESTS`）
    pub fn code(&self) -> Option<&str> {
        match &self.kind {
            AppErrorKind::Business { code } => code.as_deref(),
            _ => None,
        }
    }

    pub fn resource(&self) -> Option<&str> {
        match &self.kind {
            AppErrorKind::NotFound { resource, .. } => resource.as_deref(),
            _ => None,
        }
    }
}

impl From<ContainerError> for AppError {
    fn from(error: ContainerError) -> Self {
        AppError::internal(format!("dependency wiring failed: {error}"), Some(&error))
            .with_component("Container")
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_status_codes_per_kind() {
        let cases = [
            (AppError::validation("bad", vec![]), 422, "VALIDATION_ERROR"),
            (AppError::not_found("missing", Some("User"), Some("42")), 404, "NOT_FOUND"),
            (
                AppError::unauthorized("who", Some(UnauthorizedReason::MissingToken)),
                401,
                "UNAUTHORIZED",
            ),
            (AppError::forbidden("no", Some("users:write")), 403, "FORBIDDEN"),
            (AppError::conflict("dup", Some("email"), None), 409, "CONFLICT"),
            (AppError::business("rule", Some("INSUFFICIENT_STOCK")), 400, "BUSINESS_ERROR"),
            (
                AppError::database("db", Some(DatabaseOperation::Insert), Some("users"), None),
                500,
                "DATABASE_ERROR",
            ),
            (
                AppError::external_service("smtp", "mailer", None, None),
                502,
                "EXTERNAL_SERVICE_ERROR",
            ),
            (AppError::internal("oops", None), 500, "INTERNAL_SERVER_ERROR"),
        ];

        for (error, status, type_name) in cases {
            assert_eq!(error.status_code, status, "{}", type_name);
            assert_eq!(error.error_type().as_str(), type_name);
        }
    }

    #[test]
    fn test_too_many_requests_is_business_429() {
        let error = AppError::too_many_requests("slow down", 30);
        assert_eq!(error.status_code, 429);
        assert_eq!(error.name, "RateLimitError");
        assert_eq!(error.error_type(), AppErrorType::Business);
        assert_eq!(error.code(), Some("TOO_MANY_REQUESTS"));
        assert_eq!(error.metadata.get("retryAfter"), Some(&json!(30)));
    }

    #[test]
    fn test_serializes_with_type_tag() {
        let error = AppError::not_found("User not found", Some("User"), Some("7"))
            .with_component("UserService");
        let value = serde_json::to_value(&error).unwrap();

        assert_eq!(value["type"], "NOT_FOUND");
        assert_eq!(value["resource"], "User");
        assert_eq!(value["resource_id"], "7");
        assert_eq!(value["status_code"], 404);
        assert_eq!(value["component"], "UserService");
        assert!(value.get("metadata").is_none());
    }

    #[test]
    fn test_container_error_becomes_internal() {
        let error: AppError = ContainerError::NotRegistered {
            token: "db".to_string(),
        }
        .into();
        assert_eq!(error.status_code, 500);
        assert_eq!(error.component.as_deref(), Some("Container"));
        match error.kind {
            AppErrorKind::Internal { cause: Some(cause) } => assert!(cause.contains("\"db\"")),
            other => panic!("unexpected kind: {other:?}"),
        }
    }

    #[test]
    fn test_validation_field_builder() {
        let field = ValidationFieldError::new("email", "must be an email")
            .with_rule("email")
            .with_value(json!("nope"));
        assert_eq!(field.rule.as_deref(), Some("email"));
        assert_eq!(field.value, Some(json!("nope")));
    }
}

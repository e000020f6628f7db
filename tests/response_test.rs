//! 结果类型、响应格式化与限流的集成测试

use futures::future::join_all;
use ndulo::rate_limit::{
    check_rate_limit, client_key, MemoryRateLimitStore, RateLimitConfig, RateLimitStore,
};
use ndulo::result::response::{error_log_level, process_handler_result};
use ndulo::result::{combine, AppErrorType, ValidationFieldError};
use ndulo::{AppError, AppResult, ContainerError, ServiceContainer, Token};
use serde::Serialize;
use std::sync::Arc;
use tracing::Level;

#[derive(Debug, Serialize)]
struct User {
    id: u32,
    name: String,
}

const USERS: Token<Vec<User>> = Token::new("users");

fn find_user(container: &ServiceContainer, id: u32) -> AppResult<String> {
    let users = container.resolve(USERS)?;
    users
        .iter()
        .find(|user| user.id == id)
        .map(|user| user.name.clone())
        .ok_or_else(|| {
            AppError::not_found(format!("User {id} not found"), Some("user"), Some(&id.to_string()))
        })
}

fn user_container() -> ServiceContainer {
    let container = ServiceContainer::new();
    container
        .register_singleton(USERS, |_| {
            Ok(vec![
                User { id: 1, name: "ada".to_string() },
                User { id: 2, name: "grace".to_string() },
            ])
        })
        .unwrap();
    container
}

#[test]
fn test_handler_success_and_not_found() {
    let container = user_container();

    let ok = process_handler_result(&find_user(&container, 2)).unwrap();
    assert_eq!(ok.status, 200);
    assert_eq!(ok.body["success"], true);
    assert_eq!(ok.body["data"], "grace");

    let missing = process_handler_result(&find_user(&container, 9)).unwrap();
    assert_eq!(missing.status, 404);
    assert_eq!(missing.body["success"], false);
    assert_eq!(missing.body["error"]["type"], "NOT_FOUND");
    assert_eq!(missing.body["error"]["resource"], "user");
    assert!(missing.body["error"]["timestamp"].is_string());
}

#[test]
fn test_wiring_defect_becomes_internal_error() {
    let container = ServiceContainer::new();
    let result = find_user(&container, 1);

    let error = result.as_ref().unwrap_err();
    assert_eq!(error.error_type(), AppErrorType::Internal);
    assert_eq!(error.component.as_deref(), Some("Container"));
    assert_eq!(error_log_level(error), Level::ERROR);

    let response = process_handler_result(&result).unwrap();
    assert_eq!(response.status, 500);
    assert_eq!(response.body["error"]["type"], "INTERNAL_SERVER_ERROR");
}

#[test]
fn test_container_error_conversion_keeps_message() {
    let error: AppError = ContainerError::NotRegistered {
        token: "users".to_string(),
    }
    .into();
    assert!(error.message.contains("users"));
    assert_eq!(error.status_code, 500);
}

#[test]
fn test_validation_details_and_combine() {
    let checks: Vec<AppResult<&str>> = vec![
        Ok("name"),
        Err(AppError::validation(
            "Invalid input",
            vec![ValidationFieldError::new("email", "must contain @").with_rule("email")],
        )),
    ];

    let error = combine(checks).unwrap_err();
    assert_eq!(error_log_level(&error), Level::INFO);

    let response = process_handler_result::<Vec<&str>>(&Err(error)).unwrap();
    assert_eq!(response.status, 422);
    assert_eq!(response.body["error"]["details"][0]["field"], "email");
}

#[tokio::test]
async fn test_rate_limit_blocks_after_max_requests() {
    let config = RateLimitConfig {
        window_ms: 60_000,
        max_requests: 3,
        key_prefix: "api:".to_string(),
    };
    let store = MemoryRateLimitStore::new();
    let key = client_key(Some("198.51.100.4, 10.0.0.1"), Some("10.0.0.2"), &config.key_prefix);
    assert_eq!(key, "ratelimit:api:198.51.100.4");

    for remaining in (0..3).rev() {
        let decision = check_rate_limit(&key, &config, &store).await;
        assert!(decision.allowed);
        assert_eq!(decision.headers["X-RateLimit-Remaining"], remaining.to_string());
    }

    let blocked = check_rate_limit(&key, &config, &store).await;
    assert!(!blocked.allowed);
    assert!(blocked.headers.contains_key("Retry-After"));

    let error = blocked.error.unwrap();
    let response = process_handler_result::<()>(&Err(error)).unwrap();
    assert_eq!(response.status, 429);
    assert_eq!(response.body["error"]["code"], "TOO_MANY_REQUESTS");

    store.reset(&key).await;
    assert!(check_rate_limit(&key, &config, &store).await.allowed);
}

#[tokio::test]
async fn test_rate_limit_counts_concurrent_hits() {
    let config: RateLimitConfig = RateLimitConfig::STRICT.into();
    let store = Arc::new(MemoryRateLimitStore::new());
    let key = client_key(None, Some("192.0.2.8"), &config.key_prefix);

    let decisions = join_all((0..15).map(|_| {
        let store = store.clone();
        let config = config.clone();
        let key = key.clone();
        async move { check_rate_limit(&key, &config, &*store).await.allowed }
    }))
    .await;

    assert_eq!(decisions.iter().filter(|allowed| **allowed).count(), 10);
    assert_eq!(store.len(), 1);
}

//! 限流：计数存储与请求检查
//!
//! 固定窗口计数：窗口过期后计数从 1 重新开始。

use std::collections::BTreeMap;
use std::time::Duration;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use dashmap::DashMap;
use serde::{Deserialize, Serialize};

use crate::logging::HTTP_LOG_TARGET;
use crate::result::AppError;

/// 限流配置
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct RateLimitConfig {
    pub window_ms: u64,
    pub max_requests: u64,
    pub key_prefix: String,
}

impl RateLimitConfig {
    pub const AUTH: RateLimitPreset = RateLimitPreset::new(15 * 60 * 1000, 5, "auth:");
    pub const API: RateLimitPreset = RateLimitPreset::new(60 * 1000, 60, "api:");
    pub const PUBLIC: RateLimitPreset = RateLimitPreset::new(60 * 1000, 120, "public:");
    pub const STRICT: RateLimitPreset = RateLimitPreset::new(60 * 60 * 1000, 10, "strict:");

    pub fn window(&self) -> Duration {
        Duration::from_millis(self.window_ms)
    }
}

impl Default for RateLimitConfig {
    fn default() -> Self {
        Self::API.into()
    }
}

/// 预置限流档位，可转换为 [`RateLimitConfig`]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RateLimitPreset {
    pub window_ms: u64,
    pub max_requests: u64,
    pub key_prefix: &'static str,
}

impl RateLimitPreset {
    const fn new(window_ms: u64, max_requests: u64, key_prefix: &'static str) -> Self {
        Self {
            window_ms,
            max_requests,
            key_prefix,
        }
    }
}

impl From<RateLimitPreset> for RateLimitConfig {
    fn from(preset: RateLimitPreset) -> Self {
        Self {
            window_ms: preset.window_ms,
            max_requests: preset.max_requests,
            key_prefix: preset.key_prefix.to_string(),
        }
    }
}

/// 单个键的计数状态
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RateLimitEntry {
    pub count: u64,
    pub reset_at: DateTime<Utc>,
}

/// 计数存储接口
#[async_trait]
pub trait RateLimitStore: Send + Sync {
    /// 为 `key` 计数一次并返回当前窗口状态
    async fn increment(&self, key: &str, window: Duration) -> RateLimitEntry;

    async fn reset(&self, key: &str);
}

/// 内存计数存储
#[derive(Debug, Default)]
pub struct MemoryRateLimitStore {
    entries: DashMap<String, RateLimitEntry>,
}

impl MemoryRateLimitStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// 已跟踪的键数量（含已过期的键）
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

#[async_trait]
impl RateLimitStore for MemoryRateLimitStore {
    async fn increment(&self, key: &str, window: Duration) -> RateLimitEntry {
        let now = Utc::now();
        let window = chrono::Duration::from_std(window).unwrap_or(chrono::Duration::MAX);
        let fresh = RateLimitEntry {
            count: 1,
            reset_at: now.checked_add_signed(window).unwrap_or(DateTime::<Utc>::MAX_UTC),
        };

        let mut entry = self.entries.entry(key.to_string()).or_insert(RateLimitEntry {
            count: 0,
            reset_at: fresh.reset_at,
        });
        if entry.count == 0 || now > entry.reset_at {
            *entry = fresh;
        } else {
            entry.count += 1;
        }
        *entry
    }

    async fn reset(&self, key: &str) {
        self.entries.remove(key);
    }
}

/// 生成客户端的限流键
///
/// 依次取 `x-forwarded-for` 的第一个地址、`x-real-ip`，都没有时为 `unknown`。
pub fn client_key(forwarded_for: Option<&str>, real_ip: Option<&str>, prefix: &str) -> String {
    let ip = forwarded_for
        .and_then(|header| header.split(',').next())
        .map(str::trim)
        .filter(|ip| !ip.is_empty())
        .or(real_ip)
        .unwrap_or("unknown");
    format!("ratelimit:{prefix}{ip}")
}

/// 单次限流检查的结果
#[derive(Debug, Clone)]
pub struct RateLimitDecision {
    pub allowed: bool,
    pub headers: BTreeMap<&'static str, String>,
    pub error: Option<AppError>,
}

pub async fn check_rate_limit(
    client_key: &str,
    config: &RateLimitConfig,
    store: &dyn RateLimitStore,
) -> RateLimitDecision {
    let RateLimitEntry { count, reset_at } = store.increment(client_key, config.window()).await;

    let remaining = config.max_requests.saturating_sub(count);
    let millis_left = (reset_at - Utc::now()).num_milliseconds().max(0) as u64;
    let retry_after = millis_left.div_ceil(1000);

    let mut headers = BTreeMap::new();
    headers.insert("X-RateLimit-Limit", config.max_requests.to_string());
    headers.insert("X-RateLimit-Remaining", remaining.to_string());
    headers.insert("X-RateLimit-Reset", reset_at.to_rfc3339());

    if count > config.max_requests {
        headers.insert("Retry-After", retry_after.to_string());
        tracing::debug!(target: HTTP_LOG_TARGET, "Rate limit exceeded for {}", client_key);
        return RateLimitDecision {
            allowed: false,
            headers,
            error: Some(
                AppError::too_many_requests(
                    format!("Too many requests. Try again in {retry_after} seconds."),
                    retry_after,
                )
                .with_component("RateLimitMiddleware"),
            ),
        };
    }

    RateLimitDecision {
        allowed: true,
        headers,
        error: None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const MINUTE: Duration = Duration::from_secs(60);

    fn config() -> RateLimitConfig {
        RateLimitConfig {
            window_ms: 60_000,
            max_requests: 3,
            key_prefix: "test:".to_string(),
        }
    }

    #[tokio::test]
    async fn test_increment_counts_per_key() {
        let store = MemoryRateLimitStore::new();
        assert_eq!(store.increment("key", MINUTE).await.count, 1);
        assert_eq!(store.increment("key", MINUTE).await.count, 2);
        assert_eq!(store.increment("other", MINUTE).await.count, 1);
        assert_eq!(store.len(), 2);
    }

    #[tokio::test]
    async fn test_expired_window_restarts() {
        let store = MemoryRateLimitStore::new();
        store.increment("key", Duration::from_millis(1)).await;
        tokio::time::sleep(Duration::from_millis(5)).await;
        assert_eq!(store.increment("key", MINUTE).await.count, 1);
    }

    #[tokio::test]
    async fn test_reset_removes_key() {
        let store = MemoryRateLimitStore::new();
        store.increment("key", MINUTE).await;
        store.increment("key", MINUTE).await;
        store.reset("key").await;
        assert!(store.is_empty());
        assert_eq!(store.increment("key", MINUTE).await.count, 1);
    }

    #[test]
    fn test_client_key_sources() {
        assert_eq!(client_key(Some("1.2.3.4, 10.0.0.1"), None, "api:"), "ratelimit:api:1.2.3.4");
        assert_eq!(client_key(None, Some("5.6.7.8"), ""), "ratelimit:5.6.7.8");
        assert_eq!(client_key(None, None, "x:"), "ratelimit:x:unknown");
    }

    #[tokio::test]
    async fn test_allows_under_limit_with_headers() {
        let store = MemoryRateLimitStore::new();
        let decision = check_rate_limit("ratelimit:test:1.2.3.4", &config(), &store).await;

        assert!(decision.allowed);
        assert!(decision.error.is_none());
        assert_eq!(decision.headers["X-RateLimit-Limit"], "3");
        assert_eq!(decision.headers["X-RateLimit-Remaining"], "2");
        assert!(decision.headers.contains_key("X-RateLimit-Reset"));
        assert!(!decision.headers.contains_key("Retry-After"));
    }

    #[tokio::test]
    async fn test_blocks_over_limit() {
        let store = MemoryRateLimitStore::new();
        let config = config();
        for _ in 0..config.max_requests {
            assert!(check_rate_limit("k", &config, &store).await.allowed);
        }

        let decision = check_rate_limit("k", &config, &store).await;
        assert!(!decision.allowed);
        assert_eq!(decision.headers["X-RateLimit-Remaining"], "0");
        assert!(decision.headers.contains_key("Retry-After"));
        let error = decision.error.unwrap();
        assert_eq!(error.status_code, 429);
        assert_eq!(error.component.as_deref(), Some("RateLimitMiddleware"));
    }

    #[test]
    fn test_presets() {
        let auth: RateLimitConfig = RateLimitConfig::AUTH.into();
        assert_eq!(auth.window_ms, 900_000);
        assert_eq!(auth.max_requests, 5);
        assert_eq!(auth.key_prefix, "auth:");
        assert_eq!(RateLimitConfig::default(), RateLimitConfig::API.into());
    }
}

//! `ndulo demo`：一个小型服务图，演示生命周期、作用域、限流和循环检测。

use std::sync::Arc;

use serde::Serialize;
use tracing::{info, Instrument};
use uuid::Uuid;

use ndulo::logging::{request_span, APP_LOG_TARGET};
use ndulo::rate_limit::{check_rate_limit, client_key, MemoryRateLimitStore};
use ndulo::result::response::{log_app_error, process_handler_result};
use ndulo::{
    AppConfig, AppError, AppResult, ContainerError, ServiceContainer, ServiceLifetime, Token,
};

#[derive(Debug)]
struct Settings {
    dsn: String,
}

#[derive(Debug)]
struct Database {
    id: Uuid,
    dsn: String,
}

#[derive(Debug)]
struct UserRepository {
    db: Arc<Database>,
}

#[derive(Debug)]
struct OrderRepository {
    db: Arc<Database>,
}

#[derive(Debug)]
struct RequestContext {
    request_id: Uuid,
}

#[derive(Debug)]
struct OrderService {
    users: Arc<UserRepository>,
    orders: Arc<OrderRepository>,
    ctx: Arc<RequestContext>,
}

#[derive(Debug, Serialize)]
struct OrderSummary {
    request_id: Uuid,
    database: Uuid,
    shared_database: bool,
}

const SETTINGS: Token<Settings> = Token::new("settings");
const DATABASE: Token<Database> = Token::new("database");
const USER_REPOSITORY: Token<UserRepository> = Token::new("user_repository");
const ORDER_REPOSITORY: Token<OrderRepository> = Token::new("order_repository");
const REQUEST_CONTEXT: Token<RequestContext> = Token::new("request_context");
const ORDER_SERVICE: Token<OrderService> = Token::new("order_service");

const PING: Token<u8> = Token::new("ping");
const PONG: Token<u8> = Token::new("pong");

fn build_container(config: &AppConfig) -> Result<ServiceContainer, ContainerError> {
    let container = ServiceContainer::with_options(config.container);
    container
        .register_singleton(SETTINGS, |_| {
            Ok(Settings {
                dsn: "memory://ndulo".to_string(),
            })
        })?
        .register_singleton(DATABASE, |r| {
            let settings = r.resolve(SETTINGS)?;
            Ok(Database {
                id: Uuid::new_v4(),
                dsn: settings.dsn.clone(),
            })
        })?
        .register_transient(USER_REPOSITORY, |r| Ok(UserRepository { db: r.resolve(DATABASE)? }))?
        .register_transient(ORDER_REPOSITORY, |r| Ok(OrderRepository { db: r.resolve(DATABASE)? }))?
        .register(
            REQUEST_CONTEXT,
            |_| {
                Ok(RequestContext {
                    request_id: Uuid::new_v4(),
                })
            },
            ServiceLifetime::Scoped,
        )?
        .register_scoped(ORDER_SERVICE, |r| {
            Ok(OrderService {
                users: r.resolve(USER_REPOSITORY)?,
                orders: r.resolve(ORDER_REPOSITORY)?,
                ctx: r.resolve(REQUEST_CONTEXT)?,
            })
        })?;
    Ok(container)
}

async fn handle_request(container: &ServiceContainer) -> AppResult<OrderSummary> {
    let scope = container.create_scope();
    let service = scope.resolve(ORDER_SERVICE)?;

    // 同一作用域内的重复解析返回同一实例
    let again = scope.resolve(REQUEST_CONTEXT)?;
    if !Arc::ptr_eq(&service.ctx, &again) {
        return Err(AppError::internal("request context was rebuilt inside its scope", None));
    }

    info!(
        target: APP_LOG_TARGET,
        database = %service.users.db.id,
        dsn = %service.orders.db.dsn,
        "Order service resolved"
    );
    let summary = OrderSummary {
        request_id: service.ctx.request_id,
        database: service.users.db.id,
        shared_database: Arc::ptr_eq(&service.users.db, &service.orders.db),
    };
    scope.dispose();
    Ok(summary)
}

fn demonstrate_cycle() {
    let container = ServiceContainer::new();
    let wired = container
        .register_transient(PING, |r| Ok(*r.resolve(PONG)?))
        .and_then(|c| c.register_transient(PONG, |r| Ok(*r.resolve(PING)?)));
    if let Err(error) = wired {
        println!("❌ 注册失败: {error}");
        return;
    }

    match container.resolve(PING) {
        Err(error @ ContainerError::CircularDependency { .. }) => {
            println!("🔁 检测到循环依赖: {}", error.cycle_display().unwrap_or_default());
            log_app_error(&AppError::from(error));
        }
        Err(other) => println!("❌ 意外错误: {other}"),
        Ok(value) => println!("❌ 循环未被检测到，得到 {value}"),
    }
}

pub async fn run(config: &AppConfig, requests: u32) -> anyhow::Result<()> {
    let container = build_container(config)?;
    println!("📦 已注册令牌: {}", container.registered_tokens().join(", "));

    if config.container.strict_registration {
        match container.register_singleton(SETTINGS, |_| Ok(Settings { dsn: String::new() })) {
            Err(error) => println!("🔒 严格模式拒绝重复注册: {error}"),
            Ok(_) => println!("⚠️ 严格模式未生效"),
        }
    }

    let store = MemoryRateLimitStore::new();
    let key = client_key(Some("203.0.113.7"), None, &config.rate_limit.key_prefix);

    for n in 1..=requests {
        let request_id = format!("req-{n}");
        let span = request_span(&request_id);
        async {
            let decision = check_rate_limit(&key, &config.rate_limit, &store).await;
            let result = match decision.error {
                Some(error) => Err(error),
                None => handle_request(&container).await,
            };
            if let Err(error) = &result {
                log_app_error(error);
            }
            match process_handler_result(&result) {
                Ok(response) => {
                    println!("➡️  {request_id} -> {} {}", response.status, response.body)
                }
                Err(error) => println!("❌ {request_id} 响应序列化失败: {error}"),
            }
        }
        .instrument(span)
        .await;
    }

    demonstrate_cycle();

    println!("📊 {}", container.stats().performance_summary());
    Ok(())
}

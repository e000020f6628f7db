//! 作用域：拥有自己的作用域实例缓存，单例与注册表与父容器共享

use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use parking_lot::Mutex;
use tracing::debug;
use uuid::Uuid;

use super::error::ContainerError;
use super::registry::Instance;
use super::service_container::ServiceContainer;
use super::token::Token;

/// 子解析上下文，通常每个请求一个
///
/// `Scoped` 令牌在每个作用域内只构造一次，`Singleton` 令牌取自父容器，
/// `Transient` 令牌每次新建。调用 [`Scope::dispose`] 之后，
/// 所有解析都会返回 [`ContainerError::ScopeDisposed`]。
pub struct Scope {
    id: Uuid,
    container: ServiceContainer,
    instances: Mutex<HashMap<&'static str, Instance>>,
    disposed: AtomicBool,
}

impl Scope {
    pub(crate) fn new(container: ServiceContainer) -> Self {
        let id = Uuid::new_v4();
        debug!("Created scope {}", id);
        Self {
            id,
            container,
            instances: Mutex::new(HashMap::new()),
            disposed: AtomicBool::new(false),
        }
    }

    pub fn id(&self) -> Uuid {
        self.id
    }

    /// 在本作用域内解析服务
    pub fn resolve<T: Send + Sync + 'static>(
        &self,
        token: Token<T>,
    ) -> Result<Arc<T>, ContainerError> {
        if self.is_disposed() {
            return Err(ContainerError::ScopeDisposed {
                scope_id: self.id,
                token: token.name().to_string(),
            });
        }
        let instance = self.container.resolve_instance(token.name(), Some(self))?;
        self.container.downcast(token, instance)
    }

    /// 释放本作用域缓存的实例，并将作用域标记为不可用
    ///
    /// 不会对被释放的值调用任何清理钩子，
    /// 持有资源的调用方需在此之前自行释放。
    /// 重复调用无副作用。
    pub fn dispose(&self) {
        let released = {
            // 在缓存锁内置位，与 `store` 互斥
            let mut instances = self.instances.lock();
            if self.disposed.swap(true, Ordering::SeqCst) {
                return;
            }
            let released = instances.len();
            instances.clear();
            released
        };
        debug!("Disposed scope {} ({} scoped instance(s) released)", self.id, released);
    }

    pub fn is_disposed(&self) -> bool {
        self.disposed.load(Ordering::SeqCst)
    }

    /// 当前缓存的作用域实例数量
    pub fn cached_instances(&self) -> usize {
        self.instances.lock().len()
    }

    pub(crate) fn cached(&self, token: &str) -> Option<Instance> {
        self.instances.lock().get(token).cloned()
    }

    /// 缓存新构造的作用域实例；构造期间作用域已被释放则拒绝写入
    pub(crate) fn store(
        &self,
        token: &'static str,
        instance: Instance,
    ) -> Result<(), ContainerError> {
        let mut instances = self.instances.lock();
        if self.is_disposed() {
            return Err(ContainerError::ScopeDisposed {
                scope_id: self.id,
                token: token.to_string(),
            });
        }
        instances.insert(token, instance);
        Ok(())
    }
}

impl std::fmt::Debug for Scope {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Scope")
            .field("id", &self.id)
            .field("cached_instances", &self.cached_instances())
            .field("disposed", &self.is_disposed())
            .finish()
    }
}

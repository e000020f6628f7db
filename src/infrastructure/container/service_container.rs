//! 依赖注入容器
//!
//! 解析流程（深度优先、同步）：
//! 1. 查找描述符，不存在则返回 `NotRegistered`
//! 2. 检查解析栈，令牌已在栈中则返回 `CircularDependency`
//! 3. 按生命周期处理缓存，未命中时压栈、调用工厂、出栈

use std::collections::HashMap;
use std::sync::Arc;

use parking_lot::{Mutex, ReentrantMutex, RwLock};
use serde::{Deserialize, Serialize};
use tracing::{debug, trace, warn};

use super::error::ContainerError;
use super::registry::{Descriptor, Instance, Registry};
use super::resolver::Resolver;
use super::scope::Scope;
use super::stack::ResolutionStack;
use super::stats::{ContainerStats, InnerStats};
use super::token::Token;
use super::ServiceLifetime;

/// 容器行为开关
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ContainerOptions {
    /// 重复注册同一令牌时返回 `AlreadyRegistered`，而不是静默替换描述符
    pub strict_registration: bool,
}

struct ContainerInner {
    options: ContainerOptions,
    registry: RwLock<Registry>,
    singletons: Mutex<HashMap<&'static str, Instance>>,
    stack: ResolutionStack,
    /// 每个容器一把可重入锁，覆盖整个顶层解析（含嵌套解析）
    gate: ReentrantMutex<()>,
    stats: InnerStats,
}

/// 依赖注入容器
///
/// 克隆开销很小，所有克隆共享同一份注册表、单例缓存与解析栈。
#[derive(Clone)]
pub struct ServiceContainer {
    inner: Arc<ContainerInner>,
}

impl std::fmt::Debug for ServiceContainer {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ServiceContainer")
            .field("options", &self.inner.options)
            .finish_non_exhaustive()
    }
}

impl ServiceContainer {
    /// 创建新的容器实例（宽松注册模式）
    pub fn new() -> Self {
        Self::with_options(ContainerOptions::default())
    }

    pub fn with_options(options: ContainerOptions) -> Self {
        Self {
            inner: Arc::new(ContainerInner {
                options,
                registry: RwLock::new(Registry::default()),
                singletons: Mutex::new(HashMap::new()),
                stack: ResolutionStack::default(),
                gate: ReentrantMutex::new(()),
                stats: InnerStats::default(),
            }),
        }
    }

    pub fn options(&self) -> ContainerOptions {
        self.inner.options
    }

    /// 注册服务
    ///
    /// 返回容器自身，便于链式注册：
    ///
    /// ```
    /// use ndulo::{ServiceContainer, ServiceLifetime, Token};
    ///
    /// const PORT: Token<u16> = Token::new("port");
    /// const URL: Token<String> = Token::new("url");
    ///
    /// # fn main() -> Result<(), ndulo::ContainerError> {
    /// let container = ServiceContainer::new();
    /// container
    ///     .register(PORT, |_| Ok(8080), ServiceLifetime::Singleton)?
    ///     .register(
    ///         URL,
    ///         |r| Ok(format!("http://localhost:{}", r.resolve(PORT)?)),
    ///         ServiceLifetime::Singleton,
    ///     )?;
    ///
    /// assert_eq!(*container.resolve(URL)?, "http://localhost:8080");
    /// # Ok(())
    /// # }
    /// ```
    pub fn register<T, F>(
        &self,
        token: Token<T>,
        factory: F,
        lifetime: ServiceLifetime,
    ) -> Result<&Self, ContainerError>
    where
        T: Send + Sync + 'static,
        F: Fn(&Resolver<'_>) -> anyhow::Result<T> + Send + Sync + 'static,
    {
        let _gate = self.inner.gate.lock();
        let descriptor = Descriptor::new(token.name(), factory, lifetime);
        let replaced = self.inner.registry.write().insert(
            token.name(),
            descriptor,
            self.inner.options.strict_registration,
        )?;

        if replaced {
            // 旧描述符构造的单例不再有效
            self.inner.singletons.lock().remove(token.name());
            warn!("Token '{}' re-registered; previous descriptor replaced", token);
        } else {
            debug!(
                "Registered token '{}' as {:?} ({})",
                token,
                lifetime,
                std::any::type_name::<T>()
            );
        }
        Ok(self)
    }

    /// 注册单例服务
    pub fn register_singleton<T, F>(
        &self,
        token: Token<T>,
        factory: F,
    ) -> Result<&Self, ContainerError>
    where
        T: Send + Sync + 'static,
        F: Fn(&Resolver<'_>) -> anyhow::Result<T> + Send + Sync + 'static,
    {
        self.register(token, factory, ServiceLifetime::Singleton)
    }

    /// 注册作用域服务
    pub fn register_scoped<T, F>(
        &self,
        token: Token<T>,
        factory: F,
    ) -> Result<&Self, ContainerError>
    where
        T: Send + Sync + 'static,
        F: Fn(&Resolver<'_>) -> anyhow::Result<T> + Send + Sync + 'static,
    {
        self.register(token, factory, ServiceLifetime::Scoped)
    }

    /// 注册瞬态服务
    pub fn register_transient<T, F>(
        &self,
        token: Token<T>,
        factory: F,
    ) -> Result<&Self, ContainerError>
    where
        T: Send + Sync + 'static,
        F: Fn(&Resolver<'_>) -> anyhow::Result<T> + Send + Sync + 'static,
    {
        self.register(token, factory, ServiceLifetime::Transient)
    }

    /// 以 `T::default()` 作为工厂注册
    pub fn register_default<T>(
        &self,
        token: Token<T>,
        lifetime: ServiceLifetime,
    ) -> Result<&Self, ContainerError>
    where
        T: Default + Send + Sync + 'static,
    {
        self.register(token, |_| Ok(T::default()), lifetime)
    }

    /// 解析服务
    pub fn resolve<T: Send + Sync + 'static>(
        &self,
        token: Token<T>,
    ) -> Result<Arc<T>, ContainerError> {
        let instance = self.resolve_instance(token.name(), None)?;
        self.downcast(token, instance)
    }

    /// 检查令牌是否已注册（不会触发构造）
    pub fn has(&self, token: impl AsRef<str>) -> bool {
        self.inner.registry.read().contains(token.as_ref())
    }

    /// 清空单例缓存，注册信息保留
    pub fn reset(&self) {
        let _gate = self.inner.gate.lock();
        let evicted = {
            let mut singletons = self.inner.singletons.lock();
            let evicted = singletons.len();
            singletons.clear();
            evicted
        };
        debug!("Container reset; {} singleton(s) evicted", evicted);
    }

    /// 创建新的作用域
    pub fn create_scope(&self) -> Scope {
        Scope::new(self.clone())
    }

    /// 获取已注册的令牌列表（已排序）
    pub fn registered_tokens(&self) -> Vec<&'static str> {
        self.inner.registry.read().tokens()
    }

    /// 获取容器统计信息
    pub fn stats(&self) -> ContainerStats {
        let registered = self.inner.registry.read().len();
        let singletons = self.inner.singletons.lock().len();
        self.inner.stats.snapshot(registered, singletons)
    }

    pub(crate) fn resolve_instance(
        &self,
        token: &'static str,
        scope: Option<&Scope>,
    ) -> Result<Instance, ContainerError> {
        let _gate = self.inner.gate.lock();
        InnerStats::bump(&self.inner.stats.total_resolutions);

        let descriptor = self
            .inner
            .registry
            .read()
            .get(token)
            .ok_or_else(|| ContainerError::NotRegistered {
                token: token.to_string(),
            })?;

        if let Err(error) = self.inner.stack.ensure_acyclic(token) {
            InnerStats::bump(&self.inner.stats.circular_dependency_rejections);
            return Err(error);
        }

        match (descriptor.lifetime, scope) {
            (ServiceLifetime::Singleton, _) => self.resolve_singleton(token, &descriptor),
            (ServiceLifetime::Scoped, Some(scope)) => {
                self.resolve_scoped(token, &descriptor, scope)
            }
            (ServiceLifetime::Scoped, None) => {
                // 作用域外解析作用域服务：每次新建，不缓存
                trace!("Scoped token '{}' resolved outside a scope; not cached", token);
                InnerStats::bump(&self.inner.stats.scoped_creations);
                self.construct(token, &descriptor, None)
            }
            (ServiceLifetime::Transient, scope) => {
                InnerStats::bump(&self.inner.stats.transient_creations);
                self.construct(token, &descriptor, scope)
            }
        }
    }

    fn resolve_singleton(
        &self,
        token: &'static str,
        descriptor: &Descriptor,
    ) -> Result<Instance, ContainerError> {
        let cached = self.inner.singletons.lock().get(token).cloned();
        if let Some(instance) = cached {
            InnerStats::bump(&self.inner.stats.singleton_cache_hits);
            trace!("Singleton cache hit for '{}'", token);
            return Ok(instance);
        }

        InnerStats::bump(&self.inner.stats.singleton_cache_misses);
        // 单例只通过容器解析依赖，避免捕获作用域实例
        let instance = self.construct(token, descriptor, None)?;
        self.inner.singletons.lock().insert(token, Arc::clone(&instance));
        Ok(instance)
    }

    fn resolve_scoped(
        &self,
        token: &'static str,
        descriptor: &Descriptor,
        scope: &Scope,
    ) -> Result<Instance, ContainerError> {
        if let Some(instance) = scope.cached(token) {
            InnerStats::bump(&self.inner.stats.scoped_cache_hits);
            trace!("Scope {} cache hit for '{}'", scope.id(), token);
            return Ok(instance);
        }

        InnerStats::bump(&self.inner.stats.scoped_creations);
        let instance = self.construct(token, descriptor, Some(scope))?;
        scope.store(token, Arc::clone(&instance))?;
        Ok(instance)
    }

    fn construct(
        &self,
        token: &'static str,
        descriptor: &Descriptor,
        scope: Option<&Scope>,
    ) -> Result<Instance, ContainerError> {
        let _frame = self.inner.stack.enter(token);
        debug!(
            "Constructing '{}' ({:?}, depth {})",
            token,
            descriptor.lifetime,
            self.inner.stack.depth()
        );
        (descriptor.factory)(&Resolver::new(self, scope))
    }

    pub(crate) fn downcast<T: Send + Sync + 'static>(
        &self,
        token: Token<T>,
        instance: Instance,
    ) -> Result<Arc<T>, ContainerError> {
        instance.downcast::<T>().map_err(|_| ContainerError::TypeMismatch {
            token: token.name().to_string(),
            expected: std::any::type_name::<T>(),
            found: self
                .inner
                .registry
                .read()
                .get(token.name())
                .map(|descriptor| descriptor.type_name)
                .unwrap_or("<unregistered>"),
        })
    }
}

impl Default for ServiceContainer {
    fn default() -> Self {
        Self::new()
    }
}

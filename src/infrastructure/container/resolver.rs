//! 工厂可见的解析能力（只能解析，不能注册）

use std::sync::Arc;

use super::error::ContainerError;
use super::scope::Scope;
use super::service_container::ServiceContainer;
use super::token::Token;

/// 传给工厂的只读解析视图
///
/// 外层解析由 [`Scope`] 发起时，解析器携带该作用域，
/// 作用域依赖因此共用它的缓存。
pub struct Resolver<'a> {
    container: &'a ServiceContainer,
    scope: Option<&'a Scope>,
}

impl<'a> Resolver<'a> {
    pub(crate) fn new(container: &'a ServiceContainer, scope: Option<&'a Scope>) -> Self {
        Self { container, scope }
    }

    /// 解析当前构造对象的依赖
    pub fn resolve<T: Send + Sync + 'static>(
        &self,
        token: Token<T>,
    ) -> Result<Arc<T>, ContainerError> {
        match self.scope {
            Some(scope) => scope.resolve(token),
            None => self.container.resolve(token),
        }
    }

    /// 本次解析是否位于作用域内
    pub fn in_scope(&self) -> bool {
        self.scope.is_some()
    }
}

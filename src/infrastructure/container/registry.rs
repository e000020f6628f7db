//! 注册表：令牌 → 构造描述符

use std::any::Any;
use std::collections::HashMap;
use std::sync::Arc;

use super::error::ContainerError;
use super::resolver::Resolver;
use super::ServiceLifetime;

/// 缓存中保存的已构造实例
pub(crate) type Instance = Arc<dyn Any + Send + Sync>;

pub(crate) type ErasedFactory =
    Arc<dyn for<'r, 'c> Fn(&'r Resolver<'c>) -> Result<Instance, ContainerError> + Send + Sync>;

fn erase<F>(factory: F) -> ErasedFactory
where
    F: for<'r, 'c> Fn(&'r Resolver<'c>) -> Result<Instance, ContainerError> + Send + Sync + 'static,
{
    Arc::new(factory)
}

/// 构造描述符，注册后不可变
#[derive(Clone)]
pub(crate) struct Descriptor {
    pub(crate) factory: ErasedFactory,
    pub(crate) lifetime: ServiceLifetime,
    pub(crate) type_name: &'static str,
}

impl Descriptor {
    pub(crate) fn new<T, F>(token: &'static str, factory: F, lifetime: ServiceLifetime) -> Self
    where
        T: Send + Sync + 'static,
        F: Fn(&Resolver<'_>) -> anyhow::Result<T> + Send + Sync + 'static,
    {
        let factory = erase(move |resolver| match factory(resolver) {
            Ok(value) => Ok(Arc::new(value) as Instance),
            // 嵌套解析产生的容器错误原样上抛，保留其上下文
            Err(error) => Err(match error.downcast::<ContainerError>() {
                Ok(container_error) => container_error,
                Err(source) => ContainerError::FactoryFailed {
                    token: token.to_string(),
                    source,
                },
            }),
        });

        Self {
            factory,
            lifetime,
            type_name: std::any::type_name::<T>(),
        }
    }
}

/// 令牌到描述符的只增映射
#[derive(Default)]
pub(crate) struct Registry {
    descriptors: HashMap<&'static str, Descriptor>,
}

impl Registry {
    /// 插入描述符，返回是否替换了已有的描述符
    pub(crate) fn insert(
        &mut self,
        token: &'static str,
        descriptor: Descriptor,
        strict: bool,
    ) -> Result<bool, ContainerError> {
        if strict && self.descriptors.contains_key(token) {
            return Err(ContainerError::AlreadyRegistered {
                token: token.to_string(),
            });
        }
        Ok(self.descriptors.insert(token, descriptor).is_some())
    }

    pub(crate) fn get(&self, token: &str) -> Option<Descriptor> {
        self.descriptors.get(token).cloned()
    }

    pub(crate) fn contains(&self, token: &str) -> bool {
        self.descriptors.contains_key(token)
    }

    pub(crate) fn len(&self) -> usize {
        self.descriptors.len()
    }

    pub(crate) fn tokens(&self) -> Vec<&'static str> {
        let mut tokens: Vec<&'static str> = self.descriptors.keys().copied().collect();
        tokens.sort_unstable();
        tokens
    }
}

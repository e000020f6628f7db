//! 容器统计信息

use std::sync::atomic::{AtomicU64, Ordering};

/// 内部容器统计信息（原子计数器）
#[derive(Debug, Default)]
pub(crate) struct InnerStats {
    pub(crate) total_resolutions: AtomicU64,
    pub(crate) singleton_cache_hits: AtomicU64,
    pub(crate) singleton_cache_misses: AtomicU64,
    pub(crate) scoped_cache_hits: AtomicU64,
    pub(crate) scoped_creations: AtomicU64,
    pub(crate) transient_creations: AtomicU64,
    pub(crate) circular_dependency_rejections: AtomicU64,
}

impl InnerStats {
    pub(crate) fn bump(counter: &AtomicU64) {
        counter.fetch_add(1, Ordering::Relaxed);
    }

    pub(crate) fn snapshot(
        &self,
        registered_tokens: usize,
        active_singletons: usize,
    ) -> ContainerStats {
        ContainerStats {
            total_resolutions: self.total_resolutions.load(Ordering::Relaxed),
            singleton_cache_hits: self.singleton_cache_hits.load(Ordering::Relaxed),
            singleton_cache_misses: self.singleton_cache_misses.load(Ordering::Relaxed),
            scoped_cache_hits: self.scoped_cache_hits.load(Ordering::Relaxed),
            scoped_creations: self.scoped_creations.load(Ordering::Relaxed),
            transient_creations: self.transient_creations.load(Ordering::Relaxed),
            circular_dependency_rejections: self
                .circular_dependency_rejections
                .load(Ordering::Relaxed),
            registered_tokens,
            active_singletons,
        }
    }
}

/// 容器统计信息快照
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ContainerStats {
    /// 总解析次数（含嵌套解析）
    pub total_resolutions: u64,
    /// 单例缓存命中次数
    pub singleton_cache_hits: u64,
    /// 单例缓存未命中次数（即单例构造次数）
    pub singleton_cache_misses: u64,
    /// 作用域缓存命中次数
    pub scoped_cache_hits: u64,
    /// 作用域服务创建次数
    pub scoped_creations: u64,
    /// 瞬态服务创建次数
    pub transient_creations: u64,
    /// 被拒绝的循环依赖次数
    pub circular_dependency_rejections: u64,
    /// 注册的令牌数量
    pub registered_tokens: usize,
    /// 活跃单例数量
    pub active_singletons: usize,
}

impl ContainerStats {
    /// 单例缓存命中率（小数形式）
    pub fn hit_rate(&self) -> f64 {
        let total = self.singleton_cache_hits + self.singleton_cache_misses;
        if total == 0 {
            0.0
        } else {
            self.singleton_cache_hits as f64 / total as f64
        }
    }

    /// 获取服务创建分布 (singleton, scoped, transient)
    pub fn creation_distribution(&self) -> (u64, u64, u64) {
        (self.singleton_cache_misses, self.scoped_creations, self.transient_creations)
    }

    pub fn performance_summary(&self) -> String {
        format!(
            "Container: {} resolutions, {:.1}% singleton hit rate, \
             {} registered tokens, {} active singletons",
            self.total_resolutions,
            self.hit_rate() * 100.0,
            self.registered_tokens,
            self.active_singletons
        )
    }
}

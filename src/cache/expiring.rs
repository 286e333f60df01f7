use std::time::Duration;

use dashmap::DashMap;
use dashmap::mapref::entry::Entry;
use tokio::time::Instant;

/// 溢出时使用的过期时间，约 30 年
const FAR_FUTURE: Duration = Duration::from_secs(30 * 365 * 24 * 3600);

/// 计算 `now + ttl`，溢出时退回到一个足够远的时间点
pub fn expiry_after(now: Instant, ttl: Duration) -> Instant {
    now.checked_add(ttl)
        .or_else(|| now.checked_add(FAR_FUTURE))
        .unwrap_or(now)
}

/// 带过期时间的值
pub trait Expires {
    fn expires_at(&self) -> Instant;

    fn is_expired(&self, now: Instant) -> bool {
        now >= self.expires_at()
    }
}

/// 限流器与 TTL 缓存共用的过期映射
///
/// 基于 `DashMap`，每个分片一把锁：同一个键的读-改-写在分片锁内完成，
/// 清扫时 `retain` 逐个分片加锁，不会长时间占用整张表。
pub struct ExpiringMap<V> {
    entries: DashMap<String, V>,
}

impl<V: Expires> ExpiringMap<V> {
    pub fn new() -> Self {
        Self {
            entries: DashMap::new(),
        }
    }

    /// 获取未过期的值副本
    pub fn get_live(&self, key: &str, now: Instant) -> Option<V>
    where
        V: Clone,
    {
        self.entries
            .get(key)
            .filter(|entry| !entry.is_expired(now))
            .map(|entry| entry.value().clone())
    }

    pub fn insert(&self, key: String, value: V) {
        self.entries.insert(key, value);
    }

    /// 锁定单个键并返回条目，调用方在持锁期间完成读-改-写
    pub fn entry(&self, key: String) -> Entry<'_, String, V> {
        self.entries.entry(key)
    }

    pub fn remove(&self, key: &str) -> bool {
        self.entries.remove(key).is_some()
    }

    pub fn clear(&self) {
        self.entries.clear();
    }

    /// 删除所有已过期的条目，返回删除数量
    pub fn sweep(&self, now: Instant) -> usize {
        let before = self.entries.len();
        self.entries.retain(|_, value| !value.is_expired(now));
        before.saturating_sub(self.entries.len())
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

impl<V: Expires> Default for ExpiringMap<V> {
    fn default() -> Self {
        Self::new()
    }
}

use std::time::Duration;

use tokio::time::Instant;

use super::expiring::{Expires, ExpiringMap, expiry_after};
use super::sweep::Sweep;

/// 缓存条目，`expires_at = stored_at + ttl`
#[derive(Debug, Clone)]
pub struct CacheEntry<V> {
    pub value: V,
    pub stored_at: Instant,
    pub expires_at: Instant,
}

impl<V> Expires for CacheEntry<V> {
    fn expires_at(&self) -> Instant {
        self.expires_at
    }
}

/// 带 TTL 的进程内缓存
///
/// `get` 返回值的副本，调用方拿不到缓存内部的引用。写库之后调用
/// `invalidate`，下一次读取会重新加载。
pub struct TtlCache<V> {
    name: &'static str,
    default_ttl: Duration,
    entries: ExpiringMap<CacheEntry<V>>,
}

impl<V: Clone> TtlCache<V> {
    pub fn new(name: &'static str, default_ttl: Duration) -> Self {
        Self {
            name,
            default_ttl,
            entries: ExpiringMap::new(),
        }
    }

    pub fn default_ttl(&self) -> Duration {
        self.default_ttl
    }

    /// 未设置或已过期时返回 `None`
    pub fn get(&self, key: &str) -> Option<V> {
        self.entries
            .get_live(key, Instant::now())
            .map(|entry| entry.value)
    }

    pub fn set(&self, key: &str, value: V) {
        self.set_with_ttl(key, value, self.default_ttl);
    }

    /// 总是覆盖旧值并重置过期时间
    pub fn set_with_ttl(&self, key: &str, value: V, ttl: Duration) {
        let now = Instant::now();
        self.entries.insert(
            key.to_owned(),
            CacheEntry {
                value,
                stored_at: now,
                expires_at: expiry_after(now, ttl),
            },
        );
    }

    pub fn invalidate(&self, key: &str) {
        if self.entries.remove(key) {
            tracing::debug!(cache = self.name, key, "Cache entry invalidated");
        }
    }

    pub fn invalidate_all(&self) {
        self.entries.clear();
        tracing::debug!(cache = self.name, "Cache cleared");
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

impl<V: Clone + Send + Sync + 'static> Sweep for TtlCache<V> {
    fn name(&self) -> &'static str {
        self.name
    }

    fn sweep(&self) -> usize {
        self.entries.sweep(Instant::now())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[derive(Debug, Clone, PartialEq)]
    struct Flags {
        ai_memory_enabled: bool,
    }

    fn cache() -> TtlCache<Flags> {
        TtlCache::new("test", Duration::from_secs(300))
    }

    #[tokio::test(start_paused = true)]
    async fn set_then_get_hits() {
        let cache = cache();
        assert_eq!(cache.get("k"), None);

        cache.set(
            "k",
            Flags {
                ai_memory_enabled: true,
            },
        );
        assert_eq!(
            cache.get("k"),
            Some(Flags {
                ai_memory_enabled: true
            })
        );
    }

    #[tokio::test(start_paused = true)]
    async fn entries_expire_after_ttl() {
        let cache = cache();
        cache.set_with_ttl(
            "k",
            Flags {
                ai_memory_enabled: true,
            },
            Duration::from_secs(5),
        );

        tokio::time::advance(Duration::from_millis(4_999)).await;
        assert!(cache.get("k").is_some());

        tokio::time::advance(Duration::from_millis(1)).await;
        assert!(cache.get("k").is_none());
    }

    #[tokio::test(start_paused = true)]
    async fn huge_ttl_does_not_overflow() {
        let cache = TtlCache::new("test", Duration::from_secs(u64::MAX));
        let flags = Flags {
            ai_memory_enabled: true,
        };
        cache.set("k", flags.clone());
        assert_eq!(cache.get("k"), Some(flags));
    }

    #[tokio::test(start_paused = true)]
    async fn overwrite_resets_expiry() {
        let cache = cache();
        let flags = Flags {
            ai_memory_enabled: false,
        };
        cache.set_with_ttl("k", flags.clone(), Duration::from_secs(5));
        tokio::time::advance(Duration::from_secs(4)).await;
        cache.set_with_ttl("k", flags.clone(), Duration::from_secs(5));
        tokio::time::advance(Duration::from_secs(4)).await;

        assert_eq!(cache.get("k"), Some(flags));
    }

    #[tokio::test(start_paused = true)]
    async fn invalidate_then_reset() {
        let cache = cache();
        cache.set(
            "user-1",
            Flags {
                ai_memory_enabled: true,
            },
        );
        assert_eq!(
            cache.get("user-1"),
            Some(Flags {
                ai_memory_enabled: true
            })
        );

        cache.invalidate("user-1");
        assert_eq!(cache.get("user-1"), None);

        cache.set(
            "user-1",
            Flags {
                ai_memory_enabled: false,
            },
        );
        assert_eq!(
            cache.get("user-1"),
            Some(Flags {
                ai_memory_enabled: false
            })
        );
    }

    #[tokio::test(start_paused = true)]
    async fn invalidate_missing_key_is_noop() {
        let cache = cache();
        cache.invalidate("absent");
        assert!(cache.is_empty());
    }

    #[tokio::test(start_paused = true)]
    async fn invalidate_leaves_other_keys() {
        let cache = cache();
        let flags = Flags {
            ai_memory_enabled: true,
        };
        cache.set("user-1", flags.clone());
        cache.set("user-2", flags.clone());

        cache.invalidate("user-1");

        assert_eq!(cache.get("user-1"), None);
        assert_eq!(cache.get("user-2"), Some(flags));
    }

    #[tokio::test(start_paused = true)]
    async fn invalidate_all_clears_and_stays_usable() {
        let cache = cache();
        let flags = Flags {
            ai_memory_enabled: true,
        };
        cache.set("a", flags.clone());
        cache.set("b", flags.clone());

        cache.invalidate_all();
        assert_eq!(cache.get("a"), None);
        assert_eq!(cache.get("b"), None);

        cache.invalidate_all();
        cache.set("a", flags.clone());
        assert_eq!(cache.get("a"), Some(flags));
    }

    #[tokio::test(start_paused = true)]
    async fn sweep_removes_expired_entries() {
        let cache = cache();
        let flags = Flags {
            ai_memory_enabled: true,
        };
        cache.set_with_ttl("short", flags.clone(), Duration::from_secs(1));
        cache.set("long", flags);

        tokio::time::advance(Duration::from_secs(2)).await;
        assert_eq!(cache.sweep(), 1);
        assert_eq!(cache.len(), 1);
        assert!(cache.get("long").is_some());
    }
}

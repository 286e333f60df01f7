use std::collections::HashMap;
use std::time::Duration;

use dashmap::mapref::entry::Entry;
use tokio::time::Instant;

use super::expiring::{Expires, ExpiringMap, expiry_after};
use super::keys::route_scoped_key;
use super::sweep::Sweep;

pub const DEFAULT_WINDOW: Duration = Duration::from_secs(60);
pub const DEFAULT_MAX_REQUESTS: u32 = 120;

/// 单个客户端键的固定窗口计数
#[derive(Debug, Clone)]
pub struct RateWindow {
    pub count: u32,
    pub reset_at: Instant,
}

impl Expires for RateWindow {
    fn expires_at(&self) -> Instant {
        self.reset_at
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RateDecision {
    Allowed,
    Denied { retry_after_secs: u64 },
}

impl RateDecision {
    pub fn is_allowed(&self) -> bool {
        matches!(self, RateDecision::Allowed)
    }
}

/// 限流策略：一个共享窗口长度，一个默认上限，加上按路由覆盖的上限
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RateLimitPolicy {
    pub window: Duration,
    pub default_max: u32,
    pub routes: HashMap<String, u32>,
}

impl RateLimitPolicy {
    /// 内置的路由上限，可被配置覆盖
    pub fn builtin_routes() -> HashMap<String, u32> {
        [
            ("/api/ai/chat", 20),
            ("/api/ai/summary", 20),
            ("/api/ai/tips", 20),
            ("/api/export", 10),
        ]
        .into_iter()
        .map(|(route, max)| (route.to_string(), max))
        .collect()
    }

    pub fn route_max(&self, route: &str) -> Option<u32> {
        self.routes.get(route).copied()
    }
}

impl Default for RateLimitPolicy {
    fn default() -> Self {
        Self {
            window: DEFAULT_WINDOW,
            default_max: DEFAULT_MAX_REQUESTS,
            routes: Self::builtin_routes(),
        }
    }
}

/// 进程内固定窗口限流器
///
/// 跨窗口边界时最坏会放行 `2 * max` 个请求，这是固定窗口的已知代价。
/// 计数只存在于当前进程，多实例部署时各自独立计数。
pub struct RateLimiter {
    policy: RateLimitPolicy,
    windows: ExpiringMap<RateWindow>,
}

impl RateLimiter {
    pub fn new(policy: RateLimitPolicy) -> Self {
        Self {
            policy,
            windows: ExpiringMap::new(),
        }
    }

    pub fn policy(&self) -> &RateLimitPolicy {
        &self.policy
    }

    /// 按默认上限检查
    pub fn check(&self, key: &str) -> RateDecision {
        self.check_with_limit(key, self.policy.default_max)
    }

    /// 按路由策略检查：有覆盖上限的路由单独计数，其余路由共用客户端的全局计数
    pub fn check_route(&self, identity: &str, route: &str) -> RateDecision {
        match self.policy.route_max(route) {
            Some(max) => self.check_with_limit(&route_scoped_key(identity, route), max),
            None => self.check(identity),
        }
    }

    pub fn check_with_limit(&self, key: &str, max_requests: u32) -> RateDecision {
        let now = Instant::now();
        let fresh = RateWindow {
            count: 1,
            reset_at: expiry_after(now, self.policy.window),
        };

        // 读-改-写在分片锁内完成，中间不能有 await
        let (count, reset_at) = match self.windows.entry(key.to_owned()) {
            Entry::Occupied(mut occupied) if !occupied.get().is_expired(now) => {
                let window = occupied.get_mut();
                window.count = window.count.saturating_add(1);
                (window.count, window.reset_at)
            }
            // 过期窗口直接替换，不复用
            Entry::Occupied(mut occupied) => {
                occupied.insert(fresh.clone());
                (fresh.count, fresh.reset_at)
            }
            Entry::Vacant(vacant) => {
                vacant.insert(fresh.clone());
                (fresh.count, fresh.reset_at)
            }
        };

        if count > max_requests {
            let remaining = reset_at.saturating_duration_since(now);
            RateDecision::Denied {
                retry_after_secs: remaining.as_millis().div_ceil(1000) as u64,
            }
        } else {
            RateDecision::Allowed
        }
    }

    /// 当前窗口内的计数，窗口已过期或不存在时返回 `None`
    pub fn current_count(&self, key: &str) -> Option<u32> {
        self.windows
            .get_live(key, Instant::now())
            .map(|window| window.count)
    }

    pub fn len(&self) -> usize {
        self.windows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.windows.is_empty()
    }
}

impl Sweep for RateLimiter {
    fn name(&self) -> &'static str {
        "rate_limiter"
    }

    fn sweep(&self) -> usize {
        self.windows.sweep(Instant::now())
    }
}

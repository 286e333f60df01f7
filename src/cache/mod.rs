// 进程内缓存模块
// 限流计数与 TTL 缓存共用同一个过期映射和后台清扫机制

pub mod expiring;
pub mod keys;
pub mod rate_limit;
pub mod sweep;
pub mod ttl;

// 重新导出常用类型
pub use rate_limit::{RateDecision, RateLimitPolicy, RateLimiter, RateWindow};
pub use sweep::{Sweep, SweepHandle, spawn_sweeper};
pub use ttl::{CacheEntry, TtlCache};

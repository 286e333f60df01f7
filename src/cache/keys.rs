/// 已认证用户的限流键前缀
const USER_PREFIX: &str = "user:";

/// 匿名客户端的限流键前缀
const IP_PREFIX: &str = "ip:";

/// 按路由单独计数的限流键前缀，与 `user:` / `ip:` 键不会重叠
const ROUTE_PREFIX: &str = "route:";

/// 功能设置缓存键前缀
const SETTINGS_PREFIX: &str = "settings:";

/// 生成用户限流键
pub fn user_key(user_id: &str) -> String {
    format!("{}{}", USER_PREFIX, user_id)
}

/// 生成 IP 限流键
pub fn ip_key(ip: &str) -> String {
    format!("{}{}", IP_PREFIX, ip)
}

/// 生成按路由区分的限流键，`route:<route>:<identity>`
pub fn route_scoped_key(identity: &str, route: &str) -> String {
    format!("{}{}:{}", ROUTE_PREFIX, route, identity)
}

/// 生成功能设置缓存键
pub fn settings_key(user_id: &str) -> String {
    format!("{}{}", SETTINGS_PREFIX, user_id)
}

use std::collections::HashMap;
use std::env;
use std::str::FromStr;
use std::time::Duration;

use thiserror::Error;

use crate::cache::RateLimitPolicy;
use crate::cache::rate_limit::{DEFAULT_MAX_REQUESTS, DEFAULT_WINDOW};

#[derive(Debug, Error, PartialEq, Eq)]
pub enum ConfigError {
    #[error("missing environment variable {0}")]
    Missing(&'static str),

    #[error("invalid value for {key}: {value:?}")]
    Invalid { key: &'static str, value: String },

    #[error("invalid route override {0:?}, expected route=max")]
    RouteOverride(String),
}

#[derive(Debug, Clone)]
pub struct Config {
    pub database_url: String,
    pub auth_secret: String,
    pub server_host: String,
    pub server_port: u16,
    pub rate_limit_window_ms: u64,
    pub rate_limit_default_max: u32,
    pub rate_limit_routes: HashMap<String, u32>,
    pub settings_cache_ttl_secs: u64,
    pub sweep_interval_secs: u64,
}

impl Config {
    pub fn from_env() -> Result<Self, ConfigError> {
        dotenv::dotenv().ok();
        Self::from_lookup(|key| env::var(key).ok())
    }

    /// 从任意键值来源读取配置，便于测试
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let required = |key: &'static str| lookup(key).ok_or(ConfigError::Missing(key));

        let mut rate_limit_routes = RateLimitPolicy::builtin_routes();
        if let Some(raw) = lookup("RATE_LIMIT_ROUTES") {
            rate_limit_routes.extend(parse_route_overrides(&raw)?);
        }

        Ok(Config {
            database_url: required("DATABASE_URL")?,
            auth_secret: required("AUTH_SECRET")?,
            server_host: lookup("SERVER_HOST").unwrap_or_else(|| "0.0.0.0".into()),
            server_port: parse_or(&lookup, "SERVER_PORT", 3000)?,
            rate_limit_window_ms: parse_positive_or(
                &lookup,
                "RATE_LIMIT_WINDOW_MS",
                DEFAULT_WINDOW.as_millis() as u64,
            )?,
            rate_limit_default_max: parse_positive_or(
                &lookup,
                "RATE_LIMIT_DEFAULT_MAX",
                DEFAULT_MAX_REQUESTS,
            )?,
            rate_limit_routes,
            settings_cache_ttl_secs: parse_or(&lookup, "SETTINGS_CACHE_TTL_SECS", 300)?,
            sweep_interval_secs: parse_or(&lookup, "SWEEP_INTERVAL_SECS", 60)?,
        })
    }

    pub fn rate_limit_policy(&self) -> RateLimitPolicy {
        RateLimitPolicy {
            window: Duration::from_millis(self.rate_limit_window_ms),
            default_max: self.rate_limit_default_max,
            routes: self.rate_limit_routes.clone(),
        }
    }

    pub fn settings_cache_ttl(&self) -> Duration {
        Duration::from_secs(self.settings_cache_ttl_secs)
    }

    pub fn sweep_interval(&self) -> Duration {
        Duration::from_secs(self.sweep_interval_secs.max(1))
    }
}

fn parse_or<F, T>(lookup: &F, key: &'static str, default: T) -> Result<T, ConfigError>
where
    F: Fn(&str) -> Option<String>,
    T: FromStr,
{
    match lookup(key) {
        Some(value) => value.trim().parse().map_err(|_| ConfigError::Invalid {
            key,
            value: value.clone(),
        }),
        None => Ok(default),
    }
}

/// 同 `parse_or`，但拒绝 0：窗口为 0 时永不拒绝，上限为 0 时所有请求都被拒绝
fn parse_positive_or<F, T>(lookup: &F, key: &'static str, default: T) -> Result<T, ConfigError>
where
    F: Fn(&str) -> Option<String>,
    T: FromStr + Default + PartialEq,
{
    let value = parse_or(lookup, key, default)?;
    if value == T::default() {
        return Err(ConfigError::Invalid {
            key,
            value: lookup(key).unwrap_or_default(),
        });
    }
    Ok(value)
}

/// 解析 `route=max,route=max` 形式的路由上限，上限必须大于 0
pub fn parse_route_overrides(raw: &str) -> Result<HashMap<String, u32>, ConfigError> {
    raw.split(',')
        .map(str::trim)
        .filter(|item| !item.is_empty())
        .map(|item| {
            let (route, max) = item
                .split_once('=')
                .ok_or_else(|| ConfigError::RouteOverride(item.to_string()))?;
            let route = route.trim();
            let max = max
                .trim()
                .parse::<u32>()
                .map_err(|_| ConfigError::RouteOverride(item.to_string()))?;
            if route.is_empty() || max == 0 {
                return Err(ConfigError::RouteOverride(item.to_string()));
            }
            Ok((route.to_string(), max))
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn lookup_from(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |key: &str| map.get(key).cloned()
    }

    #[test]
    fn defaults_apply_when_optional_vars_missing() {
        let config = Config::from_lookup(lookup_from(&[
            ("DATABASE_URL", "postgres://localhost/journal"),
            ("AUTH_SECRET", "secret"),
        ]))
        .unwrap();

        assert_eq!(config.server_port, 3000);
        assert_eq!(config.settings_cache_ttl(), Duration::from_secs(300));
        assert_eq!(config.sweep_interval(), Duration::from_secs(60));

        let policy = config.rate_limit_policy();
        assert_eq!(policy, RateLimitPolicy::default());
    }

    #[test]
    fn missing_required_var_is_reported() {
        let err = Config::from_lookup(lookup_from(&[("AUTH_SECRET", "secret")])).unwrap_err();
        assert_eq!(err, ConfigError::Missing("DATABASE_URL"));
    }

    #[test]
    fn invalid_number_is_reported() {
        let err = Config::from_lookup(lookup_from(&[
            ("DATABASE_URL", "postgres://localhost/journal"),
            ("AUTH_SECRET", "secret"),
            ("RATE_LIMIT_DEFAULT_MAX", "lots"),
        ]))
        .unwrap_err();
        assert_eq!(
            err,
            ConfigError::Invalid {
                key: "RATE_LIMIT_DEFAULT_MAX",
                value: "lots".into()
            }
        );
    }

    #[test]
    fn route_overrides_merge_over_builtins() {
        let config = Config::from_lookup(lookup_from(&[
            ("DATABASE_URL", "postgres://localhost/journal"),
            ("AUTH_SECRET", "secret"),
            ("RATE_LIMIT_WINDOW_MS", "30000"),
            ("RATE_LIMIT_ROUTES", "/api/export=5, /api/settings=30"),
        ]))
        .unwrap();

        let policy = config.rate_limit_policy();
        assert_eq!(policy.window, Duration::from_secs(30));
        assert_eq!(policy.route_max("/api/export"), Some(5));
        assert_eq!(policy.route_max("/api/settings"), Some(30));
        assert_eq!(policy.route_max("/api/ai/chat"), Some(20));
    }

    #[test]
    fn malformed_route_override_is_rejected() {
        assert!(parse_route_overrides("/api/export").is_err());
        assert!(parse_route_overrides("/api/export=ten").is_err());
        assert!(parse_route_overrides("=10").is_err());
        assert_eq!(
            parse_route_overrides("/api/export=0").unwrap_err(),
            ConfigError::RouteOverride("/api/export=0".into())
        );
        assert_eq!(parse_route_overrides("").unwrap(), HashMap::new());
    }

    #[test]
    fn zero_window_is_rejected() {
        let err = Config::from_lookup(lookup_from(&[
            ("DATABASE_URL", "postgres://localhost/journal"),
            ("AUTH_SECRET", "secret"),
            ("RATE_LIMIT_WINDOW_MS", "0"),
        ]))
        .unwrap_err();
        assert_eq!(
            err,
            ConfigError::Invalid {
                key: "RATE_LIMIT_WINDOW_MS",
                value: "0".into()
            }
        );
    }

    #[test]
    fn zero_default_max_is_rejected() {
        let err = Config::from_lookup(lookup_from(&[
            ("DATABASE_URL", "postgres://localhost/journal"),
            ("AUTH_SECRET", "secret"),
            ("RATE_LIMIT_DEFAULT_MAX", " 0 "),
        ]))
        .unwrap_err();
        assert_eq!(
            err,
            ConfigError::Invalid {
                key: "RATE_LIMIT_DEFAULT_MAX",
                value: " 0 ".into()
            }
        );
    }

    #[test]
    fn zero_route_override_is_rejected() {
        let err = Config::from_lookup(lookup_from(&[
            ("DATABASE_URL", "postgres://localhost/journal"),
            ("AUTH_SECRET", "secret"),
            ("RATE_LIMIT_ROUTES", "/api/ai/chat=0"),
        ]))
        .unwrap_err();
        assert_eq!(err, ConfigError::RouteOverride("/api/ai/chat=0".into()));
    }

    #[test]
    fn huge_cache_ttl_is_accepted() {
        let config = Config::from_lookup(lookup_from(&[
            ("DATABASE_URL", "postgres://localhost/journal"),
            ("AUTH_SECRET", "secret"),
            ("SETTINGS_CACHE_TTL_SECS", "18446744073709551615"),
        ]))
        .unwrap();
        assert_eq!(config.settings_cache_ttl(), Duration::from_secs(u64::MAX));
    }
}

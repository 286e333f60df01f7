use std::sync::Arc;

use axum::{Router, routing::get};
use tower::ServiceBuilder;

use cache::{RateLimiter, SweepHandle, TtlCache, spawn_sweeper};
use config::Config;
use routes::settings::{FeatureSettings, SettingsRepository, SettingsService};

pub mod cache;
pub mod config;
pub mod error;
pub mod middleware;
pub mod routes;
pub mod utils;

#[derive(Clone)]
pub struct AppState {
    pub config: Arc<Config>,
    pub rate_limiter: Arc<RateLimiter>,
    pub settings: SettingsService,
}

impl AppState {
    /// 按配置创建空的限流器和设置缓存
    pub fn new(config: Config, settings_repo: Arc<dyn SettingsRepository>) -> Self {
        let rate_limiter = Arc::new(RateLimiter::new(config.rate_limit_policy()));
        let settings_cache = Arc::new(TtlCache::<FeatureSettings>::new(
            "settings_cache",
            config.settings_cache_ttl(),
        ));

        Self {
            config: Arc::new(config),
            rate_limiter,
            settings: SettingsService::new(settings_repo, settings_cache),
        }
    }

    /// 为两个存储各启动一个清扫任务
    pub fn spawn_sweepers(&self) -> Vec<SweepHandle> {
        let every = self.config.sweep_interval();
        vec![
            spawn_sweeper(self.rate_limiter.clone(), every),
            spawn_sweeper(self.settings.cache().clone(), every),
        ]
    }
}

pub fn app(state: AppState) -> Router {
    let router = Router::new()
        .route("/api/ping", get(routes::health::ping))
        .route(
            "/api/settings",
            get(routes::settings::get_settings).put(routes::settings::update_settings),
        )
        // 自上而下执行：先记录错误，再识别身份，最后限流
        .layer(
            ServiceBuilder::new()
                .layer(axum::middleware::from_fn(middleware::log_errors))
                .layer(axum::middleware::from_fn_with_state(
                    state.clone(),
                    middleware::identify,
                ))
                .layer(axum::middleware::from_fn_with_state(
                    state.clone(),
                    middleware::rate_limit,
                )),
        );

    // 根据编译模式决定是否添加CORS
    #[cfg(debug_assertions)]
    let router = router.layer(tower_http::cors::CorsLayer::permissive());

    router.with_state(state)
}

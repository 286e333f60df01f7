use std::net::SocketAddr;

use axum::{
    extract::{ConnectInfo, MatchedPath, Request, State},
    http::HeaderMap,
    middleware::Next,
    response::{IntoResponse, Response},
};

use crate::{
    AppState,
    cache::{RateDecision, keys},
    error::AppError,
    utils::Claims,
};

/// 限流中间件，必须放在 [`identify`](super::identify) 之后
pub async fn rate_limit(State(state): State<AppState>, req: Request, next: Next) -> Response {
    let identity = client_identity(&req);
    let route = req
        .extensions()
        .get::<MatchedPath>()
        .map(|path| path.as_str().to_owned())
        .unwrap_or_else(|| req.uri().path().to_owned());

    match state.rate_limiter.check_route(&identity, &route) {
        RateDecision::Allowed => next.run(req).await,
        RateDecision::Denied { retry_after_secs } => {
            tracing::warn!(
                identity = %identity,
                route = %route,
                retry_after_secs,
                "Rate limit exceeded"
            );
            AppError::RateLimited { retry_after_secs }.into_response()
        }
    }
}

/// 已登录用户按用户ID计数，匿名请求按客户端IP计数
pub fn client_identity(req: &Request) -> String {
    if let Some(claims) = req.extensions().get::<Claims>() {
        return keys::user_key(&claims.sub);
    }

    let remote_ip = req
        .extensions()
        .get::<ConnectInfo<SocketAddr>>()
        .map(|ci| ci.0.ip().to_string());

    keys::ip_key(&client_ip(req.headers(), remote_ip.as_deref()))
}

/// 优先使用代理头中的IP，其次连接IP
fn client_ip(headers: &HeaderMap, remote_ip: Option<&str>) -> String {
    headers
        .get("x-real-ip")
        .and_then(|h| h.to_str().ok())
        .filter(|ip| !ip.trim().is_empty())
        .or_else(|| {
            headers
                .get("x-forwarded-for")
                .and_then(|h| h.to_str().ok())
                .and_then(|s| s.split(',').find(|ip| !ip.trim().is_empty()))
        })
        .or(remote_ip)
        .unwrap_or("unknown")
        .trim()
        .to_string()
}

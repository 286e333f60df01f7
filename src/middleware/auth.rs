use axum::{
    extract::{FromRequestParts, Request, State},
    http::request::Parts,
    middleware::Next,
    response::Response,
};
use axum_extra::{
    TypedHeader,
    headers::{Authorization, authorization::Bearer},
    typed_header::TypedHeaderRejection,
};

use crate::{AppState, error::AppError, utils::Claims, utils::verify_token};

/// 解析 Bearer 令牌，验证通过时把 `Claims` 放入请求扩展
///
/// 不拒绝匿名请求：限流需要先知道身份，是否必须登录由各个 handler 通过
/// [`AuthUser`] 决定。格式错误的 `Authorization` 头按匿名处理，同样要经过限流。
pub async fn identify(
    State(state): State<AppState>,
    bearer: Result<TypedHeader<Authorization<Bearer>>, TypedHeaderRejection>,
    mut req: Request,
    next: Next,
) -> Response {
    match bearer {
        Ok(TypedHeader(auth)) => match verify_token(auth.token(), &state.config.auth_secret) {
            Ok(claims) => {
                req.extensions_mut().insert(claims);
            }
            Err(e) => {
                tracing::debug!("Rejected bearer token: {}", e);
            }
        },
        Err(e) if !e.is_missing() => {
            tracing::debug!("Ignoring malformed authorization header: {}", e);
        }
        Err(_) => {}
    }

    next.run(req).await
}

/// 需要登录的 handler 使用的提取器
#[derive(Debug, Clone)]
pub struct AuthUser(pub Claims);

impl<S: Send + Sync> FromRequestParts<S> for AuthUser {
    type Rejection = AppError;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        parts
            .extensions
            .get::<Claims>()
            .cloned()
            .map(AuthUser)
            .ok_or(AppError::Unauthorized)
    }
}

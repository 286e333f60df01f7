use axum::{
    http::{HeaderValue, StatusCode, header::RETRY_AFTER},
    response::{IntoResponse, Response},
};
use serde::Serialize;
use thiserror::Error;

use crate::utils::{error_codes, error_to_api_response, error_with_data};

#[derive(Debug, Error)]
pub enum AppError {
    #[error("未授权访问")]
    Unauthorized,

    #[error("{0}")]
    Validation(String),

    #[error("数据库错误: {0}")]
    Database(#[from] sqlx::Error),

    #[error("请求过于频繁，请在{retry_after_secs}秒后重试")]
    RateLimited { retry_after_secs: u64 },
}

#[derive(Serialize)]
struct RetryAfter {
    retry_after_secs: u64,
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let message = self.to_string();
        match self {
            AppError::Unauthorized => (
                StatusCode::UNAUTHORIZED,
                error_to_api_response::<()>(error_codes::AUTH_FAILED, message),
            )
                .into_response(),
            AppError::Validation(_) => (
                StatusCode::BAD_REQUEST,
                error_to_api_response::<()>(error_codes::VALIDATION_ERROR, message),
            )
                .into_response(),
            AppError::Database(e) => {
                tracing::error!("Database error: {:?}", e);
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    error_to_api_response::<()>(error_codes::INTERNAL_ERROR, message),
                )
                    .into_response()
            }
            AppError::RateLimited { retry_after_secs } => {
                let mut response = (
                    StatusCode::TOO_MANY_REQUESTS,
                    error_with_data(
                        error_codes::RATE_LIMIT,
                        message,
                        RetryAfter { retry_after_secs },
                    ),
                )
                    .into_response();
                response
                    .headers_mut()
                    .insert(RETRY_AFTER, HeaderValue::from(retry_after_secs));
                response
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn rate_limited_sets_retry_after_header() {
        let response = AppError::RateLimited {
            retry_after_secs: 42,
        }
        .into_response();

        assert_eq!(response.status(), StatusCode::TOO_MANY_REQUESTS);
        assert_eq!(response.headers()[RETRY_AFTER], "42");
    }

    #[test]
    fn unauthorized_maps_to_401() {
        let response = AppError::Unauthorized.into_response();
        assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
    }
}

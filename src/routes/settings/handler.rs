use axum::{
    extract::{Json, State},
    http::StatusCode,
    response::IntoResponse,
};

use crate::{AppState, error::AppError, middleware::AuthUser, utils::success_to_api_response};

use super::model::SettingsPatch;

#[axum::debug_handler]
pub async fn get_settings(
    State(state): State<AppState>,
    AuthUser(claims): AuthUser,
) -> Result<impl IntoResponse, AppError> {
    let settings = state.settings.get(&claims.sub).await?;
    Ok((StatusCode::OK, success_to_api_response(settings)))
}

#[axum::debug_handler]
pub async fn update_settings(
    State(state): State<AppState>,
    AuthUser(claims): AuthUser,
    Json(patch): Json<SettingsPatch>,
) -> Result<impl IntoResponse, AppError> {
    if patch.is_empty() {
        return Err(AppError::Validation("没有需要更新的设置".to_string()));
    }

    let settings = state.settings.update(&claims.sub, &patch).await?;
    Ok((StatusCode::OK, success_to_api_response(settings)))
}

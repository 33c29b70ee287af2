use axum::{extract::State, http::StatusCode, response::IntoResponse, Extension, Json};
use chrono::Utc;
use std::sync::Arc;

use crate::{
    error::ApiError,
    extractors::ValidatedJson,
    middlewares::auth::JwtClaims,
    models::{
        pattern::PatternConquestResponse,
        user::{TutorialCompletionRequest, UpdateProfileRequest},
    },
    services::AppState,
};

pub async fn get_me(
    State(state): State<Arc<AppState>>,
    Extension(claims): Extension<JwtClaims>,
) -> Result<impl IntoResponse, ApiError> {
    let profile = state.user_service().ensure_profile(&claims).await?;
    Ok(Json(profile))
}

pub async fn update_me(
    State(state): State<Arc<AppState>>,
    Extension(claims): Extension<JwtClaims>,
    ValidatedJson(req): ValidatedJson<UpdateProfileRequest>,
) -> Result<impl IntoResponse, ApiError> {
    tracing::info!(user_id = %claims.sub, "Updating profile");
    let profile = state.user_service().update_profile(&claims, req).await?;
    Ok(Json(profile))
}

pub async fn home_summary(
    State(state): State<Arc<AppState>>,
    Extension(claims): Extension<JwtClaims>,
) -> Result<impl IntoResponse, ApiError> {
    let summary = state.user_service().home_summary(&claims).await?;
    Ok(Json(summary))
}

pub async fn widget_snapshot(
    State(state): State<Arc<AppState>>,
    Extension(claims): Extension<JwtClaims>,
) -> Result<impl IntoResponse, ApiError> {
    let snapshot = state
        .user_service()
        .widget_snapshot(&claims, Utc::now())
        .await?;
    Ok(Json(snapshot))
}

pub async fn pattern_conquests(
    State(state): State<Arc<AppState>>,
    Extension(claims): Extension<JwtClaims>,
) -> Result<impl IntoResponse, ApiError> {
    let patterns = state.user_service().pattern_conquests(&claims.sub).await?;
    Ok(Json(PatternConquestResponse { patterns }))
}

pub async fn complete_tutorial(
    State(state): State<Arc<AppState>>,
    Extension(claims): Extension<JwtClaims>,
    ValidatedJson(req): ValidatedJson<TutorialCompletionRequest>,
) -> Result<impl IntoResponse, ApiError> {
    let response = state.user_service().complete_tutorial(&claims, req).await?;
    Ok((StatusCode::ACCEPTED, Json(response)))
}

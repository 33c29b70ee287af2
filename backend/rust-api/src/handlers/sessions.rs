use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    response::IntoResponse,
    Extension, Json,
};
use std::sync::Arc;

use crate::{
    error::ApiError,
    extractors::ValidatedJson,
    middlewares::auth::JwtClaims,
    models::{
        attempt::{AttemptListQuery, AttemptListResponse},
        session::{CreateSessionRequest, FinishSessionRequest, ListSessionsQuery, SessionListResponse},
        Attempt, Checkpoint,
    },
    services::AppState,
};

pub async fn create_session(
    State(state): State<Arc<AppState>>,
    Extension(claims): Extension<JwtClaims>,
    ValidatedJson(req): ValidatedJson<CreateSessionRequest>,
) -> Result<impl IntoResponse, ApiError> {
    tracing::info!(user_id = %claims.sub, mode = ?req.mode, "Creating session");

    let session = state
        .session_service()
        .create_session(&claims.sub, req)
        .await?;
    Ok((StatusCode::CREATED, Json(session)))
}

pub async fn list_sessions(
    State(state): State<Arc<AppState>>,
    Extension(claims): Extension<JwtClaims>,
    Query(query): Query<ListSessionsQuery>,
) -> Result<impl IntoResponse, ApiError> {
    let sessions = state
        .session_service()
        .list_sessions(&claims.sub, query.limit)
        .await?;
    Ok(Json(SessionListResponse {
        sessions,
        next_cursor: None,
    }))
}

pub async fn get_session(
    State(state): State<Arc<AppState>>,
    Extension(claims): Extension<JwtClaims>,
    Path(session_id): Path<String>,
) -> Result<impl IntoResponse, ApiError> {
    let session = state
        .session_service()
        .get_session(&claims.sub, &session_id)
        .await?;
    Ok(Json(session))
}

pub async fn finish_session(
    State(state): State<Arc<AppState>>,
    Extension(claims): Extension<JwtClaims>,
    Path(session_id): Path<String>,
    ValidatedJson(req): ValidatedJson<FinishSessionRequest>,
) -> Result<impl IntoResponse, ApiError> {
    tracing::info!(user_id = %claims.sub, %session_id, status = ?req.status, "Finishing session");

    let session = state
        .session_service()
        .finish_session(&claims, &session_id, req.status)
        .await?;
    Ok(Json(session))
}

pub async fn log_attempt(
    State(state): State<Arc<AppState>>,
    Extension(claims): Extension<JwtClaims>,
    Path(session_id): Path<String>,
    ValidatedJson(attempt): ValidatedJson<Attempt>,
) -> Result<impl IntoResponse, ApiError> {
    let record = state
        .session_service()
        .log_attempt(&claims.sub, &session_id, attempt)
        .await?;
    Ok((StatusCode::CREATED, Json(record)))
}

pub async fn log_checkpoint(
    State(state): State<Arc<AppState>>,
    Extension(claims): Extension<JwtClaims>,
    Path(session_id): Path<String>,
    ValidatedJson(checkpoint): ValidatedJson<Checkpoint>,
) -> Result<impl IntoResponse, ApiError> {
    let record = state
        .session_service()
        .log_checkpoint(&claims.sub, &session_id, checkpoint)
        .await?;
    Ok((StatusCode::CREATED, Json(record)))
}

pub async fn list_attempts(
    State(state): State<Arc<AppState>>,
    Extension(claims): Extension<JwtClaims>,
    Path(session_id): Path<String>,
    Query(query): Query<AttemptListQuery>,
) -> Result<impl IntoResponse, ApiError> {
    let attempts = state
        .session_service()
        .list_attempts(&claims.sub, &session_id, query.verdict.as_deref())
        .await?;
    Ok(Json(AttemptListResponse { attempts }))
}

use axum::{extract::State, http::StatusCode, response::IntoResponse, Json};
use serde_json::json;
use std::sync::Arc;

use crate::engine::catalog::PATTERN_DEFINITIONS;
use crate::metrics;
use crate::models::pattern::PatternCatalogResponse;
use crate::services::{repository::UserRepository, AppState};

pub async fn health_check(State(state): State<Arc<AppState>>) -> impl IntoResponse {
    let mut dependencies = serde_json::Map::new();
    dependencies.insert("storage".to_string(), json!(check_storage(&state).await));

    let healthy = dependencies
        .values()
        .all(|dep| dep.get("status").and_then(|v| v.as_str()) == Some("healthy"));
    let (status_code, status) = if healthy {
        (StatusCode::OK, "healthy")
    } else {
        (StatusCode::SERVICE_UNAVAILABLE, "degraded")
    };

    (
        status_code,
        Json(json!({
            "status": status,
            "service": "englishbrain-api",
            "version": env!("CARGO_PKG_VERSION"),
            "dependencies": dependencies
        })),
    )
}

async fn check_storage(state: &AppState) -> serde_json::Map<String, serde_json::Value> {
    let mut result = serde_json::Map::new();
    result.insert(
        "backend".to_string(),
        json!(format!("{:?}", state.config.storage_backend).to_lowercase()),
    );

    match tokio::time::timeout(std::time::Duration::from_secs(1), state.users.ping()).await {
        Ok(Ok(())) => {
            result.insert("status".to_string(), json!("healthy"));
        }
        Ok(Err(e)) => {
            result.insert("status".to_string(), json!("unhealthy"));
            result.insert("error".to_string(), json!(format!("{:#}", e)));
        }
        Err(_) => {
            result.insert("status".to_string(), json!("unhealthy"));
            result.insert("error".to_string(), json!("Storage ping timeout after 1s"));
        }
    }

    result
}

pub async fn metrics_handler() -> impl IntoResponse {
    match metrics::render_metrics() {
        Ok(metrics_text) => (StatusCode::OK, metrics_text),
        Err(e) => (
            StatusCode::INTERNAL_SERVER_ERROR,
            format!("Failed to render metrics: {}", e),
        ),
    }
}

pub async fn pattern_catalog() -> Json<PatternCatalogResponse> {
    Json(PatternCatalogResponse {
        patterns: PATTERN_DEFINITIONS,
    })
}

pub mod sessions;
pub mod users;

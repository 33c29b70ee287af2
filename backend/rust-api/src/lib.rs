use axum::{
    http::{header, Method},
    middleware,
    routing::{get, post},
    Router,
};
use std::sync::Arc;
use tower_http::{cors::CorsLayer, trace::TraceLayer};

pub mod config;
pub mod engine;
pub mod error;
pub mod extractors;
pub mod handlers;
pub mod metrics;
pub mod middlewares;
pub mod models;
pub mod services;
pub mod utils;

pub use config::Config;
pub use services::AppState;

pub fn create_router(app_state: Arc<AppState>) -> Router {
    let cors = CorsLayer::new()
        .allow_methods([Method::GET, Method::POST, Method::PATCH, Method::OPTIONS])
        .allow_headers([header::AUTHORIZATION, header::CONTENT_TYPE])
        .allow_origin(tower_http::cors::Any);

    Router::new()
        // Public endpoints
        .route("/health", get(handlers::health_check))
        .route("/metrics", get(handlers::metrics_handler))
        .route("/api/v1/patterns", get(handlers::pattern_catalog))
        // Learner endpoints (Bearer JWT)
        .nest(
            "/api/v1",
            learner_routes().layer(middleware::from_fn_with_state(
                app_state.clone(),
                middlewares::auth::auth_middleware,
            )),
        )
        .with_state(app_state)
        .layer(cors)
        .layer(middleware::from_fn(
            middlewares::metrics::metrics_middleware,
        ))
        .layer(TraceLayer::new_for_http())
}

fn learner_routes() -> Router<Arc<AppState>> {
    Router::new()
        .route(
            "/sessions",
            post(handlers::sessions::create_session).get(handlers::sessions::list_sessions),
        )
        .route(
            "/sessions/{id}",
            get(handlers::sessions::get_session).patch(handlers::sessions::finish_session),
        )
        .route(
            "/sessions/{id}/attempts",
            post(handlers::sessions::log_attempt).get(handlers::sessions::list_attempts),
        )
        .route(
            "/sessions/{id}/checkpoints",
            post(handlers::sessions::log_checkpoint),
        )
        .route("/level-tests", post(handlers::level_tests::submit_level_test))
        .route(
            "/users/me",
            get(handlers::users::get_me).patch(handlers::users::update_me),
        )
        .route("/users/me/home", get(handlers::users::home_summary))
        .route(
            "/users/me/widget-snapshot",
            get(handlers::users::widget_snapshot),
        )
        .route(
            "/users/me/pattern-conquests",
            get(handlers::users::pattern_conquests),
        )
        .route(
            "/users/me/tutorial-completions",
            post(handlers::users::complete_tutorial),
        )
}

#![allow(dead_code)]

use axum::{
    body::{to_bytes, Body},
    http::{Request, StatusCode},
    Router,
};
use englishbrain_api::{
    config::{Config, StorageBackend},
    create_router,
    middlewares::auth::{JwtClaims, JwtService},
    models::{level_test::LessonPrompt, LessonDoc},
    services::{memory_repository::MemoryRepository, AppState},
};
use serde_json::Value;
use std::sync::Arc;
use tower::ServiceExt;

pub const TEST_SECRET: &str = "integration-test-secret";

pub struct TestApp {
    pub router: Router,
    pub repo: Arc<MemoryRepository>,
}

pub async fn create_test_app() -> TestApp {
    let _ = tracing_subscriber::fmt()
        .with_test_writer()
        .with_max_level(tracing::Level::DEBUG)
        .try_init();

    let config = Config {
        storage_backend: StorageBackend::Memory,
        jwt_secret: TEST_SECRET.to_string(),
        ..Config::default()
    };

    let repo = Arc::new(MemoryRepository::new());
    seed_lessons(&repo).await;

    let app_state = Arc::new(AppState::with_repository(config, repo.clone()));
    TestApp {
        router: create_router(app_state),
        repo,
    }
}

/// Ten placement lessons `lesson-0`..`lesson-9`; even ones are level 2, odd ones level 4.
async fn seed_lessons(repo: &MemoryRepository) {
    repo.insert_lessons((0..10).map(|i| LessonDoc {
        lesson_id: format!("lesson-{}", i),
        level: if i % 2 == 0 { 2 } else { 4 },
        prompt: LessonPrompt {
            ko: "나는 학생이다".to_string(),
            en: "I am a student".to_string(),
        },
        correct_sequence: vec!["tok_i".to_string(), "tok_am".to_string(), "tok_student".to_string()],
        token_pool: Vec::new(),
        tags: vec!["level-test".to_string()],
        level_test: true,
    }))
    .await;
}

pub fn token_for(user_id: &str) -> String {
    let claims = JwtClaims::new(user_id, chrono::Duration::hours(1));
    JwtService::new(TEST_SECRET)
        .generate_token(&claims)
        .expect("token")
}

pub fn token_with(claims: &JwtClaims) -> String {
    JwtService::new(TEST_SECRET)
        .generate_token(claims)
        .expect("token")
}

/// Send a request and decode the JSON response body (`Value::Null` when empty).
pub async fn send(
    app: &TestApp,
    method: &str,
    uri: &str,
    token: Option<&str>,
    body: Option<Value>,
) -> (StatusCode, Value) {
    let mut builder = Request::builder().method(method).uri(uri);
    if let Some(token) = token {
        builder = builder.header("authorization", format!("Bearer {}", token));
    }
    let request = match body {
        Some(body) => builder
            .header("content-type", "application/json")
            .body(Body::from(body.to_string()))
            .unwrap(),
        None => builder.body(Body::empty()).unwrap(),
    };

    let response = app.router.clone().oneshot(request).await.unwrap();
    let status = response.status();
    let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
    let json = if bytes.is_empty() {
        Value::Null
    } else {
        serde_json::from_slice(&bytes).unwrap_or(Value::Null)
    };
    (status, json)
}

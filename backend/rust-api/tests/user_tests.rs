use axum::http::StatusCode;
use englishbrain_api::middlewares::auth::JwtClaims;
use serde_json::json;

mod common;

use common::{create_test_app, send, token_for, token_with};

#[tokio::test]
async fn test_public_endpoints() {
    let app = create_test_app().await;

    let (status, health) = send(&app, "GET", "/health", None, None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(health["status"], "healthy");
    assert_eq!(health["dependencies"]["storage"]["backend"], "memory");

    let (status, catalog) = send(&app, "GET", "/api/v1/patterns", None, None).await;
    assert_eq!(status, StatusCode::OK);
    let patterns = catalog["patterns"].as_array().unwrap();
    assert_eq!(patterns.len(), 7);
    assert_eq!(patterns[0]["patternId"], "time-adverb");
    assert_eq!(patterns[0]["focus"], "time-adverb");
}

#[tokio::test]
async fn test_first_contact_creates_default_profile_from_claims() {
    let app = create_test_app().await;
    let mut claims = JwtClaims::new("user-001", chrono::Duration::hours(1));
    claims.email = Some("mina@example.com".to_string());
    claims.timezone = Some("America/New_York".to_string());
    let token = token_with(&claims);

    let (status, me) = send(&app, "GET", "/api/v1/users/me", Some(&token), None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(me["userId"], "user-001");
    assert_eq!(me["displayName"], "mina");
    assert_eq!(me["timezone"], "America/New_York");
    assert_eq!(me["locale"], "ko-KR");
    assert_eq!(me["level"], 1);
    assert_eq!(me["provisionalLevel"], 1);
    assert_eq!(me["preferences"]["dailyGoalSentences"], 12);
    assert_eq!(me["stats"]["subscriptionStatus"], "free");
    assert_eq!(me["flags"]["tutorialCompleted"], false);
}

#[tokio::test]
async fn test_update_profile_applies_patch() {
    let app = create_test_app().await;
    let token = token_for("user-001");

    let (status, me) = send(
        &app,
        "PATCH",
        "/api/v1/users/me",
        Some(&token),
        Some(json!({
            "displayName": "  Jun ",
            "timezone": "Europe/Berlin",
            "preferences": { "dailyGoalMinutes": 20, "pushOptIn": true }
        })),
    )
    .await;
    assert_eq!(status, StatusCode::OK, "{}", me);
    assert_eq!(me["displayName"], "Jun");
    assert_eq!(me["timezone"], "Europe/Berlin");
    assert_eq!(me["preferences"]["dailyGoalMinutes"], 20);
    assert_eq!(me["preferences"]["pushOptIn"], true);
    assert_eq!(me["preferences"]["dailyGoalSentences"], 12);

    let (_, home) = send(&app, "GET", "/api/v1/users/me/home", Some(&token), None).await;
    assert_eq!(home["dailyGoal"]["tier"], "intensive");
}

#[tokio::test]
async fn test_update_profile_rejects_invalid_values() {
    let app = create_test_app().await;
    let token = token_for("user-001");

    let (status, body) = send(
        &app,
        "PATCH",
        "/api/v1/users/me",
        Some(&token),
        Some(json!({ "timezone": "Mars/Olympus" })),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["message"], "timezone: Unknown timezone: Mars/Olympus");

    let (status, body) = send(
        &app,
        "PATCH",
        "/api/v1/users/me",
        Some(&token),
        Some(json!({ "preferences": { "dailyGoalSentences": 0 } })),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert!(body["message"]
        .as_str()
        .unwrap()
        .starts_with("preferences.daily_goal_sentences"));
}

#[tokio::test]
async fn test_home_summary_for_new_learner() {
    let app = create_test_app().await;
    let token = token_for("user-001");

    let (status, home) = send(&app, "GET", "/api/v1/users/me/home", Some(&token), None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(home["dailyGoal"]["sentences"], 12);
    assert_eq!(home["dailyGoal"]["tier"], "basic");
    assert_eq!(home["progress"]["sentencesCompleted"], 0);
    assert_eq!(home["brainTokens"]["pending"], 3);
    assert_eq!(home["patternCards"].as_array().unwrap().len(), 0);
    assert_eq!(home["recommendedActions"][0]["type"], "daily-session");
    assert_eq!(
        home["recommendedActions"][0]["deeplink"],
        "englishbrain://session/warmup"
    );
    assert_eq!(home["liveActivity"]["supported"], true);
    assert_eq!(home["liveActivity"]["activityId"], serde_json::Value::Null);
}

#[tokio::test]
async fn test_widget_snapshot_for_new_learner() {
    let app = create_test_app().await;
    let token = token_for("user-001");

    let (status, widget) = send(
        &app,
        "GET",
        "/api/v1/users/me/widget-snapshot",
        Some(&token),
        None,
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(widget["sentencesRemaining"], 12);
    assert_eq!(widget["dailyGoalTier"], "basic");
    assert_eq!(widget["currentStreak"], 0);
    assert_eq!(widget["nextBrainTokenInDays"], serde_json::Value::Null);
    assert_eq!(widget["deeplink"], "englishbrain://session");
}

#[tokio::test]
async fn test_tutorial_completion_unlocks_personalization() {
    let app = create_test_app().await;
    let token = token_for("user-001");

    let (status, body) = send(
        &app,
        "POST",
        "/api/v1/users/me/tutorial-completions",
        Some(&token),
        Some(json!({ "tutorialId": "onboarding-v1", "completedAt": "2024-06-03T09:00:00Z" })),
    )
    .await;
    assert_eq!(status, StatusCode::ACCEPTED);
    assert_eq!(body["tutorialId"], "onboarding-v1");
    assert_eq!(body["streakEligible"], true);
    assert_eq!(body["personalizationUnlocked"], true);

    let (_, me) = send(&app, "GET", "/api/v1/users/me", Some(&token), None).await;
    assert_eq!(me["flags"]["tutorialCompleted"], true);
    assert_eq!(me["flags"]["personalizationReady"], true);

    let (status, _) = send(
        &app,
        "POST",
        "/api/v1/users/me/tutorial-completions",
        Some(&token),
        Some(json!({ "tutorialId": " ", "completedAt": "2024-06-03T09:00:00Z" })),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
}

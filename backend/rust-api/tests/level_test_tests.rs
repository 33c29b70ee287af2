use axum::http::StatusCode;
use serde_json::{json, Value};

mod common;

use common::{create_test_app, send, token_for};

const RIGHT: [&str; 3] = ["tok_i", "tok_am", "tok_student"];
const WRONG: [&str; 2] = ["tok_am", "tok_i"];

/// Ten attempts over `lesson-0`..`lesson-9`; the first `correct` are right.
fn submission(correct: usize) -> Value {
    let attempts: Vec<Value> = (0..10)
        .map(|i| {
            json!({
                "itemId": format!("lesson-{}", i),
                "selectedTokenIds": if i < correct { RIGHT.to_vec() } else { WRONG.to_vec() },
                "timeSpentMs": 5000,
                "hintsUsed": 0
            })
        })
        .collect();
    json!({
        "attempts": attempts,
        "startedAt": "2024-06-03T09:00:00Z",
        "completedAt": "2024-06-03T09:07:00Z"
    })
}

#[tokio::test]
async fn test_level_test_recommends_level_and_updates_profile() {
    let app = create_test_app().await;
    let token = token_for("user-001");

    let (status, result) = send(
        &app,
        "POST",
        "/api/v1/level-tests",
        Some(&token),
        Some(submission(10)),
    )
    .await;

    assert_eq!(status, StatusCode::OK, "{}", result);
    assert_eq!(result["correct"], 10);
    assert_eq!(result["total"], 10);
    assert_eq!(result["accuracy"], 1.0);
    assert_eq!(result["confidence"], 1.0);
    assert_eq!(result["recommendedLevel"], 3);
    assert_eq!(
        result["rationale"],
        "Accuracy 100% across 10 attempts. Recommended level 3 computed from lesson difficulty."
    );

    let (status, me) = send(&app, "GET", "/api/v1/users/me", Some(&token), None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(me["provisionalLevel"], 3);
    assert_eq!(me["flags"]["levelTestCompleted"], true);
    assert_eq!(me["lastLevelTest"]["recommendedLevel"], 3);
}

#[tokio::test]
async fn test_first_incorrect_item_becomes_next_lesson() {
    let app = create_test_app().await;
    let token = token_for("user-001");

    let (status, result) = send(
        &app,
        "POST",
        "/api/v1/level-tests",
        Some(&token),
        Some(submission(6)),
    )
    .await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(result["correct"], 6);
    assert_eq!(result["nextLessonId"], "lesson-6");
}

#[tokio::test]
async fn test_level_test_rejects_invalid_submissions() {
    let app = create_test_app().await;
    let token = token_for("user-001");

    let mut short = submission(5);
    short["attempts"].as_array_mut().unwrap().truncate(9);
    let (status, body) = send(&app, "POST", "/api/v1/level-tests", Some(&token), Some(short)).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert!(body["message"]
        .as_str()
        .unwrap()
        .contains("between 10 and 15 attempts"));

    let mut inverted = submission(5);
    inverted["completedAt"] = json!("2024-06-03T08:00:00Z");
    let (status, body) =
        send(&app, "POST", "/api/v1/level-tests", Some(&token), Some(inverted)).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["message"], "completedAt must not precede startedAt");

    let mut empty_selection = submission(5);
    empty_selection["attempts"][2]["selectedTokenIds"] = json!([]);
    let (status, _) = send(
        &app,
        "POST",
        "/api/v1/level-tests",
        Some(&token),
        Some(empty_selection),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn test_level_test_rate_limit_is_per_user() {
    let app = create_test_app().await;
    let token = token_for("user-001");

    for _ in 0..2 {
        let (status, _) = send(
            &app,
            "POST",
            "/api/v1/level-tests",
            Some(&token),
            Some(submission(7)),
        )
        .await;
        assert_eq!(status, StatusCode::OK);
    }

    let (status, body) = send(
        &app,
        "POST",
        "/api/v1/level-tests",
        Some(&token),
        Some(submission(7)),
    )
    .await;
    assert_eq!(status, StatusCode::TOO_MANY_REQUESTS);
    assert_eq!(body["status"], 429);

    let other = token_for("user-002");
    let (status, _) = send(
        &app,
        "POST",
        "/api/v1/level-tests",
        Some(&other),
        Some(submission(7)),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
}

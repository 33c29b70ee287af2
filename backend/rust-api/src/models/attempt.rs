use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::str::FromStr;
use validator::{Validate, ValidationError};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Verdict {
    Correct,
    Incorrect,
    /// Answered correctly after the learner fixed a flagged placement.
    Corrected,
}

impl Verdict {
    pub fn as_str(&self) -> &'static str {
        match self {
            Verdict::Correct => "correct",
            Verdict::Incorrect => "incorrect",
            Verdict::Corrected => "corrected",
        }
    }
}

impl FromStr for Verdict {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "correct" => Ok(Verdict::Correct),
            "incorrect" => Ok(Verdict::Incorrect),
            "corrected" => Ok(Verdict::Corrected),
            other => Err(format!("Unknown verdict: {}", other)),
        }
    }
}

/// Sentence frame slot: subject, verb, object, modifier.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum SlotRole {
    S,
    V,
    O,
    M,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Placement {
    pub slot: SlotRole,
    pub token_id: String,
}

/// One practice-item response as submitted by the client.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
#[validate(schema(function = "validate_attempt_window"))]
pub struct Attempt {
    #[validate(length(min = 1, message = "attemptId is required"))]
    pub attempt_id: String,

    #[validate(length(min = 1, message = "itemId is required"))]
    pub item_id: String,

    pub started_at: DateTime<Utc>,
    pub completed_at: DateTime<Utc>,

    #[serde(default)]
    pub placements: Vec<Placement>,

    pub verdict: Verdict,
    pub time_spent_ms: u64,
    pub hints_used: u32,
    pub combo_count: u32,

    /// 0 = first try. Absent on clients that do not track retries.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub retry_number: Option<u32>,
}

impl Attempt {
    pub fn is_first_try(&self) -> bool {
        self.retry_number == Some(0)
    }
}

fn validate_attempt_window(attempt: &Attempt) -> Result<(), ValidationError> {
    if attempt.completed_at < attempt.started_at {
        let mut err = ValidationError::new("attempt_window");
        err.message = Some("completedAt must not precede startedAt".into());
        return Err(err);
    }
    Ok(())
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AttemptScore {
    pub score: f64,
    pub accuracy: f64,
    pub hint_penalty: f64,
    pub combo_bonus: f64,
}

/// Stored attempt: the submission plus ownership and its score.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AttemptRecord {
    #[serde(flatten)]
    pub attempt: Attempt,
    pub session_id: String,
    pub user_id: String,
    pub score: f64,
    pub accuracy: f64,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Serialize)]
pub struct AttemptListResponse {
    pub attempts: Vec<AttemptRecord>,
}

#[derive(Debug, Deserialize)]
pub struct AttemptListQuery {
    pub verdict: Option<String>,
}

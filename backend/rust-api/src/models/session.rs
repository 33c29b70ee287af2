use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use validator::Validate;

use super::attempt::SlotRole;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum SessionMode {
    Daily,
    Review,
    BrainBurst,
    Tutorial,
    Diagnostic,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SessionStatus {
    Pending,
    Active,
    Completed,
    Abandoned,
}

impl SessionStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            SessionStatus::Pending => "pending",
            SessionStatus::Active => "active",
            SessionStatus::Completed => "completed",
            SessionStatus::Abandoned => "abandoned",
        }
    }

    pub fn is_finished(&self) -> bool {
        matches!(self, SessionStatus::Completed | SessionStatus::Abandoned)
    }
}

/// Brain Burst configuration attached to a session at creation time.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BrainBurstState {
    pub active: bool,
    pub multiplier: f64,
    #[serde(default)]
    pub eligible_at: Option<DateTime<Utc>>,
    #[serde(default)]
    pub sessions_until_activation: Option<u32>,
}

impl Default for BrainBurstState {
    fn default() -> Self {
        Self {
            active: false,
            multiplier: 2.0,
            eligible_at: None,
            sessions_until_activation: Some(5),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ItemPrompt {
    pub ko: String,
    pub en_reference: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FrameToken {
    pub token_id: String,
    pub display: String,
    pub role: SlotRole,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DifficultyBand {
    Intro,
    Core,
    Challenge,
}

/// One sentence-building item on the session roster.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SessionItem {
    pub item_id: String,
    pub prompt: ItemPrompt,
    pub tokens: Vec<FrameToken>,
    #[serde(default)]
    pub distractors: Vec<FrameToken>,
    pub correct_sequence: Vec<String>,
    pub pattern_tags: Vec<String>,
    pub difficulty_band: DifficultyBand,
}

impl SessionItem {
    pub fn primary_pattern(&self) -> Option<&str> {
        self.pattern_tags.first().map(String::as_str)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum PhaseType {
    WarmUp,
    Focus,
    CoolDown,
    Review,
    Challenge,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ComboRules {
    pub base: u32,
    pub bonus_per_streak: u32,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CheckpointStatus {
    pub reached: bool,
    #[serde(default)]
    pub accuracy: Option<f64>,
    #[serde(default)]
    pub combos_max: Option<u32>,
    #[serde(default)]
    pub completed_at: Option<DateTime<Utc>>,
}

/// A stretch of the session (warm-up, focus, cool-down) closed by a checkpoint.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SessionPhase {
    pub phase_id: String,
    pub label: String,
    pub phase_type: PhaseType,
    pub order: u32,
    pub target_sentences: u32,
    pub target_duration_seconds: u32,
    pub item_ids: Vec<String>,
    pub combo_rules: ComboRules,
    #[serde(default)]
    pub checkpoint_status: Option<CheckpointStatus>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PatternImpact {
    pub pattern_id: String,
    pub delta_conquest_rate: f64,
    pub exposures: u32,
    #[serde(default)]
    pub severity_before: Option<u8>,
    #[serde(default)]
    pub severity_after: Option<u8>,
    #[serde(default)]
    pub hint_rate_before: Option<f64>,
    #[serde(default)]
    pub hint_rate_after: Option<f64>,
}

/// Session-level aggregate produced once when a session finishes.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SessionSummary {
    pub accuracy: f64,
    pub total_items: u32,
    pub correct: u32,
    pub incorrect: u32,
    pub hints_used: u32,
    pub combo_max: u32,
    pub brain_tokens_earned: i64,
    pub duration_seconds: u64,
    pub pattern_impact: Vec<PatternImpact>,
    pub hint_rate: f64,
    pub first_try_rate: f64,
    pub completed_at: DateTime<Utc>,
    pub brain_burst_applied: bool,
    #[serde(default)]
    pub brain_burst_multiplier: Option<f64>,
    #[serde(default)]
    pub brain_burst_eligible_at: Option<DateTime<Utc>>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Session {
    pub session_id: String,
    pub user_id: String,
    pub mode: SessionMode,
    pub status: SessionStatus,
    pub entry_point: String,
    pub started_at: DateTime<Utc>,
    pub expires_at: DateTime<Utc>,
    #[serde(default)]
    pub phases: Vec<SessionPhase>,
    pub items: Vec<SessionItem>,
    #[serde(default)]
    pub brain_burst: Option<BrainBurstState>,
    #[serde(default)]
    pub summary: Option<SessionSummary>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct CreateSessionRequest {
    pub mode: SessionMode,

    #[validate(length(min = 1, max = 64, message = "entryPoint is required"))]
    pub entry_point: String,

    #[validate(length(max = 12, message = "patternFocus accepts at most 12 patterns"))]
    pub pattern_focus: Option<Vec<String>>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FinishStatus {
    Completed,
    Abandoned,
}

impl From<FinishStatus> for SessionStatus {
    fn from(status: FinishStatus) -> Self {
        match status {
            FinishStatus::Completed => SessionStatus::Completed,
            FinishStatus::Abandoned => SessionStatus::Abandoned,
        }
    }
}

#[derive(Debug, Deserialize, Validate)]
pub struct FinishSessionRequest {
    pub status: FinishStatus,
}

/// Progress report sent when the learner reaches the end of a phase.
#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct Checkpoint {
    #[validate(length(min = 1, max = 128, message = "checkpointId is required"))]
    pub checkpoint_id: String,

    #[validate(length(min = 1, max = 64, message = "phaseId is required"))]
    pub phase_id: String,

    pub reached_at: DateTime<Utc>,

    #[validate(range(min = 0.0, max = 1.0, message = "accuracy must be between 0 and 1"))]
    pub accuracy: f64,

    pub combo_max: u32,
    pub hints_used: u32,
    pub duration_seconds: u64,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub brain_tokens_earned: Option<i64>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub freeze_consumed: Option<bool>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CheckpointRecord {
    #[serde(flatten)]
    pub checkpoint: Checkpoint,
    pub session_id: String,
    pub user_id: String,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Deserialize)]
pub struct ListSessionsQuery {
    pub limit: Option<u32>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SessionListResponse {
    pub sessions: Vec<Session>,
    pub next_cursor: Option<String>,
}

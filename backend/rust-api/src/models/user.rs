use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use validator::{Validate, ValidationError};

use super::level_test::LevelTestResult;
use super::pattern::PatternTrend;

pub const DEFAULT_LEVEL: u8 = 1;
pub const DEFAULT_DISPLAY_NAME: &str = "Learner";
pub const DEFAULT_DAILY_GOAL_SENTENCES: u32 = 12;
pub const DEFAULT_DAILY_GOAL_MINUTES: u32 = 12;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SubscriptionStatus {
    #[default]
    Free,
    Trial,
    Premium,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EffectMode {
    #[default]
    Full,
    Reduced,
    Minimal,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UserPreferences {
    pub haptics_enabled: bool,
    pub sound_enabled: bool,
    pub push_opt_in: bool,
    pub effect_mode: EffectMode,
    pub daily_goal_sentences: u32,
    pub daily_goal_minutes: u32,
}

impl Default for UserPreferences {
    fn default() -> Self {
        Self {
            haptics_enabled: true,
            sound_enabled: true,
            push_opt_in: false,
            effect_mode: EffectMode::Full,
            daily_goal_sentences: DEFAULT_DAILY_GOAL_SENTENCES,
            daily_goal_minutes: DEFAULT_DAILY_GOAL_MINUTES,
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BrainBurstStatus {
    pub eligible_at: Option<DateTime<Utc>>,
    pub multiplier: Option<f64>,
    pub active: bool,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct UserStats {
    pub current_streak: u32,
    pub longest_streak: u32,
    pub brain_tokens: u32,
    pub streak_freezes_available: u32,
    pub pattern_conquest_count: u32,
    pub sessions_completed_this_week: u32,
    pub last_session_at: Option<DateTime<Utc>>,
    pub subscription_status: SubscriptionStatus,
    pub brain_burst: BrainBurstStatus,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct UserFlags {
    pub level_test_completed: bool,
    pub tutorial_completed: bool,
    pub personalization_ready: bool,
}

/// Derived learner snapshot. Only the progression transitions in
/// `engine::progression` produce new values of this type.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UserProgressionState {
    /// IANA zone name; streak and weekly boundaries are local midnights here.
    pub timezone: String,
    pub provisional_level: u8,
    #[serde(default)]
    pub stats: UserStats,
    #[serde(default)]
    pub flags: UserFlags,
    #[serde(default)]
    pub last_level_test: Option<LevelTestResult>,
}

impl UserProgressionState {
    pub fn new(timezone: impl Into<String>) -> Self {
        Self {
            timezone: timezone.into(),
            provisional_level: DEFAULT_LEVEL,
            stats: UserStats::default(),
            flags: UserFlags::default(),
            last_level_test: None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UserProfile {
    pub user_id: String,
    pub display_name: String,
    pub email: String,
    pub level: u8,
    pub locale: String,
    #[serde(default)]
    pub preferences: UserPreferences,
    #[serde(flatten)]
    pub progression: UserProgressionState,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Identity facts available when a profile is first created.
#[derive(Debug, Clone, Default)]
pub struct ProfileSeed {
    pub user_id: String,
    pub email: Option<String>,
    pub display_name: Option<String>,
    pub locale: Option<String>,
    pub timezone: Option<String>,
}

impl UserProfile {
    pub fn new_default(
        seed: &ProfileSeed,
        default_locale: &str,
        default_timezone: &str,
        now: DateTime<Utc>,
    ) -> Self {
        Self {
            user_id: seed.user_id.clone(),
            display_name: derive_display_name(seed.display_name.as_deref(), seed.email.as_deref()),
            email: seed.email.clone().unwrap_or_default(),
            level: DEFAULT_LEVEL,
            locale: seed
                .locale
                .clone()
                .unwrap_or_else(|| default_locale.to_string()),
            preferences: UserPreferences::default(),
            progression: UserProgressionState::new(
                seed.timezone
                    .clone()
                    .unwrap_or_else(|| default_timezone.to_string()),
            ),
            created_at: now,
            updated_at: now,
        }
    }
}

/// Explicit display name, else the email local part, else "Learner".
pub fn derive_display_name(display_name: Option<&str>, email: Option<&str>) -> String {
    if let Some(name) = display_name.map(str::trim).filter(|n| !n.is_empty()) {
        return name.to_string();
    }
    if let Some(local) = email
        .and_then(|e| e.split_once('@'))
        .map(|(local, _)| local.trim())
        .filter(|l| !l.is_empty())
    {
        return local.to_string();
    }
    DEFAULT_DISPLAY_NAME.to_string()
}

#[derive(Debug, Default, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct PreferencesPatch {
    pub haptics_enabled: Option<bool>,
    pub sound_enabled: Option<bool>,
    pub push_opt_in: Option<bool>,
    pub effect_mode: Option<EffectMode>,
    #[validate(range(min = 1, max = 60, message = "dailyGoalSentences must be 1-60"))]
    pub daily_goal_sentences: Option<u32>,
    #[validate(range(min = 1, max = 120, message = "dailyGoalMinutes must be 1-120"))]
    pub daily_goal_minutes: Option<u32>,
}

#[derive(Debug, Default, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct UpdateProfileRequest {
    #[validate(length(min = 1, max = 100, message = "displayName must be 1-100 characters"))]
    pub display_name: Option<String>,

    #[validate(length(min = 2, max = 35, message = "locale must be a BCP-47 tag"))]
    pub locale: Option<String>,

    #[validate(custom(function = "validate_timezone"))]
    pub timezone: Option<String>,

    #[validate(nested)]
    pub preferences: Option<PreferencesPatch>,
}

fn validate_timezone(value: &str) -> Result<(), ValidationError> {
    if value.parse::<chrono_tz::Tz>().is_err() {
        let mut err = ValidationError::new("timezone");
        err.message = Some(format!("Unknown timezone: {}", value).into());
        return Err(err);
    }
    Ok(())
}

#[derive(Debug, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct TutorialCompletionRequest {
    #[validate(custom(function = "validate_tutorial_id"))]
    pub tutorial_id: String,
    pub completed_at: DateTime<Utc>,
}

fn validate_tutorial_id(value: &str) -> Result<(), ValidationError> {
    if value.trim().is_empty() {
        let mut err = ValidationError::new("tutorial_id");
        err.message = Some("tutorialId is required".into());
        return Err(err);
    }
    Ok(())
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TutorialCompletionResponse {
    pub tutorial_id: String,
    pub streak_eligible: bool,
    pub personalization_unlocked: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum DailyGoalTier {
    Basic,
    Intensive,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "kebab-case")]
pub enum HomeActionType {
    DailySession,
    Review,
    BrainBurst,
    Widget,
    Tutorial,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum PlanRequirement {
    Free,
    Pro,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct HomeAction {
    #[serde(rename = "type")]
    pub action_type: HomeActionType,
    pub title: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub subtitle: Option<String>,
    pub deeplink: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub plan_required: Option<PlanRequirement>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PatternCard {
    pub pattern_id: String,
    pub label: String,
    pub conquest_rate: f64,
    pub trend: PatternTrend,
    pub severity: u8,
    pub recommended_action: HomeAction,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DailyGoal {
    pub sentences: u32,
    pub minutes: u32,
    pub tier: DailyGoalTier,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct WeeklyProgress {
    pub sentences_completed: u32,
    pub minutes_spent: u32,
    pub last_session_at: Option<DateTime<Utc>>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct StreakCard {
    pub current: u32,
    pub longest: u32,
    pub freeze_eligible: bool,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct BrainTokenCard {
    pub available: u32,
    pub pending: u32,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct LiveActivityInfo {
    pub supported: bool,
    pub active: bool,
    pub activity_id: Option<String>,
    pub last_updated_at: Option<DateTime<Utc>>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct HomeSummary {
    pub daily_goal: DailyGoal,
    pub progress: WeeklyProgress,
    pub streak: StreakCard,
    pub brain_tokens: BrainTokenCard,
    pub pattern_cards: Vec<PatternCard>,
    pub recommended_actions: Vec<HomeAction>,
    pub live_activity: LiveActivityInfo,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct WidgetSnapshot {
    pub updated_at: DateTime<Utc>,
    pub sentences_remaining: u32,
    pub daily_goal_tier: DailyGoalTier,
    pub current_streak: u32,
    pub brain_tokens: u32,
    pub next_brain_token_in_days: Option<i64>,
    pub deeplink: String,
}

use std::sync::Arc;

use anyhow::{Context, Result};
use chrono::{DateTime, Utc};

use super::repository::UserRepository;
use super::UserLocks;
use crate::engine::{aggregate_pattern_conquests, apply_tutorial_completion};
use crate::middlewares::auth::JwtClaims;
use crate::models::pattern::PatternTrend;
use crate::models::user::{
    BrainTokenCard, DailyGoal, DailyGoalTier, HomeAction, HomeActionType, HomeSummary,
    LiveActivityInfo, PatternCard, PlanRequirement, StreakCard, SubscriptionStatus,
    TutorialCompletionRequest, TutorialCompletionResponse, UpdateProfileRequest, WeeklyProgress,
    WidgetSnapshot,
};
use crate::models::{PatternConquestState, UserProfile};
use crate::utils::time::days_until;

const MAX_PATTERN_CARDS: usize = 3;
const BRAIN_TOKEN_TARGET: u32 = 3;
const INTENSIVE_GOAL_MINUTES: u32 = 12;
const DEFAULT_BURST_MULTIPLIER: f64 = 2.0;

pub struct UserService {
    users: Arc<dyn UserRepository>,
    locks: Arc<UserLocks>,
    default_locale: String,
    default_timezone: String,
}

impl UserService {
    pub fn new(
        users: Arc<dyn UserRepository>,
        locks: Arc<UserLocks>,
        default_locale: String,
        default_timezone: String,
    ) -> Self {
        Self {
            users,
            locks,
            default_locale,
            default_timezone,
        }
    }

    /// Load the learner's profile, creating the default one on first contact.
    pub async fn ensure_profile(&self, claims: &JwtClaims) -> Result<UserProfile> {
        if let Some(profile) = self.users.find_profile(&claims.sub).await? {
            return Ok(profile);
        }

        let candidate = UserProfile::new_default(
            &claims.profile_seed(),
            &self.default_locale,
            &self.default_timezone,
            Utc::now(),
        );
        let stored = self
            .users
            .insert_profile_if_absent(&candidate)
            .await
            .context("Failed to create default profile")?;

        if stored == candidate {
            tracing::info!(user_id = %stored.user_id, "Created default learner profile");
        }
        Ok(stored)
    }

    pub async fn update_profile(
        &self,
        claims: &JwtClaims,
        req: UpdateProfileRequest,
    ) -> Result<UserProfile> {
        let _guard = self.locks.acquire(&claims.sub).await;
        let mut profile = self.ensure_profile(claims).await?;

        if let Some(display_name) = req.display_name {
            profile.display_name = display_name.trim().to_string();
        }
        if let Some(locale) = req.locale {
            profile.locale = locale;
        }
        if let Some(timezone) = req.timezone {
            profile.progression.timezone = timezone;
        }
        if let Some(patch) = req.preferences {
            let prefs = &mut profile.preferences;
            if let Some(v) = patch.haptics_enabled {
                prefs.haptics_enabled = v;
            }
            if let Some(v) = patch.sound_enabled {
                prefs.sound_enabled = v;
            }
            if let Some(v) = patch.push_opt_in {
                prefs.push_opt_in = v;
            }
            if let Some(v) = patch.effect_mode {
                prefs.effect_mode = v;
            }
            if let Some(v) = patch.daily_goal_sentences {
                prefs.daily_goal_sentences = v;
            }
            if let Some(v) = patch.daily_goal_minutes {
                prefs.daily_goal_minutes = v;
            }
        }
        profile.updated_at = Utc::now();

        self.users
            .save_profile(&profile)
            .await
            .context("Failed to update profile")?;
        Ok(profile)
    }

    pub async fn pattern_conquests(&self, user_id: &str) -> Result<Vec<PatternConquestState>> {
        let records = self.users.list_pattern_impacts(user_id).await?;
        Ok(aggregate_pattern_conquests(&records))
    }

    pub async fn home_summary(&self, claims: &JwtClaims) -> Result<HomeSummary> {
        let profile = self.ensure_profile(claims).await?;
        let conquests = self.pattern_conquests(&claims.sub).await?;
        Ok(build_home_summary(&profile, &conquests))
    }

    pub async fn widget_snapshot(
        &self,
        claims: &JwtClaims,
        now: DateTime<Utc>,
    ) -> Result<WidgetSnapshot> {
        let profile = self.ensure_profile(claims).await?;
        Ok(build_widget_snapshot(&profile, now))
    }

    pub async fn complete_tutorial(
        &self,
        claims: &JwtClaims,
        req: TutorialCompletionRequest,
    ) -> Result<TutorialCompletionResponse> {
        let _guard = self.locks.acquire(&claims.sub).await;
        let mut profile = self.ensure_profile(claims).await?;

        profile.progression = apply_tutorial_completion(&profile.progression);
        profile.updated_at = Utc::now();
        self.users
            .save_profile(&profile)
            .await
            .context("Failed to record tutorial completion")?;

        tracing::info!(
            user_id = %claims.sub,
            tutorial_id = %req.tutorial_id,
            completed_at = %req.completed_at,
            "Tutorial completed"
        );

        Ok(TutorialCompletionResponse {
            tutorial_id: req.tutorial_id,
            streak_eligible: true,
            personalization_unlocked: profile.progression.flags.personalization_ready,
        })
    }
}

fn goal_tier(minutes: u32) -> DailyGoalTier {
    if minutes > INTENSIVE_GOAL_MINUTES {
        DailyGoalTier::Intensive
    } else {
        DailyGoalTier::Basic
    }
}

/// Home screen payload for a learner. `conquests` is the aggregated pattern
/// state; the weakest patterns become cards.
pub fn build_home_summary(profile: &UserProfile, conquests: &[PatternConquestState]) -> HomeSummary {
    let prefs = &profile.preferences;
    let stats = &profile.progression.stats;
    let sessions = stats.sessions_completed_this_week;

    let pattern_cards = build_pattern_cards(conquests);
    let recommended_actions = build_recommended_actions(profile, &pattern_cards);

    HomeSummary {
        daily_goal: DailyGoal {
            sentences: prefs.daily_goal_sentences,
            minutes: prefs.daily_goal_minutes,
            tier: goal_tier(prefs.daily_goal_minutes),
        },
        progress: WeeklyProgress {
            sentences_completed: sessions.saturating_mul(prefs.daily_goal_sentences),
            minutes_spent: sessions.saturating_mul(prefs.daily_goal_minutes),
            last_session_at: stats.last_session_at,
        },
        streak: StreakCard {
            current: stats.current_streak,
            longest: stats.longest_streak,
            freeze_eligible: stats.streak_freezes_available > 0,
        },
        brain_tokens: BrainTokenCard {
            available: stats.brain_tokens,
            pending: BRAIN_TOKEN_TARGET.saturating_sub(stats.brain_tokens),
        },
        pattern_cards,
        recommended_actions,
        live_activity: LiveActivityInfo {
            supported: true,
            active: stats.brain_burst.active,
            activity_id: stats.brain_burst.active.then(|| "pending".to_string()),
            last_updated_at: stats.last_session_at,
        },
    }
}

fn build_pattern_cards(conquests: &[PatternConquestState]) -> Vec<PatternCard> {
    let mut weakest: Vec<&PatternConquestState> = conquests.iter().collect();
    weakest.sort_by(|a, b| {
        b.severity
            .cmp(&a.severity)
            .then(a.conquest_rate.total_cmp(&b.conquest_rate))
    });

    weakest
        .into_iter()
        .take(MAX_PATTERN_CARDS)
        .map(|state| PatternCard {
            pattern_id: state.pattern_id.clone(),
            label: state.label.clone(),
            conquest_rate: state.conquest_rate,
            trend: state.trend,
            severity: state.severity,
            recommended_action: HomeAction {
                action_type: HomeActionType::Review,
                title: format!("{} 집중 복습", state.label),
                subtitle: (state.trend == PatternTrend::Declining)
                    .then(|| "최근 정확도가 하락 중입니다.".to_string()),
                deeplink: format!("englishbrain://review/{}", state.pattern_id),
                plan_required: None,
            },
        })
        .collect()
}

fn build_recommended_actions(profile: &UserProfile, cards: &[PatternCard]) -> Vec<HomeAction> {
    let stats = &profile.progression.stats;
    let mut actions = vec![HomeAction {
        action_type: HomeActionType::DailySession,
        title: "오늘의 12문장 세션 시작".to_string(),
        subtitle: Some(format!("현재 스트릭 {}일", stats.current_streak)),
        deeplink: "englishbrain://session/warmup".to_string(),
        plan_required: None,
    }];

    if let Some(card) = cards.iter().find(|card| card.trend == PatternTrend::Declining) {
        actions.push(HomeAction {
            action_type: HomeActionType::Review,
            title: format!("{} 패턴 복습", card.label),
            subtitle: Some("정복률을 회복해보세요".to_string()),
            deeplink: format!("englishbrain://review/{}", card.pattern_id),
            plan_required: (stats.subscription_status == SubscriptionStatus::Free)
                .then_some(PlanRequirement::Pro),
        });
    }

    if stats.brain_burst.active {
        let multiplier = stats
            .brain_burst
            .multiplier
            .unwrap_or(DEFAULT_BURST_MULTIPLIER);
        actions.push(HomeAction {
            action_type: HomeActionType::BrainBurst,
            title: "Brain Burst 보너스 활성화 중!".to_string(),
            subtitle: Some(format!("보너스 배수 x{}", multiplier)),
            deeplink: "englishbrain://session/brainburst".to_string(),
            plan_required: None,
        });
    }

    actions
}

pub fn build_widget_snapshot(profile: &UserProfile, now: DateTime<Utc>) -> WidgetSnapshot {
    let prefs = &profile.preferences;
    let stats = &profile.progression.stats;
    let sentences_completed = stats
        .sessions_completed_this_week
        .saturating_mul(prefs.daily_goal_sentences);

    WidgetSnapshot {
        updated_at: now,
        sentences_remaining: prefs.daily_goal_sentences.saturating_sub(sentences_completed),
        daily_goal_tier: goal_tier(prefs.daily_goal_minutes),
        current_streak: stats.current_streak,
        brain_tokens: stats.brain_tokens,
        next_brain_token_in_days: stats
            .brain_burst
            .eligible_at
            .map(|eligible_at| days_until(eligible_at, now)),
        deeplink: "englishbrain://session".to_string(),
    }
}

//! Learner progression transitions.
//!
//! Each function maps a prior snapshot and one event to the next snapshot.
//! Callers serialise transitions per learner; nothing here locks.

use super::calendar::{day_difference, resolve_timezone, week_start_key};
use crate::models::{LevelTestResult, SessionSummary, UserProgressionState};

fn next_streak(current: u32, day_diff: Option<i64>) -> u32 {
    match day_diff {
        None => 1,
        Some(0) => current.max(1),
        Some(1) => current.saturating_add(1),
        Some(diff) if diff > 1 => 1,
        // Completion on an earlier local date than the last one: out of order.
        Some(_) => current,
    }
}

pub fn apply_session_completion(
    prior: &UserProgressionState,
    summary: &SessionSummary,
) -> UserProgressionState {
    let tz = resolve_timezone(&prior.timezone);
    let completed_at = summary.completed_at;
    let last_session_at = prior.stats.last_session_at;

    let day_diff = last_session_at.map(|last| day_difference(last, completed_at, tz));
    let current_streak = next_streak(prior.stats.current_streak, day_diff);

    let same_week = last_session_at
        .map(|last| week_start_key(last, tz) == week_start_key(completed_at, tz))
        .unwrap_or(false);
    let sessions_completed_this_week = if same_week {
        prior.stats.sessions_completed_this_week.saturating_add(1)
    } else {
        1
    };

    let earned = u32::try_from(summary.brain_tokens_earned.max(0)).unwrap_or(u32::MAX);
    let impact_count = u32::try_from(summary.pattern_impact.len()).unwrap_or(u32::MAX);

    tracing::debug!(
        ?day_diff,
        previous_streak = prior.stats.current_streak,
        current_streak,
        sessions_completed_this_week,
        "session completion applied"
    );

    let mut next = prior.clone();
    let stats = &mut next.stats;
    stats.current_streak = current_streak;
    stats.longest_streak = prior.stats.longest_streak.max(current_streak);
    stats.sessions_completed_this_week = sessions_completed_this_week;
    stats.brain_tokens = prior.stats.brain_tokens.saturating_add(earned);
    stats.last_session_at = Some(completed_at);
    stats.pattern_conquest_count = prior.stats.pattern_conquest_count.max(impact_count);
    stats.brain_burst.active = summary.brain_burst_applied;
    stats.brain_burst.multiplier = summary
        .brain_burst_multiplier
        .or(prior.stats.brain_burst.multiplier);
    stats.brain_burst.eligible_at = summary
        .brain_burst_eligible_at
        .or(prior.stats.brain_burst.eligible_at);

    next.flags.personalization_ready =
        prior.flags.personalization_ready || !summary.pattern_impact.is_empty();

    next
}

pub fn apply_level_test_result(
    prior: &UserProgressionState,
    result: &LevelTestResult,
) -> UserProgressionState {
    let mut next = prior.clone();
    next.provisional_level = result.recommended_level;
    next.flags.level_test_completed = true;
    next.last_level_test = Some(result.clone());
    next
}

pub fn apply_tutorial_completion(prior: &UserProgressionState) -> UserProgressionState {
    let mut next = prior.clone();
    next.flags.tutorial_completed = true;
    next.flags.personalization_ready = true;
    next
}

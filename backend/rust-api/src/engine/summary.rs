use chrono::{DateTime, Utc};

use super::scoring::base_accuracy;
use crate::models::session::PatternImpact;
use crate::models::{Attempt, Session, SessionSummary};

/// Number of roster items that contribute a pattern-impact entry.
const PATTERN_IMPACT_ITEMS: usize = 3;

/// Fold a session's attempts into its summary. Never fails: an empty attempt
/// list yields zero rates, and a session without items has zero accuracy.
pub fn summarize_session(
    session: &Session,
    attempts: &[Attempt],
    completed_at: DateTime<Utc>,
) -> SessionSummary {
    let total_items = session.items.len() as u32;

    let mut correct = 0u32;
    let mut incorrect = 0u32;
    let mut hints_used = 0u32;
    let mut combo_max = 0u32;
    let mut duration_seconds = 0u64;
    let mut first_try_correct = 0u32;

    for attempt in attempts {
        let accuracy = base_accuracy(attempt.verdict);
        if accuracy >= 1.0 {
            correct += 1;
            if attempt.is_first_try() {
                first_try_correct += 1;
            }
        } else if accuracy <= 0.0 {
            incorrect += 1;
        }
        hints_used = hints_used.saturating_add(attempt.hints_used);
        combo_max = combo_max.max(attempt.combo_count);
        duration_seconds += attempt.time_spent_ms / 1000;
    }

    let denominator = attempts.len().max(1) as f64;
    let accuracy = if total_items > 0 {
        f64::from(correct) / f64::from(total_items)
    } else {
        0.0
    };

    let brain_burst = session.brain_burst.as_ref();

    SessionSummary {
        accuracy,
        total_items,
        correct,
        incorrect,
        hints_used,
        combo_max,
        brain_tokens_earned: 0,
        duration_seconds,
        pattern_impact: placeholder_pattern_impact(session),
        hint_rate: (f64::from(hints_used) / denominator).min(1.0),
        first_try_rate: f64::from(first_try_correct) / denominator,
        completed_at,
        brain_burst_applied: brain_burst.map(|b| b.active).unwrap_or(false),
        brain_burst_multiplier: brain_burst.map(|b| b.multiplier),
        brain_burst_eligible_at: brain_burst.and_then(|b| b.eligible_at),
    }
}

// Fixed deltas until attempt-level pattern instrumentation feeds this list.
// Downstream only checks that it is non-empty.
fn placeholder_pattern_impact(session: &Session) -> Vec<PatternImpact> {
    session
        .items
        .iter()
        .take(PATTERN_IMPACT_ITEMS)
        .enumerate()
        .map(|(index, item)| PatternImpact {
            pattern_id: item
                .primary_pattern()
                .map(str::to_string)
                .unwrap_or_else(|| format!("pattern_{}", index)),
            delta_conquest_rate: 0.05,
            exposures: 1,
            severity_before: Some(3),
            severity_after: Some(2),
            hint_rate_before: Some(0.3),
            hint_rate_after: Some(0.2),
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::engine::test_support::{attempt, session_with_patterns, ts};
    use crate::models::session::BrainBurstState;
    use crate::models::Verdict;

    #[test]
    fn zero_attempts_yield_zero_rates() {
        let session = session_with_patterns(&["time-adverb", "article"]);
        let summary = summarize_session(&session, &[], ts("2024-01-01T10:00:00Z"));

        assert_eq!(summary.total_items, 2);
        assert_eq!(summary.accuracy, 0.0);
        assert_eq!(summary.hint_rate, 0.0);
        assert_eq!(summary.first_try_rate, 0.0);
        assert_eq!(summary.combo_max, 0);
        assert_eq!(summary.duration_seconds, 0);
        assert_eq!(summary.correct + summary.incorrect, 0);
    }

    #[test]
    fn session_without_items_has_zero_accuracy() {
        let session = session_with_patterns(&[]);
        let attempts = vec![attempt("x", Verdict::Correct)];
        let summary = summarize_session(&session, &attempts, ts("2024-01-01T10:00:00Z"));

        assert_eq!(summary.accuracy, 0.0);
        assert_eq!(summary.correct, 1);
        assert!(summary.pattern_impact.is_empty());
    }

    #[test]
    fn folds_attempts_into_counts_and_rates() {
        let session = session_with_patterns(&["time-adverb", "article", "tense", "clause"]);

        let mut first = attempt("item_1", Verdict::Correct);
        first.hints_used = 1;
        first.combo_count = 2;
        first.time_spent_ms = 2_999;

        let mut retried = attempt("item_2", Verdict::Correct);
        retried.retry_number = Some(1);
        retried.combo_count = 5;
        retried.time_spent_ms = 4_100;

        let mut fixed = attempt("item_3", Verdict::Corrected);
        fixed.hints_used = 2;
        fixed.time_spent_ms = 999;

        let wrong = attempt("item_4", Verdict::Incorrect);

        let attempts = vec![first, retried, fixed, wrong];
        let summary = summarize_session(&session, &attempts, ts("2024-01-01T10:00:00Z"));

        assert_eq!(summary.correct, 2);
        assert_eq!(summary.incorrect, 1);
        assert!(summary.correct + summary.incorrect <= attempts.len() as u32);
        assert!((summary.accuracy - 0.5).abs() < 1e-9);
        assert_eq!(summary.hints_used, 3);
        assert_eq!(summary.combo_max, 5);
        // 2 + 4 + 0 + 1 (attempt() defaults to 1500ms)
        assert_eq!(summary.duration_seconds, 2 + 4 + 0 + 1);
        assert!((summary.hint_rate - 0.75).abs() < 1e-9);
        assert!((summary.first_try_rate - 0.25).abs() < 1e-9);
    }

    #[test]
    fn pattern_impact_covers_first_three_items() {
        let mut session = session_with_patterns(&["time-adverb", "article", "tense", "clause"]);
        session.items[1].pattern_tags.clear();

        let summary = summarize_session(&session, &[], ts("2024-01-01T10:00:00Z"));
        let ids: Vec<_> = summary
            .pattern_impact
            .iter()
            .map(|p| p.pattern_id.as_str())
            .collect();

        assert_eq!(ids, vec!["time-adverb", "pattern_1", "tense"]);
        assert!(summary
            .pattern_impact
            .iter()
            .all(|p| p.delta_conquest_rate == 0.05 && p.exposures == 1));
    }

    #[test]
    fn hint_rate_is_capped_at_one() {
        let session = session_with_patterns(&["article"]);
        let mut heavy = attempt("item_1", Verdict::Incorrect);
        heavy.hints_used = 3;
        let summary = summarize_session(&session, &[heavy], ts("2024-01-01T10:00:00Z"));
        assert_eq!(summary.hint_rate, 1.0);
    }

    #[test]
    fn brain_burst_fields_are_copied_from_session() {
        let mut session = session_with_patterns(&["article"]);
        session.brain_burst = Some(BrainBurstState {
            active: true,
            multiplier: 3.0,
            eligible_at: Some(ts("2024-01-02T00:00:00Z")),
            sessions_until_activation: None,
        });

        let summary = summarize_session(&session, &[], ts("2024-01-01T10:00:00Z"));
        assert!(summary.brain_burst_applied);
        assert_eq!(summary.brain_burst_multiplier, Some(3.0));
        assert_eq!(summary.brain_burst_eligible_at, Some(ts("2024-01-02T00:00:00Z")));

        session.brain_burst = None;
        let summary = summarize_session(&session, &[], ts("2024-01-01T10:00:00Z"));
        assert!(!summary.brain_burst_applied);
        assert_eq!(summary.brain_burst_multiplier, None);
    }
}

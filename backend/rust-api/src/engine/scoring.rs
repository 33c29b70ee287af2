use crate::models::{Attempt, AttemptScore, Verdict};

// Component weights for word order, word form and slot position. All three are
// applied to the same base accuracy until per-component grading lands.
const ORDER_WEIGHT: f64 = 0.6;
const FORM_WEIGHT: f64 = 0.25;
const POSITION_WEIGHT: f64 = 0.15;

const HINT_PENALTY: f64 = 0.1;
const COMBO_REWARD: f64 = 0.05;

pub fn base_accuracy(verdict: Verdict) -> f64 {
    match verdict {
        Verdict::Correct => 1.0,
        Verdict::Corrected => 0.7,
        Verdict::Incorrect => 0.0,
    }
}

/// Score a single attempt: weighted accuracy, minus hint penalty, plus combo bonus,
/// floored at zero.
pub fn score_attempt(attempt: &Attempt) -> AttemptScore {
    let accuracy = base_accuracy(attempt.verdict);
    let hint_penalty = f64::from(attempt.hints_used) * HINT_PENALTY;
    let combo_bonus = f64::from(attempt.combo_count) * COMBO_REWARD;
    let weighted = ORDER_WEIGHT * accuracy + FORM_WEIGHT * accuracy + POSITION_WEIGHT * accuracy;

    AttemptScore {
        score: (weighted - hint_penalty + combo_bonus).max(0.0),
        accuracy,
        hint_penalty,
        combo_bonus,
    }
}

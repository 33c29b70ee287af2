use std::collections::HashMap;

use chrono::{DateTime, Utc};

use super::catalog::pattern_label;
use super::scoring::base_accuracy;
use crate::models::{
    Attempt, PatternConquestState, PatternImpactRecord, PatternTrend, Session,
};

const EWMA_LAMBDA: f64 = 0.2;
const IMPROVING_THRESHOLD: f64 = 0.05;
const DECLINING_THRESHOLD: f64 = -0.05;

struct Accumulator {
    pattern_id: String,
    conquest_rate: f64,
    previous_conquest_rate: Option<f64>,
    exposures: u64,
    hint_rate: f64,
    first_try_rate: f64,
    last_practiced_at: DateTime<Utc>,
}

fn ewma(previous: f64, value: f64) -> f64 {
    EWMA_LAMBDA * value + (1.0 - EWMA_LAMBDA) * previous
}

fn record_accuracy(record: &PatternImpactRecord) -> f64 {
    if record.total == 0 {
        0.0
    } else {
        f64::from(record.correct) / f64::from(record.total)
    }
}

pub fn severity_for(conquest_rate: f64) -> u8 {
    ((1.0 - conquest_rate) * 5.0).round().clamp(1.0, 5.0) as u8
}

pub fn classify_trend(delta: f64) -> PatternTrend {
    if delta >= IMPROVING_THRESHOLD {
        PatternTrend::Improving
    } else if delta <= DECLINING_THRESHOLD {
        PatternTrend::Declining
    } else {
        PatternTrend::Stable
    }
}

/// Fold an exposure stream into one conquest state per pattern, in the order
/// patterns first appear after sorting by timestamp.
///
/// Records are sorted by timestamp first; equal timestamps keep their input
/// order, which the result depends on.
pub fn aggregate_pattern_conquests(records: &[PatternImpactRecord]) -> Vec<PatternConquestState> {
    let mut sorted: Vec<&PatternImpactRecord> = records.iter().collect();
    sorted.sort_by_key(|record| record.timestamp);

    let mut index: HashMap<&str, usize> = HashMap::new();
    let mut states: Vec<Accumulator> = Vec::new();

    for record in sorted {
        let accuracy = record_accuracy(record);
        let existing = index.get(record.pattern_id.as_str()).copied();
        match existing {
            Some(position) => {
                let acc = &mut states[position];
                acc.previous_conquest_rate = Some(acc.conquest_rate);
                acc.conquest_rate = ewma(acc.conquest_rate, accuracy);
                acc.hint_rate = ewma(acc.hint_rate, record.hint_rate);
                acc.first_try_rate = ewma(acc.first_try_rate, record.first_try_rate);
                acc.exposures += u64::from(record.total);
                acc.last_practiced_at = record.timestamp;
            }
            None => {
                index.insert(record.pattern_id.as_str(), states.len());
                states.push(Accumulator {
                    pattern_id: record.pattern_id.clone(),
                    conquest_rate: accuracy,
                    previous_conquest_rate: None,
                    exposures: u64::from(record.total),
                    hint_rate: record.hint_rate,
                    first_try_rate: record.first_try_rate,
                    last_practiced_at: record.timestamp,
                });
            }
        }
    }

    states
        .into_iter()
        .map(|acc| {
            let conquest_rate = acc.conquest_rate.clamp(0.0, 1.0);
            let delta = acc
                .previous_conquest_rate
                .map(|previous| conquest_rate - previous)
                .unwrap_or(0.0);

            PatternConquestState {
                label: pattern_label(&acc.pattern_id),
                pattern_id: acc.pattern_id,
                conquest_rate,
                severity: severity_for(conquest_rate),
                exposures: acc.exposures,
                last_practiced_at: acc.last_practiced_at,
                trend: classify_trend(delta),
                hint_rate: acc.hint_rate.clamp(0.0, 1.0),
                first_try_rate: acc.first_try_rate.clamp(0.0, 1.0),
            }
        })
        .collect()
}

#[derive(Default)]
struct Tally {
    correct: u32,
    total: u32,
    hints: u32,
    first_try_correct: u32,
}

/// Group a finished session's attempts by the primary pattern of the item they
/// answered. Attempts on unknown or untagged items are skipped.
pub fn impact_records(
    session: &Session,
    attempts: &[Attempt],
    at: DateTime<Utc>,
) -> Vec<PatternImpactRecord> {
    let patterns: HashMap<&str, &str> = session
        .items
        .iter()
        .filter_map(|item| item.primary_pattern().map(|p| (item.item_id.as_str(), p)))
        .collect();

    let mut order: Vec<&str> = Vec::new();
    let mut tallies: HashMap<&str, Tally> = HashMap::new();

    for attempt in attempts {
        let Some(&pattern_id) = patterns.get(attempt.item_id.as_str()) else {
            continue;
        };
        let tally = tallies.entry(pattern_id).or_insert_with(|| {
            order.push(pattern_id);
            Tally::default()
        });
        tally.total += 1;
        tally.hints = tally.hints.saturating_add(attempt.hints_used);
        if base_accuracy(attempt.verdict) >= 1.0 {
            tally.correct += 1;
            if attempt.is_first_try() {
                tally.first_try_correct += 1;
            }
        }
    }

    order
        .into_iter()
        .filter_map(|pattern_id| {
            let tally = tallies.get(pattern_id)?;
            let total = f64::from(tally.total.max(1));
            Some(PatternImpactRecord {
                pattern_id: pattern_id.to_string(),
                correct: tally.correct,
                total: tally.total,
                hint_rate: (f64::from(tally.hints) / total).min(1.0),
                first_try_rate: f64::from(tally.first_try_correct) / total,
                timestamp: at,
            })
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::engine::test_support::{attempt, session_with_patterns, ts};
    use crate::models::Verdict;
    use chrono::Duration;

    fn record(pattern: &str, correct: u32, total: u32, at: DateTime<Utc>) -> PatternImpactRecord {
        PatternImpactRecord {
            pattern_id: pattern.to_string(),
            correct,
            total,
            hint_rate: 0.2,
            first_try_rate: 0.5,
            timestamp: at,
        }
    }

    fn two_step(first: (u32, u32), second: (u32, u32)) -> PatternConquestState {
        let t0 = ts("2024-01-01T00:00:00Z");
        let records = vec![
            record("article", first.0, first.1, t0),
            record("article", second.0, second.1, t0 + Duration::days(1)),
        ];
        aggregate_pattern_conquests(&records).remove(0)
    }

    #[test]
    fn repeated_record_converges_to_its_accuracy() {
        let t0 = ts("2024-01-01T00:00:00Z");
        let records: Vec<_> = (0..50)
            .map(|i| record("tense", 9, 10, t0 + Duration::hours(i)))
            .collect();

        let states = aggregate_pattern_conquests(&records);
        assert_eq!(states.len(), 1);
        assert!((states[0].conquest_rate - 0.9).abs() < 0.01);
        assert_eq!(states[0].exposures, 500);
        assert_eq!(states[0].trend, PatternTrend::Stable);
    }

    #[test]
    fn trend_classification() {
        let improving = two_step((5, 10), (19, 20));
        assert_eq!(improving.trend, PatternTrend::Improving);
        assert!((improving.conquest_rate - 0.59).abs() < 1e-9);

        assert_eq!(two_step((9, 10), (3, 10)).trend, PatternTrend::Declining);
        assert_eq!(two_step((80, 100), (81, 100)).trend, PatternTrend::Stable);
    }

    #[test]
    fn single_record_is_stable_with_seeded_rates() {
        let states = aggregate_pattern_conquests(&[record(
            "preposition",
            4,
            10,
            ts("2024-01-01T00:00:00Z"),
        )]);
        let state = &states[0];
        assert_eq!(state.trend, PatternTrend::Stable);
        assert!((state.conquest_rate - 0.4).abs() < 1e-9);
        assert_eq!(state.severity, 3);
        assert_eq!(state.hint_rate, 0.2);
        assert_eq!(state.label, "전치사");
    }

    #[test]
    fn zero_total_counts_as_zero_accuracy() {
        let states =
            aggregate_pattern_conquests(&[record("clause", 0, 0, ts("2024-01-01T00:00:00Z"))]);
        assert_eq!(states[0].conquest_rate, 0.0);
        assert_eq!(states[0].severity, 5);
        assert_eq!(states[0].exposures, 0);
    }

    #[test]
    fn input_is_sorted_by_timestamp() {
        let t0 = ts("2024-01-01T00:00:00Z");
        let ordered = vec![
            record("article", 10, 10, t0),
            record("article", 0, 10, t0 + Duration::days(1)),
        ];
        let reversed: Vec<_> = ordered.iter().rev().cloned().collect();

        let a = aggregate_pattern_conquests(&ordered);
        let b = aggregate_pattern_conquests(&reversed);
        assert_eq!(a, b);
        assert_eq!(a[0].trend, PatternTrend::Declining);
        assert_eq!(a[0].last_practiced_at, t0 + Duration::days(1));
    }

    #[test]
    fn equal_timestamps_keep_input_order() {
        let t0 = ts("2024-01-01T00:00:00Z");
        let up = aggregate_pattern_conquests(&[record("tense", 0, 10, t0), record("tense", 10, 10, t0)]);
        let down =
            aggregate_pattern_conquests(&[record("tense", 10, 10, t0), record("tense", 0, 10, t0)]);
        assert_eq!(up[0].trend, PatternTrend::Improving);
        assert_eq!(down[0].trend, PatternTrend::Declining);
    }

    #[test]
    fn unknown_pattern_keeps_its_id_as_label() {
        let states =
            aggregate_pattern_conquests(&[record("idiom", 1, 2, ts("2024-01-01T00:00:00Z"))]);
        assert_eq!(states[0].label, "idiom");
    }

    #[test]
    fn severity_bounds() {
        assert_eq!(severity_for(1.0), 1);
        assert_eq!(severity_for(0.0), 5);
        assert_eq!(severity_for(0.5), 3);
        assert_eq!(severity_for(0.95), 1);
    }

    #[test]
    fn impact_records_group_by_primary_pattern() {
        let session = session_with_patterns(&["article", "tense", "article"]);
        let mut hinted = attempt("item_1", Verdict::Correct);
        hinted.hints_used = 1;
        let mut retried = attempt("item_3", Verdict::Correct);
        retried.retry_number = Some(2);
        let attempts = vec![
            hinted,
            attempt("item_2", Verdict::Incorrect),
            retried,
            attempt("ghost", Verdict::Correct),
        ];

        let at = ts("2024-01-02T00:00:00Z");
        let records = impact_records(&session, &attempts, at);
        assert_eq!(records.len(), 2);

        assert_eq!(records[0].pattern_id, "article");
        assert_eq!(records[0].correct, 2);
        assert_eq!(records[0].total, 2);
        assert!((records[0].hint_rate - 0.5).abs() < 1e-9);
        assert!((records[0].first_try_rate - 0.5).abs() < 1e-9);
        assert_eq!(records[0].timestamp, at);

        assert_eq!(records[1].pattern_id, "tense");
        assert_eq!(records[1].correct, 0);
        assert_eq!(records[1].total, 1);
    }
}

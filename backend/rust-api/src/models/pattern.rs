use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum PatternFocus {
    TimeAdverb,
    FrequencyAdverb,
    Article,
    Preposition,
    Auxiliary,
    Tense,
    Clause,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PatternDefinition {
    pub pattern_id: &'static str,
    pub label: &'static str,
    pub description: &'static str,
    pub focus: PatternFocus,
    pub example: &'static str,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PatternTrend {
    Improving,
    Stable,
    Declining,
}

/// Per-pattern practice outcome, appended once per completed session.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PatternImpactRecord {
    pub pattern_id: String,
    pub correct: u32,
    pub total: u32,
    pub hint_rate: f64,
    pub first_try_rate: f64,
    pub timestamp: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PatternConquestState {
    pub pattern_id: String,
    pub label: String,
    pub conquest_rate: f64,
    pub severity: u8,
    pub exposures: u64,
    pub last_practiced_at: DateTime<Utc>,
    pub trend: PatternTrend,
    pub hint_rate: f64,
    pub first_try_rate: f64,
}

#[derive(Debug, Serialize)]
pub struct PatternCatalogResponse {
    pub patterns: &'static [PatternDefinition],
}

#[derive(Debug, Serialize)]
pub struct PatternConquestResponse {
    pub patterns: Vec<PatternConquestState>,
}

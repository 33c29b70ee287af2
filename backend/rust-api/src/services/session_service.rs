use std::sync::Arc;

use anyhow::{Context, Result};
use chrono::{Duration, Utc};

use super::repository::{SessionRepository, UserRepository};
use super::user_service::UserService;
use super::UserLocks;
use crate::engine::catalog::DEFAULT_PATTERN_ID;
use crate::engine::{apply_session_completion, impact_records, score_attempt, summarize_session};
use crate::error::ApiError;
use crate::metrics::{ATTEMPTS_SCORED_TOTAL, SESSIONS_FINISHED_TOTAL};
use crate::middlewares::auth::JwtClaims;
use crate::models::attempt::SlotRole;
use crate::models::session::{
    BrainBurstState, CheckpointStatus, ComboRules, CreateSessionRequest, DifficultyBand,
    FinishStatus, FrameToken, ItemPrompt, PhaseType, SessionPhase,
};
use crate::models::{
    Attempt, AttemptRecord, Checkpoint, CheckpointRecord, Session, SessionItem, SessionStatus,
    Verdict,
};
use crate::utils::id::generate_id;

pub const DEFAULT_LIST_LIMIT: u32 = 20;
pub const MAX_LIST_LIMIT: u32 = 50;

pub struct SessionService {
    sessions: Arc<dyn SessionRepository>,
    users: Arc<dyn UserRepository>,
    profiles: UserService,
    locks: Arc<UserLocks>,
    ttl: Duration,
}

impl SessionService {
    pub fn new(
        sessions: Arc<dyn SessionRepository>,
        users: Arc<dyn UserRepository>,
        profiles: UserService,
        locks: Arc<UserLocks>,
        ttl: Duration,
    ) -> Self {
        Self {
            sessions,
            users,
            profiles,
            locks,
            ttl,
        }
    }

    pub async fn create_session(&self, user_id: &str, req: CreateSessionRequest) -> Result<Session> {
        let now = Utc::now();
        let focus = req
            .pattern_focus
            .filter(|patterns| !patterns.is_empty())
            .unwrap_or_else(|| vec![DEFAULT_PATTERN_ID.to_string()]);

        let session = Session {
            session_id: generate_id("sess"),
            user_id: user_id.to_string(),
            mode: req.mode,
            status: SessionStatus::Pending,
            entry_point: req.entry_point,
            started_at: now,
            expires_at: now + self.ttl,
            phases: default_phases(),
            items: build_items(&focus),
            brain_burst: Some(BrainBurstState::default()),
            summary: None,
            created_at: now,
            updated_at: now,
        };

        self.sessions
            .insert_session(&session)
            .await
            .context("Failed to create session")?;

        tracing::info!(
            user_id,
            session_id = %session.session_id,
            items = session.items.len(),
            "Session created"
        );
        Ok(session)
    }

    /// The learner's own session; anyone else's is reported as missing.
    pub async fn get_session(&self, user_id: &str, session_id: &str) -> Result<Session> {
        match self.sessions.find_session(session_id).await? {
            Some(session) if session.user_id == user_id => Ok(session),
            _ => Err(ApiError::NotFound(format!("Session {} not found", session_id)).into()),
        }
    }

    pub async fn list_sessions(&self, user_id: &str, limit: Option<u32>) -> Result<Vec<Session>> {
        let limit = limit.unwrap_or(DEFAULT_LIST_LIMIT).clamp(1, MAX_LIST_LIMIT);
        self.sessions.list_sessions(user_id, limit as usize).await
    }

    /// The caller's session, provided it is still open.
    async fn open_session(&self, user_id: &str, session_id: &str) -> Result<Session> {
        let session = self.get_session(user_id, session_id).await?;
        if session.status.is_finished() {
            return Err(ApiError::Conflict(format!(
                "Session {} is already {}",
                session_id,
                session.status.as_str()
            ))
            .into());
        }
        Ok(session)
    }

    /// Held from the session read to its write-back so a concurrent
    /// `finish_session` never has its result replaced by a stale copy.
    pub async fn log_attempt(
        &self,
        user_id: &str,
        session_id: &str,
        attempt: Attempt,
    ) -> Result<AttemptRecord> {
        let _guard = self.locks.acquire(user_id).await;
        let mut session = self.open_session(user_id, session_id).await?;

        let scored = score_attempt(&attempt);
        let now = Utc::now();
        let record = AttemptRecord {
            attempt,
            session_id: session_id.to_string(),
            user_id: user_id.to_string(),
            score: scored.score,
            accuracy: scored.accuracy,
            created_at: now,
        };
        self.sessions.upsert_attempt(&record).await?;

        if session.status == SessionStatus::Pending {
            session.status = SessionStatus::Active;
        }
        session.updated_at = now;
        self.sessions.save_session(&session).await?;

        ATTEMPTS_SCORED_TOTAL
            .with_label_values(&[record.attempt.verdict.as_str()])
            .inc();
        tracing::debug!(
            session_id,
            attempt_id = %record.attempt.attempt_id,
            score = record.score,
            "Attempt scored"
        );
        Ok(record)
    }

    /// Record a phase checkpoint and mark the matching phase as reached.
    pub async fn log_checkpoint(
        &self,
        user_id: &str,
        session_id: &str,
        checkpoint: Checkpoint,
    ) -> Result<CheckpointRecord> {
        let _guard = self.locks.acquire(user_id).await;
        let mut session = self.open_session(user_id, session_id).await?;

        let now = Utc::now();
        let record = CheckpointRecord {
            checkpoint,
            session_id: session_id.to_string(),
            user_id: user_id.to_string(),
            created_at: now,
        };
        self.sessions.upsert_checkpoint(&record).await?;

        let checkpoint = &record.checkpoint;
        match session
            .phases
            .iter_mut()
            .find(|phase| phase.phase_id == checkpoint.phase_id)
        {
            Some(phase) => {
                phase.checkpoint_status = Some(CheckpointStatus {
                    reached: true,
                    accuracy: Some(checkpoint.accuracy),
                    combos_max: Some(checkpoint.combo_max),
                    completed_at: Some(checkpoint.reached_at),
                });
            }
            None => tracing::warn!(
                session_id,
                phase_id = %checkpoint.phase_id,
                "Checkpoint for a phase the session does not define"
            ),
        }
        if session.status == SessionStatus::Pending {
            session.status = SessionStatus::Active;
        }
        session.updated_at = now;
        self.sessions.save_session(&session).await?;

        tracing::debug!(
            session_id,
            checkpoint_id = %checkpoint.checkpoint_id,
            phase_id = %checkpoint.phase_id,
            "Checkpoint logged"
        );
        Ok(record)
    }

    pub async fn list_attempts(
        &self,
        user_id: &str,
        session_id: &str,
        verdict: Option<&str>,
    ) -> Result<Vec<AttemptRecord>> {
        let verdict = verdict
            .map(|raw| raw.parse::<Verdict>().map_err(ApiError::Validation))
            .transpose()?;
        self.get_session(user_id, session_id).await?;
        self.sessions.list_attempts(session_id, verdict).await
    }

    /// Close a session and, when it completed, fold it into the learner's
    /// progression. A session can only be finished once.
    pub async fn finish_session(
        &self,
        claims: &JwtClaims,
        session_id: &str,
        status: FinishStatus,
    ) -> Result<Session> {
        let _guard = self.locks.acquire(&claims.sub).await;

        let mut session = self.open_session(&claims.sub, session_id).await?;

        let attempts: Vec<Attempt> = self
            .sessions
            .list_attempts(session_id, None)
            .await?
            .into_iter()
            .map(|record| record.attempt)
            .collect();

        let now = Utc::now();
        let summary = summarize_session(&session, &attempts, now);
        session.status = status.into();
        session.summary = Some(summary.clone());
        session.updated_at = now;
        self.sessions
            .save_session(&session)
            .await
            .context("Failed to save finished session")?;

        if status == FinishStatus::Completed {
            let mut profile = self.profiles.ensure_profile(claims).await?;
            profile.progression = apply_session_completion(&profile.progression, &summary);
            profile.updated_at = now;
            self.users
                .save_profile(&profile)
                .await
                .context("Failed to apply session completion")?;

            let records = impact_records(&session, &attempts, now);
            self.users
                .append_pattern_impacts(&claims.sub, &records)
                .await
                .context("Failed to store pattern impacts")?;
        }

        SESSIONS_FINISHED_TOTAL
            .with_label_values(&[session.status.as_str()])
            .inc();
        tracing::info!(
            user_id = %claims.sub,
            session_id,
            status = session.status.as_str(),
            accuracy = summary.accuracy,
            "Session finished"
        );
        Ok(session)
    }
}

fn token(token_id: &str, display: &str, role: SlotRole) -> FrameToken {
    FrameToken {
        token_id: token_id.to_string(),
        display: display.to_string(),
        role,
    }
}

fn phase(
    phase_id: &str,
    label: &str,
    phase_type: PhaseType,
    order: u32,
    items: std::ops::RangeInclusive<u32>,
    target_duration_seconds: u32,
    combo_rules: (u32, u32),
) -> SessionPhase {
    let item_ids: Vec<String> = items.map(|n| format!("item_{}", n)).collect();
    SessionPhase {
        phase_id: phase_id.to_string(),
        label: label.to_string(),
        phase_type,
        order,
        target_sentences: item_ids.len() as u32,
        target_duration_seconds,
        item_ids,
        combo_rules: ComboRules {
            base: combo_rules.0,
            bonus_per_streak: combo_rules.1,
        },
        checkpoint_status: Some(CheckpointStatus::default()),
    }
}

/// Warm-up (3 sentences), focus zone (6) and cool-down (3).
fn default_phases() -> Vec<SessionPhase> {
    vec![
        phase("phase_warmup", "Warm-up", PhaseType::WarmUp, 1, 1..=3, 180, (10, 5)),
        phase("phase_focus", "Focus Zone", PhaseType::Focus, 2, 4..=9, 480, (15, 8)),
        phase("phase_cooldown", "Cool-down", PhaseType::CoolDown, 3, 10..=12, 180, (10, 5)),
    ]
}

/// One starter item per focus pattern, tagged with that pattern.
fn build_items(focus: &[String]) -> Vec<SessionItem> {
    focus
        .iter()
        .enumerate()
        .map(|(index, pattern)| SessionItem {
            item_id: format!("item_{}", index + 1),
            prompt: ItemPrompt {
                ko: "나는 어제 친구를 만났다".to_string(),
                en_reference: "I met a friend yesterday".to_string(),
            },
            tokens: vec![
                token("token_i", "I", SlotRole::S),
                token("token_met", "met", SlotRole::V),
                token("token_friend", "a friend", SlotRole::O),
                token("token_yesterday", "yesterday", SlotRole::M),
            ],
            distractors: vec![
                token("token_the_friend", "the friend", SlotRole::O),
                token("token_today", "today", SlotRole::M),
            ],
            correct_sequence: ["token_i", "token_met", "token_friend", "token_yesterday"]
                .iter()
                .map(|id| id.to_string())
                .collect(),
            pattern_tags: vec![pattern.clone()],
            difficulty_band: DifficultyBand::Core,
        })
        .collect()
}

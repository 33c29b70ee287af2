//! Storage seams. Services only talk to these traits; `AppState` decides which
//! implementation backs them.

use std::collections::HashMap;

use anyhow::Result;
use async_trait::async_trait;
use chrono::{DateTime, Utc};

use crate::models::{
    AttemptRecord, CheckpointRecord, LessonDoc, LevelTestRecord, PatternImpactRecord, Session,
    UserProfile, Verdict,
};

#[async_trait]
pub trait UserRepository: Send + Sync {
    async fn find_profile(&self, user_id: &str) -> Result<Option<UserProfile>>;

    /// Insert or replace the whole profile document.
    async fn save_profile(&self, profile: &UserProfile) -> Result<()>;

    /// Store `profile` only when the learner has none yet. Returns whichever
    /// profile is stored afterwards, so a concurrent writer is never overwritten.
    async fn insert_profile_if_absent(&self, profile: &UserProfile) -> Result<UserProfile>;

    async fn append_pattern_impacts(
        &self,
        user_id: &str,
        records: &[PatternImpactRecord],
    ) -> Result<()>;

    /// Every stored record for the learner, oldest first.
    async fn list_pattern_impacts(&self, user_id: &str) -> Result<Vec<PatternImpactRecord>>;

    async fn ping(&self) -> Result<()>;
}

#[async_trait]
pub trait SessionRepository: Send + Sync {
    async fn insert_session(&self, session: &Session) -> Result<()>;

    async fn find_session(&self, session_id: &str) -> Result<Option<Session>>;

    /// Newest first by `startedAt`.
    async fn list_sessions(&self, user_id: &str, limit: usize) -> Result<Vec<Session>>;

    async fn save_session(&self, session: &Session) -> Result<()>;

    /// Keyed by `attemptId` within the session; a resubmission replaces the
    /// earlier record in place.
    async fn upsert_attempt(&self, record: &AttemptRecord) -> Result<()>;

    /// Keyed by `checkpointId` within the session, last write wins.
    async fn upsert_checkpoint(&self, record: &CheckpointRecord) -> Result<()>;

    /// In submission order.
    async fn list_attempts(
        &self,
        session_id: &str,
        verdict: Option<Verdict>,
    ) -> Result<Vec<AttemptRecord>>;
}

#[async_trait]
pub trait LevelTestRepository: Send + Sync {
    /// Lessons found among `ids`, keyed by id. Unknown ids are simply absent.
    async fn find_lessons(&self, ids: &[String]) -> Result<HashMap<String, LessonDoc>>;

    async fn insert_submission(&self, record: &LevelTestRecord) -> Result<()>;

    async fn count_submissions_since(&self, user_id: &str, since: DateTime<Utc>) -> Result<u64>;
}

use std::collections::HashMap;

use anyhow::Result;
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use tokio::sync::RwLock;

use super::repository::{LevelTestRepository, SessionRepository, UserRepository};
use crate::models::{
    AttemptRecord, CheckpointRecord, LessonDoc, LevelTestRecord, PatternImpactRecord, Session,
    UserProfile, Verdict,
};

/// Process-local store for `storage.backend = memory` and the test suite.
#[derive(Default)]
pub struct MemoryRepository {
    users: RwLock<HashMap<String, UserProfile>>,
    pattern_impacts: RwLock<HashMap<String, Vec<PatternImpactRecord>>>,
    sessions: RwLock<HashMap<String, Session>>,
    attempts: RwLock<HashMap<String, Vec<AttemptRecord>>>,
    checkpoints: RwLock<HashMap<String, Vec<CheckpointRecord>>>,
    lessons: RwLock<HashMap<String, LessonDoc>>,
    level_tests: RwLock<Vec<LevelTestRecord>>,
}

impl MemoryRepository {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn insert_lessons(&self, lessons: impl IntoIterator<Item = LessonDoc>) {
        let mut store = self.lessons.write().await;
        for lesson in lessons {
            store.insert(lesson.lesson_id.clone(), lesson);
        }
    }
}

#[async_trait]
impl UserRepository for MemoryRepository {
    async fn find_profile(&self, user_id: &str) -> Result<Option<UserProfile>> {
        Ok(self.users.read().await.get(user_id).cloned())
    }

    async fn save_profile(&self, profile: &UserProfile) -> Result<()> {
        self.users
            .write()
            .await
            .insert(profile.user_id.clone(), profile.clone());
        Ok(())
    }

    async fn insert_profile_if_absent(&self, profile: &UserProfile) -> Result<UserProfile> {
        Ok(self
            .users
            .write()
            .await
            .entry(profile.user_id.clone())
            .or_insert_with(|| profile.clone())
            .clone())
    }

    async fn append_pattern_impacts(
        &self,
        user_id: &str,
        records: &[PatternImpactRecord],
    ) -> Result<()> {
        self.pattern_impacts
            .write()
            .await
            .entry(user_id.to_string())
            .or_default()
            .extend_from_slice(records);
        Ok(())
    }

    async fn list_pattern_impacts(&self, user_id: &str) -> Result<Vec<PatternImpactRecord>> {
        let mut records = self
            .pattern_impacts
            .read()
            .await
            .get(user_id)
            .cloned()
            .unwrap_or_default();
        records.sort_by_key(|record| record.timestamp);
        Ok(records)
    }

    async fn ping(&self) -> Result<()> {
        Ok(())
    }
}

#[async_trait]
impl SessionRepository for MemoryRepository {
    async fn insert_session(&self, session: &Session) -> Result<()> {
        let mut sessions = self.sessions.write().await;
        if sessions.contains_key(&session.session_id) {
            anyhow::bail!("Session {} already exists", session.session_id);
        }
        sessions.insert(session.session_id.clone(), session.clone());
        Ok(())
    }

    async fn find_session(&self, session_id: &str) -> Result<Option<Session>> {
        Ok(self.sessions.read().await.get(session_id).cloned())
    }

    async fn list_sessions(&self, user_id: &str, limit: usize) -> Result<Vec<Session>> {
        let mut sessions: Vec<Session> = self
            .sessions
            .read()
            .await
            .values()
            .filter(|session| session.user_id == user_id)
            .cloned()
            .collect();
        sessions.sort_by(|a, b| b.started_at.cmp(&a.started_at));
        sessions.truncate(limit);
        Ok(sessions)
    }

    async fn save_session(&self, session: &Session) -> Result<()> {
        self.sessions
            .write()
            .await
            .insert(session.session_id.clone(), session.clone());
        Ok(())
    }

    async fn upsert_attempt(&self, record: &AttemptRecord) -> Result<()> {
        let mut attempts = self.attempts.write().await;
        let list = attempts.entry(record.session_id.clone()).or_default();
        match list
            .iter_mut()
            .find(|existing| existing.attempt.attempt_id == record.attempt.attempt_id)
        {
            Some(existing) => *existing = record.clone(),
            None => list.push(record.clone()),
        }
        Ok(())
    }

    async fn upsert_checkpoint(&self, record: &CheckpointRecord) -> Result<()> {
        let mut checkpoints = self.checkpoints.write().await;
        let list = checkpoints.entry(record.session_id.clone()).or_default();
        match list.iter_mut().find(|existing| {
            existing.checkpoint.checkpoint_id == record.checkpoint.checkpoint_id
        }) {
            Some(existing) => *existing = record.clone(),
            None => list.push(record.clone()),
        }
        Ok(())
    }

    async fn list_attempts(
        &self,
        session_id: &str,
        verdict: Option<Verdict>,
    ) -> Result<Vec<AttemptRecord>> {
        Ok(self
            .attempts
            .read()
            .await
            .get(session_id)
            .map(|list| {
                list.iter()
                    .filter(|record| verdict.map_or(true, |v| record.attempt.verdict == v))
                    .cloned()
                    .collect()
            })
            .unwrap_or_default())
    }
}

#[async_trait]
impl LevelTestRepository for MemoryRepository {
    async fn find_lessons(&self, ids: &[String]) -> Result<HashMap<String, LessonDoc>> {
        let lessons = self.lessons.read().await;
        Ok(ids
            .iter()
            .filter_map(|id| lessons.get(id).map(|lesson| (id.clone(), lesson.clone())))
            .collect())
    }

    async fn insert_submission(&self, record: &LevelTestRecord) -> Result<()> {
        self.level_tests.write().await.push(record.clone());
        Ok(())
    }

    async fn count_submissions_since(&self, user_id: &str, since: DateTime<Utc>) -> Result<u64> {
        Ok(self
            .level_tests
            .read()
            .await
            .iter()
            .filter(|record| record.user_id == user_id && record.created_at >= since)
            .count() as u64)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::attempt::Attempt;
    use chrono::{Duration, TimeZone};

    fn record(session_id: &str, attempt_id: &str, verdict: Verdict) -> AttemptRecord {
        let at = Utc.with_ymd_and_hms(2024, 1, 1, 9, 0, 0).unwrap();
        AttemptRecord {
            attempt: Attempt {
                attempt_id: attempt_id.to_string(),
                item_id: "item_1".to_string(),
                started_at: at,
                completed_at: at,
                placements: Vec::new(),
                verdict,
                time_spent_ms: 1000,
                hints_used: 0,
                combo_count: 0,
                retry_number: Some(0),
            },
            session_id: session_id.to_string(),
            user_id: "user-001".to_string(),
            score: 1.0,
            accuracy: 1.0,
            created_at: at,
        }
    }

    #[tokio::test]
    async fn upsert_replaces_by_attempt_id_and_keeps_order() {
        let repo = MemoryRepository::new();
        repo.upsert_attempt(&record("s1", "a1", Verdict::Incorrect)).await.unwrap();
        repo.upsert_attempt(&record("s1", "a2", Verdict::Correct)).await.unwrap();
        repo.upsert_attempt(&record("s1", "a1", Verdict::Corrected)).await.unwrap();

        let all = repo.list_attempts("s1", None).await.unwrap();
        assert_eq!(all.len(), 2);
        assert_eq!(all[0].attempt.attempt_id, "a1");
        assert_eq!(all[0].attempt.verdict, Verdict::Corrected);

        let correct = repo.list_attempts("s1", Some(Verdict::Correct)).await.unwrap();
        assert_eq!(correct.len(), 1);
        assert!(repo.list_attempts("s2", None).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn insert_if_absent_keeps_the_stored_profile() {
        use crate::models::user::ProfileSeed;

        let repo = MemoryRepository::new();
        let at = Utc.with_ymd_and_hms(2024, 1, 1, 9, 0, 0).unwrap();
        let seed = ProfileSeed {
            user_id: "user-001".to_string(),
            display_name: None,
            email: None,
            locale: None,
            timezone: None,
        };
        let mut stored = UserProfile::new_default(&seed, "ko-KR", "Asia/Seoul", at);
        stored.progression.stats.current_streak = 4;
        repo.save_profile(&stored).await.unwrap();

        let fresh = UserProfile::new_default(&seed, "ko-KR", "Asia/Seoul", at);
        let kept = repo.insert_profile_if_absent(&fresh).await.unwrap();
        assert_eq!(kept.progression.stats.current_streak, 4);

        let other = ProfileSeed {
            user_id: "user-002".to_string(),
            ..seed
        };
        let created = repo
            .insert_profile_if_absent(&UserProfile::new_default(&other, "ko-KR", "Asia/Seoul", at))
            .await
            .unwrap();
        assert_eq!(created.user_id, "user-002");
        assert!(repo.find_profile("user-002").await.unwrap().is_some());
    }

    #[tokio::test]
    async fn pattern_impacts_come_back_oldest_first() {
        let repo = MemoryRepository::new();
        let t0 = Utc.with_ymd_and_hms(2024, 1, 1, 0, 0, 0).unwrap();
        let make = |at| PatternImpactRecord {
            pattern_id: "article".to_string(),
            correct: 1,
            total: 1,
            hint_rate: 0.0,
            first_try_rate: 1.0,
            timestamp: at,
        };
        repo.append_pattern_impacts("u", &[make(t0 + Duration::days(1))]).await.unwrap();
        repo.append_pattern_impacts("u", &[make(t0)]).await.unwrap();

        let records = repo.list_pattern_impacts("u").await.unwrap();
        assert_eq!(records[0].timestamp, t0);
        assert!(repo.list_pattern_impacts("other").await.unwrap().is_empty());
    }
}

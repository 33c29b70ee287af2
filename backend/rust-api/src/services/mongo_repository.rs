use std::collections::HashMap;

use anyhow::{Context, Result};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use futures::TryStreamExt;
use mongodb::bson::{doc, DateTime as BsonDateTime};
use mongodb::options::ReplaceOptions;
use mongodb::{Collection, Database};
use serde::{de::DeserializeOwned, Deserialize, Serialize};

use super::repository::{LevelTestRepository, SessionRepository, UserRepository};
use crate::metrics::track_repository_operation;
use crate::models::{
    AttemptRecord, CheckpointRecord, LessonDoc, LevelTestRecord, PatternImpactRecord, Session,
    UserProfile, Verdict,
};
use crate::utils::retry::{retry_async_with_config, RetryConfig};
use crate::utils::time::chrono_to_bson;

const USERS: &str = "users";
const SESSIONS: &str = "sessions";
const ATTEMPTS: &str = "attempts";
const CHECKPOINTS: &str = "session_checkpoints";
const PATTERN_IMPACTS: &str = "pattern_impacts";
const LESSONS: &str = "lessons";
const LEVEL_TESTS: &str = "level_tests";

/// Write shape: the model's camelCase fields plus a native BSON timestamp used
/// for range queries and ordering. Reads go straight to the model and skip `_ts`.
#[derive(Debug, Serialize)]
struct Stamped<T> {
    #[serde(flatten)]
    doc: T,
    #[serde(rename = "_ts")]
    ts: BsonDateTime,
}

impl<T> Stamped<T> {
    fn new(doc: T, at: DateTime<Utc>) -> Self {
        Self {
            doc,
            ts: chrono_to_bson(at),
        }
    }
}

fn is_duplicate_key(err: &mongodb::error::Error) -> bool {
    use mongodb::error::{ErrorKind, WriteError, WriteFailure};

    matches!(
        err.kind.as_ref(),
        ErrorKind::Write(WriteFailure::WriteError(WriteError { code: 11000, .. }))
    )
}

/// Pattern impact rows carry their owner, which the model itself does not.
#[derive(Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
struct OwnedImpact {
    user_id: String,
    #[serde(flatten)]
    record: PatternImpactRecord,
}

pub struct MongoRepository {
    db: Database,
    retry: RetryConfig,
}

impl MongoRepository {
    pub fn new(db: Database) -> Self {
        Self {
            db,
            retry: RetryConfig::default(),
        }
    }

    fn collection<T: Send + Sync>(&self, name: &str) -> Collection<T> {
        self.db.collection::<T>(name)
    }

    fn stamped_collection<T: Send + Sync>(&self, name: &str) -> Collection<Stamped<T>> {
        self.db.collection::<Stamped<T>>(name)
    }

    /// Create the indexes the queries below rely on. Safe to call on every start.
    pub async fn ensure_indexes(&self) -> Result<()> {
        use mongodb::{options::IndexOptions, IndexModel};

        let unique = |keys| {
            IndexModel::builder()
                .keys(keys)
                .options(IndexOptions::builder().unique(true).build())
                .build()
        };
        let plain = |keys| IndexModel::builder().keys(keys).build();

        let specs: Vec<(&str, IndexModel)> = vec![
            (USERS, unique(doc! { "userId": 1 })),
            (SESSIONS, unique(doc! { "sessionId": 1 })),
            (SESSIONS, plain(doc! { "userId": 1, "_ts": -1 })),
            (ATTEMPTS, unique(doc! { "sessionId": 1, "attemptId": 1 })),
            (CHECKPOINTS, unique(doc! { "sessionId": 1, "checkpointId": 1 })),
            (PATTERN_IMPACTS, plain(doc! { "userId": 1, "_ts": 1 })),
            (LEVEL_TESTS, plain(doc! { "userId": 1, "_ts": -1 })),
        ];

        for (collection, index) in specs {
            self.db
                .collection::<mongodb::bson::Document>(collection)
                .create_index(index)
                .await
                .with_context(|| format!("Failed to create index on {}", collection))?;
        }
        Ok(())
    }

    async fn find_one<T>(&self, collection: &str, filter: mongodb::bson::Document) -> Result<Option<T>>
    where
        T: DeserializeOwned + Send + Sync + Unpin,
    {
        self.collection::<T>(collection)
            .find_one(filter)
            .await
            .with_context(|| format!("Failed to query {}", collection))
    }

    async fn replace<T>(
        &self,
        collection: &str,
        filter: mongodb::bson::Document,
        doc: &Stamped<T>,
    ) -> Result<()>
    where
        T: Serialize + Send + Sync,
    {
        let coll = self.stamped_collection::<T>(collection);
        retry_async_with_config(collection, &self.retry, || async {
            coll.replace_one(filter.clone(), doc)
                .with_options(ReplaceOptions::builder().upsert(true).build())
                .await
                .map(|_| ())
        })
        .await
        .with_context(|| format!("Failed to write {}", collection))
    }
}

#[async_trait]
impl UserRepository for MongoRepository {
    async fn find_profile(&self, user_id: &str) -> Result<Option<UserProfile>> {
        track_repository_operation(
            "find_profile",
            self.find_one(USERS, doc! { "userId": user_id }),
        )
        .await
    }

    async fn save_profile(&self, profile: &UserProfile) -> Result<()> {
        let stamped = Stamped::new(profile.clone(), profile.updated_at);
        track_repository_operation(
            "save_profile",
            self.replace(USERS, doc! { "userId": &profile.user_id }, &stamped),
        )
        .await
    }

    async fn insert_profile_if_absent(&self, profile: &UserProfile) -> Result<UserProfile> {
        let stamped = Stamped::new(profile.clone(), profile.updated_at);
        let coll = self.stamped_collection::<UserProfile>(USERS);
        track_repository_operation("insert_profile", async {
            // The unique `userId` index turns a lost race into a duplicate key.
            match coll.insert_one(&stamped).await {
                Ok(_) => Ok(profile.clone()),
                Err(e) if is_duplicate_key(&e) => self
                    .find_one::<UserProfile>(USERS, doc! { "userId": &profile.user_id })
                    .await?
                    .with_context(|| {
                        format!("Profile {} missing after duplicate key", profile.user_id)
                    }),
                Err(e) => Err(e).context("Failed to insert profile"),
            }
        })
        .await
    }

    async fn append_pattern_impacts(
        &self,
        user_id: &str,
        records: &[PatternImpactRecord],
    ) -> Result<()> {
        if records.is_empty() {
            return Ok(());
        }
        let docs: Vec<Stamped<OwnedImpact>> = records
            .iter()
            .map(|record| {
                Stamped::new(
                    OwnedImpact {
                        user_id: user_id.to_string(),
                        record: record.clone(),
                    },
                    record.timestamp,
                )
            })
            .collect();
        let coll = self.stamped_collection::<OwnedImpact>(PATTERN_IMPACTS);

        track_repository_operation("append_pattern_impacts", async {
            retry_async_with_config(PATTERN_IMPACTS, &self.retry, || async {
                coll.insert_many(&docs).await.map(|_| ())
            })
            .await
            .context("Failed to insert pattern impacts")
        })
        .await
    }

    async fn list_pattern_impacts(&self, user_id: &str) -> Result<Vec<PatternImpactRecord>> {
        track_repository_operation("list_pattern_impacts", async {
            let rows: Vec<OwnedImpact> = self
                .collection::<OwnedImpact>(PATTERN_IMPACTS)
                .find(doc! { "userId": user_id })
                .sort(doc! { "_ts": 1 })
                .await
                .context("Failed to query pattern impacts")?
                .try_collect()
                .await
                .context("Failed to read pattern impacts")?;
            Ok(rows.into_iter().map(|row| row.record).collect())
        })
        .await
    }

    async fn ping(&self) -> Result<()> {
        self.db
            .run_command(doc! { "ping": 1 })
            .await
            .context("MongoDB ping failed")?;
        Ok(())
    }
}

#[async_trait]
impl SessionRepository for MongoRepository {
    async fn insert_session(&self, session: &Session) -> Result<()> {
        let stamped = Stamped::new(session.clone(), session.started_at);
        let coll = self.stamped_collection::<Session>(SESSIONS);
        track_repository_operation("insert_session", async {
            coll.insert_one(&stamped)
                .await
                .context("Failed to insert session")?;
            Ok(())
        })
        .await
    }

    async fn find_session(&self, session_id: &str) -> Result<Option<Session>> {
        track_repository_operation(
            "find_session",
            self.find_one(SESSIONS, doc! { "sessionId": session_id }),
        )
        .await
    }

    async fn list_sessions(&self, user_id: &str, limit: usize) -> Result<Vec<Session>> {
        track_repository_operation("list_sessions", async {
            let sessions: Vec<Session> = self
                .collection::<Session>(SESSIONS)
                .find(doc! { "userId": user_id })
                .sort(doc! { "_ts": -1 })
                .limit(i64::try_from(limit).unwrap_or(i64::MAX))
                .await
                .context("Failed to query sessions")?
                .try_collect()
                .await
                .context("Failed to read sessions")?;
            Ok(sessions)
        })
        .await
    }

    async fn save_session(&self, session: &Session) -> Result<()> {
        let stamped = Stamped::new(session.clone(), session.started_at);
        track_repository_operation(
            "save_session",
            self.replace(SESSIONS, doc! { "sessionId": &session.session_id }, &stamped),
        )
        .await
    }

    async fn upsert_attempt(&self, record: &AttemptRecord) -> Result<()> {
        let stamped = Stamped::new(record.clone(), record.created_at);
        track_repository_operation(
            "upsert_attempt",
            self.replace(
                ATTEMPTS,
                doc! {
                    "sessionId": &record.session_id,
                    "attemptId": &record.attempt.attempt_id,
                },
                &stamped,
            ),
        )
        .await
    }

    async fn upsert_checkpoint(&self, record: &CheckpointRecord) -> Result<()> {
        let stamped = Stamped::new(record.clone(), record.created_at);
        track_repository_operation(
            "upsert_checkpoint",
            self.replace(
                CHECKPOINTS,
                doc! {
                    "sessionId": &record.session_id,
                    "checkpointId": &record.checkpoint.checkpoint_id,
                },
                &stamped,
            ),
        )
        .await
    }

    async fn list_attempts(
        &self,
        session_id: &str,
        verdict: Option<Verdict>,
    ) -> Result<Vec<AttemptRecord>> {
        let mut filter = doc! { "sessionId": session_id };
        if let Some(verdict) = verdict {
            filter.insert("verdict", verdict.as_str());
        }

        track_repository_operation("list_attempts", async {
            let attempts: Vec<AttemptRecord> = self
                .collection::<AttemptRecord>(ATTEMPTS)
                .find(filter)
                .sort(doc! { "_ts": 1 })
                .await
                .context("Failed to query attempts")?
                .try_collect()
                .await
                .context("Failed to read attempts")?;
            Ok(attempts)
        })
        .await
    }
}

#[async_trait]
impl LevelTestRepository for MongoRepository {
    async fn find_lessons(&self, ids: &[String]) -> Result<HashMap<String, LessonDoc>> {
        track_repository_operation("find_lessons", async {
            // Lessons are reference data seeded outside this service, no `_ts`.
            let lessons: Vec<LessonDoc> = self
                .collection::<LessonDoc>(LESSONS)
                .find(doc! { "lessonId": { "$in": ids.to_vec() } })
                .await
                .context("Failed to query lessons")?
                .try_collect()
                .await
                .context("Failed to read lessons")?;
            Ok(lessons
                .into_iter()
                .map(|lesson| (lesson.lesson_id.clone(), lesson))
                .collect())
        })
        .await
    }

    async fn insert_submission(&self, record: &LevelTestRecord) -> Result<()> {
        let stamped = Stamped::new(record.clone(), record.created_at);
        let coll = self.stamped_collection::<LevelTestRecord>(LEVEL_TESTS);
        track_repository_operation("insert_level_test", async {
            retry_async_with_config(LEVEL_TESTS, &self.retry, || async {
                coll.insert_one(&stamped).await.map(|_| ())
            })
            .await
            .context("Failed to insert level test submission")
        })
        .await
    }

    async fn count_submissions_since(&self, user_id: &str, since: DateTime<Utc>) -> Result<u64> {
        track_repository_operation("count_level_tests", async {
            self.collection::<mongodb::bson::Document>(LEVEL_TESTS)
                .count_documents(doc! {
                    "userId": user_id,
                    "_ts": { "$gte": chrono_to_bson(since) },
                })
                .await
                .context("Failed to count level test submissions")
        })
        .await
    }
}

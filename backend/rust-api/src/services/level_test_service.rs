use std::sync::Arc;

use anyhow::{Context, Result};
use chrono::{Duration, Utc};
use validator::Validate;

use super::repository::{LevelTestRepository, UserRepository};
use super::user_service::UserService;
use super::UserLocks;
use crate::engine::{apply_level_test_result, evaluate_level_test};
use crate::error::ApiError;
use crate::metrics::{record_level_test_outcome, RECOMMENDED_LEVEL};
use crate::middlewares::auth::JwtClaims;
use crate::models::{LevelTestRecord, LevelTestResult, LevelTestSubmission};
use crate::utils::id::generate_id;

/// Rolling-window submission quota.
#[derive(Debug, Clone, Copy)]
pub struct SubmissionLimit {
    pub max_submissions: u32,
    pub window: Duration,
}

pub struct LevelTestService {
    level_tests: Arc<dyn LevelTestRepository>,
    users: Arc<dyn UserRepository>,
    profiles: UserService,
    locks: Arc<UserLocks>,
    limit: SubmissionLimit,
}

impl LevelTestService {
    pub fn new(
        level_tests: Arc<dyn LevelTestRepository>,
        users: Arc<dyn UserRepository>,
        profiles: UserService,
        locks: Arc<UserLocks>,
        limit: SubmissionLimit,
    ) -> Self {
        Self {
            level_tests,
            users,
            profiles,
            locks,
            limit,
        }
    }

    pub async fn submit(
        &self,
        claims: &JwtClaims,
        submission: LevelTestSubmission,
    ) -> Result<LevelTestResult> {
        if let Err(errors) = submission.validate() {
            record_level_test_outcome("invalid");
            return Err(ApiError::from(errors).into());
        }

        // Count and insert under the learner's lock so parallel submissions
        // cannot both slip under the quota.
        let _guard = self.locks.acquire(&claims.sub).await;

        let now = Utc::now();
        let recent = self
            .level_tests
            .count_submissions_since(&claims.sub, now - self.limit.window)
            .await?;
        if recent >= u64::from(self.limit.max_submissions) {
            record_level_test_outcome("rate_limited");
            tracing::warn!(user_id = %claims.sub, recent, "Level test rate limit reached");
            return Err(ApiError::RateLimited(format!(
                "At most {} level tests per {} hours",
                self.limit.max_submissions,
                self.limit.window.num_hours()
            ))
            .into());
        }

        let mut ids: Vec<String> = submission
            .attempts
            .iter()
            .map(|attempt| attempt.item_id.clone())
            .collect();
        ids.sort();
        ids.dedup();
        let lessons = self.level_tests.find_lessons(&ids).await?;
        if lessons.len() < ids.len() {
            tracing::warn!(
                user_id = %claims.sub,
                missing = ids.len() - lessons.len(),
                "Level test references unknown lessons"
            );
        }

        let result = evaluate_level_test(&submission, &lessons);

        // The stored record consumes quota, so it is written only once the
        // result has reached the profile.
        let mut profile = self.profiles.ensure_profile(claims).await?;
        profile.progression = apply_level_test_result(&profile.progression, &result);
        profile.updated_at = now;
        self.users
            .save_profile(&profile)
            .await
            .context("Failed to apply level test result")?;

        let record = LevelTestRecord {
            submission_id: generate_id("lvltest"),
            user_id: claims.sub.clone(),
            attempts: submission.attempts,
            started_at: submission.started_at,
            completed_at: submission.completed_at,
            created_at: now,
            result: result.clone(),
        };
        if let Err(e) = self.level_tests.insert_submission(&record).await {
            tracing::error!(
                user_id = %claims.sub,
                submission_id = %record.submission_id,
                error = %e,
                "Level test applied to profile but not recorded; quota not consumed"
            );
            return Err(e.context("Failed to store level test submission"));
        }

        record_level_test_outcome("accepted");
        RECOMMENDED_LEVEL.observe(f64::from(result.recommended_level));
        tracing::info!(
            user_id = %claims.sub,
            submission_id = %record.submission_id,
            recommended_level = result.recommended_level,
            accuracy = result.accuracy,
            "Level test evaluated"
        );
        Ok(result)
    }
}

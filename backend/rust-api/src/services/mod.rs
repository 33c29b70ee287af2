use std::collections::HashMap;
use std::sync::Arc;

use anyhow::Context;
use mongodb::Client as MongoClient;
use tokio::sync::{Mutex, OwnedMutexGuard};

use crate::config::{Config, StorageBackend};
use crate::middlewares::auth::JwtService;

pub mod level_test_service;
pub mod memory_repository;
pub mod mongo_repository;
pub mod repository;
pub mod session_service;
pub mod user_service;

use level_test_service::{LevelTestService, SubmissionLimit};
use memory_repository::MemoryRepository;
use mongo_repository::MongoRepository;
use repository::{LevelTestRepository, SessionRepository, UserRepository};
use session_service::SessionService;
use user_service::UserService;

/// Per-learner async locks. Read-modify-write sequences on a learner's state
/// (finishing a session, submitting a level test) hold the learner's lock so a
/// completion is applied exactly once. Only serializes within this process.
#[derive(Default)]
pub struct UserLocks {
    locks: Mutex<HashMap<String, Arc<Mutex<()>>>>,
}

impl UserLocks {
    pub async fn acquire(&self, user_id: &str) -> OwnedMutexGuard<()> {
        let lock = {
            let mut locks = self.locks.lock().await;
            // Drop entries nobody is holding or waiting on.
            locks.retain(|_, lock| Arc::strong_count(lock) > 1);
            locks
                .entry(user_id.to_string())
                .or_insert_with(|| Arc::new(Mutex::new(())))
                .clone()
        };
        lock.lock_owned().await
    }
}

pub struct AppState {
    pub config: Config,
    pub users: Arc<dyn UserRepository>,
    pub sessions: Arc<dyn SessionRepository>,
    pub level_tests: Arc<dyn LevelTestRepository>,
    pub jwt: JwtService,
    pub locks: Arc<UserLocks>,
}

impl AppState {
    pub async fn new(config: Config) -> anyhow::Result<Self> {
        match config.storage_backend {
            StorageBackend::Mongo => {
                tracing::info!("Connecting to MongoDB...");
                let client = MongoClient::with_uri_str(&config.mongo_uri)
                    .await
                    .context("Failed to connect to MongoDB")?;
                let repository = MongoRepository::new(client.database(&config.mongo_database));

                tokio::time::timeout(std::time::Duration::from_secs(5), repository.ping())
                    .await
                    .map_err(|_| anyhow::anyhow!("MongoDB ping timeout after 5s"))??;
                repository.ensure_indexes().await?;

                tracing::info!(database = %config.mongo_database, "MongoDB connection established");
                let repository = Arc::new(repository);
                Ok(Self::assemble(
                    config,
                    repository.clone(),
                    repository.clone(),
                    repository,
                ))
            }
            StorageBackend::Memory => {
                tracing::warn!("Using in-memory storage; data is lost on restart");
                Ok(Self::with_repository(config, Arc::new(MemoryRepository::new())))
            }
        }
    }

    /// State backed by a single in-memory store, used by `storage.backend =
    /// memory` and by the integration tests (which seed lessons through it).
    pub fn with_repository(config: Config, repository: Arc<MemoryRepository>) -> Self {
        Self::assemble(config, repository.clone(), repository.clone(), repository)
    }

    fn assemble(
        config: Config,
        users: Arc<dyn UserRepository>,
        sessions: Arc<dyn SessionRepository>,
        level_tests: Arc<dyn LevelTestRepository>,
    ) -> Self {
        let jwt = JwtService::new(&config.jwt_secret);
        Self {
            config,
            users,
            sessions,
            level_tests,
            jwt,
            locks: Arc::new(UserLocks::default()),
        }
    }

    pub fn user_service(&self) -> UserService {
        UserService::new(
            self.users.clone(),
            self.locks.clone(),
            self.config.default_locale.clone(),
            self.config.default_timezone.clone(),
        )
    }

    pub fn session_service(&self) -> SessionService {
        SessionService::new(
            self.sessions.clone(),
            self.users.clone(),
            self.user_service(),
            self.locks.clone(),
            chrono::Duration::minutes(self.config.session_ttl_minutes),
        )
    }

    pub fn level_test_service(&self) -> LevelTestService {
        LevelTestService::new(
            self.level_tests.clone(),
            self.users.clone(),
            self.user_service(),
            self.locks.clone(),
            SubmissionLimit {
                max_submissions: self.config.level_test_max_submissions,
                window: chrono::Duration::hours(self.config.level_test_window_hours),
            },
        )
    }
}

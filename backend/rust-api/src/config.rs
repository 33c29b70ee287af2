use serde::Deserialize;
use std::env;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum StorageBackend {
    Mongo,
    Memory,
}

#[derive(Debug, Clone, Deserialize)]
pub struct Config {
    pub app_env: String,
    pub server_addr: String,
    pub storage_backend: StorageBackend,
    pub mongo_uri: String,
    pub mongo_database: String,
    pub jwt_secret: String,
    pub otlp_endpoint: Option<String>,
    pub default_timezone: String,
    pub default_locale: String,
    pub level_test_max_submissions: u32,
    pub level_test_window_hours: i64,
    pub session_ttl_minutes: i64,
}

impl Default for Config {
    /// Local defaults, also used by tests that never touch the environment.
    fn default() -> Self {
        Self {
            app_env: "dev".to_string(),
            server_addr: "0.0.0.0:8081".to_string(),
            storage_backend: StorageBackend::Mongo,
            mongo_uri: "mongodb://localhost:27017".to_string(),
            mongo_database: "englishbrain".to_string(),
            jwt_secret: "dev-secret-only-for-local-testing".to_string(),
            otlp_endpoint: None,
            default_timezone: "Asia/Seoul".to_string(),
            default_locale: "ko-KR".to_string(),
            level_test_max_submissions: 2,
            level_test_window_hours: 24,
            session_ttl_minutes: 60,
        }
    }
}

impl Config {
    pub fn load() -> Result<Self, config::ConfigError> {
        // Root .env first (two levels up), then the crate-local one
        let skip_root_env = env::var("SKIP_ROOT_ENV").is_ok();
        if skip_root_env {
            dotenvy::dotenv().ok();
        } else if dotenvy::from_path("../../.env").is_err() {
            dotenvy::dotenv().ok();
        }

        let app_env = env::var("APP_ENV").unwrap_or_else(|_| "dev".to_string());

        // config/{env}.toml, overridden by APP__SECTION__KEY variables
        let settings = config::Config::builder()
            .add_source(config::File::with_name(&format!("config/{}", app_env)).required(false))
            .add_source(config::Environment::with_prefix("APP").separator("__"))
            .build()?;

        let defaults = Config::default();

        let string_setting = |key: &str, fallback_env: &str| -> Option<String> {
            settings
                .get_string(key)
                .ok()
                .or_else(|| env::var(fallback_env).ok())
                .filter(|value| !value.trim().is_empty())
        };

        let server_addr = string_setting("server.addr", "SERVER_ADDR")
            .unwrap_or(defaults.server_addr);

        let storage_backend = match string_setting("storage.backend", "STORAGE_BACKEND")
            .as_deref()
            .map(str::to_ascii_lowercase)
            .as_deref()
        {
            None | Some("mongo") => StorageBackend::Mongo,
            Some("memory") => StorageBackend::Memory,
            Some(other) => {
                return Err(config::ConfigError::Message(format!(
                    "storage.backend must be 'mongo' or 'memory', got '{}'",
                    other
                )))
            }
        };

        let mongo_uri = string_setting("database.mongo_uri", "MONGO_URI")
            .unwrap_or(defaults.mongo_uri);

        let mongo_database = string_setting("database.mongo_database", "MONGO_DATABASE")
            .unwrap_or(defaults.mongo_database);

        let jwt_secret = match string_setting("auth.jwt_secret", "JWT_SECRET") {
            Some(secret) => secret,
            None if app_env == "prod" => {
                return Err(config::ConfigError::Message(
                    "JWT_SECRET must be set in production".to_string(),
                ))
            }
            None => {
                eprintln!("WARNING: Using default JWT_SECRET (dev mode only!)");
                defaults.jwt_secret
            }
        };

        let otlp_endpoint =
            string_setting("telemetry.otlp_endpoint", "OTEL_EXPORTER_OTLP_ENDPOINT");

        let default_timezone = string_setting("profile.default_timezone", "DEFAULT_TIMEZONE")
            .unwrap_or(defaults.default_timezone);

        let default_locale = string_setting("profile.default_locale", "DEFAULT_LOCALE")
            .unwrap_or(defaults.default_locale);

        let level_test_max_submissions = settings
            .get_int("level_test.max_submissions")
            .ok()
            .and_then(|v| u32::try_from(v).ok())
            .unwrap_or(defaults.level_test_max_submissions);

        let level_test_window_hours = settings
            .get_int("level_test.window_hours")
            .ok()
            .filter(|hours| *hours > 0)
            .unwrap_or(defaults.level_test_window_hours);

        let session_ttl_minutes = settings
            .get_int("session.ttl_minutes")
            .ok()
            .filter(|minutes| *minutes > 0)
            .unwrap_or(defaults.session_ttl_minutes);

        Ok(Config {
            app_env,
            server_addr,
            storage_backend,
            mongo_uri,
            mongo_database,
            jwt_secret,
            otlp_endpoint,
            default_timezone,
            default_locale,
            level_test_max_submissions,
            level_test_window_hours,
            session_ttl_minutes,
        })
    }
}

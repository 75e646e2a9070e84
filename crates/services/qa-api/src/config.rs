//! Service configuration.
//!
//! Values are layered: built-in defaults, then an optional TOML file, then
//! `QA__`-prefixed environment variables (`QA__STORAGE__DATABASE_URL`, ...).
use config::{Config, ConfigError, Environment, File};
use serde::Deserialize;
use std::net::SocketAddr;
use std::path::Path;
use std::time::Duration;

use crate::reputation::DEFAULT_MAX_ATTEMPTS;

pub const ENV_PREFIX: &str = "QA";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum StorageBackend {
    Memory,
    Postgres,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PrefsBackend {
    Memory,
    Postgres,
    Http,
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct StorageConfig {
    pub backend: StorageBackend,
    pub database_url: Option<String>,
    pub max_connections: u32,
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct PrefsConfig {
    pub backend: PrefsBackend,
    /// Base URL of the remote preference service (`http` backend).
    pub base_url: Option<String>,
    pub api_key: Option<String>,
    pub timeout_secs: u64,
}

impl PrefsConfig {
    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct ReputationConfig {
    pub max_attempts: u32,
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct ApiConfig {
    pub listen_addr: SocketAddr,
    /// Used when `RUST_LOG` is unset.
    pub log_filter: String,
    pub metrics_addr: Option<SocketAddr>,
    pub storage: StorageConfig,
    pub prefs: PrefsConfig,
    pub reputation: ReputationConfig,
}

impl ApiConfig {
    /// Loads configuration from defaults, `path` (if given) and the environment.
    pub fn load(path: Option<&Path>) -> Result<Self, ConfigError> {
        Self::build(path, Self::env_source(ENV_PREFIX))
    }

    fn env_source(prefix: &str) -> Environment {
        Environment::with_prefix(prefix)
            .prefix_separator("__")
            .separator("__")
            .try_parsing(true)
    }

    fn build(path: Option<&Path>, env: Environment) -> Result<Self, ConfigError> {
        let mut builder = Config::builder()
            .set_default("listen_addr", "0.0.0.0:8787")?
            .set_default("log_filter", "qa_api=info,tower_http=info")?
            .set_default("storage.backend", "memory")?
            .set_default("storage.max_connections", 20)?
            .set_default("prefs.backend", "memory")?
            .set_default("prefs.timeout_secs", 5)?
            .set_default("reputation.max_attempts", i64::from(DEFAULT_MAX_ATTEMPTS))?;

        if let Some(path) = path {
            builder = builder.add_source(File::from(path).required(true));
        }

        let config: ApiConfig = builder.add_source(env).build()?.try_deserialize()?;
        config.validate()?;
        Ok(config)
    }

    fn validate(&self) -> Result<(), ConfigError> {
        let needs_database = self.storage.backend == StorageBackend::Postgres
            || self.prefs.backend == PrefsBackend::Postgres;
        if needs_database && self.storage.database_url.is_none() {
            return Err(ConfigError::Message(
                "storage.database_url is required for the postgres backend".to_string(),
            ));
        }
        if self.prefs.backend == PrefsBackend::Http && self.prefs.base_url.is_none() {
            return Err(ConfigError::Message(
                "prefs.base_url is required for the http backend".to_string(),
            ));
        }
        if self.reputation.max_attempts == 0 {
            return Err(ConfigError::Message(
                "reputation.max_attempts must be at least 1".to_string(),
            ));
        }
        Ok(())
    }
}

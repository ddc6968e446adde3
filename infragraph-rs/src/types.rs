//! Store and writer configuration loaded from the environment.

use std::num::NonZeroUsize;
use std::time::Duration;

use serde::{Deserialize, Serialize};
use validator::Validate;

use crate::errors::{IngestError, Result};

/// Graph store connection settings.
#[derive(Clone, Serialize, Deserialize, Validate)]
pub struct StoreConfig {
    /// Bolt URI (e.g. `bolt://localhost:7687`).
    #[validate(length(min = 1))]
    pub uri: String,

    #[validate(length(min = 1))]
    pub user: String,

    #[validate(length(min = 1))]
    pub password: String,

    /// Target database name.
    #[validate(length(min = 1))]
    pub database: String,

    /// Upper bound on pooled connections.
    #[validate(range(min = 1))]
    pub max_connections: usize,
}

impl std::fmt::Debug for StoreConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("StoreConfig")
            .field("uri", &self.uri)
            .field("user", &self.user)
            .field("password", &"***")
            .field("database", &self.database)
            .field("max_connections", &self.max_connections)
            .finish()
    }
}

impl Default for StoreConfig {
    fn default() -> Self {
        Self {
            uri: "bolt://localhost:7687".to_string(),
            user: "neo4j".to_string(),
            password: String::new(),
            database: "neo4j".to_string(),
            max_connections: 16,
        }
    }
}

impl StoreConfig {
    /// Load configuration from environment variables.
    ///
    /// Calls `dotenvy::dotenv().ok()` first (non-fatal if `.env` is absent).
    /// `NEO4J_PASSWORD` is required; `NEO4J_URI`, `NEO4J_USER`, `NEO4J_DATABASE`
    /// and `NEO4J_MAX_CONNECTIONS` fall back to defaults.
    pub fn from_env() -> Result<Self> {
        dotenvy::dotenv().ok();
        let defaults = Self::default();

        let password = std::env::var("NEO4J_PASSWORD")
            .map_err(|_| IngestError::Config("NEO4J_PASSWORD is required".to_string()))?;

        let config = Self {
            uri: std::env::var("NEO4J_URI").unwrap_or(defaults.uri),
            user: std::env::var("NEO4J_USER").unwrap_or(defaults.user),
            password,
            database: std::env::var("NEO4J_DATABASE").unwrap_or(defaults.database),
            max_connections: parse_var("NEO4J_MAX_CONNECTIONS", defaults.max_connections)?,
        };

        config
            .validate()
            .map_err(|e| IngestError::Config(e.to_string()))?;
        Ok(config)
    }
}

/// Batch execution settings for the writer.
#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
pub struct WriterConfig {
    /// Maximum rows per transaction.
    #[validate(range(min = 1))]
    pub batch_size: usize,

    /// Batches of one statement allowed in flight at once.
    #[validate(range(min = 1))]
    pub batch_concurrency: usize,

    /// Per-attempt batch timeout, in seconds.
    #[validate(range(min = 1))]
    pub batch_timeout_secs: u64,

    /// Total time spent retrying transient failures, in seconds. 0 disables retry.
    pub retry_max_elapsed_secs: u64,
}

impl Default for WriterConfig {
    fn default() -> Self {
        Self {
            batch_size: 1000,
            batch_concurrency: 1,
            batch_timeout_secs: 120,
            retry_max_elapsed_secs: 30,
        }
    }
}

impl WriterConfig {
    /// Load configuration from `BATCH_SIZE`, `BATCH_CONCURRENCY`,
    /// `BATCH_TIMEOUT_SECS` and `BATCH_RETRY_SECS`, falling back to defaults.
    pub fn from_env() -> Result<Self> {
        dotenvy::dotenv().ok();
        let defaults = Self::default();

        let config = Self {
            batch_size: parse_var("BATCH_SIZE", defaults.batch_size)?,
            batch_concurrency: parse_var("BATCH_CONCURRENCY", defaults.batch_concurrency)?,
            batch_timeout_secs: parse_var("BATCH_TIMEOUT_SECS", defaults.batch_timeout_secs)?,
            retry_max_elapsed_secs: parse_var("BATCH_RETRY_SECS", defaults.retry_max_elapsed_secs)?,
        };
        config.checked()
    }

    /// Validate settings built in code rather than read from the environment.
    pub fn checked(self) -> Result<Self> {
        self.validate()
            .map_err(|e| IngestError::Config(e.to_string()))?;
        Ok(self)
    }

    pub fn batch_size(&self) -> NonZeroUsize {
        NonZeroUsize::new(self.batch_size).unwrap_or(NonZeroUsize::MIN)
    }

    pub fn concurrency(&self) -> usize {
        self.batch_concurrency.max(1)
    }

    pub fn batch_timeout(&self) -> Duration {
        Duration::from_secs(self.batch_timeout_secs)
    }

    /// `None` when retry is disabled.
    pub fn retry_max_elapsed(&self) -> Option<Duration> {
        (self.retry_max_elapsed_secs > 0).then(|| Duration::from_secs(self.retry_max_elapsed_secs))
    }
}

fn parse_var<T: std::str::FromStr>(name: &str, default: T) -> Result<T> {
    match std::env::var(name) {
        Ok(val) => val.trim().parse::<T>().map_err(|_| {
            IngestError::Config(format!("{name} must be a non-negative integer, got '{val}'"))
        }),
        Err(_) => Ok(default),
    }
}

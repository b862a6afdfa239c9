//! Orchestrator configuration.

use std::time::Duration;

use serde::{Deserialize, Serialize};

/// Pool size of the original scraper, one browser per worker.
pub const DEFAULT_MAX_CONCURRENCY: usize = 5;

pub const DEFAULT_FETCH_TIMEOUT: Duration = Duration::from_secs(60);

#[derive(Debug, thiserror::Error, PartialEq, Eq)]
pub enum ConfigError {
    #[error("max_concurrency must be greater than 0")]
    ZeroConcurrency,
    #[error("fetch_timeout must be greater than 0")]
    ZeroTimeout,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct OrchestratorConfig {
    /// Maximum number of fetches in flight across all tasks.
    /// Keep it at or below what the fetch backend can run side by side.
    #[serde(default = "default_max_concurrency")]
    pub max_concurrency: usize,

    /// Per-fetch deadline. An elapsed fetch fails its date only.
    #[serde(default = "default_fetch_timeout")]
    pub fetch_timeout: Duration,
}

fn default_max_concurrency() -> usize {
    DEFAULT_MAX_CONCURRENCY
}

fn default_fetch_timeout() -> Duration {
    DEFAULT_FETCH_TIMEOUT
}

impl Default for OrchestratorConfig {
    fn default() -> Self {
        Self {
            max_concurrency: DEFAULT_MAX_CONCURRENCY,
            fetch_timeout: DEFAULT_FETCH_TIMEOUT,
        }
    }
}

impl OrchestratorConfig {
    pub fn validate(self) -> Result<Self, ConfigError> {
        if self.max_concurrency == 0 {
            return Err(ConfigError::ZeroConcurrency);
        }
        if self.fetch_timeout.is_zero() {
            return Err(ConfigError::ZeroTimeout);
        }
        Ok(self)
    }
}

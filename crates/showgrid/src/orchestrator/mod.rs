//! Concurrent execution of scrape tasks.

mod config;
mod runner;

pub use config::{ConfigError, OrchestratorConfig};
pub use runner::{Orchestrator, RunEvent};

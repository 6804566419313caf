//! Worker configuration loaded from environment variables
//!
//! Configuration is loaded once at startup. Defaults suit development; the
//! provider URL is the only required setting and comes from the shared
//! [`CommonConfig`].

use std::env;

use anyhow::{Context, Result};
use cadence_shared_config::{CommonConfig, Environment, ProviderConfig, SchedulerConfig};

/// Worker configuration
#[derive(Debug, Clone)]
pub struct Config {
    /// Common configuration shared with other services
    pub common: CommonConfig,

    /// Number of worker tasks draining the queue
    pub worker_count: usize,

    /// Maximum delivery attempts before a job dead-letters
    pub max_retries: u32,

    /// Base delay for re-queue backoff, in milliseconds
    pub retry_delay_ms: u64,

    /// Embedding model routed to by default
    pub embedding_model: String,

    /// Path to the scoring configuration JSON file
    pub scoring_config_path: String,

    /// Listening window aggregated into subject profiles, in weeks
    pub aggregate_window_weeks: u32,
}

impl Config {
    /// Load configuration from environment variables
    pub fn from_env() -> Result<Self> {
        let common = CommonConfig::from_env()
            .map_err(|e| anyhow::anyhow!("Failed to load config: {}", e))?;

        Ok(Self {
            common,

            worker_count: env::var("WORKER_COUNT")
                .unwrap_or_else(|_| "4".to_string())
                .parse()
                .context("Invalid WORKER_COUNT value")?,

            max_retries: env::var("WORKER_MAX_RETRIES")
                .unwrap_or_else(|_| "3".to_string())
                .parse()
                .context("Invalid WORKER_MAX_RETRIES value")?,

            retry_delay_ms: env::var("WORKER_RETRY_DELAY_MS")
                .unwrap_or_else(|_| "1000".to_string())
                .parse()
                .context("Invalid WORKER_RETRY_DELAY_MS value")?,

            embedding_model: env::var("WORKER_EMBEDDING_MODEL")
                .unwrap_or_else(|_| "spectral-v1".to_string()),

            scoring_config_path: env::var("WORKER_SCORING_CONFIG")
                .unwrap_or_else(|_| "scoring.json".to_string()),

            aggregate_window_weeks: env::var("WORKER_AGGREGATE_WINDOW_WEEKS")
                .unwrap_or_else(|_| "4".to_string())
                .parse()
                .context("Invalid WORKER_AGGREGATE_WINDOW_WEEKS value")?,
        })
    }

    // Convenience accessors for common config fields

    pub fn provider(&self) -> &ProviderConfig {
        &self.common.provider
    }

    pub fn scheduler(&self) -> &SchedulerConfig {
        &self.common.scheduler
    }

    pub fn environment(&self) -> Environment {
        self.common.environment
    }

    pub fn is_production(&self) -> bool {
        self.common.environment.is_production()
    }
}

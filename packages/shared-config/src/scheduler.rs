//! Scheduler cadence configuration types

use std::time::Duration;

use crate::{parse_env, ConfigResult};

/// Per-job-type scheduling intervals
///
/// Each job type runs on its own independently tunable cadence. Defaults
/// here are deployment conventions, not API contracts; every value can be
/// overridden through the environment.
#[derive(Debug, Clone)]
pub struct SchedulerConfig {
    /// Minutes between listening-history ingestion rounds
    pub ingest_interval_minutes: u64,

    /// Minutes between weekly-aggregate recomputation rounds
    pub aggregate_interval_minutes: u64,

    /// Minutes between feature-extraction rounds
    pub extract_interval_minutes: u64,

    /// Minutes between axis-score recomputation rounds
    pub embedding_interval_minutes: u64,
}

impl SchedulerConfig {
    /// Load scheduler configuration from environment variables
    pub fn from_env() -> ConfigResult<Self> {
        Ok(Self {
            ingest_interval_minutes: parse_env("INGEST_INTERVAL_MINUTES", 15)?,
            aggregate_interval_minutes: parse_env("AGGREGATE_INTERVAL_MINUTES", 60)?,
            extract_interval_minutes: parse_env("EXTRACT_INTERVAL_MINUTES", 30)?,
            embedding_interval_minutes: parse_env("EMBEDDING_INTERVAL_MINUTES", 60)?,
        })
    }

    /// Ingestion cadence as a [`Duration`]
    pub fn ingest_interval(&self) -> Duration {
        Duration::from_secs(self.ingest_interval_minutes * 60)
    }

    /// Aggregation cadence as a [`Duration`]
    pub fn aggregate_interval(&self) -> Duration {
        Duration::from_secs(self.aggregate_interval_minutes * 60)
    }

    /// Feature-extraction cadence as a [`Duration`]
    pub fn extract_interval(&self) -> Duration {
        Duration::from_secs(self.extract_interval_minutes * 60)
    }

    /// Score-recomputation cadence as a [`Duration`]
    pub fn embedding_interval(&self) -> Duration {
        Duration::from_secs(self.embedding_interval_minutes * 60)
    }
}

impl Default for SchedulerConfig {
    fn default() -> Self {
        Self {
            ingest_interval_minutes: 15,
            aggregate_interval_minutes: 60,
            extract_interval_minutes: 30,
            embedding_interval_minutes: 60,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_intervals() {
        let config = SchedulerConfig::default();
        assert_eq!(config.ingest_interval_minutes, 15);
        assert_eq!(config.aggregate_interval_minutes, 60);
    }

    #[test]
    fn test_interval_conversion() {
        let config = SchedulerConfig::default();
        assert_eq!(config.ingest_interval(), Duration::from_secs(15 * 60));
        assert_eq!(config.aggregate_interval(), Duration::from_secs(3600));
    }
}

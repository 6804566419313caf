//! Job handlers
//!
//! Each handler is an `execute(state, job)` function taking the shared
//! [`AppState`] and the dequeued [`JobDescriptor`]. Handlers are idempotent:
//! the queue is at-least-once and a crashed worker redelivers.

pub mod aggregate_weeks;
pub mod compute_embedding;
pub mod extract_features;
pub mod sync_user;

use crate::error::WorkerResult;
use crate::state::AppState;
use crate::types::{JobDescriptor, JobKind};

/// Route a dequeued job to its handler
pub async fn dispatch(state: &AppState, job: &JobDescriptor) -> WorkerResult<()> {
    match job.kind {
        JobKind::SyncUser => sync_user::execute(state, job).await,
        JobKind::ExtractFeatures => extract_features::execute(state, job).await,
        JobKind::ComputeEmbedding => compute_embedding::execute(state, job).await,
        JobKind::AggregateWeeks => aggregate_weeks::execute(state, job).await,
    }
}

#[cfg(test)]
pub(crate) mod testutil {
    use std::sync::Arc;

    use cadence_history_client::{HistoryClient, RetryPolicy};
    use cadence_shared_config::ProviderConfig;

    use crate::extract::BackendRegistry;
    use crate::scoring::{ScoringConfig, ScoringEngine};
    use crate::state::{AppState, Settings};
    use crate::storage::memory::{MemoryAudioSource, MemoryStorage};

    /// Scoring config matching the spectral backend's 8 dimensions
    pub fn scoring_json() -> String {
        let weights = |idx: usize| {
            let mut w = vec![0.0f32; 8];
            w[idx] = 1.0;
            serde_json::to_string(&w).unwrap()
        };
        format!(
            r#"{{
                "models": {{
                    "spectral-v1": {{
                        "brightness": {},
                        "energy": {}
                    }}
                }},
                "calibrations": {{
                    "brightness": {{ "scale": 2.0, "bias": 0.0 }},
                    "energy": {{ "scale": 1.0, "bias": 0.5 }}
                }}
            }}"#,
            weights(0),
            weights(5)
        )
    }

    pub struct TestHarness {
        pub state: AppState,
        pub storage: MemoryStorage,
        pub audio: MemoryAudioSource,
    }

    /// Build an [`AppState`] over in-memory collaborators, pointed at
    /// `provider_url` (unused by non-ingest handlers)
    pub fn harness(provider_url: &str) -> TestHarness {
        let storage = MemoryStorage::new();
        let audio = MemoryAudioSource::new();

        let provider = ProviderConfig::with_base_url(provider_url);
        let history = HistoryClient::new(&provider)
            .unwrap()
            .with_retry_policy(RetryPolicy::fast());

        let scoring = ScoringConfig::from_json(&scoring_json()).unwrap();
        let engine = ScoringEngine::new(scoring).unwrap();

        let state = AppState::new(
            Arc::new(storage.clone()),
            Arc::new(audio.clone()),
            history,
            BackendRegistry::with_defaults(),
            Arc::new(engine),
            Settings {
                embedding_model: "spectral-v1".to_string(),
                aggregate_window_weeks: 4,
                page_limit: 100,
                auth_token: None,
            },
        );

        TestHarness {
            state,
            storage,
            audio,
        }
    }
}

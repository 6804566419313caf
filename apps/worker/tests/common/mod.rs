//! Shared fixtures for integration tests

pub mod mocks;

use std::sync::Arc;

use cadence_history_client::{HistoryClient, RetryPolicy};
use cadence_shared_config::ProviderConfig;
use cadence_worker::extract::BackendRegistry;
use cadence_worker::scoring::{ScoringConfig, ScoringEngine};
use cadence_worker::storage::memory::{MemoryAudioSource, MemoryStorage};
use cadence_worker::{AppState, Settings};

/// Scoring configuration matching the spectral backend's 8 dimensions:
/// brightness reads the normalized centroid, energy reads mean RMS.
pub fn scoring_json() -> &'static str {
    r#"{
        "models": {
            "spectral-v1": {
                "brightness": [1.0, 0.0, 0.0, 0.0, 0.0, 0.0, 0.0, 0.0],
                "energy":     [0.0, 0.0, 0.0, 0.0, 0.0, 1.0, 0.0, 0.0]
            }
        },
        "calibrations": {
            "brightness": { "scale": 2.0, "bias": 0.0 },
            "energy":     { "scale": 1.0, "bias": 0.0 }
        }
    }"#
}

/// A full pipeline wired over in-memory collaborators
pub struct TestPipeline {
    pub state: AppState,
    pub storage: MemoryStorage,
    pub audio: MemoryAudioSource,
}

/// Build an [`AppState`] pointed at `provider_url`
pub fn pipeline(provider_url: &str) -> TestPipeline {
    let storage = MemoryStorage::new();
    let audio = MemoryAudioSource::new();

    let provider = ProviderConfig::with_base_url(provider_url);
    let history = HistoryClient::new(&provider)
        .expect("client construction")
        .with_retry_policy(RetryPolicy::fast());

    let scoring = ScoringConfig::from_json(scoring_json()).expect("scoring config");
    let engine = ScoringEngine::new(scoring).expect("scoring engine");

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

    TestPipeline {
        state,
        storage,
        audio,
    }
}

//! Shared application state handed to every job handler

use std::sync::Arc;

use cadence_history_client::HistoryClient;

use crate::extract::BackendRegistry;
use crate::scoring::ScoringEngine;
use crate::storage::{AudioSource, Storage};

/// Everything a job handler needs, shared across the pool behind `Arc`s
#[derive(Clone)]
pub struct AppState {
    /// Persistence boundary
    pub storage: Arc<dyn Storage>,

    /// Audio access for feature extraction
    pub audio: Arc<dyn AudioSource>,

    /// Listening-history provider client
    pub history: HistoryClient,

    /// Embedding backends keyed by model name
    pub backends: BackendRegistry,

    /// Immutable scoring engine
    pub scoring: Arc<ScoringEngine>,

    /// Tunables copied out of [`crate::config::Config`]
    pub settings: Settings,
}

/// Per-pipeline tunables the handlers read
#[derive(Debug, Clone)]
pub struct Settings {
    /// Embedding model routed to by default
    pub embedding_model: String,

    /// Listening window aggregated into subject profiles, in weeks
    pub aggregate_window_weeks: u32,

    /// Page size requested from the history provider
    pub page_limit: u32,

    /// Token forwarded to the provider, if configured
    pub auth_token: Option<String>,
}

impl AppState {
    pub fn new(
        storage: Arc<dyn Storage>,
        audio: Arc<dyn AudioSource>,
        history: HistoryClient,
        backends: BackendRegistry,
        scoring: Arc<ScoringEngine>,
        settings: Settings,
    ) -> Self {
        Self {
            storage,
            audio,
            history,
            backends,
            scoring,
            settings,
        }
    }
}

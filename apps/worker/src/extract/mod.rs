//! Embedding extraction backends
//!
//! A backend turns decoded audio into a fixed-length embedding for one
//! model version. Backends are registered by model name so the pipeline can
//! route feature vectors to the matching backend, and so new model versions
//! can coexist with old ones.

mod chroma;
mod spectral;

pub use chroma::ChromaBackend;
pub use spectral::SpectralBackend;

use std::collections::HashMap;
use std::sync::Arc;

use crate::error::{WorkerError, WorkerResult};

/// One embedding model version
pub trait EmbeddingBackend: Send + Sync {
    /// Stable model identifier stored alongside every vector it produces
    fn model_id(&self) -> &'static str;

    /// Length of the vectors this backend emits
    fn dimensions(&self) -> usize;

    /// Compute an embedding from mono samples
    fn embed(&self, samples: &[f32], sample_rate: u32) -> WorkerResult<Vec<f32>>;
}

impl std::fmt::Debug for dyn EmbeddingBackend {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("EmbeddingBackend")
            .field("model_id", &self.model_id())
            .finish()
    }
}

/// Model-name to backend routing table
#[derive(Clone, Default)]
pub struct BackendRegistry {
    backends: HashMap<&'static str, Arc<dyn EmbeddingBackend>>,
}

impl BackendRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Registry with every built-in backend
    pub fn with_defaults() -> Self {
        let mut registry = Self::new();
        registry.register(Arc::new(SpectralBackend::new()));
        registry.register(Arc::new(ChromaBackend::new()));
        registry
    }

    pub fn register(&mut self, backend: Arc<dyn EmbeddingBackend>) {
        self.backends.insert(backend.model_id(), backend);
    }

    pub fn get(&self, model: &str) -> WorkerResult<Arc<dyn EmbeddingBackend>> {
        self.backends
            .get(model)
            .cloned()
            .ok_or_else(|| WorkerError::UnknownBackend(model.to_string()))
    }

    pub fn model_ids(&self) -> Vec<&'static str> {
        self.backends.keys().copied().collect()
    }
}

/// Shared input validation for all backends
fn check_audio(samples: &[f32], sample_rate: u32) -> WorkerResult<()> {
    if samples.is_empty() {
        return Err(WorkerError::InvalidAudioData("empty sample buffer".into()));
    }
    if sample_rate == 0 {
        return Err(WorkerError::InvalidAudioData("zero sample rate".into()));
    }
    Ok(())
}

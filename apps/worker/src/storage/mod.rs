//! Injected collaborator boundaries: persistence and audio access
//!
//! The relational schema and its migrations live outside this service. The
//! pipeline only sees these traits; anything implementing them can back the
//! worker. [`memory`] provides the in-memory implementation used in
//! development mode and tests.

pub mod memory;

use async_trait::async_trait;
use chrono::{DateTime, Utc};

use crate::error::WorkerResult;
use crate::types::{AxisScore, FeatureVector, JobKind, RawListen};

/// Persistence boundary for the pipeline
#[async_trait]
pub trait Storage: Send + Sync {
    /// Subjects the scheduler should currently produce work for
    async fn load_active_subjects(&self) -> WorkerResult<Vec<String>>;

    /// Opaque continuation token for a subject/job-type pair
    async fn get_cursor(&self, subject_id: &str, kind: JobKind) -> WorkerResult<Option<String>>;

    /// Advance the continuation token
    async fn set_cursor(&self, subject_id: &str, kind: JobKind, cursor: &str) -> WorkerResult<()>;

    /// Persist listens, deduplicating by
    /// `(subject_id, external_track_ref, played_at)`; returns how many were
    /// newly inserted
    async fn persist_listens(&self, listens: &[RawListen]) -> WorkerResult<usize>;

    /// Track refs for a subject's listens since the given instant, one
    /// entry per listen so repeat plays carry weight
    async fn listens_in_window(
        &self,
        subject_id: &str,
        since: DateTime<Utc>,
    ) -> WorkerResult<Vec<String>>;

    /// Track refs for a subject with no stored feature vector under `model`
    async fn tracks_missing_features(
        &self,
        subject_id: &str,
        model: &str,
    ) -> WorkerResult<Vec<String>>;

    /// Track refs for a subject that do have a feature vector under `model`
    async fn tracks_with_features(
        &self,
        subject_id: &str,
        model: &str,
    ) -> WorkerResult<Vec<String>>;

    /// Upsert a feature vector, unique per `(track_ref, model)`
    async fn persist_feature_vector(&self, vector: &FeatureVector) -> WorkerResult<()>;

    /// Load a feature vector by its uniqueness key
    async fn load_feature_vector(
        &self,
        track_ref: &str,
        model: &str,
    ) -> WorkerResult<Option<FeatureVector>>;

    /// Replace the axis scores for one track (derived data, idempotent)
    async fn persist_track_scores(
        &self,
        track_ref: &str,
        scores: &[AxisScore],
    ) -> WorkerResult<()>;

    /// Load the axis scores for one track
    async fn load_track_scores(&self, track_ref: &str) -> WorkerResult<Vec<AxisScore>>;

    /// Replace a subject's aggregated axis profile (derived data)
    async fn persist_subject_profile(
        &self,
        subject_id: &str,
        scores: &[AxisScore],
    ) -> WorkerResult<()>;
}

/// Decoded audio for one track
#[derive(Debug, Clone)]
pub struct AudioClip {
    pub samples: Vec<f32>,
    pub sample_rate: u32,
}

/// Audio access boundary for feature extraction
#[async_trait]
pub trait AudioSource: Send + Sync {
    /// Load decoded samples for a track; a missing or undecodable track is
    /// a data error (dead-letter, no retry)
    async fn load_audio(&self, track_ref: &str) -> WorkerResult<AudioClip>;
}

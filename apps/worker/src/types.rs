//! Core pipeline data types
//!
//! Jobs are identified by `(kind, subject_id)`; at most one descriptor per
//! identity key may be queued or running at any instant. Everything the
//! pipeline derives (axis scores) is recomputable from feature vectors plus
//! the scoring configuration and is never the source of truth.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// The job types the pipeline schedules and executes
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum JobKind {
    /// Pull new listens for a subject from the history provider
    SyncUser,
    /// Fold recent listens into a per-subject axis profile
    AggregateWeeks,
    /// Produce feature vectors for newly seen tracks
    ExtractFeatures,
    /// Project stored feature vectors into per-track axis scores
    ComputeEmbedding,
}

impl JobKind {
    /// All kinds, in scheduling order
    pub const ALL: [JobKind; 4] = [
        JobKind::SyncUser,
        JobKind::ExtractFeatures,
        JobKind::ComputeEmbedding,
        JobKind::AggregateWeeks,
    ];

    /// Stable string form used in identity keys and logs
    pub fn as_str(&self) -> &'static str {
        match self {
            JobKind::SyncUser => "sync_user",
            JobKind::AggregateWeeks => "aggregate_weeks",
            JobKind::ExtractFeatures => "extract_features",
            JobKind::ComputeEmbedding => "compute_embedding",
        }
    }
}

impl std::fmt::Display for JobKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Deduplication identity key for queued work
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct JobKey {
    pub kind: JobKind,
    pub subject_id: String,
}

impl std::fmt::Display for JobKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}:{}", self.kind, self.subject_id)
    }
}

/// A unit of queued work
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct JobDescriptor {
    /// Unique per enqueue, used for in-flight tracking
    pub id: Uuid,
    pub kind: JobKind,
    pub subject_id: String,
    /// Opaque continuation token, when the scheduler has one
    pub cursor: Option<String>,
    pub enqueued_at: DateTime<Utc>,
    /// Delivery attempts made so far
    pub attempts: u32,
}

impl JobDescriptor {
    pub fn new(kind: JobKind, subject_id: impl Into<String>) -> Self {
        Self {
            id: Uuid::new_v4(),
            kind,
            subject_id: subject_id.into(),
            cursor: None,
            enqueued_at: Utc::now(),
            attempts: 0,
        }
    }

    /// The deduplication identity key
    pub fn key(&self) -> JobKey {
        JobKey {
            kind: self.kind,
            subject_id: self.subject_id.clone(),
        }
    }
}

/// A single listen event, immutable once persisted
///
/// Storage deduplicates by `(subject_id, external_track_ref, played_at)`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RawListen {
    pub subject_id: String,
    pub external_track_ref: String,
    pub played_at: DateTime<Utc>,
    pub source: String,
    pub raw_metadata: serde_json::Map<String, serde_json::Value>,
}

/// Provenance of the audio a feature vector was computed from
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FeatureSource {
    Full,
    Excerpt,
    Stem,
}

/// A fixed-length embedding for one track under one model
///
/// Unique per `(track_ref, model)` at the storage boundary.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FeatureVector {
    pub track_ref: String,
    pub source: FeatureSource,
    pub model: String,
    pub values: Vec<f32>,
}

/// What an axis score describes
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case", tag = "target_kind", content = "target")]
pub enum ScoreTarget {
    Track(String),
    Subject(String),
}

/// A calibrated projection of an embedding onto one semantic axis
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AxisScore {
    pub target: ScoreTarget,
    pub axis: String,
    pub raw_score: f32,
    /// `raw_score * scale + bias`
    pub calibrated_score: f32,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_job_kind_serde_snake_case() {
        assert_eq!(
            serde_json::to_string(&JobKind::SyncUser).unwrap(),
            "\"sync_user\""
        );
        let kind: JobKind = serde_json::from_str("\"aggregate_weeks\"").unwrap();
        assert_eq!(kind, JobKind::AggregateWeeks);
    }

    #[test]
    fn test_identity_key_is_stable_across_descriptors() {
        let a = JobDescriptor::new(JobKind::SyncUser, "u1");
        let b = JobDescriptor::new(JobKind::SyncUser, "u1");
        assert_ne!(a.id, b.id);
        assert_eq!(a.key(), b.key());
    }

    #[test]
    fn test_identity_key_separates_kinds_and_subjects() {
        let sync = JobDescriptor::new(JobKind::SyncUser, "u1").key();
        let agg = JobDescriptor::new(JobKind::AggregateWeeks, "u1").key();
        let other = JobDescriptor::new(JobKind::SyncUser, "u2").key();
        assert_ne!(sync, agg);
        assert_ne!(sync, other);
        assert_eq!(sync.to_string(), "sync_user:u1");
    }
}

//! In-memory storage and audio source
//!
//! Backs the worker in development mode and in tests. All maps live behind
//! one mutex; the handles are cheap clones sharing state.

use std::collections::{BTreeMap, HashMap, HashSet};
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use chrono::{DateTime, Utc};

use crate::error::{WorkerError, WorkerResult};
use crate::storage::{AudioClip, AudioSource, Storage};
use crate::types::{AxisScore, FeatureVector, JobKind, RawListen};

#[derive(Default)]
struct MemoryState {
    active_subjects: Vec<String>,
    cursors: HashMap<(String, JobKind), String>,
    /// Dedup set mirroring the listen uniqueness constraint
    listen_keys: HashSet<(String, String, i64)>,
    listens: Vec<RawListen>,
    /// Keyed by (track_ref, model)
    features: BTreeMap<(String, String), FeatureVector>,
    track_scores: HashMap<String, Vec<AxisScore>>,
    subject_profiles: HashMap<String, Vec<AxisScore>>,
}

/// Shared in-memory [`Storage`] implementation
#[derive(Clone, Default)]
pub struct MemoryStorage {
    state: Arc<Mutex<MemoryState>>,
}

impl MemoryStorage {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a subject so the scheduler picks it up
    pub fn add_subject(&self, subject_id: impl Into<String>) {
        let mut state = self.state.lock().unwrap();
        let subject_id = subject_id.into();
        if !state.active_subjects.contains(&subject_id) {
            state.active_subjects.push(subject_id);
        }
    }

    /// Total listens stored (test observability)
    pub fn listen_count(&self) -> usize {
        self.state.lock().unwrap().listens.len()
    }

    /// Listens stored for one subject (test observability)
    pub fn listens_for(&self, subject_id: &str) -> Vec<RawListen> {
        self.state
            .lock()
            .unwrap()
            .listens
            .iter()
            .filter(|l| l.subject_id == subject_id)
            .cloned()
            .collect()
    }

    /// A subject's aggregated profile (test observability)
    pub fn subject_profile(&self, subject_id: &str) -> Option<Vec<AxisScore>> {
        self.state
            .lock()
            .unwrap()
            .subject_profiles
            .get(subject_id)
            .cloned()
    }
}

#[async_trait]
impl Storage for MemoryStorage {
    async fn load_active_subjects(&self) -> WorkerResult<Vec<String>> {
        Ok(self.state.lock().unwrap().active_subjects.clone())
    }

    async fn get_cursor(&self, subject_id: &str, kind: JobKind) -> WorkerResult<Option<String>> {
        Ok(self
            .state
            .lock()
            .unwrap()
            .cursors
            .get(&(subject_id.to_string(), kind))
            .cloned())
    }

    async fn set_cursor(&self, subject_id: &str, kind: JobKind, cursor: &str) -> WorkerResult<()> {
        self.state
            .lock()
            .unwrap()
            .cursors
            .insert((subject_id.to_string(), kind), cursor.to_string());
        Ok(())
    }

    async fn persist_listens(&self, listens: &[RawListen]) -> WorkerResult<usize> {
        let mut state = self.state.lock().unwrap();
        let mut inserted = 0;
        for listen in listens {
            let key = (
                listen.subject_id.clone(),
                listen.external_track_ref.clone(),
                listen.played_at.timestamp(),
            );
            if state.listen_keys.insert(key) {
                state.listens.push(listen.clone());
                inserted += 1;
            }
        }
        Ok(inserted)
    }

    async fn listens_in_window(
        &self,
        subject_id: &str,
        since: DateTime<Utc>,
    ) -> WorkerResult<Vec<String>> {
        let state = self.state.lock().unwrap();
        Ok(state
            .listens
            .iter()
            .filter(|l| l.subject_id == subject_id && l.played_at >= since)
            .map(|l| l.external_track_ref.clone())
            .collect())
    }

    async fn tracks_missing_features(
        &self,
        subject_id: &str,
        model: &str,
    ) -> WorkerResult<Vec<String>> {
        let state = self.state.lock().unwrap();
        let mut seen = HashSet::new();
        let mut refs = Vec::new();
        for listen in &state.listens {
            if listen.subject_id == subject_id
                && seen.insert(listen.external_track_ref.clone())
                && !state
                    .features
                    .contains_key(&(listen.external_track_ref.clone(), model.to_string()))
            {
                refs.push(listen.external_track_ref.clone());
            }
        }
        Ok(refs)
    }

    async fn tracks_with_features(
        &self,
        subject_id: &str,
        model: &str,
    ) -> WorkerResult<Vec<String>> {
        let state = self.state.lock().unwrap();
        let mut seen = HashSet::new();
        let mut refs = Vec::new();
        for listen in &state.listens {
            if listen.subject_id == subject_id
                && seen.insert(listen.external_track_ref.clone())
                && state
                    .features
                    .contains_key(&(listen.external_track_ref.clone(), model.to_string()))
            {
                refs.push(listen.external_track_ref.clone());
            }
        }
        Ok(refs)
    }

    async fn persist_feature_vector(&self, vector: &FeatureVector) -> WorkerResult<()> {
        self.state.lock().unwrap().features.insert(
            (vector.track_ref.clone(), vector.model.clone()),
            vector.clone(),
        );
        Ok(())
    }

    async fn load_feature_vector(
        &self,
        track_ref: &str,
        model: &str,
    ) -> WorkerResult<Option<FeatureVector>> {
        Ok(self
            .state
            .lock()
            .unwrap()
            .features
            .get(&(track_ref.to_string(), model.to_string()))
            .cloned())
    }

    async fn persist_track_scores(
        &self,
        track_ref: &str,
        scores: &[AxisScore],
    ) -> WorkerResult<()> {
        self.state
            .lock()
            .unwrap()
            .track_scores
            .insert(track_ref.to_string(), scores.to_vec());
        Ok(())
    }

    async fn load_track_scores(&self, track_ref: &str) -> WorkerResult<Vec<AxisScore>> {
        Ok(self
            .state
            .lock()
            .unwrap()
            .track_scores
            .get(track_ref)
            .cloned()
            .unwrap_or_default())
    }

    async fn persist_subject_profile(
        &self,
        subject_id: &str,
        scores: &[AxisScore],
    ) -> WorkerResult<()> {
        self.state
            .lock()
            .unwrap()
            .subject_profiles
            .insert(subject_id.to_string(), scores.to_vec());
        Ok(())
    }
}

/// In-memory [`AudioSource`] with registered clips
#[derive(Clone, Default)]
pub struct MemoryAudioSource {
    clips: Arc<Mutex<HashMap<String, AudioClip>>>,
}

impl MemoryAudioSource {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a decoded clip for a track
    pub fn add_clip(&self, track_ref: impl Into<String>, samples: Vec<f32>, sample_rate: u32) {
        self.clips.lock().unwrap().insert(
            track_ref.into(),
            AudioClip {
                samples,
                sample_rate,
            },
        );
    }

    /// Register a synthetic sine clip, handy for exercising the backends
    pub fn add_sine_clip(&self, track_ref: impl Into<String>, freq_hz: f32, secs: f32) {
        let sample_rate = 22_050u32;
        let total = (sample_rate as f32 * secs) as usize;
        let samples: Vec<f32> = (0..total)
            .map(|i| {
                let t = i as f32 / sample_rate as f32;
                (2.0 * std::f32::consts::PI * freq_hz * t).sin()
            })
            .collect();
        self.add_clip(track_ref, samples, sample_rate);
    }
}

#[async_trait]
impl AudioSource for MemoryAudioSource {
    async fn load_audio(&self, track_ref: &str) -> WorkerResult<AudioClip> {
        self.clips
            .lock()
            .unwrap()
            .get(track_ref)
            .cloned()
            .ok_or_else(|| WorkerError::audio_unavailable(track_ref, "no clip registered"))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::FeatureSource;
    use chrono::TimeZone;

    fn listen(subject: &str, track: &str, ts: i64) -> RawListen {
        RawListen {
            subject_id: subject.to_string(),
            external_track_ref: track.to_string(),
            played_at: Utc.timestamp_opt(ts, 0).unwrap(),
            source: "test".to_string(),
            raw_metadata: serde_json::Map::new(),
        }
    }

    #[tokio::test]
    async fn test_persist_listens_deduplicates() {
        let storage = MemoryStorage::new();
        let batch = vec![
            listen("u1", "trk:a", 100),
            listen("u1", "trk:a", 100), // exact duplicate
            listen("u1", "trk:a", 200), // same track, later play
        ];

        let inserted = storage.persist_listens(&batch).await.unwrap();
        assert_eq!(inserted, 2);

        // Replays of the same batch insert nothing
        let inserted = storage.persist_listens(&batch).await.unwrap();
        assert_eq!(inserted, 0);
        assert_eq!(storage.listen_count(), 2);
    }

    #[tokio::test]
    async fn test_cursor_roundtrip() {
        let storage = MemoryStorage::new();
        assert!(storage
            .get_cursor("u1", JobKind::SyncUser)
            .await
            .unwrap()
            .is_none());

        storage
            .set_cursor("u1", JobKind::SyncUser, "1700000000")
            .await
            .unwrap();
        assert_eq!(
            storage.get_cursor("u1", JobKind::SyncUser).await.unwrap(),
            Some("1700000000".to_string())
        );
        // Cursors are scoped per job type
        assert!(storage
            .get_cursor("u1", JobKind::AggregateWeeks)
            .await
            .unwrap()
            .is_none());
    }

    #[tokio::test]
    async fn test_feature_tracking() {
        let storage = MemoryStorage::new();
        storage
            .persist_listens(&[listen("u1", "trk:a", 100), listen("u1", "trk:b", 200)])
            .await
            .unwrap();

        let missing = storage
            .tracks_missing_features("u1", "spectral-v1")
            .await
            .unwrap();
        assert_eq!(missing, vec!["trk:a", "trk:b"]);

        storage
            .persist_feature_vector(&FeatureVector {
                track_ref: "trk:a".to_string(),
                source: FeatureSource::Full,
                model: "spectral-v1".to_string(),
                values: vec![0.0; 4],
            })
            .await
            .unwrap();

        let missing = storage
            .tracks_missing_features("u1", "spectral-v1")
            .await
            .unwrap();
        assert_eq!(missing, vec!["trk:b"]);
        let with = storage
            .tracks_with_features("u1", "spectral-v1")
            .await
            .unwrap();
        assert_eq!(with, vec!["trk:a"]);
    }

    #[tokio::test]
    async fn test_audio_source_missing_clip_is_data_error() {
        let audio = MemoryAudioSource::new();
        let err = audio.load_audio("trk:missing").await.unwrap_err();
        assert!(!err.is_retryable());
    }
}

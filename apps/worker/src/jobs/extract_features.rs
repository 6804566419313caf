//! Feature extraction job
//!
//! Finds a subject's tracks with no stored feature vector under the
//! configured model, loads their audio, and runs the embedding backend.
//! Per-track data failures (missing audio, undecodable clips) are logged
//! and skipped so one bad track cannot starve the rest of the batch;
//! re-runs retry nothing that already has a vector.

use crate::error::WorkerResult;
use crate::state::AppState;
use crate::types::{FeatureSource, FeatureVector, JobDescriptor};

/// Execute feature extraction for one subject's backlog
pub async fn execute(state: &AppState, job: &JobDescriptor) -> WorkerResult<()> {
    let subject_id = &job.subject_id;
    let model = &state.settings.embedding_model;
    let backend = state.backends.get(model)?;

    let pending = state
        .storage
        .tracks_missing_features(subject_id, model)
        .await?;

    if pending.is_empty() {
        tracing::debug!(subject = %subject_id, model = %model, "No tracks need features");
        return Ok(());
    }

    tracing::info!(
        subject = %subject_id,
        model = %model,
        pending = pending.len(),
        "Extracting features"
    );

    let mut extracted = 0usize;
    let mut skipped = 0usize;

    for track_ref in &pending {
        let clip = match state.audio.load_audio(track_ref).await {
            Ok(clip) => clip,
            Err(e) if !e.is_retryable() => {
                tracing::warn!(track = %track_ref, error = %e, "Skipping track without audio");
                skipped += 1;
                continue;
            }
            Err(e) => return Err(e),
        };

        let values = match backend.embed(&clip.samples, clip.sample_rate) {
            Ok(values) => values,
            Err(e) if !e.is_retryable() => {
                tracing::warn!(track = %track_ref, error = %e, "Skipping unusable audio");
                skipped += 1;
                continue;
            }
            Err(e) => return Err(e),
        };

        state
            .storage
            .persist_feature_vector(&FeatureVector {
                track_ref: track_ref.clone(),
                source: FeatureSource::Full,
                model: model.clone(),
                values,
            })
            .await?;
        extracted += 1;
    }

    tracing::info!(
        subject = %subject_id,
        extracted,
        skipped,
        "Feature extraction complete"
    );
    Ok(())
}

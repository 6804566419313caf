//! Track scoring job
//!
//! Projects stored feature vectors into per-track axis scores through the
//! scoring engine. Scores are derived data: every run recomputes and
//! overwrites them, so a changed calibration or weight set propagates on
//! the next pass after restart with no migration step.

use crate::error::{WorkerError, WorkerResult};
use crate::state::AppState;
use crate::types::{JobDescriptor, ScoreTarget};

/// Execute scoring for one subject's tracks with stored features
pub async fn execute(state: &AppState, job: &JobDescriptor) -> WorkerResult<()> {
    let subject_id = &job.subject_id;
    let model = &state.settings.embedding_model;

    let tracks = state
        .storage
        .tracks_with_features(subject_id, model)
        .await?;

    if tracks.is_empty() {
        tracing::debug!(subject = %subject_id, model = %model, "No feature vectors to score");
        return Ok(());
    }

    let mut scored = 0usize;
    for track_ref in &tracks {
        let vector = state
            .storage
            .load_feature_vector(track_ref, model)
            .await?
            .ok_or_else(|| {
                WorkerError::NotFound(format!("feature vector for '{track_ref}' under '{model}'"))
            })?;

        let target = ScoreTarget::Track(track_ref.clone());
        let scores = state.scoring.score_all(model, &target, &vector.values)?;
        state.storage.persist_track_scores(track_ref, &scores).await?;
        scored += 1;
    }

    tracing::info!(
        subject = %subject_id,
        model = %model,
        scored,
        "Track scoring complete"
    );
    Ok(())
}

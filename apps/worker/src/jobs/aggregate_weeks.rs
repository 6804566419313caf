//! Subject profile aggregation job
//!
//! Folds a subject's recent listening window into one averaged axis
//! profile. Each listened track contributes its axis scores once per
//! listen, so heavy rotation weighs more than a single play. The profile
//! is derived data and replaced wholesale on every run.

use std::collections::BTreeMap;

use chrono::{Duration, Utc};

use crate::error::WorkerResult;
use crate::state::AppState;
use crate::types::{AxisScore, JobDescriptor, ScoreTarget};

/// Execute profile aggregation for one subject
pub async fn execute(state: &AppState, job: &JobDescriptor) -> WorkerResult<()> {
    let subject_id = &job.subject_id;
    let window_weeks = state.settings.aggregate_window_weeks;
    let since = Utc::now() - Duration::weeks(window_weeks as i64);

    let listens = state.storage.listens_in_window(subject_id, since).await?;
    if listens.is_empty() {
        tracing::debug!(subject = %subject_id, weeks = window_weeks, "No listens in window");
        return Ok(());
    }

    // Running (sum_raw, sum_calibrated, count) per axis
    let mut sums: BTreeMap<String, (f32, f32, u32)> = BTreeMap::new();
    let mut unscored = 0usize;

    for track_ref in &listens {
        let scores = state.storage.load_track_scores(track_ref).await?;
        if scores.is_empty() {
            unscored += 1;
            continue;
        }
        for score in scores {
            let entry = sums.entry(score.axis).or_insert((0.0, 0.0, 0));
            entry.0 += score.raw_score;
            entry.1 += score.calibrated_score;
            entry.2 += 1;
        }
    }

    if sums.is_empty() {
        tracing::info!(
            subject = %subject_id,
            listens = listens.len(),
            "No scored tracks in window yet, skipping profile"
        );
        return Ok(());
    }

    let target = ScoreTarget::Subject(subject_id.clone());
    let profile: Vec<AxisScore> = sums
        .into_iter()
        .map(|(axis, (raw_sum, cal_sum, count))| AxisScore {
            target: target.clone(),
            axis,
            raw_score: raw_sum / count as f32,
            calibrated_score: cal_sum / count as f32,
        })
        .collect();

    state
        .storage
        .persist_subject_profile(subject_id, &profile)
        .await?;

    tracing::info!(
        subject = %subject_id,
        weeks = window_weeks,
        listens = listens.len(),
        unscored,
        axes = profile.len(),
        "Profile aggregation complete"
    );
    Ok(())
}

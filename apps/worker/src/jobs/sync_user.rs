//! Listening-history ingestion job
//!
//! Pulls new listens for one subject from the history provider, persists
//! them with storage-level deduplication, and advances the subject's cursor
//! to the newest listen seen. The cursor only moves after a successful
//! persist, so a crashed run replays a window and the dedup constraint
//! absorbs the overlap.

use chrono::{TimeZone, Utc};

use crate::error::{WorkerError, WorkerResult};
use crate::state::AppState;
use crate::types::{JobDescriptor, JobKind, RawListen};

/// Execute a history sync for one subject
pub async fn execute(state: &AppState, job: &JobDescriptor) -> WorkerResult<()> {
    let subject_id = &job.subject_id;

    let since_cursor = match state.storage.get_cursor(subject_id, JobKind::SyncUser).await? {
        Some(raw) => Some(parse_cursor(&raw)?),
        None => None,
    };

    tracing::info!(
        subject = %subject_id,
        since = ?since_cursor,
        "Syncing listening history"
    );

    let listens = state
        .history
        .fetch_listens(
            subject_id,
            since_cursor,
            state.settings.auth_token.as_deref(),
            state.settings.page_limit,
        )
        .await?;

    if listens.is_empty() {
        tracing::debug!(subject = %subject_id, "No new listens");
        return Ok(());
    }

    let newest = listens
        .iter()
        .map(|l| l.listened_at.timestamp())
        .max()
        .unwrap_or_default();

    let raw: Vec<RawListen> = listens
        .into_iter()
        .map(|l| RawListen {
            subject_id: subject_id.clone(),
            external_track_ref: l.track_ref,
            played_at: l.listened_at,
            source: l.source,
            raw_metadata: l.metadata,
        })
        .collect();

    let fetched = raw.len();
    let inserted = state.storage.persist_listens(&raw).await?;

    // Never move the cursor backwards on an overlapping fetch
    let next_cursor = since_cursor.map_or(newest, |c| c.max(newest));
    state
        .storage
        .set_cursor(subject_id, JobKind::SyncUser, &next_cursor.to_string())
        .await?;

    tracing::info!(
        subject = %subject_id,
        fetched,
        inserted,
        cursor = next_cursor,
        "History sync complete"
    );

    Ok(())
}

/// Cursors are unix seconds in string form; anything else is corrupt state
fn parse_cursor(raw: &str) -> WorkerResult<i64> {
    let ts: i64 = raw
        .parse()
        .map_err(|_| WorkerError::InvalidPayload(format!("bad sync cursor: '{raw}'")))?;
    // Sanity bound so a corrupt value cannot silently pin the window
    if Utc.timestamp_opt(ts, 0).single().is_none() {
        return Err(WorkerError::InvalidPayload(format!(
            "sync cursor out of range: {ts}"
        )));
    }
    Ok(ts)
}

//! Recurring job production
//!
//! One scheduler task owns a timer per job type and submits a descriptor
//! per active subject on every tick. Submission goes through the queue's
//! identity-key dedup, so a slow pipeline makes ticks cheap no-ops instead
//! of piling up duplicates. A tick that cannot load the subject list is
//! skipped whole; the next tick retries from scratch.

use std::sync::Arc;

use cadence_shared_config::SchedulerConfig;
use tokio::sync::watch;
use tokio::time::{interval, MissedTickBehavior};

use crate::error::WorkerResult;
use crate::queue::JobQueue;
use crate::storage::Storage;
use crate::types::{JobDescriptor, JobKind};

/// What one scheduling pass did
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct ScheduleOutcome {
    /// Descriptors accepted by the queue
    pub submitted: usize,
    /// Subjects whose key was already queued or running
    pub deduplicated: usize,
}

pub struct Scheduler {
    storage: Arc<dyn Storage>,
    queue: JobQueue,
}

impl Scheduler {
    pub fn new(storage: Arc<dyn Storage>, queue: JobQueue) -> Self {
        Self { storage, queue }
    }

    /// Submit one job of `kind` per active subject
    ///
    /// Safe to call at any time: re-invoking while earlier jobs are still
    /// queued or running only bumps the dedup count.
    pub async fn schedule_jobs(&self, kind: JobKind) -> WorkerResult<ScheduleOutcome> {
        let subjects = self.storage.load_active_subjects().await?;

        let mut outcome = ScheduleOutcome::default();
        for subject_id in subjects {
            if self.queue.enqueue(JobDescriptor::new(kind, subject_id)) {
                outcome.submitted += 1;
            } else {
                outcome.deduplicated += 1;
            }
        }
        Ok(outcome)
    }

    /// Run the timer loop until `shutdown` flips to true
    pub async fn run(self, config: SchedulerConfig, mut shutdown: watch::Receiver<bool>) {
        let mut ingest = interval(config.ingest_interval());
        let mut extract = interval(config.extract_interval());
        let mut embedding = interval(config.embedding_interval());
        let mut aggregate = interval(config.aggregate_interval());
        for timer in [&mut ingest, &mut extract, &mut embedding, &mut aggregate] {
            timer.set_missed_tick_behavior(MissedTickBehavior::Skip);
        }

        tracing::info!(
            ingest_minutes = config.ingest_interval_minutes,
            extract_minutes = config.extract_interval_minutes,
            embedding_minutes = config.embedding_interval_minutes,
            aggregate_minutes = config.aggregate_interval_minutes,
            "Scheduler started"
        );

        loop {
            tokio::select! {
                _ = ingest.tick() => self.tick(JobKind::SyncUser).await,
                _ = extract.tick() => self.tick(JobKind::ExtractFeatures).await,
                _ = embedding.tick() => self.tick(JobKind::ComputeEmbedding).await,
                _ = aggregate.tick() => self.tick(JobKind::AggregateWeeks).await,
                _ = shutdown.changed() => {
                    if *shutdown.borrow() {
                        tracing::info!("Scheduler stopping");
                        break;
                    }
                }
            }
        }
    }

    async fn tick(&self, kind: JobKind) {
        match self.schedule_jobs(kind).await {
            Ok(outcome) => {
                tracing::debug!(
                    kind = %kind,
                    submitted = outcome.submitted,
                    deduplicated = outcome.deduplicated,
                    "Scheduling tick"
                );
            }
            Err(e) => {
                tracing::warn!(kind = %kind, error = %e, "Skipping scheduling tick");
            }
        }
    }
}

//! In-process job queue with identity-key deduplication
//!
//! Delivery is at-least-once: a descriptor accepted by [`JobQueue::enqueue`]
//! stays tracked until it is acked, dead-lettered, or the process exits. A
//! worker that fails mid-job (including a panic caught by the pool) nacks
//! the descriptor and it is re-delivered to another worker.
//!
//! Ordering is FIFO by arrival, which gives per-kind FIFO as a best-effort
//! guarantee; there is no cross-kind ordering promise since job kinds are
//! independent pipelines.

use std::collections::{HashMap, HashSet, VecDeque};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use chrono::{DateTime, Utc};
use tokio::sync::Notify;
use uuid::Uuid;

use crate::types::{JobDescriptor, JobKey};

/// Default total delivery attempts before a job dead-letters
pub const DEFAULT_MAX_ATTEMPTS: u32 = 3;

/// Default base delay before a nacked job is re-queued
const DEFAULT_RETRY_BASE_DELAY: Duration = Duration::from_secs(1);

/// Re-queue delays are capped at base * this factor (1x, 2x, 4x, 4x, ...)
const RETRY_DELAY_CAP_FACTOR: u32 = 4;

/// Terminal record for a job that exhausted retries or hit a fatal error
#[derive(Debug, Clone)]
pub struct DeadLetter {
    pub job: JobDescriptor,
    pub reason: String,
    pub failed_at: DateTime<Utc>,
}

/// Shared handle to the queue; cheap to clone
#[derive(Clone)]
pub struct JobQueue {
    inner: Arc<QueueInner>,
}

struct QueueInner {
    state: Mutex<QueueState>,
    notify: Notify,
    max_attempts: u32,
    retry_base_delay: Duration,
}

#[derive(Default)]
struct QueueState {
    ready: VecDeque<JobDescriptor>,
    /// Identity keys currently queued, in-flight, or awaiting delayed re-queue
    keys: HashSet<JobKey>,
    in_flight: HashMap<Uuid, JobDescriptor>,
    dead: Vec<DeadLetter>,
    shutdown: bool,
}

impl Default for JobQueue {
    fn default() -> Self {
        Self::new()
    }
}

impl JobQueue {
    pub fn new() -> Self {
        Self::with_retry_settings(DEFAULT_MAX_ATTEMPTS, DEFAULT_RETRY_BASE_DELAY)
    }

    /// Create a queue with a custom retry bound and base re-queue delay
    pub fn with_retry_settings(max_attempts: u32, retry_base_delay: Duration) -> Self {
        Self {
            inner: Arc::new(QueueInner {
                state: Mutex::new(QueueState::default()),
                notify: Notify::new(),
                max_attempts: max_attempts.max(1),
                retry_base_delay,
            }),
        }
    }

    /// Submit a job; returns false (a silent no-op, not an error) when a
    /// job with the same identity key is already queued or in-flight
    pub fn enqueue(&self, job: JobDescriptor) -> bool {
        let key = job.key();
        {
            let mut state = self.inner.state.lock().unwrap();
            if state.shutdown || !state.keys.insert(key.clone()) {
                return false;
            }
            state.ready.push_back(job);
        }
        tracing::debug!(key = %key, "Job enqueued");
        self.inner.notify.notify_one();
        true
    }

    /// Wait for the next job, or `None` once the queue has shut down
    pub async fn dequeue(&self) -> Option<JobDescriptor> {
        loop {
            let notified = self.inner.notify.notified();
            {
                let mut state = self.inner.state.lock().unwrap();
                if let Some(job) = state.ready.pop_front() {
                    state.in_flight.insert(job.id, job.clone());
                    if !state.ready.is_empty() {
                        self.inner.notify.notify_one();
                    }
                    return Some(job);
                }
                if state.shutdown {
                    return None;
                }
            }
            notified.await;
        }
    }

    /// Mark a delivered job as successfully completed
    pub fn ack(&self, job: &JobDescriptor) {
        let mut state = self.inner.state.lock().unwrap();
        state.in_flight.remove(&job.id);
        state.keys.remove(&job.key());
        tracing::debug!(key = %job.key(), "Job acked");
    }

    /// Report a retryable failure
    ///
    /// Below the attempt bound the job is re-queued after an exponential
    /// backoff delay; its identity key stays reserved for the whole wait so
    /// the scheduler cannot double-submit. At the bound it dead-letters.
    pub fn nack(&self, mut job: JobDescriptor, reason: impl Into<String>) {
        let reason = reason.into();
        job.attempts += 1;

        let delay = {
            let mut state = self.inner.state.lock().unwrap();
            state.in_flight.remove(&job.id);

            if job.attempts >= self.inner.max_attempts {
                tracing::error!(
                    key = %job.key(),
                    attempts = job.attempts,
                    reason = %reason,
                    "Job exhausted retries, moving to dead letter"
                );
                state.keys.remove(&job.key());
                state.dead.push(DeadLetter {
                    job,
                    reason,
                    failed_at: Utc::now(),
                });
                return;
            }

            let factor = 2u32
                .saturating_pow(job.attempts.saturating_sub(1))
                .min(RETRY_DELAY_CAP_FACTOR);
            self.inner.retry_base_delay.saturating_mul(factor)
        };

        tracing::warn!(
            key = %job.key(),
            attempts = job.attempts,
            delay_ms = delay.as_millis() as u64,
            reason = %reason,
            "Job nacked, re-queueing with backoff"
        );

        let inner = Arc::clone(&self.inner);
        tokio::spawn(async move {
            tokio::time::sleep(delay).await;
            {
                let mut state = inner.state.lock().unwrap();
                state.ready.push_back(job);
            }
            inner.notify.notify_one();
        });
    }

    /// Move a job straight to the dead-letter state (non-retryable failure)
    pub fn dead_letter(&self, job: JobDescriptor, reason: impl Into<String>) {
        let reason = reason.into();
        tracing::error!(
            key = %job.key(),
            attempts = job.attempts,
            reason = %reason,
            "Job dead-lettered"
        );
        let mut state = self.inner.state.lock().unwrap();
        state.in_flight.remove(&job.id);
        state.keys.remove(&job.key());
        state.dead.push(DeadLetter {
            job,
            reason,
            failed_at: Utc::now(),
        });
    }

    /// Stop delivery: wakes every blocked `dequeue`, which then returns
    /// `None`. In-flight jobs are allowed to finish.
    pub fn shutdown(&self) {
        {
            let mut state = self.inner.state.lock().unwrap();
            state.shutdown = true;
        }
        self.inner.notify.notify_waiters();
    }

    /// Number of jobs waiting for delivery
    pub fn queued_len(&self) -> usize {
        self.inner.state.lock().unwrap().ready.len()
    }

    /// Number of jobs currently being processed
    pub fn in_flight_len(&self) -> usize {
        self.inner.state.lock().unwrap().in_flight.len()
    }

    /// Identity keys currently reserved (queued, in-flight, or backing off)
    pub fn reserved_keys(&self) -> HashSet<JobKey> {
        self.inner.state.lock().unwrap().keys.clone()
    }

    /// Snapshot of the dead-letter list for operator reporting
    pub fn dead_letters(&self) -> Vec<DeadLetter> {
        self.inner.state.lock().unwrap().dead.clone()
    }
}

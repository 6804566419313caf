//! Fixed worker pool draining the job queue
//!
//! Each worker loops dequeue, dispatch, settle. Outcome handling follows
//! the error classification: retryable errors re-queue with backoff,
//! everything else dead-letters immediately. A panicking handler is
//! contained to its job and treated like a crashed worker, so the job is
//! redelivered instead of lost.

use futures_util::FutureExt;
use std::panic::AssertUnwindSafe;
use tokio::task::JoinHandle;

use crate::jobs;
use crate::queue::JobQueue;
use crate::state::AppState;

pub struct WorkerPool {
    state: AppState,
    queue: JobQueue,
    worker_count: usize,
}

impl WorkerPool {
    pub fn new(state: AppState, queue: JobQueue, worker_count: usize) -> Self {
        Self {
            state,
            queue,
            worker_count,
        }
    }

    /// Spawn the workers; each handle resolves when the queue shuts down
    /// and drains
    pub fn spawn(self) -> Vec<JoinHandle<()>> {
        (0..self.worker_count)
            .map(|worker_id| {
                let state = self.state.clone();
                let queue = self.queue.clone();
                tokio::spawn(worker_loop(worker_id, state, queue))
            })
            .collect()
    }
}

async fn worker_loop(worker_id: usize, state: AppState, queue: JobQueue) {
    tracing::debug!(worker_id, "Worker started");

    while let Some(job) = queue.dequeue().await {
        tracing::debug!(
            worker_id,
            job_id = %job.id,
            kind = %job.kind,
            subject = %job.subject_id,
            attempt = job.attempts + 1,
            "Executing job"
        );

        let outcome = AssertUnwindSafe(jobs::dispatch(&state, &job))
            .catch_unwind()
            .await;

        match outcome {
            Ok(Ok(())) => queue.ack(&job),
            Ok(Err(e)) => {
                if e.is_retryable() {
                    tracing::warn!(
                        worker_id,
                        job_id = %job.id,
                        error = %e,
                        "Job failed, re-queueing"
                    );
                    queue.nack(job, e.to_string());
                } else {
                    e.log();
                    queue.dead_letter(job, e.to_string());
                }
            }
            Err(panic) => {
                let reason = panic
                    .downcast_ref::<&str>()
                    .map(|s| s.to_string())
                    .or_else(|| panic.downcast_ref::<String>().cloned())
                    .unwrap_or_else(|| "unknown panic".to_string());
                tracing::error!(worker_id, job_id = %job.id, reason = %reason, "Job panicked");
                queue.nack(job, format!("panic: {reason}"));
            }
        }
    }

    tracing::debug!(worker_id, "Worker stopped");
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::jobs::testutil::harness;
    use crate::storage::Storage;
    use crate::types::{JobDescriptor, JobKind};
    use std::time::Duration;
    use wiremock::matchers::method;
    use wiremock::{Mock, MockServer, ResponseTemplate};

    async fn drain(queue: &JobQueue, handles: Vec<JoinHandle<()>>) {
        // Queue empties asynchronously; poll briefly before shutting down
        for _ in 0..200 {
            if queue.queued_len() == 0 && queue.in_flight_len() == 0 {
                break;
            }
            tokio::time::sleep(Duration::from_millis(10)).await;
        }
        queue.shutdown();
        for handle in handles {
            handle.await.unwrap();
        }
    }

    #[tokio::test]
    async fn test_pool_processes_and_acks_jobs() {
        let h = harness("http://localhost:9");
        h.storage.add_subject("u1");
        h.storage.add_subject("u2");

        let queue = JobQueue::new();
        assert!(queue.enqueue(JobDescriptor::new(JobKind::ExtractFeatures, "u1")));
        assert!(queue.enqueue(JobDescriptor::new(JobKind::ExtractFeatures, "u2")));

        let handles = WorkerPool::new(h.state, queue.clone(), 2).spawn();
        drain(&queue, handles).await;

        assert_eq!(queue.queued_len(), 0);
        assert_eq!(queue.in_flight_len(), 0);
        assert!(queue.dead_letters().is_empty());
        // Keys released: the next scheduling round may submit again
        assert!(queue.reserved_keys().is_empty());
    }

    #[tokio::test]
    async fn test_non_retryable_failure_dead_letters_immediately() {
        let h = harness("http://localhost:9");
        h.storage
            .set_cursor("u1", JobKind::SyncUser, "garbage")
            .await
            .unwrap();

        let queue = JobQueue::with_retry_settings(3, Duration::from_millis(10));
        queue.enqueue(JobDescriptor::new(JobKind::SyncUser, "u1"));

        let handles = WorkerPool::new(h.state, queue.clone(), 1).spawn();
        drain(&queue, handles).await;

        let dead = queue.dead_letters();
        assert_eq!(dead.len(), 1);
        // Dead-lettered on first delivery, no retries burned
        assert_eq!(dead[0].job.attempts, 0);
    }

    #[tokio::test]
    async fn test_retryable_failure_retries_then_dead_letters() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(500))
            .mount(&server)
            .await;

        let h = harness(&server.uri());
        let queue = JobQueue::with_retry_settings(2, Duration::from_millis(5));
        queue.enqueue(JobDescriptor::new(JobKind::SyncUser, "u1"));

        let handles = WorkerPool::new(h.state, queue.clone(), 1).spawn();

        // Wait for the dead letter to land
        for _ in 0..400 {
            if !queue.dead_letters().is_empty() {
                break;
            }
            tokio::time::sleep(Duration::from_millis(10)).await;
        }
        queue.shutdown();
        for handle in handles {
            handle.await.unwrap();
        }

        let dead = queue.dead_letters();
        assert_eq!(dead.len(), 1);
        assert_eq!(dead[0].job.attempts, 2); // delivered twice, then terminal
    }
}

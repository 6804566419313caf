//! End-to-end pipeline tests: ingest, extract, score, aggregate

mod common;

use std::sync::Arc;
use std::time::Duration;

use cadence_worker::types::JobKind;
use cadence_worker::{JobQueue, Scheduler, WorkerPool};

use common::mocks::MockHistoryServer;
use common::pipeline;

/// Poll until the queue is idle (empty and nothing in flight)
async fn wait_idle(queue: &JobQueue) {
    for _ in 0..500 {
        if queue.queued_len() == 0 && queue.in_flight_len() == 0 {
            return;
        }
        tokio::time::sleep(Duration::from_millis(10)).await;
    }
    panic!("queue never went idle");
}

#[tokio::test]
async fn test_full_cycle_produces_profiles_for_every_subject() {
    let server = MockHistoryServer::start().await;
    let now = chrono::Utc::now().timestamp();
    server
        .mock_listens("u1", &[(now - 3600, "trk:a"), (now - 1800, "trk:b")])
        .await;
    server
        .mock_listens("u2", &[(now - 7200, "trk:c")])
        .await;

    let p = pipeline(&server.uri());
    p.storage.add_subject("u1");
    p.storage.add_subject("u2");
    for (track, freq) in [("trk:a", 220.0), ("trk:b", 880.0), ("trk:c", 440.0)] {
        p.audio.add_sine_clip(track, freq, 0.5);
    }

    let queue = JobQueue::new();
    let scheduler = Scheduler::new(Arc::new(p.storage.clone()), queue.clone());
    let handles = WorkerPool::new(p.state.clone(), queue.clone(), 2).spawn();

    // Drive one tick of each stage in pipeline order
    for kind in [
        JobKind::SyncUser,
        JobKind::ExtractFeatures,
        JobKind::ComputeEmbedding,
        JobKind::AggregateWeeks,
    ] {
        let outcome = scheduler.schedule_jobs(kind).await.unwrap();
        assert_eq!(outcome.submitted, 2, "one {kind} job per subject");
        wait_idle(&queue).await;
    }

    assert!(queue.dead_letters().is_empty());
    assert_eq!(p.storage.listen_count(), 3);

    // Every listened track got an 8-dim vector and calibrated scores
    for track in ["trk:a", "trk:b", "trk:c"] {
        let vector = p
            .state
            .storage
            .load_feature_vector(track, "spectral-v1")
            .await
            .unwrap()
            .unwrap_or_else(|| panic!("no vector for {track}"));
        assert_eq!(vector.values.len(), 8);

        let scores = p.state.storage.load_track_scores(track).await.unwrap();
        assert_eq!(scores.len(), 2, "two axes for {track}");
    }

    for subject in ["u1", "u2"] {
        let profile = p
            .storage
            .subject_profile(subject)
            .unwrap_or_else(|| panic!("no profile for {subject}"));
        assert_eq!(profile.len(), 2);
        assert!(profile.iter().all(|s| s.calibrated_score.is_finite()));
    }

    // Brighter listening (u1 heard 880 Hz) shows up in the profile ordering
    let u1 = p.storage.subject_profile("u1").unwrap();
    let u2 = p.storage.subject_profile("u2").unwrap();
    let brightness = |scores: &[cadence_worker::types::AxisScore]| {
        scores
            .iter()
            .find(|s| s.axis == "brightness")
            .unwrap()
            .calibrated_score
    };
    assert!(brightness(&u1) > 0.0 && brightness(&u2) > 0.0);

    queue.shutdown();
    for handle in handles {
        handle.await.unwrap();
    }
}

#[tokio::test]
async fn test_resync_after_cycle_is_idempotent() {
    let server = MockHistoryServer::start().await;
    let now = chrono::Utc::now().timestamp();
    server.mock_listens("u1", &[(now - 600, "trk:a")]).await;

    let p = pipeline(&server.uri());
    p.storage.add_subject("u1");
    p.audio.add_sine_clip("trk:a", 440.0, 0.5);

    let queue = JobQueue::new();
    let scheduler = Scheduler::new(Arc::new(p.storage.clone()), queue.clone());
    let handles = WorkerPool::new(p.state.clone(), queue.clone(), 1).spawn();

    for _ in 0..2 {
        for kind in [
            JobKind::SyncUser,
            JobKind::ExtractFeatures,
            JobKind::ComputeEmbedding,
            JobKind::AggregateWeeks,
        ] {
            scheduler.schedule_jobs(kind).await.unwrap();
            wait_idle(&queue).await;
        }
    }

    // The provider replayed the same listen; nothing duplicated downstream
    assert_eq!(p.storage.listen_count(), 1);
    assert_eq!(
        p.state.storage.load_track_scores("trk:a").await.unwrap().len(),
        2
    );
    assert!(queue.dead_letters().is_empty());

    queue.shutdown();
    for handle in handles {
        handle.await.unwrap();
    }
}

#[tokio::test]
async fn test_provider_outage_dead_letters_sync_but_spares_other_stages() {
    let server = MockHistoryServer::start().await;
    server.mock_failure(500).await;

    let p = pipeline(&server.uri());
    p.storage.add_subject("u1");

    let queue = JobQueue::with_retry_settings(2, Duration::from_millis(5));
    let scheduler = Scheduler::new(Arc::new(p.storage.clone()), queue.clone());
    let handles = WorkerPool::new(p.state.clone(), queue.clone(), 1).spawn();

    scheduler.schedule_jobs(JobKind::SyncUser).await.unwrap();
    for _ in 0..500 {
        if !queue.dead_letters().is_empty() {
            break;
        }
        tokio::time::sleep(Duration::from_millis(10)).await;
    }

    let dead = queue.dead_letters();
    assert_eq!(dead.len(), 1);
    assert_eq!(dead[0].job.kind, JobKind::SyncUser);

    // Extraction has nothing to do but still runs clean
    scheduler
        .schedule_jobs(JobKind::ExtractFeatures)
        .await
        .unwrap();
    wait_idle(&queue).await;
    assert_eq!(queue.dead_letters().len(), 1);

    // The exhausted key is released, so the next sync tick can try again
    let retried = scheduler.schedule_jobs(JobKind::SyncUser).await.unwrap();
    assert_eq!(retried.submitted, 1);

    queue.shutdown();
    for handle in handles {
        handle.await.unwrap();
    }
}

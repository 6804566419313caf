use std::sync::Arc;
use std::time::Duration;

use tokio::sync::watch;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use cadence_history_client::HistoryClient;
use cadence_worker::extract::BackendRegistry;
use cadence_worker::scoring::{ScoringConfig, ScoringEngine};
use cadence_worker::storage::memory::{MemoryAudioSource, MemoryStorage};
use cadence_worker::{AppState, Config, JobQueue, Scheduler, Settings, WorkerPool};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Initialize tracing
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "cadence_worker=debug".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    // Load environment variables
    dotenvy::dotenv().ok();

    let config = Config::from_env()?;
    tracing::info!(
        environment = ?config.environment(),
        workers = config.worker_count,
        "Starting Cadence worker"
    );

    // A broken scoring config must abort startup, never default silently
    let scoring_config = ScoringConfig::from_file(&config.scoring_config_path)?;
    let scoring = Arc::new(ScoringEngine::new(scoring_config)?);

    let backends = BackendRegistry::with_defaults();
    let backend = backends.get(&config.embedding_model)?;
    scoring.ensure_dimensions(&config.embedding_model, backend.dimensions())?;

    let history = HistoryClient::new(config.provider())?;

    // In-memory collaborators back development mode; deployments wire in
    // their own Storage and AudioSource implementations here.
    if config.is_production() {
        tracing::warn!("No persistent storage wired in, running with in-memory state");
    }
    let storage = Arc::new(MemoryStorage::new());
    let audio = Arc::new(MemoryAudioSource::new());

    let state = AppState::new(
        storage.clone(),
        audio,
        history,
        backends,
        scoring,
        Settings {
            embedding_model: config.embedding_model.clone(),
            aggregate_window_weeks: config.aggregate_window_weeks,
            page_limit: config.provider().page_limit,
            auth_token: config.provider().api_token.clone(),
        },
    );

    let queue = JobQueue::with_retry_settings(
        config.max_retries,
        Duration::from_millis(config.retry_delay_ms),
    );

    let (shutdown_tx, shutdown_rx) = watch::channel(false);

    let scheduler = Scheduler::new(storage, queue.clone());
    let scheduler_handle = tokio::spawn(scheduler.run(config.scheduler().clone(), shutdown_rx));

    let workers = WorkerPool::new(state, queue.clone(), config.worker_count).spawn();

    tokio::signal::ctrl_c().await?;
    tracing::info!("Shutdown signal received");

    let _ = shutdown_tx.send(true);
    queue.shutdown();

    scheduler_handle.await?;
    for worker in workers {
        worker.await?;
    }

    let dead = queue.dead_letters();
    if dead.is_empty() {
        tracing::info!("Cadence worker stopped cleanly");
    } else {
        for letter in &dead {
            tracing::error!(
                key = %letter.job.key(),
                attempts = letter.job.attempts,
                reason = %letter.reason,
                failed_at = %letter.failed_at,
                "Unresolved dead-lettered job"
            );
        }
        tracing::warn!(count = dead.len(), "Cadence worker stopped with dead letters");
    }

    Ok(())
}

//! Cadence background job processor
//!
//! A recurring pipeline that ingests per-subject listening history from a
//! scrobbling provider, extracts embeddings for newly seen tracks, and
//! projects them into calibrated axis scores. The scheduler produces
//! deduplicated jobs on fixed intervals; a fixed worker pool drains them
//! with at-least-once delivery and bounded retries.

pub mod config;
pub mod error;
pub mod extract;
pub mod jobs;
pub mod pool;
pub mod queue;
pub mod scheduler;
pub mod scoring;
pub mod state;
pub mod storage;
pub mod types;

pub use config::Config;
pub use error::{WorkerError, WorkerResult};
pub use pool::WorkerPool;
pub use queue::JobQueue;
pub use scheduler::Scheduler;
pub use state::{AppState, Settings};

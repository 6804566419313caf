//! Listening-history provider API client for Cadence
//!
//! This crate wraps the external scrobbling provider's listens endpoint,
//! adding bounded timeouts, classified-transient retry with exponential
//! backoff, and cursor-based incremental fetching.
//!
//! # Example
//!
//! ```rust,no_run
//! use cadence_history_client::HistoryClient;
//! use cadence_shared_config::ProviderConfig;
//!
//! # async fn example() -> Result<(), Box<dyn std::error::Error>> {
//! let config = ProviderConfig::with_base_url("https://listens.example.org");
//! let client = HistoryClient::new(&config)?;
//!
//! // Fetch everything after a cursor for one subject
//! let listens = client.fetch_listens("u1", Some(1700000000), None, 500).await?;
//! for listen in listens {
//!     println!("{} at {}", listen.track_ref, listen.listened_at);
//! }
//! # Ok(())
//! # }
//! ```

mod client;
mod error;
mod models;
mod retry;

pub use client::HistoryClient;
pub use error::{HistoryError, HistoryResult};
pub use models::Listen;
pub use retry::RetryPolicy;

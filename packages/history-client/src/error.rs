//! History provider API error types

use thiserror::Error;

/// History provider client errors
#[derive(Error, Debug)]
pub enum HistoryError {
    /// Invalid input provided to an API method
    #[error("invalid input: {0}")]
    InvalidInput(String),

    /// HTTP request failed
    #[error("HTTP request failed: {0}")]
    Http(#[from] reqwest::Error),

    /// JSON parsing failed
    #[error("failed to parse provider response: {0}")]
    Parse(#[from] serde_json::Error),

    /// Response parsed but an entry was structurally unusable
    #[error("malformed listen entry: {0}")]
    MalformedListen(String),

    /// Provider returned a non-success status
    #[error("provider API error {status}: {message}")]
    Api { status: u16, message: String },

    /// Provider rejected the authorization token
    #[error("provider rejected authorization (status {0})")]
    AuthRejected(u16),

    /// Rate limited by the provider
    #[error("rate limited by history provider")]
    RateLimited,

    /// Request timed out
    #[error("request to history provider timed out")]
    Timeout,
}

impl HistoryError {
    /// Check if this error is a classified-transient failure
    ///
    /// Retries on:
    /// - Timeouts
    /// - Rate limiting (429)
    /// - Transport errors (connect, timeout)
    /// - Server errors (5xx)
    ///
    /// Auth rejections and other 4xx responses propagate immediately.
    pub fn is_retryable(&self) -> bool {
        match self {
            HistoryError::Timeout | HistoryError::RateLimited => true,
            HistoryError::Http(e) => {
                if e.is_timeout() || e.is_connect() {
                    return true;
                }
                matches!(e.status(), Some(status) if status.is_server_error())
            }
            HistoryError::Api { status, .. } => *status >= 500,
            _ => false,
        }
    }
}

/// Result type for history provider operations
pub type HistoryResult<T> = Result<T, HistoryError>;

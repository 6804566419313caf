//! Error handling for the Cadence worker
//!
//! One error type covers every job handler, with `is_retryable()` deciding
//! between re-queue and immediate dead-letter, and `severity()` driving the
//! log level. Data and configuration errors never crash the worker loop;
//! each job execution is isolated.

use thiserror::Error;

use crate::scoring::ScoringError;

/// Main worker error type
#[derive(Error, Debug)]
pub enum WorkerError {
    // ========== Job Processing Errors ==========
    /// Job payload was missing or malformed
    #[error("invalid payload: {0}")]
    InvalidPayload(String),

    /// Resource not found
    #[error("not found: {0}")]
    NotFound(String),

    /// Job failed after maximum delivery attempts
    #[error("job failed after {attempts} attempts: {reason}")]
    MaxRetriesExceeded { attempts: u32, reason: String },

    // ========== Storage Errors ==========
    /// Storage collaborator failed
    #[error("storage error: {0}")]
    Storage(String),

    /// Storage collaborator temporarily unavailable
    #[error("storage unavailable: {0}")]
    StorageUnavailable(String),

    // ========== Ingestion Errors ==========
    /// History provider call failed
    #[error("history provider error: {0}")]
    Provider(#[from] cadence_history_client::HistoryError),

    /// Ingested payload was structurally unusable
    #[error("malformed listen payload: {0}")]
    MalformedListen(String),

    // ========== Feature Extraction Errors ==========
    /// Audio could not be loaded for a track
    #[error("audio unavailable for '{track_ref}': {reason}")]
    AudioUnavailable { track_ref: String, reason: String },

    /// Audio samples were unusable (empty, non-finite, zero rate)
    #[error("invalid audio data: {0}")]
    InvalidAudioData(String),

    /// No backend registered under the configured model name
    #[error("unknown embedding backend: {0}")]
    UnknownBackend(String),

    /// Backend produced a vector of the wrong length
    #[error("invalid embedding dimensions: expected {expected}, got {actual}")]
    InvalidEmbeddingDimensions { expected: usize, actual: usize },

    // ========== Scoring Errors ==========
    /// Scoring configuration or projection failed
    #[error("scoring error: {0}")]
    Scoring(#[from] ScoringError),

    // ========== Configuration Errors ==========
    /// Configuration error
    #[error("configuration error: {0}")]
    Configuration(String),

    // ========== Internal Errors ==========
    /// Internal worker error (catch-all for unexpected failures)
    #[error("internal worker error: {0}")]
    Internal(String),
}

impl WorkerError {
    /// Check if this error is a classified-transient failure
    ///
    /// Retryable errors are re-queued with backoff; everything else
    /// dead-letters immediately.
    pub fn is_retryable(&self) -> bool {
        match self {
            Self::Provider(e) => e.is_retryable(),
            Self::StorageUnavailable(_) => true,
            _ => false,
        }
    }

    /// Get a severity level for logging
    pub fn severity(&self) -> ErrorSeverity {
        match self {
            Self::Configuration(_)
            | Self::Scoring(_)
            | Self::UnknownBackend(_)
            | Self::MaxRetriesExceeded { .. } => ErrorSeverity::Critical,

            Self::StorageUnavailable(_) | Self::Storage(_) | Self::Internal(_) => {
                ErrorSeverity::Error
            }

            Self::Provider(_) => ErrorSeverity::Warning,

            _ => ErrorSeverity::Info,
        }
    }

    /// Get the job type this error is related to, if applicable
    pub fn job_context(&self) -> Option<&'static str> {
        match self {
            Self::Provider(_) | Self::MalformedListen(_) => Some("sync_user"),
            Self::AudioUnavailable { .. }
            | Self::InvalidAudioData(_)
            | Self::UnknownBackend(_)
            | Self::InvalidEmbeddingDimensions { .. } => Some("extract_features"),
            Self::Scoring(_) => Some("compute_embedding"),
            _ => None,
        }
    }

    /// Log the error with appropriate severity
    pub fn log(&self) {
        let context = self.job_context().unwrap_or("general");
        match self.severity() {
            ErrorSeverity::Critical => {
                tracing::error!(
                    error = %self,
                    context = context,
                    retryable = self.is_retryable(),
                    "Critical worker error"
                );
            }
            ErrorSeverity::Error => {
                tracing::error!(
                    error = %self,
                    context = context,
                    retryable = self.is_retryable(),
                    "Worker error"
                );
            }
            ErrorSeverity::Warning => {
                tracing::warn!(
                    error = %self,
                    context = context,
                    retryable = self.is_retryable(),
                    "Worker warning"
                );
            }
            ErrorSeverity::Info => {
                tracing::info!(
                    error = %self,
                    context = context,
                    retryable = self.is_retryable(),
                    "Worker info"
                );
            }
        }
    }

    /// Create an audio-unavailable error
    pub fn audio_unavailable(track_ref: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::AudioUnavailable {
            track_ref: track_ref.into(),
            reason: reason.into(),
        }
    }
}

/// Error severity levels for logging and alerting
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorSeverity {
    /// Critical errors that should trigger alerts
    Critical,
    /// Standard errors
    Error,
    /// Warnings for expected failures
    Warning,
    /// Informational messages
    Info,
}

/// Result type alias for worker operations
pub type WorkerResult<T> = Result<T, WorkerError>;

impl From<anyhow::Error> for WorkerError {
    fn from(err: anyhow::Error) -> Self {
        match err.downcast::<WorkerError>() {
            Ok(worker_err) => worker_err,
            Err(err) => Self::Internal(err.to_string()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use cadence_history_client::HistoryError;

    #[test]
    fn test_transient_errors_are_retryable() {
        assert!(WorkerError::Provider(HistoryError::Timeout).is_retryable());
        assert!(WorkerError::Provider(HistoryError::RateLimited).is_retryable());
        assert!(WorkerError::StorageUnavailable("pool drained".into()).is_retryable());
    }

    #[test]
    fn test_data_and_config_errors_are_not_retryable() {
        assert!(!WorkerError::InvalidPayload("bad".into()).is_retryable());
        assert!(!WorkerError::MalformedListen("no track_ref".into()).is_retryable());
        assert!(!WorkerError::Provider(HistoryError::AuthRejected(401)).is_retryable());
        assert!(!WorkerError::Configuration("missing".into()).is_retryable());
        assert!(!WorkerError::InvalidAudioData("empty".into()).is_retryable());
    }

    #[test]
    fn test_severity_levels() {
        assert_eq!(
            WorkerError::Configuration("x".into()).severity(),
            ErrorSeverity::Critical
        );
        assert_eq!(
            WorkerError::UnknownBackend("missing".into()).severity(),
            ErrorSeverity::Critical
        );
        assert_eq!(
            WorkerError::Storage("query failed".into()).severity(),
            ErrorSeverity::Error
        );
        assert_eq!(
            WorkerError::Provider(HistoryError::Timeout).severity(),
            ErrorSeverity::Warning
        );
    }

    #[test]
    fn test_job_context() {
        assert_eq!(
            WorkerError::MalformedListen("x".into()).job_context(),
            Some("sync_user")
        );
        assert_eq!(
            WorkerError::audio_unavailable("trk:a", "missing").job_context(),
            Some("extract_features")
        );
        assert_eq!(WorkerError::Internal("x".into()).job_context(), None);
    }

    #[test]
    fn test_error_display() {
        let err = WorkerError::audio_unavailable("trk:a", "decoder gave up");
        assert_eq!(
            err.to_string(),
            "audio unavailable for 'trk:a': decoder gave up"
        );

        let err = WorkerError::InvalidEmbeddingDimensions {
            expected: 16,
            actual: 12,
        };
        assert_eq!(
            err.to_string(),
            "invalid embedding dimensions: expected 16, got 12"
        );
    }
}

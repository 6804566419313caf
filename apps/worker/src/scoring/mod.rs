//! Embedding-to-score projection and calibration
//!
//! A [`ScoringConfig`] maps each model's embedding space onto named
//! semantic axes (valence, energy, ...) through per-axis weight vectors,
//! then applies a per-axis linear calibration. The configuration is loaded
//! once at startup and treated as immutable for the process lifetime;
//! reconfiguration is a whole-object swap, never partial mutation.

mod config;
mod engine;

pub use config::{Calibration, ScoringConfig};
pub use engine::ScoringEngine;

use thiserror::Error;

/// Scoring configuration and projection errors
///
/// All variants are configuration errors: they fail fast at startup (or at
/// first use for unknown model/axis lookups) and are never retried.
#[derive(Error, Debug)]
pub enum ScoringError {
    /// An axis has weights but no calibration entry
    #[error("axis '{axis}' referenced by model '{model}' has no calibration entry")]
    MissingCalibration { model: String, axis: String },

    /// A model declares no axes at all
    #[error("model '{0}' has an empty axis map")]
    EmptyModel(String),

    /// An axis weight vector is empty
    #[error("axis '{axis}' of model '{model}' has an empty weight vector")]
    EmptyWeights { model: String, axis: String },

    /// Weight vector length does not match the model's embedding size
    #[error(
        "axis '{axis}' of model '{model}' expects dimension {expected}, weight vector has {actual}"
    )]
    DimensionMismatch {
        model: String,
        axis: String,
        expected: usize,
        actual: usize,
    },

    /// No such model in the configuration
    #[error("unknown scoring model: {0}")]
    UnknownModel(String),

    /// No such axis for the model
    #[error("unknown axis '{axis}' for model '{model}'")]
    UnknownAxis { model: String, axis: String },

    /// Configuration file could not be read
    #[error("failed to read scoring config: {0}")]
    Io(#[from] std::io::Error),

    /// Configuration file could not be parsed
    #[error("failed to parse scoring config: {0}")]
    Parse(#[from] serde_json::Error),
}

//! Scoring configuration loading and validation

use std::collections::BTreeMap;
use std::path::Path;

use serde::{Deserialize, Serialize};

use super::ScoringError;

/// Per-axis linear transform mapping raw projections to comparable scores
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Calibration {
    pub scale: f32,
    pub bias: f32,
}

/// Process-wide scoring configuration
///
/// `models` maps model name to axis name to weight vector; `calibrations`
/// maps axis name to its linear transform. Every axis referenced by any
/// model must have a calibration entry: a missing entry is a startup
/// error, never a silent `scale=1, bias=0` default.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ScoringConfig {
    pub models: BTreeMap<String, BTreeMap<String, Vec<f32>>>,
    pub calibrations: BTreeMap<String, Calibration>,
}

impl ScoringConfig {
    /// Parse and validate a configuration from JSON text
    pub fn from_json(text: &str) -> Result<Self, ScoringError> {
        let config: Self = serde_json::from_str(text)?;
        config.validate()?;
        Ok(config)
    }

    /// Load and validate a configuration file
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self, ScoringError> {
        let text = std::fs::read_to_string(path)?;
        Self::from_json(&text)
    }

    /// Fail-closed structural validation
    pub fn validate(&self) -> Result<(), ScoringError> {
        for (model, axes) in &self.models {
            if axes.is_empty() {
                return Err(ScoringError::EmptyModel(model.clone()));
            }

            let mut dims = axes.values().map(Vec::len);
            let expected = dims.next().unwrap_or(0);

            for (axis, weights) in axes {
                if weights.is_empty() {
                    return Err(ScoringError::EmptyWeights {
                        model: model.clone(),
                        axis: axis.clone(),
                    });
                }
                if weights.len() != expected {
                    return Err(ScoringError::DimensionMismatch {
                        model: model.clone(),
                        axis: axis.clone(),
                        expected,
                        actual: weights.len(),
                    });
                }
                if !self.calibrations.contains_key(axis) {
                    return Err(ScoringError::MissingCalibration {
                        model: model.clone(),
                        axis: axis.clone(),
                    });
                }
            }
        }
        Ok(())
    }

    /// Embedding dimensionality a model's axes expect
    pub fn model_dimensions(&self, model: &str) -> Option<usize> {
        self.models
            .get(model)
            .and_then(|axes| axes.values().next())
            .map(Vec::len)
    }

    /// Axis names registered for a model
    pub fn axes_for(&self, model: &str) -> Option<Vec<&str>> {
        self.models
            .get(model)
            .map(|axes| axes.keys().map(String::as_str).collect())
    }
}

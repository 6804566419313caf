//! Pure projection of embeddings onto calibrated axes

use super::{ScoringConfig, ScoringError};
use crate::types::{AxisScore, ScoreTarget};

/// Immutable scoring engine built from a validated [`ScoringConfig`]
///
/// Scoring is a pure function of `(embedding, config)`: no storage access,
/// no clock, no mutation. One engine serves all workers behind an `Arc`.
#[derive(Debug)]
pub struct ScoringEngine {
    config: ScoringConfig,
}

impl ScoringEngine {
    /// Build an engine, re-validating the configuration
    pub fn new(config: ScoringConfig) -> Result<Self, ScoringError> {
        config.validate()?;
        Ok(Self { config })
    }

    /// Assert at startup that a model's axes match the embedding size its
    /// backend produces, so a bad pairing fails before any job runs
    pub fn ensure_dimensions(&self, model: &str, backend_dims: usize) -> Result<(), ScoringError> {
        let axes = self
            .config
            .models
            .get(model)
            .ok_or_else(|| ScoringError::UnknownModel(model.to_string()))?;
        for (axis, weights) in axes {
            if weights.len() != backend_dims {
                return Err(ScoringError::DimensionMismatch {
                    model: model.to_string(),
                    axis: axis.clone(),
                    expected: backend_dims,
                    actual: weights.len(),
                });
            }
        }
        Ok(())
    }

    /// Project one embedding onto a single axis
    pub fn score(
        &self,
        model: &str,
        axis: &str,
        target: &ScoreTarget,
        embedding: &[f32],
    ) -> Result<AxisScore, ScoringError> {
        let axes = self
            .config
            .models
            .get(model)
            .ok_or_else(|| ScoringError::UnknownModel(model.to_string()))?;
        let weights = axes.get(axis).ok_or_else(|| ScoringError::UnknownAxis {
            model: model.to_string(),
            axis: axis.to_string(),
        })?;
        self.project(model, axis, weights, target, embedding)
    }

    /// Project one embedding onto every axis the model declares, in one pass
    pub fn score_all(
        &self,
        model: &str,
        target: &ScoreTarget,
        embedding: &[f32],
    ) -> Result<Vec<AxisScore>, ScoringError> {
        let axes = self
            .config
            .models
            .get(model)
            .ok_or_else(|| ScoringError::UnknownModel(model.to_string()))?;

        let mut scores = Vec::with_capacity(axes.len());
        for (axis, weights) in axes {
            scores.push(self.project(model, axis, weights, target, embedding)?);
        }
        Ok(scores)
    }

    fn project(
        &self,
        model: &str,
        axis: &str,
        weights: &[f32],
        target: &ScoreTarget,
        embedding: &[f32],
    ) -> Result<AxisScore, ScoringError> {
        if weights.len() != embedding.len() {
            return Err(ScoringError::DimensionMismatch {
                model: model.to_string(),
                axis: axis.to_string(),
                expected: weights.len(),
                actual: embedding.len(),
            });
        }

        let raw: f32 = weights.iter().zip(embedding).map(|(w, x)| w * x).sum();

        // validate() guarantees a calibration exists for every axis
        let calibration = &self.config.calibrations[axis];
        Ok(AxisScore {
            target: target.clone(),
            axis: axis.to_string(),
            raw_score: raw,
            calibrated_score: raw * calibration.scale + calibration.bias,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use assert_matches::assert_matches;

    fn engine() -> ScoringEngine {
        let config = ScoringConfig::from_json(
            r#"{
                "models": {
                    "spectral-v1": {
                        "valence": [1.0, 0.0, 0.0],
                        "energy": [0.0, 1.0, 1.0]
                    }
                },
                "calibrations": {
                    "valence": { "scale": 2.0, "bias": 1.0 },
                    "energy": { "scale": 0.5, "bias": 0.0 }
                }
            }"#,
        )
        .unwrap();
        ScoringEngine::new(config).unwrap()
    }

    #[test]
    fn test_score_applies_calibration() {
        let engine = engine();
        let target = ScoreTarget::Track("trk:a".to_string());

        let score = engine
            .score("spectral-v1", "valence", &target, &[1.0, 0.0, 0.0])
            .unwrap();
        assert_eq!(score.raw_score, 1.0);
        // raw 1.0, scale 2.0, bias 1.0
        assert_eq!(score.calibrated_score, 3.0);
    }

    #[test]
    fn test_score_all_covers_every_axis() {
        let engine = engine();
        let target = ScoreTarget::Track("trk:a".to_string());

        let scores = engine
            .score_all("spectral-v1", &target, &[0.5, 1.0, 1.0])
            .unwrap();
        assert_eq!(scores.len(), 2);

        let energy = scores.iter().find(|s| s.axis == "energy").unwrap();
        assert_eq!(energy.raw_score, 2.0);
        assert_eq!(energy.calibrated_score, 1.0);
        let valence = scores.iter().find(|s| s.axis == "valence").unwrap();
        assert_eq!(valence.calibrated_score, 2.0);
    }

    #[test]
    fn test_wrong_dimension_rejected() {
        let engine = engine();
        let target = ScoreTarget::Track("trk:a".to_string());
        assert_matches!(
            engine.score_all("spectral-v1", &target, &[1.0, 2.0]),
            Err(ScoringError::DimensionMismatch {
                expected: 3,
                actual: 2,
                ..
            })
        );
    }

    #[test]
    fn test_unknown_model_and_axis() {
        let engine = engine();
        let target = ScoreTarget::Track("trk:a".to_string());
        assert_matches!(
            engine.score_all("nope", &target, &[1.0]),
            Err(ScoringError::UnknownModel(_))
        );
        assert_matches!(
            engine.score("spectral-v1", "nope", &target, &[1.0, 0.0, 0.0]),
            Err(ScoringError::UnknownAxis { .. })
        );
    }

    #[test]
    fn test_ensure_dimensions_catches_backend_mismatch() {
        let engine = engine();
        assert!(engine.ensure_dimensions("spectral-v1", 3).is_ok());
        assert_matches!(
            engine.ensure_dimensions("spectral-v1", 8),
            Err(ScoringError::DimensionMismatch { expected: 8, .. })
        );
    }
}

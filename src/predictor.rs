use std::sync::Arc;

use log::debug;
use serde::Serialize;

use crate::artifacts::ModelArtifacts;
use crate::classifier::RiskLabel;
use crate::config::FALLBACK_CONFIDENCE;
use crate::encoder::encode;
use crate::error::{HeartError, Result};
use crate::records::RawAnswers;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ConfidenceSource {
    Probability,
    Fallback,
}

/// Outcome of one prediction.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Assessment {
    pub label: RiskLabel,
    /// Percentage in `0..=100`.
    pub confidence: f64,
    pub confidence_source: ConfidenceSource,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub probabilities: Option<Vec<f64>>,
}

/// Encodes, scales and classifies answers against a fixed set of artifacts.
#[derive(Debug, Clone)]
pub struct Predictor {
    artifacts: Arc<ModelArtifacts>,
    fallback_confidence: f64,
}

impl Predictor {
    pub fn new(artifacts: Arc<ModelArtifacts>) -> Self {
        Self {
            artifacts,
            fallback_confidence: FALLBACK_CONFIDENCE,
        }
    }

    pub fn with_fallback_confidence(mut self, confidence: f64) -> Self {
        self.fallback_confidence = confidence;
        self
    }

    pub fn artifacts(&self) -> &ModelArtifacts {
        &self.artifacts
    }

    pub fn encode(&self, answers: &RawAnswers) -> Result<Vec<f64>> {
        answers.validate()?;
        Ok(encode(answers, self.artifacts.columns()))
    }

    pub fn predict(&self, answers: &RawAnswers) -> Result<Assessment> {
        let encoded = self.encode(answers)?;
        self.predict_encoded(&encoded)
    }

    /// Scales and classifies an already encoded vector.
    pub fn predict_encoded(&self, encoded: &[f64]) -> Result<Assessment> {
        let expected = self.artifacts.columns().len();
        if encoded.len() != expected {
            return Err(HeartError::DimensionMismatch {
                expected,
                actual: encoded.len(),
            });
        }
        let scaled = self.artifacts.scaler().transform(encoded)?;
        let classifier = self.artifacts.classifier();
        let label = classifier.predict(&scaled)?;

        let assessment = match classifier.predict_proba(&scaled) {
            Ok(proba) if !proba.is_empty() => {
                let max = proba.iter().copied().fold(f64::NEG_INFINITY, f64::max);
                Assessment {
                    label,
                    confidence: max * 100.0,
                    confidence_source: ConfidenceSource::Probability,
                    probabilities: Some(proba),
                }
            }
            other => {
                if let Err(e) = other {
                    debug!("no class probabilities ({}), using fallback confidence", e);
                }
                Assessment {
                    label,
                    confidence: self.fallback_confidence,
                    confidence_source: ConfidenceSource::Fallback,
                    probabilities: None,
                }
            }
        };
        debug!(
            "predicted {} with {:.1}% confidence",
            assessment.label, assessment.confidence
        );
        Ok(assessment)
    }
}

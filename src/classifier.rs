//! Classifier artifacts and the trait the predictor drives them through.

use std::cmp::Ordering;
use std::fmt;

use serde::{Deserialize, Serialize};
use smartcore::linalg::basic::matrix::DenseMatrix;
use smartcore::metrics::distance::euclidian::Euclidian;
use smartcore::neighbors::knn_classifier::KNNClassifier;

use crate::error::{HeartError, Result};

/// A k-nearest-neighbours model fitted and serialized with smartcore.
pub type KnnModel = KNNClassifier<f64, i32, DenseMatrix<f64>, Vec<i32>, Euclidian<f64>>;

/// Binary outcome of the classifier.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RiskLabel {
    Low,
    Elevated,
}

impl RiskLabel {
    pub fn from_class(class: i64) -> Result<Self> {
        match class {
            0 => Ok(RiskLabel::Low),
            1 => Ok(RiskLabel::Elevated),
            other => Err(HeartError::InvalidLabel(other)),
        }
    }

    pub fn class(self) -> i32 {
        match self {
            RiskLabel::Low => 0,
            RiskLabel::Elevated => 1,
        }
    }
}

impl fmt::Display for RiskLabel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RiskLabel::Low => f.write_str("low risk"),
            RiskLabel::Elevated => f.write_str("elevated risk"),
        }
    }
}

/// A fitted binary classifier over scaled feature vectors.
pub trait RiskClassifier: Send + Sync {
    fn kind(&self) -> &'static str;

    /// Input width the model was fitted on, if the artifact records it.
    fn width(&self) -> Option<usize> {
        None
    }

    fn predict(&self, x: &[f64]) -> Result<RiskLabel>;

    /// Probabilities for classes `[0, 1]`.
    fn predict_proba(&self, _x: &[f64]) -> Result<Vec<f64>> {
        Err(HeartError::ProbabilityUnavailable)
    }

    fn has_proba(&self) -> bool {
        false
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum NeighborWeights {
    #[default]
    Uniform,
    Distance,
}

/// k-NN with its reference set stored in the artifact, so votes can be
/// turned into class probabilities.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NeighborVotes {
    pub k: usize,
    #[serde(default)]
    pub weights: NeighborWeights,
    pub points: Vec<Vec<f64>>,
    pub labels: Vec<i32>,
}

impl NeighborVotes {
    pub fn check(&self) -> Result<()> {
        if self.points.is_empty() {
            return Err(HeartError::schema("neighbors artifact has no reference points"));
        }
        if self.points.len() != self.labels.len() {
            return Err(HeartError::schema(format!(
                "neighbors artifact has {} points but {} labels",
                self.points.len(),
                self.labels.len()
            )));
        }
        if self.k == 0 || self.k > self.points.len() {
            return Err(HeartError::schema(format!(
                "k = {} with {} reference points",
                self.k,
                self.points.len()
            )));
        }
        let width = self.points[0].len();
        if self.points.iter().any(|p| p.len() != width) {
            return Err(HeartError::schema("reference points differ in width"));
        }
        if let Some(bad) = self.labels.iter().find(|l| **l != 0 && **l != 1) {
            return Err(HeartError::InvalidLabel(*bad as i64));
        }
        Ok(())
    }

    fn votes(&self, x: &[f64]) -> Result<[f64; 2]> {
        let width = self
            .width()
            .ok_or_else(|| HeartError::schema("neighbors artifact has no reference points"))?;
        if x.len() != width {
            return Err(HeartError::DimensionMismatch {
                expected: width,
                actual: x.len(),
            });
        }

        let mut distances: Vec<(f64, i32)> = self
            .points
            .iter()
            .zip(self.labels.iter())
            .map(|(p, label)| {
                let d = p
                    .iter()
                    .zip(x.iter())
                    .map(|(a, b)| (a - b) * (a - b))
                    .sum::<f64>()
                    .sqrt();
                (d, *label)
            })
            .collect();
        distances.sort_by(|a, b| a.0.partial_cmp(&b.0).unwrap_or(Ordering::Equal));
        let nearest = &distances[..self.k.min(distances.len())];
        let exact = nearest.iter().any(|(d, _)| *d == 0.0);

        let mut votes = [0.0; 2];
        for (d, label) in nearest {
            let weight = match self.weights {
                NeighborWeights::Uniform => 1.0,
                // exact matches take all the weight
                NeighborWeights::Distance if exact => {
                    if *d == 0.0 {
                        1.0
                    } else {
                        0.0
                    }
                }
                NeighborWeights::Distance => 1.0 / d,
            };
            match label {
                0 => votes[0] += weight,
                1 => votes[1] += weight,
                other => return Err(HeartError::InvalidLabel(*other as i64)),
            }
        }
        Ok(votes)
    }
}

impl RiskClassifier for NeighborVotes {
    fn kind(&self) -> &'static str {
        "neighbors"
    }

    fn width(&self) -> Option<usize> {
        self.points.first().map(|p| p.len())
    }

    fn predict(&self, x: &[f64]) -> Result<RiskLabel> {
        let votes = self.votes(x)?;
        // ties go to the lower class
        if votes[1] > votes[0] {
            Ok(RiskLabel::Elevated)
        } else {
            Ok(RiskLabel::Low)
        }
    }

    fn predict_proba(&self, x: &[f64]) -> Result<Vec<f64>> {
        let votes = self.votes(x)?;
        let total = votes[0] + votes[1];
        Ok(votes.iter().map(|v| v / total).collect())
    }

    fn has_proba(&self) -> bool {
        true
    }
}

/// Binary logistic regression.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Logistic {
    pub coef: Vec<f64>,
    pub intercept: f64,
}

impl Logistic {
    fn positive(&self, x: &[f64]) -> Result<f64> {
        if x.len() != self.coef.len() {
            return Err(HeartError::DimensionMismatch {
                expected: self.coef.len(),
                actual: x.len(),
            });
        }
        let z = self
            .coef
            .iter()
            .zip(x.iter())
            .map(|(w, v)| w * v)
            .sum::<f64>()
            + self.intercept;
        Ok(sigmoid(z))
    }
}

fn sigmoid(x: f64) -> f64 {
    1.0 / (1.0 + (-x).exp())
}

impl RiskClassifier for Logistic {
    fn kind(&self) -> &'static str {
        "logistic"
    }

    fn width(&self) -> Option<usize> {
        Some(self.coef.len())
    }

    fn predict(&self, x: &[f64]) -> Result<RiskLabel> {
        if self.positive(x)? > 0.5 {
            Ok(RiskLabel::Elevated)
        } else {
            Ok(RiskLabel::Low)
        }
    }

    fn predict_proba(&self, x: &[f64]) -> Result<Vec<f64>> {
        let p = self.positive(x)?;
        Ok(vec![1.0 - p, p])
    }

    fn has_proba(&self) -> bool {
        true
    }
}

/// A smartcore KNN with the input width it was fitted on.
///
/// smartcore panics on a width mismatch, so the width is checked here first.
#[derive(Serialize, Deserialize)]
pub struct FittedKnn {
    pub model: KnnModel,
    pub width: usize,
}

impl FittedKnn {
    pub fn new(model: KnnModel, width: usize) -> Self {
        Self { model, width }
    }
}

impl RiskClassifier for FittedKnn {
    fn kind(&self) -> &'static str {
        "knn"
    }

    fn width(&self) -> Option<usize> {
        Some(self.width)
    }

    fn predict(&self, x: &[f64]) -> Result<RiskLabel> {
        if x.len() != self.width {
            return Err(HeartError::DimensionMismatch {
                expected: self.width,
                actual: x.len(),
            });
        }
        let xmatrix: DenseMatrix<f64> = DenseMatrix::new(1, x.len(), x.to_vec(), false);
        let y: Vec<i32> = self.model.predict(&xmatrix)?;
        match y.first() {
            Some(class) => RiskLabel::from_class(*class as i64),
            None => Err(HeartError::schema("classifier returned no prediction")),
        }
    }
}

/// On-disk classifier, tagged by `kind`.
#[derive(Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum ClassifierArtifact {
    Knn(FittedKnn),
    Neighbors(NeighborVotes),
    Logistic(Logistic),
}

impl ClassifierArtifact {
    pub fn check(&self) -> Result<()> {
        match self {
            ClassifierArtifact::Knn(model) => {
                if model.width == 0 {
                    Err(HeartError::schema("knn artifact has zero width"))
                } else {
                    Ok(())
                }
            }
            ClassifierArtifact::Neighbors(model) => model.check(),
            ClassifierArtifact::Logistic(model) => {
                if model.coef.is_empty() {
                    Err(HeartError::schema("logistic artifact has no coefficients"))
                } else {
                    Ok(())
                }
            }
        }
    }

    pub fn into_classifier(self) -> Box<dyn RiskClassifier> {
        match self {
            ClassifierArtifact::Knn(model) => Box::new(model),
            ClassifierArtifact::Neighbors(model) => Box::new(model),
            ClassifierArtifact::Logistic(model) => Box::new(model),
        }
    }
}

use serde::{Deserialize, Serialize};

use crate::error::{HeartError, Result};

/// Fitted per-column affine transform applied before classification.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Scaler {
    /// `(x - mean) / scale`
    Standard { mean: Vec<f64>, scale: Vec<f64> },
    /// `(x - min) / scale`, where scale is the fitted range.
    MinMax { min: Vec<f64>, scale: Vec<f64> },
    Identity,
}

impl Scaler {
    pub fn kind(&self) -> &'static str {
        match self {
            Scaler::Standard { .. } => "standard",
            Scaler::MinMax { .. } => "min_max",
            Scaler::Identity => "identity",
        }
    }

    /// Number of columns the scaler was fitted on, `None` for identity.
    pub fn width(&self) -> Option<usize> {
        match self {
            Scaler::Standard { mean, .. } => Some(mean.len()),
            Scaler::MinMax { min, .. } => Some(min.len()),
            Scaler::Identity => None,
        }
    }

    /// Checks internal consistency and that the scaler fits `columns` columns.
    pub fn check(&self, columns: usize) -> Result<()> {
        let (offset, scale) = match self {
            Scaler::Standard { mean, scale } => (mean, scale),
            Scaler::MinMax { min, scale } => (min, scale),
            Scaler::Identity => return Ok(()),
        };
        if offset.len() != scale.len() {
            return Err(HeartError::schema(format!(
                "{} scaler has {} offsets but {} scales",
                self.kind(),
                offset.len(),
                scale.len()
            )));
        }
        if offset.len() != columns {
            return Err(HeartError::schema(format!(
                "scaler fitted on {} columns, schema has {}",
                offset.len(),
                columns
            )));
        }
        if offset.iter().chain(scale.iter()).any(|v| !v.is_finite()) {
            return Err(HeartError::schema("scaler contains non-finite values"));
        }
        Ok(())
    }

    pub fn transform(&self, x: &[f64]) -> Result<Vec<f64>> {
        let (offset, scale) = match self {
            Scaler::Standard { mean, scale } => (mean, scale),
            Scaler::MinMax { min, scale } => (min, scale),
            Scaler::Identity => return Ok(x.to_vec()),
        };
        if scale.len() != offset.len() {
            return Err(HeartError::schema(format!(
                "{} scaler has {} offsets but {} scales",
                self.kind(),
                offset.len(),
                scale.len()
            )));
        }
        if x.len() != offset.len() {
            return Err(HeartError::DimensionMismatch {
                expected: offset.len(),
                actual: x.len(),
            });
        }

        Ok(x.iter()
            .zip(offset.iter().zip(scale.iter()))
            .map(|(value, (offset, scale))| {
                let centered = value - offset;
                // constant columns were fitted with a zero scale
                if *scale == 0.0 {
                    centered
                } else {
                    centered / scale
                }
            })
            .collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_standard_transform() {
        let scaler = Scaler::Standard {
            mean: vec![50.0, 1.0],
            scale: vec![10.0, 0.0],
        };
        assert_eq!(scaler.transform(&[60.0, 3.0]).unwrap(), vec![1.0, 2.0]);
    }

    #[test]
    fn test_min_max_transform() {
        let scaler = Scaler::MinMax {
            min: vec![18.0],
            scale: vec![82.0],
        };
        assert_eq!(scaler.transform(&[100.0]).unwrap(), vec![1.0]);
        assert_eq!(scaler.transform(&[18.0]).unwrap(), vec![0.0]);
    }

    #[test]
    fn test_identity_passes_through() {
        assert_eq!(Scaler::Identity.transform(&[1.5, 2.0]).unwrap(), vec![1.5, 2.0]);
        assert!(Scaler::Identity.check(7).is_ok());
    }

    #[test]
    fn test_width_mismatch() {
        let scaler = Scaler::Standard {
            mean: vec![0.0; 3],
            scale: vec![1.0; 3],
        };
        assert!(matches!(
            scaler.transform(&[1.0, 2.0]),
            Err(HeartError::DimensionMismatch { expected: 3, actual: 2 })
        ));
        assert!(scaler.check(4).is_err());
        assert!(scaler.check(3).is_ok());
    }

    #[test]
    fn test_check_rejects_inconsistent_scaler() {
        let scaler = Scaler::MinMax {
            min: vec![0.0, 0.0],
            scale: vec![1.0],
        };
        assert!(scaler.check(2).is_err());
        assert!(matches!(
            scaler.transform(&[5.0, 5.0]),
            Err(HeartError::SchemaMismatch(_))
        ));

        let scaler = Scaler::Standard {
            mean: vec![f64::NAN],
            scale: vec![1.0],
        };
        assert!(scaler.check(1).is_err());
    }

    #[test]
    fn test_artifact_json() {
        let scaler: Scaler =
            serde_json::from_str(r#"{"kind":"standard","mean":[1.0],"scale":[2.0]}"#).unwrap();
        assert_eq!(scaler.kind(), "standard");
        assert_eq!(scaler.width(), Some(1));

        let identity: Scaler = serde_json::from_str(r#"{"kind":"identity"}"#).unwrap();
        assert_eq!(identity, Scaler::Identity);
    }
}

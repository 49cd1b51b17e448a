use std::fs;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::encoder::SchemaPolicy;
use crate::error::{HeartError, Result};

/// Confidence reported when the classifier cannot give probabilities.
pub const FALLBACK_CONFIDENCE: f64 = 85.0;

pub const MODEL_FILE_NAME: &str = "knn_heart_model.json";
pub const SCALER_FILE_NAME: &str = "heart_scaler.json";
pub const COLUMNS_FILE_NAME: &str = "heart_columns.json";

/// Where the artifacts live and how predictions are reported.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PredictorConfig {
    pub artifact_dir: PathBuf,
    pub model_file: String,
    pub scaler_file: String,
    pub columns_file: String,
    pub fallback_confidence: f64,
    pub schema_policy: SchemaPolicy,
}

impl Default for PredictorConfig {
    fn default() -> Self {
        Self {
            artifact_dir: PathBuf::from("."),
            model_file: MODEL_FILE_NAME.to_string(),
            scaler_file: SCALER_FILE_NAME.to_string(),
            columns_file: COLUMNS_FILE_NAME.to_string(),
            fallback_confidence: FALLBACK_CONFIDENCE,
            schema_policy: SchemaPolicy::Lenient,
        }
    }
}

impl PredictorConfig {
    /// Reads a JSON config file. Missing keys keep their defaults.
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let text = fs::read_to_string(path.as_ref())?;
        let config: PredictorConfig = serde_json::from_str(&text)?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<()> {
        if !(0.0..=100.0).contains(&self.fallback_confidence) {
            return Err(HeartError::Config(format!(
                "fallback_confidence {} is not a percentage",
                self.fallback_confidence
            )));
        }
        for (key, name) in [
            ("model_file", &self.model_file),
            ("scaler_file", &self.scaler_file),
            ("columns_file", &self.columns_file),
        ] {
            if name.is_empty() {
                return Err(HeartError::Config(format!("{} is empty", key)));
            }
        }
        Ok(())
    }

    pub fn model_path(&self) -> PathBuf {
        self.artifact_dir.join(&self.model_file)
    }

    pub fn scaler_path(&self) -> PathBuf {
        self.artifact_dir.join(&self.scaler_file)
    }

    pub fn columns_path(&self) -> PathBuf {
        self.artifact_dir.join(&self.columns_file)
    }
}

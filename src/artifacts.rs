//! Loading the fitted model artifacts.
//!
//! The classifier, the scaler and the expected column list are read once and
//! never change afterwards. [`ArtifactCache`] guards the load so concurrent
//! first use still reads the files only once, and remembers a failed load so
//! prediction stays disabled instead of retrying on every request.

use std::fmt;
use std::fs;
use std::path::Path;
use std::sync::{Arc, OnceLock};

use log::{error, info};
use serde::de::DeserializeOwned;

use crate::classifier::{ClassifierArtifact, RiskClassifier};
use crate::config::PredictorConfig;
use crate::encoder::{ExpectedColumns, SchemaPolicy};
use crate::error::{HeartError, Result};
use crate::scaler::Scaler;

/// Everything a prediction needs, fixed at load time.
pub struct ModelArtifacts {
    classifier: Box<dyn RiskClassifier>,
    scaler: Scaler,
    columns: ExpectedColumns,
}

impl fmt::Debug for ModelArtifacts {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ModelArtifacts")
            .field("classifier", &self.classifier.kind())
            .field("scaler", &self.scaler.kind())
            .field("columns", &self.columns.len())
            .finish()
    }
}

fn read_json<T: DeserializeOwned>(path: &Path) -> Result<T> {
    let text = fs::read_to_string(path).map_err(|e| HeartError::artifact_load(path, e))?;
    serde_json::from_str(&text).map_err(|e| HeartError::artifact_load(path, e))
}

impl ModelArtifacts {
    /// Assembles artifacts and checks they agree on the vector width.
    pub fn new(
        classifier: Box<dyn RiskClassifier>,
        scaler: Scaler,
        columns: ExpectedColumns,
        policy: SchemaPolicy,
    ) -> Result<Self> {
        scaler.check(columns.len())?;
        if let Some(width) = classifier.width() {
            if width != columns.len() {
                return Err(HeartError::schema(format!(
                    "classifier fitted on {} columns, schema has {}",
                    width,
                    columns.len()
                )));
            }
        }
        if policy == SchemaPolicy::Strict {
            columns.check_coverage()?;
        }
        Ok(Self {
            classifier,
            scaler,
            columns,
        })
    }

    pub fn load(config: &PredictorConfig) -> Result<Self> {
        let columns: ExpectedColumns = read_json(&config.columns_path())?;
        let scaler: Scaler = read_json(&config.scaler_path())?;
        let model_path = config.model_path();
        let artifact: ClassifierArtifact = read_json(&model_path)?;
        artifact
            .check()
            .map_err(|e| HeartError::artifact_load(&model_path, e))?;

        let artifacts = Self::new(
            artifact.into_classifier(),
            scaler,
            columns,
            config.schema_policy,
        )?;
        info!(
            "loaded {} classifier with {} scaler over {} columns from {:?}",
            artifacts.classifier.kind(),
            artifacts.scaler.kind(),
            artifacts.columns.len(),
            config.artifact_dir
        );
        Ok(artifacts)
    }

    pub fn classifier(&self) -> &dyn RiskClassifier {
        self.classifier.as_ref()
    }

    pub fn scaler(&self) -> &Scaler {
        &self.scaler
    }

    pub fn columns(&self) -> &ExpectedColumns {
        &self.columns
    }
}

/// Loads artifacts on first use and shares them for the rest of the process.
pub struct ArtifactCache {
    config: PredictorConfig,
    cell: OnceLock<std::result::Result<Arc<ModelArtifacts>, String>>,
}

impl ArtifactCache {
    pub fn new(config: PredictorConfig) -> Self {
        Self {
            config,
            cell: OnceLock::new(),
        }
    }

    pub fn config(&self) -> &PredictorConfig {
        &self.config
    }

    pub fn get(&self) -> Result<Arc<ModelArtifacts>> {
        let loaded = self.cell.get_or_init(|| match ModelArtifacts::load(&self.config) {
            Ok(artifacts) => Ok(Arc::new(artifacts)),
            Err(e) => {
                error!("model loading error: {}", e);
                Err(e.to_string())
            }
        });
        match loaded {
            Ok(artifacts) => Ok(Arc::clone(artifacts)),
            Err(reason) => Err(HeartError::ArtifactsUnavailable(reason.clone())),
        }
    }

    pub fn is_loaded(&self) -> bool {
        matches!(self.cell.get(), Some(Ok(_)))
    }
}

//! Heart disease risk screening.
//!
//! Answers to a short health questionnaire are encoded into the feature
//! layout a pre-trained classifier expects, scaled with the scaler fitted
//! alongside it and classified into low or elevated risk with a confidence
//! percentage.
//!
//! ```no_run
//! use std::sync::Arc;
//!
//! use heart_risk::{ModelArtifacts, PredictorConfig, Predictor, RawAnswers};
//!
//! let artifacts = ModelArtifacts::load(&PredictorConfig::default())?;
//! let predictor = Predictor::new(Arc::new(artifacts));
//! let assessment = predictor.predict(&RawAnswers::default())?;
//! println!("{} ({:.1}%)", assessment.label, assessment.confidence);
//! # Ok::<(), heart_risk::HeartError>(())
//! ```

pub mod artifacts;
pub mod batch;
pub mod classifier;
pub mod cli;
pub mod config;
pub mod encoder;
pub mod error;
pub mod predictor;
pub mod records;
pub mod report;
pub mod scaler;

pub use artifacts::{ArtifactCache, ModelArtifacts};
pub use classifier::{ClassifierArtifact, RiskClassifier, RiskLabel};
pub use config::PredictorConfig;
pub use encoder::{encode, ExpectedColumns, SchemaPolicy};
pub use error::{HeartError, Result};
pub use predictor::{Assessment, ConfidenceSource, Predictor};
pub use records::RawAnswers;
pub use report::Report;
pub use scaler::Scaler;

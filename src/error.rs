//! Error type shared by every stage of the prediction pipeline.

use std::io;
use std::path::PathBuf;

use polars::prelude::PolarsError;
use smartcore::error::Failed;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum HeartError {
    #[error("I/O error: {0}")]
    Io(#[from] io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("data frame error: {0}")]
    Frame(#[from] PolarsError),

    #[error("classifier failure: {0}")]
    Classifier(#[from] Failed),

    /// An artifact file could not be read or decoded.
    #[error("could not load artifact {path:?}: {reason}")]
    ArtifactLoad { path: PathBuf, reason: String },

    /// The artifacts failed to load earlier in this process; prediction stays disabled.
    #[error("model artifacts unavailable: {0}")]
    ArtifactsUnavailable(String),

    #[error("schema mismatch: {0}")]
    SchemaMismatch(String),

    #[error("{field} = {value} is outside {min}..={max}")]
    OutOfRange {
        field: &'static str,
        value: String,
        min: String,
        max: String,
    },

    #[error("unrecognised {field} value {value:?}")]
    UnknownCategory { field: &'static str, value: String },

    #[error("vector has {actual} values, expected {expected}")]
    DimensionMismatch { expected: usize, actual: usize },

    #[error("classifier returned label {0}, expected 0 or 1")]
    InvalidLabel(i64),

    #[error("classifier does not expose class probabilities")]
    ProbabilityUnavailable,

    #[error("row {row}: {reason}")]
    Row { row: usize, reason: String },

    #[error("invalid configuration: {0}")]
    Config(String),
}

pub type Result<T> = std::result::Result<T, HeartError>;

impl HeartError {
    pub fn artifact_load<P: Into<PathBuf>, S: ToString>(path: P, reason: S) -> Self {
        HeartError::ArtifactLoad {
            path: path.into(),
            reason: reason.to_string(),
        }
    }

    pub fn schema<S: Into<String>>(msg: S) -> Self {
        HeartError::SchemaMismatch(msg.into())
    }

    pub fn unknown_category<S: Into<String>>(field: &'static str, value: S) -> Self {
        HeartError::UnknownCategory {
            field,
            value: value.into(),
        }
    }
}

//! Error types for the pipeline stages.

use std::path::PathBuf;

use thiserror::Error;

/// Result alias used by every pipeline stage.
pub type Result<T> = std::result::Result<T, PipelineError>;

/// Error type for pipeline operations.
///
/// Everything here is fatal for the stage that raised it. Malformed serial
/// records are not represented here: they are skipped by the acquisition
/// loop (see [`crate::acquisition::RecordError`]).
#[derive(Debug, Error)]
pub enum PipelineError {
    /// I/O error on an artifact or device.
    #[error("I/O error on {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    /// CSV encoding or decoding failure.
    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),
    /// JSON artifact encoding or decoding failure.
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
    /// Binary artifact encoding or decoding failure.
    #[error("Serialization error: {0}")]
    Bincode(#[from] bincode::Error),
    /// Serial port could not be opened or configured.
    #[error("Serial port error: {0}")]
    Serial(#[from] serialport::Error),
    /// Empty data provided where non-empty was required.
    #[error("Empty data: {0}")]
    EmptyData(String),
    /// Feature dimension mismatch.
    #[error("Feature mismatch: expected {expected} features, got {got}")]
    FeatureMismatch { expected: usize, got: usize },
    /// Label vector and feature matrix disagree on the number of samples.
    #[error("Length mismatch: {labels} labels but {features} feature rows")]
    LengthMismatch { labels: usize, features: usize },
    /// A feature has zero (or non-finite) spread and cannot be standardized.
    #[error("Degenerate scale: feature {feature} has zero variance")]
    DegenerateScale { feature: usize },
    /// A raw CSV row could not be parsed.
    #[error("Invalid row {row}: {reason}")]
    InvalidRow { row: usize, reason: String },
    /// A label is outside the configured class range.
    #[error("Invalid label {label} at row {row}: expected 0..{n_classes}")]
    InvalidLabel {
        row: usize,
        label: usize,
        n_classes: usize,
    },
    /// Invalid hyperparameter or configuration value.
    #[error("Invalid parameter: {0}")]
    InvalidParameter(String),
    /// A model or artifact does not have the shape the consumer requires.
    #[error("Shape mismatch in {what}: expected {expected}, got {got}")]
    ShapeMismatch {
        what: &'static str,
        expected: String,
        got: String,
    },
}

impl PipelineError {
    /// Wrap an [`std::io::Error`] with the path it happened on.
    pub fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        PipelineError::Io {
            path: path.into(),
            source,
        }
    }
}

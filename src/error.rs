//! Crate-level error type and `Result` alias for stable, structured error handling.
//! Converts underlying I/O, GDAL, image and HTTP errors, and provides semantic
//! variants for each pipeline stage (source, extraction, batching, models).
use std::time::Duration;

use thiserror::Error;

pub type Result<T> = std::result::Result<T, Error>;

#[derive(Debug, Error)]
pub enum Error {
    #[error("Source unavailable: {location}: {reason}")]
    SourceUnavailable { location: String, reason: String },

    #[error("{kind} index {index} out of range (available: {available})")]
    IndexOutOfRange {
        kind: &'static str,
        index: usize,
        available: usize,
    },

    #[error("Malformed record {index}: {reason}")]
    MalformedRecord { index: u64, reason: String },

    #[error("Shape mismatch at row {row}: expected length {expected}, found {found}")]
    ShapeMismatch {
        row: usize,
        expected: usize,
        found: usize,
    },

    #[error("Training diverged at epoch {epoch}: loss={loss}")]
    TrainingDiverged { epoch: usize, loss: f32 },

    #[error("Model load failed for '{id}': {reason}")]
    ModelLoadFailed { id: String, reason: String },

    #[error("Timed out after {after:?} during {stage}")]
    Timeout { stage: &'static str, after: Duration },

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("GDAL error: {0}")]
    Gdal(#[from] crate::io::GdalError),

    #[error("Image error: {0}")]
    Image(#[from] image::ImageError),

    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Invalid argument: {arg}={value}")]
    InvalidArgument { arg: &'static str, value: String },

    #[error("Missing required argument: {arg}")]
    MissingArgument { arg: String },

    #[error("Processing error: {0}")]
    Processing(String),

    #[error("External error: {0}")]
    External(String),
}

impl Error {
    pub fn external<E: std::fmt::Display>(e: E) -> Self {
        Error::External(e.to_string())
    }

    pub fn source_unavailable(location: impl Into<String>, reason: impl std::fmt::Display) -> Self {
        Error::SourceUnavailable {
            location: location.into(),
            reason: reason.to_string(),
        }
    }

    pub fn model_load_failed(id: impl Into<String>, reason: impl std::fmt::Display) -> Self {
        Error::ModelLoadFailed {
            id: id.into(),
            reason: reason.to_string(),
        }
    }
}

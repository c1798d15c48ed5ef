//! Error types for the GHOST evaluator.

use std::path::PathBuf;
use thiserror::Error;

/// Result type alias using our custom error.
pub type Result<T> = std::result::Result<T, GhostError>;

/// Errors that can occur while loading, aggregating or scoring predictions.
#[derive(Error, Debug)]
pub enum GhostError {
    /// Error reading or writing files.
    #[error("I/O error for path '{path}': {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// Error during serialization/deserialization.
    #[error("Serialization error: {0}")]
    Serialization(String),

    /// The prediction file does not exist.
    #[error("Prediction file not found at '{0}'")]
    PredictionsNotFound(PathBuf),

    /// The dataset file does not exist.
    #[error("Dataset file not found at '{0}'")]
    DatasetNotFound(PathBuf),

    /// Malformed input: empty, wrong shape, missing fields or a bad question key.
    #[error("Invalid format: {0}")]
    Format(String),

    /// A category outside `objects`, `attributes`, `relations` was requested.
    #[error("Invalid category: {0}")]
    InvalidCategory(String),

    /// Configuration file or value error.
    #[error("Configuration error: {0}")]
    Config(String),
}

impl GhostError {
    /// Create an I/O error with path context.
    pub fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Self::Io {
            path: path.into(),
            source,
        }
    }

    /// Create a format error from anything displayable.
    pub fn format(message: impl Into<String>) -> Self {
        Self::Format(message.into())
    }
}

impl From<serde_json::Error> for GhostError {
    fn from(err: serde_json::Error) -> Self {
        GhostError::Serialization(err.to_string())
    }
}

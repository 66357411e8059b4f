//! Error type for the recognition pipeline.
//!
//! Every variant is detected eagerly and surfaced synchronously. None of them
//! describe a transient condition, so callers should not retry.

use hi_model::ModelError;
use thiserror::Error;

use crate::config::ConfigError;

/// Result type alias for hi-core operations.
pub type Result<T> = std::result::Result<T, Error>;

#[derive(Debug, Error)]
pub enum Error {
    /// An input vector has the wrong length. Caller bug.
    #[error("Dimension mismatch for {what}: expected {expected}, got {got}")]
    DimensionMismatch {
        what: &'static str,
        expected: usize,
        got: usize,
    },

    /// An input vector contains NaN or an infinity.
    #[error("Non-finite value in {what} at index {index}")]
    NonFiniteFeature { what: &'static str, index: usize },

    /// The trained model carries a degenerate parameter.
    #[error("Invalid model parameter {field}: {message}")]
    InvalidModelParameter { field: String, message: String },

    /// The trained model could not be read, parsed or is inconsistent.
    #[error("Model load failed: {0}")]
    ModelLoad(#[source] ModelError),

    /// A frame arrived before any model was loaded.
    #[error("Recognizer not initialized: load a model before sending frames")]
    NotInitialized,

    /// Every hidden state of a chain became unreachable.
    #[error("Numerical instability in chain '{chain}': {message}")]
    NumericalInstability { chain: String, message: String },

    #[error(transparent)]
    Config(#[from] ConfigError),
}

impl Error {
    /// Stable error code for structured reporting.
    pub fn code(&self) -> u32 {
        match self {
            Error::DimensionMismatch { .. } => 10,
            Error::NonFiniteFeature { .. } => 11,
            Error::InvalidModelParameter { .. } => 20,
            Error::ModelLoad(inner) => inner.code(),
            Error::NotInitialized => 30,
            Error::NumericalInstability { .. } => 31,
            Error::Config(_) => 50,
        }
    }
}

impl From<ModelError> for Error {
    fn from(err: ModelError) -> Self {
        match err {
            ModelError::InvalidParameter { field, message } => {
                Error::InvalidModelParameter { field, message }
            }
            other => Error::ModelLoad(other),
        }
    }
}

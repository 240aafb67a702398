//! Serving-path error types

use std::path::PathBuf;

use thiserror::Error;

/// Failure of a single prediction call or of a model load.
///
/// The gateway never recovers from any of these; callers translate them
/// into transport-level responses.
#[derive(Debug, Error)]
pub enum PredictionError {
    #[error("model not found at {}; train and export the model first", path.display())]
    ModelNotFound { path: PathBuf },

    #[error("model at {} could not be loaded: {reason}", path.display())]
    ModelCorrupt { path: PathBuf, reason: String },

    #[error("missing feature: {0}")]
    MissingFeature(String),

    #[error("invalid value for feature: {0}")]
    InvalidValue(String),

    #[error("classifier failure: {0}")]
    ClassifierFailure(String),
}

impl PredictionError {
    /// True when the caller supplied a bad record
    pub fn is_input_error(&self) -> bool {
        matches!(self, PredictionError::MissingFeature(_) | PredictionError::InvalidValue(_))
    }
}

/// Raised by a classifier implementation during inference
#[derive(Debug, Error)]
#[error("InferenceError: {0}")]
pub struct InferenceError(pub String);

impl From<InferenceError> for PredictionError {
    fn from(err: InferenceError) -> Self {
        PredictionError::ClassifierFailure(err.0)
    }
}

/// Bundle shape problems detected while assembling a bundle
#[derive(Debug, Error, PartialEq, Eq)]
pub enum BundleError {
    #[error("bundle has no features")]
    NoFeatures,

    #[error("duplicate feature name: {0}")]
    DuplicateFeature(String),

    #[error("empty feature name at position {0}")]
    EmptyFeatureName(usize),
}

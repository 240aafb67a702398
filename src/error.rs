//! Error handling

use axum::{
    response::{IntoResponse, Response},
    http::StatusCode,
    Json,
};
use serde_json::json;

use crate::model::PredictionError;

pub type AppResult<T> = Result<T, AppError>;

#[derive(Debug)]
pub enum AppError {
    // Request errors
    ValidationError(String),

    // Model errors
    ModelUnavailable(String),

    // Generic errors
    InternalError(String),
}

impl AppError {
    /// Status code and client-facing message. Server-side detail is logged
    /// here and never returned.
    pub fn status_and_message(&self) -> (StatusCode, &str) {
        match self {
            AppError::ValidationError(msg) => (StatusCode::BAD_REQUEST, msg.as_str()),
            AppError::ModelUnavailable(msg) => {
                tracing::error!("Model unavailable: {}", msg);
                (StatusCode::SERVICE_UNAVAILABLE, "Risk model is not available")
            }
            AppError::InternalError(msg) => {
                tracing::error!("Internal error: {}", msg);
                (StatusCode::INTERNAL_SERVER_ERROR, "Internal server error")
            }
        }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let (status, error_message) = self.status_and_message();

        let body = Json(json!({
            "error": error_message,
            "status": status.as_u16()
        }));

        (status, body).into_response()
    }
}

impl From<PredictionError> for AppError {
    fn from(err: PredictionError) -> Self {
        match err {
            PredictionError::MissingFeature(_) | PredictionError::InvalidValue(_) => {
                AppError::ValidationError(err.to_string())
            }
            PredictionError::ModelNotFound { .. } => AppError::ModelUnavailable(err.to_string()),
            PredictionError::ModelCorrupt { .. } | PredictionError::ClassifierFailure(_) => {
                AppError::InternalError(err.to_string())
            }
        }
    }
}

impl From<tokio::task::JoinError> for AppError {
    fn from(err: tokio::task::JoinError) -> Self {
        AppError::InternalError(format!("prediction task failed: {}", err))
    }
}

//! HTTP handlers

pub mod health;
pub mod predict;
pub mod form;

use tokio::task::JoinError;

use crate::AppState;
use crate::model::{PredictionError, PredictionRequest, PredictionResult};

/// Run the gateway off the async workers; inference is blocking CPU work.
pub(crate) async fn run_prediction(
    state: &AppState,
    request: PredictionRequest,
) -> Result<Result<PredictionResult, PredictionError>, JoinError> {
    let gateway = state.gateway.clone();
    tokio::task::spawn_blocking(move || gateway.predict(&request)).await
}

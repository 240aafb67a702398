//! Financial Risk Prediction Service
//!
//! Serves risk predictions from a trained classifier.
//!
//! # Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────┐
//! │                      RISK SERVE                             │
//! ├─────────────────────────────────────────────────────────────┤
//! │  ┌───────────┐  ┌───────────┐                               │
//! │  │  JSON API │  │ HTML Form │                               │
//! │  │  (Axum)   │  │  (Axum)   │                               │
//! │  └─────┬─────┘  └─────┬─────┘                               │
//! │        └──────┬───────┘                                     │
//! │               ▼                                             │
//! │      ┌──────────────────┐     ┌──────────────────┐          │
//! │      │ Prediction       │────▶│ Model Cache      │          │
//! │      │ Gateway          │     │ (lazy, once)     │          │
//! │      └────────┬─────────┘     └────────┬─────────┘          │
//! │               ▼                        ▼                    │
//! │      ┌──────────────────┐     ┌──────────────────┐          │
//! │      │ Classifier       │     │ risk_model.onnx  │          │
//! │      │ (ONNX Runtime)   │     │                  │          │
//! │      └──────────────────┘     └──────────────────┘          │
//! └─────────────────────────────────────────────────────────────┘
//! ```

pub mod config;
pub mod error;
pub mod handlers;
pub mod model;

use std::sync::Arc;

use axum::{
    Router,
    routing::{get, post},
};
use tower_http::{
    cors::{CorsLayer, Any},
    trace::TraceLayer,
    compression::CompressionLayer,
};

pub use error::{AppError, AppResult};

/// Shared application state
#[derive(Clone)]
pub struct AppState {
    pub gateway: Arc<model::PredictionGateway>,
    pub config: config::Config,
}

impl AppState {
    /// State backed by the ONNX model at the configured path
    pub fn from_config(config: config::Config) -> Self {
        let cache = Arc::new(model::ModelCache::onnx(config.model_path.clone()));

        Self {
            gateway: Arc::new(model::PredictionGateway::new(cache)),
            config,
        }
    }
}

/// Create the main router with all routes
pub fn create_router(state: AppState) -> Router {
    let api_routes = Router::new()
        .route("/health", get(handlers::health::check))
        .route("/api/predict", post(handlers::predict::predict_json))
        .route("/api/model/status", get(handlers::predict::status));

    let form_routes = Router::new()
        .route("/", get(handlers::form::show).post(handlers::form::submit));

    Router::new()
        .merge(api_routes)
        .merge(form_routes)
        .layer(CompressionLayer::new())
        .layer(TraceLayer::new_for_http())
        .layer(
            CorsLayer::new()
                .allow_origin(Any)
                .allow_methods(Any)
                .allow_headers(Any)
        )
        .with_state(state)
}

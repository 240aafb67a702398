//! Prediction handlers

use axum::{
    extract::{rejection::JsonRejection, State},
    Json,
};
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::{AppState, AppError, AppResult};
use crate::model::{EngineStatus, PredictionRequest, PredictionResult};
use super::run_prediction;

#[derive(Debug, Serialize, Deserialize)]
pub struct PredictResponse {
    pub prediction: u8,
    pub probability: Option<f32>,
}

impl From<PredictionResult> for PredictResponse {
    fn from(result: PredictionResult) -> Self {
        Self {
            prediction: result.label.as_class(),
            probability: result.probability,
        }
    }
}

/// POST /api/predict
pub async fn predict_json(
    State(state): State<AppState>,
    payload: Result<Json<Value>, JsonRejection>,
) -> AppResult<Json<PredictResponse>> {
    let Json(payload) = payload
        .map_err(|e| AppError::ValidationError(format!("invalid json: {}", e.body_text())))?;

    let Value::Object(fields) = payload else {
        return Err(AppError::ValidationError("expected a JSON object".to_string()));
    };

    let result = run_prediction(&state, PredictionRequest::from(fields))
        .await?
        .map_err(|err| {
            if err.is_input_error() {
                tracing::debug!("Rejected record: {}", err);
            }
            AppError::from(err)
        })?;

    Ok(Json(result.into()))
}

/// GET /api/model/status
pub async fn status(State(state): State<AppState>) -> Json<EngineStatus> {
    Json(state.gateway.status())
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use axum::{
        body::{to_bytes, Body},
        http::{header, Method, Request, StatusCode},
        Router,
    };
    use serde_json::json;
    use tower::ServiceExt;

    use crate::{create_router, AppState};
    use crate::config::Config;
    use crate::model::{ModelBundle, ModelCache, PredictionGateway};
    use crate::model::testing::{formula_bundle, canonical_features, BrokenClassifier};

    fn test_config() -> Config {
        Config::from_lookup(|_| None)
    }

    fn app_with(cache: ModelCache) -> Router {
        create_router(AppState {
            gateway: Arc::new(PredictionGateway::new(Arc::new(cache))),
            config: test_config(),
        })
    }

    fn app() -> Router {
        app_with(ModelCache::preloaded("models/test.onnx", formula_bundle()))
    }

    fn missing_model_app(dir: &tempfile::TempDir) -> Router {
        app_with(ModelCache::onnx(dir.path().join("risk_model.onnx")))
    }

    fn high_risk_json() -> serde_json::Value {
        json!({
            "income": 50000,
            "age": 30,
            "loan_amount": 40000,
            "loan_term_months": 36,
            "credit_score": 580,
            "num_of_defaults": 2,
            "employment_years": 1.0
        })
    }

    async fn send(app: Router, request: Request<Body>) -> (StatusCode, Vec<u8>) {
        let response = app.oneshot(request).await.unwrap();
        let status = response.status();
        let body = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        (status, body.to_vec())
    }

    async fn post_json(app: Router, body: String) -> (StatusCode, serde_json::Value) {
        let request = Request::builder()
            .method(Method::POST)
            .uri("/api/predict")
            .header(header::CONTENT_TYPE, "application/json")
            .body(Body::from(body))
            .unwrap();

        let (status, bytes) = send(app, request).await;
        (status, serde_json::from_slice(&bytes).unwrap())
    }

    /// Every form response is an HTML page, whatever the status
    async fn post_form(app: Router, body: &str) -> (StatusCode, String) {
        let request = Request::builder()
            .method(Method::POST)
            .uri("/")
            .header(header::CONTENT_TYPE, "application/x-www-form-urlencoded")
            .body(Body::from(body.to_string()))
            .unwrap();

        let response = app.oneshot(request).await.unwrap();
        let status = response.status();
        let content_type = response.headers()
            .get(header::CONTENT_TYPE)
            .and_then(|v| v.to_str().ok())
            .unwrap_or_default()
            .to_string();
        assert!(content_type.starts_with("text/html"), "content type: {}", content_type);

        let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        (status, String::from_utf8(bytes.to_vec()).unwrap())
    }

    const FORM_BODY: &str = "income=50%2C000&age=30&loan_amount=40%2C000&loan_term_months=36\
                             &credit_score=580&num_of_defaults=2&employment_years=1.0";

    #[tokio::test]
    async fn test_predict_high_risk() {
        let (status, body) = post_json(app(), high_risk_json().to_string()).await;

        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["prediction"], 1);
        let p = body["probability"].as_f64().unwrap();
        assert!((0.0..=1.0).contains(&p));
    }

    #[tokio::test]
    async fn test_predict_ignores_extra_keys() {
        let mut payload = high_risk_json();
        payload["nickname"] = json!("ace");

        let (status, body) = post_json(app(), payload.to_string()).await;

        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["prediction"], 1);
    }

    #[tokio::test]
    async fn test_predict_missing_key() {
        let mut payload = high_risk_json();
        payload.as_object_mut().unwrap().remove("credit_score");

        let (status, body) = post_json(app(), payload.to_string()).await;

        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body["error"], "missing feature: credit_score");
        assert_eq!(body["status"], 400);
    }

    #[tokio::test]
    async fn test_predict_invalid_value() {
        let mut payload = high_risk_json();
        payload["age"] = json!({ "years": 30 });

        let (status, body) = post_json(app(), payload.to_string()).await;

        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body["error"], "invalid value for feature: age");
    }

    #[tokio::test]
    async fn test_predict_malformed_json() {
        let (status, body) = post_json(app(), "{\"income\": ".to_string()).await;

        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert!(body["error"].as_str().unwrap().starts_with("invalid json"));
    }

    #[tokio::test]
    async fn test_predict_non_object() {
        let (status, body) = post_json(app(), "[1, 2, 3]".to_string()).await;

        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body["error"], "expected a JSON object");
    }

    #[tokio::test]
    async fn test_predict_without_model() {
        let dir = tempfile::tempdir().unwrap();

        let (status, body) = post_json(missing_model_app(&dir), high_risk_json().to_string()).await;

        assert_eq!(status, StatusCode::SERVICE_UNAVAILABLE);
        assert_eq!(body["error"], "Risk model is not available");
    }

    #[tokio::test]
    async fn test_classifier_failure_hides_detail() {
        let bundle = ModelBundle::new(Box::new(BrokenClassifier), canonical_features()).unwrap();
        let app = app_with(ModelCache::preloaded("models/test.onnx", bundle));

        let (status, body) = post_json(app, high_risk_json().to_string()).await;

        assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(body["error"], "Internal server error");
        assert!(!body.to_string().contains("shape"));
    }

    #[tokio::test]
    async fn test_predict_requires_post() {
        let request = Request::builder()
            .uri("/api/predict")
            .body(Body::empty())
            .unwrap();

        let (status, _) = send(app(), request).await;
        assert_eq!(status, StatusCode::METHOD_NOT_ALLOWED);
    }

    #[tokio::test]
    async fn test_model_status() {
        let app = app();
        post_json(app.clone(), high_risk_json().to_string()).await;

        let request = Request::builder()
            .uri("/api/model/status")
            .body(Body::empty())
            .unwrap();
        let (status, bytes) = send(app, request).await;
        let body: serde_json::Value = serde_json::from_slice(&bytes).unwrap();

        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["model_loaded"], true);
        assert_eq!(body["inference_count"], 1);
        assert_eq!(body["features"].as_array().unwrap().len(), 7);
    }

    #[tokio::test]
    async fn test_health() {
        let dir = tempfile::tempdir().unwrap();
        let request = Request::builder()
            .uri("/health")
            .body(Body::empty())
            .unwrap();

        let (status, bytes) = send(missing_model_app(&dir), request).await;
        let body: serde_json::Value = serde_json::from_slice(&bytes).unwrap();

        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["status"], "healthy");
        assert_eq!(body["model_loaded"], false);
    }

    #[tokio::test]
    async fn test_form_page() {
        let request = Request::builder().uri("/").body(Body::empty()).unwrap();

        let (status, bytes) = send(app(), request).await;
        let html = String::from_utf8(bytes).unwrap();

        assert_eq!(status, StatusCode::OK);
        assert!(html.contains("name=\"credit_score\""));
    }

    #[tokio::test]
    async fn test_form_submission() {
        let (status, html) = post_form(app(), FORM_BODY).await;

        assert_eq!(status, StatusCode::OK);
        assert!(html.contains("High Risk"));
        assert!(html.contains("Confidence"));
    }

    #[tokio::test]
    async fn test_form_without_model_renders_error_page() {
        let dir = tempfile::tempdir().unwrap();

        let (status, html) = post_form(missing_model_app(&dir), FORM_BODY).await;

        assert_eq!(status, StatusCode::SERVICE_UNAVAILABLE);
        assert!(html.contains("Risk model is not available"));
        assert!(!html.contains("\"status\""));
        assert!(!html.contains("risk_model.onnx"));
    }

    #[tokio::test]
    async fn test_form_classifier_failure_renders_error_page() {
        let bundle = ModelBundle::new(Box::new(BrokenClassifier), canonical_features()).unwrap();
        let app = app_with(ModelCache::preloaded("models/test.onnx", bundle));

        let (status, html) = post_form(app, FORM_BODY).await;

        assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
        assert!(html.contains("Internal server error"));
        assert!(!html.contains("shape"));
    }

    #[tokio::test]
    async fn test_form_validation_errors() {
        let body = "income=50000&age=16&loan_amount=40000&loan_term_months=36\
                    &credit_score=580&num_of_defaults=2";

        let (status, html) = post_form(app(), body).await;

        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert!(html.contains("greater than or equal to 18"));
        assert!(html.contains("This field is required."));
    }
}

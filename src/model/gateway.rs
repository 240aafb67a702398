//! Prediction Gateway - validated record in, risk label out

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Instant;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::bundle::{PredictionResult, RiskLabel};
use super::cache::ModelCache;
use super::error::PredictionError;
use super::features::{canonical_layout_hash, layout_hash};
use super::request::PredictionRequest;

/// Engine status for the status endpoint
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EngineStatus {
    pub model_loaded: bool,
    pub model_path: String,
    pub features: Vec<String>,
    pub layout_hash: Option<u32>,
    /// Bundle columns match the applicant form, in form order
    pub canonical_layout: bool,
    pub loaded_at: Option<DateTime<Utc>>,
    pub inference_device: String,
    pub avg_latency_ms: f32,
    pub inference_count: u64,
}

pub struct PredictionGateway {
    cache: Arc<ModelCache>,
    latency_sum_us: AtomicU64,
    inference_count: AtomicU64,
}

impl PredictionGateway {
    pub fn new(cache: Arc<ModelCache>) -> Self {
        Self {
            cache,
            latency_sum_us: AtomicU64::new(0),
            inference_count: AtomicU64::new(0),
        }
    }

    pub fn cache(&self) -> &ModelCache {
        &self.cache
    }

    /// Predict the risk class of one record.
    ///
    /// Keys not in the bundle's feature list are ignored. The classifier is
    /// only invoked once every feature has been read and coerced.
    pub fn predict(&self, record: &PredictionRequest) -> Result<PredictionResult, PredictionError> {
        let bundle = self.cache.get_bundle()?;
        let row = record.to_vector(bundle.features())?;

        let start_time = Instant::now();
        let classifier = bundle.classifier();

        let (class, distribution) = classifier.predict(&row)?;
        let label = RiskLabel::from_class(class).ok_or_else(|| {
            PredictionError::ClassifierFailure(format!("unexpected class label {}", class))
        })?;

        let probability = match distribution {
            Some(distribution) => Some(probability_of(&distribution, label)?),
            None => None,
        };

        self.latency_sum_us.fetch_add(start_time.elapsed().as_micros() as u64, Ordering::Relaxed);
        self.inference_count.fetch_add(1, Ordering::Relaxed);

        tracing::debug!("Prediction: {:?} (p={:?})", label, probability);

        Ok(PredictionResult { label, probability })
    }

    pub fn status(&self) -> EngineStatus {
        let bundle = self.cache.peek();

        let sum = self.latency_sum_us.load(Ordering::Relaxed);
        let count = self.inference_count.load(Ordering::Relaxed);
        let avg = if count > 0 { (sum as f32 / count as f32) / 1000.0 } else { 0.0 };

        EngineStatus {
            model_loaded: bundle.is_some(),
            model_path: self.cache.path().display().to_string(),
            features: bundle.as_ref().map(|b| b.features().to_vec()).unwrap_or_default(),
            layout_hash: bundle.as_ref().map(|b| layout_hash(b.features())),
            canonical_layout: bundle.as_ref()
                .is_some_and(|b| layout_hash(b.features()) == canonical_layout_hash()),
            loaded_at: bundle.as_ref().map(|b| b.loaded_at()),
            inference_device: bundle.as_ref()
                .map(|b| b.classifier().backend().to_string())
                .unwrap_or_else(|| "None".to_string()),
            avg_latency_ms: avg,
            inference_count: count,
        }
    }
}

/// Probability the model assigns to `label`
fn probability_of(distribution: &[f32], label: RiskLabel) -> Result<f32, PredictionError> {
    let index = label.as_class() as usize;

    let p = distribution.get(index).copied().ok_or_else(|| {
        PredictionError::ClassifierFailure(format!(
            "probability output has {} classes, label is {}",
            distribution.len(),
            index
        ))
    })?;

    if !(0.0..=1.0).contains(&p) {
        return Err(PredictionError::ClassifierFailure(format!("probability {} out of range", p)));
    }

    Ok(p)
}

//! Model Bundle - classifier plus the feature order it was trained on

use std::collections::HashSet;
use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::error::{BundleError, InferenceError};

// ============================================================================
// CLASSIFIER TRAIT
// ============================================================================

/// Opaque trained classifier (ONNX, test doubles, etc.)
///
/// Implementations must be safe for concurrent read-only inference.
pub trait Classifier: Send + Sync {
    /// Predict the class label for one row
    fn predict_label(&self, row: &[f32]) -> Result<i64, InferenceError>;

    /// Per-class probabilities for one row, indexed by class label.
    /// `Ok(None)` when the model has no probability output.
    fn predict_probability(&self, row: &[f32]) -> Result<Option<Vec<f32>>, InferenceError> {
        let _ = row;
        Ok(None)
    }

    /// Label and class probabilities for one row.
    /// Backends that produce both in a single pass should override this.
    fn predict(&self, row: &[f32]) -> Result<(i64, Option<Vec<f32>>), InferenceError> {
        Ok((self.predict_label(row)?, self.predict_probability(row)?))
    }

    /// Short backend description for status reporting
    fn backend(&self) -> &str {
        "custom"
    }
}

// ============================================================================
// BUNDLE
// ============================================================================

/// Trained classifier paired with its ordered feature names.
/// Immutable once built.
pub struct ModelBundle {
    classifier: Box<dyn Classifier>,
    features: Vec<String>,
    loaded_at: DateTime<Utc>,
}

impl ModelBundle {
    pub fn new(
        classifier: Box<dyn Classifier>,
        features: Vec<String>,
    ) -> Result<Self, BundleError> {
        if features.is_empty() {
            return Err(BundleError::NoFeatures);
        }

        let mut seen = HashSet::with_capacity(features.len());
        for (i, name) in features.iter().enumerate() {
            if name.trim().is_empty() {
                return Err(BundleError::EmptyFeatureName(i));
            }
            if !seen.insert(name.as_str()) {
                return Err(BundleError::DuplicateFeature(name.clone()));
            }
        }

        Ok(Self {
            classifier,
            features,
            loaded_at: Utc::now(),
        })
    }

    pub fn classifier(&self) -> &dyn Classifier {
        self.classifier.as_ref()
    }

    /// Feature names in column order
    pub fn features(&self) -> &[String] {
        &self.features
    }

    pub fn loaded_at(&self) -> DateTime<Utc> {
        self.loaded_at
    }
}

impl fmt::Debug for ModelBundle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ModelBundle")
            .field("backend", &self.classifier.backend())
            .field("features", &self.features)
            .field("loaded_at", &self.loaded_at)
            .finish()
    }
}

// ============================================================================
// PREDICTION OUTPUT
// ============================================================================

/// Risk class predicted by the model
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum RiskLabel {
    Low,
    High,
}

impl RiskLabel {
    pub fn from_class(class: i64) -> Option<Self> {
        match class {
            0 => Some(RiskLabel::Low),
            1 => Some(RiskLabel::High),
            _ => None,
        }
    }

    pub fn as_class(self) -> u8 {
        match self {
            RiskLabel::Low => 0,
            RiskLabel::High => 1,
        }
    }

    pub fn description(self) -> &'static str {
        match self {
            RiskLabel::Low => "Low Risk",
            RiskLabel::High => "High Risk",
        }
    }
}

/// Gateway output
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PredictionResult {
    pub label: RiskLabel,
    /// Confidence in `label`, when the model estimates probabilities
    pub probability: Option<f32>,
}

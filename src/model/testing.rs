//! Test doubles for the serving path

use std::path::Path;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use parking_lot::Mutex;
use serde::Deserialize;

use super::bundle::{Classifier, ModelBundle};
use super::cache::BundleLoader;
use super::error::{InferenceError, PredictionError};
use super::features::RISK_FEATURES;
use super::request::PredictionRequest;

/// Follows the synthetic risk formula the training data was labelled with:
/// loan/income raises risk, low credit raises risk, each default raises
/// risk, employment years lower it slightly.
///
/// Expects columns in `RISK_FEATURES` order.
pub struct FormulaClassifier;

impl FormulaClassifier {
    pub fn score(row: &[f32]) -> f32 {
        let income = row[0];
        let loan_amount = row[2];
        let credit_score = row[4];
        let defaults = row[5];
        let employment_years = row[6];

        (loan_amount / (income + 1.0)) * 0.6
            + (1.0 - (credit_score - 300.0) / 550.0) * 0.4
            + defaults * 0.2
            - employment_years * 0.02
    }

    fn positive_probability(row: &[f32]) -> f32 {
        1.0 / (1.0 + (-6.0 * (Self::score(row) - 0.5)).exp())
    }
}

impl Classifier for FormulaClassifier {
    fn predict_label(&self, row: &[f32]) -> Result<i64, InferenceError> {
        Ok(if Self::score(row) > 0.5 { 1 } else { 0 })
    }

    fn predict_probability(&self, row: &[f32]) -> Result<Option<Vec<f32>>, InferenceError> {
        let p = Self::positive_probability(row);
        Ok(Some(vec![1.0 - p, p]))
    }

    fn backend(&self) -> &str {
        "formula"
    }
}

/// Records every row it sees and answers with fixed outputs
#[derive(Clone)]
pub struct RecordingClassifier {
    pub rows: Arc<Mutex<Vec<Vec<f32>>>>,
    pub label: i64,
    pub probabilities: Option<Vec<f32>>,
}

impl RecordingClassifier {
    pub fn new(label: i64, probabilities: Option<Vec<f32>>) -> Self {
        Self {
            rows: Arc::new(Mutex::new(Vec::new())),
            label,
            probabilities,
        }
    }

    pub fn calls(&self) -> usize {
        self.rows.lock().len()
    }
}

impl Classifier for RecordingClassifier {
    fn predict_label(&self, row: &[f32]) -> Result<i64, InferenceError> {
        self.rows.lock().push(row.to_vec());
        Ok(self.label)
    }

    fn predict_probability(&self, _row: &[f32]) -> Result<Option<Vec<f32>>, InferenceError> {
        Ok(self.probabilities.clone())
    }
}

/// Answers only through the combined call, counting passes.
/// The per-output methods fail so a gateway that calls them shows up.
#[derive(Clone, Default)]
pub struct SinglePassClassifier {
    pub passes: Arc<AtomicUsize>,
}

impl SinglePassClassifier {
    pub fn passes(&self) -> usize {
        self.passes.load(Ordering::SeqCst)
    }
}

impl Classifier for SinglePassClassifier {
    fn predict(&self, _row: &[f32]) -> Result<(i64, Option<Vec<f32>>), InferenceError> {
        self.passes.fetch_add(1, Ordering::SeqCst);
        Ok((1, Some(vec![0.25, 0.75])))
    }

    fn predict_label(&self, _row: &[f32]) -> Result<i64, InferenceError> {
        Err(InferenceError("label requested separately".to_string()))
    }

    fn predict_probability(&self, _row: &[f32]) -> Result<Option<Vec<f32>>, InferenceError> {
        Err(InferenceError("probability requested separately".to_string()))
    }
}

/// Always fails inference
pub struct BrokenClassifier;

impl Classifier for BrokenClassifier {
    fn predict_label(&self, _row: &[f32]) -> Result<i64, InferenceError> {
        Err(InferenceError("tensor shape mismatch".to_string()))
    }
}

/// Artifact format used by `JsonLoader`
#[derive(Deserialize)]
struct FakeArtifact {
    features: Vec<String>,
}

/// Reads `{"features": [...]}` files into a formula-backed bundle and
/// counts how often it touches the filesystem.
#[derive(Clone, Default)]
pub struct JsonLoader {
    pub reads: Arc<AtomicUsize>,
}

impl JsonLoader {
    pub fn reads(&self) -> usize {
        self.reads.load(Ordering::SeqCst)
    }
}

impl BundleLoader for JsonLoader {
    fn load(&self, path: &Path) -> Result<ModelBundle, PredictionError> {
        self.reads.fetch_add(1, Ordering::SeqCst);

        let corrupt = |reason: String| PredictionError::ModelCorrupt {
            path: path.to_path_buf(),
            reason,
        };

        let raw = std::fs::read_to_string(path).map_err(|e| corrupt(e.to_string()))?;
        let artifact: FakeArtifact = serde_json::from_str(&raw).map_err(|e| corrupt(e.to_string()))?;

        ModelBundle::new(Box::new(FormulaClassifier), artifact.features)
            .map_err(|e| corrupt(e.to_string()))
    }
}

/// Write a `JsonLoader` artifact with the canonical layout
pub fn write_artifact(path: &Path) {
    let body = serde_json::json!({ "features": RISK_FEATURES });
    std::fs::write(path, body.to_string()).unwrap();
}

pub fn canonical_features() -> Vec<String> {
    RISK_FEATURES.iter().map(|s| s.to_string()).collect()
}

pub fn formula_bundle() -> ModelBundle {
    ModelBundle::new(Box::new(FormulaClassifier), canonical_features()).unwrap()
}

/// Applicant with a high loan-to-income ratio, poor credit and two defaults
pub fn high_risk_record() -> PredictionRequest {
    PredictionRequest::new()
        .with("income", 50000)
        .with("age", 30)
        .with("loan_amount", 40000)
        .with("loan_term_months", 36)
        .with("credit_score", 580)
        .with("num_of_defaults", 2)
        .with("employment_years", 1.0)
}

/// Well-paid applicant, small loan, strong credit, no defaults
pub fn low_risk_record() -> PredictionRequest {
    PredictionRequest::new()
        .with("income", 90000)
        .with("age", 45)
        .with("loan_amount", 5000)
        .with("loan_term_months", 24)
        .with("credit_score", 780)
        .with("num_of_defaults", 0)
        .with("employment_years", 10.0)
}

//! ONNX Runtime classifier
//!
//! Expects a classifier exported with the int64 label tensor as first output
//! and, optionally, the float class-probability tensor as second. A second
//! output of any other type (skl2onnx's default ZipMap) is ignored and the
//! model serves labels only; export with `zipmap=False` to get probabilities.
//! The training column order lives in the model's custom metadata under
//! `features`, either as a JSON array or comma separated.

use std::path::Path;

use ndarray::Array2;
use ort::session::{Session, builder::GraphOptimizationLevel};
use ort::tensor::TensorElementType;
use ort::value::Tensor;
use parking_lot::Mutex;

use super::bundle::{Classifier, ModelBundle};
use super::cache::BundleLoader;
use super::error::{InferenceError, PredictionError};

/// Metadata key holding the ordered feature names
pub const FEATURES_METADATA_KEY: &str = "features";

// ============================================================================
// OUTPUT SIGNATURE
// ============================================================================

/// Graph outputs the classifier reads
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OutputNames {
    pub label: String,
    pub probability: Option<String>,
}

/// Pick label and probability outputs from `(name, tensor element type)`
/// pairs in graph order. `None` marks a non-tensor output (sequence, map).
pub fn select_outputs(
    outputs: &[(String, Option<TensorElementType>)],
) -> Result<OutputNames, String> {
    let (label, label_type) = outputs
        .first()
        .ok_or_else(|| "model defines no outputs".to_string())?;

    if *label_type != Some(TensorElementType::Int64) {
        return Err(format!(
            "label output '{}' must be an int64 tensor, found {:?}",
            label, label_type
        ));
    }

    let probability = match outputs.get(1) {
        Some((name, Some(TensorElementType::Float32))) => Some(name.clone()),
        Some((name, other)) => {
            tracing::warn!(
                "Output '{}' is not a float tensor ({:?}), serving labels without probability. \
                 Re-export with zipmap=False to enable probabilities",
                name,
                other
            );
            None
        }
        None => None,
    };

    Ok(OutputNames {
        label: label.clone(),
        probability,
    })
}

// ============================================================================
// CLASSIFIER
// ============================================================================

pub struct OnnxClassifier {
    // run() needs exclusive access
    session: Mutex<Session>,
    outputs: OutputNames,
}

impl OnnxClassifier {
    pub fn from_session(session: Session) -> Result<Self, InferenceError> {
        let signature: Vec<(String, Option<TensorElementType>)> = session.outputs
            .iter()
            .map(|o| (o.name.clone(), o.output_type.tensor_type()))
            .collect();

        let outputs = select_outputs(&signature).map_err(InferenceError)?;

        Ok(Self {
            session: Mutex::new(session),
            outputs,
        })
    }

    fn input_tensor(row: &[f32]) -> Result<Tensor<f32>, InferenceError> {
        let input_array = Array2::<f32>::from_shape_vec((1, row.len()), row.to_vec())
            .map_err(|e| InferenceError(format!("Array error: {}", e)))?;

        Tensor::from_array(input_array)
            .map_err(|e| InferenceError(format!("Tensor error: {}", e)))
    }
}

impl Classifier for OnnxClassifier {
    /// One session run yields both outputs
    fn predict(&self, row: &[f32]) -> Result<(i64, Option<Vec<f32>>), InferenceError> {
        let input_tensor = Self::input_tensor(row)?;

        let mut session = self.session.lock();
        let outputs = session.run(ort::inputs![input_tensor])
            .map_err(|e| InferenceError(format!("Inference failed: {}", e)))?;

        let label = {
            let name = self.outputs.label.as_str();
            let output = outputs.get(name)
                .ok_or_else(|| InferenceError(format!("No output '{}'", name)))?;

            let (_, data) = output.try_extract_tensor::<i64>()
                .map_err(|e| InferenceError(format!("Extract error: {}", e)))?;

            data.first()
                .copied()
                .ok_or_else(|| InferenceError("Empty label tensor".to_string()))?
        };

        let probabilities = match self.outputs.probability.as_deref() {
            Some(name) => {
                let output = outputs.get(name)
                    .ok_or_else(|| InferenceError(format!("No output '{}'", name)))?;

                let (_, data) = output.try_extract_tensor::<f32>()
                    .map_err(|e| InferenceError(format!("Extract error: {}", e)))?;

                // Single row: the whole tensor is that row's class distribution
                Some(data.to_vec())
            }
            None => None,
        };

        Ok((label, probabilities))
    }

    fn predict_label(&self, row: &[f32]) -> Result<i64, InferenceError> {
        self.predict(row).map(|(label, _)| label)
    }

    fn predict_probability(&self, row: &[f32]) -> Result<Option<Vec<f32>>, InferenceError> {
        self.predict(row).map(|(_, probabilities)| probabilities)
    }

    fn backend(&self) -> &str {
        "ONNX Runtime (CPU)"
    }
}

// ============================================================================
// LOADER
// ============================================================================

/// Loads `.onnx` bundles from disk
#[derive(Debug, Default, Clone, Copy)]
pub struct OnnxLoader;

impl BundleLoader for OnnxLoader {
    fn load(&self, path: &Path) -> Result<ModelBundle, PredictionError> {
        let corrupt = |reason: String| PredictionError::ModelCorrupt {
            path: path.to_path_buf(),
            reason,
        };

        let session = Session::builder()
            .map_err(|e| corrupt(format!("Failed to create session builder: {}", e)))?
            .with_optimization_level(GraphOptimizationLevel::Level3)
            .map_err(|e| corrupt(format!("Failed to set optimization: {}", e)))?
            .commit_from_file(path)
            .map_err(|e| corrupt(format!("Failed to load model: {}", e)))?;

        let features = {
            let metadata = session.metadata()
                .map_err(|e| corrupt(format!("Failed to read metadata: {}", e)))?;
            let raw = metadata.custom(FEATURES_METADATA_KEY)
                .map_err(|e| corrupt(format!("Failed to read metadata: {}", e)))?
                .ok_or_else(|| corrupt(format!("metadata key '{}' is missing", FEATURES_METADATA_KEY)))?;
            parse_feature_list(&raw).map_err(corrupt)?
        };

        let classifier = OnnxClassifier::from_session(session)
            .map_err(|e| corrupt(e.0))?;

        ModelBundle::new(Box::new(classifier), features)
            .map_err(|e| corrupt(e.to_string()))
    }
}

/// Parse the `features` metadata value
pub fn parse_feature_list(raw: &str) -> Result<Vec<String>, String> {
    let trimmed = raw.trim();

    if trimmed.starts_with('[') {
        return serde_json::from_str::<Vec<String>>(trimmed)
            .map_err(|e| format!("invalid feature list: {}", e));
    }

    let features: Vec<String> = trimmed
        .split(',')
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(str::to_string)
        .collect();

    if features.is_empty() {
        return Err("feature list is empty".to_string());
    }

    Ok(features)
}

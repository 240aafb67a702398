//! Prediction Request - raw applicant record keyed by feature name

use std::collections::HashMap;

use serde_json::{Map, Value};

use super::error::PredictionError;

/// Feature name → raw value, as received from a caller.
///
/// Values stay raw until the gateway reads them in bundle order, so a
/// record is only rejected for the features the model actually uses.
#[derive(Debug, Clone, Default)]
pub struct PredictionRequest {
    fields: HashMap<String, Value>,
}

impl PredictionRequest {
    pub fn new() -> Self {
        Self::default()
    }

    /// Builder-style insert
    pub fn with(mut self, name: impl Into<String>, value: impl Into<Value>) -> Self {
        self.insert(name, value);
        self
    }

    /// Builder-style removal
    pub fn without(mut self, name: &str) -> Self {
        self.fields.remove(name);
        self
    }

    pub fn insert(&mut self, name: impl Into<String>, value: impl Into<Value>) {
        self.fields.insert(name.into(), value.into());
    }

    /// Read one feature as a finite number
    pub fn feature(&self, name: &str) -> Result<f32, PredictionError> {
        let value = self.fields
            .get(name)
            .ok_or_else(|| PredictionError::MissingFeature(name.to_string()))?;

        coerce_number(value)
            .map(|v| v as f32)
            .filter(|v| v.is_finite())
            .ok_or_else(|| PredictionError::InvalidValue(name.to_string()))
    }

    /// Positional vector in the given column order
    pub fn to_vector<S: AsRef<str>>(&self, columns: &[S]) -> Result<Vec<f32>, PredictionError> {
        columns.iter().map(|name| self.feature(name.as_ref())).collect()
    }
}

impl From<Map<String, Value>> for PredictionRequest {
    fn from(map: Map<String, Value>) -> Self {
        Self { fields: map.into_iter().collect() }
    }
}

/// JSON number, or a numeric string that may carry thousands separators
pub fn coerce_number(value: &Value) -> Option<f64> {
    match value {
        Value::Number(n) => n.as_f64(),
        Value::String(s) => parse_lenient(s),
        _ => None,
    }
}

/// Parse `"50,000"`, `" 1.5 "`, `"700"`. Rejects NaN/inf spellings.
pub fn parse_lenient(raw: &str) -> Option<f64> {
    let cleaned: String = raw.chars()
        .filter(|c| *c != ',' && !c.is_whitespace())
        .collect();

    if cleaned.is_empty() {
        return None;
    }

    cleaned.parse::<f64>().ok().filter(|v| v.is_finite())
}

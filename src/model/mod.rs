//! Model Module - serving path
//!
//! Cache → gateway → classifier. Inference is delegated to the
//! classifier backend; this module only loads, validates and orders.

pub mod bundle;
pub mod cache;
pub mod error;
pub mod features;
pub mod gateway;
pub mod onnx;
pub mod request;

#[cfg(test)]
pub(crate) mod testing;


// Re-export common types
pub use bundle::{Classifier, ModelBundle, PredictionResult, RiskLabel};
pub use cache::{BundleLoader, ModelCache};
pub use error::{BundleError, InferenceError, PredictionError};
pub use features::{RISK_FEATURES, FEATURE_COUNT};
pub use gateway::{EngineStatus, PredictionGateway};
pub use request::PredictionRequest;

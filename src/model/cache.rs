//! Model Cache - one lazily loaded bundle per cache instance

use std::path::{Path, PathBuf};
use std::sync::Arc;

use once_cell::sync::OnceCell;

use super::bundle::ModelBundle;
use super::error::PredictionError;
use super::features::layout_diff;
use super::onnx::OnnxLoader;

/// Turns an artifact on disk into a bundle
pub trait BundleLoader: Send + Sync {
    fn load(&self, path: &Path) -> Result<ModelBundle, PredictionError>;
}

/// Lazily populated bundle holder.
///
/// The first successful `get_bundle` stores the bundle for the lifetime of
/// the cache. A failed load stores nothing, so callers can retry once the
/// artifact appears. Concurrent first callers block on the same load.
pub struct ModelCache {
    path: PathBuf,
    loader: Box<dyn BundleLoader>,
    bundle: OnceCell<Arc<ModelBundle>>,
}

impl ModelCache {
    pub fn new(path: impl Into<PathBuf>, loader: Box<dyn BundleLoader>) -> Self {
        Self {
            path: path.into(),
            loader,
            bundle: OnceCell::new(),
        }
    }

    /// Cache backed by the ONNX Runtime loader
    pub fn onnx(path: impl Into<PathBuf>) -> Self {
        Self::new(path, Box::new(OnnxLoader))
    }

    /// Cache that starts populated
    pub fn preloaded(path: impl Into<PathBuf>, bundle: ModelBundle) -> Self {
        let cache = Self::new(path, Box::new(NoLoader));
        // Fresh cell, cannot already be set
        let _ = cache.bundle.set(Arc::new(bundle));
        cache
    }

    /// Return the cached bundle, loading it on first use
    pub fn get_bundle(&self) -> Result<Arc<ModelBundle>, PredictionError> {
        self.bundle
            .get_or_try_init(|| self.load())
            .map(Arc::clone)
    }

    /// Cached bundle without triggering a load
    pub fn peek(&self) -> Option<Arc<ModelBundle>> {
        self.bundle.get().cloned()
    }

    pub fn is_loaded(&self) -> bool {
        self.bundle.get().is_some()
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn load(&self) -> Result<Arc<ModelBundle>, PredictionError> {
        if !self.path.exists() {
            tracing::warn!("Model artifact missing: {}", self.path.display());
            return Err(PredictionError::ModelNotFound { path: self.path.clone() });
        }

        tracing::info!("Loading model from {}...", self.path.display());
        let bundle = self.loader.load(&self.path).map_err(|e| {
            tracing::error!("Model load failed: {}", e);
            e
        })?;

        let (missing, unknown) = layout_diff(bundle.features());
        if !missing.is_empty() || !unknown.is_empty() {
            tracing::warn!(
                "Model features differ from the applicant form: missing {:?}, unknown {:?}",
                missing, unknown
            );
        }

        tracing::info!(
            "Model loaded ({} backend, {} features)",
            bundle.classifier().backend(),
            bundle.features().len()
        );

        Ok(Arc::new(bundle))
    }
}

impl std::fmt::Debug for ModelCache {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ModelCache")
            .field("path", &self.path)
            .field("loaded", &self.is_loaded())
            .finish()
    }
}

/// Loader for caches that are populated up front
struct NoLoader;

impl BundleLoader for NoLoader {
    fn load(&self, path: &Path) -> Result<ModelBundle, PredictionError> {
        Err(PredictionError::ModelNotFound { path: path.to_path_buf() })
    }
}

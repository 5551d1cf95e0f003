//! Model service: owns the classifier handle and maps scores to labels.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use once_cell::sync::OnceCell;
use serde::Serialize;
use tracing::{debug, info, instrument};

use super::backend::{Classifier, TractClassifier};
use super::labels::LabelSet;
use super::preprocess::{self, ImageTensor};
use crate::error::{ImageError, ModelError, Result};
use crate::metrics;

/// Predicted label plus the full score vector in label order.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PredictionResult {
    /// Label at the index of the highest probability.
    pub class_label: String,
    /// One probability per label.
    pub probabilities: Vec<f32>,
}

/// Index of the largest score, first occurrence on ties.
///
/// NaN scores never win. Returns `None` only for an empty slice.
pub fn argmax(scores: &[f32]) -> Option<usize> {
    if scores.is_empty() {
        return None;
    }

    let mut best: Option<(usize, f32)> = None;
    for (index, &score) in scores.iter().enumerate() {
        if score.is_nan() {
            continue;
        }
        match best {
            Some((_, top)) if score <= top => {}
            _ => best = Some((index, score)),
        }
    }

    Some(best.map_or(0, |(index, _)| index))
}

/// Owns the single, read-only classifier instance for the process.
///
/// The classifier is loaded at most once, either eagerly through
/// [`ModelService::load`] at startup or lazily by the first prediction.
pub struct ModelService {
    model_path: PathBuf,
    labels: LabelSet,
    classifier: OnceCell<Arc<dyn Classifier>>,
}

impl std::fmt::Debug for ModelService {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ModelService")
            .field("model_path", &self.model_path)
            .field("labels", &self.labels)
            .field("loaded", &self.is_loaded())
            .finish()
    }
}

impl ModelService {
    /// Service that will load an ONNX model from `model_path` on first use.
    pub fn new(model_path: impl Into<PathBuf>, labels: LabelSet) -> Self {
        Self {
            model_path: model_path.into(),
            labels,
            classifier: OnceCell::new(),
        }
    }

    /// Service around an already loaded classifier.
    pub fn with_classifier(classifier: Arc<dyn Classifier>, labels: LabelSet) -> Self {
        Self {
            model_path: PathBuf::new(),
            labels,
            classifier: OnceCell::with_value(classifier),
        }
    }

    /// Load the classifier if needed and return the shared handle.
    ///
    /// Idempotent: later calls return the same instance. A failed load leaves
    /// the service unloaded, so the next call tries again.
    pub fn load(&self) -> std::result::Result<Arc<dyn Classifier>, ModelError> {
        self.classifier
            .get_or_try_init(|| {
                info!(path = %self.model_path.display(), "Loading model");
                let timer = metrics::timer_model_load();

                let classifier = TractClassifier::load(&self.model_path)?;

                info!(
                    path = %self.model_path.display(),
                    elapsed_ms = timer.elapsed_ms(),
                    "Model loaded"
                );
                Ok::<_, ModelError>(Arc::new(classifier) as Arc<dyn Classifier>)
            })
            .map(Arc::clone)
    }

    /// Whether the classifier has been loaded.
    pub fn is_loaded(&self) -> bool {
        self.classifier.get().is_some()
    }

    /// Path the model is (or would be) loaded from.
    pub fn model_path(&self) -> &Path {
        &self.model_path
    }

    /// Label table used to name model outputs.
    pub fn labels(&self) -> &LabelSet {
        &self.labels
    }

    /// Decode and normalize raw image bytes.
    pub fn preprocess(&self, bytes: &[u8]) -> std::result::Result<ImageTensor, ImageError> {
        let _timer = metrics::timer_preprocess();
        preprocess::preprocess(bytes)
    }

    /// Run the forward pass and label the highest-scoring class.
    #[instrument(skip_all)]
    pub fn predict(&self, tensor: &ImageTensor) -> std::result::Result<PredictionResult, ModelError> {
        let classifier = self.load()?;

        let scores = {
            let _timer = metrics::timer_inference();
            classifier.forward(tensor)?
        };

        let unexpected = ModelError::UnexpectedOutput {
            expected: self.labels.len(),
            actual: scores.len(),
        };
        if scores.len() != self.labels.len() {
            return Err(unexpected);
        }
        if let Some(index) = scores.iter().position(|s| !s.is_finite()) {
            return Err(ModelError::NonFiniteOutput { index });
        }

        let class_label = argmax(&scores)
            .and_then(|index| self.labels.get(index))
            .ok_or(unexpected)?
            .to_string();

        debug!(class_label = %class_label, "Prediction complete");
        Ok(PredictionResult {
            class_label,
            probabilities: scores,
        })
    }

    /// Preprocess `bytes` and predict in one step.
    pub fn classify(&self, bytes: &[u8]) -> Result<PredictionResult> {
        let tensor = self.preprocess(bytes)?;
        Ok(self.predict(&tensor)?)
    }
}

//! Inference backends.

use std::path::Path;

use tract_onnx::prelude::*;
use tracing::debug;

use super::preprocess::ImageTensor;
use crate::error::ModelError;

/// A loaded model that maps an input tensor to per-class scores.
///
/// Implementations must be safe to call concurrently: `forward` is a pure
/// read over the loaded weights.
pub trait Classifier: Send + Sync + std::fmt::Debug {
    /// Run the forward pass, returning one score per class in output order.
    fn forward(&self, input: &ImageTensor) -> Result<Vec<f32>, ModelError>;
}

type Plan = SimplePlan<TypedFact, Box<dyn TypedOp>, TypedModel>;

/// ONNX classifier executed with tract.
pub struct TractClassifier {
    plan: Plan,
}

impl std::fmt::Debug for TractClassifier {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TractClassifier").finish_non_exhaustive()
    }
}

impl TractClassifier {
    /// Load and optimize an ONNX model with a fixed `f32[1, 32, 32, 3]` input.
    pub fn load(path: &Path) -> Result<Self, ModelError> {
        if !path.is_file() {
            return Err(ModelError::NotFound {
                path: path.to_path_buf(),
            });
        }

        if is_keras_archive(path) {
            return Err(ModelError::LoadFailed {
                path: path.to_path_buf(),
                reason: "Keras archives cannot be executed; export the model to ONNX \
                         (e.g. with tf2onnx) and point MODEL_PATH at the .onnx file"
                    .to_string(),
            });
        }

        let load_failed = |e: TractError| ModelError::LoadFailed {
            path: path.to_path_buf(),
            reason: e.to_string(),
        };

        let plan = tract_onnx::onnx()
            .model_for_path(path)
            .map_err(load_failed)?
            .with_input_fact(0, f32::fact(ImageTensor::SHAPE).into())
            .map_err(load_failed)?
            .into_optimized()
            .map_err(load_failed)?
            .into_runnable()
            .map_err(load_failed)?;

        debug!(path = %path.display(), "ONNX plan ready");
        Ok(Self { plan })
    }
}

fn is_keras_archive(path: &Path) -> bool {
    path.extension()
        .and_then(|ext| ext.to_str())
        .is_some_and(|ext| ext.eq_ignore_ascii_case("keras") || ext.eq_ignore_ascii_case("h5"))
}

impl Classifier for TractClassifier {
    fn forward(&self, input: &ImageTensor) -> Result<Vec<f32>, ModelError> {
        let outputs = self
            .plan
            .run(tvec!(input.to_tensor().into_tvalue()))
            .map_err(|e| ModelError::InferenceFailed(e.to_string()))?;

        let output = outputs
            .first()
            .ok_or_else(|| ModelError::InferenceFailed("model produced no outputs".to_string()))?;
        let scores = output
            .to_array_view::<f32>()
            .map_err(|e| ModelError::InferenceFailed(e.to_string()))?;

        Ok(scores.iter().copied().collect())
    }
}

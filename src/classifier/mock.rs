//! Mock inference backend for unit and HTTP tests.
//!
//! Returns canned scores without touching a model file and counts how often
//! the forward pass ran.

use std::sync::atomic::{AtomicUsize, Ordering};

use super::backend::Classifier;
use super::preprocess::ImageTensor;
use crate::error::ModelError;

/// Mock classifier returning fixed scores.
#[derive(Debug, Default)]
pub struct MockClassifier {
    /// Scores to return from every forward pass.
    scores: Vec<f32>,
    /// Whether to fail every forward pass.
    fail: bool,
    /// Number of forward passes executed.
    calls: AtomicUsize,
}

impl MockClassifier {
    /// Mock that always returns `scores`.
    pub fn with_scores(scores: Vec<f32>) -> Self {
        Self {
            scores,
            ..Self::default()
        }
    }

    /// Mock with all mass on `index` out of `classes` outputs.
    pub fn one_hot(classes: usize, index: usize) -> Self {
        let scores = (0..classes)
            .map(|i| if i == index { 1.0 } else { 0.0 })
            .collect();
        Self::with_scores(scores)
    }

    /// Mock whose forward pass always fails.
    pub fn failing() -> Self {
        Self {
            fail: true,
            ..Self::default()
        }
    }

    /// Number of times `forward` has been called.
    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

impl Classifier for MockClassifier {
    fn forward(&self, _input: &ImageTensor) -> Result<Vec<f32>, ModelError> {
        self.calls.fetch_add(1, Ordering::SeqCst);

        if self.fail {
            return Err(ModelError::InferenceFailed(
                "mock inference failure".to_string(),
            ));
        }

        Ok(self.scores.clone())
    }
}

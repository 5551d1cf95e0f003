//! Unified error types for the classifier service.

use std::path::PathBuf;

use thiserror::Error;

/// Unified error type for the classifier service.
#[derive(Error, Debug)]
pub enum ServiceError {
    /// Configuration loading error.
    #[error("configuration error: {0}")]
    Config(#[from] envy::Error),

    /// Model loading or inference error.
    #[error("model error: {0}")]
    Model(#[from] ModelError),

    /// Image decoding error.
    #[error("image error: {0}")]
    Image(#[from] ImageError),

    /// IO error.
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
}

/// Model loading and inference errors.
#[derive(Error, Debug)]
pub enum ModelError {
    /// The serialized model file does not exist.
    #[error("model file not found: {}", path.display())]
    NotFound {
        /// Path that was looked up.
        path: PathBuf,
    },

    /// The file exists but is not a loadable model.
    #[error("failed to load model from {}: {reason}", path.display())]
    LoadFailed {
        /// Path of the model file.
        path: PathBuf,
        /// Reason reported by the runtime.
        reason: String,
    },

    /// The forward pass failed.
    #[error("inference failed: {0}")]
    InferenceFailed(String),

    /// The model produced NaN or infinite scores.
    #[error("model produced a non-finite score at index {index}")]
    NonFiniteOutput {
        /// Position of the first offending score.
        index: usize,
    },

    /// The model produced a score vector of the wrong length.
    #[error("unexpected model output: expected {expected} scores, got {actual}")]
    UnexpectedOutput {
        /// Number of labels.
        expected: usize,
        /// Number of scores produced.
        actual: usize,
    },
}

impl ModelError {
    /// True for the failures that happen while loading the model file.
    pub fn is_load_error(&self) -> bool {
        matches!(self, Self::NotFound { .. } | Self::LoadFailed { .. })
    }
}

/// Uploaded image errors.
#[derive(Error, Debug)]
pub enum ImageError {
    /// The bytes are not a decodable image.
    #[error("failed to decode image: {0}")]
    Decode(#[from] image::ImageError),
}

/// Convenient Result type alias.
pub type Result<T> = std::result::Result<T, ServiceError>;

//! Classifier lifecycle, preprocessing and inference.

pub mod backend;
pub mod labels;
pub mod mock;
pub mod preprocess;
pub mod service;

pub use backend::{Classifier, TractClassifier};
pub use labels::LabelSet;
pub use mock::MockClassifier;
pub use preprocess::{preprocess, ImageTensor, IMAGE_SIZE};
pub use service::{argmax, ModelService, PredictionResult};

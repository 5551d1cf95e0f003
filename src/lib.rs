//! HTTP inference service for a pretrained 10-class image classifier.
//!
//! Clients upload an image to `POST /predict`; the service decodes it,
//! resizes it to the model's 32x32 RGB input, runs a single forward pass and
//! answers with the most likely label and the full probability vector.
//!
//! ```text
//! upload ──▶ content-type check ──▶ preprocess ──▶ predict ──▶ JSON
//!              (400 if not image/*)   (32x32x3, [0,1])   (argmax → label)
//! ```
//!
//! # Modules
//!
//! - [`config`]: Configuration loading from environment
//! - [`error`]: Unified error types
//! - [`classifier`]: Label table, preprocessing, inference backends, model service
//! - [`api`]: HTTP API (health, predict, metrics, OpenAPI)
//! - [`metrics`]: Prometheus metrics
//! - [`utils`]: Utility functions

pub mod api;
pub mod classifier;
pub mod config;
pub mod error;
pub mod metrics;
pub mod utils;

pub use config::Config;
pub use error::{Result, ServiceError};

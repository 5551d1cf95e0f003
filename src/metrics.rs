//! Prometheus metrics for predictions and latency tracking.
//!
//! This module provides metrics for:
//! - Model load latency
//! - Preprocessing and inference latency
//! - Prediction outcomes per class label
//! - Rejected uploads and failed predictions

use std::time::Instant;

use metrics::{counter, describe_counter, describe_histogram, histogram};
use metrics_exporter_prometheus::{BuildError, PrometheusBuilder, PrometheusHandle};
use tracing::debug;

// === Metric Name Constants ===

/// Model load latency metric name.
pub const METRIC_MODEL_LOAD_LATENCY: &str = "model_load_latency_ms";
/// Preprocessing latency metric name.
pub const METRIC_PREPROCESS_LATENCY: &str = "preprocess_latency_ms";
/// Inference latency metric name.
pub const METRIC_INFERENCE_LATENCY: &str = "inference_latency_ms";
/// Successful predictions counter metric name.
pub const METRIC_PREDICTIONS: &str = "predictions_total";
/// Failed predictions counter metric name.
pub const METRIC_PREDICTION_FAILURES: &str = "prediction_failures_total";
/// Rejected uploads counter metric name.
pub const METRIC_REJECTED_UPLOADS: &str = "rejected_uploads_total";

/// Install the global Prometheus recorder and register metric descriptions.
///
/// Call this once at startup; the returned handle renders `/metrics`.
pub fn install_recorder() -> Result<PrometheusHandle, BuildError> {
    let handle = PrometheusBuilder::new().install_recorder()?;
    init_metrics();
    Ok(handle)
}

/// Initialize all metric descriptions.
pub fn init_metrics() {
    // Latency histograms
    describe_histogram!(
        METRIC_MODEL_LOAD_LATENCY,
        "Model load latency in milliseconds"
    );
    describe_histogram!(
        METRIC_PREPROCESS_LATENCY,
        "Image decode and resize latency in milliseconds"
    );
    describe_histogram!(
        METRIC_INFERENCE_LATENCY,
        "Model forward pass latency in milliseconds"
    );

    // Counters
    describe_counter!(
        METRIC_PREDICTIONS,
        "Total number of successful predictions by class label"
    );
    describe_counter!(
        METRIC_PREDICTION_FAILURES,
        "Total number of predictions that failed, by reason"
    );
    describe_counter!(
        METRIC_REJECTED_UPLOADS,
        "Total number of uploads rejected for a non-image content type"
    );

    debug!("Metrics initialized");
}

/// Increment the prediction counter for a label.
pub fn inc_predictions(class_label: &str) {
    counter!(METRIC_PREDICTIONS, "class_label" => class_label.to_string()).increment(1);
}

/// Increment the failure counter for a reason (`decode`, `inference`).
pub fn inc_prediction_failures(reason: &'static str) {
    counter!(METRIC_PREDICTION_FAILURES, "reason" => reason).increment(1);
}

/// Increment rejected uploads counter.
pub fn inc_rejected_uploads() {
    counter!(METRIC_REJECTED_UPLOADS).increment(1);
}

/// RAII guard for timing operations.
/// Automatically records latency when dropped.
pub struct LatencyTimer {
    start: Instant,
    metric_name: &'static str,
}

impl LatencyTimer {
    /// Create a new latency timer for the given metric.
    pub fn new(metric_name: &'static str) -> Self {
        Self {
            start: Instant::now(),
            metric_name,
        }
    }

    /// Get elapsed time in milliseconds (without recording).
    pub fn elapsed_ms(&self) -> f64 {
        self.start.elapsed().as_secs_f64() * 1000.0
    }
}

impl Drop for LatencyTimer {
    fn drop(&mut self) {
        let latency_ms = self.start.elapsed().as_secs_f64() * 1000.0;
        histogram!(self.metric_name).record(latency_ms);
    }
}

/// Create a latency timer for model loading.
pub fn timer_model_load() -> LatencyTimer {
    LatencyTimer::new(METRIC_MODEL_LOAD_LATENCY)
}

/// Create a latency timer for preprocessing.
pub fn timer_preprocess() -> LatencyTimer {
    LatencyTimer::new(METRIC_PREPROCESS_LATENCY)
}

/// Create a latency timer for inference.
pub fn timer_inference() -> LatencyTimer {
    LatencyTimer::new(METRIC_INFERENCE_LATENCY)
}

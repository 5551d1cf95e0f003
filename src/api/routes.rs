//! HTTP API route definitions.

use std::sync::Arc;

use axum::extract::DefaultBodyLimit;
use axum::routing::{get, post};
use axum::Router;
use metrics_exporter_prometheus::PrometheusHandle;
use tower_http::trace::TraceLayer;
use tracing::{error, info};

use super::handlers::{health, openapi, predict, render_metrics, AppState};
use crate::classifier::{LabelSet, ModelService};
use crate::config::Config;
use crate::error::ModelError;

/// Load the model named by `config` and build the full application router.
///
/// The model is loaded before any router exists, so a missing or corrupt
/// model file aborts startup instead of surfacing on the first request.
pub fn build_app(
    config: &Config,
    metrics: Option<PrometheusHandle>,
) -> Result<Router, ModelError> {
    let service = ModelService::new(&config.model_path, LabelSet::cifar10());
    if let Err(e) = service.load() {
        error!("Failed to load model: {}", e);
        return Err(e);
    }
    info!("Model loaded successfully");

    let mut state =
        AppState::new(Arc::new(service)).with_max_upload_bytes(config.max_upload_bytes);
    if let Some(handle) = metrics {
        state = state.with_metrics(handle);
    }

    Ok(create_router(state))
}

/// Create the API router.
pub fn create_router(state: AppState) -> Router {
    let body_limit = DefaultBodyLimit::max(state.max_upload_bytes);

    Router::new()
        // Health endpoint
        .route("/health", get(health))
        // Inference endpoint
        .route("/predict", post(predict))
        // Observability and docs
        .route("/metrics", get(render_metrics))
        .route("/openapi.json", get(openapi))
        .layer(body_limit)
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

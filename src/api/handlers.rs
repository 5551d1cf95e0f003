//! HTTP API handlers.

use std::sync::Arc;

use axum::body::Bytes;
use axum::extract::multipart::MultipartRejection;
use axum::extract::{Multipart, State};
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use metrics_exporter_prometheus::PrometheusHandle;
use serde::Serialize;
use tracing::{debug, instrument};
use utoipa::{OpenApi, ToSchema};

use super::docs::ApiDoc;
use super::error::{ApiError, ErrorResponse};
use crate::classifier::{ModelService, PredictionResult};
use crate::error::ServiceError;
use crate::metrics;

/// Multipart field carrying the upload.
pub const FILE_FIELD: &str = "file";

/// Default request body limit for uploads.
pub const DEFAULT_MAX_UPLOAD_BYTES: usize = 10 * 1024 * 1024;

/// Application state shared with handlers.
#[derive(Clone)]
pub struct AppState {
    /// Model service shared by all requests.
    pub model: Arc<ModelService>,
    /// Prometheus render handle, when metrics are enabled.
    pub metrics: Option<PrometheusHandle>,
    /// Maximum request body size accepted by `/predict`.
    pub max_upload_bytes: usize,
}

impl AppState {
    /// Create new app state around a model service.
    pub fn new(model: Arc<ModelService>) -> Self {
        Self {
            model,
            metrics: None,
            max_upload_bytes: DEFAULT_MAX_UPLOAD_BYTES,
        }
    }

    /// Expose `/metrics` through the given handle.
    pub fn with_metrics(mut self, handle: PrometheusHandle) -> Self {
        self.metrics = Some(handle);
        self
    }

    /// Set the upload body limit.
    pub fn with_max_upload_bytes(mut self, max_upload_bytes: usize) -> Self {
        self.max_upload_bytes = max_upload_bytes;
        self
    }
}

/// Health check response.
#[derive(Debug, Serialize, ToSchema)]
pub struct HealthResponse {
    /// Status: "ok".
    #[schema(value_type = String, example = "ok")]
    pub status: &'static str,
}

/// Prediction response.
#[derive(Debug, Serialize, ToSchema)]
pub struct PredictionResponse {
    /// Most likely class.
    #[schema(example = "cat")]
    pub class_label: String,
    /// Per-class probabilities in label order.
    pub probabilities: Vec<f32>,
}

impl From<PredictionResult> for PredictionResponse {
    fn from(result: PredictionResult) -> Self {
        Self {
            class_label: result.class_label,
            probabilities: result.probabilities,
        }
    }
}

/// A single uploaded file.
#[derive(Debug)]
pub struct Upload {
    /// Client-side file name.
    pub file_name: String,
    /// Declared content type, if sent.
    pub content_type: Option<String>,
    /// Full file contents.
    pub bytes: Bytes,
}

/// Coarse upload check: the declared type must start with `image/`.
pub fn is_image_content_type(content_type: Option<&str>) -> bool {
    content_type.is_some_and(|ct| ct.starts_with("image/"))
}

/// Read the `file` field, rejecting non-image content types before the
/// body is buffered.
///
/// A `file` part without a filename is a plain form value, not an upload,
/// and is reported as a missing file.
async fn read_image_upload(mut multipart: Multipart) -> Result<Upload, ApiError> {
    while let Some(field) = multipart.next_field().await? {
        if field.name() != Some(FILE_FIELD) {
            continue;
        }

        let Some(file_name) = field.file_name().map(str::to_owned) else {
            return Err(ApiError::MissingFile);
        };

        let content_type = field.content_type().map(str::to_owned);
        if !is_image_content_type(content_type.as_deref()) {
            metrics::inc_rejected_uploads();
            return Err(ApiError::InvalidFileType);
        }

        let bytes = field.bytes().await?;

        return Ok(Upload {
            file_name,
            content_type,
            bytes,
        });
    }

    Err(ApiError::MissingFile)
}

/// Health check handler - always returns 200, whether or not the model is loaded.
#[utoipa::path(
    get,
    path = "/health",
    tag = "classifier",
    responses((status = 200, description = "Service is up", body = HealthResponse))
)]
pub async fn health() -> impl IntoResponse {
    Json(HealthResponse { status: "ok" })
}

/// Prediction handler - classifies one uploaded image.
#[utoipa::path(
    post,
    path = "/predict",
    tag = "classifier",
    request_body(content = super::docs::UploadForm, content_type = "multipart/form-data"),
    responses(
        (status = 200, description = "Predicted label and probabilities", body = PredictionResponse),
        (status = 400, description = "Upload is not an image", body = ErrorResponse),
        (status = 422, description = "No file field in the form", body = ErrorResponse),
        (status = 500, description = "Decode or inference failure", body = ErrorResponse)
    )
)]
#[instrument(skip_all)]
pub async fn predict(
    State(state): State<AppState>,
    multipart: Result<Multipart, MultipartRejection>,
) -> Result<Json<PredictionResponse>, ApiError> {
    let upload = read_image_upload(multipart?).await?;
    debug!(
        file_name = %upload.file_name,
        content_type = ?upload.content_type,
        size = upload.bytes.len(),
        "Received upload"
    );

    let model = Arc::clone(&state.model);
    let outcome = tokio::task::spawn_blocking(move || model.classify(&upload.bytes)).await?;

    let prediction = outcome.inspect_err(|e| {
        let reason = match e {
            ServiceError::Image(_) => "decode",
            _ => "inference",
        };
        metrics::inc_prediction_failures(reason);
    })?;

    metrics::inc_predictions(&prediction.class_label);
    Ok(Json(prediction.into()))
}

/// Prometheus metrics handler - 404 when metrics are disabled.
pub async fn render_metrics(State(state): State<AppState>) -> Response {
    match &state.metrics {
        Some(handle) => handle.render().into_response(),
        None => StatusCode::NOT_FOUND.into_response(),
    }
}

/// OpenAPI document handler.
pub async fn openapi() -> impl IntoResponse {
    Json(ApiDoc::openapi())
}

//! OpenAPI document.

use utoipa::{OpenApi, ToSchema};

use super::error::ErrorResponse;
use super::handlers::{self, HealthResponse, PredictionResponse};

/// Multipart form accepted by `/predict`.
#[derive(ToSchema)]
#[allow(dead_code)]
pub struct UploadForm {
    /// Image file; its part content type must start with `image/`.
    #[schema(value_type = String)]
    file: Vec<u8>,
}

#[derive(OpenApi)]
#[openapi(
    info(title = "Image classifier API", description = "Classify uploaded images into 10 classes"),
    paths(handlers::health, handlers::predict),
    components(schemas(HealthResponse, PredictionResponse, ErrorResponse, UploadForm)),
    tags((name = "classifier", description = "Health and prediction endpoints"))
)]
pub struct ApiDoc;

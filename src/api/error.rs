//! HTTP-facing errors.

use axum::extract::multipart::{MultipartError, MultipartRejection};
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde::Serialize;
use thiserror::Error;
use tracing::{error, warn};
use utoipa::ToSchema;

use crate::error::ServiceError;

/// Message returned for every server-side failure.
const INTERNAL_DETAIL: &str = "Internal Server Error";

/// Error body: `{"detail": "..."}`.
#[derive(Debug, Serialize, ToSchema)]
pub struct ErrorResponse {
    /// Human-readable description.
    pub detail: String,
}

/// Errors surfaced by the HTTP handlers.
#[derive(Error, Debug)]
pub enum ApiError {
    /// Upload content type is not `image/*`.
    #[error("Invalid file type")]
    InvalidFileType,

    /// The multipart body has no `file` field.
    #[error("Missing file field")]
    MissingFile,

    /// The request is not a usable multipart body.
    #[error("{0}")]
    MultipartRejected(#[from] MultipartRejection),

    /// Reading a multipart field failed (including the body size limit).
    #[error("{0}")]
    Multipart(#[from] MultipartError),

    /// Decode, inference or model load failure.
    #[error(transparent)]
    Service(#[from] ServiceError),

    /// The blocking prediction task panicked or was cancelled.
    #[error("prediction worker failed: {0}")]
    Worker(#[from] tokio::task::JoinError),
}

impl ApiError {
    /// HTTP status for this error.
    pub fn status(&self) -> StatusCode {
        match self {
            Self::InvalidFileType => StatusCode::BAD_REQUEST,
            Self::MissingFile => StatusCode::UNPROCESSABLE_ENTITY,
            Self::MultipartRejected(rejection) => rejection.status(),
            Self::Multipart(err) => err.status(),
            Self::Service(_) | Self::Worker(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    fn detail(&self) -> String {
        match self {
            Self::MultipartRejected(rejection) => rejection.body_text(),
            Self::Multipart(err) => err.body_text(),
            Self::Service(_) | Self::Worker(_) => INTERNAL_DETAIL.to_string(),
            other => other.to_string(),
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status();
        if status.is_server_error() {
            error!(error = %self, "Request failed");
        } else {
            warn!(status = status.as_u16(), error = %self, "Request rejected");
        }

        (status, Json(ErrorResponse { detail: self.detail() })).into_response()
    }
}

//! HTTP API module for health, prediction, metrics and OpenAPI endpoints.

pub mod docs;
pub mod error;
pub mod handlers;
pub mod routes;

pub use error::ApiError;
pub use handlers::AppState;
pub use routes::{build_app, create_router};

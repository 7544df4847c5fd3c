//! Error types for the cache server
//!
//! Provides unified error handling using thiserror.

use axum::{
    extract::{multipart::MultipartRejection, rejection::QueryRejection},
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use thiserror::Error;
use tracing::error;

use crate::models::ErrorResponse;

// == Cache Error Enum ==
/// Unified error type for the cache server.
///
/// A lookup miss is not represented here at the core level: the store returns
/// `None` and only the HTTP shell turns that into [`CacheError::NotFound`].
#[derive(Error, Debug)]
pub enum CacheError {
    /// Missing or malformed key or required field
    #[error("Invalid argument: {0}")]
    InvalidArgument(String),

    /// Key not present, evicted or expired
    #[error("Unable to locate cached item '{0}'")]
    NotFound(String),

    /// Upload exceeds the per-item byte ceiling
    #[error("Payload too large, must be at most {limit} bytes")]
    PayloadTooLarge { limit: usize },

    /// Unexpected condition inside the server
    #[error("Internal error: {0}")]
    Internal(String),
}

// == IntoResponse Implementation ==
impl IntoResponse for CacheError {
    fn into_response(self) -> Response {
        let status = match &self {
            CacheError::InvalidArgument(_) => StatusCode::BAD_REQUEST,
            CacheError::NotFound(_) => StatusCode::NOT_FOUND,
            CacheError::PayloadTooLarge { .. } => StatusCode::PAYLOAD_TOO_LARGE,
            CacheError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        };

        let message = match &self {
            CacheError::Internal(detail) => {
                error!(%detail, "internal fault while handling request");
                "Internal server error".to_string()
            }
            other => other.to_string(),
        };

        (status, Json(ErrorResponse::new(message))).into_response()
    }
}

// == Extractor Rejections ==
// Malformed query strings and upload bodies are caller errors and get the
// same JSON body as every other failure.
impl From<QueryRejection> for CacheError {
    fn from(rejection: QueryRejection) -> Self {
        CacheError::InvalidArgument(rejection.body_text())
    }
}

impl From<MultipartRejection> for CacheError {
    fn from(rejection: MultipartRejection) -> Self {
        CacheError::InvalidArgument(rejection.body_text())
    }
}

// == Result Type Alias ==
/// Convenience Result type for the cache server.
pub type Result<T> = std::result::Result<T, CacheError>;

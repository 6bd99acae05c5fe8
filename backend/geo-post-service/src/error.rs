/// Error types for Geo Post Service
///
/// [`PostError`] is what the ingestion pipeline and query engine return.
/// [`AppError`] is the HTTP-facing wrapper; its response body only carries the
/// public message, never backend details.
use actix_web::{error::ResponseError, http::StatusCode, HttpResponse};
use error_types::{error_codes, error_types as kinds, ErrorResponse};
use std::fmt;
use thiserror::Error;

use crate::stores::{AssetStoreError, GeoIndexError};

/// Result type for HTTP handlers
pub type Result<T> = std::result::Result<T, AppError>;

/// Failures of the post pipeline and query engine.
#[derive(Debug, Error)]
pub enum PostError {
    #[error("{0}")]
    InvalidCoordinates(String),

    #[error("{0}")]
    InvalidRadius(String),

    #[error("{0}")]
    Validation(String),

    #[error("message contains filtered words")]
    SpamRejected,

    #[error("asset store failure: {0}")]
    AssetStore(#[from] AssetStoreError),

    #[error("index write failure: {0}")]
    IndexWrite(#[source] GeoIndexError),

    #[error("query backend failure: {0}")]
    QueryBackend(#[source] GeoIndexError),
}

impl PostError {
    /// True when the caller supplied bad input, as opposed to a backend failing.
    pub fn is_client_error(&self) -> bool {
        matches!(
            self,
            PostError::InvalidCoordinates(_)
                | PostError::InvalidRadius(_)
                | PostError::Validation(_)
                | PostError::SpamRejected
        )
    }

    /// Short label used for metrics and logs.
    pub fn reason(&self) -> &'static str {
        match self {
            PostError::InvalidCoordinates(_) => "invalid_coordinates",
            PostError::InvalidRadius(_) => "invalid_radius",
            PostError::Validation(_) => "validation",
            PostError::SpamRejected => "spam",
            PostError::AssetStore(_) => "asset_store",
            PostError::IndexWrite(_) => "index_write",
            PostError::QueryBackend(_) => "query_backend",
        }
    }
}

/// Application error types
#[derive(Debug)]
pub enum AppError {
    /// Pipeline or query failure
    Post(PostError),

    /// Multipart form without an `image` part
    MissingImage,

    /// Image larger than the configured limit (bytes)
    PayloadTooLarge(usize),

    /// Text form field larger than its limit
    FieldTooLarge { field: String, limit: usize },

    /// Malformed request body or query string
    BadRequest(String),

    /// Request exceeded its deadline
    Timeout,
}

impl fmt::Display for AppError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AppError::Post(err) => write!(f, "{}", err),
            AppError::MissingImage => write!(f, "Image is not attached"),
            AppError::PayloadTooLarge(limit) => {
                write!(f, "Image exceeds the maximum size of {} bytes", limit)
            }
            AppError::FieldTooLarge { field, limit } => {
                write!(f, "Form field {} exceeds the maximum size of {} bytes", field, limit)
            }
            AppError::BadRequest(msg) => write!(f, "Bad request: {}", msg),
            AppError::Timeout => write!(f, "Request timed out"),
        }
    }
}

impl std::error::Error for AppError {}

impl AppError {
    /// Message safe to return to clients.
    fn public_message(&self) -> String {
        match self {
            AppError::Post(PostError::AssetStore(_)) => "Failed to store image".to_string(),
            AppError::Post(PostError::IndexWrite(_)) => "Failed to save post".to_string(),
            AppError::Post(PostError::QueryBackend(_)) => "Failed to search posts".to_string(),
            other => other.to_string(),
        }
    }

    fn code(&self) -> &'static str {
        match self {
            AppError::Post(err) => match err {
                PostError::InvalidCoordinates(_) => error_codes::INVALID_COORDINATES,
                PostError::InvalidRadius(_) => error_codes::INVALID_RADIUS,
                PostError::Validation(_) => error_codes::INVALID_REQUEST,
                PostError::SpamRejected => error_codes::SPAM_REJECTED,
                PostError::AssetStore(_) => error_codes::ASSET_STORE_ERROR,
                PostError::IndexWrite(_) => error_codes::INDEX_WRITE_ERROR,
                PostError::QueryBackend(_) => error_codes::SEARCH_BACKEND_ERROR,
            },
            AppError::MissingImage => error_codes::IMAGE_MISSING,
            AppError::PayloadTooLarge(_) | AppError::FieldTooLarge { .. } => {
                error_codes::UPLOAD_TOO_LARGE
            }
            AppError::BadRequest(_) => error_codes::INVALID_REQUEST,
            AppError::Timeout => error_codes::REQUEST_TIMEOUT,
        }
    }
}

impl ResponseError for AppError {
    fn status_code(&self) -> StatusCode {
        match self {
            AppError::Post(err) if err.is_client_error() => StatusCode::BAD_REQUEST,
            AppError::Post(_) => StatusCode::INTERNAL_SERVER_ERROR,
            AppError::MissingImage | AppError::BadRequest(_) => StatusCode::BAD_REQUEST,
            AppError::PayloadTooLarge(_) | AppError::FieldTooLarge { .. } => {
                StatusCode::PAYLOAD_TOO_LARGE
            }
            AppError::Timeout => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    fn error_response(&self) -> HttpResponse {
        let status = self.status_code();
        let error_type = if status.is_client_error() {
            kinds::VALIDATION_ERROR
        } else {
            kinds::SERVER_ERROR
        };

        let response = ErrorResponse::new(
            status.canonical_reason().unwrap_or("Error"),
            &self.public_message(),
            status.as_u16(),
            error_type,
            self.code(),
        );

        HttpResponse::build(status).json(response)
    }
}

impl From<PostError> for AppError {
    fn from(err: PostError) -> Self {
        AppError::Post(err)
    }
}

impl From<actix_multipart::MultipartError> for AppError {
    fn from(err: actix_multipart::MultipartError) -> Self {
        AppError::BadRequest(err.to_string())
    }
}

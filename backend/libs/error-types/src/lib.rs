use serde::{Deserialize, Serialize};

/// Uniform API error body returned by every HTTP service.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ErrorResponse {
    /// Short status text ("Bad Request", "Internal Server Error", ...)
    pub error: String,

    /// Human-readable explanation, safe to show to clients
    pub message: String,

    /// HTTP status code
    pub status: u16,

    /// Error class used by clients for routing, one of [`error_types`]
    pub error_type: String,

    /// Stable machine-readable code, one of [`error_codes`]
    pub code: String,

    /// RFC 3339 timestamp
    pub timestamp: String,
}

impl ErrorResponse {
    pub fn new(error: &str, message: &str, status: u16, error_type: &str, code: &str) -> Self {
        Self {
            error: error.to_string(),
            message: message.to_string(),
            status,
            error_type: error_type.to_string(),
            code: code.to_string(),
            timestamp: chrono::Utc::now().to_rfc3339(),
        }
    }
}

/// Standard error codes
pub mod error_codes {
    // Post ingestion
    pub const INVALID_COORDINATES: &str = "INVALID_COORDINATES";
    pub const INVALID_RADIUS: &str = "INVALID_RADIUS";
    pub const SPAM_REJECTED: &str = "SPAM_REJECTED";
    pub const IMAGE_MISSING: &str = "IMAGE_MISSING";
    pub const UPLOAD_TOO_LARGE: &str = "UPLOAD_TOO_LARGE";
    pub const INVALID_REQUEST: &str = "INVALID_REQUEST";

    // Backends
    pub const ASSET_STORE_ERROR: &str = "ASSET_STORE_ERROR";
    pub const INDEX_WRITE_ERROR: &str = "INDEX_WRITE_ERROR";
    pub const SEARCH_BACKEND_ERROR: &str = "SEARCH_BACKEND_ERROR";

    // System
    pub const REQUEST_TIMEOUT: &str = "REQUEST_TIMEOUT";
    pub const SERVICE_UNAVAILABLE: &str = "SERVICE_UNAVAILABLE";
}

/// Standard error classes
pub mod error_types {
    pub const VALIDATION_ERROR: &str = "validation_error";
    pub const SERVER_ERROR: &str = "server_error";
    pub const SERVICE_UNAVAILABLE_ERROR: &str = "service_unavailable_error";
}

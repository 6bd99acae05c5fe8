use actix_web::{web, HttpResponse};
use error_types::{error_codes, error_types as kinds, ErrorResponse};

use super::AppState;

/// GET /health
pub async fn health() -> HttpResponse {
    HttpResponse::Ok().json(serde_json::json!({"status": "ok"}))
}

/// GET /health/ready - ready once the geo index answers a ping.
pub async fn readiness(state: web::Data<AppState>) -> HttpResponse {
    match state.index.health_check().await {
        Ok(()) => HttpResponse::Ok().json(serde_json::json!({"status": "ready"})),
        Err(e) => {
            tracing::warn!(error = %e, "readiness check failed");
            HttpResponse::ServiceUnavailable().json(ErrorResponse::new(
                "Service Unavailable",
                "Geo index is not reachable",
                503,
                kinds::SERVICE_UNAVAILABLE_ERROR,
                error_codes::SERVICE_UNAVAILABLE,
            ))
        }
    }
}

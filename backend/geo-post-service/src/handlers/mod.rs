/// HTTP handlers for geo-post-service
use actix_cors::Cors;
use actix_web::{http::header, web};
use std::sync::Arc;
use std::time::Duration;

use crate::metrics::serve_metrics;
use crate::services::{IngestionPipeline, QueryEngine};
use crate::stores::GeoIndex;

pub mod health;
pub mod posts;

pub use health::{health, readiness};
pub use posts::{create_post, search_posts};

/// Per-request limits enforced at the HTTP boundary.
#[derive(Clone, Copy, Debug)]
pub struct RequestLimits {
    pub max_image_bytes: usize,
    pub request_timeout: Duration,
}

/// Shared handler state, cloned into every worker.
#[derive(Clone)]
pub struct AppState {
    pub pipeline: IngestionPipeline,
    pub query: QueryEngine,
    pub index: Arc<dyn GeoIndex>,
    pub limits: RequestLimits,
}

/// Register every route of the service.
pub fn configure(cfg: &mut web::ServiceConfig) {
    cfg.route("/post", web::post().to(create_post))
        .route("/search", web::get().to(search_posts))
        .route("/health", web::get().to(health))
        .route("/health/ready", web::get().to(readiness))
        .route("/metrics", web::get().to(serve_metrics));
}

/// Any origin may call the API. The wildcard is sent instead of echoing the
/// caller's origin, so responses stay cacheable across origins.
pub fn cors() -> Cors {
    Cors::default()
        .allow_any_origin()
        .send_wildcard()
        .allow_any_method()
        .allowed_headers(vec![header::CONTENT_TYPE, header::AUTHORIZATION])
        .max_age(3600)
}

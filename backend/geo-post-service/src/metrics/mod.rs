//! Process-wide Prometheus registry output.
//!
//! The collectors live in [`posts`]. Ingest is counted per outcome with a
//! latency histogram per stage; search records hit counts and filtered posts.
//! Mirror writes are labelled by result, queue drops included.

use actix_web::HttpResponse;
use prometheus::{Encoder, TextEncoder};

pub mod posts;

/// Actix handler that renders Prometheus metrics in text format.
pub async fn serve_metrics() -> HttpResponse {
    let encoder = TextEncoder::new();
    let metric_families = prometheus::gather();

    let mut buffer = Vec::new();
    if let Err(err) = encoder.encode(&metric_families, &mut buffer) {
        return HttpResponse::InternalServerError().body(err.to_string());
    }

    HttpResponse::Ok()
        .content_type(encoder.format_type())
        .body(buffer)
}

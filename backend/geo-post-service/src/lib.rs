/// Geo Post Service Library
///
/// Location-tagged posts: clients submit a post (author, message, coordinate,
/// image) and search for posts within a radius of a point.
///
/// # Modules
///
/// - `handlers`: HTTP request handlers and route registration
/// - `models`: Posts, locations, distances and upload payloads
/// - `services`: Spam filter, ingestion pipeline, query engine, mirror worker
/// - `stores`: Asset store (S3), geo index (Elasticsearch), secondary store (ClickHouse)
/// - `error`: Error types and handling
/// - `config`: Configuration management
/// - `metrics`: Prometheus collectors
pub mod config;
pub mod error;
pub mod handlers;
pub mod metrics;
pub mod models;
pub mod services;
pub mod stores;

pub use config::Config;
pub use error::{AppError, PostError, Result};

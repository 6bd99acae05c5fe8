//! Storage backends used by the post pipeline.
//!
//! Each backend sits behind a trait so the pipeline and query engine can run
//! against test doubles:
//!
//! - [`AssetStore`]: binary image storage (S3-compatible)
//! - [`GeoIndex`]: geo-searchable post documents (Elasticsearch)
//! - [`SecondaryStore`]: best-effort mirror of post rows (ClickHouse)

pub mod clickhouse;
pub mod elasticsearch;
pub mod s3;

use async_trait::async_trait;
use thiserror::Error;

use crate::models::{Distance, ImageUpload, Location, Post};

pub use self::clickhouse::ClickHouseMirror;
pub use self::elasticsearch::ElasticsearchGeoIndex;
pub use self::s3::S3AssetStore;

#[derive(Debug, Error)]
pub enum AssetStoreError {
    #[error("bucket {bucket} is not available: {reason}")]
    BucketUnavailable { bucket: String, reason: String },
    #[error("object write failed for {key}: {reason}")]
    Write { key: String, reason: String },
    #[error("setting public-read access failed for {key}: {reason}")]
    AccessPolicy { key: String, reason: String },
}

#[derive(Debug, Error)]
pub enum GeoIndexError {
    #[error("invalid Elasticsearch URL: {0}")]
    InvalidUrl(#[from] url::ParseError),
    #[error("failed to build transport: {0}")]
    TransportBuild(#[from] ::elasticsearch::http::transport::BuildError),
    #[error("transport error: {0}")]
    Transport(#[from] ::elasticsearch::Error),
    #[error("index {index} rejected request with status {status}: {body}")]
    Rejected {
        index: String,
        status: u16,
        body: String,
    },
    #[error("malformed search response: {0}")]
    MalformedResponse(String),
    #[error("geo index unavailable: {0}")]
    Unavailable(String),
}

#[derive(Debug, Error)]
pub enum SecondaryStoreError {
    #[error("ClickHouse client error: {0}")]
    Client(#[from] ::clickhouse::error::Error),
    #[error("invalid secondary store configuration: {0}")]
    Config(String),
    #[error("secondary store unavailable: {0}")]
    Unavailable(String),
}

/// Durable blob storage for post images.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait AssetStore: Send + Sync {
    /// Store `image` under `object_id` and return its public URL.
    ///
    /// The container must already exist; the object is fully written before it
    /// is made publicly readable. No retries.
    async fn put(&self, object_id: &str, image: &ImageUpload) -> Result<String, AssetStoreError>;
}

/// Geo-searchable post documents keyed by post id.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait GeoIndex: Send + Sync {
    /// Write (or overwrite) the document for `post.id`. Returns once the write
    /// is visible to subsequent searches.
    async fn put(&self, post: &Post) -> Result<(), GeoIndexError>;

    /// All posts within `radius` of `center`, in backend order.
    async fn query_radius(
        &self,
        center: Location,
        radius: Distance,
    ) -> Result<Vec<Post>, GeoIndexError>;

    async fn health_check(&self) -> Result<(), GeoIndexError>;
}

/// Best-effort duplicate storage for posts.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait SecondaryStore: Send + Sync {
    async fn mirror(&self, post: &Post) -> Result<(), SecondaryStoreError>;
}

use std::sync::Arc;
use std::time::Instant;
use tracing::{info, warn};
use uuid::Uuid;

use crate::error::PostError;
use crate::metrics::posts::{INGEST_STAGE_DURATION_SECONDS, POSTS_INGESTED_TOTAL, POSTS_REJECTED_TOTAL};
use crate::models::{CoordinatePolicy, ImageUpload, Post, RawPost};
use crate::services::mirror::MirrorQueue;
use crate::services::spam_filter::SpamFilter;
use crate::stores::{AssetStore, GeoIndex};

/// Write path for new posts: validate, filter, store the image, index the
/// document, then hand the post to the optional mirror.
///
/// The image is always stored before the document is indexed, so an indexed
/// post always carries a resolvable URL. An index failure leaves the stored
/// image behind.
#[derive(Clone)]
pub struct IngestionPipeline {
    spam_filter: Arc<SpamFilter>,
    assets: Arc<dyn AssetStore>,
    index: Arc<dyn GeoIndex>,
    coordinate_policy: CoordinatePolicy,
    mirror: Option<MirrorQueue>,
}

impl IngestionPipeline {
    pub fn new(
        spam_filter: Arc<SpamFilter>,
        assets: Arc<dyn AssetStore>,
        index: Arc<dyn GeoIndex>,
        coordinate_policy: CoordinatePolicy,
    ) -> Self {
        Self {
            spam_filter,
            assets,
            index,
            coordinate_policy,
            mirror: None,
        }
    }

    pub fn with_mirror(mut self, mirror: MirrorQueue) -> Self {
        self.mirror = Some(mirror);
        self
    }

    pub async fn ingest(&self, raw: RawPost, image: ImageUpload) -> Result<Post, PostError> {
        let result = self.run(raw, image).await;
        match &result {
            Ok(post) => {
                POSTS_INGESTED_TOTAL.inc();
                info!(post_id = %post.id, user = %post.user, "post ingested");
            }
            Err(e) => {
                POSTS_REJECTED_TOTAL.with_label_values(&[e.reason()]).inc();
                if e.is_client_error() {
                    info!(reason = e.reason(), "post rejected: {}", e);
                } else {
                    warn!(reason = e.reason(), error = %e, "post ingestion failed");
                }
            }
        }
        result
    }

    async fn run(&self, raw: RawPost, image: ImageUpload) -> Result<Post, PostError> {
        let location = self.coordinate_policy.parse_location(&raw.lat, &raw.lon)?;

        if image.is_empty() {
            return Err(PostError::Validation("image payload is empty".to_string()));
        }

        if self.spam_filter.is_filtered(&raw.message) {
            return Err(PostError::SpamRejected);
        }

        let id = Uuid::new_v4();

        let started = Instant::now();
        let url = self.assets.put(&id.to_string(), &image).await?;
        INGEST_STAGE_DURATION_SECONDS
            .with_label_values(&["asset_store"])
            .observe(started.elapsed().as_secs_f64());

        let post = Post {
            id,
            user: raw.user,
            message: raw.message,
            location,
            url,
        };

        let started = Instant::now();
        self.index.put(&post).await.map_err(PostError::IndexWrite)?;
        INGEST_STAGE_DURATION_SECONDS
            .with_label_values(&["index_write"])
            .observe(started.elapsed().as_secs_f64());

        if let Some(mirror) = &self.mirror {
            mirror.enqueue(post.clone());
        }

        Ok(post)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::stores::{AssetStoreError, GeoIndexError, MockAssetStore, MockGeoIndex};
    use mockall::Sequence;

    fn raw(message: &str) -> RawPost {
        RawPost {
            user: "alice".into(),
            message: message.into(),
            lat: "37.7".into(),
            lon: "-122.4".into(),
        }
    }

    fn image() -> ImageUpload {
        ImageUpload::new(vec![0xFF, 0xD8, 0xFF], Some("image/jpeg".into()))
    }

    fn pipeline(assets: MockAssetStore, index: MockGeoIndex, denylist: &[&str]) -> IngestionPipeline {
        IngestionPipeline::new(
            Arc::new(SpamFilter::new(denylist.iter().copied())),
            Arc::new(assets),
            Arc::new(index),
            CoordinatePolicy::Strict,
        )
    }

    #[tokio::test]
    async fn test_spam_rejected_before_any_write() {
        let mut assets = MockAssetStore::new();
        assets.expect_put().never();
        let mut index = MockGeoIndex::new();
        index.expect_put().never();

        let err = pipeline(assets, index, &["spam"])
            .ingest(raw("buy Spam today"), image())
            .await
            .unwrap_err();
        assert!(matches!(err, PostError::SpamRejected));
    }

    #[tokio::test]
    async fn test_asset_stored_before_index_write() {
        let mut seq = Sequence::new();
        let mut assets = MockAssetStore::new();
        assets
            .expect_put()
            .times(1)
            .in_sequence(&mut seq)
            .returning(|id, _| Ok(format!("https://assets.example/{id}")));
        let mut index = MockGeoIndex::new();
        index
            .expect_put()
            .times(1)
            .in_sequence(&mut seq)
            .withf(|post| post.url == format!("https://assets.example/{}", post.id))
            .returning(|_| Ok(()));

        let post = pipeline(assets, index, &[])
            .ingest(raw("hello"), image())
            .await
            .unwrap();
        assert_eq!(post.user, "alice");
        assert_eq!(post.location.lat, 37.7);
    }

    #[tokio::test]
    async fn test_asset_failure_skips_index() {
        let mut assets = MockAssetStore::new();
        assets.expect_put().returning(|_, _| {
            Err(AssetStoreError::BucketUnavailable {
                bucket: "b".into(),
                reason: "missing".into(),
            })
        });
        let mut index = MockGeoIndex::new();
        index.expect_put().never();

        let err = pipeline(assets, index, &[])
            .ingest(raw("hello"), image())
            .await
            .unwrap_err();
        assert!(matches!(err, PostError::AssetStore(_)));
    }

    #[tokio::test]
    async fn test_index_failure_is_reported() {
        let mut assets = MockAssetStore::new();
        assets.expect_put().returning(|_, _| Ok("https://assets.example/x".into()));
        let mut index = MockGeoIndex::new();
        index
            .expect_put()
            .returning(|_| Err(GeoIndexError::Unavailable("down".into())));

        let err = pipeline(assets, index, &[])
            .ingest(raw("hello"), image())
            .await
            .unwrap_err();
        assert!(matches!(err, PostError::IndexWrite(_)));
    }

    #[tokio::test]
    async fn test_invalid_input_writes_nothing() {
        let mut assets = MockAssetStore::new();
        assets.expect_put().never();
        let mut index = MockGeoIndex::new();
        index.expect_put().never();
        let pipeline = pipeline(assets, index, &[]);

        let mut bad = raw("hello");
        bad.lat = "north".into();
        assert!(matches!(
            pipeline.ingest(bad, image()).await,
            Err(PostError::InvalidCoordinates(_))
        ));

        let empty = ImageUpload::new(Vec::new(), None);
        assert!(matches!(
            pipeline.ingest(raw("hello"), empty).await,
            Err(PostError::Validation(_))
        ));
    }
}

//! In-memory store doubles for integration tests.
//!
//! Each double keeps its state behind `Arc<Mutex<..>>` so a test can hold a
//! clone and inspect what the pipeline wrote.
#![allow(dead_code)]

use async_trait::async_trait;
use geo_post_service::models::{CoordinatePolicy, Distance, ImageUpload, Location, Post};
use geo_post_service::services::{IngestionPipeline, QueryEngine, SpamFilter};
use geo_post_service::stores::{
    AssetStore, AssetStoreError, GeoIndex, GeoIndexError, SecondaryStore, SecondaryStoreError,
};
use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;
use uuid::Uuid;

/// Mean earth radius matching Elasticsearch's arc distance, in meters.
const EARTH_RADIUS_METERS: f64 = 6_371_008.7714;

/// Great-circle (haversine) distance in meters.
pub fn haversine_meters(a: &Location, b: &Location) -> f64 {
    let (lat1, lat2) = (a.lat.to_radians(), b.lat.to_radians());
    let d_lat = (b.lat - a.lat).to_radians();
    let d_lon = (b.lon - a.lon).to_radians();

    let h = (d_lat / 2.0).sin().powi(2) + lat1.cos() * lat2.cos() * (d_lon / 2.0).sin().powi(2);
    EARTH_RADIUS_METERS * 2.0 * h.sqrt().atan2((1.0 - h).sqrt())
}

/// Asset store keeping blobs in a map.
#[derive(Clone, Default)]
pub struct InMemoryAssetStore {
    objects: Arc<Mutex<HashMap<String, ImageUpload>>>,
    fail: Arc<AtomicBool>,
    calls: Arc<AtomicUsize>,
}

impl InMemoryAssetStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn set_failing(&self, fail: bool) {
        self.fail.store(fail, Ordering::SeqCst);
    }

    pub fn object_count(&self) -> usize {
        self.objects.lock().unwrap().len()
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    pub fn url_for(object_id: &str) -> String {
        format!("https://assets.test/{object_id}")
    }
}

#[async_trait]
impl AssetStore for InMemoryAssetStore {
    async fn put(&self, object_id: &str, image: &ImageUpload) -> Result<String, AssetStoreError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        if self.fail.load(Ordering::SeqCst) {
            return Err(AssetStoreError::BucketUnavailable {
                bucket: "internal-test-bucket".to_string(),
                reason: "simulated outage at s3.internal.test".to_string(),
            });
        }
        self.objects
            .lock()
            .unwrap()
            .insert(object_id.to_string(), image.clone());
        Ok(Self::url_for(object_id))
    }
}

/// Geo index keeping documents in a map and answering radius queries with a
/// haversine scan. Results are ordered by distance like a sorted geo query.
#[derive(Clone, Default)]
pub struct InMemoryGeoIndex {
    docs: Arc<Mutex<HashMap<Uuid, Post>>>,
    fail_writes: Arc<AtomicBool>,
    fail_queries: Arc<AtomicBool>,
    puts: Arc<AtomicUsize>,
    query_delay: Arc<Mutex<Option<Duration>>>,
}

impl InMemoryGeoIndex {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn set_failing_writes(&self, fail: bool) {
        self.fail_writes.store(fail, Ordering::SeqCst);
    }

    pub fn set_failing_queries(&self, fail: bool) {
        self.fail_queries.store(fail, Ordering::SeqCst);
    }

    /// Make every radius query sleep before answering.
    pub fn set_query_delay(&self, delay: Duration) {
        *self.query_delay.lock().unwrap() = Some(delay);
    }

    pub fn document_count(&self) -> usize {
        self.docs.lock().unwrap().len()
    }

    pub fn get(&self, id: Uuid) -> Option<Post> {
        self.docs.lock().unwrap().get(&id).cloned()
    }

    pub fn puts(&self) -> usize {
        self.puts.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl GeoIndex for InMemoryGeoIndex {
    async fn put(&self, post: &Post) -> Result<(), GeoIndexError> {
        self.puts.fetch_add(1, Ordering::SeqCst);
        if self.fail_writes.load(Ordering::SeqCst) {
            return Err(GeoIndexError::Unavailable("simulated write failure".into()));
        }
        self.docs.lock().unwrap().insert(post.id, post.clone());
        Ok(())
    }

    async fn query_radius(
        &self,
        center: Location,
        radius: Distance,
    ) -> Result<Vec<Post>, GeoIndexError> {
        let delay = *self.query_delay.lock().unwrap();
        if let Some(delay) = delay {
            tokio::time::sleep(delay).await;
        }
        if self.fail_queries.load(Ordering::SeqCst) {
            return Err(GeoIndexError::Unavailable(
                "simulated outage at es.internal.test:9200".into(),
            ));
        }

        let docs = self.docs.lock().unwrap();
        let mut hits: Vec<(f64, Post)> = docs
            .values()
            .map(|post| (haversine_meters(&center, &post.location), post.clone()))
            .filter(|(meters, _)| *meters <= radius.meters())
            .collect();
        hits.sort_by(|a, b| a.0.total_cmp(&b.0));
        Ok(hits.into_iter().map(|(_, post)| post).collect())
    }

    async fn health_check(&self) -> Result<(), GeoIndexError> {
        if self.fail_queries.load(Ordering::SeqCst) {
            return Err(GeoIndexError::Unavailable("down".into()));
        }
        Ok(())
    }
}

/// Secondary store recording every mirrored post.
#[derive(Clone, Default)]
pub struct RecordingSecondaryStore {
    rows: Arc<Mutex<Vec<Post>>>,
    fail: Arc<AtomicBool>,
}

impl RecordingSecondaryStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn failing() -> Self {
        let store = Self::default();
        store.fail.store(true, Ordering::SeqCst);
        store
    }

    pub fn rows(&self) -> Vec<Post> {
        self.rows.lock().unwrap().clone()
    }
}

#[async_trait]
impl SecondaryStore for RecordingSecondaryStore {
    async fn mirror(&self, post: &Post) -> Result<(), SecondaryStoreError> {
        if self.fail.load(Ordering::SeqCst) {
            return Err(SecondaryStoreError::Unavailable("simulated failure".into()));
        }
        self.rows.lock().unwrap().push(post.clone());
        Ok(())
    }
}

/// Pipeline and query engine wired to the given doubles.
pub fn build(
    assets: &InMemoryAssetStore,
    index: &InMemoryGeoIndex,
    denylist: &[&str],
    policy: CoordinatePolicy,
) -> (IngestionPipeline, QueryEngine) {
    let filter = Arc::new(SpamFilter::new(denylist.iter().copied()));
    let index: Arc<dyn GeoIndex> = Arc::new(index.clone());
    let pipeline = IngestionPipeline::new(
        filter.clone(),
        Arc::new(assets.clone()),
        index.clone(),
        policy,
    );
    let query = QueryEngine::new(filter, index, policy, Distance::from_km(200.0));
    (pipeline, query)
}

pub fn jpeg() -> ImageUpload {
    ImageUpload::new(vec![0xFF, 0xD8, 0xFF, 0xE0, 0x00, 0x10], Some("image/jpeg".into()))
}

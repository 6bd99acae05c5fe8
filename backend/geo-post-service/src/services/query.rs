use std::sync::Arc;
use tracing::{debug, warn};

use crate::error::PostError;
use crate::metrics::posts::{SEARCH_HITS_FILTERED_TOTAL, SEARCH_HITS_RETURNED, SEARCH_REQUESTS_TOTAL};
use crate::models::{CoordinatePolicy, Distance, Location, Post};
use crate::services::spam_filter::SpamFilter;
use crate::stores::GeoIndex;

/// Read path: radius search over the geo index with the spam filter re-applied
/// to every hit.
#[derive(Clone)]
pub struct QueryEngine {
    spam_filter: Arc<SpamFilter>,
    index: Arc<dyn GeoIndex>,
    coordinate_policy: CoordinatePolicy,
    default_radius: Distance,
}

impl QueryEngine {
    pub fn new(
        spam_filter: Arc<SpamFilter>,
        index: Arc<dyn GeoIndex>,
        coordinate_policy: CoordinatePolicy,
        default_radius: Distance,
    ) -> Self {
        Self {
            spam_filter,
            index,
            coordinate_policy,
            default_radius,
        }
    }

    /// Parse a search center from raw query parameters.
    pub fn parse_center(&self, lat: &str, lon: &str) -> Result<Location, PostError> {
        self.coordinate_policy.parse_location(lat, lon)
    }

    /// Radius string to distance; blank means the default radius.
    pub fn parse_radius(&self, radius: &str) -> Result<Distance, PostError> {
        if radius.trim().is_empty() {
            Ok(self.default_radius)
        } else {
            radius.parse()
        }
    }

    /// Search from raw `lat`/`lon`/`range` parameters.
    pub async fn search_at(&self, lat: &str, lon: &str, radius: &str) -> Result<Vec<Post>, PostError> {
        let center = match self.parse_center(lat, lon) {
            Ok(center) => center,
            Err(e) => {
                SEARCH_REQUESTS_TOTAL.with_label_values(&["client_error"]).inc();
                return Err(e);
            }
        };
        self.search(center, radius).await
    }

    /// All non-filtered posts within `radius` of `center`, in index order.
    pub async fn search(&self, center: Location, radius: &str) -> Result<Vec<Post>, PostError> {
        let radius = match self.parse_radius(radius) {
            Ok(radius) => radius,
            Err(e) => {
                SEARCH_REQUESTS_TOTAL.with_label_values(&["client_error"]).inc();
                return Err(e);
            }
        };

        let hits = match self.index.query_radius(center, radius).await {
            Ok(hits) => hits,
            Err(e) => {
                warn!(error = %e, lat = center.lat, lon = center.lon, "radius query failed");
                SEARCH_REQUESTS_TOTAL.with_label_values(&["backend_error"]).inc();
                return Err(PostError::QueryBackend(e));
            }
        };

        let total = hits.len();
        let posts: Vec<Post> = hits
            .into_iter()
            .filter(|post| !self.spam_filter.is_filtered(&post.message))
            .collect();

        let filtered = total - posts.len();
        if filtered > 0 {
            SEARCH_HITS_FILTERED_TOTAL.inc_by(filtered as u64);
        }
        SEARCH_REQUESTS_TOTAL.with_label_values(&["ok"]).inc();
        SEARCH_HITS_RETURNED.observe(posts.len() as f64);

        debug!(
            lat = center.lat,
            lon = center.lon,
            radius = %radius,
            hits = total,
            filtered,
            "radius search completed"
        );
        Ok(posts)
    }
}

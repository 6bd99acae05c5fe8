use async_trait::async_trait;
use elasticsearch::{
    auth::Credentials,
    http::{
        response::Response,
        transport::{SingleNodeConnectionPool, TransportBuilder},
    },
    indices::{IndicesCreateParts, IndicesExistsParts},
    params::Refresh,
    Elasticsearch, IndexParts, SearchParts,
};
use serde::Deserialize;
use serde_json::{json, Value};
use tracing::{debug, info};
use url::Url;
use uuid::Uuid;

use super::{GeoIndex, GeoIndexError};
use crate::config::ElasticsearchConfig;
use crate::models::{Distance, Location, Post, PostDocument};

const ALREADY_EXISTS: &str = "resource_already_exists_exception";

#[derive(Clone)]
pub struct ElasticsearchGeoIndex {
    client: Elasticsearch,
    post_index: String,
    user_index: String,
    search_size: i64,
}

impl ElasticsearchGeoIndex {
    /// Connect and make sure the post and user indices exist.
    pub async fn new(config: &ElasticsearchConfig) -> Result<Self, GeoIndexError> {
        let parsed = Url::parse(&config.url)?;
        let pool = SingleNodeConnectionPool::new(parsed);
        let mut builder = TransportBuilder::new(pool);
        if let (Some(user), Some(password)) = (&config.username, &config.password) {
            builder = builder.auth(Credentials::Basic(user.clone(), password.clone()));
        }
        let transport = builder.build()?;
        let client = Elasticsearch::new(transport);

        let instance = Self {
            client,
            post_index: config.post_index.clone(),
            user_index: config.user_index.clone(),
            search_size: config.search_size.max(1),
        };

        instance.ensure_post_index().await?;
        instance.ensure_user_index().await?;

        Ok(instance)
    }

    async fn ensure_post_index(&self) -> Result<(), GeoIndexError> {
        self.ensure_index(&self.post_index, Some(post_index_mapping())).await
    }

    async fn ensure_user_index(&self) -> Result<(), GeoIndexError> {
        self.ensure_index(&self.user_index, None).await
    }

    async fn ensure_index(&self, index: &str, body: Option<Value>) -> Result<(), GeoIndexError> {
        let exists_response = self
            .client
            .indices()
            .exists(IndicesExistsParts::Index(&[index]))
            .send()
            .await?;

        match exists_response.status_code().as_u16() {
            200 => return Ok(()),
            404 => {}
            status => {
                return Err(GeoIndexError::Rejected {
                    index: index.to_string(),
                    status,
                    body: exists_response.text().await.unwrap_or_default(),
                })
            }
        }

        let indices = self.client.indices();
        let request = indices.create(IndicesCreateParts::Index(index));
        let response = match body {
            Some(body) => request.body(body).send().await?,
            None => request.send().await?,
        };

        if response.status_code().is_success() {
            info!(index, "created index");
            return Ok(());
        }

        // Another replica may have created it between the check and the create.
        let status = response.status_code().as_u16();
        let text = response.text().await.unwrap_or_default();
        if text.contains(ALREADY_EXISTS) {
            debug!(index, "index already created concurrently");
            return Ok(());
        }

        Err(GeoIndexError::Rejected {
            index: index.to_string(),
            status,
            body: text,
        })
    }

    async fn reject_unless_success(&self, response: Response) -> Result<Response, GeoIndexError> {
        let status = response.status_code();
        if status.is_success() {
            return Ok(response);
        }
        Err(GeoIndexError::Rejected {
            index: self.post_index.clone(),
            status: status.as_u16(),
            body: response.text().await.unwrap_or_default(),
        })
    }
}

#[async_trait]
impl GeoIndex for ElasticsearchGeoIndex {
    async fn put(&self, post: &Post) -> Result<(), GeoIndexError> {
        let id = post.id.to_string();
        let response = self
            .client
            .index(IndexParts::IndexId(&self.post_index, id.as_str()))
            .refresh(Refresh::WaitFor)
            .body(PostDocument::from(post))
            .send()
            .await?;

        self.reject_unless_success(response).await?;
        Ok(())
    }

    async fn query_radius(
        &self,
        center: Location,
        radius: Distance,
    ) -> Result<Vec<Post>, GeoIndexError> {
        let body = radius_query(center, radius, self.search_size);

        let response = self
            .client
            .search(SearchParts::Index(&[self.post_index.as_str()]))
            .body(body)
            .send()
            .await?;

        let response = self.reject_unless_success(response).await?;
        let text = response.text().await?;
        decode_hits(&text)
    }

    async fn health_check(&self) -> Result<(), GeoIndexError> {
        let response = self.client.ping().send().await?;
        if response.status_code().is_success() {
            Ok(())
        } else {
            Err(GeoIndexError::Unavailable(format!(
                "ping returned status {}",
                response.status_code().as_u16()
            )))
        }
    }
}

fn post_index_mapping() -> Value {
    json!({
        "mappings": {
            "properties": {
                "location": { "type": "geo_point" }
            }
        }
    })
}

fn radius_query(center: Location, radius: Distance, size: i64) -> Value {
    json!({
        "size": size,
        "query": {
            "geo_distance": {
                "distance": radius.to_query_string(),
                "location": {
                    "lat": center.lat,
                    "lon": center.lon
                }
            }
        }
    })
}

/// Turn a raw search body into posts. Any hit that cannot be mapped fails the
/// whole query.
fn decode_hits(body: &str) -> Result<Vec<Post>, GeoIndexError> {
    let response: SearchResponse = serde_json::from_str(body)
        .map_err(|e| GeoIndexError::MalformedResponse(e.to_string()))?;

    response
        .hits
        .hits
        .into_iter()
        .map(|hit| {
            let id = Uuid::parse_str(&hit.id).map_err(|e| {
                GeoIndexError::MalformedResponse(format!("document id {:?}: {e}", hit.id))
            })?;
            if !hit.source.location.is_valid() {
                return Err(GeoIndexError::MalformedResponse(format!(
                    "document {id} has out-of-range location"
                )));
            }
            Ok(hit.source.into_post(id))
        })
        .collect()
}

#[derive(Debug, Deserialize)]
struct SearchResponse {
    hits: InnerHits,
}

#[derive(Debug, Deserialize)]
struct InnerHits {
    hits: Vec<PostHit>,
}

#[derive(Debug, Deserialize)]
struct PostHit {
    #[serde(rename = "_id")]
    id: String,
    #[serde(rename = "_source")]
    source: PostDocument,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_post_index_maps_location_as_geo_point() {
        let mapping = post_index_mapping();
        assert_eq!(
            mapping["mappings"]["properties"]["location"]["type"],
            "geo_point"
        );
    }

    #[test]
    fn test_radius_query_shape() {
        let body = radius_query(
            Location { lat: 37.7, lon: -122.4 },
            Distance::from_km(1.0),
            100,
        );
        assert_eq!(body["size"], 100);
        assert_eq!(body["query"]["geo_distance"]["distance"], "1000m");
        assert_eq!(body["query"]["geo_distance"]["location"]["lat"], 37.7);
    }

    #[test]
    fn test_decode_hits() {
        let id = Uuid::new_v4();
        let body = json!({
            "took": 3,
            "hits": {
                "total": { "value": 1, "relation": "eq" },
                "hits": [{
                    "_index": "post",
                    "_id": id.to_string(),
                    "_score": 1.0,
                    "_source": {
                        "user": "alice",
                        "message": "hello",
                        "location": { "lat": 37.7, "lon": -122.4 },
                        "url": "https://assets.example/a"
                    }
                }]
            }
        })
        .to_string();

        let posts = decode_hits(&body).unwrap();
        assert_eq!(posts.len(), 1);
        assert_eq!(posts[0].id, id);
        assert_eq!(posts[0].user, "alice");
    }

    #[test]
    fn test_decode_rejects_missing_fields() {
        let body = json!({
            "hits": { "hits": [{ "_id": Uuid::new_v4().to_string(), "_source": { "user": "bob" } }] }
        })
        .to_string();
        assert!(matches!(
            decode_hits(&body),
            Err(GeoIndexError::MalformedResponse(_))
        ));
    }

    #[test]
    fn test_decode_rejects_bad_id() {
        let body = json!({
            "hits": { "hits": [{
                "_id": "not-a-uuid",
                "_source": {
                    "user": "bob",
                    "message": "m",
                    "location": { "lat": 1.0, "lon": 1.0 },
                    "url": "u"
                }
            }] }
        })
        .to_string();
        assert!(matches!(
            decode_hits(&body),
            Err(GeoIndexError::MalformedResponse(_))
        ));
    }
}

/// S3-backed image storage
///
/// Objects are written first and only then made publicly readable, so a reader
/// can never observe a partially written public object.
use async_trait::async_trait;
use aws_sdk_s3::config::{Credentials, Region};
use aws_sdk_s3::error::DisplayErrorContext;
use aws_sdk_s3::primitives::ByteStream;
use aws_sdk_s3::types::ObjectCannedAcl;
use aws_sdk_s3::Client;
use tracing::debug;

use super::{AssetStore, AssetStoreError};
use crate::config::S3Config;
use crate::models::ImageUpload;

#[derive(Clone)]
pub struct S3AssetStore {
    client: Client,
    config: S3Config,
}

impl S3AssetStore {
    pub fn new(client: Client, config: S3Config) -> Self {
        Self { client, config }
    }

    /// Build a store with a client configured from `config`.
    pub async fn from_config(config: S3Config) -> Self {
        let client = build_client(&config).await;
        Self::new(client, config)
    }

    fn object_key(&self, object_id: &str) -> String {
        let prefix = self.config.key_prefix.trim_matches('/');
        if prefix.is_empty() {
            object_id.to_string()
        } else {
            format!("{prefix}/{object_id}")
        }
    }
}

#[async_trait]
impl AssetStore for S3AssetStore {
    async fn put(&self, object_id: &str, image: &ImageUpload) -> Result<String, AssetStoreError> {
        let bucket = &self.config.bucket;
        let key = self.object_key(object_id);

        self.client
            .head_bucket()
            .bucket(bucket)
            .send()
            .await
            .map_err(|e| AssetStoreError::BucketUnavailable {
                bucket: bucket.clone(),
                reason: DisplayErrorContext(&e).to_string(),
            })?;

        self.client
            .put_object()
            .bucket(bucket)
            .key(&key)
            .body(ByteStream::from(image.data.clone()))
            .set_content_type(image.content_type.clone())
            .send()
            .await
            .map_err(|e| AssetStoreError::Write {
                key: key.clone(),
                reason: DisplayErrorContext(&e).to_string(),
            })?;

        self.client
            .put_object_acl()
            .bucket(bucket)
            .key(&key)
            .acl(ObjectCannedAcl::PublicRead)
            .send()
            .await
            .map_err(|e| AssetStoreError::AccessPolicy {
                key: key.clone(),
                reason: DisplayErrorContext(&e).to_string(),
            })?;

        debug!(bucket = %bucket, key = %key, bytes = image.len(), "stored post image");
        Ok(object_url(&self.config, &key))
    }
}

/// Public URL for `key` under the configured bucket.
pub fn object_url(config: &S3Config, key: &str) -> String {
    if let Some(base) = &config.public_base_url {
        return format!("{}/{}", base.trim_end_matches('/'), key);
    }

    if config.path_style {
        let endpoint = config
            .endpoint
            .clone()
            .unwrap_or_else(|| format!("https://s3.{}.amazonaws.com", config.region));
        format!("{}/{}/{}", endpoint.trim_end_matches('/'), config.bucket, key)
    } else {
        format!(
            "https://{}.s3.{}.amazonaws.com/{}",
            config.bucket, config.region, key
        )
    }
}

/// Initialize the S3 client, falling back to the default credential chain
/// when no static keys are configured.
pub async fn build_client(config: &S3Config) -> Client {
    let mut loader = aws_config::defaults(aws_config::BehaviorVersion::latest())
        .region(Region::new(config.region.clone()));

    if let (Some(access_key_id), Some(secret_access_key)) =
        (&config.access_key_id, &config.secret_access_key)
    {
        let credentials = Credentials::new(
            access_key_id,
            secret_access_key,
            None,
            None,
            "geo_post_service_s3",
        );
        loader = loader.credentials_provider(credentials);
    }

    // S3-compatible storage such as MinIO
    if let Some(endpoint) = &config.endpoint {
        loader = loader.endpoint_url(endpoint);
    }

    let sdk_config = loader.load().await;
    let s3_config = aws_sdk_s3::config::Builder::from(&sdk_config)
        .force_path_style(config.path_style)
        .build();

    Client::from_conf(s3_config)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn config() -> S3Config {
        S3Config {
            bucket: "post-around-images".to_string(),
            region: "us-west-2".to_string(),
            access_key_id: None,
            secret_access_key: None,
            endpoint: None,
            path_style: false,
            key_prefix: String::new(),
            public_base_url: None,
        }
    }

    #[test]
    fn test_object_url_virtual_hosted_style() {
        let url = object_url(&config(), "abc");
        assert_eq!(url, "https://post-around-images.s3.us-west-2.amazonaws.com/abc");
    }

    #[test]
    fn test_object_url_path_style_with_endpoint() {
        let mut cfg = config();
        cfg.path_style = true;
        cfg.endpoint = Some("http://localhost:9000/".to_string());
        assert_eq!(
            object_url(&cfg, "abc"),
            "http://localhost:9000/post-around-images/abc"
        );
    }

    #[test]
    fn test_object_url_prefers_public_base() {
        let mut cfg = config();
        cfg.public_base_url = Some("https://cdn.example.com/".to_string());
        assert_eq!(object_url(&cfg, "images/abc"), "https://cdn.example.com/images/abc");
    }
}

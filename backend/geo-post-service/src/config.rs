/// Configuration management for geo-post-service
///
/// Loads configuration from environment variables with sensible defaults.
/// Every backend receives its own section; nothing is read from ambient globals
/// after startup.
use crate::models::{CoordinatePolicy, Distance};
use std::str::FromStr;
use std::time::Duration;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("invalid value for {key}: {value:?} ({reason})")]
    Invalid {
        key: &'static str,
        value: String,
        reason: String,
    },
    #[error("failed to load spam denylist from {path}: {source}")]
    Denylist {
        path: String,
        #[source]
        source: std::io::Error,
    },
}

#[derive(Clone, Debug)]
pub struct Config {
    pub app: AppConfig,
    pub elasticsearch: ElasticsearchConfig,
    pub s3: S3Config,
    pub clickhouse: ClickHouseConfig,
    pub spam: SpamConfig,
    pub ingest: IngestConfig,
}

#[derive(Clone, Debug)]
pub struct AppConfig {
    pub host: String,
    pub port: u16,
    pub env: String,
    /// Emit JSON log lines instead of the human-readable format
    pub json_logs: bool,
    /// Upper bound for a single request, enforced by the HTTP handlers
    pub request_timeout: Duration,
    pub max_image_bytes: usize,
}

#[derive(Clone, Debug)]
pub struct ElasticsearchConfig {
    pub url: String,
    pub username: Option<String>,
    pub password: Option<String>,
    pub post_index: String,
    pub user_index: String,
    /// Maximum number of hits returned by one radius query
    pub search_size: i64,
}

#[derive(Clone, Debug)]
pub struct S3Config {
    pub bucket: String,
    pub region: String,
    pub access_key_id: Option<String>,
    pub secret_access_key: Option<String>,
    /// Custom endpoint for S3-compatible storage such as MinIO
    pub endpoint: Option<String>,
    /// Use path-style addressing (`{endpoint}/{bucket}/{key}`)
    pub path_style: bool,
    pub key_prefix: String,
    /// Public base URL (CDN) used when building asset references
    pub public_base_url: Option<String>,
}

#[derive(Clone, Debug)]
pub struct ClickHouseConfig {
    pub enabled: bool,
    pub url: String,
    pub database: String,
    pub user: Option<String>,
    pub password: Option<String>,
    pub table: String,
    /// Mirror jobs buffered before new ones are dropped
    pub queue_capacity: usize,
    pub max_concurrent_writes: usize,
}

#[derive(Clone, Debug, Default)]
pub struct SpamConfig {
    pub denylist: Vec<String>,
    pub denylist_path: Option<String>,
}

#[derive(Clone, Debug)]
pub struct IngestConfig {
    pub coordinate_policy: CoordinatePolicy,
    pub default_radius: Distance,
}

impl Config {
    /// Load configuration from environment variables
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Load configuration from an arbitrary key lookup.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let env = Env(&lookup);

        Ok(Config {
            app: AppConfig {
                host: env.string("GEO_POST_SERVICE_HOST", "0.0.0.0"),
                port: env.parse("GEO_POST_SERVICE_PORT", 8080)?,
                env: env.string("APP_ENV", "development"),
                json_logs: env.string("LOG_FORMAT", "text").eq_ignore_ascii_case("json"),
                request_timeout: Duration::from_secs(env.parse("REQUEST_TIMEOUT_SECS", 30)?),
                max_image_bytes: env.parse("MAX_IMAGE_BYTES", 10 * 1024 * 1024)?,
            },
            elasticsearch: ElasticsearchConfig {
                url: env.string("ELASTICSEARCH_URL", "http://localhost:9200"),
                username: env.optional("ELASTICSEARCH_USERNAME"),
                password: env.optional("ELASTICSEARCH_PASSWORD"),
                post_index: env.string("ELASTICSEARCH_POST_INDEX", "post"),
                user_index: env.string("ELASTICSEARCH_USER_INDEX", "user"),
                search_size: env.parse("ELASTICSEARCH_SEARCH_SIZE", 100)?,
            },
            s3: S3Config {
                bucket: env.string("S3_BUCKET", "post-around-images"),
                region: env.string("AWS_REGION", "us-east-1"),
                access_key_id: env.optional("AWS_ACCESS_KEY_ID"),
                secret_access_key: env.optional("AWS_SECRET_ACCESS_KEY"),
                endpoint: env.optional("S3_ENDPOINT"),
                path_style: env.parse("S3_PATH_STYLE", false)?,
                key_prefix: env.string("S3_KEY_PREFIX", ""),
                public_base_url: env.optional("S3_PUBLIC_BASE_URL"),
            },
            clickhouse: ClickHouseConfig {
                enabled: env.parse("ENABLE_SECONDARY_STORE", false)?,
                url: env.string("CLICKHOUSE_URL", "http://localhost:8123"),
                database: env.string("CLICKHOUSE_DATABASE", "default"),
                user: env.optional("CLICKHOUSE_USER"),
                password: env.optional("CLICKHOUSE_PASSWORD"),
                table: env.string("CLICKHOUSE_POST_TABLE", "post_mirror"),
                queue_capacity: env.parse("MIRROR_QUEUE_CAPACITY", 1024)?,
                max_concurrent_writes: env.parse("MIRROR_MAX_CONCURRENT_WRITES", 4)?,
            },
            spam: SpamConfig {
                denylist: env
                    .optional("SPAM_DENYLIST")
                    .map(|raw| {
                        raw.split(',')
                            .map(|w| w.trim().to_string())
                            .filter(|w| !w.is_empty())
                            .collect()
                    })
                    .unwrap_or_default(),
                denylist_path: env.optional("SPAM_DENYLIST_PATH"),
            },
            ingest: IngestConfig {
                coordinate_policy: env.parse("COORDINATE_POLICY", CoordinatePolicy::Strict)?,
                default_radius: env.parse(
                    "DEFAULT_SEARCH_RADIUS",
                    Distance::from_km(200.0),
                )?,
            },
        })
    }
}

struct Env<'a, F>(&'a F);

impl<'a, F> Env<'a, F>
where
    F: Fn(&str) -> Option<String>,
{
    fn optional(&self, key: &str) -> Option<String> {
        (self.0)(key).filter(|v| !v.trim().is_empty())
    }

    fn string(&self, key: &str, default: &str) -> String {
        self.optional(key).unwrap_or_else(|| default.to_string())
    }

    fn parse<T>(&self, key: &'static str, default: T) -> Result<T, ConfigError>
    where
        T: FromStr,
        T::Err: std::fmt::Display,
    {
        match self.optional(key) {
            None => Ok(default),
            Some(value) => value.trim().parse().map_err(|e: T::Err| ConfigError::Invalid {
                key,
                reason: e.to_string(),
                value,
            }),
        }
    }
}

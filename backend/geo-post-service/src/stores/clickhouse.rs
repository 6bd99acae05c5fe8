use async_trait::async_trait;
use chrono::Utc;
use clickhouse::{Client, Row};
use serde::Serialize;

use super::{SecondaryStore, SecondaryStoreError};
use crate::config::ClickHouseConfig;
use crate::models::Post;

#[derive(Clone)]
pub struct ClickHouseMirror {
    client: Client,
    table: String,
}

/// One mirrored post. `written_at` is epoch milliseconds, used as the
/// ReplacingMergeTree version so a re-mirrored id keeps its latest copy.
#[derive(Debug, Clone, Serialize, Row)]
pub struct PostRow {
    pub post_id: String,
    pub user: String,
    pub message: String,
    pub lat: f64,
    pub lon: f64,
    pub url: String,
    pub written_at: i64,
}

impl From<&Post> for PostRow {
    fn from(post: &Post) -> Self {
        Self {
            post_id: post.id.to_string(),
            user: post.user.clone(),
            message: post.message.clone(),
            lat: post.location.lat,
            lon: post.location.lon,
            url: post.url.clone(),
            written_at: Utc::now().timestamp_millis(),
        }
    }
}

impl ClickHouseMirror {
    pub async fn new(config: &ClickHouseConfig) -> Result<Self, SecondaryStoreError> {
        validate_table_name(&config.table)?;

        let mut client = Client::default()
            .with_url(&config.url)
            .with_database(&config.database);
        if let Some(user) = &config.user {
            client = client.with_user(user);
        }
        if let Some(password) = &config.password {
            client = client.with_password(password);
        }

        let instance = Self {
            client,
            table: config.table.clone(),
        };
        instance.ensure_schema().await?;
        Ok(instance)
    }

    async fn ensure_schema(&self) -> Result<(), SecondaryStoreError> {
        let ddl = format!(
            r#"
            CREATE TABLE IF NOT EXISTS {} (
                post_id String,
                user String,
                message String,
                lat Float64,
                lon Float64,
                url String,
                written_at Int64
            ) ENGINE = ReplacingMergeTree(written_at)
            ORDER BY post_id
            "#,
            self.table
        );

        self.client.query(&ddl).execute().await?;
        Ok(())
    }
}

#[async_trait]
impl SecondaryStore for ClickHouseMirror {
    async fn mirror(&self, post: &Post) -> Result<(), SecondaryStoreError> {
        let row = PostRow::from(post);
        let mut insert = self.client.insert(&self.table)?;
        insert.write(&row).await?;
        insert.end().await?;
        Ok(())
    }
}

fn validate_table_name(table: &str) -> Result<(), SecondaryStoreError> {
    let valid = !table.is_empty()
        && table
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || c == '_');
    if valid {
        Ok(())
    } else {
        Err(SecondaryStoreError::Config(format!(
            "table name {table:?} must be alphanumeric or underscore"
        )))
    }
}

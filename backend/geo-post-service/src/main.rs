/// Geo Post Service - HTTP Server
///
/// Accepts location-tagged posts with an image and serves radius searches.
use actix_web::{web, App, HttpServer};
use anyhow::{Context, Result};
use geo_post_service::handlers::{self, AppState, RequestLimits};
use geo_post_service::services::{IngestionPipeline, MirrorQueue, QueryEngine, SpamFilter};
use geo_post_service::stores::{
    AssetStore, ClickHouseMirror, ElasticsearchGeoIndex, GeoIndex, S3AssetStore, SecondaryStore,
};
use geo_post_service::Config;
use std::sync::Arc;
use std::time::Duration;
use tracing_actix_web::TracingLogger;

const MIRROR_DRAIN_TIMEOUT: Duration = Duration::from_secs(10);

#[actix_web::main]
async fn main() -> Result<()> {
    dotenvy::dotenv().ok();

    let config = Config::from_env().context("Failed to load configuration")?;
    init_tracing(config.app.json_logs);

    tracing::info!(env = %config.app.env, "Starting geo-post-service");

    let spam_filter =
        Arc::new(SpamFilter::from_config(&config.spam).context("Failed to load spam denylist")?);

    let index: Arc<dyn GeoIndex> = Arc::new(
        ElasticsearchGeoIndex::new(&config.elasticsearch)
            .await
            .context("Failed to initialize Elasticsearch indices")?,
    );
    tracing::info!(url = %config.elasticsearch.url, "Geo index ready");

    let assets: Arc<dyn AssetStore> = Arc::new(S3AssetStore::from_config(config.s3.clone()).await);

    let mut pipeline = IngestionPipeline::new(
        spam_filter.clone(),
        assets,
        index.clone(),
        config.ingest.coordinate_policy,
    );

    let mut mirror_worker = None;
    if config.clickhouse.enabled {
        match ClickHouseMirror::new(&config.clickhouse).await {
            Ok(mirror) => {
                let store: Arc<dyn SecondaryStore> = Arc::new(mirror);
                let (queue, worker) = MirrorQueue::spawn(
                    store,
                    config.clickhouse.queue_capacity,
                    config.clickhouse.max_concurrent_writes,
                );
                pipeline = pipeline.with_mirror(queue);
                mirror_worker = Some(worker);
                tracing::info!("ClickHouse mirror enabled");
            }
            Err(e) => {
                tracing::warn!(error = %e, "ClickHouse unavailable; running without secondary store");
            }
        }
    }

    let query = QueryEngine::new(
        spam_filter,
        index.clone(),
        config.ingest.coordinate_policy,
        config.ingest.default_radius,
    );

    let state = AppState {
        pipeline,
        query,
        index,
        limits: RequestLimits {
            max_image_bytes: config.app.max_image_bytes,
            request_timeout: config.app.request_timeout,
        },
    };

    let bind_address = format!("{}:{}", config.app.host, config.app.port);
    tracing::info!("HTTP server listening on {}", bind_address);

    let server = HttpServer::new(move || {
        App::new()
            .wrap(handlers::cors())
            .wrap(TracingLogger::default())
            .app_data(web::Data::new(state.clone()))
            .configure(handlers::configure)
    })
    .bind(&bind_address)
    .with_context(|| format!("Failed to bind {bind_address}"))?
    .run();

    server.await.context("HTTP server error")?;

    // The server (and with it every queue handle) is gone; flush pending mirror writes.
    if let Some(worker) = mirror_worker {
        if tokio::time::timeout(MIRROR_DRAIN_TIMEOUT, worker.drain())
            .await
            .is_err()
        {
            tracing::warn!("Timed out draining mirror queue");
        }
    }

    tracing::info!("geo-post-service shutting down");
    Ok(())
}

fn init_tracing(json: bool) {
    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| "geo_post_service=debug,actix_web=info".into());

    if json {
        tracing_subscriber::fmt()
            .with_env_filter(filter)
            .with_target(false)
            .json()
            .init();
    } else {
        tracing_subscriber::fmt().with_env_filter(filter).init();
    }
}

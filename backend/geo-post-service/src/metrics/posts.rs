use lazy_static::lazy_static;
use prometheus::{
    register_histogram, register_histogram_vec, register_int_counter, register_int_counter_vec,
    Histogram, HistogramVec, IntCounter, IntCounterVec,
};

lazy_static! {
    /// Posts that made it into the geo index.
    pub static ref POSTS_INGESTED_TOTAL: IntCounter = register_int_counter!(
        "geo_posts_ingested_total",
        "Posts successfully stored and indexed"
    )
    .expect("failed to register geo_posts_ingested_total");

    /// Rejected or failed ingestions by reason (spam, invalid_coordinates, asset_store, ...).
    pub static ref POSTS_REJECTED_TOTAL: IntCounterVec = register_int_counter_vec!(
        "geo_posts_rejected_total",
        "Post ingestions that did not complete, segmented by reason",
        &["reason"]
    )
    .expect("failed to register geo_posts_rejected_total");

    /// Latency of each ingestion stage (asset_store, index_write).
    pub static ref INGEST_STAGE_DURATION_SECONDS: HistogramVec = register_histogram_vec!(
        "geo_ingest_stage_duration_seconds",
        "Duration of post ingestion stages",
        &["stage"]
    )
    .expect("failed to register geo_ingest_stage_duration_seconds");

    /// Radius searches by outcome (ok/client_error/backend_error).
    pub static ref SEARCH_REQUESTS_TOTAL: IntCounterVec = register_int_counter_vec!(
        "geo_search_requests_total",
        "Radius search requests segmented by outcome",
        &["result"]
    )
    .expect("failed to register geo_search_requests_total");

    /// Posts returned per search after filtering.
    pub static ref SEARCH_HITS_RETURNED: Histogram = register_histogram!(
        "geo_search_hits_returned",
        "Number of posts returned per radius search",
        vec![0.0, 1.0, 5.0, 10.0, 25.0, 50.0, 100.0]
    )
    .expect("failed to register geo_search_hits_returned");

    /// Index hits dropped by the spam filter at query time.
    pub static ref SEARCH_HITS_FILTERED_TOTAL: IntCounter = register_int_counter!(
        "geo_search_hits_filtered_total",
        "Search hits removed by the spam filter"
    )
    .expect("failed to register geo_search_hits_filtered_total");

    /// Secondary store mirror attempts (ok/error/dropped).
    pub static ref MIRROR_WRITES_TOTAL: IntCounterVec = register_int_counter_vec!(
        "geo_mirror_writes_total",
        "Secondary store mirror writes segmented by outcome",
        &["result"]
    )
    .expect("failed to register geo_mirror_writes_total");
}

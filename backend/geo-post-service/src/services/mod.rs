//! Business logic: spam filtering, the ingestion pipeline, radius search and
//! the secondary-store mirror.

pub mod ingestion;
pub mod mirror;
pub mod query;
pub mod spam_filter;

pub use ingestion::IngestionPipeline;
pub use mirror::{MirrorQueue, MirrorWorker};
pub use query::QueryEngine;
pub use spam_filter::SpamFilter;

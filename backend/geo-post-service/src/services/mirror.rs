/// Best-effort mirroring of accepted posts into the secondary store.
///
/// Ingestion hands posts to a bounded queue and never waits on the mirror.
/// A single worker drains the queue and writes with bounded concurrency.
/// Failures are logged and counted; nothing is retried.
use std::sync::Arc;
use tokio::sync::{mpsc, Semaphore};
use tokio::task::JoinHandle;
use tracing::{debug, error, info, warn};

use crate::metrics::posts::MIRROR_WRITES_TOTAL;
use crate::models::Post;
use crate::stores::SecondaryStore;

/// Cloneable producer side of the mirror queue.
#[derive(Clone)]
pub struct MirrorQueue {
    tx: mpsc::Sender<Post>,
}

/// Handle to the background worker; [`MirrorWorker::drain`] waits for
/// everything already queued to be written.
pub struct MirrorWorker {
    handle: JoinHandle<()>,
}

impl MirrorQueue {
    /// Start the worker. It runs until every `MirrorQueue` clone is dropped.
    pub fn spawn(
        store: Arc<dyn SecondaryStore>,
        capacity: usize,
        max_concurrent: usize,
    ) -> (MirrorQueue, MirrorWorker) {
        let (tx, rx) = mpsc::channel(capacity.max(1));
        let handle = tokio::spawn(run_worker(store, rx, max_concurrent.max(1)));
        (MirrorQueue { tx }, MirrorWorker { handle })
    }

    /// Queue a post for mirroring. Returns false when the post was dropped
    /// because the queue is full or the worker has stopped.
    pub fn enqueue(&self, post: Post) -> bool {
        match self.tx.try_send(post) {
            Ok(()) => true,
            Err(mpsc::error::TrySendError::Full(post)) => {
                warn!(post_id = %post.id, "mirror queue full, dropping post");
                MIRROR_WRITES_TOTAL.with_label_values(&["dropped"]).inc();
                false
            }
            Err(mpsc::error::TrySendError::Closed(post)) => {
                warn!(post_id = %post.id, "mirror worker stopped, dropping post");
                MIRROR_WRITES_TOTAL.with_label_values(&["dropped"]).inc();
                false
            }
        }
    }
}

impl MirrorWorker {
    /// Wait for the worker to finish. Callers must drop every queue handle
    /// first, otherwise this waits forever.
    pub async fn drain(self) {
        if let Err(e) = self.handle.await {
            error!("mirror worker panicked: {}", e);
        }
    }
}

async fn run_worker(store: Arc<dyn SecondaryStore>, mut rx: mpsc::Receiver<Post>, max: usize) {
    let permits = Arc::new(Semaphore::new(max));
    info!(max_concurrent = max, "mirror worker started");

    while let Some(post) = rx.recv().await {
        let permit = match permits.clone().acquire_owned().await {
            Ok(permit) => permit,
            Err(_) => break,
        };
        let store = store.clone();

        tokio::spawn(async move {
            let _permit = permit;
            match store.mirror(&post).await {
                Ok(()) => {
                    debug!(post_id = %post.id, "post mirrored");
                    MIRROR_WRITES_TOTAL.with_label_values(&["ok"]).inc();
                }
                Err(e) => {
                    error!(post_id = %post.id, error = %e, "failed to mirror post");
                    MIRROR_WRITES_TOTAL.with_label_values(&["error"]).inc();
                }
            }
        });
    }

    // All producers are gone; wait for in-flight writes.
    let _ = permits.acquire_many(max as u32).await;
    info!("mirror worker stopped");
}

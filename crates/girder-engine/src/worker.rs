//! The fixed worker pool: sharded, ordered request queues.

use std::sync::Arc;

use girder_transport::Request;
use tokio::sync::mpsc;
use tracing::{debug, trace, warn};

use crate::dispatch::RouteTable;

/// A fixed set of bounded task queues, each drained by exactly one worker
/// loop. Requests shard by connection id, so one connection's requests
/// run in FIFO order on a single worker while different connections
/// proceed in parallel.
#[derive(Clone)]
pub(crate) struct WorkerPool {
    queues: Vec<mpsc::Sender<Request>>,
}

impl WorkerPool {
    pub(crate) fn start(workers: usize, queue_depth: usize, routes: Arc<RouteTable>) -> Self {
        assert!(workers > 0, "worker pool size must be nonzero");

        let mut queues = Vec::with_capacity(workers);
        for worker_id in 0..workers {
            let (tx, mut rx) = mpsc::channel::<Request>(queue_depth);
            let routes = routes.clone();
            tokio::spawn(async move {
                debug!(worker_id, "worker started");
                while let Some(request) = rx.recv().await {
                    routes.dispatch(request).await;
                }
                debug!(worker_id, "worker exited");
            });
            queues.push(tx);
        }

        Self { queues }
    }

    /// Enqueue a request on its connection's worker. Suspends while the
    /// target queue is full: backpressure, not loss.
    pub(crate) async fn submit(&self, request: Request) {
        let worker_id = request.connection().id() as usize % self.queues.len();
        trace!(
            conn_id = request.connection().id(),
            msg_id = request.message_id(),
            worker_id,
            "request queued"
        );
        if self.queues[worker_id].send(request).await.is_err() {
            // Worker loops live for the process; a closed queue only
            // happens during teardown.
            warn!(worker_id, "worker queue closed; request dropped");
        }
    }
}

//! Message dispatch: the route table, dispatch modes, and the dispatcher.

use std::collections::HashMap;
use std::sync::Arc;

use girder_transport::{PacketHandler, Request, ServerConfig};
use tracing::{debug, warn};

use crate::router::{Router, RouterDyn};
use crate::worker::WorkerPool;

/// How dispatched requests are scheduled.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DispatchMode {
    /// One task per inbound message, with no per-connection ordering
    /// guarantee. Useful for low-traffic or debugging setups.
    Inline,
    /// A fixed pool: requests from one connection always land on the same
    /// worker queue (`connection id % workers`) and run in FIFO order.
    Pooled { workers: usize, queue_depth: usize },
}

impl DispatchMode {
    /// Derive the mode from a server configuration; pool size 0 selects
    /// inline dispatch.
    pub fn from_config(config: &ServerConfig) -> Self {
        match config.worker_pool_size {
            0 => Self::Inline,
            workers => Self::Pooled {
                workers,
                queue_depth: config.max_worker_queue_len,
            },
        }
    }
}

/// The message-id to router mapping.
///
/// Built once before the listener starts accepting and read-only from
/// concurrent dispatch thereafter, so lookups take no lock.
#[derive(Default)]
pub struct RouteTable {
    routes: HashMap<u32, Box<dyn RouterDyn>>,
}

impl RouteTable {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a router for a message id.
    ///
    /// # Panics
    ///
    /// Registering an id twice is a startup-time configuration error,
    /// not a runtime condition, and panics regardless of router types.
    pub fn register<R: Router>(&mut self, msg_id: u32, router: R) {
        if self.routes.insert(msg_id, Box::new(router)).is_some() {
            panic!("duplicate router registration for message id {msg_id}");
        }
        debug!(msg_id, "router registered");
    }

    pub fn len(&self) -> usize {
        self.routes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.routes.is_empty()
    }

    /// Run the three-stage handler chain for one request.
    ///
    /// An unregistered message id is reported and the request dropped; an
    /// unknown id from a client must never take the server down. A stage
    /// error aborts the remaining stages for this request only.
    pub(crate) async fn dispatch(&self, request: Request) {
        let msg_id = request.message_id();
        let Some(router) = self.routes.get(&msg_id) else {
            warn!(
                msg_id,
                conn_id = request.connection().id(),
                "no router registered for message id; dropping request"
            );
            return;
        };

        if let Err(e) = router.pre_handle_dyn(&request).await {
            warn!(msg_id, error = %e, "pre_handle failed; aborting handler chain");
            return;
        }
        if let Err(e) = router.handle_dyn(&request).await {
            warn!(msg_id, error = %e, "handle failed; aborting handler chain");
            return;
        }
        if let Err(e) = router.post_handle_dyn(&request).await {
            warn!(msg_id, error = %e, "post_handle failed");
        }
    }
}

/// Routes decoded requests into their handler chains, either inline or
/// through the worker pool.
///
/// Cheap to clone; clones share the frozen route table and the pool.
#[derive(Clone)]
pub struct Dispatcher {
    routes: Arc<RouteTable>,
    pool: Option<WorkerPool>,
}

impl Dispatcher {
    /// A dispatcher with no worker pool (inline mode until one is started).
    pub fn new(routes: RouteTable) -> Self {
        Self {
            routes: Arc::new(routes),
            pool: None,
        }
    }

    /// Construct a dispatcher already configured for `mode`.
    pub fn with_mode(routes: RouteTable, mode: DispatchMode) -> Self {
        let mut dispatcher = Self::new(routes);
        if let DispatchMode::Pooled {
            workers,
            queue_depth,
        } = mode
        {
            dispatcher.start_worker_pool(workers, queue_depth);
        }
        dispatcher
    }

    /// Allocate the sharded queues and spawn one worker loop per slot.
    ///
    /// # Panics
    ///
    /// Must be called at most once, before connections are accepted; a
    /// second call is a configuration error and panics.
    pub fn start_worker_pool(&mut self, workers: usize, queue_depth: usize) {
        if self.pool.is_some() {
            panic!("worker pool started twice");
        }
        self.pool = Some(WorkerPool::start(workers, queue_depth, self.routes.clone()));
    }

    /// Run the handler chain for one request in the calling context.
    pub async fn dispatch(&self, request: Request) {
        self.routes.dispatch(request).await;
    }
}

impl PacketHandler for Dispatcher {
    async fn on_packet(&self, request: Request) {
        match &self.pool {
            // Pooled: enqueue on the connection's worker; a full queue
            // suspends this call, backpressuring the offending
            // connection's receive loop instead of dropping the message.
            Some(pool) => pool.submit(request).await,
            // Inline: one task per message.
            None => {
                let routes = self.routes.clone();
                tokio::spawn(async move { routes.dispatch(request).await });
            }
        }
    }
}

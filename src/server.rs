//! The embedder-facing server.
//!
//! Owns the configuration, the route table, and the lifecycle hooks while
//! the application assembles them, then composes dispatcher and listener
//! at `start()`. From that point the route table is frozen and the accept
//! loop runs on its own task.

use std::future::{self, Future};
use std::net::SocketAddr;
use std::sync::Arc;

use girder_engine::{DispatchMode, Dispatcher, RouteTable, Router};
use girder_transport::{Connection, ConnectionRegistry, LifecycleHooks, Listener, ServerConfig};
use thiserror::Error;
use tracing::info;

/// Errors surfaced by server startup.
///
/// Configuration mistakes (duplicate routes, starting twice) are not in
/// here: those panic, since they are programming errors, not operational
/// faults.
#[derive(Debug, Error)]
pub enum ServerError {
    #[error("failed to bind listener: {0}")]
    Bind(#[source] std::io::Error),
}

/// Server lifecycle states.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ServerState {
    Idle,
    Listening,
    Stopped,
}

/// A server with default configuration under the given name.
pub fn new_server(name: impl Into<String>) -> Server {
    Server::new(ServerConfig::named(name))
}

/// The framework entry point for embedding applications: register routers
/// and hooks, then `start()` or `serve()`.
pub struct Server {
    config: ServerConfig,
    routes: RouteTable,
    hooks: LifecycleHooks,
    state: ServerState,
    listener: Option<Listener>,
}

impl Server {
    pub fn new(config: ServerConfig) -> Self {
        Self {
            config,
            routes: RouteTable::new(),
            hooks: LifecycleHooks::new(),
            state: ServerState::Idle,
            listener: None,
        }
    }

    pub fn config(&self) -> &ServerConfig {
        &self.config
    }

    pub fn state(&self) -> ServerState {
        self.state
    }

    /// Register a router for a message id.
    ///
    /// # Panics
    ///
    /// Panics on a duplicate id, or if the server has already started;
    /// the route table is immutable once the listener is up.
    pub fn add_router<R: Router>(&mut self, msg_id: u32, router: R) -> &mut Self {
        assert!(
            self.state == ServerState::Idle,
            "routers must be registered before start"
        );
        self.routes.register(msg_id, router);
        self
    }

    /// Set the hook invoked on each connection's task right after its
    /// loops start. Absent hook: silent no-op.
    pub fn set_on_connection_start<F, Fut>(&mut self, hook: F) -> &mut Self
    where
        F: Fn(Arc<Connection>) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = ()> + Send + 'static,
    {
        self.hooks = std::mem::take(&mut self.hooks).with_on_start(hook);
        self
    }

    /// Set the hook invoked as a connection begins stopping, while its
    /// properties and registry entry are still intact.
    pub fn set_on_connection_stop<F, Fut>(&mut self, hook: F) -> &mut Self
    where
        F: Fn(Arc<Connection>) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = ()> + Send + 'static,
    {
        self.hooks = std::mem::take(&mut self.hooks).with_on_stop(hook);
        self
    }

    /// Freeze the route table, start the worker pool (if configured),
    /// bind, and begin accepting. Returns promptly; the accept loop runs
    /// on its own task.
    ///
    /// # Panics
    ///
    /// Starting a server twice is a configuration error and panics.
    pub async fn start(&mut self) -> Result<(), ServerError> {
        assert!(self.state == ServerState::Idle, "server started twice");

        let mode = DispatchMode::from_config(&self.config);
        info!(
            name = %self.config.name,
            host = %self.config.host,
            port = self.config.port,
            max_connections = self.config.max_connections,
            max_packet_size = self.config.max_packet_size,
            ?mode,
            "starting server"
        );

        let routes = std::mem::take(&mut self.routes);
        let dispatcher = Dispatcher::with_mode(routes, mode);
        let hooks = std::mem::take(&mut self.hooks);

        let listener = Listener::start(&self.config, dispatcher, hooks)
            .await
            .map_err(ServerError::Bind)?;

        info!(name = %self.config.name, addr = %listener.local_addr(), "server started");
        self.listener = Some(listener);
        self.state = ServerState::Listening;
        Ok(())
    }

    /// `start`, then park the calling task indefinitely. This is the
    /// process-supervision boundary; all real work happens on the accept,
    /// connection, and worker tasks.
    pub async fn serve(&mut self) -> Result<(), ServerError> {
        self.start().await?;
        future::pending::<()>().await;
        Ok(())
    }

    /// Stop every live connection via the registry drain.
    pub async fn stop(&mut self) {
        if let Some(listener) = &self.listener {
            info!(name = %self.config.name, "stopping server");
            listener.shutdown().await;
        }
        self.state = ServerState::Stopped;
    }

    /// The bound address once listening (useful with port 0).
    pub fn local_addr(&self) -> Option<SocketAddr> {
        self.listener.as_ref().map(Listener::local_addr)
    }

    /// The connection registry once listening.
    pub fn registry(&self) -> Option<&Arc<ConnectionRegistry>> {
        self.listener.as_ref().map(Listener::registry)
    }
}

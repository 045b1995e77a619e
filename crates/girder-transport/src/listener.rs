//! TCP listener: accept loop, connection ceiling, id assignment.

use std::io;
use std::net::SocketAddr;
use std::sync::Arc;

use tokio::net::TcpListener;
use tracing::{debug, info, warn};

use crate::config::ServerConfig;
use crate::connection::{Connection, ConnectionContext};
use crate::handler::{LifecycleHooks, PacketHandler};
use crate::registry::ConnectionRegistry;

/// The listening side of a server: binds the socket and accepts
/// connections on a dedicated task.
pub struct Listener {
    local_addr: SocketAddr,
    registry: Arc<ConnectionRegistry>,
}

impl Listener {
    /// Bind and start accepting. Returns promptly; accepting continues on
    /// its own task for the life of the process.
    ///
    /// Port 0 requests an OS-assigned port; the actual address is available
    /// from [`Listener::local_addr`].
    pub async fn start<H: PacketHandler>(
        config: &ServerConfig,
        handler: H,
        hooks: LifecycleHooks,
    ) -> io::Result<Self> {
        let listener = TcpListener::bind((config.host.as_str(), config.port)).await?;
        let local_addr = listener.local_addr()?;

        let registry = Arc::new(ConnectionRegistry::new());
        let ctx = Arc::new(ConnectionContext {
            registry: registry.clone(),
            handler: Arc::new(handler),
            hooks,
            max_packet_size: config.max_packet_size,
        });

        info!(addr = %local_addr, "listening");

        let max_connections = config.max_connections;
        let accept_registry = registry.clone();
        tokio::spawn(async move {
            let mut next_id: u32 = 0;
            loop {
                let (stream, peer) = match listener.accept().await {
                    Ok(pair) => pair,
                    Err(e) => {
                        // Accept errors can be transient (EMFILE and friends);
                        // keep the loop alive.
                        warn!(error = %e, "accept failed");
                        continue;
                    }
                };

                if accept_registry.len() >= max_connections {
                    // At capacity: close the new socket without constructing
                    // a connection. Known gap: no rejection packet is sent
                    // before the close.
                    warn!(peer = %peer, max_connections, "connection refused: at capacity");
                    drop(stream);
                    continue;
                }

                let id = next_id;
                next_id = next_id.wrapping_add(1);
                let conn = Connection::spawn(stream, peer, id, ctx.clone());
                debug!(conn_id = conn.id(), peer = %peer, "connection accepted");
            }
        });

        Ok(Self {
            local_addr,
            registry,
        })
    }

    /// The bound address, useful when port 0 was requested.
    pub fn local_addr(&self) -> SocketAddr {
        self.local_addr
    }

    pub fn registry(&self) -> &Arc<ConnectionRegistry> {
        &self.registry
    }

    /// Stop every live connection. The accept task itself is not cancelled;
    /// it runs until process shutdown (a scope limit held over from the
    /// original design).
    pub async fn shutdown(&self) {
        self.registry.clear().await;
    }
}

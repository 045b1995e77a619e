//! The seam between transport and dispatch.
//!
//! [`PacketHandler`] is implemented by the dispatch layer; the transport
//! calls it once per decoded inbound frame. [`LifecycleHooks`] carries the
//! optional connection start/stop callables supplied by the embedding
//! application.

use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;

use bytes::Bytes;
use girder_protocol::Packet;

use crate::connection::Connection;

/// An inbound message paired with the connection it arrived on.
///
/// Created per frame, consumed once by a handler chain, not retained.
pub struct Request {
    conn: Arc<Connection>,
    packet: Packet,
}

impl Request {
    pub(crate) fn new(conn: Arc<Connection>, packet: Packet) -> Self {
        Self { conn, packet }
    }

    /// The connection this message arrived on.
    pub fn connection(&self) -> &Arc<Connection> {
        &self.conn
    }

    /// The message id from the frame header.
    pub fn message_id(&self) -> u32 {
        self.packet.id
    }

    /// The frame payload.
    pub fn payload(&self) -> &Bytes {
        &self.packet.payload
    }

    pub fn packet(&self) -> &Packet {
        &self.packet
    }
}

/// Trait implemented by the dispatch layer to consume decoded frames.
///
/// Called from the connection's receive loop; an implementation that queues
/// may suspend the call when its queue is full, backpressuring exactly the
/// connection that produced the frame.
pub trait PacketHandler: Send + Sync + 'static {
    fn on_packet(&self, request: Request) -> impl Future<Output = ()> + Send;
}

/// Object-safe wrapper so connections can hold `Arc<dyn PacketHandlerDyn>`
/// without being generic over the handler type.
pub(crate) trait PacketHandlerDyn: Send + Sync {
    fn on_packet_dyn<'a>(
        &'a self,
        request: Request,
    ) -> Pin<Box<dyn Future<Output = ()> + Send + 'a>>;
}

impl<T: PacketHandler> PacketHandlerDyn for T {
    fn on_packet_dyn<'a>(
        &'a self,
        request: Request,
    ) -> Pin<Box<dyn Future<Output = ()> + Send + 'a>> {
        Box::pin(self.on_packet(request))
    }
}

/// An optional async callable invoked at a connection lifecycle transition.
pub type ConnectionHook =
    Arc<dyn Fn(Arc<Connection>) -> Pin<Box<dyn Future<Output = ()> + Send>> + Send + Sync>;

/// The connection start/stop hook pair. Absent hooks are silent no-ops.
///
/// Hooks run on the connection's own task at the matching transition, so
/// they may read and write connection properties and call `send`, but they
/// must not block indefinitely.
#[derive(Clone, Default)]
pub struct LifecycleHooks {
    on_start: Option<ConnectionHook>,
    on_stop: Option<ConnectionHook>,
}

impl LifecycleHooks {
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the callable invoked right after a connection's loops start.
    pub fn with_on_start<F, Fut>(mut self, hook: F) -> Self
    where
        F: Fn(Arc<Connection>) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = ()> + Send + 'static,
    {
        self.on_start = Some(Arc::new(move |conn| Box::pin(hook(conn))));
        self
    }

    /// Set the callable invoked as a connection begins stopping, before any
    /// of its resources are released.
    pub fn with_on_stop<F, Fut>(mut self, hook: F) -> Self
    where
        F: Fn(Arc<Connection>) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = ()> + Send + 'static,
    {
        self.on_stop = Some(Arc::new(move |conn| Box::pin(hook(conn))));
        self
    }

    pub(crate) async fn fire_start(&self, conn: Arc<Connection>) {
        if let Some(hook) = &self.on_start {
            hook(conn).await;
        }
    }

    pub(crate) async fn fire_stop(&self, conn: Arc<Connection>) {
        if let Some(hook) = &self.on_stop {
            hook(conn).await;
        }
    }
}

//! One accepted socket: lifecycle state machine, reader/writer loop pair,
//! send path, and per-connection properties.
//!
//! Every connection runs two cooperating loops. The receive loop reads
//! frames (8-byte header, then exactly `length` payload bytes) and hands
//! each decoded request to the packet handler. The send loop waits on the
//! outbound queue and the cancellation token; the receive loop's
//! termination is what cancels the token, so the pair always winds down
//! together.

use std::collections::HashMap;
use std::io;
use std::net::SocketAddr;
use std::sync::atomic::{AtomicU8, Ordering};
use std::sync::{Arc, Weak};

use bytes::Bytes;
use parking_lot::RwLock;
use serde_json::Value;
use tokio::io::{AsyncRead, AsyncReadExt, AsyncWriteExt};
use tokio::net::TcpStream;
use tokio::net::tcp::{OwnedReadHalf, OwnedWriteHalf};
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;
use tracing::{debug, trace, warn};

use girder_protocol::{self as protocol, HEADER_LEN, Packet};

use crate::error::TransportError;
use crate::handler::{LifecycleHooks, PacketHandlerDyn, Request};
use crate::registry::ConnectionRegistry;

/// Depth of the per-connection outbound queue. A full queue suspends
/// `send` callers until the send loop drains it; frames are never dropped.
/// Callers must therefore not invoke `send` from the send loop itself.
pub const OUTBOUND_QUEUE_DEPTH: usize = 32;

/// Connection lifecycle states. `Closed` is terminal.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u8)]
pub enum ConnState {
    Created = 0,
    Running = 1,
    Stopping = 2,
    Closed = 3,
}

impl ConnState {
    fn from_u8(raw: u8) -> Self {
        match raw {
            0 => Self::Created,
            1 => Self::Running,
            2 => Self::Stopping,
            _ => Self::Closed,
        }
    }
}

/// Everything a connection needs from the server that accepted it.
pub(crate) struct ConnectionContext {
    pub(crate) registry: Arc<ConnectionRegistry>,
    pub(crate) handler: Arc<dyn PacketHandlerDyn>,
    pub(crate) hooks: LifecycleHooks,
    pub(crate) max_packet_size: u32,
}

/// A live client connection.
///
/// Shared as `Arc<Connection>` between the registry, the loop tasks, and
/// any requests in flight. The registry holds the authoritative handle.
pub struct Connection {
    id: u32,
    remote_addr: SocketAddr,
    #[cfg(unix)]
    raw_fd: std::os::fd::RawFd,
    state: AtomicU8,
    outbound: mpsc::Sender<Bytes>,
    cancel: CancellationToken,
    properties: RwLock<HashMap<String, Value>>,
    ctx: Arc<ConnectionContext>,
    self_ref: Weak<Connection>,
}

impl Connection {
    /// Wraps an accepted socket, registers the connection, and starts its
    /// loop pair. The returned handle is the same one held by the registry.
    pub(crate) fn spawn(
        stream: TcpStream,
        remote_addr: SocketAddr,
        id: u32,
        ctx: Arc<ConnectionContext>,
    ) -> Arc<Self> {
        #[cfg(unix)]
        let raw_fd = {
            use std::os::fd::AsRawFd;
            stream.as_raw_fd()
        };
        let (reader, writer) = stream.into_split();
        let (outbound_tx, outbound_rx) = mpsc::channel(OUTBOUND_QUEUE_DEPTH);

        let conn = Arc::new_cyclic(|weak| Self {
            id,
            remote_addr,
            #[cfg(unix)]
            raw_fd,
            state: AtomicU8::new(ConnState::Created as u8),
            outbound: outbound_tx,
            cancel: CancellationToken::new(),
            properties: RwLock::new(HashMap::new()),
            ctx,
            self_ref: weak.clone(),
        });

        conn.ctx.registry.add(conn.clone());
        conn.clone().start(reader, writer, outbound_rx);
        conn
    }

    /// Spawns the send loop and the receive task. The receive task fires
    /// the start hook before its first read, so hooks can seed properties
    /// ahead of any dispatched message.
    fn start(
        self: Arc<Self>,
        reader: OwnedReadHalf,
        writer: OwnedWriteHalf,
        outbound_rx: mpsc::Receiver<Bytes>,
    ) {
        debug!(conn_id = self.id, peer = %self.remote_addr, "connection starting");

        let sender = self.clone();
        tokio::spawn(async move { sender.send_loop(writer, outbound_rx).await });

        tokio::spawn(async move {
            if let Some(conn) = self.self_ref.upgrade() {
                self.ctx.hooks.fire_start(conn).await;
            }
            self.state
                .store(ConnState::Running as u8, Ordering::Release);
            self.clone().recv_loop(reader).await;
            self.stop().await;
        });
    }

    /// Receive loop: read one frame at a time and hand it off. Any read or
    /// decode error terminates the loop; the caller then runs the stop
    /// sequence.
    async fn recv_loop(self: Arc<Self>, mut reader: OwnedReadHalf) {
        let max = self.ctx.max_packet_size;
        loop {
            let packet = tokio::select! {
                res = read_packet(&mut reader, max) => match res {
                    Ok(packet) => packet,
                    Err(TransportError::Io(e)) if e.kind() == io::ErrorKind::UnexpectedEof => {
                        debug!(conn_id = self.id, "peer disconnected");
                        break;
                    }
                    Err(e) => {
                        warn!(conn_id = self.id, error = %e, "receive loop terminating");
                        break;
                    }
                },
                _ = self.cancel.cancelled() => break,
            };

            trace!(conn_id = self.id, msg_id = packet.id, len = packet.len(), "frame received");

            // In pooled mode this suspends while the target worker queue is
            // full, backpressuring exactly this connection.
            let request = Request::new(self.clone(), packet);
            self.ctx.handler.on_packet_dyn(request).await;
        }
    }

    /// Send loop: drain the outbound queue onto the socket until cancelled.
    /// Dropping the write half on exit closes our side of the socket.
    async fn send_loop(&self, mut writer: OwnedWriteHalf, mut outbound: mpsc::Receiver<Bytes>) {
        loop {
            tokio::select! {
                frame = outbound.recv() => match frame {
                    Some(frame) => {
                        if let Err(e) = writer.write_all(&frame).await {
                            warn!(conn_id = self.id, error = %e, "socket write failed");
                            // Unblock the receive loop so the stop sequence runs.
                            self.cancel.cancel();
                            break;
                        }
                    }
                    None => break,
                },
                _ = self.cancel.cancelled() => break,
            }
        }
        debug!(conn_id = self.id, "send loop exited");
    }

    /// Idempotent graceful shutdown: fires the stop hook while properties
    /// and registry entry are still intact, then cancels the loops and
    /// deregisters. A second call is a no-op.
    pub async fn stop(&self) {
        let transition = self.state.fetch_update(Ordering::AcqRel, Ordering::Acquire, |s| {
            (s < ConnState::Stopping as u8).then_some(ConnState::Stopping as u8)
        });
        if transition.is_err() {
            return;
        }

        debug!(conn_id = self.id, "connection stopping");
        if let Some(conn) = self.self_ref.upgrade() {
            self.ctx.hooks.fire_stop(conn).await;
        }

        self.cancel.cancel();
        self.ctx.registry.remove(self.id);
        self.state.store(ConnState::Closed as u8, Ordering::Release);
    }

    /// Encode a message and enqueue it for delivery.
    ///
    /// Suspends while the outbound queue is full. Fails with
    /// [`TransportError::ConnectionClosed`] once the connection is
    /// stopping or closed.
    pub async fn send(&self, msg_id: u32, payload: impl Into<Bytes>) -> Result<(), TransportError> {
        if !self.is_open() {
            return Err(TransportError::ConnectionClosed(self.id));
        }
        let frame = protocol::encode(&Packet::new(msg_id, payload));
        self.outbound
            .send(frame)
            .await
            .map_err(|_| TransportError::ConnectionClosed(self.id))
    }

    /// Process-unique connection id, assigned sequentially from 0.
    pub fn id(&self) -> u32 {
        self.id
    }

    pub fn remote_address(&self) -> SocketAddr {
        self.remote_addr
    }

    /// Raw socket descriptor, for collaborators that need socket-level
    /// introspection. Direct writes still go through [`Connection::send`].
    #[cfg(unix)]
    pub fn raw_fd(&self) -> std::os::fd::RawFd {
        self.raw_fd
    }

    pub fn state(&self) -> ConnState {
        ConnState::from_u8(self.state.load(Ordering::Acquire))
    }

    /// True until the stop sequence has begun.
    pub fn is_open(&self) -> bool {
        self.state.load(Ordering::Acquire) <= ConnState::Running as u8
    }

    /// Attach a free-form metadata value to this connection.
    pub fn set_property(&self, key: impl Into<String>, value: Value) {
        self.properties.write().insert(key.into(), value);
    }

    pub fn get_property(&self, key: &str) -> Option<Value> {
        self.properties.read().get(key).cloned()
    }

    pub fn remove_property(&self, key: &str) -> Option<Value> {
        self.properties.write().remove(key)
    }
}

impl std::fmt::Debug for Connection {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Connection")
            .field("id", &self.id)
            .field("remote_addr", &self.remote_addr)
            .field("state", &self.state())
            .finish_non_exhaustive()
    }
}

/// Read one frame: exactly [`HEADER_LEN`] header bytes, then exactly
/// `length` payload bytes. The oversize check runs between the two reads,
/// before any payload allocation.
pub(crate) async fn read_packet<R>(reader: &mut R, max_payload: u32) -> Result<Packet, TransportError>
where
    R: AsyncRead + Unpin,
{
    let mut header = [0u8; HEADER_LEN];
    reader.read_exact(&mut header).await?;
    let header = protocol::decode_header(header, max_payload)?;

    let mut payload = vec![0u8; header.length as usize];
    if header.length > 0 {
        reader.read_exact(&mut payload).await?;
    }
    Ok(Packet::new(header.id, payload))
}

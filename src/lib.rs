//! Girder: an embeddable TCP message framework.
//!
//! Girder accepts client connections, frames messages on a binary wire
//! protocol (`u32 length LE || u32 id LE || payload`), routes each message
//! to application-supplied handlers by message id, and manages worker
//! concurrency so handler code never blocks the network I/O loops.
//!
//! The crate is a facade over the member crates: `girder-protocol` (the
//! wire format), `girder-transport` (connections, registry, listener),
//! and `girder-engine` (routing and dispatch).
//!
//! ```no_run
//! use girder::{Request, Router, StageResult};
//!
//! struct Ping;
//!
//! impl Router for Ping {
//!     async fn handle(&self, request: &Request) -> StageResult {
//!         request.connection().send(1, &b"pong"[..]).await?;
//!         Ok(())
//!     }
//! }
//!
//! #[tokio::main]
//! async fn main() -> Result<(), girder::ServerError> {
//!     let mut server = girder::new_server("demo");
//!     server.add_router(0, Ping);
//!     server.serve().await
//! }
//! ```

pub mod server;

pub use girder_engine::{DispatchMode, Dispatcher, RouteTable, Router, StageResult};
pub use girder_protocol::{HEADER_LEN, Packet, PacketHeader, ProtocolError};
pub use girder_transport::{
    Client, ConnState, Connection, ConnectionRegistry, LifecycleHooks, Listener, PacketHandler,
    Request, ServerConfig, TransportError,
};
pub use server::{Server, ServerError, ServerState, new_server};

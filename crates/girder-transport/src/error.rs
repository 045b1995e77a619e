//! Transport error types.

use girder_protocol::ProtocolError;
use thiserror::Error;

/// Errors surfaced by connection I/O and the send path.
///
/// Protocol and I/O variants are fatal to the connection that raised them,
/// never to the server. `ConnectionClosed` is the one recoverable case: it
/// tells the caller its message was not delivered.
#[derive(Debug, Error)]
pub enum TransportError {
    /// Operation on a connection that is already stopping or closed.
    #[error("connection {0} is closed")]
    ConnectionClosed(u32),

    /// Malformed or oversized frame; the stream is desynchronized.
    #[error("protocol violation: {0}")]
    Protocol(#[from] ProtocolError),

    #[error(transparent)]
    Io(#[from] std::io::Error),
}

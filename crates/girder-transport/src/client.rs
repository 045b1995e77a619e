//! Minimal framed-protocol client.
//!
//! One socket, blocking request/response framing. Enough for test
//! harnesses and thin demo clients; not a reconnecting production client.

use std::io;

use bytes::Bytes;
use girder_protocol::{self as protocol, Packet};
use tokio::io::AsyncWriteExt;
use tokio::net::{TcpStream, ToSocketAddrs};

use crate::connection::read_packet;
use crate::error::TransportError;

pub struct Client {
    stream: TcpStream,
    max_packet_size: u32,
}

impl Client {
    /// Connect to a girder server. No inbound size limit by default.
    pub async fn connect(addr: impl ToSocketAddrs) -> io::Result<Self> {
        let stream = TcpStream::connect(addr).await?;
        Ok(Self {
            stream,
            max_packet_size: 0,
        })
    }

    /// Enforce a maximum payload length on received frames.
    pub fn with_max_packet_size(mut self, max: u32) -> Self {
        self.max_packet_size = max;
        self
    }

    /// Frame and send one message.
    pub async fn send(&mut self, msg_id: u32, payload: impl Into<Bytes>) -> Result<(), TransportError> {
        let frame = protocol::encode(&Packet::new(msg_id, payload));
        self.stream.write_all(&frame).await?;
        Ok(())
    }

    /// Read one framed message (header first, then the payload).
    pub async fn recv(&mut self) -> Result<Packet, TransportError> {
        read_packet(&mut self.stream, self.max_packet_size).await
    }
}

//! Packet framing: `u32 length (LE) || u32 id (LE) || payload`.

use bytes::{Buf, BufMut, Bytes, BytesMut};

use crate::error::ProtocolError;

/// Fixed wire header size: payload length (4 bytes) + message id (4 bytes).
pub const HEADER_LEN: usize = 8;

/// One length-delimited unit on the wire.
///
/// Constructed transiently per send/receive; never persisted.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Packet {
    /// Application-defined message id; selects the router on the receiving side.
    pub id: u32,
    /// Message body. The wire `length` field is always `payload.len()`.
    pub payload: Bytes,
}

impl Packet {
    pub fn new(id: u32, payload: impl Into<Bytes>) -> Self {
        Self {
            id,
            payload: payload.into(),
        }
    }

    /// Payload length in bytes.
    pub fn len(&self) -> usize {
        self.payload.len()
    }

    pub fn is_empty(&self) -> bool {
        self.payload.is_empty()
    }
}

/// A decoded fixed header, before the payload has been read.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PacketHeader {
    pub length: u32,
    pub id: u32,
}

/// Encode a packet into one contiguous wire frame.
pub fn encode(packet: &Packet) -> Bytes {
    let mut buf = BytesMut::with_capacity(HEADER_LEN + packet.payload.len());
    buf.put_u32_le(packet.payload.len() as u32);
    buf.put_u32_le(packet.id);
    buf.put_slice(&packet.payload);
    buf.freeze()
}

/// Decode the 8-byte header only.
///
/// `max_payload == 0` disables the size check; otherwise a declared length
/// above `max_payload` is rejected here, before any payload allocation.
pub fn decode_header(header: [u8; HEADER_LEN], max_payload: u32) -> Result<PacketHeader, ProtocolError> {
    let mut buf = &header[..];
    let length = buf.get_u32_le();
    let id = buf.get_u32_le();

    if max_payload > 0 && length > max_payload {
        return Err(ProtocolError::Oversized {
            length,
            max: max_payload,
        });
    }

    Ok(PacketHeader { length, id })
}

/// Decode a complete frame from a contiguous buffer.
///
/// Streaming receivers should use [`decode_header`] and read the payload
/// separately; this is the convenience path for buffers already in hand.
pub fn decode(frame: &[u8], max_payload: u32) -> Result<Packet, ProtocolError> {
    if frame.len() < HEADER_LEN {
        return Err(ProtocolError::Truncated {
            needed: HEADER_LEN,
            available: frame.len(),
        });
    }

    let mut head = [0u8; HEADER_LEN];
    head.copy_from_slice(&frame[..HEADER_LEN]);
    let header = decode_header(head, max_payload)?;

    let body = &frame[HEADER_LEN..];
    if body.len() != header.length as usize {
        return Err(ProtocolError::LengthMismatch {
            declared: header.length,
            actual: body.len(),
        });
    }

    Ok(Packet::new(header.id, Bytes::copy_from_slice(body)))
}

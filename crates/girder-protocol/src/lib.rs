//! Girder wire protocol.
//!
//! Every message on the wire is one frame: a fixed 8-byte little-endian
//! header (payload length, then message id) followed by exactly that many
//! payload bytes. This crate is the single source of truth for the frame
//! layout; it knows nothing about sockets, connections, or routing.
//!
//! Decoding is two-phase by design: callers read and decode the header
//! first, then read exactly `length` body bytes. This keeps receive-side
//! memory bounded and lets a receiver reject an oversized frame before
//! allocating for it.

pub mod error;
pub mod packet;

pub use error::ProtocolError;
pub use packet::{HEADER_LEN, Packet, PacketHeader, decode, decode_header, encode};

//! Protocol-level decode errors.

use thiserror::Error;

/// Errors produced while decoding a frame.
///
/// `Oversized` is unrecoverable for the stream that produced it: the
/// receiver has no way to resynchronize past a frame it refuses to read,
/// so the connection must be abandoned.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum ProtocolError {
    /// The header declared a payload larger than the configured maximum.
    #[error("payload length {length} exceeds maximum packet size {max}")]
    Oversized { length: u32, max: u32 },

    /// The buffer is too short to contain what was asked of it.
    #[error("truncated frame: needed {needed} bytes, have {available}")]
    Truncated { needed: usize, available: usize },

    /// A whole-buffer decode where the declared payload length does not
    /// match the bytes actually present.
    #[error("frame length mismatch: header declares {declared} payload bytes, buffer holds {actual}")]
    LengthMismatch { declared: u32, actual: usize },
}

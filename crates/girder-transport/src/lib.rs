//! Girder transport layer.
//!
//! Owns everything socket-shaped:
//! - Connection lifecycle (accept, loop pair, graceful stop)
//! - The connection registry and the accept-time connection ceiling
//! - The framed read/write paths over the wire protocol
//!
//! The transport is decoupled from routing via the [`PacketHandler`] trait:
//! every decoded inbound frame is wrapped in a [`Request`] and handed to the
//! handler, which decides whether to run it inline or queue it.

pub mod client;
pub mod config;
pub mod connection;
pub mod error;
pub mod handler;
pub mod listener;
pub mod registry;

pub use client::Client;
pub use config::ServerConfig;
pub use connection::{ConnState, Connection, OUTBOUND_QUEUE_DEPTH};
pub use error::TransportError;
pub use handler::{ConnectionHook, LifecycleHooks, PacketHandler, Request};
pub use listener::Listener;
pub use registry::ConnectionRegistry;

//! Server configuration.
//!
//! One immutable value constructed before `start()` and read-only for the
//! server's lifetime. Loading it from a file or the environment is the
//! embedding application's job; the `serde` derives are there so it can.

use serde::{Deserialize, Serialize};

/// Settings the engine reads as immutable for the server's lifetime.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    /// Server name, used in the startup banner.
    pub name: String,
    /// Interface to bind.
    pub host: String,
    /// TCP port to listen on (0 for OS-assigned).
    pub port: u16,
    /// Ceiling on concurrently registered connections; sockets accepted
    /// beyond it are closed immediately.
    pub max_connections: usize,
    /// Largest accepted payload length in bytes. 0 disables the limit.
    pub max_packet_size: u32,
    /// Number of dispatch workers. 0 selects inline dispatch: one task per
    /// inbound message, with no per-connection ordering guarantee.
    pub worker_pool_size: usize,
    /// Depth of each worker's task queue. A full queue suspends the
    /// offending connection's receive loop rather than dropping requests.
    pub max_worker_queue_len: usize,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            name: "girder".into(),
            host: "0.0.0.0".into(),
            port: 8999,
            max_connections: 1000,
            max_packet_size: 4096,
            worker_pool_size: 10,
            max_worker_queue_len: 1024,
        }
    }
}

impl ServerConfig {
    /// Default configuration under a given server name.
    pub fn named(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            ..Self::default()
        }
    }
}

//! The authoritative table of live connections.
//!
//! A connection appears here from the moment it is constructed until its
//! stop sequence completes. The table is guarded by a single read/write
//! lock, held only for the duration of each map operation.

use std::collections::HashMap;
use std::sync::Arc;

use parking_lot::RwLock;
use tracing::debug;

use crate::connection::Connection;

#[derive(Default)]
pub struct ConnectionRegistry {
    connections: RwLock<HashMap<u32, Arc<Connection>>>,
}

impl ConnectionRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert a connection under its id.
    pub fn add(&self, conn: Arc<Connection>) {
        let mut table = self.connections.write();
        table.insert(conn.id(), conn);
        debug!(total = table.len(), "connection registered");
    }

    /// Remove a connection by id; a no-op if it is not present.
    pub fn remove(&self, id: u32) {
        let mut table = self.connections.write();
        if table.remove(&id).is_some() {
            debug!(conn_id = id, total = table.len(), "connection deregistered");
        }
    }

    pub fn get(&self, id: u32) -> Option<Arc<Connection>> {
        self.connections.read().get(&id).cloned()
    }

    pub fn len(&self) -> usize {
        self.connections.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.connections.read().is_empty()
    }

    /// Stop every registered connection and empty the table.
    ///
    /// The table is drained under the write lock and the lock released
    /// before any `stop` runs, so a connection's own deregistration cannot
    /// deadlock against us; by then its removal is a tolerated no-op.
    pub async fn clear(&self) {
        let drained: Vec<Arc<Connection>> = {
            let mut table = self.connections.write();
            table.drain().map(|(_, conn)| conn).collect()
        };
        debug!(count = drained.len(), "stopping all connections");
        for conn in drained {
            conn.stop().await;
        }
    }
}

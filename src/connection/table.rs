//! Identity to live-connection table.

use parking_lot::RwLock;
use std::collections::HashMap;
use std::sync::Arc;
use tracing::debug;

use super::Connection;

fn same_connection(a: &Arc<dyn Connection>, b: &Arc<dyn Connection>) -> bool {
    // Compare data pointers only; vtable pointers are not guaranteed unique.
    std::ptr::eq(
        Arc::as_ptr(a) as *const (),
        Arc::as_ptr(b) as *const (),
    )
}

/// Table of live connections keyed by identity.
///
/// Holds at most one connection per identity. The table never closes a
/// stream on its own; that stays with the session that owns it.
#[derive(Default)]
pub struct ConnectionTable {
    connections: RwLock<HashMap<String, Arc<dyn Connection>>>,
}

impl ConnectionTable {
    pub fn new() -> Self {
        Self::default()
    }

    /// Install `connection` under `id`, returning whatever it displaced.
    pub fn bind(&self, id: &str, connection: Arc<dyn Connection>) -> Option<Arc<dyn Connection>> {
        let previous = self.connections.write().insert(id.to_string(), connection);
        if previous.is_some() {
            debug!(service_id = %id, "Replaced existing connection");
        }
        previous
    }

    /// Remove the connection for `id`, if any.
    pub fn unbind(&self, id: &str) -> Option<Arc<dyn Connection>> {
        self.connections.write().remove(id)
    }

    /// Remove the entry for `id` only while it still refers to `connection`.
    ///
    /// Returns `true` when an entry was removed.
    pub fn unbind_if_current(&self, id: &str, connection: &Arc<dyn Connection>) -> bool {
        let mut connections = self.connections.write();
        match connections.get(id) {
            Some(current) if same_connection(current, connection) => {
                connections.remove(id);
                true
            }
            _ => false,
        }
    }

    pub fn lookup(&self, id: &str) -> Option<Arc<dyn Connection>> {
        self.connections.read().get(id).cloned()
    }

    pub fn list_identities(&self) -> Vec<String> {
        self.connections.read().keys().cloned().collect()
    }

    pub fn len(&self) -> usize {
        self.connections.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.connections.read().is_empty()
    }
}

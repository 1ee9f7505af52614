//! In-memory service registry.
//!
//! Records live for the process lifetime and are lost on restart.

use chrono::Utc;
use parking_lot::RwLock;
use std::collections::HashMap;
use std::sync::Arc;
use tracing::{debug, info};

use super::{IdGenerator, Service, ServiceRegistry, ServiceRole, UuidGenerator};
use crate::error::{Error, Result};

/// Attempts at drawing an unused identity before giving up.
const MAX_ID_ATTEMPTS: usize = 8;

struct Entry {
    seq: u64,
    service: Service,
}

#[derive(Default)]
struct Inner {
    services: HashMap<String, Entry>,
    next_seq: u64,
}

impl Inner {
    fn collect<F>(&self, mut keep: F) -> Vec<Service>
    where
        F: FnMut(&Service) -> bool,
    {
        let mut matched: Vec<&Entry> = self
            .services
            .values()
            .filter(|entry| keep(&entry.service))
            .collect();
        matched.sort_by_key(|entry| entry.seq);
        matched.into_iter().map(|entry| entry.service.clone()).collect()
    }
}

/// Service registry held entirely in memory behind a single reader/writer lock.
pub struct MemoryServiceRegistry {
    inner: RwLock<Inner>,
    ids: Arc<dyn IdGenerator>,
}

impl MemoryServiceRegistry {
    /// Creates an empty registry issuing UUID identities.
    pub fn new() -> Self {
        Self::with_id_generator(Arc::new(UuidGenerator))
    }

    /// Creates an empty registry drawing identities from `ids`.
    pub fn with_id_generator(ids: Arc<dyn IdGenerator>) -> Self {
        Self {
            inner: RwLock::new(Inner::default()),
            ids,
        }
    }

    /// Number of registered services.
    pub fn len(&self) -> usize {
        self.inner.read().services.len()
    }

    pub fn is_empty(&self) -> bool {
        self.inner.read().services.is_empty()
    }
}

impl Default for MemoryServiceRegistry {
    fn default() -> Self {
        Self::new()
    }
}

impl ServiceRegistry for MemoryServiceRegistry {
    fn register(&self, name: &str, role: ServiceRole) -> Result<Service> {
        let now = Utc::now();
        let mut inner = self.inner.write();

        let mut id = None;
        for _ in 0..MAX_ID_ATTEMPTS {
            let candidate = self.ids.next_id();
            if !inner.services.contains_key(&candidate) {
                id = Some(candidate);
                break;
            }
        }
        let id = id.ok_or_else(|| {
            Error::Storage("identity source keeps returning identities in use".to_string())
        })?;

        let service = Service {
            id: id.clone(),
            name: name.to_string(),
            role,
            registered_at: now,
            last_active_at: now,
        };
        let seq = inner.next_seq;
        inner.next_seq += 1;
        inner.services.insert(
            id,
            Entry {
                seq,
                service: service.clone(),
            },
        );
        drop(inner);

        info!(service_id = %service.id, name = %service.name, role = %service.role, "Service registered");
        Ok(service)
    }

    fn unregister(&self, id: &str) -> Result<()> {
        if self.inner.write().services.remove(id).is_some() {
            info!(service_id = %id, "Service unregistered");
        } else {
            debug!(service_id = %id, "Service not found for unregistration");
        }
        Ok(())
    }

    fn get_by_id(&self, id: &str) -> Result<Service> {
        self.inner
            .read()
            .services
            .get(id)
            .map(|entry| entry.service.clone())
            .ok_or_else(|| Error::NotFound(id.to_string()))
    }

    fn get_by_name(&self, name: &str) -> Result<Vec<Service>> {
        Ok(self.inner.read().collect(|service| service.name == name))
    }

    fn get_by_role(&self, role: ServiceRole) -> Result<Vec<Service>> {
        Ok(self.inner.read().collect(|service| service.role == role))
    }

    fn touch(&self, id: &str) -> Result<()> {
        let mut inner = self.inner.write();
        let entry = inner
            .services
            .get_mut(id)
            .ok_or_else(|| Error::NotFound(id.to_string()))?;
        let now = Utc::now();
        if now > entry.service.last_active_at {
            entry.service.last_active_at = now;
        }
        Ok(())
    }

    fn list_all(&self) -> Result<Vec<Service>> {
        Ok(self.inner.read().collect(|_| true))
    }
}

//! Service registry: name, role and identity bookkeeping for endpoints.
//!
//! Endpoints register through a stateless RPC before they ever open a stream,
//! so identities exist independently of any physical connection. The registry
//! is the only owner of [`Service`] records; callers always receive copies.

pub mod id;
pub mod memory;

pub use id::{IdGenerator, SequenceGenerator, UuidGenerator};
pub use memory::MemoryServiceRegistry;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use crate::error::{Error, Result};
use crate::proto::ServiceType;

/// Role an endpoint declares at registration. Informational only; forwarding
/// never filters on it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ServiceRole {
    Producer,
    Consumer,
    Unknown,
}

impl fmt::Display for ServiceRole {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ServiceRole::Producer => write!(f, "producer"),
            ServiceRole::Consumer => write!(f, "consumer"),
            ServiceRole::Unknown => write!(f, "unknown"),
        }
    }
}

impl FromStr for ServiceRole {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.to_ascii_lowercase().as_str() {
            "producer" => Ok(ServiceRole::Producer),
            "consumer" => Ok(ServiceRole::Consumer),
            "unknown" => Ok(ServiceRole::Unknown),
            other => Err(Error::InvalidArgument(format!("unknown service role: {}", other))),
        }
    }
}

impl From<ServiceType> for ServiceRole {
    fn from(ty: ServiceType) -> Self {
        match ty {
            ServiceType::Producer => ServiceRole::Producer,
            ServiceType::Consumer => ServiceRole::Consumer,
            ServiceType::Unknown => ServiceRole::Unknown,
        }
    }
}

impl From<ServiceRole> for ServiceType {
    fn from(role: ServiceRole) -> Self {
        match role {
            ServiceRole::Producer => ServiceType::Producer,
            ServiceRole::Consumer => ServiceType::Consumer,
            ServiceRole::Unknown => ServiceType::Unknown,
        }
    }
}

/// A registered endpoint.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Service {
    /// Unique identity, assigned at registration and never changed
    pub id: String,
    /// Declared name; several services may share one
    pub name: String,
    /// Declared role
    pub role: ServiceRole,
    /// Registration time
    pub registered_at: DateTime<Utc>,
    /// Last observed activity
    pub last_active_at: DateTime<Utc>,
}

impl Service {
    pub fn is_producer(&self) -> bool {
        self.role == ServiceRole::Producer
    }

    pub fn is_consumer(&self) -> bool {
        self.role == ServiceRole::Consumer
    }
}

/// Registry of services keyed by identity.
///
/// Implementations must be safe to share between any number of sessions and
/// must never expose a partially written record.
pub trait ServiceRegistry: Send + Sync {
    /// Allocate a fresh identity and store a new record for it.
    fn register(&self, name: &str, role: ServiceRole) -> Result<Service>;

    /// Remove a record. Unknown identities are ignored.
    fn unregister(&self, id: &str) -> Result<()>;

    /// Fetch a record by identity.
    fn get_by_id(&self, id: &str) -> Result<Service>;

    /// All services registered under `name`, in registration order.
    fn get_by_name(&self, name: &str) -> Result<Vec<Service>>;

    /// All services with the given role, in registration order.
    fn get_by_role(&self, role: ServiceRole) -> Result<Vec<Service>>;

    /// Advance `last_active_at` to now.
    fn touch(&self, id: &str) -> Result<()>;

    /// Every registered service, in registration order.
    fn list_all(&self) -> Result<Vec<Service>>;
}

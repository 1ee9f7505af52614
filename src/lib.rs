//! Rendezvous gateway.
//!
//! Endpoints register a service name and role to obtain an identity, then open
//! a bidirectional stream presenting that identity. Frames sent on the stream
//! are forwarded by target name to whichever registered service currently
//! holds a live stream.

pub mod cli;
pub mod config;
pub mod connection;
pub mod error;
pub mod forward;
pub mod proto;
pub mod registry;
pub mod service;
pub mod session;

// Re-export commonly used types
pub use connection::{Connection, ConnectionTable};
pub use error::{Error, Result};
pub use forward::{ForwardEngine, ForwardMessage};
pub use registry::{MemoryServiceRegistry, Service, ServiceRegistry, ServiceRole};
pub use service::GatewayServer;
pub use session::{CloseReason, SessionState, StreamSession, SERVICE_ID_METADATA};

//! Forwarding engine: name-addressed delivery between registered services.

use bytes::Bytes;
use std::collections::HashMap;
use std::sync::Arc;
use tracing::{debug, trace};

use crate::connection::ConnectionTable;
use crate::error::{Error, Result};
use crate::proto;
use crate::registry::ServiceRegistry;

/// Status text carried by every successful delivery.
pub const DELIVERED_MESSAGE: &str = "forwarded";

/// A payload addressed to a service name.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ForwardMessage {
    /// Name of the target service
    pub target: String,
    /// Opaque payload, delivered unchanged
    pub payload: Bytes,
    /// Caller metadata, delivered unchanged
    pub metadata: HashMap<String, String>,
    /// Sender identity. Set by the engine; anything a caller puts here is overwritten.
    pub from_identity: String,
}

impl ForwardMessage {
    pub fn new(target: impl Into<String>, payload: impl Into<Bytes>) -> Self {
        Self {
            target: target.into(),
            payload: payload.into(),
            ..Default::default()
        }
    }

    /// Frame handed to the target's connection.
    pub fn into_delivery(self) -> proto::ForwardResponse {
        proto::ForwardResponse {
            success: true,
            message: DELIVERED_MESSAGE.to_string(),
            payload: self.payload,
            from_service_id: self.from_identity,
            metadata: self.metadata,
        }
    }
}

impl From<proto::ForwardMessage> for ForwardMessage {
    fn from(frame: proto::ForwardMessage) -> Self {
        Self {
            target: frame.target_service,
            payload: frame.payload,
            metadata: frame.metadata,
            from_identity: String::new(),
        }
    }
}

/// Resolves target names through the registry and delivers to live connections.
pub struct ForwardEngine {
    registry: Arc<dyn ServiceRegistry>,
    connections: Arc<ConnectionTable>,
}

impl ForwardEngine {
    pub fn new(registry: Arc<dyn ServiceRegistry>, connections: Arc<ConnectionTable>) -> Self {
        Self {
            registry,
            connections,
        }
    }

    /// Deliver `message` from `from` to a service registered under `message.target`.
    ///
    /// When several services share the target name the first one in
    /// registration order is chosen. There is deliberately no load balancing,
    /// randomization or role filtering here. The sender gets no response from
    /// this call; reporting the outcome is up to the caller.
    pub fn forward(&self, from: &str, mut message: ForwardMessage) -> Result<()> {
        let target = self
            .registry
            .get_by_name(&message.target)?
            .into_iter()
            .next()
            .ok_or_else(|| Error::TargetNotFound(message.target.clone()))?;

        let connection = self.connections.lookup(&target.id).ok_or_else(|| {
            Error::DeliveryFailed(format!("connection not found for service: {}", target.id))
        })?;

        message.from_identity = from.to_string();
        let size = message.payload.len();
        connection
            .send(message.into_delivery())
            .map_err(|err| match err {
                Error::DeliveryFailed(_) => err,
                other => Error::DeliveryFailed(other.to_string()),
            })?;

        trace!(from = %from, to = %target.id, bytes = size, "Delivered message");

        if let Err(err) = self.registry.touch(from) {
            debug!(service_id = %from, error = %err, "Sender vanished before touch");
        }
        Ok(())
    }
}

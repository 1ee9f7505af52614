//! Per-stream session state machine.
//!
//! Every bidirectional stream is driven by exactly one [`StreamSession`]:
//!
//! ```text
//!   Unbound --handshake ok--> Active --end/error/idle--> Closed
//!      |                        |
//!      +--no identity---------->+--superseded----------> Closed
//! ```
//!
//! The first inbound frame is a handshake: the identity comes from the
//! `service-id` request metadata captured when the stream opened, and the
//! frame body is ignored. Once active, every frame is forwarded by name and
//! only failures are reported back on this stream.

use futures::{Stream, StreamExt};
use std::sync::Arc;
use std::time::Duration;
use tonic::Status;
use tracing::{debug, info, warn};

use crate::connection::stream::ResponseSender;
use crate::connection::{Connection, ConnectionTable, StreamConnection};
use crate::error::{Error, Result};
use crate::forward::{ForwardEngine, ForwardMessage};
use crate::proto;
use crate::registry::ServiceRegistry;

/// Request metadata key carrying the identity returned by `Register`.
pub const SERVICE_ID_METADATA: &str = "service-id";

/// Why a session ended.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CloseReason {
    /// The client half-closed the stream
    EndOfStream,
    /// Reading from the stream failed
    TransportError(String),
    /// The handshake carried no usable identity
    Unauthenticated(String),
    /// No inbound frame within the idle timeout
    IdleTimeout,
    /// Another stream bound the same identity
    Superseded,
    /// Our own outbound queue was dropped by the transport
    OutboundClosed,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SessionState {
    Unbound,
    Active { service_id: String },
    Closed(CloseReason),
}

/// Something that happened on, or to, the stream.
#[derive(Debug)]
pub enum SessionEvent {
    Frame(proto::ForwardMessage),
    EndOfStream,
    ReadError(Status),
    IdleTimeout,
    Superseded,
}

/// Collaborators shared by every session of a gateway.
#[derive(Clone)]
pub struct SessionContext {
    pub registry: Arc<dyn ServiceRegistry>,
    pub connections: Arc<ConnectionTable>,
    pub engine: Arc<ForwardEngine>,
    pub idle_timeout: Option<Duration>,
}

impl SessionContext {
    pub fn new(
        registry: Arc<dyn ServiceRegistry>,
        connections: Arc<ConnectionTable>,
        idle_timeout: Option<Duration>,
    ) -> Self {
        let engine = Arc::new(ForwardEngine::new(registry.clone(), connections.clone()));
        Self {
            registry,
            connections,
            engine,
            idle_timeout,
        }
    }
}

/// Sole reader and writer of one physical stream.
pub struct StreamSession {
    ctx: SessionContext,
    state: SessionState,
    token: Option<String>,
    outbound: ResponseSender,
    connection: Option<Arc<StreamConnection>>,
}

impl StreamSession {
    /// `token` is the identity presented in the stream's request metadata, if any.
    pub fn new(ctx: SessionContext, token: Option<String>, outbound: ResponseSender) -> Self {
        Self {
            ctx,
            state: SessionState::Unbound,
            token,
            outbound,
            connection: None,
        }
    }

    pub fn state(&self) -> &SessionState {
        &self.state
    }

    /// Drive the session until it closes, returning why it closed.
    pub async fn run<S>(mut self, inbound: S) -> CloseReason
    where
        S: Stream<Item = std::result::Result<proto::ForwardMessage, Status>> + Send,
    {
        let mut inbound = Box::pin(inbound);
        loop {
            if let SessionState::Closed(reason) = &self.state {
                return reason.clone();
            }
            let event = self.next_event(&mut inbound).await;
            self.step(event).await;
        }
    }

    async fn next_event<S>(&self, inbound: &mut S) -> SessionEvent
    where
        S: Stream<Item = std::result::Result<proto::ForwardMessage, Status>> + Unpin,
    {
        let superseded = async {
            match &self.connection {
                Some(connection) => connection.closed().await,
                None => std::future::pending().await,
            }
        };
        let read = async {
            let next = match self.ctx.idle_timeout {
                Some(limit) => match tokio::time::timeout(limit, inbound.next()).await {
                    Ok(next) => next,
                    Err(_) => return SessionEvent::IdleTimeout,
                },
                None => inbound.next().await,
            };
            match next {
                Some(Ok(frame)) => SessionEvent::Frame(frame),
                Some(Err(status)) => SessionEvent::ReadError(status),
                None => SessionEvent::EndOfStream,
            }
        };

        tokio::select! {
            biased;
            _ = superseded => SessionEvent::Superseded,
            event = read => event,
        }
    }

    /// Apply one event to the state machine.
    pub async fn step(&mut self, event: SessionEvent) {
        let state = std::mem::replace(&mut self.state, SessionState::Unbound);
        self.state = match (state, event) {
            (SessionState::Unbound, SessionEvent::Frame(_)) => self.handshake().await,
            (SessionState::Unbound, event) => {
                // No identity is bound yet, so there is nothing of ours to clean up.
                debug!(?event, "Stream ended before handshake");
                let reason = Self::reason_for(event);
                if reason == CloseReason::IdleTimeout {
                    self.send_idle_timeout().await;
                }
                SessionState::Closed(reason)
            }
            (SessionState::Active { service_id }, SessionEvent::Frame(frame)) => {
                self.forward(service_id, frame).await
            }
            (SessionState::Active { service_id }, SessionEvent::Superseded) => {
                info!(service_id = %service_id, "Connection superseded by a newer stream");
                let _ = self
                    .outbound
                    .send(Err(Status::aborted("connection superseded")))
                    .await;
                SessionState::Closed(CloseReason::Superseded)
            }
            (SessionState::Active { service_id }, event) => {
                let reason = Self::reason_for(event);
                if reason == CloseReason::IdleTimeout {
                    self.send_idle_timeout().await;
                }
                self.teardown(&service_id, &reason);
                SessionState::Closed(reason)
            }
            (closed @ SessionState::Closed(_), _) => closed,
        };
    }

    async fn send_idle_timeout(&self) {
        let _ = self
            .outbound
            .send(Err(Status::deadline_exceeded("session idle timeout")))
            .await;
    }

    fn touch(&self, service_id: &str) {
        if let Err(err) = self.ctx.registry.touch(service_id) {
            debug!(service_id = %service_id, error = %err, "Touch failed for bound service");
        }
    }

    fn reason_for(event: SessionEvent) -> CloseReason {
        match event {
            SessionEvent::EndOfStream | SessionEvent::Frame(_) => CloseReason::EndOfStream,
            SessionEvent::ReadError(status) => CloseReason::TransportError(status.to_string()),
            SessionEvent::IdleTimeout => CloseReason::IdleTimeout,
            SessionEvent::Superseded => CloseReason::Superseded,
        }
    }

    async fn handshake(&mut self) -> SessionState {
        match self.authenticate() {
            Ok(service_id) => {
                let connection = Arc::new(StreamConnection::new(
                    service_id.clone(),
                    self.outbound.clone(),
                ));
                if let Some(displaced) = self.ctx.connections.bind(&service_id, connection.clone()) {
                    warn!(service_id = %service_id, "Identity rebound, closing previous stream");
                    displaced.close();
                }
                self.connection = Some(connection);
                self.touch(&service_id);
                info!(service_id = %service_id, "Stream bound");
                SessionState::Active { service_id }
            }
            Err(err) => {
                warn!(error = %err, "Rejected stream handshake");
                let message = match &err {
                    Error::Unauthenticated(msg) => msg.clone(),
                    other => other.to_string(),
                };
                let _ = self.outbound.send(Err(err.into())).await;
                SessionState::Closed(CloseReason::Unauthenticated(message))
            }
        }
    }

    fn authenticate(&self) -> Result<String> {
        let service_id = match self.token.as_deref() {
            Some(id) if !id.is_empty() => id,
            _ => return Err(Error::Unauthenticated("service not registered".to_string())),
        };
        match self.ctx.registry.get_by_id(service_id) {
            Ok(_) => Ok(service_id.to_string()),
            Err(Error::NotFound(_)) => Err(Error::Unauthenticated(format!(
                "unknown service id: {}",
                service_id
            ))),
            Err(err) => Err(err),
        }
    }

    async fn forward(&mut self, service_id: String, frame: proto::ForwardMessage) -> SessionState {
        self.touch(&service_id);

        let message = ForwardMessage::from(frame);
        let target = message.target.clone();
        let Err(err) = self.ctx.engine.forward(&service_id, message) else {
            return SessionState::Active { service_id };
        };

        debug!(service_id = %service_id, target = %target, error = %err, "Forward failed");
        let notice = proto::ForwardResponse {
            success: false,
            message: err.to_string(),
            ..Default::default()
        };
        if self.outbound.send(Ok(notice)).await.is_err() {
            let reason = CloseReason::OutboundClosed;
            self.teardown(&service_id, &reason);
            return SessionState::Closed(reason);
        }
        SessionState::Active { service_id }
    }

    fn teardown(&mut self, service_id: &str, reason: &CloseReason) {
        let Some(connection) = self.connection.take() else {
            return;
        };
        connection.close();

        let connection: Arc<dyn Connection> = connection;
        let removed = self.ctx.connections.unbind_if_current(service_id, &connection);
        if removed || self.ctx.connections.lookup(service_id).is_none() {
            let _ = self.ctx.registry.unregister(service_id);
            info!(service_id = %service_id, ?reason, "Stream closed, service removed");
        } else {
            debug!(service_id = %service_id, ?reason, "Stream closed after rebind, leaving new owner in place");
        }
    }
}

//! Connection backed by a gRPC response stream.

use std::sync::atomic::{AtomicBool, Ordering};
use tokio::sync::{mpsc, Notify};
use tokio::sync::mpsc::error::TrySendError;
use tonic::Status;

use super::Connection;
use crate::error::{Error, Result};
use crate::proto::ForwardResponse;

/// Sending half of a stream's outbound queue.
pub type ResponseSender = mpsc::Sender<std::result::Result<ForwardResponse, Status>>;

/// The gRPC variant of [`Connection`].
///
/// Deliveries go through a bounded queue drained by tonic, so `send` never
/// waits on a slow peer: a full queue is reported as a delivery failure.
pub struct StreamConnection {
    id: String,
    tx: ResponseSender,
    closed: AtomicBool,
    close_signal: Notify,
}

impl StreamConnection {
    pub fn new(id: impl Into<String>, tx: ResponseSender) -> Self {
        Self {
            id: id.into(),
            tx,
            closed: AtomicBool::new(false),
            close_signal: Notify::new(),
        }
    }

    /// Resolves once `close` has been called.
    pub async fn closed(&self) {
        if self.closed.load(Ordering::Acquire) {
            return;
        }
        self.close_signal.notified().await;
    }
}

impl Connection for StreamConnection {
    fn identity(&self) -> &str {
        &self.id
    }

    fn send(&self, response: ForwardResponse) -> Result<()> {
        if self.closed.load(Ordering::Acquire) {
            return Err(Error::DeliveryFailed(format!("connection closed: {}", self.id)));
        }
        self.tx.try_send(Ok(response)).map_err(|err| match err {
            TrySendError::Full(_) => {
                Error::DeliveryFailed(format!("outbound queue full: {}", self.id))
            }
            TrySendError::Closed(_) => {
                Error::DeliveryFailed(format!("connection closed: {}", self.id))
            }
        })
    }

    fn close(&self) {
        if !self.closed.swap(true, Ordering::AcqRel) {
            self.close_signal.notify_one();
        }
    }

    fn is_closed(&self) -> bool {
        self.closed.load(Ordering::Acquire) || self.tx.is_closed()
    }
}

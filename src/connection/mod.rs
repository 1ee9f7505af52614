//! Live connections and the table mapping identities onto them.
//!
//! A [`Connection`] is the send side of one session's stream. Sessions own
//! their connection; the [`ConnectionTable`] only holds shared references so
//! the forwarding engine can reach a target without knowing the transport.

pub mod stream;
pub mod table;

pub use stream::StreamConnection;
pub use table::ConnectionTable;

use crate::error::Result;
use crate::proto::ForwardResponse;

/// Send capability bound to exactly one registered identity.
pub trait Connection: Send + Sync {
    /// Identity this connection was bound under.
    fn identity(&self) -> &str;

    /// Queue a response frame for the remote end. Must not block.
    fn send(&self, response: ForwardResponse) -> Result<()>;

    /// Ask the owning session to stop. Idempotent.
    fn close(&self);

    /// Whether `close` has been called or the remote end has gone away.
    fn is_closed(&self) -> bool;
}

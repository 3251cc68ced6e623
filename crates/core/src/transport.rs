//! Transport seam between the session and the wire.
//!
//! The session never touches sockets or framing. It drives a
//! [`Transport`] for outbound traffic and drains the paired event
//! channel for everything inbound. Real implementations own the TCP
//! connection, the length-prefixed framing, and payload encryption;
//! the in-memory fake stands in for all of that under test.

use futures_util::future::BoxFuture;
use mrp_protocol::{Envelope, Message};
use tokio::sync::mpsc;

use crate::error::Result;

pub mod fake;

/// Outbound half of a connection.
pub trait Transport: Send + Sync {
    /// Establishes the underlying connection.
    fn open(&self) -> BoxFuture<'_, Result<()>>;

    /// Tears the connection down. Safe to call at any time.
    fn close(&self);

    /// Writes one envelope. When the envelope asks for a response,
    /// resolves with the correlated reply; otherwise resolves with
    /// `None` as soon as the write completes.
    fn send(&self, envelope: Envelope) -> BoxFuture<'_, Result<Option<Message>>>;

    /// Whether the connection is currently established.
    fn is_open(&self) -> bool;
}

/// Inbound traffic and lifecycle notifications from the transport.
#[derive(Debug, Clone)]
pub enum TransportEvent {
    Connected,
    Closed,
    Message(Message),
    Error(String),
    Debug(String),
}

/// A transport plus the receiving end of its event channel. The
/// session takes the receiver into its read loop; the transport half
/// is shared.
pub struct TransportParts {
    pub transport: std::sync::Arc<dyn Transport>,
    pub event_rx: mpsc::UnboundedReceiver<TransportEvent>,
}

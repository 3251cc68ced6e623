//! Error types for session orchestration.

use mrp_protocol::{MessageKind, SchemaError};

pub type Result<T> = std::result::Result<T, Error>;

#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// Transport open/send/close failure, surfaced to the caller of
    /// the failing operation.
    #[error("transport error: {0}")]
    Transport(String),

    /// A correlator wait expired before a matching message arrived.
    #[error("timed out waiting for message type {kind}")]
    WaitTimeout { kind: MessageKind },

    /// Unknown message or definition name, surfaced synchronously to
    /// the send caller.
    #[error(transparent)]
    Schema(#[from] SchemaError),

    /// A connect step failed before the session reached Ready.
    #[error("handshake failed: {0}")]
    Handshake(String),

    #[error("pairing failed: {0}")]
    Pairing(String),

    #[error("verification failed: {0}")]
    Verification(String),

    /// Multi-homed discovery record with no IPv4 and no routable
    /// IPv6 candidate.
    #[error("no usable address among discovery candidates")]
    NoUsableAddress,

    #[error("unknown key name: {0}")]
    UnknownKey(String),

    #[error("connection is not open")]
    NotConnected,

    /// An internal channel closed while an operation was pending.
    #[error("internal channel closed")]
    ChannelClosed,
}

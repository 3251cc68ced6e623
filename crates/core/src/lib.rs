//! Session orchestration for the media remote protocol.
//!
//! This crate turns the appliance's asynchronous, event-driven
//! transport into a well-ordered request/response and
//! publish/subscribe API: the connect handshake, correlation of
//! awaited message types, listener-driven background polling, and
//! the low-level input-command encoder.
//!
//! The transport itself (framing, encryption, socket I/O), the
//! pairing protocol, and the per-session verification handshake are
//! external collaborators behind the traits in [`transport`] and
//! [`auth`].

pub mod address;
pub mod auth;
pub mod client;
pub mod correlator;
pub mod device;
pub mod error;
pub mod events;
pub mod hid;
pub mod poller;
pub mod transport;

/// Default timeout in seconds for awaiting a message of a given type.
pub const DEFAULT_WAIT_TIMEOUT_SECS: u64 = 5;

pub use auth::{DerivedKeys, PairingExchange, SessionAuth, Verifier};
pub use client::{MediaRemote, SessionState};
pub use device::{Device, DiscoveredService};
pub use error::{Error, Result};
pub use events::EventStream;
pub use hid::Key;
pub use mrp_protocol::{
    Credentials, Envelope, Message, MessageKind, NowPlayingInfo, PlaybackQueueRequest,
    SupportedCommand,
};
pub use transport::{Transport, TransportEvent, TransportParts};

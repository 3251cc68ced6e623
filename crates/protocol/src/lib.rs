//! Wire types for the media remote protocol.
//!
//! This crate contains the serde-serializable types exchanged with a
//! media appliance over its remote-control channel. These types
//! represent the "protocol layer" - the shapes of data as they appear
//! in message bodies, before the transport's own framing and
//! encryption are applied.
//!
//! # Design Philosophy
//!
//! Types in this crate are:
//! * Pure data: No behavior beyond serialization and body validation
//! * 1:1 with protocol: Match the appliance's message schema names
//! * Stable: Changes only when the wire protocol changes
//!
//! The session orchestration built on top of these types lives in
//! `mrp-rs`.

pub mod message;
pub mod registry;
pub mod types;

pub use message::{Credentials, Envelope, Message, MessageKind};
pub use registry::{MessageBuilder, SchemaError, resolve};
pub use types::{
    ArtworkSize, ClientUpdatesConfig, ConnectionState, DeviceInfoBody, NowPlayingInfo,
    PlaybackQueueRequest, SupportedCommand,
};

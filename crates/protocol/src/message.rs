//! Typed application messages and the outbound envelope.
//!
//! A [`Message`] pairs a [`MessageKind`] with an optional JSON payload.
//! The byte-level schema of payloads is a transport concern; at this
//! layer a payload is a structured value whose shape is validated by
//! the registry when the message is built locally, and passed through
//! verbatim when it arrives from the appliance.

use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Closed set of message types this client knows by name.
///
/// Inbound traffic can carry types negotiated by newer appliances;
/// those decode as [`MessageKind::Unknown`] instead of failing the
/// whole stream.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum MessageKind {
    DeviceInfo,
    SetState,
    SendHidEvent,
    ClientUpdatesConfig,
    SetConnectionState,
    PlaybackQueueRequest,
    WakeDevice,
    CryptoPairing,
    Unknown(String),
}

impl MessageKind {
    /// Wire name of the message type, as the appliance spells it.
    pub fn as_str(&self) -> &str {
        match self {
            MessageKind::DeviceInfo => "DeviceInfoMessage",
            MessageKind::SetState => "SetStateMessage",
            MessageKind::SendHidEvent => "SendHIDEventMessage",
            MessageKind::ClientUpdatesConfig => "ClientUpdatesConfigMessage",
            MessageKind::SetConnectionState => "SetConnectionStateMessage",
            MessageKind::PlaybackQueueRequest => "PlaybackQueueRequestMessage",
            MessageKind::WakeDevice => "WakeDeviceMessage",
            MessageKind::CryptoPairing => "CryptoPairingMessage",
            MessageKind::Unknown(name) => name,
        }
    }

    /// Parses a wire name; unrecognized names become `Unknown`.
    pub fn from_wire(name: &str) -> Self {
        match name {
            "DeviceInfoMessage" => MessageKind::DeviceInfo,
            "SetStateMessage" => MessageKind::SetState,
            "SendHIDEventMessage" => MessageKind::SendHidEvent,
            "ClientUpdatesConfigMessage" => MessageKind::ClientUpdatesConfig,
            "SetConnectionStateMessage" => MessageKind::SetConnectionState,
            "PlaybackQueueRequestMessage" => MessageKind::PlaybackQueueRequest,
            "WakeDeviceMessage" => MessageKind::WakeDevice,
            "CryptoPairingMessage" => MessageKind::CryptoPairing,
            other => MessageKind::Unknown(other.to_string()),
        }
    }
}

impl From<String> for MessageKind {
    fn from(name: String) -> Self {
        MessageKind::from_wire(&name)
    }
}

impl From<MessageKind> for String {
    fn from(kind: MessageKind) -> Self {
        kind.as_str().to_string()
    }
}

impl std::fmt::Display for MessageKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A decoded application message.
///
/// Inbound state snapshots may carry no payload at all; `None` is
/// meaningful (it clears now-playing state downstream).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Message {
    #[serde(rename = "type")]
    pub kind: MessageKind,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub payload: Option<Value>,
}

impl Message {
    pub fn new(kind: MessageKind, payload: Value) -> Self {
        Self {
            kind,
            payload: Some(payload),
        }
    }

    /// A message with no payload.
    pub fn empty(kind: MessageKind) -> Self {
        Self {
            kind,
            payload: None,
        }
    }
}

/// Credential bundle produced by pairing and enriched by session
/// verification.
///
/// The key material is opaque here; the transport uses it to encrypt
/// and decrypt frames once verification has derived the per-session
/// keys.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Credentials {
    /// Session identifier negotiated at pairing time and reused on
    /// reconnect.
    pub session_id: String,
    /// Per-session read key, present after verification.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub read_key: Option<Vec<u8>>,
    /// Per-session write key, present after verification.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub write_key: Option<Vec<u8>>,
}

impl Credentials {
    pub fn new(session_id: impl Into<String>) -> Self {
        Self {
            session_id: session_id.into(),
            read_key: None,
            write_key: None,
        }
    }
}

/// Outbound unit consumed by the transport.
#[derive(Debug, Clone, PartialEq)]
pub struct Envelope {
    pub message: Message,
    /// When set, the transport resolves the send with the matching
    /// response by request/response affinity on the connection.
    pub wait_for_response: bool,
    /// Scheduling hint for the transport's write queue.
    pub priority: i32,
    /// Current session credentials, absent on unauthenticated
    /// sessions.
    pub credentials: Option<Credentials>,
}

impl Envelope {
    /// Fire-and-forget envelope at default priority.
    pub fn post(message: Message, credentials: Option<Credentials>) -> Self {
        Self {
            message,
            wait_for_response: false,
            priority: 0,
            credentials,
        }
    }

    /// Envelope whose send resolves with the matching response.
    pub fn request(message: Message, credentials: Option<Credentials>) -> Self {
        Self {
            message,
            wait_for_response: true,
            priority: 0,
            credentials,
        }
    }

    pub fn with_priority(mut self, priority: i32) -> Self {
        self.priority = priority;
        self
    }
}

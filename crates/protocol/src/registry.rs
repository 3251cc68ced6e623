//! Schema registry for locally constructed messages.
//!
//! The appliance's schema is organized as one definition file per
//! message type; callers name both the definition and the message
//! type when sending. [`resolve`] maps that pair onto a
//! [`MessageBuilder`] which validates a structured body into a
//! [`Message`], or fails with [`SchemaError`] when either name is
//! unknown.

use serde_json::Value;
use thiserror::Error;

use crate::message::{Message, MessageKind};

/// Definition-file names and the message type each one declares.
const DEFINITIONS: &[(&str, MessageKind)] = &[
    ("DeviceInfoMessage", MessageKind::DeviceInfo),
    ("SetStateMessage", MessageKind::SetState),
    ("SendHIDEventMessage", MessageKind::SendHidEvent),
    ("ClientUpdatesConfigMessage", MessageKind::ClientUpdatesConfig),
    ("SetConnectionStateMessage", MessageKind::SetConnectionState),
    (
        "PlaybackQueueRequestMessage",
        MessageKind::PlaybackQueueRequest,
    ),
    ("WakeDeviceMessage", MessageKind::WakeDevice),
    ("CryptoPairingMessage", MessageKind::CryptoPairing),
];

/// Failure to resolve or apply a message schema.
#[derive(Debug, Error)]
pub enum SchemaError {
    #[error("unknown message definition: {0}")]
    UnknownDefinition(String),
    #[error("definition {definition} does not declare message type {message_type}")]
    UnknownMessageType {
        definition: String,
        message_type: String,
    },
    #[error("invalid message body: {0}")]
    InvalidBody(String),
}

/// Validating constructor for one message type.
#[derive(Debug, Clone)]
pub struct MessageBuilder {
    kind: MessageKind,
}

impl MessageBuilder {
    /// The message type this builder produces.
    pub fn kind(&self) -> &MessageKind {
        &self.kind
    }

    /// Builds a typed message from a plain structured body.
    ///
    /// Bodies must be JSON objects; the appliance rejects bare
    /// scalars and arrays at the top level.
    pub fn build(&self, body: Value) -> Result<Message, SchemaError> {
        match body {
            Value::Object(_) => Ok(Message::new(self.kind.clone(), body)),
            Value::Null => Ok(Message::empty(self.kind.clone())),
            other => Err(SchemaError::InvalidBody(format!(
                "expected object body for {}, got {}",
                self.kind,
                type_name(&other)
            ))),
        }
    }
}

/// Resolves a definition name and message-type name to a builder.
pub fn resolve(definition: &str, message_type: &str) -> Result<MessageBuilder, SchemaError> {
    let (_, kind) = DEFINITIONS
        .iter()
        .find(|(name, _)| *name == definition)
        .ok_or_else(|| SchemaError::UnknownDefinition(definition.to_string()))?;

    if kind.as_str() != message_type {
        return Err(SchemaError::UnknownMessageType {
            definition: definition.to_string(),
            message_type: message_type.to_string(),
        });
    }

    Ok(MessageBuilder { kind: kind.clone() })
}

fn type_name(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "bool",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn resolves_every_known_definition() {
        for (definition, kind) in DEFINITIONS {
            let builder = resolve(definition, kind.as_str()).unwrap();
            assert_eq!(builder.kind(), kind);
        }
    }

    #[test]
    fn unknown_definition_fails() {
        let err = resolve("NotARealMessage", "NotARealMessage").unwrap_err();
        assert!(matches!(err, SchemaError::UnknownDefinition(_)));
    }

    #[test]
    fn mismatched_type_name_fails() {
        let err = resolve("DeviceInfoMessage", "SetStateMessage").unwrap_err();
        assert!(matches!(err, SchemaError::UnknownMessageType { .. }));
    }

    #[test]
    fn builds_object_bodies() {
        let builder = resolve("DeviceInfoMessage", "DeviceInfoMessage").unwrap();
        let message = builder.build(json!({"name": "client"})).unwrap();
        assert_eq!(message.kind, MessageKind::DeviceInfo);
        assert_eq!(message.payload.unwrap()["name"], "client");
    }

    #[test]
    fn rejects_scalar_bodies() {
        let builder = resolve("WakeDeviceMessage", "WakeDeviceMessage").unwrap();
        let err = builder.build(json!(42)).unwrap_err();
        assert!(matches!(err, SchemaError::InvalidBody(_)));
    }

    #[test]
    fn null_body_builds_empty_message() {
        let builder = resolve("WakeDeviceMessage", "WakeDeviceMessage").unwrap();
        let message = builder.build(Value::Null).unwrap();
        assert!(message.payload.is_none());
    }
}

//! Signaling message envelope
//!
//! One JSON object per WebSocket frame:
//!
//! ```json
//! {"type": "offer", "from": "alice", "to": "bob", "payload": {"sdp": "..."}}
//! ```
//!
//! `from`, `to` and `payload` may be absent. An empty `to` means broadcast.

use std::str::FromStr;

use serde::{Deserialize, Deserializer, Serialize};
use serde_json::Value;

/// Sender id used on messages the relay generates itself
pub const SERVER_SENDER: &str = "server";

/// Message type of relay-generated error replies
pub const ERROR_TYPE: &str = "error";

/// A signaling message routed between participants
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SignalMessage {
    /// Application-defined type ("offer", "answer", "candidate", ...)
    #[serde(rename = "type", default, deserialize_with = "null_as_empty")]
    pub kind: String,

    /// Sender id; filled in by the router when empty
    #[serde(default, deserialize_with = "null_as_empty")]
    pub from: String,

    /// Target id; empty for broadcast
    #[serde(
        default,
        deserialize_with = "null_as_empty",
        skip_serializing_if = "String::is_empty"
    )]
    pub to: String,

    /// Opaque payload, passed through untouched. An explicit `null` is kept
    /// as `Some(Value::Null)`; only an absent payload is `None`.
    #[serde(
        default,
        deserialize_with = "present",
        skip_serializing_if = "Option::is_none"
    )]
    pub payload: Option<Value>,
}

impl SignalMessage {
    /// Create a broadcast message of the given type
    pub fn new(kind: impl Into<String>) -> Self {
        Self {
            kind: kind.into(),
            from: String::new(),
            to: String::new(),
            payload: None,
        }
    }

    /// Address the message to a single participant
    pub fn to(mut self, target: impl Into<String>) -> Self {
        self.to = target.into();
        self
    }

    /// Set the sender id
    pub fn from(mut self, sender: impl Into<String>) -> Self {
        self.from = sender.into();
        self
    }

    /// Attach a payload
    pub fn with_payload(mut self, payload: Value) -> Self {
        self.payload = Some(payload);
        self
    }

    /// Reply sent back to `sender` when `target` is not connected
    pub fn target_not_found(sender: &str, target: &str) -> Self {
        Self::new(ERROR_TYPE)
            .from(SERVER_SENDER)
            .to(sender)
            .with_payload(Value::String(format!("target {} not found", target)))
    }

    /// Whether the message names a single recipient
    pub fn is_direct(&self) -> bool {
        !self.to.is_empty()
    }

    /// Serialize to a JSON text frame
    pub fn encode(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string(self)
    }
}

impl FromStr for SignalMessage {
    type Err = serde_json::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        serde_json::from_str(s)
    }
}

fn null_as_empty<'de, D>(deserializer: D) -> Result<String, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(Option::<String>::deserialize(deserializer)?.unwrap_or_default())
}

fn present<'de, D>(deserializer: D) -> Result<Option<Value>, D::Error>
where
    D: Deserializer<'de>,
{
    Value::deserialize(deserializer).map(Some)
}

use crate::SessionId;
use chrono::{DateTime, Utc};

/// Coarse classification of an inbound WhatsApp message, used by the
/// inbound pipeline's protocol-noise filter.
#[derive(Debug, Clone, Copy, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
pub enum MessageKind {
    Text,
    Image,
    Audio,
    Video,
    Document,
    /// Library/protocol plumbing that is never forwarded to a tenant webhook
    /// (`protocolMessage`, `reactionMessage`, `ephemeralMessage`, ...).
    Protocol,
    Unknown,
}

impl MessageKind {
    /// True for the protocol-noise message kinds, which are always dropped
    /// regardless of any other filter.
    pub const fn is_protocol_noise(self) -> bool {
        matches!(self, Self::Protocol)
    }
}

/// Normalized inbound message content, extracted from the raw WhatsApp
/// payload.
#[derive(Debug, Clone, serde::Serialize, serde::Deserialize)]
pub struct MessageContent {
    pub kind: MessageKind,
    pub text: Option<String>,
    pub media_path: Option<String>,
}

/// A durable inbound job as persisted by the `InboundQueue`.
#[derive(Debug, Clone, serde::Serialize, serde::Deserialize)]
pub struct InboundJob {
    pub session_id: SessionId,
    pub raw_message: serde_json::Value,
    pub received_at: DateTime<Utc>,
    pub attempts: u32,
}

impl InboundJob {
    pub fn new(session_id: SessionId, raw_message: serde_json::Value) -> Self {
        Self {
            session_id,
            raw_message,
            received_at: crate::now(),
            attempts: 0,
        }
    }
}

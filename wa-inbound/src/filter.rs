//! Protocol-noise and staleness filtering.

use chrono::{DateTime, Utc};
use std::time::Duration;

const PROTOCOL_NOISE: &[&str] = &[
    "protocolMessage",
    "senderKeyDistributionMessage",
    "reactionMessage",
    "ephemeralMessage",
    "viewOnceMessage",
    "pollUpdateMessage",
];

/// True if `raw` is protocol plumbing that should never reach a tenant
/// webhook, regardless of any other filter.
pub fn is_protocol_noise(raw: &serde_json::Value) -> bool {
    let Some(message) = raw.get("message").and_then(|m| m.as_object()) else {
        return true;
    };
    if message.is_empty() {
        return true;
    }
    PROTOCOL_NOISE.iter().any(|kind| message.contains_key(*kind))
}

pub fn is_from_me(raw: &serde_json::Value) -> bool {
    raw.pointer("/key/fromMe").and_then(|v| v.as_bool()).unwrap_or(false)
}

/// True if `message_timestamp` is older than `staleness`, treated as
/// history-sync noise rather than a live message.
pub fn is_stale(raw: &serde_json::Value, now: DateTime<Utc>, staleness: Duration) -> bool {
    let Some(ts) = raw.get("messageTimestamp").and_then(|v| v.as_i64()) else {
        return false;
    };
    let Some(sent_at) = DateTime::<Utc>::from_timestamp(ts, 0) else {
        return false;
    };
    now.signed_duration_since(sent_at)
        > chrono::Duration::from_std(staleness).unwrap_or(chrono::Duration::zero())
}

/// True if the sender JID is a format the gateway understands.
pub fn is_valid_sender_jid(jid: &str) -> bool {
    jid.ends_with("@s.whatsapp.net") || jid.ends_with("@lid")
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn detects_protocol_noise() {
        let raw = json!({"message": {"protocolMessage": {}}});
        assert!(is_protocol_noise(&raw));

        let raw = json!({"message": {"conversation": "hi"}});
        assert!(!is_protocol_noise(&raw));
    }

    #[test]
    fn empty_message_is_noise() {
        assert!(is_protocol_noise(&json!({"message": {}})));
        assert!(is_protocol_noise(&json!({})));
    }

    #[test]
    fn stale_messages_are_flagged() {
        let now = Utc::now();
        let old_ts = (now - chrono::Duration::minutes(10)).timestamp();
        let raw = json!({"messageTimestamp": old_ts});
        assert!(is_stale(&raw, now, Duration::from_secs(5 * 60)));

        let fresh_ts = (now - chrono::Duration::minutes(1)).timestamp();
        let raw = json!({"messageTimestamp": fresh_ts});
        assert!(!is_stale(&raw, now, Duration::from_secs(5 * 60)));
    }

    #[test]
    fn validates_sender_jid_suffix() {
        assert!(is_valid_sender_jid("5511999@s.whatsapp.net"));
        assert!(is_valid_sender_jid("1234@lid"));
        assert!(!is_valid_sender_jid("1234@g.us"));
    }
}

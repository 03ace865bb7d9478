//! Sender identity resolution: WhatsApp delivers a sender as either
//! a phone-bound JID or a local identifier (`@lid`) that must be mapped back
//! to a phone number.

use crate::error::{InboundError, Result};
use dashmap::DashMap;
use std::path::PathBuf;

fn strip_suffix(jid: &str) -> &str {
    jid.split('@').next().unwrap_or(jid)
}

fn digits_only(value: &str) -> String {
    value.chars().filter(char::is_ascii_digit).collect()
}

fn reverse_map_path(auth_root: &str, session_id: &str, lid: &str) -> PathBuf {
    PathBuf::from(auth_root)
        .join(session_id)
        .join("lids")
        .join(format!("lid-mapping-{lid}_reverse.json"))
}

async fn persist_reverse_map(auth_root: &str, session_id: &str, lid: &str, phone: &str) -> Result<()> {
    let path = reverse_map_path(auth_root, session_id, lid);
    if let Some(parent) = path.parent() {
        tokio::fs::create_dir_all(parent).await.map_err(InboundError::media)?;
    }
    let payload = serde_json::to_string(phone).map_err(InboundError::media)?;
    tokio::fs::write(path, payload).await.map_err(InboundError::media)
}

async fn read_reverse_map(auth_root: &str, session_id: &str, lid: &str) -> Option<String> {
    let path = reverse_map_path(auth_root, session_id, lid);
    let raw = tokio::fs::read_to_string(path).await.ok()?;
    serde_json::from_str::<String>(&raw).ok().or_else(|| Some(digits_only(&raw)))
}

/// Resolves the sender's phone number from a raw inbound message, following
/// a fixed precedence order. `lid_table` is an in-memory LID → phone
/// cache shared across one session's jobs; the reverse-map file under
/// `<authRoot>/<sessionId>/lids/` backs it when the process restarts.
pub async fn resolve_sender(
    raw: &serde_json::Value,
    lid_table: &DashMap<String, String>,
    auth_root: &str,
    session_id: &str,
) -> String {
    let remote_jid = raw.pointer("/key/remoteJid").and_then(|v| v.as_str()).unwrap_or_default();
    let remote_jid_alt = raw.pointer("/key/remoteJidAlt").and_then(|v| v.as_str());
    let participant_alt = raw.pointer("/key/participantAlt").and_then(|v| v.as_str());
    let participant = raw.pointer("/key/participant").and_then(|v| v.as_str());

    if remote_jid.ends_with("@s.whatsapp.net") {
        let phone = strip_suffix(remote_jid).to_owned();
        if let Some(alt) = remote_jid_alt {
            if alt.ends_with("@lid") {
                let lid = strip_suffix(alt).to_owned();
                lid_table.insert(lid.clone(), phone.clone());
                let _ = persist_reverse_map(auth_root, session_id, &lid, &phone).await;
            }
        }
        return phone;
    }

    for candidate in [remote_jid_alt, participant_alt, participant].into_iter().flatten() {
        if candidate.ends_with("@s.whatsapp.net") {
            return strip_suffix(candidate).to_owned();
        }
    }

    for candidate in [Some(remote_jid), remote_jid_alt, participant_alt, participant]
        .into_iter()
        .flatten()
    {
        if candidate.ends_with("@lid") {
            let lid = strip_suffix(candidate).to_owned();
            if let Some(phone) = lid_table.get(&lid).map(|e| e.value().clone()) {
                return phone;
            }
            if let Some(phone) = read_reverse_map(auth_root, session_id, &lid).await {
                lid_table.insert(lid, phone.clone());
                return phone;
            }
        }
    }

    tracing::warn!(session_id, remote_jid, "sender identity unresolved, falling back to stripped digits");
    digits_only(remote_jid)
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[tokio::test]
    async fn resolves_direct_phone_jid() {
        let table = DashMap::new();
        let raw = json!({"key": {"remoteJid": "5511999887766@s.whatsapp.net"}});
        let phone = resolve_sender(&raw, &table, "/tmp/wa-auth-test", "s1").await;
        assert_eq!(phone, "5511999887766");
    }

    #[tokio::test]
    async fn resolves_lid_from_in_memory_table() {
        let table = DashMap::new();
        table.insert("998877".to_owned(), "5511888776655".to_owned());
        let raw = json!({"key": {"remoteJid": "998877@lid"}});
        let phone = resolve_sender(&raw, &table, "/tmp/wa-auth-test", "s1").await;
        assert_eq!(phone, "5511888776655");
    }

    #[tokio::test]
    async fn falls_back_to_digits_when_unresolvable() {
        let table = DashMap::new();
        let raw = json!({"key": {"remoteJid": "unknown-thing@lid"}});
        let phone = resolve_sender(&raw, &table, "/tmp/wa-auth-test", "s1").await;
        assert_eq!(phone, "");
    }
}

//! Content extraction from a raw inbound payload.

use wa_model::{MessageContent, MessageKind};

/// A typed media reference pulled out of an audio/image/video/document
/// message, pointing at base64-encoded bytes carried inline in the raw
/// payload (the shape the protocol library hands the pipeline).
pub struct MediaRef<'a> {
    pub kind: MessageKind,
    pub mime_type: &'a str,
    pub base64: &'a str,
}

/// Extracts normalized content from `raw`, preferring `conversation`, then
/// `extendedTextMessage.text`, then typed media.
pub fn extract_content(raw: &serde_json::Value) -> Option<MessageContent> {
    let message = raw.get("message")?;

    if let Some(text) = message.get("conversation").and_then(|v| v.as_str()) {
        return Some(MessageContent {
            kind: MessageKind::Text,
            text: Some(text.to_owned()),
            media_path: None,
        });
    }

    if let Some(text) = message.pointer("/extendedTextMessage/text").and_then(|v| v.as_str()) {
        return Some(MessageContent {
            kind: MessageKind::Text,
            text: Some(text.to_owned()),
            media_path: None,
        });
    }

    for (field, kind) in [
        ("audioMessage", MessageKind::Audio),
        ("imageMessage", MessageKind::Image),
        ("videoMessage", MessageKind::Video),
        ("documentMessage", MessageKind::Document),
    ] {
        if message.get(field).is_some() {
            return Some(MessageContent {
                kind,
                text: message.pointer(&format!("/{field}/caption")).and_then(|v| v.as_str()).map(str::to_owned),
                media_path: None,
            });
        }
    }

    Some(MessageContent {
        kind: MessageKind::Unknown,
        text: None,
        media_path: None,
    })
}

/// Extracts the inline base64 media payload for an audio message, if any.
pub fn extract_audio_ref(raw: &serde_json::Value) -> Option<MediaRef<'_>> {
    let audio = raw.pointer("/message/audioMessage")?;
    let base64 = audio.get("base64Data").and_then(|v| v.as_str())?;
    let mime_type = audio.get("mimetype").and_then(|v| v.as_str()).unwrap_or("audio/ogg");
    Some(MediaRef {
        kind: MessageKind::Audio,
        mime_type,
        base64,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn prefers_conversation_over_extended_text() {
        let raw = json!({"message": {"conversation": "hello", "extendedTextMessage": {"text": "ignored"}}});
        let content = extract_content(&raw).unwrap();
        assert_eq!(content.text.as_deref(), Some("hello"));
    }

    #[test]
    fn falls_back_to_extended_text() {
        let raw = json!({"message": {"extendedTextMessage": {"text": "hi there"}}});
        let content = extract_content(&raw).unwrap();
        assert_eq!(content.text.as_deref(), Some("hi there"));
    }

    #[test]
    fn recognizes_audio_message() {
        let raw = json!({"message": {"audioMessage": {"mimetype": "audio/ogg"}}});
        let content = extract_content(&raw).unwrap();
        assert_eq!(content.kind, wa_model::MessageKind::Audio);
    }

    #[test]
    fn extracts_inline_audio_payload() {
        let raw = json!({"message": {"audioMessage": {"mimetype": "audio/ogg", "base64Data": "Zm9v"}}});
        let media = extract_audio_ref(&raw).unwrap();
        assert_eq!(media.base64, "Zm9v");
        assert_eq!(media.mime_type, "audio/ogg");
    }
}

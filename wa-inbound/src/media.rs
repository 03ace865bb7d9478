//! Audio download and the janitor that cleans it up.

use crate::content::MediaRef;
use crate::error::{InboundError, Result};
use base64::Engine;
use std::path::PathBuf;
use std::time::Duration;

fn extension_for(mime_type: &str) -> &'static str {
    match mime_type {
        m if m.contains("ogg") => "ogg",
        m if m.contains("mpeg") || m.contains("mp3") => "mp3",
        m if m.contains("wav") => "wav",
        m if m.contains("amr") => "amr",
        _ => "bin",
    }
}

/// Decodes and writes `media` to `<audio_dir>/<phone>_<msg_id>.<ext>`,
/// returning the path written.
pub async fn download_audio(audio_dir: &str, phone: &str, msg_id: &str, media: &MediaRef<'_>) -> Result<PathBuf> {
    tokio::fs::create_dir_all(audio_dir).await.map_err(InboundError::media)?;

    let bytes = base64::engine::general_purpose::STANDARD
        .decode(media.base64)
        .map_err(InboundError::media)?;

    let path = PathBuf::from(audio_dir).join(format!("{phone}_{msg_id}.{}", extension_for(media.mime_type)));
    tokio::fs::write(&path, bytes).await.map_err(InboundError::media)?;
    Ok(path)
}

/// Deletes files under `audio_dir` older than `max_age`. Run every 15
/// minutes by the audio janitor.
pub async fn clean_old_audios(audio_dir: &str, max_age: Duration) -> Result<u64> {
    let mut deleted = 0u64;
    let mut entries = match tokio::fs::read_dir(audio_dir).await {
        Ok(entries) => entries,
        Err(err) if err.kind() == std::io::ErrorKind::NotFound => return Ok(0),
        Err(err) => return Err(InboundError::media(err)),
    };

    while let Some(entry) = entries.next_entry().await.map_err(InboundError::media)? {
        let metadata = match entry.metadata().await {
            Ok(metadata) => metadata,
            Err(_) => continue,
        };
        if !metadata.is_file() {
            continue;
        }
        let age = metadata.modified().ok().and_then(|m| m.elapsed().ok());
        if age.map(|age| age > max_age).unwrap_or(false) {
            if tokio::fs::remove_file(entry.path()).await.is_ok() {
                deleted += 1;
            }
        }
    }

    Ok(deleted)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::content::MediaRef;
    use wa_model::MessageKind;

    #[tokio::test]
    async fn writes_decoded_audio_with_matching_extension() {
        let dir = tempdir();
        let media = MediaRef {
            kind: MessageKind::Audio,
            mime_type: "audio/ogg",
            base64: "aGVsbG8=",
        };
        let path = download_audio(dir.to_str().unwrap(), "5511999", "WAM1", &media).await.unwrap();
        assert!(path.to_string_lossy().ends_with("5511999_WAM1.ogg"));
        let contents = tokio::fs::read(&path).await.unwrap();
        assert_eq!(contents, b"hello");
        let _ = tokio::fs::remove_dir_all(dir).await;
    }

    #[tokio::test]
    async fn missing_audio_dir_is_not_an_error_for_the_janitor() {
        let deleted = clean_old_audios("/tmp/wa-inbound-test-does-not-exist", Duration::from_secs(1)).await.unwrap();
        assert_eq!(deleted, 0);
    }

    fn tempdir() -> PathBuf {
        let path = std::env::temp_dir().join(format!("wa-inbound-media-test-{}", uuid::Uuid::new_v4()));
        path
    }
}

//! `MessageSender`: dispatches outbound messages to a session's
//! socket with per-attempt timeout and incremental backoff.

use crate::error::{GatewayError, Result};
use crate::socket::{OutboundEnvelope, SocketHandle};
use std::time::Duration;
use wa_model::SessionId;

const SUPPORTED_TYPES: &[&str] = &["text", "image", "audio", "video", "document"];

#[derive(Debug, Clone)]
pub struct SendRequest {
    pub session_id: SessionId,
    pub wa_id: String,
    pub kind: String,
    pub body: Option<String>,
    pub media_url: Option<String>,
    pub caption: Option<String>,
    pub filename: Option<String>,
}

#[derive(Debug, Clone, Copy)]
pub struct SendPolicy {
    pub per_attempt_timeout: Duration,
    pub default_retries: u32,
}

impl Default for SendPolicy {
    fn default() -> Self {
        Self {
            per_attempt_timeout: Duration::from_secs(15),
            default_retries: 3,
        }
    }
}

pub struct MessageSender {
    policy: SendPolicy,
}

impl MessageSender {
    pub fn new(policy: SendPolicy) -> Self {
        Self { policy }
    }

    /// Sends `req` through `socket`, racing each attempt against
    /// `per_attempt_timeout` and retrying with `2s * attempt` backoff up to
    /// `default_retries`.
    pub async fn send(&self, socket: &dyn SocketHandle, req: SendRequest) -> Result<()> {
        if !SUPPORTED_TYPES.contains(&req.kind.as_str()) {
            return Err(GatewayError::unsupported_type(req.kind));
        }

        if !socket.has_user() {
            return Err(GatewayError::session_not_connected(req.session_id));
        }

        let envelope = OutboundEnvelope {
            wa_id: req.wa_id,
            kind: req.kind,
            body: req.body,
            media_url: req.media_url,
            caption: req.caption,
            filename: req.filename,
        };

        let mut attempt: u32 = 0;
        loop {
            attempt += 1;
            let outcome = tokio::time::timeout(self.policy.per_attempt_timeout, socket.send_message(envelope.clone())).await;

            match outcome {
                Ok(Ok(())) => return Ok(()),
                Ok(Err(_)) | Err(_) => {
                    if attempt >= self.policy.default_retries {
                        return Err(GatewayError::session_not_connected(req.session_id));
                    }
                    tokio::time::sleep(Duration::from_secs(2) * attempt).await;
                }
            }
        }
    }
}

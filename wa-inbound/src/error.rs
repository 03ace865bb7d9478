use std::fmt::{self, Display, Formatter};

/// Error surface for the inbound pipeline, shaped like the rest of the
/// workspace's `{kind, source}` errors.
#[derive(Debug)]
pub struct InboundError {
    kind: InboundErrorType,
    source: Option<Box<dyn std::error::Error + Send + Sync>>,
}

#[derive(Debug)]
pub enum InboundErrorType {
    /// The durable queue backend could not be reached.
    QueueUnavailable,
    /// Writing or reading a media file failed.
    Media,
    /// The webhook POST failed after the control-plane client's own retries.
    WebhookDelivery { session_id: String },
    /// Processing a job ran past `InboundConfig::job_timeout`.
    JobTimedOut { session_id: String },
}

impl InboundError {
    pub fn queue_unavailable(source: impl Into<Box<dyn std::error::Error + Send + Sync>>) -> Self {
        Self {
            kind: InboundErrorType::QueueUnavailable,
            source: Some(source.into()),
        }
    }

    pub fn media(source: impl Into<Box<dyn std::error::Error + Send + Sync>>) -> Self {
        Self {
            kind: InboundErrorType::Media,
            source: Some(source.into()),
        }
    }

    pub fn webhook_delivery(
        session_id: impl Into<String>,
        source: impl Into<Box<dyn std::error::Error + Send + Sync>>,
    ) -> Self {
        Self {
            kind: InboundErrorType::WebhookDelivery {
                session_id: session_id.into(),
            },
            source: Some(source.into()),
        }
    }

    pub fn job_timed_out(session_id: impl Into<String>) -> Self {
        Self {
            kind: InboundErrorType::JobTimedOut {
                session_id: session_id.into(),
            },
            source: None,
        }
    }

    pub const fn kind(&self) -> &InboundErrorType {
        &self.kind
    }
}

impl Display for InboundError {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        match &self.kind {
            InboundErrorType::QueueUnavailable => f.write_str("inbound queue backend unavailable"),
            InboundErrorType::Media => f.write_str("media read/write failed"),
            InboundErrorType::WebhookDelivery { session_id } => {
                write!(f, "webhook delivery failed for session {session_id}")
            }
            InboundErrorType::JobTimedOut { session_id } => {
                write!(f, "job processing timed out for session {session_id}")
            }
        }
    }
}

impl std::error::Error for InboundError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        self.source.as_deref().map(|e| e as _)
    }
}

pub type Result<T> = std::result::Result<T, InboundError>;

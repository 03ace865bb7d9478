use crate::{ReportedStatus, SessionId};
use chrono::{DateTime, Utc};

/// Relative urgency of an [`OutboundTask`]. A `High`-priority status update
/// triggers an immediate flush rather than waiting for the periodic timer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
pub enum OutboundPriority {
    Normal,
    High,
}

/// The payload carried by an [`OutboundTask`].
#[derive(Debug, Clone, serde::Serialize, serde::Deserialize)]
pub enum OutboundTaskKind {
    Qr { qr: String },
    Status { status: ReportedStatus },
    Lifecycle { event: String, meta: serde_json::Value },
}

/// A unit of work destined for the control plane, coalesced by the
/// `OutboundBatcher` in `wa-batcher`.
#[derive(Debug, Clone, serde::Serialize, serde::Deserialize)]
pub struct OutboundTask {
    pub session_id: SessionId,
    pub kind: OutboundTaskKind,
    pub priority: OutboundPriority,
    pub enqueued_at: DateTime<Utc>,
}

impl OutboundTask {
    pub fn qr(session_id: SessionId, qr: impl Into<String>, priority: OutboundPriority) -> Self {
        Self {
            session_id,
            kind: OutboundTaskKind::Qr { qr: qr.into() },
            priority,
            enqueued_at: crate::now(),
        }
    }

    pub fn status(session_id: SessionId, status: ReportedStatus, priority: OutboundPriority) -> Self {
        Self {
            session_id,
            kind: OutboundTaskKind::Status { status },
            priority,
            enqueued_at: crate::now(),
        }
    }

    pub fn lifecycle(session_id: SessionId, event: impl Into<String>, meta: serde_json::Value) -> Self {
        Self {
            session_id,
            kind: OutboundTaskKind::Lifecycle { event: event.into(), meta },
            priority: OutboundPriority::Normal,
            enqueued_at: crate::now(),
        }
    }
}

//! Shared domain types for the WhatsApp session gateway.
//!
//! This crate has no I/O and no async runtime dependency: it exists so that
//! `wa-gateway`, `wa-cache`, `wa-batcher`, `wa-inbound` and `wa-control-client`
//! can agree on the shape of a session without depending on each other.

mod inbound;
mod outbound;
mod qr;
mod session;
mod status;

pub use inbound::{InboundJob, MessageContent, MessageKind};
pub use outbound::{OutboundPriority, OutboundTask, OutboundTaskKind};
pub use qr::QrState;
pub use session::{ReconnectMode, ReconnectState, SessionId, SessionMeta};
pub use status::ReportedStatus;

use chrono::{DateTime, Utc};

/// Returns the current wall-clock time.
///
/// Centralised so that tests can be written against a fixed notion of "now"
/// if a fake clock is substituted at a higher layer.
pub fn now() -> DateTime<Utc> {
    Utc::now()
}

/// An append-only lifecycle transition for a session, mirrored into the
/// shared cache as a bounded ring and batched upstream.
#[derive(Debug, Clone, serde::Serialize, serde::Deserialize)]
pub struct LifecycleEvent {
    pub session_id: SessionId,
    pub event: String,
    pub meta: serde_json::Value,
    pub timestamp: DateTime<Utc>,
}

impl LifecycleEvent {
    pub fn new(session_id: SessionId, event: impl Into<String>, meta: serde_json::Value) -> Self {
        Self {
            session_id,
            event: event.into(),
            meta,
            timestamp: now(),
        }
    }
}

/// Cap on the number of [`LifecycleEvent`]s retained per session in the
/// shared-cache ring buffer.
pub const LIFECYCLE_RING_CAP: usize = 50;

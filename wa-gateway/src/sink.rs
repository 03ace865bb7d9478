//! The capability the gateway core uses to hand events upstream, implemented
//! by `wa-batcher`'s `OutboundBatcher`.
//!
//! Kept as a trait rather than a concrete dependency on `wa-batcher` so this
//! crate and the batcher can be developed and tested independently.

use async_trait::async_trait;
use wa_model::{LifecycleEvent, OutboundPriority, ReportedStatus, SessionId};

#[async_trait]
pub trait OutboundSink: Send + Sync {
    async fn enqueue_qr(&self, session_id: SessionId, qr: String);
    async fn enqueue_status(&self, session_id: SessionId, status: ReportedStatus, priority: OutboundPriority);
    async fn enqueue_lifecycle(&self, event: LifecycleEvent);
}

//! Pairing-QR filtering: dedup, throttle, cap, and expiration.

use crate::sink::OutboundSink;
use crate::socket::ConnectionState;
use dashmap::DashMap;
use std::sync::Arc;
use std::time::Duration;
use tokio::task::JoinHandle;
use wa_cache::SessionCache;
use wa_model::{now, OutboundPriority, QrState, ReportedStatus, SessionId};

/// Tunables for pairing-QR filtering.
#[derive(Debug, Clone, Copy)]
pub struct QrPolicy {
    pub max_sends: u32,
    pub throttle: Duration,
    pub expires: Duration,
}

impl Default for QrPolicy {
    fn default() -> Self {
        Self {
            max_sends: 4,
            throttle: Duration::from_millis(5_000),
            expires: Duration::from_millis(60_000),
        }
    }
}

/// Filters and coalesces pairing QRs before they reach the outbound batcher.
/// Owns per-session QR state plus each session's expiration timer.
pub struct QrController {
    policy: QrPolicy,
    cache: Arc<dyn SessionCache>,
    sink: Arc<dyn OutboundSink>,
    state: DashMap<SessionId, QrState>,
    timers: DashMap<SessionId, JoinHandle<()>>,
}

impl QrController {
    pub fn new(policy: QrPolicy, cache: Arc<dyn SessionCache>, sink: Arc<dyn OutboundSink>) -> Self {
        Self {
            policy,
            cache,
            sink,
            state: DashMap::new(),
            timers: DashMap::new(),
        }
    }

    /// Runs the filter chain; any failed check silently drops the event
    /// rather than erroring.
    pub async fn handle(self: &Arc<Self>, session_id: SessionId, qr: String, connection_state: ConnectionState) {
        if qr.is_empty() || connection_state == ConnectionState::Close {
            return;
        }

        // Snapshot the pieces needed to decide, then drop the guard before
        // any `.await` — no lock is held across suspension points.
        let (send_count, inflight, last_qr_sent_at) = {
            let entry = self.state.entry(session_id.clone()).or_default();
            (entry.send_count, entry.inflight, entry.last_qr_sent_at)
        };

        if send_count >= self.policy.max_sends {
            return;
        }

        if !self.cache.is_new_qr(&session_id, &qr).await {
            return;
        }

        if inflight {
            return;
        }

        if let Some(last_sent) = last_qr_sent_at {
            if now() - last_sent < chrono::Duration::from_std(self.policy.throttle).unwrap() {
                return;
            }
        }

        if let Some(mut entry) = self.state.get_mut(&session_id) {
            entry.inflight = true;
        }

        self.cache.put_qr(&session_id, &qr).await;
        self.sink.enqueue_qr(session_id.clone(), qr.clone()).await;
        self.sink
            .enqueue_status(session_id.clone(), ReportedStatus::Pending, OutboundPriority::Normal)
            .await;

        if let Some(mut entry) = self.state.get_mut(&session_id) {
            entry.last_qr_body = Some(qr);
            entry.last_qr_sent_at = Some(now());
            entry.send_count += 1;
            entry.inflight = false;
        }

        self.arm_expiration(session_id);
    }

    fn arm_expiration(self: &Arc<Self>, session_id: SessionId) {
        let this = Arc::clone(self);
        let delay = self.policy.expires;

        if let Some((_, old)) = self.timers.remove(&session_id) {
            old.abort();
        }

        let key = session_id.clone();
        let handle = tokio::spawn(async move {
            tokio::time::sleep(delay).await;
            this.on_expire(session_id).await;
        });

        self.timers.insert(key, handle);
    }

    async fn on_expire(&self, session_id: SessionId) {
        if let Some(status) = self.cache.get_status(&session_id).await {
            if status.status == ReportedStatus::Pending {
                self.sink
                    .enqueue_status(session_id.clone(), ReportedStatus::Inactive, OutboundPriority::Normal)
                    .await;
            }
        }
        self.clear(&session_id).await;
    }

    /// Cancels any expiration timer and resets per-session QR state; does
    /// not touch the socket or `SessionStore`.
    pub async fn clear(&self, session_id: &SessionId) {
        if let Some((_, handle)) = self.timers.remove(session_id) {
            handle.abort();
        }
        if let Some(mut entry) = self.state.get_mut(session_id) {
            entry.reset();
        }
    }
}

//! `StateManager`: the read/write facade over the multilayer cache, owning
//! the precedence walk between the process-local layer, the shared layer,
//! and the control plane.

use crate::sink::OutboundSink;
use std::collections::HashSet;
use std::sync::Arc;
use wa_cache::{CachedStatus, SessionCache};
use wa_control_client::ControlPlaneClient;
use wa_model::{LifecycleEvent, OutboundPriority, ReportedStatus, SessionId};

/// Options narrowing an [`StateManager::is_session_active`] lookup.
#[derive(Debug, Clone, Copy, Default)]
pub struct ActiveCheckOptions {
    pub skip_cache: bool,
    pub for_reconnect: bool,
    /// Forces the narrow, default `acceptedStatuses={active}` set even when
    /// `for_reconnect` is set. Needed by the reconnect-abort check, which
    /// must not treat a merely `connecting` session as a reason to abort
    /// its own reconnect worker.
    pub only_active: bool,
}

pub struct StateManager {
    local: Arc<dyn SessionCache>,
    shared: Arc<dyn SessionCache>,
    control: Arc<ControlPlaneClient>,
}

impl StateManager {
    pub fn new(local: Arc<dyn SessionCache>, shared: Arc<dyn SessionCache>, control: Arc<ControlPlaneClient>) -> Self {
        Self { local, shared, control }
    }

    fn accepted_statuses(opts: ActiveCheckOptions) -> HashSet<ReportedStatus> {
        let mut accepted = HashSet::from([ReportedStatus::Active]);
        if opts.for_reconnect && !opts.only_active {
            accepted.insert(ReportedStatus::Connecting);
        }
        accepted
    }

    /// Walks the three layers in order, caching each resolved value back
    /// into the process-local layer. Layer 1 is skipped when the
    /// caller sets `skip_cache` or `for_reconnect`.
    pub async fn is_session_active(
        &self,
        session_id: &SessionId,
        webhook_token: &str,
        opts: ActiveCheckOptions,
    ) -> bool {
        let accepted = Self::accepted_statuses(opts);

        if !opts.skip_cache && !opts.for_reconnect {
            if let Some(cached) = self.local.get_status(session_id).await {
                return accepted.contains(&cached.status);
            }
        }

        if let Some(cached) = self.shared.get_status(session_id).await {
            self.local.put_status(session_id, cached).await;
            return accepted.contains(&cached.status);
        }

        match self.control.status_by_token(webhook_token).await {
            Ok(resp) => match ReportedStatus::from_wire(&resp.estado_qr) {
                Some(status) => {
                    self.cache_locally(session_id, status).await;
                    accepted.contains(&status)
                }
                None => false,
            },
            Err(_) => false,
        }
    }

    fn derive(status: ReportedStatus) -> CachedStatus {
        CachedStatus {
            status,
            active: status == ReportedStatus::Active,
            reconnect_eligible: matches!(status, ReportedStatus::Active | ReportedStatus::Connecting),
        }
    }

    async fn cache_locally(&self, session_id: &SessionId, status: ReportedStatus) {
        self.local.put_status(session_id, Self::derive(status)).await;
    }

    /// Writes to the shared cache, enqueues to the Outbound Batcher, and
    /// updates the local layer — the local layer always reflects the last
    /// *intentional* write.
    pub async fn update_session_status(
        &self,
        sink: &dyn OutboundSink,
        session_id: SessionId,
        status: ReportedStatus,
        priority: OutboundPriority,
    ) {
        self.shared.put_status(&session_id, Self::derive(status)).await;
        self.cache_locally(&session_id, status).await;
        sink.enqueue_status(session_id, status, priority).await;
    }

    /// Appends to the per-session lifecycle ring in the shared cache and
    /// enqueues a lifecycle outbound task.
    pub async fn record_transition(
        &self,
        sink: &dyn OutboundSink,
        session_id: SessionId,
        event: impl Into<String>,
        meta: serde_json::Value,
    ) {
        let event = LifecycleEvent::new(session_id.clone(), event, meta);
        self.shared.push_lifecycle(event.clone()).await;
        sink.enqueue_lifecycle(event).await;
    }

    /// Dead-session eviction heuristic consumed by `wa-daemon`'s janitor
    ///: a session is eligible once it has missed status lookups
    /// `consecutive_miss_threshold` times past `inactivity_grace`.
    pub fn is_eviction_eligible(consecutive_misses: u32, consecutive_miss_threshold: u32) -> bool {
        consecutive_misses >= consecutive_miss_threshold
    }

    pub fn control(&self) -> &Arc<ControlPlaneClient> {
        &self.control
    }
}

//! `ConnectionManager`/`ReconnectController`: close-code
//! classification and the per-session reconnect worker.

use crate::connection::backoff::ReconnectPolicy;
use crate::error::Result;
use crate::sink::OutboundSink;
use crate::socket::CloseReason;
use crate::state::{ActiveCheckOptions, StateManager};
use async_trait::async_trait;
use std::sync::Arc;
use std::time::Instant;
use tokio_util::sync::CancellationToken;
use wa_model::{OutboundPriority, ReportedStatus, SessionId};

/// Capability `ConnectionManager` uses to start, remove, and query
/// sessions, without holding a direct reference to `SessionStore` — avoids
/// a cyclic `ConnectionManager` ⇄ `SessionStore` reference.
#[async_trait]
pub trait SessionControl: Send + Sync {
    async fn start_session(&self, session_id: &SessionId) -> Result<()>;
    async fn remove_session(&self, session_id: &SessionId, preserve_auth: bool);
    fn exists(&self, session_id: &SessionId) -> bool;
    fn webhook_token(&self, session_id: &SessionId) -> Option<String>;
}

fn is_fatal_close_code(status_code: Option<u16>) -> bool {
    matches!(status_code, Some(401) | Some(405) | Some(428))
}

pub struct ConnectionManager {
    policy: ReconnectPolicy,
    state: Arc<StateManager>,
    sink: Arc<dyn OutboundSink>,
    control: Arc<dyn SessionControl>,
}

impl ConnectionManager {
    pub fn new(
        policy: ReconnectPolicy,
        state: Arc<StateManager>,
        sink: Arc<dyn OutboundSink>,
        control: Arc<dyn SessionControl>,
    ) -> Self {
        Self {
            policy,
            state,
            sink,
            control,
        }
    }

    /// Handles `connection == Open`.
    pub async fn on_open(&self, session_id: SessionId, qr_controller: &crate::qr::QrController) {
        qr_controller.clear(&session_id).await;
        self.state
            .record_transition(&*self.sink, session_id.clone(), "session_open", serde_json::json!({}))
            .await;
        self.state
            .update_session_status(&*self.sink, session_id, ReportedStatus::Active, OutboundPriority::High)
            .await;
    }

    /// Handles `connection == Close`. Returns the spawned reconnect
    /// worker's cancellation token when a worker was started.
    pub async fn on_close(
        self: &Arc<Self>,
        session_id: SessionId,
        close: Option<CloseReason>,
        already_reconnecting: bool,
    ) -> Option<CancellationToken> {
        let status_code = close.and_then(|c| c.status_code);

        if is_fatal_close_code(status_code) {
            self.state
                .record_transition(
                    &*self.sink,
                    session_id.clone(),
                    "session_closed_no_reconnect",
                    serde_json::json!({ "status_code": status_code }),
                )
                .await;
            self.state
                .update_session_status(&*self.sink, session_id.clone(), ReportedStatus::Inactive, OutboundPriority::High)
                .await;
            self.control.remove_session(&session_id, false).await;
            return None;
        }

        if already_reconnecting {
            // At most one reconnect worker per session at a time.
            return None;
        }

        let cancel = CancellationToken::new();
        let worker_cancel = cancel.clone();
        let this = Arc::clone(self);

        tokio::spawn(async move {
            this.run_reconnect_worker(session_id, worker_cancel).await;
        });

        Some(cancel)
    }

    async fn run_reconnect_worker(&self, session_id: SessionId, cancel: CancellationToken) {
        let resilience_started = Instant::now();
        let mut attempt: u32 = 1;

        loop {
            if cancel.is_cancelled() {
                return;
            }

            if attempt > self.policy.fast_attempts
                && resilience_started.elapsed() >= self.policy.resilience_max_duration
            {
                self.state
                    .record_transition(&*self.sink, session_id.clone(), "reconnect_exhausted", serde_json::json!({}))
                    .await;
                self.state
                    .update_session_status(&*self.sink, session_id.clone(), ReportedStatus::Inactive, OutboundPriority::High)
                    .await;
                self.control.remove_session(&session_id, false).await;
                return;
            }

            let delay = self.policy.next_delay(attempt);
            tokio::select! {
                _ = tokio::time::sleep(delay) => {}
                _ = cancel.cancelled() => return,
            }

            if cancel.is_cancelled() {
                return;
            }

            let webhook_token = match self.control.webhook_token(&session_id) {
                Some(token) => token,
                None => {
                    attempt += 1;
                    continue;
                }
            };

            // Abort only on the narrow, default `acceptedStatuses={active}` set — a
            // session merely `connecting` (e.g. another reconnect already in
            // flight) must not abort this worker.
            let opts = ActiveCheckOptions {
                skip_cache: true,
                for_reconnect: true,
                only_active: true,
            };
            if self.state.is_session_active(&session_id, &webhook_token, opts).await {
                self.state
                    .record_transition(&*self.sink, session_id.clone(), "reconnect_aborted_active", serde_json::json!({}))
                    .await;
                return;
            }

            let started_at = Instant::now();
            match self.control.start_session(&session_id).await {
                Ok(()) => {
                    self.state
                        .record_transition(
                            &*self.sink,
                            session_id.clone(),
                            "reconnect_success",
                            serde_json::json!({ "elapsed_ms": started_at.elapsed().as_millis() as u64, "attempt": attempt }),
                        )
                        .await;
                    return;
                }
                Err(_) => {
                    self.state
                        .record_transition(
                            &*self.sink,
                            session_id.clone(),
                            "reconnect_attempt",
                            serde_json::json!({ "attempt": attempt }),
                        )
                        .await;
                    attempt += 1;
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn fatal_close_codes_match_spec() {
        assert!(is_fatal_close_code(Some(401)));
        assert!(is_fatal_close_code(Some(405)));
        assert!(is_fatal_close_code(Some(428)));
        assert!(!is_fatal_close_code(Some(500)));
        assert!(!is_fatal_close_code(None));
    }
}

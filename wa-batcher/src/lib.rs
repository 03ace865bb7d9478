//! `OutboundBatcher`: coalesces per-session QR and status updates and
//! flushes them to the control plane behind a circuit breaker.
//!
//! Grounded in `twilight-http-ratelimiting`'s ticket/bucket model,
//! simplified to one global breaker per batch kind since the control plane
//! hands back no per-route ratelimit headers the way Discord does.

mod config;
mod metrics;

pub use config::BatcherConfig;
pub use metrics::BatchMetrics;

use async_trait::async_trait;
use dashmap::DashMap;
use std::sync::atomic::Ordering;
use std::sync::Arc;
use wa_control_client::{ControlPlaneClient, QrBatchEntry, StatusBatchEntry};
use wa_gateway::sink::OutboundSink;
use wa_model::{LifecycleEvent, OutboundPriority, ReportedStatus, SessionId};
use wa_ratelimit::{CircuitBreaker, CircuitState, ReentryGuard};

struct StatusEntry {
    status: ReportedStatus,
    priority: OutboundPriority,
}

/// The outbound batcher: last-write-wins coalescing maps for QR and status
/// updates, flushed on a size trigger, a periodic timer, or (for
/// high-priority statuses) immediately.
pub struct OutboundBatcher {
    config: BatcherConfig,
    control: Arc<ControlPlaneClient>,
    qr_batch: DashMap<SessionId, String>,
    status_batch: DashMap<SessionId, StatusEntry>,
    qr_guard: ReentryGuard,
    status_high_guard: ReentryGuard,
    status_normal_guard: ReentryGuard,
    qr_circuit: CircuitBreaker,
    status_circuit: CircuitBreaker,
    metrics: BatchMetrics,
}

impl OutboundBatcher {
    pub fn new(config: BatcherConfig, control: Arc<ControlPlaneClient>) -> Self {
        Self {
            qr_guard: ReentryGuard::new(config.qr_reentry_gap),
            status_high_guard: ReentryGuard::new(config.status_high_reentry_gap),
            status_normal_guard: ReentryGuard::new(config.status_normal_reentry_gap),
            qr_circuit: CircuitBreaker::new(config.failure_threshold, config.circuit_reset_timeout),
            status_circuit: CircuitBreaker::new(config.failure_threshold, config.circuit_reset_timeout),
            config,
            control,
            qr_batch: DashMap::new(),
            status_batch: DashMap::new(),
            metrics: BatchMetrics::default(),
        }
    }

    /// Spawns the periodic QR and status flush timers. Returns their join
    /// handles so a caller (the `wa-daemon` supervisor) can track them.
    pub fn spawn_periodic_flush(self: &Arc<Self>) -> (tokio::task::JoinHandle<()>, tokio::task::JoinHandle<()>) {
        let qr_this = Arc::clone(self);
        let qr_handle = tokio::spawn(async move {
            let mut ticker = tokio::time::interval(qr_this.config.qr_batch_interval);
            loop {
                ticker.tick().await;
                qr_this.flush_qr_batch(false).await;
            }
        });

        let status_this = Arc::clone(self);
        let status_handle = tokio::spawn(async move {
            let mut ticker = tokio::time::interval(status_this.config.status_priority_interval);
            loop {
                ticker.tick().await;
                status_this.flush_status_batch(false).await;
            }
        });

        (qr_handle, status_handle)
    }

    async fn flush_qr_batch(&self, force: bool) {
        if !force && !self.qr_guard.try_fire() {
            return;
        }

        let keys: Vec<SessionId> = self.qr_batch.iter().map(|e| e.key().clone()).collect();
        if keys.is_empty() {
            return;
        }

        let mut items = Vec::with_capacity(keys.len());
        for key in keys {
            if let Some((id, qr)) = self.qr_batch.remove(&key) {
                items.push((id, qr));
            }
        }

        let entries: Vec<QrBatchEntry> = items
            .iter()
            .map(|(id, qr)| QrBatchEntry {
                session_id: id.as_str().to_owned(),
                qr: qr.clone(),
            })
            .collect();

        let result = self
            .qr_circuit
            .call(|| async { self.control.post_qr_batch(entries).await })
            .await;

        match result {
            Ok(_) => {
                self.metrics.record_qr_success();
            }
            Err(_) => {
                self.metrics.record_qr_failure();
                for (id, qr) in items {
                    self.qr_batch.insert(id, qr);
                }
            }
        }
    }

    async fn flush_status_batch(&self, is_high_priority: bool) {
        let guard = if is_high_priority {
            &self.status_high_guard
        } else {
            &self.status_normal_guard
        };
        if !guard.try_fire() {
            return;
        }

        let keys: Vec<SessionId> = self.status_batch.iter().map(|e| e.key().clone()).collect();
        if keys.is_empty() {
            return;
        }

        let mut items = Vec::with_capacity(keys.len());
        for key in keys {
            if let Some((id, entry)) = self.status_batch.remove(&key) {
                items.push((id, entry));
            }
        }
        // High-priority items first.
        items.sort_by_key(|(_, entry)| entry.priority != OutboundPriority::High);

        let entries: Vec<StatusBatchEntry> = items
            .iter()
            .map(|(id, entry)| StatusBatchEntry {
                session_id: id.as_str().to_owned(),
                estado_qr: entry.status.as_wire().to_owned(),
            })
            .collect();

        let result = self
            .status_circuit
            .call(|| async { self.control.post_status_batch(entries).await })
            .await;

        match result {
            Ok(_) => {
                self.metrics.record_status_success();
            }
            Err(_) => {
                self.metrics.record_status_failure();
                for (id, entry) in items {
                    self.status_batch.insert(id, entry);
                }
            }
        }
    }

    /// Forces both batches to flush synchronously, bypassing the re-entry
    /// guards, then returns — the caller stops the periodic tasks.
    pub async fn flush_all(&self) {
        self.flush_qr_batch(true).await;
        self.flush_status_batch(true).await;
    }

    pub fn metrics(&self) -> BatchMetricsSnapshot {
        BatchMetricsSnapshot {
            qr_pending: self.qr_batch.len(),
            status_pending: self.status_batch.len(),
            qr_flush_success: self.metrics.qr_flush_success.load(Ordering::Relaxed),
            qr_flush_failure: self.metrics.qr_flush_failure.load(Ordering::Relaxed),
            status_flush_success: self.metrics.status_flush_success.load(Ordering::Relaxed),
            status_flush_failure: self.metrics.status_flush_failure.load(Ordering::Relaxed),
            qr_circuit_state: self.qr_circuit.state(),
            status_circuit_state: self.status_circuit.state(),
        }
    }
}

#[derive(Debug, Clone, Copy)]
pub struct BatchMetricsSnapshot {
    pub qr_pending: usize,
    pub status_pending: usize,
    pub qr_flush_success: u64,
    pub qr_flush_failure: u64,
    pub status_flush_success: u64,
    pub status_flush_failure: u64,
    pub qr_circuit_state: CircuitState,
    pub status_circuit_state: CircuitState,
}

#[async_trait]
impl OutboundSink for OutboundBatcher {
    async fn enqueue_qr(&self, session_id: SessionId, qr: String) {
        self.qr_batch.insert(session_id, qr);
        if self.qr_batch.len() >= self.config.batch_size {
            self.flush_qr_batch(false).await;
        }
    }

    async fn enqueue_status(&self, session_id: SessionId, status: ReportedStatus, priority: OutboundPriority) {
        self.status_batch.insert(session_id, StatusEntry { status, priority });

        if priority == OutboundPriority::High {
            self.flush_status_batch(true).await;
        } else if self.status_batch.len() >= self.config.batch_size {
            self.flush_status_batch(false).await;
        }
    }

    async fn enqueue_lifecycle(&self, event: LifecycleEvent) {
        // No batch endpoint is named for lifecycle events; the durable copy
        // lives in the shared cache's lifecycle ring. This sink just
        // traces it for observability.
        tracing::debug!(session_id = %event.session_id, event = %event.event, "lifecycle transition");
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use wa_control_client::ClientConfig;

    fn unreachable_batcher() -> OutboundBatcher {
        // Port 0 connections are refused immediately by the OS, so these
        // tests never touch the network or wait on a real timeout.
        let control = ControlPlaneClient::new(ClientConfig::new("http://127.0.0.1:0")).unwrap();
        OutboundBatcher::new(BatcherConfig::default(), Arc::new(control))
    }

    #[tokio::test]
    async fn low_priority_status_coalesces_without_flushing() {
        let batcher = unreachable_batcher();
        batcher
            .enqueue_status(SessionId::new("s1"), ReportedStatus::Connecting, OutboundPriority::Normal)
            .await;
        batcher
            .enqueue_status(SessionId::new("s1"), ReportedStatus::Active, OutboundPriority::Normal)
            .await;

        let snapshot = batcher.metrics();
        assert_eq!(snapshot.status_pending, 1, "last write should win per session");
        assert_eq!(snapshot.status_flush_success, 0);
        assert_eq!(snapshot.status_flush_failure, 0);
    }

    #[tokio::test]
    async fn high_priority_status_flushes_immediately_and_reenqueues_on_failure() {
        let batcher = unreachable_batcher();
        batcher
            .enqueue_status(SessionId::new("s1"), ReportedStatus::Active, OutboundPriority::High)
            .await;

        let snapshot = batcher.metrics();
        assert_eq!(snapshot.status_flush_failure, 1);
        assert_eq!(snapshot.status_pending, 1, "failed flush must re-enqueue");
    }

    #[tokio::test]
    async fn qr_size_trigger_flushes_at_batch_size() {
        let mut config = BatcherConfig::default();
        config.batch_size = 2;
        let control = ControlPlaneClient::new(ClientConfig::new("http://127.0.0.1:0")).unwrap();
        let batcher = OutboundBatcher::new(config, Arc::new(control));

        batcher.enqueue_qr(SessionId::new("s1"), "qr-1".into()).await;
        assert_eq!(batcher.metrics().qr_pending, 1);
        batcher.enqueue_qr(SessionId::new("s2"), "qr-2".into()).await;

        // Flush attempted and failed against the unreachable control plane,
        // so the items are re-enqueued rather than lost.
        let snapshot = batcher.metrics();
        assert_eq!(snapshot.qr_flush_failure, 1);
        assert_eq!(snapshot.qr_pending, 2);
    }

    #[tokio::test]
    async fn qr_circuit_opens_after_threshold_failures_and_is_reported() {
        let batcher = unreachable_batcher();
        assert_eq!(batcher.metrics().qr_circuit_state, CircuitState::Closed);

        for i in 0..BatcherConfig::default().failure_threshold {
            batcher.enqueue_qr(SessionId::new(format!("s{i}")), "qr".into()).await;
            batcher.flush_all().await;
        }

        assert_eq!(batcher.metrics().qr_circuit_state, CircuitState::Open);
    }

    #[tokio::test]
    async fn flush_all_bypasses_reentry_guards() {
        let batcher = unreachable_batcher();
        batcher.enqueue_qr(SessionId::new("s1"), "qr-1".into()).await;
        batcher.flush_all().await;
        batcher.flush_all().await;

        // Both calls attempt a flush regardless of the guard gap; the
        // failed item is re-enqueued each time, so both attempts run.
        assert_eq!(batcher.metrics().qr_flush_failure, 2);
        assert_eq!(batcher.metrics().qr_pending, 1);
    }
}

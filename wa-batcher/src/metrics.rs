use std::sync::atomic::{AtomicU64, Ordering};

/// Flush counters, exposed to the `wa-daemon` facade's `batch_metrics()`
/// operation and mirrored into the process's `metrics` registry the same
/// way the gateway counts dispatched events.
#[derive(Debug, Default)]
pub struct BatchMetrics {
    pub(crate) qr_flush_success: AtomicU64,
    pub(crate) qr_flush_failure: AtomicU64,
    pub(crate) status_flush_success: AtomicU64,
    pub(crate) status_flush_failure: AtomicU64,
}

impl BatchMetrics {
    pub(crate) fn record_qr_success(&self) {
        self.qr_flush_success.fetch_add(1, Ordering::Relaxed);
        metrics::counter!("wa_batcher_qr_flush_total", "result" => "success").increment(1);
    }

    pub(crate) fn record_qr_failure(&self) {
        self.qr_flush_failure.fetch_add(1, Ordering::Relaxed);
        metrics::counter!("wa_batcher_qr_flush_total", "result" => "failure").increment(1);
    }

    pub(crate) fn record_status_success(&self) {
        self.status_flush_success.fetch_add(1, Ordering::Relaxed);
        metrics::counter!("wa_batcher_status_flush_total", "result" => "success").increment(1);
    }

    pub(crate) fn record_status_failure(&self) {
        self.status_flush_failure.fetch_add(1, Ordering::Relaxed);
        metrics::counter!("wa_batcher_status_flush_total", "result" => "failure").increment(1);
    }
}

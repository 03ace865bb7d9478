//! Inbound pipeline metrics: a moving average of processing latency plus
//! success/failure counters, logged every `metrics_log_every` completed
//! jobs.

use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;

#[derive(Debug, Default)]
pub struct PipelineMetrics {
    completed: AtomicU64,
    succeeded: AtomicU64,
    failed: AtomicU64,
    /// Latency moving average, stored as whole microseconds.
    avg_latency_us: AtomicU64,
}

impl PipelineMetrics {
    /// Folds one job's outcome into the running average (simple
    /// exponential smoothing, alpha = 0.1) and logs a summary line every
    /// `log_every` completions.
    pub fn record(&self, latency: Duration, success: bool, log_every: u64) {
        let completed = self.completed.fetch_add(1, Ordering::Relaxed) + 1;
        if success {
            self.succeeded.fetch_add(1, Ordering::Relaxed);
        } else {
            self.failed.fetch_add(1, Ordering::Relaxed);
        }

        let sample = latency.as_micros().min(u64::MAX as u128) as u64;
        let mut prev = self.avg_latency_us.load(Ordering::Relaxed);
        loop {
            let next = if prev == 0 { sample } else { prev + (sample as i64 - prev as i64) as u64 / 10 };
            match self
                .avg_latency_us
                .compare_exchange_weak(prev, next, Ordering::Relaxed, Ordering::Relaxed)
            {
                Ok(_) => break,
                Err(actual) => prev = actual,
            }
        }

        if completed % log_every == 0 {
            tracing::info!(
                completed,
                succeeded = self.succeeded.load(Ordering::Relaxed),
                failed = self.failed.load(Ordering::Relaxed),
                avg_latency_us = self.avg_latency_us.load(Ordering::Relaxed),
                "inbound pipeline throughput"
            );
        }
    }

    pub fn snapshot(&self) -> MetricsSnapshot {
        MetricsSnapshot {
            completed: self.completed.load(Ordering::Relaxed),
            succeeded: self.succeeded.load(Ordering::Relaxed),
            failed: self.failed.load(Ordering::Relaxed),
            avg_latency: Duration::from_micros(self.avg_latency_us.load(Ordering::Relaxed)),
        }
    }
}

#[derive(Debug, Clone, Copy)]
pub struct MetricsSnapshot {
    pub completed: u64,
    pub succeeded: u64,
    pub failed: u64,
    pub avg_latency: Duration,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn tracks_counts_and_converges_toward_latest_latency() {
        let metrics = PipelineMetrics::default();
        for _ in 0..50 {
            metrics.record(Duration::from_millis(100), true, 1000);
        }
        let snapshot = metrics.snapshot();
        assert_eq!(snapshot.completed, 50);
        assert_eq!(snapshot.succeeded, 50);
        assert_eq!(snapshot.failed, 0);
        assert!(snapshot.avg_latency.as_millis() > 80);
    }

    #[test]
    fn counts_failures_separately() {
        let metrics = PipelineMetrics::default();
        metrics.record(Duration::from_millis(10), false, 1000);
        let snapshot = metrics.snapshot();
        assert_eq!(snapshot.failed, 1);
        assert_eq!(snapshot.succeeded, 0);
    }
}

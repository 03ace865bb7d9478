//! Durable backing store for the inbound queue.
//!
//! Grounded in the relay pattern of driving Redis through
//! `redis::aio::ConnectionManager` + `AsyncCommands` rather than a bare
//! `Client`, so a dropped connection is transparently redialed.

use crate::error::{InboundError, Result};
use async_trait::async_trait;
use redis::AsyncCommands;
use wa_model::InboundJob;

const PENDING_KEY: &str = "wa:inbound:pending";
const PROCESSING_KEY: &str = "wa:inbound:processing";
const FAILED_KEY: &str = "wa:inbound:failed";

fn job_key(job_id: &str) -> String {
    format!("wa:inbound:job:{job_id}")
}

/// A leased job pulled off the pending list, paired with the id the store
/// uses to track it through `complete`/`fail`.
#[derive(Debug, Clone)]
pub struct LeasedJob {
    pub job_id: String,
    pub job: InboundJob,
}

/// The durable ledger behind [`crate::queue::InboundQueue`]. Jobs persist
/// across a process restart; removing on complete but keeping on fail is
/// the caller's responsibility, enforced by which of `complete`/`fail` it
/// calls.
#[async_trait]
pub trait QueueStore: Send + Sync {
    async fn enqueue(&self, job_id: &str, job: &InboundJob) -> Result<()>;
    /// Pops the oldest pending job and moves it to the processing set,
    /// blocking up to `timeout_secs` if the queue is empty.
    async fn lease(&self, timeout_secs: usize) -> Result<Option<LeasedJob>>;
    async fn complete(&self, job_id: &str) -> Result<()>;
    /// Re-enqueues `job` (with `attempts` already incremented by the
    /// caller) if under the attempt cap, else moves it to the failed list
    /// for inspection (kept, not deleted).
    async fn fail(&self, job_id: &str, job: &InboundJob, exhausted: bool) -> Result<()>;
    /// Deletes failed entries whose `received_at` is older than `retention`.
    async fn clean_failed(&self, retention: chrono::Duration) -> Result<u64>;
}

pub struct RedisQueueStore {
    conn: redis::aio::ConnectionManager,
}

impl RedisQueueStore {
    pub async fn connect(redis_url: &str) -> Result<Self> {
        let client = redis::Client::open(redis_url).map_err(InboundError::queue_unavailable)?;
        let conn = redis::aio::ConnectionManager::new(client)
            .await
            .map_err(InboundError::queue_unavailable)?;
        Ok(Self { conn })
    }
}

#[async_trait]
impl QueueStore for RedisQueueStore {
    async fn enqueue(&self, job_id: &str, job: &InboundJob) -> Result<()> {
        let mut conn = self.conn.clone();
        let payload = serde_json::to_string(job).map_err(InboundError::media)?;
        conn.set::<_, _, ()>(job_key(job_id), payload)
            .await
            .map_err(InboundError::queue_unavailable)?;
        conn.lpush::<_, _, ()>(PENDING_KEY, job_id)
            .await
            .map_err(InboundError::queue_unavailable)
    }

    async fn lease(&self, timeout_secs: usize) -> Result<Option<LeasedJob>> {
        let mut conn = self.conn.clone();
        let job_id: Option<String> = conn
            .brpoplpush(PENDING_KEY, PROCESSING_KEY, timeout_secs)
            .await
            .map_err(InboundError::queue_unavailable)?;

        let Some(job_id) = job_id else {
            return Ok(None);
        };

        let payload: Option<String> = conn.get(job_key(&job_id)).await.map_err(InboundError::queue_unavailable)?;
        let Some(payload) = payload else {
            // Job data expired or was cleaned up underneath us; drop the
            // dangling processing entry and report nothing leased.
            let _: redis::RedisResult<()> = conn.lrem(PROCESSING_KEY, 1, &job_id).await;
            return Ok(None);
        };

        let job: InboundJob = serde_json::from_str(&payload).map_err(InboundError::media)?;
        Ok(Some(LeasedJob { job_id, job }))
    }

    async fn complete(&self, job_id: &str) -> Result<()> {
        let mut conn = self.conn.clone();
        conn.lrem::<_, _, ()>(PROCESSING_KEY, 1, job_id)
            .await
            .map_err(InboundError::queue_unavailable)?;
        conn.del::<_, ()>(job_key(job_id)).await.map_err(InboundError::queue_unavailable)
    }

    async fn fail(&self, job_id: &str, job: &InboundJob, exhausted: bool) -> Result<()> {
        let mut conn = self.conn.clone();
        conn.lrem::<_, _, ()>(PROCESSING_KEY, 1, job_id)
            .await
            .map_err(InboundError::queue_unavailable)?;

        let payload = serde_json::to_string(job).map_err(InboundError::media)?;
        conn.set::<_, _, ()>(job_key(job_id), payload)
            .await
            .map_err(InboundError::queue_unavailable)?;

        if exhausted {
            conn.lpush::<_, _, ()>(FAILED_KEY, job_id)
                .await
                .map_err(InboundError::queue_unavailable)
        } else {
            conn.lpush::<_, _, ()>(PENDING_KEY, job_id)
                .await
                .map_err(InboundError::queue_unavailable)
        }
    }

    async fn clean_failed(&self, retention: chrono::Duration) -> Result<u64> {
        let mut conn = self.conn.clone();
        let ids: Vec<String> = conn.lrange(FAILED_KEY, 0, -1).await.map_err(InboundError::queue_unavailable)?;
        let cutoff = wa_model::now() - retention;
        let mut removed = 0u64;

        for id in ids {
            let payload: Option<String> = conn.get(job_key(&id)).await.map_err(InboundError::queue_unavailable)?;
            let Some(payload) = payload else {
                let _: redis::RedisResult<()> = conn.lrem(FAILED_KEY, 1, &id).await;
                continue;
            };
            let job: InboundJob = serde_json::from_str(&payload).map_err(InboundError::media)?;
            if job.received_at < cutoff {
                conn.lrem::<_, _, ()>(FAILED_KEY, 1, &id).await.map_err(InboundError::queue_unavailable)?;
                conn.del::<_, ()>(job_key(&id)).await.map_err(InboundError::queue_unavailable)?;
                removed += 1;
            }
        }

        Ok(removed)
    }
}

#[cfg(test)]
pub mod test_support {
    use super::*;
    use std::collections::{HashMap, VecDeque};
    use tokio::sync::Mutex;

    /// An in-process stand-in for [`RedisQueueStore`] used by the worker-pool
    /// and filtering tests so they don't depend on a running Redis instance.
    #[derive(Default)]
    pub struct InMemoryQueueStore {
        inner: Mutex<Inner>,
    }

    #[derive(Default)]
    struct Inner {
        pending: VecDeque<String>,
        jobs: HashMap<String, InboundJob>,
        failed: Vec<String>,
    }

    #[async_trait]
    impl QueueStore for InMemoryQueueStore {
        async fn enqueue(&self, job_id: &str, job: &InboundJob) -> Result<()> {
            let mut inner = self.inner.lock().await;
            inner.jobs.insert(job_id.to_owned(), job.clone());
            inner.pending.push_back(job_id.to_owned());
            Ok(())
        }

        async fn lease(&self, _timeout_secs: usize) -> Result<Option<LeasedJob>> {
            let mut inner = self.inner.lock().await;
            let Some(job_id) = inner.pending.pop_front() else {
                return Ok(None);
            };
            let job = inner.jobs.get(&job_id).cloned();
            Ok(job.map(|job| LeasedJob { job_id, job }))
        }

        async fn complete(&self, job_id: &str) -> Result<()> {
            let mut inner = self.inner.lock().await;
            inner.jobs.remove(job_id);
            Ok(())
        }

        async fn fail(&self, job_id: &str, job: &InboundJob, exhausted: bool) -> Result<()> {
            let mut inner = self.inner.lock().await;
            inner.jobs.insert(job_id.to_owned(), job.clone());
            if exhausted {
                inner.failed.push(job_id.to_owned());
            } else {
                inner.pending.push_back(job_id.to_owned());
            }
            Ok(())
        }

        async fn clean_failed(&self, retention: chrono::Duration) -> Result<u64> {
            let mut inner = self.inner.lock().await;
            let cutoff = wa_model::now() - retention;
            let stale: Vec<String> = inner
                .failed
                .iter()
                .filter(|id| inner.jobs.get(*id).map(|j| j.received_at < cutoff).unwrap_or(true))
                .cloned()
                .collect();
            for id in &stale {
                inner.jobs.remove(id);
            }
            inner.failed.retain(|id| !stale.contains(id));
            Ok(stale.len() as u64)
        }
    }
}

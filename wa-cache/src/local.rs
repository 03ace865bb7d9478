use crate::{CacheConfig, CachedStatus, SessionCache};
use async_trait::async_trait;
use dashmap::DashMap;
use std::time::{Duration, Instant};
use wa_model::{LifecycleEvent, SessionId};

struct Entry<T> {
    value: T,
    inserted_at: Instant,
}

impl<T> Entry<T> {
    fn fresh(value: T) -> Self {
        Self {
            value,
            inserted_at: Instant::now(),
        }
    }

    fn is_expired(&self, ttl: Duration) -> bool {
        self.inserted_at.elapsed() >= ttl
    }
}

/// The process-local cache layer: a 30s-TTL map skipped
/// entirely when the caller sets `skip_cache`/`for_reconnect`.
///
/// Built the way `InMemoryCache` wraps a handful of `DashMap`s behind a
/// `Config`, rather than one giant lock.
pub struct LocalCache {
    config: CacheConfig,
    status: DashMap<SessionId, Entry<CachedStatus>>,
    qr: DashMap<SessionId, Entry<String>>,
    lifecycle: DashMap<SessionId, Vec<LifecycleEvent>>,
}

impl LocalCache {
    pub fn new(config: CacheConfig) -> Self {
        Self {
            config,
            status: DashMap::new(),
            qr: DashMap::new(),
            lifecycle: DashMap::new(),
        }
    }

    pub fn with_defaults() -> Self {
        Self::new(CacheConfig::default())
    }
}

#[async_trait]
impl SessionCache for LocalCache {
    async fn get_status(&self, session_id: &SessionId) -> Option<CachedStatus> {
        let entry = self.status.get(session_id)?;
        if entry.is_expired(self.config.local_ttl) {
            drop(entry);
            self.status.remove(session_id);
            return None;
        }
        Some(entry.value)
    }

    async fn put_status(&self, session_id: &SessionId, status: CachedStatus) {
        self.status.insert(session_id.clone(), Entry::fresh(status));
    }

    async fn get_qr(&self, session_id: &SessionId) -> Option<String> {
        let entry = self.qr.get(session_id)?;
        if entry.is_expired(self.config.qr_ttl) {
            drop(entry);
            self.qr.remove(session_id);
            return None;
        }
        Some(entry.value.clone())
    }

    async fn put_qr(&self, session_id: &SessionId, qr: &str) {
        self.qr
            .insert(session_id.clone(), Entry::fresh(qr.to_owned()));
    }

    async fn is_new_qr(&self, session_id: &SessionId, qr: &str) -> bool {
        match self.get_qr(session_id).await {
            Some(existing) => existing != qr,
            None => true,
        }
    }

    async fn push_lifecycle(&self, event: LifecycleEvent) {
        let mut ring = self.lifecycle.entry(event.session_id.clone()).or_default();
        ring.push(event);
        let cap = self.config.lifecycle_ring_cap;
        if ring.len() > cap {
            let overflow = ring.len() - cap;
            ring.drain(0..overflow);
        }
    }

    async fn lifecycle_ring(&self, session_id: &SessionId) -> Vec<LifecycleEvent> {
        self.lifecycle
            .get(session_id)
            .map(|ring| ring.clone())
            .unwrap_or_default()
    }

    async fn invalidate(&self, session_id: &SessionId) {
        self.status.remove(session_id);
        self.qr.remove(session_id);
        self.lifecycle.remove(session_id);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use wa_model::ReportedStatus;

    fn sample_status() -> CachedStatus {
        CachedStatus {
            status: ReportedStatus::Active,
            active: true,
            reconnect_eligible: false,
        }
    }

    #[tokio::test]
    async fn status_expires_after_ttl() {
        let mut config = CacheConfig::default();
        config.local_ttl = Duration::from_millis(10);
        let cache = LocalCache::new(config);
        let id = SessionId::new("s1");

        cache.put_status(&id, sample_status()).await;
        assert!(cache.get_status(&id).await.is_some());

        tokio::time::sleep(Duration::from_millis(20)).await;
        assert!(cache.get_status(&id).await.is_none());
    }

    #[tokio::test]
    async fn is_new_qr_detects_dedup() {
        let cache = LocalCache::with_defaults();
        let id = SessionId::new("s1");

        assert!(cache.is_new_qr(&id, "q1").await);
        cache.put_qr(&id, "q1").await;
        assert!(!cache.is_new_qr(&id, "q1").await);
        assert!(cache.is_new_qr(&id, "q2").await);
    }

    #[tokio::test]
    async fn lifecycle_ring_caps_at_configured_size() {
        let mut config = CacheConfig::default();
        config.lifecycle_ring_cap = 3;
        let cache = LocalCache::new(config);
        let id = SessionId::new("s1");

        for i in 0..5 {
            cache
                .push_lifecycle(LifecycleEvent::new(id.clone(), format!("event-{i}"), serde_json::json!({})))
                .await;
        }

        let ring = cache.lifecycle_ring(&id).await;
        assert_eq!(ring.len(), 3);
        assert_eq!(ring[0].event, "event-2");
        assert_eq!(ring[2].event, "event-4");
    }
}

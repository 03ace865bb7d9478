use crate::{CacheConfig, CachedStatus, SessionCache};
use async_trait::async_trait;
use redis::{aio::ConnectionManager, AsyncCommands};
use std::error::Error as StdError;
use std::fmt::{self, Display, Formatter};
use wa_model::{LifecycleEvent, ReportedStatus, SessionId};

/// The shared (Redis-backed) cache layer.
///
/// Uses `redis::aio::ConnectionManager`, a reconnect-on-demand async
/// handle suited to long-lived app state.
pub struct SharedCache {
    conn: ConnectionManager,
    config: CacheConfig,
}

#[derive(Debug)]
pub struct SharedCacheError {
    source: redis::RedisError,
}

impl Display for SharedCacheError {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        write!(f, "shared cache operation failed: {}", self.source)
    }
}

impl StdError for SharedCacheError {
    fn source(&self) -> Option<&(dyn StdError + 'static)> {
        Some(&self.source)
    }
}

impl From<redis::RedisError> for SharedCacheError {
    fn from(source: redis::RedisError) -> Self {
        Self { source }
    }
}

impl SharedCache {
    pub async fn connect(redis_url: &str, config: CacheConfig) -> Result<Self, SharedCacheError> {
        let client = redis::Client::open(redis_url)?;
        let conn = ConnectionManager::new(client).await?;
        Ok(Self { conn, config })
    }

    fn status_key(session_id: &SessionId) -> String {
        format!("wa:status:{session_id}")
    }

    fn qr_key(session_id: &SessionId) -> String {
        format!("wa:qr:{session_id}")
    }

    fn lifecycle_key(session_id: &SessionId) -> String {
        format!("wa:lifecycle:{session_id}")
    }
}

#[async_trait]
impl SessionCache for SharedCache {
    async fn get_status(&self, session_id: &SessionId) -> Option<CachedStatus> {
        let mut conn = self.conn.clone();
        let raw: Option<String> = conn.get(Self::status_key(session_id)).await.ok().flatten();
        let status = ReportedStatus::from_wire(raw.as_deref()?)?;
        Some(CachedStatus {
            status,
            active: status == ReportedStatus::Active,
            reconnect_eligible: matches!(status, ReportedStatus::Active | ReportedStatus::Connecting),
        })
    }

    async fn put_status(&self, session_id: &SessionId, status: CachedStatus) {
        let mut conn = self.conn.clone();
        let ttl = self.config.status_ttl.as_secs().max(1);
        let _: Result<(), _> = conn
            .set_ex(Self::status_key(session_id), status.status.as_wire(), ttl)
            .await;
    }

    async fn get_qr(&self, session_id: &SessionId) -> Option<String> {
        let mut conn = self.conn.clone();
        conn.get(Self::qr_key(session_id)).await.ok().flatten()
    }

    async fn put_qr(&self, session_id: &SessionId, qr: &str) {
        let mut conn = self.conn.clone();
        let ttl = self.config.qr_ttl.as_secs().max(1);
        let _: Result<(), _> = conn.set_ex(Self::qr_key(session_id), qr, ttl).await;
    }

    async fn is_new_qr(&self, session_id: &SessionId, qr: &str) -> bool {
        match self.get_qr(session_id).await {
            Some(existing) => existing != qr,
            None => true,
        }
    }

    async fn push_lifecycle(&self, event: LifecycleEvent) {
        let mut conn = self.conn.clone();
        let key = Self::lifecycle_key(&event.session_id);
        let Ok(serialized) = serde_json::to_string(&event) else {
            return;
        };
        let cap = self.config.lifecycle_ring_cap as isize;
        let _: Result<(), _> = conn.lpush(&key, serialized).await;
        let _: Result<(), _> = conn.ltrim(&key, 0, cap.saturating_sub(1)).await;
    }

    async fn lifecycle_ring(&self, session_id: &SessionId) -> Vec<LifecycleEvent> {
        let mut conn = self.conn.clone();
        let raw: Vec<String> = conn
            .lrange(Self::lifecycle_key(session_id), 0, -1)
            .await
            .unwrap_or_default();
        raw.iter()
            .rev()
            .filter_map(|s| serde_json::from_str(s).ok())
            .collect()
    }

    async fn invalidate(&self, session_id: &SessionId) {
        let mut conn = self.conn.clone();
        let _: Result<(), _> = conn
            .del(&[
                Self::status_key(session_id),
                Self::qr_key(session_id),
                Self::lifecycle_key(session_id),
            ])
            .await;
    }
}

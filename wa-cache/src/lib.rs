//! The two cache layers backing session status and QR state.
//!
//! `local` is a process-local `DashMap` with a short TTL, built as a
//! builder over a `Config` wrapping a handful of `DashMap`s. `shared` is an
//! async client over a Redis-like KV store. Both implement
//! [`SessionCache`] so the state manager in `wa-gateway` can be wired to
//! either without caring which.

mod config;
mod local;
mod shared;

pub use config::{CacheConfig, CacheConfigBuilder};
pub use local::LocalCache;
pub use shared::{SharedCache, SharedCacheError};

use async_trait::async_trait;
use wa_model::{LifecycleEvent, ReportedStatus, SessionId};

/// A cached status value plus the bookkeeping the state manager needs to
/// decide whether a reconnect is warranted.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CachedStatus {
    pub status: ReportedStatus,
    pub active: bool,
    pub reconnect_eligible: bool,
}

/// Entries of different kinds carry different TTLs in the shared layer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum CacheKind {
    Qr,
    Status,
    Connection,
    SessionInfo,
}

/// Common contract for both the local and shared layers, letting callers in
/// `wa-gateway::state` treat them uniformly.
#[async_trait]
pub trait SessionCache: Send + Sync {
    async fn get_status(&self, session_id: &SessionId) -> Option<CachedStatus>;
    async fn put_status(&self, session_id: &SessionId, status: CachedStatus);
    async fn get_qr(&self, session_id: &SessionId) -> Option<String>;
    async fn put_qr(&self, session_id: &SessionId, qr: &str);
    /// Returns `true` if `qr` differs from whatever is currently cached
    /// (used by the QR controller's de-dup filter).
    async fn is_new_qr(&self, session_id: &SessionId, qr: &str) -> bool;
    async fn push_lifecycle(&self, event: LifecycleEvent);
    async fn lifecycle_ring(&self, session_id: &SessionId) -> Vec<LifecycleEvent>;
    async fn invalidate(&self, session_id: &SessionId);
}

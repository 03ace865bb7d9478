use crate::now;
use chrono::{DateTime, Utc};
use std::fmt::{self, Display, Formatter};

/// Opaque session identifier, a UUID by convention but never parsed as one.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, serde::Serialize, serde::Deserialize)]
pub struct SessionId(pub String);

impl SessionId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl Display for SessionId {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<String> for SessionId {
    fn from(id: String) -> Self {
        Self(id)
    }
}

impl From<&str> for SessionId {
    fn from(id: &str) -> Self {
        Self(id.to_owned())
    }
}

/// The two reconnect regimes: a short exponential phase followed by a
/// long, fixed schedule.
#[derive(Debug, Clone, Copy, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
pub enum ReconnectMode {
    /// No reconnect worker is currently active for this session.
    None,
    /// Attempts 1..=`fast_attempts`.
    Fast,
    /// Attempts beyond `fast_attempts`, following the fixed resilience schedule.
    Resilience,
}

impl Default for ReconnectMode {
    fn default() -> Self {
        Self::None
    }
}

/// Per-session reconnect bookkeeping, owned by the [`ConnectionManager`] and
/// mirrored on the [`SessionMeta`].
///
/// [`ConnectionManager`]: https://docs.rs/wa-gateway
#[derive(Debug, Clone, Default, serde::Serialize, serde::Deserialize)]
pub struct ReconnectState {
    pub attempts: u32,
    pub scheduled_at: Option<DateTime<Utc>>,
    pub mode: ReconnectMode,
    /// Wall-clock instant the resilience phase started, used to enforce
    /// `max_duration_ms`.
    pub resilience_started_at: Option<DateTime<Utc>>,
}

impl ReconnectState {
    pub fn reset(&mut self) {
        self.attempts = 0;
        self.scheduled_at = None;
        self.mode = ReconnectMode::None;
        self.resilience_started_at = None;
    }
}

/// Metadata persisted for a live session. Owns no socket handle directly —
/// that lives behind `wa-gateway`'s `SocketHandle` trait object, kept
/// alongside this struct in the `SessionRecord` the gateway crate defines.
#[derive(Debug, Clone, serde::Serialize, serde::Deserialize)]
pub struct SessionMeta {
    pub session_id: SessionId,
    pub user_id: String,
    pub webhook_token: String,
    pub reconnect: ReconnectState,
    pub created_at: DateTime<Utc>,
    pub last_activity_at: DateTime<Utc>,
    pub last_heartbeat_at: Option<DateTime<Utc>>,
    /// Invariant RC-1: at most one reconnect worker per session at a time.
    pub reconnecting: bool,
}

impl SessionMeta {
    pub fn new(session_id: SessionId, user_id: impl Into<String>, webhook_token: impl Into<String>) -> Self {
        let ts = now();
        Self {
            session_id,
            user_id: user_id.into(),
            webhook_token: webhook_token.into(),
            reconnect: ReconnectState::default(),
            created_at: ts,
            last_activity_at: ts,
            last_heartbeat_at: None,
            reconnecting: false,
        }
    }

    pub fn touch_activity(&mut self) {
        self.last_activity_at = now();
    }

    pub fn idle_for(&self) -> chrono::Duration {
        now() - self.last_activity_at
    }
}

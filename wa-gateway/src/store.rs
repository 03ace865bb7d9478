//! The in-memory registry of live sessions.
//!
//! Backed by a single `DashMap` rather than a sharded map of its own —
//! the critical sections here are O(1) so one map is enough.

use crate::error::{GatewayError, Result};
use crate::qr::QrController;
use crate::socket::SocketHandle;
use dashmap::DashMap;
use std::sync::Arc;
use tokio_util::sync::CancellationToken;
use wa_model::{SessionId, SessionMeta};

/// Everything the store keeps for one live session.
pub struct SessionRecord {
    pub meta: SessionMeta,
    /// `Arc` rather than `Box` so callers can clone it out of a `DashMap`
    /// guard and drop the guard before awaiting a send.
    pub socket: Arc<dyn SocketHandle>,
    /// Cancelled to stop that session's reconnect worker, if any.
    pub reconnect_cancel: CancellationToken,
}

/// The session registry: `save`, `get`, `delete`, `list`,
/// `update_activity`, enforcing the configured session cap.
pub struct SessionStore {
    sessions: DashMap<SessionId, SessionRecord>,
    qr: Arc<QrController>,
    max_sessions: usize,
    auth_root: std::path::PathBuf,
}

impl SessionStore {
    pub fn new(qr: Arc<QrController>, max_sessions: usize, auth_root: impl Into<std::path::PathBuf>) -> Self {
        Self {
            sessions: DashMap::new(),
            qr,
            max_sessions,
            auth_root: auth_root.into(),
        }
    }

    /// Inserts or replaces a session record. Refuses beyond the configured
    /// cap unless replacing an existing entry.
    pub fn save(&self, session_id: SessionId, record: SessionRecord) -> Result<()> {
        if !self.sessions.contains_key(&session_id) && self.sessions.len() >= self.max_sessions {
            return Err(GatewayError::max_sessions(self.max_sessions));
        }
        self.sessions.insert(session_id, record);
        Ok(())
    }

    pub fn has(&self, session_id: &SessionId) -> bool {
        self.sessions.contains_key(session_id)
    }

    pub fn len(&self) -> usize {
        self.sessions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.sessions.is_empty()
    }

    pub fn list(&self) -> Vec<SessionId> {
        self.sessions.iter().map(|e| e.key().clone()).collect()
    }

    pub fn update_activity(&self, session_id: &SessionId) {
        if let Some(mut entry) = self.sessions.get_mut(session_id) {
            entry.meta.touch_activity();
        }
    }

    pub fn last_activity_idle_for(&self, session_id: &SessionId) -> Option<chrono::Duration> {
        self.sessions.get(session_id).map(|e| e.meta.idle_for())
    }

    /// Removes a session: cancels its reconnect worker, clears QR state,
    /// closes the socket best-effort, and (unless `preserve_auth`) wipes the
    /// auth directory.
    pub async fn delete(&self, session_id: &SessionId, preserve_auth: bool) -> Result<()> {
        let Some((_, record)) = self.sessions.remove(session_id) else {
            return Ok(());
        };

        record.reconnect_cancel.cancel();
        self.qr.clear(session_id).await;
        record.socket.close().await;

        if !preserve_auth {
            let dir = self.auth_root.join(session_id.as_str());
            if let Err(source) = tokio::fs::remove_dir_all(&dir).await {
                if source.kind() != std::io::ErrorKind::NotFound {
                    return Err(GatewayError::auth_io(session_id.clone(), source));
                }
            }
        }

        Ok(())
    }

    /// Deletes every session, preserving auth directories; used by graceful
    /// shutdown.
    pub async fn close_all_preserving_auth(&self) {
        let ids = self.list();
        for id in ids {
            let _ = self.delete(&id, true).await;
        }
    }

    /// Periodic idle sweep: evicts sessions idle past `idle_ttl`.
    pub async fn sweep_idle(&self, idle_ttl: chrono::Duration) -> Vec<SessionId> {
        let mut evicted = Vec::new();
        for id in self.list() {
            if let Some(idle) = self.last_activity_idle_for(&id) {
                if idle >= idle_ttl {
                    let _ = self.delete(&id, false).await;
                    evicted.push(id);
                }
            }
        }
        evicted
    }

    pub fn with_record<R>(&self, session_id: &SessionId, f: impl FnOnce(&SessionRecord) -> R) -> Option<R> {
        self.sessions.get(session_id).map(|e| f(e.value()))
    }

    /// Marks a session as having an in-flight reconnect worker, storing its
    /// cancellation token (RC-1 bookkeeping).
    pub fn set_reconnecting(&self, session_id: &SessionId, cancel: CancellationToken) {
        if let Some(mut entry) = self.sessions.get_mut(session_id) {
            entry.meta.reconnecting = true;
            entry.reconnect_cancel = cancel;
        }
    }

    pub fn is_reconnecting(&self, session_id: &SessionId) -> bool {
        self.sessions.get(session_id).map(|e| e.meta.reconnecting).unwrap_or(false)
    }

    /// Swaps in a freshly dialed socket for a session whose reconnect worker
    /// just succeeded, closing the old one best-effort. Returns `false` if
    /// the session was evicted in the meantime.
    pub async fn replace_socket(&self, session_id: &SessionId, socket: Arc<dyn SocketHandle>) -> bool {
        let old = {
            let Some(mut entry) = self.sessions.get_mut(session_id) else {
                return false;
            };
            entry.meta.reconnecting = false;
            entry.meta.touch_activity();
            std::mem::replace(&mut entry.socket, socket)
        };
        old.close().await;
        true
    }

    /// Clones the live socket handle for `session_id` out of the registry
    /// without holding the map guard across the caller's subsequent await.
    pub fn socket(&self, session_id: &SessionId) -> Option<Arc<dyn SocketHandle>> {
        self.sessions.get(session_id).map(|e| Arc::clone(&e.socket))
    }
}

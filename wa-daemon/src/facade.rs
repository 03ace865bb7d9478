//! `WhatsAppManager`: composes every component from C1–C9 and exposes
//! the plain async operations an HTTP front-end calls. Wiring those
//! methods to an actual router is left to an integrator.

use crate::error::{DaemonError, Result};
use dashmap::DashMap;
use futures_util::StreamExt;
use std::sync::{Arc, Weak};
use std::time::Instant;
use tokio_util::sync::CancellationToken;
use wa_batcher::{BatchMetricsSnapshot, OutboundBatcher};
use wa_cache::{CacheConfig, LocalCache, SessionCache};
use wa_control_client::ControlPlaneClient;
use wa_gateway::connection::{ConnectionManager, ReconnectPolicy, SessionControl};
use wa_gateway::error::Result as GatewayResult;
use wa_gateway::qr::{QrController, QrPolicy};
use wa_gateway::sink::OutboundSink;
use wa_gateway::socket::{ConnectionState, ProtocolConnector, SocketEvent, SocketEventStream, SocketFactory};
use wa_gateway::state::StateManager;
use wa_gateway::store::{SessionRecord, SessionStore};
use wa_gateway::GatewayConfig;
use wa_inbound::{InboundConfig, InboundQueue, MessageReceiver, QueueStore};
use wa_model::{now, OutboundPriority, ReportedStatus, SessionId, SessionMeta};

pub struct StartRequest {
    pub user_id: String,
    pub webhook_token: String,
    pub session_id: Option<SessionId>,
}

#[derive(Debug, Clone)]
pub struct StartResult {
    pub session_id: SessionId,
}

#[derive(Debug, Clone)]
pub struct DeleteResult {
    pub session_id: SessionId,
    pub removed: bool,
}

#[derive(Debug, Clone)]
pub struct SessionInfo {
    pub session_id: SessionId,
    pub exists: bool,
    pub connected: bool,
    pub user: Option<String>,
}

#[derive(Debug, Clone)]
pub struct SessionsOverview {
    pub active: Vec<SessionId>,
    pub pending: Vec<SessionId>,
}

pub struct SendMessageRequest {
    pub session_id: SessionId,
    pub wa_id: String,
    pub kind: String,
    pub body: Option<String>,
    pub media_url: Option<String>,
    pub caption: Option<String>,
    pub filename: Option<String>,
}

#[derive(Debug, Clone)]
pub struct SendResult {
    pub session_id: SessionId,
}

#[derive(Debug, Clone)]
pub struct HealthReport {
    pub uptime_secs: u64,
    pub session_count: usize,
    pub pending_count: usize,
}

/// Diagnostic counters for the multilayer cache. The individual cache
/// layers expose no statistics of their own, so this is derived from the
/// facade's own bookkeeping rather than from `wa-cache` directly.
#[derive(Debug, Clone, Copy)]
pub struct CacheMetrics {
    pub tracked_sessions: usize,
    pub pending_sessions: usize,
}

/// Everything an integrator supplies to build one [`WhatsAppManager`].
pub struct ManagerDeps {
    pub config: GatewayConfig,
    pub connector: Arc<dyn ProtocolConnector>,
    pub control: Arc<ControlPlaneClient>,
    pub shared_cache: Arc<dyn SessionCache>,
    pub cache_config: CacheConfig,
    pub batcher_config: wa_batcher::BatcherConfig,
    pub inbound_config: InboundConfig,
    pub queue_store: Arc<dyn QueueStore>,
}

pub struct WhatsAppManager {
    config: GatewayConfig,
    control: Arc<ControlPlaneClient>,
    socket_factory: SocketFactory,
    store: SessionStore,
    qr: Arc<QrController>,
    state: Arc<StateManager>,
    connection: Arc<ConnectionManager>,
    batcher: Arc<OutboundBatcher>,
    sink: Arc<dyn OutboundSink>,
    sender: wa_gateway::sender::MessageSender,
    inbound: Arc<InboundQueue>,
    receiver: Arc<MessageReceiver>,
    pending_since: DashMap<SessionId, chrono::DateTime<chrono::Utc>>,
    started_at: Instant,
}

/// Breaks the `ConnectionManager` ⇄ `WhatsAppManager` reference cycle: the
/// manager is reached through a weak reference rather than a strong
/// back-reference.
struct ManagerControl(Weak<WhatsAppManager>);

#[async_trait::async_trait]
impl SessionControl for ManagerControl {
    async fn start_session(&self, session_id: &SessionId) -> GatewayResult<()> {
        let Some(manager) = self.0.upgrade() else {
            return Ok(());
        };
        manager.restart_session(session_id).await
    }

    async fn remove_session(&self, session_id: &SessionId, preserve_auth: bool) {
        if let Some(manager) = self.0.upgrade() {
            manager.evict(session_id, preserve_auth).await;
        }
    }

    fn exists(&self, session_id: &SessionId) -> bool {
        self.0.upgrade().map(|m| m.store.has(session_id)).unwrap_or(false)
    }

    fn webhook_token(&self, session_id: &SessionId) -> Option<String> {
        self.0
            .upgrade()
            .and_then(|m| m.store.with_record(session_id, |r| r.meta.webhook_token.clone()))
    }
}

impl WhatsAppManager {
    pub fn new(deps: ManagerDeps) -> Arc<Self> {
        Arc::new_cyclic(|weak: &Weak<WhatsAppManager>| {
            let batcher = Arc::new(OutboundBatcher::new(deps.batcher_config, Arc::clone(&deps.control)));
            let sink: Arc<dyn OutboundSink> = Arc::clone(&batcher) as Arc<dyn OutboundSink>;

            let local: Arc<dyn SessionCache> = Arc::new(LocalCache::new(deps.cache_config));
            let state = Arc::new(StateManager::new(local, Arc::clone(&deps.shared_cache), Arc::clone(&deps.control)));

            let qr_policy = QrPolicy {
                max_sends: deps.config.qr_max_sends(),
                throttle: deps.config.qr_throttle(),
                expires: deps.config.qr_expires(),
            };
            let qr = Arc::new(QrController::new(qr_policy, deps.shared_cache, Arc::clone(&sink)));

            let store = SessionStore::new(Arc::clone(&qr), deps.config.max_sessions(), deps.config.auth_root());

            let reconnect_policy = ReconnectPolicy {
                fast_attempts: deps.config.fast_attempts(),
                fast_backoff_base: deps.config.fast_backoff_base(),
                fast_backoff_max: deps.config.fast_backoff_max(),
                resilience_schedule: deps.config.resilience_schedule().to_vec(),
                resilience_max_duration: deps.config.resilience_max_duration(),
            };
            let control_capability: Arc<dyn SessionControl> = Arc::new(ManagerControl(weak.clone()));
            let connection = Arc::new(ConnectionManager::new(
                reconnect_policy,
                Arc::clone(&state),
                Arc::clone(&sink),
                control_capability,
            ));

            let send_policy = wa_gateway::sender::SendPolicy {
                per_attempt_timeout: deps.config.send_timeout(),
                default_retries: deps.config.send_retries(),
            };

            let inbound = Arc::new(InboundQueue::new(deps.queue_store, deps.inbound_config));
            let receiver = Arc::new(MessageReceiver::new(
                Arc::clone(&inbound),
                Arc::clone(&deps.control),
                deps.config.auth_root().to_owned(),
            ));

            Self {
                socket_factory: SocketFactory::new(deps.config.auth_root(), deps.connector),
                config: deps.config,
                control: deps.control,
                store,
                qr,
                state,
                connection,
                batcher,
                sink,
                sender: wa_gateway::sender::MessageSender::new(send_policy),
                inbound,
                receiver,
                pending_since: DashMap::new(),
                started_at: Instant::now(),
            }
        })
    }

    pub fn batcher(&self) -> &Arc<OutboundBatcher> {
        &self.batcher
    }

    pub fn inbound(&self) -> &Arc<InboundQueue> {
        &self.inbound
    }

    pub fn receiver(&self) -> &Arc<MessageReceiver> {
        &self.receiver
    }

    pub fn store(&self) -> &SessionStore {
        &self.store
    }

    pub fn state(&self) -> &Arc<StateManager> {
        &self.state
    }

    pub fn control(&self) -> &Arc<ControlPlaneClient> {
        &self.control
    }

    fn mark_pending(&self, session_id: SessionId) {
        self.pending_since.entry(session_id).or_insert_with(now);
    }

    fn clear_pending(&self, session_id: &SessionId) {
        self.pending_since.remove(session_id);
    }

    pub fn pending_since(&self, session_id: &SessionId) -> Option<chrono::DateTime<chrono::Utc>> {
        self.pending_since.get(session_id).map(|e| *e.value())
    }

    pub fn pending_sessions(&self) -> Vec<SessionId> {
        self.pending_since.iter().map(|e| e.key().clone()).collect()
    }

    // ---- Facade operations ----

    pub async fn start_session(self: &Arc<Self>, req: StartRequest) -> Result<StartResult> {
        let session_id = req.session_id.unwrap_or_else(|| SessionId::new(uuid::Uuid::new_v4().to_string()));

        // Pre-wipe: a caller reusing an id is re-pairing from scratch.
        let _ = self.store.delete(&session_id, false).await;
        self.qr.clear(&session_id).await;

        let mut socket = self
            .socket_factory
            .create_socket(&session_id)
            .await
            .map_err(|source| DaemonError::socket_io(session_id.clone(), source))?;
        let events = socket.events();
        let socket: Arc<dyn wa_gateway::socket::SocketHandle> = Arc::from(socket);

        let meta = SessionMeta::new(session_id.clone(), req.user_id, req.webhook_token);
        let record = SessionRecord {
            meta,
            socket,
            reconnect_cancel: CancellationToken::new(),
        };
        self.store.save(session_id.clone(), record).map_err(DaemonError::gateway)?;

        self.state
            .update_session_status(&*self.sink, session_id.clone(), ReportedStatus::Connecting, OutboundPriority::Normal)
            .await;

        self.spawn_supervisor(session_id.clone(), events);

        Ok(StartResult { session_id })
    }

    /// Dials a fresh socket for a session that already exists and swaps it
    /// in, used by the reconnect worker via [`SessionControl::start_session`].
    async fn restart_session(self: &Arc<Self>, session_id: &SessionId) -> GatewayResult<()> {
        let mut socket = self
            .socket_factory
            .create_socket(session_id)
            .await
            .map_err(|_| wa_gateway::GatewayError::session_not_connected(session_id.clone()))?;
        let events = socket.events();
        let socket: Arc<dyn wa_gateway::socket::SocketHandle> = Arc::from(socket);

        if !self.store.replace_socket(session_id, socket).await {
            return Err(wa_gateway::GatewayError::session_not_found(session_id.clone()));
        }

        self.spawn_supervisor(session_id.clone(), events);
        Ok(())
    }

    /// Requests a fresh socket dial for a session without touching its auth
    /// or record, for soft-failure paths (e.g. a stalled heartbeat) that
    /// shouldn't tear the session down the way [`Self::delete_session`] does.
    pub async fn request_reconnect(self: &Arc<Self>, session_id: &SessionId) -> Result<()> {
        self.restart_session(session_id).await.map_err(DaemonError::gateway)
    }

    async fn evict(&self, session_id: &SessionId, preserve_auth: bool) {
        let _ = self.store.delete(session_id, preserve_auth).await;
        self.clear_pending(session_id);
        self.state
            .update_session_status(&*self.sink, session_id.clone(), ReportedStatus::Inactive, OutboundPriority::High)
            .await;
    }

    pub async fn delete_session(&self, session_id: &SessionId) -> Result<DeleteResult> {
        if !self.store.has(session_id) {
            return Err(DaemonError::session_not_found(session_id.clone()));
        }
        self.evict(session_id, false).await;
        self.state
            .record_transition(&*self.sink, session_id.clone(), "session_deleted", serde_json::json!({}))
            .await;
        Ok(DeleteResult {
            session_id: session_id.clone(),
            removed: true,
        })
    }

    pub fn session_info(&self, session_id: &SessionId) -> SessionInfo {
        let exists = self.store.has(session_id);
        let (connected, user) = self
            .store
            .with_record(session_id, |r| (r.socket.has_user(), r.meta.user_id.clone()))
            .unwrap_or((false, String::new()));

        SessionInfo {
            session_id: session_id.clone(),
            exists,
            connected,
            user: exists.then_some(user),
        }
    }

    pub fn list_sessions(&self) -> SessionsOverview {
        SessionsOverview {
            active: self.store.list(),
            pending: self.pending_sessions(),
        }
    }

    pub async fn send_message(&self, req: SendMessageRequest) -> Result<SendResult> {
        let Some(socket) = self.store.socket(&req.session_id) else {
            return Err(DaemonError::session_not_found(req.session_id));
        };

        let session_id = req.session_id.clone();
        let send_req = wa_gateway::sender::SendRequest {
            session_id: req.session_id,
            wa_id: req.wa_id,
            kind: req.kind,
            body: req.body,
            media_url: req.media_url,
            caption: req.caption,
            filename: req.filename,
        };

        self.sender
            .send(socket.as_ref(), send_req)
            .await
            .map_err(DaemonError::gateway)?;
        self.store.update_activity(&session_id);
        Ok(SendResult { session_id })
    }

    pub async fn send_text(&self, session_id: SessionId, to: String, message: String) -> Result<SendResult> {
        self.send_message(SendMessageRequest {
            session_id,
            wa_id: to,
            kind: "text".to_owned(),
            body: Some(message),
            media_url: None,
            caption: None,
            filename: None,
        })
        .await
    }

    pub fn health(&self) -> HealthReport {
        HealthReport {
            uptime_secs: self.started_at.elapsed().as_secs(),
            session_count: self.store.len(),
            pending_count: self.pending_since.len(),
        }
    }

    pub fn batch_metrics(&self) -> BatchMetricsSnapshot {
        self.batcher.metrics()
    }

    pub fn cache_metrics(&self) -> CacheMetrics {
        CacheMetrics {
            tracked_sessions: self.store.len(),
            pending_sessions: self.pending_since.len(),
        }
    }

    pub async fn cleanup_inactive_sessions(&self) -> Vec<SessionId> {
        self.store.sweep_idle(chrono::Duration::from_std(self.config.idle_ttl()).unwrap_or(chrono::Duration::zero())).await
    }

    pub async fn cleanup_pending_sessions(&self, pending_timeout: std::time::Duration) -> Vec<SessionId> {
        let cutoff = now() - chrono::Duration::from_std(pending_timeout).unwrap_or(chrono::Duration::zero());
        let stale: Vec<SessionId> = self
            .pending_since
            .iter()
            .filter(|e| *e.value() < cutoff)
            .map(|e| e.key().clone())
            .collect();

        for id in &stale {
            self.evict(id, false).await;
        }
        stale
    }

    /// Boot restoration: one `start_session` per account the control
    /// plane reports active, bounded to `concurrency` in flight at once.
    pub async fn restore_active_sessions(self: &Arc<Self>, concurrency: usize) -> (usize, usize) {
        let accounts = match self.control.active_accounts().await {
            Ok(accounts) => accounts,
            Err(err) => {
                tracing::error!(error = %err, "failed to fetch active accounts for boot restoration");
                return (0, 0);
            }
        };

        let mut started = 0usize;
        let mut failed = 0usize;
        for chunk in accounts.chunks(concurrency.max(1)) {
            let results = futures_util::future::join_all(chunk.iter().map(|account| {
                let this = Arc::clone(self);
                let session_id = SessionId::new(account.session_id.clone());
                let user_id = account.user_id.clone();
                let webhook_token = account.webhook_token.clone();
                async move {
                    this.start_session(StartRequest {
                        user_id,
                        webhook_token,
                        session_id: Some(session_id),
                    })
                    .await
                }
            }))
            .await;

            for result in results {
                match result {
                    Ok(_) => started += 1,
                    Err(_) => failed += 1,
                }
            }
        }

        tracing::info!(started, failed, total = started + failed, "boot restoration complete");
        (started, failed)
    }

    /// Graceful shutdown sequence: flush the batcher, close every
    /// session while preserving auth, then drain the inbound queue.
    pub async fn shutdown(&self, grace: std::time::Duration) {
        let started = Instant::now();
        self.batcher.flush_all().await;
        tracing::info!(elapsed_ms = started.elapsed().as_millis() as u64, "batcher flushed");

        let started = Instant::now();
        self.store.close_all_preserving_auth().await;
        tracing::info!(elapsed_ms = started.elapsed().as_millis() as u64, "sessions closed, auth preserved");

        let started = Instant::now();
        self.inbound.shutdown(grace).await;
        tracing::info!(elapsed_ms = started.elapsed().as_millis() as u64, "inbound queue drained");
    }

    fn spawn_supervisor(self: &Arc<Self>, session_id: SessionId, events: SocketEventStream) {
        let manager = Arc::clone(self);
        tokio::spawn(async move {
            manager.run_supervisor(session_id, events).await;
        });
    }

    /// One task per live socket: routes each event to the QrController,
    /// ConnectionManager, or InboundQueue, and exits once the socket's own
    /// event stream ends.
    async fn run_supervisor(&self, session_id: SessionId, mut events: SocketEventStream) {
        while let Some(event) = events.next().await {
            match event {
                SocketEvent::ConnectionUpdate { state, qr, close } => {
                    if let Some(qr_code) = qr {
                        self.qr.handle(session_id.clone(), qr_code, state).await;
                        self.mark_pending(session_id.clone());
                    }

                    match state {
                        ConnectionState::Open => {
                            self.clear_pending(&session_id);
                            self.store.update_activity(&session_id);
                            self.connection.on_open(session_id.clone(), &self.qr).await;
                        }
                        ConnectionState::Close => {
                            let already = self.store.is_reconnecting(&session_id);
                            if let Some(cancel) = self.connection.on_close(session_id.clone(), close, already).await {
                                self.store.set_reconnecting(&session_id, cancel);
                            }
                            return;
                        }
                        ConnectionState::Connecting => {}
                    }
                }
                SocketEvent::MessagesUpsert { raw } => {
                    self.store.update_activity(&session_id);
                    if let Err(err) = self.inbound.enqueue(session_id.clone(), raw).await {
                        tracing::warn!(session_id = %session_id, error = %err, "failed to enqueue inbound message");
                    }
                }
                SocketEvent::CredsUpdate => {
                    tracing::debug!(session_id = %session_id, "credentials updated");
                }
            }
        }
    }
}

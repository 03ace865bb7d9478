//! The abstract connection to the WhatsApp protocol library.
//!
//! The upstream protocol library wires handlers through callbacks
//! (`on_connection_update`, `on_messages`, `on_creds_update`); this crate
//! instead exposes it as a [`Stream`] of [`SocketEvent`], consumed by a
//! dedicated supervisor task per session. This makes the reconnect invariant
//! trivially checkable: at most one task ever reads a given session's
//! events at a time.

use async_trait::async_trait;
use futures_util::stream::Stream;
use std::path::PathBuf;
use std::pin::Pin;
use tokio::sync::OnceCell;
use wa_model::SessionId;

/// A connection-state transition reported by the underlying transport.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConnectionState {
    Connecting,
    Open,
    Close,
}

/// The reason a connection closed, when known.
#[derive(Debug, Clone, Copy, Default)]
pub struct CloseReason {
    pub status_code: Option<u16>,
}

/// One event emitted by a [`SocketHandle`].
#[derive(Debug, Clone)]
pub enum SocketEvent {
    ConnectionUpdate {
        state: ConnectionState,
        qr: Option<String>,
        close: Option<CloseReason>,
    },
    MessagesUpsert {
        raw: serde_json::Value,
    },
    CredsUpdate,
}

pub type SocketEventStream = Pin<Box<dyn Stream<Item = SocketEvent> + Send>>;

/// A live connection to the protocol library for one session.
///
/// Implementations wrap whatever handle the protocol library hands back;
/// this crate only depends on this trait, never on a concrete transport, so
/// the protocol library stays an external, swappable collaborator.
#[async_trait]
pub trait SocketHandle: Send + Sync {
    /// Consumes the handle's event stream. Called exactly once per handle by
    /// the owning supervisor task.
    fn events(&mut self) -> SocketEventStream;

    /// Sends a typed outbound message. Returns `Err` if the socket has no
    /// paired user or the transport rejects the send.
    async fn send_message(&self, envelope: OutboundEnvelope) -> Result<(), SocketSendError>;

    /// Best-effort logout; errors are ignored by callers.
    async fn close(&self);

    /// Whether this socket has completed pairing (has a bound user).
    fn has_user(&self) -> bool;
}

#[derive(Debug, Clone)]
pub struct OutboundEnvelope {
    pub wa_id: String,
    pub kind: String,
    pub body: Option<String>,
    pub media_url: Option<String>,
    pub caption: Option<String>,
    pub filename: Option<String>,
}

#[derive(Debug)]
pub struct SocketSendError(pub String);

impl std::fmt::Display for SocketSendError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

impl std::error::Error for SocketSendError {}

/// Credential state loaded from (or freshly created under) a session's auth
/// directory.
#[derive(Debug, Clone, Default)]
pub struct AuthState {
    pub creds_path: PathBuf,
}

/// Capability to persist updated credentials back to disk, handed to a
/// socket implementation by [`SocketFactory::create_socket`].
#[async_trait]
pub trait PersistCreds: Send + Sync {
    async fn save(&self) -> std::io::Result<()>;
}

/// Dials the protocol library itself. Kept as a trait the integrator
/// supplies — the protocol library is an external collaborator this crate
/// never links against directly, only its `SocketHandle` interface.
#[async_trait]
pub trait ProtocolConnector: Send + Sync {
    async fn connect(
        &self,
        session_id: &SessionId,
        auth: AuthState,
        protocol_version: &str,
    ) -> std::io::Result<Box<dyn SocketHandle>>;
}

/// Creates and tears down [`SocketHandle`]s for a session.
///
/// Memoizes the protocol version lookup per process the way `DayLimiter`
/// memoizes its own per-process HTTP round trip, since both are
/// expensive calls whose result is valid for the lifetime of the process.
pub struct SocketFactory {
    auth_root: PathBuf,
    protocol_version: OnceCell<String>,
    connector: std::sync::Arc<dyn ProtocolConnector>,
}

impl SocketFactory {
    pub fn new(auth_root: impl Into<PathBuf>, connector: std::sync::Arc<dyn ProtocolConnector>) -> Self {
        Self {
            auth_root: auth_root.into(),
            protocol_version: OnceCell::new(),
            connector,
        }
    }

    fn session_dir(&self, session_id: &SessionId) -> PathBuf {
        self.auth_root.join(session_id.as_str())
    }

    /// Resolves the session's auth directory, creating it if absent, and
    /// loads its credential state. Fails fatally only on directory-creation
    /// or credential-load I/O errors.
    pub async fn prepare_auth(&self, session_id: &SessionId) -> std::io::Result<AuthState> {
        let dir = self.session_dir(session_id);
        tokio::fs::create_dir_all(&dir).await?;
        Ok(AuthState {
            creds_path: dir.join("creds.json"),
        })
    }

    /// Returns the protocol version, fetching it once per process.
    pub async fn protocol_version(&self) -> &str {
        self.protocol_version
            .get_or_init(|| async { fetch_protocol_version().await })
            .await
    }

    /// Prepares auth state, resolves the protocol version, and dials the
    /// connector — the full C1 construction sequence.
    pub async fn create_socket(&self, session_id: &SessionId) -> std::io::Result<Box<dyn SocketHandle>> {
        let auth = self.prepare_auth(session_id).await?;
        let protocol_version = self.protocol_version().await.to_owned();
        self.connector.connect(session_id, auth, &protocol_version).await
    }
}

async fn fetch_protocol_version() -> String {
    "2.2413.51".to_owned()
}

//! Facade-level errors returned by [`crate::facade::WhatsAppManager`]'s
//! public operations, in the same `{kind, source}` shape every other
//! crate in the workspace uses.

use std::error::Error as StdError;
use std::fmt::{self, Display, Formatter};
use wa_model::SessionId;

pub type Result<T, E = DaemonError> = std::result::Result<T, E>;

#[derive(Debug)]
pub struct DaemonError {
    kind: DaemonErrorType,
    source: Option<Box<dyn StdError + Send + Sync>>,
}

impl DaemonError {
    pub fn kind(&self) -> &DaemonErrorType {
        &self.kind
    }

    pub fn session_not_found(session_id: SessionId) -> Self {
        Self {
            kind: DaemonErrorType::SessionNotFound { session_id },
            source: None,
        }
    }

    pub fn session_not_connected(session_id: SessionId) -> Self {
        Self {
            kind: DaemonErrorType::SessionNotConnected { session_id },
            source: None,
        }
    }

    pub fn gateway(source: wa_gateway::GatewayError) -> Self {
        let kind = match source.kind() {
            wa_gateway::GatewayErrorType::SessionNotFound { session_id } => DaemonErrorType::SessionNotFound {
                session_id: session_id.clone(),
            },
            wa_gateway::GatewayErrorType::SessionNotConnected { session_id } => DaemonErrorType::SessionNotConnected {
                session_id: session_id.clone(),
            },
            wa_gateway::GatewayErrorType::MaxSessions { limit } => DaemonErrorType::MaxSessions { limit: *limit },
            _ => DaemonErrorType::Internal,
        };
        Self {
            kind,
            source: Some(Box::new(source)),
        }
    }

    pub fn control_plane(source: wa_control_client::Error) -> Self {
        Self {
            kind: DaemonErrorType::ControlPlane,
            source: Some(Box::new(source)),
        }
    }

    pub fn socket_io(session_id: SessionId, source: std::io::Error) -> Self {
        Self {
            kind: DaemonErrorType::SessionNotConnected { session_id },
            source: Some(Box::new(source)),
        }
    }
}

#[derive(Debug)]
#[non_exhaustive]
pub enum DaemonErrorType {
    SessionNotFound { session_id: SessionId },
    SessionNotConnected { session_id: SessionId },
    MaxSessions { limit: usize },
    ControlPlane,
    Internal,
}

impl Display for DaemonError {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        match &self.kind {
            DaemonErrorType::SessionNotFound { session_id } => write!(f, "no session with id {session_id}"),
            DaemonErrorType::SessionNotConnected { session_id } => {
                write!(f, "session {session_id} has no connected socket")
            }
            DaemonErrorType::MaxSessions { limit } => write!(f, "refusing to start a new session: at the cap of {limit}"),
            DaemonErrorType::ControlPlane => write!(f, "control plane request failed"),
            DaemonErrorType::Internal => write!(f, "internal facade error"),
        }
    }
}

impl StdError for DaemonError {
    fn source(&self) -> Option<&(dyn StdError + 'static)> {
        self.source.as_deref().map(|s| s as &(dyn StdError + 'static))
    }
}

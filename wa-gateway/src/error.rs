//! Errors surfaced by facade operations on [`crate::store::SessionStore`] and
//! [`crate::sender::MessageSender`].

use std::error::Error as StdError;
use std::fmt::{self, Display, Formatter};
use wa_model::SessionId;

pub type Result<T, E = GatewayError> = std::result::Result<T, E>;

#[derive(Debug)]
pub struct GatewayError {
    kind: GatewayErrorType,
    source: Option<Box<dyn StdError + Send + Sync>>,
}

impl GatewayError {
    pub fn kind(&self) -> &GatewayErrorType {
        &self.kind
    }

    pub fn into_source(self) -> Option<Box<dyn StdError + Send + Sync>> {
        self.source
    }

    pub fn session_not_found(session_id: SessionId) -> Self {
        Self {
            kind: GatewayErrorType::SessionNotFound { session_id },
            source: None,
        }
    }

    pub fn session_not_connected(session_id: SessionId) -> Self {
        Self {
            kind: GatewayErrorType::SessionNotConnected { session_id },
            source: None,
        }
    }

    pub fn max_sessions(limit: usize) -> Self {
        Self {
            kind: GatewayErrorType::MaxSessions { limit },
            source: None,
        }
    }

    pub fn unsupported_type(type_name: String) -> Self {
        Self {
            kind: GatewayErrorType::UnsupportedType { type_name },
            source: None,
        }
    }

    pub fn auth_io(session_id: SessionId, source: std::io::Error) -> Self {
        Self {
            kind: GatewayErrorType::AuthIo { session_id },
            source: Some(Box::new(source)),
        }
    }
}

#[derive(Debug)]
#[non_exhaustive]
pub enum GatewayErrorType {
    SessionNotFound { session_id: SessionId },
    SessionNotConnected { session_id: SessionId },
    MaxSessions { limit: usize },
    UnsupportedType { type_name: String },
    AuthIo { session_id: SessionId },
}

impl Display for GatewayError {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        match &self.kind {
            GatewayErrorType::SessionNotFound { session_id } => {
                write!(f, "no session with id {session_id}")
            }
            GatewayErrorType::SessionNotConnected { session_id } => {
                write!(f, "session {session_id} has no connected socket")
            }
            GatewayErrorType::MaxSessions { limit } => {
                write!(f, "refusing to start a new session: at the cap of {limit}")
            }
            GatewayErrorType::UnsupportedType { type_name } => {
                write!(f, "unsupported outbound message type: {type_name}")
            }
            GatewayErrorType::AuthIo { session_id } => {
                write!(f, "auth directory i/o failed for session {session_id}")
            }
        }
    }
}

impl StdError for GatewayError {
    fn source(&self) -> Option<&(dyn StdError + 'static)> {
        self.source.as_deref().map(|s| s as &(dyn StdError + 'static))
    }
}

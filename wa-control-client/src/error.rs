use std::error::Error as StdError;
use std::fmt::{self, Display, Formatter};

pub type Result<T, E = Error> = std::result::Result<T, E>;

/// Error returned by a [`crate::ControlPlaneClient`] call, shaped after
/// `twilight-http`'s `{kind, source}` split.
#[derive(Debug)]
pub struct Error {
    kind: ErrorType,
    source: Option<Box<dyn StdError + Send + Sync>>,
}

impl Error {
    pub fn kind(&self) -> &ErrorType {
        &self.kind
    }

    pub(crate) fn transport(source: reqwest::Error) -> Self {
        Self {
            kind: ErrorType::Transport,
            source: Some(Box::new(source)),
        }
    }

    pub(crate) fn response(status: u16, body: String) -> Self {
        Self {
            kind: ErrorType::Response { status, body },
            source: None,
        }
    }

    pub(crate) fn decoding(source: serde_json::Error) -> Self {
        Self {
            kind: ErrorType::Decoding,
            source: Some(Box::new(source)),
        }
    }

    /// Whether the call is worth retrying: transport-level failures and
    /// `429`/`5xx` responses are retriable, every other 4xx is permanent.
    pub fn is_retriable(&self) -> bool {
        match &self.kind {
            ErrorType::Transport => true,
            ErrorType::Response { status, .. } => *status == 429 || *status >= 500,
            ErrorType::Decoding => false,
        }
    }
}

impl wa_ratelimit::Retriable for Error {
    fn is_retriable(&self) -> bool {
        Error::is_retriable(self)
    }
}

#[derive(Debug)]
#[non_exhaustive]
pub enum ErrorType {
    Transport,
    Response { status: u16, body: String },
    Decoding,
}

impl Display for Error {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        match &self.kind {
            ErrorType::Transport => f.write_str("request to the control plane failed in transit"),
            ErrorType::Response { status, body } => {
                write!(f, "control plane responded with status {status}: {body}")
            }
            ErrorType::Decoding => f.write_str("control plane response body could not be decoded"),
        }
    }
}

impl StdError for Error {
    fn source(&self) -> Option<&(dyn StdError + 'static)> {
        self.source.as_deref().map(|s| s as &(dyn StdError + 'static))
    }
}

use std::fmt;

use thiserror::Error;

/// A producer failure as seen by the controllers.
///
/// Controllers store it without interpreting `kind`; the kind exists so a
/// front end can word its message.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("{kind}: {message}")]
pub struct FetchError {
    pub kind: FailureKind,
    pub message: String,
}

impl FetchError {
    pub fn new(kind: FailureKind, message: impl Into<String>) -> Self {
        Self {
            kind,
            message: message.into(),
        }
    }

    pub fn other(message: impl Into<String>) -> Self {
        Self::new(FailureKind::Other, message)
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FailureKind {
    InvalidUrl,
    HttpStatus(u16),
    Timeout,
    Network,
    Decode,
    /// The producer task ended without returning (panic or runtime shutdown).
    Aborted,
    Other,
}

impl fmt::Display for FailureKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FailureKind::InvalidUrl => write!(f, "invalid url"),
            FailureKind::HttpStatus(code) => write!(f, "http status {code}"),
            FailureKind::Timeout => write!(f, "timeout"),
            FailureKind::Network => write!(f, "network error"),
            FailureKind::Decode => write!(f, "invalid response body"),
            FailureKind::Aborted => write!(f, "aborted"),
            FailureKind::Other => write!(f, "fetch failed"),
        }
    }
}

#[derive(Debug, Error)]
pub enum ControllerError {
    #[error("controllers must be created inside a Tokio runtime")]
    NoRuntime,
}

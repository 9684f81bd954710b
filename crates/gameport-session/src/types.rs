use std::fmt;

use crate::error::ConnectionError;

/// Class of a failed connection attempt.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum FailureKind {
    TransportOpen,
    TransportRead,
    SinkAcquisition,
    SinkWrite,
}

/// Cloneable description of a failed connection attempt.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Failure {
    pub kind: FailureKind,
    pub message: Box<str>,
}

impl From<&ConnectionError> for Failure {
    fn from(err: &ConnectionError) -> Self {
        let kind = match err {
            ConnectionError::TransportOpen(_) => FailureKind::TransportOpen,
            ConnectionError::TransportRead(_) => FailureKind::TransportRead,
            ConnectionError::SinkAcquisition(_) => FailureKind::SinkAcquisition,
            ConnectionError::SinkWrite(_) => FailureKind::SinkWrite,
        };
        Self {
            kind,
            message: err.to_string().into(),
        }
    }
}

impl fmt::Display for Failure {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.message)
    }
}

/// Lifecycle state of a [`ConnectionSession`](crate::ConnectionSession).
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum SessionState {
    #[default]
    Idle,
    Connecting,
    Connected,
    Disconnecting,
    /// The last attempt failed; a retry is pending.
    Failed(Failure),
}

impl SessionState {
    pub fn is_idle(&self) -> bool {
        matches!(self, SessionState::Idle)
    }

    pub fn is_connected(&self) -> bool {
        matches!(self, SessionState::Connected)
    }
}

impl fmt::Display for SessionState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SessionState::Idle => f.write_str("idle"),
            SessionState::Connecting => f.write_str("connecting"),
            SessionState::Connected => f.write_str("connected"),
            SessionState::Disconnecting => f.write_str("disconnecting"),
            SessionState::Failed(failure) => write!(f, "failed: {failure}"),
        }
    }
}

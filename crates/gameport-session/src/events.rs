use std::fmt;
use std::time::Duration;

use crossbeam_channel::Receiver;
use gameport_core::RejectReason;

use crate::types::{Failure, SessionState};

/// Events broadcast by a session to its subscribers.
#[derive(Debug, Clone, PartialEq)]
pub enum SessionEvent {
    /// The session moved to a new state.
    StateChanged(SessionState),
    /// Human readable diagnostic.
    Log(LogEvent),
}

/// Diagnostics emitted while a session runs.
#[derive(Debug, Clone, PartialEq)]
pub enum LogEvent {
    Connecting { port: Box<str> },
    Connected { port: Box<str> },
    /// A line as received, before parsing.
    Raw(Box<str>),
    /// A line was skipped; the session keeps running.
    Skipped(RejectReason),
    /// The current attempt failed.
    Error(Failure),
    Retrying { delay: Duration },
    RetriesExhausted { attempts: u32 },
    Disconnected,
}

impl LogEvent {
    /// Severity to use when forwarding the event to a logger.
    pub fn level(&self) -> log::Level {
        match self {
            LogEvent::Raw(_) => log::Level::Debug,
            LogEvent::Skipped(_) => log::Level::Warn,
            LogEvent::Error(_) | LogEvent::RetriesExhausted { .. } => log::Level::Error,
            _ => log::Level::Info,
        }
    }
}

impl fmt::Display for LogEvent {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            LogEvent::Connecting { port } => write!(f, "[INFO] Connecting to {port}..."),
            LogEvent::Connected { port } => {
                write!(f, "[OK] Connected to {port} and reading data")
            }
            LogEvent::Raw(line) => write!(f, "[RAW] {line}"),
            LogEvent::Skipped(reason) => write!(f, "[SKIP] {reason}"),
            LogEvent::Error(failure) => write!(f, "[ERROR] {failure}"),
            LogEvent::Retrying { delay } => write!(f, "[INFO] Retrying in {delay:?}..."),
            LogEvent::RetriesExhausted { attempts } => {
                write!(f, "[ERROR] Giving up after {attempts} failed attempts")
            }
            LogEvent::Disconnected => f.write_str("[INFO] Disconnected"),
        }
    }
}

/// Receiving end for session events subscription.
pub type EventReceiver = Receiver<SessionEvent>;

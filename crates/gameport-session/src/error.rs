use std::io;

use thiserror::Error;

/// Error type for serial transport operations.
#[derive(Debug, Error)]
pub enum TransportError {
    /// The port is busy, missing or cannot be configured.
    #[error("failed to open {port}: {source}")]
    Open {
        port: String,
        #[source]
        source: io::Error,
    },
    /// I/O error while reading from an open port.
    #[error("read failed: {0}")]
    Read(#[from] io::Error),
    /// The remote end hung up.
    #[error("port closed")]
    Closed,
    /// Ports could not be listed.
    #[error("failed to enumerate serial ports: {0}")]
    Enumerate(#[source] io::Error),
}

/// Error type for virtual joystick operations.
#[derive(Debug, Error)]
pub enum SinkError {
    /// The virtual device could not be created or acquired.
    #[error("failed to acquire virtual joystick {device_id}: {source}")]
    Acquire {
        device_id: u32,
        #[source]
        source: io::Error,
    },
    /// The device rejected an update.
    #[error("failed to emit event: {0}")]
    Write(#[source] io::Error),
    /// No virtual joystick backend on this platform.
    #[error("virtual joystick is not supported on this platform")]
    Unsupported,
}

/// Failure of a single connection attempt. Every variant is retried.
#[derive(Debug, Error)]
pub enum ConnectionError {
    #[error("transport open failed: {0}")]
    TransportOpen(#[source] TransportError),
    #[error("reading failed: {0}")]
    TransportRead(#[source] TransportError),
    #[error("virtual device unavailable: {0}")]
    SinkAcquisition(#[source] SinkError),
    #[error("virtual device rejected update: {0}")]
    SinkWrite(#[source] SinkError),
}

/// Error type for session control requests.
#[derive(Debug, Error)]
pub enum SessionError {
    /// `start` was called while a session worker is alive.
    #[error("session is already running on {0}")]
    AlreadyRunning(String),
    /// The worker thread could not be spawned.
    #[error("failed to spawn session worker: {0}")]
    Spawn(#[from] io::Error),
}

/// Convenient result alias for session control operations.
pub type Result<T> = std::result::Result<T, SessionError>;

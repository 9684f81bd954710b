mod config;
mod error;
mod events;
mod runtime;
mod session;
mod sink;
mod transport;
mod types;
#[cfg(target_os = "linux")]
mod uinput;

pub use crate::config::SessionConfig;
pub use crate::error::{ConnectionError, Result, SessionError, SinkError, TransportError};
pub use crate::events::{EventReceiver, LogEvent, SessionEvent};
pub use crate::session::ConnectionSession;
pub use crate::sink::{DeviceSink, SinkProvider};
pub use crate::transport::{
    list_ports, Connector, PortInfo, SerialConnector, SerialTransport, Transport,
};
pub use crate::types::{Failure, FailureKind, SessionState};
#[cfg(target_os = "linux")]
pub use crate::uinput::{UinputJoystick, UinputProvider};

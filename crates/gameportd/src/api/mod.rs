mod unix_sock;

use std::thread::JoinHandle;

pub(crate) use unix_sock::UnixSocket;

use bitcode::{Decode, Encode};
use crossbeam_channel::Sender;
use gameport_core::AxisPolicy;
use thiserror::Error;

/// Error type for api operations.
#[derive(Error, Debug)]
pub(crate) enum ApiError {
    #[error("socket error: {0}")]
    IoError(#[from] std::io::Error),
    #[error("failed to decode command: {0}")]
    Decode(#[from] bitcode::Error),
    #[error("daemon rejected command: {0}")]
    Rejected(String),
}

/// Convenient result alias for api operations.
pub(crate) type ApiResult<T> = std::result::Result<T, ApiError>;

/// gameportd api control command.
#[derive(Encode, Decode, Debug, Clone, PartialEq, Eq)]
pub(crate) enum Command {
    /// Change some policy flags; `None` keeps the current value.
    Policy {
        swap: Option<bool>,
        axis1: Option<bool>,
        axis2: Option<bool>,
    },
    Connect,
    Disconnect,
}

/// Apply the flags of a policy command on top of `policy`.
pub(crate) fn merge_policy(
    policy: AxisPolicy,
    swap: Option<bool>,
    axis1: Option<bool>,
    axis2: Option<bool>,
) -> AxisPolicy {
    AxisPolicy {
        swap: swap.unwrap_or(policy.swap),
        axis1_enabled: axis1.unwrap_or(policy.axis1_enabled),
        axis2_enabled: axis2.unwrap_or(policy.axis2_enabled),
    }
}

/// gameportd api events transport.
/// listener that can receive api commands from the outer world,
/// and sender that can send api commands from the outer world to the gameportd.
pub(crate) trait ApiTransport {
    fn listen_events(&self, tx: Sender<Command>) -> ApiResult<JoinHandle<()>>;
    fn send_event(&self, event: &Command) -> ApiResult<()>;
}

use std::path::PathBuf;
use std::time::Duration;

use clap::{Args, Parser, Subcommand, ValueEnum};
use gameport_core::AxisPolicy;
use gameport_session::SessionConfig;

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub(crate) enum Switch {
    On,
    Off,
}

impl From<Switch> for bool {
    fn from(value: Switch) -> Self {
        value == Switch::On
    }
}

#[derive(Debug, Args, PartialEq)]
pub(crate) struct RunArgs {
    /// Serial port of the board. Defaults to the first available port
    #[arg(short, long)]
    pub port: Option<String>,

    /// Serial baud rate
    #[arg(short, long, default_value_t = SessionConfig::DEFAULT_BAUD_RATE)]
    pub baud: u32,

    /// Swap axis 1 (X1, Y1) with axis 2 (X2, Y2)
    #[arg(long)]
    pub swap: bool,

    /// Keep axis 1 (X, Y) centered
    #[arg(long)]
    pub disable_axis1: bool,

    /// Keep axis 2 (Z, RX) centered
    #[arg(long)]
    pub disable_axis2: bool,

    /// Virtual joystick id
    #[arg(long, default_value_t = SessionConfig::DEFAULT_DEVICE_ID)]
    pub device_id: u32,

    /// Delay between reconnect attempts, in milliseconds
    #[arg(long, default_value_t = 3000)]
    pub retry_delay_ms: u64,

    /// Give up after this many consecutive failed attempts
    #[arg(long)]
    pub max_retries: Option<u32>,

    /// Log mapped values instead of creating a virtual joystick
    #[arg(long)]
    pub dry_run: bool,
}

impl RunArgs {
    pub fn policy(&self) -> AxisPolicy {
        AxisPolicy {
            swap: self.swap,
            axis1_enabled: !self.disable_axis1,
            axis2_enabled: !self.disable_axis2,
        }
    }

    pub fn session_config(&self) -> SessionConfig {
        SessionConfig::default()
            .with_baud_rate(self.baud)
            .with_device_id(self.device_id)
            .with_retry_delay(Duration::from_millis(self.retry_delay_ms))
            .with_max_retries(self.max_retries)
    }
}

#[derive(Debug, Subcommand, PartialEq)]
pub(crate) enum Command {
    /// Bridge the board to a virtual joystick in the foreground.
    Run(RunArgs),
    /// List available serial ports.
    Ports,
    /// Change the axis policy of the running daemon.
    Policy {
        /// Swap axis 1 with axis 2
        #[arg(long, value_enum)]
        swap: Option<Switch>,
        /// Enable axis 1 (X, Y)
        #[arg(long, value_enum)]
        axis1: Option<Switch>,
        /// Enable axis 2 (Z, RX)
        #[arg(long, value_enum)]
        axis2: Option<Switch>,
    },
    /// Reconnect the running daemon to its port.
    Connect,
    /// Disconnect the running daemon from its port.
    Disconnect,
}

/// Bridge a serial gameport adapter to a virtual joystick.
#[derive(Parser)]
#[command(version, about, long_about = None)]
pub(crate) struct Cli {
    /// Turn debugging information on
    #[arg(short, long, global = true)]
    pub verbose: bool,

    /// Disable colored output
    #[arg(long, global = true)]
    pub no_color: bool,

    /// Directory holding the control socket. Defaults to the temp directory
    #[arg(long, global = true)]
    pub runtime_dir: Option<PathBuf>,

    /// The command to run
    #[clap(subcommand)]
    pub command: Command,
}

impl Cli {
    pub fn runtime_dir(&self) -> PathBuf {
        self.runtime_dir.clone().unwrap_or_else(std::env::temp_dir)
    }
}

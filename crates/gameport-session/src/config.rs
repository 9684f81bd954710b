use std::time::Duration;

/// Connection parameters of a session.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SessionConfig {
    /// Serial baud rate.
    pub baud_rate: u32,
    /// Upper bound of a single blocking read. Also bounds how long a stop
    /// request may wait for the read loop.
    pub read_timeout: Duration,
    /// Pause after opening the port, while the board resets.
    pub settle_delay: Duration,
    /// Fixed pause between a failed attempt and the next one.
    pub retry_delay: Duration,
    /// Numeric id of the virtual joystick.
    pub device_id: u32,
    /// Consecutive failed attempts tolerated before giving up.
    /// `None` retries forever.
    pub max_retries: Option<u32>,
}

impl SessionConfig {
    pub const DEFAULT_BAUD_RATE: u32 = 9600;
    pub const DEFAULT_DEVICE_ID: u32 = 1;
    pub const DEFAULT_READ_TIMEOUT: Duration = Duration::from_secs(1);
    pub const DEFAULT_SETTLE_DELAY: Duration = Duration::from_secs(2);
    pub const DEFAULT_RETRY_DELAY: Duration = Duration::from_secs(3);

    pub fn with_baud_rate(mut self, baud_rate: u32) -> Self {
        self.baud_rate = baud_rate;
        self
    }

    pub fn with_read_timeout(mut self, timeout: Duration) -> Self {
        self.read_timeout = timeout;
        self
    }

    pub fn with_settle_delay(mut self, delay: Duration) -> Self {
        self.settle_delay = delay;
        self
    }

    pub fn with_retry_delay(mut self, delay: Duration) -> Self {
        self.retry_delay = delay;
        self
    }

    pub fn with_device_id(mut self, device_id: u32) -> Self {
        self.device_id = device_id;
        self
    }

    pub fn with_max_retries(mut self, max_retries: Option<u32>) -> Self {
        self.max_retries = max_retries;
        self
    }
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            baud_rate: Self::DEFAULT_BAUD_RATE,
            read_timeout: Self::DEFAULT_READ_TIMEOUT,
            settle_delay: Self::DEFAULT_SETTLE_DELAY,
            retry_delay: Self::DEFAULT_RETRY_DELAY,
            device_id: Self::DEFAULT_DEVICE_ID,
            max_retries: None,
        }
    }
}

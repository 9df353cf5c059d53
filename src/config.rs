//! Polling configuration.

use std::time::Duration;

use uuid::Uuid;

use crate::transport::{NOTIFY_UUID, WRITE_UUID};

/// Default interval between poll cycles.
pub const DEFAULT_POLL_INTERVAL: Duration = Duration::from_secs(20);

/// Default time to wait for one command's response.
pub const DEFAULT_RESPONSE_TIMEOUT: Duration = Duration::from_secs(5);

/// Default bound on connecting and subscribing to notifications.
pub const DEFAULT_CONNECT_TIMEOUT: Duration = Duration::from_secs(15);

/// Configuration for polling one device.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PollConfig {
    /// BLE address of the device (e.g., "AA:BB:CC:DD:EE:FF").
    pub address: String,
    /// Advertised device name (e.g., "AC3002235000123456").
    pub name: String,
    /// Interval between poll cycles.
    pub poll_interval: Duration,
    /// Time to wait for each command's response.
    pub response_timeout: Duration,
    /// Bound on connecting and subscribing.
    pub connect_timeout: Duration,
    /// Characteristic receiving request frames.
    pub write_characteristic: Uuid,
    /// Characteristic delivering response notifications.
    pub notify_characteristic: Uuid,
}

impl PollConfig {
    /// Creates a new configuration with default settings.
    #[must_use]
    pub fn new(address: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            address: address.into(),
            name: name.into(),
            poll_interval: DEFAULT_POLL_INTERVAL,
            response_timeout: DEFAULT_RESPONSE_TIMEOUT,
            connect_timeout: DEFAULT_CONNECT_TIMEOUT,
            write_characteristic: WRITE_UUID,
            notify_characteristic: NOTIFY_UUID,
        }
    }

    /// Sets the poll interval.
    #[must_use]
    pub const fn poll_interval(mut self, interval: Duration) -> Self {
        self.poll_interval = interval;
        self
    }

    /// Sets the per-command response timeout.
    #[must_use]
    pub const fn response_timeout(mut self, timeout: Duration) -> Self {
        self.response_timeout = timeout;
        self
    }

    /// Sets the connect and subscribe timeout.
    #[must_use]
    pub const fn connect_timeout(mut self, timeout: Duration) -> Self {
        self.connect_timeout = timeout;
        self
    }

    /// Sets the write and notify characteristics.
    #[must_use]
    pub const fn characteristics(mut self, write: Uuid, notify: Uuid) -> Self {
        self.write_characteristic = write;
        self.notify_characteristic = notify;
        self
    }
}

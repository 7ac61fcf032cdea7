//! Bus module - CAN transport
//!
//! Provides:
//! - `BusDriver`, the seam to a physical bus (SocketCAN on Linux)
//! - `Transport`, which owns the driver and the inbound listener thread
//! - `ChannelListener`, which hands inbound frames to the console loop

mod driver;
mod listener;
mod transport;

#[cfg(target_os = "linux")]
mod linux;

pub use driver::*;
pub use listener::*;
pub use transport::*;

#[cfg(target_os = "linux")]
pub use linux::SocketCanDriver;

use std::time::Duration;

/// Channel name that selects loopback mode without touching hardware
pub const LOOPBACK_CHANNEL: &str = "dummy";

/// Configuration for the transport
#[derive(Debug, Clone)]
pub struct TransportConfig {
    /// Read timeout of the listener; bounds how long shutdown waits for it
    pub poll_interval: Duration,
    /// In loopback mode, hand sent frames to the receive path
    pub loopback_echo: bool,
}

impl Default for TransportConfig {
    fn default() -> Self {
        Self {
            poll_interval: Duration::from_millis(100),
            loopback_echo: false,
        }
    }
}

impl TransportConfig {
    pub fn new(poll_interval: Duration) -> Self {
        Self {
            poll_interval,
            ..Default::default()
        }
    }

    pub fn with_loopback_echo(mut self) -> Self {
        self.loopback_echo = true;
        self
    }
}

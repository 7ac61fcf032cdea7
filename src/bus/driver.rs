//! Bus driver trait definitions
//!
//! Defines the interface a physical bus implementation must provide.

use std::time::Duration;
use thiserror::Error;

use crate::protocol::Frame;

/// Errors raised by the transport and its drivers
#[derive(Error, Debug)]
pub enum TransportError {
    #[error("could not connect canbus {channel}: {source}")]
    Connect {
        channel: String,
        #[source]
        source: std::io::Error,
    },

    #[error("Send failed: {0}")]
    Send(#[source] std::io::Error),

    #[error("Receive failed: {0}")]
    Receive(#[source] std::io::Error),

    #[error("Bus fault: {0}")]
    BusFault(String),

    #[error("Frame rejected: {0}")]
    InvalidFrame(String),

    #[error("Bus not connected")]
    NotConnected,

    #[error("Hardware CAN is not supported on this platform")]
    Unsupported,
}

pub type TransportResult<T> = Result<T, TransportError>;

/// A connected bus handle
pub trait BusDriver: Send + Sync {
    /// Transmit a frame without waiting for acknowledgment
    fn send(&self, frame: &Frame) -> TransportResult<()>;

    /// Wait up to the driver's read timeout for the next data frame.
    /// Returns `Ok(None)` when nothing arrived in time.
    fn recv(&self) -> TransportResult<Option<Frame>>;
}

/// Open the hardware driver for `channel`
#[cfg(target_os = "linux")]
pub fn open_driver(channel: &str, read_timeout: Duration) -> TransportResult<Box<dyn BusDriver>> {
    let driver = super::SocketCanDriver::open(channel, read_timeout)?;
    Ok(Box::new(driver))
}

/// Open the hardware driver for `channel`
#[cfg(not(target_os = "linux"))]
pub fn open_driver(_channel: &str, _read_timeout: Duration) -> TransportResult<Box<dyn BusDriver>> {
    Err(TransportError::Unsupported)
}

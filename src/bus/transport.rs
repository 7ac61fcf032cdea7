//! CAN transport
//!
//! Owns the bus handle and the receive thread. Connecting never fails: when
//! the hardware channel cannot be opened the transport degrades to loopback
//! mode so the rest of the console keeps working without a bus.

use parking_lot::Mutex;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::thread::JoinHandle;
use std::time::Duration;

use super::driver::{open_driver, BusDriver, TransportError, TransportResult};
use super::listener::FrameListener;
use super::{TransportConfig, LOOPBACK_CHANNEL};
use crate::protocol::Frame;

/// State of the transport
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TransportState {
    /// Not connected yet, or torn down
    Disconnected,
    /// Attached to a physical (or kernel virtual) bus
    ConnectedHardware,
    /// No bus; sends are accepted and not transmitted
    ConnectedLoopback,
}

struct Link {
    state: TransportState,
    channel: Option<String>,
    driver: Option<Arc<dyn BusDriver>>,
    running: Arc<AtomicBool>,
    receiver: Option<JoinHandle<()>>,
}

impl Link {
    fn disconnected() -> Self {
        Self {
            state: TransportState::Disconnected,
            channel: None,
            driver: None,
            running: Arc::new(AtomicBool::new(false)),
            receiver: None,
        }
    }

    fn loopback(channel: &str) -> Self {
        tracing::info!("canbus {} running in loopback mode", channel);
        Self {
            state: TransportState::ConnectedLoopback,
            channel: Some(channel.to_string()),
            ..Self::disconnected()
        }
    }
}

/// CAN transport
pub struct Transport {
    config: TransportConfig,
    listener: Arc<dyn FrameListener>,
    link: Mutex<Link>,
}

impl Transport {
    /// Create a disconnected transport reporting inbound traffic to `listener`
    pub fn new(config: TransportConfig, listener: Arc<dyn FrameListener>) -> Self {
        Self {
            config,
            listener,
            link: Mutex::new(Link::disconnected()),
        }
    }

    /// Connect to `channel`, falling back to loopback mode on failure.
    ///
    /// Returns the resulting state.
    pub fn connect(&self, channel: &str) -> TransportState {
        let state = self.state();
        if state != TransportState::Disconnected {
            tracing::warn!("Transport already connected, ignoring connect to {}", channel);
            return state;
        }

        if channel == LOOPBACK_CHANNEL {
            return self.enter_loopback(channel);
        }

        match open_driver(channel, self.config.poll_interval) {
            Ok(driver) => self.attach(channel, Arc::from(driver)),
            Err(e) => {
                tracing::warn!("could not connect canbus {}: {}", channel, e);
                self.enter_loopback(channel)
            }
        }
    }

    /// Attach an already opened driver and start the receive thread
    pub fn attach(&self, channel: &str, driver: Arc<dyn BusDriver>) -> TransportState {
        // Held until the new link is installed: only one receive thread per link
        let mut link = self.link.lock();
        if link.state != TransportState::Disconnected {
            tracing::warn!("Transport already connected, ignoring attach to {}", channel);
            return link.state;
        }

        let running = Arc::new(AtomicBool::new(true));
        let spawned = std::thread::Builder::new()
            .name(format!("can-rx-{}", channel))
            .spawn({
                let driver = driver.clone();
                let listener = self.listener.clone();
                let running = running.clone();
                let idle = self.config.poll_interval;
                move || receive_loop(driver, listener, running, idle)
            });

        match spawned {
            Ok(receiver) => {
                *link = Link {
                    state: TransportState::ConnectedHardware,
                    channel: Some(channel.to_string()),
                    driver: Some(driver),
                    running,
                    receiver: Some(receiver),
                };
                tracing::info!("canbus connected on {}", channel);
            }
            Err(e) => {
                tracing::warn!("could not start receiver for {}: {}", channel, e);
                *link = Link::loopback(channel);
            }
        }

        link.state
    }

    fn enter_loopback(&self, channel: &str) -> TransportState {
        let mut link = self.link.lock();
        if link.state != TransportState::Disconnected {
            tracing::warn!("Transport already connected, ignoring connect to {}", channel);
            return link.state;
        }

        *link = Link::loopback(channel);
        link.state
    }

    /// Send a frame. Fire-and-forget: no acknowledgment is awaited.
    pub fn send(&self, frame: &Frame) -> TransportResult<()> {
        tracing::debug!("sending message {}", frame);

        let (state, driver) = {
            let link = self.link.lock();
            (link.state, link.driver.clone())
        };

        match (state, driver) {
            (TransportState::ConnectedHardware, Some(driver)) => driver.send(frame),
            (TransportState::ConnectedLoopback, _) => {
                if self.config.loopback_echo {
                    self.listener.on_frame(frame.clone());
                }
                Ok(())
            }
            _ => Err(TransportError::NotConnected),
        }
    }

    /// Stop the receive thread, then release the bus handle.
    ///
    /// Safe to call when never connected, and more than once.
    pub fn disconnect(&self) {
        let (receiver, driver, channel) = {
            let mut link = self.link.lock();
            link.running.store(false, Ordering::Release);
            let receiver = link.receiver.take();
            let driver = link.driver.take();
            let channel = link.channel.take();
            link.state = TransportState::Disconnected;
            (receiver, driver, channel)
        };

        if let Some(receiver) = receiver {
            if receiver.join().is_err() {
                tracing::error!("Receive thread panicked");
            }
        }
        drop(driver);

        if let Some(channel) = channel {
            tracing::info!("canbus {} disconnected", channel);
        }
    }

    /// [`disconnect`](Self::disconnect) from async code. The join runs on the
    /// blocking pool instead of a runtime worker.
    pub async fn shutdown(self: Arc<Self>) {
        if let Err(e) = tokio::task::spawn_blocking(move || self.disconnect()).await {
            tracing::error!("Transport shutdown failed: {}", e);
        }
    }

    /// True only when attached to hardware
    pub fn is_connected(&self) -> bool {
        self.state() == TransportState::ConnectedHardware
    }

    pub fn state(&self) -> TransportState {
        self.link.lock().state
    }

    pub fn channel(&self) -> Option<String> {
        self.link.lock().channel.clone()
    }
}

impl Drop for Transport {
    fn drop(&mut self) {
        self.disconnect();
    }
}

/// Receive until `running` is cleared. Errors are reported and the loop
/// keeps going.
fn receive_loop(
    driver: Arc<dyn BusDriver>,
    listener: Arc<dyn FrameListener>,
    running: Arc<AtomicBool>,
    idle: Duration,
) {
    tracing::debug!("Receive thread started");

    while running.load(Ordering::Acquire) {
        match driver.recv() {
            Ok(Some(frame)) => listener.on_frame(frame),
            Ok(None) => {}
            Err(e) => {
                tracing::debug!("Bus error: {}", e);
                listener.on_error(e);
                // Back off on persistent faults
                std::thread::sleep(idle);
            }
        }
    }

    tracing::debug!("Receive thread stopped");
}

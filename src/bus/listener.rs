//! Inbound frame delivery
//!
//! The transport reports inbound traffic through [`FrameListener`].
//! [`ChannelListener`] forwards it into a bounded queue drained by a single
//! processing loop, so decode and logging never run on the receive thread.

use tokio::sync::mpsc;
use tokio::sync::mpsc::error::TrySendError;

use super::TransportError;
use crate::protocol::Frame;

/// Capability the transport calls back into
pub trait FrameListener: Send + Sync {
    fn on_frame(&self, frame: Frame);

    fn on_error(&self, error: TransportError);
}

/// Events delivered to the processing loop
#[derive(Debug)]
pub enum BusEvent {
    Frame(Frame),
    Error(TransportError),
}

/// Listener that queues events on a bounded channel
pub struct ChannelListener {
    tx: mpsc::Sender<BusEvent>,
}

impl ChannelListener {
    /// Create a listener and the receiver for its events
    pub fn new(capacity: usize) -> (Self, mpsc::Receiver<BusEvent>) {
        let (tx, rx) = mpsc::channel(capacity.max(1));
        (Self { tx }, rx)
    }

    fn forward(&self, event: BusEvent) {
        // Never block the receive thread on a slow consumer
        match self.tx.try_send(event) {
            Ok(()) => {}
            Err(TrySendError::Full(event)) => {
                tracing::warn!("Event queue full, dropping {:?}", event);
            }
            Err(TrySendError::Closed(_)) => {
                tracing::debug!("Event queue closed");
            }
        }
    }
}

impl FrameListener for ChannelListener {
    fn on_frame(&self, frame: Frame) {
        self.forward(BusEvent::Frame(frame));
    }

    fn on_error(&self, error: TransportError) {
        self.forward(BusEvent::Error(error));
    }
}

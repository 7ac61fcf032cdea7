//! Control module - The operator-facing facade
//!
//! `ControlFacade` composes the registry, the codec and the transport. It is
//! the only entry point the console calls into, and it decodes inbound
//! frames delivered by the transport.

mod command;
mod console;
mod sink;

pub use command::*;
pub use console::*;
pub use sink::*;

use std::sync::Arc;
use thiserror::Error;
use tokio::sync::mpsc;

use crate::bus::{BusEvent, Transport, TransportError};
use crate::protocol::{self, CodecError, Decoded, Frame, MessageType};
use crate::registry::{Listing, MessageRegistry, RegistryError};

/// Errors surfaced to the operator
#[derive(Error, Debug)]
pub enum ControlError {
    #[error(transparent)]
    Registry(#[from] RegistryError),

    #[error(transparent)]
    Codec(#[from] CodecError),

    #[error(transparent)]
    Transport(#[from] TransportError),

    #[error("missing {0}")]
    MissingArgument(&'static str),
}

pub type ControlResult<T> = Result<T, ControlError>;

pub struct ControlFacade {
    registry: Arc<MessageRegistry>,
    transport: Arc<Transport>,
    sink: Arc<dyn LogSink>,
}

impl ControlFacade {
    pub fn new(
        registry: Arc<MessageRegistry>,
        transport: Arc<Transport>,
        sink: Arc<dyn LogSink>,
    ) -> Self {
        Self {
            registry,
            transport,
            sink,
        }
    }

    /// Encode order `name` with `args` and put it on the bus.
    ///
    /// Returns the frame handed to the transport.
    pub fn send_order<S: AsRef<str>>(&self, name: &str, args: &[S]) -> ControlResult<Frame> {
        let schema = self.registry.lookup(name)?;
        let frame = protocol::encode_frame(&schema, args)?;
        self.transport.send(&frame)?;
        Ok(frame)
    }

    /// `args` is `<name> <id> <param:type>...`
    pub fn add_order<S: AsRef<str>>(&self, args: &[S]) -> ControlResult<MessageType> {
        let (name, rest) = args
            .split_first()
            .ok_or(ControlError::MissingArgument("order name"))?;
        let (id, params) = rest
            .split_first()
            .ok_or(ControlError::MissingArgument("order id"))?;

        Ok(self.registry.add(name.as_ref(), id.as_ref(), params)?)
    }

    pub fn list_orders<S: AsRef<str>>(&self, names: &[S]) -> ControlResult<Listing> {
        Ok(self.registry.list(names)?)
    }

    /// Decode an inbound frame and report it
    pub fn on_frame(&self, frame: &Frame) -> Decoded {
        let schema = self.registry.lookup_by_id(frame.arbitration_id);
        let decoded = protocol::decode_frame(schema.as_ref(), frame);

        self.sink
            .log(LogLevel::Debug, &format!("Received Message : {}", frame));
        self.sink
            .log(LogLevel::Info, &format!("Received Message : {}", decoded));
        decoded
    }

    pub fn on_error(&self, error: &TransportError) {
        self.sink.log(LogLevel::Error, &error.to_string());
    }

    /// Process bus events until `shutdown` fires or the event queue closes.
    ///
    /// Events already queued when shutdown fires are still processed.
    pub async fn run(
        &self,
        mut events: mpsc::Receiver<BusEvent>,
        mut shutdown: mpsc::Receiver<()>,
    ) {
        loop {
            tokio::select! {
                event = events.recv() => match event {
                    Some(event) => self.dispatch(event),
                    None => break,
                },
                _ = shutdown.recv() => {
                    while let Ok(event) = events.try_recv() {
                        self.dispatch(event);
                    }
                    break;
                }
            }
        }
        tracing::debug!("Frame loop stopped");
    }

    fn dispatch(&self, event: BusEvent) {
        match event {
            BusEvent::Frame(frame) => {
                self.on_frame(&frame);
            }
            BusEvent::Error(error) => self.on_error(&error),
        }
    }

    pub fn registry(&self) -> &MessageRegistry {
        &self.registry
    }

    pub fn sink(&self) -> &dyn LogSink {
        &*self.sink
    }
}

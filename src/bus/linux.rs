//! Linux CAN driver
//!
//! Uses a raw SocketCAN socket bound to a network interface.
//!
//! Requirements:
//! - The interface must exist and be up (`ip link set can0 up type can bitrate 250000`)
//! - A virtual bus works too: `ip link add dev vcan0 type vcan && ip link set up vcan0`

use bytes::Bytes;
use socketcan::{CanFrame, CanSocket, EmbeddedFrame, ExtendedId, Id, Socket, StandardId};
use std::io::ErrorKind;
use std::time::Duration;

use super::driver::{BusDriver, TransportError, TransportResult};
use crate::protocol::Frame;

/// SocketCAN implementation of [`BusDriver`]
pub struct SocketCanDriver {
    socket: CanSocket,
}

impl SocketCanDriver {
    /// Bind a socket to interface `channel`
    pub fn open(channel: &str, read_timeout: Duration) -> TransportResult<Self> {
        let connect_error = |source| TransportError::Connect {
            channel: channel.to_string(),
            source,
        };

        let socket = CanSocket::open(channel).map_err(connect_error)?;
        socket.set_read_timeout(read_timeout).map_err(connect_error)?;

        tracing::debug!("Opened SocketCAN interface {}", channel);
        Ok(Self { socket })
    }
}

fn to_can_id(frame: &Frame) -> TransportResult<Id> {
    let id = if frame.extended {
        ExtendedId::new(frame.arbitration_id).map(Id::Extended)
    } else {
        u16::try_from(frame.arbitration_id)
            .ok()
            .and_then(StandardId::new)
            .map(Id::Standard)
    };
    id.ok_or_else(|| {
        TransportError::InvalidFrame(format!("arbitration id {:#x}", frame.arbitration_id))
    })
}

impl BusDriver for SocketCanDriver {
    fn send(&self, frame: &Frame) -> TransportResult<()> {
        let id = to_can_id(frame)?;
        let can_frame = <CanFrame as EmbeddedFrame>::new(id, &frame.payload).ok_or_else(|| {
            TransportError::InvalidFrame(format!("{} payload bytes", frame.payload.len()))
        })?;

        self.socket
            .write_frame(&can_frame)
            .map_err(TransportError::Send)
    }

    fn recv(&self) -> TransportResult<Option<Frame>> {
        match self.socket.read_frame() {
            Ok(CanFrame::Data(data)) => {
                let (arbitration_id, extended) = match EmbeddedFrame::id(&data) {
                    Id::Standard(id) => (id.as_raw() as u32, false),
                    Id::Extended(id) => (id.as_raw(), true),
                };
                let payload = Bytes::copy_from_slice(EmbeddedFrame::data(&data));
                Ok(Some(Frame::with_format(arbitration_id, extended, payload)))
            }
            Ok(CanFrame::Remote(_)) => Ok(None),
            Ok(CanFrame::Error(err)) => Err(TransportError::BusFault(format!("{:?}", err))),
            Err(e) if matches!(e.kind(), ErrorKind::WouldBlock | ErrorKind::TimedOut) => Ok(None),
            Err(e) => Err(TransportError::Receive(e)),
        }
    }
}

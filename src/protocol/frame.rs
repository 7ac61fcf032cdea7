//! CAN data frame

use bytes::Bytes;
use std::fmt;

use super::MAX_STANDARD_ID;

/// A single bus transmission unit
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Frame {
    /// Arbitration id
    pub arbitration_id: u32,
    /// 29-bit identifier format
    pub extended: bool,
    /// Data bytes (at most 8)
    pub payload: Bytes,
}

impl Frame {
    /// Create a frame, choosing the extended format when the id needs it
    pub fn new(arbitration_id: u32, payload: impl Into<Bytes>) -> Self {
        Self {
            arbitration_id,
            extended: arbitration_id > MAX_STANDARD_ID,
            payload: payload.into(),
        }
    }

    /// Create a frame with an explicit identifier format
    pub fn with_format(arbitration_id: u32, extended: bool, payload: impl Into<Bytes>) -> Self {
        Self {
            arbitration_id,
            extended,
            payload: payload.into(),
        }
    }

    /// Data length code
    pub fn dlc(&self) -> usize {
        self.payload.len()
    }
}

impl fmt::Display for Frame {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.extended {
            write!(f, "ID: {:08x} X", self.arbitration_id)?;
        } else {
            write!(f, "ID: {:04x} S", self.arbitration_id)?;
        }
        write!(f, " DL: {}", self.dlc())?;
        for byte in self.payload.iter() {
            write!(f, " {:02x}", byte)?;
        }
        Ok(())
    }
}

//! Protocol module - Message schemas and the CAN payload codec
//!
//! Every order maps onto a classic CAN data frame:
//! - arbitration id taken from the schema (11-bit, or 29-bit above 0x7FF)
//! - up to 8 payload bytes, one slot per parameter in declaration order
//! - integers are signed, big-endian, two's-complement

mod codec;
mod frame;
mod schema;

pub use codec::*;
pub use frame::*;
pub use schema::*;

/// Maximum payload of a classic CAN data frame
pub const MAX_PAYLOAD: usize = 8;

/// Highest arbitration id that fits a standard (11-bit) frame
pub const MAX_STANDARD_ID: u32 = 0x7FF;

/// Highest arbitration id that fits an extended (29-bit) frame
pub const MAX_EXTENDED_ID: u32 = 0x1FFF_FFFF;

//! Serial link to the FPGA
//!
//! This module provides:
//! - The [`ByteChannel`] abstraction the transfer pipelines drive
//! - A serialport-backed implementation with fixed 115200 8N1 framing
//! - Serial port discovery for picking the device

pub mod port;
#[cfg(test)]
pub mod testing;

pub use port::{LinkConfig, SerialLink};

use crate::error::TransportError;

/// A full-duplex, byte-at-a-time connection to the device.
///
/// The protocol is strictly one request byte followed by (at most) one reply
/// byte, so callers hold the channel by `&mut` for the whole run.
pub trait ByteChannel {
    /// Send exactly one byte.
    fn write_byte(&mut self, byte: u8) -> Result<(), TransportError>;

    /// Block until exactly one byte is available and return it.
    fn read_byte(&mut self) -> Result<u8, TransportError>;
}

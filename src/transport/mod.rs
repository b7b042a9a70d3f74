//! # Printer Transport Layer
//!
//! This module provides the byte channels the protocol engine runs over.
//!
//! ## Available Transports
//!
//! - [`serial`]: USB serial line at 115200 baud, with model autodetection
//! - [`bluetooth`]: Bluetooth RFCOMM via a bound `/dev/rfcommN` device (Linux)
//! - [`mock`]: Scripted transport for tests
//!
//! All of them implement [`Transport`], so the transceiver never knows which
//! one is active.

#[cfg(unix)]
pub mod bluetooth;
pub mod mock;
pub mod serial;

#[cfg(unix)]
pub use bluetooth::BluetoothTransport;
pub use mock::MockTransport;
pub use serial::SerialTransport;

use crate::error::Result;

/// Duplex byte channel to a printer.
pub trait Transport {
    /// Read up to `max_len` bytes.
    ///
    /// May return fewer bytes than requested, including none when the
    /// underlying read timed out.
    fn read(&mut self, max_len: usize) -> Result<Vec<u8>>;

    /// Write all of `data`.
    fn write(&mut self, data: &[u8]) -> Result<()>;
}

impl<T: Transport + ?Sized> Transport for Box<T> {
    fn read(&mut self, max_len: usize) -> Result<Vec<u8>> {
        (**self).read(max_len)
    }

    fn write(&mut self, data: &[u8]) -> Result<()> {
        (**self).write(data)
    }
}

//! # NIIMBOT Protocol Implementation
//!
//! This module provides the wire format of NIIMBOT label printers.
//!
//! ## Module Structure
//!
//! - [`packet`]: Frame encoding, decoding and length detection
//! - [`commands`]: Request codes, info keys and reply-code derivation
//! - [`status`]: Decoders for status, heartbeat, RFID and info replies
//! - [`raster`]: Image to row-packet encoder
//!
//! ## Usage Example
//!
//! ```
//! use niimbot::protocol::{packet, Command, RequestCode};
//!
//! let cmd = Command::Static(RequestCode::StartPrint);
//! let bytes = packet::encode(cmd.request().code(), &[1]).unwrap();
//!
//! // The printer answers START_PRINT with reply code 0x02
//! assert_eq!(cmd.reply_code(), 0x02);
//! assert_eq!(packet::frame_length(&bytes), Some(bytes.len()));
//! ```

pub mod commands;
pub mod packet;
pub mod raster;
pub mod status;

pub use commands::{Command, InfoKey, RequestCode};
pub use packet::Packet;
pub use raster::{Dithering, RasterEncoder};
pub use status::{Heartbeat, InfoValue, PrintStatus, RfidTag};

//! # niimbot - Label Printer Library
//!
//! niimbot is a Rust library for printing on NIIMBOT thermal label printers
//! (B1, B18, B21, D11, D110) over USB serial or Bluetooth. It provides:
//!
//! - **Protocol implementation**: frame codec, command codes, reply decoders
//! - **Raster encoding**: grayscale image to 1-bit row packets
//! - **Transceiver**: request/response matching with bounded retry
//! - **Print session**: the ordered command sequence of a print job
//! - **Transport**: serial and Bluetooth RFCOMM backends
//!
//! ## Quick Start
//!
//! ```no_run
//! use niimbot::{
//!     printer::PrinterClient,
//!     transport::{serial, SerialTransport},
//! };
//!
//! // Find the printer on USB
//! let resolved = serial::resolve(None, None)?;
//! let transport = SerialTransport::open(&resolved.port_name)?;
//! let mut client = PrinterClient::new(transport).model(resolved.model);
//!
//! // Print a 240x96 black box at density 3
//! let image = image::GrayImage::from_pixel(240, 96, image::Luma([0]));
//! client.print_image(&image, 3)?;
//!
//! # Ok::<(), niimbot::error::NiimbotError>(())
//! ```
//!
//! ## Module Overview
//!
//! | Module | Description |
//! |--------|-------------|
//! | [`protocol`] | Wire format and reply decoding |
//! | [`transceiver`] | Send, buffer, extract, match, retry |
//! | [`printer`] | Command client, print session, model table |
//! | [`transport`] | Communication backends |
//! | [`error`] | Error types |

pub mod error;
pub mod printer;
pub mod protocol;
pub mod transceiver;
pub mod transport;

// Re-exports for convenience
pub use error::{NiimbotError, Result};
pub use printer::{PrintOptions, PrinterClient, PrinterModel};
pub use transceiver::{RetryPolicy, Transceiver};
pub use transport::Transport;

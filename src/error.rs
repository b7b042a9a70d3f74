//! # Error Types
//!
//! This module defines error types used throughout the niimbot library.
//!
//! ## Propagation
//!
//! | Kind | Raised by | Handling |
//! |------|-----------|----------|
//! | `ChecksumMismatch`, `MalformedFrame` | packet codec | dropped while draining frames |
//! | `InvalidCommand`, `NotSupported` | transceiver | fatal, abort the job |
//! | `Timeout` | print session | fatal, except for end print |
//! | `PayloadTooLarge` | packet codec | programming error, rejected before send |
//! | `ConfigurationAmbiguous`, `DeviceNotFound` | autodetection | before any protocol traffic |

use thiserror::Error;

/// Main error type for niimbot operations
#[derive(Debug, Error)]
pub enum NiimbotError {
    /// Frame checksum did not match its contents
    #[error("Checksum mismatch: expected {expected:#04x}, got {actual:#04x}")]
    ChecksumMismatch { expected: u8, actual: u8 },

    /// Frame markers or length field are inconsistent
    #[error("Malformed frame: {0}")]
    MalformedFrame(String),

    /// Device rejected the command (error frame 0xDB)
    #[error("Invalid command: printer rejected request {request:#04x}")]
    InvalidCommand { request: u8 },

    /// Device does not implement the command (error frame 0x00)
    #[error("Not supported: printer does not implement request {request:#04x}")]
    NotSupported { request: u8 },

    /// No matching response within the polling budget
    #[error("Timeout waiting for response to request {request:#04x}")]
    Timeout { request: u8 },

    /// Request payload does not fit in a single frame
    #[error("Payload too large: {0} bytes (max 255)")]
    PayloadTooLarge(usize),

    /// Device answered a step with a falsy flag
    #[error("Printer refused {0}")]
    CommandRejected(&'static str),

    /// Reply payload did not match the expected layout
    #[error("Malformed reply: {0}")]
    MalformedReply(String),

    /// Caller supplied an out-of-range parameter
    #[error("Invalid argument: {0}")]
    InvalidArgument(String),

    /// Image is wider than the printhead
    #[error("Image is {width} px wide, printer supports at most {max} px")]
    ImageTooWide { width: u32, max: u32 },

    /// More than one supported printer found during autodetection
    #[error("Multiple supported devices detected, please select a specific one:\n{0}")]
    ConfigurationAmbiguous(String),

    /// No supported printer found during autodetection
    #[error("Device not found: {0}")]
    DeviceNotFound(String),

    /// Transport-level errors (connection, I/O)
    #[error("Transport error: {0}")]
    Transport(String),

    /// Image processing error
    #[error("Image error: {0}")]
    Image(String),

    /// I/O error wrapper
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

/// Result alias used across the crate
pub type Result<T> = std::result::Result<T, NiimbotError>;

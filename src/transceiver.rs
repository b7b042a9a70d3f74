//! # Transceiver
//!
//! Single request / single response exchange over a [`Transport`].
//!
//! ## Receive Path
//!
//! Bytes read from the transport accumulate in a receive buffer. Complete
//! frames are cut from its front:
//!
//! ```text
//! buffer: 55 55 02 01 01 02 AA AA 55 55 DD 0A ...
//!         └──── frame (L+7) ────┘ └─ pending, not yet complete
//! ```
//!
//! A frame is only cut once all `L + 7` bytes are buffered. Frames that fail
//! validation are logged and dropped; leading bytes that are not a frame
//! header are skipped up to the next `55 55`.
//!
//! ## Matching
//!
//! Replies carry no request id. [`Transceiver::transceive`] sends the
//! request, then polls up to [`RetryPolicy::attempts`] times:
//!
//! 1. Drain every complete frame currently available
//! 2. Scan the whole batch: device error frames abort immediately, frames
//!    with the expected reply code become the candidate (last one wins)
//! 3. Candidate found → return it; otherwise sleep and try again
//!
//! `Ok(None)` after the last attempt means the printer never answered.

use std::thread;
use std::time::Duration;

use bytes::{Buf, BytesMut};
use tracing::{debug, trace, warn};

use crate::error::{NiimbotError, Result};
use crate::protocol::commands::{Command, ERROR_INVALID_COMMAND, ERROR_NOT_SUPPORTED};
use crate::protocol::packet::{self, FRAME_OVERHEAD, HEADER, Packet};
use crate::transport::Transport;

/// Bytes requested from the transport per read
pub const READ_CHUNK: usize = 1024;

/// Polling budget of one transceive call.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    /// Number of drain passes before giving up
    pub attempts: usize,
    /// Pause after a pass that found no reply
    pub interval: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            attempts: 6,
            interval: Duration::from_millis(100),
        }
    }
}

/// Owns the transport and its receive buffer.
pub struct Transceiver<T: Transport> {
    transport: T,
    buffer: BytesMut,
    policy: RetryPolicy,
}

impl<T: Transport> Transceiver<T> {
    pub fn new(transport: T) -> Self {
        Self::with_policy(transport, RetryPolicy::default())
    }

    pub fn with_policy(transport: T, policy: RetryPolicy) -> Self {
        Self {
            transport,
            buffer: BytesMut::with_capacity(READ_CHUNK),
            policy,
        }
    }

    pub fn policy(&self) -> RetryPolicy {
        self.policy
    }

    pub fn transport(&self) -> &T {
        &self.transport
    }

    pub fn transport_mut(&mut self) -> &mut T {
        &mut self.transport
    }

    /// Release the transport, discarding any buffered bytes.
    pub fn into_inner(self) -> T {
        self.transport
    }

    /// Bytes received but not yet extracted as frames.
    pub fn buffered(&self) -> &[u8] {
        &self.buffer
    }

    /// Encode and write one packet.
    pub fn send(&mut self, packet: &Packet) -> Result<()> {
        let bytes = packet.to_bytes()?;
        debug!("send: {}", packet::hex_dump(&bytes));
        self.transport.write(&bytes)
    }

    /// Read what is available and extract every complete frame, in arrival
    /// order. May return an empty batch.
    pub fn drain_frames(&mut self) -> Result<Vec<Packet>> {
        let chunk = self.transport.read(READ_CHUNK)?;
        if !chunk.is_empty() {
            trace!(bytes = chunk.len(), "read");
            self.buffer.extend_from_slice(&chunk);
        }

        let mut frames = Vec::new();
        while self.buffer.len() >= FRAME_OVERHEAD {
            if self.buffer[..2] != HEADER {
                self.resync();
                continue;
            }

            let Some(len) = packet::frame_length(&self.buffer) else {
                break;
            };
            if self.buffer.len() < len {
                break;
            }

            let raw = self.buffer.split_to(len);
            match packet::decode(&raw) {
                Ok(pkt) => {
                    debug!("recv: {}", packet::hex_dump(&raw));
                    frames.push(pkt);
                }
                Err(e) => warn!("dropping frame {}: {}", packet::hex_dump(&raw), e),
            }
        }

        Ok(frames)
    }

    /// Skip leading noise up to the next frame header.
    fn resync(&mut self) {
        let skip = self.buffer[1..]
            .windows(2)
            .position(|w| w == HEADER)
            .map(|pos| pos + 1)
            .unwrap_or(self.buffer.len() - 1);
        warn!(
            "skipping {} bytes of noise: {}",
            skip,
            packet::hex_dump(&self.buffer[..skip])
        );
        self.buffer.advance(skip);
    }

    /// Send `request` with `payload` and wait for a frame of type `response`.
    ///
    /// Returns `Ok(None)` when no reply arrived within the retry budget.
    pub fn transceive(&mut self, request: u8, payload: &[u8], response: u8) -> Result<Option<Packet>> {
        self.send(&Packet::new(request, payload))?;

        for attempt in 0..self.policy.attempts {
            let mut reply = None;
            for frame in self.drain_frames()? {
                match frame.kind {
                    ERROR_INVALID_COMMAND => return Err(NiimbotError::InvalidCommand { request }),
                    ERROR_NOT_SUPPORTED => return Err(NiimbotError::NotSupported { request }),
                    kind if kind == response => reply = Some(frame),
                    kind => trace!(kind, "ignoring unrelated frame"),
                }
            }

            if reply.is_some() {
                return Ok(reply);
            }
            trace!(attempt, request, "no reply yet");
            thread::sleep(self.policy.interval);
        }

        debug!(request, response, "no reply within retry budget");
        Ok(None)
    }

    /// [`transceive`](Self::transceive) with the reply code derived from `command`.
    pub fn transceive_command(&mut self, command: Command, payload: &[u8]) -> Result<Option<Packet>> {
        self.transceive(command.request().code(), payload, command.reply_code())
    }
}

// ============================================================================
// TESTS
// ============================================================================

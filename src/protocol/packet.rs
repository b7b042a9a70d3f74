//! # Packet Codec
//!
//! Serializes and parses NIIMBOT protocol frames.
//!
//! ## Frame Layout
//!
//! ```text
//! offset  0     1     2     3     4 .. 4+L-1   4+L       5+L   6+L
//!        ┌─────┬─────┬─────┬─────┬───────────┬─────────┬─────┬─────┐
//!        │0x55 │0x55 │type │  L  │ data[0..L]│checksum │0xAA │0xAA │
//!        └─────┴─────┴─────┴─────┴───────────┴─────────┴─────┴─────┘
//! ```
//!
//! - `L` is the payload length (0-255)
//! - `checksum = type ^ L ^ data[0] ^ ... ^ data[L-1]`
//! - Total frame length is always `L + 7`
//!
//! ## Example
//!
//! ```
//! use niimbot::protocol::packet::{self, Packet};
//!
//! let bytes = packet::encode(0x01, &[0x01]).unwrap();
//! assert_eq!(bytes, vec![0x55, 0x55, 0x01, 0x01, 0x01, 0x01, 0xAA, 0xAA]);
//!
//! let pkt = packet::decode(&bytes).unwrap();
//! assert_eq!(pkt, Packet::new(0x01, vec![0x01]));
//! ```

use crate::error::{NiimbotError, Result};

/// Two-byte frame header
pub const HEADER: [u8; 2] = [0x55, 0x55];

/// Two-byte frame trailer
pub const TRAILER: [u8; 2] = [0xAA, 0xAA];

/// Bytes a frame carries in addition to its payload
/// (header 2 + type 1 + length 1 + checksum 1 + trailer 2).
pub const FRAME_OVERHEAD: usize = 7;

/// Largest payload the one-byte length field can express
pub const MAX_PAYLOAD: usize = u8::MAX as usize;

/// Offset of the payload length byte
const LENGTH_OFFSET: usize = 3;

/// One protocol frame: a command/response code plus its payload.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Packet {
    pub kind: u8,
    pub data: Vec<u8>,
}

impl Packet {
    pub fn new(kind: u8, data: impl Into<Vec<u8>>) -> Self {
        Self {
            kind,
            data: data.into(),
        }
    }

    /// Serialize to wire bytes.
    pub fn to_bytes(&self) -> Result<Vec<u8>> {
        encode(self.kind, &self.data)
    }

    /// First payload byte interpreted as a success flag (0 = failure).
    ///
    /// An empty payload counts as failure.
    pub fn flag(&self) -> bool {
        self.data.first().is_some_and(|&b| b != 0)
    }
}

fn checksum(kind: u8, data: &[u8]) -> u8 {
    data.iter().fold(kind ^ data.len() as u8, |acc, &b| acc ^ b)
}

/// Build the wire frame for `kind` and `data`.
///
/// Fails with [`NiimbotError::PayloadTooLarge`] when `data` exceeds 255 bytes.
pub fn encode(kind: u8, data: &[u8]) -> Result<Vec<u8>> {
    if data.len() > MAX_PAYLOAD {
        return Err(NiimbotError::PayloadTooLarge(data.len()));
    }

    let mut out = Vec::with_capacity(data.len() + FRAME_OVERHEAD);
    out.extend_from_slice(&HEADER);
    out.push(kind);
    out.push(data.len() as u8);
    out.extend_from_slice(data);
    out.push(checksum(kind, data));
    out.extend_from_slice(&TRAILER);
    Ok(out)
}

/// Parse a buffer holding exactly one complete frame.
pub fn decode(buf: &[u8]) -> Result<Packet> {
    if buf.len() < FRAME_OVERHEAD {
        return Err(NiimbotError::MalformedFrame(format!(
            "frame too short: {} bytes",
            buf.len()
        )));
    }
    if buf[..2] != HEADER {
        return Err(NiimbotError::MalformedFrame(format!(
            "bad header {:02X?}",
            &buf[..2]
        )));
    }
    if buf[buf.len() - 2..] != TRAILER {
        return Err(NiimbotError::MalformedFrame(format!(
            "bad trailer {:02X?}",
            &buf[buf.len() - 2..]
        )));
    }

    let kind = buf[2];
    let len = buf[LENGTH_OFFSET] as usize;
    if buf.len() != len + FRAME_OVERHEAD {
        return Err(NiimbotError::MalformedFrame(format!(
            "length field says {} bytes of payload, frame is {} bytes",
            len,
            buf.len()
        )));
    }

    let data = &buf[4..4 + len];
    let expected = checksum(kind, data);
    let actual = buf[4 + len];
    if expected != actual {
        return Err(NiimbotError::ChecksumMismatch { expected, actual });
    }

    Ok(Packet::new(kind, data))
}

/// Total length of the frame starting at `prefix[0]`, once the length byte
/// has arrived.
pub fn frame_length(prefix: &[u8]) -> Option<usize> {
    prefix
        .get(LENGTH_OFFSET)
        .map(|&len| len as usize + FRAME_OVERHEAD)
}

/// Colon-separated hex dump used in frame logs, e.g. `55:55:01:01`.
pub fn hex_dump(buf: &[u8]) -> String {
    buf.iter()
        .map(|b| format!("{:02x}", b))
        .collect::<Vec<_>>()
        .join(":")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_encode_layout() {
        let bytes = encode(0x21, &[0x03]).unwrap();
        assert_eq!(bytes, vec![0x55, 0x55, 0x21, 0x01, 0x03, 0x23, 0xAA, 0xAA]);
    }

    #[test]
    fn test_encode_empty_payload() {
        let bytes = encode(0x40, &[]).unwrap();
        assert_eq!(bytes, vec![0x55, 0x55, 0x40, 0x00, 0x40, 0xAA, 0xAA]);
    }

    #[test]
    fn test_encode_rejects_oversized_payload() {
        let data = vec![0u8; 256];
        assert!(matches!(
            encode(0x85, &data),
            Err(NiimbotError::PayloadTooLarge(256))
        ));
    }

    #[test]
    fn test_encode_accepts_max_payload() {
        let data = vec![0xAB; 255];
        let bytes = encode(0x85, &data).unwrap();
        assert_eq!(bytes.len(), 255 + FRAME_OVERHEAD);
        assert_eq!(decode(&bytes).unwrap().data, data);
    }

    #[test]
    fn test_roundtrip_samples() {
        for (kind, data) in [
            (0x00u8, vec![]),
            (0x85, vec![0x00, 0x01, 0, 0, 0, 1, 0xFF, 0x0F]),
            (0xDC, (0..20).collect::<Vec<u8>>()),
        ] {
            let bytes = encode(kind, &data).unwrap();
            assert_eq!(decode(&bytes).unwrap(), Packet::new(kind, data));
        }
    }

    #[test]
    fn test_frame_length_matches_encoded_length() {
        for len in [0usize, 1, 10, 255] {
            let bytes = encode(0x13, &vec![7; len]).unwrap();
            assert_eq!(frame_length(&bytes[..4]), Some(bytes.len()));
        }
    }

    #[test]
    fn test_frame_length_needs_length_byte() {
        assert_eq!(frame_length(&[0x55, 0x55, 0x01]), None);
        assert_eq!(frame_length(&[]), None);
    }

    #[test]
    fn test_decode_bad_checksum() {
        let mut bytes = encode(0x02, &[0x01]).unwrap();
        bytes[5] ^= 0xFF;
        assert!(matches!(
            decode(&bytes),
            Err(NiimbotError::ChecksumMismatch { .. })
        ));
    }

    #[test]
    fn test_decode_bad_markers() {
        let mut bytes = encode(0x02, &[0x01]).unwrap();
        bytes[0] = 0x00;
        assert!(matches!(decode(&bytes), Err(NiimbotError::MalformedFrame(_))));

        let mut bytes = encode(0x02, &[0x01]).unwrap();
        let last = bytes.len() - 1;
        bytes[last] = 0x00;
        assert!(matches!(decode(&bytes), Err(NiimbotError::MalformedFrame(_))));
    }

    #[test]
    fn test_decode_inconsistent_length() {
        let mut bytes = encode(0x02, &[0x01, 0x02]).unwrap();
        bytes[3] = 5;
        assert!(matches!(decode(&bytes), Err(NiimbotError::MalformedFrame(_))));
    }

    #[test]
    fn test_decode_does_not_mutate_input() {
        let bytes = encode(0x02, &[0x01]).unwrap();
        let copy = bytes.clone();
        let _ = decode(&bytes);
        assert_eq!(bytes, copy);
    }

    #[test]
    fn test_flag() {
        assert!(Packet::new(0x02, vec![1]).flag());
        assert!(!Packet::new(0x02, vec![0]).flag());
        assert!(!Packet::new(0x02, vec![]).flag());
    }

    #[test]
    fn test_hex_dump() {
        assert_eq!(hex_dump(&[0x55, 0x55, 0x0A]), "55:55:0a");
        assert_eq!(hex_dump(&[]), "");
    }
}

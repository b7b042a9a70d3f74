//! # Reply Decoding
//!
//! Decoders for the payloads of status-style replies.
//!
//! ## GET_PRINT_STATUS (10 bytes)
//!
//! ```text
//! byte  0        1     2          3          4        5        6      7..9
//!      reserved  idle  progress1  progress2  reserved reserved error  reserved
//! ```
//!
//! ## HEARTBEAT (length polymorphic)
//!
//! The heartbeat payload layout depends on firmware/model and is identified
//! only by its length:
//!
//! | Length | closing | power | paper | rfid |
//! |--------|---------|-------|-------|------|
//! | 20 | - | - | 18 | 19 |
//! | 19 | 15 | 16 | 17 | 18 |
//! | 13 | 9 | 10 | 11 | 12 |
//! | 10 | 8 | 9 | - | 8 |
//! | 9 | 8 | - | - | - |
//!
//! Fields a layout lacks are reported as `None`, never defaulted.

use bytes::{Buf, Bytes};
use serde::Serialize;

use crate::error::{NiimbotError, Result};

use super::commands::InfoKey;

// ============================================================================
// PRINT STATUS
// ============================================================================

/// Length of a GET_PRINT_STATUS payload
pub const PRINT_STATUS_LEN: usize = 10;

/// Error code meaning the paper compartment is open
pub const ERROR_OPEN_PAPER_COMPARTMENT: u8 = 1;

/// Decoded GET_PRINT_STATUS reply.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PrintStatus {
    pub reserved0: u8,
    pub idle: bool,
    pub progress1: u8,
    pub progress2: u8,
    pub reserved1: u8,
    pub reserved2: u8,
    pub error_code: u8,
    pub reserved3: u8,
    pub reserved4: u8,
    pub reserved5: u8,
}

impl PrintStatus {
    /// Decode the fixed 10-byte payload.
    ///
    /// Fails if the payload has the wrong length or the idle byte is not 0/1.
    pub fn decode(data: &[u8]) -> Result<Self> {
        let bytes: [u8; PRINT_STATUS_LEN] = data.try_into().map_err(|_| {
            NiimbotError::MalformedReply(format!(
                "print status must be {} bytes, got {}",
                PRINT_STATUS_LEN,
                data.len()
            ))
        })?;

        let idle = match bytes[1] {
            0 => false,
            1 => true,
            other => {
                return Err(NiimbotError::MalformedReply(format!(
                    "unexpected idle value {}",
                    other
                )));
            }
        };

        Ok(Self {
            reserved0: bytes[0],
            idle,
            progress1: bytes[2],
            progress2: bytes[3],
            reserved1: bytes[4],
            reserved2: bytes[5],
            error_code: bytes[6],
            reserved3: bytes[7],
            reserved4: bytes[8],
            reserved5: bytes[9],
        })
    }

    pub fn error(&self) -> bool {
        self.error_code != 0
    }

    pub fn open_paper_compartment(&self) -> bool {
        self.error_code == ERROR_OPEN_PAPER_COMPARTMENT
    }
}

// ============================================================================
// HEARTBEAT
// ============================================================================

/// Decoded HEARTBEAT reply, one variant per observed payload length.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "layout", rename_all = "snake_case")]
pub enum Heartbeat {
    /// 20-byte layout: paper and RFID state only
    Len20 { paper_state: u8, rfid_read_state: u8 },
    /// 19-byte layout
    Len19 {
        closing_state: u8,
        power_level: u8,
        paper_state: u8,
        rfid_read_state: u8,
    },
    /// 13-byte layout
    Len13 {
        closing_state: u8,
        power_level: u8,
        paper_state: u8,
        rfid_read_state: u8,
    },
    /// 10-byte layout; byte 8 doubles as closing and RFID state
    Len10 {
        closing_state: u8,
        power_level: u8,
        rfid_read_state: u8,
    },
    /// 9-byte layout: closing state only
    Len9 { closing_state: u8 },
    /// Any other length; raw payload kept for diagnostics
    Unknown { payload: Vec<u8> },
}

impl Heartbeat {
    pub fn decode(data: &[u8]) -> Self {
        match data.len() {
            20 => Heartbeat::Len20 {
                paper_state: data[18],
                rfid_read_state: data[19],
            },
            19 => Heartbeat::Len19 {
                closing_state: data[15],
                power_level: data[16],
                paper_state: data[17],
                rfid_read_state: data[18],
            },
            13 => Heartbeat::Len13 {
                closing_state: data[9],
                power_level: data[10],
                paper_state: data[11],
                rfid_read_state: data[12],
            },
            10 => Heartbeat::Len10 {
                closing_state: data[8],
                power_level: data[9],
                rfid_read_state: data[8],
            },
            9 => Heartbeat::Len9 {
                closing_state: data[8],
            },
            _ => Heartbeat::Unknown {
                payload: data.to_vec(),
            },
        }
    }

    pub fn closing_state(&self) -> Option<u8> {
        match *self {
            Heartbeat::Len19 { closing_state, .. }
            | Heartbeat::Len13 { closing_state, .. }
            | Heartbeat::Len10 { closing_state, .. }
            | Heartbeat::Len9 { closing_state } => Some(closing_state),
            Heartbeat::Len20 { .. } | Heartbeat::Unknown { .. } => None,
        }
    }

    pub fn power_level(&self) -> Option<u8> {
        match *self {
            Heartbeat::Len19 { power_level, .. }
            | Heartbeat::Len13 { power_level, .. }
            | Heartbeat::Len10 { power_level, .. } => Some(power_level),
            _ => None,
        }
    }

    pub fn paper_state(&self) -> Option<u8> {
        match *self {
            Heartbeat::Len20 { paper_state, .. }
            | Heartbeat::Len19 { paper_state, .. }
            | Heartbeat::Len13 { paper_state, .. } => Some(paper_state),
            _ => None,
        }
    }

    pub fn rfid_read_state(&self) -> Option<u8> {
        match *self {
            Heartbeat::Len20 {
                rfid_read_state, ..
            }
            | Heartbeat::Len19 {
                rfid_read_state, ..
            }
            | Heartbeat::Len13 {
                rfid_read_state, ..
            }
            | Heartbeat::Len10 {
                rfid_read_state, ..
            } => Some(rfid_read_state),
            _ => None,
        }
    }
}

// ============================================================================
// RFID TAG
// ============================================================================

/// Label roll information read from its RFID tag.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RfidTag {
    pub uuid: String,
    pub barcode: String,
    pub serial: String,
    pub total_len: u16,
    pub used_len: u16,
    pub label_type: u8,
}

impl RfidTag {
    /// Decode a GET_RFID payload. `Ok(None)` means no tag was read.
    pub fn decode(data: &[u8]) -> Result<Option<Self>> {
        match data.first() {
            None => return Err(NiimbotError::MalformedReply("empty RFID reply".into())),
            Some(0) => return Ok(None),
            Some(_) => {}
        }

        let mut buf = data;
        let uuid = hex_string(&take(&mut buf, 8, "uuid")?);
        let barcode = length_prefixed_string(&mut buf, "barcode")?;
        let serial = length_prefixed_string(&mut buf, "serial")?;
        ensure(&buf, 5, "lengths")?;
        let total_len = buf.get_u16();
        let used_len = buf.get_u16();
        let label_type = buf.get_u8();

        Ok(Some(Self {
            uuid,
            barcode,
            serial,
            total_len,
            used_len,
            label_type,
        }))
    }
}

/// `MalformedReply` unless `n` more bytes are left for `field`.
fn ensure<B: Buf>(buf: &B, n: usize, field: &str) -> Result<()> {
    if buf.remaining() < n {
        return Err(NiimbotError::MalformedReply(format!(
            "reply truncated: {} needs {} bytes, {} left",
            field,
            n,
            buf.remaining()
        )));
    }
    Ok(())
}

fn take<B: Buf>(buf: &mut B, n: usize, field: &str) -> Result<Bytes> {
    ensure(&*buf, n, field)?;
    Ok(buf.copy_to_bytes(n))
}

fn length_prefixed_string<B: Buf>(buf: &mut B, field: &str) -> Result<String> {
    ensure(&*buf, 1, field)?;
    let len = buf.get_u8() as usize;
    let bytes = take(buf, len, field)?;
    String::from_utf8(bytes.to_vec())
        .map_err(|e| NiimbotError::MalformedReply(format!("invalid {}: {}", field, e)))
}

fn hex_string(bytes: &[u8]) -> String {
    bytes.iter().map(|b| format!("{:02x}", b)).collect()
}

// ============================================================================
// GET_INFO VALUES
// ============================================================================

/// Decoded GET_INFO value.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum InfoValue {
    /// Device serial as lowercase hex
    Text(String),
    /// Firmware/hardware version (raw / 100)
    Version(f64),
    /// Everything else, as a big-endian integer
    Number(u64),
}

impl InfoValue {
    pub fn decode(key: InfoKey, data: &[u8]) -> Self {
        let number = data.iter().fold(0u64, |acc, &b| (acc << 8) | b as u64);
        match key {
            InfoKey::DeviceSerial => InfoValue::Text(hex_string(data)),
            InfoKey::SoftVersion | InfoKey::HardVersion => InfoValue::Version(number as f64 / 100.0),
            _ => InfoValue::Number(number),
        }
    }
}

impl std::fmt::Display for InfoValue {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            InfoValue::Text(s) => write!(f, "{}", s),
            InfoValue::Version(v) => write!(f, "{:.2}", v),
            InfoValue::Number(n) => write!(f, "{}", n),
        }
    }
}

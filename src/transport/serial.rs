//! # USB Serial Transport
//!
//! NIIMBOT printers expose a CDC-ACM serial port over USB. The line runs at
//! 115200 baud; reads time out after 500 ms and then return no bytes.
//!
//! ## Autodetection
//!
//! The USB serial number of a NIIMBOT printer starts with its model name:
//!
//! ```text
//! B21-C2071234   →  model "b21"
//! D110-H0123456  →  model "d110"
//! ```
//!
//! [`detect`] enumerates serial ports, keeps the USB ones, extracts the text
//! before the first `-` of each serial number and matches it against
//! [`PrinterModel::ALL`]. Exactly one match is required: none is reported as
//! [`NiimbotError::DeviceNotFound`], several as
//! [`NiimbotError::ConfigurationAmbiguous`].

use std::io::{self, Read, Write};
use std::time::Duration;

use serialport::{SerialPort, SerialPortType};
use tracing::{debug, info, warn};

use crate::error::{NiimbotError, Result};
use crate::printer::PrinterModel;

use super::Transport;

/// Line speed used by every supported model
pub const BAUD_RATE: u32 = 115_200;

/// Read timeout of the serial line
pub const READ_TIMEOUT: Duration = Duration::from_millis(500);

/// # Serial Printer Transport
///
/// ## Example
///
/// ```no_run
/// use niimbot::transport::SerialTransport;
///
/// let transport = SerialTransport::open("/dev/ttyACM0")?;
/// # Ok::<(), niimbot::error::NiimbotError>(())
/// ```
pub struct SerialTransport {
    port: Box<dyn SerialPort>,
}

impl SerialTransport {
    /// Open `path` at 115200 baud with a 500 ms read timeout.
    pub fn open(path: &str) -> Result<Self> {
        let port = serialport::new(path, BAUD_RATE)
            .timeout(READ_TIMEOUT)
            .open()
            .map_err(|e| NiimbotError::Transport(format!("Failed to open {}: {}", path, e)))?;
        info!(port = path, baud = BAUD_RATE, "serial port opened");
        Ok(Self { port })
    }
}

impl Transport for SerialTransport {
    fn read(&mut self, max_len: usize) -> Result<Vec<u8>> {
        let mut buf = vec![0u8; max_len];
        match self.port.read(&mut buf) {
            Ok(n) => {
                buf.truncate(n);
                Ok(buf)
            }
            Err(e) if e.kind() == io::ErrorKind::TimedOut => Ok(Vec::new()),
            Err(e) => Err(e.into()),
        }
    }

    fn write(&mut self, data: &[u8]) -> Result<()> {
        self.port.write_all(data)?;
        self.port.flush()?;
        Ok(())
    }
}

// ============================================================================
// AUTODETECTION
// ============================================================================

/// A serial port seen during enumeration.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PortCandidate {
    pub port_name: String,
    /// `None` for ports that are not USB attached
    pub usb_serial_number: Option<String>,
}

/// A port whose serial number names a supported model.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DetectedDevice {
    pub port_name: String,
    pub model: PrinterModel,
    pub serial_number: String,
}

/// Port and model to use after autodetection.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Resolved {
    pub port_name: String,
    pub model: PrinterModel,
    pub serial_number: Option<String>,
}

/// Model prefix of a USB serial number: text before the first `-`.
pub fn model_prefix(serial_number: &str) -> Option<&str> {
    serial_number.split_once('-').map(|(prefix, _)| prefix)
}

/// Keep the USB candidates whose serial number names a known model.
pub fn match_devices(candidates: &[PortCandidate]) -> Vec<DetectedDevice> {
    candidates
        .iter()
        .filter_map(|c| {
            let serial = c.usb_serial_number.as_deref()?;
            let model = PrinterModel::by_name(model_prefix(serial)?)?;
            Some(DetectedDevice {
                port_name: c.port_name.clone(),
                model,
                serial_number: serial.to_string(),
            })
        })
        .collect()
}

/// Require exactly one detected device.
pub fn select_single(mut devices: Vec<DetectedDevice>) -> Result<DetectedDevice> {
    match devices.len() {
        0 => Err(NiimbotError::DeviceNotFound(
            "No supported devices detected".into(),
        )),
        1 => Ok(devices.remove(0)),
        _ => {
            let listing = devices
                .iter()
                .map(|d| {
                    format!(
                        "\t{}: {} (Serial No. {})",
                        d.port_name,
                        d.model.name.to_uppercase(),
                        d.serial_number
                    )
                })
                .collect::<Vec<_>>()
                .join("\n");
            Err(NiimbotError::ConfigurationAmbiguous(listing))
        }
    }
}

/// Enumerate the serial ports of this machine.
pub fn list_ports() -> Result<Vec<PortCandidate>> {
    let ports = serialport::available_ports()
        .map_err(|e| NiimbotError::Transport(format!("Failed to list serial ports: {}", e)))?;

    Ok(ports
        .into_iter()
        .map(|p| {
            let usb_serial_number = match p.port_type {
                SerialPortType::UsbPort(usb) => {
                    debug!(
                        port = %p.port_name,
                        vid = usb.vid,
                        pid = usb.pid,
                        serial = ?usb.serial_number,
                        manufacturer = ?usb.manufacturer,
                        product = ?usb.product,
                        "usb serial port"
                    );
                    Some(usb.serial_number.unwrap_or_default())
                }
                _ => None,
            };
            PortCandidate {
                port_name: p.port_name,
                usb_serial_number,
            }
        })
        .collect())
}

/// Resolve the port and model to use.
///
/// `None` means "auto". When both are given no enumeration happens. When only
/// the port is given, detection is limited to that port. An explicit model
/// wins over the detected one, with a warning.
pub fn resolve(port: Option<&str>, model: Option<&str>) -> Result<Resolved> {
    let explicit_model = model
        .map(|name| {
            PrinterModel::by_name(name).ok_or_else(|| {
                NiimbotError::InvalidArgument(format!(
                    "unknown model '{}', expected one of: {}",
                    name,
                    PrinterModel::names()
                ))
            })
        })
        .transpose()?;

    if let (Some(port), Some(model)) = (port, explicit_model) {
        return Ok(Resolved {
            port_name: port.to_string(),
            model,
            serial_number: None,
        });
    }

    let mut candidates = list_ports()?;
    if let Some(port) = port {
        candidates.retain(|c| c.port_name.contains(port));
    }
    if candidates.is_empty() {
        return Err(NiimbotError::DeviceNotFound(
            "No serial ports detected".into(),
        ));
    }

    let device = select_single(match_devices(&candidates))?;
    resolve_model(device, explicit_model)
}

fn resolve_model(device: DetectedDevice, explicit: Option<PrinterModel>) -> Result<Resolved> {
    let model = match explicit {
        Some(model) if model != device.model => {
            warn!(
                detected = device.model.name,
                requested = model.name,
                "detected model differs from the requested one, using requested"
            );
            model
        }
        Some(model) => model,
        None => device.model,
    };

    Ok(Resolved {
        port_name: device.port_name,
        model,
        serial_number: Some(device.serial_number),
    })
}

// ============================================================================
// TESTS
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn usb(port: &str, serial: &str) -> PortCandidate {
        PortCandidate {
            port_name: port.into(),
            usb_serial_number: Some(serial.into()),
        }
    }

    fn native(port: &str) -> PortCandidate {
        PortCandidate {
            port_name: port.into(),
            usb_serial_number: None,
        }
    }

    #[test]
    fn test_model_prefix() {
        assert_eq!(model_prefix("B21-C2071234"), Some("B21"));
        assert_eq!(model_prefix("D110-H01-23"), Some("D110"));
        assert_eq!(model_prefix("ABC123"), None);
    }

    #[test]
    fn test_match_devices_filters_usb_and_models() {
        let candidates = vec![
            native("/dev/ttyS0"),
            usb("/dev/ttyACM0", "B21-C2071234"),
            usb("/dev/ttyACM1", "FT232-XYZ"),
            usb("/dev/ttyUSB0", "nodash"),
        ];
        let devices = match_devices(&candidates);
        assert_eq!(
            devices,
            vec![DetectedDevice {
                port_name: "/dev/ttyACM0".into(),
                model: PrinterModel::B21,
                serial_number: "B21-C2071234".into(),
            }]
        );
    }

    #[test]
    fn test_match_is_case_insensitive() {
        let devices = match_devices(&[usb("COM3", "d11-ABC")]);
        assert_eq!(devices[0].model, PrinterModel::D11);
    }

    #[test]
    fn test_select_none() {
        assert!(matches!(
            select_single(vec![]),
            Err(NiimbotError::DeviceNotFound(_))
        ));
    }

    #[test]
    fn test_select_ambiguous() {
        let devices = match_devices(&[
            usb("/dev/ttyACM0", "B21-1"),
            usb("/dev/ttyACM1", "B1-2"),
        ]);
        match select_single(devices) {
            Err(NiimbotError::ConfigurationAmbiguous(listing)) => {
                assert!(listing.contains("/dev/ttyACM0: B21 (Serial No. B21-1)"));
                assert!(listing.contains("/dev/ttyACM1: B1 (Serial No. B1-2)"));
            }
            other => panic!("expected ambiguity error, got {:?}", other),
        }
    }

    #[test]
    fn test_explicit_model_wins() {
        let device = DetectedDevice {
            port_name: "/dev/ttyACM0".into(),
            model: PrinterModel::B21,
            serial_number: "B21-1".into(),
        };
        let resolved = resolve_model(device.clone(), Some(PrinterModel::B1)).unwrap();
        assert_eq!(resolved.model, PrinterModel::B1);

        let resolved = resolve_model(device, None).unwrap();
        assert_eq!(resolved.model, PrinterModel::B21);
        assert_eq!(resolved.serial_number.as_deref(), Some("B21-1"));
    }

    #[test]
    fn test_resolve_explicit_skips_enumeration() {
        let resolved = resolve(Some("/dev/ttyACM7"), Some("D110")).unwrap();
        assert_eq!(resolved.port_name, "/dev/ttyACM7");
        assert_eq!(resolved.model, PrinterModel::D110);
    }

    #[test]
    fn test_resolve_unknown_model() {
        assert!(matches!(
            resolve(Some("/dev/ttyACM0"), Some("zz9")),
            Err(NiimbotError::InvalidArgument(_))
        ));
    }
}

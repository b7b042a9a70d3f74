//! # Bluetooth RFCOMM Transport
//!
//! This module provides communication with NIIMBOT printers over the
//! Bluetooth Serial Port Profile (SPP) via RFCOMM channel 1.
//!
//! ## Bluetooth Setup (Linux)
//!
//! The printer must be paired and bound to an RFCOMM device:
//!
//! ```bash
//! # 1. Find the printer's Bluetooth address
//! $ bluetoothctl
//! [bluetooth]# scan on
//! # Look for "B21-..." or "D110-..."
//!
//! # 2. Pair with the printer
//! [bluetooth]# pair XX:XX:XX:XX:XX:XX
//!
//! # 3. Bind to RFCOMM device on channel 1
//! $ sudo rfcomm bind 0 XX:XX:XX:XX:XX:XX 1
//! # This creates /dev/rfcomm0
//! ```
//!
//! [`BluetoothTransport::connect`] performs step 3 automatically when given a
//! MAC address (root is required for `rfcomm bind`).
//!
//! ## TTY Configuration
//!
//! The RFCOMM device is opened in raw mode so binary frames pass unmodified:
//!
//! - **No input processing**: IGNBRK, BRKINT, PARMRK, ISTRIP, INLCR, IGNCR, ICRNL, IXON, IXOFF, IXANY off
//! - **No output processing**: OPOST off
//! - **8-bit characters**: CS8, no parity
//! - **Non-canonical, no echo**: ICANON, ECHO, ECHONL, ISIG, IEXTEN off
//! - **Read timeout**: VMIN = 0, VTIME = 5 (0.5 s), so an idle read returns
//!   no bytes instead of blocking forever

use std::fs::{self, File, OpenOptions};
use std::io::{self, Read, Write};
use std::os::unix::io::AsRawFd;
use std::path::Path;
use std::process::Command;
use std::thread;
use std::time::Duration;

use tracing::{debug, info};

use crate::error::{NiimbotError, Result};

use super::Transport;

/// Default RFCOMM device path
pub const DEFAULT_DEVICE: &str = "/dev/rfcomm0";

/// RFCOMM channel the printer listens on
pub const RFCOMM_CHANNEL: u8 = 1;

/// Read timeout in tenths of a second (VTIME)
const READ_TIMEOUT_DECISECONDS: u8 = 5;

/// # Bluetooth Printer Transport
///
/// ## Example
///
/// ```no_run
/// use niimbot::transport::BluetoothTransport;
///
/// let transport = BluetoothTransport::open("/dev/rfcomm0")?;
/// # Ok::<(), niimbot::error::NiimbotError>(())
/// ```
pub struct BluetoothTransport {
    file: File,
}

impl BluetoothTransport {
    /// Open a bound RFCOMM device.
    ///
    /// ## Errors
    ///
    /// Returns an error if:
    /// - The device doesn't exist
    /// - Permission denied (may need root or dialout group)
    /// - TTY configuration fails
    pub fn open<P: AsRef<Path>>(device: P) -> Result<Self> {
        let path = device.as_ref();

        let file = OpenOptions::new()
            .read(true)
            .write(true)
            .open(path)
            .map_err(|e| {
                NiimbotError::Transport(format!("Failed to open {}: {}", path.display(), e))
            })?;

        configure_tty_raw(file.as_raw_fd())?;
        info!(device = %path.display(), "rfcomm device opened");

        Ok(Self { file })
    }

    /// Connect by MAC address, reusing an existing RFCOMM binding if there is
    /// one and binding `/dev/rfcomm<index>` otherwise.
    pub fn connect(mac: &str, index: u8) -> Result<Self> {
        if !is_valid_mac(mac) {
            return Err(NiimbotError::InvalidArgument(format!(
                "invalid Bluetooth address '{}'",
                mac
            )));
        }

        let device = match find_rfcomm_for_mac(mac)? {
            Some(device) => device,
            None => bind_rfcomm(mac, index)?,
        };
        Self::open(device)
    }
}

impl Transport for BluetoothTransport {
    fn read(&mut self, max_len: usize) -> Result<Vec<u8>> {
        let mut buf = vec![0u8; max_len];
        match self.file.read(&mut buf) {
            Ok(n) => {
                buf.truncate(n);
                Ok(buf)
            }
            Err(e) if matches!(e.kind(), io::ErrorKind::WouldBlock | io::ErrorKind::TimedOut) => {
                Ok(Vec::new())
            }
            Err(e) => Err(e.into()),
        }
    }

    fn write(&mut self, data: &[u8]) -> Result<()> {
        self.file.write_all(data)?;
        self.file.flush()?;
        Ok(())
    }
}

/// Configure a file descriptor for raw TTY mode with a short read timeout.
///
/// IXON/IXOFF/IXANY must be off: 0x11 (XON) and 0x13 (XOFF) appear in
/// frame payloads and raster rows.
fn configure_tty_raw(fd: i32) -> Result<()> {
    use std::mem::MaybeUninit;

    let mut termios = MaybeUninit::uninit();
    let result = unsafe { libc::tcgetattr(fd, termios.as_mut_ptr()) };
    if result != 0 {
        return Err(NiimbotError::Transport(format!(
            "tcgetattr failed: {}",
            io::Error::last_os_error()
        )));
    }
    let mut termios = unsafe { termios.assume_init() };

    termios.c_iflag &= !(libc::IGNBRK
        | libc::BRKINT
        | libc::PARMRK
        | libc::ISTRIP
        | libc::INLCR
        | libc::IGNCR
        | libc::ICRNL
        | libc::IXON
        | libc::IXOFF
        | libc::IXANY);
    termios.c_oflag &= !libc::OPOST;
    termios.c_lflag &= !(libc::ECHO | libc::ECHONL | libc::ICANON | libc::ISIG | libc::IEXTEN);
    termios.c_cflag &= !(libc::CSIZE | libc::PARENB);
    termios.c_cflag |= libc::CS8 | libc::CREAD | libc::CLOCAL;

    termios.c_cc[libc::VMIN] = 0;
    termios.c_cc[libc::VTIME] = READ_TIMEOUT_DECISECONDS;

    let result = unsafe { libc::tcsetattr(fd, libc::TCSANOW, &termios) };
    if result != 0 {
        return Err(NiimbotError::Transport(format!(
            "tcsetattr failed: {}",
            io::Error::last_os_error()
        )));
    }

    Ok(())
}

// ============================================================================
// RFCOMM SETUP HELPERS
// ============================================================================

/// Validate a Bluetooth MAC address format (XX:XX:XX:XX:XX:XX).
pub fn is_valid_mac(mac: &str) -> bool {
    let parts: Vec<&str> = mac.split(':').collect();
    if parts.len() != 6 {
        return false;
    }
    parts
        .iter()
        .all(|part| part.len() == 2 && part.chars().all(|c| c.is_ascii_hexdigit()))
}

/// Find the RFCOMM device name bound to `mac` in a `/proc/net/rfcomm`
/// or `rfcomm -a` listing.
///
/// Lines look like `rfcomm0: XX:XX:XX:XX:XX:XX channel 1 clean`.
fn device_in_listing(listing: &str, mac: &str) -> Option<String> {
    let mac_upper = mac.to_uppercase();
    listing
        .lines()
        .filter(|line| line.to_uppercase().contains(&mac_upper))
        .filter_map(|line| line.split(':').next())
        .map(|name| format!("/dev/{}", name.trim()))
        .next()
}

/// Find an existing RFCOMM device bound to the given MAC address.
///
/// Checks `/proc/net/rfcomm` and falls back to `rfcomm -a`.
pub fn find_rfcomm_for_mac(mac: &str) -> Result<Option<String>> {
    if let Ok(contents) = fs::read_to_string("/proc/net/rfcomm") {
        if let Some(device) = device_in_listing(&contents, mac) {
            if Path::new(&device).exists() {
                return Ok(Some(device));
            }
        }
    }

    let output = Command::new("rfcomm")
        .arg("-a")
        .output()
        .map_err(|e| NiimbotError::Transport(format!("Failed to run 'rfcomm -a': {}", e)))?;

    let stdout = String::from_utf8_lossy(&output.stdout);
    Ok(device_in_listing(&stdout, mac).filter(|device| Path::new(device).exists()))
}

/// Bind `/dev/rfcomm<index>` to `mac` on RFCOMM channel 1.
///
/// **Requires root privileges.**
pub fn bind_rfcomm(mac: &str, index: u8) -> Result<String> {
    let mac_upper = mac.to_uppercase();
    let device_path = format!("/dev/rfcomm{}", index);

    info!(mac = %mac_upper, device = %device_path, "binding rfcomm");
    let output = Command::new("rfcomm")
        .arg("bind")
        .arg(index.to_string())
        .arg(&mac_upper)
        .arg(RFCOMM_CHANNEL.to_string())
        .output()
        .map_err(|e| NiimbotError::Transport(format!("Failed to run rfcomm bind: {}", e)))?;

    if !output.status.success() {
        let stderr = String::from_utf8_lossy(&output.stderr);
        return Err(NiimbotError::Transport(format!(
            "rfcomm bind failed: {}",
            stderr.trim()
        )));
    }

    // udev needs a moment to create the node
    thread::sleep(Duration::from_millis(500));

    if !Path::new(&device_path).exists() {
        return Err(NiimbotError::Transport(format!(
            "Device {} was not created",
            device_path
        )));
    }

    debug!(device = %device_path, "rfcomm device created");
    Ok(device_path)
}

// ============================================================================
// TESTS
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_device_path() {
        assert_eq!(DEFAULT_DEVICE, "/dev/rfcomm0");
    }

    #[test]
    fn test_valid_mac_addresses() {
        assert!(is_valid_mac("00:11:22:33:44:55"));
        assert!(is_valid_mac("AA:BB:CC:DD:EE:FF"));
        assert!(is_valid_mac("aa:bb:cc:dd:ee:ff"));
    }

    #[test]
    fn test_invalid_mac_addresses() {
        assert!(!is_valid_mac("00:11:22:33:44")); // too short
        assert!(!is_valid_mac("00:11:22:33:44:55:66")); // too long
        assert!(!is_valid_mac("00-11-22-33-44-55")); // wrong separator
        assert!(!is_valid_mac("GG:HH:II:JJ:KK:LL")); // invalid hex
        assert!(!is_valid_mac(""));
    }

    #[test]
    fn test_device_in_listing() {
        let listing = "rfcomm0: 11:22:33:44:55:66 channel 1 clean\n\
                       rfcomm1: AA:BB:CC:DD:EE:FF channel 1 connected\n";
        assert_eq!(
            device_in_listing(listing, "aa:bb:cc:dd:ee:ff"),
            Some("/dev/rfcomm1".to_string())
        );
        assert_eq!(device_in_listing(listing, "00:00:00:00:00:00"), None);
    }

    #[test]
    fn test_connect_rejects_bad_mac() {
        assert!(matches!(
            BluetoothTransport::connect("not-a-mac", 0),
            Err(NiimbotError::InvalidArgument(_))
        ));
    }

    // Note: opening a real device requires paired hardware.
}

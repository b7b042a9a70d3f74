//! # Printer Client
//!
//! One method per NIIMBOT command, on top of a [`Transceiver`].
//!
//! Commands answered with a one-byte flag return `Ok(bool)`: `true` when the
//! printer accepted the command. A missing reply is
//! [`NiimbotError::Timeout`], never `Ok(false)`.
//!
//! ## Example
//!
//! ```no_run
//! use niimbot::printer::PrinterClient;
//! use niimbot::protocol::InfoKey;
//! use niimbot::transport::SerialTransport;
//!
//! let mut client = PrinterClient::new(SerialTransport::open("/dev/ttyACM0")?);
//! if let Some(battery) = client.get_info(InfoKey::Battery)? {
//!     println!("battery: {}", battery);
//! }
//! # Ok::<(), niimbot::error::NiimbotError>(())
//! ```

use image::GrayImage;
use tracing::debug;

use crate::error::{NiimbotError, Result};
use crate::protocol::commands::{Command, InfoKey, RequestCode};
use crate::protocol::packet::Packet;
use crate::protocol::status::{Heartbeat, InfoValue, PrintStatus, RfidTag};
use crate::transceiver::{RetryPolicy, Transceiver};
use crate::transport::Transport;

use super::config::PrinterModel;
use super::session::{PrintOptions, PrintSession};

/// Label types accepted by SET_LABEL_TYPE
pub const LABEL_TYPES: std::ops::RangeInclusive<u8> = 1..=3;

/// Densities accepted by SET_LABEL_DENSITY
pub const DENSITIES: std::ops::RangeInclusive<u8> = 1..=5;

/// High-level interface to one printer.
pub struct PrinterClient<T: Transport> {
    transceiver: Transceiver<T>,
    model: Option<PrinterModel>,
}

impl<T: Transport> PrinterClient<T> {
    pub fn new(transport: T) -> Self {
        Self {
            transceiver: Transceiver::new(transport),
            model: None,
        }
    }

    pub fn with_policy(transport: T, policy: RetryPolicy) -> Self {
        Self {
            transceiver: Transceiver::with_policy(transport, policy),
            model: None,
        }
    }

    /// Attach the model, enabling image width checks.
    pub fn model(mut self, model: PrinterModel) -> Self {
        self.model = Some(model);
        self
    }

    pub fn printer_model(&self) -> Option<PrinterModel> {
        self.model
    }

    pub fn transceiver(&mut self) -> &mut Transceiver<T> {
        &mut self.transceiver
    }

    /// Release the transport.
    pub fn into_inner(self) -> T {
        self.transceiver.into_inner()
    }

    // ========================================================================
    // PRINTING
    // ========================================================================

    /// Print `image` at `density` (1-5) with default options.
    pub fn print_image(&mut self, image: &GrayImage, density: u8) -> Result<()> {
        self.print_image_with(image, &PrintOptions::new(density))
    }

    /// Print `image` with explicit options.
    pub fn print_image_with(&mut self, image: &GrayImage, options: &PrintOptions) -> Result<()> {
        PrintSession::new(self, options.clone()).run(image)
    }

    /// Send one raster row. Rows are not acknowledged.
    pub fn send_row(&mut self, row: &Packet) -> Result<()> {
        self.transceiver.send(row)
    }

    // ========================================================================
    // FLAG COMMANDS
    // ========================================================================

    fn flag_command(&mut self, code: RequestCode, payload: &[u8]) -> Result<bool> {
        let reply = self.expect_reply(Command::Static(code), payload)?;
        let ok = reply.flag();
        debug!(command = code.name(), ok, "flag reply");
        Ok(ok)
    }

    fn expect_reply(&mut self, command: Command, payload: &[u8]) -> Result<Packet> {
        self.transceiver
            .transceive_command(command, payload)?
            .ok_or(NiimbotError::Timeout {
                request: command.request().code(),
            })
    }

    pub fn set_label_type(&mut self, label_type: u8) -> Result<bool> {
        if !LABEL_TYPES.contains(&label_type) {
            return Err(NiimbotError::InvalidArgument(format!(
                "label type must be 1-3, got {}",
                label_type
            )));
        }
        self.flag_command(RequestCode::SetLabelType, &[label_type])
    }

    pub fn set_label_density(&mut self, density: u8) -> Result<bool> {
        if !DENSITIES.contains(&density) {
            return Err(NiimbotError::InvalidArgument(format!(
                "density must be 1-5, got {}",
                density
            )));
        }
        self.flag_command(RequestCode::SetLabelDensity, &[density])
    }

    pub fn start_print(&mut self) -> Result<bool> {
        self.flag_command(RequestCode::StartPrint, &[1])
    }

    pub fn end_print(&mut self) -> Result<bool> {
        self.flag_command(RequestCode::EndPrint, &[1])
    }

    pub fn start_page_print(&mut self) -> Result<bool> {
        self.flag_command(RequestCode::StartPagePrint, &[1])
    }

    pub fn end_page_print(&mut self) -> Result<bool> {
        self.flag_command(RequestCode::EndPagePrint, &[1])
    }

    /// Not understood by B21 firmware, which answers "not supported".
    pub fn allow_print_clear(&mut self) -> Result<bool> {
        self.flag_command(RequestCode::AllowPrintClear, &[1])
    }

    /// Page size in dots: rows first, then columns.
    pub fn set_dimension(&mut self, height: u16, width: u16) -> Result<bool> {
        let mut payload = [0u8; 4];
        payload[..2].copy_from_slice(&height.to_be_bytes());
        payload[2..].copy_from_slice(&width.to_be_bytes());
        self.flag_command(RequestCode::SetDimension, &payload)
    }

    pub fn set_quantity(&mut self, quantity: u16) -> Result<bool> {
        self.flag_command(RequestCode::SetQuantity, &quantity.to_be_bytes())
    }

    // ========================================================================
    // QUERIES
    // ========================================================================

    pub fn get_print_status(&mut self) -> Result<PrintStatus> {
        let reply = self.expect_reply(Command::Static(RequestCode::GetPrintStatus), &[1])?;
        PrintStatus::decode(&reply.data)
    }

    /// `Ok(None)` when the printer did not answer this key.
    pub fn get_info(&mut self, key: InfoKey) -> Result<Option<InfoValue>> {
        let reply = self
            .transceiver
            .transceive_command(Command::Info(key), &[key.code()])?;
        Ok(reply.map(|pkt| InfoValue::decode(key, &pkt.data)))
    }

    pub fn heartbeat(&mut self) -> Result<Heartbeat> {
        let reply = self.expect_reply(Command::Static(RequestCode::Heartbeat), &[1])?;
        Ok(Heartbeat::decode(&reply.data))
    }

    /// Tag of the loaded label roll; `Ok(None)` when no tag was read.
    pub fn get_rfid(&mut self) -> Result<Option<RfidTag>> {
        let reply = self.expect_reply(Command::Static(RequestCode::GetRfid), &[1])?;
        RfidTag::decode(&reply.data)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::protocol::packet;
    use crate::transport::MockTransport;
    use std::time::Duration;

    fn client(reads: Vec<Vec<u8>>) -> PrinterClient<MockTransport> {
        let mut mock = MockTransport::new();
        for r in reads {
            mock.push_read(r);
        }
        PrinterClient::with_policy(
            mock,
            RetryPolicy {
                attempts: 6,
                interval: Duration::ZERO,
            },
        )
    }

    fn frame(kind: u8, data: &[u8]) -> Vec<u8> {
        packet::encode(kind, data).unwrap()
    }

    fn written(client: PrinterClient<MockTransport>) -> Vec<Vec<u8>> {
        client.into_inner().written
    }

    #[test]
    fn test_set_density_uses_plus_sixteen_reply() {
        let mut c = client(vec![frame(0x31, &[1])]);
        assert!(c.set_label_density(3).unwrap());
        assert_eq!(written(c), vec![frame(0x21, &[3])]);
    }

    #[test]
    fn test_set_density_out_of_range() {
        let mut c = client(vec![]);
        assert!(matches!(
            c.set_label_density(6),
            Err(NiimbotError::InvalidArgument(_))
        ));
        assert!(matches!(
            c.set_label_density(0),
            Err(NiimbotError::InvalidArgument(_))
        ));
        assert!(written(c).is_empty());
    }

    #[test]
    fn test_set_label_type_range() {
        let mut c = client(vec![frame(0x33, &[0])]);
        assert!(c.set_label_type(4).is_err());
        assert!(!c.set_label_type(2).unwrap());
    }

    #[test]
    fn test_set_dimension_height_then_width() {
        let mut c = client(vec![frame(0x14, &[1])]);
        assert!(c.set_dimension(240, 384).unwrap());
        assert_eq!(written(c), vec![frame(0x13, &[0x00, 0xF0, 0x01, 0x80])]);
    }

    #[test]
    fn test_set_quantity() {
        let mut c = client(vec![frame(0x16, &[1])]);
        assert!(c.set_quantity(2).unwrap());
        assert_eq!(written(c), vec![frame(0x15, &[0x00, 0x02])]);
    }

    #[test]
    fn test_flag_command_timeout() {
        let mut c = client(vec![]);
        assert!(matches!(
            c.start_print(),
            Err(NiimbotError::Timeout { request: 0x01 })
        ));
    }

    #[test]
    fn test_get_print_status() {
        let mut c = client(vec![frame(0xB3, &[0, 1, 100, 100, 0, 0, 0, 0, 0, 0])]);
        let status = c.get_print_status().unwrap();
        assert!(status.idle);
        assert_eq!(status.progress1, 100);
    }

    #[test]
    fn test_get_info_battery() {
        let mut c = client(vec![frame(10, &[3])]);
        assert_eq!(
            c.get_info(InfoKey::Battery).unwrap(),
            Some(InfoValue::Number(3))
        );
    }

    #[test]
    fn test_get_info_no_reply() {
        let mut c = client(vec![]);
        assert_eq!(c.get_info(InfoKey::SoftVersion).unwrap(), None);
    }

    #[test]
    fn test_heartbeat() {
        let mut c = client(vec![frame(0xDD, &[0, 0, 0, 0, 0, 0, 0, 0, 0, 1, 4, 0, 1])]);
        let hb = c.heartbeat().unwrap();
        assert_eq!(hb.closing_state(), Some(1));
        assert_eq!(hb.power_level(), Some(4));
        assert_eq!(hb.paper_state(), Some(0));
        assert_eq!(hb.rfid_read_state(), Some(1));
    }

    #[test]
    fn test_get_rfid_no_tag() {
        let mut c = client(vec![frame(0x1B, &[0])]);
        assert_eq!(c.get_rfid().unwrap(), None);
    }

    #[test]
    fn test_allow_print_clear_not_supported() {
        let mut c = client(vec![frame(0x00, &[])]);
        assert!(matches!(
            c.allow_print_clear(),
            Err(NiimbotError::NotSupported { request: 0x20 })
        ));
    }
}

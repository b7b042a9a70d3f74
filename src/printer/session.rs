//! # Print Session
//!
//! Sequences the commands of one print job.
//!
//! ## State Machine
//!
//! ```text
//! Idle ──density, label type──► Configured ──start print──► JobStarted
//!                                                              │
//!         ┌──────────── start page, set dimension ◄────────────┘
//!         ▼
//!   PageStarted ──rows──► Streaming ──end page──► PageEnded
//!                                                    │
//!         ┌──────────── poll status until idle ◄─────┘
//!         ▼
//!   PollingStatus ──end print (retried)──► JobEnded
//!
//!   any rejected step or missing reply ──► Failed
//! ```
//!
//! ## Retry Asymmetry
//!
//! Configuration and start steps fail fast: a falsy flag or a timeout ends
//! the session. END_PRINT is different. The printer rejects it while it is
//! still finalizing the page, so it is resent every retry interval until it
//! succeeds, timeouts included.
//!
//! Status polling has no upper bound either. Each poll is a fresh
//! GET_PRINT_STATUS round trip; the printer never pushes status.

use std::fmt;
use std::thread;

use image::GrayImage;
use tracing::{debug, info, warn};

use crate::error::{NiimbotError, Result};
use crate::protocol::raster::{Dithering, RasterEncoder};
use crate::transport::Transport;

use super::client::{DENSITIES, LABEL_TYPES, PrinterClient};

/// Session progress, in order.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionState {
    Idle,
    Configured,
    JobStarted,
    PageStarted,
    Streaming,
    PageEnded,
    PollingStatus,
    JobEnded,
    Failed,
}

impl fmt::Display for SessionState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            SessionState::Idle => "idle",
            SessionState::Configured => "configured",
            SessionState::JobStarted => "job started",
            SessionState::PageStarted => "page started",
            SessionState::Streaming => "streaming",
            SessionState::PageEnded => "page ended",
            SessionState::PollingStatus => "polling status",
            SessionState::JobEnded => "job ended",
            SessionState::Failed => "failed",
        };
        f.write_str(name)
    }
}

/// Parameters of one print job.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PrintOptions {
    /// 1-5
    pub density: u8,
    /// 1-3; 1 is gapped labels
    pub label_type: u8,
    pub dithering: Dithering,
    /// Sent with SET_QUANTITY when set. B21 firmware rejects the command.
    pub quantity: Option<u16>,
}

impl PrintOptions {
    pub fn new(density: u8) -> Self {
        Self {
            density,
            ..Self::default()
        }
    }
}

impl Default for PrintOptions {
    fn default() -> Self {
        Self {
            density: 3,
            label_type: 1,
            dithering: Dithering::Threshold,
            quantity: None,
        }
    }
}

/// One print job in flight.
pub struct PrintSession<'a, T: Transport> {
    client: &'a mut PrinterClient<T>,
    options: PrintOptions,
    state: SessionState,
}

impl<'a, T: Transport> PrintSession<'a, T> {
    pub fn new(client: &'a mut PrinterClient<T>, options: PrintOptions) -> Self {
        Self {
            client,
            options,
            state: SessionState::Idle,
        }
    }

    pub fn state(&self) -> SessionState {
        self.state
    }

    /// Run the whole job. On error the session is left in
    /// [`SessionState::Failed`] and nothing more is sent.
    pub fn run(&mut self, image: &GrayImage) -> Result<()> {
        let result = self
            .validate(image)
            .and_then(|(rows, width, height)| self.drive(rows, width, height));

        match result {
            Ok(()) => {
                info!("print job finished");
                Ok(())
            }
            Err(e) => {
                warn!(state = %self.state, "print job failed: {}", e);
                self.state = SessionState::Failed;
                Err(e)
            }
        }
    }

    /// Check everything that can be checked before the first command, and
    /// prepare the rows.
    fn validate(&self, image: &GrayImage) -> Result<(RasterEncoder, u16, u16)> {
        if !DENSITIES.contains(&self.options.density) {
            return Err(NiimbotError::InvalidArgument(format!(
                "density must be 1-5, got {}",
                self.options.density
            )));
        }
        if !LABEL_TYPES.contains(&self.options.label_type) {
            return Err(NiimbotError::InvalidArgument(format!(
                "label type must be 1-3, got {}",
                self.options.label_type
            )));
        }
        if image.width() == 0 || image.height() == 0 {
            return Err(NiimbotError::InvalidArgument("image is empty".into()));
        }
        if let Some(model) = self.client.printer_model() {
            if self.options.density > model.max_density {
                return Err(NiimbotError::InvalidArgument(format!(
                    "{} supports density 1-{}, got {}",
                    model.name.to_uppercase(),
                    model.max_density,
                    self.options.density
                )));
            }
            if image.width() > model.max_width_dots {
                return Err(NiimbotError::ImageTooWide {
                    width: image.width(),
                    max: model.max_width_dots,
                });
            }
        }

        let rows = RasterEncoder::new(image, self.options.dithering)?;
        let width = u16::try_from(image.width())
            .map_err(|_| NiimbotError::InvalidArgument("image too wide".into()))?;
        let height = u16::try_from(image.height())
            .map_err(|_| NiimbotError::InvalidArgument("image too tall".into()))?;
        Ok((rows, width, height))
    }

    fn enter(&mut self, state: SessionState) {
        debug!(from = %self.state, to = %state, "session transition");
        self.state = state;
    }

    fn require(ok: bool, step: &'static str) -> Result<()> {
        if ok {
            Ok(())
        } else {
            Err(NiimbotError::CommandRejected(step))
        }
    }

    fn drive(&mut self, rows: RasterEncoder, width: u16, height: u16) -> Result<()> {
        info!(width, height, density = self.options.density, "starting print job");

        // Idle → Configured
        Self::require(
            self.client.set_label_density(self.options.density)?,
            "label density",
        )?;
        Self::require(
            self.client.set_label_type(self.options.label_type)?,
            "label type",
        )?;
        self.enter(SessionState::Configured);

        // Configured → JobStarted
        Self::require(self.client.start_print()?, "start print")?;
        self.enter(SessionState::JobStarted);

        // JobStarted → PageStarted
        Self::require(self.client.start_page_print()?, "start page print")?;
        Self::require(self.client.set_dimension(height, width)?, "dimension")?;
        if let Some(quantity) = self.options.quantity {
            Self::require(self.client.set_quantity(quantity)?, "quantity")?;
        }
        self.enter(SessionState::PageStarted);

        // PageStarted → Streaming → PageEnded
        self.enter(SessionState::Streaming);
        for row in rows {
            self.client.send_row(&row)?;
        }
        debug!(rows = height, "rows sent");
        self.client.end_page_print()?;
        self.enter(SessionState::PageEnded);

        // PageEnded → PollingStatus
        self.enter(SessionState::PollingStatus);
        self.wait_until_idle()?;

        // PollingStatus → JobEnded
        self.finish_job()?;
        self.enter(SessionState::JobEnded);
        Ok(())
    }

    fn wait_until_idle(&mut self) -> Result<()> {
        loop {
            let status = self.client.get_print_status()?;
            debug!(
                idle = status.idle,
                progress1 = status.progress1,
                progress2 = status.progress2,
                error_code = status.error_code,
                "print status"
            );
            if status.open_paper_compartment() {
                warn!("printer reports the paper compartment is open");
            }
            if status.idle {
                return Ok(());
            }
        }
    }

    fn finish_job(&mut self) -> Result<()> {
        let interval = self.client.transceiver().policy().interval;
        loop {
            match self.client.end_print() {
                Ok(true) => return Ok(()),
                Ok(false) => debug!("end print rejected, printer still busy"),
                Err(NiimbotError::Timeout { .. }) => debug!("end print unanswered, retrying"),
                Err(e) => return Err(e),
            }
            thread::sleep(interval);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_options() {
        let options = PrintOptions::default();
        assert_eq!(options.density, 3);
        assert_eq!(options.label_type, 1);
        assert_eq!(options.quantity, None);
        assert_eq!(PrintOptions::new(5).density, 5);
    }

    #[test]
    fn test_state_display() {
        assert_eq!(SessionState::PollingStatus.to_string(), "polling status");
        assert_eq!(SessionState::Failed.to_string(), "failed");
    }
}

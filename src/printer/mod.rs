//! # Printer Module
//!
//! This module provides the high-level printer API.
//!
//! ## Modules
//!
//! - [`client`]: One method per printer command
//! - [`session`]: Print job state machine
//! - [`config`]: Printer hardware specifications

pub mod client;
pub mod config;
pub mod session;

pub use client::PrinterClient;
pub use config::PrinterModel;
pub use session::{PrintOptions, PrintSession, SessionState};

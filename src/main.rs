//! # niimbot CLI
//!
//! Command-line interface for NIIMBOT label printers.
//!
//! ## Usage
//!
//! ```bash
//! # Print an image on the only USB printer attached
//! niimbot print label.png
//!
//! # Darker print, rotated for a portrait label, photo dithering
//! niimbot print --density 5 --rotate 90 --dither photo.jpg
//!
//! # Print over Bluetooth
//! niimbot --transport bluetooth --address AA:BB:CC:DD:EE:FF --model d110 print label.png
//!
//! # Device information and live status
//! niimbot info
//! niimbot status --json
//! ```

use std::path::{Path, PathBuf};

use clap::{Parser, Subcommand, ValueEnum};
use image::{GrayImage, imageops};
use serde::Serialize;
use tracing_subscriber::EnvFilter;

use niimbot::{
    NiimbotError, PrintOptions, PrinterClient, PrinterModel, Transport,
    protocol::{Dithering, Heartbeat, InfoKey, InfoValue, RfidTag},
    transport::{SerialTransport, serial},
};

/// niimbot - NIIMBOT label printer utility
#[derive(Parser, Debug)]
#[command(name = "niimbot")]
#[command(author, version, about, long_about = None)]
struct Cli {
    /// Increase log verbosity (-v info, -vv debug, -vvv trace)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    verbose: u8,

    /// How to reach the printer
    #[arg(long, value_enum, default_value = "serial", global = true)]
    transport: TransportKind,

    /// Serial port or RFCOMM device (autodetected when omitted)
    #[arg(long, env = "NIIMBOT_PORT", global = true)]
    port: Option<String>,

    /// Bluetooth MAC address of the printer
    #[arg(long, env = "NIIMBOT_ADDRESS", global = true)]
    address: Option<String>,

    /// Printer model (b1, b18, b21, d11, d110; autodetected over USB)
    #[arg(long, env = "NIIMBOT_MODEL", global = true)]
    model: Option<String>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(ValueEnum, Clone, Copy, Debug, PartialEq, Eq)]
enum TransportKind {
    Serial,
    Bluetooth,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Print an image
    Print {
        /// Image file (any format the image crate reads)
        image: PathBuf,

        /// Print density, 1 (light) to 5 (dark)
        #[arg(short, long, default_value = "3")]
        density: u8,

        /// Label type: 1 gapped, 2 black mark, 3 continuous
        #[arg(long, default_value = "1")]
        label_type: u8,

        /// Floyd-Steinberg dithering instead of a hard threshold
        #[arg(long)]
        dither: bool,

        /// Rotate the image clockwise before printing
        #[arg(short, long, default_value = "0", value_parser = ["0", "90", "180", "270"])]
        rotate: String,

        /// Number of copies (not supported by B21 firmware)
        #[arg(long)]
        quantity: Option<u16>,
    },

    /// Show device information
    Info {
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },

    /// Show heartbeat and label roll status
    Status {
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },
}

fn main() {
    let cli = Cli::parse();
    init_logging(cli.verbose);

    if let Err(e) = run(cli) {
        eprintln!("Error: {}", e);
        std::process::exit(1);
    }
}

/// Log to stderr; `RUST_LOG` overrides `-v`.
fn init_logging(verbose: u8) {
    let level = match verbose {
        0 => "warn",
        1 => "info",
        2 => "debug",
        _ => "trace",
    };
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(format!("niimbot={}", level)));

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
}

fn run(cli: Cli) -> Result<(), NiimbotError> {
    let (transport, model) = connect(&cli)?;
    let mut client = PrinterClient::new(transport);
    if let Some(model) = model {
        client = client.model(model);
    }

    match cli.command {
        Commands::Print {
            image,
            density,
            label_type,
            dither,
            rotate,
            quantity,
        } => {
            let img = load_image(&image, &rotate)?;
            let options = PrintOptions {
                density,
                label_type,
                dithering: if dither {
                    Dithering::FloydSteinberg
                } else {
                    Dithering::Threshold
                },
                quantity,
            };

            println!("Printing {} ({}x{})...", image.display(), img.width(), img.height());
            client.print_image_with(&img, &options)?;
            println!("Printed successfully!");
        }
        Commands::Info { json } => print_info(&mut client, json)?,
        Commands::Status { json } => print_status(&mut client, json)?,
    }

    Ok(())
}

/// Open the transport selected on the command line.
fn connect(cli: &Cli) -> Result<(Box<dyn Transport>, Option<PrinterModel>), NiimbotError> {
    match cli.transport {
        TransportKind::Serial => {
            let resolved = serial::resolve(cli.port.as_deref(), cli.model.as_deref())?;
            match &resolved.serial_number {
                Some(sn) => println!(
                    "Connecting to printer {} (Serial No. {}) on {}",
                    resolved.model.name.to_uppercase(),
                    sn,
                    resolved.port_name
                ),
                None => println!(
                    "Connecting to printer {} on {}",
                    resolved.model.name.to_uppercase(),
                    resolved.port_name
                ),
            }
            let transport = SerialTransport::open(&resolved.port_name)?;
            Ok((Box::new(transport), Some(resolved.model)))
        }
        TransportKind::Bluetooth => connect_bluetooth(cli),
    }
}

#[cfg(unix)]
fn connect_bluetooth(cli: &Cli) -> Result<(Box<dyn Transport>, Option<PrinterModel>), NiimbotError> {
    use niimbot::transport::BluetoothTransport;

    let model = cli
        .model
        .as_deref()
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

    let transport = match (&cli.address, &cli.port) {
        (Some(mac), _) => BluetoothTransport::connect(mac, 0)?,
        (None, Some(device)) => BluetoothTransport::open(device)?,
        (None, None) => {
            return Err(NiimbotError::InvalidArgument(
                "--address or --port is required for Bluetooth".into(),
            ));
        }
    };
    Ok((Box::new(transport), model))
}

#[cfg(not(unix))]
fn connect_bluetooth(_cli: &Cli) -> Result<(Box<dyn Transport>, Option<PrinterModel>), NiimbotError> {
    Err(NiimbotError::Transport(
        "Bluetooth is only supported on Unix".into(),
    ))
}

/// Load an image as grayscale and apply the requested rotation.
fn load_image(path: &Path, rotate: &str) -> Result<GrayImage, NiimbotError> {
    let img = image::open(path)
        .map_err(|e| NiimbotError::Image(format!("Failed to open {}: {}", path.display(), e)))?
        .to_luma8();

    Ok(match rotate {
        "90" => imageops::rotate90(&img),
        "180" => imageops::rotate180(&img),
        "270" => imageops::rotate270(&img),
        _ => img,
    })
}

fn print_info<T: Transport>(client: &mut PrinterClient<T>, json: bool) -> Result<(), NiimbotError> {
    let mut values: Vec<(&'static str, Option<InfoValue>)> = Vec::new();
    for key in InfoKey::ALL {
        let value = match client.get_info(key) {
            Ok(value) => value,
            Err(NiimbotError::NotSupported { .. } | NiimbotError::InvalidCommand { .. }) => None,
            Err(e) => return Err(e),
        };
        values.push((key.name(), value));
    }

    if json {
        let map: serde_json::Map<String, serde_json::Value> = values
            .into_iter()
            .map(|(name, value)| (name.to_string(), serde_json::json!(value)))
            .collect();
        println!("{}", to_json(&map)?);
    } else {
        for (name, value) in values {
            match value {
                Some(v) => println!("{:<20} {}", name, v),
                None => println!("{:<20} -", name),
            }
        }
    }
    Ok(())
}

#[derive(Serialize)]
struct StatusReport {
    heartbeat: Heartbeat,
    closing_state: Option<u8>,
    power_level: Option<u8>,
    paper_state: Option<u8>,
    rfid_read_state: Option<u8>,
    rfid: Option<RfidTag>,
}

fn print_status<T: Transport>(client: &mut PrinterClient<T>, json: bool) -> Result<(), NiimbotError> {
    let heartbeat = client.heartbeat()?;
    let rfid = client.get_rfid()?;
    let report = StatusReport {
        closing_state: heartbeat.closing_state(),
        power_level: heartbeat.power_level(),
        paper_state: heartbeat.paper_state(),
        rfid_read_state: heartbeat.rfid_read_state(),
        heartbeat,
        rfid,
    };

    if json {
        println!("{}", to_json(&report)?);
        return Ok(());
    }

    let show = |v: Option<u8>| v.map_or_else(|| "-".to_string(), |v| v.to_string());
    println!("{:<20} {}", "closing_state", show(report.closing_state));
    println!("{:<20} {}", "power_level", show(report.power_level));
    println!("{:<20} {}", "paper_state", show(report.paper_state));
    println!("{:<20} {}", "rfid_read_state", show(report.rfid_read_state));
    match &report.rfid {
        Some(tag) => {
            println!("{:<20} {}", "rfid_uuid", tag.uuid);
            println!("{:<20} {}", "rfid_barcode", tag.barcode);
            println!("{:<20} {}", "rfid_serial", tag.serial);
            println!("{:<20} {}/{}", "labels_used", tag.used_len, tag.total_len);
            println!("{:<20} {}", "label_type", tag.label_type);
        }
        None => println!("{:<20} -", "rfid"),
    }
    Ok(())
}

fn to_json<S: Serialize>(value: &S) -> Result<String, NiimbotError> {
    serde_json::to_string_pretty(value)
        .map_err(|e| NiimbotError::InvalidArgument(format!("JSON encoding failed: {}", e)))
}

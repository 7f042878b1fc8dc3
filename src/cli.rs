//! CLI argument parsing

use crate::drivers;
use aseq_core::{ReductionMode, ScanMode};
use clap::{Parser, Subcommand};
use std::path::PathBuf;

/// Parse a string as a hex or decimal u32
fn parse_hex_u32(s: &str) -> Result<u32, String> {
    if let Some(hex) = s.strip_prefix("0x").or_else(|| s.strip_prefix("0X")) {
        u32::from_str_radix(hex, 16).map_err(|e| format!("Invalid hex value: {}", e))
    } else {
        s.parse::<u32>().map_err(|e| format!("Invalid number: {}", e))
    }
}

/// Parse a scan mode by name or wire value
fn parse_scan_mode(s: &str) -> Result<ScanMode, String> {
    match s {
        "continuous" | "0" => Ok(ScanMode::Continuous),
        "first-frame-idle" | "1" => Ok(ScanMode::FirstFrameIdle),
        "every-frame-idle" | "2" => Ok(ScanMode::EveryFrameIdle),
        "frame-averaging" | "averaging" | "3" => Ok(ScanMode::FrameAveraging),
        other => Err(format!(
            "Unknown scan mode '{}' (continuous, first-frame-idle, every-frame-idle, frame-averaging)",
            other
        )),
    }
}

/// Parse a reduction mode from its averaging factor
fn parse_reduction_mode(s: &str) -> Result<ReductionMode, String> {
    match s {
        "1" => Ok(ReductionMode::NoAverage),
        "2" => Ok(ReductionMode::AverageOf2),
        "4" => Ok(ReductionMode::AverageOf4),
        "8" => Ok(ReductionMode::AverageOf8),
        other => Err(format!("Invalid reduction factor '{}' (1, 2, 4 or 8)", other)),
    }
}

/// Generate dynamic help text for the driver argument
fn driver_help() -> String {
    format!(
        "Driver to use, name[:key=value,...] [available: {}]",
        drivers::driver_names_short()
    )
}

#[derive(Parser)]
#[command(name = "aseq")]
#[command(author, version, about = "ASEQ spectrometer control", long_about = None)]
pub struct Cli {
    /// Verbosity level (-v, -vv)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    pub verbose: u8,

    #[arg(short, long, global = true, default_value = "dummy", help = driver_help())]
    pub driver: String,

    #[command(subcommand)]
    pub command: Commands,
}

/// Device selection shared across commands
#[derive(clap::Args, Debug, Clone, Default)]
pub struct DeviceArgs {
    /// Serial number of the device (first device when omitted)
    #[arg(short, long)]
    pub serial: Option<String>,
}

#[derive(Subcommand)]
pub enum Commands {
    /// List connected devices
    List,

    /// List drivers compiled into this binary
    ListDrivers,

    /// Show acquisition and frame settings of a device
    Info {
        #[command(flatten)]
        device: DeviceArgs,
    },

    /// Reset a device to factory acquisition settings
    Reset {
        #[command(flatten)]
        device: DeviceArgs,
    },

    /// Access the user flash region
    Flash {
        #[command(flatten)]
        device: DeviceArgs,

        #[command(subcommand)]
        command: FlashCommands,
    },

    /// Capture frames from a single device
    Frames {
        #[command(flatten)]
        device: DeviceArgs,

        /// Number of scans per trigger
        #[arg(short = 'n', long, default_value_t = 1)]
        scans: u16,

        /// Number of blank scans before each frame
        #[arg(long)]
        blank_scans: Option<u16>,

        /// Scan mode
        #[arg(short, long, value_parser = parse_scan_mode)]
        mode: Option<ScanMode>,

        /// Exposure time in microseconds
        #[arg(short, long)]
        exposure: Option<u32>,

        /// First sensor element to read
        #[arg(long)]
        start: Option<u16>,

        /// Last sensor element to read
        #[arg(long)]
        end: Option<u16>,

        /// Neighbouring elements averaged on the device
        #[arg(long, value_parser = parse_reduction_mode)]
        reduction: Option<ReductionMode>,

        /// Print every element instead of a summary
        #[arg(long)]
        full: bool,
    },

    /// Read frames from several devices and synchronize the final fetch
    Simultaneous {
        /// Number of devices (all connected devices when omitted)
        #[arg(long)]
        devices: Option<usize>,

        /// Frames to read from each device
        #[arg(short, long, default_value_t = 11)]
        frames: usize,
    },
}

#[derive(Subcommand)]
pub enum FlashCommands {
    /// Read bytes from flash
    Read {
        /// Offset into the flash region (hex with 0x prefix)
        #[arg(short, long, value_parser = parse_hex_u32, default_value = "0")]
        offset: u32,

        /// Number of bytes to read
        #[arg(short, long, default_value_t = 64)]
        length: usize,

        /// Write the bytes to a file instead of a hex dump
        #[arg(short = 'O', long)]
        output: Option<PathBuf>,
    },

    /// Write bytes to flash
    Write {
        /// Offset into the flash region (hex with 0x prefix)
        #[arg(short, long, value_parser = parse_hex_u32, default_value = "0")]
        offset: u32,

        /// File to write; random bytes when omitted
        #[arg(short, long)]
        input: Option<PathBuf>,

        /// Number of random bytes to write when no input is given
        #[arg(short, long, default_value_t = 256)]
        length: usize,

        /// Read the range back and compare
        #[arg(long)]
        verify: bool,
    },

    /// Erase the whole flash region
    Erase,
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn cli_is_consistent() {
        Cli::command().debug_assert();
    }

    #[test]
    fn hex_and_decimal_offsets() {
        assert_eq!(parse_hex_u32("0x1F"), Ok(0x1F));
        assert_eq!(parse_hex_u32("31"), Ok(31));
        assert!(parse_hex_u32("0xZZ").is_err());
    }

    #[test]
    fn scan_mode_names() {
        assert_eq!(parse_scan_mode("averaging"), Ok(ScanMode::FrameAveraging));
        assert_eq!(parse_scan_mode("1"), Ok(ScanMode::FirstFrameIdle));
        assert!(parse_scan_mode("fast").is_err());
    }

    #[test]
    fn parses_flash_write() {
        let cli = Cli::parse_from([
            "aseq", "-d", "dummy:devices=2", "flash", "-s", "ASQ_SPC0000002", "write", "-o",
            "0x100", "--verify",
        ]);
        assert_eq!(cli.driver, "dummy:devices=2");
        match cli.command {
            Commands::Flash {
                device,
                command: FlashCommands::Write { offset, verify, .. },
            } => {
                assert_eq!(device.serial.as_deref(), Some("ASQ_SPC0000002"));
                assert_eq!(offset, 0x100);
                assert!(verify);
            }
            _ => panic!("expected flash write"),
        }
    }
}

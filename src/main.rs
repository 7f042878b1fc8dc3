//! aseq - ASEQ spectrometer control
//!
//! Command-line front end over `aseq-core`. Every command opens a driver
//! from the `--driver` string, connects the selected device through a
//! [`Spectrometer`] session and works on it:
//!
//! - **list / list-drivers** - enumeration
//! - **info / reset** - cached acquisition and frame settings
//! - **flash** - user flash read, write and erase
//! - **frames** - single-device capture
//! - **simultaneous** - synchronized final fetch across several devices

mod cli;
mod commands;
mod drivers;

use clap::Parser;
use cli::{Cli, Commands, DeviceArgs, FlashCommands};

use aseq_core::{Driver, Spectrometer};
use std::sync::Arc;

fn main() -> Result<(), Box<dyn std::error::Error>> {
    // Initialize logger
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let cli = Cli::parse();

    // Set log level based on verbosity
    match cli.verbose {
        0 => {} // default (info)
        1 => log::set_max_level(log::LevelFilter::Debug),
        _ => log::set_max_level(log::LevelFilter::Trace),
    }

    if let Commands::ListDrivers = cli.command {
        commands::list_drivers();
        return Ok(());
    }

    let driver = drivers::open_driver(&cli.driver)?;

    match cli.command {
        Commands::ListDrivers => Ok(()),
        Commands::List => {
            commands::list_devices(driver.as_ref());
            Ok(())
        }
        Commands::Info { device } => {
            let spectro = open_session(&driver, &device)?;
            print_device_info(&spectro);
            Ok(())
        }
        Commands::Reset { device } => {
            let mut spectro = open_session(&driver, &device)?;
            spectro.reset()?;
            println!("{} reset to factory settings", spectro);
            print_device_info(&spectro);
            Ok(())
        }
        Commands::Flash { device, command } => {
            let spectro = open_session(&driver, &device)?;
            match command {
                FlashCommands::Read {
                    offset,
                    length,
                    output,
                } => commands::flash::run_read(&spectro, offset, length, output.as_deref()),
                FlashCommands::Write {
                    offset,
                    input,
                    length,
                    verify,
                } => commands::flash::run_write(&spectro, offset, input.as_deref(), length, verify),
                FlashCommands::Erase => commands::flash::run_erase(&spectro),
            }
        }
        Commands::Frames {
            device,
            scans,
            blank_scans,
            mode,
            exposure,
            start,
            end,
            reduction,
            full,
        } => {
            let mut spectro = open_session(&driver, &device)?;
            let settings = commands::frames::CaptureSettings {
                scans,
                blank_scans,
                mode,
                exposure,
                range: (start, end),
                reduction,
            };
            commands::frames::run_capture(&mut spectro, &settings, full)
        }
        Commands::Simultaneous { devices, frames } => {
            commands::simultaneous::run(&driver, devices, frames)
        }
    }
}

/// Connect the device selected on the command line
fn open_session(
    driver: &Arc<dyn Driver>,
    device: &DeviceArgs,
) -> Result<Spectrometer, Box<dyn std::error::Error>> {
    let spectro = Spectrometer::open(driver.clone(), device.serial.as_deref())?;
    log::info!("{}", spectro);
    Ok(spectro)
}

fn print_device_info(spectro: &Spectrometer) {
    println!("Spectrometer Information");
    println!("========================");
    println!();
    println!("Serial:          {}", spectro.serial().unwrap_or("(first device)"));

    if let Some(params) = spectro.acquisition_parameters() {
        println!("Scan mode:       {}", params.scan_mode);
        println!("Scans:           {}", params.num_of_scans);
        println!("Blank scans:     {}", params.num_of_blank_scans);
        println!(
            "Exposure:        {} us ({} device units)",
            params.exposure_micros(),
            params.exposure_time
        );
    }
    if let Some(frame) = spectro.frame_parameters() {
        println!(
            "Elements:        {}..={}",
            frame.element_range.0, frame.element_range.1
        );
        println!(
            "Reduction:       {:?} (x{})",
            frame.reduction_mode,
            frame.reduction_mode.factor()
        );
        println!("Frame size:      {} values", frame.frame_size);
    }
    println!("Memory:          {:?}", spectro.memory_kind());
}

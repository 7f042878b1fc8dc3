//! Flash read, write and erase commands

use aseq_core::flash::FLASH_SIZE;
use aseq_core::Spectrometer;
use indicatif::{ProgressBar, ProgressStyle};
use rand::RngCore;
use std::fs::{self, File};
use std::io::Write;
use std::path::Path;
use std::time::Duration;

/// Chunk size for progress-reported reads (4 KiB)
const READ_CHUNK_SIZE: usize = 4096;

/// Run the flash read command
pub fn run_read(
    spectro: &Spectrometer,
    offset: u32,
    length: usize,
    output: Option<&Path>,
) -> Result<(), Box<dyn std::error::Error>> {
    let data = read_with_progress(spectro, offset, length)?;

    match output {
        Some(path) => {
            let mut file = File::create(path)?;
            file.write_all(&data)?;
            println!("Wrote {} bytes to {:?}", data.len(), path);
        }
        None => print_hex_dump(offset, &data),
    }
    Ok(())
}

/// Read a flash range in chunks with a progress bar
fn read_with_progress(
    spectro: &Spectrometer,
    offset: u32,
    length: usize,
) -> Result<Vec<u8>, Box<dyn std::error::Error>> {
    let flash = spectro.flash();
    let length = aseq_core::flash::clamp_range(offset, length)?;
    if length <= READ_CHUNK_SIZE {
        return Ok(flash.read(length, offset)?);
    }

    let pb = ProgressBar::new(length as u64);
    pb.set_style(
        ProgressStyle::default_bar()
            .template("{spinner:.green} [{elapsed_precise}] [{bar:40.cyan/blue}] {bytes}/{total_bytes} ({bytes_per_sec}, {eta})")?
            .progress_chars("#>-"),
    );

    let mut data = Vec::with_capacity(length);
    while data.len() < length {
        let chunk_size = std::cmp::min(READ_CHUNK_SIZE, length - data.len());
        let chunk = flash.read(chunk_size, offset + data.len() as u32)?;
        data.extend_from_slice(&chunk);
        pb.set_position(data.len() as u64);
    }

    pb.finish_with_message("Read complete");
    Ok(data)
}

/// Run the flash write command
///
/// Without an input file a random buffer of `length` bytes is written,
/// which is handy for exercising a device.
pub fn run_write(
    spectro: &Spectrometer,
    offset: u32,
    input: Option<&Path>,
    length: usize,
    verify: bool,
) -> Result<(), Box<dyn std::error::Error>> {
    let data = match input {
        Some(path) => fs::read(path)?,
        None => {
            let mut data = vec![0u8; length];
            rand::thread_rng().fill_bytes(&mut data);
            data
        }
    };

    let report = spectro.flash().write(&data, offset)?;
    if let Some(warning) = report.warning {
        println!("Warning: {}", warning);
    }
    if report.written < data.len() {
        println!(
            "Truncated to {} of {} bytes at end of flash (0x{:05X})",
            report.written,
            data.len(),
            FLASH_SIZE
        );
    }
    println!("Wrote {} bytes at 0x{:05X}", report.written, offset);

    if verify {
        let readback = spectro.flash().read(report.written, offset)?;
        if let Some(pos) = readback
            .iter()
            .zip(&data)
            .position(|(read, written)| read != written)
        {
            return Err(format!(
                "Verification failed at 0x{:05X}: expected 0x{:02X}, found 0x{:02X}",
                offset as usize + pos,
                data[pos],
                readback[pos]
            )
            .into());
        }
        println!("Verified {} bytes", readback.len());
    }
    Ok(())
}

/// Run the flash erase command
pub fn run_erase(spectro: &Spectrometer) -> Result<(), Box<dyn std::error::Error>> {
    let pb = ProgressBar::new_spinner();
    pb.set_style(ProgressStyle::default_spinner().template("{spinner:.green} {msg}")?);
    pb.set_message(format!(
        "Erasing {} bytes (this may take a while)...",
        FLASH_SIZE
    ));
    pb.enable_steady_tick(Duration::from_millis(100));

    spectro.flash().erase()?;

    pb.finish_with_message(format!("Erased {} bytes", FLASH_SIZE));
    Ok(())
}

fn print_hex_dump(offset: u32, data: &[u8]) {
    for (i, line) in data.chunks(16).enumerate() {
        let hex: Vec<String> = line.iter().map(|b| format!("{:02X}", b)).collect();
        let ascii: String = line
            .iter()
            .map(|&b| if b.is_ascii_graphic() { b as char } else { '.' })
            .collect();
        println!(
            "{:05X}  {:<47}  {}",
            offset as usize + i * 16,
            hex.join(" "),
            ascii
        );
    }
}

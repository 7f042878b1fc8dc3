//! Multi-device simultaneous read

use aseq_core::simultaneous::{self, FrameEvent};
use aseq_core::{Driver, ScanMode, Spectrometer};
use std::sync::{Arc, Mutex};

/// Exposure step between devices, in microseconds
const EXPOSURE_STEP_US: u32 = 10_000;

/// Open device `index` in frame-averaging mode
///
/// Device `i` gets an exposure of `(i + 1) * 10 ms` so the workers reach
/// their final frame at different times.
fn open_averaging(
    driver: &Arc<dyn Driver>,
    serials: &[String],
    index: usize,
) -> aseq_core::Result<Spectrometer> {
    let serial = serials.get(index).map(String::as_str);
    let mut spectro = Spectrometer::open(driver.clone(), serial)?;
    spectro.set_num_of_scans(1)?;
    spectro.set_num_of_blank_scans(0)?;
    spectro.set_scan_mode(ScanMode::FrameAveraging)?;
    spectro.set_exposure_time(EXPOSURE_STEP_US * (index as u32 + 1))?;
    Ok(spectro)
}

/// Run the simultaneous-read demonstration
pub fn run(
    driver: &Arc<dyn Driver>,
    devices: Option<usize>,
    frames: usize,
) -> Result<(), Box<dyn std::error::Error>> {
    let serials = Spectrometer::device_list(driver.as_ref());
    println!("Number of devices: {}", serials.len());
    for (index, serial) in serials.iter().enumerate() {
        println!("Device serial: {} (index: {})", serial, index);
    }

    let devices = devices.unwrap_or(serials.len());
    if devices > serials.len() {
        return Err(format!(
            "{} devices requested but only {} connected",
            devices,
            serials.len()
        )
        .into());
    }
    if devices == 0 {
        println!("No devices to read from");
        return Ok(());
    }

    let console = Mutex::new(());
    let report = simultaneous::read_frames(
        devices,
        frames,
        |index| open_averaging(driver, &serials, index),
        |event| {
            let _guard = console.lock().unwrap_or_else(|e| e.into_inner());
            match event {
                FrameEvent::MemoryFull { device } => {
                    println!("Device {}: memory full, restarted acquisition", device);
                }
                FrameEvent::Frame {
                    device,
                    number,
                    latency,
                    frame,
                    last,
                } => {
                    println!(
                        "Device {}: frame {} fetched in {:?}",
                        device, number, latency
                    );
                    if *last {
                        let preview: Vec<String> =
                            frame.iter().take(16).map(u16::to_string).collect();
                        println!(
                            "Device {}: final frame ({} values): {} ...",
                            device,
                            frame.len(),
                            preview.join(" ")
                        );
                    }
                }
            }
        },
    )?;

    for worker in &report.workers {
        if let (Some(start), Some(stop)) = (worker.start, worker.stop) {
            println!(
                "Device {}: final fetch took {:?}",
                worker.device,
                stop.saturating_duration_since(start)
            );
        }
    }
    match report.simultaneous() {
        Some(total) => println!("Simultaneous fetch time on all devices: {:?}", total),
        None => println!("No final frames were read"),
    }
    Ok(())
}

#[cfg(all(test, feature = "dummy"))]
mod tests {
    use super::*;
    use aseq_dummy::{DummyConfig, DummyDriver};

    #[test]
    fn runs_against_emulated_devices() {
        let driver: Arc<dyn Driver> = Arc::new(DummyDriver::new(DummyConfig::with_devices(3)));
        run(&driver, None, 3).unwrap();
    }

    #[test]
    fn rejects_more_devices_than_connected() {
        let driver: Arc<dyn Driver> = Arc::new(DummyDriver::new(DummyConfig::with_devices(2)));
        assert!(run(&driver, Some(3), 3).is_err());
    }
}

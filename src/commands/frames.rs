//! Single-device frame capture

use aseq_core::{
    AcquisitionParameters, FrameFormat, FrameMemory, FrameStatus, Memory, ReductionMode, ScanMode,
    Spectrometer, Status,
};
use std::thread;
use std::time::{Duration, Instant};

/// Extra time allowed on top of the expected acquisition time
const CAPTURE_SLACK: Duration = Duration::from_secs(5);

/// Poll interval while waiting for frames
const POLL_INTERVAL: Duration = Duration::from_millis(1);

/// Settings requested on the command line; `None` keeps the device value
#[derive(Debug, Clone, Default)]
pub struct CaptureSettings {
    pub scans: u16,
    pub blank_scans: Option<u16>,
    pub mode: Option<ScanMode>,
    /// Exposure in microseconds
    pub exposure: Option<u32>,
    pub range: (Option<u16>, Option<u16>),
    pub reduction: Option<ReductionMode>,
}

impl CaptureSettings {
    /// Merge into the cached acquisition parameters
    fn acquisition(&self, current: AcquisitionParameters) -> AcquisitionParameters {
        let scan_mode = self.mode.unwrap_or(current.scan_mode);
        let num_of_blank_scans = if scan_mode == ScanMode::FrameAveraging {
            0
        } else {
            self.blank_scans.unwrap_or(current.num_of_blank_scans)
        };
        AcquisitionParameters {
            num_of_scans: self.scans,
            num_of_blank_scans,
            scan_mode,
            exposure_time: self
                .exposure
                .map_or(current.exposure_time, aseq_core::params::exposure_units),
        }
    }

    /// Merge into the cached frame format
    fn format(&self, current: FrameFormat) -> FrameFormat {
        FrameFormat {
            start_element: self.range.0.unwrap_or(current.start_element),
            end_element: self.range.1.unwrap_or(current.end_element),
            reduction_mode: self.reduction.unwrap_or(current.reduction_mode),
        }
    }
}

/// Configure the device, trigger one acquisition and print the frames
pub fn run_capture(
    spectro: &mut Spectrometer,
    settings: &CaptureSettings,
    full: bool,
) -> Result<(), Box<dyn std::error::Error>> {
    let current = spectro
        .acquisition_parameters()
        .ok_or("device configuration not loaded")?;
    let format = spectro
        .frame_parameters()
        .ok_or("device configuration not loaded")?
        .format();

    let acquisition = settings.acquisition(current);
    if spectro.apply_acquisition_parameters(acquisition)? {
        log::info!("Acquisition parameters updated");
    }
    if spectro.apply_frame_format(settings.format(format))? {
        log::info!("Frame format updated");
    }

    let memory = spectro.memory();
    memory.clear()?;
    spectro.trigger()?;

    let timeout = Duration::from_micros(
        u64::from(acquisition.exposure_micros())
            * u64::from(acquisition.num_of_scans.max(1))
            * (u64::from(acquisition.num_of_blank_scans) + 1),
    ) + CAPTURE_SLACK;
    wait_for_frames(spectro, &memory, usize::from(acquisition.num_of_scans), timeout)?;

    let frames = memory.get_range(..)?;
    println!(
        "Captured {} frame(s) of {} values ({} mode)",
        frames.len(),
        frames.first().map_or(0, |f| f.len()),
        acquisition.scan_mode
    );
    for (i, frame) in frames.iter().enumerate() {
        if full {
            let values: Vec<String> = frame.iter().map(u16::to_string).collect();
            println!("[{}] {}", i, values.join(" "));
        } else {
            let min = frame.iter().copied().min().unwrap_or(0);
            let max = frame.iter().copied().max().unwrap_or(0);
            let sum: u64 = frame.iter().map(|&v| u64::from(v)).sum();
            let mean = if frame.is_empty() {
                0
            } else {
                sum / frame.len() as u64
            };
            println!("[{}] min {} max {} mean {}", i, min, max, mean);
        }
    }
    Ok(())
}

/// Poll until `expected` frames are stored or the averaged frame is ready
fn wait_for_frames(
    spectro: &Spectrometer,
    memory: &Memory<'_>,
    expected: usize,
    timeout: Duration,
) -> Result<(), Box<dyn std::error::Error>> {
    let deadline = Instant::now() + timeout;
    loop {
        let ready = match memory.as_latest_frame() {
            Some(latest) => latest.status()? != FrameStatus::NotReady,
            None => {
                memory.len()? >= expected || spectro.status()?.contains(Status::MEMORY_FULL)
            }
        };
        if ready {
            return Ok(());
        }
        if Instant::now() >= deadline {
            return Err(format!("no frames after {:?}", timeout).into());
        }
        thread::sleep(POLL_INTERVAL);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn averaging_forces_zero_blank_scans() {
        let settings = CaptureSettings {
            scans: 4,
            blank_scans: Some(3),
            mode: Some(ScanMode::FrameAveraging),
            ..Default::default()
        };
        let params = settings.acquisition(AcquisitionParameters::FACTORY);
        assert_eq!(params.num_of_scans, 4);
        assert_eq!(params.num_of_blank_scans, 0);
        assert_eq!(params.scan_mode, ScanMode::FrameAveraging);
    }

    #[test]
    fn unset_fields_keep_device_values() {
        let settings = CaptureSettings {
            scans: 2,
            exposure: Some(12_345),
            range: (Some(100), None),
            ..Default::default()
        };
        let params = settings.acquisition(AcquisitionParameters::FACTORY);
        assert_eq!(params.exposure_time, 1234);
        assert_eq!(params.scan_mode, AcquisitionParameters::FACTORY.scan_mode);

        let format = settings.format(FrameFormat {
            start_element: 0,
            end_element: 3647,
            reduction_mode: ReductionMode::AverageOf2,
        });
        assert_eq!(format.start_element, 100);
        assert_eq!(format.end_element, 3647);
        assert_eq!(format.reduction_mode, ReductionMode::AverageOf2);
    }

    #[cfg(feature = "dummy")]
    #[test]
    fn captures_from_emulator() {
        let driver = std::sync::Arc::new(aseq_dummy::DummyDriver::new_default());
        let mut spectro = Spectrometer::open(driver, None).unwrap();
        let settings = CaptureSettings {
            scans: 3,
            range: (Some(0), Some(9)),
            ..Default::default()
        };
        run_capture(&mut spectro, &settings, false).unwrap();
        assert_eq!(spectro.num_of_scans(), Some(3));
        assert_eq!(spectro.memory().len(), Ok(3));
    }
}

//! Simultaneous frame reads across several devices
//!
//! Each device runs on its own thread with its own [`Spectrometer`]. Threads
//! poll their device independently until they reach the last required frame,
//! then meet at a [`StartBarrier`] so that the final, timed fetch starts at
//! the same instant on every device.

use std::panic;
use std::thread;
use std::time::{Duration, Instant};

use crate::barrier::StartBarrier;
use crate::error::Result;
use crate::frame::Frame;
use crate::memory::FrameMemory;
use crate::modes::Status;
use crate::session::Spectrometer;

/// Progress reported to the observer while reading
#[derive(Debug)]
pub enum FrameEvent<'a> {
    /// Device memory filled up; it was cleared and re-triggered
    MemoryFull {
        /// Device index
        device: usize,
    },
    /// A frame was fetched
    Frame {
        /// Device index
        device: usize,
        /// Position of the frame in the run, from 0
        number: usize,
        /// Time spent in the fetch
        latency: Duration,
        /// The fetched frame
        frame: &'a Frame,
        /// Whether this was the synchronized final frame
        last: bool,
    },
}

/// Timing of one device's run
#[derive(Debug, Clone)]
pub struct WorkerReport {
    /// Device index
    pub device: usize,
    /// Fetch latency of every frame, in order
    pub latencies: Vec<Duration>,
    /// Start of the synchronized final fetch
    pub start: Option<Instant>,
    /// End of the synchronized final fetch
    pub stop: Option<Instant>,
    /// The final frame
    pub last_frame: Option<Frame>,
}

/// Timing of a simultaneous read
#[derive(Debug, Clone)]
pub struct SimultaneousReport {
    /// Per-device reports, ordered by device index
    pub workers: Vec<WorkerReport>,
}

impl SimultaneousReport {
    /// Span from the earliest final-fetch start to the latest stop
    ///
    /// `None` if no device reached its final frame.
    pub fn simultaneous(&self) -> Option<Duration> {
        let start = self.workers.iter().filter_map(|w| w.start).min()?;
        let stop = self.workers.iter().filter_map(|w| w.stop).max()?;
        Some(stop.saturating_duration_since(start))
    }
}

/// Read `frames_required` frames from each of `devices` devices in parallel
///
/// `open` is called on the worker thread with the device index and must
/// return a connected, configured session. The last frame of every device
/// is fetched right after all workers have met at a common barrier.
///
/// All workers are joined before returning; if any failed, the error of the
/// lowest device index is returned. A worker that fails before reaching the
/// barrier counts down on its way out, so the others still finish.
pub fn read_frames<F, O>(
    devices: usize,
    frames_required: usize,
    open: F,
    observer: O,
) -> Result<SimultaneousReport>
where
    F: Fn(usize) -> Result<Spectrometer> + Sync,
    O: Fn(&FrameEvent<'_>) + Sync,
{
    let barrier = StartBarrier::new(if frames_required > 0 { devices } else { 0 });
    log::debug!(
        "Reading {} frames from {} devices",
        frames_required,
        devices
    );

    let results: Vec<Result<WorkerReport>> = thread::scope(|s| {
        let workers: Vec<_> = (0..devices)
            .map(|device| {
                let (barrier, open, observer) = (&barrier, &open, &observer);
                s.spawn(move || {
                    let _arrival = ArrivalGuard(barrier);
                    let spectro = open(device)?;
                    read_device(device, &spectro, frames_required, barrier, observer)
                })
            })
            .collect();

        workers
            .into_iter()
            .map(|w| w.join().unwrap_or_else(|e| panic::resume_unwind(e)))
            .collect()
    });

    let workers = results.into_iter().collect::<Result<Vec<_>>>()?;
    Ok(SimultaneousReport { workers })
}

/// Counts a worker down when it exits
///
/// A worker that already waited finds the barrier released and the count
/// untouched; one that failed or panicked earlier stops holding the others.
struct ArrivalGuard<'a>(&'a StartBarrier);

impl Drop for ArrivalGuard<'_> {
    fn drop(&mut self) {
        if self.0.abandon() {
            log::debug!("Start barrier released by an exiting worker");
        }
    }
}

fn read_device(
    device: usize,
    spectro: &Spectrometer,
    frames_required: usize,
    barrier: &StartBarrier,
    observer: &(dyn Fn(&FrameEvent<'_>) + Sync),
) -> Result<WorkerReport> {
    let mut report = WorkerReport {
        device,
        latencies: Vec::with_capacity(frames_required),
        start: None,
        stop: None,
        last_frame: None,
    };
    if frames_required == 0 {
        return Ok(report);
    }

    let memory = spectro.memory();
    memory.clear()?;
    spectro.trigger()?;

    let mut number = 0;
    while number < frames_required {
        if spectro.status()?.contains(Status::MEMORY_FULL) {
            log::debug!("Device {}: memory full, restarting acquisition", device);
            observer(&FrameEvent::MemoryFull { device });
            memory.clear()?;
            spectro.trigger()?;
            continue;
        }

        if memory.is_empty()? {
            continue;
        }

        let last = number == frames_required - 1;
        if last {
            barrier.wait();
            report.start = Some(Instant::now());
        }

        let fetch_start = Instant::now();
        let frame = memory.get(0)?;
        let latency = fetch_start.elapsed();

        if last {
            report.stop = Some(Instant::now());
        }

        report.latencies.push(latency);
        observer(&FrameEvent::Frame {
            device,
            number,
            latency,
            frame: &frame,
            last,
        });
        if last {
            report.last_frame = Some(frame);
        }
        number += 1;
    }

    Ok(report)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn worker(device: usize, start_ms: u64, stop_ms: u64, base: Instant) -> WorkerReport {
        WorkerReport {
            device,
            latencies: Vec::new(),
            start: Some(base + Duration::from_millis(start_ms)),
            stop: Some(base + Duration::from_millis(stop_ms)),
            last_frame: None,
        }
    }

    #[test]
    fn test_simultaneous_spans_earliest_start_to_latest_stop() {
        let base = Instant::now();
        let report = SimultaneousReport {
            workers: vec![
                worker(0, 5, 9, base),
                worker(1, 2, 6, base),
                worker(2, 3, 12, base),
            ],
        };
        assert_eq!(report.simultaneous(), Some(Duration::from_millis(10)));
    }

    #[test]
    fn test_simultaneous_without_final_frames() {
        let report = SimultaneousReport {
            workers: vec![WorkerReport {
                device: 0,
                latencies: Vec::new(),
                start: None,
                stop: None,
                last_frame: None,
            }],
        };
        assert_eq!(report.simultaneous(), None);
    }

    #[test]
    fn test_no_devices() {
        let report = read_frames(
            0,
            11,
            |_| -> Result<Spectrometer> { unreachable!("no device to open") },
            |_| {},
        )
        .unwrap();
        assert!(report.workers.is_empty());
        assert_eq!(report.simultaneous(), None);
    }
}

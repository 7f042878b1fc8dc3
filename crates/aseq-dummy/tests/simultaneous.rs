use std::sync::{Arc, Mutex};

use aseq_core::error::ConnectionError;
use aseq_core::simultaneous::{self, FrameEvent};
use aseq_core::{Error, MemoryKind, ScanMode, Spectrometer};
use aseq_dummy::{DummyConfig, DummyDriver};

const DEVICES: usize = 3;
const FRAMES_REQUIRED: usize = 11;

fn open_averaging(driver: &Arc<DummyDriver>, index: usize) -> aseq_core::Result<Spectrometer> {
    let serial = driver.config().serials[index].as_str();
    let mut spectro = Spectrometer::open(driver.clone(), Some(serial))?;
    spectro.set_num_of_scans(1)?;
    spectro.set_num_of_blank_scans(0)?;
    spectro.set_scan_mode(ScanMode::FrameAveraging)?;
    spectro.set_exposure_time(10_000 * (index as u32 + 1))?;
    Ok(spectro)
}

#[test]
fn three_devices_read_in_lockstep() {
    let driver = Arc::new(DummyDriver::new(DummyConfig::with_devices(DEVICES)));
    let events = Mutex::new(Vec::new());
    let memory_kinds = Mutex::new(Vec::new());

    let report = simultaneous::read_frames(
        DEVICES,
        FRAMES_REQUIRED,
        |index| {
            let spectro = open_averaging(&driver, index)?;
            memory_kinds.lock().unwrap().push(spectro.memory_kind());
            Ok(spectro)
        },
        |event| {
            if let FrameEvent::Frame {
                device,
                number,
                last,
                ..
            } = event
            {
                events.lock().unwrap().push((*device, *number, *last));
            }
        },
    )
    .unwrap();

    assert_eq!(
        memory_kinds.into_inner().unwrap(),
        vec![MemoryKind::LatestFrame; DEVICES]
    );

    assert_eq!(report.workers.len(), DEVICES);
    for (index, worker) in report.workers.iter().enumerate() {
        assert_eq!(worker.device, index);
        assert_eq!(worker.latencies.len(), FRAMES_REQUIRED);
        assert!(worker.start.unwrap() <= worker.stop.unwrap());
        assert_eq!(worker.last_frame.as_ref().unwrap().len(), 3648);

        let params = driver.acquisition_parameters(index).unwrap();
        assert_eq!(params.exposure_time, 1000 * (index as u32 + 1));
        assert_eq!(params.scan_mode, ScanMode::FrameAveraging);
    }

    let start = report.workers.iter().filter_map(|w| w.start).min().unwrap();
    let stop = report.workers.iter().filter_map(|w| w.stop).max().unwrap();
    assert_eq!(report.simultaneous(), Some(stop - start));

    let events = events.into_inner().unwrap();
    assert_eq!(events.len(), DEVICES * FRAMES_REQUIRED);
    for device in 0..DEVICES {
        let last: Vec<_> = events
            .iter()
            .filter(|(d, _, last)| *d == device && *last)
            .collect();
        assert_eq!(last, [&(device, FRAMES_REQUIRED - 1, true)]);
    }
}

#[test]
fn final_fetches_start_after_every_device_arrived() {
    let driver = Arc::new(DummyDriver::new(DummyConfig::with_devices(DEVICES)));

    let report =
        simultaneous::read_frames(DEVICES, 2, |index| open_averaging(&driver, index), |_| {})
            .unwrap();

    // final fetches overlap: none ends before the first one began
    let starts: Vec<_> = report.workers.iter().map(|w| w.start.unwrap()).collect();
    let earliest_start = *starts.iter().min().unwrap();
    for worker in &report.workers {
        assert_eq!(worker.latencies.len(), 2);
        assert!(worker.stop.unwrap() >= earliest_start);
    }
}

#[test]
fn ring_memory_devices_read_frame_zero() {
    let driver = Arc::new(DummyDriver::new(DummyConfig::with_devices(2)));

    let report = simultaneous::read_frames(
        2,
        4,
        |index| {
            let serial = driver.config().serials[index].as_str();
            Spectrometer::open(driver.clone(), Some(serial))
        },
        |_| {},
    )
    .unwrap();

    for worker in &report.workers {
        assert_eq!(worker.latencies.len(), 4);
        assert!(worker.last_frame.is_some());
    }
    assert_eq!(driver.calls("clear_memory"), 2);
    assert_eq!(driver.calls("trigger"), 2);
}

#[test]
fn no_frames_required() {
    let driver = Arc::new(DummyDriver::new(DummyConfig::with_devices(2)));

    let report =
        simultaneous::read_frames(2, 0, |index| open_averaging(&driver, index), |_| {}).unwrap();

    assert_eq!(report.workers.len(), 2);
    assert!(report.workers.iter().all(|w| w.latencies.is_empty()));
    assert_eq!(report.simultaneous(), None);
    assert_eq!(driver.calls("trigger"), 0);
}

#[test]
fn open_failure_is_reported_after_join() {
    let driver = Arc::new(DummyDriver::new(DummyConfig::with_devices(2)));

    let err = simultaneous::read_frames(
        2,
        FRAMES_REQUIRED,
        |_| Spectrometer::open(driver.clone(), Some("ASQ_SPC9999999")),
        |_| {},
    )
    .unwrap_err();

    assert_eq!(err, Error::Connection(ConnectionError::Failed));
}

#[test]
fn one_failing_device_does_not_hold_the_others() {
    let driver = Arc::new(DummyDriver::new(DummyConfig::with_devices(2)));
    let healthy_frames = Mutex::new(Vec::new());

    let err = simultaneous::read_frames(
        2,
        FRAMES_REQUIRED,
        |index| match index {
            0 => open_averaging(&driver, 0),
            _ => Spectrometer::open(driver.clone(), Some("ASQ_SPC9999999")),
        },
        |event| {
            if let FrameEvent::Frame {
                device: 0,
                number,
                last,
                ..
            } = event
            {
                healthy_frames.lock().unwrap().push((*number, *last));
            }
        },
    )
    .unwrap_err();

    assert_eq!(err, Error::Connection(ConnectionError::Failed));
    let healthy_frames = healthy_frames.into_inner().unwrap();
    assert_eq!(healthy_frames.len(), FRAMES_REQUIRED);
    assert_eq!(healthy_frames.last(), Some(&(FRAMES_REQUIRED - 1, true)));
}

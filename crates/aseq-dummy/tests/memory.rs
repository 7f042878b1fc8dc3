use std::sync::Arc;

use aseq_core::error::OperationError;
use aseq_core::{Error, FrameMemory, FrameStatus, MemoryKind, ScanMode, Spectrometer, Status};
use aseq_dummy::{DummyConfig, DummyDriver};

fn connected(config: DummyConfig) -> (Arc<DummyDriver>, Spectrometer) {
    let driver = Arc::new(DummyDriver::new(config));
    let spectro = Spectrometer::open(driver.clone(), None).unwrap();
    (driver, spectro)
}

#[test]
fn ring_memory_counts_and_fetches_frames() {
    let (_driver, mut spectro) = connected(DummyConfig::default());
    spectro.set_num_of_scans(3).unwrap();
    spectro.set_element_range(10, 19).unwrap();

    let memory = spectro.memory();
    assert_eq!(memory.kind(), MemoryKind::Ring);
    assert!(memory.is_empty().unwrap());

    spectro.trigger().unwrap();
    assert_eq!(memory.len(), Ok(3));

    let frame = memory.get(2).unwrap();
    // user elements only, last element first
    assert_eq!(&frame[..], &[20, 19, 18, 17, 16, 15, 14, 13, 12, 11]);
}

#[test]
fn ring_memory_index_out_of_range() {
    let (driver, mut spectro) = connected(DummyConfig::default());
    spectro.set_num_of_scans(3).unwrap();
    spectro.trigger().unwrap();

    assert_eq!(
        spectro.memory().get(3),
        Err(Error::IndexOutOfRange { index: 3, len: 3 })
    );
    assert_eq!(driver.calls("get_frame"), 0);
}

#[test]
fn ring_memory_ranges_are_clamped() {
    let (driver, mut spectro) = connected(DummyConfig::default());
    spectro.set_num_of_scans(3).unwrap();
    spectro.trigger().unwrap();
    let memory = spectro.memory();

    assert_eq!(memory.get_range(..).unwrap().len(), 3);
    assert_eq!(memory.get_range(1..10).unwrap().len(), 2);
    assert!(memory.get_range(5..).unwrap().is_empty());
    assert_eq!(driver.calls("get_frame"), 5);
}

#[test]
fn ring_memory_clear() {
    let (driver, mut spectro) = connected(DummyConfig::default());
    spectro.set_num_of_scans(2).unwrap();
    spectro.trigger().unwrap();

    spectro.memory().clear().unwrap();
    assert_eq!(spectro.memory().len(), Ok(0));
    assert_eq!(driver.calls("clear_memory"), 1);
}

#[test]
fn memory_full_until_cleared() {
    let (_driver, mut spectro) = connected(DummyConfig {
        memory_frames: 4,
        ..DummyConfig::default()
    });
    spectro.set_num_of_scans(3).unwrap();

    spectro.trigger().unwrap();
    assert!(!spectro.status().unwrap().contains(Status::MEMORY_FULL));
    spectro.trigger().unwrap();
    assert!(spectro.status().unwrap().contains(Status::MEMORY_FULL));
    assert_eq!(spectro.memory().len(), Ok(4));

    spectro.memory().clear().unwrap();
    assert!(spectro.status().unwrap().is_empty());
}

#[test]
fn latest_frame_memory_in_averaging_mode() {
    let (driver, mut spectro) = connected(DummyConfig::default());
    spectro.set_scan_mode(ScanMode::FrameAveraging).unwrap();
    spectro.set_element_range(0, 9).unwrap();

    let memory = spectro.memory();
    assert_eq!(memory.kind(), MemoryKind::LatestFrame);
    assert_eq!(memory.len(), Ok(1));
    assert!(!memory.is_empty().unwrap());

    spectro.trigger().unwrap();
    // any index yields the averaged frame
    let frame = memory.get(7).unwrap();
    assert_eq!(frame.len(), 10);
    assert_eq!(memory.get_range(0..5).unwrap().len(), 1);
    assert!(memory.get_range(1..).unwrap().is_empty());

    // nothing is cleared on the device
    memory.clear().unwrap();
    assert_eq!(driver.calls("clear_memory"), 0);
}

#[test]
fn latest_frame_status() {
    let (driver, mut spectro) = connected(DummyConfig::default());
    spectro.set_scan_mode(ScanMode::FrameAveraging).unwrap();
    let memory = spectro.memory();
    let latest = memory.as_latest_frame().unwrap();

    assert_eq!(latest.status(), Ok(FrameStatus::NotReady));
    spectro.trigger().unwrap();
    assert_eq!(latest.status(), Ok(FrameStatus::Ready));
    spectro.trigger().unwrap();
    assert_eq!(latest.status(), Ok(FrameStatus::ReadyWithLost));
    latest.get(0).unwrap();
    assert_eq!(latest.status(), Ok(FrameStatus::NotReady));

    driver.force_frames_in_memory(0, Some(5));
    assert_eq!(
        latest.status(),
        Err(Error::Operation(OperationError::InvalidFrameStatus(5)))
    );
}

#[test]
fn ring_memory_has_no_latest_frame_view() {
    let (_driver, spectro) = connected(DummyConfig::default());
    assert!(spectro.memory().as_latest_frame().is_none());
}

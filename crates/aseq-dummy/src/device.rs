//! State of one emulated spectrometer

use aseq_core::error::{codes, RawResult};
use aseq_core::flash::{ERASED_BYTE, FLASH_SIZE};
use aseq_core::frame::{FRAME_HEADER_LEN, FRAME_TRAILER_LEN, LATEST_FRAME_INDEX};
use aseq_core::params::MAX_ELEMENT;
use aseq_core::{
    AcquisitionParameters, DeviceStatus, ExternalTriggerMode, FrameFormat, FrameParameters,
    ScanMode, SignalEdge, Status,
};

/// Pixels in a raw frame besides the user elements
const FRAME_OVERHEAD: u16 = (FRAME_HEADER_LEN + FRAME_TRAILER_LEN) as u16;

/// Emulated device
#[derive(Debug, Clone)]
pub(crate) struct Device {
    pub(crate) serial: String,
    pub(crate) acquisition: AcquisitionParameters,
    pub(crate) format: FrameParameters,
    pub(crate) external_trigger: (ExternalTriggerMode, SignalEdge),
    pub(crate) flash: Vec<u8>,
    pub(crate) detached: bool,
    /// Frames stored in the ring memory
    frames: Vec<Vec<u16>>,
    /// Latest averaged frame and its readiness (0, 1 or 2)
    averaged: Option<Vec<u16>>,
    averaged_status: u16,
    memory_full: bool,
    memory_frames: u16,
    /// Raw frames-in-memory value forced by a test
    pub(crate) forced_frames_in_memory: Option<u16>,
    captures: u32,
}

impl Device {
    pub(crate) fn new(serial: String, memory_frames: u16) -> Self {
        Self {
            serial,
            acquisition: AcquisitionParameters::FACTORY,
            format: FrameParameters::FACTORY,
            external_trigger: (ExternalTriggerMode::Disabled, SignalEdge::empty()),
            flash: vec![ERASED_BYTE; FLASH_SIZE as usize],
            detached: false,
            frames: Vec::new(),
            averaged: None,
            averaged_status: 0,
            memory_full: false,
            memory_frames,
            forced_frames_in_memory: None,
            captures: 0,
        }
    }

    fn averaging(&self) -> bool {
        self.acquisition.scan_mode == ScanMode::FrameAveraging
    }

    /// Restore factory parameters and clear frame memory
    pub(crate) fn reset(&mut self) {
        self.acquisition = AcquisitionParameters::FACTORY;
        self.format = FrameParameters::FACTORY;
        self.external_trigger = (ExternalTriggerMode::Disabled, SignalEdge::empty());
        self.clear_memory();
    }

    pub(crate) fn set_acquisition_parameters(&mut self, params: &AcquisitionParameters) {
        self.acquisition = *params;
    }

    pub(crate) fn set_frame_format(&mut self, format: &FrameFormat) -> RawResult<u16> {
        if format.start_element > format.end_element || format.end_element > MAX_ELEMENT {
            return Err(codes::WRONG_ANSWER);
        }

        let frame_size = FRAME_OVERHEAD
            + ((format.end_element - format.start_element) >> format.reduction_mode as u16)
            + 1;
        self.format = FrameParameters {
            element_range: (format.start_element, format.end_element),
            reduction_mode: format.reduction_mode,
            frame_size,
        };
        self.clear_memory();
        Ok(frame_size)
    }

    /// Capture frames as if the CCD had been read
    pub(crate) fn trigger(&mut self) {
        self.captures = self.captures.wrapping_add(1);

        if self.averaging() {
            self.averaged = Some(self.synthesize());
            self.averaged_status = (self.averaged_status + 1).min(2);
            return;
        }

        for _ in 0..self.acquisition.num_of_scans {
            if self.frames.len() >= self.memory_frames as usize {
                self.memory_full = true;
                break;
            }
            let frame = self.synthesize();
            self.frames.push(frame);
        }
    }

    pub(crate) fn status(&self) -> DeviceStatus {
        let mut flags = Status::empty();
        flags.set(Status::MEMORY_FULL, self.memory_full);

        let frames_in_memory = match self.forced_frames_in_memory {
            Some(raw) => raw,
            None if self.averaging() => self.averaged_status,
            // bounded by memory_frames
            None => self.frames.len() as u16,
        };
        DeviceStatus {
            flags,
            frames_in_memory,
        }
    }

    pub(crate) fn get_frame(&mut self, index: u16, buf: &mut [u16]) -> RawResult<()> {
        let frame = if self.averaging() {
            self.averaged_status = 0;
            match &self.averaged {
                Some(frame) => frame.clone(),
                None => self.synthesize(),
            }
        } else if index == LATEST_FRAME_INDEX {
            self.frames
                .last()
                .cloned()
                .ok_or(codes::READING_PROCESS_FAILED)?
        } else {
            self.frames
                .get(index as usize)
                .cloned()
                .ok_or(codes::READING_PROCESS_FAILED)?
        };

        let len = buf.len().min(frame.len());
        buf[..len].copy_from_slice(&frame[..len]);
        Ok(())
    }

    pub(crate) fn clear_memory(&mut self) {
        self.frames.clear();
        self.averaged = None;
        self.averaged_status = 0;
        self.memory_full = false;
    }

    pub(crate) fn erase_flash(&mut self) {
        self.flash.fill(ERASED_BYTE);
    }

    pub(crate) fn read_flash(
        &self,
        offset: u32,
        buf: &mut [u8],
        limit: Option<usize>,
    ) -> RawResult<usize> {
        let start = offset as usize;
        let end = start
            .checked_add(buf.len())
            .filter(|&end| end <= self.flash.len())
            .ok_or(codes::READ_FLASH_REMAINING_PACKETS_ERROR)?;

        let len = limit.map_or(buf.len(), |limit| limit.min(buf.len()));
        buf[..len].copy_from_slice(&self.flash[start..start + len]);
        log::trace!("dummy: read {} of {} flash bytes", len, end - start);
        Ok(len)
    }

    pub(crate) fn write_flash(&mut self, offset: u32, data: &[u8]) -> RawResult<usize> {
        let start = offset as usize;
        if start + data.len() > self.flash.len() {
            return Err(codes::WRITING_PROCESS_FAILED);
        }

        // Programming only clears bits
        for (byte, &value) in self.flash[start..].iter_mut().zip(data) {
            *byte &= value;
        }
        Ok(data.len())
    }

    /// Build a raw frame for the current format
    ///
    /// The header starts with the capture counter; every user pixel holds
    /// its element number plus one.
    fn synthesize(&self) -> Vec<u16> {
        let mut frame = vec![0u16; self.format.frame_size as usize];
        if let Some(first) = frame.first_mut() {
            *first = self.captures as u16;
        }

        let (start, _) = self.format.element_range;
        let factor = self.format.reduction_mode.factor();
        let user = FRAME_HEADER_LEN..frame.len().saturating_sub(FRAME_TRAILER_LEN);
        for (k, pixel) in frame[user].iter_mut().enumerate() {
            *pixel = start + k as u16 * factor + 1;
        }
        frame
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use aseq_core::{Frame, ReductionMode};

    fn device() -> Device {
        Device::new("ASQ_SPC0000001".into(), 4)
    }

    #[test]
    fn test_frame_size_follows_format() {
        let mut dev = device();
        let format = FrameFormat {
            start_element: 10,
            end_element: 10,
            reduction_mode: ReductionMode::NoAverage,
        };
        assert_eq!(dev.set_frame_format(&format), Ok(47));

        let format = FrameFormat {
            start_element: 0,
            end_element: 3647,
            reduction_mode: ReductionMode::AverageOf8,
        };
        assert_eq!(dev.set_frame_format(&format), Ok(46 + 455 + 1));
    }

    #[test]
    fn test_invalid_format_rejected() {
        let mut dev = device();
        let format = FrameFormat {
            start_element: 20,
            end_element: 10,
            reduction_mode: ReductionMode::NoAverage,
        };
        assert_eq!(dev.set_frame_format(&format), Err(codes::WRONG_ANSWER));
        assert_eq!(dev.format, FrameParameters::FACTORY);
    }

    #[test]
    fn test_synthesized_frame_windows_to_elements() {
        let mut dev = device();
        dev.set_frame_format(&FrameFormat {
            start_element: 100,
            end_element: 104,
            reduction_mode: ReductionMode::NoAverage,
        })
        .unwrap();
        dev.trigger();

        let mut raw = vec![0u16; dev.format.frame_size as usize];
        dev.get_frame(0, &mut raw).unwrap();
        let frame = Frame::from_raw(&raw);
        assert_eq!(&frame[..], &[105, 104, 103, 102, 101]);
    }

    #[test]
    fn test_memory_fills_up() {
        let mut dev = device();
        dev.acquisition.num_of_scans = 3;
        dev.trigger();
        assert!(!dev.status().flags.contains(Status::MEMORY_FULL));
        dev.trigger();
        let status = dev.status();
        assert!(status.flags.contains(Status::MEMORY_FULL));
        assert_eq!(status.frames_in_memory, 4);

        dev.clear_memory();
        assert_eq!(dev.status(), DeviceStatus::default());
    }

    #[test]
    fn test_averaging_readiness() {
        let mut dev = device();
        dev.acquisition.scan_mode = ScanMode::FrameAveraging;
        assert_eq!(dev.status().frames_in_memory, 0);
        dev.trigger();
        assert_eq!(dev.status().frames_in_memory, 1);
        dev.trigger();
        assert_eq!(dev.status().frames_in_memory, 2);

        let mut raw = vec![0u16; dev.format.frame_size as usize];
        dev.get_frame(LATEST_FRAME_INDEX, &mut raw).unwrap();
        assert_eq!(dev.status().frames_in_memory, 0);
    }

    #[test]
    fn test_flash_programming_clears_bits_only() {
        let mut dev = device();
        dev.write_flash(0x10, &[0x0F]).unwrap();
        dev.write_flash(0x10, &[0xF3]).unwrap();
        let mut buf = [0u8; 1];
        dev.read_flash(0x10, &mut buf, None).unwrap();
        assert_eq!(buf, [0x03]);

        dev.erase_flash();
        dev.read_flash(0x10, &mut buf, None).unwrap();
        assert_eq!(buf, [0xFF]);
    }

    #[test]
    fn test_flash_read_limit() {
        let dev = device();
        let mut buf = [0u8; 16];
        assert_eq!(dev.read_flash(0, &mut buf, Some(10)), Ok(10));
        assert_eq!(
            dev.read_flash(FLASH_SIZE - 8, &mut buf, None),
            Err(codes::READ_FLASH_REMAINING_PACKETS_ERROR)
        );
    }
}

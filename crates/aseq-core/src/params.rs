//! Acquisition and frame parameters
//!
//! These are the values the session caches after connecting. Exposure is
//! kept in device units (multiples of 10 µs); conversion to and from
//! microseconds happens at the session API.

use crate::modes::{ReductionMode, ScanMode};

/// Exposure time unit of the device, in microseconds
pub const EXPOSURE_UNIT_US: u32 = 10;

/// Last element index of the sensor
pub const MAX_ELEMENT: u16 = 3647;

/// Acquisition parameters, always written to the device as one batch
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct AcquisitionParameters {
    /// Number of scans (up to 137 full spectra)
    pub num_of_scans: u16,
    /// Blank scans between stored scans (must be 0 when averaging)
    pub num_of_blank_scans: u16,
    /// Scan mode
    pub scan_mode: ScanMode,
    /// Exposure time in multiples of 10 µs
    pub exposure_time: u32,
}

impl AcquisitionParameters {
    /// Factory defaults restored by a device reset
    pub const FACTORY: Self = Self {
        num_of_scans: 1,
        num_of_blank_scans: 0,
        scan_mode: ScanMode::Continuous,
        exposure_time: 10,
    };

    /// Exposure time in microseconds
    pub fn exposure_micros(&self) -> u32 {
        self.exposure_time.saturating_mul(EXPOSURE_UNIT_US)
    }
}

impl Default for AcquisitionParameters {
    fn default() -> Self {
        Self::FACTORY
    }
}

/// Convert microseconds to device exposure units, rounding to nearest
///
/// Ties round to the even unit.
pub fn exposure_units(micros: u32) -> u32 {
    let units = micros / EXPOSURE_UNIT_US;
    let rem = micros % EXPOSURE_UNIT_US;
    let half = EXPOSURE_UNIT_US / 2;
    if rem > half || (rem == half && units % 2 == 1) {
        units + 1
    } else {
        units
    }
}

/// Frame format as sent to the device
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct FrameFormat {
    /// First element (0..=3647)
    pub start_element: u16,
    /// Last element (0..=3647)
    pub end_element: u16,
    /// Pixel averaging mode
    pub reduction_mode: ReductionMode,
}

/// Frame parameters as cached by the session
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct FrameParameters {
    /// Element range reported per frame
    pub element_range: (u16, u16),
    /// Pixel averaging mode
    pub reduction_mode: ReductionMode,
    /// Raw frame size in pixels, computed by the device
    pub frame_size: u16,
}

impl FrameParameters {
    /// Factory defaults restored by a device reset
    pub const FACTORY: Self = Self {
        element_range: (0, MAX_ELEMENT),
        reduction_mode: ReductionMode::NoAverage,
        frame_size: crate::frame::DEFAULT_FRAME_SIZE,
    };

    /// The format part of these parameters
    pub fn format(&self) -> FrameFormat {
        FrameFormat {
            start_element: self.element_range.0,
            end_element: self.element_range.1,
            reduction_mode: self.reduction_mode,
        }
    }
}

impl Default for FrameParameters {
    fn default() -> Self {
        Self::FACTORY
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_exposure_rounding() {
        assert_eq!(exposure_units(10), 1);
        assert_eq!(exposure_units(14), 1);
        assert_eq!(exposure_units(16), 2);
        // Ties go to even
        assert_eq!(exposure_units(15), 2);
        assert_eq!(exposure_units(25), 2);
        assert_eq!(exposure_units(100_000), 10_000);
        assert_eq!(exposure_units(u32::MAX), 429_496_730);
    }

    #[test]
    fn test_factory_defaults() {
        let acq = AcquisitionParameters::FACTORY;
        assert_eq!(acq.exposure_micros(), 100);
        assert_eq!(acq.scan_mode, ScanMode::Continuous);

        let frame = FrameParameters::FACTORY;
        assert_eq!(frame.element_range, (0, 3647));
        assert_eq!(frame.frame_size, 3694);
    }
}

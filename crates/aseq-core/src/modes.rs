//! Acquisition modes, trigger modes and status flags
//!
//! Discriminants match the values the driver expects on the wire.

use bitflags::bitflags;
use core::fmt;

/// Device acquisition strategy
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
#[repr(u8)]
pub enum ScanMode {
    /// CCD is read continuously; on trigger `num_of_scans` frames are stored
    #[default]
    Continuous = 0,
    /// CCD idles until trigger, then reads all requested frames
    FirstFrameIdle = 1,
    /// Every frame, blank frames included, is read only on trigger
    EveryFrameIdle = 2,
    /// CCD is read continuously and every `num_of_scans` frames are averaged
    FrameAveraging = 3,
}

impl TryFrom<u8> for ScanMode {
    type Error = u8;

    fn try_from(value: u8) -> Result<Self, Self::Error> {
        match value {
            0 => Ok(Self::Continuous),
            1 => Ok(Self::FirstFrameIdle),
            2 => Ok(Self::EveryFrameIdle),
            3 => Ok(Self::FrameAveraging),
            other => Err(other),
        }
    }
}

impl fmt::Display for ScanMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Continuous => write!(f, "continuous"),
            Self::FirstFrameIdle => write!(f, "first-frame-idle"),
            Self::EveryFrameIdle => write!(f, "every-frame-idle"),
            Self::FrameAveraging => write!(f, "frame-averaging"),
        }
    }
}

/// On-device averaging of neighbouring elements
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
#[repr(u8)]
pub enum ReductionMode {
    /// Every element reported
    #[default]
    NoAverage = 0,
    /// Average of 2 elements
    AverageOf2 = 1,
    /// Average of 4 elements
    AverageOf4 = 2,
    /// Average of 8 elements
    AverageOf8 = 3,
}

impl ReductionMode {
    /// Number of elements averaged into one pixel
    pub fn factor(self) -> u16 {
        1 << (self as u8)
    }
}

impl TryFrom<u8> for ReductionMode {
    type Error = u8;

    fn try_from(value: u8) -> Result<Self, Self::Error> {
        match value {
            0 => Ok(Self::NoAverage),
            1 => Ok(Self::AverageOf2),
            2 => Ok(Self::AverageOf4),
            3 => Ok(Self::AverageOf8),
            other => Err(other),
        }
    }
}

/// External trigger enable mode
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
#[repr(u8)]
pub enum ExternalTriggerMode {
    /// External trigger ignored
    #[default]
    Disabled = 0,
    /// Every external pulse triggers an acquisition
    Enabled = 1,
    /// Only the next external pulse triggers an acquisition
    OneTime = 2,
}

impl TryFrom<u8> for ExternalTriggerMode {
    type Error = u8;

    fn try_from(value: u8) -> Result<Self, Self::Error> {
        match value {
            0 => Ok(Self::Disabled),
            1 => Ok(Self::Enabled),
            2 => Ok(Self::OneTime),
            other => Err(other),
        }
    }
}

/// Optical trigger mode
///
/// Only applicable in [`ScanMode::Continuous`]. Declared for completeness;
/// the optical trigger itself is not implemented.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
#[repr(u8)]
pub enum OpticalTriggerMode {
    /// Optical trigger disabled
    #[default]
    Disabled = 0,
    /// Trigger on falling edge
    FallingEdge = 1,
    /// Trigger on threshold
    OnThreshold = 2,
    /// One-time trigger on rising edge
    OneTimeRisingEdge = 0x81,
    /// One-time trigger on falling edge
    OneTimeFallingEdge = 0x82,
}

bitflags! {
    /// Signal edge(s) an external trigger reacts to
    ///
    /// An empty set disables the trigger input.
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
    pub struct SignalEdge: u8 {
        /// Rising edge
        const RISING  = 1 << 0;
        /// Falling edge
        const FALLING = 1 << 1;
    }
}

bitflags! {
    /// Device status word
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
    pub struct Status: u8 {
        /// Acquisition in progress
        ///
        /// Frames already stored can be read while this is set.
        const IN_PROGRESS = 1 << 0;
        /// Frame memory is full
        ///
        /// Acquisition stops and cannot restart until memory is cleared.
        const MEMORY_FULL = 1 << 1;
    }
}

/// Readiness of the averaged frame in [`ScanMode::FrameAveraging`]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[repr(u16)]
pub enum FrameStatus {
    /// Averaged spectrum not ready yet
    NotReady = 0,
    /// Averaged spectrum ready to be read
    Ready = 1,
    /// Ready, and at least one spectrum was lost because it was not read
    ReadyWithLost = 2,
}

impl TryFrom<u16> for FrameStatus {
    type Error = u16;

    fn try_from(value: u16) -> Result<Self, Self::Error> {
        match value {
            0 => Ok(Self::NotReady),
            1 => Ok(Self::Ready),
            2 => Ok(Self::ReadyWithLost),
            other => Err(other),
        }
    }
}

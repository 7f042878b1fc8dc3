//! Frame memory
//!
//! Frames live in device memory; these types are views that query and fetch
//! on every call. Two addressing models exist:
//!
//! - [`RingMemory`]: every scan mode except frame averaging. Frames are
//!   addressed by their device-side index and the length is the number of
//!   frames currently buffered.
//! - [`LatestFrameMemory`]: frame averaging. There is only ever one frame,
//!   always fetched through [`LATEST_FRAME_INDEX`].

use core::ops::{Bound, Range, RangeBounds};

use crate::error::{Error, OperationError, Result};
use crate::frame::{Frame, LATEST_FRAME_INDEX};
use crate::handle::DeviceHandle;
use crate::modes::{FrameStatus, ScanMode};

/// Which memory backend is active
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum MemoryKind {
    /// Multi-frame ring store
    #[default]
    Ring,
    /// Single averaged frame
    LatestFrame,
}

impl MemoryKind {
    /// Backend matching `scan_mode`
    pub fn for_scan_mode(scan_mode: ScanMode) -> Self {
        match scan_mode {
            ScanMode::FrameAveraging => Self::LatestFrame,
            _ => Self::Ring,
        }
    }
}

/// Access to frames stored on the device
pub trait FrameMemory {
    /// Number of frames available, queried live
    fn len(&self) -> Result<usize>;

    /// Whether no frame is available
    fn is_empty(&self) -> Result<bool> {
        Ok(self.len()? == 0)
    }

    /// Fetch one frame
    fn get(&self, index: usize) -> Result<Frame>;

    /// Fetch the frames in `range`
    ///
    /// The range is clamped to the available frames and never fails on its
    /// bounds; an empty intersection yields no frames.
    fn get_range<R: RangeBounds<usize>>(&self, range: R) -> Result<Vec<Frame>>;

    /// Discard stored frames
    fn clear(&self) -> Result<()>;
}

/// Clamp arbitrary range bounds to `0..len`
fn clamp_range<R: RangeBounds<usize>>(range: &R, len: usize) -> Range<usize> {
    let start = match range.start_bound() {
        Bound::Included(&s) => s,
        Bound::Excluded(&s) => s.saturating_add(1),
        Bound::Unbounded => 0,
    };
    let end = match range.end_bound() {
        Bound::Included(&e) => e.saturating_add(1),
        Bound::Excluded(&e) => e,
        Bound::Unbounded => len,
    };
    let end = end.min(len);
    start.min(end)..end
}

/// Ring-buffered multi-frame memory
#[derive(Debug, Clone, Copy)]
pub struct RingMemory<'a> {
    handle: &'a DeviceHandle,
}

impl<'a> RingMemory<'a> {
    /// View the memory behind `handle`
    pub fn new(handle: &'a DeviceHandle) -> Self {
        Self { handle }
    }
}

impl FrameMemory for RingMemory<'_> {
    fn len(&self) -> Result<usize> {
        Ok(self.handle.frames_in_memory()? as usize)
    }

    fn get(&self, index: usize) -> Result<Frame> {
        let len = self.len()?;
        if index >= len {
            return Err(Error::IndexOutOfRange { index, len });
        }
        // len comes from a u16, so index fits
        self.handle.frame(index as u16)
    }

    fn get_range<R: RangeBounds<usize>>(&self, range: R) -> Result<Vec<Frame>> {
        let indices = clamp_range(&range, self.len()?);
        indices.map(|i| self.handle.frame(i as u16)).collect()
    }

    fn clear(&self) -> Result<()> {
        self.handle.clear_memory()
    }
}

/// Latest-frame memory used in frame-averaging mode
#[derive(Debug, Clone, Copy)]
pub struct LatestFrameMemory<'a> {
    handle: &'a DeviceHandle,
}

impl<'a> LatestFrameMemory<'a> {
    /// View the memory behind `handle`
    pub fn new(handle: &'a DeviceHandle) -> Self {
        Self { handle }
    }

    /// Readiness of the averaged frame
    pub fn status(&self) -> Result<FrameStatus> {
        let raw = self.handle.frames_in_memory()?;
        FrameStatus::try_from(raw).map_err(|v| OperationError::InvalidFrameStatus(v).into())
    }
}

impl FrameMemory for LatestFrameMemory<'_> {
    fn len(&self) -> Result<usize> {
        Ok(1)
    }

    fn get(&self, _index: usize) -> Result<Frame> {
        self.handle.frame(LATEST_FRAME_INDEX)
    }

    fn get_range<R: RangeBounds<usize>>(&self, range: R) -> Result<Vec<Frame>> {
        clamp_range(&range, 1)
            .map(|_| self.handle.frame(LATEST_FRAME_INDEX))
            .collect()
    }

    fn clear(&self) -> Result<()> {
        Ok(())
    }
}

/// The memory backend active for a session
#[derive(Debug, Clone, Copy)]
pub enum Memory<'a> {
    /// Ring backend
    Ring(RingMemory<'a>),
    /// Latest-frame backend
    LatestFrame(LatestFrameMemory<'a>),
}

impl<'a> Memory<'a> {
    /// Build the backend of the given kind over `handle`
    pub fn new(kind: MemoryKind, handle: &'a DeviceHandle) -> Self {
        match kind {
            MemoryKind::Ring => Self::Ring(RingMemory::new(handle)),
            MemoryKind::LatestFrame => Self::LatestFrame(LatestFrameMemory::new(handle)),
        }
    }

    /// Which backend this is
    pub fn kind(&self) -> MemoryKind {
        match self {
            Self::Ring(_) => MemoryKind::Ring,
            Self::LatestFrame(_) => MemoryKind::LatestFrame,
        }
    }

    /// The latest-frame backend, if active
    pub fn as_latest_frame(&self) -> Option<&LatestFrameMemory<'a>> {
        match self {
            Self::LatestFrame(m) => Some(m),
            Self::Ring(_) => None,
        }
    }
}

impl FrameMemory for Memory<'_> {
    fn len(&self) -> Result<usize> {
        match self {
            Self::Ring(m) => m.len(),
            Self::LatestFrame(m) => m.len(),
        }
    }

    fn get(&self, index: usize) -> Result<Frame> {
        match self {
            Self::Ring(m) => m.get(index),
            Self::LatestFrame(m) => m.get(index),
        }
    }

    fn get_range<R: RangeBounds<usize>>(&self, range: R) -> Result<Vec<Frame>> {
        match self {
            Self::Ring(m) => m.get_range(range),
            Self::LatestFrame(m) => m.get_range(range),
        }
    }

    fn clear(&self) -> Result<()> {
        match self {
            Self::Ring(m) => m.clear(),
            Self::LatestFrame(m) => m.clear(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_kind_for_scan_mode() {
        assert_eq!(
            MemoryKind::for_scan_mode(ScanMode::FrameAveraging),
            MemoryKind::LatestFrame
        );
        for mode in [
            ScanMode::Continuous,
            ScanMode::FirstFrameIdle,
            ScanMode::EveryFrameIdle,
        ] {
            assert_eq!(MemoryKind::for_scan_mode(mode), MemoryKind::Ring);
        }
    }

    #[test]
    fn test_clamp_range() {
        assert_eq!(clamp_range(&(..), 5), 0..5);
        assert_eq!(clamp_range(&(1..3), 5), 1..3);
        assert_eq!(clamp_range(&(3..), 5), 3..5);
        assert_eq!(clamp_range(&(..=2), 5), 0..3);
        assert_eq!(clamp_range(&(2..10), 5), 2..5);
    }

    #[test]
    fn test_clamp_range_empty_intersection() {
        assert!(clamp_range(&(7..10), 5).is_empty());
        assert!(clamp_range(&(4..2), 5).is_empty());
        assert!(clamp_range(&(0..usize::MAX), 0).is_empty());
        assert_eq!(clamp_range(&(0..=usize::MAX), 3), 0..3);
    }
}

//! Spectrometer frames
//!
//! A raw frame holds 32 leading service elements, the user elements and 14
//! trailing service elements. The public [`Frame`] keeps only the user
//! elements, in reverse order (the sensor reads out back to front).

use core::ops::Deref;

/// Leading service elements in a raw frame
pub const FRAME_HEADER_LEN: usize = 32;
/// Trailing service elements in a raw frame
pub const FRAME_TRAILER_LEN: usize = 14;
/// Raw frame size for the full element range without reduction
pub const DEFAULT_FRAME_SIZE: u16 = 3694;
/// Frame index that always addresses the latest (averaged) frame
pub const LATEST_FRAME_INDEX: u16 = 0xFFFF;

/// One windowed, reversed frame
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct Frame(Vec<u16>);

impl Frame {
    /// Build a frame from a raw driver buffer
    ///
    /// Buffers too short to hold header and trailer produce an empty frame.
    pub fn from_raw(raw: &[u16]) -> Self {
        let end = raw.len().saturating_sub(FRAME_TRAILER_LEN);
        if end <= FRAME_HEADER_LEN {
            return Self::default();
        }
        Self(raw[FRAME_HEADER_LEN..end].iter().rev().copied().collect())
    }

    /// Consume the frame, returning its samples
    pub fn into_inner(self) -> Vec<u16> {
        self.0
    }
}

impl Deref for Frame {
    type Target = [u16];

    fn deref(&self) -> &[u16] {
        &self.0
    }
}

impl From<Frame> for Vec<u16> {
    fn from(frame: Frame) -> Self {
        frame.0
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_window_and_reverse() {
        let raw: Vec<u16> = (0..100).collect();
        let frame = Frame::from_raw(&raw);

        assert_eq!(frame.len(), 100 - 46);
        let mut expected: Vec<u16> = raw[32..86].to_vec();
        expected.reverse();
        assert_eq!(&*frame, expected.as_slice());
        assert_eq!(frame[0], 85);
        assert_eq!(*frame.last().unwrap(), 32);
    }

    #[test]
    fn test_default_size() {
        let raw = vec![7u16; DEFAULT_FRAME_SIZE as usize];
        assert_eq!(Frame::from_raw(&raw).len(), 3648);
    }

    #[test]
    fn test_short_buffer() {
        assert!(Frame::from_raw(&[1, 2, 3]).is_empty());
        assert!(Frame::from_raw(&[0; 46]).is_empty());
        assert_eq!(Frame::from_raw(&[0; 47]).len(), 1);
    }
}

//! User flash access
//!
//! The device exposes a 128 KiB user flash. Bytes can only be programmed
//! while erased (0xFF), and the only way back to the erased state is a full
//! erase. Requests running past the end of the region are clamped to it
//! rather than rejected.

use crate::error::{Error, Precondition, Result};
use crate::handle::DeviceHandle;

/// Size of the user flash region in bytes
pub const FLASH_SIZE: u32 = 0x20000;

/// Highest valid flash offset
pub const MAX_FLASH_OFFSET: u32 = FLASH_SIZE - 1;

/// Value of an erased flash byte
pub const ERASED_BYTE: u8 = 0xFF;

/// Advisory raised when writing over bytes that are not erased
///
/// The driver accepts such writes but the resulting contents are undefined.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct NotErased {
    /// Offset of the first byte in the target range that is not 0xFF
    pub offset: u32,
    /// The value found there
    pub found: u8,
}

impl core::fmt::Display for NotErased {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        write!(
            f,
            "only empty memory locations can be written to (0x{:05X} holds 0x{:02X})",
            self.offset, self.found
        )
    }
}

/// Outcome of a flash write
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct WriteReport {
    /// Bytes written after clamping
    pub written: usize,
    /// Set when the target range was not erased before writing
    pub warning: Option<NotErased>,
}

/// Validate `offset` and clamp `len` to the flash region
///
/// Returns the number of bytes that fit between `offset` and the end of the
/// region.
pub fn clamp_range(offset: u32, len: usize) -> Result<usize> {
    if offset > MAX_FLASH_OFFSET {
        return Err(Precondition::FlashOffset(offset).into());
    }
    let available = (FLASH_SIZE - offset) as usize;
    if len > available {
        log::debug!(
            "Clamping flash access at 0x{:05X} from {} to {} bytes",
            offset,
            len,
            available
        );
    }
    Ok(len.min(available))
}

/// User flash of one device
#[derive(Debug, Clone, Copy)]
pub struct Flash<'a> {
    handle: &'a DeviceHandle,
}

impl<'a> Flash<'a> {
    /// Access the flash behind `handle`
    pub fn new(handle: &'a DeviceHandle) -> Self {
        Self { handle }
    }

    /// Erase the whole user flash
    pub fn erase(&self) -> Result<()> {
        log::debug!("Erasing user flash");
        self.handle.erase_flash()
    }

    /// Read `len` bytes starting at `offset`
    ///
    /// `len` is clamped to the end of the region. A short read from the
    /// driver is reported as [`Error::IncompleteRead`].
    pub fn read(&self, len: usize, offset: u32) -> Result<Vec<u8>> {
        self.ensure_connected()?;
        let len = clamp_range(offset, len)?;
        let mut buf = vec![0u8; len];
        if len == 0 {
            return Ok(buf);
        }

        let read = self.handle.read_flash(offset, &mut buf)?;
        if read < len {
            return Err(Error::IncompleteRead {
                expected: len,
                actual: read,
            });
        }
        Ok(buf)
    }

    /// Write `data` starting at `offset`
    ///
    /// `data` is truncated at the end of the region. The target range is
    /// read back first; if it is not erased a [`NotErased`] warning is
    /// logged and reported, and the write proceeds anyway.
    pub fn write(&self, data: &[u8], offset: u32) -> Result<WriteReport> {
        self.ensure_connected()?;
        let len = clamp_range(offset, data.len())?;
        if len == 0 {
            return Ok(WriteReport {
                written: 0,
                warning: None,
            });
        }

        let current = self.read(len, offset)?;
        let warning = current
            .iter()
            .position(|&b| b != ERASED_BYTE)
            .map(|pos| NotErased {
                offset: offset + pos as u32,
                found: current[pos],
            });
        if let Some(warning) = &warning {
            log::warn!("{}", warning);
        }

        let written = self.handle.write_flash(offset, &data[..len])?;
        Ok(WriteReport { written, warning })
    }

    fn ensure_connected(&self) -> Result<()> {
        if self.handle.is_connected() {
            Ok(())
        } else {
            Err(Precondition::NotConnected.into())
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_clamp_within_region() {
        assert_eq!(clamp_range(0, 100), Ok(100));
        assert_eq!(clamp_range(0, FLASH_SIZE as usize), Ok(0x20000));
    }

    #[test]
    fn test_clamp_at_end() {
        assert_eq!(clamp_range(MAX_FLASH_OFFSET, 10), Ok(1));
        assert_eq!(clamp_range(0x1FFFE, 10), Ok(2));
        assert_eq!(clamp_range(0x10000, usize::MAX), Ok(0x10000));
    }

    #[test]
    fn test_offset_out_of_range() {
        assert_eq!(
            clamp_range(FLASH_SIZE, 1),
            Err(Error::Precondition(Precondition::FlashOffset(0x20000)))
        );
    }

    #[test]
    fn test_clamp_never_exceeds_region() {
        for offset in [0u32, 1, 0x100, 0xFFFF, 0x1FF00, MAX_FLASH_OFFSET] {
            for len in [0usize, 1, 0x100, 0x20000, 0x30000] {
                let clamped = clamp_range(offset, len).unwrap();
                assert!(clamped <= (FLASH_SIZE - offset) as usize);
                assert!(clamped <= len);
            }
        }
    }
}

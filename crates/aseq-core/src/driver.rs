//! Driver boundary
//!
//! The [`Driver`] trait is the complete I/O surface of the crate: every
//! interaction with a spectrometer goes through one of its calls. Drivers
//! report failures as raw result codes; translating those into
//! [`Error`](crate::Error) values is the job of
//! [`DeviceHandle`](crate::DeviceHandle), never of the driver.
//!
//! Implementations:
//! - `aseq-native` binds the vendor `libspectrometer` library
//! - `aseq-dummy` emulates devices in memory

use crate::error::RawResult;
use crate::modes::{ExternalTriggerMode, SignalEdge, Status};
use crate::params::{AcquisitionParameters, FrameFormat, FrameParameters};

/// Opaque per-device context owned by the driver
///
/// Mirrors the `uintptr_t` device context of the vendor API: zero means no
/// device, anything else is meaningful only to the driver that wrote it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub struct Context(usize);

impl Context {
    /// The empty context, before connecting
    pub const NULL: Self = Self(0);

    /// Wrap a raw driver value
    pub const fn from_raw(raw: usize) -> Self {
        Self(raw)
    }

    /// The raw driver value
    pub const fn raw(&self) -> usize {
        self.0
    }

    /// Whether the context refers to no device
    pub const fn is_null(&self) -> bool {
        self.0 == 0
    }
}

/// Status word and frame count reported by the device
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct DeviceStatus {
    /// Status flags
    pub flags: Status,
    /// Frames in memory; in frame-averaging mode the frame readiness value
    pub frames_in_memory: u16,
}

/// Vendor driver capability
///
/// Drivers are shared between worker threads, each of which owns its own
/// [`Context`]; implementations must be safe to call concurrently for
/// distinct contexts.
pub trait Driver: Send + Sync {
    /// Number of connected devices
    fn devices_count(&self) -> u32;

    /// Serial numbers of all connected devices
    ///
    /// Implementations release any driver-side list before returning.
    fn devices_info(&self) -> Vec<String>;

    /// Connect to the device with the given serial, or the first one found
    ///
    /// Reinitializes `ctx` if it already refers to a device.
    fn connect_by_serial(&self, serial: Option<&str>, ctx: &mut Context) -> RawResult<()>;

    /// Connect to the device at `index` in enumeration order
    fn connect_by_index(&self, index: u32, ctx: &mut Context) -> RawResult<()>;

    /// Release the device context
    fn disconnect(&self, ctx: &mut Context) -> RawResult<()>;

    /// Restore factory parameters and clear frame memory
    ///
    /// The context's pixel count must read back the factory frame size
    /// afterwards.
    fn reset(&self, ctx: &Context) -> RawResult<()>;

    /// Detach the device from the bus until it is reset
    fn detach(&self, ctx: &Context) -> RawResult<()>;

    /// Write all acquisition parameters at once
    ///
    /// Stops the current acquisition.
    fn set_acquisition_parameters(
        &self,
        params: &AcquisitionParameters,
        ctx: &Context,
    ) -> RawResult<()>;

    /// Read back the acquisition parameters
    fn get_acquisition_parameters(&self, ctx: &Context) -> RawResult<AcquisitionParameters>;

    /// Set the frame format, returning the resulting frame size in pixels
    ///
    /// Clears frame memory and stops the current acquisition.
    fn set_frame_format(&self, format: &FrameFormat, ctx: &Context) -> RawResult<u16>;

    /// Read back the frame format and frame size
    fn get_frame_format(&self, ctx: &Context) -> RawResult<FrameParameters>;

    /// Configure the external trigger input
    fn set_external_trigger(
        &self,
        mode: ExternalTriggerMode,
        edge: SignalEdge,
        ctx: &Context,
    ) -> RawResult<()>;

    /// Start an acquisition by software
    fn trigger(&self, ctx: &Context) -> RawResult<()>;

    /// Poll the device status
    fn get_status(&self, ctx: &Context) -> RawResult<DeviceStatus>;

    /// Fetch raw frame `index` into `buf`
    ///
    /// `buf` holds [`pixels_in_frame`](Self::pixels_in_frame) samples.
    fn get_frame(&self, index: u16, buf: &mut [u16], ctx: &Context) -> RawResult<()>;

    /// Discard all frames in device memory
    fn clear_memory(&self, ctx: &Context) -> RawResult<()>;

    /// Erase the whole user flash
    fn erase_flash(&self, ctx: &Context) -> RawResult<()>;

    /// Read user flash at `offset` into `buf`, returning the bytes read
    fn read_flash(&self, offset: u32, buf: &mut [u8], ctx: &Context) -> RawResult<usize>;

    /// Write `data` to user flash at `offset`, returning the bytes written
    fn write_flash(&self, offset: u32, data: &[u8], ctx: &Context) -> RawResult<usize>;

    /// Pixel count stored in the device context
    ///
    /// `None` when the context cannot be read (e.g. not connected).
    fn pixels_in_frame(&self, ctx: &Context) -> Option<u16>;
}

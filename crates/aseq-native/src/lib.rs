//! aseq-native - libspectrometer driver
//!
//! Binds the vendor `libspectrometer` C library. The library is linked
//! dynamically; set `LIBSPECTROMETER_DIR` to its location if it is not on
//! the default search path.

mod ffi;

use std::ffi::{CStr, CString};
use std::ptr;

use aseq_core::error::{codes, RawResult};
use aseq_core::frame::DEFAULT_FRAME_SIZE;
use aseq_core::{
    AcquisitionParameters, Context, DeviceStatus, Driver, ExternalTriggerMode, FrameFormat,
    FrameParameters, ReductionMode, ScanMode, SignalEdge, Status,
};
use libc::c_int;

/// Driver backed by libspectrometer
#[derive(Debug, Default, Clone, Copy)]
pub struct NativeDriver;

impl NativeDriver {
    /// Create the driver
    pub fn new() -> Self {
        Self
    }
}

fn check(result: c_int) -> RawResult<()> {
    match result {
        0 => Ok(()),
        code => Err(code),
    }
}

/// Call `f` with a pointer to a copy of the raw context
///
/// The library takes `uintptr_t*` even for calls that leave the handle
/// untouched.
fn with_ctx<T>(ctx: &Context, f: impl FnOnce(*mut libc::uintptr_t) -> T) -> T {
    let mut raw = ctx.raw();
    f(&mut raw)
}

/// Pixel count field of a live context
///
/// # Safety
///
/// `raw` must be a context returned by a successful connect.
unsafe fn context_pixels(raw: usize) -> u16 {
    (*(raw as *const ffi::DeviceContext)).num_of_pixels_in_frame
}

/// Overwrite the pixel count field of a live context
///
/// # Safety
///
/// `raw` must be a context returned by a successful connect.
unsafe fn set_context_pixels(raw: usize, pixels: u16) {
    (*(raw as *mut ffi::DeviceContext)).num_of_pixels_in_frame = pixels;
}

impl Driver for NativeDriver {
    fn devices_count(&self) -> u32 {
        // SAFETY: takes no arguments and only enumerates HID devices
        unsafe { ffi::getDevicesCount() }
    }

    fn devices_info(&self) -> Vec<String> {
        let mut serials = Vec::new();
        // SAFETY: the list is owned by the library until clearDevicesInfo;
        // every node and serial pointer stays valid while we walk it.
        unsafe {
            let head = ffi::getDevicesInfo();
            let mut node = head;
            while !node.is_null() {
                let serial = (*node).serial_number;
                if !serial.is_null() {
                    serials.push(CStr::from_ptr(serial).to_string_lossy().into_owned());
                }
                node = (*node).next;
            }
            if !head.is_null() {
                ffi::clearDevicesInfo(head);
            }
        }
        serials
    }

    fn connect_by_serial(&self, serial: Option<&str>, ctx: &mut Context) -> RawResult<()> {
        let serial = serial
            .map(CString::new)
            .transpose()
            .map_err(|_| codes::CONNECT_ERROR_WRONG_ID)?;
        let serial_ptr = serial.as_ref().map_or(ptr::null(), |s| s.as_ptr());

        let mut raw = ctx.raw();
        // SAFETY: serial_ptr is null or a NUL-terminated string outliving the call
        let result = unsafe { ffi::connectToDeviceBySerial(serial_ptr, &mut raw) };
        *ctx = Context::from_raw(raw);
        check(result)
    }

    fn connect_by_index(&self, index: u32, ctx: &mut Context) -> RawResult<()> {
        let mut raw = ctx.raw();
        // SAFETY: raw is a valid out-pointer for the new context handle
        let result = unsafe { ffi::connectToDeviceByIndex(index, &mut raw) };
        *ctx = Context::from_raw(raw);
        check(result)
    }

    fn disconnect(&self, ctx: &mut Context) -> RawResult<()> {
        if ctx.is_null() {
            return Err(codes::DEVICE_NOT_INITIALIZED);
        }
        let mut raw = ctx.raw();
        // SAFETY: the context is non-null and came from a successful connect;
        // the library frees it and nulls raw
        let result = unsafe { ffi::disconnectDeviceContext(&mut raw) };
        *ctx = Context::from_raw(raw);
        check(result)
    }

    fn reset(&self, ctx: &Context) -> RawResult<()> {
        // SAFETY: p points to a copy of the context handle for the call
        check(with_ctx(ctx, |p| unsafe { ffi::resetDevice(p) }))?;
        // The library does not refresh its cached frame size on reset
        // SAFETY: resetDevice succeeded, so the context is live
        unsafe { set_context_pixels(ctx.raw(), DEFAULT_FRAME_SIZE) };
        Ok(())
    }

    fn detach(&self, ctx: &Context) -> RawResult<()> {
        // SAFETY: p points to a copy of the context handle for the call
        check(with_ctx(ctx, |p| unsafe { ffi::detachDevice(p) }))
    }

    fn set_acquisition_parameters(
        &self,
        params: &AcquisitionParameters,
        ctx: &Context,
    ) -> RawResult<()> {
        // SAFETY: plain values in, context pointer valid for the call
        check(with_ctx(ctx, |p| unsafe {
            ffi::setAcquisitionParameters(
                params.num_of_scans,
                params.num_of_blank_scans,
                params.scan_mode as u8,
                params.exposure_time,
                p,
            )
        }))
    }

    fn get_acquisition_parameters(&self, ctx: &Context) -> RawResult<AcquisitionParameters> {
        let (mut scans, mut blank, mut mode, mut exposure) = (0u16, 0u16, 0u8, 0u32);
        // SAFETY: every out-pointer refers to a live local
        check(with_ctx(ctx, |p| unsafe {
            ffi::getAcquisitionParameters(&mut scans, &mut blank, &mut mode, &mut exposure, p)
        }))?;

        let scan_mode = ScanMode::try_from(mode).map_err(|raw| {
            log::warn!("Device reported unknown scan mode {}", raw);
            codes::WRONG_ANSWER
        })?;
        Ok(AcquisitionParameters {
            num_of_scans: scans,
            num_of_blank_scans: blank,
            scan_mode,
            exposure_time: exposure,
        })
    }

    fn set_frame_format(&self, format: &FrameFormat, ctx: &Context) -> RawResult<u16> {
        let mut pixels = 0u16;
        // SAFETY: pixels is a live local receiving the new frame size
        check(with_ctx(ctx, |p| unsafe {
            ffi::setFrameFormat(
                format.start_element,
                format.end_element,
                format.reduction_mode as u8,
                &mut pixels,
                p,
            )
        }))?;
        Ok(pixels)
    }

    fn get_frame_format(&self, ctx: &Context) -> RawResult<FrameParameters> {
        let (mut start, mut end, mut reduction, mut pixels) = (0u16, 0u16, 0u8, 0u16);
        // SAFETY: every out-pointer refers to a live local
        check(with_ctx(ctx, |p| unsafe {
            ffi::getFrameFormat(&mut start, &mut end, &mut reduction, &mut pixels, p)
        }))?;

        let reduction_mode = ReductionMode::try_from(reduction).map_err(|raw| {
            log::warn!("Device reported unknown reduction mode {}", raw);
            codes::WRONG_ANSWER
        })?;
        Ok(FrameParameters {
            element_range: (start, end),
            reduction_mode,
            frame_size: pixels,
        })
    }

    fn set_external_trigger(
        &self,
        mode: ExternalTriggerMode,
        edge: SignalEdge,
        ctx: &Context,
    ) -> RawResult<()> {
        // SAFETY: plain values in, context pointer valid for the call
        check(with_ctx(ctx, |p| unsafe {
            ffi::setExternalTrigger(mode as u8, edge.bits(), p)
        }))
    }

    fn trigger(&self, ctx: &Context) -> RawResult<()> {
        // SAFETY: p points to a copy of the context handle for the call
        check(with_ctx(ctx, |p| unsafe { ffi::triggerAcquisition(p) }))
    }

    fn get_status(&self, ctx: &Context) -> RawResult<DeviceStatus> {
        let (mut flags, mut frames) = (0u8, 0u16);
        // SAFETY: both out-pointers refer to live locals
        check(with_ctx(ctx, |p| unsafe {
            ffi::getStatus(&mut flags, &mut frames, p)
        }))?;
        Ok(DeviceStatus {
            flags: Status::from_bits_truncate(flags),
            frames_in_memory: frames,
        })
    }

    fn get_frame(&self, index: u16, buf: &mut [u16], ctx: &Context) -> RawResult<()> {
        // The library writes as many pixels as its context says
        let pixels = self
            .pixels_in_frame(ctx)
            .ok_or(codes::DEVICE_NOT_INITIALIZED)?;
        if buf.len() < pixels as usize {
            return Err(codes::INPUT_PARAMETER_NOT_INITIALIZED);
        }
        // SAFETY: buf holds at least the pixel count the library will write
        check(with_ctx(ctx, |p| unsafe {
            ffi::getFrame(buf.as_mut_ptr(), index, p)
        }))
    }

    fn clear_memory(&self, ctx: &Context) -> RawResult<()> {
        // SAFETY: p points to a copy of the context handle for the call
        check(with_ctx(ctx, |p| unsafe { ffi::clearMemory(p) }))
    }

    fn erase_flash(&self, ctx: &Context) -> RawResult<()> {
        // SAFETY: p points to a copy of the context handle for the call
        check(with_ctx(ctx, |p| unsafe { ffi::eraseFlash(p) }))
    }

    fn read_flash(&self, offset: u32, buf: &mut [u8], ctx: &Context) -> RawResult<usize> {
        let len = u32::try_from(buf.len()).map_err(|_| codes::INPUT_PARAMETER_NOT_INITIALIZED)?;
        // SAFETY: buf is valid for len writable bytes
        check(with_ctx(ctx, |p| unsafe {
            ffi::readFlash(buf.as_mut_ptr(), offset, len, p)
        }))?;
        Ok(buf.len())
    }

    fn write_flash(&self, offset: u32, data: &[u8], ctx: &Context) -> RawResult<usize> {
        let len = u32::try_from(data.len()).map_err(|_| codes::INPUT_PARAMETER_NOT_INITIALIZED)?;
        // SAFETY: writeFlash only reads from the buffer despite the mutable
        // pointer in its signature
        check(with_ctx(ctx, |p| unsafe {
            ffi::writeFlash(data.as_ptr().cast_mut(), offset, len, p)
        }))?;
        Ok(data.len())
    }

    fn pixels_in_frame(&self, ctx: &Context) -> Option<u16> {
        if ctx.is_null() {
            return None;
        }
        // SAFETY: a non-null context was produced by a successful connect
        let pixels = unsafe { context_pixels(ctx.raw()) };
        if pixels != 0 {
            return Some(pixels);
        }

        // Fresh contexts learn the frame size on the first format query
        let mut raw = ctx.raw();
        // SAFETY: the library skips null out-pointers and refreshes the
        // pixel count stored in the live context
        let result = unsafe {
            ffi::getFrameFormat(
                ptr::null_mut(),
                ptr::null_mut(),
                ptr::null_mut(),
                ptr::null_mut(),
                &mut raw,
            )
        };
        check(result).ok()?;
        // SAFETY: same live context as above
        Some(unsafe { context_pixels(ctx.raw()) })
    }
}

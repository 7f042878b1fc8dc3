//! Raw declarations of the libspectrometer C API

#![allow(non_snake_case)]

use libc::{c_char, c_int, c_uint, c_void, uintptr_t};

/// Node of the device list returned by [`getDevicesInfo`]
#[repr(C)]
pub struct DeviceInfo {
    pub serial_number: *mut c_char,
    pub next: *mut DeviceInfo,
}

/// Per-device state the library keeps behind the context handle
#[repr(C)]
#[allow(dead_code)]
pub struct DeviceContext {
    pub handle: *mut c_void,
    pub num_of_pixels_in_frame: u16,
    pub serial: *mut c_char,
}

extern "C" {
    pub fn disconnectDeviceContext(ctx: *mut uintptr_t) -> c_int;
    pub fn connectToDeviceBySerial(serial: *const c_char, ctx: *mut uintptr_t) -> c_int;
    pub fn connectToDeviceByIndex(index: c_uint, ctx: *mut uintptr_t) -> c_int;
    pub fn getDevicesCount() -> u32;
    pub fn getDevicesInfo() -> *mut DeviceInfo;
    pub fn clearDevicesInfo(devices: *mut DeviceInfo);

    pub fn setFrameFormat(
        start_element: u16,
        end_element: u16,
        reduction_mode: u8,
        pixels_in_frame: *mut u16,
        ctx: *mut uintptr_t,
    ) -> c_int;
    pub fn setAcquisitionParameters(
        num_of_scans: u16,
        num_of_blank_scans: u16,
        scan_mode: u8,
        exposure_time: u32,
        ctx: *mut uintptr_t,
    ) -> c_int;
    pub fn setExternalTrigger(enable_mode: u8, signal_front_mode: u8, ctx: *mut uintptr_t)
        -> c_int;
    pub fn triggerAcquisition(ctx: *mut uintptr_t) -> c_int;
    pub fn getStatus(status_flags: *mut u8, frames_in_memory: *mut u16, ctx: *mut uintptr_t)
        -> c_int;
    pub fn getAcquisitionParameters(
        num_of_scans: *mut u16,
        num_of_blank_scans: *mut u16,
        scan_mode: *mut u8,
        exposure_time: *mut u32,
        ctx: *mut uintptr_t,
    ) -> c_int;
    pub fn getFrameFormat(
        start_element: *mut u16,
        end_element: *mut u16,
        reduction_mode: *mut u8,
        pixels_in_frame: *mut u16,
        ctx: *mut uintptr_t,
    ) -> c_int;
    pub fn getFrame(buffer: *mut u16, frame_index: u16, ctx: *mut uintptr_t) -> c_int;
    pub fn clearMemory(ctx: *mut uintptr_t) -> c_int;
    pub fn eraseFlash(ctx: *mut uintptr_t) -> c_int;
    pub fn readFlash(buffer: *mut u8, offset: u32, len: u32, ctx: *mut uintptr_t) -> c_int;
    pub fn writeFlash(buffer: *mut u8, offset: u32, len: u32, ctx: *mut uintptr_t) -> c_int;
    pub fn resetDevice(ctx: *mut uintptr_t) -> c_int;
    pub fn detachDevice(ctx: *mut uintptr_t) -> c_int;
}

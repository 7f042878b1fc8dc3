//! Device handle
//!
//! [`DeviceHandle`] owns one driver [`Context`] and is the only caller of the
//! [`Driver`] trait. Every call checks the connection state first and maps
//! the raw result code through [`Error::from_code`], so nothing past this
//! module ever sees a numeric code.

use std::fmt;
use std::sync::Arc;

use crate::driver::{Context, DeviceStatus, Driver};
use crate::error::{Error, Precondition, RawResult, Result};
use crate::frame::{Frame, DEFAULT_FRAME_SIZE};
use crate::modes::{ExternalTriggerMode, SignalEdge, Status};
use crate::params::{AcquisitionParameters, FrameFormat, FrameParameters};

/// Number of devices the driver currently sees
pub fn device_count(driver: &dyn Driver) -> u32 {
    driver.devices_count()
}

/// Serial numbers of the devices the driver currently sees
pub fn device_list(driver: &dyn Driver) -> Vec<String> {
    driver.devices_info()
}

/// Owned connection to one physical spectrometer
///
/// A handle starts disconnected. Calls on a disconnected handle fail with
/// [`Precondition::NotConnected`] without reaching the driver. A handle
/// that is still connected when dropped disconnects itself.
pub struct DeviceHandle {
    driver: Arc<dyn Driver>,
    ctx: Context,
    connected: bool,
}

impl DeviceHandle {
    /// Create a disconnected handle
    pub fn new(driver: Arc<dyn Driver>) -> Self {
        Self {
            driver,
            ctx: Context::NULL,
            connected: false,
        }
    }

    /// Create a handle and connect it
    pub fn open(driver: Arc<dyn Driver>, serial: Option<&str>) -> Result<Self> {
        let mut handle = Self::new(driver);
        handle.connect(serial)?;
        Ok(handle)
    }

    /// Connect to the device with the given serial, or the default device
    ///
    /// Connecting an already connected handle reinitializes it.
    pub fn connect(&mut self, serial: Option<&str>) -> Result<()> {
        log::debug!("Connecting to {}", serial.unwrap_or("default device"));
        let result = self.driver.connect_by_serial(serial, &mut self.ctx);
        self.connected = result.is_ok();
        result.map_err(Error::from_code)?;
        log::info!("Connected to {}", serial.unwrap_or("default device"));
        Ok(())
    }

    /// Connect to the device at `index` in enumeration order
    pub fn connect_by_index(&mut self, index: u32) -> Result<()> {
        log::debug!("Connecting to device #{}", index);
        let result = self.driver.connect_by_index(index, &mut self.ctx);
        self.connected = result.is_ok();
        result.map_err(Error::from_code)?;
        log::info!("Connected to device #{}", index);
        Ok(())
    }

    /// Release the device
    ///
    /// The handle is invalidated even if the driver reports a failure.
    pub fn disconnect(&mut self) -> Result<()> {
        self.ensure_connected()?;
        self.connected = false;
        let result = self.driver.disconnect(&mut self.ctx);
        self.ctx = Context::NULL;
        result.map_err(Error::from_code)?;
        log::debug!("Disconnected");
        Ok(())
    }

    /// Whether the handle refers to a connected device
    pub fn is_connected(&self) -> bool {
        self.connected
    }

    /// The driver behind this handle
    pub fn driver(&self) -> &Arc<dyn Driver> {
        &self.driver
    }

    /// Restore the device to factory defaults
    ///
    /// The handle keeps no parameter cache; the owning session must reset
    /// its own.
    pub fn reset(&self) -> Result<()> {
        self.call("reset", |d, ctx| d.reset(ctx))
    }

    /// Detach the device from the bus until it is reset
    pub fn detach(&self) -> Result<()> {
        self.call("detach", |d, ctx| d.detach(ctx))
    }

    /// Write all acquisition parameters in one call
    pub fn set_acquisition_parameters(&self, params: &AcquisitionParameters) -> Result<()> {
        self.call("set_acquisition_parameters", |d, ctx| {
            d.set_acquisition_parameters(params, ctx)
        })
    }

    /// Read the acquisition parameters from the device
    pub fn acquisition_parameters(&self) -> Result<AcquisitionParameters> {
        self.call("get_acquisition_parameters", |d, ctx| {
            d.get_acquisition_parameters(ctx)
        })
    }

    /// Set the frame format, returning the new frame size
    pub fn set_frame_format(&self, format: &FrameFormat) -> Result<u16> {
        self.call("set_frame_format", |d, ctx| d.set_frame_format(format, ctx))
    }

    /// Read the frame format from the device
    pub fn frame_parameters(&self) -> Result<FrameParameters> {
        self.call("get_frame_format", |d, ctx| d.get_frame_format(ctx))
    }

    /// Configure the external trigger input
    pub fn set_external_trigger(&self, mode: ExternalTriggerMode, edge: SignalEdge) -> Result<()> {
        self.call("set_external_trigger", |d, ctx| {
            d.set_external_trigger(mode, edge, ctx)
        })
    }

    /// Start an acquisition by software
    pub fn trigger(&self) -> Result<()> {
        self.call("trigger", |d, ctx| d.trigger(ctx))
    }

    /// Poll status flags and frame count
    pub fn device_status(&self) -> Result<DeviceStatus> {
        self.call("get_status", |d, ctx| d.get_status(ctx))
    }

    /// Poll status flags only
    pub fn status(&self) -> Result<Status> {
        Ok(self.device_status()?.flags)
    }

    /// Frames currently held in device memory
    pub fn frames_in_memory(&self) -> Result<u16> {
        Ok(self.device_status()?.frames_in_memory)
    }

    /// Raw frame size from the device context
    ///
    /// Falls back to [`DEFAULT_FRAME_SIZE`] when the context cannot be read.
    pub fn frame_size(&self) -> u16 {
        self.driver
            .pixels_in_frame(&self.ctx)
            .unwrap_or(DEFAULT_FRAME_SIZE)
    }

    /// Fetch the raw frame at device index `index`
    pub fn raw_frame(&self, index: u16) -> Result<Vec<u16>> {
        self.ensure_connected()?;
        let mut buf = vec![0u16; self.frame_size() as usize];
        self.call("get_frame", |d, ctx| d.get_frame(index, &mut buf, ctx))?;
        Ok(buf)
    }

    /// Fetch frame `index`, windowed and reversed
    pub fn frame(&self, index: u16) -> Result<Frame> {
        Ok(Frame::from_raw(&self.raw_frame(index)?))
    }

    /// Discard all frames in device memory
    pub fn clear_memory(&self) -> Result<()> {
        self.call("clear_memory", |d, ctx| d.clear_memory(ctx))
    }

    /// Erase the whole user flash
    pub fn erase_flash(&self) -> Result<()> {
        self.call("erase_flash", |d, ctx| d.erase_flash(ctx))
    }

    /// Read user flash, returning the number of bytes the driver delivered
    pub fn read_flash(&self, offset: u32, buf: &mut [u8]) -> Result<usize> {
        self.call("read_flash", |d, ctx| d.read_flash(offset, buf, ctx))
    }

    /// Write user flash, returning the number of bytes written
    pub fn write_flash(&self, offset: u32, data: &[u8]) -> Result<usize> {
        self.call("write_flash", |d, ctx| d.write_flash(offset, data, ctx))
    }

    fn ensure_connected(&self) -> Result<()> {
        if self.connected {
            Ok(())
        } else {
            Err(Precondition::NotConnected.into())
        }
    }

    /// Issue one driver call on this handle's context
    fn call<T>(
        &self,
        name: &str,
        f: impl FnOnce(&dyn Driver, &Context) -> RawResult<T>,
    ) -> Result<T> {
        self.ensure_connected()?;
        log::trace!("driver call: {}", name);
        f(self.driver.as_ref(), &self.ctx).map_err(|code| {
            let err = Error::from_code(code);
            log::debug!("{} failed with code {}: {}", name, code, err);
            err
        })
    }
}

impl fmt::Debug for DeviceHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("DeviceHandle")
            .field("ctx", &self.ctx)
            .field("connected", &self.connected)
            .finish()
    }
}

impl Drop for DeviceHandle {
    fn drop(&mut self) {
        if self.connected {
            if let Err(e) = self.disconnect() {
                log::warn!("Failed to disconnect device: {}", e);
            }
        }
    }
}

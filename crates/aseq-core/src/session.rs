//! Acquisition session
//!
//! [`Spectrometer`] owns a [`DeviceHandle`] together with cached copies of
//! the acquisition and frame parameters. Setters compare against the cache
//! and only talk to the device when something actually changes; the device
//! takes all acquisition parameters in one call, so they are always written
//! together.
//!
//! The session also keeps track of which [`Memory`] backend matches the
//! current scan mode and switches it whenever the scan mode changes.

use std::fmt;
use std::sync::Arc;

use crate::driver::Driver;
use crate::error::{Precondition, Result};
use crate::flash::Flash;
use crate::handle::{self, DeviceHandle};
use crate::memory::{Memory, MemoryKind};
use crate::modes::{ExternalTriggerMode, ReductionMode, ScanMode, SignalEdge, Status};
use crate::params::{exposure_units, AcquisitionParameters, FrameFormat, FrameParameters};
use crate::trigger::{ExternalTrigger, Trigger};

/// One spectrometer and its cached configuration
pub struct Spectrometer {
    handle: DeviceHandle,
    serial: Option<String>,
    acquisition: Option<AcquisitionParameters>,
    frame: Option<FrameParameters>,
    memory: MemoryKind,
    trigger: Trigger,
}

impl Spectrometer {
    /// Create a disconnected session for the device with `serial`
    ///
    /// `None` selects the first device the driver finds.
    pub fn new(driver: Arc<dyn Driver>, serial: Option<&str>) -> Self {
        Self {
            handle: DeviceHandle::new(driver),
            serial: serial.map(str::to_owned),
            acquisition: None,
            frame: None,
            memory: MemoryKind::Ring,
            trigger: Trigger::default(),
        }
    }

    /// Create a session and connect it
    pub fn open(driver: Arc<dyn Driver>, serial: Option<&str>) -> Result<Self> {
        let mut spectro = Self::new(driver, serial);
        spectro.connect()?;
        Ok(spectro)
    }

    /// Number of devices the driver sees
    pub fn device_count(driver: &dyn Driver) -> u32 {
        handle::device_count(driver)
    }

    /// Serial numbers of the devices the driver sees
    pub fn device_list(driver: &dyn Driver) -> Vec<String> {
        handle::device_list(driver)
    }

    /// Connect and load the device configuration into the cache
    ///
    /// If the configuration cannot be loaded the device is disconnected
    /// again and the session stays disconnected.
    pub fn connect(&mut self) -> Result<()> {
        self.handle.connect(self.serial.as_deref())?;

        let loaded = self
            .handle
            .acquisition_parameters()
            .and_then(|acquisition| Ok((acquisition, self.handle.frame_parameters()?)));
        let (acquisition, frame) = match loaded {
            Ok(config) => config,
            Err(e) => {
                if let Err(disconnect) = self.handle.disconnect() {
                    log::warn!("Disconnect after failed connect: {}", disconnect);
                }
                self.clear_cache();
                return Err(e);
            }
        };

        self.acquisition = Some(acquisition);
        self.frame = Some(frame);
        self.select_memory();

        log::debug!("Device configuration: {:?}, {:?}", acquisition, frame);
        Ok(())
    }

    /// Connect again, reloading the configuration
    pub fn reconnect(&mut self) -> Result<()> {
        self.connect()
    }

    /// Disconnect and drop the cached configuration
    pub fn disconnect(&mut self) -> Result<()> {
        let result = self.handle.disconnect();
        self.clear_cache();
        result
    }

    /// Reset the device to factory defaults
    ///
    /// The device forgets its external trigger setup, so the session falls
    /// back to the software trigger.
    pub fn reset(&mut self) -> Result<()> {
        self.handle.reset()?;
        self.acquisition = Some(AcquisitionParameters::FACTORY);
        self.frame = Some(FrameParameters::FACTORY);
        self.trigger = Trigger::default();
        self.select_memory();
        Ok(())
    }

    /// Whether the session is connected
    pub fn is_connected(&self) -> bool {
        self.handle.is_connected()
    }

    /// Serial the session was created for
    pub fn serial(&self) -> Option<&str> {
        self.serial.as_deref()
    }

    /// The underlying device handle
    pub fn handle(&self) -> &DeviceHandle {
        &self.handle
    }

    /// Poll the device status
    pub fn status(&self) -> Result<Status> {
        self.handle.status()
    }

    /// User flash of the device
    pub fn flash(&self) -> Flash<'_> {
        Flash::new(&self.handle)
    }

    /// Frame memory backend matching the current scan mode
    pub fn memory(&self) -> Memory<'_> {
        Memory::new(self.memory, &self.handle)
    }

    /// Which frame memory backend is active
    pub fn memory_kind(&self) -> MemoryKind {
        self.memory
    }

    /// Start an acquisition through the active trigger
    pub fn trigger(&self) -> Result<()> {
        self.trigger.fire(&self.handle)
    }

    /// The active trigger
    pub fn active_trigger(&self) -> &Trigger {
        &self.trigger
    }

    /// Replace the active trigger
    pub fn set_trigger(&mut self, trigger: impl Into<Trigger>) {
        self.trigger = trigger.into();
    }

    /// Use the external trigger input with `mode` and `edge`
    ///
    /// If an external trigger is already active only the changed settings
    /// are sent to the device.
    pub fn configure_external_trigger(
        &mut self,
        mode: ExternalTriggerMode,
        edge: SignalEdge,
    ) -> Result<()> {
        match &mut self.trigger {
            Trigger::External(ext) => {
                ext.set_mode(&self.handle, mode)?;
                ext.set_edge(&self.handle, edge)?;
            }
            _ => {
                self.trigger = ExternalTrigger::new(&self.handle, mode, edge)?.into();
            }
        }
        Ok(())
    }

    /// Cached acquisition parameters
    pub fn acquisition_parameters(&self) -> Option<AcquisitionParameters> {
        self.acquisition
    }

    /// Cached frame parameters
    pub fn frame_parameters(&self) -> Option<FrameParameters> {
        self.frame
    }

    /// Number of scans
    pub fn num_of_scans(&self) -> Option<u16> {
        self.acquisition.map(|p| p.num_of_scans)
    }

    /// Number of blank scans
    pub fn num_of_blank_scans(&self) -> Option<u16> {
        self.acquisition.map(|p| p.num_of_blank_scans)
    }

    /// Scan mode
    pub fn scan_mode(&self) -> Option<ScanMode> {
        self.acquisition.map(|p| p.scan_mode)
    }

    /// Exposure time in microseconds
    pub fn exposure_time(&self) -> Option<u32> {
        self.acquisition.map(|p| p.exposure_micros())
    }

    /// Element range
    pub fn element_range(&self) -> Option<(u16, u16)> {
        self.frame.map(|p| p.element_range)
    }

    /// Reduction mode
    pub fn reduction_mode(&self) -> Option<ReductionMode> {
        self.frame.map(|p| p.reduction_mode)
    }

    /// Raw frame size in pixels
    pub fn frame_size(&self) -> Option<u16> {
        self.frame.map(|p| p.frame_size)
    }

    /// Set the number of scans
    pub fn set_num_of_scans(&mut self, value: u16) -> Result<()> {
        let params = AcquisitionParameters {
            num_of_scans: value,
            ..self.cached_acquisition()?
        };
        self.apply_acquisition_parameters(params)?;
        Ok(())
    }

    /// Set the number of blank scans
    pub fn set_num_of_blank_scans(&mut self, value: u16) -> Result<()> {
        let params = AcquisitionParameters {
            num_of_blank_scans: value,
            ..self.cached_acquisition()?
        };
        self.apply_acquisition_parameters(params)?;
        Ok(())
    }

    /// Set the scan mode
    ///
    /// Frame averaging has no blank scans, so switching to it also sets the
    /// blank scan count to 0. The frame memory backend follows the mode.
    pub fn set_scan_mode(&mut self, value: ScanMode) -> Result<()> {
        let current = self.cached_acquisition()?;
        if current.scan_mode == value {
            return Ok(());
        }

        let num_of_blank_scans = match value {
            ScanMode::FrameAveraging => 0,
            _ => current.num_of_blank_scans,
        };
        self.apply_acquisition_parameters(AcquisitionParameters {
            scan_mode: value,
            num_of_blank_scans,
            ..current
        })?;
        Ok(())
    }

    /// Set the exposure time in microseconds
    ///
    /// The device works in steps of 10 µs; the value is rounded to the
    /// nearest step.
    pub fn set_exposure_time(&mut self, micros: u32) -> Result<()> {
        let params = AcquisitionParameters {
            exposure_time: exposure_units(micros),
            ..self.cached_acquisition()?
        };
        self.apply_acquisition_parameters(params)?;
        Ok(())
    }

    /// Set the element range
    pub fn set_element_range(&mut self, start: u16, end: u16) -> Result<()> {
        let format = FrameFormat {
            start_element: start,
            end_element: end,
            ..self.cached_frame()?.format()
        };
        self.apply_frame_format(format)?;
        Ok(())
    }

    /// Set the reduction mode
    pub fn set_reduction_mode(&mut self, value: ReductionMode) -> Result<()> {
        let format = FrameFormat {
            reduction_mode: value,
            ..self.cached_frame()?.format()
        };
        self.apply_frame_format(format)?;
        Ok(())
    }

    /// Write `params` to the device if they differ from the cache
    ///
    /// Returns whether a device call was made. The cache is updated only
    /// after the device accepted the new parameters. Frame averaging has no
    /// blank scans; their count is sent as 0 in that mode.
    pub fn apply_acquisition_parameters(
        &mut self,
        mut params: AcquisitionParameters,
    ) -> Result<bool> {
        if params.scan_mode == ScanMode::FrameAveraging {
            params.num_of_blank_scans = 0;
        }
        let current = self.cached_acquisition()?;
        if current == params {
            return Ok(false);
        }

        log::debug!("Acquisition parameters {:?} -> {:?}", current, params);
        self.handle.set_acquisition_parameters(&params)?;
        self.acquisition = Some(params);
        if current.scan_mode != params.scan_mode {
            self.select_memory();
        }
        Ok(true)
    }

    /// Write `format` to the device if it differs from the cache
    ///
    /// Returns whether a device call was made. The frame size computed by the
    /// device is stored alongside.
    pub fn apply_frame_format(&mut self, format: FrameFormat) -> Result<bool> {
        let current = self.cached_frame()?;
        if current.format() == format {
            return Ok(false);
        }

        log::debug!("Frame format {:?} -> {:?}", current.format(), format);
        let frame_size = self.handle.set_frame_format(&format)?;
        self.frame = Some(FrameParameters {
            element_range: (format.start_element, format.end_element),
            reduction_mode: format.reduction_mode,
            frame_size,
        });
        Ok(true)
    }

    fn cached_acquisition(&self) -> Result<AcquisitionParameters> {
        self.acquisition.ok_or_else(|| Precondition::NotConnected.into())
    }

    fn cached_frame(&self) -> Result<FrameParameters> {
        self.frame.ok_or_else(|| Precondition::NotConnected.into())
    }

    fn clear_cache(&mut self) {
        self.acquisition = None;
        self.frame = None;
        self.trigger = Trigger::default();
        self.select_memory();
    }

    /// Pick the memory backend for the cached scan mode
    fn select_memory(&mut self) {
        let kind = self
            .acquisition
            .map_or(MemoryKind::Ring, |p| MemoryKind::for_scan_mode(p.scan_mode));
        if kind != self.memory {
            log::debug!("Switching frame memory {:?} -> {:?}", self.memory, kind);
            self.memory = kind;
        }
    }
}

impl fmt::Display for Spectrometer {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "Spectrometer [{}]: {}connected",
            self.serial.as_deref().unwrap_or("ASQ_SPC???????"),
            if self.is_connected() { "" } else { "dis" }
        )
    }
}

impl fmt::Debug for Spectrometer {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Spectrometer")
            .field("serial", &self.serial)
            .field("handle", &self.handle)
            .field("acquisition", &self.acquisition)
            .field("frame", &self.frame)
            .field("memory", &self.memory)
            .field("trigger", &self.trigger)
            .finish()
    }
}

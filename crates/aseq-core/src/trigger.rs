//! Acquisition triggers

use crate::error::{Error, Result};
use crate::handle::DeviceHandle;
use crate::modes::{ExternalTriggerMode, SignalEdge};

/// Starts acquisitions on command
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct SoftwareTrigger;

impl SoftwareTrigger {
    /// Start an acquisition now
    pub fn fire(&self, handle: &DeviceHandle) -> Result<()> {
        handle.trigger()
    }
}

/// Acquisition started by an external signal
///
/// The device is reconfigured only when mode or edge actually change.
/// Firing is a no-op: the signal does the triggering.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ExternalTrigger {
    mode: ExternalTriggerMode,
    edge: SignalEdge,
}

impl ExternalTrigger {
    /// Configure the external trigger input on the device
    pub fn new(handle: &DeviceHandle, mode: ExternalTriggerMode, edge: SignalEdge) -> Result<Self> {
        handle.set_external_trigger(mode, edge)?;
        Ok(Self { mode, edge })
    }

    /// Current enable mode
    pub fn mode(&self) -> ExternalTriggerMode {
        self.mode
    }

    /// Current signal edge(s)
    pub fn edge(&self) -> SignalEdge {
        self.edge
    }

    /// Change the enable mode, returning whether the device was updated
    pub fn set_mode(&mut self, handle: &DeviceHandle, mode: ExternalTriggerMode) -> Result<bool> {
        if self.mode == mode {
            return Ok(false);
        }
        handle.set_external_trigger(mode, self.edge)?;
        self.mode = mode;
        Ok(true)
    }

    /// Change the signal edge(s), returning whether the device was updated
    pub fn set_edge(&mut self, handle: &DeviceHandle, edge: SignalEdge) -> Result<bool> {
        if self.edge == edge {
            return Ok(false);
        }
        handle.set_external_trigger(self.mode, edge)?;
        self.edge = edge;
        Ok(true)
    }

    /// Nothing to do; acquisition starts on the external signal
    pub fn fire(&self, _handle: &DeviceHandle) -> Result<()> {
        Ok(())
    }
}

/// Optical trigger (not implemented)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct OpticalTrigger;

impl OpticalTrigger {
    /// Always fails with [`Error::NotImplemented`]
    pub fn fire(&self, _handle: &DeviceHandle) -> Result<()> {
        Err(Error::NotImplemented("optical trigger"))
    }
}

/// Trigger attached to a session
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Trigger {
    /// Software trigger
    Software(SoftwareTrigger),
    /// External signal trigger
    External(ExternalTrigger),
    /// Optical trigger
    Optical(OpticalTrigger),
}

impl Trigger {
    /// Start an acquisition through this trigger
    pub fn fire(&self, handle: &DeviceHandle) -> Result<()> {
        match self {
            Self::Software(t) => t.fire(handle),
            Self::External(t) => t.fire(handle),
            Self::Optical(t) => t.fire(handle),
        }
    }
}

impl Default for Trigger {
    fn default() -> Self {
        Self::Software(SoftwareTrigger)
    }
}

impl From<SoftwareTrigger> for Trigger {
    fn from(t: SoftwareTrigger) -> Self {
        Self::Software(t)
    }
}

impl From<ExternalTrigger> for Trigger {
    fn from(t: ExternalTrigger) -> Self {
        Self::External(t)
    }
}

impl From<OpticalTrigger> for Trigger {
    fn from(t: OpticalTrigger) -> Self {
        Self::Optical(t)
    }
}

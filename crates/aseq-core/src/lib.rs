//! aseq-core - Core library for ASEQ spectrometer acquisition
//!
//! This crate manages spectrometer connections, keeps a local copy of the
//! acquisition and frame parameters in sync with the device, and gives
//! access to frame memory and user flash. All hardware access goes through
//! the [`Driver`] trait; driver crates provide the implementations.
//!
//! # Example
//!
//! ```ignore
//! use std::sync::Arc;
//! use aseq_core::{FrameMemory, ScanMode, Spectrometer};
//!
//! fn read_one(driver: Arc<dyn aseq_core::Driver>) -> aseq_core::Result<()> {
//!     let mut spectro = Spectrometer::open(driver, None)?;
//!     spectro.set_scan_mode(ScanMode::FrameAveraging)?;
//!     spectro.set_exposure_time(10_000)?;
//!     spectro.trigger()?;
//!     let frame = spectro.memory().get(0)?;
//!     println!("{} pixels", frame.len());
//!     Ok(())
//! }
//! ```

#![warn(missing_docs)]
#![warn(rust_2018_idioms)]

pub mod barrier;
pub mod driver;
pub mod error;
pub mod flash;
pub mod frame;
pub mod handle;
pub mod memory;
pub mod modes;
pub mod params;
pub mod session;
pub mod simultaneous;
pub mod trigger;

pub use driver::{Context, DeviceStatus, Driver};
pub use error::{Error, Result};
pub use flash::Flash;
pub use frame::Frame;
pub use handle::DeviceHandle;
pub use memory::{FrameMemory, Memory, MemoryKind};
pub use modes::{
    ExternalTriggerMode, FrameStatus, OpticalTriggerMode, ReductionMode, ScanMode, SignalEdge,
    Status,
};
pub use params::{AcquisitionParameters, FrameFormat, FrameParameters};
pub use session::Spectrometer;
pub use trigger::Trigger;

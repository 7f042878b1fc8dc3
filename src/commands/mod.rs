//! CLI command implementations
//!
//! Every command works on a connected [`aseq_core::Spectrometer`] and
//! returns `Box<dyn Error>` so driver, I/O and argument failures share one
//! exit path.

pub mod flash;
pub mod frames;
mod list;
pub mod simultaneous;

pub use list::{list_devices, list_drivers};

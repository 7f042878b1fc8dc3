//! aseq-dummy - In-memory spectrometer emulator for testing
//!
//! This crate provides a [`Driver`] that emulates any number of
//! spectrometers in memory. Acquisitions complete instantly when triggered,
//! the user flash behaves like NOR flash (programming only clears bits) and
//! every driver call is counted so tests can assert on hardware round-trips.

mod device;

use std::collections::HashMap;
use std::sync::{Mutex, MutexGuard, PoisonError};

use aseq_core::error::{codes, RawResult, ResultCode};
use aseq_core::{
    AcquisitionParameters, Context, DeviceStatus, Driver, ExternalTriggerMode, FrameFormat,
    FrameParameters, SignalEdge,
};

use device::Device;

/// Configuration for the dummy driver
#[derive(Debug, Clone)]
pub struct DummyConfig {
    /// Serial numbers of the emulated devices, in enumeration order
    pub serials: Vec<String>,
    /// Frames the ring memory holds before reporting memory full
    pub memory_frames: u16,
    /// Deliver at most this many bytes per flash read
    pub flash_read_limit: Option<usize>,
}

impl DummyConfig {
    /// Configuration with `count` devices
    pub fn with_devices(count: usize) -> Self {
        Self {
            serials: (1..=count).map(|i| format!("ASQ_SPC{:07}", i)).collect(),
            ..Self::default()
        }
    }
}

impl Default for DummyConfig {
    fn default() -> Self {
        Self {
            serials: vec!["ASQ_SPC0000001".into()],
            // full-size frames the real memory holds
            memory_frames: 137,
            flash_read_limit: None,
        }
    }
}

#[derive(Debug, Default)]
struct State {
    devices: Vec<Device>,
    /// Context id -> device index
    contexts: HashMap<usize, usize>,
    next_context: usize,
}

/// Dummy spectrometer driver
///
/// Emulates the devices described by a [`DummyConfig`].
#[derive(Debug)]
pub struct DummyDriver {
    config: DummyConfig,
    state: Mutex<State>,
    calls: Mutex<HashMap<&'static str, usize>>,
    faults: Mutex<HashMap<&'static str, ResultCode>>,
}

impl DummyDriver {
    /// Create a driver with the given configuration
    pub fn new(config: DummyConfig) -> Self {
        let devices = config
            .serials
            .iter()
            .map(|serial| Device::new(serial.clone(), config.memory_frames))
            .collect();
        Self {
            config,
            state: Mutex::new(State {
                devices,
                contexts: HashMap::new(),
                next_context: 1,
            }),
            calls: Mutex::new(HashMap::new()),
            faults: Mutex::new(HashMap::new()),
        }
    }

    /// Create a driver with a single device
    pub fn new_default() -> Self {
        Self::new(DummyConfig::default())
    }

    /// Get the configuration
    pub fn config(&self) -> &DummyConfig {
        &self.config
    }

    /// How many times the driver operation `name` was called
    ///
    /// Names are the [`Driver`] method names, e.g. `"set_frame_format"`.
    pub fn calls(&self, name: &str) -> usize {
        lock(&self.calls).get(name).copied().unwrap_or(0)
    }

    /// Forget all recorded calls
    pub fn reset_calls(&self) {
        lock(&self.calls).clear();
    }

    /// Make the next call of operation `name` fail with `code`
    pub fn fail_next(&self, name: &'static str, code: ResultCode) {
        lock(&self.faults).insert(name, code);
    }

    /// Contents of the user flash of device `index`
    pub fn flash_contents(&self, index: usize) -> Option<Vec<u8>> {
        lock(&self.state).devices.get(index).map(|d| d.flash.clone())
    }

    /// Acquisition parameters held by device `index`
    pub fn acquisition_parameters(&self, index: usize) -> Option<AcquisitionParameters> {
        lock(&self.state).devices.get(index).map(|d| d.acquisition)
    }

    /// Frame parameters held by device `index`
    pub fn frame_parameters(&self, index: usize) -> Option<FrameParameters> {
        lock(&self.state).devices.get(index).map(|d| d.format)
    }

    /// External trigger configuration of device `index`
    pub fn external_trigger(&self, index: usize) -> Option<(ExternalTriggerMode, SignalEdge)> {
        lock(&self.state)
            .devices
            .get(index)
            .map(|d| d.external_trigger)
    }

    /// Force the raw frames-in-memory value device `index` reports
    ///
    /// `None` restores the emulated value.
    pub fn force_frames_in_memory(&self, index: usize, raw: Option<u16>) {
        if let Some(dev) = lock(&self.state).devices.get_mut(index) {
            dev.forced_frames_in_memory = raw;
        }
    }

    /// Plug a detached device back in
    pub fn reattach(&self, index: usize) {
        if let Some(dev) = lock(&self.state).devices.get_mut(index) {
            dev.detached = false;
        }
    }

    /// Record a call of `name` and consume any injected fault for it
    fn begin(&self, name: &'static str) -> RawResult<()> {
        *lock(&self.calls).entry(name).or_insert(0) += 1;
        log::trace!("dummy: {}", name);
        match lock(&self.faults).remove(name) {
            Some(code) => Err(code),
            None => Ok(()),
        }
    }

    /// Run `f` on the device behind `ctx`
    fn with_device<T>(
        &self,
        name: &'static str,
        ctx: &Context,
        f: impl FnOnce(&mut Device) -> RawResult<T>,
    ) -> RawResult<T> {
        self.begin(name)?;
        if ctx.is_null() {
            return Err(codes::DEVICE_NOT_INITIALIZED);
        }

        let mut state = lock(&self.state);
        let index = *state
            .contexts
            .get(&ctx.raw())
            .ok_or(codes::DEVICE_NOT_INITIALIZED)?;
        let dev = &mut state.devices[index];
        if dev.detached {
            return Err(codes::WRITING_PROCESS_FAILED);
        }
        f(dev)
    }

    fn attach(&self, index: usize, ctx: &mut Context) {
        let mut state = lock(&self.state);
        if !ctx.is_null() {
            state.contexts.remove(&ctx.raw());
        }
        let id = state.next_context;
        state.next_context += 1;
        state.contexts.insert(id, index);
        *ctx = Context::from_raw(id);
        log::debug!("dummy: {} attached as context {}", state.devices[index].serial, id);
    }
}

impl Default for DummyDriver {
    fn default() -> Self {
        Self::new_default()
    }
}

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(PoisonError::into_inner)
}

impl Driver for DummyDriver {
    fn devices_count(&self) -> u32 {
        let _ = self.begin("devices_count");
        lock(&self.state)
            .devices
            .iter()
            .filter(|d| !d.detached)
            .count() as u32
    }

    fn devices_info(&self) -> Vec<String> {
        let _ = self.begin("devices_info");
        lock(&self.state)
            .devices
            .iter()
            .filter(|d| !d.detached)
            .map(|d| d.serial.clone())
            .collect()
    }

    fn connect_by_serial(&self, serial: Option<&str>, ctx: &mut Context) -> RawResult<()> {
        self.begin("connect_by_serial")?;
        let index = lock(&self.state)
            .devices
            .iter()
            .position(|d| !d.detached && serial.map_or(true, |s| d.serial == s))
            .ok_or(codes::CONNECT_ERROR_FAILED)?;
        self.attach(index, ctx);
        Ok(())
    }

    fn connect_by_index(&self, index: u32, ctx: &mut Context) -> RawResult<()> {
        self.begin("connect_by_index")?;
        let index = lock(&self.state)
            .devices
            .iter()
            .enumerate()
            .filter(|(_, d)| !d.detached)
            .nth(index as usize)
            .map(|(i, _)| i)
            .ok_or(codes::CONNECT_ERROR_NOT_FOUND)?;
        self.attach(index, ctx);
        Ok(())
    }

    fn disconnect(&self, ctx: &mut Context) -> RawResult<()> {
        self.begin("disconnect")?;
        lock(&self.state).contexts.remove(&ctx.raw());
        *ctx = Context::NULL;
        Ok(())
    }

    fn reset(&self, ctx: &Context) -> RawResult<()> {
        self.with_device("reset", ctx, |dev| {
            dev.reset();
            Ok(())
        })
    }

    fn detach(&self, ctx: &Context) -> RawResult<()> {
        self.with_device("detach", ctx, |dev| {
            dev.detached = true;
            Ok(())
        })
    }

    fn set_acquisition_parameters(
        &self,
        params: &AcquisitionParameters,
        ctx: &Context,
    ) -> RawResult<()> {
        self.with_device("set_acquisition_parameters", ctx, |dev| {
            dev.set_acquisition_parameters(params);
            Ok(())
        })
    }

    fn get_acquisition_parameters(&self, ctx: &Context) -> RawResult<AcquisitionParameters> {
        self.with_device("get_acquisition_parameters", ctx, |dev| Ok(dev.acquisition))
    }

    fn set_frame_format(&self, format: &FrameFormat, ctx: &Context) -> RawResult<u16> {
        self.with_device("set_frame_format", ctx, |dev| dev.set_frame_format(format))
    }

    fn get_frame_format(&self, ctx: &Context) -> RawResult<FrameParameters> {
        self.with_device("get_frame_format", ctx, |dev| Ok(dev.format))
    }

    fn set_external_trigger(
        &self,
        mode: ExternalTriggerMode,
        edge: SignalEdge,
        ctx: &Context,
    ) -> RawResult<()> {
        self.with_device("set_external_trigger", ctx, |dev| {
            dev.external_trigger = (mode, edge);
            Ok(())
        })
    }

    fn trigger(&self, ctx: &Context) -> RawResult<()> {
        self.with_device("trigger", ctx, |dev| {
            dev.trigger();
            Ok(())
        })
    }

    fn get_status(&self, ctx: &Context) -> RawResult<DeviceStatus> {
        self.with_device("get_status", ctx, |dev| Ok(dev.status()))
    }

    fn get_frame(&self, index: u16, buf: &mut [u16], ctx: &Context) -> RawResult<()> {
        self.with_device("get_frame", ctx, |dev| dev.get_frame(index, buf))
    }

    fn clear_memory(&self, ctx: &Context) -> RawResult<()> {
        self.with_device("clear_memory", ctx, |dev| {
            dev.clear_memory();
            Ok(())
        })
    }

    fn erase_flash(&self, ctx: &Context) -> RawResult<()> {
        self.with_device("erase_flash", ctx, |dev| {
            dev.erase_flash();
            Ok(())
        })
    }

    fn read_flash(&self, offset: u32, buf: &mut [u8], ctx: &Context) -> RawResult<usize> {
        let limit = self.config.flash_read_limit;
        self.with_device("read_flash", ctx, |dev| dev.read_flash(offset, buf, limit))
    }

    fn write_flash(&self, offset: u32, data: &[u8], ctx: &Context) -> RawResult<usize> {
        self.with_device("write_flash", ctx, |dev| dev.write_flash(offset, data))
    }

    fn pixels_in_frame(&self, ctx: &Context) -> Option<u16> {
        let state = lock(&self.state);
        let index = *state.contexts.get(&ctx.raw())?;
        Some(state.devices[index].format.frame_size)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_enumeration() {
        let driver = DummyDriver::new(DummyConfig::with_devices(3));
        assert_eq!(driver.devices_count(), 3);
        assert_eq!(
            driver.devices_info(),
            ["ASQ_SPC0000001", "ASQ_SPC0000002", "ASQ_SPC0000003"]
        );
    }

    #[test]
    fn test_connect_by_serial() {
        let driver = DummyDriver::new(DummyConfig::with_devices(2));
        let mut ctx = Context::NULL;
        driver
            .connect_by_serial(Some("ASQ_SPC0000002"), &mut ctx)
            .unwrap();
        assert!(!ctx.is_null());

        let mut other = Context::NULL;
        assert_eq!(
            driver.connect_by_serial(Some("ASQ_SPC9999999"), &mut other),
            Err(codes::CONNECT_ERROR_FAILED)
        );
        assert!(other.is_null());
    }

    #[test]
    fn test_connect_by_index() {
        let driver = DummyDriver::new(DummyConfig::with_devices(2));
        let mut ctx = Context::NULL;
        driver.connect_by_index(1, &mut ctx).unwrap();
        assert_eq!(
            driver.connect_by_index(2, &mut ctx),
            Err(codes::CONNECT_ERROR_NOT_FOUND)
        );
    }

    #[test]
    fn test_reconnect_replaces_context() {
        let driver = DummyDriver::new_default();
        let mut ctx = Context::NULL;
        driver.connect_by_serial(None, &mut ctx).unwrap();
        let first = ctx;
        driver.connect_by_serial(None, &mut ctx).unwrap();
        assert_ne!(ctx, first);
        assert_eq!(
            driver.trigger(&first),
            Err(codes::DEVICE_NOT_INITIALIZED)
        );
        assert_eq!(driver.trigger(&ctx), Ok(()));
    }

    #[test]
    fn test_null_context() {
        let driver = DummyDriver::new_default();
        assert_eq!(
            driver.get_status(&Context::NULL),
            Err(codes::DEVICE_NOT_INITIALIZED)
        );
        assert_eq!(driver.pixels_in_frame(&Context::NULL), None);
    }

    #[test]
    fn test_call_counting_and_faults() {
        let driver = DummyDriver::new_default();
        let mut ctx = Context::NULL;
        driver.connect_by_serial(None, &mut ctx).unwrap();

        driver.fail_next("trigger", codes::WRITING_PROCESS_FAILED);
        assert_eq!(driver.trigger(&ctx), Err(codes::WRITING_PROCESS_FAILED));
        assert_eq!(driver.trigger(&ctx), Ok(()));
        assert_eq!(driver.calls("trigger"), 2);

        driver.reset_calls();
        assert_eq!(driver.calls("trigger"), 0);
    }

    #[test]
    fn test_detach_hides_device() {
        let driver = DummyDriver::new(DummyConfig::with_devices(2));
        let mut ctx = Context::NULL;
        driver.connect_by_index(0, &mut ctx).unwrap();
        driver.detach(&ctx).unwrap();

        assert_eq!(driver.devices_count(), 1);
        assert_eq!(driver.trigger(&ctx), Err(codes::WRITING_PROCESS_FAILED));

        driver.reattach(0);
        assert_eq!(driver.devices_count(), 2);
        assert_eq!(driver.trigger(&ctx), Ok(()));
    }

    #[test]
    fn test_reset_restores_factory_parameters() {
        let driver = DummyDriver::new_default();
        let mut ctx = Context::NULL;
        driver.connect_by_serial(None, &mut ctx).unwrap();
        driver
            .set_frame_format(
                &FrameFormat {
                    start_element: 5,
                    end_element: 6,
                    reduction_mode: Default::default(),
                },
                &ctx,
            )
            .unwrap();
        assert_eq!(driver.pixels_in_frame(&ctx), Some(48));

        driver.reset(&ctx).unwrap();
        assert_eq!(driver.pixels_in_frame(&ctx), Some(3694));
        assert_eq!(
            driver.get_acquisition_parameters(&ctx),
            Ok(AcquisitionParameters::FACTORY)
        );
    }
}

//! Simulated bindings
//!
//! Every simulated binding behaves like a connected instrument, records the
//! vendor operations it receives and can be told to fail them with a raw
//! status code. Injected codes go through the real vendor status table, so a
//! simulated failure carries the same outcome and message as a native one.
//!
//! The binding itself is moved into a session; tests keep the
//! [`SimulatorControl`] and [`Simulated::state`] handles to observe it.

mod camera;
mod discovery;
mod motion;
mod power_meter;
mod solenoid;
mod spectrometer;
mod streaming;

pub use camera::CameraState;
pub use discovery::SimulatedDiscovery;
pub use motion::MotionState;
pub use power_meter::{PowerMeterState, Ranged};
pub use solenoid::SolenoidControllerState;
pub use spectrometer::SpectrometerState;
pub use streaming::StreamingState;

use std::collections::HashMap;
use std::sync::Arc;

use domain::{
    DeviceIdentity, RawStatus, Result, StatusTranslator, VendorBinding, VendorFamily,
};
use parking_lot::Mutex;

use crate::vendors::unbound;

pub type SimulatedMotion = Simulated<MotionState>;
pub type SimulatedSolenoid = Simulated<SolenoidControllerState>;
pub type SimulatedPowerMeter = Simulated<PowerMeterState>;
pub type SimulatedSpectrometer = Simulated<SpectrometerState>;
pub type SimulatedCamera = Simulated<CameraState>;
pub type SimulatedStreamingMeter = Simulated<StreamingState>;

/// Operation name recorded for `VendorBinding::connect`
pub const CONNECT: &str = "connect";
/// Operation name recorded for `VendorBinding::disconnect`
pub const DISCONNECT: &str = "disconnect";

#[derive(Debug, Clone, Copy)]
struct Fault {
    code: RawStatus,
    remaining: u32,
}

#[derive(Debug, Default)]
struct Recorder {
    calls: Vec<String>,
    faults: HashMap<String, Fault>,
    connected: Option<DeviceIdentity>,
}

/// Shared handle on a simulated binding's call log and fault queue
#[derive(Debug, Clone, Default)]
pub struct SimulatorControl {
    inner: Arc<Mutex<Recorder>>,
}

impl SimulatorControl {
    pub fn new() -> Self {
        Self::default()
    }

    /// Makes the next `times` calls of `operation` return `code`
    pub fn fail_next(&self, operation: &str, code: RawStatus, times: u32) {
        if times == 0 {
            self.inner.lock().faults.remove(operation);
            return;
        }
        self.inner.lock().faults.insert(
            operation.to_string(),
            Fault {
                code,
                remaining: times,
            },
        );
    }

    /// Makes every call of `operation` return `code` until cleared
    pub fn fail_always(&self, operation: &str, code: RawStatus) {
        self.fail_next(operation, code, u32::MAX);
    }

    pub fn clear_faults(&self) {
        self.inner.lock().faults.clear();
    }

    /// Operations received so far, in order
    pub fn calls(&self) -> Vec<String> {
        self.inner.lock().calls.clone()
    }

    pub fn call_count(&self, operation: &str) -> usize {
        self.inner
            .lock()
            .calls
            .iter()
            .filter(|call| call.as_str() == operation)
            .count()
    }

    pub fn clear_calls(&self) {
        self.inner.lock().calls.clear();
    }

    pub fn is_connected(&self) -> bool {
        self.inner.lock().connected.is_some()
    }

    pub fn connected_identity(&self) -> Option<DeviceIdentity> {
        self.inner.lock().connected.clone()
    }

    /// Records `operation` and returns the injected code, 0 when none is queued
    fn record(&self, operation: &str) -> RawStatus {
        let mut recorder = self.inner.lock();
        recorder.calls.push(operation.to_string());
        let Some(fault) = recorder.faults.get_mut(operation) else {
            return StatusTranslator::SUCCESS;
        };
        let code = fault.code;
        if fault.remaining != u32::MAX {
            fault.remaining -= 1;
        }
        if fault.remaining == 0 {
            recorder.faults.remove(operation);
        }
        code
    }
}

/// Instrument state behind a simulated binding
pub trait SimulatedDevice: Default + Send + 'static {
    const FAMILY: VendorFamily;

    fn status_table() -> &'static StatusTranslator;

    /// Called after a successful connect
    fn on_connect(&mut self, _identity: &DeviceIdentity) {}

    /// Called before the vendor handle is released
    fn on_disconnect(&mut self) {}
}

/// Simulated binding over the instrument state `S`
pub struct Simulated<S: SimulatedDevice> {
    control: SimulatorControl,
    state: Arc<Mutex<S>>,
}

impl<S: SimulatedDevice> Default for Simulated<S> {
    fn default() -> Self {
        Self::new()
    }
}

impl<S: SimulatedDevice> Simulated<S> {
    pub fn new() -> Self {
        Self::with_state(S::default())
    }

    pub fn with_state(state: S) -> Self {
        Self {
            control: SimulatorControl::new(),
            state: Arc::new(Mutex::new(state)),
        }
    }

    pub fn control(&self) -> SimulatorControl {
        self.control.clone()
    }

    pub fn state(&self) -> Arc<Mutex<S>> {
        self.state.clone()
    }

    /// Records a vendor call on a connected device and applies any injected fault
    fn call(&self, operation: &'static str) -> Result<()> {
        if !self.control.is_connected() {
            return Err(unbound(S::FAMILY, operation));
        }
        self.check(self.control.record(operation), operation)
    }

    /// `call` followed by `f` on the instrument state
    fn with<T>(&self, operation: &'static str, f: impl FnOnce(&mut S) -> Result<T>) -> Result<T> {
        self.call(operation)?;
        f(&mut self.state.lock())
    }
}

impl<S: SimulatedDevice> VendorBinding for Simulated<S> {
    fn family(&self) -> VendorFamily {
        S::FAMILY
    }

    fn status_table(&self) -> &'static StatusTranslator {
        S::status_table()
    }

    fn connect(&mut self, identity: &DeviceIdentity) -> Result<()> {
        self.check(self.control.record(CONNECT), CONNECT)?;
        self.state.lock().on_connect(identity);
        self.control.inner.lock().connected = Some(identity.clone());
        tracing::debug!(family = %S::FAMILY, identity = %identity, "Simulated device connected");
        Ok(())
    }

    fn disconnect(&mut self) -> Result<()> {
        if !self.control.is_connected() {
            return Ok(());
        }
        self.state.lock().on_disconnect();
        self.control.inner.lock().connected = None;
        self.check(self.control.record(DISCONNECT), DISCONNECT)
    }
}

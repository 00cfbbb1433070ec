use std::sync::Arc;
use std::thread;

use chrono::{DateTime, Utc};
use serde::Serialize;
use tracing::{debug, warn};

use domain::binding::{Attribute, PowerMeterBinding, PowerUnit};
use domain::{DeviceError, DeviceIdentity, Result};
use infrastructure::config::PowerMeterSettings;

use crate::device::{DeviceSession, Instrument, SessionRegistry};

/// One accepted power sample
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PowerReading {
    pub value: f64,
    pub unit: PowerUnit,
    pub taken_at: DateTime<Utc>,
    /// Measurement attempts it took, starting at 1
    pub attempts: u32,
}

/// TLPM optical power meter.
///
/// Wavelength, attenuation, power range and averaging time are checked
/// against the minimum and maximum the meter reports before they are set.
pub struct PowerMeter {
    session: DeviceSession<dyn PowerMeterBinding>,
    settings: PowerMeterSettings,
}

impl PowerMeter {
    pub fn new(
        identity: DeviceIdentity,
        binding: Box<dyn PowerMeterBinding>,
        registry: Arc<SessionRegistry>,
        settings: PowerMeterSettings,
    ) -> Self {
        Self {
            session: DeviceSession::new(identity, binding, registry),
            settings,
        }
    }

    pub fn with_verbose(mut self, verbose: bool) -> Self {
        self.session.set_verbose(verbose);
        self
    }

    pub fn session(&self) -> &DeviceSession<dyn PowerMeterBinding> {
        &self.session
    }

    pub fn set_identity(&mut self, identity: DeviceIdentity) -> Result<()> {
        self.session.set_identity(identity)
    }

    pub fn timeout(&mut self) -> Result<u32> {
        self.session.call("timeout", |b| b.timeout())
    }

    pub fn set_timeout(&mut self, millis: u32) -> Result<()> {
        self.session.call("set_timeout", |b| b.set_timeout(millis))
    }

    pub fn average_time(&mut self, attribute: Attribute) -> Result<f64> {
        self.session.call("average_time", |b| b.average_time(attribute))
    }

    pub fn set_average_time(&mut self, seconds: f64) -> Result<()> {
        self.session.call("set_average_time", |b| {
            within_limits(b, "average time", seconds, |b, a| b.average_time(a))?;
            b.set_average_time(seconds)
        })
    }

    pub fn average_count(&mut self) -> Result<i16> {
        self.session.call("average_count", |b| b.average_count())
    }

    pub fn set_average_count(&mut self, count: i16) -> Result<()> {
        self.session.call("set_average_count", |b| {
            if count < 1 {
                return Err(DeviceError::InvalidArgument(format!(
                    "average count must be at least 1, got {count}"
                )));
            }
            b.set_average_count(count)
        })
    }

    pub fn attenuation(&mut self, attribute: Attribute) -> Result<f64> {
        self.session.call("attenuation", |b| b.attenuation(attribute))
    }

    pub fn set_attenuation(&mut self, db: f64) -> Result<()> {
        self.session.call("set_attenuation", |b| {
            within_limits(b, "attenuation", db, |b, a| b.attenuation(a))?;
            b.set_attenuation(db)
        })
    }

    pub fn wavelength(&mut self, attribute: Attribute) -> Result<f64> {
        self.session.call("wavelength", |b| b.wavelength(attribute))
    }

    pub fn set_wavelength(&mut self, nm: f64) -> Result<()> {
        self.session.call("set_wavelength", |b| {
            within_limits(b, "wavelength", nm, |b, a| b.wavelength(a))?;
            b.set_wavelength(nm)
        })
    }

    pub fn auto_range(&mut self) -> Result<bool> {
        self.session.call("auto_range", |b| b.auto_range())
    }

    pub fn set_auto_range(&mut self, enabled: bool) -> Result<()> {
        self.session.call("set_auto_range", |b| b.set_auto_range(enabled))
    }

    pub fn power_range(&mut self, attribute: Attribute) -> Result<f64> {
        self.session.call("power_range", |b| b.power_range(attribute))
    }

    pub fn set_power_range(&mut self, watts: f64) -> Result<()> {
        self.session.call("set_power_range", |b| {
            within_limits(b, "power range", watts, |b, a| b.power_range(a))?;
            b.set_power_range(watts)
        })
    }

    pub fn power_unit(&mut self) -> Result<PowerUnit> {
        self.session.call("power_unit", |b| b.power_unit())
    }

    pub fn set_power_unit(&mut self, unit: PowerUnit) -> Result<()> {
        self.session.call("set_power_unit", |b| b.set_power_unit(unit))
    }

    pub fn start_dark_adjust(&mut self) -> Result<()> {
        self.session.call("start_dark_adjust", |b| b.start_dark_adjust())
    }

    pub fn cancel_dark_adjust(&mut self) -> Result<()> {
        self.session.call("cancel_dark_adjust", |b| b.cancel_dark_adjust())
    }

    pub fn dark_adjust_running(&mut self) -> Result<bool> {
        self.session
            .call("dark_adjust_running", |b| b.dark_adjust_running())
    }

    pub fn dark_offset(&mut self) -> Result<f64> {
        self.session.call("dark_offset", |b| b.dark_offset())
    }

    /// Reads the power until the meter returns a finite sample.
    ///
    /// Retryable vendor failures and non-finite samples are retried up to
    /// `measure_attempts` times with `retry_delay` in between; any other
    /// failure is returned immediately. Running out of attempts is a
    /// `Timeout`.
    pub fn measure(&mut self) -> Result<PowerReading> {
        let attempts = self.settings.measure_attempts.max(1);
        let delay = self.settings.retry_delay();
        let identity = self.session.identity().clone();

        self.session.call("measure", |b| {
            let unit = b.power_unit()?;
            let mut last_problem = String::new();
            for attempt in 1..=attempts {
                match b.measure_power() {
                    Ok(value) if value.is_finite() => {
                        debug!(identity = %identity, value, attempt, "Power measured");
                        return Ok(PowerReading {
                            value,
                            unit,
                            taken_at: Utc::now(),
                            attempts: attempt,
                        });
                    }
                    Ok(value) => last_problem = format!("meter returned {value}"),
                    Err(e) if e.is_retryable() => last_problem = e.to_string(),
                    Err(e) => return Err(e),
                }
                warn!(identity = %identity, attempt, problem = %last_problem, "Power measurement rejected");
                if attempt < attempts {
                    thread::sleep(delay);
                }
            }
            Err(DeviceError::Timeout(format!(
                "no valid power sample from {identity} after {attempts} attempts: {last_problem}"
            )))
        })
    }
}

/// Checks `value` against the Min and Max attributes reported by the meter
fn within_limits(
    binding: &mut dyn PowerMeterBinding,
    quantity: &'static str,
    value: f64,
    read: impl Fn(&mut dyn PowerMeterBinding, Attribute) -> Result<f64>,
) -> Result<()> {
    let min = read(&mut *binding, Attribute::Min)?;
    let max = read(&mut *binding, Attribute::Max)?;
    DeviceError::check_range(quantity, value, min, max)
}

impl Instrument for PowerMeter {
    /// Connects and applies the configured communication timeout, if any
    fn open(&mut self) -> Result<()> {
        let timeout = self.settings.timeout_ms;
        self.session.open_with(|b| match timeout {
            Some(millis) => b.set_timeout(millis),
            None => Ok(()),
        })
    }

    fn close(&mut self) -> Result<()> {
        self.session.close()
    }

    fn is_open(&self) -> bool {
        self.session.is_open()
    }

    fn identity(&self) -> &DeviceIdentity {
        self.session.identity()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use domain::Outcome;
    use infrastructure::simulated::{PowerMeterState, Ranged, SimulatedPowerMeter, SimulatorControl};
    use infrastructure::vendors::visa::{VI_ERROR_CONN_LOST, VI_ERROR_TMO};

    fn settings() -> PowerMeterSettings {
        PowerMeterSettings {
            measure_attempts: 3,
            retry_delay_ms: 0,
            timeout_ms: None,
        }
    }

    fn meter_with(
        state: PowerMeterState,
    ) -> (PowerMeter, SimulatorControl, Arc<parking_lot::Mutex<PowerMeterState>>) {
        let binding = SimulatedPowerMeter::with_state(state);
        let control = binding.control();
        let observed = binding.state();
        let mut meter = PowerMeter::new(
            DeviceIdentity::new("P0001234").unwrap(),
            Box::new(binding),
            Arc::new(SessionRegistry::new()),
            settings(),
        );
        meter.open().unwrap();
        (meter, control, observed)
    }

    #[test]
    fn test_retryable_failures_are_retried() {
        let (mut meter, control, _) = meter_with(PowerMeterState::default());
        control.fail_next("measure_power", VI_ERROR_TMO, 2);

        let reading = meter.measure().unwrap();
        assert_eq!(reading.attempts, 3);
        assert_eq!(reading.unit, PowerUnit::Watt);
        assert_eq!(control.call_count("measure_power"), 3);
    }

    #[test]
    fn test_fatal_failure_is_not_retried() {
        let (mut meter, control, _) = meter_with(PowerMeterState::default());
        control.fail_next("measure_power", VI_ERROR_CONN_LOST, 1);

        let err = meter.measure().unwrap_err();
        assert_eq!(err.outcome(), Some(Outcome::FatalFailure));
        assert_eq!(control.call_count("measure_power"), 1);
    }

    #[test]
    fn test_non_finite_samples_exhaust_attempts() {
        let mut state = PowerMeterState::default();
        state.readings.extend([f64::NAN, f64::INFINITY, f64::NAN]);
        let (mut meter, _, _) = meter_with(state);

        let err = meter.measure().unwrap_err();
        assert!(matches!(err, DeviceError::Timeout(_)));
    }

    #[test]
    fn test_timeout_applied_on_open() {
        let binding = SimulatedPowerMeter::new();
        let observed = binding.state();
        let mut meter = PowerMeter::new(
            DeviceIdentity::new("P0001234").unwrap(),
            Box::new(binding),
            Arc::new(SessionRegistry::new()),
            PowerMeterSettings {
                timeout_ms: Some(2500),
                ..settings()
            },
        );
        meter.open().unwrap();
        assert_eq!(observed.lock().timeout_ms, 2500);
        assert_eq!(meter.timeout().unwrap(), 2500);
    }

    #[test]
    fn test_attenuation_checked_against_device_range() {
        let state = PowerMeterState {
            attenuation: Ranged::new(0.0, -10.0, 10.0),
            ..Default::default()
        };
        let (mut meter, control, observed) = meter_with(state);

        assert!(matches!(
            meter.set_attenuation(-20.0),
            Err(DeviceError::Validation { quantity: "attenuation", .. })
        ));
        assert_eq!(control.call_count("set_attenuation"), 0);

        meter.set_attenuation(3.0).unwrap();
        assert_eq!(observed.lock().attenuation.set, 3.0);
    }

    #[test]
    fn test_average_count_must_be_positive() {
        let (mut meter, control, _) = meter_with(PowerMeterState::default());
        assert!(matches!(
            meter.set_average_count(0),
            Err(DeviceError::InvalidArgument(_))
        ));
        assert_eq!(control.call_count("set_average_count"), 0);
    }
}

use std::collections::VecDeque;

use domain::binding::{Attribute, PowerMeterBinding, PowerUnit};
use domain::{DeviceError, Result, StatusTranslator, VendorFamily};

use super::{Simulated, SimulatedDevice};
use crate::vendors::visa::TLPM_STATUS_TABLE;

/// Attribute with device-reported limits
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Ranged {
    pub set: f64,
    pub min: f64,
    pub max: f64,
    pub default: f64,
}

impl Ranged {
    pub fn new(default: f64, min: f64, max: f64) -> Self {
        Self {
            set: default,
            min,
            max,
            default,
        }
    }

    pub fn get(&self, attribute: Attribute) -> f64 {
        match attribute {
            Attribute::Set => self.set,
            Attribute::Min => self.min,
            Attribute::Max => self.max,
            Attribute::Default => self.default,
        }
    }

    /// The real driver rejects out-of-range values with "invalid parameter"
    fn assign(&mut self, value: f64, operation: &str) -> Result<()> {
        if value.is_nan() || value < self.min || value > self.max {
            return Err(DeviceError::InvalidArgument(format!(
                "{operation}: {value} outside [{}, {}]",
                self.min, self.max
            )));
        }
        self.set = value;
        Ok(())
    }
}

/// PM100USB console with an S121C photodiode sensor
#[derive(Debug, Clone)]
pub struct PowerMeterState {
    pub timeout_ms: u32,
    pub average_time: Ranged,
    pub average_count: i16,
    pub attenuation: Ranged,
    pub wavelength: Ranged,
    pub power_range: Ranged,
    pub auto_range: bool,
    pub unit: PowerUnit,
    pub dark_adjust_running: bool,
    pub dark_offset: f64,
    /// Power returned when no queued reading is left, in watts
    pub power: f64,
    /// Readings returned first, one per measurement
    pub readings: VecDeque<f64>,
}

impl Default for PowerMeterState {
    fn default() -> Self {
        Self {
            timeout_ms: 1000,
            average_time: Ranged::new(0.001, 0.0003, 1.0),
            average_count: 1,
            attenuation: Ranged::new(0.0, -60.0, 60.0),
            wavelength: Ranged::new(635.0, 400.0, 1100.0),
            power_range: Ranged::new(0.05, 5.0e-9, 0.05),
            auto_range: true,
            unit: PowerUnit::Watt,
            dark_adjust_running: false,
            dark_offset: 0.0,
            power: 1.25e-3,
            readings: VecDeque::new(),
        }
    }
}

impl SimulatedDevice for PowerMeterState {
    const FAMILY: VendorFamily = VendorFamily::Tlpm;

    fn status_table() -> &'static StatusTranslator {
        &TLPM_STATUS_TABLE
    }
}

impl PowerMeterBinding for Simulated<PowerMeterState> {
    fn timeout(&mut self) -> Result<u32> {
        self.with("timeout", |s| Ok(s.timeout_ms))
    }

    fn set_timeout(&mut self, millis: u32) -> Result<()> {
        self.with("set_timeout", |s| {
            s.timeout_ms = millis;
            Ok(())
        })
    }

    fn average_time(&mut self, attribute: Attribute) -> Result<f64> {
        self.with("average_time", |s| Ok(s.average_time.get(attribute)))
    }

    fn set_average_time(&mut self, seconds: f64) -> Result<()> {
        self.with("set_average_time", |s| {
            s.average_time.assign(seconds, "set_average_time")
        })
    }

    fn average_count(&mut self) -> Result<i16> {
        self.with("average_count", |s| Ok(s.average_count))
    }

    fn set_average_count(&mut self, count: i16) -> Result<()> {
        self.with("set_average_count", |s| {
            s.average_count = count;
            Ok(())
        })
    }

    fn attenuation(&mut self, attribute: Attribute) -> Result<f64> {
        self.with("attenuation", |s| Ok(s.attenuation.get(attribute)))
    }

    fn set_attenuation(&mut self, db: f64) -> Result<()> {
        self.with("set_attenuation", |s| s.attenuation.assign(db, "set_attenuation"))
    }

    fn wavelength(&mut self, attribute: Attribute) -> Result<f64> {
        self.with("wavelength", |s| Ok(s.wavelength.get(attribute)))
    }

    fn set_wavelength(&mut self, nm: f64) -> Result<()> {
        self.with("set_wavelength", |s| s.wavelength.assign(nm, "set_wavelength"))
    }

    fn auto_range(&mut self) -> Result<bool> {
        self.with("auto_range", |s| Ok(s.auto_range))
    }

    fn set_auto_range(&mut self, enabled: bool) -> Result<()> {
        self.with("set_auto_range", |s| {
            s.auto_range = enabled;
            Ok(())
        })
    }

    fn power_range(&mut self, attribute: Attribute) -> Result<f64> {
        self.with("power_range", |s| Ok(s.power_range.get(attribute)))
    }

    fn set_power_range(&mut self, watts: f64) -> Result<()> {
        self.with("set_power_range", |s| {
            s.auto_range = false;
            s.power_range.assign(watts, "set_power_range")
        })
    }

    fn power_unit(&mut self) -> Result<PowerUnit> {
        self.with("power_unit", |s| Ok(s.unit))
    }

    fn set_power_unit(&mut self, unit: PowerUnit) -> Result<()> {
        self.with("set_power_unit", |s| {
            s.unit = unit;
            Ok(())
        })
    }

    fn start_dark_adjust(&mut self) -> Result<()> {
        self.with("start_dark_adjust", |s| {
            s.dark_adjust_running = true;
            Ok(())
        })
    }

    fn cancel_dark_adjust(&mut self) -> Result<()> {
        self.with("cancel_dark_adjust", |s| {
            s.dark_adjust_running = false;
            Ok(())
        })
    }

    fn dark_adjust_running(&mut self) -> Result<bool> {
        self.with("dark_adjust_running", |s| Ok(s.dark_adjust_running))
    }

    fn dark_offset(&mut self) -> Result<f64> {
        self.with("dark_offset", |s| Ok(s.dark_offset))
    }

    fn measure_power(&mut self) -> Result<f64> {
        self.with("measure_power", |s| {
            let watts = s.readings.pop_front().unwrap_or(s.power);
            Ok(match s.unit {
                PowerUnit::Watt => watts,
                PowerUnit::Dbm => 10.0 * (watts * 1000.0).log10(),
            })
        })
    }
}

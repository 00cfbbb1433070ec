use serde::{Deserialize, Serialize};

use super::VendorBinding;
use crate::error::{DeviceError, Result};

/// Which value of a ranged attribute to read
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Attribute {
    /// Currently applied value
    Set,
    Min,
    Max,
    Default,
}

impl Attribute {
    pub fn as_raw(&self) -> i16 {
        match self {
            Self::Set => 0,
            Self::Min => 1,
            Self::Max => 2,
            Self::Default => 3,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum PowerUnit {
    Watt,
    Dbm,
}

impl PowerUnit {
    pub fn as_raw(&self) -> i16 {
        match self {
            Self::Watt => 0,
            Self::Dbm => 1,
        }
    }

    pub fn from_raw(raw: i16) -> Result<Self> {
        match raw {
            0 => Ok(Self::Watt),
            1 => Ok(Self::Dbm),
            other => Err(DeviceError::InvalidArgument(format!("unknown power unit {other}"))),
        }
    }
}

/// Optical power meter (Thorlabs TLPM).
///
/// Ranged getters take an [`Attribute`] so that callers can query the
/// device's own limits before setting a value.
pub trait PowerMeterBinding: VendorBinding {
    /// Communication timeout in milliseconds
    fn timeout(&mut self) -> Result<u32>;
    fn set_timeout(&mut self, millis: u32) -> Result<()>;

    /// Averaging time in seconds
    fn average_time(&mut self, attribute: Attribute) -> Result<f64>;
    fn set_average_time(&mut self, seconds: f64) -> Result<()>;

    fn average_count(&mut self) -> Result<i16>;
    fn set_average_count(&mut self, count: i16) -> Result<()>;

    /// Attenuation in dB
    fn attenuation(&mut self, attribute: Attribute) -> Result<f64>;
    fn set_attenuation(&mut self, db: f64) -> Result<()>;

    /// Wavelength correction in nanometres
    fn wavelength(&mut self, attribute: Attribute) -> Result<f64>;
    fn set_wavelength(&mut self, nm: f64) -> Result<()>;

    fn auto_range(&mut self) -> Result<bool>;
    fn set_auto_range(&mut self, enabled: bool) -> Result<()>;

    /// Power range upper limit in watts
    fn power_range(&mut self, attribute: Attribute) -> Result<f64>;
    fn set_power_range(&mut self, watts: f64) -> Result<()>;

    fn power_unit(&mut self) -> Result<PowerUnit>;
    fn set_power_unit(&mut self, unit: PowerUnit) -> Result<()>;

    fn start_dark_adjust(&mut self) -> Result<()>;
    fn cancel_dark_adjust(&mut self) -> Result<()>;
    /// True while a dark adjustment is running
    fn dark_adjust_running(&mut self) -> Result<bool>;
    fn dark_offset(&mut self) -> Result<f64>;

    /// One power reading in the current unit
    fn measure_power(&mut self) -> Result<f64>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_attribute_raw_values() {
        assert_eq!(Attribute::Set.as_raw(), 0);
        assert_eq!(Attribute::Max.as_raw(), 2);
    }

    #[test]
    fn test_power_unit_raw_values() {
        assert_eq!(PowerUnit::from_raw(1).unwrap(), PowerUnit::Dbm);
        assert!(PowerUnit::from_raw(7).is_err());
    }
}

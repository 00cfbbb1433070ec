use serde::{Deserialize, Serialize};

use super::VendorBinding;
use crate::error::{DeviceError, Result};
use crate::parameter::CycleParameters;

/// How the solenoid controller drives its output
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum OperatingMode {
    Manual,
    Single,
    Auto,
    Triggered,
}

impl OperatingMode {
    pub fn as_raw(&self) -> i32 {
        match self {
            Self::Manual => 1,
            Self::Single => 2,
            Self::Auto => 3,
            Self::Triggered => 4,
        }
    }

    pub fn from_raw(raw: i32) -> Result<Self> {
        match raw {
            1 => Ok(Self::Manual),
            2 => Ok(Self::Single),
            3 => Ok(Self::Auto),
            4 => Ok(Self::Triggered),
            other => Err(DeviceError::InvalidArgument(format!(
                "unknown solenoid operating mode {other}"
            ))),
        }
    }
}

impl std::str::FromStr for OperatingMode {
    type Err = DeviceError;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "manual" => Ok(Self::Manual),
            "single" => Ok(Self::Single),
            "auto" => Ok(Self::Auto),
            "triggered" => Ok(Self::Triggered),
            other => Err(DeviceError::InvalidArgument(format!(
                "operating mode must be Manual, Single, Auto or Triggered, got '{other}'"
            ))),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum OperatingState {
    Active,
    Inactive,
}

impl OperatingState {
    pub fn as_raw(&self) -> i32 {
        match self {
            Self::Active => 1,
            Self::Inactive => 2,
        }
    }

    pub fn from_raw(raw: i32) -> Result<Self> {
        match raw {
            1 => Ok(Self::Active),
            2 => Ok(Self::Inactive),
            other => Err(DeviceError::InvalidArgument(format!(
                "unknown solenoid operating state {other}"
            ))),
        }
    }
}

impl std::str::FromStr for OperatingState {
    type Err = DeviceError;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "active" => Ok(Self::Active),
            "inactive" => Ok(Self::Inactive),
            other => Err(DeviceError::InvalidArgument(format!(
                "operating state must be Active or Inactive, got '{other}'"
            ))),
        }
    }
}

/// Physical position of the solenoid
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum SolenoidState {
    Open,
    Closed,
}

impl SolenoidState {
    pub fn from_raw(raw: i32) -> Result<Self> {
        match raw {
            1 => Ok(Self::Open),
            2 => Ok(Self::Closed),
            other => Err(DeviceError::InvalidArgument(format!(
                "unknown solenoid state {other}"
            ))),
        }
    }
}

/// Shutter/solenoid controller (Kinesis KCube solenoid)
pub trait SolenoidBinding: VendorBinding {
    fn identify(&mut self) -> Result<()>;
    fn clear_message_queue(&mut self) -> Result<()>;
    fn load_settings(&mut self) -> Result<()>;
    fn request_settings(&mut self) -> Result<()>;

    fn operating_mode(&mut self) -> Result<OperatingMode>;
    fn set_operating_mode(&mut self, mode: OperatingMode) -> Result<()>;

    fn operating_state(&mut self) -> Result<OperatingState>;
    fn set_operating_state(&mut self, state: OperatingState) -> Result<()>;

    fn solenoid_state(&mut self) -> Result<SolenoidState>;

    fn cycle_parameters(&mut self) -> Result<CycleParameters>;
    fn set_cycle_parameters(&mut self, params: &CycleParameters) -> Result<()>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_mode_names_are_case_insensitive() {
        assert_eq!("manual".parse::<OperatingMode>().unwrap(), OperatingMode::Manual);
        assert_eq!("TRIGGERED".parse::<OperatingMode>().unwrap(), OperatingMode::Triggered);
        assert!("pulse".parse::<OperatingMode>().is_err());
    }

    #[test]
    fn test_mode_raw_values() {
        for mode in [
            OperatingMode::Manual,
            OperatingMode::Single,
            OperatingMode::Auto,
            OperatingMode::Triggered,
        ] {
            assert_eq!(OperatingMode::from_raw(mode.as_raw()).unwrap(), mode);
        }
        assert!(OperatingMode::from_raw(0).is_err());
    }

    #[test]
    fn test_state_values() {
        assert_eq!("Inactive".parse::<OperatingState>().unwrap(), OperatingState::Inactive);
        assert_eq!(OperatingState::from_raw(1).unwrap(), OperatingState::Active);
        assert_eq!(SolenoidState::from_raw(2).unwrap(), SolenoidState::Closed);
        assert!(SolenoidState::from_raw(3).is_err());
    }
}

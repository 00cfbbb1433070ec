use serde::{Deserialize, Serialize};

use super::VendorBinding;
use crate::error::{DeviceError, Result};
use crate::parameter::{
    DeviceInfo, HardwareInfo, HomingParameters, MotorParameters, PidParameters, TravelLimits,
    VelocityLimits, VelocityParameters,
};

/// Stage travel geometry
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum TravelMode {
    Undefined,
    Linear,
    Rotational,
}

impl TravelMode {
    pub fn as_raw(&self) -> i32 {
        match self {
            Self::Undefined => 0,
            Self::Linear => 1,
            Self::Rotational => 2,
        }
    }

    pub fn from_raw(raw: i32) -> Result<Self> {
        match raw {
            0 => Ok(Self::Undefined),
            1 => Ok(Self::Linear),
            2 => Ok(Self::Rotational),
            other => Err(DeviceError::InvalidArgument(format!(
                "travel mode {other} is not one of 0 (undefined), 1 (linear), 2 (rotational)"
            ))),
        }
    }
}

/// Quantity being converted between device units and real units
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum UnitKind {
    Distance,
    Velocity,
    Acceleration,
}

impl UnitKind {
    pub fn as_raw(&self) -> i32 {
        match self {
            Self::Distance => 0,
            Self::Velocity => 1,
            Self::Acceleration => 2,
        }
    }
}

/// Motorized stage controller (Kinesis KCube DC servo)
pub trait MotionBinding: VendorBinding {
    /// Flashes the front panel LED
    fn identify(&mut self) -> Result<()>;
    fn clear_message_queue(&mut self) -> Result<()>;
    fn load_settings(&mut self) -> Result<()>;
    fn persist_settings(&mut self) -> Result<()>;
    fn request_settings(&mut self) -> Result<()>;
    fn reset_stage_to_defaults(&mut self) -> Result<()>;

    fn can_home(&mut self) -> Result<bool>;
    fn home(&mut self) -> Result<()>;
    /// Starts a move to an absolute position in device units
    fn move_to_position(&mut self, position: i32) -> Result<()>;
    fn stop_profiled(&mut self) -> Result<()>;
    fn stop_immediate(&mut self) -> Result<()>;

    /// Asks the controller to refresh its cached position
    fn request_position(&mut self) -> Result<()>;
    /// Cached position in device units
    fn position(&mut self) -> Result<i32>;

    fn velocity_parameters(&mut self) -> Result<VelocityParameters>;
    fn set_velocity_parameters(&mut self, params: &VelocityParameters) -> Result<()>;

    fn real_from_device(&mut self, device_units: i32, kind: UnitKind) -> Result<f64>;
    fn device_from_real(&mut self, real: f64, kind: UnitKind) -> Result<i32>;

    fn hardware_info(&mut self) -> Result<HardwareInfo>;
    fn device_info(&mut self) -> Result<DeviceInfo>;

    fn motor_parameters(&mut self) -> Result<MotorParameters>;
    fn set_motor_parameters(&mut self, params: &MotorParameters) -> Result<()>;

    fn travel_mode(&mut self) -> Result<TravelMode>;
    fn set_travel_mode(&mut self, mode: TravelMode) -> Result<()>;

    /// Travel range in real units
    fn travel_limits(&mut self) -> Result<TravelLimits>;
    fn set_travel_limits(&mut self, limits: &TravelLimits) -> Result<()>;

    fn velocity_limits(&mut self) -> Result<VelocityLimits>;
    fn set_velocity_limits(&mut self, limits: &VelocityLimits) -> Result<()>;

    fn pid_parameters(&mut self) -> Result<PidParameters>;
    fn set_pid_parameters(&mut self, params: &PidParameters) -> Result<()>;

    fn homing_parameters(&mut self) -> Result<HomingParameters>;
    fn set_homing_parameters(&mut self, params: &HomingParameters) -> Result<()>;
}

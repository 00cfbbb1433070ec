use domain::binding::{MotionBinding, TravelMode, UnitKind};
use domain::parameter::{
    DeviceInfo, HardwareInfo, HomingParameters, MotorParameters, PidParameters, TravelLimits,
    VelocityLimits, VelocityParameters,
};
use domain::{DeviceError, DeviceIdentity, Result, StatusTranslator, VendorFamily};

use super::{Simulated, SimulatedDevice};
use crate::vendors::kinesis::{KCUBE_DC_SERVO_TYPE_ID, STATUS_TABLE};

/// KCube DC servo driving a Z825B actuator
#[derive(Debug, Clone)]
pub struct MotionState {
    /// Position in device units
    pub position: i32,
    pub homed: bool,
    pub can_home: bool,
    pub settings_persisted: bool,
    /// Device units per mm, mm/s and mm/s²
    pub counts_per_unit: [f64; 3],
    pub velocity: VelocityParameters,
    pub motor: MotorParameters,
    pub travel_mode: TravelMode,
    pub travel_limits: TravelLimits,
    pub velocity_limits: VelocityLimits,
    pub pid: PidParameters,
    pub homing: HomingParameters,
    pub hardware: HardwareInfo,
    pub info: DeviceInfo,
}

impl Default for MotionState {
    fn default() -> Self {
        Self {
            position: 0,
            homed: false,
            can_home: true,
            settings_persisted: false,
            counts_per_unit: [34_304.0, 767_367.49, 261.93],
            velocity: VelocityParameters {
                acceleration: 4_506,
                max_velocity: 772_981,
            },
            motor: MotorParameters {
                steps_per_rev: 512.0,
                gear_box_ratio: 67.0,
                pitch: 1.0,
            },
            travel_mode: TravelMode::Linear,
            travel_limits: TravelLimits {
                min_position: 0.0,
                max_position: 25.0,
            },
            velocity_limits: VelocityLimits {
                max_velocity: 2.6,
                max_acceleration: 4.0,
            },
            pid: PidParameters {
                proportional_gain: 435,
                integral_gain: 195,
                differential_gain: 993,
                integral_limit: 195,
                parameter_filter: 15,
            },
            homing: HomingParameters {
                direction: 2,
                limit_switch: 1,
                velocity: 137_439,
                offset_distance: 41_237,
            },
            hardware: HardwareInfo {
                model_number: "KDC101".to_string(),
                device_type: 16,
                firmware_version: 0x0003_0012,
                num_channels: 1,
                ..HardwareInfo::default()
            },
            info: DeviceInfo {
                type_id: KCUBE_DC_SERVO_TYPE_ID,
                description: "KCube DC Servo".to_string(),
                is_known_type: true,
                max_channels: 1,
                ..DeviceInfo::default()
            },
        }
    }
}

impl MotionState {
    fn scale(&self, kind: UnitKind) -> f64 {
        self.counts_per_unit[kind.as_raw() as usize]
    }
}

impl SimulatedDevice for MotionState {
    const FAMILY: VendorFamily = VendorFamily::KCubeDcServo;

    fn status_table() -> &'static StatusTranslator {
        &STATUS_TABLE
    }

    fn on_connect(&mut self, identity: &DeviceIdentity) {
        self.info.serial_no = identity.to_string();
        self.hardware.serial_number = identity.as_number().unwrap_or_default();
    }
}

impl MotionBinding for Simulated<MotionState> {
    fn identify(&mut self) -> Result<()> {
        self.call("identify")
    }

    fn clear_message_queue(&mut self) -> Result<()> {
        self.call("clear_message_queue")
    }

    fn load_settings(&mut self) -> Result<()> {
        self.call("load_settings")
    }

    fn persist_settings(&mut self) -> Result<()> {
        self.with("persist_settings", |s| {
            s.settings_persisted = true;
            Ok(())
        })
    }

    fn request_settings(&mut self) -> Result<()> {
        self.call("request_settings")
    }

    fn reset_stage_to_defaults(&mut self) -> Result<()> {
        self.with("reset_stage_to_defaults", |s| {
            let defaults = MotionState::default();
            s.velocity = defaults.velocity;
            s.motor = defaults.motor;
            s.travel_limits = defaults.travel_limits;
            s.velocity_limits = defaults.velocity_limits;
            s.pid = defaults.pid;
            s.homing = defaults.homing;
            Ok(())
        })
    }

    fn can_home(&mut self) -> Result<bool> {
        self.with("can_home", |s| Ok(s.can_home))
    }

    fn home(&mut self) -> Result<()> {
        self.with("home", |s| {
            s.position = 0;
            s.homed = true;
            Ok(())
        })
    }

    fn move_to_position(&mut self, position: i32) -> Result<()> {
        self.with("move_to_position", |s| {
            s.position = position;
            Ok(())
        })
    }

    fn stop_profiled(&mut self) -> Result<()> {
        self.call("stop_profiled")
    }

    fn stop_immediate(&mut self) -> Result<()> {
        self.call("stop_immediate")
    }

    fn request_position(&mut self) -> Result<()> {
        self.call("request_position")
    }

    fn position(&mut self) -> Result<i32> {
        self.with("position", |s| Ok(s.position))
    }

    fn velocity_parameters(&mut self) -> Result<VelocityParameters> {
        self.with("velocity_parameters", |s| Ok(s.velocity.clone()))
    }

    fn set_velocity_parameters(&mut self, params: &VelocityParameters) -> Result<()> {
        self.with("set_velocity_parameters", |s| {
            s.velocity = params.clone();
            Ok(())
        })
    }

    fn real_from_device(&mut self, device_units: i32, kind: UnitKind) -> Result<f64> {
        self.with("real_from_device", |s| {
            Ok(f64::from(device_units) / s.scale(kind))
        })
    }

    fn device_from_real(&mut self, real: f64, kind: UnitKind) -> Result<i32> {
        self.with("device_from_real", |s| {
            let units = (real * s.scale(kind)).round();
            if !units.is_finite() || units < f64::from(i32::MIN) || units > f64::from(i32::MAX) {
                return Err(DeviceError::InvalidArgument(format!(
                    "{real} cannot be expressed in device units"
                )));
            }
            Ok(units as i32)
        })
    }

    fn hardware_info(&mut self) -> Result<HardwareInfo> {
        self.with("hardware_info", |s| Ok(s.hardware.clone()))
    }

    fn device_info(&mut self) -> Result<DeviceInfo> {
        self.with("device_info", |s| Ok(s.info.clone()))
    }

    fn motor_parameters(&mut self) -> Result<MotorParameters> {
        self.with("motor_parameters", |s| Ok(s.motor.clone()))
    }

    fn set_motor_parameters(&mut self, params: &MotorParameters) -> Result<()> {
        self.with("set_motor_parameters", |s| {
            s.motor = params.clone();
            Ok(())
        })
    }

    fn travel_mode(&mut self) -> Result<TravelMode> {
        self.with("travel_mode", |s| Ok(s.travel_mode))
    }

    fn set_travel_mode(&mut self, mode: TravelMode) -> Result<()> {
        self.with("set_travel_mode", |s| {
            s.travel_mode = mode;
            Ok(())
        })
    }

    fn travel_limits(&mut self) -> Result<TravelLimits> {
        self.with("travel_limits", |s| Ok(s.travel_limits.clone()))
    }

    fn set_travel_limits(&mut self, limits: &TravelLimits) -> Result<()> {
        if limits.min_position > limits.max_position {
            return Err(DeviceError::InvalidArgument(format!(
                "travel limits inverted: {} > {}",
                limits.min_position, limits.max_position
            )));
        }
        self.with("set_travel_limits", |s| {
            s.travel_limits = limits.clone();
            Ok(())
        })
    }

    fn velocity_limits(&mut self) -> Result<VelocityLimits> {
        self.with("velocity_limits", |s| Ok(s.velocity_limits.clone()))
    }

    fn set_velocity_limits(&mut self, limits: &VelocityLimits) -> Result<()> {
        self.with("set_velocity_limits", |s| {
            s.velocity_limits = limits.clone();
            Ok(())
        })
    }

    fn pid_parameters(&mut self) -> Result<PidParameters> {
        self.with("pid_parameters", |s| Ok(s.pid.clone()))
    }

    fn set_pid_parameters(&mut self, params: &PidParameters) -> Result<()> {
        self.with("set_pid_parameters", |s| {
            s.pid = params.clone();
            Ok(())
        })
    }

    fn homing_parameters(&mut self) -> Result<HomingParameters> {
        self.with("homing_parameters", |s| Ok(s.homing.clone()))
    }

    fn set_homing_parameters(&mut self, params: &HomingParameters) -> Result<()> {
        self.with("set_homing_parameters", |s| {
            s.homing = params.clone();
            Ok(())
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use domain::VendorBinding;

    fn connected() -> Simulated<MotionState> {
        let mut sim = Simulated::<MotionState>::new();
        sim.connect(&DeviceIdentity::new("27000001").unwrap()).unwrap();
        sim
    }

    #[test]
    fn test_unit_conversion_round_trip() {
        let mut sim = connected();
        let units = sim.device_from_real(12.5, UnitKind::Distance).unwrap();
        assert_eq!(units, 428_800);
        let real = sim.real_from_device(units, UnitKind::Distance).unwrap();
        assert!((real - 12.5).abs() < 1e-9);
    }

    #[test]
    fn test_move_then_home() {
        let mut sim = connected();
        sim.move_to_position(1000).unwrap();
        assert_eq!(sim.position().unwrap(), 1000);
        sim.home().unwrap();
        assert_eq!(sim.position().unwrap(), 0);
        assert!(sim.state().lock().homed);
    }

    #[test]
    fn test_connect_records_serial() {
        let mut sim = connected();
        assert_eq!(sim.device_info().unwrap().serial_no, "27000001");
        assert_eq!(sim.hardware_info().unwrap().serial_number, 27_000_001);
    }

    #[test]
    fn test_inverted_travel_limits_rejected() {
        let mut sim = connected();
        let err = sim
            .set_travel_limits(&TravelLimits {
                min_position: 10.0,
                max_position: 1.0,
            })
            .unwrap_err();
        assert!(matches!(err, DeviceError::InvalidArgument(_)));
    }

    #[test]
    fn test_reset_restores_defaults() {
        let mut sim = connected();
        sim.set_pid_parameters(&PidParameters::default()).unwrap();
        sim.reset_stage_to_defaults().unwrap();
        assert_eq!(sim.pid_parameters().unwrap().proportional_gain, 435);
    }
}

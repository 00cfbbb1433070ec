use std::sync::Arc;
use std::thread;

use serde_json::{Map, Value};
use tracing::{debug, info, warn};

use domain::binding::{MotionBinding, TravelMode, UnitKind};
use domain::parameter::{
    DeviceInfo, HardwareInfo, HomingParameters, MotorParameters, PidParameters, TravelLimits,
    VelocityLimits, VelocityParameters,
};
use domain::{DeviceError, DeviceIdentity, ParameterBlock, Result};
use infrastructure::config::{MotionSettings, StageSettings, canonical_keys};

use crate::device::{DeviceSession, Instrument, SessionRegistry};

/// KCube DC servo motor controller.
///
/// Positions and velocities are in real units (millimetres or degrees,
/// depending on the stage). Moves are validated against the travel limits
/// the controller reports before anything is sent.
pub struct DcServoMotor {
    session: DeviceSession<dyn MotionBinding>,
    settings: MotionSettings,
}

impl DcServoMotor {
    pub fn new(
        identity: DeviceIdentity,
        binding: Box<dyn MotionBinding>,
        registry: Arc<SessionRegistry>,
        settings: MotionSettings,
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

    pub fn session(&self) -> &DeviceSession<dyn MotionBinding> {
        &self.session
    }

    pub fn set_identity(&mut self, identity: DeviceIdentity) -> Result<()> {
        self.session.set_identity(identity)
    }

    /// Flashes the front panel LED
    pub fn identify(&mut self) -> Result<()> {
        self.session.call("identify", |b| b.identify())
    }

    pub fn can_home(&mut self) -> Result<bool> {
        self.session.call("can_home", |b| b.can_home())
    }

    /// Starts homing; returns false without moving when the stage cannot home
    pub fn home(&mut self) -> Result<bool> {
        let identity = self.session.identity().clone();
        self.session.call("home", |b| {
            if !b.can_home()? {
                warn!(identity = %identity, "Device cannot home");
                return Ok(false);
            }
            b.home()?;
            info!(identity = %identity, "Homing started");
            Ok(true)
        })
    }

    /// Starts a move to `position` in real units
    pub fn move_to(&mut self, position: f64) -> Result<()> {
        let identity = self.session.identity().clone();
        self.session.call("move_to", |b| {
            let limits = b.travel_limits()?;
            DeviceError::check_range(
                "position",
                position,
                limits.min_position,
                limits.max_position,
            )?;
            let units = b.device_from_real(position, UnitKind::Distance)?;
            b.move_to_position(units)?;
            debug!(identity = %identity, position, units, "Move started");
            Ok(())
        })
    }

    pub fn stop_profiled(&mut self) -> Result<()> {
        self.session.call("stop_profiled", |b| b.stop_profiled())
    }

    pub fn stop_immediate(&mut self) -> Result<()> {
        self.session.call("stop_immediate", |b| b.stop_immediate())
    }

    /// Current position in real units.
    ///
    /// The controller is asked to refresh its position first and read after
    /// the configured settle delay.
    pub fn position(&mut self) -> Result<f64> {
        let settle = self.settings.position_settle();
        self.session.call("position", |b| {
            b.request_position()?;
            thread::sleep(settle);
            let units = b.position()?;
            b.real_from_device(units, UnitKind::Distance)
        })
    }

    pub fn velocity_parameters(&mut self) -> Result<VelocityParameters> {
        self.session.call("velocity_parameters", |b| b.velocity_parameters())
    }

    pub fn set_velocity_parameters(&mut self, params: &VelocityParameters) -> Result<()> {
        self.session
            .call("set_velocity_parameters", |b| b.set_velocity_parameters(params))
    }

    /// Sets the move profile in real units, bounded by the velocity limits
    pub fn set_velocity(&mut self, max_velocity: f64, acceleration: f64) -> Result<()> {
        self.session.call("set_velocity", |b| {
            let limits = b.velocity_limits()?;
            DeviceError::check_range("velocity", max_velocity, 0.0, limits.max_velocity)?;
            DeviceError::check_range(
                "acceleration",
                acceleration,
                0.0,
                limits.max_acceleration,
            )?;
            let params = VelocityParameters {
                max_velocity: b.device_from_real(max_velocity, UnitKind::Velocity)?,
                acceleration: b.device_from_real(acceleration, UnitKind::Acceleration)?,
            };
            b.set_velocity_parameters(&params)
        })
    }

    pub fn real_from_device(&mut self, device_units: i32, kind: UnitKind) -> Result<f64> {
        self.session
            .call("real_from_device", |b| b.real_from_device(device_units, kind))
    }

    pub fn device_from_real(&mut self, real: f64, kind: UnitKind) -> Result<i32> {
        self.session
            .call("device_from_real", |b| b.device_from_real(real, kind))
    }

    pub fn hardware_info(&mut self) -> Result<HardwareInfo> {
        self.session.call("hardware_info", |b| b.hardware_info())
    }

    pub fn device_info(&mut self) -> Result<DeviceInfo> {
        self.session.call("device_info", |b| b.device_info())
    }

    pub fn motor_parameters(&mut self) -> Result<MotorParameters> {
        self.session.call("motor_parameters", |b| b.motor_parameters())
    }

    pub fn set_motor_parameters(&mut self, params: &MotorParameters) -> Result<()> {
        self.session
            .call("set_motor_parameters", |b| b.set_motor_parameters(params))
    }

    pub fn travel_mode(&mut self) -> Result<TravelMode> {
        self.session.call("travel_mode", |b| b.travel_mode())
    }

    pub fn set_travel_mode(&mut self, mode: TravelMode) -> Result<()> {
        self.session.call("set_travel_mode", |b| b.set_travel_mode(mode))
    }

    pub fn travel_limits(&mut self) -> Result<TravelLimits> {
        self.session.call("travel_limits", |b| b.travel_limits())
    }

    pub fn set_travel_limits(&mut self, limits: &TravelLimits) -> Result<()> {
        self.session
            .call("set_travel_limits", |b| b.set_travel_limits(limits))
    }

    pub fn velocity_limits(&mut self) -> Result<VelocityLimits> {
        self.session.call("velocity_limits", |b| b.velocity_limits())
    }

    pub fn set_velocity_limits(&mut self, limits: &VelocityLimits) -> Result<()> {
        self.session
            .call("set_velocity_limits", |b| b.set_velocity_limits(limits))
    }

    pub fn pid_parameters(&mut self) -> Result<PidParameters> {
        self.session.call("pid_parameters", |b| b.pid_parameters())
    }

    pub fn set_pid_parameters(&mut self, params: &PidParameters) -> Result<()> {
        self.session
            .call("set_pid_parameters", |b| b.set_pid_parameters(params))
    }

    pub fn homing_parameters(&mut self) -> Result<HomingParameters> {
        self.session.call("homing_parameters", |b| b.homing_parameters())
    }

    pub fn set_homing_parameters(&mut self, params: &HomingParameters) -> Result<()> {
        self.session
            .call("set_homing_parameters", |b| b.set_homing_parameters(params))
    }

    pub fn request_settings(&mut self) -> Result<()> {
        self.session.call("request_settings", |b| b.request_settings())
    }

    pub fn load_settings(&mut self) -> Result<()> {
        self.session.call("load_settings", |b| b.load_settings())
    }

    pub fn persist_settings(&mut self) -> Result<()> {
        self.session.call("persist_settings", |b| b.persist_settings())
    }

    pub fn reset_stage_to_defaults(&mut self) -> Result<()> {
        self.session
            .call("reset_stage_to_defaults", |b| b.reset_stage_to_defaults())
    }

    /// Overlays the configured mappings on the blocks read from the device.
    ///
    /// Blocks are written one at a time in the order pid, homing, motor,
    /// travel limits, velocity limits. A mapping with an unknown field stops
    /// at that block; blocks written before it stay written.
    pub fn apply_stage(&mut self, stage: &StageSettings) -> Result<()> {
        let identity = self.session.identity().clone();
        self.session.call("apply_stage", |b| {
            if let Some(values) = &stage.pid {
                let block = overlay(b.pid_parameters()?, values)?;
                b.set_pid_parameters(&block)?;
            }
            if let Some(values) = &stage.homing {
                let block = overlay(b.homing_parameters()?, values)?;
                b.set_homing_parameters(&block)?;
            }
            if let Some(values) = &stage.motor {
                let block = overlay(b.motor_parameters()?, values)?;
                b.set_motor_parameters(&block)?;
            }
            if let Some(values) = &stage.travel_limits {
                let block = overlay(b.travel_limits()?, values)?;
                b.set_travel_limits(&block)?;
            }
            if let Some(values) = &stage.velocity_limits {
                let block = overlay(b.velocity_limits()?, values)?;
                b.set_velocity_limits(&block)?;
            }
            info!(identity = %identity, "Stage settings applied");
            Ok(())
        })
    }
}

fn overlay<B: ParameterBlock>(mut block: B, values: &Map<String, Value>) -> Result<B> {
    block.load_mapping(&canonical_keys::<B>(values))?;
    Ok(block)
}

impl Instrument for DcServoMotor {
    /// Connects, clears stale controller messages and loads the persisted settings
    fn open(&mut self) -> Result<()> {
        self.session.open_with(|b| {
            b.clear_message_queue()?;
            b.load_settings()
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
    use infrastructure::simulated::{SimulatedMotion, SimulatorControl};
    use serde_json::json;

    fn motor() -> (DcServoMotor, SimulatorControl) {
        let binding = SimulatedMotion::new();
        let control = binding.control();
        let motor = DcServoMotor::new(
            DeviceIdentity::new("27000001").unwrap(),
            Box::new(binding),
            Arc::new(SessionRegistry::new()),
            MotionSettings {
                position_settle_ms: 0,
            },
        );
        (motor, control)
    }

    #[test]
    fn test_open_clears_queue_then_loads_settings() {
        let (mut motor, control) = motor();
        motor.open().unwrap();
        assert_eq!(
            control.calls(),
            ["connect", "clear_message_queue", "load_settings"]
        );
    }

    #[test]
    fn test_move_outside_travel_limits_is_refused() {
        let (mut motor, control) = motor();
        motor.open().unwrap();

        let err = motor.move_to(30.0).unwrap_err();
        assert!(matches!(
            err,
            DeviceError::Validation { quantity: "position", max, .. } if max == 25.0
        ));
        assert_eq!(control.call_count("move_to_position"), 0);

        motor.move_to(12.5).unwrap();
        assert_eq!(control.call_count("move_to_position"), 1);
    }

    #[test]
    fn test_position_round_trips_through_device_units() {
        let (mut motor, control) = motor();
        motor.open().unwrap();
        motor.move_to(2.0).unwrap();

        let position = motor.position().unwrap();
        assert!((position - 2.0).abs() < 1e-4);
        let calls = control.calls();
        let request = calls.iter().position(|c| c == "request_position").unwrap();
        assert_eq!(calls[request + 1], "position");
    }

    #[test]
    fn test_apply_stage_overlays_configured_fields() {
        let (mut motor, _) = motor();
        motor.open().unwrap();
        let before = motor.pid_parameters().unwrap();

        let stage = StageSettings {
            pid: Some(
                json!({ "proportionalgain": 500, "integralGain": "210" })
                    .as_object()
                    .unwrap()
                    .clone(),
            ),
            ..Default::default()
        };
        motor.apply_stage(&stage).unwrap();

        let pid = motor.pid_parameters().unwrap();
        assert_eq!(pid.proportional_gain, 500);
        assert_eq!(pid.integral_gain, 210);
        assert_eq!(pid.differential_gain, before.differential_gain);
    }

    #[test]
    fn test_apply_stage_rejects_unknown_fields() {
        let (mut motor, control) = motor();
        motor.open().unwrap();

        let stage = StageSettings {
            homing: Some(json!({ "speed": 3 }).as_object().unwrap().clone()),
            ..Default::default()
        };
        let err = motor.apply_stage(&stage).unwrap_err();
        assert!(matches!(err, DeviceError::SchemaMismatch { .. }));
        assert_eq!(control.call_count("set_homing_parameters"), 0);
    }

    #[test]
    fn test_closed_motor_never_reaches_binding() {
        let (mut motor, control) = motor();
        let err = motor.move_to(1.0).unwrap_err();
        assert!(matches!(err, DeviceError::NotInSession { operation: "move_to", .. }));
        assert!(control.calls().is_empty());
    }
}

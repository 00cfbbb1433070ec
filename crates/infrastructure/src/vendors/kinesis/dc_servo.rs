use std::ffi::{CString, c_char};
use std::sync::Arc;

use domain::binding::{MotionBinding, TravelMode, UnitKind};
use domain::parameter::{
    DeviceInfo, HardwareInfo, HomingParameters, MotorParameters, PidParameters, TravelLimits,
    VelocityLimits, VelocityParameters,
};
use domain::{DeviceError, DeviceIdentity, Result, StatusTranslator, VendorBinding, VendorFamily};
use libloading::Library;

use super::discovery::DeviceListApi;
use super::records::{MotDcPidParameters, MotHomingParameters, TliHardwareInformation};
use super::STATUS_TABLE;
use crate::ffi::{c_identity, vendor_table};
use crate::vendors::unbound;

vendor_table! {
    /// `CC_*` entry points of `Thorlabs.MotionControl.KCube.DCServo.dll`
    pub struct DcServoApi: extern "C" {
        open = "CC_Open": fn(*const c_char) -> i16;
        close = "CC_Close": fn(*const c_char) -> i16;
        identify = "CC_Identify": fn(*const c_char);
        clear_message_queue = "CC_ClearMessageQueue": fn(*const c_char);
        load_settings = "CC_LoadSettings": fn(*const c_char) -> bool;
        persist_settings = "CC_PersistSettings": fn(*const c_char) -> bool;
        request_settings = "CC_RequestSettings": fn(*const c_char) -> i16;
        reset_stage_to_defaults = "CC_ResetStageToDefaults": fn(*const c_char) -> i16;
        can_home = "CC_CanHome": fn(*const c_char) -> bool;
        home = "CC_Home": fn(*const c_char) -> i16;
        move_to_position = "CC_MoveToPosition": fn(*const c_char, i32) -> i16;
        stop_profiled = "CC_StopProfiled": fn(*const c_char) -> i16;
        stop_immediate = "CC_StopImmediate": fn(*const c_char) -> i16;
        request_position = "CC_RequestPosition": fn(*const c_char) -> i16;
        get_position = "CC_GetPosition": fn(*const c_char) -> i32;
        get_vel_params = "CC_GetVelParams": fn(*const c_char, *mut i32, *mut i32) -> i16;
        set_vel_params = "CC_SetVelParams": fn(*const c_char, i32, i32) -> i16;
        get_real_value_from_device_unit = "CC_GetRealValueFromDeviceUnit": fn(*const c_char, i32, *mut f64, i32) -> i16;
        get_device_unit_from_real_value = "CC_GetDeviceUnitFromRealValue": fn(*const c_char, f64, *mut i32, i32) -> i16;
        get_hardware_info_block = "CC_GetHardwareInfoBlock": fn(*const c_char, *mut TliHardwareInformation) -> i16;
        get_motor_params_ext = "CC_GetMotorParamsExt": fn(*const c_char, *mut f64, *mut f64, *mut f64) -> i16;
        set_motor_params_ext = "CC_SetMotorParamsExt": fn(*const c_char, f64, f64, f64) -> i16;
        get_motor_velocity_limits = "CC_GetMotorVelocityLimits": fn(*const c_char, *mut f64, *mut f64) -> i16;
        set_motor_velocity_limits = "CC_SetMotorVelocityLimits": fn(*const c_char, f64, f64) -> i16;
        get_motor_travel_mode = "CC_GetMotorTravelMode": fn(*const c_char) -> i32;
        set_motor_travel_mode = "CC_SetMotorTravelMode": fn(*const c_char, i32) -> i16;
        get_motor_travel_limits = "CC_GetMotorTravelLimits": fn(*const c_char, *mut f64, *mut f64) -> i16;
        set_motor_travel_limits = "CC_SetMotorTravelLimits": fn(*const c_char, f64, f64) -> i16;
        get_dc_pid_params = "CC_GetDCPIDParams": fn(*const c_char, *mut MotDcPidParameters) -> i16;
        set_dc_pid_params = "CC_SetDCPIDParams": fn(*const c_char, *mut MotDcPidParameters) -> i16;
        get_homing_params_block = "CC_GetHomingParamsBlock": fn(*const c_char, *mut MotHomingParameters) -> i16;
        set_homing_params_block = "CC_SetHomingParamsBlock": fn(*const c_char, *mut MotHomingParameters) -> i16;
    }
}

/// KCube DC servo controller addressed by serial number
pub struct KCubeDcServoBinding {
    api: DcServoApi,
    devices: DeviceListApi,
    serial: Option<CString>,
}

impl KCubeDcServoBinding {
    pub fn new(library: Arc<Library>) -> Result<Self> {
        Ok(Self {
            api: DcServoApi::load(library.clone())?,
            devices: DeviceListApi::load(library)?,
            serial: None,
        })
    }

    fn serial(&self, operation: &'static str) -> Result<*const c_char> {
        self.serial
            .as_ref()
            .map(|s| s.as_ptr())
            .ok_or_else(|| unbound(VendorFamily::KCubeDcServo, operation))
    }

    fn status(&self, code: i16, operation: &str) -> Result<()> {
        self.check(i32::from(code), operation)
    }

    /// Boolean entry points report failure without a code
    fn confirmed(&self, ok: bool, operation: &str) -> Result<()> {
        if ok {
            Ok(())
        } else {
            self.check(20, operation)
        }
    }
}

impl VendorBinding for KCubeDcServoBinding {
    fn family(&self) -> VendorFamily {
        VendorFamily::KCubeDcServo
    }

    fn status_table(&self) -> &'static StatusTranslator {
        &STATUS_TABLE
    }

    fn connect(&mut self, identity: &DeviceIdentity) -> Result<()> {
        let serial = c_identity(identity)?;
        // The device list must be built before a device can be opened
        self.devices.build()?;
        // SAFETY: serial is NUL-terminated and outlives the call
        let code = unsafe { (self.api.open)(serial.as_ptr()) };
        self.status(code, "CC_Open")?;
        self.serial = Some(serial);
        Ok(())
    }

    fn disconnect(&mut self) -> Result<()> {
        let Some(serial) = self.serial.take() else {
            return Ok(());
        };
        // SAFETY: serial is NUL-terminated and outlives the call
        let code = unsafe { (self.api.close)(serial.as_ptr()) };
        self.status(code, "CC_Close")
    }
}

impl MotionBinding for KCubeDcServoBinding {
    fn identify(&mut self) -> Result<()> {
        let serial = self.serial("identify")?;
        // SAFETY: serial points into self.serial
        unsafe { (self.api.identify)(serial) };
        Ok(())
    }

    fn clear_message_queue(&mut self) -> Result<()> {
        let serial = self.serial("clear message queue")?;
        // SAFETY: serial points into self.serial
        unsafe { (self.api.clear_message_queue)(serial) };
        Ok(())
    }

    fn load_settings(&mut self) -> Result<()> {
        let serial = self.serial("load settings")?;
        // SAFETY: serial points into self.serial
        let ok = unsafe { (self.api.load_settings)(serial) };
        self.confirmed(ok, "CC_LoadSettings")
    }

    fn persist_settings(&mut self) -> Result<()> {
        let serial = self.serial("persist settings")?;
        // SAFETY: serial points into self.serial
        let ok = unsafe { (self.api.persist_settings)(serial) };
        self.confirmed(ok, "CC_PersistSettings")
    }

    fn request_settings(&mut self) -> Result<()> {
        let serial = self.serial("request settings")?;
        // SAFETY: serial points into self.serial
        let code = unsafe { (self.api.request_settings)(serial) };
        self.status(code, "CC_RequestSettings")
    }

    fn reset_stage_to_defaults(&mut self) -> Result<()> {
        let serial = self.serial("reset stage")?;
        // SAFETY: serial points into self.serial
        let code = unsafe { (self.api.reset_stage_to_defaults)(serial) };
        self.status(code, "CC_ResetStageToDefaults")
    }

    fn can_home(&mut self) -> Result<bool> {
        let serial = self.serial("check homing")?;
        // SAFETY: serial points into self.serial
        Ok(unsafe { (self.api.can_home)(serial) })
    }

    fn home(&mut self) -> Result<()> {
        let serial = self.serial("home")?;
        // SAFETY: serial points into self.serial
        let code = unsafe { (self.api.home)(serial) };
        self.status(code, "CC_Home")
    }

    fn move_to_position(&mut self, position: i32) -> Result<()> {
        let serial = self.serial("move")?;
        // SAFETY: serial points into self.serial
        let code = unsafe { (self.api.move_to_position)(serial, position) };
        self.status(code, "CC_MoveToPosition")
    }

    fn stop_profiled(&mut self) -> Result<()> {
        let serial = self.serial("stop")?;
        // SAFETY: serial points into self.serial
        let code = unsafe { (self.api.stop_profiled)(serial) };
        self.status(code, "CC_StopProfiled")
    }

    fn stop_immediate(&mut self) -> Result<()> {
        let serial = self.serial("stop")?;
        // SAFETY: serial points into self.serial
        let code = unsafe { (self.api.stop_immediate)(serial) };
        self.status(code, "CC_StopImmediate")
    }

    fn request_position(&mut self) -> Result<()> {
        let serial = self.serial("request position")?;
        // SAFETY: serial points into self.serial
        let code = unsafe { (self.api.request_position)(serial) };
        self.status(code, "CC_RequestPosition")
    }

    fn position(&mut self) -> Result<i32> {
        let serial = self.serial("read position")?;
        // SAFETY: serial points into self.serial
        Ok(unsafe { (self.api.get_position)(serial) })
    }

    fn velocity_parameters(&mut self) -> Result<VelocityParameters> {
        let serial = self.serial("read velocity parameters")?;
        let (mut acceleration, mut max_velocity) = (0i32, 0i32);
        // SAFETY: both out-pointers are valid i32 slots
        let code = unsafe { (self.api.get_vel_params)(serial, &mut acceleration, &mut max_velocity) };
        self.status(code, "CC_GetVelParams")?;
        Ok(VelocityParameters {
            acceleration,
            max_velocity,
        })
    }

    fn set_velocity_parameters(&mut self, params: &VelocityParameters) -> Result<()> {
        let serial = self.serial("set velocity parameters")?;
        // SAFETY: serial points into self.serial
        let code = unsafe { (self.api.set_vel_params)(serial, params.acceleration, params.max_velocity) };
        self.status(code, "CC_SetVelParams")
    }

    fn real_from_device(&mut self, device_units: i32, kind: UnitKind) -> Result<f64> {
        let serial = self.serial("convert units")?;
        let mut real = 0.0f64;
        // SAFETY: real is a valid f64 slot
        let code = unsafe {
            (self.api.get_real_value_from_device_unit)(serial, device_units, &mut real, kind.as_raw())
        };
        self.status(code, "CC_GetRealValueFromDeviceUnit")?;
        Ok(real)
    }

    fn device_from_real(&mut self, real: f64, kind: UnitKind) -> Result<i32> {
        let serial = self.serial("convert units")?;
        let mut device_units = 0i32;
        // SAFETY: device_units is a valid i32 slot
        let code = unsafe {
            (self.api.get_device_unit_from_real_value)(serial, real, &mut device_units, kind.as_raw())
        };
        self.status(code, "CC_GetDeviceUnitFromRealValue")?;
        Ok(device_units)
    }

    fn hardware_info(&mut self) -> Result<HardwareInfo> {
        let serial = self.serial("read hardware info")?;
        let mut raw = TliHardwareInformation::default();
        // SAFETY: raw is a writable TLI_HardwareInformation
        let code = unsafe { (self.api.get_hardware_info_block)(serial, &mut raw) };
        self.status(code, "CC_GetHardwareInfoBlock")?;
        Ok(HardwareInfo::from(raw))
    }

    fn device_info(&mut self) -> Result<DeviceInfo> {
        self.serial("read device info")?;
        self.devices.build()?;
        match &self.serial {
            Some(serial) => self.devices.device_info(serial),
            None => Err(unbound(VendorFamily::KCubeDcServo, "read device info")),
        }
    }

    fn motor_parameters(&mut self) -> Result<MotorParameters> {
        let serial = self.serial("read motor parameters")?;
        let mut block = MotorParameters::default();
        // SAFETY: all three out-pointers are valid f64 slots
        let code = unsafe {
            (self.api.get_motor_params_ext)(
                serial,
                &mut block.steps_per_rev,
                &mut block.gear_box_ratio,
                &mut block.pitch,
            )
        };
        self.status(code, "CC_GetMotorParamsExt")?;
        Ok(block)
    }

    fn set_motor_parameters(&mut self, params: &MotorParameters) -> Result<()> {
        let serial = self.serial("set motor parameters")?;
        // SAFETY: serial points into self.serial
        let code = unsafe {
            (self.api.set_motor_params_ext)(serial, params.steps_per_rev, params.gear_box_ratio, params.pitch)
        };
        self.status(code, "CC_SetMotorParamsExt")
    }

    fn travel_mode(&mut self) -> Result<TravelMode> {
        let serial = self.serial("read travel mode")?;
        // SAFETY: serial points into self.serial
        let raw = unsafe { (self.api.get_motor_travel_mode)(serial) };
        TravelMode::from_raw(raw)
    }

    fn set_travel_mode(&mut self, mode: TravelMode) -> Result<()> {
        let serial = self.serial("set travel mode")?;
        // SAFETY: serial points into self.serial
        let code = unsafe { (self.api.set_motor_travel_mode)(serial, mode.as_raw()) };
        self.status(code, "CC_SetMotorTravelMode")
    }

    fn travel_limits(&mut self) -> Result<TravelLimits> {
        let serial = self.serial("read travel limits")?;
        let mut limits = TravelLimits::default();
        // SAFETY: both out-pointers are valid f64 slots
        let code = unsafe {
            (self.api.get_motor_travel_limits)(serial, &mut limits.min_position, &mut limits.max_position)
        };
        self.status(code, "CC_GetMotorTravelLimits")?;
        Ok(limits)
    }

    fn set_travel_limits(&mut self, limits: &TravelLimits) -> Result<()> {
        if limits.min_position > limits.max_position {
            return Err(DeviceError::InvalidArgument(format!(
                "travel limits are inverted: {} > {}",
                limits.min_position, limits.max_position
            )));
        }
        let serial = self.serial("set travel limits")?;
        // SAFETY: serial points into self.serial
        let code = unsafe {
            (self.api.set_motor_travel_limits)(serial, limits.min_position, limits.max_position)
        };
        self.status(code, "CC_SetMotorTravelLimits")
    }

    fn velocity_limits(&mut self) -> Result<VelocityLimits> {
        let serial = self.serial("read velocity limits")?;
        let mut limits = VelocityLimits::default();
        // SAFETY: both out-pointers are valid f64 slots
        let code = unsafe {
            (self.api.get_motor_velocity_limits)(serial, &mut limits.max_velocity, &mut limits.max_acceleration)
        };
        self.status(code, "CC_GetMotorVelocityLimits")?;
        Ok(limits)
    }

    fn set_velocity_limits(&mut self, limits: &VelocityLimits) -> Result<()> {
        let serial = self.serial("set velocity limits")?;
        // SAFETY: serial points into self.serial
        let code = unsafe {
            (self.api.set_motor_velocity_limits)(serial, limits.max_velocity, limits.max_acceleration)
        };
        self.status(code, "CC_SetMotorVelocityLimits")
    }

    fn pid_parameters(&mut self) -> Result<PidParameters> {
        let serial = self.serial("read PID parameters")?;
        let mut raw = MotDcPidParameters::default();
        // SAFETY: raw is a writable MOT_DC_PIDParameters
        let code = unsafe { (self.api.get_dc_pid_params)(serial, &mut raw) };
        self.status(code, "CC_GetDCPIDParams")?;
        Ok(PidParameters::from(raw))
    }

    fn set_pid_parameters(&mut self, params: &PidParameters) -> Result<()> {
        let serial = self.serial("set PID parameters")?;
        let mut raw = MotDcPidParameters::from(params);
        // SAFETY: raw is a valid MOT_DC_PIDParameters for the duration of the call
        let code = unsafe { (self.api.set_dc_pid_params)(serial, &mut raw) };
        self.status(code, "CC_SetDCPIDParams")
    }

    fn homing_parameters(&mut self) -> Result<HomingParameters> {
        let serial = self.serial("read homing parameters")?;
        let mut raw = MotHomingParameters::default();
        // SAFETY: raw is a writable MOT_HomingParameters
        let code = unsafe { (self.api.get_homing_params_block)(serial, &mut raw) };
        self.status(code, "CC_GetHomingParamsBlock")?;
        Ok(HomingParameters::from(raw))
    }

    fn set_homing_parameters(&mut self, params: &HomingParameters) -> Result<()> {
        let serial = self.serial("set homing parameters")?;
        let mut raw = MotHomingParameters::from(params);
        // SAFETY: raw is a valid MOT_HomingParameters for the duration of the call
        let code = unsafe { (self.api.set_homing_params_block)(serial, &mut raw) };
        self.status(code, "CC_SetHomingParamsBlock")
    }
}

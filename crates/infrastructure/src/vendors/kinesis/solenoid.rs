use std::ffi::{CString, c_char};
use std::sync::Arc;

use domain::binding::{OperatingMode, OperatingState, SolenoidBinding, SolenoidState};
use domain::parameter::CycleParameters;
use domain::{DeviceIdentity, Result, StatusTranslator, VendorBinding, VendorFamily};
use libloading::Library;

use super::discovery::DeviceListApi;
use super::records::ScCycleParameters;
use super::STATUS_TABLE;
use crate::ffi::{c_identity, vendor_table};
use crate::vendors::unbound;

vendor_table! {
    /// `SC_*` entry points of `Thorlabs.MotionControl.KCube.Solenoid.dll`
    pub struct SolenoidApi: extern "C" {
        open = "SC_Open": fn(*const c_char) -> i16;
        close = "SC_Close": fn(*const c_char) -> i16;
        identify = "SC_Identify": fn(*const c_char);
        clear_message_queue = "SC_ClearMessageQueue": fn(*const c_char);
        load_settings = "SC_LoadSettings": fn(*const c_char) -> bool;
        request_settings = "SC_RequestSettings": fn(*const c_char) -> i16;
        get_operating_mode = "SC_GetOperatingMode": fn(*const c_char) -> i32;
        set_operating_mode = "SC_SetOperatingMode": fn(*const c_char, i32) -> i16;
        get_operating_state = "SC_GetOperatingState": fn(*const c_char) -> i32;
        set_operating_state = "SC_SetOperatingState": fn(*const c_char, i32) -> i16;
        get_solenoid_state = "SC_GetSolenoidState": fn(*const c_char) -> i32;
        get_cycle_params_block = "SC_GetCycleParamsBlock": fn(*const c_char, *mut ScCycleParameters) -> i16;
        set_cycle_params_block = "SC_SetCycleParamsBlock": fn(*const c_char, *mut ScCycleParameters) -> i16;
    }
}

/// KCube solenoid controller addressed by serial number
pub struct KCubeSolenoidBinding {
    api: SolenoidApi,
    devices: DeviceListApi,
    serial: Option<CString>,
}

impl KCubeSolenoidBinding {
    pub fn new(library: Arc<Library>) -> Result<Self> {
        Ok(Self {
            api: SolenoidApi::load(library.clone())?,
            devices: DeviceListApi::load(library)?,
            serial: None,
        })
    }

    fn serial(&self, operation: &'static str) -> Result<*const c_char> {
        self.serial
            .as_ref()
            .map(|s| s.as_ptr())
            .ok_or_else(|| unbound(VendorFamily::KCubeSolenoid, operation))
    }

    fn status(&self, code: i16, operation: &str) -> Result<()> {
        self.check(i32::from(code), operation)
    }
}

impl VendorBinding for KCubeSolenoidBinding {
    fn family(&self) -> VendorFamily {
        VendorFamily::KCubeSolenoid
    }

    fn status_table(&self) -> &'static StatusTranslator {
        &STATUS_TABLE
    }

    fn connect(&mut self, identity: &DeviceIdentity) -> Result<()> {
        let serial = c_identity(identity)?;
        self.devices.build()?;
        // SAFETY: serial is NUL-terminated and outlives the call
        let code = unsafe { (self.api.open)(serial.as_ptr()) };
        self.status(code, "SC_Open")?;
        self.serial = Some(serial);
        Ok(())
    }

    fn disconnect(&mut self) -> Result<()> {
        let Some(serial) = self.serial.take() else {
            return Ok(());
        };
        // SAFETY: serial is NUL-terminated and outlives the call
        let code = unsafe { (self.api.close)(serial.as_ptr()) };
        self.status(code, "SC_Close")
    }
}

impl SolenoidBinding for KCubeSolenoidBinding {
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
        if unsafe { (self.api.load_settings)(serial) } {
            Ok(())
        } else {
            self.check(20, "SC_LoadSettings")
        }
    }

    fn request_settings(&mut self) -> Result<()> {
        let serial = self.serial("request settings")?;
        // SAFETY: serial points into self.serial
        let code = unsafe { (self.api.request_settings)(serial) };
        self.status(code, "SC_RequestSettings")
    }

    fn operating_mode(&mut self) -> Result<OperatingMode> {
        let serial = self.serial("read operating mode")?;
        // SAFETY: serial points into self.serial
        OperatingMode::from_raw(unsafe { (self.api.get_operating_mode)(serial) })
    }

    fn set_operating_mode(&mut self, mode: OperatingMode) -> Result<()> {
        let serial = self.serial("set operating mode")?;
        // SAFETY: serial points into self.serial
        let code = unsafe { (self.api.set_operating_mode)(serial, mode.as_raw()) };
        self.status(code, "SC_SetOperatingMode")
    }

    fn operating_state(&mut self) -> Result<OperatingState> {
        let serial = self.serial("read operating state")?;
        // SAFETY: serial points into self.serial
        OperatingState::from_raw(unsafe { (self.api.get_operating_state)(serial) })
    }

    fn set_operating_state(&mut self, state: OperatingState) -> Result<()> {
        let serial = self.serial("set operating state")?;
        // SAFETY: serial points into self.serial
        let code = unsafe { (self.api.set_operating_state)(serial, state.as_raw()) };
        self.status(code, "SC_SetOperatingState")
    }

    fn solenoid_state(&mut self) -> Result<SolenoidState> {
        let serial = self.serial("read solenoid state")?;
        // SAFETY: serial points into self.serial
        SolenoidState::from_raw(unsafe { (self.api.get_solenoid_state)(serial) })
    }

    fn cycle_parameters(&mut self) -> Result<CycleParameters> {
        let serial = self.serial("read cycle parameters")?;
        let mut raw = ScCycleParameters::default();
        // SAFETY: raw is a writable SC_CycleParameters
        let code = unsafe { (self.api.get_cycle_params_block)(serial, &mut raw) };
        self.status(code, "SC_GetCycleParamsBlock")?;
        Ok(CycleParameters::from(raw))
    }

    fn set_cycle_parameters(&mut self, params: &CycleParameters) -> Result<()> {
        let serial = self.serial("set cycle parameters")?;
        let mut raw = ScCycleParameters::from(params);
        // SAFETY: raw is a valid SC_CycleParameters for the duration of the call
        let code = unsafe { (self.api.set_cycle_params_block)(serial, &mut raw) };
        self.status(code, "SC_SetCycleParamsBlock")
    }
}

//! Thorlabs optical power meters through `TLPM_64.dll`

use std::ffi::c_char;
use std::sync::Arc;

use domain::binding::{Attribute, PowerMeterBinding, PowerUnit};
use domain::{
    DeviceIdentity, DeviceListing, DiscoveryBinding, RawStatus, Result, StatusTranslator,
    VendorBinding, VendorFamily,
};
use libloading::Library;

use super::unbound;
use super::visa::{
    MESSAGE_BUFFER, RESOURCE_BUFFER, TLPM_STATUS_TABLE, VI_ERROR_RSRC_NFOUND, VI_FALSE, VI_NULL,
    VI_TRUE, ViBoolean, ViSession, ViStatus,
};
use crate::ffi::{c_identity, fixed_str, vendor_bool, vendor_table};

vendor_table! {
    pub struct TlpmApi: extern "system" {
        init = "TLPM_init": fn(*const c_char, ViBoolean, ViBoolean, *mut ViSession) -> ViStatus;
        close = "TLPM_close": fn(ViSession) -> ViStatus;
        find_rsrc = "TLPM_findRsrc": fn(ViSession, *mut u32) -> ViStatus;
        get_rsrc_name = "TLPM_getRsrcName": fn(ViSession, u32, *mut c_char) -> ViStatus;
        get_rsrc_info = "TLPM_getRsrcInfo": fn(ViSession, u32, *mut c_char, *mut c_char, *mut c_char, *mut ViBoolean) -> ViStatus;
        error_message = "TLPM_errorMessage": fn(ViSession, ViStatus, *mut c_char) -> ViStatus;
        set_timeout_value = "TLPM_setTimeoutValue": fn(ViSession, u32) -> ViStatus;
        get_timeout_value = "TLPM_getTimeoutValue": fn(ViSession, *mut u32) -> ViStatus;
        set_avg_time = "TLPM_setAvgTime": fn(ViSession, f64) -> ViStatus;
        get_avg_time = "TLPM_getAvgTime": fn(ViSession, i16, *mut f64) -> ViStatus;
        set_avg_cnt = "TLPM_setAvgCnt": fn(ViSession, i16) -> ViStatus;
        get_avg_cnt = "TLPM_getAvgCnt": fn(ViSession, *mut i16) -> ViStatus;
        set_attenuation = "TLPM_setAttenuation": fn(ViSession, f64) -> ViStatus;
        get_attenuation = "TLPM_getAttenuation": fn(ViSession, i16, *mut f64) -> ViStatus;
        set_wavelength = "TLPM_setWavelength": fn(ViSession, f64) -> ViStatus;
        get_wavelength = "TLPM_getWavelength": fn(ViSession, i16, *mut f64) -> ViStatus;
        set_power_auto_range = "TLPM_setPowerAutoRange": fn(ViSession, ViBoolean) -> ViStatus;
        get_power_auto_range = "TLPM_getPowerAutorange": fn(ViSession, *mut ViBoolean) -> ViStatus;
        set_power_range = "TLPM_setPowerRange": fn(ViSession, f64) -> ViStatus;
        get_power_range = "TLPM_getPowerRange": fn(ViSession, i16, *mut f64) -> ViStatus;
        set_power_unit = "TLPM_setPowerUnit": fn(ViSession, i16) -> ViStatus;
        get_power_unit = "TLPM_getPowerUnit": fn(ViSession, *mut i16) -> ViStatus;
        start_dark_adjust = "TLPM_startDarkAdjust": fn(ViSession) -> ViStatus;
        cancel_dark_adjust = "TLPM_cancelDarkAdjust": fn(ViSession) -> ViStatus;
        get_dark_adjust_state = "TLPM_getDarkAdjustState": fn(ViSession, *mut i16) -> ViStatus;
        get_dark_offset = "TLPM_getDarkOffset": fn(ViSession, *mut f64) -> ViStatus;
        meas_power = "TLPM_measPower": fn(ViSession, *mut f64) -> ViStatus;
    }
}

impl TlpmApi {
    fn describe(&self, session: ViSession, code: RawStatus) -> Option<String> {
        let mut buffer = [0 as c_char; MESSAGE_BUFFER];
        // SAFETY: buffer holds the 512 characters the driver may write
        let status = unsafe { (self.error_message)(session, code, buffer.as_mut_ptr()) };
        (status == 0).then(|| fixed_str(&buffer))
    }
}

/// TLPM power meter addressed by VISA resource name
pub struct TlpmBinding {
    api: TlpmApi,
    session: Option<ViSession>,
}

impl TlpmBinding {
    pub fn new(library: Arc<Library>) -> Result<Self> {
        Ok(Self {
            api: TlpmApi::load(library)?,
            session: None,
        })
    }

    fn session(&self, operation: &'static str) -> Result<ViSession> {
        self.session
            .ok_or_else(|| unbound(VendorFamily::Tlpm, operation))
    }

    fn read_f64(
        &self,
        operation: &'static str,
        call: unsafe extern "system" fn(ViSession, i16, *mut f64) -> ViStatus,
        attribute: Attribute,
    ) -> Result<f64> {
        let vi = self.session(operation)?;
        let mut value = 0.0f64;
        // SAFETY: value is a valid f64 slot
        let code = unsafe { call(vi, attribute.as_raw(), &mut value) };
        self.check(code, operation)?;
        Ok(value)
    }

    fn write_f64(
        &self,
        operation: &'static str,
        call: unsafe extern "system" fn(ViSession, f64) -> ViStatus,
        value: f64,
    ) -> Result<()> {
        let vi = self.session(operation)?;
        // SAFETY: plain value arguments
        let code = unsafe { call(vi, value) };
        self.check(code, operation)
    }

    fn simple(
        &self,
        operation: &'static str,
        call: unsafe extern "system" fn(ViSession) -> ViStatus,
    ) -> Result<()> {
        let vi = self.session(operation)?;
        // SAFETY: plain value arguments
        let code = unsafe { call(vi) };
        self.check(code, operation)
    }
}

impl VendorBinding for TlpmBinding {
    fn family(&self) -> VendorFamily {
        VendorFamily::Tlpm
    }

    fn status_table(&self) -> &'static StatusTranslator {
        &TLPM_STATUS_TABLE
    }

    fn connect(&mut self, identity: &DeviceIdentity) -> Result<()> {
        let resource = c_identity(identity)?;
        let mut vi: ViSession = VI_NULL;
        // SAFETY: resource is NUL-terminated and vi is a valid out slot
        let code = unsafe { (self.api.init)(resource.as_ptr(), VI_TRUE, VI_FALSE, &mut vi) };
        self.check(code, "TLPM_init")?;
        self.session = Some(vi);
        Ok(())
    }

    fn disconnect(&mut self) -> Result<()> {
        let Some(vi) = self.session.take() else {
            return Ok(());
        };
        // SAFETY: vi came from TLPM_init
        let code = unsafe { (self.api.close)(vi) };
        self.check(code, "TLPM_close")
    }

    fn error_message(&self, code: RawStatus) -> Option<String> {
        self.api.describe(self.session.unwrap_or(VI_NULL), code)
    }
}

impl PowerMeterBinding for TlpmBinding {
    fn timeout(&mut self) -> Result<u32> {
        let vi = self.session("TLPM_getTimeoutValue")?;
        let mut millis = 0u32;
        // SAFETY: millis is a valid u32 slot
        let code = unsafe { (self.api.get_timeout_value)(vi, &mut millis) };
        self.check(code, "TLPM_getTimeoutValue")?;
        Ok(millis)
    }

    fn set_timeout(&mut self, millis: u32) -> Result<()> {
        let vi = self.session("TLPM_setTimeoutValue")?;
        // SAFETY: plain value arguments
        let code = unsafe { (self.api.set_timeout_value)(vi, millis) };
        self.check(code, "TLPM_setTimeoutValue")
    }

    fn average_time(&mut self, attribute: Attribute) -> Result<f64> {
        self.read_f64("TLPM_getAvgTime", self.api.get_avg_time, attribute)
    }

    fn set_average_time(&mut self, seconds: f64) -> Result<()> {
        self.write_f64("TLPM_setAvgTime", self.api.set_avg_time, seconds)
    }

    fn average_count(&mut self) -> Result<i16> {
        let vi = self.session("TLPM_getAvgCnt")?;
        let mut count = 0i16;
        // SAFETY: count is a valid i16 slot
        let code = unsafe { (self.api.get_avg_cnt)(vi, &mut count) };
        self.check(code, "TLPM_getAvgCnt")?;
        Ok(count)
    }

    fn set_average_count(&mut self, count: i16) -> Result<()> {
        let vi = self.session("TLPM_setAvgCnt")?;
        // SAFETY: plain value arguments
        let code = unsafe { (self.api.set_avg_cnt)(vi, count) };
        self.check(code, "TLPM_setAvgCnt")
    }

    fn attenuation(&mut self, attribute: Attribute) -> Result<f64> {
        self.read_f64("TLPM_getAttenuation", self.api.get_attenuation, attribute)
    }

    fn set_attenuation(&mut self, db: f64) -> Result<()> {
        self.write_f64("TLPM_setAttenuation", self.api.set_attenuation, db)
    }

    fn wavelength(&mut self, attribute: Attribute) -> Result<f64> {
        self.read_f64("TLPM_getWavelength", self.api.get_wavelength, attribute)
    }

    fn set_wavelength(&mut self, nm: f64) -> Result<()> {
        self.write_f64("TLPM_setWavelength", self.api.set_wavelength, nm)
    }

    fn auto_range(&mut self) -> Result<bool> {
        let vi = self.session("TLPM_getPowerAutorange")?;
        let mut enabled: ViBoolean = VI_FALSE;
        // SAFETY: enabled is a valid ViBoolean slot
        let code = unsafe { (self.api.get_power_auto_range)(vi, &mut enabled) };
        self.check(code, "TLPM_getPowerAutorange")?;
        Ok(vendor_bool(enabled))
    }

    fn set_auto_range(&mut self, enabled: bool) -> Result<()> {
        let vi = self.session("TLPM_setPowerAutoRange")?;
        let flag = if enabled { VI_TRUE } else { VI_FALSE };
        // SAFETY: plain value arguments
        let code = unsafe { (self.api.set_power_auto_range)(vi, flag) };
        self.check(code, "TLPM_setPowerAutoRange")
    }

    fn power_range(&mut self, attribute: Attribute) -> Result<f64> {
        self.read_f64("TLPM_getPowerRange", self.api.get_power_range, attribute)
    }

    fn set_power_range(&mut self, watts: f64) -> Result<()> {
        self.write_f64("TLPM_setPowerRange", self.api.set_power_range, watts)
    }

    fn power_unit(&mut self) -> Result<PowerUnit> {
        let vi = self.session("TLPM_getPowerUnit")?;
        let mut unit = 0i16;
        // SAFETY: unit is a valid i16 slot
        let code = unsafe { (self.api.get_power_unit)(vi, &mut unit) };
        self.check(code, "TLPM_getPowerUnit")?;
        PowerUnit::from_raw(unit)
    }

    fn set_power_unit(&mut self, unit: PowerUnit) -> Result<()> {
        let vi = self.session("TLPM_setPowerUnit")?;
        // SAFETY: plain value arguments
        let code = unsafe { (self.api.set_power_unit)(vi, unit.as_raw()) };
        self.check(code, "TLPM_setPowerUnit")
    }

    fn start_dark_adjust(&mut self) -> Result<()> {
        self.simple("TLPM_startDarkAdjust", self.api.start_dark_adjust)
    }

    fn cancel_dark_adjust(&mut self) -> Result<()> {
        self.simple("TLPM_cancelDarkAdjust", self.api.cancel_dark_adjust)
    }

    fn dark_adjust_running(&mut self) -> Result<bool> {
        let vi = self.session("TLPM_getDarkAdjustState")?;
        let mut state = 0i16;
        // SAFETY: state is a valid i16 slot
        let code = unsafe { (self.api.get_dark_adjust_state)(vi, &mut state) };
        self.check(code, "TLPM_getDarkAdjustState")?;
        Ok(state != 0)
    }

    fn dark_offset(&mut self) -> Result<f64> {
        let vi = self.session("TLPM_getDarkOffset")?;
        let mut offset = 0.0f64;
        // SAFETY: offset is a valid f64 slot
        let code = unsafe { (self.api.get_dark_offset)(vi, &mut offset) };
        self.check(code, "TLPM_getDarkOffset")?;
        Ok(offset)
    }

    fn measure_power(&mut self) -> Result<f64> {
        let vi = self.session("TLPM_measPower")?;
        let mut power = 0.0f64;
        // SAFETY: power is a valid f64 slot
        let code = unsafe { (self.api.meas_power)(vi, &mut power) };
        self.check(code, "TLPM_measPower")?;
        Ok(power)
    }
}

/// Resource enumeration through `TLPM_findRsrc`
pub struct TlpmDiscovery {
    api: TlpmApi,
}

impl TlpmDiscovery {
    pub fn new(library: Arc<Library>) -> Result<Self> {
        Ok(Self {
            api: TlpmApi::load(library)?,
        })
    }

    fn check(&self, code: RawStatus, operation: &str) -> Result<()> {
        if TLPM_STATUS_TABLE.translate(code).outcome.is_success() {
            return Ok(());
        }
        TLPM_STATUS_TABLE.check_with(code, operation, self.api.describe(VI_NULL, code))
    }

    fn listing(&self, index: u32) -> Result<DeviceListing> {
        let mut name = [0 as c_char; RESOURCE_BUFFER];
        // SAFETY: name holds the 256 characters the driver may write
        let code = unsafe { (self.api.get_rsrc_name)(VI_NULL, index, name.as_mut_ptr()) };
        self.check(code, "TLPM_getRsrcName")?;

        let mut model = [0 as c_char; RESOURCE_BUFFER];
        let mut serial = [0 as c_char; RESOURCE_BUFFER];
        let mut manufacturer = [0 as c_char; RESOURCE_BUFFER];
        let mut available: ViBoolean = VI_FALSE;
        // SAFETY: every buffer holds 256 characters and available is a valid slot
        let code = unsafe {
            (self.api.get_rsrc_info)(
                VI_NULL,
                index,
                model.as_mut_ptr(),
                serial.as_mut_ptr(),
                manufacturer.as_mut_ptr(),
                &mut available,
            )
        };
        self.check(code, "TLPM_getRsrcInfo")?;

        Ok(DeviceListing::new(VendorFamily::Tlpm, fixed_str(&name))
            .with_model(fixed_str(&model))
            .with_serial(fixed_str(&serial))
            .with_description(fixed_str(&manufacturer))
            .in_use(!vendor_bool(available)))
    }
}

impl DiscoveryBinding for TlpmDiscovery {
    fn family(&self) -> VendorFamily {
        VendorFamily::Tlpm
    }

    fn count_devices(&mut self) -> Result<u32> {
        let mut count = 0u32;
        // SAFETY: count is a valid u32 slot
        let code = unsafe { (self.api.find_rsrc)(VI_NULL, &mut count) };
        // The driver reports an empty bus as "resource not found"
        if code == VI_ERROR_RSRC_NFOUND {
            return Ok(0);
        }
        self.check(code, "TLPM_findRsrc")?;
        Ok(count)
    }

    fn list_devices(&mut self, limit: usize) -> Result<Vec<DeviceListing>> {
        let count = self.count_devices()?;
        (0..count)
            .take(limit)
            .map(|index| self.listing(index))
            .collect()
    }
}

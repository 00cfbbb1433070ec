//! Thorlabs CCS spectrometers through `TLCCS_64.dll`

use std::ffi::c_char;
use std::sync::Arc;

use domain::binding::{
    CalibrationDataset, ScanStatus, SpectrometerBinding, WavelengthCalibration,
};
use domain::{DeviceIdentity, RawStatus, Result, StatusTranslator, VendorBinding, VendorFamily};
use libloading::Library;

use super::unbound;
use super::visa::{
    MESSAGE_BUFFER, TLCCS_STATUS_TABLE, VI_FALSE, VI_NULL, VI_TRUE, ViBoolean, ViSession,
    ViStatus,
};
use crate::ffi::{c_identity, fixed_str, vendor_table};

/// Pixels of the linear CCD
pub const NUM_PIXELS: usize = 3648;
/// Integration time limits in seconds
pub const MIN_INTEGRATION_TIME: f64 = 1.0e-5;
pub const MAX_INTEGRATION_TIME: f64 = 60.0;

vendor_table! {
    pub struct TlccsApi: extern "system" {
        init = "tlccs_init": fn(*const c_char, ViBoolean, ViBoolean, *mut ViSession) -> ViStatus;
        close = "tlccs_close": fn(ViSession) -> ViStatus;
        error_message = "tlccs_errorMessage": fn(ViSession, ViStatus, *mut c_char) -> ViStatus;
        get_device_status = "tlccs_getDeviceStatus": fn(ViSession, *mut i32) -> ViStatus;
        start_scan = "tlccs_startScan": fn(ViSession) -> ViStatus;
        get_scan_data = "tlccs_getScanData": fn(ViSession, *mut f64) -> ViStatus;
        get_wavelength_data = "tlccs_getWavelengthData": fn(ViSession, i16, *mut f64, *mut f64, *mut f64) -> ViStatus;
        set_integration_time = "tlccs_setIntegrationTime": fn(ViSession, f64) -> ViStatus;
        get_integration_time = "tlccs_getIntegrationTime": fn(ViSession, *mut f64) -> ViStatus;
    }
}

/// CCS spectrometer addressed by VISA resource name
pub struct TlccsBinding {
    api: TlccsApi,
    session: Option<ViSession>,
}

impl TlccsBinding {
    pub fn new(library: Arc<Library>) -> Result<Self> {
        Ok(Self {
            api: TlccsApi::load(library)?,
            session: None,
        })
    }

    fn session(&self, operation: &'static str) -> Result<ViSession> {
        self.session
            .ok_or_else(|| unbound(VendorFamily::Tlccs, operation))
    }
}

impl VendorBinding for TlccsBinding {
    fn family(&self) -> VendorFamily {
        VendorFamily::Tlccs
    }

    fn status_table(&self) -> &'static StatusTranslator {
        &TLCCS_STATUS_TABLE
    }

    fn connect(&mut self, identity: &DeviceIdentity) -> Result<()> {
        let resource = c_identity(identity)?;
        let mut vi: ViSession = VI_NULL;
        // SAFETY: resource is NUL-terminated and vi is a valid out slot
        let code = unsafe { (self.api.init)(resource.as_ptr(), VI_TRUE, VI_FALSE, &mut vi) };
        self.check(code, "tlccs_init")?;
        self.session = Some(vi);
        Ok(())
    }

    fn disconnect(&mut self) -> Result<()> {
        let Some(vi) = self.session.take() else {
            return Ok(());
        };
        // SAFETY: vi came from tlccs_init
        let code = unsafe { (self.api.close)(vi) };
        self.check(code, "tlccs_close")
    }

    fn error_message(&self, code: RawStatus) -> Option<String> {
        let mut buffer = [0 as c_char; MESSAGE_BUFFER];
        // SAFETY: buffer holds the 512 characters the driver may write
        let status = unsafe {
            (self.api.error_message)(self.session.unwrap_or(VI_NULL), code, buffer.as_mut_ptr())
        };
        (status == 0).then(|| fixed_str(&buffer))
    }
}

impl SpectrometerBinding for TlccsBinding {
    fn device_status(&mut self) -> Result<ScanStatus> {
        let vi = self.session("tlccs_getDeviceStatus")?;
        let mut status = 0i32;
        // SAFETY: status is a valid i32 slot
        let code = unsafe { (self.api.get_device_status)(vi, &mut status) };
        self.check(code, "tlccs_getDeviceStatus")?;
        Ok(ScanStatus(status as u32))
    }

    fn start_scan(&mut self) -> Result<()> {
        let vi = self.session("tlccs_startScan")?;
        // SAFETY: plain value arguments
        let code = unsafe { (self.api.start_scan)(vi) };
        self.check(code, "tlccs_startScan")
    }

    fn scan_data(&mut self) -> Result<Vec<f64>> {
        let vi = self.session("tlccs_getScanData")?;
        let mut data = vec![0.0f64; NUM_PIXELS];
        // SAFETY: data holds NUM_PIXELS doubles
        let code = unsafe { (self.api.get_scan_data)(vi, data.as_mut_ptr()) };
        self.check(code, "tlccs_getScanData")?;
        Ok(data)
    }

    fn wavelength_data(&mut self, dataset: CalibrationDataset) -> Result<WavelengthCalibration> {
        let vi = self.session("tlccs_getWavelengthData")?;
        let mut wavelengths = vec![0.0f64; NUM_PIXELS];
        let (mut min, mut max) = (0.0f64, 0.0f64);
        // SAFETY: wavelengths holds NUM_PIXELS doubles, min and max are valid slots
        let code = unsafe {
            (self.api.get_wavelength_data)(
                vi,
                dataset.as_raw(),
                wavelengths.as_mut_ptr(),
                &mut min,
                &mut max,
            )
        };
        self.check(code, "tlccs_getWavelengthData")?;
        Ok(WavelengthCalibration {
            wavelengths,
            min,
            max,
        })
    }

    fn integration_time(&mut self) -> Result<f64> {
        let vi = self.session("tlccs_getIntegrationTime")?;
        let mut seconds = 0.0f64;
        // SAFETY: seconds is a valid f64 slot
        let code = unsafe { (self.api.get_integration_time)(vi, &mut seconds) };
        self.check(code, "tlccs_getIntegrationTime")?;
        Ok(seconds)
    }

    fn set_integration_time(&mut self, seconds: f64) -> Result<()> {
        let vi = self.session("tlccs_setIntegrationTime")?;
        // SAFETY: plain value arguments
        let code = unsafe { (self.api.set_integration_time)(vi, seconds) };
        self.check(code, "tlccs_setIntegrationTime")
    }

    fn integration_time_limits(&self) -> (f64, f64) {
        (MIN_INTEGRATION_TIME, MAX_INTEGRATION_TIME)
    }
}

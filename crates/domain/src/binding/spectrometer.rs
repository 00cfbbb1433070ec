use serde::{Deserialize, Serialize};

use super::VendorBinding;
use crate::error::Result;

/// Device status bits reported by the spectrometer
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ScanStatus(pub u32);

impl ScanStatus {
    pub const SCAN_IDLE: u32 = 0x0002;
    pub const SCAN_TRIGGERED: u32 = 0x0004;
    pub const SCAN_START_TRANS: u32 = 0x0008;
    pub const SCAN_TRANSFER: u32 = 0x0010;
    pub const WAIT_FOR_EXT_TRIG: u32 = 0x0080;

    /// Scan data can be fetched
    pub fn data_ready(&self) -> bool {
        self.0 & Self::SCAN_TRANSFER != 0
    }

    pub fn is_idle(&self) -> bool {
        self.0 & Self::SCAN_IDLE != 0
    }

    /// A scan was started and its data is not available yet
    pub fn is_scanning(&self) -> bool {
        !self.data_ready() && !self.is_idle()
    }
}

/// Wavelength calibration source
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum CalibrationDataset {
    Factory,
    User,
}

impl CalibrationDataset {
    pub fn as_raw(&self) -> i16 {
        match self {
            Self::Factory => 0,
            Self::User => 1,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WavelengthCalibration {
    /// Wavelength in nanometres for every pixel
    pub wavelengths: Vec<f64>,
    pub min: f64,
    pub max: f64,
}

/// Compact CCD spectrometer (Thorlabs TLCCS)
pub trait SpectrometerBinding: VendorBinding {
    fn device_status(&mut self) -> Result<ScanStatus>;
    fn start_scan(&mut self) -> Result<()>;
    /// Intensities of the last completed scan, one value per pixel
    fn scan_data(&mut self) -> Result<Vec<f64>>;
    fn wavelength_data(&mut self, dataset: CalibrationDataset) -> Result<WavelengthCalibration>;

    /// Integration time in seconds
    fn integration_time(&mut self) -> Result<f64>;
    fn set_integration_time(&mut self, seconds: f64) -> Result<()>;
    /// Smallest and largest integration time the device accepts, in seconds
    fn integration_time_limits(&self) -> (f64, f64);
}

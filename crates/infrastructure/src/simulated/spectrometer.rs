use std::collections::VecDeque;

use domain::binding::{
    CalibrationDataset, ScanStatus, SpectrometerBinding, WavelengthCalibration,
};
use domain::{DeviceError, Result, StatusTranslator, VendorFamily};

use super::{Simulated, SimulatedDevice};
use crate::vendors::tlccs::{MAX_INTEGRATION_TIME, MIN_INTEGRATION_TIME};
use crate::vendors::visa::TLCCS_STATUS_TABLE;

/// CCS100 spectrometer with a short pixel array
#[derive(Debug, Clone)]
pub struct SpectrometerState {
    pub pixels: usize,
    pub integration_time: f64,
    pub scans_started: u32,
    /// Status words reported after a scan starts, one per status query.
    /// Once exhausted the scan reports its data ready.
    pub scan_statuses: VecDeque<u32>,
    pub intensity: f64,
    pub first_wavelength: f64,
    pub wavelength_step: f64,
    /// Whether a user calibration was written to the device
    pub user_calibration: bool,
    scanning: bool,
}

impl Default for SpectrometerState {
    fn default() -> Self {
        Self {
            pixels: 16,
            integration_time: MIN_INTEGRATION_TIME,
            scans_started: 0,
            scan_statuses: VecDeque::new(),
            intensity: 0.25,
            first_wavelength: 350.0,
            wavelength_step: 25.0,
            user_calibration: false,
            scanning: false,
        }
    }
}

impl SimulatedDevice for SpectrometerState {
    const FAMILY: VendorFamily = VendorFamily::Tlccs;

    fn status_table() -> &'static StatusTranslator {
        &TLCCS_STATUS_TABLE
    }
}

impl SpectrometerBinding for Simulated<SpectrometerState> {
    fn device_status(&mut self) -> Result<ScanStatus> {
        self.with("device_status", |s| {
            if !s.scanning {
                return Ok(ScanStatus(ScanStatus::SCAN_IDLE));
            }
            Ok(ScanStatus(
                s.scan_statuses
                    .pop_front()
                    .unwrap_or(ScanStatus::SCAN_TRANSFER),
            ))
        })
    }

    fn start_scan(&mut self) -> Result<()> {
        self.with("start_scan", |s| {
            s.scanning = true;
            s.scans_started += 1;
            Ok(())
        })
    }

    fn scan_data(&mut self) -> Result<Vec<f64>> {
        self.with("scan_data", |s| {
            s.scanning = false;
            // Scan number offsets the level so averaged sweeps are observable
            let level = s.intensity * f64::from(s.scans_started);
            Ok(vec![level; s.pixels])
        })
    }

    fn wavelength_data(&mut self, dataset: CalibrationDataset) -> Result<WavelengthCalibration> {
        self.with("wavelength_data", |s| {
            if dataset == CalibrationDataset::User && !s.user_calibration {
                return Err(DeviceError::InvalidArgument(
                    "no user calibration stored on the device".to_string(),
                ));
            }
            let wavelengths: Vec<f64> = (0..s.pixels)
                .map(|i| s.first_wavelength + s.wavelength_step * i as f64)
                .collect();
            let min = wavelengths.first().copied().unwrap_or_default();
            let max = wavelengths.last().copied().unwrap_or_default();
            Ok(WavelengthCalibration {
                wavelengths,
                min,
                max,
            })
        })
    }

    fn integration_time(&mut self) -> Result<f64> {
        self.with("integration_time", |s| Ok(s.integration_time))
    }

    fn set_integration_time(&mut self, seconds: f64) -> Result<()> {
        self.with("set_integration_time", |s| {
            s.integration_time = seconds;
            Ok(())
        })
    }

    fn integration_time_limits(&self) -> (f64, f64) {
        (MIN_INTEGRATION_TIME, MAX_INTEGRATION_TIME)
    }
}

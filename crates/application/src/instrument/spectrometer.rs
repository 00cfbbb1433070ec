use std::sync::Arc;
use std::thread;
use std::time::Duration;

use tracing::{debug, info};

use domain::binding::{CalibrationDataset, ScanStatus, SpectrometerBinding, WavelengthCalibration};
use domain::{DeviceError, DeviceIdentity, Result};
use infrastructure::config::SpectrometerSettings;

use crate::device::{DeviceSession, Instrument, SessionRegistry};

/// Scans of one sweep with the factory wavelength of every pixel
#[derive(Debug, Clone, PartialEq)]
pub struct Sweep {
    pub scans: Vec<Vec<f64>>,
    pub calibration: WavelengthCalibration,
}

/// TLCCS compact spectrometer
pub struct Spectrometer {
    session: DeviceSession<dyn SpectrometerBinding>,
    settings: SpectrometerSettings,
}

impl Spectrometer {
    pub fn new(
        identity: DeviceIdentity,
        binding: Box<dyn SpectrometerBinding>,
        registry: Arc<SessionRegistry>,
        settings: SpectrometerSettings,
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

    pub fn session(&self) -> &DeviceSession<dyn SpectrometerBinding> {
        &self.session
    }

    pub fn set_identity(&mut self, identity: DeviceIdentity) -> Result<()> {
        self.session.set_identity(identity)
    }

    pub fn device_status(&mut self) -> Result<ScanStatus> {
        self.session.call("device_status", |b| b.device_status())
    }

    /// Integration time in seconds
    pub fn integration_time(&mut self) -> Result<f64> {
        self.session.call("integration_time", |b| b.integration_time())
    }

    pub fn set_integration_time(&mut self, seconds: f64) -> Result<()> {
        self.session
            .call("set_integration_time", |b| apply_integration_time(b, seconds))
    }

    pub fn integration_time_limits(&mut self) -> Result<(f64, f64)> {
        self.session
            .call("integration_time_limits", |b| Ok(b.integration_time_limits()))
    }

    pub fn wavelengths(&mut self, dataset: CalibrationDataset) -> Result<WavelengthCalibration> {
        self.session
            .call("wavelengths", |b| b.wavelength_data(dataset))
    }

    /// Runs `count` scans, pausing `wait` between them.
    ///
    /// Each scan waits the settle delay after starting, then polls the
    /// device status until data is ready or the poll limit runs out.
    /// The factory calibration is read once the scans are in.
    pub fn sweep(&mut self, count: u32, wait: Duration) -> Result<Sweep> {
        let settings = self.settings.clone();
        let identity = self.session.identity().clone();
        self.session.call("sweep", |b| {
            if count == 0 {
                return Err(DeviceError::InvalidArgument(
                    "a sweep needs at least one scan".to_string(),
                ));
            }
            let mut scans = Vec::with_capacity(count as usize);
            for index in 0..count {
                if index > 0 {
                    thread::sleep(wait);
                }
                scans.push(scan(b, &settings)?);
                debug!(identity = %identity, scan = index + 1, count, "Scan complete");
            }
            let calibration = b.wavelength_data(CalibrationDataset::Factory)?;
            info!(identity = %identity, count, "Sweep complete");
            Ok(Sweep { scans, calibration })
        })
    }

    /// Pixel-wise mean of `count` back-to-back scans
    pub fn sweep_average(&mut self, count: u32) -> Result<Vec<f64>> {
        let Sweep { scans, .. } = self.sweep(count, Duration::ZERO)?;
        let pixels = scans.first().map_or(0, Vec::len);
        let mut mean = vec![0.0; pixels];
        for scan in &scans {
            for (sum, value) in mean.iter_mut().zip(scan) {
                *sum += value;
            }
        }
        let n = f64::from(count);
        mean.iter_mut().for_each(|v| *v /= n);
        Ok(mean)
    }

    /// Averaged sweep over the configured number of scans
    pub fn averaged_spectrum(&mut self) -> Result<Vec<f64>> {
        self.sweep_average(self.settings.average_count)
    }
}

fn apply_integration_time(binding: &mut dyn SpectrometerBinding, seconds: f64) -> Result<()> {
    let (min, max) = binding.integration_time_limits();
    DeviceError::check_range("integration time", seconds, min, max)?;
    binding.set_integration_time(seconds)
}

fn scan(binding: &mut dyn SpectrometerBinding, settings: &SpectrometerSettings) -> Result<Vec<f64>> {
    binding.start_scan()?;
    thread::sleep(settings.scan_settle());
    for _ in 0..settings.poll_limit {
        if binding.device_status()?.data_ready() {
            return binding.scan_data();
        }
        thread::sleep(settings.poll_interval());
    }
    Err(DeviceError::Timeout(format!(
        "scan data not ready after {} status polls",
        settings.poll_limit
    )))
}

impl Instrument for Spectrometer {
    /// Connects and applies the configured integration time
    fn open(&mut self) -> Result<()> {
        let seconds = self.settings.integration_time;
        self.session
            .open_with(|b| apply_integration_time(b, seconds))
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
    use infrastructure::simulated::{SimulatedSpectrometer, SimulatorControl, SpectrometerState};

    fn settings() -> SpectrometerSettings {
        SpectrometerSettings {
            integration_time: 0.01,
            average_count: 4,
            scan_settle_ms: 0,
            poll_interval_ms: 0,
            poll_limit: 5,
        }
    }

    fn spectrometer(state: SpectrometerState) -> (Spectrometer, SimulatorControl) {
        let binding = SimulatedSpectrometer::with_state(state);
        let control = binding.control();
        let spectrometer = Spectrometer::new(
            DeviceIdentity::new("M00412345").unwrap(),
            Box::new(binding),
            Arc::new(SessionRegistry::new()),
            settings(),
        );
        (spectrometer, control)
    }

    #[test]
    fn test_open_applies_integration_time() {
        let (mut spectrometer, _) = spectrometer(SpectrometerState::default());
        spectrometer.open().unwrap();
        assert_eq!(spectrometer.integration_time().unwrap(), 0.01);
    }

    #[test]
    fn test_integration_time_outside_limits_fails_open() {
        let (mut spectrometer, control) = spectrometer(SpectrometerState::default());
        spectrometer.settings.integration_time = 120.0;

        let err = spectrometer.open().unwrap_err();
        assert!(matches!(err, DeviceError::Validation { quantity: "integration time", .. }));
        assert!(!spectrometer.is_open());
        assert_eq!(control.call_count("set_integration_time"), 0);
    }

    #[test]
    fn test_sweep_polls_until_data_ready() {
        let mut state = SpectrometerState::default();
        state
            .scan_statuses
            .extend([ScanStatus::SCAN_TRIGGERED, ScanStatus::SCAN_TRIGGERED]);
        let (mut spectrometer, control) = spectrometer(state);
        spectrometer.open().unwrap();

        let sweep = spectrometer.sweep(2, Duration::ZERO).unwrap();
        assert_eq!(sweep.scans.len(), 2);
        assert_eq!(sweep.scans[0].len(), 16);
        assert_eq!(control.call_count("device_status"), 4);
    }

    #[test]
    fn test_sweep_carries_factory_wavelengths() {
        let (mut spectrometer, control) = spectrometer(SpectrometerState::default());
        spectrometer.open().unwrap();

        let sweep = spectrometer.sweep(1, Duration::ZERO).unwrap();
        assert_eq!(sweep.calibration.wavelengths.len(), sweep.scans[0].len());
        assert_eq!(
            sweep.calibration,
            spectrometer.wavelengths(CalibrationDataset::Factory).unwrap()
        );
        assert_eq!(control.call_count("wavelength_data"), 2);
    }

    #[test]
    fn test_sweep_times_out_when_data_never_arrives() {
        let mut state = SpectrometerState::default();
        state
            .scan_statuses
            .extend(std::iter::repeat_n(ScanStatus::SCAN_TRIGGERED, 10));
        let (mut spectrometer, _) = spectrometer(state);
        spectrometer.open().unwrap();

        let err = spectrometer.sweep(1, Duration::ZERO).unwrap_err();
        assert!(matches!(err, DeviceError::Timeout(_)));
    }

    #[test]
    fn test_sweep_average_is_pixel_mean() {
        let (mut spectrometer, _) = spectrometer(SpectrometerState::default());
        spectrometer.open().unwrap();

        // Scan n reads 0.25 * n on every pixel
        let mean = spectrometer.averaged_spectrum().unwrap();
        assert!(mean.iter().all(|v| (v - 0.625).abs() < 1e-12));
    }

    #[test]
    fn test_empty_sweep_is_rejected() {
        let (mut spectrometer, _) = spectrometer(SpectrometerState::default());
        spectrometer.open().unwrap();
        assert!(matches!(
            spectrometer.sweep(0, Duration::ZERO),
            Err(DeviceError::InvalidArgument(_))
        ));
    }
}

use std::sync::Arc;

use anyhow::{Context, Result, anyhow};
use serde_json::{Value, json};
use tracing::{debug, info};

use application::{
    Camera, DcServoMotor, DeviceManager, Instrument, PowerMeter, SessionRegistry, Solenoid,
    Spectrometer, StreamingPowerMeter,
};
use domain::binding::{Attribute, CalibrationDataset};
use domain::{DeviceError, DeviceIdentity, VendorFamily};
use infrastructure::BindingFactory;
use infrastructure::config::BenchConfig;

use crate::cli::Command;

/// Runs bench commands against one set of bindings.
///
/// Every command opens its instrument, does its work and closes it again,
/// so identities are free between commands.
pub struct Bench {
    config: BenchConfig,
    factory: BindingFactory,
    registry: Arc<SessionRegistry>,
}

impl Bench {
    pub fn new(config: BenchConfig, factory: BindingFactory) -> Self {
        Self {
            config,
            factory,
            registry: Arc::new(SessionRegistry::new()),
        }
    }

    pub fn from_config(config: BenchConfig, simulate: bool) -> Result<Self> {
        let factory = BindingFactory::from_config(&config, simulate)
            .context("Failed to set up vendor bindings")?;
        Ok(Self::new(config, factory))
    }

    pub fn config(&self) -> &BenchConfig {
        &self.config
    }

    pub fn run(&self, command: &Command) -> Result<Value> {
        match command {
            Command::List { family } => self.list(*family),
            Command::Motor {
                serial,
                stage,
                home,
                move_to,
            } => self.motor(serial, stage.as_deref(), *home, *move_to),
            Command::Solenoid {
                serial,
                mode,
                state,
            } => self.solenoid(serial, mode.as_deref(), state.as_deref()),
            Command::Power {
                resource,
                wavelength,
                count,
            } => self.power(resource, *wavelength, *count),
            Command::Spectrum {
                resource,
                scans,
                integration_time,
            } => self.spectrum(resource, *scans, *integration_time),
            Command::Camera {
                id,
                exposure,
                output,
            } => self.camera(id, *exposure, output.as_deref()),
            Command::Ophir { serial, channel } => self.ophir(serial, *channel),
        }
    }

    fn manager(&self, family: VendorFamily) -> domain::Result<DeviceManager> {
        Ok(DeviceManager::new(self.factory.discovery(family)?)
            .with_listing_cap(self.config.discovery.listing_cap))
    }

    /// Opens `identifier` through discovery, or directly for families the
    /// vendor library cannot enumerate.
    fn connect<I, F>(&self, family: VendorFamily, identifier: &str, build: F) -> Result<I>
    where
        I: Instrument,
        F: FnOnce(DeviceIdentity) -> domain::Result<I>,
    {
        match self.manager(family) {
            Ok(mut manager) => Ok(manager.connect(identifier, build)?),
            Err(DeviceError::InvalidConfig(reason)) => {
                debug!(%family, identifier, %reason, "Opening without discovery");
                let mut instrument = build(DeviceIdentity::new(identifier)?)?;
                instrument.open()?;
                Ok(instrument)
            }
            Err(e) => Err(e.into()),
        }
    }

    fn list(&self, family: VendorFamily) -> Result<Value> {
        let report = self
            .manager(family)
            .with_context(|| format!("Cannot enumerate {family} devices"))?
            .list_devices()?;
        info!(%family, devices = report.devices.len(), "Discovery complete");
        Ok(serde_json::to_value(&report)?)
    }

    fn motor(
        &self,
        serial: &str,
        stage: Option<&str>,
        home: bool,
        move_to: Option<f64>,
    ) -> Result<Value> {
        let stage = stage
            .map(|name| {
                self.config
                    .stage(name)
                    .ok_or_else(|| anyhow!("No stage named '{name}' in the configuration"))
            })
            .transpose()?;

        let mut motor = self.connect(VendorFamily::KCubeDcServo, serial, |identity| {
            Ok(DcServoMotor::new(
                identity,
                self.factory.motion()?,
                self.registry.clone(),
                self.config.motion.clone(),
            )
            .with_verbose(self.config.verbose))
        })?;

        if let Some(stage) = stage {
            motor.apply_stage(stage)?;
        }
        let homed = if home { motor.home()? } else { false };
        if let Some(target) = move_to {
            motor.move_to(target)?;
        }
        let position = motor.position()?;
        motor.close()?;

        Ok(json!({
            "serial": serial,
            "homed": homed,
            "position": position,
        }))
    }

    fn solenoid(&self, serial: &str, mode: Option<&str>, state: Option<&str>) -> Result<Value> {
        let mut solenoid = self.connect(VendorFamily::KCubeSolenoid, serial, |identity| {
            Ok(Solenoid::new(identity, self.factory.solenoid()?, self.registry.clone())
                .with_verbose(self.config.verbose))
        })?;

        if let Some(mode) = mode {
            solenoid.set_operating_mode_named(mode)?;
        }
        if let Some(state) = state {
            solenoid.set_operating_state_named(state)?;
        }
        let output = json!({
            "serial": serial,
            "operating_mode": solenoid.operating_mode()?,
            "operating_state": solenoid.operating_state()?,
            "solenoid_state": solenoid.solenoid_state()?,
        });
        solenoid.close()?;
        Ok(output)
    }

    fn power(&self, resource: &str, wavelength: Option<f64>, count: u32) -> Result<Value> {
        let mut meter = self.connect(VendorFamily::Tlpm, resource, |identity| {
            Ok(PowerMeter::new(
                identity,
                self.factory.power_meter()?,
                self.registry.clone(),
                self.config.power_meter.clone(),
            )
            .with_verbose(self.config.verbose))
        })?;

        if let Some(nm) = wavelength {
            meter.set_wavelength(nm)?;
        }
        let readings = (0..count.max(1))
            .map(|_| meter.measure())
            .collect::<domain::Result<Vec<_>>>()?;
        let wavelength = meter.wavelength(Attribute::Set)?;
        meter.close()?;

        Ok(json!({
            "resource": resource,
            "wavelength": wavelength,
            "readings": readings,
        }))
    }

    fn spectrum(
        &self,
        resource: &str,
        scans: Option<u32>,
        integration_time: Option<f64>,
    ) -> Result<Value> {
        let mut spectrometer = self.connect(VendorFamily::Tlccs, resource, |identity| {
            Ok(Spectrometer::new(
                identity,
                self.factory.spectrometer()?,
                self.registry.clone(),
                self.config.spectrometer.clone(),
            )
            .with_verbose(self.config.verbose))
        })?;

        if let Some(seconds) = integration_time {
            spectrometer.set_integration_time(seconds)?;
        }
        let intensities = match scans {
            Some(count) => spectrometer.sweep_average(count)?,
            None => spectrometer.averaged_spectrum()?,
        };
        let calibration = spectrometer.wavelengths(CalibrationDataset::Factory)?;
        let integration_time = spectrometer.integration_time()?;
        spectrometer.close()?;

        Ok(json!({
            "resource": resource,
            "integration_time": integration_time,
            "wavelengths": calibration.wavelengths,
            "intensities": intensities,
        }))
    }

    fn camera(
        &self,
        id: &str,
        exposure: Option<f64>,
        output: Option<&std::path::Path>,
    ) -> Result<Value> {
        let mut camera = self.connect(VendorFamily::Ueye, id, |identity| {
            Ok(Camera::new(
                identity,
                self.factory.camera()?,
                self.registry.clone(),
                self.config.camera.clone(),
            )
            .with_verbose(self.config.verbose))
        })?;

        if let Some(millis) = exposure {
            camera.set_exposure(millis)?;
        }
        let frame = camera.capture()?;
        let exposure = camera.exposure()?;
        camera.close()?;

        if let Some(path) = output {
            std::fs::write(path, &frame.data)
                .with_context(|| format!("Failed to write frame to {}", path.display()))?;
            info!(path = %path.display(), bytes = frame.data.len(), "Frame written");
        }

        Ok(json!({
            "id": id,
            "width": frame.width,
            "height": frame.height,
            "bits_per_pixel": frame.bits_per_pixel,
            "bytes": frame.data.len(),
            "exposure": exposure,
        }))
    }

    fn ophir(&self, serial: &str, channel: Option<u32>) -> Result<Value> {
        let mut settings = self.config.streaming.clone();
        if let Some(channel) = channel {
            settings.channel = channel;
        }
        let channel = settings.channel;

        let mut meter = self.connect(VendorFamily::Ophir, serial, |identity| {
            Ok(StreamingPowerMeter::new(
                identity,
                self.factory.streaming_meter()?,
                self.registry.clone(),
                settings,
            )
            .with_verbose(self.config.verbose))
        })?;

        let power = meter.read_power()?;
        meter.close()?;

        Ok(json!({
            "serial": serial,
            "channel": channel,
            "power": power,
        }))
    }
}

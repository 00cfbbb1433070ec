//! Factory for vendor bindings
//!
//! Native bindings load the vendor library once per family and share it
//! between every binding of that family. Simulated bindings need nothing.

use std::collections::HashMap;
use std::path::PathBuf;
use std::sync::Arc;

use domain::binding::{
    CameraBinding, MotionBinding, PowerMeterBinding, SolenoidBinding, SpectrometerBinding,
    StreamingMeterBinding,
};
use domain::{DeviceError, DiscoveryBinding, Result, VendorFamily};
use libloading::Library;
use parking_lot::Mutex;

use crate::config::BenchConfig;
use crate::ffi::load_library;
use crate::locator::LibraryLocator;
use crate::simulated::{
    SimulatedCamera, SimulatedDiscovery, SimulatedMotion, SimulatedPowerMeter,
    SimulatedSolenoid, SimulatedSpectrometer, SimulatedStreamingMeter,
};
use crate::vendors::kinesis::{
    KCUBE_DC_SERVO_TYPE_ID, KCUBE_SOLENOID_TYPE_ID, KCubeDcServoBinding, KCubeSolenoidBinding,
    KinesisDiscovery,
};
use crate::vendors::tlccs::TlccsBinding;
use crate::vendors::tlpm::{TlpmBinding, TlpmDiscovery};
use crate::vendors::ueye::{UeyeBinding, UeyeDiscovery};

/// Devices listed per family by simulated discovery
const SIMULATED_DEVICES: usize = 2;

struct NativeLibraries {
    locator: LibraryLocator,
    overrides: HashMap<String, PathBuf>,
    loaded: Mutex<HashMap<VendorFamily, Arc<Library>>>,
}

impl NativeLibraries {
    fn path(&self, family: VendorFamily, library: &str) -> Result<PathBuf> {
        // Configuration keys arrive lowercased
        let configured = self
            .overrides
            .iter()
            .find(|(name, _)| name.eq_ignore_ascii_case(family.as_str()))
            .map(|(_, path)| path.clone());
        match configured {
            Some(path) => Ok(path),
            None => self.locator.locate(library, family.install_folder()),
        }
    }

    fn load(&self, family: VendorFamily) -> Result<Arc<Library>> {
        let mut loaded = self.loaded.lock();
        if let Some(library) = loaded.get(&family) {
            return Ok(library.clone());
        }
        let name = family.library_name().ok_or_else(|| {
            DeviceError::InvalidConfig(format!("{family} has no native library binding"))
        })?;
        let library = load_library(&self.path(family, name)?)?;
        tracing::info!(family = %family, library = name, "Vendor library loaded");
        loaded.insert(family, library.clone());
        Ok(library)
    }
}

enum Source {
    Native(NativeLibraries),
    Simulated,
}

/// Factory for creating vendor bindings
pub struct BindingFactory {
    source: Source,
}

impl BindingFactory {
    /// Bindings over the vendor libraries found by `locator`
    pub fn native(locator: LibraryLocator) -> Self {
        Self::native_with_overrides(locator, HashMap::new())
    }

    pub fn native_with_overrides(
        locator: LibraryLocator,
        overrides: HashMap<String, PathBuf>,
    ) -> Self {
        Self {
            source: Source::Native(NativeLibraries {
                locator,
                overrides,
                loaded: Mutex::new(HashMap::new()),
            }),
        }
    }

    pub fn simulated() -> Self {
        Self {
            source: Source::Simulated,
        }
    }

    pub fn from_config(config: &BenchConfig, simulate: bool) -> Result<Self> {
        if simulate {
            return Ok(Self::simulated());
        }
        let locator = LibraryLocator::from_config(&config.libraries)?;
        Ok(Self::native_with_overrides(
            locator,
            config.libraries.overrides.clone(),
        ))
    }

    pub fn is_simulated(&self) -> bool {
        matches!(self.source, Source::Simulated)
    }

    pub fn motion(&self) -> Result<Box<dyn MotionBinding>> {
        match &self.source {
            Source::Simulated => Ok(Box::new(SimulatedMotion::new())),
            Source::Native(libs) => Ok(Box::new(KCubeDcServoBinding::new(
                libs.load(VendorFamily::KCubeDcServo)?,
            )?)),
        }
    }

    pub fn solenoid(&self) -> Result<Box<dyn SolenoidBinding>> {
        match &self.source {
            Source::Simulated => Ok(Box::new(SimulatedSolenoid::new())),
            Source::Native(libs) => Ok(Box::new(KCubeSolenoidBinding::new(
                libs.load(VendorFamily::KCubeSolenoid)?,
            )?)),
        }
    }

    pub fn power_meter(&self) -> Result<Box<dyn PowerMeterBinding>> {
        match &self.source {
            Source::Simulated => Ok(Box::new(SimulatedPowerMeter::new())),
            Source::Native(libs) => Ok(Box::new(TlpmBinding::new(libs.load(VendorFamily::Tlpm)?)?)),
        }
    }

    pub fn spectrometer(&self) -> Result<Box<dyn SpectrometerBinding>> {
        match &self.source {
            Source::Simulated => Ok(Box::new(SimulatedSpectrometer::new())),
            Source::Native(libs) => Ok(Box::new(TlccsBinding::new(
                libs.load(VendorFamily::Tlccs)?,
            )?)),
        }
    }

    pub fn camera(&self) -> Result<Box<dyn CameraBinding>> {
        match &self.source {
            Source::Simulated => Ok(Box::new(SimulatedCamera::new())),
            Source::Native(libs) => Ok(Box::new(UeyeBinding::new(libs.load(VendorFamily::Ueye)?)?)),
        }
    }

    pub fn streaming_meter(&self) -> Result<Box<dyn StreamingMeterBinding>> {
        match &self.source {
            Source::Simulated => Ok(Box::new(SimulatedStreamingMeter::new())),
            Source::Native(_) => Err(DeviceError::InvalidConfig(
                "Ophir meters are only available simulated".to_string(),
            )),
        }
    }

    pub fn discovery(&self, family: VendorFamily) -> Result<Box<dyn DiscoveryBinding>> {
        let libs = match &self.source {
            Source::Simulated => {
                return Ok(Box::new(SimulatedDiscovery::populated(
                    family,
                    SIMULATED_DEVICES,
                )));
            }
            Source::Native(libs) => libs,
        };
        match family {
            VendorFamily::KCubeDcServo => Ok(Box::new(KinesisDiscovery::new(
                family,
                KCUBE_DC_SERVO_TYPE_ID,
                libs.load(family)?,
            )?)),
            VendorFamily::KCubeSolenoid => Ok(Box::new(KinesisDiscovery::new(
                family,
                KCUBE_SOLENOID_TYPE_ID,
                libs.load(family)?,
            )?)),
            VendorFamily::Tlpm => Ok(Box::new(TlpmDiscovery::new(libs.load(family)?)?)),
            VendorFamily::Ueye => Ok(Box::new(UeyeDiscovery::new(libs.load(family)?)?)),
            VendorFamily::Tlccs | VendorFamily::Ophir => Err(DeviceError::InvalidConfig(format!(
                "{family} does not support discovery"
            ))),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use domain::{DeviceIdentity, VendorBinding};

    #[test]
    fn test_simulated_bindings() {
        let factory = BindingFactory::simulated();
        assert!(factory.is_simulated());

        let mut motion = factory.motion().unwrap();
        assert_eq!(motion.family(), VendorFamily::KCubeDcServo);
        motion.connect(&DeviceIdentity::new("27000001").unwrap()).unwrap();
        assert_eq!(motion.position().unwrap(), 0);

        assert_eq!(factory.camera().unwrap().family(), VendorFamily::Ueye);
        assert_eq!(factory.streaming_meter().unwrap().family(), VendorFamily::Ophir);
    }

    #[test]
    fn test_simulated_discovery_for_every_family() {
        let factory = BindingFactory::simulated();
        for family in [VendorFamily::Tlpm, VendorFamily::Ophir] {
            let mut discovery = factory.discovery(family).unwrap();
            assert_eq!(discovery.count_devices().unwrap(), SIMULATED_DEVICES as u32);
        }
    }

    #[test]
    fn test_native_without_library_fails() {
        let dir = tempfile::tempdir().unwrap();
        let locator = LibraryLocator::new(dir.path().join("store.csv"), dir.path());
        let factory = BindingFactory::native(locator);

        let err = factory.motion().err().unwrap();
        assert!(matches!(err, DeviceError::Library { .. }));
        assert!(matches!(
            factory.streaming_meter().err().unwrap(),
            DeviceError::InvalidConfig(_)
        ));
        assert!(matches!(
            factory.discovery(VendorFamily::Tlccs).err().unwrap(),
            DeviceError::InvalidConfig(_)
        ));
    }

    #[test]
    fn test_override_is_used_before_locator() {
        let dir = tempfile::tempdir().unwrap();
        let locator = LibraryLocator::new(dir.path().join("store.csv"), dir.path());
        let overrides = HashMap::from([(
            "tlpm".to_string(),
            dir.path().join("custom").join("TLPM_64.dll"),
        )]);
        let factory = BindingFactory::native_with_overrides(locator.clone(), overrides);

        // The override path does not exist, so loading fails without touching the store
        let err = factory.power_meter().err().unwrap();
        assert!(matches!(err, DeviceError::Library { ref library, .. } if library.contains("custom")));
        assert!(locator.records().unwrap().is_empty());
    }
}

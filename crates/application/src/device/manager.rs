use serde::Serialize;
use tracing::{info, warn};

use domain::{DeviceError, DeviceIdentity, DeviceListing, DiscoveryBinding, Result, VendorFamily};

use super::Instrument;

pub const DEFAULT_LISTING_CAP: usize = 10;

/// Notice attached to a listing that is not the full picture
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub enum DiscoveryWarning {
    NoDevicesFound,
    /// More devices are connected than the listing cap allows
    Truncated { reported: u32, cap: usize },
}

impl std::fmt::Display for DiscoveryWarning {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::NoDevicesFound => write!(f, "no devices found"),
            Self::Truncated { reported, cap } => {
                write!(f, "{reported} devices reported, only the first {cap} are listed")
            }
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DiscoveryReport {
    pub family: VendorFamily,
    pub devices: Vec<DeviceListing>,
    pub warnings: Vec<DiscoveryWarning>,
}

/// Enumerates the devices of one vendor family and opens sessions on them
pub struct DeviceManager {
    discovery: Box<dyn DiscoveryBinding>,
    listing_cap: usize,
}

impl DeviceManager {
    pub fn new(discovery: Box<dyn DiscoveryBinding>) -> Self {
        Self {
            discovery,
            listing_cap: DEFAULT_LISTING_CAP,
        }
    }

    pub fn with_listing_cap(mut self, cap: usize) -> Self {
        self.listing_cap = cap;
        self
    }

    pub fn family(&self) -> VendorFamily {
        self.discovery.family()
    }

    pub fn listing_cap(&self) -> usize {
        self.listing_cap
    }

    /// Number of connected devices; zero is not an error
    pub fn count_devices(&mut self) -> Result<u32> {
        self.discovery.count_devices()
    }

    /// Fresh listing of at most `listing_cap` devices
    pub fn list_devices(&mut self) -> Result<DiscoveryReport> {
        let family = self.family();
        let reported = self.discovery.count_devices()?;
        let mut warnings = Vec::new();

        if reported == 0 {
            warn!(family = %family, "No devices found");
            warnings.push(DiscoveryWarning::NoDevicesFound);
            return Ok(DiscoveryReport {
                family,
                devices: Vec::new(),
                warnings,
            });
        }

        let mut devices = self.discovery.list_devices(self.listing_cap)?;
        devices.truncate(self.listing_cap);
        if reported as usize > self.listing_cap {
            warn!(
                family = %family,
                reported,
                cap = self.listing_cap,
                "More devices connected than the listing cap, listing truncated"
            );
            warnings.push(DiscoveryWarning::Truncated {
                reported,
                cap: self.listing_cap,
            });
        }

        info!(family = %family, count = devices.len(), "Devices listed");
        Ok(DiscoveryReport {
            family,
            devices,
            warnings,
        })
    }

    /// Entry for `identifier` in a fresh, uncapped listing
    pub fn find(&mut self, identifier: &str) -> Result<DeviceListing> {
        let reported = self.discovery.count_devices()? as usize;
        self.discovery
            .list_devices(reported)?
            .into_iter()
            .find(|entry| entry.identifier == identifier)
            .ok_or_else(|| {
                DeviceError::DeviceNotFound(format!("{} {identifier}", self.discovery.family()))
            })
    }

    /// Builds and opens an instrument for `identifier`.
    ///
    /// Devices the vendor flags as in use are refused with `DeviceBusy`
    /// before `build` runs.
    pub fn connect<I, F>(&mut self, identifier: &str, build: F) -> Result<I>
    where
        I: Instrument,
        F: FnOnce(DeviceIdentity) -> Result<I>,
    {
        let entry = self.find(identifier)?;
        if entry.in_use {
            warn!(identifier, family = %entry.family, "Device is in use by another client");
            return Err(DeviceError::DeviceBusy {
                identity: entry.identifier,
                reason: "vendor reports the device in use".to_string(),
            });
        }

        let mut instrument = build(DeviceIdentity::new(entry.identifier)?)?;
        instrument.open()?;
        Ok(instrument)
    }
}

use std::sync::Arc;

use domain::{DeviceListing, DiscoveryBinding, Result, VendorFamily};
use parking_lot::Mutex;

use super::SimulatorControl;
use crate::vendors::status_table;

/// Device enumeration over a shared, editable list
pub struct SimulatedDiscovery {
    family: VendorFamily,
    devices: Arc<Mutex<Vec<DeviceListing>>>,
    control: SimulatorControl,
}

impl SimulatedDiscovery {
    pub fn new(family: VendorFamily, devices: Vec<DeviceListing>) -> Self {
        Self {
            family,
            devices: Arc::new(Mutex::new(devices)),
            control: SimulatorControl::new(),
        }
    }

    /// `count` devices with serials derived from the family's usual numbering
    pub fn populated(family: VendorFamily, count: usize) -> Self {
        let devices = (0..count)
            .map(|i| DeviceListing::new(family, sample_identifier(family, i)))
            .collect();
        Self::new(family, devices)
    }

    pub fn devices(&self) -> Arc<Mutex<Vec<DeviceListing>>> {
        self.devices.clone()
    }

    pub fn control(&self) -> SimulatorControl {
        self.control.clone()
    }

    fn call(&self, operation: &str) -> Result<()> {
        status_table(self.family).check(self.control.record(operation), operation)
    }
}

impl DiscoveryBinding for SimulatedDiscovery {
    fn family(&self) -> VendorFamily {
        self.family
    }

    fn count_devices(&mut self) -> Result<u32> {
        self.call("count_devices")?;
        Ok(self.devices.lock().len() as u32)
    }

    fn list_devices(&mut self, limit: usize) -> Result<Vec<DeviceListing>> {
        self.call("list_devices")?;
        Ok(self.devices.lock().iter().take(limit).cloned().collect())
    }
}

fn sample_identifier(family: VendorFamily, index: usize) -> String {
    match family {
        VendorFamily::KCubeDcServo => format!("{}", 27_000_001 + index),
        VendorFamily::KCubeSolenoid => format!("{}", 68_000_001 + index),
        VendorFamily::Tlpm => format!("USB0::0x1313::0x8072::P2{index:06}::INSTR"),
        VendorFamily::Tlccs => format!("USB0::0x1313::0x8081::M00{index:06}::RAW"),
        VendorFamily::Ueye => format!("{}", index + 1),
        VendorFamily::Ophir => format!("{}", 591_000 + index),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_listing_respects_limit() {
        let mut discovery = SimulatedDiscovery::populated(VendorFamily::KCubeDcServo, 12);
        assert_eq!(discovery.count_devices().unwrap(), 12);
        let listed = discovery.list_devices(10).unwrap();
        assert_eq!(listed.len(), 10);
        assert_eq!(listed[0].identifier, "27000001");
    }

    #[test]
    fn test_injected_failure() {
        let mut discovery = SimulatedDiscovery::populated(VendorFamily::Ueye, 1);
        discovery.control().fail_next("count_devices", 3, 1);
        assert!(discovery.count_devices().is_err());
        assert_eq!(discovery.count_devices().unwrap(), 1);
    }
}

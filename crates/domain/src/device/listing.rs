use crate::device::VendorFamily;
use serde::{Deserialize, Serialize};

/// One device reported by a vendor's discovery call.
///
/// Listings are snapshots: a session built from an entry keeps only the
/// identifier, never the entry itself.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DeviceListing {
    pub family: VendorFamily,
    /// Serial number, VISA resource name or camera ID
    pub identifier: String,
    pub model: String,
    pub serial: String,
    pub description: String,
    /// Advisory flag set by the vendor when another client holds the device
    pub in_use: bool,
}

impl DeviceListing {
    pub fn new(family: VendorFamily, identifier: impl Into<String>) -> Self {
        let identifier = identifier.into();
        Self {
            family,
            serial: identifier.clone(),
            identifier,
            model: String::new(),
            description: String::new(),
            in_use: false,
        }
    }

    pub fn with_model(mut self, model: impl Into<String>) -> Self {
        self.model = model.into();
        self
    }

    pub fn with_serial(mut self, serial: impl Into<String>) -> Self {
        self.serial = serial.into();
        self
    }

    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = description.into();
        self
    }

    pub fn in_use(mut self, in_use: bool) -> Self {
        self.in_use = in_use;
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_listing_creation() {
        let listing = DeviceListing::new(VendorFamily::Ueye, "1")
            .with_model("UI164xLE-C")
            .with_serial("4102712345")
            .in_use(true);

        assert_eq!(listing.identifier, "1");
        assert_eq!(listing.serial, "4102712345");
        assert_eq!(listing.model, "UI164xLE-C");
        assert!(listing.in_use);
    }

    #[test]
    fn test_serial_defaults_to_identifier() {
        let listing = DeviceListing::new(VendorFamily::KCubeDcServo, "27000001");
        assert_eq!(listing.serial, "27000001");
        assert!(!listing.in_use);
    }
}

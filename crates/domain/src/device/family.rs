use serde::{Deserialize, Serialize};

/// Vendor library family a binding talks to
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum VendorFamily {
    /// Thorlabs Kinesis KCube DC servo controllers
    #[serde(rename = "KCubeDCServo")]
    KCubeDcServo,
    /// Thorlabs Kinesis KCube solenoid controllers
    KCubeSolenoid,
    /// Thorlabs optical power meters (TLPM)
    #[serde(rename = "TLPM")]
    Tlpm,
    /// Thorlabs compact CCD spectrometers (TLCCS)
    #[serde(rename = "TLCCS")]
    Tlccs,
    /// IDS uEye cameras
    #[serde(rename = "uEye")]
    Ueye,
    /// Ophir power meters through the StarLab COM object
    Ophir,
}

impl VendorFamily {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::KCubeDcServo => "KCubeDCServo",
            Self::KCubeSolenoid => "KCubeSolenoid",
            Self::Tlpm => "TLPM",
            Self::Tlccs => "TLCCS",
            Self::Ueye => "uEye",
            Self::Ophir => "Ophir",
        }
    }

    /// File name of the vendor's dynamic library, `None` for COM-only vendors
    pub fn library_name(&self) -> Option<&'static str> {
        match self {
            Self::KCubeDcServo => Some("Thorlabs.MotionControl.KCube.DCServo.dll"),
            Self::KCubeSolenoid => Some("Thorlabs.MotionControl.KCube.Solenoid.dll"),
            Self::Tlpm => Some("TLPM_64.dll"),
            Self::Tlccs => Some("TLCCS_64.dll"),
            Self::Ueye => Some("uEye_api_64.dll"),
            Self::Ophir => None,
        }
    }

    /// Folder under the installation root holding the vendor library
    pub fn install_folder(&self) -> &'static str {
        match self {
            Self::KCubeDcServo | Self::KCubeSolenoid => "Thorlabs",
            Self::Tlpm | Self::Tlccs => "IVI Foundation",
            Self::Ueye => "IDS",
            Self::Ophir => "Ophir Optronics",
        }
    }
}

impl std::fmt::Display for VendorFamily {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for VendorFamily {
    type Err = crate::error::DeviceError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "kcubedcservo" | "dcservo" | "motor" => Ok(Self::KCubeDcServo),
            "kcubesolenoid" | "solenoid" => Ok(Self::KCubeSolenoid),
            "tlpm" | "power" => Ok(Self::Tlpm),
            "tlccs" | "spectrometer" => Ok(Self::Tlccs),
            "ueye" | "camera" => Ok(Self::Ueye),
            "ophir" => Ok(Self::Ophir),
            other => Err(crate::error::DeviceError::InvalidArgument(format!(
                "unknown vendor family '{other}'"
            ))),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_vendor_family_as_str() {
        assert_eq!(VendorFamily::KCubeDcServo.as_str(), "KCubeDCServo");
        assert_eq!(VendorFamily::Tlpm.as_str(), "TLPM");
        assert_eq!(VendorFamily::Ueye.as_str(), "uEye");
    }

    #[test]
    fn test_library_names() {
        assert_eq!(VendorFamily::Tlccs.library_name(), Some("TLCCS_64.dll"));
        assert_eq!(VendorFamily::Ophir.library_name(), None);
        assert_eq!(VendorFamily::KCubeSolenoid.install_folder(), "Thorlabs");
    }

    #[test]
    fn test_parse_family() {
        assert_eq!("camera".parse::<VendorFamily>().unwrap(), VendorFamily::Ueye);
        assert_eq!("TLPM".parse::<VendorFamily>().unwrap(), VendorFamily::Tlpm);
        assert!("oscilloscope".parse::<VendorFamily>().is_err());
    }

    #[test]
    fn test_serde_names() {
        assert_eq!(
            serde_json::to_string(&VendorFamily::Tlccs).unwrap(),
            "\"TLCCS\""
        );
    }
}

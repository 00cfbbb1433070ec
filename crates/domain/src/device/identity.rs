use crate::error::{DeviceError, Result};
use serde::{Deserialize, Serialize};

/// Value object naming one physical device for its vendor library
///
/// Kinesis uses the controller serial number, VISA drivers a resource name
/// such as `USB0::0x1313::0x8078::P0001234::INSTR`, uEye the camera ID.
///
/// Rules:
/// - Must be non-empty
/// - Must not contain control characters (identities are passed as C strings)
/// - Max length 256 characters (VISA resource buffer size)
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct DeviceIdentity(String);

impl DeviceIdentity {
    pub const MAX_LEN: usize = 256;

    /// Create a new DeviceIdentity with validation
    pub fn new(id: impl Into<String>) -> Result<Self> {
        let id = id.into();

        if id.trim().is_empty() {
            return Err(DeviceError::InvalidIdentity(
                "Device identity cannot be empty".to_string(),
            ));
        }

        if id.len() > Self::MAX_LEN {
            return Err(DeviceError::InvalidIdentity(format!(
                "Device identity too long: {} chars (max {})",
                id.len(),
                Self::MAX_LEN
            )));
        }

        if id.chars().any(char::is_control) {
            return Err(DeviceError::InvalidIdentity(format!(
                "Device identity {id:?} contains control characters"
            )));
        }

        Ok(Self(id))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Numeric form, for vendors that address devices by integer ID
    pub fn as_number<T: std::str::FromStr>(&self) -> Result<T> {
        self.0.trim().parse::<T>().map_err(|_| {
            DeviceError::InvalidIdentity(format!("Device identity {} is not numeric", self.0))
        })
    }
}

impl TryFrom<String> for DeviceIdentity {
    type Error = DeviceError;

    fn try_from(value: String) -> Result<Self> {
        Self::new(value)
    }
}

impl From<DeviceIdentity> for String {
    fn from(value: DeviceIdentity) -> Self {
        value.0
    }
}

impl std::fmt::Display for DeviceIdentity {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

use thiserror::Error;

use crate::status::{Outcome, RawStatus};

/// Errors raised by device sessions and the bindings beneath them
#[derive(Error, Debug, Clone, PartialEq)]
pub enum DeviceError {
    #[error("Device {identity} is not in session, cannot {operation}")]
    NotInSession {
        identity: String,
        operation: &'static str,
    },

    #[error("Device {identity} is busy: {reason}")]
    DeviceBusy { identity: String, reason: String },

    #[error("Device not found: {0}")]
    DeviceNotFound(String),

    #[error("Identity of device {0} cannot change while it is open")]
    IdentityLocked(String),

    #[error("Invalid device identity: {0}")]
    InvalidIdentity(String),

    #[error("{vendor} {context} failed with error code {code} ({outcome}): {message}")]
    VendorStatus {
        vendor: &'static str,
        context: String,
        code: RawStatus,
        outcome: Outcome,
        message: String,
    },

    #[error("Parameter block {block} has no field '{field}'")]
    SchemaMismatch { block: &'static str, field: String },

    #[error("Cannot assign {value} to {block}.{field}")]
    ValueCoercion {
        block: &'static str,
        field: String,
        value: String,
    },

    #[error("{quantity} {value} is outside the device range [{min}, {max}]")]
    Validation {
        quantity: &'static str,
        value: f64,
        min: f64,
        max: f64,
    },

    #[error("Invalid argument: {0}")]
    InvalidArgument(String),

    #[error("Library {library} unavailable: {message}")]
    Library { library: String, message: String },

    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    #[error("Timed out: {0}")]
    Timeout(String),
}

impl DeviceError {
    /// Outcome of a vendor failure, `None` for errors raised before the vendor was called
    pub fn outcome(&self) -> Option<Outcome> {
        match self {
            Self::VendorStatus { outcome, .. } => Some(*outcome),
            _ => None,
        }
    }

    pub fn is_retryable(&self) -> bool {
        matches!(self.outcome(), Some(Outcome::RetryableFailure))
    }

    /// Checks `value` against the closed range reported by a device.
    pub fn check_range(quantity: &'static str, value: f64, min: f64, max: f64) -> Result<()> {
        if value.is_nan() || value < min || value > max {
            return Err(Self::Validation {
                quantity,
                value,
                min,
                max,
            });
        }
        Ok(())
    }
}

pub type Result<T> = std::result::Result<T, DeviceError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_check_range_accepts_bounds() {
        assert!(DeviceError::check_range("wavelength", 1.0, 1.0, 10.0).is_ok());
        assert!(DeviceError::check_range("wavelength", 10.0, 1.0, 10.0).is_ok());
    }

    #[test]
    fn test_check_range_rejects_outside() {
        let err = DeviceError::check_range("wavelength", 11.0, 1.0, 10.0).unwrap_err();
        assert_eq!(
            err,
            DeviceError::Validation {
                quantity: "wavelength",
                value: 11.0,
                min: 1.0,
                max: 10.0
            }
        );
        assert!(DeviceError::check_range("wavelength", f64::NAN, 1.0, 10.0).is_err());
    }

    #[test]
    fn test_vendor_status_message_carries_code() {
        let err = DeviceError::VendorStatus {
            vendor: "uEye",
            context: "open".to_string(),
            code: 3,
            outcome: Outcome::FatalFailure,
            message: "cannot open device".to_string(),
        };
        let text = err.to_string();
        assert!(text.contains("error code 3"));
        assert!(text.contains("cannot open device"));
        assert_eq!(err.outcome(), Some(Outcome::FatalFailure));
        assert!(!err.is_retryable());
    }
}

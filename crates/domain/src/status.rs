use serde::{Deserialize, Serialize};

use crate::error::{DeviceError, Result};

/// Raw status code returned by a vendor entry point.
///
/// Kinesis returns a `short`, uEye an `INT` and VISA drivers a `ViStatus`;
/// all of them fit in an `i32`.
pub type RawStatus = i32;

/// Normalized result of a vendor call
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Outcome {
    Success,
    /// The device may succeed if the same call is issued again
    RetryableFailure,
    FatalFailure,
}

impl Outcome {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Success => "success",
            Self::RetryableFailure => "retryable",
            Self::FatalFailure => "fatal",
        }
    }

    pub fn is_success(&self) -> bool {
        matches!(self, Self::Success)
    }

    pub fn is_retryable(&self) -> bool {
        matches!(self, Self::RetryableFailure)
    }

    pub fn is_fatal(&self) -> bool {
        matches!(self, Self::FatalFailure)
    }
}

impl std::fmt::Display for Outcome {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// One row of a vendor status table
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct StatusEntry {
    pub code: RawStatus,
    pub outcome: Outcome,
    pub message: &'static str,
}

impl StatusEntry {
    pub const fn success(code: RawStatus, message: &'static str) -> Self {
        Self {
            code,
            outcome: Outcome::Success,
            message,
        }
    }

    pub const fn retryable(code: RawStatus, message: &'static str) -> Self {
        Self {
            code,
            outcome: Outcome::RetryableFailure,
            message,
        }
    }

    pub const fn fatal(code: RawStatus, message: &'static str) -> Self {
        Self {
            code,
            outcome: Outcome::FatalFailure,
            message,
        }
    }
}

/// Translated form of a raw status
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Translation {
    pub code: RawStatus,
    pub outcome: Outcome,
    pub message: String,
}

/// Table-driven translation of a vendor's status codes.
///
/// Rules:
/// - Code 0 is always success, whether or not the table lists it
/// - Codes missing from the table are fatal with the message "unknown error code N"
/// - The translator never retries anything itself
#[derive(Debug, Clone, Copy)]
pub struct StatusTranslator {
    vendor: &'static str,
    entries: &'static [StatusEntry],
}

impl StatusTranslator {
    pub const SUCCESS: RawStatus = 0;

    pub const fn new(vendor: &'static str, entries: &'static [StatusEntry]) -> Self {
        Self { vendor, entries }
    }

    pub fn vendor(&self) -> &'static str {
        self.vendor
    }

    pub fn lookup(&self, code: RawStatus) -> Option<&StatusEntry> {
        self.entries.iter().find(|entry| entry.code == code)
    }

    pub fn translate(&self, code: RawStatus) -> Translation {
        match (code, self.lookup(code)) {
            (Self::SUCCESS, entry) => Translation {
                code,
                outcome: Outcome::Success,
                message: entry.map_or("success", |e| e.message).to_string(),
            },
            (_, Some(entry)) => Translation {
                code,
                outcome: entry.outcome,
                message: entry.message.to_string(),
            },
            (_, None) => Translation {
                code,
                outcome: Outcome::FatalFailure,
                message: format!("unknown error code {code}"),
            },
        }
    }

    /// Turns a raw status into `Ok(())` or a `VendorStatus` error
    pub fn check(&self, code: RawStatus, context: &str) -> Result<()> {
        self.check_with(code, context, None)
    }

    /// Like [`check`](Self::check), appending the vendor's own description of the failure.
    pub fn check_with(
        &self,
        code: RawStatus,
        context: &str,
        vendor_message: Option<String>,
    ) -> Result<()> {
        let translation = self.translate(code);
        if translation.outcome.is_success() {
            return Ok(());
        }

        let message = match vendor_message {
            Some(detail) if !detail.trim().is_empty() => {
                format!("{} ({})", translation.message, detail.trim())
            }
            _ => translation.message,
        };

        Err(DeviceError::VendorStatus {
            vendor: self.vendor,
            context: context.to_string(),
            code,
            outcome: translation.outcome,
            message,
        })
    }
}

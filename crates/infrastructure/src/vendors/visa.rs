//! VISA types and completion codes shared by the TLPM and TLCCS drivers

use std::ffi::c_char;

use domain::{StatusEntry, StatusTranslator};

pub type ViStatus = i32;
pub type ViSession = u32;
pub type ViBoolean = u16;
pub type ViChar = c_char;

pub const VI_TRUE: ViBoolean = 1;
pub const VI_FALSE: ViBoolean = 0;
pub const VI_NULL: ViSession = 0;

/// Resource names, model names and serial numbers
pub const RESOURCE_BUFFER: usize = 256;
/// Error descriptions
pub const MESSAGE_BUFFER: usize = 512;

pub const VI_ERROR_SYSTEM_ERROR: ViStatus = -1073807360;
pub const VI_ERROR_INV_OBJECT: ViStatus = -1073807346;
pub const VI_ERROR_RSRC_LOCKED: ViStatus = -1073807345;
pub const VI_ERROR_RSRC_NFOUND: ViStatus = -1073807343;
pub const VI_ERROR_INV_RSRC_NAME: ViStatus = -1073807342;
pub const VI_ERROR_TMO: ViStatus = -1073807339;
pub const VI_ERROR_IO: ViStatus = -1073807298;
pub const VI_ERROR_NSUP_OPER: ViStatus = -1073807257;
pub const VI_ERROR_RSRC_BUSY: ViStatus = -1073807246;
pub const VI_ERROR_CONN_LOST: ViStatus = -1073807194;

/// Positive completion codes are warnings that still delivered a result
pub const VI_SUCCESS_EVENT_EN: ViStatus = 1073676290;
pub const VI_SUCCESS_MAX_CNT: ViStatus = 1073676294;
pub const VI_WARN_NSUP_ATTR_STATE: ViStatus = 1073676420;

pub const VISA_ENTRIES: &[StatusEntry] = &[
    StatusEntry::success(0, "success"),
    StatusEntry::success(VI_SUCCESS_EVENT_EN, "event already enabled"),
    StatusEntry::success(VI_SUCCESS_MAX_CNT, "maximum count read"),
    StatusEntry::success(VI_WARN_NSUP_ATTR_STATE, "attribute state not supported"),
    StatusEntry::fatal(VI_ERROR_SYSTEM_ERROR, "unknown system error"),
    StatusEntry::fatal(VI_ERROR_INV_OBJECT, "invalid session or object reference"),
    StatusEntry::retryable(VI_ERROR_RSRC_LOCKED, "resource locked by another session"),
    StatusEntry::fatal(VI_ERROR_RSRC_NFOUND, "resource not found"),
    StatusEntry::fatal(VI_ERROR_INV_RSRC_NAME, "invalid resource name"),
    StatusEntry::retryable(VI_ERROR_TMO, "timeout expired before operation completed"),
    StatusEntry::retryable(VI_ERROR_IO, "I/O error"),
    StatusEntry::fatal(VI_ERROR_NSUP_OPER, "operation not supported"),
    StatusEntry::retryable(VI_ERROR_RSRC_BUSY, "resource busy"),
    StatusEntry::fatal(VI_ERROR_CONN_LOST, "connection lost"),
];

pub static TLPM_STATUS_TABLE: StatusTranslator = StatusTranslator::new("TLPM", VISA_ENTRIES);
pub static TLCCS_STATUS_TABLE: StatusTranslator = StatusTranslator::new("TLCCS", VISA_ENTRIES);

#[cfg(test)]
mod tests {
    use super::*;
    use domain::Outcome;

    #[test]
    fn test_visa_outcomes() {
        assert!(TLPM_STATUS_TABLE.check(0, "measure").is_ok());
        assert!(TLPM_STATUS_TABLE.check(VI_SUCCESS_MAX_CNT, "read").is_ok());
        assert_eq!(
            TLPM_STATUS_TABLE.translate(VI_ERROR_TMO).outcome,
            Outcome::RetryableFailure
        );
        assert_eq!(
            TLCCS_STATUS_TABLE.translate(VI_ERROR_RSRC_NFOUND).outcome,
            Outcome::FatalFailure
        );
    }

    #[test]
    fn test_unknown_visa_code_is_fatal() {
        let err = TLCCS_STATUS_TABLE.check(-1074001000, "scan").unwrap_err();
        assert_eq!(err.outcome(), Some(Outcome::FatalFailure));
        assert!(err.to_string().contains("unknown error code -1074001000"));
    }
}

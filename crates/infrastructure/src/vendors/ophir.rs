//! Ophir meters report COM `HRESULT`s from their automation object

use domain::{RawStatus, StatusEntry, StatusTranslator};

pub const E_ABORT: RawStatus = 0x8000_4004_u32 as RawStatus;
pub const E_FAIL: RawStatus = 0x8000_4005_u32 as RawStatus;
pub const E_INVALIDARG: RawStatus = 0x8007_0057_u32 as RawStatus;
pub const E_UNEXPECTED: RawStatus = 0x8000_FFFF_u32 as RawStatus;
pub const E_PENDING: RawStatus = 0x8000_000A_u32 as RawStatus;
/// Device handle closed or never opened
pub const E_HANDLE: RawStatus = 0x8007_0006_u32 as RawStatus;

pub static STATUS_TABLE: StatusTranslator = StatusTranslator::new(
    "Ophir",
    &[
        StatusEntry::success(0, "success"),
        StatusEntry::success(1, "success with no data"),
        StatusEntry::retryable(E_PENDING, "data not yet available"),
        StatusEntry::retryable(E_ABORT, "operation aborted"),
        StatusEntry::fatal(E_FAIL, "unspecified failure"),
        StatusEntry::fatal(E_INVALIDARG, "invalid argument"),
        StatusEntry::fatal(E_UNEXPECTED, "unexpected failure"),
        StatusEntry::fatal(E_HANDLE, "invalid device handle"),
    ],
);

//! Native vendor bindings
//!
//! Each module binds the entry points of one vendor library, declares the
//! records that cross the boundary and the vendor's status table. Status
//! tables are plain data and are shared with the simulated bindings.

pub mod kinesis;
pub mod ophir;
pub mod tlccs;
pub mod tlpm;
pub mod ueye;
pub mod visa;

use domain::{DeviceError, StatusTranslator, VendorFamily};

/// Error for a binding method called before `connect` succeeded
pub(crate) fn unbound(family: VendorFamily, operation: &'static str) -> DeviceError {
    DeviceError::NotInSession {
        identity: format!("unbound {family} binding"),
        operation,
    }
}

/// Status table of the library serving `family`
pub fn status_table(family: VendorFamily) -> &'static StatusTranslator {
    match family {
        VendorFamily::KCubeDcServo | VendorFamily::KCubeSolenoid => &kinesis::STATUS_TABLE,
        VendorFamily::Tlpm => &visa::TLPM_STATUS_TABLE,
        VendorFamily::Tlccs => &visa::TLCCS_STATUS_TABLE,
        VendorFamily::Ueye => &ueye::STATUS_TABLE,
        VendorFamily::Ophir => &ophir::STATUS_TABLE,
    }
}

//! Thorlabs Kinesis motion control libraries
//!
//! Every Kinesis device library exports the `TLI_*` device list functions
//! alongside its own prefixed entry points (`CC_*` for DC servo cubes,
//! `SC_*` for solenoid cubes). Devices are addressed by serial number.

mod dc_servo;
mod discovery;
mod records;
mod solenoid;

pub use dc_servo::{DcServoApi, KCubeDcServoBinding};
pub use discovery::{DeviceListApi, KinesisDiscovery};
pub use records::{
    MotDcPidParameters, MotHomingParameters, ScCycleParameters, TliDeviceInfo,
    TliHardwareInformation,
};
pub use solenoid::{KCubeSolenoidBinding, SolenoidApi};

use domain::{StatusEntry, StatusTranslator};

/// Device type ID of KCube DC servo controllers
pub const KCUBE_DC_SERVO_TYPE_ID: u32 = 27;
/// Device type ID of KCube solenoid controllers
pub const KCUBE_SOLENOID_TYPE_ID: u32 = 68;

/// FTDI and Kinesis error codes
pub static STATUS_TABLE: StatusTranslator = StatusTranslator::new(
    "Kinesis",
    &[
        StatusEntry::success(0, "success"),
        StatusEntry::fatal(1, "invalid FTDI handle"),
        StatusEntry::fatal(2, "device not found"),
        StatusEntry::fatal(3, "device not opened"),
        StatusEntry::retryable(4, "I/O error"),
        StatusEntry::retryable(5, "insufficient resources"),
        StatusEntry::fatal(6, "invalid parameter"),
        StatusEntry::fatal(7, "device not present"),
        StatusEntry::fatal(8, "incorrect device"),
        StatusEntry::fatal(16, "no DLL loaded"),
        StatusEntry::fatal(17, "no functions available"),
        StatusEntry::fatal(18, "function not available"),
        StatusEntry::fatal(19, "bad function pointer"),
        StatusEntry::fatal(20, "generic function failure"),
        StatusEntry::fatal(21, "specific function failure"),
        StatusEntry::fatal(32, "device already open"),
        StatusEntry::retryable(33, "device not responding"),
        StatusEntry::fatal(34, "function not implemented"),
        StatusEntry::fatal(35, "device reported a fault"),
        StatusEntry::fatal(36, "invalid operation"),
        StatusEntry::fatal(37, "device not homed"),
        StatusEntry::fatal(38, "invalid position"),
        StatusEntry::fatal(39, "invalid velocity parameter"),
        StatusEntry::retryable(40, "device disconnecting"),
        StatusEntry::fatal(41, "firmware bug"),
        StatusEntry::fatal(42, "initialization failure"),
        StatusEntry::fatal(43, "invalid channel"),
        StatusEntry::fatal(44, "device cannot home"),
        StatusEntry::fatal(45, "jog is set to continuous mode"),
        StatusEntry::fatal(46, "no motor info"),
        StatusEntry::retryable(47, "command temporarily unavailable"),
    ],
);

#[cfg(test)]
mod tests {
    use super::*;
    use domain::Outcome;

    #[test]
    fn test_status_table_outcomes() {
        assert_eq!(STATUS_TABLE.translate(0).outcome, Outcome::Success);
        assert_eq!(STATUS_TABLE.translate(4).outcome, Outcome::RetryableFailure);
        assert_eq!(STATUS_TABLE.translate(33).outcome, Outcome::RetryableFailure);
        assert_eq!(STATUS_TABLE.translate(2).outcome, Outcome::FatalFailure);
        assert_eq!(STATUS_TABLE.translate(37).message, "device not homed");
    }

    #[test]
    fn test_unknown_kinesis_code() {
        let t = STATUS_TABLE.translate(99);
        assert_eq!(t.outcome, Outcome::FatalFailure);
        assert_eq!(t.message, "unknown error code 99");
    }
}

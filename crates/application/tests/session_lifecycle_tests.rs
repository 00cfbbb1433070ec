use std::sync::Arc;

use application::{DcServoMotor, Instrument, PowerMeter, SessionRegistry, Solenoid};
use domain::binding::{OperatingMode, TravelMode};
use domain::{DeviceError, DeviceIdentity, Outcome, SessionState};
use infrastructure::config::{MotionSettings, PowerMeterSettings};
use infrastructure::simulated::{
    DISCONNECT, SimulatedMotion, SimulatedPowerMeter, SimulatedSolenoid, SimulatorControl,
};

// Kinesis status codes
const DEVICE_NOT_FOUND: i32 = 2;
const IO_ERROR: i32 = 4;

// --- Helpers ---

fn motor(registry: &Arc<SessionRegistry>) -> (DcServoMotor, SimulatorControl) {
    let binding = SimulatedMotion::new();
    let control = binding.control();
    let motor = DcServoMotor::new(
        DeviceIdentity::new("27000001").unwrap(),
        Box::new(binding),
        registry.clone(),
        MotionSettings {
            position_settle_ms: 0,
        },
    );
    (motor, control)
}

fn power_meter(registry: &Arc<SessionRegistry>, identity: &str) -> PowerMeter {
    PowerMeter::new(
        DeviceIdentity::new(identity).unwrap(),
        Box::new(SimulatedPowerMeter::new()),
        registry.clone(),
        PowerMeterSettings::default(),
    )
}

// --- Guard ---

#[test]
fn test_closed_session_never_reaches_vendor() {
    let registry = Arc::new(SessionRegistry::new());
    let (mut motor, control) = motor(&registry);

    let results = [
        motor.identify().err(),
        motor.home().err(),
        motor.move_to(1.0).err(),
        motor.position().err(),
        motor.stop_immediate().err(),
        motor.pid_parameters().err(),
        motor.set_travel_mode(TravelMode::Rotational).err(),
        motor.persist_settings().err(),
    ];
    for err in results {
        assert!(matches!(err, Some(DeviceError::NotInSession { .. })), "{err:?}");
    }
    assert!(control.calls().is_empty());
}

#[test]
fn test_guard_applies_again_after_close() {
    let registry = Arc::new(SessionRegistry::new());
    let binding = SimulatedSolenoid::new();
    let control = binding.control();
    let mut solenoid = Solenoid::new(
        DeviceIdentity::new("68000001").unwrap(),
        Box::new(binding),
        registry.clone(),
    );

    solenoid.open().unwrap();
    solenoid.set_operating_mode(OperatingMode::Auto).unwrap();
    solenoid.close().unwrap();
    control.clear_calls();

    assert!(matches!(
        solenoid.operating_mode(),
        Err(DeviceError::NotInSession { operation: "operating_mode", .. })
    ));
    assert!(control.calls().is_empty());
}

// --- Open / close ---

#[test]
fn test_open_close_repeatedly() {
    let registry = Arc::new(SessionRegistry::new());
    let (mut motor, control) = motor(&registry);

    for _ in 0..3 {
        motor.open().unwrap();
        assert_eq!(motor.session().state(), SessionState::Open);
        motor.close().unwrap();
        assert_eq!(motor.session().state(), SessionState::Closed);
    }
    assert_eq!(control.call_count("connect"), 3);
    assert_eq!(control.call_count(DISCONNECT), 3);
    assert!(registry.is_empty());
}

#[test]
fn test_close_on_closed_session_is_noop() {
    let registry = Arc::new(SessionRegistry::new());
    let (mut motor, control) = motor(&registry);

    motor.close().unwrap();
    motor.close().unwrap();
    assert!(control.calls().is_empty());
}

#[test]
fn test_connect_failure_keeps_session_closed() {
    let registry = Arc::new(SessionRegistry::new());
    let (mut motor, control) = motor(&registry);
    control.fail_next("connect", DEVICE_NOT_FOUND, 1);

    let err = motor.open().unwrap_err();
    match err {
        DeviceError::VendorStatus { code, outcome, .. } => {
            assert_eq!(code, DEVICE_NOT_FOUND);
            assert_eq!(outcome, Outcome::FatalFailure);
        }
        other => panic!("expected a vendor status, got {other:?}"),
    }
    assert!(!motor.is_open());
    assert!(registry.is_empty());

    // The identity is free again, so the next attempt goes through
    motor.open().unwrap();
}

#[test]
fn test_soft_disconnect_failure_still_closes() {
    let registry = Arc::new(SessionRegistry::new());
    let (mut motor, control) = motor(&registry);
    motor.open().unwrap();
    control.fail_next(DISCONNECT, IO_ERROR, 1);

    let err = motor.close().unwrap_err();
    assert!(err.outcome().is_some());
    assert!(!motor.is_open());
    assert!(registry.is_empty());
    assert!(!control.is_connected());
}

// --- Registry ---

#[test]
fn test_second_session_on_open_identity_is_busy() {
    let registry = Arc::new(SessionRegistry::new());
    let mut first = power_meter(&registry, "P0001234");
    let mut second = power_meter(&registry, "P0001234");

    first.open().unwrap();
    assert!(matches!(second.open(), Err(DeviceError::DeviceBusy { .. })));

    first.close().unwrap();
    second.open().unwrap();
}

#[test]
fn test_distinct_identities_open_side_by_side() {
    let registry = Arc::new(SessionRegistry::new());
    let mut a = power_meter(&registry, "P0001234");
    let mut b = power_meter(&registry, "P0005678");

    a.open().unwrap();
    b.open().unwrap();
    assert_eq!(registry.len(), 2);
}

#[test]
fn test_identity_cannot_change_while_open() {
    let registry = Arc::new(SessionRegistry::new());
    let mut meter = power_meter(&registry, "P0001234");
    meter.open().unwrap();

    assert!(matches!(
        meter.set_identity(DeviceIdentity::new("P0005678").unwrap()),
        Err(DeviceError::IdentityLocked(_))
    ));
    assert_eq!(meter.identity().as_str(), "P0001234");
}

#[test]
fn test_dropping_open_instrument_releases_identity() {
    let registry = Arc::new(SessionRegistry::new());
    {
        let mut meter = power_meter(&registry, "P0001234");
        meter.open().unwrap();
        assert_eq!(registry.len(), 1);
    }
    assert!(registry.is_empty());
}

use std::fs;

use bench_cli::{Args, Bench, Command};
use clap::Parser;
use domain::{DeviceError, VendorFamily};
use infrastructure::BindingFactory;
use infrastructure::config::BenchConfig;

const FIRST_MOTOR: &str = "27000001";
const FIRST_POWER_METER: &str = "USB0::0x1313::0x8072::P2000000::INSTR";
const FIRST_SPECTROMETER: &str = "USB0::0x1313::0x8081::M00000000::RAW";

/// Simulated bench without the settle and poll waits
fn bench_with(mut config: BenchConfig) -> Bench {
    config.motion.position_settle_ms = 0;
    config.power_meter.retry_delay_ms = 0;
    config.spectrometer.scan_settle_ms = 0;
    config.spectrometer.poll_interval_ms = 0;
    config.streaming.data_delay_ms = 0;
    Bench::new(config, BindingFactory::simulated())
}

fn bench() -> Bench {
    bench_with(BenchConfig::default())
}

// --- Argument parsing ---

#[test]
fn test_parse_list_with_family_alias() {
    let args = Args::try_parse_from(["optobench", "--simulate", "list", "--family", "power"])
        .expect("Failed to parse arguments");

    assert!(args.simulate);
    assert_eq!(args.config_dir, "config");
    assert_eq!(
        args.command,
        Command::List {
            family: VendorFamily::Tlpm
        }
    );
}

#[test]
fn test_parse_rejects_unknown_family() {
    let result = Args::try_parse_from(["optobench", "list", "--family", "oscilloscope"]);
    assert!(result.is_err());
}

#[test]
fn test_parse_motor_move() {
    let args = Args::try_parse_from(["optobench", "-v", "motor", FIRST_MOTOR, "--move-to", "2.5"])
        .expect("Failed to parse arguments");

    assert!(args.verbose);
    match args.command {
        Command::Motor {
            serial,
            move_to,
            home,
            stage,
        } => {
            assert_eq!(serial, FIRST_MOTOR);
            assert_eq!(move_to, Some(2.5));
            assert!(!home);
            assert!(stage.is_none());
        }
        other => panic!("expected a motor command, got {other:?}"),
    }
}

// --- Commands ---

#[test]
fn test_list_reports_simulated_devices() {
    let output = bench()
        .run(&Command::List {
            family: VendorFamily::Tlpm,
        })
        .unwrap();

    let devices = output["devices"].as_array().unwrap();
    assert_eq!(devices.len(), 2);
    assert_eq!(devices[0]["identifier"], FIRST_POWER_METER);
    assert!(output["warnings"].as_array().unwrap().is_empty());
}

#[test]
fn test_motor_moves_and_reports_position() {
    let output = bench()
        .run(&Command::Motor {
            serial: FIRST_MOTOR.to_string(),
            stage: None,
            home: true,
            move_to: Some(5.0),
        })
        .unwrap();

    assert_eq!(output["homed"], true);
    let position = output["position"].as_f64().unwrap();
    assert!((position - 5.0).abs() < 1e-3, "position {position}");
}

#[test]
fn test_motor_move_outside_travel_is_rejected() {
    let err = bench()
        .run(&Command::Motor {
            serial: FIRST_MOTOR.to_string(),
            stage: None,
            home: false,
            move_to: Some(500.0),
        })
        .unwrap_err();

    assert!(matches!(
        err.downcast_ref::<DeviceError>(),
        Some(DeviceError::Validation { .. })
    ));
}

#[test]
fn test_unknown_serial_is_not_found() {
    let err = bench()
        .run(&Command::Motor {
            serial: "27999999".to_string(),
            stage: None,
            home: false,
            move_to: None,
        })
        .unwrap_err();

    assert!(matches!(
        err.downcast_ref::<DeviceError>(),
        Some(DeviceError::DeviceNotFound(_))
    ));
}

#[test]
fn test_unknown_stage_fails_before_connecting() {
    let err = bench()
        .run(&Command::Motor {
            serial: FIRST_MOTOR.to_string(),
            stage: Some("missing".to_string()),
            home: false,
            move_to: None,
        })
        .unwrap_err();

    assert!(err.to_string().contains("missing"), "{err}");
}

#[test]
fn test_solenoid_mode_and_state() {
    let output = bench()
        .run(&Command::Solenoid {
            serial: "68000001".to_string(),
            mode: Some("manual".to_string()),
            state: Some("active".to_string()),
        })
        .unwrap();

    assert_eq!(output["operating_mode"], "Manual");
    assert_eq!(output["operating_state"], "Active");
    assert_eq!(output["solenoid_state"], "Open");
}

#[test]
fn test_power_readings_at_wavelength() {
    let output = bench()
        .run(&Command::Power {
            resource: FIRST_POWER_METER.to_string(),
            wavelength: Some(800.0),
            count: 3,
        })
        .unwrap();

    assert_eq!(output["wavelength"], 800.0);
    let readings = output["readings"].as_array().unwrap();
    assert_eq!(readings.len(), 3);
    assert!(readings.iter().all(|r| r["value"].as_f64().unwrap().is_finite()));
}

#[test]
fn test_spectrum_averages_requested_scans() {
    let output = bench()
        .run(&Command::Spectrum {
            resource: FIRST_SPECTROMETER.to_string(),
            scans: Some(2),
            integration_time: Some(0.05),
        })
        .unwrap();

    let wavelengths = output["wavelengths"].as_array().unwrap();
    let intensities = output["intensities"].as_array().unwrap();
    assert!(!intensities.is_empty());
    assert_eq!(wavelengths.len(), intensities.len());
    assert_eq!(output["integration_time"], 0.05);
}

#[test]
fn test_camera_writes_frame_bytes() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("frame.raw");

    let output = bench()
        .run(&Command::Camera {
            id: "1".to_string(),
            exposure: Some(20.0),
            output: Some(path.clone()),
        })
        .unwrap();

    let written = fs::read(&path).unwrap();
    assert_eq!(written.len() as u64, output["bytes"].as_u64().unwrap());
    assert!(!written.is_empty());
}

#[test]
fn test_ophir_reads_requested_channel() {
    let output = bench()
        .run(&Command::Ophir {
            serial: "591000".to_string(),
            channel: Some(0),
        })
        .unwrap();

    assert_eq!(output["channel"], 0);
    assert!(output["power"].as_f64().unwrap().is_finite());
}

#[test]
fn test_ophir_missing_channel_is_rejected() {
    let err = bench()
        .run(&Command::Ophir {
            serial: "591000".to_string(),
            channel: Some(3),
        })
        .unwrap_err();

    assert!(matches!(
        err.downcast_ref::<DeviceError>(),
        Some(DeviceError::InvalidArgument(_))
    ));
}

#[test]
fn test_commands_release_their_devices() {
    let bench = bench();
    let command = Command::Power {
        resource: FIRST_POWER_METER.to_string(),
        wavelength: None,
        count: 1,
    };

    // A leaked session would make the second run busy
    bench.run(&command).unwrap();
    bench.run(&command).unwrap();
}

// --- Configuration ---

#[test]
fn test_stage_from_config_file_is_applied() {
    let dir = tempfile::tempdir().unwrap();
    fs::write(
        dir.path().join("default.toml"),
        r#"
verbose = true

[discovery]
listing_cap = 1

[stages.fast.pid]
proportionalGain = 500
integralGain = 210
"#,
    )
    .unwrap();

    let config = BenchConfig::load(dir.path().to_str().unwrap()).unwrap();
    assert!(config.verbose);
    assert_eq!(config.discovery.listing_cap, 1);
    assert!(config.stage("fast").is_some());

    let bench = bench_with(config);
    let listing = bench
        .run(&Command::List {
            family: VendorFamily::KCubeDcServo,
        })
        .unwrap();
    assert_eq!(listing["devices"].as_array().unwrap().len(), 1);
    assert_eq!(listing["warnings"].as_array().unwrap().len(), 1);

    bench
        .run(&Command::Motor {
            serial: FIRST_MOTOR.to_string(),
            stage: Some("fast".to_string()),
            home: false,
            move_to: None,
        })
        .unwrap();
}

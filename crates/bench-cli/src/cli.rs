use std::path::PathBuf;

use clap::{Parser, Subcommand};
use domain::VendorFamily;

#[derive(Parser, Debug)]
#[command(author, version, about = "Laboratory optical bench control", long_about = None)]
pub struct Args {
    /// Path to config directory
    #[arg(long, default_value = "config")]
    pub config_dir: String,

    /// Use simulated instruments instead of the vendor libraries
    #[arg(long)]
    pub simulate: bool,

    /// Log device lifecycle messages at info level
    #[arg(short, long)]
    pub verbose: bool,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand, Debug, Clone, PartialEq)]
pub enum Command {
    /// List connected devices of one vendor family
    List {
        /// KCubeDCServo, KCubeSolenoid, TLPM, TLCCS, uEye or Ophir
        #[arg(long)]
        family: VendorFamily,
    },
    /// Move or home a KCube DC servo stage and report its position
    Motor {
        serial: String,
        /// Named stage settings pushed to the controller first
        #[arg(long)]
        stage: Option<String>,
        #[arg(long)]
        home: bool,
        /// Target position in real units
        #[arg(long)]
        move_to: Option<f64>,
    },
    /// Drive a KCube solenoid controller
    Solenoid {
        serial: String,
        /// Manual, Single, Auto or Triggered
        #[arg(long)]
        mode: Option<String>,
        /// Active or Inactive
        #[arg(long)]
        state: Option<String>,
    },
    /// Read a TLPM power meter
    Power {
        resource: String,
        /// Wavelength correction in nm
        #[arg(long)]
        wavelength: Option<f64>,
        #[arg(long, default_value_t = 1)]
        count: u32,
    },
    /// Record an averaged spectrum from a TLCCS spectrometer
    Spectrum {
        resource: String,
        /// Scans to average, defaults to the configured count
        #[arg(long)]
        scans: Option<u32>,
        /// Integration time in seconds
        #[arg(long)]
        integration_time: Option<f64>,
    },
    /// Capture one frame from a uEye camera
    Camera {
        id: String,
        /// Exposure in ms
        #[arg(long)]
        exposure: Option<f64>,
        /// File receiving the raw frame bytes
        #[arg(long)]
        output: Option<PathBuf>,
    },
    /// Read an Ophir meter through its data stream
    Ophir {
        serial: String,
        #[arg(long)]
        channel: Option<u32>,
    },
}

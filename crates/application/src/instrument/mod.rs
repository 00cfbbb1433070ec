//! Instrument front ends
//!
//! Each front end owns one [`DeviceSession`](crate::device::DeviceSession)
//! over its capability trait and adds the family's open sequence, its
//! validation against device-reported limits and its timed read loops.

mod camera;
mod motor;
mod power_meter;
mod solenoid;
mod spectrometer;
mod streaming;

pub use camera::{Camera, Frame};
pub use motor::DcServoMotor;
pub use power_meter::{PowerMeter, PowerReading};
pub use solenoid::Solenoid;
pub use spectrometer::{Spectrometer, Sweep};
pub use streaming::StreamingPowerMeter;

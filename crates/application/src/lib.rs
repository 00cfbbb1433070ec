//! Application layer - Device sessions, discovery and instrument front ends

pub mod device;
pub mod instrument;

pub use device::{DeviceManager, DeviceSession, Instrument, SessionRegistry};
pub use instrument::{
    Camera, DcServoMotor, PowerMeter, Solenoid, Spectrometer, StreamingPowerMeter,
};

//! Binding interfaces implemented by vendor libraries and test doubles
//!
//! Every method maps onto one (or a fixed short sequence of) vendor entry
//! points. Implementations translate raw status codes through their status
//! table, so callers only ever see a `DeviceError`.

mod camera;
mod discovery;
mod motion;
mod power_meter;
mod solenoid;
mod spectrometer;
mod streaming;
mod vendor;

pub use camera::{CameraBinding, ExposureRange, ImageBuffer, PixelClockRange};
pub use discovery::DiscoveryBinding;
#[cfg(test)]
pub use discovery::MockDiscoveryBinding;
pub use motion::{MotionBinding, TravelMode, UnitKind};
pub use power_meter::{Attribute, PowerMeterBinding, PowerUnit};
pub use solenoid::{OperatingMode, OperatingState, SolenoidBinding, SolenoidState};
pub use spectrometer::{
    CalibrationDataset, ScanStatus, SpectrometerBinding, WavelengthCalibration,
};
pub use streaming::{StreamSample, StreamingMeterBinding};
pub use vendor::VendorBinding;

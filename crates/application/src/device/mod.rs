mod manager;
mod registry;
mod session;

pub use manager::{DeviceManager, DiscoveryReport, DiscoveryWarning};
pub use registry::SessionRegistry;
pub use session::DeviceSession;

use domain::{DeviceIdentity, Result};

/// Instrument front end owning one device session
pub trait Instrument {
    fn open(&mut self) -> Result<()>;
    fn close(&mut self) -> Result<()>;
    fn is_open(&self) -> bool;
    fn identity(&self) -> &DeviceIdentity;
}

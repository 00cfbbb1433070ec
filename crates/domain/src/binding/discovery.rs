use crate::device::{DeviceListing, VendorFamily};
use crate::error::Result;

/// Device enumeration for one vendor family
#[cfg_attr(test, mockall::automock)]
pub trait DiscoveryBinding: Send {
    fn family(&self) -> VendorFamily;

    /// Number of devices the vendor reports; zero is not an error
    fn count_devices(&mut self) -> Result<u32>;

    /// Fresh listing of at most `limit` devices
    fn list_devices(&mut self, limit: usize) -> Result<Vec<DeviceListing>>;
}

mod family;
mod identity;
mod listing;

pub use family::VendorFamily;
pub use identity::DeviceIdentity;
pub use listing::DeviceListing;

//! Domain layer - Instrument sessions without any vendor library attached
//!
//! This crate contains:
//! - Value Objects (DeviceIdentity, DeviceListing, VendorFamily)
//! - Session state machine (SessionState)
//! - Status translation (Outcome, StatusTranslator)
//! - Parameter blocks exchanged with vendor drivers
//! - Binding interfaces (traits) implemented by vendor libraries and test doubles
//!
//! Principles:
//! - No dependencies on infrastructure
//! - Vendor status codes never leak past a `DeviceError`
//! - Testable in isolation

pub mod binding;
pub mod device;
pub mod error;
pub mod parameter;
pub mod session;
pub mod status;

// Re-export commonly used types
pub use binding::{DiscoveryBinding, VendorBinding};
pub use device::{DeviceIdentity, DeviceListing, VendorFamily};
pub use error::{DeviceError, Result};
pub use parameter::ParameterBlock;
pub use session::SessionState;
pub use status::{Outcome, RawStatus, StatusEntry, StatusTranslator};

//! Infrastructure layer - Vendor libraries, simulators and configuration

pub mod config;
mod ffi;
pub mod factory;
pub mod locator;
pub mod simulated;
pub mod vendors;

pub use factory::BindingFactory;
pub use locator::LibraryLocator;

use crate::device::{DeviceIdentity, VendorFamily};
use crate::error::Result;
use crate::status::{RawStatus, StatusTranslator};

/// Connection half of every vendor binding
pub trait VendorBinding: Send {
    fn family(&self) -> VendorFamily;

    fn status_table(&self) -> &'static StatusTranslator;

    /// Opens the vendor handle for `identity`
    fn connect(&mut self, identity: &DeviceIdentity) -> Result<()>;

    /// Releases the vendor handle
    fn disconnect(&mut self) -> Result<()>;

    /// Vendor's own description of `code`, when the library offers a lookup
    fn error_message(&self, _code: RawStatus) -> Option<String> {
        None
    }

    /// Translates a raw status, attaching the vendor description on failure
    fn check(&self, code: RawStatus, context: &str) -> Result<()> {
        let table = self.status_table();
        if table.translate(code).outcome.is_success() {
            return Ok(());
        }
        table.check_with(code, context, self.error_message(code))
    }
}

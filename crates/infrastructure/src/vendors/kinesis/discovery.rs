use std::ffi::{CString, c_char};
use std::sync::Arc;

use domain::parameter::DeviceInfo;
use domain::{
    DeviceError, DeviceListing, DiscoveryBinding, Result, StatusTranslator, VendorFamily,
};
use libloading::Library;

use super::records::TliDeviceInfo;
use super::{KCUBE_DC_SERVO_TYPE_ID, KCUBE_SOLENOID_TYPE_ID, STATUS_TABLE};
use crate::ffi::vendor_table;

vendor_table! {
    /// `TLI_*` device list functions exported by every Kinesis library
    pub struct DeviceListApi: extern "C" {
        build_device_list = "TLI_BuildDeviceList": fn() -> i16;
        get_device_list_by_type_ext = "TLI_GetDeviceListByTypeExt": fn(*mut c_char, u32, i32) -> i16;
        get_device_info = "TLI_GetDeviceInfo": fn(*const c_char, *mut TliDeviceInfo) -> i16;
    }
}

/// Serial numbers are 8 digits; the buffer holds them comma separated
const SERIAL_LIST_BUFFER: usize = 1024;

impl DeviceListApi {
    pub(crate) fn build(&self) -> Result<()> {
        // SAFETY: no arguments
        let code = unsafe { (self.build_device_list)() };
        STATUS_TABLE.check(i32::from(code), "TLI_BuildDeviceList")
    }

    /// Rebuilds the device list and returns the serials of devices of `type_id`
    pub(crate) fn serials_of_type(&self, type_id: u32) -> Result<Vec<String>> {
        self.build()?;
        let raw_type = i32::try_from(type_id).map_err(|_| {
            DeviceError::InvalidArgument(format!("Kinesis type ID {type_id} out of range"))
        })?;

        let mut buffer = vec![0 as c_char; SERIAL_LIST_BUFFER];
        // SAFETY: buffer is writable for the advertised size
        let code = unsafe {
            (self.get_device_list_by_type_ext)(
                buffer.as_mut_ptr(),
                SERIAL_LIST_BUFFER as u32,
                raw_type,
            )
        };
        STATUS_TABLE.check(i32::from(code), "TLI_GetDeviceListByTypeExt")?;

        Ok(parse_serial_list(&crate::ffi::fixed_str(&buffer)))
    }

    /// Device info for `serial`; the call returns non-zero when the info was filled in
    pub(crate) fn device_info(&self, serial: &CString) -> Result<DeviceInfo> {
        let mut raw = TliDeviceInfo::default();
        // SAFETY: serial is NUL-terminated and raw is a writable TLI_DeviceInfo
        let filled = unsafe { (self.get_device_info)(serial.as_ptr(), &mut raw) };
        if filled == 0 {
            return Err(DeviceError::DeviceNotFound(format!(
                "Kinesis has no device info for {}",
                serial.to_string_lossy()
            )));
        }
        Ok(DeviceInfo::from(raw))
    }
}

/// Splits the comma separated serial list written by `TLI_GetDeviceListByTypeExt`
pub(crate) fn parse_serial_list(raw: &str) -> Vec<String> {
    raw.split(',')
        .map(str::trim)
        .filter(|serial| !serial.is_empty())
        .map(str::to_string)
        .collect()
}

/// Product name of a Kinesis device type, falling back to the device description
fn model_name(info: &DeviceInfo) -> String {
    match info.type_id {
        KCUBE_DC_SERVO_TYPE_ID => "KDC101".to_string(),
        KCUBE_SOLENOID_TYPE_ID => "KSC101".to_string(),
        _ => info.description.clone(),
    }
}

fn listing_with_info(listing: DeviceListing, info: DeviceInfo) -> DeviceListing {
    let listing = listing.with_model(model_name(&info));
    let listing = if info.serial_no.is_empty() {
        listing
    } else {
        listing.with_serial(info.serial_no)
    };
    listing.with_description(info.description)
}

/// Lists Kinesis controllers of one device type
pub struct KinesisDiscovery {
    family: VendorFamily,
    type_id: u32,
    api: DeviceListApi,
}

impl KinesisDiscovery {
    pub fn new(family: VendorFamily, type_id: u32, library: Arc<Library>) -> Result<Self> {
        Ok(Self {
            family,
            type_id,
            api: DeviceListApi::load(library)?,
        })
    }

    pub fn status_table(&self) -> &'static StatusTranslator {
        &STATUS_TABLE
    }
}

impl DiscoveryBinding for KinesisDiscovery {
    fn family(&self) -> VendorFamily {
        self.family
    }

    /// Devices of this type only, so the count matches what `list_devices` can return
    fn count_devices(&mut self) -> Result<u32> {
        let serials = self.api.serials_of_type(self.type_id)?;
        Ok(u32::try_from(serials.len()).unwrap_or(u32::MAX))
    }

    fn list_devices(&mut self, limit: usize) -> Result<Vec<DeviceListing>> {
        let serials = self.api.serials_of_type(self.type_id)?;

        let mut listings = Vec::with_capacity(serials.len().min(limit));
        for serial in serials.into_iter().take(limit) {
            let listing = DeviceListing::new(self.family, serial.as_str());
            let listing = match CString::new(serial.as_str())
                .map_err(|e| DeviceError::InvalidIdentity(e.to_string()))
                .and_then(|c_serial| self.api.device_info(&c_serial))
            {
                Ok(info) => listing_with_info(listing, info),
                Err(e) => {
                    tracing::debug!(serial = %serial, error = %e, "No device info for listed serial");
                    listing
                }
            };
            listings.push(listing);
        }
        Ok(listings)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_empty_serial_list() {
        assert!(parse_serial_list("").is_empty());
        assert!(parse_serial_list(" , ,").is_empty());
    }

    #[test]
    fn test_serial_list_trims_whitespace() {
        assert_eq!(
            parse_serial_list("27000001, 27000002 ,\t27000003,"),
            vec!["27000001", "27000002", "27000003"]
        );
    }

    #[test]
    fn test_serial_list_longer_than_listing_cap() {
        let raw = (0..12)
            .map(|i| format!("{}", 27_000_001 + i))
            .collect::<Vec<_>>()
            .join(",");

        let serials = parse_serial_list(&raw);
        assert_eq!(serials.len(), 12);
        let listed: Vec<_> = serials.iter().take(10).collect();
        assert_eq!(listed.len(), 10);
        assert_eq!(listed[9], "27000010");
    }

    #[test]
    fn test_listing_takes_model_and_serial_from_device_info() {
        let info = DeviceInfo {
            type_id: KCUBE_DC_SERVO_TYPE_ID,
            description: "KCube DC Servo".to_string(),
            serial_no: "27000001".to_string(),
            ..DeviceInfo::default()
        };
        let listing = listing_with_info(
            DeviceListing::new(VendorFamily::KCubeDcServo, "27000001"),
            info,
        );

        assert_eq!(listing.identifier, "27000001");
        assert_eq!(listing.serial, "27000001");
        assert_eq!(listing.model, "KDC101");
        assert_eq!(listing.description, "KCube DC Servo");
    }

    #[test]
    fn test_unknown_type_uses_description_as_model() {
        let info = DeviceInfo {
            type_id: 83,
            description: "Benchtop Stepper".to_string(),
            ..DeviceInfo::default()
        };
        let listing = listing_with_info(
            DeviceListing::new(VendorFamily::KCubeDcServo, "83000001"),
            info,
        );

        assert_eq!(listing.model, "Benchtop Stepper");
        assert_eq!(listing.serial, "83000001");
    }
}

//! Records exchanged with `uEye_api_64.dll` (default alignment)

use std::ffi::c_char;

use domain::VendorFamily;
use domain::DeviceListing;
use domain::parameter::SensorInfo;

use crate::ffi::{fixed_str, vendor_bool};

/// `UEYE_CAMERA_INFO`
#[repr(C)]
#[derive(Debug, Clone, Copy)]
pub struct UeyeCameraInfo {
    pub camera_id: u32,
    pub device_id: u32,
    pub sensor_id: u32,
    pub in_use: u32,
    pub serial_no: [c_char; 16],
    pub model: [c_char; 16],
    pub status: u32,
    pub reserved: [u32; 2],
    pub full_model_name: [c_char; 32],
    pub reserved2: [u32; 5],
}

impl UeyeCameraInfo {
    pub fn to_listing(&self) -> DeviceListing {
        DeviceListing::new(VendorFamily::Ueye, self.camera_id.to_string())
            .with_serial(fixed_str(&self.serial_no))
            .with_model(fixed_str(&self.model))
            .with_description(fixed_str(&self.full_model_name))
            .in_use(vendor_bool(self.in_use))
    }
}

/// `UEYE_CAMERA_LIST` is a `ULONG` count followed by `count` camera infos.
///
/// The storage is a `u32` vector so that the infos stay 4-byte aligned.
pub struct CameraListBuffer {
    words: Vec<u32>,
    capacity: usize,
}

impl CameraListBuffer {
    const INFO_WORDS: usize = size_of::<UeyeCameraInfo>() / size_of::<u32>();

    pub fn with_capacity(capacity: usize) -> Self {
        let mut words = vec![0u32; 1 + capacity * Self::INFO_WORDS];
        words[0] = capacity as u32;
        Self { words, capacity }
    }

    pub fn as_mut_ptr(&mut self) -> *mut u32 {
        self.words.as_mut_ptr()
    }

    /// Entries the driver filled in
    pub fn entries(&self) -> Vec<UeyeCameraInfo> {
        let filled = (self.words[0] as usize).min(self.capacity);
        (0..filled)
            .map(|i| {
                let start = 1 + i * Self::INFO_WORDS;
                let words = &self.words[start..start + Self::INFO_WORDS];
                // SAFETY: the slice covers exactly one UeyeCameraInfo and every bit pattern is valid
                unsafe { std::ptr::read_unaligned(words.as_ptr().cast::<UeyeCameraInfo>()) }
            })
            .collect()
    }
}

/// `SENSORINFO`
#[repr(C)]
#[derive(Debug, Clone, Copy)]
pub struct SensorInfoRaw {
    pub sensor_id: u16,
    pub sensor_name: [c_char; 32],
    pub color_mode: c_char,
    pub max_width: u32,
    pub max_height: u32,
    pub master_gain: i32,
    pub r_gain: i32,
    pub g_gain: i32,
    pub b_gain: i32,
    pub glob_shutter: i32,
    pub pixel_size: u16,
    pub upper_left_bayer_pixel: c_char,
    pub reserved: [c_char; 13],
}

impl Default for SensorInfoRaw {
    fn default() -> Self {
        Self {
            sensor_id: 0,
            sensor_name: [0; 32],
            color_mode: 0,
            max_width: 0,
            max_height: 0,
            master_gain: 0,
            r_gain: 0,
            g_gain: 0,
            b_gain: 0,
            glob_shutter: 0,
            pixel_size: 0,
            upper_left_bayer_pixel: 0,
            reserved: [0; 13],
        }
    }
}

impl From<SensorInfoRaw> for SensorInfo {
    fn from(raw: SensorInfoRaw) -> Self {
        Self {
            sensor_id: raw.sensor_id,
            sensor_name: fixed_str(&raw.sensor_name),
            color_mode: raw.color_mode as u8,
            max_width: raw.max_width,
            max_height: raw.max_height,
            master_gain: vendor_bool(raw.master_gain),
            global_shutter: vendor_bool(raw.glob_shutter),
            pixel_size: raw.pixel_size,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_record_sizes() {
        assert_eq!(size_of::<UeyeCameraInfo>(), 112);
        assert_eq!(size_of::<SensorInfoRaw>(), 80);
    }

    #[test]
    fn test_camera_list_buffer_reads_entries() {
        let mut buffer = CameraListBuffer::with_capacity(3);
        // Driver reports two cameras
        buffer.words[0] = 2;
        let second = 1 + CameraListBuffer::INFO_WORDS;
        buffer.words[1] = 1;
        buffer.words[second] = 2;
        buffer.words[second + 3] = 1;

        let entries = buffer.entries();
        assert_eq!(entries.len(), 2);
        assert_eq!(entries[0].camera_id, 1);
        assert_eq!(entries[1].camera_id, 2);
        assert!(entries[1].to_listing().in_use);
        assert!(!entries[0].to_listing().in_use);
    }

    #[test]
    fn test_count_is_capped_by_capacity() {
        let mut buffer = CameraListBuffer::with_capacity(1);
        buffer.words[0] = 5;
        assert_eq!(buffer.entries().len(), 1);
    }

    #[test]
    fn test_entries_stay_within_capacity() {
        let mut buffer = CameraListBuffer::with_capacity(2);
        assert_eq!(buffer.words.len(), 1 + 2 * CameraListBuffer::INFO_WORDS);
        assert_eq!(buffer.words[0], 2);

        // Driver writes a header for more cameras than the buffer holds
        buffer.words[0] = 12;
        buffer.words[1] = 7;
        buffer.words[1 + CameraListBuffer::INFO_WORDS] = 8;

        let entries = buffer.entries();
        assert_eq!(entries.len(), 2);
        assert_eq!(entries[0].camera_id, 7);
        assert_eq!(entries[1].camera_id, 8);
    }
}

//! IDS uEye cameras through `uEye_api_64.dll`

mod records;

pub use records::{CameraListBuffer, SensorInfoRaw, UeyeCameraInfo};

use std::collections::HashMap;
use std::ffi::{CStr, c_char, c_void};
use std::sync::Arc;

use domain::binding::{CameraBinding, ExposureRange, ImageBuffer, PixelClockRange};
use domain::parameter::SensorInfo;
use domain::{
    DeviceError, DeviceIdentity, DeviceListing, DiscoveryBinding, RawStatus, Result, StatusEntry,
    StatusTranslator, VendorBinding, VendorFamily,
};
use libloading::Library;

use super::unbound;
use crate::ffi::vendor_table;

/// Camera handle (`HIDS`)
pub type Hids = u32;

pub const IS_NO_SUCCESS: RawStatus = -1;
pub const IS_INVALID_CAMERA_HANDLE: RawStatus = 1;
pub const IS_IO_REQUEST_FAILED: RawStatus = 2;
pub const IS_CANT_OPEN_DEVICE: RawStatus = 3;
pub const IS_CANT_CLOSE_DEVICE: RawStatus = 4;
pub const IS_CANT_SETUP_MEMORY: RawStatus = 5;
pub const IS_INVALID_MEMORY_POINTER: RawStatus = 49;
pub const IS_TIMED_OUT: RawStatus = 122;
pub const IS_INVALID_PARAMETER: RawStatus = 125;
pub const IS_ACCESS_VIOLATION: RawStatus = 129;
pub const IS_CAPTURE_RUNNING: RawStatus = 140;
pub const IS_NOT_SUPPORTED: RawStatus = 155;

/// `is_FreezeVideo` blocks until the frame is in memory
pub const IS_WAIT: i32 = 1;

const IS_EXPOSURE_CMD_GET_EXPOSURE: u32 = 3;
const IS_EXPOSURE_CMD_GET_EXPOSURE_RANGE: u32 = 7;
const IS_EXPOSURE_CMD_SET_EXPOSURE: u32 = 12;
const IS_PIXELCLOCK_CMD_GET_RANGE: u32 = 3;
const IS_PIXELCLOCK_CMD_GET: u32 = 5;
const IS_PIXELCLOCK_CMD_SET: u32 = 6;

pub static STATUS_TABLE: StatusTranslator = StatusTranslator::new(
    "uEye",
    &[
        StatusEntry::success(0, "success"),
        StatusEntry::fatal(IS_NO_SUCCESS, "no success"),
        StatusEntry::fatal(IS_INVALID_CAMERA_HANDLE, "invalid camera handle"),
        StatusEntry::retryable(IS_IO_REQUEST_FAILED, "IO request from the driver failed"),
        StatusEntry::fatal(IS_CANT_OPEN_DEVICE, "cannot open device"),
        StatusEntry::fatal(IS_CANT_CLOSE_DEVICE, "cannot close device"),
        StatusEntry::fatal(IS_CANT_SETUP_MEMORY, "cannot set up memory"),
        StatusEntry::fatal(IS_INVALID_MEMORY_POINTER, "invalid memory pointer"),
        StatusEntry::retryable(IS_TIMED_OUT, "timed out"),
        StatusEntry::fatal(IS_INVALID_PARAMETER, "invalid parameter"),
        StatusEntry::fatal(IS_ACCESS_VIOLATION, "access violation"),
        StatusEntry::retryable(IS_CAPTURE_RUNNING, "capture already running"),
        StatusEntry::fatal(IS_NOT_SUPPORTED, "not supported"),
    ],
);

vendor_table! {
    pub struct UeyeApi: extern "system" {
        get_number_of_cameras = "is_GetNumberOfCameras": fn(*mut i32) -> i32;
        get_camera_list = "is_GetCameraList": fn(*mut u32) -> i32;
        init_camera = "is_InitCamera": fn(*mut Hids, *mut c_void) -> i32;
        exit_camera = "is_ExitCamera": fn(Hids) -> i32;
        get_error = "is_GetError": fn(Hids, *mut i32, *mut *mut c_char) -> i32;
        set_color_mode = "is_SetColorMode": fn(Hids, i32) -> i32;
        set_display_mode = "is_SetDisplayMode": fn(Hids, i32) -> i32;
        get_sensor_info = "is_GetSensorInfo": fn(Hids, *mut SensorInfoRaw) -> i32;
        exposure = "is_Exposure": fn(Hids, u32, *mut c_void, u32) -> i32;
        pixel_clock = "is_PixelClock": fn(Hids, u32, *mut c_void, u32) -> i32;
        set_external_trigger = "is_SetExternalTrigger": fn(Hids, i32) -> i32;
        alloc_image_mem = "is_AllocImageMem": fn(Hids, i32, i32, i32, *mut *mut c_char, *mut i32) -> i32;
        set_image_mem = "is_SetImageMem": fn(Hids, *mut c_char, i32) -> i32;
        free_image_mem = "is_FreeImageMem": fn(Hids, *mut c_char, i32) -> i32;
        get_image_mem_pitch = "is_GetImageMemPitch": fn(Hids, *mut i32) -> i32;
        freeze_video = "is_FreezeVideo": fn(Hids, i32) -> i32;
        copy_image_mem = "is_CopyImageMem": fn(Hids, *mut c_char, i32, *mut c_char) -> i32;
    }
}

/// Driver-owned image memory
struct ImageMemory(*mut c_char);

// SAFETY: the pointer is only handed back to the driver that allocated it
unsafe impl Send for ImageMemory {}

/// uEye camera addressed by camera ID
pub struct UeyeBinding {
    api: UeyeApi,
    handle: Option<Hids>,
    images: HashMap<i32, ImageMemory>,
}

impl UeyeBinding {
    pub fn new(library: Arc<Library>) -> Result<Self> {
        Ok(Self {
            api: UeyeApi::load(library)?,
            handle: None,
            images: HashMap::new(),
        })
    }

    fn handle(&self, operation: &'static str) -> Result<Hids> {
        self.handle.ok_or_else(|| unbound(VendorFamily::Ueye, operation))
    }

    fn image(&self, buffer: &ImageBuffer) -> Result<*mut c_char> {
        self.images
            .get(&buffer.id)
            .map(|memory| memory.0)
            .ok_or_else(|| DeviceError::InvalidArgument(format!("unknown image memory {}", buffer.id)))
    }

    fn exposure_command<T>(&self, command: u32, value: &mut T) -> Result<()> {
        let hids = self.handle("is_Exposure")?;
        // SAFETY: value is a writable slot of the size the command expects
        let code = unsafe {
            (self.api.exposure)(
                hids,
                command,
                (value as *mut T).cast(),
                size_of::<T>() as u32,
            )
        };
        self.check(code, "is_Exposure")
    }

    fn pixel_clock_command<T>(&self, command: u32, value: &mut T) -> Result<()> {
        let hids = self.handle("is_PixelClock")?;
        // SAFETY: value is a writable slot of the size the command expects
        let code = unsafe {
            (self.api.pixel_clock)(
                hids,
                command,
                (value as *mut T).cast(),
                size_of::<T>() as u32,
            )
        };
        self.check(code, "is_PixelClock")
    }
}

impl VendorBinding for UeyeBinding {
    fn family(&self) -> VendorFamily {
        VendorFamily::Ueye
    }

    fn status_table(&self) -> &'static StatusTranslator {
        &STATUS_TABLE
    }

    fn connect(&mut self, identity: &DeviceIdentity) -> Result<()> {
        let mut hids: Hids = identity.as_number()?;
        // SAFETY: hids is a valid slot, a null window handle selects DIB mode
        let code = unsafe { (self.api.init_camera)(&mut hids, std::ptr::null_mut()) };
        self.check(code, "is_InitCamera")?;
        self.handle = Some(hids);
        Ok(())
    }

    fn disconnect(&mut self) -> Result<()> {
        let Some(hids) = self.handle.take() else {
            return Ok(());
        };
        // The driver releases any memory still allocated on exit
        self.images.clear();
        // SAFETY: hids came from is_InitCamera
        let code = unsafe { (self.api.exit_camera)(hids) };
        self.check(code, "is_ExitCamera")
    }

    fn error_message(&self, code: RawStatus) -> Option<String> {
        let hids = self.handle?;
        let mut last = 0i32;
        let mut text: *mut c_char = std::ptr::null_mut();
        // SAFETY: both slots are writable; the driver returns a pointer to its own string
        let status = unsafe { (self.api.get_error)(hids, &mut last, &mut text) };
        if status != 0 || last != code || text.is_null() {
            return None;
        }
        // SAFETY: text is a NUL-terminated string owned by the driver
        Some(unsafe { CStr::from_ptr(text) }.to_string_lossy().into_owned())
    }
}

impl CameraBinding for UeyeBinding {
    fn set_color_mode(&mut self, mode: i32) -> Result<()> {
        let hids = self.handle("is_SetColorMode")?;
        // SAFETY: plain value arguments
        let code = unsafe { (self.api.set_color_mode)(hids, mode) };
        self.check(code, "is_SetColorMode")
    }

    fn set_display_mode(&mut self, mode: i32) -> Result<()> {
        let hids = self.handle("is_SetDisplayMode")?;
        // SAFETY: plain value arguments
        let code = unsafe { (self.api.set_display_mode)(hids, mode) };
        self.check(code, "is_SetDisplayMode")
    }

    fn sensor_info(&mut self) -> Result<SensorInfo> {
        let hids = self.handle("is_GetSensorInfo")?;
        let mut raw = SensorInfoRaw::default();
        // SAFETY: raw is a writable SENSORINFO
        let code = unsafe { (self.api.get_sensor_info)(hids, &mut raw) };
        self.check(code, "is_GetSensorInfo")?;
        Ok(SensorInfo::from(raw))
    }

    fn exposure_range(&mut self) -> Result<ExposureRange> {
        let mut range = [0.0f64; 3];
        self.exposure_command(IS_EXPOSURE_CMD_GET_EXPOSURE_RANGE, &mut range)?;
        Ok(ExposureRange {
            min: range[0],
            max: range[1],
            increment: range[2],
        })
    }

    fn exposure(&mut self) -> Result<f64> {
        let mut millis = 0.0f64;
        self.exposure_command(IS_EXPOSURE_CMD_GET_EXPOSURE, &mut millis)?;
        Ok(millis)
    }

    fn set_exposure(&mut self, millis: f64) -> Result<()> {
        let mut millis = millis;
        self.exposure_command(IS_EXPOSURE_CMD_SET_EXPOSURE, &mut millis)
    }

    fn pixel_clock_range(&mut self) -> Result<PixelClockRange> {
        let mut range = [0u32; 3];
        self.pixel_clock_command(IS_PIXELCLOCK_CMD_GET_RANGE, &mut range)?;
        Ok(PixelClockRange {
            min: range[0],
            max: range[1],
            increment: range[2],
        })
    }

    fn pixel_clock(&mut self) -> Result<u32> {
        let mut mhz = 0u32;
        self.pixel_clock_command(IS_PIXELCLOCK_CMD_GET, &mut mhz)?;
        Ok(mhz)
    }

    fn set_pixel_clock(&mut self, mhz: u32) -> Result<()> {
        let mut mhz = mhz;
        self.pixel_clock_command(IS_PIXELCLOCK_CMD_SET, &mut mhz)
    }

    fn set_trigger_mode(&mut self, mode: i32) -> Result<()> {
        let hids = self.handle("is_SetExternalTrigger")?;
        // SAFETY: plain value arguments
        let code = unsafe { (self.api.set_external_trigger)(hids, mode) };
        self.check(code, "is_SetExternalTrigger")
    }

    fn allocate_image_memory(
        &mut self,
        width: u32,
        height: u32,
        bits_per_pixel: u32,
    ) -> Result<ImageBuffer> {
        let hids = self.handle("is_AllocImageMem")?;
        let dimension = |value: u32, name: &str| {
            i32::try_from(value)
                .map_err(|_| DeviceError::InvalidArgument(format!("{name} {value} out of range")))
        };
        let (w, h, bpp) = (
            dimension(width, "width")?,
            dimension(height, "height")?,
            dimension(bits_per_pixel, "bits per pixel")?,
        );
        let mut memory: *mut c_char = std::ptr::null_mut();
        let mut id = 0i32;
        // SAFETY: memory and id are writable slots
        let code = unsafe { (self.api.alloc_image_mem)(hids, w, h, bpp, &mut memory, &mut id) };
        self.check(code, "is_AllocImageMem")?;
        self.images.insert(id, ImageMemory(memory));
        Ok(ImageBuffer {
            id,
            width,
            height,
            bits_per_pixel,
        })
    }

    fn bind_image_memory(&mut self, buffer: &ImageBuffer) -> Result<()> {
        let hids = self.handle("is_SetImageMem")?;
        let memory = self.image(buffer)?;
        // SAFETY: memory and id were returned together by is_AllocImageMem
        let code = unsafe { (self.api.set_image_mem)(hids, memory, buffer.id) };
        self.check(code, "is_SetImageMem")
    }

    fn free_image_memory(&mut self, buffer: &ImageBuffer) -> Result<()> {
        let hids = self.handle("is_FreeImageMem")?;
        let Some(memory) = self.images.remove(&buffer.id) else {
            return Ok(());
        };
        // SAFETY: memory and id were returned together by is_AllocImageMem
        let code = unsafe { (self.api.free_image_mem)(hids, memory.0, buffer.id) };
        self.check(code, "is_FreeImageMem")
    }

    fn capture_frame(&mut self, buffer: &ImageBuffer) -> Result<Vec<u8>> {
        let hids = self.handle("is_FreezeVideo")?;
        let memory = self.image(buffer)?;

        // SAFETY: plain value arguments
        let code = unsafe { (self.api.freeze_video)(hids, IS_WAIT) };
        self.check(code, "is_FreezeVideo")?;

        let mut pitch = 0i32;
        // SAFETY: pitch is a writable slot
        let code = unsafe { (self.api.get_image_mem_pitch)(hids, &mut pitch) };
        self.check(code, "is_GetImageMemPitch")?;

        let line = buffer.line_bytes();
        let pitch = usize::try_from(pitch).unwrap_or(line).max(line);
        let mut raw = vec![0u8; pitch * buffer.height as usize];
        // SAFETY: raw holds one full frame at the driver's line pitch
        let code = unsafe {
            (self.api.copy_image_mem)(hids, memory, buffer.id, raw.as_mut_ptr().cast())
        };
        self.check(code, "is_CopyImageMem")?;

        if pitch == line {
            return Ok(raw);
        }
        Ok(raw.chunks_exact(pitch).flat_map(|row| &row[..line]).copied().collect())
    }
}

/// Camera enumeration
pub struct UeyeDiscovery {
    api: UeyeApi,
}

impl UeyeDiscovery {
    pub fn new(library: Arc<Library>) -> Result<Self> {
        Ok(Self {
            api: UeyeApi::load(library)?,
        })
    }
}

impl DiscoveryBinding for UeyeDiscovery {
    fn family(&self) -> VendorFamily {
        VendorFamily::Ueye
    }

    fn count_devices(&mut self) -> Result<u32> {
        let mut count = 0i32;
        // SAFETY: count is a valid i32 slot
        let code = unsafe { (self.api.get_number_of_cameras)(&mut count) };
        STATUS_TABLE.check(code, "is_GetNumberOfCameras")?;
        Ok(u32::try_from(count).unwrap_or(0))
    }

    fn list_devices(&mut self, limit: usize) -> Result<Vec<DeviceListing>> {
        let count = self.count_devices()? as usize;
        if count == 0 {
            return Ok(Vec::new());
        }
        if limit == 0 {
            return Ok(Vec::new());
        }
        // Never more entries than the caller will keep
        let mut list = CameraListBuffer::with_capacity(count.min(limit));
        // SAFETY: the buffer is sized for the count written in its header
        let code = unsafe { (self.api.get_camera_list)(list.as_mut_ptr()) };
        STATUS_TABLE.check(code, "is_GetCameraList")?;
        Ok(list
            .entries()
            .iter()
            .map(UeyeCameraInfo::to_listing)
            .collect())
    }
}

use serde::{Deserialize, Serialize};

use super::VendorBinding;
use crate::error::Result;
use crate::parameter::SensorInfo;

/// Exposure limits in milliseconds
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ExposureRange {
    pub min: f64,
    pub max: f64,
    pub increment: f64,
}

/// Pixel clock limits in MHz
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct PixelClockRange {
    pub min: u32,
    pub max: u32,
    pub increment: u32,
}

/// Image memory allocated inside the vendor driver
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ImageBuffer {
    pub id: i32,
    pub width: u32,
    pub height: u32,
    pub bits_per_pixel: u32,
}

impl ImageBuffer {
    /// Bytes per line, padded to whole bytes
    pub fn line_bytes(&self) -> usize {
        (self.width as usize * self.bits_per_pixel as usize).div_ceil(8)
    }

    pub fn len(&self) -> usize {
        self.line_bytes() * self.height as usize
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// Industrial camera (IDS uEye)
pub trait CameraBinding: VendorBinding {
    fn set_color_mode(&mut self, mode: i32) -> Result<()>;
    fn set_display_mode(&mut self, mode: i32) -> Result<()>;
    fn sensor_info(&mut self) -> Result<SensorInfo>;

    fn exposure_range(&mut self) -> Result<ExposureRange>;
    /// Exposure in milliseconds
    fn exposure(&mut self) -> Result<f64>;
    fn set_exposure(&mut self, millis: f64) -> Result<()>;

    fn pixel_clock_range(&mut self) -> Result<PixelClockRange>;
    fn pixel_clock(&mut self) -> Result<u32>;
    fn set_pixel_clock(&mut self, mhz: u32) -> Result<()>;

    fn set_trigger_mode(&mut self, mode: i32) -> Result<()>;

    fn allocate_image_memory(
        &mut self,
        width: u32,
        height: u32,
        bits_per_pixel: u32,
    ) -> Result<ImageBuffer>;
    fn bind_image_memory(&mut self, buffer: &ImageBuffer) -> Result<()>;
    fn free_image_memory(&mut self, buffer: &ImageBuffer) -> Result<()>;

    /// Captures one frame into the bound memory and copies it out
    fn capture_frame(&mut self, buffer: &ImageBuffer) -> Result<Vec<u8>>;
}

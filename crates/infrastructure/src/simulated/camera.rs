use std::collections::HashMap;

use domain::binding::{CameraBinding, ExposureRange, ImageBuffer, PixelClockRange};
use domain::parameter::SensorInfo;
use domain::{DeviceError, Result, StatusTranslator, VendorFamily};

use super::{Simulated, SimulatedDevice};
use crate::vendors::ueye::STATUS_TABLE;

/// UI-1640LE colour camera
#[derive(Debug, Clone)]
pub struct CameraState {
    pub sensor: SensorInfo,
    pub color_mode: i32,
    pub display_mode: i32,
    pub trigger_mode: i32,
    pub exposure: f64,
    pub exposure_range: ExposureRange,
    pub pixel_clock: u32,
    pub pixel_clock_range: PixelClockRange,
    /// Allocated image memory by id
    pub memory: HashMap<i32, ImageBuffer>,
    pub bound: Option<i32>,
    pub frames_captured: u32,
    next_id: i32,
}

impl Default for CameraState {
    fn default() -> Self {
        Self {
            sensor: SensorInfo {
                sensor_id: 0x21,
                sensor_name: "UI164xLE-C".to_string(),
                color_mode: 2,
                max_width: 1280,
                max_height: 1024,
                master_gain: true,
                global_shutter: false,
                pixel_size: 360,
            },
            color_mode: 0,
            display_mode: 0,
            trigger_mode: 0,
            exposure: 20.0,
            exposure_range: ExposureRange {
                min: 0.037,
                max: 500.0,
                increment: 0.018,
            },
            pixel_clock: 20,
            pixel_clock_range: PixelClockRange {
                min: 5,
                max: 43,
                increment: 1,
            },
            memory: HashMap::new(),
            bound: None,
            frames_captured: 0,
            next_id: 1,
        }
    }
}

impl SimulatedDevice for CameraState {
    const FAMILY: VendorFamily = VendorFamily::Ueye;

    fn status_table() -> &'static StatusTranslator {
        &STATUS_TABLE
    }

    /// Exiting the camera releases whatever memory is still allocated
    fn on_disconnect(&mut self) {
        self.memory.clear();
        self.bound = None;
    }
}

impl CameraBinding for Simulated<CameraState> {
    fn set_color_mode(&mut self, mode: i32) -> Result<()> {
        self.with("set_color_mode", |s| {
            s.color_mode = mode;
            Ok(())
        })
    }

    fn set_display_mode(&mut self, mode: i32) -> Result<()> {
        self.with("set_display_mode", |s| {
            s.display_mode = mode;
            Ok(())
        })
    }

    fn sensor_info(&mut self) -> Result<SensorInfo> {
        self.with("sensor_info", |s| Ok(s.sensor.clone()))
    }

    fn exposure_range(&mut self) -> Result<ExposureRange> {
        self.with("exposure_range", |s| Ok(s.exposure_range))
    }

    fn exposure(&mut self) -> Result<f64> {
        self.with("exposure", |s| Ok(s.exposure))
    }

    fn set_exposure(&mut self, millis: f64) -> Result<()> {
        self.with("set_exposure", |s| {
            s.exposure = millis;
            Ok(())
        })
    }

    fn pixel_clock_range(&mut self) -> Result<PixelClockRange> {
        self.with("pixel_clock_range", |s| Ok(s.pixel_clock_range))
    }

    fn pixel_clock(&mut self) -> Result<u32> {
        self.with("pixel_clock", |s| Ok(s.pixel_clock))
    }

    fn set_pixel_clock(&mut self, mhz: u32) -> Result<()> {
        self.with("set_pixel_clock", |s| {
            s.pixel_clock = mhz;
            Ok(())
        })
    }

    fn set_trigger_mode(&mut self, mode: i32) -> Result<()> {
        self.with("set_trigger_mode", |s| {
            s.trigger_mode = mode;
            Ok(())
        })
    }

    fn allocate_image_memory(
        &mut self,
        width: u32,
        height: u32,
        bits_per_pixel: u32,
    ) -> Result<ImageBuffer> {
        self.with("allocate_image_memory", |s| {
            let buffer = ImageBuffer {
                id: s.next_id,
                width,
                height,
                bits_per_pixel,
            };
            s.next_id += 1;
            s.memory.insert(buffer.id, buffer);
            Ok(buffer)
        })
    }

    fn bind_image_memory(&mut self, buffer: &ImageBuffer) -> Result<()> {
        self.with("bind_image_memory", |s| {
            if !s.memory.contains_key(&buffer.id) {
                return Err(unknown_memory(buffer));
            }
            s.bound = Some(buffer.id);
            Ok(())
        })
    }

    fn free_image_memory(&mut self, buffer: &ImageBuffer) -> Result<()> {
        self.with("free_image_memory", |s| {
            s.memory.remove(&buffer.id);
            if s.bound == Some(buffer.id) {
                s.bound = None;
            }
            Ok(())
        })
    }

    fn capture_frame(&mut self, buffer: &ImageBuffer) -> Result<Vec<u8>> {
        self.with("capture_frame", |s| {
            if s.bound != Some(buffer.id) {
                return Err(unknown_memory(buffer));
            }
            s.frames_captured += 1;
            // Each frame is filled with its sequence number
            Ok(vec![s.frames_captured as u8; buffer.len()])
        })
    }
}

fn unknown_memory(buffer: &ImageBuffer) -> DeviceError {
    DeviceError::InvalidArgument(format!("image memory {} is not bound", buffer.id))
}

#[cfg(test)]
mod tests {
    use super::*;
    use domain::{DeviceIdentity, VendorBinding};

    #[test]
    fn test_capture_requires_bound_memory() {
        let mut sim = Simulated::<CameraState>::new();
        sim.connect(&DeviceIdentity::new("1").unwrap()).unwrap();

        let buffer = sim.allocate_image_memory(4, 2, 24).unwrap();
        assert!(sim.capture_frame(&buffer).is_err());

        sim.bind_image_memory(&buffer).unwrap();
        let frame = sim.capture_frame(&buffer).unwrap();
        assert_eq!(frame.len(), 24);
        assert!(frame.iter().all(|&b| b == 1));
    }

    #[test]
    fn test_exit_releases_memory() {
        let mut sim = Simulated::<CameraState>::new();
        let state = sim.state();
        sim.connect(&DeviceIdentity::new("1").unwrap()).unwrap();
        let buffer = sim.allocate_image_memory(4, 2, 8).unwrap();
        sim.bind_image_memory(&buffer).unwrap();

        sim.disconnect().unwrap();
        assert!(state.lock().memory.is_empty());
        assert_eq!(state.lock().bound, None);
    }
}

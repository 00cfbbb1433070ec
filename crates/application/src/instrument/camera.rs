use std::sync::Arc;

use tracing::{debug, warn};

use domain::binding::{CameraBinding, ExposureRange, ImageBuffer, PixelClockRange};
use domain::parameter::SensorInfo;
use domain::{DeviceError, DeviceIdentity, Result};
use infrastructure::config::CameraSettings;

use crate::device::{DeviceSession, Instrument, SessionRegistry};

/// One captured image, rows packed without padding
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Frame {
    pub width: u32,
    pub height: u32,
    pub bits_per_pixel: u32,
    pub data: Vec<u8>,
}

impl Frame {
    pub fn line_bytes(&self) -> usize {
        (self.width as usize * self.bits_per_pixel as usize).div_ceil(8)
    }

    /// Bytes of row `y`
    pub fn row(&self, y: u32) -> Option<&[u8]> {
        if y >= self.height {
            return None;
        }
        let start = y as usize * self.line_bytes();
        self.data.get(start..start + self.line_bytes())
    }
}

/// uEye industrial camera.
///
/// Opening allocates one full-sensor image buffer in the driver and binds
/// it; every capture goes into that buffer. The buffer is freed before the
/// camera is released.
pub struct Camera {
    session: DeviceSession<dyn CameraBinding>,
    settings: CameraSettings,
    sensor: Option<SensorInfo>,
    buffer: Option<ImageBuffer>,
}

impl Camera {
    pub fn new(
        identity: DeviceIdentity,
        binding: Box<dyn CameraBinding>,
        registry: Arc<SessionRegistry>,
        settings: CameraSettings,
    ) -> Self {
        Self {
            session: DeviceSession::new(identity, binding, registry),
            settings,
            sensor: None,
            buffer: None,
        }
    }

    pub fn with_verbose(mut self, verbose: bool) -> Self {
        self.session.set_verbose(verbose);
        self
    }

    pub fn session(&self) -> &DeviceSession<dyn CameraBinding> {
        &self.session
    }

    pub fn set_identity(&mut self, identity: DeviceIdentity) -> Result<()> {
        self.session.set_identity(identity)
    }

    /// Sensor description read while opening
    pub fn sensor(&self) -> Option<&SensorInfo> {
        self.sensor.as_ref()
    }

    pub fn exposure_range(&mut self) -> Result<ExposureRange> {
        self.session.call("exposure_range", |b| b.exposure_range())
    }

    /// Exposure in milliseconds
    pub fn exposure(&mut self) -> Result<f64> {
        self.session.call("exposure", |b| b.exposure())
    }

    pub fn set_exposure(&mut self, millis: f64) -> Result<()> {
        self.session.call("set_exposure", |b| apply_exposure(b, millis))
    }

    pub fn pixel_clock_range(&mut self) -> Result<PixelClockRange> {
        self.session.call("pixel_clock_range", |b| b.pixel_clock_range())
    }

    /// Pixel clock in MHz
    pub fn pixel_clock(&mut self) -> Result<u32> {
        self.session.call("pixel_clock", |b| b.pixel_clock())
    }

    pub fn set_pixel_clock(&mut self, mhz: u32) -> Result<()> {
        self.session.call("set_pixel_clock", |b| {
            let range = b.pixel_clock_range()?;
            DeviceError::check_range(
                "pixel clock",
                f64::from(mhz),
                f64::from(range.min),
                f64::from(range.max),
            )?;
            b.set_pixel_clock(mhz)
        })
    }

    /// Captures one frame into the bound image memory
    pub fn capture(&mut self) -> Result<Frame> {
        let buffer = self.buffer;
        let identity = self.session.identity().clone();
        self.session.call("capture", |b| {
            let buffer = buffer.ok_or_else(|| {
                DeviceError::InvalidArgument(format!("camera {identity} has no image memory bound"))
            })?;
            let data = b.capture_frame(&buffer)?;
            debug!(identity = %identity, bytes = data.len(), "Frame captured");
            Ok(Frame {
                width: buffer.width,
                height: buffer.height,
                bits_per_pixel: buffer.bits_per_pixel,
                data,
            })
        })
    }
}

fn apply_exposure(binding: &mut dyn CameraBinding, millis: f64) -> Result<()> {
    let range = binding.exposure_range()?;
    DeviceError::check_range("exposure", millis, range.min, range.max)?;
    binding.set_exposure(millis)
}

impl Instrument for Camera {
    /// Connects, configures the sensor and binds a full-sensor image buffer.
    ///
    /// Order: color mode, display mode, sensor info, exposure, trigger mode,
    /// memory allocation, memory binding.
    fn open(&mut self) -> Result<()> {
        let settings = self.settings.clone();
        let mut prepared = None;
        self.session.open_with(|b| {
            b.set_color_mode(settings.color_mode)?;
            b.set_display_mode(settings.display_mode)?;
            let sensor = b.sensor_info()?;
            apply_exposure(b, settings.exposure_ms)?;
            b.set_trigger_mode(settings.trigger_mode)?;

            let buffer =
                b.allocate_image_memory(sensor.max_width, sensor.max_height, settings.bits_per_pixel)?;
            if let Err(e) = b.bind_image_memory(&buffer) {
                if let Err(free) = b.free_image_memory(&buffer) {
                    warn!(error = %free, "Freeing unbound image memory failed");
                }
                return Err(e);
            }
            prepared = Some((sensor, buffer));
            Ok(())
        })?;

        if let Some((sensor, buffer)) = prepared {
            self.sensor = Some(sensor);
            self.buffer = Some(buffer);
        }
        Ok(())
    }

    /// Frees the image memory, then releases the camera
    fn close(&mut self) -> Result<()> {
        let buffer = self.buffer.take();
        self.session.close_with(|b| match buffer {
            Some(buffer) => b.free_image_memory(&buffer),
            None => Ok(()),
        })
    }

    fn is_open(&self) -> bool {
        self.session.is_open()
    }

    fn identity(&self) -> &DeviceIdentity {
        self.session.identity()
    }
}

impl Drop for Camera {
    fn drop(&mut self) {
        if let Err(e) = Instrument::close(self) {
            warn!(identity = %self.session.identity(), error = %e, "Close on drop failed");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use infrastructure::simulated::{CameraState, SimulatedCamera, SimulatorControl};
    use infrastructure::vendors::ueye::IS_NO_SUCCESS;
    use parking_lot::Mutex;

    fn camera(settings: CameraSettings) -> (Camera, SimulatorControl, Arc<Mutex<CameraState>>) {
        let mut state = CameraState::default();
        state.sensor.max_width = 4;
        state.sensor.max_height = 2;
        let binding = SimulatedCamera::with_state(state);
        let control = binding.control();
        let state = binding.state();
        let camera = Camera::new(
            DeviceIdentity::new("1").unwrap(),
            Box::new(binding),
            Arc::new(SessionRegistry::new()),
            settings,
        );
        (camera, control, state)
    }

    #[test]
    fn test_open_sequence() {
        let (mut camera, control, _) = camera(CameraSettings::default());
        camera.open().unwrap();

        assert_eq!(
            control.calls(),
            [
                "connect",
                "set_color_mode",
                "set_display_mode",
                "sensor_info",
                "exposure_range",
                "set_exposure",
                "set_trigger_mode",
                "allocate_image_memory",
                "bind_image_memory",
            ]
        );
        assert_eq!(camera.sensor().unwrap().max_width, 4);

        let frame = camera.capture().unwrap();
        assert_eq!(frame.data.len(), 4 * 2 * 3);
        assert_eq!(frame.row(1).unwrap().len(), 12);
        assert!(frame.row(2).is_none());
    }

    #[test]
    fn test_close_frees_memory_before_exit() {
        let (mut camera, control, state) = camera(CameraSettings::default());
        camera.open().unwrap();
        camera.close().unwrap();

        let calls = control.calls();
        assert_eq!(calls[calls.len() - 2..], ["free_image_memory", "disconnect"]);
        assert!(state.lock().memory.is_empty());
    }

    #[test]
    fn test_drop_frees_memory_before_exit() {
        let (mut camera, control, state) = camera(CameraSettings::default());
        camera.open().unwrap();
        assert!(!state.lock().memory.is_empty());

        drop(camera);

        let calls = control.calls();
        assert_eq!(calls[calls.len() - 2..], ["free_image_memory", "disconnect"]);
        assert!(state.lock().memory.is_empty());
    }

    #[test]
    fn test_failed_bind_frees_memory_and_stays_closed() {
        let (mut camera, control, state) = camera(CameraSettings::default());
        control.fail_next("bind_image_memory", IS_NO_SUCCESS, 1);

        let err = camera.open().unwrap_err();
        assert!(matches!(err, DeviceError::VendorStatus { code: IS_NO_SUCCESS, .. }));
        assert!(!camera.is_open());
        assert!(state.lock().memory.is_empty());
        assert_eq!(control.call_count("disconnect"), 1);
    }

    #[test]
    fn test_exposure_outside_device_range() {
        let (mut camera, control, _) = camera(CameraSettings {
            exposure_ms: 900.0,
            ..Default::default()
        });
        let err = camera.open().unwrap_err();
        assert!(matches!(err, DeviceError::Validation { quantity: "exposure", .. }));
        assert_eq!(control.call_count("set_exposure"), 0);
    }

    #[test]
    fn test_pixel_clock_checked_against_range() {
        let (mut camera, control, _) = camera(CameraSettings::default());
        camera.open().unwrap();
        assert!(matches!(
            camera.set_pixel_clock(50),
            Err(DeviceError::Validation { quantity: "pixel clock", .. })
        ));
        assert_eq!(control.call_count("set_pixel_clock"), 0);
        camera.set_pixel_clock(30).unwrap();
        assert_eq!(camera.pixel_clock().unwrap(), 30);
    }

    #[test]
    fn test_capture_needs_open_camera() {
        let (mut camera, control, _) = camera(CameraSettings::default());
        assert!(matches!(
            camera.capture(),
            Err(DeviceError::NotInSession { operation: "capture", .. })
        ));
        assert!(control.calls().is_empty());
    }
}

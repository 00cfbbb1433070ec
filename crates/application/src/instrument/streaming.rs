use std::sync::Arc;
use std::thread;

use tracing::{debug, warn};

use domain::binding::{StreamSample, StreamingMeterBinding};
use domain::{DeviceError, DeviceIdentity, Result};
use infrastructure::config::StreamingSettings;

use crate::device::{DeviceSession, Instrument, SessionRegistry};

/// Power meter read through start/read/stop data streams (Ophir)
pub struct StreamingPowerMeter {
    session: DeviceSession<dyn StreamingMeterBinding>,
    settings: StreamingSettings,
}

impl StreamingPowerMeter {
    pub fn new(
        identity: DeviceIdentity,
        binding: Box<dyn StreamingMeterBinding>,
        registry: Arc<SessionRegistry>,
        settings: StreamingSettings,
    ) -> Self {
        Self {
            session: DeviceSession::new(identity, binding, registry),
            settings,
        }
    }

    pub fn with_verbose(mut self, verbose: bool) -> Self {
        self.session.set_verbose(verbose);
        self
    }

    pub fn session(&self) -> &DeviceSession<dyn StreamingMeterBinding> {
        &self.session
    }

    pub fn set_identity(&mut self, identity: DeviceIdentity) -> Result<()> {
        self.session.set_identity(identity)
    }

    /// Samples from one stream cycle on `channel`.
    ///
    /// A cycle starts the stream, waits the data delay, reads and stops the
    /// stream. Cycles that return no samples are repeated up to
    /// `read_attempts` times.
    pub fn read(&mut self, channel: u32) -> Result<Vec<StreamSample>> {
        let attempts = self.settings.read_attempts.max(1);
        let delay = self.settings.data_delay();
        let identity = self.session.identity().clone();

        self.session.call("read", |b| {
            for attempt in 1..=attempts {
                b.start_stream(channel)?;
                thread::sleep(delay);
                let samples = b.stream_data(channel);
                b.stop_stream(channel)?;

                let samples = samples?;
                if !samples.is_empty() {
                    debug!(identity = %identity, channel, count = samples.len(), "Stream read");
                    return Ok(samples);
                }
                debug!(identity = %identity, channel, attempt, "Stream returned no data");
            }
            Err(DeviceError::Timeout(format!(
                "no data on channel {channel} of {identity} after {attempts} stream cycles"
            )))
        })
    }

    /// Latest value on the configured channel
    pub fn read_power(&mut self) -> Result<f64> {
        let channel = self.settings.channel;
        let samples = self.read(channel)?;
        samples
            .last()
            .map(|sample| sample.value)
            .ok_or_else(|| DeviceError::Timeout(format!("no data on channel {channel}")))
    }
}

impl Instrument for StreamingPowerMeter {
    fn open(&mut self) -> Result<()> {
        self.session.open()
    }

    /// Stops every stream before the device is released
    fn close(&mut self) -> Result<()> {
        self.session.close_with(|b| b.stop_all_streams())
    }

    fn is_open(&self) -> bool {
        self.session.is_open()
    }

    fn identity(&self) -> &DeviceIdentity {
        self.session.identity()
    }
}

impl Drop for StreamingPowerMeter {
    fn drop(&mut self) {
        if let Err(e) = Instrument::close(self) {
            warn!(identity = %self.session.identity(), error = %e, "Close on drop failed");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use infrastructure::simulated::{SimulatedStreamingMeter, SimulatorControl, StreamingState};

    fn meter(state: StreamingState) -> (StreamingPowerMeter, SimulatorControl) {
        let binding = SimulatedStreamingMeter::with_state(state);
        let control = binding.control();
        let mut meter = StreamingPowerMeter::new(
            DeviceIdentity::new("950123").unwrap(),
            Box::new(binding),
            Arc::new(SessionRegistry::new()),
            StreamingSettings {
                data_delay_ms: 0,
                channel: 0,
                read_attempts: 3,
            },
        );
        meter.open().unwrap();
        (meter, control)
    }

    #[test]
    fn test_read_cycles_the_stream() {
        let (mut meter, control) = meter(StreamingState::default());
        let samples = meter.read(0).unwrap();
        assert_eq!(samples.len(), 3);
        assert_eq!(
            control.calls()[1..],
            ["start_stream", "stream_data", "stop_stream"]
        );
    }

    #[test]
    fn test_empty_batches_are_retried() {
        let mut state = StreamingState::default();
        state.batches.extend([0, 0, 2]);
        let (mut meter, control) = meter(state);

        assert_eq!(meter.read(0).unwrap().len(), 2);
        assert_eq!(control.call_count("start_stream"), 3);
    }

    #[test]
    fn test_no_data_times_out() {
        let mut state = StreamingState::default();
        state.batches.extend([0, 0, 0]);
        let (mut meter, _) = meter(state);
        assert!(matches!(meter.read_power(), Err(DeviceError::Timeout(_))));
    }

    #[test]
    fn test_close_stops_streams_first() {
        let (mut meter, control) = meter(StreamingState::default());
        meter.close().unwrap();
        let calls = control.calls();
        assert_eq!(calls[calls.len() - 2..], ["stop_all_streams", "disconnect"]);
    }

    #[test]
    fn test_drop_stops_streams_and_releases() {
        let registry = Arc::new(SessionRegistry::new());
        let binding = SimulatedStreamingMeter::new();
        let control = binding.control();
        {
            let mut meter = StreamingPowerMeter::new(
                DeviceIdentity::new("950123").unwrap(),
                Box::new(binding),
                registry.clone(),
                StreamingSettings {
                    data_delay_ms: 0,
                    channel: 0,
                    read_attempts: 3,
                },
            );
            meter.open().unwrap();
            assert_eq!(registry.len(), 1);
        }

        assert_eq!(control.calls(), ["connect", "stop_all_streams", "disconnect"]);
        assert!(registry.is_empty());
    }

    #[test]
    fn test_drop_of_closed_meter_touches_nothing() {
        let (mut meter, control) = meter(StreamingState::default());
        meter.close().unwrap();
        control.clear_calls();
        drop(meter);
        assert!(control.calls().is_empty());
    }
}

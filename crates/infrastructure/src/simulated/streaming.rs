use std::collections::{BTreeSet, VecDeque};

use chrono::Utc;
use domain::binding::{StreamSample, StreamingMeterBinding};
use domain::{DeviceError, Result, StatusTranslator, VendorFamily};

use super::{Simulated, SimulatedDevice};
use crate::vendors::ophir::STATUS_TABLE;

/// Ophir Nova II with a thermal head on channel 0
#[derive(Debug, Clone)]
pub struct StreamingState {
    pub channels: u32,
    pub streaming: BTreeSet<u32>,
    /// Power reported while streaming, in watts
    pub power: f64,
    /// Samples per read; an entry of 0 yields an empty read
    pub batches: VecDeque<usize>,
}

impl Default for StreamingState {
    fn default() -> Self {
        Self {
            channels: 1,
            streaming: BTreeSet::new(),
            power: 0.5,
            batches: VecDeque::new(),
        }
    }
}

impl StreamingState {
    fn check_channel(&self, channel: u32) -> Result<()> {
        if channel >= self.channels {
            return Err(DeviceError::InvalidArgument(format!(
                "channel {channel} not present (device has {})",
                self.channels
            )));
        }
        Ok(())
    }
}

impl SimulatedDevice for StreamingState {
    const FAMILY: VendorFamily = VendorFamily::Ophir;

    fn status_table() -> &'static StatusTranslator {
        &STATUS_TABLE
    }

    fn on_disconnect(&mut self) {
        self.streaming.clear();
    }
}

impl StreamingMeterBinding for Simulated<StreamingState> {
    fn start_stream(&mut self, channel: u32) -> Result<()> {
        self.with("start_stream", |s| {
            s.check_channel(channel)?;
            s.streaming.insert(channel);
            Ok(())
        })
    }

    fn stream_data(&mut self, channel: u32) -> Result<Vec<StreamSample>> {
        self.with("stream_data", |s| {
            s.check_channel(channel)?;
            if !s.streaming.contains(&channel) {
                return Ok(Vec::new());
            }
            let count = s.batches.pop_front().unwrap_or(3);
            let taken_at = Utc::now();
            Ok((0..count)
                .map(|_| StreamSample {
                    value: s.power,
                    taken_at,
                    status: 0,
                })
                .collect())
        })
    }

    fn stop_stream(&mut self, channel: u32) -> Result<()> {
        self.with("stop_stream", |s| {
            s.streaming.remove(&channel);
            Ok(())
        })
    }

    fn stop_all_streams(&mut self) -> Result<()> {
        self.with("stop_all_streams", |s| {
            s.streaming.clear();
            Ok(())
        })
    }
}

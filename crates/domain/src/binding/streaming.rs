use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::VendorBinding;
use crate::error::Result;

/// One streamed measurement
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StreamSample {
    pub value: f64,
    pub taken_at: DateTime<Utc>,
    /// Vendor status word attached to the sample
    pub status: i32,
}

/// Power meter read through start/read/stop data streams (Ophir)
pub trait StreamingMeterBinding: VendorBinding {
    fn start_stream(&mut self, channel: u32) -> Result<()>;
    /// Samples buffered since the stream started; may be empty
    fn stream_data(&mut self, channel: u32) -> Result<Vec<StreamSample>>;
    fn stop_stream(&mut self, channel: u32) -> Result<()>;
    fn stop_all_streams(&mut self) -> Result<()>;
}

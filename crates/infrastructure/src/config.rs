use std::collections::HashMap;
use std::path::PathBuf;
use std::time::Duration;

use config::{Config, ConfigError, Environment, File};
use domain::ParameterBlock;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

#[derive(Debug, Deserialize, Serialize, Clone)]
#[serde(default)]
pub struct LibrarySettings {
    /// Location store, `~/.optobench/dlllocations.csv` when unset
    pub store_path: Option<PathBuf>,
    /// Root searched for vendor install folders
    pub search_root: PathBuf,
    /// Explicit library paths by family name, bypassing the store
    pub overrides: HashMap<String, PathBuf>,
}

impl Default for LibrarySettings {
    fn default() -> Self {
        Self {
            store_path: None,
            search_root: PathBuf::from("C:\\Program Files"),
            overrides: HashMap::new(),
        }
    }
}

#[derive(Debug, Deserialize, Serialize, Clone)]
#[serde(default)]
pub struct DiscoverySettings {
    pub listing_cap: usize,
}

impl Default for DiscoverySettings {
    fn default() -> Self {
        Self { listing_cap: 10 }
    }
}

#[derive(Debug, Deserialize, Serialize, Clone)]
#[serde(default)]
pub struct MotionSettings {
    /// Wait between requesting and reading the position
    pub position_settle_ms: u64,
}

impl Default for MotionSettings {
    fn default() -> Self {
        Self {
            position_settle_ms: 100,
        }
    }
}

impl MotionSettings {
    pub fn position_settle(&self) -> Duration {
        Duration::from_millis(self.position_settle_ms)
    }
}

#[derive(Debug, Deserialize, Serialize, Clone)]
#[serde(default)]
pub struct PowerMeterSettings {
    /// Attempts per measurement before giving up
    pub measure_attempts: u32,
    pub retry_delay_ms: u64,
    /// Communication timeout applied on open
    pub timeout_ms: Option<u32>,
}

impl Default for PowerMeterSettings {
    fn default() -> Self {
        Self {
            measure_attempts: 10,
            retry_delay_ms: 50,
            timeout_ms: None,
        }
    }
}

impl PowerMeterSettings {
    pub fn retry_delay(&self) -> Duration {
        Duration::from_millis(self.retry_delay_ms)
    }
}

#[derive(Debug, Deserialize, Serialize, Clone)]
#[serde(default)]
pub struct SpectrometerSettings {
    /// Integration time applied on open, in seconds
    pub integration_time: f64,
    /// Scans per averaged sweep
    pub average_count: u32,
    /// Wait after starting a scan before polling its status
    pub scan_settle_ms: u64,
    pub poll_interval_ms: u64,
    /// Status polls per scan before the sweep times out
    pub poll_limit: u32,
}

impl Default for SpectrometerSettings {
    fn default() -> Self {
        Self {
            integration_time: 0.01,
            average_count: 5,
            scan_settle_ms: 100,
            poll_interval_ms: 100,
            poll_limit: 600,
        }
    }
}

impl SpectrometerSettings {
    pub fn scan_settle(&self) -> Duration {
        Duration::from_millis(self.scan_settle_ms)
    }

    pub fn poll_interval(&self) -> Duration {
        Duration::from_millis(self.poll_interval_ms)
    }
}

#[derive(Debug, Deserialize, Serialize, Clone)]
#[serde(default)]
pub struct CameraSettings {
    /// `IS_CM_BGR8_PACKED`
    pub color_mode: i32,
    /// `IS_SET_DM_DIB`
    pub display_mode: i32,
    pub exposure_ms: f64,
    /// `IS_SET_TRIGGER_SOFTWARE`
    pub trigger_mode: i32,
    pub bits_per_pixel: u32,
}

impl Default for CameraSettings {
    fn default() -> Self {
        Self {
            color_mode: 1,
            display_mode: 1,
            exposure_ms: 10.0,
            trigger_mode: 0x1000,
            bits_per_pixel: 24,
        }
    }
}

#[derive(Debug, Deserialize, Serialize, Clone)]
#[serde(default)]
pub struct StreamingSettings {
    /// Wait between starting a stream and reading it
    pub data_delay_ms: u64,
    pub channel: u32,
    /// Stream cycles per read before giving up on empty data
    pub read_attempts: u32,
}

impl Default for StreamingSettings {
    fn default() -> Self {
        Self {
            data_delay_ms: 200,
            channel: 0,
            read_attempts: 10,
        }
    }
}

impl StreamingSettings {
    pub fn data_delay(&self) -> Duration {
        Duration::from_millis(self.data_delay_ms)
    }
}

/// Parameter mappings pushed to a motion stage after it opens
#[derive(Debug, Deserialize, Serialize, Clone, Default)]
#[serde(default)]
pub struct StageSettings {
    pub pid: Option<Map<String, Value>>,
    pub homing: Option<Map<String, Value>>,
    pub motor: Option<Map<String, Value>>,
    pub travel_limits: Option<Map<String, Value>>,
    pub velocity_limits: Option<Map<String, Value>>,
}

#[derive(Debug, Deserialize, Serialize, Clone, Default)]
#[serde(default)]
pub struct BenchConfig {
    pub libraries: LibrarySettings,
    pub discovery: DiscoverySettings,
    pub motion: MotionSettings,
    pub power_meter: PowerMeterSettings,
    pub spectrometer: SpectrometerSettings,
    pub camera: CameraSettings,
    pub streaming: StreamingSettings,
    /// Lifecycle messages at info instead of debug
    pub verbose: bool,
    /// Stage settings by name
    pub stages: HashMap<String, StageSettings>,
}

impl BenchConfig {
    pub fn load(config_dir: &str) -> Result<Self, ConfigError> {
        let run_mode = std::env::var("RUN_MODE").unwrap_or_else(|_| "development".into());

        let s = Config::builder()
            .add_source(File::with_name(&format!("{}/default", config_dir)).required(false))
            .add_source(File::with_name(&format!("{}/{}", config_dir, run_mode)).required(false))
            // Environment variables (e.g. OPTOBENCH__DISCOVERY__LISTING_CAP=4)
            .add_source(Environment::with_prefix("OPTOBENCH").separator("__"))
            .build()?;

        s.try_deserialize()
    }

    pub fn stage(&self, name: &str) -> Option<&StageSettings> {
        self.stages.get(name)
    }
}

/// Restores the vendor spelling of mapping keys.
///
/// Configuration keys are case-insensitive, so `proportionalgain` arrives
/// for `proportionalGain`. Keys that match no field are kept as they are and
/// still fail when the mapping is loaded.
pub fn canonical_keys<B: ParameterBlock>(raw: &Map<String, Value>) -> Map<String, Value> {
    raw.iter()
        .map(|(key, value)| {
            let name = B::schema()
                .iter()
                .find(|spec| spec.name.eq_ignore_ascii_case(key))
                .map_or_else(|| key.clone(), |spec| spec.name.to_string());
            (name, value.clone())
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use domain::parameter::PidParameters;

    #[test]
    fn test_empty_configuration_uses_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let config = BenchConfig::load(dir.path().to_str().unwrap()).unwrap();

        assert_eq!(config.discovery.listing_cap, 10);
        assert_eq!(config.motion.position_settle(), Duration::from_millis(100));
        assert_eq!(config.spectrometer.integration_time, 0.01);
        assert_eq!(config.spectrometer.average_count, 5);
        assert_eq!(config.streaming.data_delay(), Duration::from_millis(200));
        assert!(!config.verbose);
        assert!(config.stages.is_empty());
    }

    #[test]
    fn test_file_overrides_defaults() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(
            dir.path().join("default.toml"),
            r#"
verbose = true

[discovery]
listing_cap = 4

[power_meter]
measure_attempts = 3
timeout_ms = 2000

[stages.focus.pid]
proportionalGain = 500
integralGain = 200
"#,
        )
        .unwrap();

        let config = BenchConfig::load(dir.path().to_str().unwrap()).unwrap();
        assert!(config.verbose);
        assert_eq!(config.discovery.listing_cap, 4);
        assert_eq!(config.power_meter.measure_attempts, 3);
        assert_eq!(config.power_meter.timeout_ms, Some(2000));
        assert_eq!(config.power_meter.retry_delay_ms, 50);

        let pid = config.stage("focus").and_then(|s| s.pid.as_ref()).unwrap();
        let mut params = PidParameters::default();
        params.load_mapping(&canonical_keys::<PidParameters>(pid)).unwrap();
        assert_eq!(params.proportional_gain, 500);
        assert_eq!(params.integral_gain, 200);
    }

    #[test]
    fn test_canonical_keys_keeps_unknown_names() {
        let mut raw = Map::new();
        raw.insert("integrallimit".to_string(), Value::from(10));
        raw.insert("bogus".to_string(), Value::from(1));

        let mapping = canonical_keys::<PidParameters>(&raw);
        assert!(mapping.contains_key("integralLimit"));
        assert!(mapping.contains_key("bogus"));
        assert!(PidParameters::from_mapping(&mapping).is_err());
    }
}

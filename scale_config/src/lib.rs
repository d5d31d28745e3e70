#![cfg_attr(all(not(debug_assertions), not(test)), deny(warnings))]
#![cfg_attr(
    all(not(debug_assertions), not(test)),
    deny(clippy::all, clippy::pedantic, clippy::nursery)
)]
#![allow(clippy::module_name_repetitions, clippy::missing_errors_doc)]
//! Config schema and persisted channel state for the multi-channel scale.
//!
//! - `Config` and sub-structs are deserialized from TOML and validated.
//! - `StateStore` keeps the per-channel calibration/hysteresis state in a
//!   separate TOML file, written atomically so a power cut never leaves a
//!   half-written file behind.
pub mod atomic;

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

#[derive(Debug, Deserialize)]
#[serde(default)]
pub struct Device {
    /// Number of converter devices (more than one needs a bus multiplexer).
    pub adcs: u8,
    /// Differential inputs per converter (NAU7802: 2).
    pub channels_per_adc: u8,
    /// Linux I2C bus number (hardware builds only).
    pub i2c_bus: u8,
    /// 7-bit I2C address of the converter.
    pub i2c_address: u16,
    /// Max time to wait for a conversion before failing the read.
    pub read_timeout_ms: u64,
}

impl Default for Device {
    fn default() -> Self {
        Self {
            adcs: 1,
            channels_per_adc: 2,
            i2c_bus: 1,
            i2c_address: 0x2A,
            read_timeout_ms: 150,
        }
    }
}

#[derive(Debug, Deserialize)]
#[serde(default)]
pub struct FilterCfg {
    /// Samples per datapoint, fed through a median window of the same size.
    pub median_window: usize,
    /// Median window used while averaging during calibration (2x samples per phase).
    pub calibration_window: usize,
}

impl Default for FilterCfg {
    fn default() -> Self {
        Self {
            median_window: 9,
            calibration_window: 20,
        }
    }
}

#[derive(Debug, Deserialize)]
#[serde(default)]
pub struct HysteresisCfg {
    /// Weight change (grams) that flips a channel into the active state.
    pub allowed_variance_g: u32,
    /// Consecutive readings without such a change before returning to idle.
    pub updates_threshold: u32,
}

impl Default for HysteresisCfg {
    fn default() -> Self {
        Self {
            allowed_variance_g: 250,
            updates_threshold: 8,
        }
    }
}

#[derive(Debug, Deserialize)]
#[serde(default)]
pub struct CalibrationCfg {
    /// Reference weight used when `begin` forces a calibration.
    pub reference_grams: u32,
    /// Delay between consecutive raw reads while calibrating.
    pub sample_delay_ms: u64,
    /// Accepted relative error when verifying a calibration (0.03 = 3%).
    pub verify_tolerance: f32,
}

impl Default for CalibrationCfg {
    fn default() -> Self {
        Self {
            reference_grams: 4000,
            sample_delay_ms: 100,
            verify_tolerance: 0.03,
        }
    }
}

#[derive(Debug, Deserialize, Default)]
#[serde(default)]
pub struct SamplingCfg {
    /// Reads discarded after each channel select before the retained sample.
    pub dummy_reads: u8,
    /// Extra attempts for a failing read before the pass is aborted.
    pub read_retries: u8,
}

#[derive(Debug, Deserialize)]
#[serde(default)]
pub struct AfeCfg {
    /// Use the converter's asynchronous internal calibration when supported.
    pub enabled: bool,
    /// Readings are not trusted until this long after a calibration start.
    pub settle_ms: u64,
    /// Bound on waiting for calibration completion; 0 waits forever.
    pub ready_timeout_ms: u64,
    /// Status polling interval while waiting.
    pub poll_ms: u64,
}

impl Default for AfeCfg {
    fn default() -> Self {
        Self {
            enabled: false,
            settle_ms: 500,
            ready_timeout_ms: 1000,
            poll_ms: 5,
        }
    }
}

#[derive(Debug, Deserialize)]
#[serde(default)]
pub struct ScheduleCfg {
    /// Poll interval while any channel reports a recent weight change.
    pub short_interval_s: u64,
    /// Poll interval once every channel is idle.
    pub long_interval_s: u64,
}

impl Default for ScheduleCfg {
    fn default() -> Self {
        Self {
            short_interval_s: 30,
            long_interval_s: 300,
        }
    }
}

#[derive(Debug, Deserialize, Default)]
#[serde(default)]
pub struct Logging {
    pub file: Option<String>,  // path to .log (JSON lines)
    pub level: Option<String>, // "info","debug"
    /// Log rotation policy: "never" | "daily" | "hourly" (default: never)
    pub rotation: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(default)]
pub struct Simulation {
    /// Raw reading with nothing on the scale.
    pub zero_counts: i32,
    pub counts_per_gram: f32,
    /// Uniform noise amplitude added to every simulated read.
    pub noise_counts: i32,
    /// Load present on every channel at startup.
    pub load_g: f32,
    pub seed: u32,
    /// Status polls before a simulated AFE calibration completes.
    pub afe_polls: u32,
}

impl Default for Simulation {
    fn default() -> Self {
        Self {
            zero_counts: 8_000,
            counts_per_gram: 2.0,
            noise_counts: 400,
            load_g: 0.0,
            seed: 0x2545_F491,
            afe_polls: 3,
        }
    }
}

#[derive(Debug, Deserialize)]
#[serde(default)]
pub struct StateCfg {
    /// Where per-channel calibration state is persisted.
    pub path: PathBuf,
}

impl Default for StateCfg {
    fn default() -> Self {
        Self {
            path: PathBuf::from("scale_state.toml"),
        }
    }
}

#[derive(Debug, Deserialize)]
pub struct Config {
    pub device: Device,
    #[serde(default)]
    pub filter: FilterCfg,
    #[serde(default)]
    pub hysteresis: HysteresisCfg,
    #[serde(default)]
    pub calibration: CalibrationCfg,
    #[serde(default)]
    pub sampling: SamplingCfg,
    #[serde(default)]
    pub afe: AfeCfg,
    #[serde(default)]
    pub schedule: ScheduleCfg,
    #[serde(default)]
    pub logging: Logging,
    #[serde(default)]
    pub simulation: Simulation,
    #[serde(default)]
    pub state: StateCfg,
}

pub fn load_toml(s: &str) -> Result<Config, toml::de::Error> {
    toml::from_str::<Config>(s)
}

impl Config {
    /// Total number of weighing channels (one persisted slot each).
    pub fn slots(&self) -> usize {
        usize::from(self.device.adcs) * usize::from(self.device.channels_per_adc)
    }

    pub fn validate(&self) -> eyre::Result<()> {
        // Device
        if self.device.adcs == 0 {
            eyre::bail!("device.adcs must be >= 1");
        }
        if !(1..=2).contains(&self.device.channels_per_adc) {
            eyre::bail!("device.channels_per_adc must be 1 or 2");
        }
        if self.device.i2c_address > 0x7F {
            eyre::bail!("device.i2c_address must be a 7-bit address");
        }
        if self.device.read_timeout_ms == 0 {
            eyre::bail!("device.read_timeout_ms must be >= 1");
        }

        // Filter
        if self.filter.median_window == 0 {
            eyre::bail!("filter.median_window must be >= 1");
        }
        if self.filter.calibration_window == 0 {
            eyre::bail!("filter.calibration_window must be >= 1");
        }

        // Hysteresis
        if self.hysteresis.updates_threshold == 0 {
            eyre::bail!("hysteresis.updates_threshold must be >= 1");
        }

        // Calibration
        if self.calibration.reference_grams == 0 {
            eyre::bail!("calibration.reference_grams must be > 0");
        }
        if self.calibration.sample_delay_ms > 60_000 {
            eyre::bail!("calibration.sample_delay_ms is unreasonably large (>60s)");
        }
        if !(self.calibration.verify_tolerance > 0.0 && self.calibration.verify_tolerance <= 1.0) {
            eyre::bail!("calibration.verify_tolerance must be in (0.0, 1.0]");
        }

        // AFE
        if self.afe.poll_ms == 0 {
            eyre::bail!("afe.poll_ms must be >= 1");
        }
        if self.afe.settle_ms > 60_000 {
            eyre::bail!("afe.settle_ms is unreasonably large (>60s)");
        }

        // Schedule
        if self.schedule.short_interval_s == 0 || self.schedule.long_interval_s == 0 {
            eyre::bail!("schedule intervals must be >= 1s");
        }
        if self.schedule.short_interval_s > self.schedule.long_interval_s {
            eyre::bail!("schedule.short_interval_s must not exceed schedule.long_interval_s");
        }

        // Simulation
        if self.simulation.counts_per_gram == 0.0 || !self.simulation.counts_per_gram.is_finite() {
            eyre::bail!("simulation.counts_per_gram must be finite and non-zero");
        }
        if self.simulation.noise_counts < 0 {
            eyre::bail!("simulation.noise_counts must be >= 0");
        }

        Ok(())
    }
}

/// Persisted configuration of one weighing channel.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ChannelState {
    pub enabled: bool,
    /// Raw reading at zero load.
    pub offset: i32,
    /// Raw counts per gram; 0.0 means uncalibrated.
    pub slope: f32,
    /// Readings since the last significant weight change.
    pub updates: u32,
    pub last_weight: i32,
}

impl Default for ChannelState {
    fn default() -> Self {
        Self {
            enabled: true,
            offset: 0,
            slope: 0.0,
            updates: 0,
            last_weight: 0,
        }
    }
}

#[derive(Debug, Default, Serialize, Deserialize)]
struct StateFile {
    #[serde(default)]
    channels: Vec<ChannelState>,
}

/// File-backed store for `ChannelState` slots.
#[derive(Debug, Clone)]
pub struct StateStore {
    path: PathBuf,
}

impl StateStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Load exactly `slots` channel states. A missing file yields defaults;
    /// extra slots are dropped and missing ones are filled with defaults.
    pub fn load(&self, slots: usize) -> eyre::Result<Vec<ChannelState>> {
        let mut channels = if self.path.exists() {
            let text = std::fs::read_to_string(&self.path)
                .map_err(|e| eyre::eyre!("read state file {:?}: {}", self.path, e))?;
            let file: StateFile = toml::from_str(&text)
                .map_err(|e| eyre::eyre!("parse state file {:?}: {}", self.path, e))?;
            file.channels
        } else {
            Vec::new()
        };
        for (idx, ch) in channels.iter().enumerate() {
            if !ch.slope.is_finite() {
                eyre::bail!("state file {:?}: channel {} has a non-finite slope", self.path, idx);
            }
        }
        channels.resize(slots, ChannelState::default());
        Ok(channels)
    }

    pub fn save(&self, channels: &[ChannelState]) -> eyre::Result<()> {
        let file = StateFile {
            channels: channels.to_vec(),
        };
        let text = toml::to_string(&file).map_err(|e| eyre::eyre!("encode state: {}", e))?;
        atomic::write_atomic(&self.path, text.as_bytes())
            .map_err(|e| eyre::eyre!("write state file {:?}: {}", self.path, e))?;
        Ok(())
    }
}

//! Runtime configuration for the weighing engine.
//!
//! These are the plain structs the channels are built from. They are separate
//! from the TOML-deserialized config in `scale_config`; see `conversions`.

/// Median window sizes for live sampling and calibration averaging.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FilterCfg {
    /// Raw samples per datapoint; also the live median window.
    pub median_window: usize,
    /// Calibration median window (M); each calibration phase takes 2×M samples.
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

/// Weight-change detection thresholds.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct HysteresisCfg {
    /// A jump larger than this (grams) marks the channel as changing.
    pub allowed_variance_g: u32,
    /// Stable readings after which a changing channel returns to idle.
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

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct CalibrationCfg {
    /// Reference weight used when `begin` auto-calibrates an uncalibrated channel.
    pub reference_grams: u32,
    /// Pause between consecutive calibration samples (ms).
    pub sample_delay_ms: u64,
    /// Relative error accepted by `verify_calibration`.
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

/// Raw-read behavior of one converter channel.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SamplingCfg {
    /// Reads discarded after each channel select.
    pub dummy_reads: u8,
    /// Extra attempts after a failed read before the pass aborts.
    pub read_retries: u8,
    /// Max wait for one conversion (ms).
    pub read_timeout_ms: u64,
}

impl Default for SamplingCfg {
    fn default() -> Self {
        Self {
            dummy_reads: 0,
            read_retries: 0,
            read_timeout_ms: 150,
        }
    }
}

/// Analog front-end calibration (async variant).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AfeCfg {
    /// Request the async variant; honoured only if the driver supports it.
    pub enabled: bool,
    /// Minimum time after an AFE calibration start before readings are trusted (ms).
    pub settle_ms: u64,
    /// Bound for `wait_for_ready` (ms). 0 waits without a bound.
    pub ready_timeout_ms: u64,
    /// Status poll interval (ms).
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

/// Persisted per-channel calibration and change-tracking state.
///
/// `slope == 0.0` marks the channel as uncalibrated; weight is never computed
/// from it.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ChannelConfig {
    pub enabled: bool,
    /// Raw reading at zero load.
    pub offset: i32,
    /// Raw units per gram.
    pub slope: f32,
    /// Consecutive readings since the last detected weight change.
    pub updates: u32,
    /// Most recent weight in grams.
    pub last_weight: i32,
}

impl Default for ChannelConfig {
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

impl ChannelConfig {
    #[inline]
    pub fn is_calibrated(&self) -> bool {
        self.slope != 0.0
    }
}

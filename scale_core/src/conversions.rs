//! `From` implementations bridging `scale_config` types to `scale_core` types.

use crate::config::{AfeCfg, CalibrationCfg, ChannelConfig, FilterCfg, HysteresisCfg, SamplingCfg};

// ── FilterCfg ────────────────────────────────────────────────────────────────

impl From<&scale_config::FilterCfg> for FilterCfg {
    fn from(c: &scale_config::FilterCfg) -> Self {
        Self {
            median_window: c.median_window,
            calibration_window: c.calibration_window,
        }
    }
}

// ── HysteresisCfg ────────────────────────────────────────────────────────────

impl From<&scale_config::HysteresisCfg> for HysteresisCfg {
    fn from(c: &scale_config::HysteresisCfg) -> Self {
        Self {
            allowed_variance_g: c.allowed_variance_g,
            updates_threshold: c.updates_threshold,
        }
    }
}

// ── CalibrationCfg ───────────────────────────────────────────────────────────

impl From<&scale_config::CalibrationCfg> for CalibrationCfg {
    fn from(c: &scale_config::CalibrationCfg) -> Self {
        Self {
            reference_grams: c.reference_grams,
            sample_delay_ms: c.sample_delay_ms,
            verify_tolerance: c.verify_tolerance,
        }
    }
}

// ── SamplingCfg ──────────────────────────────────────────────────────────────

/// Sampling needs the device read timeout as well, so it converts from the
/// whole config.
impl From<&scale_config::Config> for SamplingCfg {
    fn from(c: &scale_config::Config) -> Self {
        Self {
            dummy_reads: c.sampling.dummy_reads,
            read_retries: c.sampling.read_retries,
            read_timeout_ms: c.device.read_timeout_ms,
        }
    }
}

// ── AfeCfg ───────────────────────────────────────────────────────────────────

impl From<&scale_config::AfeCfg> for AfeCfg {
    fn from(c: &scale_config::AfeCfg) -> Self {
        Self {
            enabled: c.enabled,
            settle_ms: c.settle_ms,
            ready_timeout_ms: c.ready_timeout_ms,
            poll_ms: c.poll_ms,
        }
    }
}

// ── ChannelConfig <-> ChannelState ───────────────────────────────────────────

impl From<&scale_config::ChannelState> for ChannelConfig {
    fn from(s: &scale_config::ChannelState) -> Self {
        Self {
            enabled: s.enabled,
            offset: s.offset,
            slope: s.slope,
            updates: s.updates,
            last_weight: s.last_weight,
        }
    }
}

impl From<&ChannelConfig> for scale_config::ChannelState {
    fn from(c: &ChannelConfig) -> Self {
        Self {
            enabled: c.enabled,
            offset: c.offset,
            slope: c.slope,
            updates: c.updates,
            last_weight: c.last_weight,
        }
    }
}

//! Type-state builder for `WeightChannel`.
//!
//! `WeightChannel::builder()` starts without a driver; `build()` only exists
//! once `with_driver` has supplied one. `ChannelBuilder::new()` plus
//! `try_build()` is the dynamically checked path.

use std::sync::Arc;

use scale_traits::clock::{Clock, MonotonicClock};
use scale_traits::AdcDriver;
use tracing::warn;

use crate::afe::AfeSettle;
use crate::channel::{CalibrationMode, WeightChannel};
use crate::config::*;
use crate::error::{BuildError, Result};
use crate::hysteresis::Hysteresis;
use crate::reader::RawReader;

/// Type-state marker: no driver supplied yet.
#[derive(Debug, Clone, Copy, Default)]
pub struct Missing;

pub struct ChannelBuilder<D> {
    driver: Option<D>,
    index: usize,
    adc_channel: u8,
    filter: FilterCfg,
    hysteresis: HysteresisCfg,
    calibration: CalibrationCfg,
    sampling: SamplingCfg,
    afe: AfeCfg,
    clock: Option<Arc<dyn Clock + Send + Sync>>,
    watchdog: Option<Box<dyn Fn()>>,
}

impl<D> Default for ChannelBuilder<D> {
    fn default() -> Self {
        Self {
            driver: None,
            index: 0,
            adc_channel: 0,
            filter: FilterCfg::default(),
            hysteresis: HysteresisCfg::default(),
            calibration: CalibrationCfg::default(),
            sampling: SamplingCfg::default(),
            afe: AfeCfg::default(),
            clock: None,
            watchdog: None,
        }
    }
}

impl ChannelBuilder<Missing> {
    pub fn with_driver<T: AdcDriver>(self, driver: T) -> ChannelBuilder<T> {
        ChannelBuilder {
            driver: Some(driver),
            index: self.index,
            adc_channel: self.adc_channel,
            filter: self.filter,
            hysteresis: self.hysteresis,
            calibration: self.calibration,
            sampling: self.sampling,
            afe: self.afe,
            clock: self.clock,
            watchdog: self.watchdog,
        }
    }
}

impl<D> ChannelBuilder<D> {
    /// Channel number used in logs, prompts and errors.
    pub fn with_index(mut self, index: usize) -> Self {
        self.index = index;
        self
    }

    /// Input on the converter device, `0..channel_count()`.
    pub fn with_adc_channel(mut self, adc_channel: u8) -> Self {
        self.adc_channel = adc_channel;
        self
    }

    pub fn with_filter(mut self, filter: FilterCfg) -> Self {
        self.filter = filter;
        self
    }

    pub fn with_hysteresis(mut self, hysteresis: HysteresisCfg) -> Self {
        self.hysteresis = hysteresis;
        self
    }

    pub fn with_calibration(mut self, calibration: CalibrationCfg) -> Self {
        self.calibration = calibration;
        self
    }

    pub fn with_sampling(mut self, sampling: SamplingCfg) -> Self {
        self.sampling = sampling;
        self
    }

    pub fn with_afe(mut self, afe: AfeCfg) -> Self {
        self.afe = afe;
        self
    }

    /// Take every engine section from a loaded configuration file.
    pub fn with_config(self, cfg: &scale_config::Config) -> Self {
        self.with_filter((&cfg.filter).into())
            .with_hysteresis((&cfg.hysteresis).into())
            .with_calibration((&cfg.calibration).into())
            .with_sampling(cfg.into())
            .with_afe((&cfg.afe).into())
    }

    /// Inject a custom clock (tests use a deterministic one).
    pub fn with_clock(mut self, clock: Arc<dyn Clock + Send + Sync>) -> Self {
        self.clock = Some(clock);
        self
    }

    /// Called once per raw sample during every sampling pass.
    pub fn with_watchdog(mut self, f: impl Fn() + 'static) -> Self {
        self.watchdog = Some(Box::new(f));
        self
    }
}

impl<D: AdcDriver> ChannelBuilder<D> {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn driver(mut self, driver: D) -> Self {
        self.driver = Some(driver);
        self
    }

    pub fn build(self) -> Result<WeightChannel<D>> {
        self.try_build()
    }

    pub fn try_build(self) -> Result<WeightChannel<D>> {
        let driver = self
            .driver
            .ok_or_else(|| eyre::Report::new(BuildError::MissingDriver))?;

        if self.filter.median_window == 0 {
            return Err(invalid("median_window must be >= 1"));
        }
        if self.filter.calibration_window == 0 {
            return Err(invalid("calibration_window must be >= 1"));
        }
        if self.hysteresis.updates_threshold == 0 {
            return Err(invalid("updates_threshold must be >= 1"));
        }
        if self.sampling.read_timeout_ms == 0 {
            return Err(invalid("read_timeout_ms must be >= 1"));
        }
        if self.calibration.reference_grams == 0 {
            return Err(invalid("reference_grams must be >= 1"));
        }
        let tol = self.calibration.verify_tolerance;
        if !(tol > 0.0 && tol <= 1.0) {
            return Err(invalid("verify_tolerance must be in (0, 1]"));
        }
        if self.afe.enabled && self.afe.poll_ms == 0 {
            return Err(invalid("afe poll_ms must be >= 1"));
        }

        let mode = if self.afe.enabled && driver.supports_afe_calibration() {
            CalibrationMode::AsyncAfe
        } else {
            if self.afe.enabled {
                warn!(
                    channel = self.index,
                    "driver has no async AFE calibration; using synchronous calibration"
                );
            }
            CalibrationMode::Synchronous
        };

        let clock = self
            .clock
            .unwrap_or_else(|| Arc::new(MonotonicClock::new()));

        Ok(WeightChannel::from_parts(
            self.index,
            RawReader::new(driver, self.adc_channel, &self.sampling),
            self.filter.median_window,
            self.filter.calibration_window,
            Hysteresis::new(&self.hysteresis),
            self.calibration,
            mode,
            AfeSettle::new(&self.afe),
            clock,
            self.watchdog,
        ))
    }
}

fn invalid(msg: &'static str) -> eyre::Report {
    eyre::Report::new(BuildError::InvalidConfig(msg))
}

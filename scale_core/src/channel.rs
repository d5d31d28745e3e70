//! One calibrated load-cell channel.

use std::sync::Arc;
use std::time::{Duration, Instant};

use scale_traits::{AdcDriver, Clock, Confirmation};
use tracing::{debug, error, info, warn};

use crate::afe::AfeSettle;
use crate::builder::{ChannelBuilder, Missing};
use crate::calibration::{CalibrationEngine, CalibrationOutcome};
use crate::config::{CalibrationCfg, ChannelConfig};
use crate::error::{Report, Result, ScaleError};
use crate::hysteresis::{ChangeState, Hysteresis};
use crate::median::MedianFilter;
use crate::reader::{Pacing, RawReader};
use crate::units::raw_to_grams;

/// How an uncalibrated channel is brought up and whether readings wait for
/// the AFE settle time.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CalibrationMode {
    /// Auto-calibrate with the reference weight at `begin`.
    Synchronous,
    /// Start the converter's internal AFE calibration at `begin` and gate
    /// readings on the settle time.
    AsyncAfe,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BeginStatus {
    /// Bound, enabled and calibrated.
    Ready,
    /// Bound but disabled in configuration.
    Disabled,
    /// Bound; an uncalibrated channel was calibrated synchronously.
    Calibrated,
    /// Bound; an async AFE calibration was started.
    CalibrationStarted,
    /// The converter failed to bind; the channel was force-disabled.
    HardwareDisabled,
}

impl BeginStatus {
    pub fn is_operational(self) -> bool {
        !matches!(self, BeginStatus::HardwareDisabled)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct WeightReading {
    pub weight_g: i32,
    /// Median raw value the weight was computed from.
    pub median: i32,
    pub weight_change: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Datapoint {
    Weight(WeightReading),
    /// Channel not bound or disabled; no hardware was touched.
    Disabled,
}

/// Result of checking a stored calibration against a known weight.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Verification {
    pub reference_grams: u32,
    pub measured_g: i32,
    /// `|reference - measured| / reference`
    pub error_ratio: f32,
    pub passed: bool,
}

pub struct WeightChannel<D> {
    index: usize,
    reader: RawReader<D>,
    filter: MedianFilter,
    calibration_window: usize,
    hysteresis: Hysteresis,
    calibration: CalibrationCfg,
    mode: CalibrationMode,
    afe: AfeSettle,
    clock: Arc<dyn Clock + Send + Sync>,
    watchdog: Option<Box<dyn Fn()>>,
    bound: bool,
    enabled: bool,
    weight_g: i32,
    change: ChangeState,
}

impl<D> core::fmt::Debug for WeightChannel<D> {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("WeightChannel")
            .field("index", &self.index)
            .field("adc_channel", &self.reader.adc_channel())
            .field("mode", &self.mode)
            .field("bound", &self.bound)
            .field("enabled", &self.enabled)
            .field("weight_g", &self.weight_g)
            .field("change", &self.change)
            .finish()
    }
}

impl WeightChannel<Missing> {
    pub fn builder() -> ChannelBuilder<Missing> {
        ChannelBuilder::default()
    }
}

impl<D: AdcDriver> WeightChannel<D> {
    #[allow(clippy::too_many_arguments)]
    pub(crate) fn from_parts(
        index: usize,
        reader: RawReader<D>,
        median_window: usize,
        calibration_window: usize,
        hysteresis: Hysteresis,
        calibration: CalibrationCfg,
        mode: CalibrationMode,
        afe: AfeSettle,
        clock: Arc<dyn Clock + Send + Sync>,
        watchdog: Option<Box<dyn Fn()>>,
    ) -> Self {
        Self {
            index,
            reader,
            filter: MedianFilter::new(median_window),
            calibration_window,
            hysteresis,
            calibration,
            mode,
            afe,
            clock,
            watchdog,
            bound: false,
            enabled: false,
            weight_g: 0,
            change: ChangeState::Idle,
        }
    }

    /// Bind the converter and attach the channel to its configuration slot.
    ///
    /// A missing slot is a configuration error. A bind failure force-disables
    /// the channel and is reported as `BeginStatus::HardwareDisabled`.
    pub fn begin(
        &mut self,
        cfg: Option<&mut ChannelConfig>,
        confirm: &mut dyn Confirmation,
    ) -> Result<BeginStatus> {
        let Some(cfg) = cfg else {
            error!(channel = self.index, "no configuration slot");
            return Err(Report::new(ScaleError::Config(format!(
                "scale-{} has no configuration slot",
                self.index
            ))));
        };

        if let Err(e) = self.reader.bind() {
            error!(channel = self.index, error = %e, "converter bind failed; disabling channel");
            cfg.enabled = false;
            self.enabled = false;
            self.bound = false;
            return Ok(BeginStatus::HardwareDisabled);
        }
        self.bound = true;
        self.enabled = cfg.enabled;
        self.weight_g = cfg.last_weight;

        if !cfg.enabled {
            info!(channel = self.index, "channel disabled in configuration");
            return Ok(BeginStatus::Disabled);
        }
        if cfg.is_calibrated() {
            debug!(channel = self.index, slope = cfg.slope, offset = cfg.offset, "channel ready");
            return Ok(BeginStatus::Ready);
        }

        match self.mode {
            CalibrationMode::Synchronous => {
                warn!(channel = self.index, "forcing recalibration (invalid slope)");
                self.calibrate(cfg, self.calibration.reference_grams, confirm)?;
                Ok(BeginStatus::Calibrated)
            }
            CalibrationMode::AsyncAfe => {
                self.afe
                    .begin_async_calibration(self.reader.driver_mut(), self.clock.as_ref())?;
                Ok(BeginStatus::CalibrationStarted)
            }
        }
    }

    /// Take one weight reading and update the change-tracking state.
    ///
    /// Writes `updates` and `last_weight` of `cfg`; nothing else.
    pub fn datapoint(&mut self, cfg: &mut ChannelConfig) -> Result<Datapoint> {
        self.enabled = cfg.enabled;
        if !self.bound || !cfg.enabled {
            return Ok(Datapoint::Disabled);
        }
        if !cfg.is_calibrated() {
            warn!(channel = self.index, "reading skipped: channel has slope 0.0");
            return Err(self.uncalibrated());
        }
        self.settle();

        let median = self.sample(self.filter.capacity(), Duration::ZERO)?;
        let weight_g = raw_to_grams(median, cfg.offset, cfg.slope).ok_or_else(|| self.uncalibrated())?;
        self.change = self
            .hysteresis
            .update(self.change, weight_g, cfg.last_weight, &mut cfg.updates);
        debug!(
            channel = self.index,
            median,
            weight_g,
            delta = i64::from(weight_g) - i64::from(cfg.last_weight),
            weight_change = self.change.is_active(),
            updates = cfg.updates,
            "datapoint"
        );
        cfg.last_weight = weight_g;
        self.weight_g = weight_g;
        Ok(Datapoint::Weight(WeightReading {
            weight_g,
            median,
            weight_change: self.change.is_active(),
        }))
    }

    /// Run the calibration protocol; `reference_grams == 0` tares.
    pub fn calibrate(
        &mut self,
        cfg: &mut ChannelConfig,
        reference_grams: u32,
        confirm: &mut dyn Confirmation,
    ) -> Result<CalibrationOutcome> {
        self.ensure_bound()?;
        self.settle();
        let pacing = Pacing {
            delay: Duration::from_millis(self.calibration.sample_delay_ms),
            clock: self.clock.as_ref(),
            watchdog: self.watchdog.as_deref(),
        };
        let result = CalibrationEngine::new(
            self.index,
            &mut self.reader,
            confirm,
            pacing,
            self.calibration_window,
            reference_grams,
        )
        .run(cfg);
        self.enabled = cfg.enabled;
        self.weight_g = cfg.last_weight;
        result
    }

    pub fn tare(
        &mut self,
        cfg: &mut ChannelConfig,
        confirm: &mut dyn Confirmation,
    ) -> Result<CalibrationOutcome> {
        self.calibrate(cfg, 0, confirm)
    }

    /// Measure a known weight with the stored calibration. Never writes `cfg`.
    pub fn verify_calibration(
        &mut self,
        cfg: &ChannelConfig,
        reference_grams: u32,
        tolerance: f32,
        confirm: &mut dyn Confirmation,
    ) -> Result<Verification> {
        self.ensure_bound()?;
        if reference_grams == 0 {
            return Err(Report::new(ScaleError::Config(
                "verification needs a non-zero reference weight".into(),
            )));
        }
        if !cfg.is_calibrated() {
            return Err(self.uncalibrated());
        }
        let prompt = format!(
            "Place {:.1} kg on scale-{} to verify, then confirm",
            f64::from(reference_grams) / 1000.0,
            self.index
        );
        if !confirm.await_confirmation(&prompt) {
            return Err(Report::new(ScaleError::CalibrationDeclined {
                channel: self.index,
            }));
        }
        self.settle();

        let samples = self.calibration_window.max(1).saturating_mul(2);
        let delay = Duration::from_millis(self.calibration.sample_delay_ms);
        let mut filter = MedianFilter::new(self.calibration_window);
        let pacing = Pacing {
            delay,
            clock: self.clock.as_ref(),
            watchdog: self.watchdog.as_deref(),
        };
        let median = self.reader.sample_median(&mut filter, samples, &pacing)?;
        let measured_g = raw_to_grams(median, cfg.offset, cfg.slope).ok_or_else(|| self.uncalibrated())?;

        let reference = f64::from(reference_grams);
        let error_ratio = ((reference - f64::from(measured_g)).abs() / reference) as f32;
        let passed = error_ratio <= tolerance;
        info!(
            channel = self.index,
            reference_grams,
            measured_g,
            error_pct = error_ratio * 100.0,
            passed,
            "calibration verified"
        );
        Ok(Verification {
            reference_grams,
            measured_g,
            error_ratio,
            passed,
        })
    }

    /// Start an AFE calibration and wait for the converter to report completion.
    pub fn recalibrate_afe(&mut self) -> Result<()> {
        self.ensure_bound()?;
        if self.mode != CalibrationMode::AsyncAfe {
            return Err(Report::new(ScaleError::Config(format!(
                "scale-{} does not use AFE calibration",
                self.index
            ))));
        }
        self.afe
            .begin_async_calibration(self.reader.driver_mut(), self.clock.as_ref())?;
        let timeout = self.afe.ready_timeout();
        self.afe
            .wait_for_ready(self.reader.driver_mut(), self.clock.as_ref(), timeout)
    }

    fn settle(&self) {
        if self.mode == CalibrationMode::AsyncAfe {
            self.afe
                .enforce_settle_time(self.clock.as_ref(), self.afe.settle_time());
        }
    }

    fn sample(&mut self, samples: usize, delay: Duration) -> Result<i32> {
        let pacing = Pacing {
            delay,
            clock: self.clock.as_ref(),
            watchdog: self.watchdog.as_deref(),
        };
        self.reader.sample_median(&mut self.filter, samples, &pacing)
    }

    fn ensure_bound(&self) -> Result<()> {
        if self.bound {
            Ok(())
        } else {
            Err(Report::new(ScaleError::Config(format!(
                "scale-{} has not been started",
                self.index
            ))))
        }
    }

    fn uncalibrated(&self) -> Report {
        Report::new(ScaleError::Uncalibrated {
            channel: self.index,
        })
    }
}

impl<D> WeightChannel<D> {
    /// Bound and enabled as of the last operation or slot reload.
    pub fn enabled(&self) -> bool {
        self.bound && self.enabled
    }

    /// Pick up the enabled flag of a swapped-in slot.
    pub(crate) fn refresh(&mut self, cfg: Option<&ChannelConfig>) {
        self.enabled = cfg.is_some_and(|c| c.enabled);
    }

    /// Last computed weight in grams.
    pub fn weight(&self) -> i32 {
        self.weight_g
    }

    pub fn channel_index(&self) -> usize {
        self.index
    }

    pub fn recent_weight_change(&self) -> bool {
        self.change.is_active()
    }

    pub fn change_state(&self) -> ChangeState {
        self.change
    }

    pub fn mode(&self) -> CalibrationMode {
        self.mode
    }

    pub fn is_bound(&self) -> bool {
        self.bound
    }

    pub fn adc_channel(&self) -> u8 {
        self.reader.adc_channel()
    }

    pub fn last_calibration_start(&self) -> Option<Instant> {
        self.afe.last_calibration_start()
    }

    pub fn driver(&self) -> &D {
        self.reader.driver()
    }

    pub fn driver_mut(&mut self) -> &mut D {
        self.reader.driver_mut()
    }
}

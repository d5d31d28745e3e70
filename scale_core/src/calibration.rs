//! Tare and two-point calibration protocol.
//!
//! ```text
//! AwaitEmptyConfirm -> SamplingBaseline -+-(reference == 0)--------------------------------> Finalize -> Done
//!                                        +-> AwaitReferenceConfirm -> SamplingReference -> ComputeSlope -+
//! ```
//! Any sampling fault or declined confirmation ends in `Error`. A zero slope
//! disables the channel, finalizes the offset, and then ends in `Error`.

use scale_traits::{AdcDriver, Confirmation};
use tracing::{debug, info, warn};

use crate::config::ChannelConfig;
use crate::error::{Report, Result, ScaleError};
use crate::median::MedianFilter;
use crate::reader::{Pacing, RawReader};
use crate::units::slope_from_medians;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CalibrationState {
    AwaitEmptyConfirm,
    SamplingBaseline,
    AwaitReferenceConfirm,
    SamplingReference,
    ComputeSlope,
    Finalize,
    Done,
    Error,
}

impl CalibrationState {
    pub fn is_terminal(self) -> bool {
        matches!(self, CalibrationState::Done | CalibrationState::Error)
    }
}

/// What a finished calibration measured and left in the channel config.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct CalibrationOutcome {
    /// Baseline (empty scale) median, now the offset.
    pub before: i32,
    /// Reference median; `None` for a tare.
    pub after: Option<i32>,
    /// Slope in effect after calibration.
    pub slope: f32,
}

pub struct CalibrationEngine<'a, D> {
    channel: usize,
    reader: &'a mut RawReader<D>,
    confirm: &'a mut dyn Confirmation,
    pacing: Pacing<'a>,
    filter: MedianFilter,
    reference_grams: u32,
    state: CalibrationState,
    before: Option<i32>,
    after: Option<i32>,
    zero_slope: bool,
}

impl<'a, D: AdcDriver> CalibrationEngine<'a, D> {
    pub(crate) fn new(
        channel: usize,
        reader: &'a mut RawReader<D>,
        confirm: &'a mut dyn Confirmation,
        pacing: Pacing<'a>,
        window: usize,
        reference_grams: u32,
    ) -> Self {
        Self {
            channel,
            reader,
            confirm,
            pacing,
            filter: MedianFilter::new(window),
            reference_grams,
            state: CalibrationState::AwaitEmptyConfirm,
            before: None,
            after: None,
            zero_slope: false,
        }
    }

    pub fn state(&self) -> CalibrationState {
        self.state
    }

    /// Advance by one state. Terminal states are left unchanged.
    pub fn step(&mut self, cfg: &mut ChannelConfig) -> Result<CalibrationState> {
        use CalibrationState::*;
        let next = match self.state {
            AwaitEmptyConfirm => {
                let prompt = if self.reference_grams == 0 {
                    format!("Taring scale-{}: remove all weight, then confirm", self.channel)
                } else {
                    format!(
                        "Calibrating scale-{}: remove all weight, then confirm",
                        self.channel
                    )
                };
                self.confirm_or_fail(&prompt)?;
                SamplingBaseline
            }
            SamplingBaseline => {
                let before = self.sample_phase()?;
                debug!(channel = self.channel, before, "baseline sampled");
                self.before = Some(before);
                if self.reference_grams == 0 {
                    Finalize
                } else {
                    AwaitReferenceConfirm
                }
            }
            AwaitReferenceConfirm => {
                let prompt = format!(
                    "Place {:.1} kg on scale-{}, then confirm",
                    f64::from(self.reference_grams) / 1000.0,
                    self.channel
                );
                self.confirm_or_fail(&prompt)?;
                SamplingReference
            }
            SamplingReference => {
                let after = self.sample_phase()?;
                debug!(channel = self.channel, after, "reference sampled");
                self.after = Some(after);
                ComputeSlope
            }
            ComputeSlope => {
                let before = self.before.unwrap_or_default();
                let after = self.after.unwrap_or(before);
                let slope = slope_from_medians(before, after, self.reference_grams);
                if slope == 0.0 {
                    warn!(channel = self.channel, before, after, "zero slope; disabling channel");
                    cfg.enabled = false;
                    self.zero_slope = true;
                } else {
                    cfg.slope = slope;
                }
                Finalize
            }
            Finalize => {
                cfg.offset = self.before.unwrap_or(cfg.offset);
                cfg.last_weight = 0;
                if self.zero_slope {
                    self.state = Error;
                    return Err(Report::new(ScaleError::InvalidCalibration {
                        channel: self.channel,
                    }));
                }
                info!(
                    channel = self.channel,
                    offset = cfg.offset,
                    slope = cfg.slope,
                    "calibration stored"
                );
                Done
            }
            Done | Error => self.state,
        };
        self.state = next;
        Ok(next)
    }

    /// Step until `Done`; the first error is returned.
    pub fn run(mut self, cfg: &mut ChannelConfig) -> Result<CalibrationOutcome> {
        while !self.state.is_terminal() {
            self.step(cfg)?;
        }
        Ok(CalibrationOutcome {
            before: cfg.offset,
            after: self.after,
            slope: cfg.slope,
        })
    }

    fn confirm_or_fail(&mut self, prompt: &str) -> Result<()> {
        if self.confirm.await_confirmation(prompt) {
            return Ok(());
        }
        info!(channel = self.channel, "calibration declined");
        self.state = CalibrationState::Error;
        Err(Report::new(ScaleError::CalibrationDeclined {
            channel: self.channel,
        }))
    }

    fn sample_phase(&mut self) -> Result<i32> {
        let samples = self.filter.capacity().saturating_mul(2);
        match self
            .reader
            .sample_median(&mut self.filter, samples, &self.pacing)
        {
            Ok(median) => Ok(median),
            Err(e) => {
                self.state = CalibrationState::Error;
                Err(e)
            }
        }
    }
}

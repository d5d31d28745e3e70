//! Raw reads from one converter channel.

use std::time::Duration;

use scale_traits::{AdcDriver, Clock};
use tracing::{trace, warn};

use crate::config::SamplingCfg;
use crate::error::{Report, Result, ScaleError};
use crate::hw_error::map_hw_error;
use crate::median::MedianFilter;

/// Timing and supervision for one sampling pass.
pub(crate) struct Pacing<'a> {
    /// Pause between consecutive samples.
    pub delay: Duration,
    pub clock: &'a dyn Clock,
    /// Invoked once per raw sample.
    pub watchdog: Option<&'a dyn Fn()>,
}

/// One physical converter channel behind an `AdcDriver`.
pub struct RawReader<D> {
    driver: D,
    adc_channel: u8,
    dummy_reads: u8,
    retries: u8,
    timeout: Duration,
}

impl<D> RawReader<D> {
    pub fn adc_channel(&self) -> u8 {
        self.adc_channel
    }

    pub fn driver(&self) -> &D {
        &self.driver
    }

    pub fn driver_mut(&mut self) -> &mut D {
        &mut self.driver
    }

    pub fn into_driver(self) -> D {
        self.driver
    }
}

impl<D: AdcDriver> RawReader<D> {
    pub fn new(driver: D, adc_channel: u8, sampling: &SamplingCfg) -> Self {
        Self {
            driver,
            adc_channel,
            dummy_reads: sampling.dummy_reads,
            retries: sampling.read_retries,
            timeout: Duration::from_millis(sampling.read_timeout_ms),
        }
    }

    pub fn bind(&mut self) -> Result<()> {
        self.driver
            .bind()
            .map_err(|e| Report::new(map_hw_error(e.as_ref())))
    }

    /// Take one retained sample: select the channel, discard the settle reads,
    /// then read. Failed attempts are retried up to `read_retries` times.
    pub fn read(&mut self) -> Result<i32> {
        let channels = self.driver.channel_count();
        if self.adc_channel >= channels {
            return Err(Report::new(ScaleError::UnsupportedChannel {
                index: self.adc_channel,
                channels,
            }));
        }
        let mut attempt = 0u8;
        loop {
            match self.try_read() {
                Ok(raw) => return Ok(raw),
                Err(e) if attempt < self.retries => {
                    attempt += 1;
                    warn!(adc_channel = self.adc_channel, attempt, error = %e, "raw read failed; retrying");
                }
                Err(e) => return Err(Report::new(e)),
            }
        }
    }

    fn try_read(&mut self) -> std::result::Result<i32, ScaleError> {
        self.driver
            .select_channel(self.adc_channel)
            .map_err(|e| map_hw_error(e.as_ref()))?;
        for _ in 0..self.dummy_reads {
            self.driver
                .read_raw(self.timeout)
                .map_err(|e| map_hw_error(e.as_ref()))?;
        }
        let raw = self
            .driver
            .read_raw(self.timeout)
            .map_err(|e| map_hw_error(e.as_ref()))?;
        trace!(adc_channel = self.adc_channel, raw, "raw sample");
        Ok(raw)
    }

    /// Feed `samples` reads through `filter` (cleared first) and return the
    /// median of the final window. Any read fault aborts the pass.
    pub(crate) fn sample_median(
        &mut self,
        filter: &mut MedianFilter,
        samples: usize,
        pacing: &Pacing<'_>,
    ) -> Result<i32> {
        filter.clear();
        let samples = samples.max(1);
        let mut median = 0;
        for i in 0..samples {
            if let Some(kick) = pacing.watchdog {
                kick();
            }
            median = filter.push(self.read()?);
            if i + 1 < samples && !pacing.delay.is_zero() {
                pacing.clock.sleep(pacing.delay);
            }
        }
        Ok(median)
    }
}

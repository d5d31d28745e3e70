//! Analog front-end settle control (async calibration variant).
//!
//! Readings taken right after an AFE recalibration are unreliable even when
//! the converter already reports completion, so every datapoint first waits
//! out the settle time measured from the last calibration start.

use std::time::{Duration, Instant};

use scale_traits::{AdcDriver, AfeStatus, Clock};
use tracing::{debug, info, warn};

use crate::config::AfeCfg;
use crate::error::{Report, Result, ScaleError};
use crate::hw_error::map_hw_error;

#[derive(Debug, Clone)]
pub struct AfeSettle {
    settle: Duration,
    ready_timeout: Option<Duration>,
    poll: Duration,
    started_at: Option<Instant>,
}

impl AfeSettle {
    pub fn new(cfg: &AfeCfg) -> Self {
        Self {
            settle: Duration::from_millis(cfg.settle_ms),
            ready_timeout: (cfg.ready_timeout_ms > 0)
                .then(|| Duration::from_millis(cfg.ready_timeout_ms)),
            poll: Duration::from_millis(cfg.poll_ms.max(1)),
            started_at: None,
        }
    }

    pub fn settle_time(&self) -> Duration {
        self.settle
    }

    /// Configured bound for `wait_for_ready`; `None` means unbounded.
    pub fn ready_timeout(&self) -> Option<Duration> {
        self.ready_timeout
    }

    pub fn last_calibration_start(&self) -> Option<Instant> {
        self.started_at
    }

    /// Record the start time and ask the driver to begin calibrating.
    pub fn begin_async_calibration<D: AdcDriver + ?Sized>(
        &mut self,
        driver: &mut D,
        clock: &dyn Clock,
    ) -> Result<()> {
        self.started_at = Some(clock.now());
        driver
            .start_afe_calibration()
            .map_err(|e| Report::new(map_hw_error(e.as_ref())))?;
        info!("AFE calibration started");
        Ok(())
    }

    /// Poll the driver until it reports completion, failure, or `timeout` elapses.
    pub fn wait_for_ready<D: AdcDriver + ?Sized>(
        &self,
        driver: &mut D,
        clock: &dyn Clock,
        timeout: Option<Duration>,
    ) -> Result<()> {
        let start = clock.now();
        loop {
            let status = driver
                .calibration_status()
                .map_err(|e| Report::new(map_hw_error(e.as_ref())))?;
            match status {
                AfeStatus::Ok => {
                    debug!(waited_ms = clock.ms_since(start), "AFE calibration complete");
                    return Ok(());
                }
                AfeStatus::Failed => {
                    warn!("AFE calibration reported failure");
                    return Err(Report::new(ScaleError::AfeCalibrationFailed));
                }
                AfeStatus::InProgress => {}
            }
            if let Some(limit) = timeout {
                if clock.now().saturating_duration_since(start) >= limit {
                    return Err(Report::new(ScaleError::AfeTimeout));
                }
            }
            clock.sleep(self.poll);
        }
    }

    /// Block until `min_duration` has passed since the last calibration start.
    /// Returns how long it waited.
    pub fn enforce_settle_time(&self, clock: &dyn Clock, min_duration: Duration) -> Duration {
        let Some(start) = self.started_at else {
            return Duration::ZERO;
        };
        let elapsed = clock.now().saturating_duration_since(start);
        if elapsed >= min_duration {
            return Duration::ZERO;
        }
        let remaining = min_duration - elapsed;
        debug!(remaining_ms = remaining.as_millis() as u64, "waiting for AFE settle");
        clock.sleep(remaining);
        remaining
    }
}

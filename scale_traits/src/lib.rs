//! Hardware-facing seams for the weighing engine.
//!
//! The core never talks to a converter, a prompt or a wall clock directly;
//! everything goes through the traits in this crate so that the same engine
//! runs against the NAU7802, the simulator, or scripted test doubles.

pub mod clock;

pub use clock::{Clock, MonotonicClock};

use std::time::Duration;

/// Error type crossing the driver boundary.
pub type HwResult<T> = Result<T, Box<dyn std::error::Error + Send + Sync>>;

/// Result of polling an asynchronous analog-front-end calibration.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AfeStatus {
    InProgress,
    Ok,
    Failed,
}

/// One converter device exposing `channel_count()` multiplexed inputs.
pub trait AdcDriver {
    /// Bring the device up. Called once per channel from `begin`.
    fn bind(&mut self) -> HwResult<()>;

    /// Number of inputs on this device (`channels_per_device`).
    fn channel_count(&self) -> u8;

    fn select_channel(&mut self, index: u8) -> HwResult<()>;

    /// Block until a conversion is ready (or `timeout`) and return it.
    fn read_raw(&mut self, timeout: Duration) -> HwResult<i32>;

    /// Whether `start_afe_calibration` / `calibration_status` are backed by hardware.
    fn supports_afe_calibration(&self) -> bool {
        false
    }

    fn start_afe_calibration(&mut self) -> HwResult<()> {
        Err("asynchronous AFE calibration not supported by this driver".into())
    }

    fn calibration_status(&mut self) -> HwResult<AfeStatus> {
        Ok(AfeStatus::Ok)
    }
}

impl<T: AdcDriver + ?Sized> AdcDriver for Box<T> {
    fn bind(&mut self) -> HwResult<()> {
        (**self).bind()
    }
    fn channel_count(&self) -> u8 {
        (**self).channel_count()
    }
    fn select_channel(&mut self, index: u8) -> HwResult<()> {
        (**self).select_channel(index)
    }
    fn read_raw(&mut self, timeout: Duration) -> HwResult<i32> {
        (**self).read_raw(timeout)
    }
    fn supports_afe_calibration(&self) -> bool {
        (**self).supports_afe_calibration()
    }
    fn start_afe_calibration(&mut self) -> HwResult<()> {
        (**self).start_afe_calibration()
    }
    fn calibration_status(&mut self) -> HwResult<AfeStatus> {
        (**self).calibration_status()
    }
}

/// Source of the "proceed" signal used between calibration phases.
///
/// Implementations may prompt a human, wait for a remote trigger, or answer
/// from a script. Returning `false` declines the calibration.
pub trait Confirmation {
    fn await_confirmation(&mut self, prompt: &str) -> bool;
}

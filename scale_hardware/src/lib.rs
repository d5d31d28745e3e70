//! Converter drivers for the weighing engine.
//!
//! - `SimulatedAdc`: multi-channel stand-in used by default and in tests
//! - `nau7802::Nau7802`: 24-bit I2C load-cell ADC (feature `hardware`, Linux only)
pub mod error;
#[cfg(all(feature = "hardware", target_os = "linux"))]
pub mod nau7802;
pub mod util;

use std::cell::RefCell;
use std::rc::Rc;
use std::time::Duration;

use scale_traits::{AdcDriver, AfeStatus, HwResult};

use crate::error::HwError;

#[derive(Debug)]
struct SimState {
    channels: u8,
    selected: u8,
    bound: bool,
    zero_counts: i32,
    counts_per_gram: f32,
    noise_counts: i32,
    loads_g: Vec<f32>,
    rng: u32,
    reads: u64,
    fail_bind: bool,
    fail_reads: bool,
    afe_supported: bool,
    afe_polls: u32,
    afe_remaining: Option<u32>,
    afe_fails: bool,
}

impl SimState {
    fn next_noise(&mut self) -> i32 {
        if self.noise_counts == 0 {
            return 0;
        }
        let mut x = self.rng;
        x ^= x << 13;
        x ^= x >> 17;
        x ^= x << 5;
        self.rng = x;
        let n = i64::from(self.noise_counts);
        let offset = i64::from(x) % (2 * n + 1) - n;
        i32::try_from(offset).unwrap_or(0)
    }
}

/// Simulated converter device.
///
/// Clones share the same device state, so one handle can be given to each
/// channel of the device while the test (or CLI) keeps another to place loads.
#[derive(Debug, Clone)]
pub struct SimulatedAdc {
    state: Rc<RefCell<SimState>>,
}

impl SimulatedAdc {
    pub fn new(channels: u8) -> Self {
        Self {
            state: Rc::new(RefCell::new(SimState {
                channels,
                selected: 0,
                bound: false,
                zero_counts: 8_000,
                counts_per_gram: 2.0,
                noise_counts: 0,
                loads_g: vec![0.0; usize::from(channels)],
                rng: 0x2545_F491,
                reads: 0,
                fail_bind: false,
                fail_reads: false,
                afe_supported: false,
                afe_polls: 0,
                afe_remaining: None,
                afe_fails: false,
            })),
        }
    }

    pub fn with_zero_counts(self, zero_counts: i32) -> Self {
        self.state.borrow_mut().zero_counts = zero_counts;
        self
    }

    pub fn with_counts_per_gram(self, counts_per_gram: f32) -> Self {
        self.state.borrow_mut().counts_per_gram = counts_per_gram;
        self
    }

    /// Uniform noise in `[-noise_counts, +noise_counts]` added to every read.
    pub fn with_noise(self, noise_counts: i32) -> Self {
        self.state.borrow_mut().noise_counts = noise_counts.max(0);
        self
    }

    pub fn with_seed(self, seed: u32) -> Self {
        self.state.borrow_mut().rng = seed.max(1);
        self
    }

    /// Enable simulated AFE calibration that completes after `polls` status polls.
    pub fn with_afe(self, polls: u32) -> Self {
        {
            let mut s = self.state.borrow_mut();
            s.afe_supported = true;
            s.afe_polls = polls;
        }
        self
    }

    pub fn set_load(&self, channel: u8, grams: f32) {
        let mut s = self.state.borrow_mut();
        if let Some(slot) = s.loads_g.get_mut(usize::from(channel)) {
            *slot = grams;
        }
    }

    pub fn load(&self, channel: u8) -> f32 {
        self.state
            .borrow()
            .loads_g
            .get(usize::from(channel))
            .copied()
            .unwrap_or(0.0)
    }

    pub fn set_fail_bind(&self, fail: bool) {
        self.state.borrow_mut().fail_bind = fail;
    }

    pub fn set_fail_reads(&self, fail: bool) {
        self.state.borrow_mut().fail_reads = fail;
    }

    pub fn set_afe_fails(&self, fail: bool) {
        self.state.borrow_mut().afe_fails = fail;
    }

    /// Number of conversions served so far (discard reads included).
    pub fn reads(&self) -> u64 {
        self.state.borrow().reads
    }

    pub fn selected(&self) -> u8 {
        self.state.borrow().selected
    }
}

impl AdcDriver for SimulatedAdc {
    fn bind(&mut self) -> HwResult<()> {
        let mut s = self.state.borrow_mut();
        if s.fail_bind {
            return Err(Box::new(HwError::I2c("simulated device did not ack".into())));
        }
        s.bound = true;
        Ok(())
    }

    fn channel_count(&self) -> u8 {
        self.state.borrow().channels
    }

    fn select_channel(&mut self, index: u8) -> HwResult<()> {
        let mut s = self.state.borrow_mut();
        if index >= s.channels {
            return Err(Box::new(HwError::UnsupportedChannel {
                index,
                channels: s.channels,
            }));
        }
        s.selected = index;
        Ok(())
    }

    fn read_raw(&mut self, _timeout: Duration) -> HwResult<i32> {
        let mut s = self.state.borrow_mut();
        if !s.bound {
            return Err(Box::new(HwError::NotBound));
        }
        if s.fail_reads {
            return Err(Box::new(HwError::Timeout));
        }
        s.reads = s.reads.saturating_add(1);
        let load = s.loads_g.get(usize::from(s.selected)).copied().unwrap_or(0.0);
        let signal = (load * s.counts_per_gram).round() as i32;
        let noise = s.next_noise();
        let raw = s.zero_counts.saturating_add(signal).saturating_add(noise);
        tracing::trace!(channel = s.selected, raw, "simulated adc read");
        Ok(raw)
    }

    fn supports_afe_calibration(&self) -> bool {
        self.state.borrow().afe_supported
    }

    fn start_afe_calibration(&mut self) -> HwResult<()> {
        let mut s = self.state.borrow_mut();
        if !s.afe_supported {
            return Err("simulated device built without AFE calibration".into());
        }
        let polls = s.afe_polls;
        s.afe_remaining = Some(polls);
        Ok(())
    }

    fn calibration_status(&mut self) -> HwResult<AfeStatus> {
        let mut s = self.state.borrow_mut();
        let failed = s.afe_fails;
        let remaining = s.afe_remaining;
        match remaining {
            None => Ok(AfeStatus::Ok),
            Some(0) => {
                s.afe_remaining = None;
                Ok(if failed { AfeStatus::Failed } else { AfeStatus::Ok })
            }
            Some(n) => {
                s.afe_remaining = Some(n - 1);
                Ok(AfeStatus::InProgress)
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_simulated_adc_tracks_load() {
        let mut adc = SimulatedAdc::new(2).with_zero_counts(100).with_counts_per_gram(2.0);
        adc.bind().unwrap();
        adc.set_load(1, 50.0);
        adc.select_channel(0).unwrap();
        assert_eq!(adc.read_raw(Duration::from_millis(10)).unwrap(), 100);
        adc.select_channel(1).unwrap();
        assert_eq!(adc.read_raw(Duration::from_millis(10)).unwrap(), 200);
        assert_eq!(adc.reads(), 2);
    }

    #[test]
    fn test_noise_stays_bounded() {
        let mut adc = SimulatedAdc::new(1).with_zero_counts(0).with_noise(400).with_seed(7);
        adc.bind().unwrap();
        for _ in 0..1000 {
            let v = adc.read_raw(Duration::from_millis(10)).unwrap();
            assert!((-400..=400).contains(&v), "noise out of range: {v}");
        }
    }

    #[test]
    fn test_extreme_noise_does_not_overflow() {
        let mut adc = SimulatedAdc::new(1).with_noise(i32::MAX).with_seed(3);
        adc.bind().unwrap();
        for _ in 0..1000 {
            adc.read_raw(Duration::from_millis(10)).unwrap();
        }
    }

    #[test]
    fn test_read_before_bind_fails() {
        let mut adc = SimulatedAdc::new(2);
        let err = adc.read_raw(Duration::from_millis(10)).unwrap_err();
        assert!(err.to_string().contains("not bound"));
    }
}

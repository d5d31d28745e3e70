//! Weight-change hysteresis.
//!
//! A channel is `Active` after any jump larger than the allowed variance and
//! drops back to `Idle` once more than `updates_threshold` readings have
//! passed without another jump.

use crate::config::HysteresisCfg;
use crate::units::abs_diff_i32_u32;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ChangeState {
    #[default]
    Idle,
    Active,
}

impl ChangeState {
    #[inline]
    pub fn is_active(self) -> bool {
        matches!(self, ChangeState::Active)
    }
}

#[derive(Debug, Clone, Copy)]
pub struct Hysteresis {
    allowed_variance_g: u32,
    updates_threshold: u32,
}

impl Hysteresis {
    pub fn new(cfg: &HysteresisCfg) -> Self {
        Self {
            allowed_variance_g: cfg.allowed_variance_g,
            updates_threshold: cfg.updates_threshold,
        }
    }

    /// Apply one reading. `updates` is the persisted counter; it is reset on a
    /// jump, compared against the threshold, then incremented.
    pub fn update(
        &self,
        state: ChangeState,
        weight_g: i32,
        last_weight: i32,
        updates: &mut u32,
    ) -> ChangeState {
        let mut next = state;
        if abs_diff_i32_u32(weight_g, last_weight) > self.allowed_variance_g {
            next = ChangeState::Active;
            *updates = 0;
        }
        if *updates > self.updates_threshold {
            next = ChangeState::Idle;
        }
        *updates = updates.saturating_add(1);
        next
    }
}

//! Read-only view of one channel and its configuration slot.

use std::time::Instant;

use crate::arena::ChannelId;
use crate::channel::{CalibrationMode, WeightChannel};
use crate::config::ChannelConfig;

/// Snapshot accessors for a channel; nothing here touches hardware.
pub struct ChannelView<'a, D> {
    pub(crate) channel: &'a WeightChannel<D>,
    pub(crate) cfg: &'a ChannelConfig,
}

impl<D> Clone for ChannelView<'_, D> {
    fn clone(&self) -> Self {
        *self
    }
}

impl<D> Copy for ChannelView<'_, D> {}

impl<'a, D> ChannelView<'a, D> {
    pub fn id(&self) -> ChannelId {
        ChannelId::new(self.channel_index())
    }

    pub fn enabled(&self) -> bool {
        self.cfg.enabled
    }

    pub fn weight(&self) -> i32 {
        self.channel.weight()
    }

    pub fn channel_index(&self) -> usize {
        self.channel.channel_index()
    }

    pub fn slope(&self) -> f32 {
        self.cfg.slope
    }

    pub fn offset(&self) -> i32 {
        self.cfg.offset
    }

    pub fn is_calibrated(&self) -> bool {
        self.cfg.is_calibrated()
    }

    pub fn updates(&self) -> u32 {
        self.cfg.updates
    }

    pub fn recent_weight_change(&self) -> bool {
        self.channel.recent_weight_change()
    }

    pub fn mode(&self) -> CalibrationMode {
        self.channel.mode()
    }

    pub fn last_calibration_start(&self) -> Option<Instant> {
        self.channel.last_calibration_start()
    }

    pub fn config(&self) -> &'a ChannelConfig {
        self.cfg
    }
}

//! Composition root: channels plus the arena holding their configuration.

use scale_traits::{AdcDriver, Confirmation};
use tracing::{debug, warn};

use crate::arena::{ChannelArena, ChannelId};
use crate::calibration::CalibrationOutcome;
use crate::channel::{BeginStatus, Datapoint, Verification, WeightChannel};
use crate::config::ChannelConfig;
use crate::error::{Report, Result, ScaleError};
use crate::status::ChannelView;

/// Owns every `WeightChannel` and the `ChannelArena`; each operation hands a
/// channel exactly its own slot.
pub struct ScaleBank<D> {
    arena: ChannelArena,
    channels: Vec<WeightChannel<D>>,
}

impl<D> core::fmt::Debug for ScaleBank<D> {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("ScaleBank")
            .field("arena", &self.arena)
            .field("channels", &self.channels)
            .finish()
    }
}

impl<D: AdcDriver> ScaleBank<D> {
    pub fn new(arena: ChannelArena) -> Self {
        Self {
            arena,
            channels: Vec::new(),
        }
    }

    /// Add a channel addressed by its `channel_index`. Indices must be unique.
    pub fn attach(&mut self, channel: WeightChannel<D>) -> Result<ChannelId> {
        let id = ChannelId::new(channel.channel_index());
        if self.position(id).is_some() {
            return Err(Report::new(ScaleError::Config(format!(
                "{id} is already attached"
            ))));
        }
        if self.arena.get(id).is_none() {
            warn!(channel = id.index(), slots = self.arena.len(), "channel has no configuration slot");
        }
        self.channels.push(channel);
        Ok(id)
    }

    /// Begin every channel. Each result stands alone; one channel failing
    /// never affects another.
    pub fn begin_all(
        &mut self,
        confirm: &mut dyn Confirmation,
    ) -> Vec<(ChannelId, Result<BeginStatus>)> {
        let mut out = Vec::with_capacity(self.channels.len());
        for ch in &mut self.channels {
            let id = ChannelId::new(ch.channel_index());
            let res = ch.begin(self.arena.get_mut(id), confirm);
            debug!(channel = id.index(), ok = res.is_ok(), "begin");
            out.push((id, res));
        }
        out
    }

    pub fn datapoint(&mut self, id: ChannelId) -> Result<Datapoint> {
        let (ch, cfg) = self.parts(id)?;
        ch.datapoint(cfg)
    }

    pub fn datapoint_all(&mut self) -> Vec<(ChannelId, Result<Datapoint>)> {
        let ids: Vec<ChannelId> = self.ids().collect();
        ids.into_iter().map(|id| (id, self.datapoint(id))).collect()
    }

    pub fn calibrate(
        &mut self,
        id: ChannelId,
        reference_grams: u32,
        confirm: &mut dyn Confirmation,
    ) -> Result<CalibrationOutcome> {
        let (ch, cfg) = self.parts(id)?;
        ch.calibrate(cfg, reference_grams, confirm)
    }

    pub fn tare(
        &mut self,
        id: ChannelId,
        confirm: &mut dyn Confirmation,
    ) -> Result<CalibrationOutcome> {
        let (ch, cfg) = self.parts(id)?;
        ch.tare(cfg, confirm)
    }

    pub fn verify(
        &mut self,
        id: ChannelId,
        reference_grams: u32,
        tolerance: f32,
        confirm: &mut dyn Confirmation,
    ) -> Result<Verification> {
        let (ch, cfg) = self.parts(id)?;
        ch.verify_calibration(cfg, reference_grams, tolerance, confirm)
    }

    pub fn recalibrate_afe(&mut self, id: ChannelId) -> Result<()> {
        let (ch, _) = self.parts(id)?;
        ch.recalibrate_afe()
    }

    pub fn channel(&self, id: ChannelId) -> Option<ChannelView<'_, D>> {
        let channel = &self.channels[self.position(id)?];
        let cfg = self.arena.get(id)?;
        Some(ChannelView { channel, cfg })
    }

    /// Views of every attached channel that has a configuration slot.
    pub fn views(&self) -> impl Iterator<Item = ChannelView<'_, D>> {
        self.channels.iter().filter_map(|channel| {
            let cfg = self.arena.get(ChannelId::new(channel.channel_index()))?;
            Some(ChannelView { channel, cfg })
        })
    }

    /// Attached channel ids in attach order.
    pub fn ids(&self) -> impl Iterator<Item = ChannelId> + '_ {
        self.channels
            .iter()
            .map(|c| ChannelId::new(c.channel_index()))
    }

    pub fn len(&self) -> usize {
        self.channels.len()
    }

    pub fn is_empty(&self) -> bool {
        self.channels.is_empty()
    }

    /// True while any channel is in the changing state; schedulers use this to
    /// pick the short poll interval.
    pub fn any_recent_weight_change(&self) -> bool {
        self.channels.iter().any(|c| c.recent_weight_change())
    }

    pub fn arena(&self) -> &ChannelArena {
        &self.arena
    }

    /// Swap in reloaded configuration slots; channels pick them up on their
    /// next operation.
    pub fn reload(&mut self, slots: Vec<ChannelConfig>) -> Vec<ChannelConfig> {
        let old = self.arena.replace(slots);
        for ch in &mut self.channels {
            ch.refresh(self.arena.get(ChannelId::new(ch.channel_index())));
        }
        old
    }

    pub fn into_arena(self) -> ChannelArena {
        self.arena
    }

    fn position(&self, id: ChannelId) -> Option<usize> {
        self.channels
            .iter()
            .position(|c| c.channel_index() == id.index())
    }

    fn parts(&mut self, id: ChannelId) -> Result<(&mut WeightChannel<D>, &mut ChannelConfig)> {
        let pos = self
            .position(id)
            .ok_or_else(|| Report::new(ScaleError::Config(format!("{id} is not attached"))))?;
        let cfg = self.arena.get_mut(id).ok_or_else(|| {
            Report::new(ScaleError::Config(format!("{id} has no configuration slot")))
        })?;
        Ok((&mut self.channels[pos], cfg))
    }
}

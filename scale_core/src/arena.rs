//! Owned storage for per-channel configuration slots.
//!
//! Channels never hold references into configuration; they are addressed by
//! `ChannelId` and handed their own slot for the duration of one operation.

use std::fmt;

use crate::config::ChannelConfig;

/// Index of a channel's slot in the `ChannelArena`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ChannelId(usize);

impl ChannelId {
    #[inline]
    pub const fn new(index: usize) -> Self {
        Self(index)
    }

    #[inline]
    pub const fn index(self) -> usize {
        self.0
    }
}

impl fmt::Display for ChannelId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "scale-{}", self.0)
    }
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct ChannelArena {
    slots: Vec<ChannelConfig>,
}

impl ChannelArena {
    pub fn new(slots: Vec<ChannelConfig>) -> Self {
        Self { slots }
    }

    /// `n` enabled, uncalibrated slots.
    pub fn with_slots(n: usize) -> Self {
        Self {
            slots: vec![ChannelConfig::default(); n],
        }
    }

    pub fn len(&self) -> usize {
        self.slots.len()
    }

    pub fn is_empty(&self) -> bool {
        self.slots.is_empty()
    }

    pub fn get(&self, id: ChannelId) -> Option<&ChannelConfig> {
        self.slots.get(id.0)
    }

    pub fn get_mut(&mut self, id: ChannelId) -> Option<&mut ChannelConfig> {
        self.slots.get_mut(id.0)
    }

    pub fn ids(&self) -> impl Iterator<Item = ChannelId> + use<> {
        (0..self.slots.len()).map(ChannelId)
    }

    pub fn iter(&self) -> impl Iterator<Item = (ChannelId, &ChannelConfig)> {
        self.slots.iter().enumerate().map(|(i, c)| (ChannelId(i), c))
    }

    pub fn as_slice(&self) -> &[ChannelConfig] {
        &self.slots
    }

    /// Swap in reloaded slots; returns the previous contents.
    pub fn replace(&mut self, slots: Vec<ChannelConfig>) -> Vec<ChannelConfig> {
        std::mem::replace(&mut self.slots, slots)
    }

    pub fn into_inner(self) -> Vec<ChannelConfig> {
        self.slots
    }
}

impl From<Vec<ChannelConfig>> for ChannelArena {
    fn from(slots: Vec<ChannelConfig>) -> Self {
        Self::new(slots)
    }
}

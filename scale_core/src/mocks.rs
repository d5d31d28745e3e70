//! Test and helper doubles for scale_core.
//!
//! Public so integration tests, benches and the CLI's self-check can share them.

use std::collections::{HashSet, VecDeque};
use std::time::Duration;

use scale_traits::{AdcDriver, AfeStatus, Confirmation, HwResult};

/// Converter that replays a scripted sequence of raw values.
///
/// Once the script runs out, the `repeat` value (if any) is returned forever;
/// otherwise reads fail. Faults injected with `with_fault_at` do not consume
/// scripted values.
#[derive(Debug, Clone, Default)]
pub struct ScriptedAdc {
    channels: u8,
    script: VecDeque<i32>,
    repeat: Option<i32>,
    faults: HashSet<usize>,
    fail_bind: bool,
    bound: bool,
    selected: Option<u8>,
    reads_taken: usize,
    afe: Option<VecDeque<AfeStatus>>,
    afe_starts: u32,
}

impl ScriptedAdc {
    pub fn new(channels: u8) -> Self {
        Self {
            channels,
            ..Self::default()
        }
    }

    pub fn with_reads(mut self, reads: impl IntoIterator<Item = i32>) -> Self {
        self.script.extend(reads);
        self
    }

    pub fn with_repeat(mut self, raw: i32) -> Self {
        self.repeat = Some(raw);
        self
    }

    /// Fail the `n`-th `read_raw` call (0-based).
    pub fn with_fault_at(mut self, n: usize) -> Self {
        self.faults.insert(n);
        self
    }

    pub fn with_bind_failure(mut self) -> Self {
        self.fail_bind = true;
        self
    }

    /// Support async AFE calibration; each status poll pops the next scripted
    /// status and the last one repeats.
    pub fn with_afe(mut self, statuses: impl IntoIterator<Item = AfeStatus>) -> Self {
        self.afe = Some(statuses.into_iter().collect());
        self
    }

    pub fn push_reads(&mut self, reads: impl IntoIterator<Item = i32>) {
        self.script.extend(reads);
    }

    pub fn set_repeat(&mut self, raw: Option<i32>) {
        self.repeat = raw;
    }

    pub fn selected(&self) -> Option<u8> {
        self.selected
    }

    pub fn reads_taken(&self) -> usize {
        self.reads_taken
    }

    pub fn afe_starts(&self) -> u32 {
        self.afe_starts
    }
}

impl AdcDriver for ScriptedAdc {
    fn bind(&mut self) -> HwResult<()> {
        if self.fail_bind {
            return Err("scripted bind failure".into());
        }
        self.bound = true;
        Ok(())
    }

    fn channel_count(&self) -> u8 {
        self.channels
    }

    fn select_channel(&mut self, index: u8) -> HwResult<()> {
        if index >= self.channels {
            return Err(format!("channel {index} out of range").into());
        }
        self.selected = Some(index);
        Ok(())
    }

    fn read_raw(&mut self, _timeout: Duration) -> HwResult<i32> {
        let n = self.reads_taken;
        self.reads_taken += 1;
        if self.faults.contains(&n) {
            return Err("scripted read fault".into());
        }
        self.script
            .pop_front()
            .or(self.repeat)
            .ok_or_else(|| "read script exhausted".into())
    }

    fn supports_afe_calibration(&self) -> bool {
        self.afe.is_some()
    }

    fn start_afe_calibration(&mut self) -> HwResult<()> {
        if self.afe.is_none() {
            return Err("asynchronous AFE calibration not supported by this driver".into());
        }
        self.afe_starts += 1;
        Ok(())
    }

    fn calibration_status(&mut self) -> HwResult<AfeStatus> {
        let Some(statuses) = self.afe.as_mut() else {
            return Ok(AfeStatus::Ok);
        };
        let status = if statuses.len() > 1 {
            statuses.pop_front()
        } else {
            statuses.front().copied()
        };
        Ok(status.unwrap_or(AfeStatus::Ok))
    }
}

/// Answers every prompt the same way.
#[derive(Debug, Clone, Copy)]
pub struct AlwaysConfirm(pub bool);

impl Confirmation for AlwaysConfirm {
    fn await_confirmation(&mut self, _prompt: &str) -> bool {
        self.0
    }
}

/// Answers from a script (missing answers decline) and records every prompt.
#[derive(Debug, Clone, Default)]
pub struct ScriptedConfirm {
    answers: VecDeque<bool>,
    prompts: Vec<String>,
}

impl ScriptedConfirm {
    pub fn new(answers: impl IntoIterator<Item = bool>) -> Self {
        Self {
            answers: answers.into_iter().collect(),
            prompts: Vec::new(),
        }
    }

    pub fn prompts(&self) -> &[String] {
        &self.prompts
    }
}

impl Confirmation for ScriptedConfirm {
    fn await_confirmation(&mut self, prompt: &str) -> bool {
        self.prompts.push(prompt.to_owned());
        self.answers.pop_front().unwrap_or(false)
    }
}

use super::{EffectParam, send_param};
use crate::nodes::{CHORUS_DEPTH_SECONDS, ChorusNode};
use crate::playback::PlaybackCommand;
use crossbeam_channel::Sender;

pub const BASE_DELAY: f32 = 0.03;
pub const DEFAULT_RATE: f32 = 0.5;
pub const DEFAULT_WET: f32 = 0.5;

pub(super) fn unit(sample_rate: f32) -> ChorusNode {
    ChorusNode::new(BASE_DELAY, DEFAULT_RATE, CHORUS_DEPTH_SECONDS, DEFAULT_WET, sample_rate)
}

/// Controls the shared chorus unit.
#[derive(Debug, Clone)]
pub struct ChorusHandle {
    commands: Sender<PlaybackCommand>,
}

impl ChorusHandle {
    pub(crate) fn new(commands: Sender<PlaybackCommand>) -> Self {
        Self { commands }
    }

    /// LFO rate in Hz.
    pub fn set_rate(&self, rate: f32) {
        send_param(&self.commands, EffectParam::ChorusRate(rate));
    }

    /// Depth as a multiple of 4 ms of delay swing.
    pub fn set_depth(&self, depth: f32) {
        send_param(&self.commands, EffectParam::ChorusDepth(depth));
    }

    pub fn set_wet(&self, wet: f32) {
        send_param(&self.commands, EffectParam::ChorusWet(wet));
    }
}

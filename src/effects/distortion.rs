use super::{EffectParam, send_param};
use crate::nodes::{Oversample, WaveShaperNode, distortion_curve};
use crate::playback::PlaybackCommand;
use crossbeam_channel::Sender;

pub const DEFAULT_AMOUNT: f32 = 50.0;

pub(super) fn unit(sample_rate: f32) -> WaveShaperNode {
    WaveShaperNode::new(distortion_curve(DEFAULT_AMOUNT), Oversample::X4, sample_rate)
}

/// Controls the shared wave shaper unit.
#[derive(Debug, Clone)]
pub struct DistortionHandle {
    commands: Sender<PlaybackCommand>,
}

impl DistortionHandle {
    pub(crate) fn new(commands: Sender<PlaybackCommand>) -> Self {
        Self { commands }
    }

    /// Regenerates the shaping curve for `amount`.
    pub fn set_amount(&self, amount: f32) {
        // 44100 points; built here so the render thread never allocates it
        let curve = distortion_curve(amount);
        send_param(&self.commands, EffectParam::DistortionCurve { amount, curve });
    }
}

use super::{EffectParam, send_param};
use crate::graph::{AudioBlock, AudioNode, ProcessContext};
use crate::nodes::{ConvolverNode, decaying_noise_impulse};
use crate::playback::PlaybackCommand;
use crossbeam_channel::Sender;
use std::any::Any;

/// Length of the generated impulse response.
pub const IMPULSE_SECONDS: f32 = 2.0;

/// Convolution reverb followed by an output gain.
pub struct ReverbNode {
    convolver: ConvolverNode,
    wet: f32,
}

impl ReverbNode {
    pub const DEFAULT_WET: f32 = 0.5;

    /// Reverb over a freshly generated decaying-noise impulse response.
    pub fn new(sample_rate: u32, block_size: usize, wet: f32) -> Self {
        let impulse = decaying_noise_impulse(sample_rate, IMPULSE_SECONDS, &mut rand::thread_rng());
        Self {
            convolver: ConvolverNode::new(&impulse, block_size, sample_rate as f32, true),
            wet,
        }
    }

    pub fn set_wet(&mut self, wet: f32) {
        self.wet = wet.max(0.0);
    }

    pub fn wet(&self) -> f32 {
        self.wet
    }
}

impl AudioNode for ReverbNode {
    fn process(&mut self, input: &AudioBlock, output: &mut AudioBlock, ctx: &ProcessContext) {
        self.convolver.process(input, output, ctx);
        for channel in 0..AudioBlock::CHANNELS {
            for sample in output.channel_mut(channel) {
                *sample *= self.wet;
            }
        }
    }

    fn kind(&self) -> &'static str {
        "reverb"
    }

    fn as_any_mut(&mut self) -> &mut dyn Any {
        self
    }
}

pub(super) fn unit(sample_rate: u32, block_size: usize) -> ReverbNode {
    ReverbNode::new(sample_rate, block_size, ReverbNode::DEFAULT_WET)
}

/// Controls the shared reverb unit.
#[derive(Debug, Clone)]
pub struct ReverbHandle {
    commands: Sender<PlaybackCommand>,
}

impl ReverbHandle {
    pub(crate) fn new(commands: Sender<PlaybackCommand>) -> Self {
        Self { commands }
    }

    /// Output level of the reverb unit.
    pub fn set_wet(&self, wet: f32) {
        send_param(&self.commands, EffectParam::ReverbWet(wet));
    }
}

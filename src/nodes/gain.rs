use crate::graph::{AudioBlock, AudioNode, AudioParam, ProcessContext};
use std::any::Any;

/// Multiplies its input by an automatable gain.
pub struct GainNode {
    gain: AudioParam,
}

impl GainNode {
    pub fn new(gain: f32) -> Self {
        Self {
            gain: AudioParam::new(gain, 0.0, f32::MAX),
        }
    }

    pub fn gain(&self) -> f32 {
        self.gain.value()
    }

    pub fn param_mut(&mut self) -> &mut AudioParam {
        &mut self.gain
    }

    pub fn set_gain(&mut self, gain: f32) {
        self.gain.set_value(gain);
    }
}

impl AudioNode for GainNode {
    fn process(&mut self, input: &AudioBlock, output: &mut AudioBlock, ctx: &ProcessContext) {
        if !self.gain.is_ramping() {
            let gain = self.gain.value();
            let (left, right) = output.channels_mut();
            for (out, inp) in left.iter_mut().zip(input.channel(0)) {
                *out = inp * gain;
            }
            for (out, inp) in right.iter_mut().zip(input.channel(1)) {
                *out = inp * gain;
            }
            return;
        }

        for frame in 0..ctx.frames {
            let gain = self.gain.value_at(ctx.time_at(frame));
            output.channel_mut(0)[frame] = input.channel(0)[frame] * gain;
            output.channel_mut(1)[frame] = input.channel(1)[frame] * gain;
        }
    }

    fn kind(&self) -> &'static str {
        "gain"
    }

    fn as_any_mut(&mut self) -> &mut dyn Any {
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn ramp_is_applied_per_frame() {
        let mut node = GainNode::new(1.0);
        node.param_mut().linear_ramp_to_value_at_time(0.0, 0.0, 4.0 / 8.0);

        let mut input = AudioBlock::new(8);
        input.channel_mut(0).fill(1.0);
        input.channel_mut(1).fill(1.0);
        let mut output = AudioBlock::new(8);
        let ctx = ProcessContext {
            sample_rate: 8.0,
            block_start: 0.0,
            frames: 8,
        };
        node.process(&input, &mut output, &ctx);

        assert_eq!(output.channel(0), &[1.0, 0.75, 0.5, 0.25, 0.0, 0.0, 0.0, 0.0]);
        assert!(!node.param_mut().is_ramping());
    }
}

use crate::dsp::DelayLine;
use crate::graph::{AudioBlock, AudioNode, ProcessContext};
use std::any::Any;
use std::f32::consts::TAU;

/// Depth scale applied to `set_depth`, in seconds of delay swing.
pub const CHORUS_DEPTH_SECONDS: f32 = 0.004;

/// Dry signal plus an LFO-modulated short delay on each channel.
///
/// Both channels share one LFO. Each channel's wet path only feeds that
/// channel.
pub struct ChorusNode {
    lines: [DelayLine; 2],
    sample_rate: f32,
    base_delay: f32,
    /// Delay swing in seconds
    depth: f32,
    rate: f32,
    wet: f32,
    phase: f32,
}

impl ChorusNode {
    pub fn new(base_delay: f32, rate: f32, depth: f32, wet: f32, sample_rate: f32) -> Self {
        // room for the base delay plus the widest swing set_depth(10.0) allows
        let capacity = ((base_delay + 10.0 * CHORUS_DEPTH_SECONDS) * sample_rate).ceil() as usize + 2;
        Self {
            lines: [DelayLine::new(capacity), DelayLine::new(capacity)],
            sample_rate,
            base_delay,
            depth,
            rate,
            wet,
            phase: 0.0,
        }
    }

    /// LFO frequency in Hz.
    pub fn set_rate(&mut self, rate: f32) {
        self.rate = rate.max(0.0);
    }

    /// Modulation depth as a multiple of 4 ms, at most 10 so the swing fits
    /// the preallocated delay lines.
    pub fn set_depth(&mut self, depth: f32) {
        self.depth = depth.clamp(0.0, 10.0) * CHORUS_DEPTH_SECONDS;
    }

    pub fn set_wet(&mut self, wet: f32) {
        self.wet = wet.max(0.0);
    }

    pub fn rate(&self) -> f32 {
        self.rate
    }

    pub fn depth(&self) -> f32 {
        self.depth
    }

    pub fn wet(&self) -> f32 {
        self.wet
    }
}

impl AudioNode for ChorusNode {
    fn process(&mut self, input: &AudioBlock, output: &mut AudioBlock, ctx: &ProcessContext) {
        let phase_step = TAU * self.rate / self.sample_rate;
        let (left_out, right_out) = output.channels_mut();
        let [left_line, right_line] = &mut self.lines;

        for frame in 0..ctx.frames {
            let delay = (self.base_delay + self.depth * self.phase.sin()) * self.sample_rate;

            let left = input.channel(0)[frame];
            let right = input.channel(1)[frame];
            left_out[frame] = left + self.wet * left_line.read(delay);
            right_out[frame] = right + self.wet * right_line.read(delay);
            left_line.push(left);
            right_line.push(right);

            self.phase = (self.phase + phase_step) % TAU;
        }
    }

    fn kind(&self) -> &'static str {
        "chorus"
    }

    fn as_any_mut(&mut self) -> &mut dyn Any {
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn channels_do_not_cross_feed() {
        let mut node = ChorusNode::new(0.03, 0.5, CHORUS_DEPTH_SECONDS, 0.5, 1000.0);
        let mut input = AudioBlock::new(128);
        input.channel_mut(0).fill(1.0);
        let mut output = AudioBlock::new(128);
        let ctx = ProcessContext {
            sample_rate: 1000.0,
            block_start: 0.0,
            frames: 128,
        };
        node.process(&input, &mut output, &ctx);

        assert!(output.channel(1).iter().all(|s| *s == 0.0));
        // dry only before the delay fills, dry + wet afterwards
        assert_eq!(output.channel(0)[0], 1.0);
        assert!((output.channel(0)[127] - 1.5).abs() < 1e-6);
    }

    #[test]
    fn channels_are_modulated_in_phase() {
        let mut node = ChorusNode::new(0.03, 5.0, 2.0 * CHORUS_DEPTH_SECONDS, 0.5, 1000.0);
        let mut input = AudioBlock::new(256);
        for (i, sample) in input.channel_mut(0).iter_mut().enumerate() {
            *sample = (i as f32 * 0.37).sin();
        }
        let left = input.channel(0).to_vec();
        input.channel_mut(1).copy_from_slice(&left);
        let mut output = AudioBlock::new(256);
        let ctx = ProcessContext {
            sample_rate: 1000.0,
            block_start: 0.0,
            frames: 256,
        };
        node.process(&input, &mut output, &ctx);
        assert_eq!(output.channel(0), output.channel(1));
    }

    #[test]
    fn depth_is_scaled_to_seconds() {
        let mut node = ChorusNode::new(0.03, 0.5, CHORUS_DEPTH_SECONDS, 0.5, 48000.0);
        node.set_depth(2.0);
        assert!((node.depth() - 0.008).abs() < 1e-9);
        node.set_depth(50.0);
        assert!((node.depth() - 0.04).abs() < 1e-9);
    }
}

use crate::dsp::{db_to_gain, gain_to_db, time_constant_coefficient};
use crate::graph::{AudioBlock, AudioNode, ProcessContext};
use std::any::Any;

/// Dynamics compressor parameters.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct CompressorSettings {
    /// dB above which compression starts
    pub threshold: f32,
    /// Width in dB of the soft knee around the threshold
    pub knee: f32,
    pub ratio: f32,
    /// Seconds to reach the target reduction when the level rises
    pub attack: f32,
    /// Seconds to recover when the level falls
    pub release: f32,
}

impl Default for CompressorSettings {
    fn default() -> Self {
        Self {
            threshold: -24.0,
            knee: 30.0,
            ratio: 12.0,
            attack: 0.003,
            release: 0.25,
        }
    }
}

impl CompressorSettings {
    /// Static output level in dB for an input level in dB.
    pub fn curve(&self, input_db: f32) -> f32 {
        let over = input_db - self.threshold;
        let slope = 1.0 / self.ratio - 1.0;
        if self.knee > 0.0 && 2.0 * over.abs() <= self.knee {
            let x = over + self.knee * 0.5;
            input_db + slope * x * x / (2.0 * self.knee)
        } else if 2.0 * over < -self.knee {
            input_db
        } else {
            self.threshold + over / self.ratio
        }
    }

    /// Automatic make-up gain in dB: the full-scale reduction, inverted and
    /// raised to the 0.6 power.
    pub fn makeup_db(&self) -> f32 {
        let full_range_gain = db_to_gain(self.curve(0.0));
        gain_to_db((1.0 / full_range_gain).powf(0.6))
    }
}

/// Soft-knee, stereo-linked peak compressor with automatic make-up gain.
pub struct DynamicsCompressorNode {
    settings: CompressorSettings,
    attack_coef: f32,
    release_coef: f32,
    makeup_db: f32,
    /// Smoothed gain change in dB (<= 0)
    envelope_db: f32,
}

impl DynamicsCompressorNode {
    pub fn new(settings: CompressorSettings, sample_rate: f32) -> Self {
        Self {
            attack_coef: time_constant_coefficient(settings.attack, sample_rate),
            release_coef: time_constant_coefficient(settings.release, sample_rate),
            makeup_db: settings.makeup_db(),
            envelope_db: 0.0,
            settings,
        }
    }

    pub fn settings(&self) -> &CompressorSettings {
        &self.settings
    }

    /// Current gain reduction in dB, zero or negative.
    pub fn reduction(&self) -> f32 {
        self.envelope_db
    }
}

impl AudioNode for DynamicsCompressorNode {
    fn process(&mut self, input: &AudioBlock, output: &mut AudioBlock, ctx: &ProcessContext) {
        let (left_out, right_out) = output.channels_mut();
        let left_in = input.channel(0);
        let right_in = input.channel(1);

        for frame in 0..ctx.frames {
            let level = left_in[frame].abs().max(right_in[frame].abs());
            let level_db = gain_to_db(level);
            let target = (self.settings.curve(level_db) - level_db).min(0.0);

            let coef = if target < self.envelope_db {
                self.attack_coef
            } else {
                self.release_coef
            };
            self.envelope_db = coef * self.envelope_db + (1.0 - coef) * target;

            let gain = db_to_gain(self.envelope_db + self.makeup_db);
            left_out[frame] = left_in[frame] * gain;
            right_out[frame] = right_in[frame] * gain;
        }
    }

    fn kind(&self) -> &'static str {
        "dynamics-compressor"
    }

    fn as_any_mut(&mut self) -> &mut dyn Any {
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn curve_regions() {
        let settings = CompressorSettings::default();
        // far below the knee: untouched
        assert_eq!(settings.curve(-60.0), -60.0);
        // above the knee: threshold + over / ratio
        assert!((settings.curve(0.0) - -22.0).abs() < 1e-5);
        // the knee joins both lines continuously
        let lower = settings.curve(-39.0);
        let upper = settings.curve(-9.0);
        assert!((lower - -39.0).abs() < 1e-4);
        assert!((upper - (-24.0 + 15.0 / 12.0)).abs() < 1e-4);
    }

    #[test]
    fn makeup_gain_matches_full_scale_reduction() {
        let settings = CompressorSettings::default();
        assert!((settings.makeup_db() - 13.2).abs() < 1e-3);
    }

    #[test]
    fn loud_input_is_reduced() {
        let mut node = DynamicsCompressorNode::new(CompressorSettings::default(), 48000.0);
        let mut input = AudioBlock::new(4800);
        input.channel_mut(0).fill(1.0);
        input.channel_mut(1).fill(-1.0);
        let mut output = AudioBlock::new(4800);
        let ctx = ProcessContext {
            sample_rate: 48000.0,
            block_start: 0.0,
            frames: 4800,
        };
        node.process(&input, &mut output, &ctx);

        assert!((node.reduction() - -22.0).abs() < 0.1);
        // -22 dB reduction + 13.2 dB make-up
        let expected = db_to_gain(-22.0 + 13.2);
        assert!((output.channel(0)[4799] - expected).abs() < 1e-2);
        assert!((output.channel(1)[4799] + expected).abs() < 1e-2);
    }

    #[test]
    fn silence_passes_without_reduction() {
        let mut node = DynamicsCompressorNode::new(CompressorSettings::default(), 48000.0);
        let input = AudioBlock::new(64);
        let mut output = AudioBlock::new(64);
        let ctx = ProcessContext {
            sample_rate: 48000.0,
            block_start: 0.0,
            frames: 64,
        };
        node.process(&input, &mut output, &ctx);
        assert_eq!(node.reduction(), 0.0);
        assert_eq!(output.peak(), 0.0);
    }
}

use crate::dsp::PartitionedConvolver;
use crate::graph::{AudioBlock, AudioNode, ProcessContext};
use rand::Rng;
use std::any::Any;

const GAIN_CALIBRATION: f32 = 0.00125;
const GAIN_CALIBRATION_SAMPLE_RATE: f32 = 44100.0;
const MIN_POWER: f32 = 0.000125;

/// Two channels of white noise under a cubic decay `(1 - i/N)^3`.
pub fn decaying_noise_impulse<R: Rng + ?Sized>(
    sample_rate: u32,
    seconds: f32,
    rng: &mut R,
) -> [Vec<f32>; 2] {
    let len = (sample_rate as f32 * seconds) as usize;
    let mut channel = || {
        (0..len)
            .map(|i| {
                let decay = 1.0 - i as f32 / len as f32;
                rng.gen_range(-1.0f32..1.0) * decay * decay * decay
            })
            .collect::<Vec<f32>>()
    };
    let left = channel();
    let right = channel();
    [left, right]
}

/// Scale factor that brings an impulse response to a calibrated loudness.
///
/// Uses the RMS power over every channel, floored so near-silent responses
/// are not blown up, and compensates for the sample rate.
pub fn normalization_scale(impulse: &[Vec<f32>], sample_rate: f32) -> f32 {
    let len = impulse.first().map_or(0, Vec::len);
    let count = impulse.len() * len;
    let mut power = if count == 0 {
        0.0
    } else {
        let sum: f32 = impulse.iter().flat_map(|c| c.iter()).map(|s| s * s).sum();
        (sum / count as f32).sqrt()
    };
    if !power.is_finite() || power < MIN_POWER {
        power = MIN_POWER;
    }
    GAIN_CALIBRATION / power * GAIN_CALIBRATION_SAMPLE_RATE / sample_rate
}

/// Stereo convolution against a (normalized) impulse response.
///
/// Mono responses are applied to both channels. Once the input has been
/// silent long enough for the tail to die out, processing is skipped.
pub struct ConvolverNode {
    convolvers: [PartitionedConvolver; 2],
    scale: f32,
    silent_blocks: usize,
    scratch: Vec<f32>,
}

impl ConvolverNode {
    pub fn new(impulse: &[Vec<f32>], block_size: usize, sample_rate: f32, normalize: bool) -> Self {
        let left = impulse.first().map(Vec::as_slice).unwrap_or(&[]);
        let right = impulse.get(1).map(Vec::as_slice).unwrap_or(left);
        let scale = if normalize {
            normalization_scale(impulse, sample_rate)
        } else {
            1.0
        };
        let convolvers = [
            PartitionedConvolver::new(left, block_size),
            PartitionedConvolver::new(right, block_size),
        ];
        Self {
            silent_blocks: convolvers[0].partition_count() + 1,
            convolvers,
            scale,
            scratch: vec![0.0; block_size],
        }
    }

    pub fn scale(&self) -> f32 {
        self.scale
    }
}

impl AudioNode for ConvolverNode {
    fn process(&mut self, input: &AudioBlock, output: &mut AudioBlock, _ctx: &ProcessContext) {
        let tail_blocks = self.convolvers[0].partition_count() + 1;
        if input.peak() == 0.0 {
            if self.silent_blocks >= tail_blocks {
                output.clear();
                return;
            }
            self.silent_blocks += 1;
        } else {
            self.silent_blocks = 0;
        }

        for (channel, convolver) in self.convolvers.iter_mut().enumerate() {
            convolver.process(input.channel(channel), &mut self.scratch);
            for (out, wet) in output.channel_mut(channel).iter_mut().zip(&self.scratch) {
                *out = wet * self.scale;
            }
        }
    }

    fn kind(&self) -> &'static str {
        "convolver"
    }

    fn as_any_mut(&mut self) -> &mut dyn Any {
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::SeedableRng;
    use rand::rngs::StdRng;

    #[test]
    fn impulse_decays_to_silence() {
        let mut rng = StdRng::seed_from_u64(1);
        let [left, right] = decaying_noise_impulse(8000, 2.0, &mut rng);
        assert_eq!(left.len(), 16000);
        assert_ne!(left, right);
        assert!(left[15990..].iter().all(|s| s.abs() < 1e-8));
        assert!(left.iter().all(|s| s.abs() <= 1.0));
    }

    #[test]
    fn normalization_uses_rms_power() {
        let impulse = vec![vec![0.5; 100], vec![0.5; 100]];
        let scale = normalization_scale(&impulse, 44100.0);
        assert!((scale - 0.0025).abs() < 1e-7);

        let at_88k = normalization_scale(&impulse, 88200.0);
        assert!((at_88k - 0.00125).abs() < 1e-7);
    }

    #[test]
    fn silent_response_uses_power_floor() {
        let impulse = vec![vec![0.0; 64]];
        assert!((normalization_scale(&impulse, 44100.0) - 10.0).abs() < 1e-4);
    }

    #[test]
    fn unnormalized_unit_impulse_passes_audio() {
        let mut node = ConvolverNode::new(&[vec![1.0]], 8, 8000.0, false);
        let mut input = AudioBlock::new(8);
        input.channel_mut(0).fill(0.25);
        input.channel_mut(1).fill(-0.25);
        let mut output = AudioBlock::new(8);
        let ctx = ProcessContext {
            sample_rate: 8000.0,
            block_start: 0.0,
            frames: 8,
        };
        node.process(&input, &mut output, &ctx);
        assert!(output.channel(0).iter().all(|s| (s - 0.25).abs() < 1e-5));
        assert!(output.channel(1).iter().all(|s| (s + 0.25).abs() < 1e-5));
    }
}

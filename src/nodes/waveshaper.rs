use super::biquad::{BiquadCoefficients, BiquadState, FilterType};
use crate::graph::{AudioBlock, AudioNode, ProcessContext};
use std::any::Any;
use std::f32::consts::PI;

const CURVE_POINTS: usize = 44100;

/// Soft-clipping transfer curve used by the distortion unit.
///
/// `f(x) = (3 + k)·x·20°/(π + k·|x|)` sampled at 44100 points over [-1, 1).
/// Deterministic for a given `amount`.
pub fn distortion_curve(amount: f32) -> Vec<f32> {
    let k = amount;
    let deg = PI / 180.0;
    (0..CURVE_POINTS)
        .map(|i| {
            let x = i as f32 * 2.0 / CURVE_POINTS as f32 - 1.0;
            (3.0 + k) * x * 20.0 * deg / (PI + k * x.abs())
        })
        .collect()
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Oversample {
    #[default]
    None,
    X2,
    X4,
}

impl Oversample {
    fn factor(self) -> usize {
        match self {
            Self::None => 1,
            Self::X2 => 2,
            Self::X4 => 4,
        }
    }
}

#[derive(Debug, Clone, Copy, Default)]
struct ChannelState {
    previous: f32,
    anti_alias: [BiquadState; 2],
}

/// Maps each sample through a transfer curve.
///
/// With oversampling the input is linearly interpolated up to the higher
/// rate, shaped, low-passed below the original Nyquist and decimated.
pub struct WaveShaperNode {
    curve: Vec<f32>,
    oversample: Oversample,
    anti_alias: BiquadCoefficients,
    sample_rate: f32,
    channels: [ChannelState; 2],
}

impl WaveShaperNode {
    pub fn new(curve: Vec<f32>, oversample: Oversample, sample_rate: f32) -> Self {
        Self {
            curve,
            anti_alias: Self::anti_alias_for(oversample, sample_rate),
            oversample,
            sample_rate,
            channels: [ChannelState::default(); 2],
        }
    }

    fn anti_alias_for(oversample: Oversample, sample_rate: f32) -> BiquadCoefficients {
        let rate = sample_rate * oversample.factor() as f32;
        // Butterworth resonance (Q = 1/sqrt(2)) expressed in dB
        BiquadCoefficients::new(FilterType::Lowpass, sample_rate * 0.45, -3.0103, 0.0, rate)
    }

    pub fn set_curve(&mut self, curve: Vec<f32>) {
        self.curve = curve;
    }

    pub fn curve(&self) -> &[f32] {
        &self.curve
    }

    pub fn set_oversample(&mut self, oversample: Oversample) {
        self.oversample = oversample;
        self.anti_alias = Self::anti_alias_for(oversample, self.sample_rate);
        self.channels = [ChannelState::default(); 2];
    }

    /// Curve lookup with linear interpolation; inputs outside [-1, 1] hold the end values.
    fn shape(curve: &[f32], x: f32) -> f32 {
        let len = curve.len();
        match len {
            0 => return x,
            1 => return curve[0],
            _ => {}
        }
        let v = (len - 1) as f32 * 0.5 * (x + 1.0);
        if v <= 0.0 {
            return curve[0];
        }
        let index = v.floor() as usize;
        if index >= len - 1 {
            return curve[len - 1];
        }
        let frac = v - index as f32;
        curve[index] + (curve[index + 1] - curve[index]) * frac
    }
}

impl AudioNode for WaveShaperNode {
    fn process(&mut self, input: &AudioBlock, output: &mut AudioBlock, _ctx: &ProcessContext) {
        let factor = self.oversample.factor();
        for (channel, state) in self.channels.iter_mut().enumerate() {
            let out = output.channel_mut(channel);
            for (y, &x) in out.iter_mut().zip(input.channel(channel)) {
                if factor == 1 {
                    *y = Self::shape(&self.curve, x);
                    continue;
                }
                let mut last = 0.0;
                for step in 1..=factor {
                    let t = step as f32 / factor as f32;
                    let up = state.previous + (x - state.previous) * t;
                    let shaped = Self::shape(&self.curve, up);
                    let filtered = state.anti_alias[0].process(&self.anti_alias, shaped);
                    last = state.anti_alias[1].process(&self.anti_alias, filtered);
                }
                state.previous = x;
                *y = last;
            }
        }
    }

    fn kind(&self) -> &'static str {
        "wave-shaper"
    }

    fn as_any_mut(&mut self) -> &mut dyn Any {
        self
    }
}

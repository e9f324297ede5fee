use crate::graph::{AudioBlock, AudioNode, ProcessContext};
use std::any::Any;
use std::f32::consts::PI;
use std::fmt;

/// Response type of a biquad filter.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum FilterType {
    #[default]
    Lowpass,
    Highpass,
    Bandpass,
    Lowshelf,
    Highshelf,
    Peaking,
    Notch,
    Allpass,
}

impl FilterType {
    pub fn from_name(name: &str) -> Option<Self> {
        Some(match name {
            "lowpass" => Self::Lowpass,
            "highpass" => Self::Highpass,
            "bandpass" => Self::Bandpass,
            "lowshelf" => Self::Lowshelf,
            "highshelf" => Self::Highshelf,
            "peaking" => Self::Peaking,
            "notch" => Self::Notch,
            "allpass" => Self::Allpass,
            _ => return None,
        })
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Lowpass => "lowpass",
            Self::Highpass => "highpass",
            Self::Bandpass => "bandpass",
            Self::Lowshelf => "lowshelf",
            Self::Highshelf => "highshelf",
            Self::Peaking => "peaking",
            Self::Notch => "notch",
            Self::Allpass => "allpass",
        }
    }
}

impl fmt::Display for FilterType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Normalized (a0 = 1) biquad coefficients.
///
/// Formulas follow the Audio EQ Cookbook. For the low- and high-pass types
/// `q` is a resonance in dB; for the others it is the usual quality factor.
/// `gain` (dB) only affects the shelf and peaking types.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct BiquadCoefficients {
    pub b0: f32,
    pub b1: f32,
    pub b2: f32,
    pub a1: f32,
    pub a2: f32,
}

impl BiquadCoefficients {
    pub const IDENTITY: Self = Self {
        b0: 1.0,
        b1: 0.0,
        b2: 0.0,
        a1: 0.0,
        a2: 0.0,
    };

    pub fn new(filter_type: FilterType, frequency: f32, q: f32, gain: f32, sample_rate: f32) -> Self {
        let nyquist = sample_rate * 0.5;
        let frequency = frequency.clamp(1.0, nyquist * 0.999);
        let w0 = 2.0 * PI * frequency / sample_rate;
        let (sin, cos) = w0.sin_cos();
        let a = 10.0f32.powf(gain / 40.0);

        let (b0, b1, b2, a0, a1, a2) = match filter_type {
            FilterType::Lowpass => {
                let alpha = sin / (2.0 * 10.0f32.powf(q / 20.0));
                let b1 = 1.0 - cos;
                (b1 * 0.5, b1, b1 * 0.5, 1.0 + alpha, -2.0 * cos, 1.0 - alpha)
            }
            FilterType::Highpass => {
                let alpha = sin / (2.0 * 10.0f32.powf(q / 20.0));
                let b1 = -(1.0 + cos);
                (-b1 * 0.5, b1, -b1 * 0.5, 1.0 + alpha, -2.0 * cos, 1.0 - alpha)
            }
            FilterType::Bandpass => {
                let alpha = sin / (2.0 * q.max(1e-4));
                (alpha, 0.0, -alpha, 1.0 + alpha, -2.0 * cos, 1.0 - alpha)
            }
            FilterType::Notch => {
                let alpha = sin / (2.0 * q.max(1e-4));
                (1.0, -2.0 * cos, 1.0, 1.0 + alpha, -2.0 * cos, 1.0 - alpha)
            }
            FilterType::Allpass => {
                let alpha = sin / (2.0 * q.max(1e-4));
                (1.0 - alpha, -2.0 * cos, 1.0 + alpha, 1.0 + alpha, -2.0 * cos, 1.0 - alpha)
            }
            FilterType::Peaking => {
                let alpha = sin / (2.0 * q.max(1e-4));
                (
                    1.0 + alpha * a,
                    -2.0 * cos,
                    1.0 - alpha * a,
                    1.0 + alpha / a,
                    -2.0 * cos,
                    1.0 - alpha / a,
                )
            }
            FilterType::Lowshelf => {
                // shelf slope S = 1
                let two_sqrt_a_alpha = sin * a.sqrt() * std::f32::consts::SQRT_2;
                (
                    a * ((a + 1.0) - (a - 1.0) * cos + two_sqrt_a_alpha),
                    2.0 * a * ((a - 1.0) - (a + 1.0) * cos),
                    a * ((a + 1.0) - (a - 1.0) * cos - two_sqrt_a_alpha),
                    (a + 1.0) + (a - 1.0) * cos + two_sqrt_a_alpha,
                    -2.0 * ((a - 1.0) + (a + 1.0) * cos),
                    (a + 1.0) + (a - 1.0) * cos - two_sqrt_a_alpha,
                )
            }
            FilterType::Highshelf => {
                let two_sqrt_a_alpha = sin * a.sqrt() * std::f32::consts::SQRT_2;
                (
                    a * ((a + 1.0) + (a - 1.0) * cos + two_sqrt_a_alpha),
                    -2.0 * a * ((a - 1.0) + (a + 1.0) * cos),
                    a * ((a + 1.0) + (a - 1.0) * cos - two_sqrt_a_alpha),
                    (a + 1.0) - (a - 1.0) * cos + two_sqrt_a_alpha,
                    2.0 * ((a - 1.0) - (a + 1.0) * cos),
                    (a + 1.0) - (a - 1.0) * cos - two_sqrt_a_alpha,
                )
            }
        };

        Self {
            b0: b0 / a0,
            b1: b1 / a0,
            b2: b2 / a0,
            a1: a1 / a0,
            a2: a2 / a0,
        }
    }
}

/// Transposed direct form II state for one channel.
#[derive(Debug, Clone, Copy, Default)]
pub struct BiquadState {
    z1: f32,
    z2: f32,
}

impl BiquadState {
    #[inline]
    pub fn process(&mut self, c: &BiquadCoefficients, x: f32) -> f32 {
        let y = c.b0 * x + self.z1;
        self.z1 = c.b1 * x - c.a1 * y + self.z2;
        self.z2 = c.b2 * x - c.a2 * y;
        y
    }

    pub fn reset(&mut self) {
        *self = Self::default();
    }
}

/// Stereo biquad filter node.
pub struct BiquadFilterNode {
    filter_type: FilterType,
    frequency: f32,
    q: f32,
    gain: f32,
    sample_rate: f32,
    coefficients: BiquadCoefficients,
    state: [BiquadState; 2],
}

impl BiquadFilterNode {
    pub fn new(filter_type: FilterType, frequency: f32, q: f32, gain: f32, sample_rate: f32) -> Self {
        Self {
            filter_type,
            frequency,
            q,
            gain,
            sample_rate,
            coefficients: BiquadCoefficients::new(filter_type, frequency, q, gain, sample_rate),
            state: [BiquadState::default(); 2],
        }
    }

    pub fn filter_type(&self) -> FilterType {
        self.filter_type
    }

    pub fn frequency(&self) -> f32 {
        self.frequency
    }

    pub fn q(&self) -> f32 {
        self.q
    }

    pub fn set_type(&mut self, filter_type: FilterType) {
        self.filter_type = filter_type;
        self.update();
    }

    pub fn set_frequency(&mut self, frequency: f32) {
        self.frequency = frequency;
        self.update();
    }

    pub fn set_q(&mut self, q: f32) {
        self.q = q;
        self.update();
    }

    pub fn set_gain(&mut self, gain: f32) {
        self.gain = gain;
        self.update();
    }

    fn update(&mut self) {
        self.coefficients = BiquadCoefficients::new(
            self.filter_type,
            self.frequency,
            self.q,
            self.gain,
            self.sample_rate,
        );
    }
}

impl AudioNode for BiquadFilterNode {
    fn process(&mut self, input: &AudioBlock, output: &mut AudioBlock, _ctx: &ProcessContext) {
        for (channel, state) in self.state.iter_mut().enumerate() {
            for (out, inp) in output.channel_mut(channel).iter_mut().zip(input.channel(channel)) {
                *out = state.process(&self.coefficients, *inp);
            }
        }
    }

    fn kind(&self) -> &'static str {
        "biquad"
    }

    fn as_any_mut(&mut self) -> &mut dyn Any {
        self
    }
}

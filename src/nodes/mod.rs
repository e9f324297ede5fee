//! Concrete [`AudioNode`](crate::graph::AudioNode) implementations.

mod analyser;
mod biquad;
mod chorus;
mod compressor;
mod convolver;
mod delay;
mod gain;
mod panner;
mod source;
mod waveshaper;

pub use analyser::{Analyser, AnalyserNode, AnalyserSettings};
pub use biquad::{BiquadCoefficients, BiquadFilterNode, BiquadState, FilterType};
pub use chorus::{CHORUS_DEPTH_SECONDS, ChorusNode};
pub use compressor::{CompressorSettings, DynamicsCompressorNode};
pub use convolver::{ConvolverNode, decaying_noise_impulse, normalization_scale};
pub use delay::FeedbackDelayNode;
pub use gain::GainNode;
pub use panner::{DistanceModel, PannerNode, PanningModel};
pub use source::BufferSourceNode;
pub use waveshaper::{Oversample, WaveShaperNode, distortion_curve};

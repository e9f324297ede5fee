//! Signal processing building blocks shared by nodes and effect units.

mod convolver;
mod delay_line;
mod fft;

pub use convolver::PartitionedConvolver;
pub use delay_line::DelayLine;
pub use fft::{Complex, Fft};

/// Converts decibels to a linear gain factor.
pub fn db_to_gain(db: f32) -> f32 {
    10.0f32.powf(db / 20.0)
}

/// Converts a linear gain factor to decibels, flooring silence at -1000 dB.
pub fn gain_to_db(gain: f32) -> f32 {
    if gain <= 0.0 {
        return -1000.0;
    }
    20.0 * gain.log10()
}

/// Per-sample smoothing coefficient for a one-pole filter with time constant `seconds`.
pub fn time_constant_coefficient(seconds: f32, sample_rate: f32) -> f32 {
    if seconds <= 0.0 {
        return 0.0;
    }
    (-1.0 / (seconds * sample_rate)).exp()
}

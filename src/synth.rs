//! Procedural stand-ins for sounds that fail to load.
//!
//! Every generator produces a mono buffer at the requested sample rate. The
//! category decides which generator is used, see [`synthesize`].

use crate::audio_data::SonoraAudioData;
use crate::catalog::SoundCategory;
use rand::Rng;
use std::f32::consts::TAU;

/// Notes of the C major triad (C5, E5, G5) used for feedback sounds.
pub const FEEDBACK_CHORD: [f32; 3] = [523.25, 659.25, 783.99];

/// Duration in seconds of the synthesized sound for a category.
pub fn duration_for(category: SoundCategory) -> f64 {
    match category {
        SoundCategory::Interface => 0.1,
        SoundCategory::System => 0.3,
        SoundCategory::Feedback => 0.5,
        SoundCategory::Ambient => 10.0,
        SoundCategory::Other => 0.2,
    }
}

/// Builds the synthetic buffer for `category`.
pub fn synthesize(category: SoundCategory, sample_rate: u32) -> SonoraAudioData {
    let duration = duration_for(category);
    let samples = match category {
        SoundCategory::Interface => beep(800.0, duration, sample_rate),
        SoundCategory::System => sweep(200.0, 1000.0, duration, sample_rate),
        SoundCategory::Feedback => chord(&FEEDBACK_CHORD, duration, sample_rate),
        SoundCategory::Ambient => pink_noise(duration, sample_rate, &mut rand::thread_rng()),
        SoundCategory::Other => beep(440.0, duration, sample_rate),
    };
    SonoraAudioData::new(samples, sample_rate, 1)
}

fn frame_count(duration: f64, sample_rate: u32) -> usize {
    (duration * sample_rate as f64).round() as usize
}

/// Sine at `frequency` under a quadratic decay `(1 - t)^2`.
pub fn beep(frequency: f32, duration: f64, sample_rate: u32) -> Vec<f32> {
    let len = frame_count(duration, sample_rate);
    let sr = sample_rate as f32;
    (0..len)
        .map(|i| {
            let envelope = 1.0 - i as f32 / len as f32;
            (TAU * frequency * i as f32 / sr).sin() * envelope * envelope
        })
        .collect()
}

/// Linear frequency sweep under a linear decay.
///
/// The phase is computed as `2π·f(p)·i/sr` with the instantaneous frequency
/// rather than an integrated phase, which gives the sweep its chirpy top end.
pub fn sweep(start: f32, end: f32, duration: f64, sample_rate: u32) -> Vec<f32> {
    let len = frame_count(duration, sample_rate);
    let sr = sample_rate as f32;
    (0..len)
        .map(|i| {
            let progress = i as f32 / len as f32;
            let frequency = start + (end - start) * progress;
            (TAU * frequency * i as f32 / sr).sin() * (1.0 - progress)
        })
        .collect()
}

/// Equal-weight sum of sines under a quadratic decay.
pub fn chord(frequencies: &[f32], duration: f64, sample_rate: u32) -> Vec<f32> {
    let len = frame_count(duration, sample_rate);
    let sr = sample_rate as f32;
    let weight = 1.0 / frequencies.len().max(1) as f32;
    (0..len)
        .map(|i| {
            let t = i as f32 / sr;
            let sample: f32 = frequencies.iter().map(|f| (TAU * f * t).sin() * weight).sum();
            let envelope = 1.0 - i as f32 / len as f32;
            sample * envelope * envelope
        })
        .collect()
}

/// Pink noise from white noise through Paul Kellet's refined filter, scaled by 0.11.
pub fn pink_noise<R: Rng + ?Sized>(duration: f64, sample_rate: u32, rng: &mut R) -> Vec<f32> {
    let len = frame_count(duration, sample_rate);
    let mut b = [0.0f32; 7];
    (0..len)
        .map(|_| {
            let white: f32 = rng.gen_range(-1.0..1.0);
            b[0] = 0.99886 * b[0] + white * 0.0555179;
            b[1] = 0.99332 * b[1] + white * 0.0750759;
            b[2] = 0.96900 * b[2] + white * 0.1538520;
            b[3] = 0.86650 * b[3] + white * 0.3104856;
            b[4] = 0.55000 * b[4] + white * 0.5329522;
            b[5] = -0.7616 * b[5] - white * 0.0168980;
            let pink = b.iter().sum::<f32>() + white * 0.5362;
            b[6] = white * 0.115926;
            (pink * 0.11).clamp(-1.0, 1.0)
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::SeedableRng;
    use rand::rngs::StdRng;

    #[test]
    fn lengths_follow_category_durations() {
        let sr = 44100;
        let expected = [
            (SoundCategory::Interface, 4410),
            (SoundCategory::System, 13230),
            (SoundCategory::Feedback, 22050),
            (SoundCategory::Ambient, 441000),
            (SoundCategory::Other, 8820),
        ];
        for (category, frames) in expected {
            let data = synthesize(category, sr);
            assert_eq!(data.total_frames(), frames, "{}", category);
            assert_eq!(data.channels(), 1);
            assert_eq!(data.sample_rate(), sr);
        }
    }

    #[test]
    fn beep_starts_silent_and_decays() {
        let samples = beep(800.0, 0.1, 48000);
        assert_eq!(samples[0], 0.0);
        let head = samples[..480].iter().fold(0.0f32, |a, s| a.max(s.abs()));
        let tail = samples[4320..].iter().fold(0.0f32, |a, s| a.max(s.abs()));
        assert!(head > 0.5);
        assert!(tail < 0.02);
    }

    #[test]
    fn chord_stays_within_unit_range() {
        let samples = chord(&FEEDBACK_CHORD, 0.5, 48000);
        assert!(samples.iter().all(|s| s.abs() <= 1.0));
    }

    #[test]
    fn pink_noise_is_bounded() {
        let mut rng = StdRng::seed_from_u64(7);
        let samples = pink_noise(duration_for(SoundCategory::Ambient), 48000, &mut rng);
        assert_eq!(samples.len(), 480_000);
        assert!(samples.iter().all(|s| (-1.0..=1.0).contains(s)));
        assert!(samples.iter().any(|s| s.abs() > 0.01));
    }

    #[test]
    fn sweep_amplitude_falls_linearly() {
        let samples = sweep(200.0, 1000.0, 0.3, 48000);
        let quarter = samples.len() / 4;
        let early = samples[..quarter].iter().fold(0.0f32, |a, s| a.max(s.abs()));
        let late = samples[3 * quarter..].iter().fold(0.0f32, |a, s| a.max(s.abs()));
        assert!(early > late);
        assert!(late <= 0.26);
    }
}

use crate::dsp::{Complex, Fft};
use crate::graph::{AudioBlock, AudioNode, ProcessContext};
use std::any::Any;
use std::f32::consts::TAU;
use std::sync::{Arc, Mutex};

/// Analysis parameters shared by the render-side node and the reader.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct AnalyserSettings {
    /// Time-domain window length, a power of two
    pub fft_size: usize,
    pub smoothing: f32,
    pub min_decibels: f32,
    pub max_decibels: f32,
}

impl Default for AnalyserSettings {
    fn default() -> Self {
        Self {
            fft_size: 2048,
            smoothing: 0.8,
            min_decibels: -100.0,
            max_decibels: -30.0,
        }
    }
}

impl AnalyserSettings {
    pub fn frequency_bin_count(&self) -> usize {
        self.fft_size / 2
    }
}

/// Passes audio through unchanged while publishing the most recent
/// `fft_size` samples (mono down-mix) for an [`Analyser`] to read.
pub struct AnalyserNode {
    history: Vec<f32>,
    write: usize,
    shared: Arc<Mutex<Vec<f32>>>,
}

impl AnalyserNode {
    /// Creates the node and the reader that observes it.
    pub fn new(settings: AnalyserSettings) -> (Self, Analyser) {
        let shared = Arc::new(Mutex::new(vec![0.0; settings.fft_size]));
        let node = Self {
            history: vec![0.0; settings.fft_size],
            write: 0,
            shared: Arc::clone(&shared),
        };
        (node, Analyser::new(settings, shared))
    }

    fn publish(&self) {
        // Never block the render side; a skipped update is picked up next block
        let Ok(mut window) = self.shared.try_lock() else {
            return;
        };
        let (newest, oldest) = self.history.split_at(self.write);
        window[..oldest.len()].copy_from_slice(oldest);
        window[oldest.len()..].copy_from_slice(newest);
    }
}

impl AudioNode for AnalyserNode {
    fn process(&mut self, input: &AudioBlock, output: &mut AudioBlock, ctx: &ProcessContext) {
        output.copy_from(input);
        let len = self.history.len();
        for frame in 0..ctx.frames {
            self.history[self.write] = input.mono(frame);
            self.write = (self.write + 1) % len;
        }
        self.publish();
    }

    fn kind(&self) -> &'static str {
        "analyser"
    }

    fn as_any_mut(&mut self) -> &mut dyn Any {
        self
    }
}

/// Main-thread reader producing byte spectra and waveforms.
///
/// Frequency data uses a Blackman window, `|X[k]| / N` magnitudes smoothed
/// over time and mapped linearly from `[min_decibels, max_decibels]` to
/// `[0, 255]`. Time-domain bytes map `[-1, 1]` to `[0, 255]` around 128.
pub struct Analyser {
    settings: AnalyserSettings,
    shared: Arc<Mutex<Vec<f32>>>,
    fft: Fft,
    window: Vec<f32>,
    smoothed: Vec<f32>,
    spectrum: Vec<Complex>,
}

impl Analyser {
    fn new(settings: AnalyserSettings, shared: Arc<Mutex<Vec<f32>>>) -> Self {
        let n = settings.fft_size;
        let window = (0..n)
            .map(|i| {
                let x = i as f32 / n as f32;
                0.42 - 0.5 * (TAU * x).cos() + 0.08 * (2.0 * TAU * x).cos()
            })
            .collect();
        Self {
            fft: Fft::new(n),
            window,
            smoothed: vec![0.0; settings.frequency_bin_count()],
            spectrum: vec![Complex::ZERO; n],
            shared,
            settings,
        }
    }

    pub fn settings(&self) -> &AnalyserSettings {
        &self.settings
    }

    /// Latest time-domain window, oldest sample first.
    pub fn float_time_domain_data(&self) -> Vec<f32> {
        match self.shared.lock() {
            Ok(window) => window.clone(),
            Err(poisoned) => poisoned.into_inner().clone(),
        }
    }

    pub fn byte_time_domain_data(&self) -> Vec<u8> {
        self.float_time_domain_data()
            .into_iter()
            .map(|x| (128.0 * (1.0 + x)).floor().clamp(0.0, 255.0) as u8)
            .collect()
    }

    /// Smoothed magnitude spectrum in dB, one value per bin.
    pub fn float_frequency_data(&mut self) -> Vec<f32> {
        let samples = self.float_time_domain_data();
        for ((bin, sample), w) in self.spectrum.iter_mut().zip(&samples).zip(&self.window) {
            *bin = Complex::new(sample * w, 0.0);
        }
        self.fft.forward(&mut self.spectrum);

        let n = self.settings.fft_size as f32;
        let tau = self.settings.smoothing.clamp(0.0, 1.0);
        for (smoothed, bin) in self.smoothed.iter_mut().zip(&self.spectrum) {
            let magnitude = bin.norm() / n;
            let value = tau * *smoothed + (1.0 - tau) * magnitude;
            *smoothed = if value.is_finite() { value } else { 0.0 };
        }

        self.smoothed
            .iter()
            .map(|m| if *m > 0.0 { 20.0 * m.log10() } else { f32::NEG_INFINITY })
            .collect()
    }

    pub fn byte_frequency_data(&mut self) -> Vec<u8> {
        let min = self.settings.min_decibels;
        let range = self.settings.max_decibels - min;
        self.float_frequency_data()
            .into_iter()
            .map(|db| {
                if db == f32::NEG_INFINITY {
                    return 0;
                }
                (255.0 / range * (db - min)).floor().clamp(0.0, 255.0) as u8
            })
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ctx(frames: usize) -> ProcessContext {
        ProcessContext {
            sample_rate: 48000.0,
            block_start: 0.0,
            frames,
        }
    }

    #[test]
    fn silence_reads_as_midline_and_empty_spectrum() {
        let (mut node, mut analyser) = AnalyserNode::new(AnalyserSettings::default());
        let input = AudioBlock::new(512);
        let mut output = AudioBlock::new(512);
        node.process(&input, &mut output, &ctx(512));

        let waveform = analyser.byte_time_domain_data();
        assert_eq!(waveform.len(), 2048);
        assert!(waveform.iter().all(|b| *b == 128));

        let spectrum = analyser.byte_frequency_data();
        assert_eq!(spectrum.len(), 1024);
        assert!(spectrum.iter().all(|b| *b == 0));
    }

    #[test]
    fn window_keeps_most_recent_samples_in_order() {
        let settings = AnalyserSettings {
            fft_size: 8,
            ..Default::default()
        };
        let (mut node, analyser) = AnalyserNode::new(settings);
        let mut input = AudioBlock::new(6);
        let mut output = AudioBlock::new(6);
        for block in 0..2 {
            for frame in 0..6 {
                let value = (block * 6 + frame) as f32 / 16.0;
                input.channel_mut(0)[frame] = value;
                input.channel_mut(1)[frame] = value;
            }
            node.process(&input, &mut output, &ctx(6));
        }
        let expected: Vec<f32> = (4..12).map(|v| v as f32 / 16.0).collect();
        assert_eq!(analyser.float_time_domain_data(), expected);
        assert_eq!(output.channel(0), input.channel(0));
    }

    #[test]
    fn tone_lights_up_its_bin() {
        let (mut node, mut analyser) = AnalyserNode::new(AnalyserSettings::default());
        // bin 64 of a 2048 point FFT
        let freq_bin = 64.0;
        let mut input = AudioBlock::new(2048);
        for frame in 0..2048 {
            let s = (TAU * freq_bin * frame as f32 / 2048.0).sin();
            input.channel_mut(0)[frame] = s;
            input.channel_mut(1)[frame] = s;
        }
        let mut output = AudioBlock::new(2048);
        node.process(&input, &mut output, &ctx(2048));

        let mut decibels = Vec::new();
        for _ in 0..30 {
            decibels = analyser.float_frequency_data();
        }
        let peak = decibels
            .iter()
            .enumerate()
            .max_by(|a, b| a.1.total_cmp(b.1))
            .map(|(i, _)| i)
            .unwrap();
        assert_eq!(peak, 64);

        let spectrum = analyser.byte_frequency_data();
        assert_eq!(spectrum[64], 255);
        assert!(spectrum[400] < 64);
    }

    #[test]
    fn time_domain_bytes_map_unit_range() {
        let settings = AnalyserSettings {
            fft_size: 4,
            ..Default::default()
        };
        let (mut node, analyser) = AnalyserNode::new(settings);
        let mut input = AudioBlock::new(4);
        let values = [-1.0, -0.5, 0.5, 1.0];
        input.channel_mut(0).copy_from_slice(&values);
        input.channel_mut(1).copy_from_slice(&values);
        let mut output = AudioBlock::new(4);
        node.process(&input, &mut output, &ctx(4));
        assert_eq!(analyser.byte_time_domain_data(), vec![0, 64, 192, 255]);
    }
}

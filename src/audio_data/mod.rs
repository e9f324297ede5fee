//! Decoded audio buffers and the loaders that produce them.

mod default_loader;
mod load_options;
mod loader;
mod resampler;

use crate::error::{Result, SonoraError};
pub use default_loader::DefaultAudioLoader;
pub use load_options::{ConvertToMono, LoadOptions};
pub use loader::AudioDataLoader;
pub use resampler::AudioResampler;
use std::sync::Arc;
use std::time::Duration;

/// Container for decoded audio with reference-counted sharing.
///
/// Samples are stored **interleaved** (`[L0, R0, L1, R1, ...]` for stereo).
/// Cloning is cheap; every clone shares the same sample storage, which is
/// immutable once built.
#[derive(Debug, Clone)]
pub struct SonoraAudioData {
    inner: Arc<AudioDataInner>,
}

#[derive(Debug)]
struct AudioDataInner {
    samples: Vec<f32>,
    sample_rate: u32,
    channels: u16,
    duration: Duration,
    total_frames: usize,
}

impl SonoraAudioData {
    pub(crate) fn new(samples: Vec<f32>, sample_rate: u32, channels: u16) -> Self {
        let total_frames = samples.len() / channels.max(1) as usize;
        let duration = Duration::from_secs_f64(total_frames as f64 / sample_rate.max(1) as f64);
        Self {
            inner: Arc::new(AudioDataInner {
                samples,
                sample_rate,
                channels,
                duration,
                total_frames,
            }),
        }
    }

    /// Builds audio data from interleaved samples, e.g. in a custom loader.
    pub fn from_interleaved(samples: Vec<f32>, sample_rate: u32, channels: u16) -> Result<Self> {
        if sample_rate == 0 {
            return Err(SonoraError::AudioFormat(
                "Sample rate must be greater than 0".to_string(),
            ));
        }
        if channels == 0 {
            return Err(SonoraError::AudioFormat(
                "Channel count must be greater than 0".to_string(),
            ));
        }
        if samples.len() % channels as usize != 0 {
            return Err(SonoraError::AudioFormat(format!(
                "{} samples do not divide into {} channels",
                samples.len(),
                channels
            )));
        }
        Ok(Self::new(samples, sample_rate, channels))
    }

    /// Load audio data from a path or URL using the default loader.
    pub fn from_source(source: &str) -> Result<Self> {
        DefaultAudioLoader::new().load(source, &LoadOptions::default())
    }

    pub fn sample_rate(&self) -> u32 {
        self.inner.sample_rate
    }

    pub fn channels(&self) -> u16 {
        self.inner.channels
    }

    pub fn duration(&self) -> Duration {
        self.inner.duration
    }

    pub fn samples(&self) -> &[f32] {
        &self.inner.samples
    }

    pub fn total_frames(&self) -> usize {
        self.inner.total_frames
    }

    pub fn is_empty(&self) -> bool {
        self.inner.samples.is_empty()
    }

    pub fn len(&self) -> usize {
        self.inner.samples.len()
    }

    /// Sample of `channel` at `frame`. Channels past the last one repeat it,
    /// so mono material feeds both sides of a stereo graph.
    pub fn frame_sample(&self, frame: usize, channel: usize) -> f32 {
        let channels = self.inner.channels as usize;
        let channel = channel.min(channels - 1);
        self.inner
            .samples
            .get(frame * channels + channel)
            .copied()
            .unwrap_or(0.0)
    }

    /// Get samples for a specific channel (0-indexed)
    pub fn channel_samples(&self, channel: usize) -> Result<Vec<f32>> {
        if channel >= self.inner.channels as usize {
            return Err(SonoraError::AudioFormat(format!(
                "Channel {} out of range (max: {})",
                channel,
                self.inner.channels - 1
            )));
        }

        Ok(self
            .inner
            .samples
            .chunks(self.inner.channels as usize)
            .map(|frame| frame[channel])
            .collect())
    }

    /// Convert to mono by downmixing all channels
    pub fn to_mono(&self) -> Self {
        if self.inner.channels == 1 {
            return self.clone();
        }

        let channels = self.inner.channels as usize;
        let mono_samples: Vec<f32> = self
            .inner
            .samples
            .chunks(channels)
            .map(|frame| frame.iter().sum::<f32>() / channels as f32)
            .collect();

        Self::new(mono_samples, self.inner.sample_rate, 1)
    }

    /// Resample to a different sample rate using rubato
    pub fn resample(&self, target_sample_rate: u32) -> Result<Self> {
        if target_sample_rate == self.inner.sample_rate {
            return Ok(self.clone());
        }

        let resampler = AudioResampler::new(
            self.inner.sample_rate,
            target_sample_rate,
            self.inner.channels,
            Some(1024),
        )?;

        let resampled = resampler.resample_interleaved(&self.inner.samples)?;
        Ok(Self::new(resampled, target_sample_rate, self.inner.channels))
    }

    /// Largest absolute sample value.
    pub fn peak(&self) -> f32 {
        self.inner
            .samples
            .iter()
            .fold(0.0f32, |acc, s| acc.max(s.abs()))
    }
}

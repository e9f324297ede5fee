use crate::error::{Result, SonoraError};
use rubato::{FftFixedIn, Resampler};

/// Offline sample-rate converter for whole decoded buffers.
///
/// Input is fed to rubato in fixed chunks (the last one zero padded) and the
/// result is trimmed to `ceil(frames * ratio)` frames.
pub struct AudioResampler {
    source_sample_rate: u32,
    target_sample_rate: u32,
    channels: u16,
    chunk_size: usize,
}

impl AudioResampler {
    pub fn new(
        source_sample_rate: u32,
        target_sample_rate: u32,
        channels: u16,
        chunk_size: Option<usize>,
    ) -> Result<Self> {
        if source_sample_rate == 0 || target_sample_rate == 0 {
            return Err(SonoraError::AudioFormat(
                "Sample rates must be greater than 0".to_string(),
            ));
        }

        if channels == 0 {
            return Err(SonoraError::AudioFormat(
                "Channel count must be greater than 0".to_string(),
            ));
        }

        Ok(Self {
            source_sample_rate,
            target_sample_rate,
            channels,
            chunk_size: chunk_size.unwrap_or(1024).max(1),
        })
    }

    fn expected_len(&self, input_len: usize) -> usize {
        (input_len as f64 * self.resample_ratio()).ceil() as usize
    }

    pub fn resample_channel(&self, channel_samples: &[f32]) -> Result<Vec<f32>> {
        if self.source_sample_rate == self.target_sample_rate {
            return Ok(channel_samples.to_vec());
        }

        let mut resampler = FftFixedIn::<f32>::new(
            self.source_sample_rate as usize,
            self.target_sample_rate as usize,
            self.chunk_size,
            2, // sub_chunks
            1,
        )
        .map_err(|e| SonoraError::AudioLoading(format!("Failed to create resampler: {}", e)))?;

        let mut output = Vec::with_capacity(self.expected_len(channel_samples.len()) + self.chunk_size);

        for chunk in channel_samples.chunks(self.chunk_size) {
            let mut input_chunk = vec![0.0f32; self.chunk_size];
            input_chunk[..chunk.len()].copy_from_slice(chunk);

            let waves_out = resampler
                .process(&[input_chunk], None)
                .map_err(|e| SonoraError::AudioLoading(format!("Resampling error: {}", e)))?;

            if let Some(first_channel) = waves_out.first() {
                output.extend_from_slice(first_channel);
            }
        }

        output.resize(self.expected_len(channel_samples.len()), 0.0);
        Ok(output)
    }

    pub fn resample_interleaved(&self, interleaved_samples: &[f32]) -> Result<Vec<f32>> {
        if self.source_sample_rate == self.target_sample_rate {
            return Ok(interleaved_samples.to_vec());
        }

        let channels = self.channels as usize;
        let resampled = (0..channels)
            .map(|ch| {
                let channel: Vec<f32> = interleaved_samples
                    .chunks(channels)
                    .map(|frame| frame.get(ch).copied().unwrap_or(0.0))
                    .collect();
                self.resample_channel(&channel)
            })
            .collect::<Result<Vec<_>>>()?;

        let new_frames = resampled.first().map_or(0, Vec::len);
        let mut interleaved = Vec::with_capacity(new_frames * channels);
        for frame_idx in 0..new_frames {
            for channel in &resampled {
                interleaved.push(channel[frame_idx]);
            }
        }

        Ok(interleaved)
    }

    pub fn target_sample_rate(&self) -> u32 {
        self.target_sample_rate
    }

    pub fn source_sample_rate(&self) -> u32 {
        self.source_sample_rate
    }

    pub fn resample_ratio(&self) -> f64 {
        self.target_sample_rate as f64 / self.source_sample_rate as f64
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_resampler_creation() {
        let resampler = AudioResampler::new(44100, 48000, 2, None).unwrap();
        assert_eq!(resampler.source_sample_rate(), 44100);
        assert_eq!(resampler.target_sample_rate(), 48000);
    }

    #[test]
    fn test_resampler_no_resampling_needed() {
        let resampler = AudioResampler::new(44100, 44100, 1, None).unwrap();
        let samples = vec![0.1, 0.2, 0.3, 0.4];
        let result = resampler.resample_channel(&samples).unwrap();
        assert_eq!(result, samples);
    }

    #[test]
    fn test_output_length_follows_ratio() {
        let resampler = AudioResampler::new(44100, 48000, 2, None).unwrap();
        let input = vec![0.0f32; 4410 * 2];
        let output = resampler.resample_interleaved(&input).unwrap();
        assert_eq!(output.len(), 4800 * 2);
    }

    #[test]
    fn test_invalid_sample_rates() {
        assert!(AudioResampler::new(0, 48000, 2, None).is_err());
        assert!(AudioResampler::new(44100, 0, 2, None).is_err());
        assert!(AudioResampler::new(44100, 48000, 0, None).is_err());
    }
}

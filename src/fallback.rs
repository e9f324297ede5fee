// Fallback module - degraded-mode playback
//
// Without a processing graph, sounds are mixed straight into the output with
// nothing but a per-voice volume. Voices live in a shared map the mixer only
// try_locks, so the device callback never waits on the main thread.

use crate::audio_data::SonoraAudioData;
use crate::output::OutputStream;
use crate::playback::PlaybackId;
use std::collections::HashMap;
use std::sync::{Arc, Mutex};

/// One sound being played directly.
#[derive(Debug)]
struct Voice {
    buffer: SonoraAudioData,
    /// Read position in buffer frames
    position: f64,
    step: f64,
    volume: f32,
    looping: bool,
    finished: bool,
}

impl Voice {
    fn new(buffer: SonoraAudioData, output_rate: u32, volume: f32, looping: bool) -> Self {
        Self {
            step: buffer.sample_rate() as f64 / output_rate.max(1) as f64,
            finished: buffer.is_empty(),
            buffer,
            position: 0.0,
            volume,
            looping,
        }
    }

    /// Mixes this voice into `buffer`. Returns the number of frames written.
    fn fill_buffer(&mut self, buffer: &mut [f32], channels: usize) -> usize {
        if self.finished {
            return 0;
        }
        let frames = self.buffer.total_frames();
        let frame_count = buffer.len() / channels.max(1);
        let mut frames_filled = 0;

        for frame in 0..frame_count {
            let index = self.position as usize;
            if index >= frames {
                if self.looping {
                    self.position = 0.0;
                } else {
                    self.finished = true;
                    break;
                }
            }
            let index = self.position as usize;
            let base = frame * channels;
            for channel in 0..channels {
                // stereo buffers keep their sides, anything else is duplicated
                let source_channel = if channels == 1 { 0 } else { channel.min(1) };
                buffer[base + channel] += self.buffer.frame_sample(index, source_channel) * self.volume;
            }
            self.position += self.step;
            frames_filled += 1;
        }
        frames_filled
    }
}

/// Mixes every voice into `buffer` and drops finished ones.
fn mix_voices(
    buffer: &mut [f32],
    channels: usize,
    voices: &Arc<Mutex<HashMap<PlaybackId, Voice>>>,
) -> usize {
    let Ok(mut voices) = voices.try_lock() else {
        log::debug!("Fallback voices busy, block skipped");
        return 0;
    };
    let mut frames_filled_max = 0;
    for voice in voices.values_mut() {
        frames_filled_max = frames_filled_max.max(voice.fill_buffer(buffer, channels));
    }
    voices.retain(|_, voice| !voice.finished);
    frames_filled_max
}

/// Direct playback for degraded mode.
pub(crate) struct FallbackPlayer {
    voices: Arc<Mutex<HashMap<PlaybackId, Voice>>>,
    sample_rate: u32,
    stream: Option<OutputStream>,
}

impl FallbackPlayer {
    /// A player whose output is pulled with [`render`](Self::render).
    pub(crate) fn detached(sample_rate: u32) -> Self {
        Self {
            voices: Arc::new(Mutex::new(HashMap::new())),
            sample_rate,
            stream: None,
        }
    }

    /// A player mixing straight into the default output device.
    ///
    /// Falls back to a detached player when no device stream can be opened.
    pub(crate) fn with_device(sample_rate: u32) -> Self {
        let mut player = Self::detached(sample_rate);
        let voices = Arc::clone(&player.voices);
        let stream = OutputStream::open(
            None,
            None,
            Box::new(move |buffer: &mut [f32], channels: u16| {
                mix_voices(buffer, channels as usize, &voices)
            }),
        )
        .and_then(|stream| stream.play().map(|()| stream));

        match stream {
            Ok(stream) => {
                player.sample_rate = stream.sample_rate();
                player.stream = Some(stream);
            }
            Err(e) => log::warn!("Fallback playback has no output device: {}", e),
        }
        player
    }

    /// Output rate; loaded sounds should be resampled to it.
    pub(crate) fn sample_rate(&self) -> u32 {
        self.sample_rate
    }

    pub(crate) fn has_device(&self) -> bool {
        self.stream.is_some()
    }

    pub(crate) fn play(&self, buffer: SonoraAudioData, volume: f32, looping: bool) {
        let id = PlaybackId::new();
        let voice = Voice::new(buffer, self.sample_rate, volume.clamp(0.0, 1.0), looping);
        match self.voices.lock() {
            Ok(mut voices) => {
                voices.insert(id, voice);
            }
            Err(poisoned) => {
                poisoned.into_inner().insert(id, voice);
            }
        }
    }

    pub(crate) fn stop_all(&self) {
        match self.voices.lock() {
            Ok(mut voices) => voices.clear(),
            Err(poisoned) => poisoned.into_inner().clear(),
        }
    }

    pub(crate) fn active_voices(&self) -> usize {
        match self.voices.lock() {
            Ok(voices) => voices.len(),
            Err(poisoned) => poisoned.into_inner().len(),
        }
    }

    /// Mixes `frames` interleaved frames of `channels` channels.
    pub(crate) fn render(&self, frames: usize, channels: usize) -> Vec<f32> {
        let mut buffer = vec![0.0; frames * channels];
        if self.stream.is_some() {
            // the device callback owns the mix
            return buffer;
        }
        mix_voices(&mut buffer, channels, &self.voices);
        buffer
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn buffer(frames: usize, rate: u32) -> SonoraAudioData {
        SonoraAudioData::from_interleaved(vec![1.0; frames], rate, 1).unwrap()
    }

    #[test]
    fn voices_play_at_their_volume_and_finish() {
        let player = FallbackPlayer::detached(8000);
        player.play(buffer(100, 8000), 0.5, false);
        assert_eq!(player.active_voices(), 1);

        let mixed = player.render(64, 2);
        assert!(mixed.iter().all(|s| (*s - 0.5).abs() < 1e-6));

        let tail = player.render(64, 2);
        assert_eq!(tail[2 * 35], 0.5);
        assert_eq!(tail[2 * 36], 0.0);
        assert_eq!(player.active_voices(), 0);
    }

    #[test]
    fn voices_are_summed() {
        let player = FallbackPlayer::detached(8000);
        player.play(buffer(64, 8000), 0.25, false);
        player.play(buffer(64, 8000), 0.25, false);
        let mixed = player.render(32, 2);
        assert!((mixed[0] - 0.5).abs() < 1e-6);
    }

    #[test]
    fn rate_mismatch_is_stepped_over() {
        let player = FallbackPlayer::detached(8000);
        // 16 kHz buffer plays twice as fast
        player.play(buffer(64, 16000), 1.0, false);
        let mixed = player.render(64, 2);
        assert_eq!(mixed[2 * 31], 1.0);
        assert_eq!(mixed[2 * 32], 0.0);
    }

    #[test]
    fn looping_voices_run_until_stopped() {
        let player = FallbackPlayer::detached(8000);
        player.play(buffer(10, 8000), 1.0, true);
        player.render(100, 2);
        assert_eq!(player.active_voices(), 1);
        player.stop_all();
        assert_eq!(player.active_voices(), 0);
    }
}

/// One processing block of planar stereo audio.
///
/// Every node in the graph reads and writes stereo blocks; mono material is
/// up-mixed by duplicating it into both channels.
#[derive(Debug, Clone)]
pub struct AudioBlock {
    channels: [Vec<f32>; 2],
}

impl AudioBlock {
    pub const CHANNELS: usize = 2;

    pub fn new(frames: usize) -> Self {
        Self {
            channels: [vec![0.0; frames], vec![0.0; frames]],
        }
    }

    pub fn frames(&self) -> usize {
        self.channels[0].len()
    }

    pub fn channel(&self, index: usize) -> &[f32] {
        &self.channels[index]
    }

    pub fn channel_mut(&mut self, index: usize) -> &mut [f32] {
        &mut self.channels[index]
    }

    /// Both channels mutably at once.
    pub fn channels_mut(&mut self) -> (&mut [f32], &mut [f32]) {
        let [left, right] = &mut self.channels;
        (left.as_mut_slice(), right.as_mut_slice())
    }

    pub fn clear(&mut self) {
        for channel in &mut self.channels {
            channel.fill(0.0);
        }
    }

    /// Sums `other` into this block.
    pub fn mix_from(&mut self, other: &AudioBlock) {
        for (dst, src) in self.channels.iter_mut().zip(other.channels.iter()) {
            for (d, s) in dst.iter_mut().zip(src.iter()) {
                *d += *s;
            }
        }
    }

    pub fn copy_from(&mut self, other: &AudioBlock) {
        for (dst, src) in self.channels.iter_mut().zip(other.channels.iter()) {
            dst.copy_from_slice(src);
        }
    }

    /// Mono down-mix of frame `frame`.
    pub fn mono(&self, frame: usize) -> f32 {
        0.5 * (self.channels[0][frame] + self.channels[1][frame])
    }

    /// Writes the block into an interleaved buffer with `channels` channels.
    ///
    /// A mono device gets the down-mix, extra device channels are silent.
    pub fn write_interleaved(&self, out: &mut [f32], channels: usize) {
        let frames = self.frames().min(out.len() / channels.max(1));
        for frame in 0..frames {
            let base = frame * channels;
            if channels == 1 {
                out[base] = self.mono(frame);
                continue;
            }
            out[base] = self.channels[0][frame];
            out[base + 1] = self.channels[1][frame];
            for extra in 2..channels {
                out[base + extra] = 0.0;
            }
        }
    }

    pub fn peak(&self) -> f32 {
        self.channels
            .iter()
            .flat_map(|c| c.iter())
            .fold(0.0f32, |acc, s| acc.max(s.abs()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn mix_sums_channels() {
        let mut a = AudioBlock::new(4);
        let mut b = AudioBlock::new(4);
        a.channel_mut(0).fill(0.25);
        b.channel_mut(0).fill(0.5);
        b.channel_mut(1).fill(-1.0);
        a.mix_from(&b);
        assert_eq!(a.channel(0), &[0.75; 4]);
        assert_eq!(a.channel(1), &[-1.0; 4]);
    }

    #[test]
    fn interleaves_for_mono_and_surround_devices() {
        let mut block = AudioBlock::new(2);
        block.channel_mut(0).copy_from_slice(&[1.0, 0.0]);
        block.channel_mut(1).copy_from_slice(&[0.0, 1.0]);

        let mut mono = [9.0; 2];
        block.write_interleaved(&mut mono, 1);
        assert_eq!(mono, [0.5, 0.5]);

        let mut quad = [9.0; 8];
        block.write_interleaved(&mut quad, 4);
        assert_eq!(quad, [1.0, 0.0, 0.0, 0.0, 0.0, 1.0, 0.0, 0.0]);
    }
}

use crate::audio_data::SonoraAudioData;
use crate::graph::{AudioBlock, AudioNode, ProcessContext};
use std::any::Any;

/// Plays a decoded buffer once (or looped) starting at a scheduled time.
///
/// Mono buffers feed both output channels; buffers with more than two
/// channels contribute their first two.
pub struct BufferSourceNode {
    buffer: SonoraAudioData,
    /// Read position in buffer frames
    position: f64,
    /// Buffer frames advanced per output frame
    step: f64,
    looping: bool,
    start_time: f64,
    stop_time: Option<f64>,
    finished: bool,
}

impl BufferSourceNode {
    /// `when` is an absolute context time; times already in the past start
    /// immediately. `offset` is in seconds into the buffer.
    pub fn new(
        buffer: SonoraAudioData,
        context_sample_rate: f32,
        playback_rate: f32,
        looping: bool,
        when: f64,
        offset: f64,
    ) -> Self {
        let frames = buffer.total_frames() as f64;
        let mut position = offset.max(0.0) * buffer.sample_rate() as f64;
        if looping && frames > 0.0 {
            position %= frames;
        }
        let rate = if playback_rate.is_finite() && playback_rate > 0.0 {
            playback_rate as f64
        } else {
            1.0
        };

        Self {
            step: rate * buffer.sample_rate() as f64 / context_sample_rate as f64,
            finished: frames == 0.0 || position >= frames,
            buffer,
            position,
            looping,
            start_time: when,
            stop_time: None,
        }
    }

    /// Schedules the end of playback. An earlier stop time wins.
    pub fn stop_at(&mut self, time: f64) {
        self.stop_time = Some(match self.stop_time {
            Some(existing) => existing.min(time),
            None => time,
        });
    }

    pub fn is_looping(&self) -> bool {
        self.looping
    }

    fn sample(&self, channel: usize) -> f32 {
        let frames = self.buffer.total_frames();
        let index = self.position.floor() as usize;
        let frac = (self.position - index as f64) as f32;
        let current = self.buffer.frame_sample(index, channel);
        if frac == 0.0 {
            return current;
        }
        let next_index = if index + 1 >= frames && self.looping {
            0
        } else {
            index + 1
        };
        let next = self.buffer.frame_sample(next_index, channel);
        current + (next - current) * frac
    }
}

impl AudioNode for BufferSourceNode {
    fn process(&mut self, _input: &AudioBlock, output: &mut AudioBlock, ctx: &ProcessContext) {
        output.clear();
        if self.finished {
            return;
        }

        let frames = self.buffer.total_frames() as f64;
        for frame in 0..ctx.frames {
            let time = ctx.time_at(frame);
            if self.stop_time.is_some_and(|stop| time >= stop) {
                self.finished = true;
                break;
            }
            if time < self.start_time {
                continue;
            }

            output.channel_mut(0)[frame] = self.sample(0);
            output.channel_mut(1)[frame] = self.sample(1);

            self.position += self.step;
            if self.position >= frames {
                if self.looping {
                    self.position %= frames;
                } else {
                    self.finished = true;
                    break;
                }
            }
        }
    }

    fn kind(&self) -> &'static str {
        "buffer-source"
    }

    fn is_finished(&self) -> bool {
        self.finished
    }

    fn as_any_mut(&mut self) -> &mut dyn Any {
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ctx(block_start: f64) -> ProcessContext {
        ProcessContext {
            sample_rate: 8.0,
            block_start,
            frames: 4,
        }
    }

    fn buffer(samples: Vec<f32>) -> SonoraAudioData {
        SonoraAudioData::from_interleaved(samples, 8, 1).unwrap()
    }

    #[test]
    fn plays_once_then_finishes() {
        let mut node = BufferSourceNode::new(buffer(vec![1.0, 2.0, 3.0]), 8.0, 1.0, false, 0.0, 0.0);
        let input = AudioBlock::new(4);
        let mut output = AudioBlock::new(4);

        node.process(&input, &mut output, &ctx(0.0));
        assert_eq!(output.channel(0), &[1.0, 2.0, 3.0, 0.0]);
        assert_eq!(output.channel(1), &[1.0, 2.0, 3.0, 0.0]);
        assert!(node.is_finished());
    }

    #[test]
    fn waits_for_start_time_and_honours_offset() {
        let mut node =
            BufferSourceNode::new(buffer(vec![1.0, 2.0, 3.0, 4.0]), 8.0, 1.0, false, 0.25, 0.125);
        let input = AudioBlock::new(4);
        let mut output = AudioBlock::new(4);

        node.process(&input, &mut output, &ctx(0.0));
        assert_eq!(output.channel(0), &[0.0, 0.0, 2.0, 3.0]);
        assert!(!node.is_finished());
    }

    #[test]
    fn looping_wraps_until_stopped() {
        let mut node = BufferSourceNode::new(buffer(vec![1.0, 2.0]), 8.0, 1.0, true, 0.0, 0.0);
        node.stop_at(0.75);
        let input = AudioBlock::new(4);
        let mut output = AudioBlock::new(4);

        node.process(&input, &mut output, &ctx(0.0));
        assert_eq!(output.channel(0), &[1.0, 2.0, 1.0, 2.0]);
        node.process(&input, &mut output, &ctx(0.5));
        assert_eq!(output.channel(0), &[1.0, 2.0, 0.0, 0.0]);
        assert!(node.is_finished());
    }

    #[test]
    fn double_rate_skips_frames() {
        let mut node =
            BufferSourceNode::new(buffer(vec![1.0, 2.0, 3.0, 4.0]), 8.0, 2.0, false, 0.0, 0.0);
        let input = AudioBlock::new(4);
        let mut output = AudioBlock::new(4);

        node.process(&input, &mut output, &ctx(0.0));
        assert_eq!(output.channel(0), &[1.0, 3.0, 0.0, 0.0]);
        assert!(node.is_finished());
    }
}

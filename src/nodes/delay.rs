use crate::dsp::DelayLine;
use crate::graph::{AudioBlock, AudioNode, ProcessContext};
use std::any::Any;

/// Echo with internal feedback. Only the delayed (wet) signal is output.
pub struct FeedbackDelayNode {
    lines: [DelayLine; 2],
    sample_rate: f32,
    max_delay: f32,
    delay_time: f32,
    feedback: f32,
    wet: f32,
}

impl FeedbackDelayNode {
    pub fn new(delay_time: f32, feedback: f32, wet: f32, max_delay: f32, sample_rate: f32) -> Self {
        let capacity = (max_delay * sample_rate).ceil() as usize;
        let mut node = Self {
            lines: [DelayLine::new(capacity), DelayLine::new(capacity)],
            sample_rate,
            max_delay,
            delay_time: 0.0,
            feedback: 0.0,
            wet,
        };
        node.set_delay_time(delay_time);
        node.set_feedback(feedback);
        node
    }

    /// Delay in seconds, clamped to the configured maximum.
    pub fn set_delay_time(&mut self, seconds: f32) {
        self.delay_time = seconds.clamp(0.0, self.max_delay);
    }

    /// Feedback gain. Kept below unity so the loop cannot run away.
    pub fn set_feedback(&mut self, feedback: f32) {
        self.feedback = feedback.clamp(0.0, 0.99);
    }

    pub fn set_wet(&mut self, wet: f32) {
        self.wet = wet.max(0.0);
    }

    pub fn delay_time(&self) -> f32 {
        self.delay_time
    }

    pub fn feedback(&self) -> f32 {
        self.feedback
    }

    pub fn wet(&self) -> f32 {
        self.wet
    }
}

impl AudioNode for FeedbackDelayNode {
    fn process(&mut self, input: &AudioBlock, output: &mut AudioBlock, _ctx: &ProcessContext) {
        let delay = self.delay_time * self.sample_rate;
        for (channel, line) in self.lines.iter_mut().enumerate() {
            for (out, &x) in output.channel_mut(channel).iter_mut().zip(input.channel(channel)) {
                let delayed = line.read(delay);
                line.push(x + self.feedback * delayed);
                *out = self.wet * delayed;
            }
        }
    }

    fn kind(&self) -> &'static str {
        "feedback-delay"
    }

    fn as_any_mut(&mut self) -> &mut dyn Any {
        self
    }
}

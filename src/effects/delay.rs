use super::{EffectParam, send_param};
use crate::nodes::FeedbackDelayNode;
use crate::playback::PlaybackCommand;
use crossbeam_channel::Sender;

pub const DEFAULT_DELAY_TIME: f32 = 0.3;
pub const DEFAULT_FEEDBACK: f32 = 0.5;
pub const DEFAULT_WET: f32 = 0.3;
pub const MAX_DELAY_TIME: f32 = 1.0;

pub(super) fn unit(sample_rate: f32) -> FeedbackDelayNode {
    FeedbackDelayNode::new(
        DEFAULT_DELAY_TIME,
        DEFAULT_FEEDBACK,
        DEFAULT_WET,
        MAX_DELAY_TIME,
        sample_rate,
    )
}

/// Controls the shared delay unit.
#[derive(Debug, Clone)]
pub struct DelayHandle {
    commands: Sender<PlaybackCommand>,
}

impl DelayHandle {
    pub(crate) fn new(commands: Sender<PlaybackCommand>) -> Self {
        Self { commands }
    }

    /// Delay time in seconds, at most one second.
    pub fn set_time(&self, seconds: f32) {
        send_param(&self.commands, EffectParam::DelayTime(seconds));
    }

    pub fn set_feedback(&self, feedback: f32) {
        send_param(&self.commands, EffectParam::DelayFeedback(feedback));
    }

    pub fn set_wet(&self, wet: f32) {
        send_param(&self.commands, EffectParam::DelayWet(wet));
    }
}

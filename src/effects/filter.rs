use super::{EffectParam, send_param};
use crate::nodes::{BiquadFilterNode, FilterType};
use crate::playback::PlaybackCommand;
use crossbeam_channel::Sender;

pub(super) fn unit(sample_rate: f32) -> BiquadFilterNode {
    BiquadFilterNode::new(FilterType::Lowpass, 20000.0, 1.0, 0.0, sample_rate)
}

/// Controls the shared biquad filter unit.
#[derive(Debug, Clone)]
pub struct FilterHandle {
    commands: Sender<PlaybackCommand>,
}

impl FilterHandle {
    pub(crate) fn new(commands: Sender<PlaybackCommand>) -> Self {
        Self { commands }
    }

    pub fn set_frequency(&self, frequency: f32) {
        send_param(&self.commands, EffectParam::FilterFrequency(frequency));
    }

    pub fn set_q(&self, q: f32) {
        send_param(&self.commands, EffectParam::FilterQ(q));
    }

    pub fn set_type(&self, filter_type: FilterType) {
        send_param(&self.commands, EffectParam::FilterType(filter_type));
    }

    /// Gain in dB for the shelf and peaking types.
    pub fn set_gain(&self, gain: f32) {
        send_param(&self.commands, EffectParam::FilterGain(gain));
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn setters_map_to_filter_params() {
        let (tx, rx) = crossbeam_channel::unbounded();
        let handle = FilterHandle::new(tx);
        handle.set_frequency(800.0);
        handle.set_type(FilterType::Notch);

        let params: Vec<EffectParam> = rx
            .try_iter()
            .filter_map(|command| match command {
                PlaybackCommand::Effect(param) => Some(param),
                _ => None,
            })
            .collect();
        assert_eq!(
            params,
            vec![
                EffectParam::FilterFrequency(800.0),
                EffectParam::FilterType(FilterType::Notch)
            ]
        );
    }
}

//! Shared effect units.
//!
//! Each unit is a single graph node built once by the renderer. Every chain
//! that requests a unit is routed through that same node, so a parameter change
//! is heard on all of them. The main thread adjusts units through typed
//! handles that send [`EffectParam`]s over the command channel.

mod chorus;
mod delay;
mod distortion;
mod filter;
mod reverb;

pub use chorus::ChorusHandle;
pub use delay::DelayHandle;
pub use distortion::DistortionHandle;
pub use filter::FilterHandle;
pub use reverb::{ReverbHandle, ReverbNode};

use crate::graph::{AudioGraph, NodeId};
use crate::nodes::{BiquadFilterNode, ChorusNode, FeedbackDelayNode, FilterType, WaveShaperNode};
use crate::playback::PlaybackCommand;
use crossbeam_channel::Sender;
use std::fmt;

/// The available shared effect units.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum EffectKind {
    Reverb,
    Delay,
    Filter,
    Distortion,
    Chorus,
}

impl EffectKind {
    pub const ALL: [EffectKind; 5] = [
        Self::Reverb,
        Self::Delay,
        Self::Filter,
        Self::Distortion,
        Self::Chorus,
    ];

    pub fn from_name(name: &str) -> Option<Self> {
        match name {
            "reverb" => Some(Self::Reverb),
            "delay" => Some(Self::Delay),
            "filter" => Some(Self::Filter),
            "distortion" => Some(Self::Distortion),
            "chorus" => Some(Self::Chorus),
            _ => None,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Reverb => "reverb",
            Self::Delay => "delay",
            Self::Filter => "filter",
            Self::Distortion => "distortion",
            Self::Chorus => "chorus",
        }
    }
}

impl fmt::Display for EffectKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A parameter change for one of the shared units.
#[derive(Debug, Clone, PartialEq)]
pub enum EffectParam {
    ReverbWet(f32),
    DelayTime(f32),
    DelayFeedback(f32),
    DelayWet(f32),
    FilterFrequency(f32),
    FilterQ(f32),
    FilterType(FilterType),
    FilterGain(f32),
    /// The curve is generated on the sending side
    DistortionCurve { amount: f32, curve: Vec<f32> },
    ChorusRate(f32),
    ChorusDepth(f32),
    ChorusWet(f32),
}

impl EffectParam {
    pub fn kind(&self) -> EffectKind {
        match self {
            Self::ReverbWet(_) => EffectKind::Reverb,
            Self::DelayTime(_) | Self::DelayFeedback(_) | Self::DelayWet(_) => EffectKind::Delay,
            Self::FilterFrequency(_)
            | Self::FilterQ(_)
            | Self::FilterType(_)
            | Self::FilterGain(_) => EffectKind::Filter,
            Self::DistortionCurve { .. } => EffectKind::Distortion,
            Self::ChorusRate(_) | Self::ChorusDepth(_) | Self::ChorusWet(_) => EffectKind::Chorus,
        }
    }
}

fn send_param(commands: &Sender<PlaybackCommand>, param: EffectParam) {
    if commands.send(PlaybackCommand::Effect(param)).is_err() {
        log::debug!("Renderer gone, effect change dropped");
    }
}

/// Render-side registry of the unit nodes.
pub(crate) struct EffectUnits {
    reverb: NodeId,
    delay: NodeId,
    filter: NodeId,
    distortion: NodeId,
    chorus: NodeId,
}

impl EffectUnits {
    /// Adds one node per unit to `graph`, with default parameters.
    pub(crate) fn build(graph: &mut AudioGraph, sample_rate: u32) -> Self {
        let block_size = graph.block_size();
        let sr = sample_rate as f32;
        Self {
            reverb: graph.add_node(reverb::unit(sample_rate, block_size)),
            delay: graph.add_node(delay::unit(sr)),
            filter: graph.add_node(filter::unit(sr)),
            distortion: graph.add_node(distortion::unit(sr)),
            chorus: graph.add_node(chorus::unit(sr)),
        }
    }

    pub(crate) fn node(&self, kind: EffectKind) -> NodeId {
        match kind {
            EffectKind::Reverb => self.reverb,
            EffectKind::Delay => self.delay,
            EffectKind::Filter => self.filter,
            EffectKind::Distortion => self.distortion,
            EffectKind::Chorus => self.chorus,
        }
    }

    pub(crate) fn apply(&self, graph: &mut AudioGraph, param: EffectParam) {
        let kind = param.kind();
        let applied = match param {
            EffectParam::ReverbWet(wet) => graph
                .node_mut::<ReverbNode>(self.reverb)
                .map(|unit| unit.set_wet(wet)),
            EffectParam::DelayTime(seconds) => graph
                .node_mut::<FeedbackDelayNode>(self.delay)
                .map(|unit| unit.set_delay_time(seconds)),
            EffectParam::DelayFeedback(feedback) => graph
                .node_mut::<FeedbackDelayNode>(self.delay)
                .map(|unit| unit.set_feedback(feedback)),
            EffectParam::DelayWet(wet) => graph
                .node_mut::<FeedbackDelayNode>(self.delay)
                .map(|unit| unit.set_wet(wet)),
            EffectParam::FilterFrequency(frequency) => graph
                .node_mut::<BiquadFilterNode>(self.filter)
                .map(|unit| unit.set_frequency(frequency)),
            EffectParam::FilterQ(q) => graph
                .node_mut::<BiquadFilterNode>(self.filter)
                .map(|unit| unit.set_q(q)),
            EffectParam::FilterType(filter_type) => graph
                .node_mut::<BiquadFilterNode>(self.filter)
                .map(|unit| unit.set_type(filter_type)),
            EffectParam::FilterGain(gain) => graph
                .node_mut::<BiquadFilterNode>(self.filter)
                .map(|unit| unit.set_gain(gain)),
            EffectParam::DistortionCurve { amount, curve } => {
                log::debug!("Distortion amount set to {}", amount);
                graph
                    .node_mut::<WaveShaperNode>(self.distortion)
                    .map(|unit| unit.set_curve(curve))
            }
            EffectParam::ChorusRate(rate) => graph
                .node_mut::<ChorusNode>(self.chorus)
                .map(|unit| unit.set_rate(rate)),
            EffectParam::ChorusDepth(depth) => graph
                .node_mut::<ChorusNode>(self.chorus)
                .map(|unit| unit.set_depth(depth)),
            EffectParam::ChorusWet(wet) => graph
                .node_mut::<ChorusNode>(self.chorus)
                .map(|unit| unit.set_wet(wet)),
        };
        if applied.is_none() {
            log::warn!("Effect unit '{}' missing from the graph", kind);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::nodes::distortion_curve;

    #[test]
    fn names_round_trip_for_every_kind() {
        for kind in EffectKind::ALL {
            assert_eq!(EffectKind::from_name(kind.as_str()), Some(kind));
        }
        assert_eq!(EffectKind::from_name("flanger"), None);
    }

    #[test]
    fn units_are_built_once_with_defaults() {
        let mut graph = AudioGraph::new(128);
        let units = EffectUnits::build(&mut graph, 8000);
        assert_eq!(graph.len(), 5);

        let delay = graph.node_mut::<FeedbackDelayNode>(units.node(EffectKind::Delay)).unwrap();
        assert_eq!(delay.delay_time(), 0.3);
        assert_eq!(delay.feedback(), 0.5);
        assert_eq!(delay.wet(), 0.3);

        let filter = graph.node_mut::<BiquadFilterNode>(units.node(EffectKind::Filter)).unwrap();
        assert_eq!(filter.filter_type(), FilterType::Lowpass);
        assert_eq!(filter.frequency(), 20000.0);

        let reverb = graph.node_mut::<ReverbNode>(units.node(EffectKind::Reverb)).unwrap();
        assert_eq!(reverb.wet(), 0.5);
    }

    #[test]
    fn parameters_reach_the_shared_node() {
        let mut graph = AudioGraph::new(128);
        let units = EffectUnits::build(&mut graph, 8000);

        units.apply(&mut graph, EffectParam::DelayTime(0.6));
        units.apply(&mut graph, EffectParam::FilterType(FilterType::Highpass));
        units.apply(&mut graph, EffectParam::ChorusDepth(2.0));
        units.apply(
            &mut graph,
            EffectParam::DistortionCurve {
                amount: 10.0,
                curve: distortion_curve(10.0),
            },
        );

        assert_eq!(
            graph.node_mut::<FeedbackDelayNode>(units.node(EffectKind::Delay)).unwrap().delay_time(),
            0.6
        );
        assert_eq!(
            graph.node_mut::<BiquadFilterNode>(units.node(EffectKind::Filter)).unwrap().filter_type(),
            FilterType::Highpass
        );
        let chorus = graph.node_mut::<ChorusNode>(units.node(EffectKind::Chorus)).unwrap();
        assert!((chorus.depth() - 0.008).abs() < 1e-7);
        let shaper = graph.node_mut::<WaveShaperNode>(units.node(EffectKind::Distortion)).unwrap();
        assert_eq!(shaper.curve(), distortion_curve(10.0).as_slice());
    }
}

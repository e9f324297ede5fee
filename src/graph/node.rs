use super::AudioBlock;
use std::any::Any;
use std::fmt;

/// Handle of a node inside an [`AudioGraph`](super::AudioGraph).
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct NodeId(pub(crate) u64);

impl fmt::Display for NodeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "NodeId({})", self.0)
    }
}

/// Timing of the block currently being rendered.
#[derive(Debug, Clone, Copy)]
pub struct ProcessContext {
    pub sample_rate: f32,
    /// Context time of the first frame of the block, in seconds
    pub block_start: f64,
    pub frames: usize,
}

impl ProcessContext {
    /// Context time of frame `frame` within the block.
    pub fn time_at(&self, frame: usize) -> f64 {
        self.block_start + frame as f64 / self.sample_rate as f64
    }

    pub fn block_end(&self) -> f64 {
        self.time_at(self.frames)
    }
}

/// A processing node in the audio graph.
///
/// `input` already holds the sum of every connected upstream node's output.
/// Implementations must overwrite the whole `output` block.
pub trait AudioNode {
    fn process(&mut self, input: &AudioBlock, output: &mut AudioBlock, ctx: &ProcessContext);

    /// Short human readable node kind, used in logs.
    fn kind(&self) -> &'static str;

    /// Sources return true once they will never produce sound again.
    fn is_finished(&self) -> bool {
        false
    }

    fn as_any_mut(&mut self) -> &mut dyn Any;
}

//! Block-based audio node graph.
//!
//! Nodes are connected output → input; a node's input is the sum of all of its
//! upstream outputs. The graph is kept acyclic: [`AudioGraph::connect`] rejects
//! any edge that would close a loop (feedback lives inside nodes such as the
//! delay unit instead). Each call to [`AudioGraph::render`] processes every node
//! once, in topological order.

mod block;
mod node;
mod param;

pub use block::AudioBlock;
pub use node::{AudioNode, NodeId, ProcessContext};
pub use param::AudioParam;

use crate::error::{Result, SonoraError};
use std::collections::{HashMap, HashSet, VecDeque};

struct NodeSlot {
    node: Box<dyn AudioNode>,
    inputs: Vec<NodeId>,
    output: AudioBlock,
}

pub struct AudioGraph {
    nodes: HashMap<NodeId, NodeSlot>,
    next_id: u64,
    order: Vec<NodeId>,
    order_dirty: bool,
    block_size: usize,
    scratch: AudioBlock,
}

impl AudioGraph {
    pub fn new(block_size: usize) -> Self {
        Self {
            nodes: HashMap::new(),
            next_id: 0,
            order: Vec::new(),
            order_dirty: false,
            block_size,
            scratch: AudioBlock::new(block_size),
        }
    }

    pub fn block_size(&self) -> usize {
        self.block_size
    }

    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    pub fn contains(&self, id: NodeId) -> bool {
        self.nodes.contains_key(&id)
    }

    pub fn add_node<N: AudioNode + 'static>(&mut self, node: N) -> NodeId {
        self.add_boxed(Box::new(node))
    }

    pub fn add_boxed(&mut self, node: Box<dyn AudioNode>) -> NodeId {
        let id = NodeId(self.next_id);
        self.next_id += 1;
        log::debug!("Graph: added {} node {}", node.kind(), id);
        self.nodes.insert(
            id,
            NodeSlot {
                node,
                inputs: Vec::new(),
                output: AudioBlock::new(self.block_size),
            },
        );
        self.order_dirty = true;
        id
    }

    /// Removes a node together with every edge touching it.
    pub fn remove_node(&mut self, id: NodeId) -> bool {
        if self.nodes.remove(&id).is_none() {
            return false;
        }
        for slot in self.nodes.values_mut() {
            slot.inputs.retain(|input| *input != id);
        }
        self.order_dirty = true;
        true
    }

    /// Connects `from`'s output to `to`'s input. Connecting twice is a no-op.
    pub fn connect(&mut self, from: NodeId, to: NodeId) -> Result<()> {
        if !self.nodes.contains_key(&from) || !self.nodes.contains_key(&to) {
            return Err(SonoraError::Graph(format!(
                "Cannot connect {} -> {}: node not found",
                from, to
            )));
        }
        if from == to || self.depends_on(from, to) {
            return Err(SonoraError::Graph(format!(
                "Connecting {} -> {} would create a cycle",
                from, to
            )));
        }

        let slot = self
            .nodes
            .get_mut(&to)
            .ok_or_else(|| SonoraError::Graph(format!("Node {} not found", to)))?;
        if !slot.inputs.contains(&from) {
            slot.inputs.push(from);
            self.order_dirty = true;
        }
        Ok(())
    }

    pub fn disconnect(&mut self, from: NodeId, to: NodeId) -> bool {
        let Some(slot) = self.nodes.get_mut(&to) else {
            return false;
        };
        let before = slot.inputs.len();
        slot.inputs.retain(|input| *input != from);
        let removed = slot.inputs.len() != before;
        if removed {
            self.order_dirty = true;
        }
        removed
    }

    pub fn is_connected(&self, from: NodeId, to: NodeId) -> bool {
        self.nodes
            .get(&to)
            .is_some_and(|slot| slot.inputs.contains(&from))
    }

    pub fn inputs(&self, id: NodeId) -> Option<&[NodeId]> {
        self.nodes.get(&id).map(|slot| slot.inputs.as_slice())
    }

    /// Typed mutable access to a node.
    pub fn node_mut<T: AudioNode + 'static>(&mut self, id: NodeId) -> Option<&mut T> {
        self.nodes
            .get_mut(&id)
            .and_then(|slot| slot.node.as_any_mut().downcast_mut::<T>())
    }

    pub fn is_finished(&self, id: NodeId) -> bool {
        self.nodes.get(&id).is_some_and(|slot| slot.node.is_finished())
    }

    /// Output of a node from the most recent render.
    pub fn output(&self, id: NodeId) -> Option<&AudioBlock> {
        self.nodes.get(&id).map(|slot| &slot.output)
    }

    /// Renders one block through every node.
    pub fn render(&mut self, ctx: &ProcessContext) {
        if self.order_dirty {
            self.order = self.topological_order();
            self.order_dirty = false;
        }

        for index in 0..self.order.len() {
            let id = self.order[index];

            self.scratch.clear();
            if let Some(slot) = self.nodes.get(&id) {
                for input in &slot.inputs {
                    if let Some(upstream) = self.nodes.get(input) {
                        self.scratch.mix_from(&upstream.output);
                    }
                }
            }

            if let Some(slot) = self.nodes.get_mut(&id) {
                slot.node.process(&self.scratch, &mut slot.output, ctx);
            }
        }
    }

    /// True when `node` is reachable by walking upstream from `start`.
    fn depends_on(&self, start: NodeId, node: NodeId) -> bool {
        let mut visited = HashSet::new();
        let mut stack = vec![start];
        while let Some(current) = stack.pop() {
            if current == node {
                return true;
            }
            if !visited.insert(current) {
                continue;
            }
            if let Some(slot) = self.nodes.get(&current) {
                stack.extend(slot.inputs.iter().copied());
            }
        }
        false
    }

    fn topological_order(&self) -> Vec<NodeId> {
        let mut ids: Vec<NodeId> = self.nodes.keys().copied().collect();
        ids.sort();

        let mut pending: HashMap<NodeId, usize> = HashMap::new();
        let mut dependents: HashMap<NodeId, Vec<NodeId>> = HashMap::new();
        for id in &ids {
            let inputs = &self.nodes[id].inputs;
            pending.insert(*id, inputs.len());
            for input in inputs {
                dependents.entry(*input).or_default().push(*id);
            }
        }

        let mut ready: VecDeque<NodeId> = ids.iter().copied().filter(|id| pending[id] == 0).collect();
        let mut order = Vec::with_capacity(ids.len());
        while let Some(id) = ready.pop_front() {
            order.push(id);
            if let Some(next) = dependents.get(&id) {
                for dependent in next {
                    if let Some(count) = pending.get_mut(dependent) {
                        *count -= 1;
                        if *count == 0 {
                            ready.push_back(*dependent);
                        }
                    }
                }
            }
        }

        if order.len() != ids.len() {
            log::error!(
                "Graph: {} nodes left out of the render order",
                ids.len() - order.len()
            );
        }
        order
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::any::Any;

    struct Constant(f32);

    impl AudioNode for Constant {
        fn process(&mut self, _input: &AudioBlock, output: &mut AudioBlock, _ctx: &ProcessContext) {
            output.channel_mut(0).fill(self.0);
            output.channel_mut(1).fill(self.0);
        }

        fn kind(&self) -> &'static str {
            "constant"
        }

        fn as_any_mut(&mut self) -> &mut dyn Any {
            self
        }
    }

    struct Passthrough;

    impl AudioNode for Passthrough {
        fn process(&mut self, input: &AudioBlock, output: &mut AudioBlock, _ctx: &ProcessContext) {
            output.copy_from(input);
        }

        fn kind(&self) -> &'static str {
            "passthrough"
        }

        fn as_any_mut(&mut self) -> &mut dyn Any {
            self
        }
    }

    fn ctx(frames: usize) -> ProcessContext {
        ProcessContext {
            sample_rate: 8000.0,
            block_start: 0.0,
            frames,
        }
    }

    #[test]
    fn inputs_are_summed() {
        let mut graph = AudioGraph::new(4);
        let a = graph.add_node(Constant(0.25));
        let b = graph.add_node(Constant(0.5));
        let sum = graph.add_node(Passthrough);
        graph.connect(a, sum).unwrap();
        graph.connect(b, sum).unwrap();
        // second connect is a no-op
        graph.connect(b, sum).unwrap();

        graph.render(&ctx(4));
        assert_eq!(graph.output(sum).unwrap().channel(0), &[0.75; 4]);
    }

    #[test]
    fn cycles_are_rejected() {
        let mut graph = AudioGraph::new(4);
        let a = graph.add_node(Passthrough);
        let b = graph.add_node(Passthrough);
        let c = graph.add_node(Passthrough);
        graph.connect(a, b).unwrap();
        graph.connect(b, c).unwrap();

        assert!(matches!(graph.connect(c, a), Err(SonoraError::Graph(_))));
        assert!(matches!(graph.connect(a, a), Err(SonoraError::Graph(_))));
        assert!(!graph.is_connected(c, a));
    }

    #[test]
    fn removing_a_node_drops_its_edges() {
        let mut graph = AudioGraph::new(4);
        let source = graph.add_node(Constant(1.0));
        let middle = graph.add_node(Passthrough);
        let sink = graph.add_node(Passthrough);
        graph.connect(source, middle).unwrap();
        graph.connect(middle, sink).unwrap();

        assert!(graph.remove_node(middle));
        assert!(!graph.remove_node(middle));
        assert_eq!(graph.inputs(sink).unwrap(), &[] as &[NodeId]);

        graph.render(&ctx(4));
        assert_eq!(graph.output(sink).unwrap().channel(0), &[0.0; 4]);
    }

    #[test]
    fn typed_access_downcasts() {
        let mut graph = AudioGraph::new(4);
        let id = graph.add_node(Constant(0.1));
        graph.node_mut::<Constant>(id).unwrap().0 = 0.9;
        assert!(graph.node_mut::<Passthrough>(id).is_none());

        graph.render(&ctx(4));
        assert_eq!(graph.output(id).unwrap().channel(1), &[0.9; 4]);
    }

    #[test]
    fn render_order_follows_edges_not_ids() {
        let mut graph = AudioGraph::new(2);
        let sink = graph.add_node(Passthrough);
        let source = graph.add_node(Constant(0.3));
        graph.connect(source, sink).unwrap();

        graph.render(&ctx(2));
        assert_eq!(graph.output(sink).unwrap().channel(0), &[0.3; 2]);
    }
}

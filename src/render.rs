//! Render side of the engine.
//!
//! The [`Renderer`] owns the audio graph. It is driven either by the device
//! render thread or, for the offline backend, by the engine itself. All state
//! changes arrive as [`PlaybackCommand`]s at the start of a block and
//! completions leave as [`SonoraEvent`]s.

use crate::config::{FilterConfig, SonoraEngineDesc};
use crate::effects::{EffectKind, EffectUnits, ReverbNode};
use crate::error::Result;
use crate::events::SonoraEvent;
use crate::graph::{AudioBlock, AudioGraph, NodeId, ProcessContext};
use crate::math::{Pose, Vec3};
use crate::nodes::{
    Analyser, AnalyserNode, AnalyserSettings, BiquadFilterNode, BufferSourceNode,
    CompressorSettings, DistanceModel, DynamicsCompressorNode, GainNode, PannerNode, PanningModel,
};
use crate::playback::{PlayRequest, PlaybackCommand, PlaybackId};
use crate::spatial::{HrtfContext, default_listener};
use crossbeam_channel::{Receiver, Sender};
use std::collections::HashMap;
use std::rc::Rc;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};

/// Level a fade-out ramps to before the source is stopped.
pub const FADE_FLOOR: f32 = 0.001;

const MASTER_DRY: f32 = 0.7;
const MASTER_WET: f32 = 0.3;

/// State shared between the renderer and the main thread.
#[derive(Debug)]
pub(crate) struct RenderState {
    sample_rate: u32,
    frames: AtomicU64,
    suspended: AtomicBool,
}

impl RenderState {
    pub(crate) fn new(sample_rate: u32) -> Self {
        Self {
            sample_rate,
            frames: AtomicU64::new(0),
            suspended: AtomicBool::new(false),
        }
    }

    /// Context time in seconds: frames rendered while not suspended.
    pub(crate) fn current_time(&self) -> f64 {
        self.frames.load(Ordering::Acquire) as f64 / self.sample_rate as f64
    }

    pub(crate) fn is_suspended(&self) -> bool {
        self.suspended.load(Ordering::Relaxed)
    }

    pub(crate) fn set_suspended(&self, suspended: bool) {
        self.suspended.store(suspended, Ordering::Relaxed);
    }

    fn advance(&self, frames: usize) {
        self.frames.fetch_add(frames as u64, Ordering::AcqRel);
    }
}

/// Nodes of one playback's processing chain.
#[derive(Debug)]
struct ProcessingChain {
    /// The buffer source
    input: NodeId,
    gain: NodeId,
    /// Shared units this chain was routed through, in order
    effects: Vec<(EffectKind, NodeId)>,
    filter: Option<NodeId>,
    panner: Option<NodeId>,
    /// Last node before the master gain
    output: NodeId,
    /// Edges leaving a shared unit that this chain holds a reference on
    shared_links: Vec<(NodeId, NodeId)>,
}

impl ProcessingChain {
    /// Nodes owned by this chain alone.
    fn private_nodes(&self) -> impl Iterator<Item = NodeId> + '_ {
        [Some(self.input), Some(self.gain), self.filter, self.panner]
            .into_iter()
            .flatten()
    }
}

pub(crate) struct Renderer {
    graph: AudioGraph,
    sample_rate: u32,
    master_gain: NodeId,
    destination: NodeId,
    effects: EffectUnits,
    chains: HashMap<PlaybackId, ProcessingChain>,
    /// Live chains using each unit-to-unit or unit-to-master edge
    link_refs: HashMap<(NodeId, NodeId), usize>,
    commands: Receiver<PlaybackCommand>,
    events: Sender<SonoraEvent>,
    state: Arc<RenderState>,
    listener: Pose,
    distance_model: DistanceModel,
    panning_model: PanningModel,
    hrtf: Option<Rc<HrtfContext>>,
}

impl Renderer {
    /// Builds the master path and the shared effect units.
    ///
    /// Returns the renderer and the reader side of the master analyser.
    pub(crate) fn new(
        desc: &SonoraEngineDesc,
        commands: Receiver<PlaybackCommand>,
        events: Sender<SonoraEvent>,
        state: Arc<RenderState>,
    ) -> Result<(Self, Analyser)> {
        desc.validate()?;
        let sample_rate = desc.sample_rate;
        let sr = sample_rate as f32;
        let mut graph = AudioGraph::new(desc.block_size);

        let master_gain = graph.add_node(GainNode::new(desc.initial_volume.clamp(0.0, 1.0)));
        let dry = graph.add_node(GainNode::new(MASTER_DRY));
        let reverb = graph.add_node(ReverbNode::new(
            sample_rate,
            desc.block_size,
            ReverbNode::DEFAULT_WET,
        ));
        let wet = graph.add_node(GainNode::new(MASTER_WET));
        let compressor = graph.add_node(DynamicsCompressorNode::new(
            CompressorSettings::default(),
            sr,
        ));
        let (analyser_node, analyser) = AnalyserNode::new(AnalyserSettings::default());
        let destination = graph.add_node(analyser_node);

        graph.connect(master_gain, dry)?;
        graph.connect(master_gain, reverb)?;
        graph.connect(reverb, wet)?;
        graph.connect(dry, compressor)?;
        graph.connect(wet, compressor)?;
        graph.connect(compressor, destination)?;

        let effects = EffectUnits::build(&mut graph, sample_rate);

        let hrtf = if desc.enable_spatialization && desc.panning_model == PanningModel::Hrtf {
            match HrtfContext::new(sample_rate, desc.block_size, desc.hrtf_path.as_deref()) {
                Ok(context) => Some(Rc::new(context)),
                Err(e) => {
                    log::warn!("HRTF unavailable, spatial sources use equal-power panning: {}", e);
                    None
                }
            }
        } else {
            None
        };

        log::info!(
            "Renderer ready: {} Hz, {} frame blocks, {} graph nodes",
            sample_rate,
            desc.block_size,
            graph.len()
        );

        Ok((
            Self {
                graph,
                sample_rate,
                master_gain,
                destination,
                effects,
                chains: HashMap::new(),
                link_refs: HashMap::new(),
                commands,
                events,
                state,
                listener: default_listener(),
                distance_model: DistanceModel::default(),
                panning_model: desc.panning_model,
                hrtf,
            },
            analyser,
        ))
    }

    pub(crate) fn block_size(&self) -> usize {
        self.graph.block_size()
    }

    pub(crate) fn chain_count(&self) -> usize {
        self.chains.len()
    }

    /// Renders one block into `out`.
    ///
    /// While suspended the block is silent and context time stands still.
    pub(crate) fn render_block(&mut self, out: &mut AudioBlock) {
        self.drain_commands();

        if self.state.is_suspended() {
            out.clear();
            return;
        }

        let frames = self.graph.block_size();
        let ctx = ProcessContext {
            sample_rate: self.sample_rate as f32,
            block_start: self.state.current_time(),
            frames,
        };
        self.graph.render(&ctx);
        match self.graph.output(self.destination) {
            Some(block) => out.copy_from(block),
            None => out.clear(),
        }
        self.state.advance(frames);

        self.collect_finished();
    }

    fn drain_commands(&mut self) {
        while let Ok(command) = self.commands.try_recv() {
            self.handle_command(command);
        }
    }

    fn handle_command(&mut self, command: PlaybackCommand) {
        match command {
            PlaybackCommand::Play(request) => self.start(*request),
            PlaybackCommand::Stop { id, after } => {
                let now = self.state.current_time();
                match self.chains.get(&id) {
                    Some(chain) => {
                        if let Some(source) = self.graph.node_mut::<BufferSourceNode>(chain.input) {
                            source.stop_at(now + after);
                        }
                    }
                    None => log::debug!("Stop for unknown {} ignored", id),
                }
            }
            PlaybackCommand::FadeOut { id, duration } => {
                let now = self.state.current_time();
                let end = now + duration;
                let Some(chain) = self.chains.get(&id) else {
                    log::debug!("Fade-out for unknown {} ignored", id);
                    return;
                };
                if let Some(gain) = self.graph.node_mut::<GainNode>(chain.gain) {
                    gain.param_mut().linear_ramp_to_value_at_time(FADE_FLOOR, now, end);
                }
                if let Some(source) = self.graph.node_mut::<BufferSourceNode>(chain.input) {
                    source.stop_at(end);
                }
            }
            PlaybackCommand::StopAll => {
                let ids: Vec<PlaybackId> = self.chains.keys().copied().collect();
                for id in ids {
                    self.remove_chain(id);
                }
                log::debug!("All chains stopped");
            }
            PlaybackCommand::SetPosition { id, position } => {
                let panner = self.chains.get(&id).and_then(|chain| chain.panner);
                if let Some(panner) = panner.and_then(|id| self.graph.node_mut::<PannerNode>(id)) {
                    panner.set_position(position);
                }
            }
            PlaybackCommand::SetMasterVolume(volume) => {
                if let Some(master) = self.graph.node_mut::<GainNode>(self.master_gain) {
                    master.set_gain(volume.clamp(0.0, 1.0));
                }
            }
            PlaybackCommand::Effect(param) => self.effects.apply(&mut self.graph, param),
        }
    }

    fn start(&mut self, request: PlayRequest) {
        let id = request.id;
        match self.build_chain(request) {
            Ok(chain) => {
                log::debug!(
                    "Started {} through {} effect unit(s), spatial: {}",
                    id,
                    chain.effects.len(),
                    chain.panner.is_some()
                );
                self.chains.insert(id, chain);
            }
            Err(e) => {
                log::error!("Failed to build chain for {}: {}", id, e);
                let _ = self.events.send(SonoraEvent::PlaybackEnded { id });
            }
        }
    }

    fn build_chain(&mut self, request: PlayRequest) -> Result<ProcessingChain> {
        let sr = self.sample_rate as f32;
        let input = self.graph.add_node(BufferSourceNode::new(
            request.buffer,
            sr,
            request.playback_rate,
            request.looping,
            request.when,
            request.offset,
        ));
        let gain = self.graph.add_node(GainNode::new(request.volume.clamp(0.0, 1.0)));
        let mut chain = ProcessingChain {
            input,
            gain,
            effects: Vec::new(),
            filter: None,
            panner: None,
            output: gain,
            shared_links: Vec::new(),
        };
        if let Err(e) = self.graph.connect(input, gain) {
            self.discard(&chain);
            return Err(e);
        }

        for kind in request.effects {
            let unit = self.effects.node(kind);
            match self.connect_from(&mut chain, unit) {
                Ok(()) => {
                    chain.effects.push((kind, unit));
                    chain.output = unit;
                }
                Err(e) => log::warn!("Skipping effect '{}' for {}: {}", kind, request.id, e),
            }
        }

        if let Some(config) = request.filter {
            let filter = self.graph.add_node(filter_node(&config, sr));
            chain.filter = Some(filter);
            self.extend(&mut chain, filter)?;
        }

        if let Some(position) = request.spatial {
            let node = self.panner_at(position);
            let panner = self.graph.add_node(node);
            chain.panner = Some(panner);
            self.extend(&mut chain, panner)?;
        }

        let master_gain = self.master_gain;
        if let Err(e) = self.connect_from(&mut chain, master_gain) {
            self.discard(&chain);
            return Err(e);
        }
        Ok(chain)
    }

    /// Connects the end of `chain` to `to`, counting the edge when it leaves
    /// a shared unit.
    fn connect_from(&mut self, chain: &mut ProcessingChain, to: NodeId) -> Result<()> {
        self.graph.connect(chain.output, to)?;
        if chain.effects.last().is_some_and(|(_, unit)| *unit == chain.output) {
            let link = (chain.output, to);
            *self.link_refs.entry(link).or_insert(0) += 1;
            chain.shared_links.push(link);
        }
        Ok(())
    }

    /// Appends a private node to the end of `chain`.
    fn extend(&mut self, chain: &mut ProcessingChain, node: NodeId) -> Result<()> {
        if let Err(e) = self.connect_from(chain, node) {
            self.discard(chain);
            return Err(e);
        }
        chain.output = node;
        Ok(())
    }

    fn panner_at(&self, position: Vec3) -> PannerNode {
        match (&self.hrtf, self.panning_model) {
            (Some(hrtf), PanningModel::Hrtf) => {
                PannerNode::hrtf(position, self.listener, self.distance_model, Rc::clone(hrtf))
            }
            _ => PannerNode::equal_power(position, self.listener, self.distance_model),
        }
    }

    fn discard(&mut self, chain: &ProcessingChain) {
        for node in chain.private_nodes() {
            self.graph.remove_node(node);
        }
        for link in &chain.shared_links {
            let Some(count) = self.link_refs.get_mut(link) else {
                continue;
            };
            *count -= 1;
            if *count == 0 {
                self.link_refs.remove(link);
                self.graph.disconnect(link.0, link.1);
            }
        }
    }

    fn remove_chain(&mut self, id: PlaybackId) -> bool {
        let Some(chain) = self.chains.remove(&id) else {
            return false;
        };
        self.discard(&chain);
        true
    }

    fn collect_finished(&mut self) {
        let finished: Vec<PlaybackId> = self
            .chains
            .iter()
            .filter(|(_, chain)| self.graph.is_finished(chain.input))
            .map(|(id, _)| *id)
            .collect();

        for id in finished {
            if self.remove_chain(id) {
                log::debug!("Playback {} ended", id);
                if self.events.send(SonoraEvent::PlaybackEnded { id }).is_err() {
                    log::debug!("Event receiver gone, completion of {} dropped", id);
                }
            }
        }
    }

    #[cfg(test)]
    fn graph_len(&self) -> usize {
        self.graph.len()
    }

    #[cfg(test)]
    fn chain_effects(&self, id: PlaybackId) -> Option<Vec<EffectKind>> {
        self.chains
            .get(&id)
            .map(|chain| chain.effects.iter().map(|(kind, _)| *kind).collect())
    }
}

fn filter_node(config: &FilterConfig, sample_rate: f32) -> BiquadFilterNode {
    BiquadFilterNode::new(
        config.filter_type,
        config.frequency,
        config.q,
        config.gain,
        sample_rate,
    )
}

use crate::audio_data::{AudioDataLoader, DefaultAudioLoader, LoadOptions, SonoraAudioData};
use crate::capability::{Capabilities, EngineMode};
use crate::catalog::{SoundCategory, SoundSpec};
use crate::config::{AudioBackend, PlayOptions, SonoraEngineDesc};
use crate::effects::{ChorusHandle, DelayHandle, DistortionHandle, FilterHandle, ReverbHandle};
use crate::error::{Result, SonoraError};
use crate::events::SonoraEvent;
use crate::fallback::FallbackPlayer;
use crate::graph::AudioBlock;
use crate::math::Vec3;
use crate::nodes::Analyser;
use crate::output::DeviceOutput;
use crate::playback::{PlayRequest, PlaybackCommand, PlaybackHandle, PlaybackId};
use crate::render::{RenderState, Renderer};
use crate::spatial::screen_to_world;
use crate::synth;
use crossbeam_channel::{Receiver, Sender, unbounded};
use std::collections::{HashMap, VecDeque};
use std::panic::{self, AssertUnwindSafe};
use std::sync::Arc;
use std::thread;

/// Level `toggle_mute` restores.
pub const UNMUTED_VOLUME: f32 = 0.5;

/// Sample rate used when degraded mode has neither a device nor a valid descriptor rate.
const FALLBACK_SAMPLE_RATE: u32 = 48000;
const VALID_SAMPLE_RATES: std::ops::RangeInclusive<u32> = 3000..=768_000;

/// A named sound in the registry.
#[derive(Debug, Clone)]
pub struct SoundAsset {
    pub name: String,
    /// Decoded samples at the engine's sample rate
    pub buffer: SonoraAudioData,
    pub category: SoundCategory,
    pub looping: bool,
    /// True when the sound was generated because loading failed
    pub synthetic: bool,
}

/// Outcome of one catalog load, produced on a worker thread.
struct LoadResult {
    spec: SoundSpec,
    buffer: SonoraAudioData,
    /// Why loading failed; the buffer is then synthesized
    failure: Option<String>,
}

enum Backend {
    Device(DeviceOutput),
    Offline {
        renderer: Box<Renderer>,
        /// Rendered samples not yet handed out by `render_offline`
        pending: Vec<f32>,
    },
}

/// The processing context: renderer connection plus its output backend.
struct AudioContext {
    commands: Sender<PlaybackCommand>,
    events: Receiver<SonoraEvent>,
    state: Arc<RenderState>,
    analyser: Analyser,
    backend: Backend,
}

impl AudioContext {
    fn start(desc: &SonoraEngineDesc) -> Result<Self> {
        let (commands, command_receiver) = unbounded();
        let (event_sender, events) = unbounded();
        let state = Arc::new(RenderState::new(desc.sample_rate));

        let (backend, analyser) = match desc.backend {
            AudioBackend::Device => {
                let (output, analyser) = DeviceOutput::start(
                    desc,
                    command_receiver,
                    event_sender,
                    Arc::clone(&state),
                )?;
                (Backend::Device(output), analyser)
            }
            AudioBackend::Offline => {
                let (renderer, analyser) =
                    Renderer::new(desc, command_receiver, event_sender, Arc::clone(&state))?;
                (
                    Backend::Offline {
                        renderer: Box::new(renderer),
                        pending: Vec::new(),
                    },
                    analyser,
                )
            }
            AudioBackend::Disabled => {
                return Err(SonoraError::Engine(
                    "Audio processing is disabled".to_string(),
                ));
            }
        };

        Ok(Self {
            commands,
            events,
            state,
            analyser,
            backend,
        })
    }

    fn send(&self, command: PlaybackCommand) -> bool {
        self.commands.send(command).is_ok()
    }
}

/// Main engine object behind a site's interactive sounds.
///
/// `SonoraEngine` runs on the main thread. It owns the sound registry and the
/// registries of active and spatial playbacks, and talks to the renderer only
/// through commands and events.
///
/// # Architecture
///
/// - **Main thread**: owns the engine, resolves catalog loads, starts and stops sounds
/// - **Loader threads**: one per catalog entry, fetch and decode or synthesize
/// - **Render thread**: owns the audio graph and feeds the output device
///
/// Call [`poll_events`](Self::poll_events) regularly (e.g. once per frame);
/// it moves finished loads into the registry and retires ended playbacks.
pub struct SonoraEngine {
    desc: SonoraEngineDesc,
    capabilities: Capabilities,
    context: Option<AudioContext>,
    fallback: Option<FallbackPlayer>,
    sample_rate: u32,
    sounds: HashMap<String, SoundAsset>,
    active: HashMap<PlaybackId, PlaybackHandle>,
    spatial: HashMap<PlaybackId, PlaybackHandle>,
    volume: f32,
    viewport: (f32, f32),
    loader: Arc<dyn AudioDataLoader>,
    load_sender: Sender<LoadResult>,
    load_receiver: Receiver<LoadResult>,
    pending_loads: usize,
    catalog_size: usize,
    loaded: usize,
    synthesized: usize,
    events: VecDeque<SonoraEvent>,
}

impl SonoraEngine {
    /// Creates the engine and starts loading the catalog with the default loader.
    ///
    /// Never fails: when the processing context cannot be created the engine
    /// starts in [`EngineMode::Degraded`].
    pub fn new(desc: SonoraEngineDesc) -> Self {
        Self::with_loader(desc, Arc::new(DefaultAudioLoader::new()))
    }

    pub fn with_loader(desc: SonoraEngineDesc, loader: Arc<dyn AudioDataLoader>) -> Self {
        let requested = Capabilities::requested(&desc);
        let mut events = VecDeque::new();

        let context = if requested.is_degraded() {
            None
        } else {
            match AudioContext::start(&desc) {
                Ok(context) => Some(context),
                Err(e) => {
                    log::warn!("Audio context unavailable, running degraded: {}", e);
                    events.push_back(SonoraEvent::EngineError {
                        error: e.to_string(),
                    });
                    None
                }
            }
        };

        let (capabilities, fallback, sample_rate) = match &context {
            Some(_) => (requested, None, desc.sample_rate),
            None => {
                let rate = if VALID_SAMPLE_RATES.contains(&desc.sample_rate) {
                    desc.sample_rate
                } else {
                    FALLBACK_SAMPLE_RATE
                };
                let fallback = if desc.backend == AudioBackend::Device {
                    FallbackPlayer::with_device(rate)
                } else {
                    FallbackPlayer::detached(rate)
                };
                let rate = fallback.sample_rate();
                (Capabilities::degraded(), Some(fallback), rate)
            }
        };

        log::info!(
            "Sonora engine started in {} mode ({} Hz, spatial: {})",
            capabilities.mode,
            sample_rate,
            capabilities.spatial
        );
        events.push_back(SonoraEvent::EngineStarted {
            mode: capabilities.mode,
        });

        let (load_sender, load_receiver) = unbounded();
        let mut engine = Self {
            volume: desc.initial_volume.clamp(0.0, 1.0),
            viewport: desc.viewport,
            desc,
            capabilities,
            context,
            fallback,
            sample_rate,
            sounds: HashMap::new(),
            active: HashMap::new(),
            spatial: HashMap::new(),
            loader,
            load_sender,
            load_receiver,
            pending_loads: 0,
            catalog_size: 0,
            loaded: 0,
            synthesized: 0,
            events,
        };

        let catalog = engine.desc.catalog.clone();
        engine.catalog_size = catalog.len();
        for spec in catalog {
            engine.spawn_load(spec);
        }
        engine
    }

    fn spawn_load(&mut self, spec: SoundSpec) {
        let loader = Arc::clone(&self.loader);
        let sender = self.load_sender.clone();
        let sample_rate = self.sample_rate;
        let worker_spec = spec.clone();

        self.pending_loads += 1;
        let spawned = thread::Builder::new()
            .name(format!("sonora-load-{}", spec.name))
            .spawn(move || {
                let result = load_sound(loader.as_ref(), worker_spec, sample_rate);
                let _ = sender.send(result);
            });

        if let Err(e) = spawned {
            log::error!("Failed to spawn loader for '{}': {}", spec.name, e);
            self.pending_loads -= 1;
            let buffer = synth::synthesize(spec.category, sample_rate);
            self.resolve(LoadResult {
                spec,
                buffer,
                failure: Some(e.to_string()),
            });
        }
    }

    fn resolve(&mut self, result: LoadResult) {
        let LoadResult {
            spec,
            buffer,
            failure,
        } = result;

        let synthetic = failure.is_some();
        match failure {
            Some(reason) => {
                log::warn!(
                    "Sound '{}' unavailable, synthesized {} fallback: {}",
                    spec.name,
                    spec.category,
                    reason
                );
                self.synthesized += 1;
                self.events.push_back(SonoraEvent::SoundSynthesized {
                    name: spec.name.clone(),
                    category: spec.category,
                    reason,
                });
            }
            None => {
                log::debug!("Sound '{}' loaded ({:?})", spec.name, buffer.duration());
                self.loaded += 1;
                self.events.push_back(SonoraEvent::SoundLoaded {
                    name: spec.name.clone(),
                    duration: buffer.duration(),
                });
            }
        }

        self.sounds.insert(
            spec.name.clone(),
            SoundAsset {
                name: spec.name,
                buffer,
                category: spec.category,
                looping: spec.looping,
                synthetic,
            },
        );

        if self.loaded + self.synthesized == self.catalog_size {
            log::info!(
                "Catalog ready: {} loaded, {} synthesized",
                self.loaded,
                self.synthesized
            );
            self.events.push_back(SonoraEvent::CatalogReady {
                loaded: self.loaded,
                synthesized: self.synthesized,
            });
        }
    }

    /// Processes finished loads and renderer events, returning everything
    /// that happened since the last call.
    pub fn poll_events(&mut self) -> Vec<SonoraEvent> {
        while let Ok(result) = self.load_receiver.try_recv() {
            self.pending_loads = self.pending_loads.saturating_sub(1);
            self.resolve(result);
        }

        if let Some(context) = &self.context {
            let ended: Vec<SonoraEvent> = context.events.try_iter().collect();
            for event in ended {
                if let Some(id) = event.playback_id() {
                    // stop_all already cleared the registries
                    if self.active.remove(&id).is_none() {
                        continue;
                    }
                    self.spatial.remove(&id);
                }
                self.events.push_back(event);
            }
        }

        self.events.drain(..).collect()
    }

    /// Blocks until every catalog entry has been loaded or synthesized.
    pub fn finish_loading(&mut self) {
        while self.pending_loads > 0 {
            match self.load_receiver.recv() {
                Ok(result) => {
                    self.pending_loads -= 1;
                    self.resolve(result);
                }
                Err(_) => break,
            }
        }
    }

    pub fn pending_loads(&self) -> usize {
        self.pending_loads
    }

    /// Plays a sound from the registry.
    ///
    /// Returns `None` for unknown names and in degraded mode, where the sound
    /// goes through the fallback player instead.
    pub fn play(&mut self, name: &str, options: PlayOptions) -> Option<PlaybackHandle> {
        self.start_playback(name, &options, None)
    }

    /// Plays a sound positioned under the pointer at screen `(x, y)`.
    ///
    /// Identical to [`play`](Self::play) when spatial audio is unavailable.
    pub fn play_spatial(
        &mut self,
        name: &str,
        x: f32,
        y: f32,
        options: PlayOptions,
    ) -> Option<PlaybackHandle> {
        if !self.capabilities.spatial {
            return self.play(name, options);
        }
        let position = screen_to_world(x, y, self.viewport);
        self.start_playback(name, &options, Some(position))
    }

    fn start_playback(
        &mut self,
        name: &str,
        options: &PlayOptions,
        spatial: Option<Vec3>,
    ) -> Option<PlaybackHandle> {
        let Some(asset) = self.sounds.get(name) else {
            log::warn!("Sound '{}' not found", name);
            return None;
        };

        let Some(context) = &self.context else {
            if let Some(fallback) = &self.fallback {
                let volume = options.effective_volume() * self.volume;
                fallback.play(asset.buffer.clone(), volume, asset.looping);
            }
            return None;
        };

        let id = PlaybackId::new();
        let request = PlayRequest {
            id,
            buffer: asset.buffer.clone(),
            looping: asset.looping,
            volume: options.effective_volume(),
            playback_rate: options.playback_rate.unwrap_or(1.0),
            when: options.when.unwrap_or_else(|| context.state.current_time()),
            offset: options.offset.unwrap_or(0.0),
            effects: options.effects.clone(),
            filter: options.filter,
            spatial,
        };

        if !context.send(PlaybackCommand::Play(Box::new(request))) {
            log::error!("Renderer unavailable, '{}' not played", name);
            return None;
        }

        let handle = PlaybackHandle::new(id, name, spatial.is_some(), context.commands.clone());
        log::debug!("Playing '{}' as {}", name, id);
        self.active.insert(id, handle.clone());
        if spatial.is_some() {
            self.spatial.insert(id, handle.clone());
        }
        Some(handle)
    }

    /// Plays a sound directly at master volume. Only acts in degraded mode.
    pub fn play_fallback(&mut self, name: &str) {
        let Some(fallback) = &self.fallback else {
            log::debug!("Fallback playback ignored in full mode");
            return;
        };
        match self.sounds.get(name) {
            Some(asset) => {
                fallback.play(asset.buffer.clone(), self.volume, asset.looping);
            }
            None => log::warn!("Sound '{}' not found", name),
        }
    }

    /// Stops every playing sound and clears the registries.
    pub fn stop_all(&mut self) {
        if let Some(context) = &self.context {
            context.send(PlaybackCommand::StopAll);
        }
        if let Some(fallback) = &self.fallback {
            fallback.stop_all();
        }
        log::debug!(
            "Stopping {} active ({} spatial) playback(s)",
            self.active.len(),
            self.spatial.len()
        );
        self.active.clear();
        self.spatial.clear();
    }

    /// Sets the master volume, clamped to [0, 1].
    pub fn set_volume(&mut self, volume: f32) {
        self.volume = volume.clamp(0.0, 1.0);
        if let Some(context) = &self.context {
            context.send(PlaybackCommand::SetMasterVolume(self.volume));
        }
    }

    pub fn volume(&self) -> f32 {
        self.volume
    }

    /// Mutes when audible, otherwise restores [`UNMUTED_VOLUME`].
    ///
    /// Returns whether the engine is audible afterwards.
    pub fn toggle_mute(&mut self) -> bool {
        if self.volume > 0.0 {
            self.set_volume(0.0);
        } else {
            self.set_volume(UNMUTED_VOLUME);
        }
        self.volume > 0.0
    }

    /// Byte frequency spectrum of the master output, one value per bin.
    pub fn audio_data(&mut self) -> Option<Vec<u8>> {
        self.context
            .as_mut()
            .map(|context| context.analyser.byte_frequency_data())
    }

    /// Byte waveform of the most recent master output window.
    pub fn waveform_data(&self) -> Option<Vec<u8>> {
        self.context
            .as_ref()
            .map(|context| context.analyser.byte_time_domain_data())
    }

    /// Moves every spatial playback to the pointer at screen `(x, y)`.
    pub fn update_pointer(&mut self, x: f32, y: f32) {
        if !self.capabilities.spatial || self.spatial.is_empty() {
            return;
        }
        let position = screen_to_world(x, y, self.viewport);
        for handle in self.spatial.values() {
            handle.set_position(position);
        }
    }

    pub fn set_viewport(&mut self, width: f32, height: f32) {
        self.viewport = (width, height);
    }

    /// Silences output and freezes context time, e.g. while the page is hidden.
    pub fn suspend(&mut self) {
        let Some(context) = &self.context else {
            return;
        };
        if !context.state.is_suspended() {
            context.state.set_suspended(true);
            log::info!("Audio suspended");
            self.events.push_back(SonoraEvent::EngineSuspended);
        }
    }

    pub fn resume(&mut self) {
        let Some(context) = &self.context else {
            return;
        };
        if context.state.is_suspended() {
            context.state.set_suspended(false);
            log::info!("Audio resumed");
            self.events.push_back(SonoraEvent::EngineResumed);
        }
    }

    pub fn is_suspended(&self) -> bool {
        self.context
            .as_ref()
            .is_some_and(|context| context.state.is_suspended())
    }

    /// Renders `frames` frames, interleaved over the configured channel count.
    ///
    /// Only produces audio for the offline backend (or a degraded engine
    /// without an output device); otherwise returns silence.
    pub fn render_offline(&mut self, frames: usize) -> Vec<f32> {
        let channels = self.desc.channels.max(1) as usize;
        let needed = frames * channels;

        match &mut self.context {
            Some(AudioContext {
                backend: Backend::Offline { renderer, pending },
                ..
            }) => {
                let block_size = renderer.block_size();
                let mut block = AudioBlock::new(block_size);
                let mut interleaved = vec![0.0; block_size * channels];
                while pending.len() < needed {
                    renderer.render_block(&mut block);
                    block.write_interleaved(&mut interleaved, channels);
                    pending.extend_from_slice(&interleaved);
                }
                pending.drain(..needed).collect()
            }
            Some(_) => {
                log::warn!("render_offline called with a device backend");
                vec![0.0; needed]
            }
            None => match &self.fallback {
                Some(fallback) => fallback.render(frames, channels),
                None => vec![0.0; needed],
            },
        }
    }

    /// Context time in seconds.
    pub fn current_time(&self) -> f64 {
        self.context
            .as_ref()
            .map_or(0.0, |context| context.state.current_time())
    }

    /// Frames the output device has consumed, for the device backend.
    pub fn frames_played(&self) -> Option<u64> {
        match &self.context {
            Some(AudioContext {
                backend: Backend::Device(output),
                ..
            }) => Some(output.frames_played()),
            _ => None,
        }
    }

    pub fn reverb(&self) -> Option<ReverbHandle> {
        self.commands().map(ReverbHandle::new)
    }

    pub fn delay(&self) -> Option<DelayHandle> {
        self.commands().map(DelayHandle::new)
    }

    pub fn filter(&self) -> Option<FilterHandle> {
        self.commands().map(FilterHandle::new)
    }

    pub fn distortion(&self) -> Option<DistortionHandle> {
        self.commands().map(DistortionHandle::new)
    }

    pub fn chorus(&self) -> Option<ChorusHandle> {
        self.commands().map(ChorusHandle::new)
    }

    fn commands(&self) -> Option<Sender<PlaybackCommand>> {
        self.context.as_ref().map(|context| context.commands.clone())
    }

    pub fn capabilities(&self) -> Capabilities {
        self.capabilities
    }

    pub fn mode(&self) -> EngineMode {
        self.capabilities.mode
    }

    pub fn is_spatial_enabled(&self) -> bool {
        self.capabilities.spatial
    }

    /// Sample rate every registered sound is stored at.
    pub fn sample_rate(&self) -> u32 {
        self.sample_rate
    }

    pub fn active_count(&self) -> usize {
        self.active.len()
    }

    pub fn spatial_count(&self) -> usize {
        self.spatial.len()
    }

    /// Whether a degraded engine reaches an output device directly.
    pub fn has_fallback_output(&self) -> bool {
        self.fallback.as_ref().is_some_and(FallbackPlayer::has_device)
    }

    pub fn contains_sound(&self, name: &str) -> bool {
        self.sounds.contains_key(name)
    }

    /// Registered sound names, sorted.
    pub fn sound_names(&self) -> Vec<String> {
        let mut names: Vec<String> = self.sounds.keys().cloned().collect();
        names.sort();
        names
    }

    pub fn sound(&self, name: &str) -> Option<&SoundAsset> {
        self.sounds.get(name)
    }
}

/// Loads one catalog entry, substituting a synthesized sound on any failure.
fn load_sound(loader: &dyn AudioDataLoader, spec: SoundSpec, sample_rate: u32) -> LoadResult {
    let options = LoadOptions::new().target_sample_rate(sample_rate);
    let loaded = panic::catch_unwind(AssertUnwindSafe(|| loader.load(&spec.source, &options)));

    let outcome = match loaded {
        Ok(Ok(data)) if data.is_empty() => Err("decoded buffer is empty".to_string()),
        Ok(Ok(data)) => data.resample(sample_rate).map_err(|e| e.to_string()),
        Ok(Err(e)) => Err(e.to_string()),
        Err(_) => Err("loader panicked".to_string()),
    };

    match outcome {
        Ok(buffer) => LoadResult {
            spec,
            buffer,
            failure: None,
        },
        Err(reason) => LoadResult {
            buffer: synth::synthesize(spec.category, sample_rate),
            spec,
            failure: Some(reason),
        },
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::catalog::default_catalog;
    use crate::effects::EffectKind;
    use crate::nodes::PanningModel;

    struct FailingLoader;

    impl AudioDataLoader for FailingLoader {
        fn load(&self, source: &str, _options: &LoadOptions) -> Result<SonoraAudioData> {
            Err(SonoraError::Network(format!("{} unreachable", source)))
        }
    }

    struct PanickingLoader;

    impl AudioDataLoader for PanickingLoader {
        fn load(&self, _source: &str, _options: &LoadOptions) -> Result<SonoraAudioData> {
            panic!("decoder exploded");
        }
    }

    /// Ignores the requested rate so the engine has to resample.
    struct ConstantLoader;

    impl AudioDataLoader for ConstantLoader {
        fn load(&self, _source: &str, _options: &LoadOptions) -> Result<SonoraAudioData> {
            SonoraAudioData::from_interleaved(vec![0.1; 1600], 16000, 1)
        }
    }

    fn desc() -> SonoraEngineDesc {
        SonoraEngineDesc::offline()
            .sample_rate(8000)
            .block_size(256)
            .panning_model(PanningModel::EqualPower)
    }

    fn engine_with(desc: SonoraEngineDesc, loader: Arc<dyn AudioDataLoader>) -> SonoraEngine {
        let _ = env_logger::builder().is_test(true).try_init();
        let mut engine = SonoraEngine::with_loader(desc, loader);
        engine.finish_loading();
        engine
    }

    fn engine() -> SonoraEngine {
        engine_with(desc(), Arc::new(FailingLoader))
    }

    fn render_seconds(engine: &mut SonoraEngine, seconds: f64) {
        let frames = (seconds * engine.sample_rate() as f64) as usize;
        engine.render_offline(frames);
    }

    #[test]
    fn failed_loads_are_replaced_by_synthetic_sounds() {
        let mut engine = engine();
        assert_eq!(engine.pending_loads(), 0);
        assert_eq!(engine.sound_names().len(), default_catalog().len());

        let expected = [
            ("click", 800),
            ("hover", 800),
            ("activate", 2400),
            ("success", 4000),
            ("error", 4000),
            ("ambient_neural", 80000),
        ];
        for (name, frames) in expected {
            let sound = engine.sound(name).unwrap();
            assert!(sound.synthetic, "{} should be synthetic", name);
            assert_eq!(sound.buffer.total_frames(), frames, "{}", name);
            assert_eq!(sound.buffer.sample_rate(), 8000);
        }
        assert!(engine.sound("ambient_matrix").unwrap().looping);

        let events = engine.poll_events();
        assert_eq!(events[0], SonoraEvent::EngineStarted { mode: EngineMode::Full });
        let synthesized = events
            .iter()
            .filter(|event| matches!(event, SonoraEvent::SoundSynthesized { .. }))
            .count();
        assert_eq!(synthesized, 8);
        assert_eq!(
            events.last(),
            Some(&SonoraEvent::CatalogReady {
                loaded: 0,
                synthesized: 8
            })
        );
    }

    #[test]
    fn loader_panic_yields_synthetic_sound() {
        let engine = engine_with(desc(), Arc::new(PanickingLoader));
        let click = engine.sound("click").unwrap();
        assert!(click.synthetic);
        assert_eq!(click.category, SoundCategory::Interface);
    }

    #[test]
    fn loaded_sounds_are_resampled_to_the_context_rate() {
        let mut engine = engine_with(desc(), Arc::new(ConstantLoader));
        let click = engine.sound("click").unwrap();
        assert!(!click.synthetic);
        assert_eq!(click.buffer.sample_rate(), 8000);
        assert_eq!(click.buffer.total_frames(), 800);

        let events = engine.poll_events();
        assert!(events.iter().any(|event| matches!(
            event,
            SonoraEvent::SoundLoaded { name, duration }
                if name.as_str() == "click" && duration.as_millis() == 100
        )));
    }

    #[test]
    fn unknown_sound_leaves_registries_untouched() {
        let mut engine = engine();
        assert!(engine.play("does-not-exist", PlayOptions::new()).is_none());
        assert!(
            engine
                .play_spatial("does-not-exist", 10.0, 10.0, PlayOptions::new())
                .is_none()
        );
        assert_eq!(engine.active_count(), 0);
        assert_eq!(engine.spatial_count(), 0);
    }

    #[test]
    fn staggered_plays_drain_the_registry() {
        let mut engine = engine();
        let now = engine.current_time();
        for i in 0..5 {
            let options = PlayOptions::new().when(now + i as f64 * 0.05).volume(0.8);
            assert!(engine.play("click", options).is_some());
        }
        assert_eq!(engine.active_count(), 5);

        render_seconds(&mut engine, 0.1);
        engine.poll_events();
        assert!(engine.active_count() > 0);

        render_seconds(&mut engine, 0.5);
        let ended = engine
            .poll_events()
            .iter()
            .filter(|event| event.playback_id().is_some())
            .count();
        assert_eq!(engine.active_count(), 0);
        assert!(ended > 0);
    }

    #[test]
    fn volume_is_clamped() {
        let mut engine = engine();
        assert_eq!(engine.volume(), 0.5);
        engine.set_volume(1.7);
        assert_eq!(engine.volume(), 1.0);
        engine.set_volume(-0.3);
        assert_eq!(engine.volume(), 0.0);
    }

    #[test]
    fn toggle_mute_alternates() {
        let mut engine = engine();
        assert!(!engine.toggle_mute());
        assert_eq!(engine.volume(), 0.0);
        assert!(engine.toggle_mute());
        assert_eq!(engine.volume(), UNMUTED_VOLUME);
    }

    #[test]
    fn play_spatial_without_spatial_support_is_plain_play() {
        let mut engine = engine_with(desc().enable_spatialization(false), Arc::new(FailingLoader));
        assert!(!engine.is_spatial_enabled());

        let handle = engine
            .play_spatial("hover", 100.0, 100.0, PlayOptions::new())
            .unwrap();
        assert!(!handle.is_spatial());
        assert_eq!(engine.active_count(), 1);
        assert_eq!(engine.spatial_count(), 0);
    }

    #[test]
    fn spatial_playback_follows_pointer_and_stop_all_clears() {
        let mut engine = engine();
        assert!(engine.is_spatial_enabled());

        let handle = engine
            .play_spatial("ambient_neural", 0.0, 540.0, PlayOptions::new())
            .unwrap();
        engine.play("click", PlayOptions::new().effect(EffectKind::Reverb));
        assert!(handle.is_spatial());
        assert_eq!(engine.spatial_count(), 1);
        assert_eq!(engine.active_count(), 2);

        render_seconds(&mut engine, 0.05);
        engine.update_pointer(1920.0, 540.0);
        render_seconds(&mut engine, 0.05);

        engine.stop_all();
        assert_eq!(engine.active_count(), 0);
        assert_eq!(engine.spatial_count(), 0);

        render_seconds(&mut engine, 0.05);
        assert!(engine.poll_events().iter().all(|e| e.playback_id().is_none()));
    }

    #[test]
    fn handles_stop_and_fade_looping_sounds() {
        let mut engine = engine();
        let stopped = engine.play("ambient_quantum", PlayOptions::new()).unwrap();
        let faded = engine.play("ambient_matrix", PlayOptions::new()).unwrap();
        render_seconds(&mut engine, 0.1);

        stopped.stop(0.0);
        stopped.stop(0.0);
        faded.fade_out(0.2);
        render_seconds(&mut engine, 0.1);
        let ended: Vec<PlaybackId> = engine
            .poll_events()
            .iter()
            .filter_map(SonoraEvent::playback_id)
            .collect();
        assert_eq!(ended, vec![stopped.id()]);

        render_seconds(&mut engine, 0.3);
        let ended: Vec<PlaybackId> = engine
            .poll_events()
            .iter()
            .filter_map(SonoraEvent::playback_id)
            .collect();
        assert_eq!(ended, vec![faded.id()]);
        assert_eq!(engine.active_count(), 0);
    }

    #[test]
    fn effect_handles_exist_in_full_mode() {
        let mut engine = engine();
        let delay = engine.delay().unwrap();
        delay.set_time(0.1);
        delay.set_feedback(0.2);
        engine.filter().unwrap().set_frequency(1000.0);
        engine.distortion().unwrap().set_amount(20.0);
        engine.chorus().unwrap().set_depth(2.0);
        engine.reverb().unwrap().set_wet(0.1);

        let options = PlayOptions::new().effects_by_name(["delay", "filter", "distortion", "chorus"]);
        engine.play("success", options);
        let samples = engine.render_offline(2048);
        assert_eq!(samples.len(), 4096);
        assert!(samples.iter().any(|s| *s != 0.0));
        assert!(samples.iter().all(|s| s.is_finite()));
    }

    #[test]
    fn visualization_snapshots_have_analyser_sizes() {
        let mut engine = engine();
        engine.play("success", PlayOptions::new());
        render_seconds(&mut engine, 0.3);

        let spectrum = engine.audio_data().unwrap();
        assert_eq!(spectrum.len(), 1024);
        assert!(spectrum.iter().any(|bin| *bin > 0));

        let waveform = engine.waveform_data().unwrap();
        assert_eq!(waveform.len(), 2048);
        assert!(waveform.iter().any(|sample| *sample != 128));
    }

    #[test]
    fn suspend_freezes_context_time() {
        let mut engine = engine();
        render_seconds(&mut engine, 0.1);
        let time = engine.current_time();
        assert!(time > 0.0);

        engine.suspend();
        assert!(engine.is_suspended());
        let silent = engine.render_offline(1024);
        assert!(silent.iter().all(|s| *s == 0.0));
        assert_eq!(engine.current_time(), time);

        engine.resume();
        render_seconds(&mut engine, 0.1);
        assert!(engine.current_time() > time);

        let events = engine.poll_events();
        assert!(events.contains(&SonoraEvent::EngineSuspended));
        assert!(events.contains(&SonoraEvent::EngineResumed));
    }

    #[test]
    fn disabled_backend_runs_degraded_with_fallback_playback() {
        let mut engine = engine_with(
            desc().backend(AudioBackend::Disabled),
            Arc::new(FailingLoader),
        );
        assert_eq!(engine.mode(), EngineMode::Degraded);
        assert!(!engine.is_spatial_enabled());
        assert!(!engine.has_fallback_output());
        assert_eq!(engine.sound_names().len(), 8);
        assert!(engine.audio_data().is_none());
        assert!(engine.waveform_data().is_none());
        assert!(engine.reverb().is_none());

        assert!(engine.play("click", PlayOptions::new().volume(0.0)).is_none());
        let mixed = engine.render_offline(256);
        assert!(mixed.iter().all(|s| *s == 0.0));

        engine.stop_all();
        assert!(engine.play("click", PlayOptions::new()).is_none());
        assert_eq!(engine.active_count(), 0);
        let mixed = engine.render_offline(256);
        assert!(mixed.iter().any(|s| *s != 0.0));

        engine.stop_all();
        engine.play_fallback("error");
        engine.play_fallback("missing");
        let mixed = engine.render_offline(256);
        // master volume 0.5 bounds a unit-peak synthetic sound
        assert!(mixed.iter().all(|s| s.abs() <= 0.5 + 1e-6));
    }

    #[test]
    fn invalid_descriptor_degrades_instead_of_failing() {
        let mut engine = engine_with(desc().block_size(500), Arc::new(FailingLoader));
        assert_eq!(engine.mode(), EngineMode::Degraded);
        assert_eq!(engine.sample_rate(), 8000);
        let events = engine.poll_events();
        assert!(events.iter().any(SonoraEvent::is_error));
    }

    #[test]
    fn play_fallback_is_ignored_in_full_mode() {
        let mut engine = engine();
        engine.play_fallback("click");
        assert_eq!(engine.active_count(), 0);
        assert!(engine.render_offline(256).iter().all(|s| *s == 0.0));
    }
}

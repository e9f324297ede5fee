//! # Sonora
//!
//! A procedural sound engine for interactive web-style interfaces: short UI
//! cues, feedback chords and looping ambient beds, routed through shared effect
//! units and optionally placed in 3D space under the pointer.
//!
//! The main thread owns a [`SonoraEngine`]. It loads a fixed catalog of named
//! sounds in the background, substituting synthesized sounds for anything that
//! cannot be fetched or decoded, and starts playbacks that a dedicated render
//! thread mixes through the master path.
//!
//! ## Quick Start
//!
//! ```no_run
//! use sonora::*;
//!
//! let mut engine = SonoraEngine::new(SonoraEngineDesc::default());
//! engine.finish_loading();
//!
//! // A click through the shared reverb
//! engine.play("click", PlayOptions::new().effect(EffectKind::Reverb));
//!
//! // An ambient bed that follows the pointer
//! let ambient = engine.play_spatial("ambient_neural", 640.0, 360.0, PlayOptions::new().volume(0.3));
//! engine.update_pointer(1200.0, 300.0);
//!
//! for event in engine.poll_events() {
//!     if let SonoraEvent::PlaybackEnded { id } = event {
//!         println!("{} ended", id);
//!     }
//! }
//!
//! if let Some(ambient) = ambient {
//!     ambient.fade_out(2.0);
//! }
//! ```
//!
//! ## Key Components
//!
//! - **[`SonoraEngine`]**: main-thread API for loading, playback and global controls
//! - **[`SonoraEngineDesc`]**: engine configuration (rate, block size, backend, catalog)
//! - **[`PlaybackHandle`]**: stop or fade out one playing sound
//! - **[`effects`]**: the shared reverb, delay, filter, distortion and chorus units
//! - **[`graph`]** and **[`nodes`]**: the block-based audio graph the renderer runs
//! - **[`SonoraEvent`]**: load results, completions and lifecycle notifications
//!
//! ## Architecture
//!
//! 1. **Main Thread**: owns `SonoraEngine` and the sound/playback registries, sends commands
//! 2. **Loader Threads**: one per catalog entry, fetch + decode or synthesize
//! 3. **Render Thread**: owns the audio graph, renders fixed-size blocks
//! 4. **Audio Callback**: lock-free consumption from a ring buffer to the device
//!
//! When no processing context can be created the engine runs in degraded mode
//! and plays sounds directly with a volume only.

pub mod audio_data;
pub mod capability;
pub mod catalog;
pub mod config;
pub mod dsp;
pub mod effects;
pub mod engine;
pub mod error;
pub mod events;
mod fallback;
pub mod graph;
pub mod math;
pub mod nodes;
mod output;
pub mod playback;
mod render;
pub mod spatial;
pub mod synth;

pub use capability::{Capabilities, EngineMode};
pub use catalog::{SoundCategory, SoundSpec, default_catalog};
pub use config::{AudioBackend, FilterConfig, PlayOptions, SonoraEngineDesc};
pub use effects::{
    ChorusHandle, DelayHandle, DistortionHandle, EffectKind, FilterHandle, ReverbHandle,
};
pub use engine::{SonoraEngine, SoundAsset};
pub use error::{Result, SonoraError};
pub use events::SonoraEvent;
pub use math::{Pose, Vec3};
pub use nodes::{FilterType, PanningModel};
pub use playback::{PlaybackHandle, PlaybackId};

//! Event types for Sonora

use crate::capability::EngineMode;
use crate::catalog::SoundCategory;
use crate::playback::PlaybackId;
use std::time::Duration;

#[derive(Debug, Clone, PartialEq)]
pub enum SonoraEvent {
    /// A catalog sound was fetched and decoded.
    SoundLoaded {
        name: String,
        duration: Duration,
    },
    /// A catalog sound could not be loaded and was replaced by a generated one.
    SoundSynthesized {
        name: String,
        category: SoundCategory,
        reason: String,
    },
    /// Every catalog entry has resolved.
    CatalogReady {
        loaded: usize,
        synthesized: usize,
    },
    PlaybackEnded {
        id: PlaybackId,
    },
    EngineStarted {
        mode: EngineMode,
    },
    EngineSuspended,
    EngineResumed,
    EngineError {
        error: String,
    },
}

impl SonoraEvent {
    pub fn playback_id(&self) -> Option<PlaybackId> {
        match self {
            Self::PlaybackEnded { id } => Some(*id),
            _ => None,
        }
    }

    pub fn sound_name(&self) -> Option<&str> {
        match self {
            Self::SoundLoaded { name, .. } | Self::SoundSynthesized { name, .. } => Some(name),
            _ => None,
        }
    }

    pub fn is_error(&self) -> bool {
        matches!(self, Self::EngineError { .. })
    }

    pub fn is_load_event(&self) -> bool {
        matches!(
            self,
            Self::SoundLoaded { .. } | Self::SoundSynthesized { .. } | Self::CatalogReady { .. }
        )
    }
}

use crate::audio_data::SonoraAudioData;
use crate::config::FilterConfig;
use crate::effects::{EffectKind, EffectParam};
use crate::math::Vec3;
use crossbeam_channel::Sender;
use std::fmt;
use uuid::Uuid;

/// Identifier of one playback instance.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash)]
pub struct PlaybackId(Uuid);

impl PlaybackId {
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }

    pub fn as_uuid(&self) -> Uuid {
        self.0
    }
}

impl Default for PlaybackId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for PlaybackId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "PlaybackId({})", self.0)
    }
}

/// Everything the renderer needs to build one processing chain.
#[derive(Debug, Clone)]
pub struct PlayRequest {
    pub id: PlaybackId,
    pub buffer: SonoraAudioData,
    pub looping: bool,
    pub volume: f32,
    pub playback_rate: f32,
    /// Absolute context time; times in the past start immediately
    pub when: f64,
    pub offset: f64,
    pub effects: Vec<EffectKind>,
    pub filter: Option<FilterConfig>,
    /// World position when the chain ends in a panner
    pub spatial: Option<Vec3>,
}

/// Commands sent from the engine to the renderer.
///
/// Commands naming an id the renderer no longer knows are ignored.
#[derive(Debug)]
pub enum PlaybackCommand {
    Play(Box<PlayRequest>),
    /// Stop `after` seconds past the renderer's current time
    Stop { id: PlaybackId, after: f64 },
    /// Ramp the chain gain to 0.001 over `duration` seconds, then stop
    FadeOut { id: PlaybackId, duration: f64 },
    /// Stop every chain immediately without reporting completions
    StopAll,
    SetPosition { id: PlaybackId, position: Vec3 },
    SetMasterVolume(f32),
    Effect(EffectParam),
}

/// Caller-side control of a playing sound.
///
/// Plain data plus a command sender; dropping the handle does not stop the sound.
#[derive(Debug, Clone)]
pub struct PlaybackHandle {
    id: PlaybackId,
    name: String,
    spatial: bool,
    commands: Sender<PlaybackCommand>,
}

impl PlaybackHandle {
    pub(crate) fn new(
        id: PlaybackId,
        name: impl Into<String>,
        spatial: bool,
        commands: Sender<PlaybackCommand>,
    ) -> Self {
        Self {
            id,
            name: name.into(),
            spatial,
            commands,
        }
    }

    pub fn id(&self) -> PlaybackId {
        self.id
    }

    /// Catalog name of the sound being played
    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn is_spatial(&self) -> bool {
        self.spatial
    }

    /// Stops the sound `after` seconds from now. Stopping twice is harmless.
    pub fn stop(&self, after: f64) {
        self.send(PlaybackCommand::Stop {
            id: self.id,
            after: after.max(0.0),
        });
    }

    /// Fades the sound out linearly over `duration` seconds, then stops it.
    pub fn fade_out(&self, duration: f64) {
        self.send(PlaybackCommand::FadeOut {
            id: self.id,
            duration: duration.max(0.0),
        });
    }

    pub(crate) fn set_position(&self, position: Vec3) {
        self.send(PlaybackCommand::SetPosition {
            id: self.id,
            position,
        });
    }

    fn send(&self, command: PlaybackCommand) {
        if self.commands.send(command).is_err() {
            log::debug!("Renderer gone, command for {} dropped", self.id);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crossbeam_channel::unbounded;

    #[test]
    fn handle_sends_clamped_commands() {
        let (tx, rx) = unbounded();
        let handle = PlaybackHandle::new(PlaybackId::new(), "click", false, tx);

        handle.stop(-1.0);
        handle.fade_out(0.5);

        match rx.try_recv().unwrap() {
            PlaybackCommand::Stop { id, after } => {
                assert_eq!(id, handle.id());
                assert_eq!(after, 0.0);
            }
            other => panic!("unexpected command {:?}", other),
        }
        assert!(matches!(
            rx.try_recv().unwrap(),
            PlaybackCommand::FadeOut { duration, .. } if duration == 0.5
        ));
    }

    #[test]
    fn sending_after_renderer_drop_is_silent() {
        let (tx, rx) = unbounded();
        drop(rx);
        let handle = PlaybackHandle::new(PlaybackId::new(), "hover", true, tx);
        handle.stop(0.0);
        assert!(handle.is_spatial());
        assert_eq!(handle.name(), "hover");
    }

    #[test]
    fn ids_are_unique() {
        assert_ne!(PlaybackId::new(), PlaybackId::new());
    }
}

use super::HrtfContext;
use crate::error::{Result, SonoraError};
use crate::math::Vec3;
use audionimbus::{
    AmbisonicsDecodeEffect, AmbisonicsDecodeEffectParams, AmbisonicsDecodeEffectSettings,
    AmbisonicsEncodeEffect, AmbisonicsEncodeEffectParams, AmbisonicsEncodeEffectSettings,
    AudioBufferSettings, CoordinateSystem, Direction, SpeakerLayout, Vector3,
    audio_buffer::AudioBuffer as AudioNimbusAudioBuffer,
};
use std::rc::Rc;

/// Order 2 ambisonics uses 9 channels.
const AMBISONICS_ORDER: u32 = 2;
const AMBISONICS_CHANNELS: usize = 9;

/// Renders one mono stream binaurally from a direction.
///
/// The stream is encoded into second order ambisonics and decoded through the
/// shared HRTF, so each panner keeps its own encoder/decoder pair and
/// scratch buffers.
pub struct BinauralRenderer {
    shared: Rc<HrtfContext>,
    encode: AmbisonicsEncodeEffect,
    decode: AmbisonicsDecodeEffect,
    mono: Vec<f32>,
    encoded: Vec<f32>,
    /// Planar stereo: left frames followed by right frames
    decoded: Vec<f32>,
}

impl BinauralRenderer {
    pub fn new(shared: Rc<HrtfContext>) -> Result<Self> {
        let audio_settings = shared.audio_settings();
        let frame_size = shared.frame_size;

        let encode = AmbisonicsEncodeEffect::try_new(
            &shared.context,
            &audio_settings,
            &AmbisonicsEncodeEffectSettings {
                max_order: AMBISONICS_ORDER,
            },
        )
        .map_err(|e| {
            SonoraError::SpatialAudio(format!("Failed to create AmbisonicsEncodeEffect: {}", e))
        })?;

        let decode = AmbisonicsDecodeEffect::try_new(
            &shared.context,
            &audio_settings,
            &AmbisonicsDecodeEffectSettings {
                max_order: AMBISONICS_ORDER,
                speaker_layout: SpeakerLayout::Stereo,
                hrtf: &shared.hrtf,
            },
        )
        .map_err(|e| {
            SonoraError::SpatialAudio(format!("Failed to create AmbisonicsDecodeEffect: {}", e))
        })?;

        Ok(Self {
            encode,
            decode,
            mono: vec![0.0; frame_size],
            encoded: vec![0.0; frame_size * AMBISONICS_CHANNELS],
            decoded: vec![0.0; frame_size * 2],
            shared,
        })
    }

    pub fn frame_size(&self) -> usize {
        self.shared.frame_size
    }

    /// Input buffer to fill with the mono block before [`render`](Self::render).
    pub fn input_mut(&mut self) -> &mut [f32] {
        &mut self.mono
    }

    /// Spatializes the mono block towards `direction` (listener space, -Z ahead).
    ///
    /// Returns the left and right output blocks.
    pub fn render(&mut self, direction: Vec3) -> Result<(&[f32], &[f32])> {
        let direction = direction.try_normalize().unwrap_or(Vec3::NEG_Z);

        let encode_params = AmbisonicsEncodeEffectParams {
            direction: Direction::new(direction.x, direction.y, direction.z),
            order: AMBISONICS_ORDER,
        };

        {
            let input_buf = AudioNimbusAudioBuffer::try_with_data_and_settings(
                &self.mono,
                AudioBufferSettings {
                    num_channels: Some(1),
                    ..Default::default()
                },
            )
            .map_err(|e| SonoraError::SpatialAudio(format!("Failed to create input buffer: {}", e)))?;

            let encoded_buf = AudioNimbusAudioBuffer::try_with_data_and_settings(
                &mut self.encoded,
                AudioBufferSettings {
                    num_channels: Some(AMBISONICS_CHANNELS as u32),
                    ..Default::default()
                },
            )
            .map_err(|e| {
                SonoraError::SpatialAudio(format!("Failed to create ambisonics buffer: {}", e))
            })?;

            self.encode.apply(&encode_params, &input_buf, &encoded_buf);
        }

        let decode_params = AmbisonicsDecodeEffectParams {
            order: AMBISONICS_ORDER,
            hrtf: &self.shared.hrtf,
            orientation: CoordinateSystem {
                ahead: Vector3::new(0.0, 0.0, -1.0),
                ..Default::default()
            },
            binaural: true,
        };

        {
            let encoded_in = AudioNimbusAudioBuffer::try_with_data_and_settings(
                &self.encoded,
                AudioBufferSettings {
                    num_channels: Some(AMBISONICS_CHANNELS as u32),
                    ..Default::default()
                },
            )
            .map_err(|e| {
                SonoraError::SpatialAudio(format!("Failed to create ambisonics buffer: {}", e))
            })?;

            let output_buf = AudioNimbusAudioBuffer::try_with_data_and_settings(
                &mut self.decoded,
                AudioBufferSettings {
                    num_channels: Some(2),
                    ..Default::default()
                },
            )
            .map_err(|e| SonoraError::SpatialAudio(format!("Failed to create output buffer: {}", e)))?;

            self.decode.apply(&decode_params, &encoded_in, &output_buf);
        }

        let frames = self.shared.frame_size;
        let (left, right) = self.decoded.split_at(frames);
        Ok((left, right))
    }
}

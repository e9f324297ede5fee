use crate::graph::{AudioBlock, AudioNode, ProcessContext};
use crate::math::{Pose, Vec3};
use crate::spatial::{BinauralRenderer, HrtfContext};
use std::any::Any;
use std::f32::consts::FRAC_PI_2;
use std::rc::Rc;

/// How a panner places a source between the ears.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum PanningModel {
    /// Constant-power stereo panning by azimuth
    EqualPower,
    /// Binaural rendering through Steam Audio's HRTF
    #[default]
    Hrtf,
}

/// Inverse distance attenuation.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct DistanceModel {
    pub ref_distance: f32,
    pub max_distance: f32,
    pub rolloff_factor: f32,
}

impl Default for DistanceModel {
    fn default() -> Self {
        Self {
            ref_distance: 1.0,
            max_distance: 10000.0,
            rolloff_factor: 1.0,
        }
    }
}

impl DistanceModel {
    /// `ref / (ref + rolloff · (d - ref))` with `d` clamped to `[ref, max]`.
    pub fn gain(&self, distance: f32) -> f32 {
        let d = distance.clamp(self.ref_distance, self.max_distance.max(self.ref_distance));
        let denominator = self.ref_distance + self.rolloff_factor * (d - self.ref_distance);
        if denominator <= 0.0 {
            return 1.0;
        }
        self.ref_distance / denominator
    }
}

/// Positions its input in 3D relative to a listener.
pub struct PannerNode {
    position: Vec3,
    listener: Pose,
    distance_model: DistanceModel,
    binaural: Option<BinauralRenderer>,
}

impl PannerNode {
    pub fn equal_power(position: Vec3, listener: Pose, distance_model: DistanceModel) -> Self {
        Self {
            position,
            listener,
            distance_model,
            binaural: None,
        }
    }

    /// HRTF panner. Falls back to equal-power panning when the Steam Audio
    /// effects cannot be created.
    pub fn hrtf(
        position: Vec3,
        listener: Pose,
        distance_model: DistanceModel,
        hrtf: Rc<HrtfContext>,
    ) -> Self {
        let binaural = match BinauralRenderer::new(hrtf) {
            Ok(renderer) => Some(renderer),
            Err(e) => {
                log::warn!("HRTF panner unavailable, using equal-power panning: {}", e);
                None
            }
        };
        Self {
            position,
            listener,
            distance_model,
            binaural,
        }
    }

    pub fn panning_model(&self) -> PanningModel {
        if self.binaural.is_some() {
            PanningModel::Hrtf
        } else {
            PanningModel::EqualPower
        }
    }

    pub fn position(&self) -> Vec3 {
        self.position
    }

    pub fn set_position(&mut self, position: Vec3) {
        self.position = position;
    }

    pub fn distance_gain(&self) -> f32 {
        self.distance_model
            .gain(self.listener.distance_to(self.position))
    }

    /// Azimuth in degrees: 0 straight ahead, +90 to the right, -90 to the left.
    pub fn azimuth(&self) -> f32 {
        let Some(direction) = (self.position - self.listener.position).try_normalize() else {
            return 0.0;
        };
        let up = self.listener.up();
        let projected = (direction - up * direction.dot(up)).normalize_or_zero();
        if projected == Vec3::ZERO {
            return 0.0;
        }

        let mut azimuth = projected
            .dot(self.listener.right())
            .clamp(-1.0, 1.0)
            .acos()
            .to_degrees();
        if projected.dot(self.listener.forward()) < 0.0 {
            azimuth = 360.0 - azimuth;
        }
        if (0.0..=270.0).contains(&azimuth) {
            90.0 - azimuth
        } else {
            450.0 - azimuth
        }
    }

    fn process_equal_power(&self, input: &AudioBlock, output: &mut AudioBlock, gain: f32) {
        let mut azimuth = self.azimuth().clamp(-180.0, 180.0);
        if azimuth < -90.0 {
            azimuth = -180.0 - azimuth;
        } else if azimuth > 90.0 {
            azimuth = 180.0 - azimuth;
        }

        let x = if azimuth <= 0.0 {
            (azimuth + 90.0) / 90.0
        } else {
            azimuth / 90.0
        };
        let gain_left = (x * FRAC_PI_2).cos();
        let gain_right = (x * FRAC_PI_2).sin();

        let (left_out, right_out) = output.channels_mut();
        let left_in = input.channel(0);
        let right_in = input.channel(1);
        for frame in 0..left_out.len() {
            let (l, r) = (left_in[frame], right_in[frame]);
            let (out_l, out_r) = if azimuth <= 0.0 {
                (l + r * gain_left, r * gain_right)
            } else {
                (l * gain_left, r + l * gain_right)
            };
            left_out[frame] = out_l * gain;
            right_out[frame] = out_r * gain;
        }
    }
}

impl AudioNode for PannerNode {
    fn process(&mut self, input: &AudioBlock, output: &mut AudioBlock, ctx: &ProcessContext) {
        let gain = self.distance_gain();
        let local = self.listener.local_direction_to(self.position);
        // Steam Audio expects -Z ahead
        let direction = Vec3::new(local.x, local.y, -local.z);

        let rendered = match self.binaural.as_mut() {
            Some(renderer) if renderer.frame_size() == ctx.frames => {
                for (frame, sample) in renderer.input_mut().iter_mut().enumerate() {
                    *sample = input.mono(frame) * gain;
                }
                match renderer.render(direction) {
                    Ok((left, right)) => {
                        output.channel_mut(0).copy_from_slice(left);
                        output.channel_mut(1).copy_from_slice(right);
                        true
                    }
                    Err(e) => {
                        log::error!("HRTF rendering failed: {}", e);
                        false
                    }
                }
            }
            _ => false,
        };

        if !rendered {
            self.process_equal_power(input, output, gain);
        }
    }

    fn kind(&self) -> &'static str {
        "panner"
    }

    fn as_any_mut(&mut self) -> &mut dyn Any {
        self
    }
}

// Spatial audio module
//
// Steam Audio integration for HRTF panning. The equal-power fallback and the
// distance model live with the panner node itself.

mod binaural;
mod hrtf;

pub use binaural::BinauralRenderer;
pub use hrtf::{HrtfContext, create_default_hrtf, create_hrtf_from_file};

use crate::math::{Pose, Vec3, normalize_screen};

/// Depth of the plane pointer-driven sources sit on.
pub const SOURCE_PLANE_Z: f32 = -5.0;
/// Scale from normalized screen units to world units.
pub const SCREEN_TO_WORLD: f32 = 10.0;

/// The fixed listener: at (0, 0, 1), facing -Z with +Y up.
pub fn default_listener() -> Pose {
    Pose::from_position(Vec3::new(0.0, 0.0, 1.0))
}

/// World position of a source under the pointer at screen `(x, y)`.
///
/// Screen coordinates are normalized to [-1, 1] by the viewport, so +Y points
/// down the screen.
pub fn screen_to_world(x: f32, y: f32, viewport: (f32, f32)) -> Vec3 {
    Vec3::new(
        normalize_screen(x, viewport.0) * SCREEN_TO_WORLD,
        normalize_screen(y, viewport.1) * SCREEN_TO_WORLD,
        SOURCE_PLANE_Z,
    )
}

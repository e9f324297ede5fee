//! Math types for Sonora

pub use glam::{Quat, Vec3};

/// Position and orientation of the listener in the virtual audio space.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Pose {
    pub position: Vec3,
    pub rotation: Quat,
}

impl Pose {
    pub fn new(position: Vec3, rotation: Quat) -> Self {
        Self { position, rotation }
    }

    pub fn identity() -> Self {
        Self {
            position: Vec3::ZERO,
            rotation: Quat::IDENTITY,
        }
    }

    pub fn from_position(position: Vec3) -> Self {
        Self {
            position,
            rotation: Quat::IDENTITY,
        }
    }

    pub fn forward(&self) -> Vec3 {
        self.rotation * (-Vec3::Z)
    }

    pub fn up(&self) -> Vec3 {
        self.rotation * Vec3::Y
    }

    pub fn right(&self) -> Vec3 {
        self.rotation * Vec3::X
    }

    pub fn distance_to(&self, point: Vec3) -> f32 {
        self.position.distance(point)
    }

    /// Direction from the listener to `point`, expressed in the listener's
    /// own (right, up, forward) frame.
    pub fn local_direction_to(&self, point: Vec3) -> Vec3 {
        let direction = (point - self.position).normalize_or_zero();
        Vec3::new(
            direction.dot(self.right()),
            direction.dot(self.up()),
            direction.dot(self.forward()),
        )
    }
}

impl Default for Pose {
    fn default() -> Self {
        Self::identity()
    }
}

/// Maps a screen coordinate to the [-1, 1] range of the viewport axis.
pub fn normalize_screen(coordinate: f32, extent: f32) -> f32 {
    if extent <= 0.0 {
        return 0.0;
    }
    (coordinate / extent) * 2.0 - 1.0
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn identity_pose_faces_negative_z() {
        let pose = Pose::identity();
        assert_eq!(pose.forward(), -Vec3::Z);
        assert_eq!(pose.up(), Vec3::Y);
        assert_eq!(pose.right(), Vec3::X);
    }

    #[test]
    fn local_direction_of_point_ahead() {
        let pose = Pose::from_position(Vec3::new(0.0, 0.0, 1.0));
        let dir = pose.local_direction_to(Vec3::new(0.0, 0.0, -5.0));
        assert!((dir.z - 1.0).abs() < 1e-6);
        assert!(dir.x.abs() < 1e-6);
    }

    #[test]
    fn screen_normalization() {
        assert_eq!(normalize_screen(0.0, 800.0), -1.0);
        assert_eq!(normalize_screen(400.0, 800.0), 0.0);
        assert_eq!(normalize_screen(800.0, 800.0), 1.0);
        assert_eq!(normalize_screen(10.0, 0.0), 0.0);
    }
}

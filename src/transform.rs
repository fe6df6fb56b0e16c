use glam::{EulerRot, Mat4, Quat, Vec3};
use serde::{Deserialize, Serialize};

/// Position, rotation and scale applied to a scene node.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Transform {
    pub position: Vec3,
    pub rotation: Quat,
    pub scale: Vec3,
}

impl Default for Transform {
    fn default() -> Self {
        Self::IDENTITY
    }
}

impl Transform {
    pub const IDENTITY: Self = Self {
        position: Vec3::ZERO,
        rotation: Quat::IDENTITY,
        scale: Vec3::ONE,
    };

    pub fn from_position(position: Vec3) -> Self {
        Self {
            position,
            ..Self::IDENTITY
        }
    }

    /// Builds a transform from XYZ Euler angles given in degrees.
    pub fn from_euler_degrees(position: Vec3, rotation: Vec3, scale: Vec3) -> Self {
        Self {
            position,
            rotation: Quat::from_euler(
                EulerRot::XYZ,
                rotation.x.to_radians(),
                rotation.y.to_radians(),
                rotation.z.to_radians(),
            ),
            scale,
        }
    }

    pub fn with_uniform_scale(mut self, scale: f32) -> Self {
        self.scale = Vec3::splat(scale);
        self
    }

    pub fn to_matrix(&self) -> Mat4 {
        Mat4::from_scale_rotation_translation(self.scale, self.rotation, self.position)
    }

    pub fn transform_point(&self, point: Vec3) -> Vec3 {
        self.rotation * (point * self.scale) + self.position
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn matrix_and_point_transform_agree() {
        let transform = Transform::from_euler_degrees(
            Vec3::new(1.0, 2.0, 3.0),
            Vec3::new(0.0, 90.0, 0.0),
            Vec3::splat(2.0),
        );
        let point = Vec3::new(1.0, 0.0, 0.0);
        let via_matrix = transform.to_matrix().transform_point3(point);
        let direct = transform.transform_point(point);
        assert!((via_matrix - direct).length() < 1e-5);
        assert!((direct - Vec3::new(1.0, 2.0, 1.0)).length() < 1e-5);
    }

    #[test]
    fn uniform_scale_overrides_scale() {
        let transform = Transform::from_position(Vec3::Y).with_uniform_scale(0.5);
        assert_eq!(transform.scale, Vec3::splat(0.5));
        assert_eq!(transform.position, Vec3::Y);
    }
}

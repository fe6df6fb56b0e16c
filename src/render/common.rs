use glam::{Mat4, Vec3};

/// Base colour of the decorative model (#fbbf24).
pub const MODEL_COLOR: Vec3 = Vec3::new(0.984, 0.749, 0.141);

/// Camera parameters consumed by the renderer's uniform buffer.
#[derive(Clone, Debug)]
pub struct CameraParams {
    pub view_proj: Mat4,
    pub position: Vec3,
}

/// Cone of a spot light. Cosines of the outer and fully lit inner angles.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct SpotCone {
    pub direction: Vec3,
    pub cos_outer: f32,
    pub cos_inner: f32,
}

impl SpotCone {
    pub fn new(position: Vec3, target: Vec3, angle: f32, penumbra: f32) -> Self {
        let direction = (target - position).try_normalize().unwrap_or(Vec3::NEG_Y);
        let inner = angle * (1.0 - penumbra.clamp(0.0, 1.0));
        Self {
            direction,
            cos_outer: angle.cos(),
            cos_inner: inner.cos(),
        }
    }

    /// Light falloff for a point lit from `light_position`.
    pub fn attenuation(&self, light_position: Vec3, point: Vec3) -> f32 {
        let to_point = (point - light_position).try_normalize().unwrap_or(self.direction);
        let cos = to_point.dot(self.direction);
        let span = (self.cos_inner - self.cos_outer).max(1e-4);
        let t = ((cos - self.cos_outer) / span).clamp(0.0, 1.0);
        t * t * (3.0 - 2.0 * t)
    }
}

/// Lighting state consumed by the renderer's uniform buffer.
#[derive(Clone, Debug)]
pub struct LightParams {
    pub position: Vec3,
    pub color: Vec3,
    pub intensity: f32,
    pub ambient: Vec3,
    pub spot: Option<SpotCone>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn spot_cone_is_bright_on_axis_and_dark_outside() {
        let position = Vec3::splat(10.0);
        let cone = SpotCone::new(position, Vec3::ZERO, 0.15, 1.0);
        assert!((cone.attenuation(position, Vec3::ZERO) - 1.0).abs() < 1e-5);
        assert_eq!(cone.attenuation(position, Vec3::new(10.0, -10.0, 10.0)), 0.0);
    }

    #[test]
    fn hard_edge_without_penumbra() {
        let cone = SpotCone::new(Vec3::Y * 5.0, Vec3::ZERO, 0.5, 0.0);
        assert_eq!(cone.cos_inner, cone.cos_outer);
        assert!(cone.attenuation(Vec3::Y * 5.0, Vec3::new(0.1, 0.0, 0.0)) > 0.99);
    }
}

use std::f32::consts::{PI, TAU};

use glam::{Mat4, Vec3};

use crate::scene::{CameraDescriptor, OrbitConfig};

/// Orbit camera driven by pointer drags, the wheel and auto-rotation.
///
/// The camera sits on a sphere around `target`; `theta` is the azimuth in
/// the XZ plane and `phi` the polar angle from +Y.
#[derive(Debug, Clone)]
pub struct OrbitControls {
    config: OrbitConfig,
    pub target: Vec3,
    pub radius: f32,
    pub theta: f32,
    pub phi: f32,
    pub min_radius: f32,
    pub max_radius: f32,
    pub rotate_speed: f32,
    pub zoom_speed: f32,
    pub damping: f32,
    velocity_theta: f32,
    velocity_phi: f32,
    velocity_radius: f32,
}

const MIN_PHI: f32 = 0.05;
const MAX_PHI: f32 = PI - 0.05;

impl OrbitControls {
    pub fn new(camera: &CameraDescriptor, config: OrbitConfig) -> Self {
        let offset = camera.position - camera.target;
        let radius = offset.length().max(f32::EPSILON);
        Self {
            config,
            target: camera.target,
            radius,
            theta: offset.z.atan2(offset.x),
            phi: (offset.y / radius).clamp(-1.0, 1.0).acos().clamp(MIN_PHI, MAX_PHI),
            min_radius: 0.5,
            max_radius: 100.0,
            rotate_speed: 0.005,
            zoom_speed: 0.1,
            damping: 0.85,
            velocity_theta: 0.0,
            velocity_phi: 0.0,
            velocity_radius: 0.0,
        }
    }

    pub fn config(&self) -> OrbitConfig {
        self.config
    }

    /// Pointer drag in pixels.
    pub fn rotate(&mut self, delta_x: f32, delta_y: f32) {
        self.velocity_theta += delta_x * self.rotate_speed;
        self.velocity_phi -= delta_y * self.rotate_speed;
    }

    /// Wheel input; ignored when zoom is disabled.
    pub fn zoom(&mut self, delta: f32) {
        if !self.config.enable_zoom {
            return;
        }
        self.velocity_radius -= delta * self.zoom_speed * self.radius;
    }

    /// Auto-rotation rate in radians per second. One full turn takes
    /// `60 / speed` seconds.
    pub fn auto_rotate_rate(&self) -> f32 {
        if self.config.auto_rotate {
            TAU / 60.0 * self.config.auto_rotate_speed
        } else {
            0.0
        }
    }

    pub fn update(&mut self, dt: f32) {
        let dt = dt.max(0.0);
        self.theta =
            (self.theta + self.velocity_theta + self.auto_rotate_rate() * dt).rem_euclid(TAU);
        self.phi = (self.phi + self.velocity_phi).clamp(MIN_PHI, MAX_PHI);
        self.radius =
            (self.radius + self.velocity_radius).clamp(self.min_radius, self.max_radius);

        self.velocity_theta *= self.damping;
        self.velocity_phi *= self.damping;
        self.velocity_radius *= self.damping;

        if self.velocity_theta.abs() < 0.0001 {
            self.velocity_theta = 0.0;
        }
        if self.velocity_phi.abs() < 0.0001 {
            self.velocity_phi = 0.0;
        }
        if self.velocity_radius.abs() < 0.0001 {
            self.velocity_radius = 0.0;
        }
    }

    pub fn camera_position(&self) -> Vec3 {
        let x = self.radius * self.phi.sin() * self.theta.cos();
        let y = self.radius * self.phi.cos();
        let z = self.radius * self.phi.sin() * self.theta.sin();
        self.target + Vec3::new(x, y, z)
    }

    pub fn view_matrix(&self) -> Mat4 {
        Mat4::look_at_rh(self.camera_position(), self.target, Vec3::Y)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn controls(config: OrbitConfig) -> OrbitControls {
        OrbitControls::new(&CameraDescriptor::default(), config)
    }

    #[test]
    fn starts_at_descriptor_position() {
        let controls = controls(OrbitConfig::default());
        assert!((controls.camera_position() - Vec3::new(0.0, 0.0, 5.0)).length() < 1e-4);
        assert!((controls.radius - 5.0).abs() < 1e-6);
    }

    #[test]
    fn zoom_disabled_keeps_radius() {
        let mut controls = controls(OrbitConfig {
            enable_zoom: false,
            auto_rotate: false,
            auto_rotate_speed: 1.0,
        });
        controls.zoom(3.0);
        for _ in 0..10 {
            controls.update(1.0 / 60.0);
        }
        assert!((controls.radius - 5.0).abs() < 1e-6);
    }

    #[test]
    fn zoom_enabled_moves_closer() {
        let mut controls = controls(OrbitConfig::default());
        controls.zoom(1.0);
        controls.update(1.0 / 60.0);
        assert!(controls.radius < 5.0);
    }

    #[test]
    fn auto_rotation_completes_a_turn_in_sixty_seconds() {
        let mut controls = controls(OrbitConfig {
            enable_zoom: false,
            auto_rotate: true,
            auto_rotate_speed: 1.0,
        });
        let start = controls.theta;
        controls.update(15.0);
        let quarter = (controls.theta - start).rem_euclid(TAU);
        assert!((quarter - TAU / 4.0).abs() < 1e-4);
        assert!((controls.camera_position().length() - 5.0).abs() < 1e-4);
    }

    #[test]
    fn no_auto_rotation_when_disabled() {
        let mut controls = controls(OrbitConfig::default());
        let start = controls.theta;
        controls.update(10.0);
        assert_eq!(controls.theta, start);
    }

    #[test]
    fn drag_rotation_decays() {
        let mut controls = controls(OrbitConfig::default());
        controls.rotate(100.0, 0.0);
        let start = controls.theta;
        for _ in 0..200 {
            controls.update(1.0 / 60.0);
        }
        let settled = controls.theta;
        controls.update(1.0 / 60.0);
        assert_ne!(settled, start);
        assert_eq!(controls.theta, settled);
    }
}

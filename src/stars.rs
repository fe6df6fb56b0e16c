use glam::Vec3;
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use serde::{Deserialize, Serialize};

/// Parameters of the background star shell.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct StarFieldConfig {
    /// Inner radius of the shell.
    pub radius: f32,
    /// Thickness of the shell.
    pub depth: f32,
    pub count: usize,
    /// Base point size.
    pub factor: f32,
    pub saturation: f32,
    /// Dims stars towards the outer edge of the shell.
    pub fade: bool,
    /// Twinkle speed.
    pub speed: f32,
    pub seed: u64,
}

impl Default for StarFieldConfig {
    fn default() -> Self {
        Self {
            radius: 100.0,
            depth: 50.0,
            count: 5000,
            factor: 4.0,
            saturation: 0.0,
            fade: true,
            speed: 1.0,
            seed: 0x5eed_da7a,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Star {
    pub position: Vec3,
    pub color: Vec3,
    pub size: f32,
}

#[derive(Debug, Clone)]
pub struct StarField {
    config: StarFieldConfig,
    stars: Vec<Star>,
}

impl StarField {
    /// Scatters `count` stars through the shell, walking inwards from
    /// `radius + depth` so that the whole depth is covered on average.
    pub fn generate(config: StarFieldConfig) -> Self {
        let mut rng = StdRng::seed_from_u64(config.seed);
        let mut radius = config.radius + config.depth;
        let increment = if config.count == 0 {
            0.0
        } else {
            config.depth / config.count as f32
        };

        let stars = (0..config.count)
            .map(|i| {
                radius -= increment * rng.gen::<f32>();
                let phi = (1.0 - rng.gen::<f32>() * 2.0).acos();
                let theta = rng.gen::<f32>() * std::f32::consts::TAU;
                let position = Vec3::new(
                    radius * phi.sin() * theta.sin(),
                    radius * phi.cos(),
                    radius * phi.sin() * theta.cos(),
                );
                let hue = i as f32 / config.count as f32;
                Star {
                    position,
                    color: hsl_to_rgb(hue, config.saturation, 0.9),
                    size: (0.5 + 0.5 * rng.gen::<f32>()) * config.factor,
                }
            })
            .collect();

        Self { config, stars }
    }

    pub fn config(&self) -> &StarFieldConfig {
        &self.config
    }

    pub fn stars(&self) -> &[Star] {
        &self.stars
    }

    pub fn len(&self) -> usize {
        self.stars.len()
    }

    pub fn is_empty(&self) -> bool {
        self.stars.is_empty()
    }

    /// Colour multiplier in `[0, 1]`. Smaller stars are dimmer, and with
    /// `fade` set the outermost stars drop to half brightness.
    pub fn brightness(&self, star: &Star) -> f32 {
        let config = &self.config;
        let size = (star.size / config.factor.max(f32::EPSILON)).min(1.0);
        if !config.fade || config.depth <= 0.0 {
            return size;
        }
        let depth = ((star.position.length() - config.radius) / config.depth).clamp(0.0, 1.0);
        size * (1.0 - 0.5 * depth)
    }

    /// Point-size multiplier at `elapsed` seconds; oscillates in `[0.5, 1]`.
    pub fn twinkle(&self, elapsed: f32) -> f32 {
        (3.0 + (elapsed * self.config.speed + 100.0).sin()) / 4.0
    }
}

fn hsl_to_rgb(hue: f32, saturation: f32, lightness: f32) -> Vec3 {
    if saturation <= 0.0 {
        return Vec3::splat(lightness);
    }
    let q = if lightness < 0.5 {
        lightness * (1.0 + saturation)
    } else {
        lightness + saturation - lightness * saturation
    };
    let p = 2.0 * lightness - q;
    let channel = |t: f32| {
        let t = t.rem_euclid(1.0);
        if t < 1.0 / 6.0 {
            p + (q - p) * 6.0 * t
        } else if t < 0.5 {
            q
        } else if t < 2.0 / 3.0 {
            p + (q - p) * (2.0 / 3.0 - t) * 6.0
        } else {
            p
        }
    };
    Vec3::new(
        channel(hue + 1.0 / 3.0),
        channel(hue),
        channel(hue - 1.0 / 3.0),
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn stars_stay_inside_the_shell() {
        let config = StarFieldConfig {
            count: 500,
            ..StarFieldConfig::default()
        };
        let field = StarField::generate(config);
        assert_eq!(field.len(), 500);
        for star in field.stars() {
            let distance = star.position.length();
            assert!(distance <= config.radius + config.depth + 1e-3);
            assert!(distance >= config.radius - 1e-3);
            assert!(star.size >= config.factor * 0.5 && star.size <= config.factor);
        }
    }

    #[test]
    fn generation_is_deterministic_per_seed() {
        let config = StarFieldConfig {
            count: 64,
            ..StarFieldConfig::default()
        };
        let a = StarField::generate(config);
        let b = StarField::generate(config);
        assert_eq!(a.stars(), b.stars());

        let c = StarField::generate(StarFieldConfig { seed: 7, ..config });
        assert_ne!(a.stars(), c.stars());
    }

    #[test]
    fn zero_saturation_is_grey() {
        let field = StarField::generate(StarFieldConfig {
            count: 3,
            ..StarFieldConfig::default()
        });
        for star in field.stars() {
            assert_eq!(star.color, Vec3::splat(0.9));
        }
        assert!(StarField::generate(StarFieldConfig {
            count: 0,
            ..StarFieldConfig::default()
        })
        .is_empty());
    }

    #[test]
    fn fade_dims_the_outer_shell() {
        let config = StarFieldConfig {
            count: 0,
            ..StarFieldConfig::default()
        };
        let star = |distance: f32| Star {
            position: Vec3::new(0.0, distance, 0.0),
            color: Vec3::ONE,
            size: config.factor,
        };

        let faded = StarField::generate(config);
        assert_eq!(faded.brightness(&star(config.radius)), 1.0);
        assert_eq!(faded.brightness(&star(config.radius + config.depth)), 0.5);

        let flat = StarField::generate(StarFieldConfig {
            fade: false,
            ..config
        });
        assert_eq!(flat.brightness(&star(config.radius + config.depth)), 1.0);
    }

    #[test]
    fn saturated_hue_zero_is_red() {
        let color = hsl_to_rgb(0.0, 1.0, 0.5);
        assert!((color - Vec3::new(1.0, 0.0, 0.0)).length() < 1e-5);
    }

    #[test]
    fn twinkle_is_bounded() {
        let field = StarField::generate(StarFieldConfig {
            count: 1,
            ..StarFieldConfig::default()
        });
        for step in 0..100 {
            let scale = field.twinkle(step as f32 * 0.37);
            assert!((0.5..=1.0).contains(&scale));
        }
    }
}

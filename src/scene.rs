use anyhow::{anyhow, Context, Result};
use glam::Vec3;
use roxmltree::{Document, Node};
use serde::{Deserialize, Serialize};

use crate::assets::MODEL_PATH;
use crate::stars::StarFieldConfig;
use crate::transform::Transform;

/// Declarative description of the decorative scene.
///
/// The default reproduces the page's about-section canvas: a camera five
/// units back, a soft ambient fill plus a narrow spot light, a night
/// environment with stars, and a slowly auto-rotating orbit with zoom off.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SceneDescriptor {
    pub camera: CameraDescriptor,
    pub lights: Vec<LightDescriptor>,
    pub environment: EnvironmentPreset,
    pub controls: OrbitConfig,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub model: Option<ModelDescriptor>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub stars: Option<StarFieldConfig>,
}

impl Default for SceneDescriptor {
    fn default() -> Self {
        Self {
            camera: CameraDescriptor::default(),
            lights: default_lights(),
            environment: EnvironmentPreset::Night,
            controls: OrbitConfig {
                enable_zoom: false,
                auto_rotate: true,
                auto_rotate_speed: 1.0,
            },
            model: Some(ModelDescriptor::new(MODEL_PATH)),
            stars: Some(StarFieldConfig::default()),
        }
    }
}

fn default_lights() -> Vec<LightDescriptor> {
    vec![
        LightDescriptor::Ambient {
            color: Vec3::ONE,
            intensity: 0.5,
        },
        LightDescriptor::Spot {
            position: Vec3::new(10.0, 10.0, 10.0),
            color: Vec3::ONE,
            intensity: 1.0,
            angle: 0.15,
            penumbra: 1.0,
        },
    ]
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct CameraDescriptor {
    pub position: Vec3,
    pub target: Vec3,
    /// Vertical field of view in degrees.
    pub fov: f32,
    pub near: f32,
    pub far: f32,
}

impl Default for CameraDescriptor {
    fn default() -> Self {
        Self {
            position: Vec3::new(0.0, 0.0, 5.0),
            target: Vec3::ZERO,
            fov: 45.0,
            near: 0.1,
            far: 1000.0,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum LightDescriptor {
    Ambient {
        color: Vec3,
        intensity: f32,
    },
    Point {
        position: Vec3,
        color: Vec3,
        intensity: f32,
    },
    /// `angle` is the cone half-angle in radians; `penumbra` in `[0, 1]` is
    /// the fraction of the cone that fades out towards the edge.
    Spot {
        position: Vec3,
        color: Vec3,
        intensity: f32,
        angle: f32,
        penumbra: f32,
    },
}

impl LightDescriptor {
    pub fn kind(&self) -> &'static str {
        match self {
            Self::Ambient { .. } => "ambient",
            Self::Point { .. } => "point",
            Self::Spot { .. } => "spot",
        }
    }
}

/// Orbit controller options. Fixed for the lifetime of a mounted scene.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct OrbitConfig {
    pub enable_zoom: bool,
    pub auto_rotate: bool,
    pub auto_rotate_speed: f32,
}

impl Default for OrbitConfig {
    fn default() -> Self {
        Self {
            enable_zoom: true,
            auto_rotate: false,
            auto_rotate_speed: 2.0,
        }
    }
}

/// Model reference plus the transform overrides passed through to the node.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ModelDescriptor {
    pub path: String,
    #[serde(default)]
    pub transform: Transform,
}

impl ModelDescriptor {
    pub fn new(path: impl Into<String>) -> Self {
        Self {
            path: path.into(),
            transform: Transform::IDENTITY,
        }
    }
}

/// Lighting environment presets. Each maps to a background colour and a tint
/// applied to ambient light.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum EnvironmentPreset {
    Apartment,
    City,
    Dawn,
    Forest,
    Lobby,
    Night,
    Park,
    Studio,
    Sunset,
    Warehouse,
}

impl EnvironmentPreset {
    pub const ALL: [Self; 10] = [
        Self::Apartment,
        Self::City,
        Self::Dawn,
        Self::Forest,
        Self::Lobby,
        Self::Night,
        Self::Park,
        Self::Studio,
        Self::Sunset,
        Self::Warehouse,
    ];

    pub fn from_name(name: &str) -> Option<Self> {
        Self::ALL
            .into_iter()
            .find(|preset| preset.name().eq_ignore_ascii_case(name.trim()))
    }

    pub fn name(self) -> &'static str {
        match self {
            Self::Apartment => "apartment",
            Self::City => "city",
            Self::Dawn => "dawn",
            Self::Forest => "forest",
            Self::Lobby => "lobby",
            Self::Night => "night",
            Self::Park => "park",
            Self::Studio => "studio",
            Self::Sunset => "sunset",
            Self::Warehouse => "warehouse",
        }
    }

    /// Linear RGB background colour.
    pub fn clear_color(self) -> Vec3 {
        match self {
            Self::Apartment => Vec3::new(0.32, 0.27, 0.22),
            Self::City => Vec3::new(0.28, 0.31, 0.36),
            Self::Dawn => Vec3::new(0.45, 0.36, 0.40),
            Self::Forest => Vec3::new(0.14, 0.22, 0.13),
            Self::Lobby => Vec3::new(0.36, 0.33, 0.28),
            Self::Night => Vec3::new(0.01, 0.01, 0.03),
            Self::Park => Vec3::new(0.40, 0.52, 0.62),
            Self::Studio => Vec3::new(0.55, 0.55, 0.55),
            Self::Sunset => Vec3::new(0.58, 0.30, 0.18),
            Self::Warehouse => Vec3::new(0.22, 0.21, 0.20),
        }
    }

    /// Multiplier applied to ambient light colour.
    pub fn ambient_tint(self) -> Vec3 {
        match self {
            Self::Night => Vec3::new(0.55, 0.6, 0.9),
            Self::Sunset | Self::Dawn => Vec3::new(1.0, 0.8, 0.7),
            Self::Forest | Self::Park => Vec3::new(0.85, 1.0, 0.85),
            _ => Vec3::ONE,
        }
    }
}

impl SceneDescriptor {
    /// Parses a scene description. Sections that are absent keep their
    /// defaults; `enabled="false"` on `<model>` or `<stars>` removes them.
    pub fn from_xml(xml: &str) -> Result<Self> {
        let document = Document::parse(xml).context("invalid scene XML")?;
        let root = document.root_element();
        if !root.has_tag_name("scene") {
            return Err(anyhow!(
                "expected <scene> root element, found <{}>",
                root.tag_name().name()
            ));
        }

        let mut scene = Self::default();

        if let Some(node) = child(&root, "camera") {
            let camera = &mut scene.camera;
            camera.position = parse_vec3(optional_text(&node, "position"), camera.position)?;
            camera.target = parse_vec3(optional_text(&node, "target"), camera.target)?;
            camera.fov = parse_f32(optional_text(&node, "fov"), camera.fov)?;
            camera.near = parse_f32(optional_text(&node, "near"), camera.near)?;
            camera.far = parse_f32(optional_text(&node, "far"), camera.far)?;
        }

        let lights = root
            .children()
            .filter(|node| node.has_tag_name("light"))
            .map(|node| parse_light(&node))
            .collect::<Result<Vec<_>>>()?;
        if !lights.is_empty() {
            scene.lights = lights;
        }

        if let Some(text) = child(&root, "environment").and_then(|node| node_text(&node)) {
            scene.environment = EnvironmentPreset::from_name(&text)
                .ok_or_else(|| anyhow!("unknown environment preset {text:?}"))?;
        }

        if let Some(node) = child(&root, "controls") {
            let controls = &mut scene.controls;
            controls.enable_zoom = parse_bool(optional_text(&node, "zoom"), controls.enable_zoom)?;
            controls.auto_rotate =
                parse_bool(optional_text(&node, "auto-rotate"), controls.auto_rotate)?;
            controls.auto_rotate_speed = parse_f32(
                optional_text(&node, "auto-rotate-speed"),
                controls.auto_rotate_speed,
            )?;
        }

        if let Some(node) = child(&root, "model") {
            scene.model = if is_disabled(&node) {
                None
            } else {
                Some(parse_model(&node)?)
            };
        }

        if let Some(node) = child(&root, "stars") {
            scene.stars = if is_disabled(&node) {
                None
            } else {
                Some(parse_stars(&node)?)
            };
        }

        Ok(scene)
    }
}

fn parse_light(node: &Node<'_, '_>) -> Result<LightDescriptor> {
    let kind = required_text(node, "type")?;
    let color = parse_color(optional_text(node, "color"), Vec3::ONE)?;
    let intensity = parse_f32(optional_text(node, "intensity"), 1.0)?;
    let light = match kind.as_str() {
        "ambient" => LightDescriptor::Ambient { color, intensity },
        "point" => LightDescriptor::Point {
            position: parse_vec3(optional_text(node, "position"), Vec3::ZERO)?,
            color,
            intensity,
        },
        "spot" => LightDescriptor::Spot {
            position: parse_vec3(optional_text(node, "position"), Vec3::ZERO)?,
            color,
            intensity,
            angle: parse_f32(optional_text(node, "angle"), std::f32::consts::FRAC_PI_3)?,
            penumbra: parse_f32(optional_text(node, "penumbra"), 0.0)?.clamp(0.0, 1.0),
        },
        other => return Err(anyhow!("unknown light type {other:?}")),
    };
    Ok(light)
}

fn parse_model(node: &Node<'_, '_>) -> Result<ModelDescriptor> {
    let path = optional_text(node, "path").unwrap_or_else(|| MODEL_PATH.to_string());
    let position = parse_vec3(optional_text(node, "position"), Vec3::ZERO)?;
    let rotation = parse_vec3(optional_text(node, "rotation"), Vec3::ZERO)?;
    let scale = parse_scale(optional_text(node, "scale"))?;
    Ok(ModelDescriptor {
        path,
        transform: Transform::from_euler_degrees(position, rotation, scale),
    })
}

fn parse_stars(node: &Node<'_, '_>) -> Result<StarFieldConfig> {
    let defaults = StarFieldConfig::default();
    Ok(StarFieldConfig {
        radius: parse_f32(optional_text(node, "radius"), defaults.radius)?,
        depth: parse_f32(optional_text(node, "depth"), defaults.depth)?,
        count: optional_text(node, "count")
            .map(|value| {
                value
                    .parse::<usize>()
                    .map_err(|err| anyhow!("failed to parse star count: {err}"))
            })
            .transpose()?
            .unwrap_or(defaults.count),
        factor: parse_f32(optional_text(node, "factor"), defaults.factor)?,
        saturation: parse_f32(optional_text(node, "saturation"), defaults.saturation)?,
        fade: parse_bool(optional_text(node, "fade"), defaults.fade)?,
        speed: parse_f32(optional_text(node, "speed"), defaults.speed)?,
        seed: defaults.seed,
    })
}

fn child<'a, 'input>(node: &Node<'a, 'input>, tag: &str) -> Option<Node<'a, 'input>> {
    node.children().find(|child| child.has_tag_name(tag))
}

fn is_disabled(node: &Node<'_, '_>) -> bool {
    node.attribute("enabled")
        .map(|value| value.trim().eq_ignore_ascii_case("false"))
        .unwrap_or(false)
}

fn node_text(node: &Node<'_, '_>) -> Option<String> {
    node.text()
        .map(str::trim)
        .filter(|text| !text.is_empty())
        .map(str::to_string)
}

fn required_text(node: &Node<'_, '_>, tag: &str) -> Result<String> {
    optional_text(node, tag).ok_or_else(|| anyhow!("<{tag}> tag is missing"))
}

fn optional_text(node: &Node<'_, '_>, tag: &str) -> Option<String> {
    child(node, tag).and_then(|child| node_text(&child))
}

fn parse_components(value: &str, what: &str) -> Result<Vec<f32>> {
    value
        .split_whitespace()
        .map(|component| {
            component
                .parse::<f32>()
                .map_err(|err| anyhow!("invalid {what} component {component:?}: {err}"))
        })
        .collect()
}

fn parse_vec3(value: Option<String>, default: Vec3) -> Result<Vec3> {
    let Some(value) = value else {
        return Ok(default);
    };
    match parse_components(&value, "vector")?.as_slice() {
        [x, y, z] => Ok(Vec3::new(*x, *y, *z)),
        _ => Err(anyhow!("vector {value:?} must have three components")),
    }
}

fn parse_scale(value: Option<String>) -> Result<Vec3> {
    let Some(value) = value else {
        return Ok(Vec3::ONE);
    };
    match parse_components(&value, "scale")?.as_slice() {
        [uniform] => Ok(Vec3::splat(*uniform)),
        [x, y, z] => Ok(Vec3::new(*x, *y, *z)),
        _ => Err(anyhow!("scale {value:?} must have one or three components")),
    }
}

/// Accepts `#rrggbb` or three 0-255 components.
fn parse_color(value: Option<String>, default: Vec3) -> Result<Vec3> {
    let Some(value) = value else {
        return Ok(default);
    };
    if let Some(hex) = value.strip_prefix('#') {
        if hex.len() != 6 || !hex.is_ascii() {
            return Err(anyhow!("colour {value:?} must have six hex digits"));
        }
        let channel = |range: std::ops::Range<usize>| -> Result<f32> {
            let byte = u8::from_str_radix(&hex[range], 16)
                .map_err(|err| anyhow!("invalid colour {value:?}: {err}"))?;
            Ok(byte as f32 / 255.0)
        };
        return Ok(Vec3::new(channel(0..2)?, channel(2..4)?, channel(4..6)?));
    }
    match parse_components(&value, "colour")?.as_slice() {
        [r, g, b] => Ok(Vec3::new(r / 255.0, g / 255.0, b / 255.0)),
        _ => Err(anyhow!("colour {value:?} must have three components")),
    }
}

fn parse_f32(value: Option<String>, default: f32) -> Result<f32> {
    match value {
        Some(value) => value
            .parse::<f32>()
            .map_err(|err| anyhow!("failed to parse float {value:?}: {err}")),
        None => Ok(default),
    }
}

fn parse_bool(value: Option<String>, default: bool) -> Result<bool> {
    match value.as_deref() {
        None => Ok(default),
        Some("true" | "yes" | "1") => Ok(true),
        Some("false" | "no" | "0") => Ok(false),
        Some(other) => Err(anyhow!("failed to parse boolean {other:?}")),
    }
}

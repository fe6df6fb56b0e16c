use std::sync::Arc;

use glam::{Mat4, Vec3};
use log::debug;

use crate::assets::{AssetLoader, AssetState, SceneAsset};
use crate::controls::OrbitControls;
use crate::error::AssetLoadError;
use crate::scene::{CameraDescriptor, EnvironmentPreset, LightDescriptor, SceneDescriptor};
use crate::stars::StarField;
use crate::transform::Transform;

/// What occupies the model's place in the scene.
#[derive(Debug, Clone)]
pub enum AssetSlot {
    /// The descriptor names no model.
    None,
    /// The model is still loading; nothing is drawn in its place.
    Fallback,
    Inserted,
    /// Loading failed. The rest of the scene is unaffected.
    Failed(AssetLoadError),
}

impl AssetSlot {
    pub fn label(&self) -> &'static str {
        match self {
            Self::None => "none",
            Self::Fallback => "fallback",
            Self::Inserted => "inserted",
            Self::Failed(_) => "failed",
        }
    }
}

#[derive(Debug, Clone)]
pub enum SceneNode {
    Primitive {
        asset: Arc<SceneAsset>,
        transform: Transform,
    },
    Stars(Arc<StarField>),
}

/// Flattened, renderable view of a scene descriptor at one point in time.
#[derive(Debug, Clone)]
pub struct SceneGraph {
    pub camera: CameraDescriptor,
    pub lights: Vec<LightDescriptor>,
    pub environment: EnvironmentPreset,
    pub nodes: Vec<SceneNode>,
    pub slot: AssetSlot,
}

impl SceneGraph {
    pub fn primitive(&self) -> Option<(&Arc<SceneAsset>, &Transform)> {
        self.nodes.iter().find_map(|node| match node {
            SceneNode::Primitive { asset, transform } => Some((asset, transform)),
            SceneNode::Stars(_) => None,
        })
    }

    pub fn stars(&self) -> Option<&StarField> {
        self.nodes.iter().find_map(|node| match node {
            SceneNode::Stars(field) => Some(field.as_ref()),
            SceneNode::Primitive { .. } => None,
        })
    }

    pub fn projection(&self, aspect: f32) -> Mat4 {
        Mat4::perspective_rh(
            self.camera.fov.to_radians(),
            aspect.max(f32::EPSILON),
            self.camera.near,
            self.camera.far,
        )
    }

    /// Sum of ambient light contributions tinted by the environment.
    pub fn ambient(&self) -> Vec3 {
        let direct = self
            .lights
            .iter()
            .filter_map(|light| match light {
                LightDescriptor::Ambient { color, intensity } => Some(*color * *intensity),
                _ => None,
            })
            .fold(Vec3::ZERO, |acc, c| acc + c);
        direct * self.environment.ambient_tint()
    }
}

/// Builds scene graphs from a descriptor and the current asset state.
pub struct SceneComposer {
    descriptor: SceneDescriptor,
    stars: Option<Arc<StarField>>,
}

impl SceneComposer {
    pub fn new(descriptor: SceneDescriptor) -> Self {
        let stars = descriptor
            .stars
            .map(|config| Arc::new(StarField::generate(config)));
        Self { descriptor, stars }
    }

    pub fn descriptor(&self) -> &SceneDescriptor {
        &self.descriptor
    }

    pub fn model_path(&self) -> Option<&str> {
        self.descriptor.model.as_ref().map(|model| model.path.as_str())
    }

    /// Fresh controls positioned at the descriptor's camera.
    pub fn controls(&self) -> OrbitControls {
        OrbitControls::new(&self.descriptor.camera, self.descriptor.controls)
    }

    /// Starts loading the model, if any, without waiting for it.
    pub fn preload(&self, loader: &AssetLoader) {
        if let Some(path) = self.model_path() {
            loader.preload(path);
        }
    }

    /// Asks `loader` for the model and composes the result.
    pub fn compose_from(&self, loader: &AssetLoader) -> SceneGraph {
        match self.model_path() {
            Some(path) => self.compose(&loader.load(path)),
            None => self.compose(&AssetState::Pending),
        }
    }

    pub fn compose(&self, state: &AssetState) -> SceneGraph {
        let mut nodes = Vec::with_capacity(2);

        let slot = match (&self.descriptor.model, state) {
            (None, _) => AssetSlot::None,
            (Some(_), AssetState::Pending) => AssetSlot::Fallback,
            (Some(model), AssetState::Ready(asset)) => {
                nodes.push(SceneNode::Primitive {
                    asset: Arc::clone(asset),
                    transform: model.transform,
                });
                AssetSlot::Inserted
            }
            (Some(_), AssetState::Failed(err)) => AssetSlot::Failed(err.clone()),
        };

        if let Some(stars) = &self.stars {
            nodes.push(SceneNode::Stars(Arc::clone(stars)));
        }

        debug!("composed scene: model {}, {} nodes", slot.label(), nodes.len());

        SceneGraph {
            camera: self.descriptor.camera,
            lights: self.descriptor.lights.clone(),
            environment: self.descriptor.environment,
            nodes,
            slot,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::assets::{FetchMode, MemorySource, MODEL_PATH};
    use crate::scene::ModelDescriptor;
    use crate::stars::StarFieldConfig;
    use std::sync::atomic::{AtomicUsize, Ordering};

    const TRIANGLE: &str = "v 0 0 0\nv 1 0 0\nv 0 1 0\nf 1 2 3\n";

    fn descriptor() -> SceneDescriptor {
        SceneDescriptor {
            stars: Some(StarFieldConfig {
                count: 16,
                ..StarFieldConfig::default()
            }),
            ..SceneDescriptor::default()
        }
    }

    #[test]
    fn pending_asset_uses_fallback() {
        let composer = SceneComposer::new(descriptor());
        let graph = composer.compose(&AssetState::Pending);
        assert!(matches!(graph.slot, AssetSlot::Fallback));
        assert!(graph.primitive().is_none());
        assert_eq!(graph.stars().map(StarField::len), Some(16));
        assert_eq!(graph.lights.len(), 2);
    }

    #[test]
    fn ready_asset_is_inserted_with_transform() {
        let mut descriptor = descriptor();
        let transform = Transform::from_position(Vec3::new(0.0, -1.0, 0.0)).with_uniform_scale(2.0);
        descriptor.model = Some(ModelDescriptor {
            path: MODEL_PATH.to_string(),
            transform,
        });
        let composer = SceneComposer::new(descriptor);

        let loader = AssetLoader::new(
            MemorySource::new().with_file(MODEL_PATH, TRIANGLE),
            FetchMode::Deferred,
        );
        assert!(matches!(composer.compose_from(&loader).slot, AssetSlot::Fallback));
        loader.pump();

        let graph = composer.compose_from(&loader);
        assert!(matches!(graph.slot, AssetSlot::Inserted));
        let (asset, placed) = graph.primitive().expect("primitive");
        assert_eq!(asset.path(), MODEL_PATH);
        assert_eq!(*placed, transform);
    }

    #[test]
    fn failed_asset_keeps_the_rest_of_the_scene() {
        let composer = SceneComposer::new(descriptor());
        let loader = AssetLoader::new(MemorySource::new(), FetchMode::Deferred);
        loader.preload(MODEL_PATH);
        loader.pump();

        let graph = composer.compose_from(&loader);
        match &graph.slot {
            AssetSlot::Failed(err) => assert_eq!(err.path(), MODEL_PATH),
            other => panic!("unexpected slot {other:?}"),
        }
        assert!(graph.primitive().is_none());
        assert!(graph.stars().is_some());
        assert_eq!(graph.environment, EnvironmentPreset::Night);
    }

    struct FailureLog {
        path: &'static str,
        hits: AtomicUsize,
    }

    impl log::Log for FailureLog {
        fn enabled(&self, metadata: &log::Metadata<'_>) -> bool {
            metadata.level() <= log::Level::Warn
        }

        fn log(&self, record: &log::Record<'_>) {
            if self.enabled(record.metadata()) && record.args().to_string().contains(self.path) {
                self.hits.fetch_add(1, Ordering::SeqCst);
            }
        }

        fn flush(&self) {}
    }

    static FAILURE_LOG: FailureLog = FailureLog {
        path: "/Model/logged-once.obj",
        hits: AtomicUsize::new(0),
    };

    #[test]
    fn failed_asset_is_reported_once_across_frames() {
        if log::set_logger(&FAILURE_LOG).is_ok() {
            log::set_max_level(log::LevelFilter::Trace);
        }

        let mut descriptor = descriptor();
        descriptor.model = Some(ModelDescriptor {
            path: FAILURE_LOG.path.to_string(),
            transform: Transform::default(),
        });
        let composer = SceneComposer::new(descriptor);
        let loader = AssetLoader::new(MemorySource::new(), FetchMode::Deferred);
        composer.preload(&loader);
        loader.pump();

        for _ in 0..60 {
            assert!(matches!(composer.compose_from(&loader).slot, AssetSlot::Failed(_)));
        }
        assert_eq!(FAILURE_LOG.hits.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn no_model_means_empty_slot() {
        let composer = SceneComposer::new(SceneDescriptor {
            model: None,
            stars: None,
            ..SceneDescriptor::default()
        });
        let graph = composer.compose(&AssetState::Pending);
        assert!(matches!(graph.slot, AssetSlot::None));
        assert!(graph.nodes.is_empty());
    }

    #[test]
    fn ambient_light_sums_and_tints() {
        let graph = SceneComposer::new(SceneDescriptor {
            stars: None,
            ..SceneDescriptor::default()
        })
        .compose(&AssetState::Pending);
        let expected = Vec3::splat(0.5) * EnvironmentPreset::Night.ambient_tint();
        assert!((graph.ambient() - expected).length() < 1e-6);
    }
}

use glam::Vec3;

use crate::composer::{AssetSlot, SceneGraph};
use crate::controls::OrbitControls;
use crate::page::MountedPage;
use crate::render::{CameraParams, LightParams, SpotCone};
use crate::scene::LightDescriptor;

pub fn camera_params(graph: &SceneGraph, controls: &OrbitControls, aspect: f32) -> CameraParams {
    CameraParams {
        view_proj: graph.projection(aspect) * controls.view_matrix(),
        position: controls.camera_position(),
    }
}

/// Picks the first spot or point light as the key light; ambient lights are
/// summed into the ambient term.
pub fn light_params(graph: &SceneGraph, target: Vec3) -> LightParams {
    let ambient = graph.ambient();
    graph
        .lights
        .iter()
        .find_map(|light| match *light {
            LightDescriptor::Spot {
                position,
                color,
                intensity,
                angle,
                penumbra,
            } => Some(LightParams {
                position,
                color,
                intensity,
                ambient,
                spot: Some(SpotCone::new(position, target, angle, penumbra)),
            }),
            LightDescriptor::Point {
                position,
                color,
                intensity,
            } => Some(LightParams {
                position,
                color,
                intensity,
                ambient,
                spot: None,
            }),
            LightDescriptor::Ambient { .. } => None,
        })
        .unwrap_or(LightParams {
            position: Vec3::new(3.0, 5.0, -3.0),
            color: Vec3::ONE,
            intensity: 0.0,
            ambient,
            spot: None,
        })
}

pub fn describe_scene(graph: &SceneGraph) -> Vec<String> {
    let mut lines = vec![format!(
        "Scene: camera ({:.1}, {:.1}, {:.1}) fov {}, environment {}",
        graph.camera.position.x,
        graph.camera.position.y,
        graph.camera.position.z,
        graph.camera.fov,
        graph.environment.name()
    )];
    for light in &graph.lights {
        lines.push(format!(" - light {}", light.kind()));
    }
    let model = match (&graph.slot, graph.primitive()) {
        (AssetSlot::Inserted, Some((asset, _))) => format!(
            "model {} ({} vertices, {} triangles)",
            asset.path(),
            asset.mesh().vertex_count(),
            asset.mesh().triangle_count()
        ),
        (AssetSlot::Failed(err), _) => format!("model failed: {err}"),
        (slot, _) => format!("model {}", slot.label()),
    };
    lines.push(format!(" - {model}"));
    if let Some(stars) = graph.stars() {
        lines.push(format!(" - {} stars", stars.len()));
    }
    lines
}

pub fn print_final_state(page: &MountedPage<'_>) {
    let funding = page.funding();
    let progress = funding.progress();
    println!("Final page state:");
    println!(
        " - raised {} of {} ({})",
        progress.current_label, progress.goal_label, progress.bar_width
    );
    match page.carousel().current() {
        Some(quote) => println!(
            " - quote {} by {}",
            page.carousel().index() + 1,
            quote.author
        ),
        None => println!(" - no quotes"),
    }
    for line in describe_scene(&page.scene()) {
        println!(" {line}");
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::assets::AssetState;
    use crate::composer::SceneComposer;
    use crate::scene::SceneDescriptor;

    fn graph(descriptor: SceneDescriptor) -> SceneGraph {
        SceneComposer::new(descriptor).compose(&AssetState::Pending)
    }

    #[test]
    fn default_scene_uses_spot_as_key_light() {
        let graph = graph(SceneDescriptor {
            stars: None,
            ..SceneDescriptor::default()
        });
        let light = light_params(&graph, Vec3::ZERO);
        assert_eq!(light.position, Vec3::splat(10.0));
        assert!(light.spot.is_some());
        assert!(light.ambient.x > 0.0);
    }

    #[test]
    fn ambient_only_scene_has_no_key_light() {
        let graph = graph(SceneDescriptor {
            lights: vec![LightDescriptor::Ambient {
                color: Vec3::ONE,
                intensity: 1.0,
            }],
            stars: None,
            ..SceneDescriptor::default()
        });
        let light = light_params(&graph, Vec3::ZERO);
        assert_eq!(light.intensity, 0.0);
        assert!(light.spot.is_none());
    }

    #[test]
    fn camera_sits_at_controls_position() {
        let descriptor = SceneDescriptor {
            stars: None,
            ..SceneDescriptor::default()
        };
        let composer = SceneComposer::new(descriptor);
        let graph = composer.compose(&AssetState::Pending);
        let controls = composer.controls();
        let camera = camera_params(&graph, &controls, 16.0 / 9.0);
        assert!((camera.position - Vec3::new(0.0, 0.0, 5.0)).length() < 1e-4);
        let clip = camera.view_proj * Vec3::ZERO.extend(1.0);
        assert!(clip.x.abs() < 1e-4 && clip.y.abs() < 1e-4);
    }

    #[test]
    fn describes_pending_model() {
        let lines = describe_scene(&graph(SceneDescriptor::default()));
        assert!(lines[0].contains("environment night"));
        assert!(lines.iter().any(|line| line.contains("model fallback")));
        assert!(lines.iter().any(|line| line.contains("5000 stars")));
    }
}

use anyhow::{anyhow, Result};
use glam::{Mat4, Vec3, Vec4};
use wasm_bindgen::{JsCast, JsValue};
use web_sys::{CanvasRenderingContext2d, HtmlCanvasElement};

use crate::composer::SceneGraph;

use super::common::{CameraParams, LightParams, MODEL_COLOR};

/// Canvas 2D projection of a scene graph for WebAssembly builds.
pub struct Renderer {
    canvas: HtmlCanvasElement,
    context: CanvasRenderingContext2d,
    size: (u32, u32),
    view_proj: Mat4,
    light: Option<LightParams>,
    twinkle: f32,
}

impl Renderer {
    /// Creates a renderer that draws into the provided HTML canvas element.
    pub fn new(canvas: HtmlCanvasElement) -> Result<Self> {
        let context = canvas
            .get_context("2d")
            .map_err(|err| anyhow!("failed to query canvas context: {err:?}"))?
            .ok_or_else(|| anyhow!("canvas does not support 2d context"))?
            .dyn_into::<CanvasRenderingContext2d>()
            .map_err(|_| anyhow!("failed to cast canvas context"))?;

        let size = (canvas.width(), canvas.height());
        Ok(Self {
            canvas,
            context,
            size,
            view_proj: Mat4::IDENTITY,
            light: None,
            twinkle: 1.0,
        })
    }

    pub fn aspect(&self) -> f32 {
        if self.size.1 == 0 {
            1.0
        } else {
            self.size.0 as f32 / self.size.1 as f32
        }
    }

    /// Updates the canvas dimensions to match the browser layout.
    pub fn resize(&mut self, new_size: (u32, u32)) {
        if new_size.0 == 0 || new_size.1 == 0 {
            return;
        }
        self.size = new_size;
        self.canvas.set_width(new_size.0);
        self.canvas.set_height(new_size.1);
    }

    pub fn update_globals(&mut self, camera: &CameraParams, light: &LightParams, twinkle: f32) {
        self.view_proj = camera.view_proj;
        self.light = Some(light.clone());
        self.twinkle = twinkle;
    }

    pub fn render(&mut self, graph: &SceneGraph) -> Result<(), JsValue> {
        let clear = graph.environment.clear_color();
        self.context.set_fill_style(&css_color(clear).into());
        self.context
            .fill_rect(0.0, 0.0, f64::from(self.size.0), f64::from(self.size.1));

        if let Some(stars) = graph.stars() {
            for star in stars.stars() {
                if let Some((x, y, _)) = self.project(star.position) {
                    let color = star.color * stars.brightness(star) * self.twinkle;
                    self.context.set_fill_style(&css_color(color).into());
                    let size = f64::from((star.size * 0.5).max(1.0));
                    self.context.fill_rect(x, y, size, size);
                }
            }
        }

        if let Some((asset, transform)) = graph.primitive() {
            let model = transform.to_matrix();
            let mesh = asset.mesh();
            let positions: Vec<Vec3> = mesh
                .positions()
                .map(|point| model.transform_point3(point))
                .collect();

            let mut faces: Vec<(f64, [(f64, f64); 3], f32)> = mesh
                .indices
                .chunks_exact(3)
                .filter_map(|tri| {
                    let corners = [
                        positions.get(tri[0] as usize)?,
                        positions.get(tri[1] as usize)?,
                        positions.get(tri[2] as usize)?,
                    ];
                    let a = self.project(*corners[0])?;
                    let b = self.project(*corners[1])?;
                    let c = self.project(*corners[2])?;
                    let normal = (*corners[1] - *corners[0])
                        .cross(*corners[2] - *corners[0])
                        .normalize_or_zero();
                    let center = (*corners[0] + *corners[1] + *corners[2]) / 3.0;
                    let depth = (a.2 + b.2 + c.2) / 3.0;
                    Some((
                        depth,
                        [(a.0, a.1), (b.0, b.1), (c.0, c.1)],
                        self.shade(normal, center),
                    ))
                })
                .collect();

            faces.sort_by(|a, b| b.0.total_cmp(&a.0));
            for (_, points, shade) in faces {
                self.context
                    .set_fill_style(&css_color(MODEL_COLOR * shade).into());
                self.context.begin_path();
                self.context.move_to(points[0].0, points[0].1);
                self.context.line_to(points[1].0, points[1].1);
                self.context.line_to(points[2].0, points[2].1);
                self.context.close_path();
                self.context.fill();
            }
        }

        Ok(())
    }

    /// Screen position and NDC depth, or `None` behind the camera.
    fn project(&self, point: Vec3) -> Option<(f64, f64, f64)> {
        let clip: Vec4 = self.view_proj * point.extend(1.0);
        if clip.w <= f32::EPSILON {
            return None;
        }
        let ndc = clip.truncate() / clip.w;
        let x = (f64::from(ndc.x) + 1.0) * 0.5 * f64::from(self.size.0);
        let y = (1.0 - f64::from(ndc.y)) * 0.5 * f64::from(self.size.1);
        Some((x, y, f64::from(ndc.z)))
    }

    fn shade(&self, normal: Vec3, point: Vec3) -> f32 {
        let Some(light) = &self.light else {
            return 1.0;
        };
        let to_light = (light.position - point).normalize_or_zero();
        let mut diffuse = normal.dot(to_light).abs();
        if let Some(cone) = &light.spot {
            diffuse *= cone.attenuation(light.position, point);
        }
        (light.ambient.x + diffuse * light.intensity).clamp(0.0, 1.0)
    }
}

fn css_color(color: Vec3) -> String {
    let channel = |value: f32| (value.clamp(0.0, 1.0) * 255.0).round() as u8;
    format!(
        "rgb({}, {}, {})",
        channel(color.x),
        channel(color.y),
        channel(color.z)
    )
}

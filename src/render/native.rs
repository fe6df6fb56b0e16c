use std::collections::HashMap;
use std::num::NonZeroU64;
use std::sync::Arc;

use anyhow::{anyhow, Context, Result};
use bytemuck::{bytes_of, Pod, Zeroable};
use glam::{Mat3, Mat4};
use log::{debug, info};
use wgpu::util::DeviceExt;
use winit::dpi::PhysicalSize;
use winit::window::{Window, WindowId};

use crate::composer::SceneGraph;
use crate::mesh::{MeshData, VERTEX_STRIDE};
use crate::stars::StarField;

use super::common::{CameraParams, LightParams, MODEL_COLOR};

/// GPU view of a composed scene. Every GPU resource it creates lives exactly
/// as long as the renderer.
pub struct Renderer {
    window: Arc<Window>,
    surface: wgpu::Surface<'static>,
    device: wgpu::Device,
    queue: wgpu::Queue,
    config: wgpu::SurfaceConfiguration,
    size: PhysicalSize<u32>,
    depth: DepthBuffer,
    mesh_pipeline: wgpu::RenderPipeline,
    star_pipeline: wgpu::RenderPipeline,
    global_buffer: wgpu::Buffer,
    global_bind_group: wgpu::BindGroup,
    object_buffer: wgpu::Buffer,
    object_bind_group: wgpu::BindGroup,
    mesh_cache: HashMap<String, MeshBuffers>,
    stars: Option<MeshBuffers>,
}

impl Renderer {
    /// Initializes the GPU renderer for the provided window.
    pub async fn new(window: Arc<Window>) -> Result<Self> {
        let size = window.inner_size();
        if size.width == 0 || size.height == 0 {
            return Err(anyhow!("window has zero area"));
        }

        let instance = wgpu::Instance::new(&wgpu::InstanceDescriptor {
            backends: wgpu::Backends::PRIMARY,
            ..Default::default()
        });
        let surface = instance.create_surface(Arc::clone(&window))?;

        let adapter = instance
            .request_adapter(&wgpu::RequestAdapterOptions {
                power_preference: wgpu::PowerPreference::HighPerformance,
                compatible_surface: Some(&surface),
                force_fallback_adapter: false,
            })
            .await
            .context("failed to acquire GPU adapter")?;

        let (device, queue) = adapter
            .request_device(
                &wgpu::DeviceDescriptor {
                    label: Some("scene-device"),
                    ..Default::default()
                },
                None,
            )
            .await
            .context("failed to create GPU device")?;

        let surface_caps = surface.get_capabilities(&adapter);
        let surface_format = surface_caps
            .formats
            .iter()
            .find(|format| format.is_srgb())
            .or_else(|| surface_caps.formats.first())
            .copied()
            .context("surface reports no texture formats")?;
        let alpha_mode = surface_caps
            .alpha_modes
            .first()
            .copied()
            .unwrap_or(wgpu::CompositeAlphaMode::Auto);

        let config = wgpu::SurfaceConfiguration {
            usage: wgpu::TextureUsages::RENDER_ATTACHMENT,
            format: surface_format,
            width: size.width,
            height: size.height,
            present_mode: wgpu::PresentMode::AutoVsync,
            desired_maximum_frame_latency: 2,
            alpha_mode,
            view_formats: vec![],
        };
        surface.configure(&device, &config);

        let depth = DepthBuffer::create(&device, config.width, config.height);

        let shader = device.create_shader_module(wgpu::ShaderModuleDescriptor {
            label: Some("scene-shader"),
            source: wgpu::ShaderSource::Wgsl(SHADER.into()),
        });

        let global_layout = uniform_layout::<GlobalUniform>(&device, "global-bind-layout")?;
        let object_layout = uniform_layout::<ObjectConstants>(&device, "object-bind-layout")?;

        let pipeline_layout = device.create_pipeline_layout(&wgpu::PipelineLayoutDescriptor {
            label: Some("scene-pipeline-layout"),
            bind_group_layouts: &[&global_layout, &object_layout],
            push_constant_ranges: &[],
        });

        let global_buffer = device.create_buffer(&wgpu::BufferDescriptor {
            label: Some("global-uniform"),
            size: std::mem::size_of::<GlobalUniform>() as u64,
            usage: wgpu::BufferUsages::UNIFORM | wgpu::BufferUsages::COPY_DST,
            mapped_at_creation: false,
        });
        let global_bind_group = device.create_bind_group(&wgpu::BindGroupDescriptor {
            label: Some("global-bind-group"),
            layout: &global_layout,
            entries: &[wgpu::BindGroupEntry {
                binding: 0,
                resource: global_buffer.as_entire_binding(),
            }],
        });

        // A single model is drawn per frame, so one object slot suffices.
        let object_buffer = device.create_buffer(&wgpu::BufferDescriptor {
            label: Some("object-uniform"),
            size: std::mem::size_of::<ObjectConstants>() as u64,
            usage: wgpu::BufferUsages::UNIFORM | wgpu::BufferUsages::COPY_DST,
            mapped_at_creation: false,
        });
        let object_bind_group = device.create_bind_group(&wgpu::BindGroupDescriptor {
            label: Some("object-bind-group"),
            layout: &object_layout,
            entries: &[wgpu::BindGroupEntry {
                binding: 0,
                resource: object_buffer.as_entire_binding(),
            }],
        });

        let mesh_pipeline = create_pipeline(
            &device,
            &pipeline_layout,
            &shader,
            surface_format,
            PipelineKind::Mesh,
        );
        let star_pipeline = create_pipeline(
            &device,
            &pipeline_layout,
            &shader,
            surface_format,
            PipelineKind::Stars,
        );

        info!(
            "renderer ready: {}x{} {:?}",
            size.width, size.height, surface_format
        );

        Ok(Self {
            window,
            surface,
            device,
            queue,
            config,
            size,
            depth,
            mesh_pipeline,
            star_pipeline,
            global_buffer,
            global_bind_group,
            object_buffer,
            object_bind_group,
            mesh_cache: HashMap::new(),
            stars: None,
        })
    }

    /// Returns the identifier of the window owned by the renderer.
    pub fn window_id(&self) -> WindowId {
        self.window.id()
    }

    /// Exposes the inner window for event handling.
    pub fn window(&self) -> &Window {
        &self.window
    }

    pub fn aspect(&self) -> f32 {
        if self.size.height == 0 {
            1.0
        } else {
            self.size.width as f32 / self.size.height as f32
        }
    }

    /// Resizes the swap chain to match the new dimensions.
    pub fn resize(&mut self, new_size: PhysicalSize<u32>) {
        if new_size.width == 0 || new_size.height == 0 {
            return;
        }
        self.size = new_size;
        self.config.width = new_size.width;
        self.config.height = new_size.height;
        self.surface.configure(&self.device, &self.config);
        self.depth = DepthBuffer::create(&self.device, new_size.width, new_size.height);
    }

    /// Updates the camera and lighting uniforms before rendering.
    pub fn update_globals(&self, camera: &CameraParams, light: &LightParams, twinkle: f32) {
        let (spot_direction, spot_cone) = match light.spot {
            Some(cone) => (cone.direction.extend(1.0), [cone.cos_outer, cone.cos_inner, 0.0, 0.0]),
            None => (glam::Vec4::ZERO, [0.0; 4]),
        };
        let uniform = GlobalUniform {
            view_proj: camera.view_proj.to_cols_array_2d(),
            camera_position: camera.position.extend(1.0).into(),
            light_position: light.position.extend(1.0).into(),
            light_color: light.color.extend(light.intensity).into(),
            ambient: light.ambient.extend(twinkle).into(),
            spot_direction: spot_direction.into(),
            spot_cone,
        };
        self.queue
            .write_buffer(&self.global_buffer, 0, bytes_of(&uniform));
    }

    /// Draws the scene graph. A pending model draws nothing in its place.
    pub fn render(&mut self, graph: &SceneGraph) -> Result<(), wgpu::SurfaceError> {
        if let Some(stars) = graph.stars() {
            if self.stars.is_none() {
                self.stars = Some(MeshBuffers::from_stars(&self.device, stars));
            }
        }

        let primitive = graph.primitive().map(|(asset, transform)| {
            if !self.mesh_cache.contains_key(asset.path()) {
                debug!("uploading mesh {}", asset.path());
                let buffers = MeshBuffers::from_mesh(&self.device, asset.mesh(), asset.path());
                self.mesh_cache.insert(asset.path().to_string(), buffers);
            }
            (asset.path().to_string(), transform.to_matrix())
        });

        if let Some((_, model)) = &primitive {
            let normal = Mat3::from_mat4(*model).inverse().transpose();
            let constants = ObjectConstants {
                model: model.to_cols_array_2d(),
                normal: mat3_to_3x4(normal),
                color: MODEL_COLOR.extend(1.0).into(),
            };
            self.queue
                .write_buffer(&self.object_buffer, 0, bytes_of(&constants));
        } else {
            let constants = ObjectConstants {
                model: Mat4::IDENTITY.to_cols_array_2d(),
                normal: mat3_to_3x4(Mat3::IDENTITY),
                color: [1.0; 4],
            };
            self.queue
                .write_buffer(&self.object_buffer, 0, bytes_of(&constants));
        }

        let output = self.surface.get_current_texture()?;
        let view = output
            .texture
            .create_view(&wgpu::TextureViewDescriptor::default());
        let mut encoder = self
            .device
            .create_command_encoder(&wgpu::CommandEncoderDescriptor {
                label: Some("scene-encoder"),
            });

        let clear = graph.environment.clear_color();
        let mut pass = encoder.begin_render_pass(&wgpu::RenderPassDescriptor {
            label: Some("scene-pass"),
            color_attachments: &[Some(wgpu::RenderPassColorAttachment {
                view: &view,
                resolve_target: None,
                ops: wgpu::Operations {
                    load: wgpu::LoadOp::Clear(wgpu::Color {
                        r: f64::from(clear.x),
                        g: f64::from(clear.y),
                        b: f64::from(clear.z),
                        a: 1.0,
                    }),
                    store: wgpu::StoreOp::Store,
                },
            })],
            depth_stencil_attachment: Some(wgpu::RenderPassDepthStencilAttachment {
                view: &self.depth.view,
                depth_ops: Some(wgpu::Operations {
                    load: wgpu::LoadOp::Clear(1.0),
                    store: wgpu::StoreOp::Store,
                }),
                stencil_ops: None,
            }),
            timestamp_writes: None,
            occlusion_query_set: None,
        });

        pass.set_bind_group(0, &self.global_bind_group, &[]);
        pass.set_bind_group(1, &self.object_bind_group, &[]);

        if let Some(mesh) = primitive
            .as_ref()
            .and_then(|(path, _)| self.mesh_cache.get(path))
        {
            pass.set_pipeline(&self.mesh_pipeline);
            pass.set_vertex_buffer(0, mesh.vertex.slice(..));
            pass.set_index_buffer(mesh.index.slice(..), wgpu::IndexFormat::Uint32);
            pass.draw_indexed(0..mesh.index_count, 0, 0..1);
        }

        if let Some(stars) = self.stars.as_ref().filter(|_| graph.stars().is_some()) {
            pass.set_pipeline(&self.star_pipeline);
            pass.set_vertex_buffer(0, stars.vertex.slice(..));
            pass.draw(0..stars.vertex_count, 0..1);
        }

        drop(pass);
        self.queue.submit(std::iter::once(encoder.finish()));
        output.present();
        Ok(())
    }
}

impl Drop for Renderer {
    fn drop(&mut self) {
        debug!(
            "releasing GPU resources: {} cached meshes, stars {}",
            self.mesh_cache.len(),
            self.stars.is_some()
        );
    }
}

fn uniform_layout<T>(device: &wgpu::Device, label: &str) -> Result<wgpu::BindGroupLayout> {
    let size = NonZeroU64::new(std::mem::size_of::<T>() as u64)
        .with_context(|| format!("{label} has a zero-sized uniform"))?;
    Ok(device.create_bind_group_layout(&wgpu::BindGroupLayoutDescriptor {
        label: Some(label),
        entries: &[wgpu::BindGroupLayoutEntry {
            binding: 0,
            visibility: wgpu::ShaderStages::VERTEX_FRAGMENT,
            ty: wgpu::BindingType::Buffer {
                ty: wgpu::BufferBindingType::Uniform,
                has_dynamic_offset: false,
                min_binding_size: Some(size),
            },
            count: None,
        }],
    }))
}

#[derive(Clone, Copy, PartialEq, Eq, Debug)]
enum PipelineKind {
    Mesh,
    Stars,
}

fn create_pipeline(
    device: &wgpu::Device,
    layout: &wgpu::PipelineLayout,
    shader: &wgpu::ShaderModule,
    format: wgpu::TextureFormat,
    kind: PipelineKind,
) -> wgpu::RenderPipeline {
    let (label, vs, fs, topology, depth_write, blend) = match kind {
        PipelineKind::Mesh => (
            "mesh-pipeline",
            "vs_main",
            "fs_main",
            wgpu::PrimitiveTopology::TriangleList,
            true,
            wgpu::BlendState::ALPHA_BLENDING,
        ),
        // Stars share the position + colour vertex layout of meshes.
        PipelineKind::Stars => (
            "star-pipeline",
            "vs_star",
            "fs_star",
            wgpu::PrimitiveTopology::PointList,
            false,
            wgpu::BlendState::ALPHA_BLENDING,
        ),
    };

    device.create_render_pipeline(&wgpu::RenderPipelineDescriptor {
        label: Some(label),
        layout: Some(layout),
        vertex: wgpu::VertexState {
            module: shader,
            entry_point: Some(vs),
            compilation_options: Default::default(),
            buffers: &[wgpu::VertexBufferLayout {
                array_stride: (VERTEX_STRIDE * std::mem::size_of::<f32>()) as u64,
                step_mode: wgpu::VertexStepMode::Vertex,
                attributes: &[
                    wgpu::VertexAttribute {
                        format: wgpu::VertexFormat::Float32x3,
                        offset: 0,
                        shader_location: 0,
                    },
                    wgpu::VertexAttribute {
                        format: wgpu::VertexFormat::Float32x3,
                        offset: (3 * std::mem::size_of::<f32>()) as u64,
                        shader_location: 1,
                    },
                ],
            }],
        },
        primitive: wgpu::PrimitiveState {
            topology,
            front_face: wgpu::FrontFace::Ccw,
            cull_mode: None,
            polygon_mode: wgpu::PolygonMode::Fill,
            ..Default::default()
        },
        depth_stencil: Some(wgpu::DepthStencilState {
            format: DepthBuffer::FORMAT,
            depth_write_enabled: depth_write,
            depth_compare: wgpu::CompareFunction::Less,
            stencil: Default::default(),
            bias: Default::default(),
        }),
        multisample: wgpu::MultisampleState::default(),
        fragment: Some(wgpu::FragmentState {
            module: shader,
            entry_point: Some(fs),
            compilation_options: Default::default(),
            targets: &[Some(wgpu::ColorTargetState {
                format,
                blend: Some(blend),
                write_mask: wgpu::ColorWrites::ALL,
            })],
        }),
        multiview: None,
        cache: None,
    })
}

fn mat3_to_3x4(matrix: Mat3) -> [[f32; 4]; 3] {
    let cols = matrix.to_cols_array();
    [
        [cols[0], cols[1], cols[2], 0.0],
        [cols[3], cols[4], cols[5], 0.0],
        [cols[6], cols[7], cols[8], 0.0],
    ]
}

/// Interleaves star positions and colours in the mesh vertex layout.
fn star_vertices(field: &StarField) -> Vec<f32> {
    field
        .stars()
        .iter()
        .flat_map(|star| {
            let color = star.color * field.brightness(star);
            [
                star.position.x,
                star.position.y,
                star.position.z,
                color.x,
                color.y,
                color.z,
            ]
        })
        .collect()
}

struct MeshBuffers {
    vertex: wgpu::Buffer,
    index: wgpu::Buffer,
    index_count: u32,
    vertex_count: u32,
}

impl MeshBuffers {
    fn from_mesh(device: &wgpu::Device, mesh: &MeshData, label: &str) -> Self {
        Self::from_parts(device, &mesh.vertices, &mesh.indices, label)
    }

    fn from_stars(device: &wgpu::Device, field: &StarField) -> Self {
        Self::from_parts(device, &star_vertices(field), &[], "stars")
    }

    fn from_parts(device: &wgpu::Device, vertices: &[f32], indices: &[u32], label: &str) -> Self {
        let vertex = device.create_buffer_init(&wgpu::util::BufferInitDescriptor {
            label: Some(&format!("{label}-vertices")),
            contents: bytemuck::cast_slice(vertices),
            usage: wgpu::BufferUsages::VERTEX,
        });
        // Zero-sized buffers are rejected, so empty index lists get a stub.
        let index_data: &[u32] = if indices.is_empty() { &[0] } else { indices };
        let index = device.create_buffer_init(&wgpu::util::BufferInitDescriptor {
            label: Some(&format!("{label}-indices")),
            contents: bytemuck::cast_slice(index_data),
            usage: wgpu::BufferUsages::INDEX,
        });
        Self {
            vertex,
            index,
            index_count: indices.len() as u32,
            vertex_count: (vertices.len() / VERTEX_STRIDE) as u32,
        }
    }
}

struct DepthBuffer {
    _texture: wgpu::Texture,
    view: wgpu::TextureView,
}

impl DepthBuffer {
    const FORMAT: wgpu::TextureFormat = wgpu::TextureFormat::Depth24Plus;

    fn create(device: &wgpu::Device, width: u32, height: u32) -> Self {
        let texture = device.create_texture(&wgpu::TextureDescriptor {
            label: Some("depth-texture"),
            size: wgpu::Extent3d {
                width: width.max(1),
                height: height.max(1),
                depth_or_array_layers: 1,
            },
            mip_level_count: 1,
            sample_count: 1,
            dimension: wgpu::TextureDimension::D2,
            format: Self::FORMAT,
            usage: wgpu::TextureUsages::RENDER_ATTACHMENT,
            view_formats: &[],
        });
        let view = texture.create_view(&wgpu::TextureViewDescriptor::default());
        Self {
            _texture: texture,
            view,
        }
    }
}

#[repr(C)]
#[derive(Clone, Copy, Pod, Zeroable)]
struct GlobalUniform {
    view_proj: [[f32; 4]; 4],
    camera_position: [f32; 4],
    light_position: [f32; 4],
    light_color: [f32; 4],
    ambient: [f32; 4],
    spot_direction: [f32; 4],
    spot_cone: [f32; 4],
}

#[repr(C)]
#[derive(Clone, Copy, Pod, Zeroable)]
struct ObjectConstants {
    model: [[f32; 4]; 4],
    normal: [[f32; 4]; 3],
    color: [f32; 4],
}

const SHADER: &str = r#"
struct GlobalUniform {
    view_proj: mat4x4<f32>,
    camera_position: vec4<f32>,
    light_position: vec4<f32>,
    // rgb colour, w intensity
    light_color: vec4<f32>,
    // rgb ambient, w star twinkle
    ambient: vec4<f32>,
    // xyz direction, w 1 when the key light is a spot
    spot_direction: vec4<f32>,
    // x cos outer, y cos inner
    spot_cone: vec4<f32>,
}

struct ObjectConstants {
    model: mat4x4<f32>,
    normal: mat3x4<f32>,
    color: vec4<f32>,
}

@group(0) @binding(0)
var<uniform> globals: GlobalUniform;

@group(1) @binding(0)
var<uniform> object: ObjectConstants;

struct VertexInput {
    @location(0) position: vec3<f32>,
    @location(1) attribute: vec3<f32>,
}

struct VertexOutput {
    @builtin(position) position: vec4<f32>,
    @location(0) world_pos: vec3<f32>,
    @location(1) attribute: vec3<f32>,
}

@vertex
fn vs_main(input: VertexInput) -> VertexOutput {
    var out: VertexOutput;
    let world_position = object.model * vec4<f32>(input.position, 1.0);
    out.position = globals.view_proj * world_position;
    out.world_pos = world_position.xyz;

    let world_normal = mat3x3<f32>(
        object.normal[0].xyz,
        object.normal[1].xyz,
        object.normal[2].xyz
    ) * input.attribute;

    out.attribute = normalize(world_normal);
    return out;
}

@fragment
fn fs_main(input: VertexOutput) -> @location(0) vec4<f32> {
    let light_dir = normalize(globals.light_position.xyz - input.world_pos);
    let normal = normalize(input.attribute);
    var diffuse = max(dot(normal, light_dir), 0.0);
    if (globals.spot_direction.w > 0.5) {
        let cos_angle = dot(-light_dir, normalize(globals.spot_direction.xyz));
        diffuse = diffuse * smoothstep(globals.spot_cone.x, globals.spot_cone.y, cos_angle);
    }
    let intensity = globals.light_color.w;
    let light = globals.ambient.rgb + diffuse * intensity * globals.light_color.rgb;
    return vec4<f32>(light * object.color.rgb, object.color.a);
}

@vertex
fn vs_star(input: VertexInput) -> VertexOutput {
    var out: VertexOutput;
    out.position = globals.view_proj * vec4<f32>(input.position, 1.0);
    out.world_pos = input.position;
    out.attribute = input.attribute;
    return out;
}

@fragment
fn fs_star(input: VertexOutput) -> @location(0) vec4<f32> {
    return vec4<f32>(input.attribute * globals.ambient.w, 1.0);
}
"#;

#[cfg(test)]
mod tests {
    use super::*;
    use crate::stars::StarFieldConfig;

    #[test]
    fn star_vertices_use_mesh_stride() {
        let field = StarField::generate(StarFieldConfig {
            count: 10,
            ..StarFieldConfig::default()
        });
        let vertices = star_vertices(&field);
        assert_eq!(vertices.len(), 10 * VERTEX_STRIDE);
        assert_eq!(vertices[0], field.stars()[0].position.x);
        let star = &field.stars()[0];
        let expected = star.color.x * field.brightness(star);
        assert!((vertices[3] - expected).abs() < 1e-6);
    }

    #[test]
    fn uniforms_match_wgsl_layout() {
        assert_eq!(std::mem::size_of::<GlobalUniform>(), 64 + 6 * 16);
        assert_eq!(std::mem::size_of::<ObjectConstants>(), 64 + 48 + 16);
    }
}

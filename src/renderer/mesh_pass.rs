//! Indexed triangle-mesh pass mirroring the viewport's representations.
//!
//! Every representation gets its own vertex/index/instance buffers and a
//! small uniform (model matrix, normal matrix, color). Sphere sets upload the
//! shared unit sphere once and draw it instanced, one center/radius per atom;
//! plain meshes draw a single identity instance. Solids are drawn first with
//! depth writes; translucent meshes follow back-to-front with depth testing
//! only. The orientation triad is drawn last in its own pass.

use bytemuck::{Pod, Zeroable};
use glam::{Mat4, Vec3};
use rustc_hash::FxHashMap;
use wgpu::util::DeviceExt;

use super::axes::AxesWidget;
use super::pipeline_util;
use crate::geometry::TriMesh;
use crate::gpu::{DepthTarget, RenderContext};
use crate::viewport::{Geometry, OrbitCamera, Representation, Viewport, VisualHandle};

#[repr(C)]
#[derive(Debug, Clone, Copy, Pod, Zeroable)]
struct MeshVertex {
    position: [f32; 3],
    normal: [f32; 3],
}

impl MeshVertex {
    const ATTRIBUTES: [wgpu::VertexAttribute; 2] =
        wgpu::vertex_attr_array![0 => Float32x3, 1 => Float32x3];

    fn layout() -> wgpu::VertexBufferLayout<'static> {
        wgpu::VertexBufferLayout {
            array_stride: size_of::<Self>() as wgpu::BufferAddress,
            step_mode: wgpu::VertexStepMode::Vertex,
            attributes: &Self::ATTRIBUTES,
        }
    }
}

/// Per-instance sphere placement: center in xyz, radius in w.
#[repr(C)]
#[derive(Debug, Clone, Copy, Pod, Zeroable)]
struct SphereInstance {
    center: [f32; 3],
    radius: f32,
}

impl SphereInstance {
    const IDENTITY: Self = Self {
        center: [0.0; 3],
        radius: 1.0,
    };

    const ATTRIBUTES: [wgpu::VertexAttribute; 1] =
        wgpu::vertex_attr_array![2 => Float32x4];

    fn layout() -> wgpu::VertexBufferLayout<'static> {
        wgpu::VertexBufferLayout {
            array_stride: size_of::<Self>() as wgpu::BufferAddress,
            step_mode: wgpu::VertexStepMode::Instance,
            attributes: &Self::ATTRIBUTES,
        }
    }
}

/// Byte sizes of the buffers one representation needs.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
struct BufferSizes {
    vertices: u64,
    indices: u64,
    instances: u64,
}

impl BufferSizes {
    fn of(geometry: &Geometry) -> Self {
        let (mesh, instances) = match geometry {
            Geometry::Mesh(mesh) => (mesh.as_ref(), 1),
            Geometry::Spheres(points) => (points.unit_sphere(), points.len()),
        };
        Self {
            vertices: (mesh.vertex_count() * size_of::<MeshVertex>()) as u64,
            indices: (mesh.triangle_count() * 3 * size_of::<u32>()) as u64,
            instances: (instances * size_of::<SphereInstance>()) as u64,
        }
    }

    fn largest(self) -> u64 {
        self.vertices.max(self.indices).max(self.instances)
    }
}

#[repr(C)]
#[derive(Debug, Clone, Copy, Pod, Zeroable)]
/// GPU camera uniform: view-projection, eye, and headlight direction.
pub(super) struct CameraUniform {
    pub(super) view_proj: [[f32; 4]; 4],
    eye: [f32; 3],
    _pad0: f32,
    light_dir: [f32; 3],
    _pad1: f32,
}

impl CameraUniform {
    pub(super) fn new(view_proj: Mat4, eye: Vec3, light_dir: Vec3) -> Self {
        Self {
            view_proj: view_proj.to_cols_array_2d(),
            eye: eye.to_array(),
            _pad0: 0.0,
            light_dir: light_dir.to_array(),
            _pad1: 0.0,
        }
    }

    fn from_camera(orbit: &OrbitCamera) -> Self {
        Self::new(orbit.view_proj(), orbit.camera.eye, orbit.forward())
    }
}

#[repr(C)]
#[derive(Debug, Clone, Copy, Pod, Zeroable)]
pub(super) struct MeshUniform {
    model: [[f32; 4]; 4],
    normal_matrix: [[f32; 4]; 4],
    color: [f32; 4],
}

impl MeshUniform {
    pub(super) fn new(model: Mat4, color: [f32; 4]) -> Self {
        let normal_matrix = if model.determinant().abs() > f32::EPSILON {
            model.inverse().transpose()
        } else {
            model
        };
        Self {
            model: model.to_cols_array_2d(),
            normal_matrix: normal_matrix.to_cols_array_2d(),
            color,
        }
    }

    fn from_representation(rep: &Representation) -> Self {
        Self::new(Mat4::from(rep.transform), rep.style.rgba())
    }
}

pub(super) struct GpuMesh {
    vertex_buffer: wgpu::Buffer,
    index_buffer: wgpu::Buffer,
    index_count: u32,
    instance_buffer: wgpu::Buffer,
    instance_count: u32,
    pub(super) uniform_buffer: wgpu::Buffer,
    bind_group: wgpu::BindGroup,
}

impl GpuMesh {
    pub(super) fn upload(
        device: &wgpu::Device,
        layout: &wgpu::BindGroupLayout,
        label: &str,
        geometry: &Geometry,
    ) -> Self {
        let (mesh, instances): (&TriMesh, Vec<SphereInstance>) = match geometry {
            Geometry::Mesh(mesh) => (mesh.as_ref(), vec![SphereInstance::IDENTITY]),
            Geometry::Spheres(points) => (
                points.unit_sphere(),
                points
                    .spheres()
                    .iter()
                    .map(|sphere| SphereInstance {
                        center: sphere.center.to_array(),
                        radius: sphere.radius,
                    })
                    .collect(),
            ),
        };
        let vertices: Vec<MeshVertex> = mesh
            .positions
            .iter()
            .zip(&mesh.normals)
            .map(|(p, n)| MeshVertex {
                position: p.to_array(),
                normal: n.to_array(),
            })
            .collect();
        let indices: Vec<u32> = mesh.triangles.iter().flatten().copied().collect();

        let vertex_buffer = device.create_buffer_init(&wgpu::util::BufferInitDescriptor {
            label: Some(&format!("{label} Vertices")),
            contents: bytemuck::cast_slice(&vertices),
            usage: wgpu::BufferUsages::VERTEX,
        });
        let index_buffer = device.create_buffer_init(&wgpu::util::BufferInitDescriptor {
            label: Some(&format!("{label} Indices")),
            contents: bytemuck::cast_slice(&indices),
            usage: wgpu::BufferUsages::INDEX,
        });
        let instance_buffer = device.create_buffer_init(&wgpu::util::BufferInitDescriptor {
            label: Some(&format!("{label} Instances")),
            contents: bytemuck::cast_slice(&instances),
            usage: wgpu::BufferUsages::VERTEX,
        });
        let uniform_buffer = device.create_buffer(&wgpu::BufferDescriptor {
            label: Some(&format!("{label} Uniform")),
            size: size_of::<MeshUniform>() as u64,
            usage: wgpu::BufferUsages::UNIFORM | wgpu::BufferUsages::COPY_DST,
            mapped_at_creation: false,
        });
        let bind_group = device.create_bind_group(&wgpu::BindGroupDescriptor {
            label: Some(&format!("{label} Bind Group")),
            layout,
            entries: &[wgpu::BindGroupEntry {
                binding: 0,
                resource: uniform_buffer.as_entire_binding(),
            }],
        });

        Self {
            vertex_buffer,
            index_buffer,
            index_count: indices.len() as u32,
            instance_buffer,
            instance_count: instances.len() as u32,
            uniform_buffer,
            bind_group,
        }
    }
}

fn create_mesh_pipeline(
    context: &RenderContext,
    label: &str,
    shader: &wgpu::ShaderModule,
    bind_group_layouts: &[&wgpu::BindGroupLayout],
    translucent: bool,
) -> wgpu::RenderPipeline {
    let pipeline_layout = context
        .device
        .create_pipeline_layout(&wgpu::PipelineLayoutDescriptor {
            label: Some(&format!("{label} Layout")),
            bind_group_layouts,
            push_constant_ranges: &[],
        });

    context
        .device
        .create_render_pipeline(&wgpu::RenderPipelineDescriptor {
            label: Some(label),
            layout: Some(&pipeline_layout),
            vertex: wgpu::VertexState {
                module: shader,
                entry_point: Some("vs_main"),
                buffers: &[MeshVertex::layout(), SphereInstance::layout()],
                compilation_options: Default::default(),
            },
            fragment: Some(wgpu::FragmentState {
                module: shader,
                entry_point: Some("fs_main"),
                targets: &pipeline_util::color_target(context.format(), translucent),
                compilation_options: Default::default(),
            }),
            primitive: wgpu::PrimitiveState {
                topology: wgpu::PrimitiveTopology::TriangleList,
                front_face: wgpu::FrontFace::Ccw,
                cull_mode: Some(wgpu::Face::Back),
                ..Default::default()
            },
            depth_stencil: Some(pipeline_util::depth_stencil_state(!translucent)),
            multisample: wgpu::MultisampleState::default(),
            multiview: None,
            cache: None,
        })
}

/// Draws every viewport representation.
pub struct MeshRenderer {
    opaque_pipeline: wgpu::RenderPipeline,
    translucent_pipeline: wgpu::RenderPipeline,
    camera_buffer: wgpu::Buffer,
    camera_bind_group: wgpu::BindGroup,
    mesh_layout: wgpu::BindGroupLayout,
    meshes: FxHashMap<VisualHandle, GpuMesh>,
    synced_revision: Option<u64>,
    depth: DepthTarget,
    axes: AxesWidget,
}

impl MeshRenderer {
    /// Create pipelines and the depth target for `context`'s surface.
    #[must_use]
    pub fn new(context: &RenderContext) -> Self {
        let device = &context.device;
        let shader = device.create_shader_module(wgpu::ShaderModuleDescriptor {
            label: Some("Mesh Shader"),
            source: wgpu::ShaderSource::Wgsl(
                include_str!("../../assets/shaders/mesh.wgsl").into(),
            ),
        });

        let camera_layout = pipeline_util::uniform_layout(device, "Camera Bind Group Layout");
        let mesh_layout = pipeline_util::uniform_layout(device, "Mesh Bind Group Layout");

        let camera_buffer = device.create_buffer(&wgpu::BufferDescriptor {
            label: Some("Camera Buffer"),
            size: size_of::<CameraUniform>() as u64,
            usage: wgpu::BufferUsages::UNIFORM | wgpu::BufferUsages::COPY_DST,
            mapped_at_creation: false,
        });
        let camera_bind_group = device.create_bind_group(&wgpu::BindGroupDescriptor {
            label: Some("Camera Bind Group"),
            layout: &camera_layout,
            entries: &[wgpu::BindGroupEntry {
                binding: 0,
                resource: camera_buffer.as_entire_binding(),
            }],
        });

        let layouts = [&camera_layout, &mesh_layout];
        let opaque_pipeline =
            create_mesh_pipeline(context, "Opaque Mesh Pipeline", &shader, &layouts, false);
        let translucent_pipeline =
            create_mesh_pipeline(context, "Translucent Mesh Pipeline", &shader, &layouts, true);
        let axes = AxesWidget::new(context, &camera_layout, &mesh_layout);

        let (width, height) = context.size();
        Self {
            opaque_pipeline,
            translucent_pipeline,
            camera_buffer,
            camera_bind_group,
            mesh_layout,
            meshes: FxHashMap::default(),
            synced_revision: None,
            depth: DepthTarget::new(device, width, height),
            axes,
        }
    }

    /// Recreate the depth target after a surface resize.
    pub fn resize(&mut self, context: &RenderContext) {
        let (width, height) = context.size();
        if self.depth.size() != (width, height) {
            self.depth = DepthTarget::new(&context.device, width, height);
        }
    }

    /// Upload new representations, drop removed ones, and refresh uniforms.
    pub fn sync(&mut self, context: &RenderContext, viewport: &Viewport) {
        if self.synced_revision != Some(viewport.revision()) {
            self.meshes.retain(|handle, _| viewport.contains(*handle));
            let limit = context.device.limits().max_buffer_size;
            for (handle, rep) in viewport.representations() {
                if rep.geometry.is_empty() || self.meshes.contains_key(&handle) {
                    continue;
                }
                let largest = BufferSizes::of(&rep.geometry).largest();
                if largest > limit {
                    log::error!(
                        "renderer: representation {} needs a {largest}-byte buffer, \
                         over the device limit of {limit}; not drawn",
                        handle.raw()
                    );
                    continue;
                }
                let label = format!("Mesh {}", handle.raw());
                let gpu =
                    GpuMesh::upload(&context.device, &self.mesh_layout, &label, &rep.geometry);
                let _ = self.meshes.insert(handle, gpu);
            }
            log::debug!(
                "renderer: synced revision {} ({} meshes)",
                viewport.revision(),
                self.meshes.len()
            );
            self.synced_revision = Some(viewport.revision());
        }

        context.queue.write_buffer(
            &self.camera_buffer,
            0,
            bytemuck::bytes_of(&CameraUniform::from_camera(&viewport.camera)),
        );
        self.axes.sync(context, &viewport.camera);
        for (handle, rep) in viewport.representations() {
            if let Some(gpu) = self.meshes.get(&handle) {
                context.queue.write_buffer(
                    &gpu.uniform_buffer,
                    0,
                    bytemuck::bytes_of(&MeshUniform::from_representation(rep)),
                );
            }
        }
    }

    /// Record the mesh pass into `encoder`, clearing `target` to
    /// `background`.
    pub fn render(
        &self,
        encoder: &mut wgpu::CommandEncoder,
        target: &wgpu::TextureView,
        viewport: &Viewport,
        background: [f32; 3],
    ) {
        let [r, g, b] = background;
        let mut pass = encoder.begin_render_pass(&wgpu::RenderPassDescriptor {
            label: Some("Mesh Pass"),
            color_attachments: &[Some(wgpu::RenderPassColorAttachment {
                view: target,
                depth_slice: None,
                resolve_target: None,
                ops: wgpu::Operations {
                    load: wgpu::LoadOp::Clear(wgpu::Color {
                        r: f64::from(r),
                        g: f64::from(g),
                        b: f64::from(b),
                        a: 1.0,
                    }),
                    store: wgpu::StoreOp::Store,
                },
            })],
            depth_stencil_attachment: Some(wgpu::RenderPassDepthStencilAttachment {
                view: &self.depth.view,
                depth_ops: Some(wgpu::Operations {
                    load: wgpu::LoadOp::Clear(1.0),
                    store: wgpu::StoreOp::Discard,
                }),
                stencil_ops: None,
            }),
            timestamp_writes: None,
            occlusion_query_set: None,
        });
        pass.set_bind_group(0, &self.camera_bind_group, &[]);

        let (translucent, solid): (Vec<_>, Vec<_>) = viewport
            .representations()
            .filter_map(|(h, rep)| self.meshes.get(&h).map(|gpu| (rep, gpu)))
            .partition(|(rep, _)| rep.style.is_translucent());

        pass.set_pipeline(&self.opaque_pipeline);
        for (_, gpu) in &solid {
            draw(&mut pass, gpu);
        }

        let eye = viewport.camera.camera.eye;
        let mut translucent: Vec<_> = translucent
            .into_iter()
            .map(|(rep, gpu)| (eye_distance(rep, eye), gpu))
            .collect();
        translucent.sort_by(|a, b| b.0.total_cmp(&a.0));
        pass.set_pipeline(&self.translucent_pipeline);
        for (_, gpu) in &translucent {
            draw(&mut pass, gpu);
        }
        drop(pass);

        self.axes.render(encoder, target, &self.depth, &self.opaque_pipeline);
    }
}

pub(super) fn draw(pass: &mut wgpu::RenderPass<'_>, gpu: &GpuMesh) {
    pass.set_bind_group(1, &gpu.bind_group, &[]);
    pass.set_vertex_buffer(0, gpu.vertex_buffer.slice(..));
    pass.set_vertex_buffer(1, gpu.instance_buffer.slice(..));
    pass.set_index_buffer(gpu.index_buffer.slice(..), wgpu::IndexFormat::Uint32);
    pass.draw_indexed(0..gpu.index_count, 0, 0..gpu.instance_count);
}

fn eye_distance(rep: &Representation, eye: Vec3) -> f32 {
    rep.world_bounds()
        .map_or(0.0, |bounds| bounds.center().distance_squared(eye))
}

#[cfg(test)]
mod tests {
    use glam::Affine3A;

    use super::*;

    #[test]
    fn uniform_layouts_match_shader() {
        assert_eq!(size_of::<CameraUniform>(), 96);
        assert_eq!(size_of::<MeshUniform>(), 144);
        assert_eq!(size_of::<MeshVertex>(), 24);
        assert_eq!(size_of::<SphereInstance>(), 16);
    }

    #[test]
    fn large_structures_upload_one_instance_per_atom() {
        // 58k atoms at the default tessellation once needed ~300 MiB of
        // vertices, beyond the default 256 MiB buffer limit.
        let positions: Vec<Vec3> = (0..58_000).map(|i| Vec3::splat(i as f32)).collect();
        let points = crate::geometry::PointMesh::from_positions(
            &positions,
            &crate::options::GeometryOptions::default(),
        );
        let per_sphere = points.vertices_per_sphere() as u64;
        let sizes = BufferSizes::of(&Geometry::Spheres(std::sync::Arc::new(points)));
        assert_eq!(sizes.instances, 58_000 * 16);
        assert_eq!(sizes.vertices, per_sphere * 24);
        assert!(sizes.largest() < wgpu::Limits::default().max_buffer_size / 100);
    }

    #[test]
    fn plain_meshes_draw_one_identity_instance() {
        let mesh = TriMesh::from_triangles(
            vec![Vec3::ZERO, Vec3::X, Vec3::Y],
            vec![[0, 1, 2]],
        );
        let sizes = BufferSizes::of(&Geometry::Mesh(std::sync::Arc::new(mesh)));
        assert_eq!(
            sizes,
            BufferSizes {
                vertices: 72,
                indices: 12,
                instances: 16,
            }
        );
        assert_eq!(sizes.largest(), 72);
    }

    #[test]
    fn normal_matrix_undoes_non_uniform_scale() {
        let mut viewport = Viewport::new(&Default::default(), 10, 10);
        let handle = viewport.add_representation(
            std::sync::Arc::new(TriMesh::default()),
            crate::viewport::RepresentationStyle::Solid { color: [1.0; 3] },
        );
        let _ = viewport.set_transform(handle, Affine3A::from_scale(Vec3::new(2.0, 1.0, 1.0)));
        let uniform = MeshUniform::from_representation(viewport.get(handle).unwrap());
        let normal = Mat4::from_cols_array_2d(&uniform.normal_matrix);
        assert!((normal.x_axis.x - 0.5).abs() < 1e-6);
        assert_eq!(uniform.color, [1.0, 1.0, 1.0, 1.0]);
    }
}

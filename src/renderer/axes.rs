//! Orientation triad drawn in the bottom-left corner: red x, green y, and
//! blue z rods that turn with the camera but ignore pan and zoom.

use std::sync::Arc;

use glam::{Mat4, Vec3};

use super::mesh_pass::{draw, CameraUniform, GpuMesh, MeshUniform};
use crate::geometry::TriMesh;
use crate::gpu::{DepthTarget, RenderContext};
use crate::viewport::{Geometry, OrbitCamera};

/// Widget edge length in pixels.
const SIZE: u32 = 96;
/// Gap to the window edges in pixels.
const MARGIN: u32 = 8;
const ROD_THICKNESS: f32 = 0.08;
const EYE_DISTANCE: f32 = 3.0;

const AXIS_COLORS: [[f32; 4]; 3] = [
    [0.9, 0.2, 0.2, 1.0],
    [0.2, 0.8, 0.2, 1.0],
    [0.25, 0.4, 0.95, 1.0],
];

/// Box spanning `min`..`max` with flat, outward-facing quads.
fn cuboid(min: Vec3, max: Vec3) -> TriMesh {
    let center = (min + max) * 0.5;
    let half = (max - min) * 0.5;
    let mut mesh = TriMesh::default();
    for axis in 0..3 {
        for sign in [1.0_f32, -1.0] {
            let normal = Vec3::AXES[axis] * sign;
            let (mut u, mut v) = (Vec3::AXES[(axis + 1) % 3], Vec3::AXES[(axis + 2) % 3]);
            if sign < 0.0 {
                std::mem::swap(&mut u, &mut v);
            }
            let base = mesh.positions.len() as u32;
            for (a, b) in [(-1.0_f32, -1.0_f32), (1.0, -1.0), (1.0, 1.0), (-1.0, 1.0)] {
                mesh.positions.push(center + (normal + u * a + v * b) * half);
                mesh.normals.push(normal);
            }
            mesh.triangles.push([base, base + 1, base + 2]);
            mesh.triangles.push([base, base + 2, base + 3]);
        }
    }
    mesh
}

/// Unit-length rod from the origin along `axis`.
fn axis_rod(axis: usize) -> TriMesh {
    let r = ROD_THICKNESS * 0.5;
    let extent = Vec3::AXES[axis] * (1.0 - r);
    cuboid(Vec3::splat(-r), Vec3::splat(r) + extent)
}

impl CameraUniform {
    /// Orthographic camera sharing `orbit`'s orientation, centered on the
    /// origin.
    pub(super) fn for_axes(orbit: &OrbitCamera) -> Self {
        let forward = orbit.forward();
        let eye = -forward * EYE_DISTANCE;
        let view = Mat4::look_at_rh(eye, Vec3::ZERO, orbit.up());
        let proj = Mat4::orthographic_rh(-1.25, 1.25, -1.25, 1.25, 0.1, 2.0 * EYE_DISTANCE);
        Self::new(proj * view, eye, forward)
    }
}

/// GPU state of the orientation triad.
pub(super) struct AxesWidget {
    camera_buffer: wgpu::Buffer,
    camera_bind_group: wgpu::BindGroup,
    rods: Vec<GpuMesh>,
}

impl AxesWidget {
    pub(super) fn new(
        context: &RenderContext,
        camera_layout: &wgpu::BindGroupLayout,
        mesh_layout: &wgpu::BindGroupLayout,
    ) -> Self {
        let device = &context.device;
        let camera_buffer = device.create_buffer(&wgpu::BufferDescriptor {
            label: Some("Axes Camera Buffer"),
            size: size_of::<CameraUniform>() as u64,
            usage: wgpu::BufferUsages::UNIFORM | wgpu::BufferUsages::COPY_DST,
            mapped_at_creation: false,
        });
        let camera_bind_group = device.create_bind_group(&wgpu::BindGroupDescriptor {
            label: Some("Axes Camera Bind Group"),
            layout: camera_layout,
            entries: &[wgpu::BindGroupEntry {
                binding: 0,
                resource: camera_buffer.as_entire_binding(),
            }],
        });

        let rods = AXIS_COLORS
            .iter()
            .enumerate()
            .map(|(axis, &color)| {
                let geometry = Geometry::Mesh(Arc::new(axis_rod(axis)));
                let label = format!("Axis {axis}");
                let gpu = GpuMesh::upload(device, mesh_layout, &label, &geometry);
                context.queue.write_buffer(
                    &gpu.uniform_buffer,
                    0,
                    bytemuck::bytes_of(&MeshUniform::new(Mat4::IDENTITY, color)),
                );
                gpu
            })
            .collect();

        Self {
            camera_buffer,
            camera_bind_group,
            rods,
        }
    }

    pub(super) fn sync(&self, context: &RenderContext, camera: &OrbitCamera) {
        context.queue.write_buffer(
            &self.camera_buffer,
            0,
            bytemuck::bytes_of(&CameraUniform::for_axes(camera)),
        );
    }

    /// Draw over `target` in its own pass with a fresh depth buffer.
    pub(super) fn render(
        &self,
        encoder: &mut wgpu::CommandEncoder,
        target: &wgpu::TextureView,
        depth: &DepthTarget,
        pipeline: &wgpu::RenderPipeline,
    ) {
        let Some((x, y, size)) = corner_viewport(depth.size()) else {
            return;
        };
        let mut pass = encoder.begin_render_pass(&wgpu::RenderPassDescriptor {
            label: Some("Axes Pass"),
            color_attachments: &[Some(wgpu::RenderPassColorAttachment {
                view: target,
                depth_slice: None,
                resolve_target: None,
                ops: wgpu::Operations {
                    load: wgpu::LoadOp::Load,
                    store: wgpu::StoreOp::Store,
                },
            })],
            depth_stencil_attachment: Some(wgpu::RenderPassDepthStencilAttachment {
                view: &depth.view,
                depth_ops: Some(wgpu::Operations {
                    load: wgpu::LoadOp::Clear(1.0),
                    store: wgpu::StoreOp::Discard,
                }),
                stencil_ops: None,
            }),
            timestamp_writes: None,
            occlusion_query_set: None,
        });
        pass.set_viewport(x as f32, y as f32, size as f32, size as f32, 0.0, 1.0);
        pass.set_pipeline(pipeline);
        pass.set_bind_group(0, &self.camera_bind_group, &[]);
        for rod in &self.rods {
            draw(&mut pass, rod);
        }
    }
}

/// Bottom-left square `(x, y, size)` in pixels, `None` if the surface is
/// too small to fit it.
fn corner_viewport((width, height): (u32, u32)) -> Option<(u32, u32, u32)> {
    let size = SIZE.min(width / 4).min(height / 4);
    if size < 16 {
        return None;
    }
    let margin = MARGIN.min(width - size).min(height - size);
    Some((margin, height - size - margin, size))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::options::CameraOptions;

    #[test]
    fn rod_faces_point_outward() {
        for axis in 0..3 {
            let rod = axis_rod(axis);
            let center = rod.bounds().unwrap().center();
            assert_eq!(rod.triangle_count(), 12);
            for (i, tri) in rod.triangles.iter().enumerate() {
                let centroid = tri
                    .iter()
                    .map(|&v| rod.positions[v as usize])
                    .sum::<Vec3>()
                    / 3.0;
                assert!(rod.face_normal(i).dot(centroid - center) > 0.0);
                assert!((rod.face_normal(i) - rod.normals[tri[0] as usize]).length() < 1e-6);
            }
            let bounds = rod.bounds().unwrap();
            assert!((bounds.max[axis] - 1.0).abs() < 1e-6);
        }
    }

    #[test]
    fn axes_follow_camera_orientation_only() {
        let mut orbit = OrbitCamera::new(&CameraOptions::default(), 800, 600);
        orbit.pan(glam::Vec2::new(200.0, -50.0));
        let vp = Mat4::from_cols_array_2d(&CameraUniform::for_axes(&orbit).view_proj);
        // Default view looks down -z: x points right, y up, z at the viewer.
        let x = vp.project_point3(Vec3::X);
        let y = vp.project_point3(Vec3::Y);
        let origin = vp.project_point3(Vec3::ZERO);
        assert!(origin.truncate().length() < 1e-5);
        assert!(x.x > 0.5 && x.y.abs() < 1e-5);
        assert!(y.y > 0.5 && y.x.abs() < 1e-5);
        for p in [x, y, origin, vp.project_point3(Vec3::Z)] {
            assert!((0.0..=1.0).contains(&p.z));
        }
    }

    #[test]
    fn corner_viewport_fits_the_surface() {
        assert_eq!(corner_viewport((800, 600)), Some((MARGIN, 600 - SIZE - MARGIN, SIZE)));
        let (x, y, size) = corner_viewport((200, 100)).unwrap();
        assert_eq!(size, 25);
        assert!(x + size <= 200 && y + size <= 100);
        assert_eq!(corner_viewport((40, 40)), None);
    }
}

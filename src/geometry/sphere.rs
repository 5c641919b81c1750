use std::f32::consts::PI;

use glam::Vec3;

use super::{Aabb, TriMesh};
use crate::options::GeometryOptions;

/// A single atom rendered as a sphere.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SpherePrimitive {
    /// Atom position in angstroms.
    pub center: Vec3,
    /// Sphere radius in angstroms.
    pub radius: f32,
}

/// One sphere primitive per atom, sharing a single tessellation.
#[derive(Debug, Clone, PartialEq)]
pub struct PointMesh {
    spheres: Vec<SpherePrimitive>,
    unit_sphere: TriMesh,
}

impl PointMesh {
    /// Build a point mesh with one sphere of `geometry.atom_radius` per
    /// position, in input order.
    #[must_use]
    pub fn from_positions(positions: &[Vec3], geometry: &GeometryOptions) -> Self {
        let (theta, phi) = geometry.sphere_resolution();
        let radius = geometry.atom_radius.max(0.0);
        Self {
            spheres: positions
                .iter()
                .map(|&center| SpherePrimitive { center, radius })
                .collect(),
            unit_sphere: unit_sphere(theta, phi),
        }
    }

    /// The sphere primitives, one per atom.
    #[must_use]
    pub fn spheres(&self) -> &[SpherePrimitive] {
        &self.spheres
    }

    /// Number of sphere primitives.
    #[must_use]
    pub fn len(&self) -> usize {
        self.spheres.len()
    }

    /// `true` if there are no spheres.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.spheres.is_empty()
    }

    /// Tessellated vertices per sphere.
    #[must_use]
    pub fn vertices_per_sphere(&self) -> usize {
        self.unit_sphere.vertex_count()
    }

    /// Tessellated vertices of the given spheres merged into one point set.
    #[must_use]
    pub fn combined_points_of(&self, spheres: &[SpherePrimitive]) -> Vec<Vec3> {
        let mut points =
            Vec::with_capacity(spheres.len() * self.vertices_per_sphere());
        for sphere in spheres {
            points.extend(
                self.unit_sphere
                    .positions
                    .iter()
                    .map(|&p| sphere.center + p * sphere.radius),
            );
        }
        points
    }

    /// Tessellated vertices of every sphere merged into one point set.
    #[must_use]
    pub fn combined_points(&self) -> Vec<Vec3> {
        self.combined_points_of(&self.spheres)
    }

    /// The shared tessellation every sphere is drawn from.
    #[must_use]
    pub fn unit_sphere(&self) -> &TriMesh {
        &self.unit_sphere
    }

    /// Box enclosing every sphere, `None` if there are none.
    #[must_use]
    pub fn bounds(&self) -> Option<Aabb> {
        self.spheres.iter().fold(None, |acc, sphere| {
            let r = Vec3::splat(sphere.radius);
            let (min, max) = (sphere.center - r, sphere.center + r);
            Some(match acc {
                None => Aabb { min, max },
                Some(b) => Aabb {
                    min: b.min.min(min),
                    max: b.max.max(max),
                },
            })
        })
    }
}

/// UV sphere of radius 1 around the origin.
///
/// `theta_resolution` segments around the z axis, `phi_resolution` rings
/// from the north to the south pole counting both poles, which are single
/// vertices. Produces `2 + theta * (phi - 2)` vertices.
#[must_use]
pub fn unit_sphere(theta_resolution: u32, phi_resolution: u32) -> TriMesh {
    let theta_res = theta_resolution.max(3);
    let phi_res = phi_resolution.max(3);
    let rings = phi_res - 2;

    let mut positions = Vec::with_capacity((2 + theta_res * rings) as usize);
    positions.push(Vec3::Z);
    positions.push(-Vec3::Z);
    for j in 1..=rings {
        let phi = PI * j as f32 / (phi_res - 1) as f32;
        let (sin_phi, cos_phi) = phi.sin_cos();
        for i in 0..theta_res {
            let theta = 2.0 * PI * i as f32 / theta_res as f32;
            let (sin_theta, cos_theta) = theta.sin_cos();
            positions.push(Vec3::new(
                sin_phi * cos_theta,
                sin_phi * sin_theta,
                cos_phi,
            ));
        }
    }

    let ring_vertex = |ring: u32, i: u32| 2 + ring * theta_res + i % theta_res;
    let mut triangles =
        Vec::with_capacity((2 * theta_res * (rings.max(1))) as usize);
    for i in 0..theta_res {
        triangles.push([0, ring_vertex(0, i), ring_vertex(0, i + 1)]);
    }
    for ring in 0..rings - 1 {
        for i in 0..theta_res {
            let a = ring_vertex(ring, i);
            let b = ring_vertex(ring, i + 1);
            let c = ring_vertex(ring + 1, i);
            let d = ring_vertex(ring + 1, i + 1);
            triangles.push([a, c, d]);
            triangles.push([a, d, b]);
        }
    }
    let last = rings - 1;
    for i in 0..theta_res {
        triangles.push([1, ring_vertex(last, i + 1), ring_vertex(last, i)]);
    }

    let normals = positions.clone();
    TriMesh {
        positions,
        normals,
        triangles,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn unit_sphere_counts() {
        let sphere = unit_sphere(30, 30);
        assert_eq!(sphere.vertex_count(), 2 + 30 * 28);
        assert_eq!(sphere.triangle_count(), 2 * 30 * 28);
    }

    #[test]
    fn unit_sphere_faces_point_outward() {
        let sphere = unit_sphere(8, 6);
        for (i, tri) in sphere.triangles.iter().enumerate() {
            let centroid = tri
                .iter()
                .map(|&v| sphere.positions[v as usize])
                .sum::<Vec3>()
                / 3.0;
            assert!(
                sphere.face_normal(i).dot(centroid) > 0.0,
                "triangle {i} faces inward"
            );
        }
    }

    #[test]
    fn unit_sphere_is_closed() {
        // Every edge of a closed 2-manifold is shared by exactly two faces.
        let sphere = unit_sphere(10, 7);
        let mut edges = std::collections::HashMap::new();
        for t in &sphere.triangles {
            for (a, b) in [(t[0], t[1]), (t[1], t[2]), (t[2], t[0])] {
                *edges.entry((a.min(b), a.max(b))).or_insert(0) += 1;
            }
        }
        assert!(edges.values().all(|&count| count == 2));
    }

    #[test]
    fn one_sphere_per_atom() {
        let positions = [Vec3::ZERO, Vec3::X, Vec3::Y];
        let mesh = PointMesh::from_positions(&positions, &GeometryOptions::default());
        assert_eq!(mesh.len(), 3);
        assert!(mesh.spheres().iter().all(|s| s.radius == 0.5));
        assert_eq!(mesh.spheres()[1].center, Vec3::X);
    }

    #[test]
    fn combined_points_scale_with_atom_count() {
        let geometry = GeometryOptions::default();
        let positions = [Vec3::ZERO, Vec3::new(3.0, 0.0, 0.0)];
        let mesh = PointMesh::from_positions(&positions, &geometry);
        let points = mesh.combined_points();
        assert_eq!(points.len(), 2 * mesh.vertices_per_sphere());
        // Second sphere vertices are offset by its center.
        let second = &points[mesh.vertices_per_sphere()..];
        assert!(second
            .iter()
            .all(|p| ((*p - positions[1]).length() - 0.5).abs() < 1e-5));
    }

    #[test]
    fn bounds_enclose_sphere_surfaces() {
        let positions = [Vec3::ZERO, Vec3::new(3.0, -1.0, 0.0)];
        let mesh = PointMesh::from_positions(&positions, &GeometryOptions::default());
        let bounds = mesh.bounds().unwrap();
        assert!((bounds.min - Vec3::new(-0.5, -1.5, -0.5)).length() < 1e-6);
        assert!((bounds.max - Vec3::new(3.5, 0.5, 0.5)).length() < 1e-6);
        assert!(PointMesh::from_positions(&[], &GeometryOptions::default())
            .bounds()
            .is_none());
    }
}

//! CPU-side geometry: triangle meshes, atom sphere point meshes, surface
//! reconstruction, and STL mesh I/O.

/// Atom sphere primitives and their tessellation.
pub mod sphere;
/// STL mesh file writer and reader.
pub mod stl;
/// Closed surface envelope around a point mesh.
pub mod surface;

use glam::{Affine3A, Vec3};

pub use sphere::{PointMesh, SpherePrimitive};
pub use stl::StlFormat;
pub use surface::generate_surface;

/// Indexed triangle mesh with per-vertex normals.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct TriMesh {
    /// Vertex positions.
    pub positions: Vec<Vec3>,
    /// Unit vertex normals, parallel to `positions`.
    pub normals: Vec<Vec3>,
    /// Counter-clockwise (outward-facing) triangles as vertex indices.
    pub triangles: Vec<[u32; 3]>,
}

impl TriMesh {
    /// Build a mesh, deriving area-weighted vertex normals from the faces.
    #[must_use]
    pub fn from_triangles(positions: Vec<Vec3>, triangles: Vec<[u32; 3]>) -> Self {
        let normals = vertex_normals(&positions, &triangles);
        Self {
            positions,
            normals,
            triangles,
        }
    }

    /// Number of vertices.
    #[must_use]
    pub fn vertex_count(&self) -> usize {
        self.positions.len()
    }

    /// Number of triangles.
    #[must_use]
    pub fn triangle_count(&self) -> usize {
        self.triangles.len()
    }

    /// `true` if the mesh has no triangles.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.triangles.is_empty()
    }

    /// Axis-aligned bounds of all vertices, `None` for an empty mesh.
    #[must_use]
    pub fn bounds(&self) -> Option<Aabb> {
        Aabb::from_points(self.positions.iter().copied())
    }

    /// Unit face normal of triangle `index` (zero for degenerate faces).
    #[must_use]
    pub fn face_normal(&self, index: usize) -> Vec3 {
        let [a, b, c] = self.triangles[index];
        let (a, b, c) = (
            self.positions[a as usize],
            self.positions[b as usize],
            self.positions[c as usize],
        );
        (b - a).cross(c - a).normalize_or_zero()
    }
}

/// Area-weighted vertex normals for an indexed triangle list.
fn vertex_normals(positions: &[Vec3], triangles: &[[u32; 3]]) -> Vec<Vec3> {
    let mut normals = vec![Vec3::ZERO; positions.len()];
    for &[a, b, c] in triangles {
        let (pa, pb, pc) = (
            positions[a as usize],
            positions[b as usize],
            positions[c as usize],
        );
        // Unnormalized cross product is proportional to face area.
        let n = (pb - pa).cross(pc - pa);
        normals[a as usize] += n;
        normals[b as usize] += n;
        normals[c as usize] += n;
    }
    for n in &mut normals {
        *n = n.normalize_or_zero();
    }
    normals
}

/// Axis-aligned bounding box.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Aabb {
    /// Minimum corner.
    pub min: Vec3,
    /// Maximum corner.
    pub max: Vec3,
}

impl Aabb {
    /// Bounds of a point set, `None` if empty.
    pub fn from_points(points: impl IntoIterator<Item = Vec3>) -> Option<Self> {
        let mut iter = points.into_iter();
        let first = iter.next()?;
        Some(iter.fold(Self { min: first, max: first }, |acc, p| Self {
            min: acc.min.min(p),
            max: acc.max.max(p),
        }))
    }

    /// Smallest box containing both.
    #[must_use]
    pub fn union(self, other: Self) -> Self {
        Self {
            min: self.min.min(other.min),
            max: self.max.max(other.max),
        }
    }

    /// Box center.
    #[must_use]
    pub fn center(&self) -> Vec3 {
        (self.min + self.max) * 0.5
    }

    /// Radius of the bounding sphere around [`center`](Self::center).
    #[must_use]
    pub fn radius(&self) -> f32 {
        (self.max - self.min).length() * 0.5
    }

    /// Bounds of this box's eight corners after `transform`.
    #[must_use]
    pub fn transformed(&self, transform: &Affine3A) -> Self {
        let corners = (0..8).map(|i| {
            Vec3::new(
                if i & 1 == 0 { self.min.x } else { self.max.x },
                if i & 2 == 0 { self.min.y } else { self.max.y },
                if i & 4 == 0 { self.min.z } else { self.max.z },
            )
        });
        let mapped = corners.map(|c| transform.transform_point3(c));
        Self::from_points(mapped).unwrap_or(*self)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn tetrahedron() -> TriMesh {
        TriMesh::from_triangles(
            vec![Vec3::ZERO, Vec3::X, Vec3::Y, Vec3::Z],
            vec![[0, 2, 1], [0, 1, 3], [0, 3, 2], [1, 2, 3]],
        )
    }

    #[test]
    fn normals_point_away_from_interior() {
        let mesh = tetrahedron();
        let centroid = mesh.positions.iter().copied().sum::<Vec3>() / 4.0;
        for (p, n) in mesh.positions.iter().zip(&mesh.normals) {
            assert!((*p - centroid).dot(*n) > 0.0);
        }
    }

    #[test]
    fn bounds_of_translated_box() {
        let bounds = tetrahedron().bounds().unwrap();
        assert_eq!(bounds.min, Vec3::ZERO);
        assert_eq!(bounds.max, Vec3::ONE);
        let moved =
            bounds.transformed(&Affine3A::from_translation(Vec3::splat(2.0)));
        assert_eq!(moved.center(), Vec3::splat(2.5));
    }

    #[test]
    fn empty_mesh_has_no_bounds() {
        assert!(TriMesh::default().bounds().is_none());
    }
}

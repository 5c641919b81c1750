//! Closed surface envelope around a structure's atom spheres.
//!
//! The atom spheres are merged into one point set whose 3D triangulation
//! boundary is extracted. Without an alpha cutoff the outer boundary of a
//! Delaunay tetrahedralization is exactly the convex hull of its points, so
//! the boundary is computed directly with quickhull (`chull`).

use chull::ConvexHullWrapper;
use glam::Vec3;

use super::{PointMesh, SpherePrimitive, TriMesh};
use crate::error::{BiovisError, Precondition};

/// Relative tolerance (fraction of the point set extent) below which the
/// point set is treated as flat.
const DEGENERACY_TOLERANCE: f32 = 1e-6;

/// Generate the closed boundary surface of all atom spheres in `points`.
///
/// # Errors
///
/// [`BiovisError::Precondition`] when the point mesh is empty,
/// [`BiovisError::Generation`] when the merged point set spans less than
/// three dimensions or the hull computation fails.
pub fn generate_surface(points: &PointMesh) -> Result<TriMesh, BiovisError> {
    if points.is_empty() {
        return Err(BiovisError::Precondition(Precondition::EmptyPointMesh));
    }

    let candidates = hull_candidates(points);
    let merged = points.combined_points_of(&candidates);
    if !spans_volume(&merged) {
        return Err(BiovisError::Generation(format!(
            "{} atom(s) produce a flat or degenerate point set",
            points.len()
        )));
    }

    let (positions, triangles) = convex_hull(&merged)?;
    let triangles = orient_outward(&positions, triangles);
    if triangles.len() < 4 {
        return Err(BiovisError::Generation(format!(
            "boundary has only {} triangle(s)",
            triangles.len()
        )));
    }

    log::debug!(
        "surface: {} atoms, {} points -> {} vertices, {} triangles",
        points.len(),
        merged.len(),
        positions.len(),
        triangles.len()
    );
    Ok(TriMesh::from_triangles(positions, triangles))
}

/// Spheres that can contribute hull vertices.
///
/// All spheres share one radius, so a sphere's points can only be extreme if
/// its center is a hull vertex of the centers. Falls back to every sphere when
/// the centers alone are flat.
fn hull_candidates(points: &PointMesh) -> Vec<SpherePrimitive> {
    let spheres = points.spheres();
    let centers: Vec<Vec3> = spheres.iter().map(|s| s.center).collect();
    if centers.len() < 16 || !spans_volume(&centers) {
        return spheres.to_vec();
    }
    match convex_hull(&centers) {
        Ok((hull_vertices, _)) => spheres
            .iter()
            .filter(|s| hull_vertices.contains(&s.center))
            .copied()
            .collect(),
        Err(_) => spheres.to_vec(),
    }
}

/// Quickhull over `points`, returning hull vertices and triangles.
fn convex_hull(points: &[Vec3]) -> Result<(Vec<Vec3>, Vec<[u32; 3]>), BiovisError> {
    let input: Vec<Vec<f64>> = points
        .iter()
        .map(|p| vec![f64::from(p.x), f64::from(p.y), f64::from(p.z)])
        .collect();
    let hull = ConvexHullWrapper::try_new(&input, None).map_err(|e| {
        BiovisError::Generation(format!("triangulation failed: {e:?}"))
    })?;
    let (vertices, indices) = hull.vertices_indices();

    // Keep only referenced vertices, numbered in first-use order.
    let mut remap = vec![u32::MAX; vertices.len()];
    let mut positions = Vec::new();
    let mut triangles = Vec::with_capacity(indices.len() / 3);
    for tri in indices.chunks_exact(3) {
        let mut out = [0_u32; 3];
        for (slot, &index) in out.iter_mut().zip(tri) {
            let Some(v) = vertices.get(index) else {
                return Err(BiovisError::Generation(format!(
                    "hull index {index} out of range"
                )));
            };
            if remap[index] == u32::MAX {
                remap[index] = positions.len() as u32;
                positions.push(Vec3::new(v[0] as f32, v[1] as f32, v[2] as f32));
            }
            *slot = remap[index];
        }
        triangles.push(out);
    }
    Ok((positions, triangles))
}

/// Flip triangles whose normal points toward the hull centroid and drop
/// zero-area ones.
fn orient_outward(positions: &[Vec3], triangles: Vec<[u32; 3]>) -> Vec<[u32; 3]> {
    if positions.is_empty() {
        return triangles;
    }
    let centroid = positions.iter().copied().sum::<Vec3>() / positions.len() as f32;
    triangles
        .into_iter()
        .filter_map(|[a, b, c]| {
            let (pa, pb, pc) = (
                positions[a as usize],
                positions[b as usize],
                positions[c as usize],
            );
            let normal = (pb - pa).cross(pc - pa);
            if normal.length_squared() <= f32::EPSILON * f32::EPSILON {
                return None;
            }
            let face_center = (pa + pb + pc) / 3.0;
            if normal.dot(face_center - centroid) < 0.0 {
                Some([a, c, b])
            } else {
                Some([a, b, c])
            }
        })
        .collect()
}

/// `true` if the points contain four affinely independent points.
fn spans_volume(points: &[Vec3]) -> bool {
    let Some(&origin) = points.first() else {
        return false;
    };
    let Some(bounds) = super::Aabb::from_points(points.iter().copied()) else {
        return false;
    };
    let tolerance = (bounds.radius() * 2.0 * DEGENERACY_TOLERANCE).max(f32::MIN_POSITIVE);

    let farthest = |metric: &dyn Fn(Vec3) -> f32| {
        points
            .iter()
            .copied()
            .map(|p| (p, metric(p)))
            .fold((origin, 0.0_f32), |best, cur| if cur.1 > best.1 { cur } else { best })
    };

    let (p1, d1) = farthest(&|p| (p - origin).length());
    if d1 <= tolerance {
        return false;
    }
    let axis = (p1 - origin) / d1;
    let (p2, d2) = farthest(&|p| {
        let v = p - origin;
        (v - axis * v.dot(axis)).length()
    });
    if d2 <= tolerance {
        return false;
    }
    let normal = (p1 - origin).cross(p2 - origin).normalize_or_zero();
    let (_, d3) = farthest(&|p| (p - origin).dot(normal).abs());
    d3 > tolerance
}

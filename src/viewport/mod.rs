//! Render-scene state: opaque handles to mesh and sphere representations,
//! their styles and interactive transforms, and the orbit camera.
//!
//! The viewport is pure CPU state. The GPU renderer mirrors it each frame
//! and uses [`Viewport::revision`] to notice structural changes.

/// Orbit camera and projection.
pub mod camera;

use std::sync::Arc;

use glam::{Affine3A, Vec2, Vec3};
use rustc_hash::FxHashMap;

pub use camera::{Camera, OrbitCamera};

use crate::geometry::{Aabb, PointMesh, TriMesh};
use crate::options::CameraOptions;

/// Opaque identifier of one on-screen representation. Never reused.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct VisualHandle(u64);

impl VisualHandle {
    /// Raw id, for logging and GPU bookkeeping.
    #[must_use]
    pub fn raw(self) -> u64 {
        self.0
    }
}

/// How a representation is drawn.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum RepresentationStyle {
    /// Opaque, smooth-shaded.
    Solid {
        /// RGB color.
        color: [f32; 3],
    },
    /// Alpha-blended, drawn after all solids without depth writes.
    Translucent {
        /// RGB color.
        color: [f32; 3],
        /// Opacity in `[0, 1]`.
        opacity: f32,
    },
}

impl RepresentationStyle {
    /// RGBA color.
    #[must_use]
    pub fn rgba(&self) -> [f32; 4] {
        match *self {
            Self::Solid { color: [r, g, b] } => [r, g, b, 1.0],
            Self::Translucent {
                color: [r, g, b],
                opacity,
            } => [r, g, b, opacity.clamp(0.0, 1.0)],
        }
    }

    /// `true` for alpha-blended styles.
    #[must_use]
    pub fn is_translucent(&self) -> bool {
        matches!(self, Self::Translucent { .. })
    }
}

/// Model-space geometry of a representation, shared with its owner.
#[derive(Debug, Clone)]
pub enum Geometry {
    /// An explicit triangle mesh.
    Mesh(Arc<TriMesh>),
    /// Spheres drawn as instances of one shared tessellation.
    Spheres(Arc<PointMesh>),
}

impl Geometry {
    /// Model-space bounds, `None` when there is nothing to draw.
    #[must_use]
    pub fn bounds(&self) -> Option<Aabb> {
        match self {
            Self::Mesh(mesh) => mesh.bounds(),
            Self::Spheres(points) => points.bounds(),
        }
    }

    /// `true` if nothing would be drawn.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        match self {
            Self::Mesh(mesh) => mesh.is_empty(),
            Self::Spheres(points) => points.is_empty() || points.unit_sphere().is_empty(),
        }
    }
}

/// One piece of geometry placed in the scene.
#[derive(Debug, Clone)]
pub struct Representation {
    /// Geometry in model space.
    pub geometry: Geometry,
    /// Draw style.
    pub style: RepresentationStyle,
    /// Model-to-world transform.
    pub transform: Affine3A,
    /// Whether user drags may change `transform`.
    pub interactive: bool,
    local_bounds: Option<Aabb>,
}

impl Representation {
    /// Bounds after applying the current transform.
    #[must_use]
    pub fn world_bounds(&self) -> Option<Aabb> {
        self.local_bounds.map(|b| b.transformed(&self.transform))
    }
}

/// Owner of all representations and the camera.
#[derive(Debug)]
pub struct Viewport {
    representations: FxHashMap<VisualHandle, Representation>,
    order: Vec<VisualHandle>,
    next_handle: u64,
    revision: u64,
    /// Orbit camera.
    pub camera: OrbitCamera,
}

impl Viewport {
    /// Empty viewport of `width` × `height` pixels.
    #[must_use]
    pub fn new(camera_options: &CameraOptions, width: u32, height: u32) -> Self {
        Self {
            representations: FxHashMap::default(),
            order: Vec::new(),
            next_handle: 1,
            revision: 0,
            camera: OrbitCamera::new(camera_options, width, height),
        }
    }

    /// Add `mesh` drawn with `style`, returning a fresh handle.
    pub fn add_representation(
        &mut self,
        mesh: Arc<TriMesh>,
        style: RepresentationStyle,
    ) -> VisualHandle {
        self.insert(Geometry::Mesh(mesh), style)
    }

    /// Add one sphere per primitive of `points`, returning a fresh handle.
    pub fn add_spheres(
        &mut self,
        points: Arc<PointMesh>,
        style: RepresentationStyle,
    ) -> VisualHandle {
        self.insert(Geometry::Spheres(points), style)
    }

    fn insert(&mut self, geometry: Geometry, style: RepresentationStyle) -> VisualHandle {
        let handle = VisualHandle(self.next_handle);
        self.next_handle += 1;
        let local_bounds = geometry.bounds();
        let _ = self.representations.insert(
            handle,
            Representation {
                geometry,
                style,
                transform: Affine3A::IDENTITY,
                interactive: false,
                local_bounds,
            },
        );
        self.order.push(handle);
        self.revision += 1;
        log::debug!("viewport: added representation {}", handle.0);
        handle
    }

    /// Remove a representation. Returns `false` (and changes nothing) if the
    /// handle is unknown or already removed.
    pub fn remove_representation(&mut self, handle: VisualHandle) -> bool {
        if self.representations.remove(&handle).is_none() {
            return false;
        }
        self.order.retain(|h| *h != handle);
        self.revision += 1;
        log::debug!("viewport: removed representation {}", handle.0);
        true
    }

    /// Allow translate/rotate drags on a representation. Returns `false` for
    /// unknown handles.
    pub fn attach_interactive_transform(&mut self, handle: VisualHandle) -> bool {
        match self.representations.get_mut(&handle) {
            Some(rep) => {
                rep.interactive = true;
                true
            }
            None => false,
        }
    }

    /// `true` if the handle refers to a live representation.
    #[must_use]
    pub fn contains(&self, handle: VisualHandle) -> bool {
        self.representations.contains_key(&handle)
    }

    /// Representation for `handle`.
    #[must_use]
    pub fn get(&self, handle: VisualHandle) -> Option<&Representation> {
        self.representations.get(&handle)
    }

    /// Number of live representations.
    #[must_use]
    pub fn len(&self) -> usize {
        self.order.len()
    }

    /// `true` if there are no representations.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.order.is_empty()
    }

    /// Live representations in insertion order.
    pub fn representations(&self) -> impl Iterator<Item = (VisualHandle, &Representation)> {
        self.order
            .iter()
            .filter_map(|h| self.representations.get(h).map(|r| (*h, r)))
    }

    /// Counter bumped whenever representations are added or removed.
    #[must_use]
    pub fn revision(&self) -> u64 {
        self.revision
    }

    /// Current model-to-world transform.
    #[must_use]
    pub fn transform(&self, handle: VisualHandle) -> Option<Affine3A> {
        self.representations.get(&handle).map(|r| r.transform)
    }

    /// Replace a representation's transform. Returns `false` for unknown
    /// handles.
    pub fn set_transform(&mut self, handle: VisualHandle, transform: Affine3A) -> bool {
        match self.representations.get_mut(&handle) {
            Some(rep) => {
                rep.transform = transform;
                true
            }
            None => false,
        }
    }

    /// World bounds of every representation, `None` when empty.
    #[must_use]
    pub fn scene_bounds(&self) -> Option<Aabb> {
        Self::union_bounds(self.representations().filter_map(|(_, r)| r.world_bounds()))
    }

    fn union_bounds(bounds: impl Iterator<Item = Aabb>) -> Option<Aabb> {
        bounds.reduce(Aabb::union)
    }

    /// Frame all representations, or restore the default view if none.
    pub fn reset_camera(&mut self) {
        let bounds = self.scene_bounds();
        self.camera.fit_to_bounds(bounds);
    }

    /// Resize the drawable area.
    pub fn resize(&mut self, width: u32, height: u32) {
        self.camera.resize(width, height);
    }

    /// Translate the interactive representations in `handles` by a
    /// screen-space drag, in the view plane.
    pub fn translate_group(&mut self, handles: &[VisualHandle], screen_delta: Vec2) {
        let offset = self.camera.screen_to_world(screen_delta);
        for rep in self.interactive_mut(handles) {
            rep.transform = Affine3A::from_translation(offset) * rep.transform;
        }
    }

    /// Rotate the interactive representations in `handles` about their
    /// common center by a screen-space drag.
    pub fn rotate_group(&mut self, handles: &[VisualHandle], screen_delta: Vec2) {
        let Some(pivot) = self.group_center(handles) else {
            return;
        };
        let rotation = Affine3A::from_translation(pivot)
            * Affine3A::from_quat(self.camera.drag_rotation(screen_delta))
            * Affine3A::from_translation(-pivot);
        for rep in self.interactive_mut(handles) {
            rep.transform = rotation * rep.transform;
        }
    }

    fn group_center(&self, handles: &[VisualHandle]) -> Option<Vec3> {
        Self::union_bounds(
            handles
                .iter()
                .filter_map(|h| self.representations.get(h))
                .filter(|r| r.interactive)
                .filter_map(Representation::world_bounds),
        )
        .map(|b| b.center())
    }

    fn interactive_mut<'a>(
        &'a mut self,
        handles: &'a [VisualHandle],
    ) -> impl Iterator<Item = &'a mut Representation> + 'a {
        self.representations
            .iter_mut()
            .filter(move |(h, r)| r.interactive && handles.contains(*h))
            .map(|(_, r)| r)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn cube_mesh(center: Vec3) -> Arc<TriMesh> {
        let corners: Vec<Vec3> = (0..8)
            .map(|i| {
                center
                    + Vec3::new(
                        if i & 1 == 0 { -1.0 } else { 1.0 },
                        if i & 2 == 0 { -1.0 } else { 1.0 },
                        if i & 4 == 0 { -1.0 } else { 1.0 },
                    )
            })
            .collect();
        Arc::new(TriMesh::from_triangles(corners, vec![[0, 1, 2], [4, 5, 6]]))
    }

    fn viewport() -> Viewport {
        Viewport::new(&CameraOptions::default(), 640, 480)
    }

    const SOLID: RepresentationStyle = RepresentationStyle::Solid { color: [1.0; 3] };

    #[test]
    fn handles_are_unique_and_never_reused() {
        let mut vp = viewport();
        let a = vp.add_representation(cube_mesh(Vec3::ZERO), SOLID);
        assert!(vp.remove_representation(a));
        let b = vp.add_representation(cube_mesh(Vec3::ZERO), SOLID);
        assert_ne!(a, b);
        assert!(!vp.contains(a));
        assert!(vp.contains(b));
    }

    #[test]
    fn removing_twice_is_a_no_op() {
        let mut vp = viewport();
        let a = vp.add_representation(cube_mesh(Vec3::ZERO), SOLID);
        let revision = vp.revision();
        assert!(vp.remove_representation(a));
        assert!(!vp.remove_representation(a));
        assert_eq!(vp.revision(), revision + 1);
        assert!(vp.is_empty());
    }

    #[test]
    fn iteration_follows_insertion_order() {
        let mut vp = viewport();
        let handles: Vec<_> = (0..4)
            .map(|i| vp.add_representation(cube_mesh(Vec3::splat(i as f32)), SOLID))
            .collect();
        assert!(vp.remove_representation(handles[1]));
        let seen: Vec<_> = vp.representations().map(|(h, _)| h).collect();
        assert_eq!(seen, vec![handles[0], handles[2], handles[3]]);
    }

    #[test]
    fn reset_camera_frames_transformed_bounds() {
        let mut vp = viewport();
        let a = vp.add_representation(cube_mesh(Vec3::ZERO), SOLID);
        assert!(vp.set_transform(a, Affine3A::from_translation(Vec3::new(10.0, 0.0, 0.0))));
        vp.reset_camera();
        assert!((vp.camera.focus() - Vec3::new(10.0, 0.0, 0.0)).length() < 1e-4);

        assert!(vp.remove_representation(a));
        vp.reset_camera();
        assert_eq!(vp.camera.focus(), Vec3::ZERO);
    }

    #[test]
    fn drags_only_move_interactive_members() {
        let mut vp = viewport();
        let moving = vp.add_representation(cube_mesh(Vec3::ZERO), SOLID);
        let fixed = vp.add_representation(cube_mesh(Vec3::ZERO), SOLID);
        assert!(vp.attach_interactive_transform(moving));

        vp.translate_group(&[moving, fixed], Vec2::new(50.0, 0.0));
        let moved = vp.transform(moving).unwrap().translation;
        assert!(moved.x > 0.0);
        assert_eq!(vp.transform(fixed), Some(Affine3A::IDENTITY));
    }

    #[test]
    fn group_rotation_keeps_center() {
        let mut vp = viewport();
        let atoms = vp.add_representation(cube_mesh(Vec3::new(5.0, 0.0, 0.0)), SOLID);
        let surface = vp.add_representation(
            cube_mesh(Vec3::new(5.0, 0.0, 0.0)),
            RepresentationStyle::Translucent {
                color: [0.5; 3],
                opacity: 0.5,
            },
        );
        for h in [atoms, surface] {
            assert!(vp.attach_interactive_transform(h));
        }
        vp.rotate_group(&[atoms, surface], Vec2::new(40.0, 25.0));

        let center = vp.get(atoms).unwrap().world_bounds().unwrap().center();
        assert!((center - Vec3::new(5.0, 0.0, 0.0)).length() < 1e-3);
        assert_eq!(vp.transform(atoms), vp.transform(surface));
        assert_ne!(vp.transform(atoms), Some(Affine3A::IDENTITY));
    }

    #[test]
    fn sphere_bounds_include_radius() {
        let mut vp = viewport();
        let points = crate::geometry::PointMesh::from_positions(
            &[Vec3::ZERO, Vec3::new(4.0, 0.0, 0.0)],
            &crate::options::GeometryOptions::default(),
        );
        let atoms = vp.add_spheres(Arc::new(points), SOLID);
        let rep = vp.get(atoms).unwrap();
        assert!(matches!(rep.geometry, Geometry::Spheres(_)));
        assert!(!rep.geometry.is_empty());
        let bounds = rep.world_bounds().unwrap();
        assert!((bounds.min.x + 0.5).abs() < 1e-6);
        assert!((bounds.max.x - 4.5).abs() < 1e-6);
    }

    #[test]
    fn translucent_style_clamps_opacity() {
        let style = RepresentationStyle::Translucent {
            color: [0.5; 3],
            opacity: 1.7,
        };
        assert_eq!(style.rgba(), [0.5, 0.5, 0.5, 1.0]);
        assert!(style.is_translucent());
        assert!(!SOLID.is_translucent());
    }
}

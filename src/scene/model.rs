use std::path::PathBuf;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use glam::Vec3;

use crate::geometry::{PointMesh, TriMesh};
use crate::viewport::VisualHandle;

static NEXT_MODEL_ID: AtomicU64 = AtomicU64::new(1);

/// Process-unique structure identity. Never reused, so background results
/// can target a model that may have been deleted meanwhile.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ModelId(u64);

impl ModelId {
    fn next() -> Self {
        Self(NEXT_MODEL_ID.fetch_add(1, Ordering::Relaxed))
    }

    /// Raw id value.
    #[must_use]
    pub fn raw(self) -> u64 {
        self.0
    }

    #[cfg(test)]
    pub(crate) fn for_tests(raw: u64) -> Self {
        Self(raw)
    }
}

/// A generated surface together with its on-screen representation.
#[derive(Debug, Clone)]
pub struct SurfaceAttachment {
    /// Closed surface mesh in model space.
    pub mesh: Arc<TriMesh>,
    /// Representation drawing `mesh`.
    pub handle: VisualHandle,
}

/// One loaded structure and its derived geometry.
#[derive(Debug, Clone)]
pub struct StructureModel {
    id: ModelId,
    /// Unique display name; registry key and list label.
    pub name: String,
    /// File the structure was parsed from.
    pub source: PathBuf,
    /// One coordinate per atom in hierarchy order.
    pub atom_positions: Vec<Vec3>,
    /// One sphere primitive per atom.
    pub point_mesh: Arc<PointMesh>,
    /// Representation drawing the atom spheres.
    pub visual_handle: VisualHandle,
    surface: Option<SurfaceAttachment>,
}

impl StructureModel {
    /// New model with a fresh [`ModelId`] and no surface.
    #[must_use]
    pub fn new(
        name: String,
        source: PathBuf,
        atom_positions: Vec<Vec3>,
        point_mesh: Arc<PointMesh>,
        visual_handle: VisualHandle,
    ) -> Self {
        Self {
            id: ModelId::next(),
            name,
            source,
            atom_positions,
            point_mesh,
            visual_handle,
            surface: None,
        }
    }

    /// Stable identity.
    #[must_use]
    pub fn id(&self) -> ModelId {
        self.id
    }

    /// Attached surface, if one was generated.
    #[must_use]
    pub fn surface(&self) -> Option<&SurfaceAttachment> {
        self.surface.as_ref()
    }

    /// Attach a surface, returning the one it replaces so its
    /// representation can be retired.
    pub fn replace_surface(&mut self, surface: SurfaceAttachment) -> Option<SurfaceAttachment> {
        self.surface.replace(surface)
    }

    /// Every representation owned by this model: atoms first, then surface.
    #[must_use]
    pub fn handles(&self) -> Vec<VisualHandle> {
        std::iter::once(self.visual_handle)
            .chain(self.surface.as_ref().map(|s| s.handle))
            .collect()
    }
}

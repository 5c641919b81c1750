use super::model::{ModelId, StructureModel};
use crate::error::BiovisError;
use crate::viewport::Viewport;

/// Name-keyed, insertion-ordered collection of structures plus the list
/// selection.
#[derive(Debug, Default)]
pub struct SceneRegistry {
    models: Vec<StructureModel>,
    selected: Option<ModelId>,
}

impl SceneRegistry {
    /// Empty registry with nothing selected.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Register `model` and select it.
    ///
    /// # Errors
    ///
    /// [`BiovisError::DuplicateName`] if the name is taken; the registry is
    /// left unchanged.
    pub fn add(&mut self, model: StructureModel) -> Result<ModelId, BiovisError> {
        if self.contains(&model.name) {
            return Err(BiovisError::DuplicateName(model.name));
        }
        let id = model.id();
        self.models.push(model);
        self.selected = Some(id);
        Ok(id)
    }

    /// Remove `name` and every representation it owns. Returns the removed
    /// model, or `None` if no such name is registered.
    pub fn remove(&mut self, name: &str, viewport: &mut Viewport) -> Option<StructureModel> {
        let idx = self.models.iter().position(|m| m.name == name)?;
        let model = self.models.remove(idx);
        for handle in model.handles() {
            let _ = viewport.remove_representation(handle);
        }
        if self.selected == Some(model.id()) {
            self.selected = None;
        }
        Some(model)
    }

    /// `true` if `name` is registered.
    #[must_use]
    pub fn contains(&self, name: &str) -> bool {
        self.models.iter().any(|m| m.name == name)
    }

    /// Model by name.
    #[must_use]
    pub fn get(&self, name: &str) -> Option<&StructureModel> {
        self.models.iter().find(|m| m.name == name)
    }

    /// Model by id.
    #[must_use]
    pub fn get_by_id(&self, id: ModelId) -> Option<&StructureModel> {
        self.models.iter().find(|m| m.id() == id)
    }

    /// Mutable model by id.
    pub fn get_by_id_mut(&mut self, id: ModelId) -> Option<&mut StructureModel> {
        self.models.iter_mut().find(|m| m.id() == id)
    }

    /// Currently selected model.
    #[must_use]
    pub fn selected(&self) -> Option<&StructureModel> {
        self.selected.and_then(|id| self.get_by_id(id))
    }

    /// Select `name`; `None` (or an unknown name) clears the selection.
    /// Returns whether something is selected afterwards.
    pub fn select(&mut self, name: Option<&str>) -> bool {
        self.selected = name.and_then(|n| self.get(n)).map(StructureModel::id);
        self.selected.is_some()
    }

    /// Cycle the selection through the list in order, wrapping around.
    pub fn select_next(&mut self) -> Option<&StructureModel> {
        let next = match self
            .selected
            .and_then(|id| self.models.iter().position(|m| m.id() == id))
        {
            Some(i) => (i + 1) % self.models.len(),
            None => 0,
        };
        self.selected = self.models.get(next).map(StructureModel::id);
        self.selected()
    }

    /// `base` if free, otherwise the first free `"base (n)"` with n ≥ 2.
    #[must_use]
    pub fn unique_name(&self, base: &str) -> String {
        if !self.contains(base) {
            return base.to_owned();
        }
        (2..)
            .map(|n| format!("{base} ({n})"))
            .find(|candidate| !self.contains(candidate))
            .unwrap_or_else(|| base.to_owned())
    }

    /// Names in insertion order.
    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.models.iter().map(|m| m.name.as_str())
    }

    /// Models in insertion order.
    #[must_use]
    pub fn models(&self) -> &[StructureModel] {
        &self.models
    }

    /// Number of registered models.
    #[must_use]
    pub fn len(&self) -> usize {
        self.models.len()
    }

    /// `true` if nothing is registered.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.models.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use std::path::PathBuf;
    use std::sync::Arc;

    use glam::Vec3;

    use super::*;
    use crate::geometry::{PointMesh, TriMesh};
    use crate::options::{CameraOptions, GeometryOptions};
    use crate::scene::SurfaceAttachment;
    use crate::viewport::RepresentationStyle;

    const STYLE: RepresentationStyle = RepresentationStyle::Solid { color: [1.0; 3] };

    fn model(name: &str, viewport: &mut Viewport) -> StructureModel {
        let positions = vec![Vec3::ZERO, Vec3::X, Vec3::Y];
        let points = Arc::new(PointMesh::from_positions(
            &positions,
            &GeometryOptions::default(),
        ));
        let handle = viewport.add_spheres(Arc::clone(&points), STYLE);
        StructureModel::new(
            name.to_owned(),
            PathBuf::from(format!("{name}.pdb")),
            positions,
            points,
            handle,
        )
    }

    fn viewport() -> Viewport {
        Viewport::new(&CameraOptions::default(), 320, 240)
    }

    #[test]
    fn add_keeps_order_and_selects() {
        let mut vp = viewport();
        let mut reg = SceneRegistry::new();
        let a = reg.add(model("a", &mut vp)).unwrap();
        let b = reg.add(model("b", &mut vp)).unwrap();
        assert_ne!(a, b);
        assert_eq!(reg.names().collect::<Vec<_>>(), ["a", "b"]);
        assert_eq!(reg.selected().map(|m| m.id()), Some(b));
    }

    #[test]
    fn duplicate_name_is_rejected() {
        let mut vp = viewport();
        let mut reg = SceneRegistry::new();
        let _ = reg.add(model("a", &mut vp)).unwrap();
        assert!(matches!(
            reg.add(model("a", &mut vp)),
            Err(BiovisError::DuplicateName(name)) if name == "a"
        ));
        assert_eq!(reg.len(), 1);
    }

    #[test]
    fn unique_name_appends_counter() {
        let mut vp = viewport();
        let mut reg = SceneRegistry::new();
        assert_eq!(reg.unique_name("1crn"), "1crn");
        let _ = reg.add(model("1crn", &mut vp)).unwrap();
        assert_eq!(reg.unique_name("1crn"), "1crn (2)");
        let _ = reg.add(model("1crn (2)", &mut vp)).unwrap();
        assert_eq!(reg.unique_name("1crn"), "1crn (3)");
    }

    #[test]
    fn remove_drops_every_representation() {
        let mut vp = viewport();
        let mut reg = SceneRegistry::new();
        let mut m = model("a", &mut vp);
        let surface = vp.add_representation(Arc::new(TriMesh::default()), STYLE);
        assert!(m
            .replace_surface(SurfaceAttachment {
                mesh: Arc::new(TriMesh::default()),
                handle: surface,
            })
            .is_none());
        let kept = reg.add(model("b", &mut vp)).unwrap();
        let _ = reg.add(m).unwrap();
        assert_eq!(vp.len(), 3);

        let removed = reg.remove("a", &mut vp).unwrap();
        assert_eq!(vp.len(), 1);
        for handle in removed.handles() {
            assert!(!vp.contains(handle));
        }
        assert!(reg.selected().is_none());
        assert!(reg.get_by_id(kept).is_some());
        assert!(reg.remove("a", &mut vp).is_none());
    }

    #[test]
    fn selection_cycles_and_clears() {
        let mut vp = viewport();
        let mut reg = SceneRegistry::new();
        for name in ["a", "b", "c"] {
            let _ = reg.add(model(name, &mut vp)).unwrap();
        }
        assert!(reg.select(Some("a")));
        assert_eq!(reg.select_next().map(|m| m.name.as_str()), Some("b"));
        assert!(reg.select(Some("c")));
        assert_eq!(reg.select_next().map(|m| m.name.as_str()), Some("a"));
        assert!(!reg.select(Some("missing")));
        assert!(reg.selected().is_none());
        assert!(!reg.select(None));
    }

    #[test]
    fn select_next_on_empty_registry() {
        let mut reg = SceneRegistry::new();
        assert!(reg.select_next().is_none());
    }
}

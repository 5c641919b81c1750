//! Turns a file path or remote identifier into the parts of a structure
//! model: atom positions and the atom point mesh.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use glam::Vec3;

use crate::error::BiovisError;
use crate::geometry::PointMesh;
use crate::options::{FetchOptions, GeometryOptions};
use crate::structure::{self, fetch};

/// Everything a load job produces, ready to be registered.
#[derive(Debug, Clone)]
pub struct LoadedStructure {
    /// Proposed display name (file stem or upper-cased PDB id).
    pub name: String,
    /// File the structure was parsed from.
    pub source: PathBuf,
    /// One position per atom.
    pub atom_positions: Vec<Vec3>,
    /// One sphere primitive per atom, also what the viewport draws.
    pub point_mesh: Arc<PointMesh>,
}

/// Display name derived from a path: its file stem.
#[must_use]
pub fn display_name_for(path: &Path) -> String {
    path.file_stem().map_or_else(
        || path.display().to_string(),
        |stem| stem.to_string_lossy().into_owned(),
    )
}

/// Parse `path` and build its point mesh. `name` overrides the file stem.
///
/// # Errors
///
/// [`BiovisError::Parse`] when the file cannot be parsed or has no atoms.
pub fn load_from_file(
    path: &Path,
    name: Option<&str>,
    geometry: &GeometryOptions,
) -> Result<LoadedStructure, BiovisError> {
    let parsed = structure::parse_structure(path)?;
    let point_mesh = PointMesh::from_positions(&parsed.atom_positions, geometry);
    Ok(LoadedStructure {
        name: name.map_or_else(|| display_name_for(path), str::to_owned),
        source: path.to_path_buf(),
        atom_positions: parsed.atom_positions,
        point_mesh: Arc::new(point_mesh),
    })
}

/// Download (or reuse the cached copy of) PDB entry `id`, then load it under
/// its upper-cased identifier.
///
/// # Errors
///
/// [`BiovisError::Fetch`] when retrieval fails, [`BiovisError::Parse`] when
/// the downloaded file cannot be parsed.
pub fn load_from_remote(
    id: &str,
    fetch_options: &FetchOptions,
    geometry: &GeometryOptions,
) -> Result<LoadedStructure, BiovisError> {
    let path = fetch::fetch_structure(id, fetch_options)?;
    let name = fetch::normalize_pdb_id(id)?;
    load_from_file(&path, Some(&name), geometry)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::structure::test_support::{three_atoms, write_pdb};

    #[test]
    fn one_sphere_per_atom_named_after_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = write_pdb(dir.path(), "triad", &three_atoms());
        let loaded = load_from_file(&path, None, &GeometryOptions::default()).unwrap();
        assert_eq!(loaded.name, "triad");
        assert_eq!(loaded.source, path);
        assert_eq!(loaded.point_mesh.len(), 3);
        assert_eq!(
            loaded.point_mesh.combined_points().len(),
            3 * loaded.point_mesh.vertices_per_sphere()
        );
    }

    #[test]
    fn sphere_count_is_stable_across_reloads() {
        let dir = tempfile::tempdir().unwrap();
        let path = write_pdb(dir.path(), "triad", &three_atoms());
        let geometry = GeometryOptions::default();
        let first = load_from_file(&path, None, &geometry).unwrap();
        let second = load_from_file(&path, Some("again"), &geometry).unwrap();
        assert_eq!(second.name, "again");
        assert_eq!(first.point_mesh.spheres(), second.point_mesh.spheres());
    }

    #[test]
    fn remote_load_uses_cache_and_uppercases_name() {
        let dir = tempfile::tempdir().unwrap();
        let fetch_options = FetchOptions {
            base_url: "http://127.0.0.1:9".into(),
            cache_dir: dir.path().to_path_buf(),
            timeout_secs: 1,
        };
        let _ = write_pdb(dir.path(), "1ABC", &three_atoms());
        let loaded =
            load_from_remote("1abc", &fetch_options, &GeometryOptions::default()).unwrap();
        assert_eq!(loaded.name, "1ABC");
        assert_eq!(loaded.point_mesh.len(), 3);
    }

    #[test]
    fn display_name_is_file_stem() {
        assert_eq!(display_name_for(Path::new("/data/4hhb.pdb")), "4hhb");
        assert_eq!(display_name_for(Path::new("model.v2.cif")), "model.v2");
    }
}

//! Structure file parsing.
//!
//! Coordinates are read with `pdbtbx` and flattened to one position per atom
//! in model → chain → residue → atom order. Alternate locations of an atom
//! count once.

/// Remote structure retrieval from the RCSB archive.
pub mod fetch;

use std::path::Path;

use glam::Vec3;
use pdbtbx::{Format, ReadOptions, Residue, StrictnessLevel, PDB};

use crate::error::BiovisError;

/// Atom coordinates and hierarchy counts of one parsed structure file.
#[derive(Debug, Clone, PartialEq)]
pub struct ParsedStructure {
    /// One position per atom, in file hierarchy order.
    pub atom_positions: Vec<Vec3>,
    /// Number of models in the file.
    pub model_count: usize,
    /// Chains summed over all models.
    pub chain_count: usize,
    /// Residues summed over all models.
    pub residue_count: usize,
}

impl ParsedStructure {
    /// Number of atoms.
    #[must_use]
    pub fn atom_count(&self) -> usize {
        self.atom_positions.len()
    }

    fn from_pdb(pdb: &PDB) -> Self {
        let mut parsed = Self {
            atom_positions: Vec::new(),
            model_count: 0,
            chain_count: 0,
            residue_count: 0,
        };
        for model in pdb.models() {
            parsed.model_count += 1;
            for chain in model.chains() {
                parsed.chain_count += 1;
                for residue in chain.residues() {
                    parsed.residue_count += 1;
                    parsed.atom_positions.extend(residue_positions(residue));
                }
            }
        }
        parsed
    }
}

/// One position per atom name in `residue`.
///
/// Atoms shared between alternate conformers appear in each of them; they and
/// the alternate locations of split atoms collapse to a single atom, keeping
/// the highest-occupancy location (the first one on ties).
fn residue_positions(residue: &Residue) -> impl Iterator<Item = Vec3> + '_ {
    let mut kept: Vec<(&str, f64, Vec3)> = Vec::new();
    for atom in residue.conformers().flat_map(|conformer| conformer.atoms()) {
        let position = Vec3::new(atom.x() as f32, atom.y() as f32, atom.z() as f32);
        let occupancy = atom.occupancy();
        match kept.iter_mut().find(|(name, ..)| *name == atom.name()) {
            Some(slot) if occupancy > slot.1 => {
                slot.1 = occupancy;
                slot.2 = position;
            }
            Some(_) => {}
            None => kept.push((atom.name(), occupancy, position)),
        }
    }
    kept.into_iter().map(|(_, _, position)| position)
}

/// File format implied by the path extension: `.cif`/`.mmcif` are mmCIF,
/// anything else is read as PDB.
#[must_use]
pub fn format_for_path(path: &Path) -> Format {
    match path
        .extension()
        .and_then(|e| e.to_str())
        .map(str::to_ascii_lowercase)
        .as_deref()
    {
        Some("cif" | "mmcif") => Format::Mmcif,
        _ => Format::Pdb,
    }
}

/// Parse a structure file.
///
/// # Errors
///
/// [`BiovisError::Parse`] when the file is missing, unreadable, malformed, or
/// contains no atoms.
pub fn parse_structure(path: &Path) -> Result<ParsedStructure, BiovisError> {
    if !path.is_file() {
        return Err(BiovisError::Parse(format!(
            "{} is not a readable file",
            path.display()
        )));
    }
    let path_str = path.to_string_lossy();
    let (pdb, warnings) = ReadOptions::default()
        .set_format(format_for_path(path))
        .set_level(StrictnessLevel::Loose)
        .read(&*path_str)
        .map_err(|errors| {
            let detail = errors
                .first()
                .map_or_else(|| "unknown error".to_owned(), |e| e.short_description().to_owned());
            BiovisError::Parse(format!("{}: {detail}", path.display()))
        })?;
    if !warnings.is_empty() {
        log::debug!("{}: {} parser warning(s)", path.display(), warnings.len());
    }

    let parsed = ParsedStructure::from_pdb(&pdb);
    if parsed.atom_positions.is_empty() {
        return Err(BiovisError::Parse(format!(
            "{} contains no atoms",
            path.display()
        )));
    }
    log::info!(
        "parsed {}: {} atoms, {} residues, {} chains, {} models",
        path.display(),
        parsed.atom_count(),
        parsed.residue_count,
        parsed.chain_count,
        parsed.model_count
    );
    Ok(parsed)
}


#[cfg(test)]
mod tests {
    use super::test_support::*;
    use super::*;

    #[test]
    fn parses_one_position_per_atom() {
        let dir = tempfile::tempdir().unwrap();
        let path = write_pdb(dir.path(), "tri", &three_atoms());
        let parsed = parse_structure(&path).unwrap();
        assert_eq!(parsed.atom_count(), 3);
        assert_eq!(parsed.model_count, 1);
        assert_eq!(parsed.chain_count, 1);
        assert_eq!(parsed.residue_count, 3);
        assert!((parsed.atom_positions[1] - Vec3::X).length() < 1e-4);
    }

    fn atom_line(serial: usize, name: &str, alt_loc: char, x: f32, occupancy: f32) -> String {
        format!(
            "ATOM  {serial:>5} {name:<4}{alt_loc}GLY A   1    {x:>8.3}{:>8.3}{:>8.3}{occupancy:>6.2}{:>6.2}          {:>2}\n",
            0.0, 0.0, 0.0, name.get(..1).unwrap_or("C")
        )
    }

    fn write_altloc_residue(dir: &Path, ca_occupancy: [f32; 2]) -> std::path::PathBuf {
        let text = [
            atom_line(1, "N", ' ', 1.0, 1.0),
            atom_line(2, "CA", 'A', 0.0, ca_occupancy[0]),
            atom_line(3, "CA", 'B', 2.0, ca_occupancy[1]),
            atom_line(4, "C", ' ', 1.1, 1.0),
        ]
        .concat()
            + "END\n";
        let path = dir.join("altloc.pdb");
        std::fs::write(&path, text).unwrap();
        path
    }

    #[test]
    fn alternate_locations_count_as_one_atom() {
        let dir = tempfile::tempdir().unwrap();
        let path = write_altloc_residue(dir.path(), [0.6, 0.4]);
        let parsed = parse_structure(&path).unwrap();
        assert_eq!(parsed.atom_count(), 3);
        assert_eq!(parsed.residue_count, 1);
        let xs: Vec<f32> = parsed.atom_positions.iter().map(|p| p.x).collect();
        for expected in [1.0, 0.0, 1.1] {
            assert!(xs.iter().any(|x| (x - expected).abs() < 1e-4), "{xs:?}");
        }
        assert!(xs.iter().all(|x| (x - 2.0).abs() > 1e-4), "{xs:?}");
    }

    #[test]
    fn highest_occupancy_location_wins() {
        let dir = tempfile::tempdir().unwrap();
        let path = write_altloc_residue(dir.path(), [0.3, 0.7]);
        let parsed = parse_structure(&path).unwrap();
        assert_eq!(parsed.atom_count(), 3);
        let xs: Vec<f32> = parsed.atom_positions.iter().map(|p| p.x).collect();
        assert!(xs.iter().any(|x| (x - 2.0).abs() < 1e-4), "{xs:?}");
        assert!(xs.iter().all(|x| x.abs() > 1e-4), "{xs:?}");
    }

    #[test]
    fn reparsing_gives_the_same_atoms() {
        let dir = tempfile::tempdir().unwrap();
        let path = write_pdb(dir.path(), "tri", &three_atoms());
        assert_eq!(parse_structure(&path).unwrap(), parse_structure(&path).unwrap());
    }

    #[test]
    fn non_structure_file_is_a_parse_error() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("notes.pdb");
        std::fs::write(&path, "this is not a structure\njust some notes\n").unwrap();
        assert!(matches!(parse_structure(&path), Err(BiovisError::Parse(_))));
    }

    #[test]
    fn missing_file_is_a_parse_error() {
        assert!(matches!(
            parse_structure(Path::new("/definitely/not/here.pdb")),
            Err(BiovisError::Parse(_))
        ));
    }

    #[test]
    fn format_follows_extension() {
        assert!(matches!(format_for_path(Path::new("a.CIF")), Format::Mmcif));
        assert!(matches!(format_for_path(Path::new("a.mmcif")), Format::Mmcif));
        assert!(matches!(format_for_path(Path::new("a.ent")), Format::Pdb));
        assert!(matches!(format_for_path(Path::new("noext")), Format::Pdb));
    }
}

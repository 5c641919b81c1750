use std::fmt::Write as _;
use std::io::Cursor;
use std::path::Path;

use glam::Vec3;
use serde::{Deserialize, Serialize};
use stl_io::{Normal, Triangle, Vertex};

use super::TriMesh;
use crate::error::BiovisError;

/// STL encoding used when exporting a surface.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StlFormat {
    /// 80-byte header plus packed little-endian triangles.
    #[default]
    Binary,
    /// Human-readable `solid ... endsolid` text.
    Ascii,
}

impl StlFormat {
    /// Format implied by a leading `solid` keyword in the first bytes.
    #[must_use]
    pub fn sniff(bytes: &[u8]) -> Self {
        let head = &bytes[..bytes.len().min(5)];
        if head.eq_ignore_ascii_case(b"solid") && !looks_binary(bytes) {
            Self::Ascii
        } else {
            Self::Binary
        }
    }
}

/// Binary files may start with "solid" too; trust the triangle count when it
/// matches the file length exactly.
fn looks_binary(bytes: &[u8]) -> bool {
    let Some(count) = bytes.get(80..84) else {
        return false;
    };
    let count = u32::from_le_bytes([count[0], count[1], count[2], count[3]]) as usize;
    bytes.len() == 84 + count * 50
}

/// Encode `mesh` as STL bytes.
///
/// Each triangle carries its geometric face normal.
pub fn encode_stl(mesh: &TriMesh, name: &str, format: StlFormat) -> Result<Vec<u8>, BiovisError> {
    match format {
        StlFormat::Binary => {
            let triangles: Vec<Triangle> = (0..mesh.triangle_count())
                .map(|i| {
                    let [a, b, c] = mesh.triangles[i];
                    Triangle {
                        normal: Normal::new(mesh.face_normal(i).to_array()),
                        vertices: [
                            Vertex::new(mesh.positions[a as usize].to_array()),
                            Vertex::new(mesh.positions[b as usize].to_array()),
                            Vertex::new(mesh.positions[c as usize].to_array()),
                        ],
                    }
                })
                .collect();
            let mut cursor = Cursor::new(Vec::new());
            stl_io::write_stl(&mut cursor, triangles.iter())?;
            Ok(cursor.into_inner())
        }
        StlFormat::Ascii => Ok(encode_ascii(mesh, name).into_bytes()),
    }
}

fn encode_ascii(mesh: &TriMesh, name: &str) -> String {
    let name: String = name.chars().filter(|c| !c.is_whitespace()).collect();
    let mut out = String::new();
    let _ = writeln!(out, "solid {name}");
    for (i, tri) in mesh.triangles.iter().enumerate() {
        let n = mesh.face_normal(i);
        let _ = writeln!(out, "  facet normal {:.6e} {:.6e} {:.6e}", n.x, n.y, n.z);
        out.push_str("    outer loop\n");
        for &v in tri {
            let p = mesh.positions[v as usize];
            let _ = writeln!(out, "      vertex {:.6e} {:.6e} {:.6e}", p.x, p.y, p.z);
        }
        out.push_str("    endloop\n");
        out.push_str("  endfacet\n");
    }
    let _ = writeln!(out, "endsolid {name}");
    out
}

/// Write `mesh` to `path`. The file is only created once encoding succeeded.
pub fn write_stl(mesh: &TriMesh, path: &Path, format: StlFormat) -> Result<(), BiovisError> {
    let name = path
        .file_stem()
        .map_or_else(|| "surface".to_owned(), |s| s.to_string_lossy().into_owned());
    let bytes = encode_stl(mesh, &name, format)?;
    std::fs::write(path, bytes)?;
    log::info!(
        "wrote {} triangles ({format:?} STL) to {}",
        mesh.triangle_count(),
        path.display()
    );
    Ok(())
}

/// Read an STL file (binary or ASCII) into an indexed mesh.
///
/// Coincident vertices are merged by the reader, so counts match the mesh
/// that was written.
pub fn read_stl(path: &Path) -> Result<TriMesh, BiovisError> {
    let bytes = std::fs::read(path)?;
    decode_stl(bytes)
}

/// Decode in-memory STL bytes.
pub fn decode_stl(bytes: Vec<u8>) -> Result<TriMesh, BiovisError> {
    let mut cursor = Cursor::new(bytes);
    let indexed = stl_io::read_stl(&mut cursor)
        .map_err(|e| BiovisError::Parse(format!("invalid STL: {e}")))?;
    let positions = indexed
        .vertices
        .iter()
        .map(|v| Vec3::new(v[0], v[1], v[2]))
        .collect();
    let triangles = indexed
        .faces
        .iter()
        .map(|f| [f.vertices[0] as u32, f.vertices[1] as u32, f.vertices[2] as u32])
        .collect();
    Ok(TriMesh::from_triangles(positions, triangles))
}

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
/// Colors and opacity of the rendered representations.
pub struct DisplayOptions {
    /// RGB color of atom spheres.
    pub atom_color: [f32; 3],
    /// RGB color of generated surfaces.
    pub surface_color: [f32; 3],
    /// Surface opacity in `[0, 1]`.
    pub surface_opacity: f32,
    /// RGB clear color of the viewport.
    pub background: [f32; 3],
}

impl Default for DisplayOptions {
    fn default() -> Self {
        Self {
            atom_color: [0.93, 0.93, 0.93],
            surface_color: [0.5, 0.5, 0.5],
            surface_opacity: 0.5,
            background: [0.30, 0.30, 0.36],
        }
    }
}

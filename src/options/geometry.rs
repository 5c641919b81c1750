use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
/// Geometry detail options for atom spheres and the derived surface.
pub struct GeometryOptions {
    /// Atom sphere radius in angstroms.
    pub atom_radius: f32,
    /// Number of segments around each sphere's polar axis.
    pub sphere_theta_resolution: u32,
    /// Number of rings from pole to pole (poles included).
    pub sphere_phi_resolution: u32,
}

impl GeometryOptions {
    /// Smallest theta resolution that still yields a closed sphere.
    pub const MIN_THETA_RESOLUTION: u32 = 3;
    /// Smallest phi resolution that still yields a closed sphere.
    pub const MIN_PHI_RESOLUTION: u32 = 3;

    /// Resolutions clamped to the minimum closed-sphere tessellation.
    #[must_use]
    pub fn sphere_resolution(&self) -> (u32, u32) {
        (
            self.sphere_theta_resolution.max(Self::MIN_THETA_RESOLUTION),
            self.sphere_phi_resolution.max(Self::MIN_PHI_RESOLUTION),
        )
    }
}

impl Default for GeometryOptions {
    fn default() -> Self {
        Self {
            atom_radius: 0.5,
            sphere_theta_resolution: 30,
            sphere_phi_resolution: 30,
        }
    }
}

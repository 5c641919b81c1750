use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
/// Camera projection and control parameters.
pub struct CameraOptions {
    /// Vertical field of view in degrees.
    pub fovy: f32,
    /// Lower bound for the near clipping plane distance.
    pub znear: f32,
    /// Far clipping plane distance beyond the framed content.
    pub zfar: f32,
    /// Orbit rotation in degrees per dragged pixel.
    pub rotate_speed: f32,
    /// Pan multiplier; 1.0 keeps the focus point under the cursor.
    pub pan_speed: f32,
    /// Fractional distance change per scroll line.
    pub zoom_speed: f32,
}

impl Default for CameraOptions {
    fn default() -> Self {
        Self {
            fovy: 30.0,
            znear: 0.05,
            zfar: 2000.0,
            rotate_speed: 0.5,
            pan_speed: 1.0,
            zoom_speed: 0.1,
        }
    }
}

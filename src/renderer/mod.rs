//! GPU rendering of the viewport: one indexed-mesh pass with opaque and
//! translucent pipelines, followed by the orientation triad.

mod axes;
pub mod mesh_pass;
pub(crate) mod pipeline_util;

pub use mesh_pass::MeshRenderer;

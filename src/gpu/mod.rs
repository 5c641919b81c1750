//! GPU resource management: device/surface initialization and render
//! targets.

/// wgpu device, surface, and queue initialization.
pub mod render_context;
/// Depth attachment texture.
pub mod texture;

pub use render_context::{RenderContext, RenderContextError};
pub use texture::DepthTarget;

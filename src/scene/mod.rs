//! Scene manager: loaded structures and the list selection.
//!
//! Every [`StructureModel`] lives in the [`SceneRegistry`] under a unique
//! display name. Models only hold [`VisualHandle`](crate::viewport::VisualHandle)s
//! into the viewport; removing a model from the registry retires them.

mod model;
mod registry;

pub use model::{ModelId, StructureModel, SurfaceAttachment};
pub use registry::SceneRegistry;

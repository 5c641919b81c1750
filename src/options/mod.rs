//! Centralized runtime options with TOML support.
//!
//! Geometry detail, colors, camera behaviour, remote fetch, export format,
//! and keybindings are consolidated here. Options serialize to/from TOML; every
//! section uses `#[serde(default)]` so partial files work.

mod camera;
mod display;
mod export;
mod fetch;
mod geometry;
mod keybindings;

use std::path::Path;

pub use camera::CameraOptions;
pub use display::DisplayOptions;
pub use export::ExportOptions;
pub use fetch::FetchOptions;
pub use geometry::GeometryOptions;
pub use keybindings::KeybindingOptions;
use serde::{Deserialize, Serialize};

use crate::error::BiovisError;

/// Top-level options container.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Default)]
#[serde(default)]
pub struct Options {
    /// Atom sphere and surface tessellation parameters.
    pub geometry: GeometryOptions,
    /// Representation colors and opacity.
    pub display: DisplayOptions,
    /// Camera projection and control parameters.
    pub camera: CameraOptions,
    /// Remote structure retrieval settings.
    pub fetch: FetchOptions,
    /// Surface export settings.
    pub export: ExportOptions,
    /// Keyboard binding options.
    pub keybindings: KeybindingOptions,
}

impl Options {
    /// Load options from a TOML file. Missing fields use defaults.
    pub fn load(path: &Path) -> Result<Self, BiovisError> {
        let content = std::fs::read_to_string(path).map_err(BiovisError::Io)?;
        toml::from_str(&content)
            .map_err(|e| BiovisError::OptionsParse(e.to_string()))
    }

    /// Save options to a TOML file (pretty-printed).
    pub fn save(&self, path: &Path) -> Result<(), BiovisError> {
        let content = toml::to_string_pretty(self)
            .map_err(|e| BiovisError::OptionsParse(e.to_string()))?;
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent).map_err(BiovisError::Io)?;
        }
        std::fs::write(path, content).map_err(BiovisError::Io)
    }
}

//! Crate-level error types.

use std::fmt;

use crate::gpu::RenderContextError;

/// Unmet preconditions of user-triggered operations.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Precondition {
    /// No structure is selected in the scene manager.
    NoSelection,
    /// The selected structure has no generated surface.
    NoSurface,
    /// The selected structure has no atoms to triangulate.
    EmptyPointMesh,
}

impl Precondition {
    fn title(self) -> &'static str {
        match self {
            Self::NoSelection => "No Selection",
            Self::NoSurface => "No Surface",
            Self::EmptyPointMesh => "No Atoms",
        }
    }
}

impl fmt::Display for Precondition {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::NoSelection => {
                "Please select a structure in the Scene Manager."
            }
            Self::NoSurface => {
                "Please generate a surface for the selected structure first."
            }
            Self::EmptyPointMesh => "The selected structure has no atoms.",
        })
    }
}

/// Errors produced by the biovis crate.
#[derive(Debug)]
pub enum BiovisError {
    /// Structure file is unreadable, malformed, or holds no atoms.
    Parse(String),
    /// Remote structure could not be retrieved.
    Fetch(String),
    /// Surface triangulation or boundary extraction failed.
    Generation(String),
    /// The requested operation is not possible in the current state.
    Precondition(Precondition),
    /// A structure with this name is already registered.
    DuplicateName(String),
    /// A background job was cancelled before it finished.
    Cancelled,
    /// Generic I/O failure.
    Io(std::io::Error),
    /// Failed to spawn a background thread.
    ThreadSpawn(std::io::Error),
    /// TOML options parsing/serialization failure.
    OptionsParse(String),
    /// GPU context initialization failure.
    Gpu(RenderContextError),
    /// Viewer event-loop failure.
    Viewer(String),
}

impl BiovisError {
    /// Short title used for the modal warning shown to the user.
    #[must_use]
    pub fn title(&self) -> &'static str {
        match self {
            Self::Parse(_) => "File Error",
            Self::Fetch(_) => "Download Error",
            Self::Generation(_) => "Surface Error",
            Self::Precondition(p) => p.title(),
            Self::DuplicateName(_) => "Duplicate Name",
            Self::Cancelled => "Cancelled",
            Self::Io(_) => "I/O Error",
            Self::ThreadSpawn(_) => "Worker Error",
            Self::OptionsParse(_) => "Options Error",
            Self::Gpu(_) => "GPU Error",
            Self::Viewer(_) => "Viewer Error",
        }
    }

    /// Whether this error should be raised as a modal warning (as opposed to
    /// a status-line only message).
    #[must_use]
    pub fn is_modal(&self) -> bool {
        !matches!(self, Self::Cancelled)
    }
}

impl fmt::Display for BiovisError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Parse(msg) => write!(f, "could not parse structure: {msg}"),
            Self::Fetch(msg) => write!(f, "could not retrieve structure: {msg}"),
            Self::Generation(msg) => {
                write!(f, "surface generation failed: {msg}")
            }
            Self::Precondition(p) => fmt::Display::fmt(p, f),
            Self::Viewer(msg) => f.write_str(msg),
            Self::DuplicateName(name) => {
                write!(f, "a structure named '{name}' is already loaded")
            }
            Self::Cancelled => f.write_str("operation cancelled"),
            Self::Io(e) => write!(f, "I/O error: {e}"),
            Self::ThreadSpawn(e) => {
                write!(f, "failed to spawn thread: {e}")
            }
            Self::OptionsParse(msg) => {
                write!(f, "options parse error: {msg}")
            }
            Self::Gpu(e) => write!(f, "GPU error: {e}"),
        }
    }
}

impl std::error::Error for BiovisError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Self::Gpu(e) => Some(e),
            Self::Io(e) | Self::ThreadSpawn(e) => Some(e),
            _ => None,
        }
    }
}

impl From<RenderContextError> for BiovisError {
    fn from(e: RenderContextError) -> Self {
        Self::Gpu(e)
    }
}

impl From<std::io::Error> for BiovisError {
    fn from(e: std::io::Error) -> Self {
        Self::Io(e)
    }
}

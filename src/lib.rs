// -- Lint policy ---------------------------------------------------------
// This is the single source of truth for crate-wide lints.

// Broad lint groups
#![deny(clippy::all)]
#![deny(clippy::pedantic)]
#![deny(clippy::nursery)]
// Documentation
#![warn(missing_docs)]
#![warn(rustdoc::broken_intra_doc_links)]
#![warn(rustdoc::private_intra_doc_links)]
#![warn(rustdoc::bare_urls)]
// No panicking in library code
#![deny(clippy::unwrap_used)]
#![deny(clippy::expect_used)]
#![deny(clippy::panic)]
#![deny(clippy::todo)]
#![deny(clippy::unimplemented)]
// No debug/print artifacts
#![deny(clippy::dbg_macro)]
#![deny(clippy::print_stdout)]
#![deny(clippy::print_stderr)]
// Import hygiene
#![deny(clippy::wildcard_imports)]
// Complexity limits (thresholds in clippy.toml)
#![deny(clippy::cognitive_complexity)]
#![deny(clippy::excessive_nesting)]
// Function signature hygiene
#![deny(clippy::too_many_arguments)]
#![deny(clippy::fn_params_excessive_bools)]
// Clone / pass-by-value hygiene
#![deny(clippy::needless_pass_by_value)]
#![deny(clippy::implicit_clone)]
// String hygiene
#![deny(clippy::inefficient_to_string)]
#![deny(clippy::redundant_closure_for_method_calls)]
#![deny(clippy::manual_string_new)]
#![deny(clippy::str_to_string)]
// Cargo lints (warn, not deny since cargo lints can be noisy)
#![warn(clippy::cargo)]
// Unused / redundant code
#![warn(unused_results)]
#![warn(unused_qualifications)]
// Cast hygiene
#![warn(trivial_casts)]
#![warn(trivial_numeric_casts)]

//! Interactive viewer for macromolecular structures.
//!
//! BioVis loads PDB / mmCIF files (from disk or the RCSB archive), shows
//! every atom as a sphere, wraps a structure in a closed translucent
//! surface, and exports that surface as STL.
//!
//! # Key entry points
//!
//! - [`Session`] - scene registry, viewport, and background jobs; driven by
//!   [`Command`]s
//! - [`geometry::generate_surface`] - closed envelope around a structure's
//!   atom spheres
//! - [`geometry::stl`] - STL export and import
//! - [`options::Options`] - runtime configuration loaded from TOML
//! - `Viewer` (feature `viewer`) - the winit window
//!
//! # Architecture
//!
//! Parsing, downloading, surface generation, and export run on one
//! background worker thread. The interaction thread submits jobs, polls
//! results once per frame, and is the only place the scene is mutated.
//! Rendering mirrors the [`viewport::Viewport`] into GPU buffers with a
//! single mesh pass.

pub mod error;
pub mod geometry;
pub mod gpu;
pub mod input;
pub mod loader;
pub mod options;
pub mod renderer;
pub mod scene;
pub mod session;
pub mod structure;
pub mod viewport;

#[cfg(feature = "gui")]
pub mod gui;
#[cfg(feature = "viewer")]
mod viewer;

pub use error::BiovisError;
pub use session::{Command, Session};
#[cfg(feature = "viewer")]
pub use viewer::{Viewer, ViewerBuilder};

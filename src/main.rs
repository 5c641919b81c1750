//! `biovis` command-line entry point.

use std::path::{Path, PathBuf};
use std::process::ExitCode;

use biovis::options::Options;
use biovis::structure::fetch::normalize_pdb_id;
use biovis::{Command, Viewer};
use clap::Parser;

/// Interactive viewer for macromolecular structures.
#[derive(Debug, Parser)]
#[command(name = "biovis", version, about)]
struct Cli {
    /// Structure file (.pdb, .cif) or a four-character PDB ID to download.
    input: Option<String>,

    /// TOML options file.
    #[arg(long, value_name = "FILE")]
    options: Option<PathBuf>,
}

/// Existing files open directly; anything else shaped like a PDB ID is
/// downloaded.
fn initial_command(input: &str) -> Command {
    let path = Path::new(input);
    if !path.exists() {
        if let Ok(id) = normalize_pdb_id(input) {
            return Command::Fetch(id);
        }
    }
    Command::Open(path.to_path_buf())
}

fn main() -> ExitCode {
    env_logger::init();
    let cli = Cli::parse();

    let options = match cli.options.as_deref().map(Options::load).transpose() {
        Ok(options) => options.unwrap_or_default(),
        Err(e) => {
            log::error!("{e}");
            return ExitCode::FAILURE;
        }
    };

    let mut builder = Viewer::builder().with_options(options);
    if let Some(input) = &cli.input {
        builder = builder.with_command(initial_command(input));
    }

    match builder.build().run() {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            log::error!("{e}");
            ExitCode::FAILURE
        }
    }
}

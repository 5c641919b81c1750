//! Native file pickers and warning boxes.

use std::path::PathBuf;

use rfd::{FileDialog, MessageButtons, MessageDialog, MessageLevel};

use crate::session::{Command, Notice, Session};

/// Structure file extensions offered by the open dialog.
const STRUCTURE_EXTENSIONS: &[&str] = &["pdb", "ent", "cif", "mmcif"];

/// Ask for a structure file to open.
#[must_use]
pub fn pick_structure_file() -> Option<PathBuf> {
    FileDialog::new()
        .set_title("Open Structure")
        .add_filter("PDB / mmCIF", STRUCTURE_EXTENSIONS)
        .add_filter("All files", &["*"])
        .pick_file()
}

/// Ask where to write an STL file, suggesting `default_name`.
#[must_use]
pub fn pick_export_path(default_name: &str) -> Option<PathBuf> {
    FileDialog::new()
        .set_title("Export Surface")
        .add_filter("STL", &["stl"])
        .set_file_name(default_name)
        .save_file()
}

/// Show a blocking warning box.
pub fn show_notice(notice: &Notice) {
    let _ = MessageDialog::new()
        .set_level(MessageLevel::Warning)
        .set_title(&notice.title)
        .set_description(&notice.message)
        .set_buttons(MessageButtons::Ok)
        .show();
}

/// Open command for the file the user picks, if any.
pub(crate) fn open_command() -> Option<Command> {
    pick_structure_file().map(Command::Open)
}

/// Export command for the destination the user picks. The save dialog is
/// skipped when there is nothing to export.
pub(crate) fn export_command(session: &mut Session) -> Option<Command> {
    session.ensure_exportable().ok()?;
    let name = session.default_export_name()?;
    pick_export_path(&name).map(Command::ExportSurface)
}

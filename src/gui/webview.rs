//! Wry webview child of the winit window.
//!
//! Creates a [`wry::WebView`] docked at the right edge of the window, loads
//! the bundled scene-manager page, and bridges IPC between the page and the
//! session.

use std::sync::mpsc;

use wry::{dpi, Rect, WebView, WebViewBuilder};

use crate::session::PanelState;

/// Scene manager page.
const PANEL_HTML: &str = include_str!("../../assets/panel.html");

/// Width of the scene panel in physical pixels.
pub const PANEL_WIDTH: u32 = 260;

/// Actions sent from the panel page to the native side.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum UiAction {
    /// Show the open-file dialog.
    OpenFile,
    /// Download a PDB entry.
    Fetch {
        /// Four-character PDB identifier as typed.
        id: String,
    },
    /// Generate a surface for the selection.
    GenerateSurface,
    /// Show the save dialog and export the selected surface.
    ExportSurface,
    /// Select a structure by name.
    Select {
        /// Structure name from the list.
        name: String,
    },
    /// Delete the selection.
    DeleteSelected,
    /// Cancel pending jobs.
    Cancel,
    /// Frame everything in view.
    ResetCamera,
}

/// Create the wry webview as a child of the given window.
///
/// Returns `(webview, action_rx)`; the receiver yields [`UiAction`]s from the
/// page.
pub fn create_webview<W: wry::raw_window_handle::HasWindowHandle>(
    window: &W,
    window_width: u32,
    window_height: u32,
) -> Result<(WebView, mpsc::Receiver<UiAction>), wry::Error> {
    let (tx, rx) = mpsc::channel();

    let webview = WebViewBuilder::new()
        .with_bounds(panel_bounds(window_width, window_height))
        .with_html(PANEL_HTML)
        .with_ipc_handler(move |req| {
            let Ok(msg) = serde_json::from_str::<serde_json::Value>(req.body()) else {
                return;
            };
            match parse_action(&msg) {
                Some(action) => {
                    let _ = tx.send(action);
                }
                None => log::debug!("panel: ignoring message {msg}"),
            }
        })
        .build_as_child(window)?;

    Ok((webview, rx))
}

/// Compute the [`Rect`] for the panel at the right edge of the window.
#[must_use]
pub fn panel_bounds(window_width: u32, window_height: u32) -> Rect {
    let x = window_width.saturating_sub(PANEL_WIDTH);
    Rect {
        position: dpi::Position::Physical(dpi::PhysicalPosition::new(x as i32, 0)),
        size: dpi::Size::Physical(dpi::PhysicalSize::new(
            PANEL_WIDTH.min(window_width),
            window_height,
        )),
    }
}

/// Push the session snapshot to the page.
pub fn push_state(webview: &WebView, state: &PanelState) {
    let json = serde_json::to_string(state).unwrap_or_default();
    let _ = webview.evaluate_script(&format!(
        "window.__biovis_push_state('{}')",
        escape_js(&json)
    ));
}

fn escape_js(json: &str) -> String {
    json.replace('\\', "\\\\").replace('\'', "\\'")
}

/// Parse an IPC message from the page into a [`UiAction`].
fn parse_action(msg: &serde_json::Value) -> Option<UiAction> {
    let action = msg.get("action")?.as_str()?;
    match action {
        "open_file" => Some(UiAction::OpenFile),
        "fetch" => {
            let id = msg.get("id")?.as_str()?.to_owned();
            Some(UiAction::Fetch { id })
        }
        "generate_surface" => Some(UiAction::GenerateSurface),
        "export_surface" => Some(UiAction::ExportSurface),
        "select" => {
            let name = msg.get("name")?.as_str()?.to_owned();
            Some(UiAction::Select { name })
        }
        "delete_selected" => Some(UiAction::DeleteSelected),
        "cancel" => Some(UiAction::Cancel),
        "reset_camera" => Some(UiAction::ResetCamera),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;

    #[test]
    fn parses_panel_messages() {
        assert_eq!(
            parse_action(&json!({"action": "fetch", "id": "1crn"})),
            Some(UiAction::Fetch { id: "1crn".into() })
        );
        assert_eq!(
            parse_action(&json!({"action": "select", "name": "a (2)"})),
            Some(UiAction::Select { name: "a (2)".into() })
        );
        assert_eq!(
            parse_action(&json!({"action": "generate_surface"})),
            Some(UiAction::GenerateSurface)
        );
    }

    #[test]
    fn rejects_unknown_or_incomplete_messages() {
        assert_eq!(parse_action(&json!({"action": "explode"})), None);
        assert_eq!(parse_action(&json!({"action": "fetch"})), None);
        assert_eq!(parse_action(&json!({"id": "1crn"})), None);
    }

    #[test]
    fn quotes_are_escaped_for_script_injection() {
        assert_eq!(escape_js(r#"{"s":"it's"}"#), r#"{"s":"it\'s"}"#);
        assert_eq!(escape_js(r"a\b"), r"a\\b");
    }

    #[test]
    fn panel_is_docked_right() {
        let bounds = panel_bounds(1000, 700);
        assert_eq!(
            bounds.position,
            dpi::Position::Physical(dpi::PhysicalPosition::new(740, 0))
        );
        let narrow = panel_bounds(100, 50);
        assert_eq!(
            narrow.size,
            dpi::Size::Physical(dpi::PhysicalSize::new(100, 50))
        );
    }
}

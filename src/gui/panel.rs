//! Scene panel controller: owns the wry webview and turns its actions into
//! session commands.

use std::sync::mpsc;

use winit::window::Window;

use super::dialogs;
use super::webview::{self, UiAction};
use crate::session::{Command, PanelState, Session};

/// Owns the webview panel and the last state pushed to it.
pub(crate) struct PanelController {
    webview: Option<wry::WebView>,
    action_rx: Option<mpsc::Receiver<UiAction>>,
    pushed: Option<PanelState>,
}

impl PanelController {
    /// Controller without a webview yet.
    pub(crate) fn new() -> Self {
        Self {
            webview: None,
            action_rx: None,
            pushed: None,
        }
    }

    /// Create the wry webview. Without it the viewer keeps running with
    /// keyboard control only.
    pub(crate) fn init_webview(&mut self, window: &Window) {
        let inner = window.inner_size();
        match webview::create_webview(window, inner.width, inner.height) {
            Ok((wv, rx)) => {
                self.webview = Some(wv);
                self.action_rx = Some(rx);
            }
            Err(e) => {
                log::error!("Failed to create webview: {e}");
            }
        }
    }

    /// Dock the webview to the right edge of the window.
    pub(crate) fn apply_layout(&self, window: &Window) {
        let Some(ref wv) = self.webview else {
            return;
        };
        let inner = window.inner_size();
        let _ = wv.set_bounds(webview::panel_bounds(inner.width, inner.height));
    }

    /// Drain IPC actions from the webview and execute them.
    pub(crate) fn drain_and_apply(&mut self, session: &mut Session) {
        let Some(ref rx) = self.action_rx else {
            return;
        };
        let actions: Vec<UiAction> = rx.try_iter().collect();
        for action in actions {
            log::debug!("panel: {action:?}");
            if let Some(command) = command_for(action, session) {
                let _ = session.execute(command);
            }
        }
    }

    /// Push the session snapshot when it changed since the last push.
    pub(crate) fn push_state_if_changed(&mut self, session: &Session) {
        let Some(ref wv) = self.webview else {
            return;
        };
        let state = session.panel_state();
        if self.pushed.as_ref() != Some(&state) {
            webview::push_state(wv, &state);
            self.pushed = Some(state);
        }
    }
}

fn command_for(action: UiAction, session: &mut Session) -> Option<Command> {
    match action {
        UiAction::OpenFile => dialogs::open_command(),
        UiAction::Fetch { id } => Some(Command::Fetch(id)),
        UiAction::GenerateSurface => Some(Command::GenerateSurface),
        UiAction::ExportSurface => dialogs::export_command(session),
        UiAction::Select { name } => Some(Command::Select(Some(name))),
        UiAction::DeleteSelected => Some(Command::DeleteSelected),
        UiAction::Cancel => Some(Command::Cancel),
        UiAction::ResetCamera => Some(Command::ResetCamera),
    }
}

//! Native-side GUI layer: a wry webview scene panel and rfd dialogs.
//!
//! The webview is created as a child of the winit window and communicates
//! with the session through a minimal JSON IPC bridge.

/// Native file and message dialogs.
pub mod dialogs;
pub(crate) mod panel;
/// Wry webview creation, IPC parsing, and state push helpers.
pub mod webview;

/// Initialise GTK before any webview is created (Linux only).
#[cfg(target_os = "linux")]
pub fn init_platform() -> Result<(), String> {
    gtk::init().map_err(|e| e.to_string())
}

/// Initialise platform GUI toolkits (no-op off Linux).
#[cfg(not(target_os = "linux"))]
pub fn init_platform() -> Result<(), String> {
    Ok(())
}

/// Run pending GTK events so the webview stays responsive (Linux only).
#[cfg(target_os = "linux")]
pub fn pump_events() {
    while gtk::events_pending() {
        let _ = gtk::main_iteration_do(false);
    }
}

/// Run pending platform GUI events (no-op off Linux).
#[cfg(not(target_os = "linux"))]
pub fn pump_events() {}

use std::time::{Duration, Instant};

use serde::Serialize;

/// How long transient status messages stay visible.
pub const STATUS_TIMEOUT: Duration = Duration::from_secs(5);

const IDLE_MESSAGE: &str = "Ready";

/// Status line text with optional expiry.
#[derive(Debug, Clone)]
pub struct StatusLine {
    message: String,
    expires_at: Option<Instant>,
}

impl Default for StatusLine {
    fn default() -> Self {
        Self {
            message: IDLE_MESSAGE.to_owned(),
            expires_at: None,
        }
    }
}

impl StatusLine {
    /// Show `message` until replaced.
    pub fn set(&mut self, message: impl Into<String>) {
        self.message = message.into();
        self.expires_at = None;
    }

    /// Show `message` for [`STATUS_TIMEOUT`].
    pub fn flash(&mut self, message: impl Into<String>) {
        self.flash_for(message, STATUS_TIMEOUT);
    }

    /// Show `message` for `duration`.
    pub fn flash_for(&mut self, message: impl Into<String>, duration: Duration) {
        self.message = message.into();
        self.expires_at = Instant::now().checked_add(duration);
    }

    /// Text to display at `now`.
    #[must_use]
    pub fn text_at(&self, now: Instant) -> &str {
        match self.expires_at {
            Some(expiry) if now >= expiry => IDLE_MESSAGE,
            _ => &self.message,
        }
    }

    /// Text to display now.
    #[must_use]
    pub fn text(&self) -> &str {
        self.text_at(Instant::now())
    }
}

/// A warning the shell shows as a modal dialog.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Notice {
    /// Dialog title.
    pub title: String,
    /// Dialog body.
    pub message: String,
}

/// Snapshot pushed to the side panel.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PanelState {
    /// Structure names in list order.
    pub structures: Vec<String>,
    /// Selected structure name.
    pub selected: Option<String>,
    /// Whether the selected structure has a surface.
    pub has_surface: bool,
    /// Status line text.
    pub status: String,
    /// Whether background jobs are pending.
    pub busy: bool,
}

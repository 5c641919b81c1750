use std::collections::HashMap;

use serde::{Deserialize, Serialize};

use crate::input::KeyAction;

/// Maps physical key strings to [`KeyAction`]s.
///
/// Key strings use the `winit::keyboard::KeyCode` debug format:
/// `"KeyQ"`, `"Tab"`, `"Escape"`, etc.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(default)]
pub struct KeybindingOptions {
    /// Forward map: key string → action.
    pub bindings: HashMap<String, KeyAction>,
}

impl Default for KeybindingOptions {
    fn default() -> Self {
        let bindings = HashMap::from([
            ("KeyO".into(), KeyAction::OpenFile),
            ("KeyG".into(), KeyAction::GenerateSurface),
            ("KeyE".into(), KeyAction::ExportSurface),
            ("Delete".into(), KeyAction::DeleteSelected),
            ("KeyQ".into(), KeyAction::RecenterCamera),
            ("Tab".into(), KeyAction::SelectNext),
            ("Escape".into(), KeyAction::Cancel),
        ]);
        Self { bindings }
    }
}

impl KeybindingOptions {
    /// Look up the action for a key string.
    #[must_use]
    pub fn lookup(&self, key: &str) -> Option<KeyAction> {
        self.bindings.get(key).copied()
    }
}

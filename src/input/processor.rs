//! Converts raw platform events into camera and transform drags.
//!
//! The `InputProcessor` owns all transient input state (cursor tracking,
//! held buttons, modifier keys) and the key-binding map. Left drags orbit
//! the camera, Shift+drag (or a middle drag) pans, the wheel zooms,
//! Ctrl+drag translates the selected structure and Alt+drag rotates it.

use glam::Vec2;
use serde::{Deserialize, Serialize};

use super::event::{InputEvent, Modifiers, MouseButton};
use crate::options::KeybindingOptions;
use crate::viewport::{Viewport, VisualHandle};

/// Discrete actions that can be bound to keys.
///
/// Serde serializes as `snake_case` strings so TOML files stay readable:
/// ```toml
/// [keybindings.bindings]
/// KeyG = "generate_surface"
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum KeyAction {
    /// Show the open-file dialog.
    OpenFile,
    /// Generate a surface for the selected structure.
    GenerateSurface,
    /// Show the save dialog and export the selected surface.
    ExportSurface,
    /// Delete the selected structure.
    DeleteSelected,
    /// Frame everything in view.
    RecenterCamera,
    /// Select the next structure in the list.
    SelectNext,
    /// Cancel pending background jobs.
    Cancel,
}

/// Continuous view manipulation produced by mouse gestures.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum ViewAction {
    /// Orbit the camera by a screen-space delta.
    RotateCamera {
        /// Pixels dragged.
        delta: Vec2,
    },
    /// Pan the camera by a screen-space delta.
    PanCamera {
        /// Pixels dragged.
        delta: Vec2,
    },
    /// Zoom by scroll lines.
    Zoom {
        /// Lines scrolled (positive = closer).
        delta: f32,
    },
    /// Move the selected structure in the view plane.
    TranslateSelection {
        /// Pixels dragged.
        delta: Vec2,
    },
    /// Rotate the selected structure about its center.
    RotateSelection {
        /// Pixels dragged.
        delta: Vec2,
    },
}

impl ViewAction {
    /// Apply to the viewport; `selection` receives transform drags.
    pub fn apply(self, viewport: &mut Viewport, selection: &[VisualHandle]) {
        match self {
            Self::RotateCamera { delta } => viewport.camera.rotate(delta),
            Self::PanCamera { delta } => viewport.camera.pan(delta),
            Self::Zoom { delta } => viewport.camera.zoom(delta),
            Self::TranslateSelection { delta } => viewport.translate_group(selection, delta),
            Self::RotateSelection { delta } => viewport.rotate_group(selection, delta),
        }
    }
}

/// Converts raw window events into [`ViewAction`]s and key presses into
/// [`KeyAction`]s.
#[derive(Debug, Default)]
pub struct InputProcessor {
    /// Last cursor position, `None` until the first move.
    mouse_pos: Option<Vec2>,
    /// Button driving the current drag.
    dragging: Option<MouseButton>,
    modifiers: Modifiers,
    key_bindings: KeybindingOptions,
}

impl InputProcessor {
    /// Create a processor with the given key bindings.
    #[must_use]
    pub fn new(key_bindings: KeybindingOptions) -> Self {
        Self {
            key_bindings,
            ..Self::default()
        }
    }

    /// Current cursor position in physical pixels.
    #[must_use]
    pub fn mouse_pos(&self) -> Option<Vec2> {
        self.mouse_pos
    }

    /// Whether a drag is in progress.
    #[must_use]
    pub fn is_dragging(&self) -> bool {
        self.dragging.is_some()
    }

    /// Currently held modifiers.
    #[must_use]
    pub fn modifiers(&self) -> Modifiers {
        self.modifiers
    }

    /// Look up a key press (winit `KeyCode` debug string).
    #[must_use]
    pub fn handle_key_press(&self, key: &str) -> Option<KeyAction> {
        self.key_bindings.lookup(key)
    }

    /// Process a raw input event and return zero or one view actions.
    pub fn handle_event(&mut self, event: InputEvent) -> Option<ViewAction> {
        match event {
            InputEvent::CursorMoved { x, y } => self.handle_cursor_moved(Vec2::new(x, y)),
            InputEvent::MouseButton { button, pressed } => {
                if pressed {
                    let _ = self.dragging.get_or_insert(button);
                } else if self.dragging == Some(button) {
                    self.dragging = None;
                }
                None
            }
            InputEvent::Scroll { delta } => Some(ViewAction::Zoom { delta }),
            InputEvent::ModifiersChanged(modifiers) => {
                self.modifiers = modifiers;
                None
            }
            InputEvent::CursorLeft => {
                self.dragging = None;
                self.mouse_pos = None;
                None
            }
        }
    }

    fn handle_cursor_moved(&mut self, pos: Vec2) -> Option<ViewAction> {
        let previous = self.mouse_pos.replace(pos)?;
        let button = self.dragging?;
        let delta = pos - previous;
        if delta == Vec2::ZERO {
            return None;
        }
        Some(match (button, self.modifiers) {
            (MouseButton::Left, Modifiers { ctrl: true, .. }) => {
                ViewAction::TranslateSelection { delta }
            }
            (MouseButton::Left, Modifiers { alt: true, .. }) => {
                ViewAction::RotateSelection { delta }
            }
            (MouseButton::Left, Modifiers { shift: true, .. }) | (MouseButton::Middle, _) => {
                ViewAction::PanCamera { delta }
            }
            (MouseButton::Right, _) => ViewAction::Zoom {
                delta: -delta.y * 0.05,
            },
            (MouseButton::Left, _) => ViewAction::RotateCamera { delta },
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn processor() -> InputProcessor {
        InputProcessor::new(KeybindingOptions::default())
    }

    fn press(p: &mut InputProcessor, button: MouseButton) {
        assert!(p
            .handle_event(InputEvent::MouseButton {
                button,
                pressed: true
            })
            .is_none());
    }

    fn move_to(p: &mut InputProcessor, x: f32, y: f32) -> Option<ViewAction> {
        p.handle_event(InputEvent::CursorMoved { x, y })
    }

    #[test]
    fn moving_without_button_does_nothing() {
        let mut p = processor();
        assert!(move_to(&mut p, 10.0, 10.0).is_none());
        assert!(move_to(&mut p, 20.0, 10.0).is_none());
    }

    #[test]
    fn left_drag_rotates_camera() {
        let mut p = processor();
        let _ = move_to(&mut p, 10.0, 10.0);
        press(&mut p, MouseButton::Left);
        assert_eq!(
            move_to(&mut p, 15.0, 8.0),
            Some(ViewAction::RotateCamera {
                delta: Vec2::new(5.0, -2.0)
            })
        );
    }

    #[test]
    fn modifiers_select_drag_mode() {
        let mut p = processor();
        let _ = move_to(&mut p, 0.0, 0.0);
        press(&mut p, MouseButton::Left);

        let cases = [
            (Modifiers { shift: true, ..Modifiers::default() }, "pan"),
            (Modifiers { ctrl: true, ..Modifiers::default() }, "translate"),
            (Modifiers { alt: true, ..Modifiers::default() }, "rotate"),
        ];
        for (i, (modifiers, expected)) in cases.into_iter().enumerate() {
            let _ = p.handle_event(InputEvent::ModifiersChanged(modifiers));
            let action = move_to(&mut p, (i + 1) as f32, 0.0).unwrap();
            let kind = match action {
                ViewAction::PanCamera { .. } => "pan",
                ViewAction::TranslateSelection { .. } => "translate",
                ViewAction::RotateSelection { .. } => "rotate",
                _ => "other",
            };
            assert_eq!(kind, expected);
        }
    }

    #[test]
    fn release_and_leave_end_the_drag() {
        let mut p = processor();
        let _ = move_to(&mut p, 0.0, 0.0);
        press(&mut p, MouseButton::Middle);
        assert!(p.is_dragging());
        assert!(p
            .handle_event(InputEvent::MouseButton {
                button: MouseButton::Middle,
                pressed: false
            })
            .is_none());
        assert!(!p.is_dragging());

        press(&mut p, MouseButton::Left);
        let _ = p.handle_event(InputEvent::CursorLeft);
        assert!(!p.is_dragging());
        assert!(p.mouse_pos().is_none());
    }

    #[test]
    fn scroll_zooms() {
        let mut p = processor();
        assert_eq!(
            p.handle_event(InputEvent::Scroll { delta: 2.0 }),
            Some(ViewAction::Zoom { delta: 2.0 })
        );
    }

    #[test]
    fn default_keys() {
        let p = processor();
        assert_eq!(p.handle_key_press("KeyG"), Some(KeyAction::GenerateSurface));
        assert_eq!(p.handle_key_press("Delete"), Some(KeyAction::DeleteSelected));
        assert_eq!(p.handle_key_press("Tab"), Some(KeyAction::SelectNext));
        assert_eq!(p.handle_key_press("F13"), None);
    }
}

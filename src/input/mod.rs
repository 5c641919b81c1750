//! Input handling: event types and the processor that converts raw window
//! events into view actions and bound key actions.

/// Platform-agnostic input events.
pub mod event;
/// Converts raw events into view and key actions.
pub mod processor;

pub use event::{InputEvent, Modifiers, MouseButton};
pub use processor::{InputProcessor, KeyAction, ViewAction};

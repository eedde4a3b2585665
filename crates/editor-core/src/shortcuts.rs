//! Keyboard shortcut map.

use mosaic_common::config::EditorDefaults;

use crate::input::KeyEvent;

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Shortcut {
    /// Delete the selection, or clear the Fill while editing one.
    Delete,
    Undo,
    Redo,
    Duplicate,
    Copy,
    Paste,
    SelectAll,
    /// Cancel the gesture, leave fill edit, or deselect.
    Escape,
    Nudge { dx: f64, dy: f64 },
}

/// Map a key press to an editor shortcut.
pub fn resolve(key: &KeyEvent, defaults: &EditorDefaults) -> Option<Shortcut> {
    let m = key.modifiers;
    let step = if m.shift {
        defaults.nudge_step_large
    } else {
        defaults.nudge_step
    };

    let shortcut = match (key.code.as_str(), m.ctrl, m.shift) {
        ("Delete" | "Backspace", false, _) => Shortcut::Delete,
        ("KeyZ", true, false) => Shortcut::Undo,
        ("KeyZ", true, true) | ("KeyY", true, false) => Shortcut::Redo,
        ("KeyD", true, false) => Shortcut::Duplicate,
        ("KeyC", true, false) => Shortcut::Copy,
        ("KeyV", true, false) => Shortcut::Paste,
        ("KeyA", true, false) => Shortcut::SelectAll,
        ("Escape", _, _) => Shortcut::Escape,
        ("ArrowLeft", false, _) => Shortcut::Nudge { dx: -step, dy: 0.0 },
        ("ArrowRight", false, _) => Shortcut::Nudge { dx: step, dy: 0.0 },
        ("ArrowUp", false, _) => Shortcut::Nudge { dx: 0.0, dy: -step },
        ("ArrowDown", false, _) => Shortcut::Nudge { dx: 0.0, dy: step },
        _ => return None,
    };
    Some(shortcut)
}

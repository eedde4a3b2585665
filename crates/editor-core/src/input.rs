//! Input events fed to the editor.
//!
//! Pointer coordinates are screen pixels relative to the canvas viewport;
//! the editor converts them to canvas units through its [`crate::Viewport`].
//! Events serialize as tagged JSON so gesture scripts can be replayed from
//! JSONL files.

use serde::{Deserialize, Serialize};

/// Modifier keys held during an event.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Modifiers {
    pub shift: bool,
    /// Ctrl on Linux/Windows, Cmd on macOS.
    pub ctrl: bool,
    pub alt: bool,
}

impl Modifiers {
    pub const NONE: Modifiers = Modifiers {
        shift: false,
        ctrl: false,
        alt: false,
    };

    pub fn shift() -> Self {
        Self {
            shift: true,
            ..Self::NONE
        }
    }

    pub fn ctrl() -> Self {
        Self {
            ctrl: true,
            ..Self::NONE
        }
    }
}

/// Mouse button identifier.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MouseButton {
    #[default]
    Left,
    Right,
    Middle,
}

/// Key press.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct KeyEvent {
    /// Key code (e.g. "KeyZ", "Delete", "ArrowLeft", "Escape").
    pub code: String,
    #[serde(default)]
    pub modifiers: Modifiers,
}

impl KeyEvent {
    pub fn new(code: impl Into<String>, modifiers: Modifiers) -> Self {
        Self {
            code: code.into(),
            modifiers,
        }
    }
}

/// Discriminated union of editor inputs.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum EditorInput {
    PointerDown {
        x: f64,
        y: f64,
        #[serde(default)]
        button: MouseButton,
        #[serde(default)]
        modifiers: Modifiers,
    },
    PointerMove {
        x: f64,
        y: f64,
        #[serde(default)]
        modifiers: Modifiers,
    },
    PointerUp {
        x: f64,
        y: f64,
    },
    DoubleClick {
        x: f64,
        y: f64,
    },
    Key(KeyEvent),
}

impl EditorInput {
    pub fn down(x: f64, y: f64) -> Self {
        Self::PointerDown {
            x,
            y,
            button: MouseButton::Left,
            modifiers: Modifiers::NONE,
        }
    }

    pub fn drag_to(x: f64, y: f64) -> Self {
        Self::PointerMove {
            x,
            y,
            modifiers: Modifiers::NONE,
        }
    }

    pub fn up(x: f64, y: f64) -> Self {
        Self::PointerUp { x, y }
    }

    pub fn key(code: impl Into<String>, modifiers: Modifiers) -> Self {
        Self::Key(KeyEvent::new(code, modifiers))
    }

    /// Pointer position if this input carries one.
    pub fn pointer_position(&self) -> Option<(f64, f64)> {
        match self {
            EditorInput::PointerDown { x, y, .. }
            | EditorInput::PointerMove { x, y, .. }
            | EditorInput::PointerUp { x, y }
            | EditorInput::DoubleClick { x, y } => Some((*x, *y)),
            EditorInput::Key(_) => None,
        }
    }
}

/// Parse inputs from JSONL content (one JSON object per line, `#` comments).
pub fn parse_inputs(jsonl: &str) -> Result<Vec<EditorInput>, serde_json::Error> {
    jsonl
        .lines()
        .map(str::trim)
        .filter(|line| !line.is_empty() && !line.starts_with('#'))
        .map(serde_json::from_str)
        .collect()
}

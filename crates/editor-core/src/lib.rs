//! Mosaic Editor Core
//!
//! The live editing session:
//! - **Store:** the single choke point for layer and audio-track mutation
//! - **History:** snapshot-based linear undo/redo
//! - **Interaction:** pointer gesture state machine (move/resize/rotate/pan-fill)
//! - **Snap:** alignment guides during moves
//! - **Editor:** the session tying it all together, plus shortcuts, clipboard,
//!   drag-and-drop and the AI image-edit collaborator
//!
//! Everything here runs on one thread. Media loading is the only
//! asynchronous edge: the editor hands out [`editor::MediaRequest`]s and is
//! told about the outcome later.

pub mod ai;
pub mod editor;
pub mod history;
pub mod input;
pub mod interaction;
pub mod shortcuts;
pub mod snap;
pub mod store;

pub use ai::{AiEditError, ImageEditOperation, ImageEditRequest, ImageEditResponse, ImageEditService};
pub use editor::{Editor, InputOutcome, MediaRequest, MediaTarget, Reorder, Viewport};
pub use history::{History, HistoryEntry};
pub use input::{EditorInput, KeyEvent, Modifiers, MouseButton};
pub use interaction::{GestureEnd, GestureKind, Handle, InteractionConfig, InteractionEngine, InteractionState};
pub use shortcuts::Shortcut;
pub use snap::{AlignmentGuide, GuideOrientation, SnapEngine, SnapResult};
pub use store::LayerStore;

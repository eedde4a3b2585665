//! Clipboard and drag-and-drop payloads.

use serde::{Deserialize, Serialize};
use thiserror::Error;

use mosaic_common::error::MosaicError;

use crate::layer::{Layer, LayerId};
use crate::media::{MediaKind, MediaRef};

#[derive(Debug, Error)]
pub enum ClipboardError {
    #[error("Clipboard is empty")]
    Empty,

    #[error("Clipboard does not contain a layer: {0}")]
    Malformed(#[from] serde_json::Error),
}

impl From<ClipboardError> for MosaicError {
    fn from(err: ClipboardError) -> Self {
        MosaicError::Other(err.into())
    }
}

/// Serialize one layer for the clipboard. Live handles are not carried;
/// they are rebuilt on paste from `src`.
pub fn layer_to_clipboard(layer: &Layer) -> Result<String, ClipboardError> {
    Ok(serde_json::to_string(&layer.detached())?)
}

/// Parse a clipboard payload into a fresh layer with a new id.
pub fn layer_from_clipboard(payload: &str) -> Result<Layer, ClipboardError> {
    if payload.trim().is_empty() {
        return Err(ClipboardError::Empty);
    }
    let mut layer: Layer = serde_json::from_str(payload)?;
    layer.id = LayerId::generate();
    layer.is_loading = false;
    Ok(layer)
}

/// A dragged asset: what it is and where its content lives.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DragPayload {
    pub kind: MediaKind,
    pub src: MediaRef,
}

impl DragPayload {
    pub fn new(kind: MediaKind, src: impl Into<String>) -> Self {
        Self {
            kind,
            src: MediaRef::new(src),
        }
    }

    pub fn from_json(data: &str) -> Result<Self, serde_json::Error> {
        serde_json::from_str(data)
    }

    pub fn to_json(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string(self)
    }
}

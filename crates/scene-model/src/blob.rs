//! Transient in-memory content and inline `data:` URIs.
//!
//! Freshly uploaded or AI-produced media lives in a [`BlobStore`] under a
//! `blob:<uuid>` reference until the project is saved, at which point
//! [`crate::ProjectFile::make_portable`] rewrites every such reference into
//! a self-contained `data:` URI.

use std::collections::HashMap;
use std::sync::{Arc, RwLock};

use base64::engine::general_purpose::STANDARD;
use base64::Engine as _;

use mosaic_common::error::{MosaicError, MosaicResult};

pub const BLOB_SCHEME: &str = "blob:";
pub const DATA_SCHEME: &str = "data:";

/// Raw bytes plus their MIME type.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Blob {
    pub mime: String,
    pub bytes: Arc<Vec<u8>>,
}

/// Shared registry of transient blobs. Cloning shares the same storage.
#[derive(Debug, Clone, Default)]
pub struct BlobStore {
    inner: Arc<RwLock<HashMap<String, Blob>>>,
}

impl BlobStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Store bytes and return their `blob:` reference.
    pub fn insert(&self, mime: impl Into<String>, bytes: Vec<u8>) -> String {
        let key = format!("{BLOB_SCHEME}{}", uuid::Uuid::new_v4());
        let blob = Blob {
            mime: mime.into(),
            bytes: Arc::new(bytes),
        };
        tracing::debug!(key = %key, mime = %blob.mime, size = blob.bytes.len(), "Blob stored");
        self.write().insert(key.clone(), blob);
        key
    }

    pub fn get(&self, src: &str) -> Option<Blob> {
        self.read().get(src).cloned()
    }

    pub fn contains(&self, src: &str) -> bool {
        self.read().contains_key(src)
    }

    pub fn remove(&self, src: &str) -> Option<Blob> {
        self.write().remove(src)
    }

    pub fn len(&self) -> usize {
        self.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.read().is_empty()
    }

    /// Inline form of a stored blob.
    pub fn to_data_uri(&self, src: &str) -> Option<String> {
        self.get(src).map(|b| encode_data_uri(&b.mime, &b.bytes))
    }

    fn read(&self) -> std::sync::RwLockReadGuard<'_, HashMap<String, Blob>> {
        self.inner.read().unwrap_or_else(|e| e.into_inner())
    }

    fn write(&self) -> std::sync::RwLockWriteGuard<'_, HashMap<String, Blob>> {
        self.inner.write().unwrap_or_else(|e| e.into_inner())
    }
}

pub fn is_blob_ref(src: &str) -> bool {
    src.starts_with(BLOB_SCHEME)
}

pub fn is_data_uri(src: &str) -> bool {
    src.starts_with(DATA_SCHEME)
}

pub fn encode_data_uri(mime: &str, bytes: &[u8]) -> String {
    format!("{DATA_SCHEME}{mime};base64,{}", STANDARD.encode(bytes))
}

/// Decode a base64 `data:` URI into `(mime, bytes)`.
pub fn decode_data_uri(uri: &str) -> MosaicResult<(String, Vec<u8>)> {
    let body = uri
        .strip_prefix(DATA_SCHEME)
        .ok_or_else(|| MosaicError::media_load(uri, "not a data URI"))?;
    let (header, payload) = body
        .split_once(',')
        .ok_or_else(|| MosaicError::media_load(uri, "data URI has no payload"))?;
    let mime = header
        .strip_suffix(";base64")
        .ok_or_else(|| MosaicError::media_load(uri, "only base64 data URIs are supported"))?;
    let bytes = STANDARD
        .decode(payload.trim())
        .map_err(|e| MosaicError::media_load(uri, format!("invalid base64: {e}")))?;
    let mime = if mime.is_empty() {
        "application/octet-stream"
    } else {
        mime
    };
    Ok((mime.to_string(), bytes))
}

/// Best-effort MIME type from a file extension.
pub fn mime_from_path(path: &str) -> &'static str {
    let ext = path
        .rsplit('.')
        .next()
        .map(|e| e.to_ascii_lowercase())
        .unwrap_or_default();
    match ext.as_str() {
        "png" => "image/png",
        "jpg" | "jpeg" => "image/jpeg",
        "webp" => "image/webp",
        "gif" => "image/gif",
        "mp4" | "m4v" => "video/mp4",
        "webm" => "video/webm",
        "mov" => "video/quicktime",
        "mp3" => "audio/mpeg",
        "wav" => "audio/wav",
        "ogg" => "audio/ogg",
        "m4a" => "audio/mp4",
        _ => "application/octet-stream",
    }
}

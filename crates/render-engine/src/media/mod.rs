//! Live media: handle implementations, resolution of content references,
//! background loading, and playback synchronization.

pub mod audio;
pub mod loader;
pub mod resolver;
pub mod still;
pub mod sync;
pub mod video;

use std::path::{Path, PathBuf};
use std::sync::{Mutex, MutexGuard};

use mosaic_common::error::{MosaicError, MosaicResult};

pub use audio::AudioClip;
pub use loader::{LoadOutcome, MediaLoader};
pub use resolver::FsMediaResolver;
pub use still::StillImage;
pub use sync::MediaSynchronizer;
pub use video::FfmpegVideo;

/// File backing a decoder. In-memory content is spilled to a temporary
/// file that is deleted when the handle is released.
#[derive(Debug)]
pub struct MediaFile {
    path: PathBuf,
    temporary: bool,
}

impl MediaFile {
    pub fn existing(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            temporary: false,
        }
    }

    pub async fn spill(bytes: &[u8], extension: &str) -> MosaicResult<Self> {
        let path = std::env::temp_dir().join(format!(
            "mosaic-media-{}.{extension}",
            uuid::Uuid::new_v4()
        ));
        tokio::fs::write(&path, bytes).await.map_err(|e| {
            MosaicError::media_load(path.display().to_string(), format!("failed to spill media: {e}"))
        })?;
        tracing::debug!(path = %path.display(), size = bytes.len(), "Spilled media to temp file");
        Ok(Self {
            path,
            temporary: true,
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn is_temporary(&self) -> bool {
        self.temporary
    }

    /// Delete the backing file if it was spilled.
    pub fn discard(&self) {
        if !self.temporary {
            return;
        }
        if let Err(err) = std::fs::remove_file(&self.path) {
            if err.kind() != std::io::ErrorKind::NotFound {
                tracing::warn!(path = %self.path.display(), error = %err, "Failed to remove temp media");
            }
        }
    }
}

/// File extension for a MIME type, used when spilling.
pub fn extension_for_mime(mime: &str) -> &'static str {
    match mime.to_ascii_lowercase().as_str() {
        "video/mp4" => "mp4",
        "video/webm" => "webm",
        "video/quicktime" => "mov",
        "video/x-matroska" => "mkv",
        "audio/mpeg" | "audio/mp3" => "mp3",
        "audio/wav" | "audio/x-wav" | "audio/wave" => "wav",
        "audio/ogg" => "ogg",
        "audio/aac" => "aac",
        "audio/mp4" | "audio/x-m4a" => "m4a",
        "audio/webm" => "weba",
        "audio/flac" => "flac",
        _ => "bin",
    }
}

pub(crate) fn lock<T>(m: &Mutex<T>) -> MutexGuard<'_, T> {
    m.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
}

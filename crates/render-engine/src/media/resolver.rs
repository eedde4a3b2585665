use std::path::{Path, PathBuf};
use std::sync::Arc;

use async_trait::async_trait;

use mosaic_common::error::{MosaicError, MosaicResult};
use mosaic_scene_model::{
    decode_data_uri, is_blob_ref, is_data_uri, BlobStore, MediaKind, MediaResolver, SharedMedia,
};

use super::still::short;
use super::{extension_for_mime, AudioClip, FfmpegVideo, MediaFile, StillImage};
use crate::ffmpeg::command_exists;

/// Where a content reference points.
#[derive(Debug)]
enum Located {
    Bytes { mime: String, bytes: Arc<Vec<u8>> },
    File(PathBuf),
}

/// Resolves `data:` URIs, `blob:` references, `file://` URLs and plain
/// paths (relative ones against `base_dir`) into live handles.
#[derive(Debug, Clone, Default)]
pub struct FsMediaResolver {
    blobs: BlobStore,
    base_dir: Option<PathBuf>,
}

impl FsMediaResolver {
    pub fn new(blobs: BlobStore) -> Self {
        Self {
            blobs,
            base_dir: None,
        }
    }

    /// Resolve relative paths against `dir` (usually the project's folder).
    pub fn with_base_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.base_dir = Some(dir.into());
        self
    }

    pub fn blobs(&self) -> &BlobStore {
        &self.blobs
    }

    fn locate(&self, src: &str) -> MosaicResult<Located> {
        if is_data_uri(src) {
            let (mime, bytes) = decode_data_uri(src)?;
            return Ok(Located::Bytes {
                mime,
                bytes: Arc::new(bytes),
            });
        }
        if is_blob_ref(src) {
            let blob = self
                .blobs
                .get(src)
                .ok_or_else(|| MosaicError::media_load(src, "blob is no longer available"))?;
            return Ok(Located::Bytes {
                mime: blob.mime,
                bytes: blob.bytes,
            });
        }
        if src.starts_with("http://") || src.starts_with("https://") {
            return Err(MosaicError::media_load(src, "remote media is not supported"));
        }
        Ok(Located::File(self.local_path(src)))
    }

    /// Filesystem path a plain or `file://` reference points at.
    pub fn local_path(&self, src: &str) -> PathBuf {
        let raw = Path::new(src.strip_prefix("file://").unwrap_or(src));
        match &self.base_dir {
            Some(base) if raw.is_relative() => base.join(raw),
            _ => raw.to_path_buf(),
        }
    }

    async fn backing_file(&self, src: &str, located: Located) -> MosaicResult<MediaFile> {
        match located {
            Located::Bytes { mime, bytes } => MediaFile::spill(&bytes, extension_for_mime(&mime)).await,
            Located::File(path) => {
                if !tokio::fs::try_exists(&path).await.unwrap_or(false) {
                    return Err(MosaicError::media_load(short(src), "file not found"));
                }
                Ok(MediaFile::existing(path))
            }
        }
    }
}

#[async_trait]
impl MediaResolver for FsMediaResolver {
    async fn resolve(&self, src: &str, kind: MediaKind) -> MosaicResult<SharedMedia> {
        let located = self.locate(src)?;
        tracing::debug!(src = %short(src), kind = ?kind, "Resolving media");
        match kind {
            MediaKind::Image => {
                let bytes = match located {
                    Located::Bytes { bytes, .. } => bytes,
                    Located::File(path) => Arc::new(tokio::fs::read(&path).await.map_err(|e| {
                        MosaicError::media_load(short(src), format!("read failed: {e}"))
                    })?),
                };
                Ok(Arc::new(StillImage::decode(src, &bytes)?))
            }
            MediaKind::Video | MediaKind::Audio => {
                if !command_exists("ffprobe") || !command_exists("ffmpeg") {
                    return Err(MosaicError::media_load(
                        short(src),
                        "ffmpeg/ffprobe not found in PATH",
                    ));
                }
                let file = self.backing_file(src, located).await?;
                if kind == MediaKind::Video {
                    Ok(Arc::new(FfmpegVideo::open(src, file).await?))
                } else {
                    Ok(Arc::new(AudioClip::open(src, file).await?))
                }
            }
        }
    }
}

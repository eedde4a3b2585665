use std::path::PathBuf;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};

use async_trait::async_trait;

use mosaic_common::clock::PlaybackClock;
use mosaic_common::error::{MosaicError, MosaicResult};
use mosaic_scene_model::{MediaHandle, MediaKind, RgbaFrame};

use super::still::short;
use super::{lock, MediaFile};
use crate::ffmpeg::{decode_frame_at, read_media_meta, MediaMeta};

/// Seeks stop this far before the end so the decoder still yields a frame.
const END_GUARD_SECS: f64 = 0.05;

/// During playback a new frame is decoded once the clock has moved this far
/// from the one on screen.
const PLAYBACK_STEP_SECS: f64 = 1.0 / 30.0;

#[derive(Debug, Clone)]
struct Decoded {
    at: f64,
    pixels: Arc<RgbaFrame>,
}

/// Whether the frame decoded at `shown` is stale for playhead `target`.
fn needs_decode(shown: Option<f64>, target: f64) -> bool {
    shown.map_or(true, |at| (target - at).abs() >= PLAYBACK_STEP_SECS)
}

/// Video decoded with `ffmpeg`, one frame per seek.
///
/// Live playback advances a [`PlaybackClock`]; [`MediaHandle::refresh`]
/// decodes the frame under the clock. Export steps through explicit seeks.
#[derive(Debug)]
pub struct FfmpegVideo {
    src: String,
    file: MediaFile,
    meta: MediaMeta,
    clock: Mutex<PlaybackClock>,
    frame: Mutex<Option<Decoded>>,
    volume: Mutex<f64>,
    released: AtomicBool,
}

impl FfmpegVideo {
    /// Inspect `file` and decode its first frame.
    pub async fn open(src: &str, file: MediaFile) -> MosaicResult<Self> {
        let meta = match read_media_meta(file.path()).await {
            Ok(meta) => meta,
            Err(err) => {
                file.discard();
                return Err(err);
            }
        };
        if !meta.has_video || meta.width == 0 || meta.height == 0 {
            file.discard();
            return Err(MosaicError::media_load(short(src), "no video stream"));
        }
        let video = Self {
            src: src.to_string(),
            file,
            meta,
            clock: Mutex::new(PlaybackClock::new()),
            frame: Mutex::new(None),
            volume: Mutex::new(1.0),
            released: AtomicBool::new(false),
        };
        if let Err(err) = video.seek(0.0).await {
            video.release();
            return Err(err);
        }
        tracing::info!(
            src = %short(src),
            width = meta.width,
            height = meta.height,
            duration = ?meta.duration_secs,
            "Video opened"
        );
        Ok(video)
    }

    pub fn volume(&self) -> f64 {
        *lock(&self.volume)
    }

    async fn decode(&self, at: f64) -> MosaicResult<()> {
        let frame = decode_frame_at(self.file.path(), at, self.meta.width, self.meta.height).await?;
        *lock(&self.frame) = Some(Decoded {
            at,
            pixels: Arc::new(frame),
        });
        Ok(())
    }

    fn clamp_time(&self, secs: f64) -> f64 {
        match self.meta.duration_secs {
            Some(d) => secs.clamp(0.0, (d - END_GUARD_SECS).max(0.0)),
            None => secs.max(0.0),
        }
    }
}

#[async_trait]
impl MediaHandle for FfmpegVideo {
    fn kind(&self) -> MediaKind {
        MediaKind::Video
    }

    fn natural_size(&self) -> (u32, u32) {
        (self.meta.width, self.meta.height)
    }

    fn is_ready(&self) -> bool {
        !self.is_released() && lock(&self.frame).is_some()
    }

    fn duration_secs(&self) -> Option<f64> {
        self.meta.duration_secs
    }

    fn current_time(&self) -> f64 {
        self.clamp_time(lock(&self.clock).position_secs())
    }

    async fn seek(&self, secs: f64) -> MosaicResult<f64> {
        if self.is_released() {
            return Err(MosaicError::media_load(short(&self.src), "video was released"));
        }
        let target = self.clamp_time(secs);
        self.decode(target).await?;
        lock(&self.clock).seek(target);
        Ok(target)
    }

    async fn refresh(&self) -> MosaicResult<bool> {
        if self.is_released() || !self.is_playing() {
            return Ok(false);
        }
        let target = self.current_time();
        let shown = lock(&self.frame).as_ref().map(|d| d.at);
        if !needs_decode(shown, target) {
            return Ok(false);
        }
        self.decode(target).await?;
        Ok(true)
    }

    fn play(&self) {
        if !self.is_released() {
            lock(&self.clock).play();
        }
    }

    fn pause(&self) {
        lock(&self.clock).pause();
    }

    fn is_playing(&self) -> bool {
        lock(&self.clock).is_playing()
    }

    fn set_volume(&self, volume: f64) {
        *lock(&self.volume) = volume.clamp(0.0, 1.0);
    }

    fn local_path(&self) -> Option<PathBuf> {
        (!self.is_released() && self.meta.has_audio).then(|| self.file.path().to_path_buf())
    }

    fn current_frame(&self) -> Option<Arc<RgbaFrame>> {
        if self.is_released() {
            return None;
        }
        lock(&self.frame).as_ref().map(|d| Arc::clone(&d.pixels))
    }

    fn release(&self) {
        if self.released.swap(true, Ordering::SeqCst) {
            return;
        }
        lock(&self.clock).pause();
        lock(&self.frame).take();
        self.file.discard();
        tracing::debug!(src = %short(&self.src), "Video released");
    }

    fn is_released(&self) -> bool {
        self.released.load(Ordering::SeqCst)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_playback_decodes_once_per_step() {
        assert!(needs_decode(None, 0.0));
        assert!(!needs_decode(Some(1.0), 1.01));
        assert!(needs_decode(Some(1.0), 1.0 + PLAYBACK_STEP_SECS));
        // A seek backwards during playback is stale too.
        assert!(needs_decode(Some(2.0), 1.0));
    }
}

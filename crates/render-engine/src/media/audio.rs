use std::path::PathBuf;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};

use async_trait::async_trait;

use mosaic_common::clock::PlaybackClock;
use mosaic_common::error::{MosaicError, MosaicResult};
use mosaic_scene_model::{MediaHandle, MediaKind, RgbaFrame};

use super::still::short;
use super::{lock, MediaFile};
use crate::ffmpeg::read_media_meta;

/// An audio file. Sound is mixed by the encoder at export time; live
/// playback only tracks position.
#[derive(Debug)]
pub struct AudioClip {
    src: String,
    file: MediaFile,
    duration_secs: Option<f64>,
    clock: Mutex<PlaybackClock>,
    volume: Mutex<f64>,
    released: AtomicBool,
}

impl AudioClip {
    pub async fn open(src: &str, file: MediaFile) -> MosaicResult<Self> {
        let meta = match read_media_meta(file.path()).await {
            Ok(meta) => meta,
            Err(err) => {
                file.discard();
                return Err(err);
            }
        };
        if !meta.has_audio {
            file.discard();
            return Err(MosaicError::media_load(short(src), "no audio stream"));
        }
        tracing::info!(src = %short(src), duration = ?meta.duration_secs, "Audio opened");
        Ok(Self {
            src: src.to_string(),
            file,
            duration_secs: meta.duration_secs,
            clock: Mutex::new(PlaybackClock::new()),
            volume: Mutex::new(1.0),
            released: AtomicBool::new(false),
        })
    }

    pub fn volume(&self) -> f64 {
        *lock(&self.volume)
    }
}

#[async_trait]
impl MediaHandle for AudioClip {
    fn kind(&self) -> MediaKind {
        MediaKind::Audio
    }

    fn natural_size(&self) -> (u32, u32) {
        (0, 0)
    }

    fn is_ready(&self) -> bool {
        !self.is_released()
    }

    fn duration_secs(&self) -> Option<f64> {
        self.duration_secs
    }

    fn current_time(&self) -> f64 {
        let pos = lock(&self.clock).position_secs();
        match self.duration_secs {
            Some(d) => pos.min(d),
            None => pos,
        }
    }

    async fn seek(&self, secs: f64) -> MosaicResult<f64> {
        if self.is_released() {
            return Err(MosaicError::media_load(short(&self.src), "audio was released"));
        }
        let target = match self.duration_secs {
            Some(d) => secs.clamp(0.0, d),
            None => secs.max(0.0),
        };
        lock(&self.clock).seek(target);
        Ok(target)
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
        (!self.is_released()).then(|| self.file.path().to_path_buf())
    }

    fn current_frame(&self) -> Option<Arc<RgbaFrame>> {
        None
    }

    fn release(&self) {
        if self.released.swap(true, Ordering::SeqCst) {
            return;
        }
        lock(&self.clock).pause();
        self.file.discard();
        tracing::debug!(src = %short(&self.src), "Audio released");
    }

    fn is_released(&self) -> bool {
        self.released.load(Ordering::SeqCst)
    }
}

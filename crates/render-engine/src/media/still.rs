use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use async_trait::async_trait;

use mosaic_common::error::{MosaicError, MosaicResult};
use mosaic_scene_model::{MediaHandle, MediaKind, RgbaFrame};

/// A decoded still image. Always ready, never plays.
#[derive(Debug)]
pub struct StillImage {
    src: String,
    frame: Arc<RgbaFrame>,
    released: AtomicBool,
}

impl StillImage {
    pub fn from_frame(src: impl Into<String>, frame: RgbaFrame) -> Self {
        Self {
            src: src.into(),
            frame: Arc::new(frame),
            released: AtomicBool::new(false),
        }
    }

    /// Decode PNG/JPEG/WebP/GIF bytes (first frame for animations).
    pub fn decode(src: &str, bytes: &[u8]) -> MosaicResult<Self> {
        let image = image::load_from_memory(bytes)
            .map_err(|e| MosaicError::media_load(short(src), format!("image decode failed: {e}")))?
            .to_rgba8();
        let (width, height) = image.dimensions();
        let frame = RgbaFrame::new(width, height, image.into_raw())
            .ok_or_else(|| MosaicError::media_load(short(src), "image has no pixels"))?;
        tracing::debug!(src = %short(src), width, height, "Image decoded");
        Ok(Self::from_frame(src, frame))
    }

    pub fn src(&self) -> &str {
        &self.src
    }
}

#[async_trait]
impl MediaHandle for StillImage {
    fn kind(&self) -> MediaKind {
        MediaKind::Image
    }

    fn natural_size(&self) -> (u32, u32) {
        (self.frame.width, self.frame.height)
    }

    fn is_ready(&self) -> bool {
        !self.is_released()
    }

    fn duration_secs(&self) -> Option<f64> {
        None
    }

    fn current_time(&self) -> f64 {
        0.0
    }

    async fn seek(&self, _secs: f64) -> MosaicResult<f64> {
        Ok(0.0)
    }

    fn play(&self) {}

    fn pause(&self) {}

    fn is_playing(&self) -> bool {
        false
    }

    fn current_frame(&self) -> Option<Arc<RgbaFrame>> {
        (!self.is_released()).then(|| Arc::clone(&self.frame))
    }

    fn release(&self) {
        self.released.store(true, Ordering::SeqCst);
    }

    fn is_released(&self) -> bool {
        self.released.load(Ordering::SeqCst)
    }
}

/// Sources can be multi-megabyte data URIs; keep logs readable.
pub(crate) fn short(src: &str) -> String {
    if src.len() > 64 {
        format!("{}…", src.chars().take(48).collect::<String>())
    } else {
        src.to_string()
    }
}

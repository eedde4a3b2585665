//! Live media handles.
//!
//! A layer never owns decoded pixels or a playback pipeline directly. It
//! holds a [`MediaRef`]: the persistent content reference (`src`) plus an
//! optional live handle produced by a [`MediaResolver`]. Any runtime can
//! plug its own decode/playback primitive in behind [`MediaHandle`].

use std::fmt;
use std::sync::Arc;

use async_trait::async_trait;
use mosaic_common::error::MosaicResult;
use serde::{Deserialize, Deserializer, Serialize, Serializer};

/// What kind of content a handle plays.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MediaKind {
    Image,
    Video,
    Audio,
}

/// A decoded frame: straight-alpha RGBA8, row-major, no padding.
#[derive(Clone, PartialEq, Eq)]
pub struct RgbaFrame {
    pub width: u32,
    pub height: u32,
    pub pixels: Vec<u8>,
}

impl RgbaFrame {
    /// Wrap a pixel buffer, checking its length against the dimensions.
    pub fn new(width: u32, height: u32, pixels: Vec<u8>) -> Option<Self> {
        if width == 0 || height == 0 || pixels.len() != width as usize * height as usize * 4 {
            return None;
        }
        Some(Self {
            width,
            height,
            pixels,
        })
    }

    /// A frame filled with one color.
    pub fn solid(width: u32, height: u32, rgba: [u8; 4]) -> Self {
        let pixels = rgba
            .iter()
            .copied()
            .cycle()
            .take(width as usize * height as usize * 4)
            .collect();
        Self {
            width,
            height,
            pixels,
        }
    }

    /// Pixel at `(x, y)`; `None` when out of range.
    pub fn pixel(&self, x: u32, y: u32) -> Option<[u8; 4]> {
        if x >= self.width || y >= self.height {
            return None;
        }
        let i = (y as usize * self.width as usize + x as usize) * 4;
        Some([
            self.pixels[i],
            self.pixels[i + 1],
            self.pixels[i + 2],
            self.pixels[i + 3],
        ])
    }
}

impl fmt::Debug for RgbaFrame {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RgbaFrame")
            .field("width", &self.width)
            .field("height", &self.height)
            .field("bytes", &self.pixels.len())
            .finish()
    }
}

/// Capability set of a loaded image, video, or audio source.
///
/// Handles are shared between layers, history snapshots, and the media
/// synchronizer, so every method takes `&self` and implementations use
/// interior mutability.
#[async_trait]
pub trait MediaHandle: Send + Sync + fmt::Debug {
    fn kind(&self) -> MediaKind;

    /// Intrinsic pixel size; `(0, 0)` for audio.
    fn natural_size(&self) -> (u32, u32);

    /// Whether the handle can produce a frame (or sound) right now.
    fn is_ready(&self) -> bool;

    /// Total length in seconds; `None` for stills.
    fn duration_secs(&self) -> Option<f64>;

    /// Current playback position in seconds.
    fn current_time(&self) -> f64;

    /// Move the playhead to `secs` (clamped to the duration) and resolve
    /// once the handle has actually reached it, returning the reached time.
    async fn seek(&self, secs: f64) -> MosaicResult<f64>;

    fn play(&self);

    fn pause(&self);

    fn is_playing(&self) -> bool;

    /// Playback gain in `[0, 1]`. Ignored by handles without sound.
    fn set_volume(&self, _volume: f64) {}

    /// Local file backing this handle, for consumers that read the
    /// content directly (the audio mixer of the video encoder).
    fn local_path(&self) -> Option<std::path::PathBuf> {
        None
    }

    /// Pixels to draw for the current position. `None` for audio or while
    /// nothing has been decoded yet.
    fn current_frame(&self) -> Option<Arc<RgbaFrame>>;

    /// Bring [`current_frame`](Self::current_frame) up to the playback
    /// position. Called once per display tick while playing; returns
    /// whether new pixels were decoded.
    async fn refresh(&self) -> MosaicResult<bool> {
        Ok(false)
    }

    /// Stop playback and free decoder resources. Later calls are no-ops.
    fn release(&self);

    fn is_released(&self) -> bool;
}

/// Reference-counted handle shared across the session.
pub type SharedMedia = Arc<dyn MediaHandle>;

/// Produces live handles for content references.
#[async_trait]
pub trait MediaResolver: Send + Sync {
    async fn resolve(&self, src: &str, kind: MediaKind) -> MosaicResult<SharedMedia>;
}

/// A content reference plus its live handle, once resolved.
///
/// Serializes as the bare `src` string. Two refs are equal when their
/// sources are equal; the handle is runtime state and never compared.
#[derive(Clone, Default)]
pub struct MediaRef {
    pub src: String,
    pub handle: Option<SharedMedia>,
}

impl MediaRef {
    /// An unresolved reference.
    pub fn new(src: impl Into<String>) -> Self {
        Self {
            src: src.into(),
            handle: None,
        }
    }

    /// A reference with a live handle attached.
    pub fn resolved(src: impl Into<String>, handle: SharedMedia) -> Self {
        Self {
            src: src.into(),
            handle: Some(handle),
        }
    }

    /// Whether a handle is attached and ready to draw.
    pub fn is_ready(&self) -> bool {
        self.handle.as_ref().is_some_and(|h| h.is_ready())
    }

    /// Same reference without its live handle.
    pub fn detached(&self) -> Self {
        Self::new(self.src.clone())
    }
}

impl PartialEq for MediaRef {
    fn eq(&self, other: &Self) -> bool {
        self.src == other.src
    }
}

impl fmt::Debug for MediaRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let src = if self.src.chars().count() > 64 {
            format!("{}…", self.src.chars().take(64).collect::<String>())
        } else {
            self.src.clone()
        };
        f.debug_struct("MediaRef")
            .field("src", &src)
            .field("resolved", &self.handle.is_some())
            .finish()
    }
}

impl Serialize for MediaRef {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&self.src)
    }
}

impl<'de> Deserialize<'de> for MediaRef {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        String::deserialize(deserializer).map(MediaRef::new)
    }
}

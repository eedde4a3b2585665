//! Mosaic Render Engine
//!
//! Turns a layer list into pixels and pixels into files:
//! - **Surface:** drawing abstraction with a tiny-skia raster backend
//! - **Renderer:** paints layers with opacity, rotation and flips around
//!   their centers
//! - **Overlay:** selection handles and snap guides for the editor view
//! - **Media:** live handles for images, video and audio, their resolution
//!   and background loading, and playback synchronization
//! - **Session:** the editor driven live, with media kept in step with
//!   every edit and released once undo can no longer reach it
//! - **Export:** still images, and video through an encoder worker
//!
//! # Export Pipeline
//!
//! ```text
//! layers ──► seek all media ──► render frame ──► encoder worker ──► chunks
//!               ▲    (barrier)                  (own thread)          │
//!               └──────────── next timestamp ◄───────────────────────┘
//! ```

pub mod export;
pub mod ffmpeg;
pub mod fonts;
pub mod media;
pub mod overlay;
pub mod renderer;
pub mod session;
pub mod surface;

pub use export::{
    ExportArtifact, ExportFormat, ExportHandle, ExportJobs, ExportOptions, ExportProgress,
    ExportRequest, ExportStage, ExportStatus,
};
pub use fonts::FontBook;
pub use media::{FsMediaResolver, MediaLoader, MediaSynchronizer};
pub use overlay::{render_editor_overlay, render_overlay, OverlayStyle};
pub use renderer::{render, render_frame_at, render_to_pixmap, RenderContext};
pub use session::{LiveSession, Tick};
pub use surface::{PixmapSurface, RecordingSurface, Surface};

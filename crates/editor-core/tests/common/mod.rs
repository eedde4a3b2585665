//! Shared fixtures for editor integration tests.

#![allow(dead_code)]

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use async_trait::async_trait;
use mosaic_common::config::EditorDefaults;
use mosaic_common::error::{MosaicError, MosaicResult};
use mosaic_editor_core::Editor;
use mosaic_scene_model::*;

/// In-memory media with a fixed size and optional duration.
#[derive(Debug)]
pub struct StaticMedia {
    pub kind: MediaKind,
    pub size: (u32, u32),
    pub duration: Option<f64>,
    released: AtomicBool,
}

impl StaticMedia {
    pub fn image(w: u32, h: u32) -> SharedMedia {
        Arc::new(Self {
            kind: MediaKind::Image,
            size: (w, h),
            duration: None,
            released: AtomicBool::new(false),
        })
    }

    pub fn video(w: u32, h: u32, duration: f64) -> SharedMedia {
        Arc::new(Self {
            kind: MediaKind::Video,
            size: (w, h),
            duration: Some(duration),
            released: AtomicBool::new(false),
        })
    }
}

#[async_trait]
impl MediaHandle for StaticMedia {
    fn kind(&self) -> MediaKind {
        self.kind
    }
    fn natural_size(&self) -> (u32, u32) {
        self.size
    }
    fn is_ready(&self) -> bool {
        !self.released.load(Ordering::SeqCst)
    }
    fn duration_secs(&self) -> Option<f64> {
        self.duration
    }
    fn current_time(&self) -> f64 {
        0.0
    }
    async fn seek(&self, secs: f64) -> MosaicResult<f64> {
        Ok(secs)
    }
    fn play(&self) {}
    fn pause(&self) {}
    fn is_playing(&self) -> bool {
        false
    }
    fn current_frame(&self) -> Option<Arc<RgbaFrame>> {
        let (w, h) = self.size;
        Some(Arc::new(RgbaFrame::solid(w, h, [200, 40, 40, 255])))
    }
    fn release(&self) {
        self.released.store(true, Ordering::SeqCst);
    }
    fn is_released(&self) -> bool {
        self.released.load(Ordering::SeqCst)
    }
}

/// Resolves every source to a 100x50 image (or a 5s video), except
/// sources containing "missing".
pub struct FakeResolver;

#[async_trait]
impl MediaResolver for FakeResolver {
    async fn resolve(&self, src: &str, kind: MediaKind) -> MosaicResult<SharedMedia> {
        if src.contains("missing") {
            return Err(MosaicError::media_load(src, "not found"));
        }
        Ok(match kind {
            MediaKind::Image => StaticMedia::image(100, 50),
            MediaKind::Video | MediaKind::Audio => StaticMedia::video(100, 50, 5.0),
        })
    }
}

pub fn editor_with(layers: Vec<Layer>) -> Editor {
    let mut project = ProjectFile::new(&CanvasConfig::new(1080, 1080, "#ffffff"));
    project.layers = layers;
    Editor::from_project(project, EditorDefaults::default()).unwrap()
}

pub fn rect(id: &str, x: f64, y: f64, w: f64, h: f64) -> Layer {
    Layer::shape(ShapeKind::Rectangle, Bounds::new(x, y, w, h)).with_id(id)
}

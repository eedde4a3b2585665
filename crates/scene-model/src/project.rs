//! The project file.
//!
//! A project is one JSON document holding the whole composition:
//! `{version, layers, audioTracks, canvasSize: {w, h}, backgroundColor,
//! uploadedAssets}`. Saved files are portable: transient `blob:` content
//! is inlined before writing, and every content reference is re-resolved
//! into a live handle after loading.

use std::collections::HashSet;
use std::path::{Path, PathBuf};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use thiserror::Error;

use mosaic_common::error::MosaicError;

use crate::blob::{is_blob_ref, BlobStore};
use crate::layer::{AudioTrack, Layer, LayerKind};
use crate::media::{MediaKind, MediaRef, MediaResolver};

/// Current project schema version.
pub const PROJECT_VERSION: u32 = 1;

#[derive(Debug, Error)]
pub enum ProjectError {
    #[error("I/O error at {path}: {source}")]
    IoError {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("Malformed project file{}: {source}", display_path(.path))]
    ParseError {
        path: Option<PathBuf>,
        source: serde_json::Error,
    },

    #[error("Unsupported project version {found} (supported: {supported})")]
    UnsupportedVersion { found: u32, supported: u32 },

    #[error("Invalid project: {message}")]
    ValidationError { message: String },
}

fn display_path(path: &Option<PathBuf>) -> String {
    path.as_ref()
        .map(|p| format!(" {}", p.display()))
        .unwrap_or_default()
}

impl ProjectError {
    fn invalid(message: impl Into<String>) -> Self {
        Self::ValidationError {
            message: message.into(),
        }
    }
}

impl From<ProjectError> for MosaicError {
    fn from(err: ProjectError) -> Self {
        MosaicError::project(err.to_string())
    }
}

/// Canvas pixel size as stored in the project file.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct CanvasSize {
    pub w: u32,
    pub h: u32,
}

/// Runtime canvas configuration.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CanvasConfig {
    pub width: u32,
    pub height: u32,
    pub background_color: String,
}

impl CanvasConfig {
    pub fn new(width: u32, height: u32, background_color: impl Into<String>) -> Self {
        Self {
            width,
            height,
            background_color: background_color.into(),
        }
    }

    pub fn size(&self) -> CanvasSize {
        CanvasSize {
            w: self.width,
            h: self.height,
        }
    }
}

impl Default for CanvasConfig {
    fn default() -> Self {
        Self::new(1080, 1080, "#ffffff")
    }
}

/// An asset the user brought into the project.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UploadedAsset {
    pub id: String,
    pub kind: MediaKind,
    pub src: MediaRef,
    #[serde(default)]
    pub name: String,
}

/// Top-level project document.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProjectFile {
    pub version: u32,
    #[serde(default)]
    pub layers: Vec<Layer>,
    #[serde(default)]
    pub audio_tracks: Vec<AudioTrack>,
    pub canvas_size: CanvasSize,
    pub background_color: String,
    #[serde(default)]
    pub uploaded_assets: Vec<UploadedAsset>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub saved_at: Option<DateTime<Utc>>,
}

impl ProjectFile {
    /// An empty project for the given canvas.
    pub fn new(canvas: &CanvasConfig) -> Self {
        Self {
            version: PROJECT_VERSION,
            layers: vec![],
            audio_tracks: vec![],
            canvas_size: canvas.size(),
            background_color: canvas.background_color.clone(),
            uploaded_assets: vec![],
            saved_at: None,
        }
    }

    pub fn canvas(&self) -> CanvasConfig {
        CanvasConfig::new(
            self.canvas_size.w,
            self.canvas_size.h,
            self.background_color.clone(),
        )
    }

    /// Parse, version-check and validate a project document.
    pub fn from_json(json: &str) -> Result<Self, ProjectError> {
        let value: serde_json::Value =
            serde_json::from_str(json).map_err(|e| ProjectError::ParseError {
                path: None,
                source: e,
            })?;

        // Version is checked before the full structure so that a future
        // schema is reported as such rather than as a parse error.
        let found = value
            .get("version")
            .and_then(|v| v.as_u64())
            .ok_or_else(|| ProjectError::invalid("missing numeric \"version\""))?
            as u32;
        if found != PROJECT_VERSION {
            return Err(ProjectError::UnsupportedVersion {
                found,
                supported: PROJECT_VERSION,
            });
        }

        let project: ProjectFile =
            serde_json::from_value(value).map_err(|e| ProjectError::ParseError {
                path: None,
                source: e,
            })?;
        project.validate()?;
        Ok(project)
    }

    pub fn to_json(&self) -> Result<String, ProjectError> {
        serde_json::to_string_pretty(self).map_err(|e| ProjectError::ParseError {
            path: None,
            source: e,
        })
    }

    /// Load a project from disk.
    pub fn load(path: impl AsRef<Path>) -> Result<Self, ProjectError> {
        let path = path.as_ref();
        let json = std::fs::read_to_string(path).map_err(|e| ProjectError::IoError {
            path: path.to_path_buf(),
            source: e,
        })?;
        let project = Self::from_json(&json).map_err(|e| match e {
            ProjectError::ParseError { source, .. } => ProjectError::ParseError {
                path: Some(path.to_path_buf()),
                source,
            },
            other => other,
        })?;
        tracing::info!(
            path = %path.display(),
            layers = project.layers.len(),
            audio_tracks = project.audio_tracks.len(),
            "Project loaded"
        );
        Ok(project)
    }

    /// Write the project to disk, stamping `saved_at`.
    ///
    /// Call [`ProjectFile::make_portable`] first if the project may still
    /// reference transient blobs.
    pub fn save(&mut self, path: impl AsRef<Path>) -> Result<(), ProjectError> {
        let path = path.as_ref();
        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            std::fs::create_dir_all(parent).map_err(|e| ProjectError::IoError {
                path: parent.to_path_buf(),
                source: e,
            })?;
        }
        self.saved_at = Some(Utc::now());
        let json = self.to_json()?;
        std::fs::write(path, json).map_err(|e| ProjectError::IoError {
            path: path.to_path_buf(),
            source: e,
        })?;
        tracing::info!(path = %path.display(), layers = self.layers.len(), "Project saved");
        Ok(())
    }

    pub fn validate(&self) -> Result<(), ProjectError> {
        if self.canvas_size.w == 0 || self.canvas_size.h == 0 {
            return Err(ProjectError::invalid("canvas size must be non-zero"));
        }
        validate_layers(&self.layers)
    }

    /// Every content reference in the project, layers first.
    pub fn media_refs_mut(&mut self) -> impl Iterator<Item = &mut MediaRef> {
        self.layers
            .iter_mut()
            .flat_map(|l| l.media_refs_mut().into_iter().map(|(_, m)| m))
            .chain(self.audio_tracks.iter_mut().map(|t| &mut t.src))
            .chain(self.uploaded_assets.iter_mut().map(|a| &mut a.src))
    }

    /// Replace every `blob:` reference with an inline `data:` URI so the
    /// file no longer depends on this session's memory.
    pub fn make_portable(&mut self, blobs: &BlobStore) -> Result<usize, ProjectError> {
        let mut inlined = 0;
        for media in self.media_refs_mut() {
            if !is_blob_ref(&media.src) {
                continue;
            }
            let uri = blobs.to_data_uri(&media.src).ok_or_else(|| {
                ProjectError::invalid(format!("transient content {} is no longer available", media.src))
            })?;
            media.src = uri;
            inlined += 1;
        }
        if inlined > 0 {
            tracing::debug!(inlined, "Inlined transient content");
        }
        Ok(inlined)
    }

    /// Resolve every content reference into a fresh live handle.
    ///
    /// Layers and audio tracks whose content fails to resolve are dropped
    /// (a Frame only loses its Fill); the failures are returned so the
    /// caller can report them.
    pub async fn resolve_media(&mut self, resolver: &dyn MediaResolver) -> Vec<MosaicError> {
        let mut failures = Vec::new();

        let mut layers = Vec::with_capacity(self.layers.len());
        for mut layer in std::mem::take(&mut self.layers) {
            let mut failed = false;
            for (kind, media) in layer.media_refs_mut() {
                match resolver.resolve(&media.src, kind).await {
                    Ok(handle) => media.handle = Some(handle),
                    Err(e) => {
                        tracing::warn!(src = %short_src(&media.src), error = %e, "Media failed to resolve");
                        failures.push(e);
                        failed = true;
                    }
                }
            }
            if failed {
                match &mut layer.kind {
                    LayerKind::Frame(frame) => frame.fill = None,
                    LayerKind::Image(img) if img.src.handle.is_some() => img.original_src = None,
                    _ => continue,
                }
            }
            layers.push(layer);
        }
        self.layers = layers;

        let mut tracks = Vec::with_capacity(self.audio_tracks.len());
        for mut track in std::mem::take(&mut self.audio_tracks) {
            match resolver.resolve(&track.src.src, MediaKind::Audio).await {
                Ok(handle) => {
                    track.src.handle = Some(handle);
                    tracks.push(track);
                }
                Err(e) => {
                    tracing::warn!(track = %track.name, error = %e, "Audio track failed to resolve");
                    failures.push(e);
                }
            }
        }
        self.audio_tracks = tracks;

        failures
    }
}

fn short_src(src: &str) -> String {
    src.chars().take(64).collect()
}

/// Structural invariants of a layer list.
pub fn validate_layers(layers: &[Layer]) -> Result<(), ProjectError> {
    let mut seen = HashSet::with_capacity(layers.len());
    for layer in layers {
        if !seen.insert(&layer.id) {
            return Err(ProjectError::invalid(format!("duplicate layer id {}", layer.id)));
        }
        if !(layer.width > 0.0 && layer.height > 0.0) {
            return Err(ProjectError::invalid(format!(
                "layer {} has non-positive size {}x{}",
                layer.id, layer.width, layer.height
            )));
        }
        if !(0.0..=1.0).contains(&layer.opacity) {
            return Err(ProjectError::invalid(format!(
                "layer {} opacity {} outside 0..1",
                layer.id, layer.opacity
            )));
        }
        if let Some(fill) = layer.frame_fill() {
            if fill.placement.scale < 1.0 {
                return Err(ProjectError::invalid(format!(
                    "frame {} fill scale {} below 1",
                    layer.id, fill.placement.scale
                )));
            }
        }
    }
    Ok(())
}

/// Length of the composition: the longest piece of time-based media.
///
/// Video layers contribute their trimmed window; fills and audio tracks
/// contribute their handle's duration when one is attached.
pub fn composition_duration(layers: &[Layer], audio_tracks: &[AudioTrack]) -> f64 {
    let handle_duration =
        |m: &MediaRef| m.handle.as_ref().and_then(|h| h.duration_secs()).unwrap_or(0.0);

    let layer_max = layers
        .iter()
        .map(|layer| match &layer.kind {
            LayerKind::Video(video) => video.play_length(),
            LayerKind::Frame(frame) => frame.fill.as_ref().map(|f| handle_duration(&f.src)).unwrap_or(0.0),
            _ => 0.0,
        })
        .fold(0.0_f64, f64::max);

    audio_tracks
        .iter()
        .map(|t| handle_duration(&t.src))
        .fold(layer_max, f64::max)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::geometry::Bounds;
    use crate::layer::{Fill, FillKind, MediaPlacement, ShapeKind};
    use crate::media::{MediaHandle, RgbaFrame, SharedMedia};
    use async_trait::async_trait;
    use mosaic_common::error::MosaicResult;
    use std::sync::Arc;

    #[derive(Debug)]
    struct FixedHandle(MediaKind);

    #[async_trait]
    impl MediaHandle for FixedHandle {
        fn kind(&self) -> MediaKind {
            self.0
        }
        fn natural_size(&self) -> (u32, u32) {
            (4, 4)
        }
        fn is_ready(&self) -> bool {
            true
        }
        fn duration_secs(&self) -> Option<f64> {
            (self.0 != MediaKind::Image).then_some(7.5)
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
            Some(Arc::new(RgbaFrame::solid(4, 4, [0, 0, 0, 255])))
        }
        fn release(&self) {}
        fn is_released(&self) -> bool {
            false
        }
    }

    /// Resolves everything except sources containing "broken".
    struct PickyResolver;

    #[async_trait]
    impl MediaResolver for PickyResolver {
        async fn resolve(&self, src: &str, kind: MediaKind) -> MosaicResult<SharedMedia> {
            if src.contains("broken") {
                return Err(MosaicError::media_load(src, "decode failed"));
            }
            Ok(Arc::new(FixedHandle(kind)))
        }
    }

    fn sample_project() -> ProjectFile {
        let mut project = ProjectFile::new(&CanvasConfig::default());
        project.layers.push(Layer::text("title", Bounds::new(0.0, 0.0, 300.0, 80.0)).with_id("t"));
        project.layers.push(Layer::image("a.png", Bounds::new(10.0, 10.0, 200.0, 200.0)).with_id("i"));
        let mut frame = Layer::frame(ShapeKind::Ellipse, Bounds::new(100.0, 100.0, 300.0, 300.0)).with_id("f");
        if let LayerKind::Frame(content) = &mut frame.kind {
            content.fill = Some(Fill {
                kind: FillKind::Video,
                src: MediaRef::new("clip.mp4"),
                placement: MediaPlacement::default(),
            });
        }
        project.layers.push(frame);
        project.audio_tracks.push(AudioTrack::new("music", "song.mp3"));
        project
    }

    #[test]
    fn test_json_field_names() {
        let project = sample_project();
        let value = serde_json::to_value(&project).unwrap();
        assert_eq!(value["version"], 1);
        assert_eq!(value["canvasSize"]["w"], 1080);
        assert_eq!(value["backgroundColor"], "#ffffff");
        assert!(value["audioTracks"].is_array());
        assert!(value["uploadedAssets"].is_array());
    }

    #[test]
    fn test_roundtrip_preserves_order_and_geometry() {
        let project = sample_project();
        let back = ProjectFile::from_json(&project.to_json().unwrap()).unwrap();
        assert_eq!(back.layers.len(), 3);
        let ids: Vec<&str> = back.layers.iter().map(|l| l.id.as_str()).collect();
        assert_eq!(ids, vec!["t", "i", "f"]);
        assert_eq!(back, project);
    }

    #[test]
    fn test_unsupported_version() {
        let json = r##"{"version": 7, "canvasSize": {"w": 1, "h": 1}, "backgroundColor": "#fff"}"##;
        assert!(matches!(
            ProjectFile::from_json(json),
            Err(ProjectError::UnsupportedVersion { found: 7, .. })
        ));
    }

    #[test]
    fn test_malformed_structure() {
        let json = r##"{"version": 1, "canvasSize": "big", "backgroundColor": "#fff"}"##;
        assert!(matches!(
            ProjectFile::from_json(json),
            Err(ProjectError::ParseError { .. })
        ));
        assert!(ProjectFile::from_json("not json").is_err());
    }

    #[test]
    fn test_duplicate_ids_rejected() {
        let mut project = sample_project();
        let dup = project.layers[0].clone();
        project.layers.push(dup);
        assert!(matches!(
            project.validate(),
            Err(ProjectError::ValidationError { .. })
        ));
    }

    #[test]
    fn test_make_portable_inlines_blobs() {
        let blobs = BlobStore::new();
        let key = blobs.insert("image/png", vec![9, 9]);
        let mut project = sample_project();
        if let LayerKind::Image(img) = &mut project.layers[1].kind {
            img.src = MediaRef::new(key.clone());
        }
        assert_eq!(project.make_portable(&blobs).unwrap(), 1);
        let json = project.to_json().unwrap();
        assert!(!json.contains("blob:"));
        assert!(json.contains("data:image/png;base64,"));

        let mut missing = sample_project();
        missing.audio_tracks[0].src = MediaRef::new("blob:gone");
        assert!(missing.make_portable(&blobs).is_err());
    }

    #[test]
    fn test_save_and_load() {
        let dir = std::env::temp_dir().join(format!("mosaic-project-{}", uuid::Uuid::new_v4()));
        let path = dir.join("p.json");
        let mut project = sample_project();
        project.save(&path).unwrap();
        let loaded = ProjectFile::load(&path).unwrap();
        assert!(loaded.saved_at.is_some());
        assert_eq!(loaded.layers, project.layers);
        let _ = std::fs::remove_dir_all(dir);
    }

    #[tokio::test]
    async fn test_resolve_media_attaches_handles_and_drops_failures() {
        let mut project = sample_project();
        project.layers.push(Layer::image("broken.png", Bounds::new(0.0, 0.0, 5.0, 5.0)));
        project.audio_tracks.push(AudioTrack::new("bad", "broken.mp3"));

        let failures = project.resolve_media(&PickyResolver).await;
        assert_eq!(failures.len(), 2);
        assert_eq!(project.layers.len(), 3);
        assert_eq!(project.audio_tracks.len(), 1);
        assert!(project.layers[1].media_refs()[0].is_ready());
        assert!(project.layers[2].frame_fill().unwrap().src.is_ready());

        // Fill and audio handles report 7.5s.
        assert_eq!(composition_duration(&project.layers, &project.audio_tracks), 7.5);
    }

    #[tokio::test]
    async fn test_broken_fill_keeps_frame() {
        let mut project = sample_project();
        if let LayerKind::Frame(frame) = &mut project.layers[2].kind {
            frame.fill.as_mut().unwrap().src = MediaRef::new("broken.mp4");
        }
        let failures = project.resolve_media(&PickyResolver).await;
        assert_eq!(failures.len(), 1);
        assert_eq!(project.layers.len(), 3);
        assert!(project.layers[2].frame_fill().is_none());
    }
}

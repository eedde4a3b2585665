//! Layer types.
//!
//! A composition is an ordered list of layers: index 0 is painted first,
//! the last index is topmost. Layers are plain values; every edit produces
//! a new value, which is what lets history compare snapshots structurally.

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::geometry::{to_local, Bounds, Point2D};
use crate::media::{MediaKind, MediaRef};

/// Unique layer identifier (UUID string).
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct LayerId(pub String);

impl LayerId {
    /// A fresh random id.
    pub fn generate() -> Self {
        Self(uuid::Uuid::new_v4().to_string())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for LayerId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for LayerId {
    fn from(value: &str) -> Self {
        Self(value.to_string())
    }
}

/// One positioned element of the composition.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Layer {
    pub id: LayerId,
    pub name: String,

    /// Top-left of the unrotated box.
    pub x: f64,
    pub y: f64,
    pub width: f64,
    pub height: f64,

    /// Clockwise rotation around the box center, in degrees.
    #[serde(default)]
    pub rotation: f64,

    /// `[0.0, 1.0]`.
    #[serde(default = "default_opacity")]
    pub opacity: f64,

    #[serde(default)]
    pub flip_h: bool,
    #[serde(default)]
    pub flip_v: bool,

    /// Set while the layer's media is still being resolved. Never persisted.
    #[serde(skip)]
    pub is_loading: bool,

    #[serde(flatten)]
    pub kind: LayerKind,
}

fn default_opacity() -> f64 {
    1.0
}

/// Variant payload of a layer.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum LayerKind {
    Text(TextContent),
    Image(ImageContent),
    Video(VideoContent),
    Shape(ShapeContent),
    Frame(FrameContent),
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TextContent {
    pub text: String,
    pub font_family: String,
    pub font_size: f64,
    pub color: String,
    /// CSS weight, 100–900.
    #[serde(default = "default_font_weight")]
    pub font_weight: u16,
    #[serde(default)]
    pub font_style: FontStyle,
    #[serde(default)]
    pub text_decoration: TextDecoration,
    #[serde(default)]
    pub text_align: TextAlign,
    #[serde(default)]
    pub letter_case: LetterCase,
}

fn default_font_weight() -> u16 {
    400
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FontStyle {
    #[default]
    Normal,
    Italic,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum TextDecoration {
    #[default]
    None,
    Underline,
    LineThrough,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TextAlign {
    Left,
    #[default]
    Center,
    Right,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LetterCase {
    #[default]
    None,
    Upper,
    Lower,
}

impl LetterCase {
    pub fn apply(&self, text: &str) -> String {
        match self {
            LetterCase::None => text.to_string(),
            LetterCase::Upper => text.to_uppercase(),
            LetterCase::Lower => text.to_lowercase(),
        }
    }
}

/// Pan/zoom of media content inside its box.
///
/// At `scale == 1` with zero offsets the media is "cover"-fitted: scaled
/// uniformly until it fills the box, then center-cropped. Larger scales
/// zoom in; offsets move the content center relative to the box center
/// (box-local, unrotated units).
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MediaPlacement {
    #[serde(default = "default_scale")]
    pub scale: f64,
    #[serde(default)]
    pub offset_x: f64,
    #[serde(default)]
    pub offset_y: f64,
}

fn default_scale() -> f64 {
    1.0
}

impl Default for MediaPlacement {
    fn default() -> Self {
        Self {
            scale: 1.0,
            offset_x: 0.0,
            offset_y: 0.0,
        }
    }
}

impl MediaPlacement {
    /// Rendered size of `media` content inside a `box_w`×`box_h` box.
    pub fn content_size(&self, box_w: f64, box_h: f64, media_w: f64, media_h: f64) -> (f64, f64) {
        if media_w <= 0.0 || media_h <= 0.0 {
            return (box_w, box_h);
        }
        let cover = (box_w / media_w).max(box_h / media_h) * self.scale.max(1.0);
        (media_w * cover, media_h * cover)
    }

    /// Largest offsets that keep the content covering the whole box.
    pub fn max_offsets(&self, box_w: f64, box_h: f64, media_w: f64, media_h: f64) -> (f64, f64) {
        let (cw, ch) = self.content_size(box_w, box_h, media_w, media_h);
        (((cw - box_w) / 2.0).max(0.0), ((ch - box_h) / 2.0).max(0.0))
    }

    /// Copy with scale floored at 1 and offsets clamped so no empty space shows.
    pub fn clamped(&self, box_w: f64, box_h: f64, media_w: f64, media_h: f64) -> Self {
        let scale = self.scale.max(1.0);
        let base = Self { scale, ..*self };
        let (mx, my) = base.max_offsets(box_w, box_h, media_w, media_h);
        Self {
            scale,
            offset_x: self.offset_x.clamp(-mx, mx),
            offset_y: self.offset_y.clamp(-my, my),
        }
    }

    /// The region of the media (in media pixels) visible through the box.
    pub fn source_rect(&self, box_w: f64, box_h: f64, media_w: f64, media_h: f64) -> Bounds {
        let (cw, ch) = self.content_size(box_w, box_h, media_w, media_h);
        let k = cw / media_w.max(f64::EPSILON);
        let left = box_w / 2.0 + self.offset_x - cw / 2.0;
        let top = box_h / 2.0 + self.offset_y - ch / 2.0;
        Bounds::new(-left / k, -top / k, box_w / k, box_h / k)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ImageContent {
    pub src: MediaRef,
    /// Source before a reversible edit (background removal).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub original_src: Option<MediaRef>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub asset_id: Option<String>,
    #[serde(flatten)]
    pub placement: MediaPlacement,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct VideoContent {
    pub src: MediaRef,
    /// Source length in seconds.
    pub duration: f64,
    /// Trim-in point.
    #[serde(default)]
    pub start_time: f64,
    /// Trim-out point; `None` plays to the end.
    #[serde(default)]
    pub end_time: Option<f64>,
    #[serde(default = "default_opacity")]
    pub volume: f64,
    #[serde(flatten)]
    pub placement: MediaPlacement,
}

impl VideoContent {
    /// Effective out point.
    pub fn end(&self) -> f64 {
        self.end_time
            .unwrap_or(self.duration)
            .clamp(self.start_time, self.duration.max(self.start_time))
    }

    /// Length of the trimmed window.
    pub fn play_length(&self) -> f64 {
        (self.end() - self.start_time).max(0.0)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ShapeKind {
    Rectangle,
    Ellipse,
    Line,
    Arrow,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ShapeContent {
    pub shape: ShapeKind,
    pub fill: String,
    pub stroke: String,
    #[serde(default)]
    pub stroke_width: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FrameContent {
    pub shape: ShapeKind,
    #[serde(default)]
    pub fill: Option<Fill>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FillKind {
    Image,
    Video,
}

impl FillKind {
    pub fn media_kind(&self) -> MediaKind {
        match self {
            FillKind::Image => MediaKind::Image,
            FillKind::Video => MediaKind::Video,
        }
    }
}

/// Media embedded in a Frame, with its own pan/zoom.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Fill {
    pub kind: FillKind,
    pub src: MediaRef,
    #[serde(flatten)]
    pub placement: MediaPlacement,
}

/// An audio-only clip in the composition.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AudioTrack {
    pub id: String,
    #[serde(default)]
    pub asset_id: Option<String>,
    pub src: MediaRef,
    pub name: String,
}

impl AudioTrack {
    pub fn new(name: impl Into<String>, src: impl Into<String>) -> Self {
        Self {
            id: uuid::Uuid::new_v4().to_string(),
            asset_id: None,
            src: MediaRef::new(src),
            name: name.into(),
        }
    }
}

impl Layer {
    /// A new layer with a fresh id and default presentation fields.
    pub fn new(name: impl Into<String>, bounds: Bounds, kind: LayerKind) -> Self {
        Self {
            id: LayerId::generate(),
            name: name.into(),
            x: bounds.x,
            y: bounds.y,
            width: bounds.width,
            height: bounds.height,
            rotation: 0.0,
            opacity: 1.0,
            flip_h: false,
            flip_v: false,
            is_loading: false,
            kind,
        }
    }

    pub fn text(text: impl Into<String>, bounds: Bounds) -> Self {
        Self::new(
            "Text",
            bounds,
            LayerKind::Text(TextContent {
                text: text.into(),
                font_family: "Inter".to_string(),
                font_size: 48.0,
                color: "#000000".to_string(),
                font_weight: 400,
                font_style: FontStyle::Normal,
                text_decoration: TextDecoration::None,
                text_align: TextAlign::Center,
                letter_case: LetterCase::None,
            }),
        )
    }

    pub fn image(src: impl Into<String>, bounds: Bounds) -> Self {
        Self::new(
            "Image",
            bounds,
            LayerKind::Image(ImageContent {
                src: MediaRef::new(src),
                original_src: None,
                asset_id: None,
                placement: MediaPlacement::default(),
            }),
        )
    }

    pub fn video(src: impl Into<String>, bounds: Bounds, duration: f64) -> Self {
        Self::new(
            "Video",
            bounds,
            LayerKind::Video(VideoContent {
                src: MediaRef::new(src),
                duration,
                start_time: 0.0,
                end_time: None,
                volume: 1.0,
                placement: MediaPlacement::default(),
            }),
        )
    }

    pub fn shape(shape: ShapeKind, bounds: Bounds) -> Self {
        let (fill, stroke, stroke_width) = match shape {
            ShapeKind::Line | ShapeKind::Arrow => ("transparent", "#000000", 6.0),
            ShapeKind::Rectangle | ShapeKind::Ellipse => ("#3b82f6", "transparent", 0.0),
        };
        Self::new(
            "Shape",
            bounds,
            LayerKind::Shape(ShapeContent {
                shape,
                fill: fill.to_string(),
                stroke: stroke.to_string(),
                stroke_width,
            }),
        )
    }

    pub fn frame(shape: ShapeKind, bounds: Bounds) -> Self {
        Self::new("Frame", bounds, LayerKind::Frame(FrameContent { shape, fill: None }))
    }

    /// Builder-style id override, mostly for tests and fixtures.
    pub fn with_id(mut self, id: impl Into<String>) -> Self {
        self.id = LayerId(id.into());
        self
    }

    pub fn bounds(&self) -> Bounds {
        Bounds::new(self.x, self.y, self.width, self.height)
    }

    pub fn set_bounds(&mut self, bounds: Bounds) {
        self.x = bounds.x;
        self.y = bounds.y;
        self.width = bounds.width;
        self.height = bounds.height;
    }

    pub fn center(&self) -> Point2D {
        self.bounds().center()
    }

    /// Hit test: the point, taken into the layer's unrotated local frame,
    /// falls within the half extents.
    pub fn contains_point(&self, point: Point2D) -> bool {
        let local = to_local(point, self.center(), self.rotation);
        local.x.abs() <= self.width / 2.0 && local.y.abs() <= self.height / 2.0
    }

    pub fn kind_name(&self) -> &'static str {
        match &self.kind {
            LayerKind::Text(_) => "text",
            LayerKind::Image(_) => "image",
            LayerKind::Video(_) => "video",
            LayerKind::Shape(_) => "shape",
            LayerKind::Frame(_) => "frame",
        }
    }

    /// Image or video layer.
    pub fn is_media(&self) -> bool {
        matches!(self.kind, LayerKind::Image(_) | LayerKind::Video(_))
    }

    pub fn is_frame(&self) -> bool {
        matches!(self.kind, LayerKind::Frame(_))
    }

    pub fn frame_fill(&self) -> Option<&Fill> {
        match &self.kind {
            LayerKind::Frame(frame) => frame.fill.as_ref(),
            _ => None,
        }
    }

    /// Every content reference carried by this layer.
    pub fn media_refs(&self) -> Vec<&MediaRef> {
        match &self.kind {
            LayerKind::Image(img) => {
                let mut refs = vec![&img.src];
                refs.extend(img.original_src.iter());
                refs
            }
            LayerKind::Video(video) => vec![&video.src],
            LayerKind::Frame(frame) => frame.fill.iter().map(|f| &f.src).collect(),
            LayerKind::Text(_) | LayerKind::Shape(_) => vec![],
        }
    }

    /// Mutable access to every content reference, paired with the media
    /// kind it must resolve to.
    pub fn media_refs_mut(&mut self) -> Vec<(MediaKind, &mut MediaRef)> {
        match &mut self.kind {
            LayerKind::Image(img) => {
                let mut refs = vec![(MediaKind::Image, &mut img.src)];
                if let Some(original) = img.original_src.as_mut() {
                    refs.push((MediaKind::Image, original));
                }
                refs
            }
            LayerKind::Video(video) => vec![(MediaKind::Video, &mut video.src)],
            LayerKind::Frame(frame) => frame
                .fill
                .iter_mut()
                .map(|f| (f.kind.media_kind(), &mut f.src))
                .collect(),
            LayerKind::Text(_) | LayerKind::Shape(_) => vec![],
        }
    }

    /// The drawable media of this layer and its placement: the layer's own
    /// content for Image/Video, the Fill for a filled Frame.
    pub fn placed_media(&self) -> Option<(&MediaRef, MediaPlacement)> {
        match &self.kind {
            LayerKind::Image(img) => Some((&img.src, img.placement)),
            LayerKind::Video(video) => Some((&video.src, video.placement)),
            LayerKind::Frame(frame) => frame.fill.as_ref().map(|f| (&f.src, f.placement)),
            LayerKind::Text(_) | LayerKind::Shape(_) => None,
        }
    }

    /// Mutable placement of the drawable media, see [`Layer::placed_media`].
    pub fn placement_mut(&mut self) -> Option<&mut MediaPlacement> {
        match &mut self.kind {
            LayerKind::Image(img) => Some(&mut img.placement),
            LayerKind::Video(video) => Some(&mut video.placement),
            LayerKind::Frame(frame) => frame.fill.as_mut().map(|f| &mut f.placement),
            LayerKind::Text(_) | LayerKind::Shape(_) => None,
        }
    }

    /// Natural size of the drawable media, when a handle is attached.
    pub fn media_natural_size(&self) -> Option<(f64, f64)> {
        let (media, _) = self.placed_media()?;
        let (w, h) = media.handle.as_ref()?.natural_size();
        (w > 0 && h > 0).then_some((w as f64, h as f64))
    }

    /// This layer's media as a Frame fill (placement reset). `None` for
    /// anything but Image/Video.
    pub fn to_fill(&self) -> Option<Fill> {
        match &self.kind {
            LayerKind::Image(img) => Some(Fill {
                kind: FillKind::Image,
                src: img.src.clone(),
                placement: MediaPlacement::default(),
            }),
            LayerKind::Video(video) => Some(Fill {
                kind: FillKind::Video,
                src: video.src.clone(),
                placement: MediaPlacement::default(),
            }),
            _ => None,
        }
    }

    /// Copy with every live handle dropped, as stored on the clipboard.
    pub fn detached(&self) -> Layer {
        let mut copy = self.clone();
        for (_, media) in copy.media_refs_mut() {
            media.handle = None;
        }
        copy
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_layer_json_shape() {
        let layer = Layer::image("a.png", Bounds::new(1.0, 2.0, 30.0, 40.0)).with_id("l1");
        let value = serde_json::to_value(&layer).unwrap();
        assert_eq!(value["type"], "image");
        assert_eq!(value["id"], "l1");
        assert_eq!(value["src"], "a.png");
        assert_eq!(value["flipH"], false);
        assert_eq!(value["scale"], 1.0);
        assert!(value.get("isLoading").is_none());

        let back: Layer = serde_json::from_value(value).unwrap();
        assert_eq!(back, layer);
    }

    #[test]
    fn test_frame_with_fill_roundtrip() {
        let mut layer = Layer::frame(ShapeKind::Ellipse, Bounds::new(0.0, 0.0, 100.0, 100.0));
        if let LayerKind::Frame(frame) = &mut layer.kind {
            frame.fill = Some(Fill {
                kind: FillKind::Video,
                src: MediaRef::new("clip.mp4"),
                placement: MediaPlacement {
                    scale: 1.5,
                    offset_x: 4.0,
                    offset_y: -2.0,
                },
            });
        }
        let json = serde_json::to_string(&layer).unwrap();
        let back: Layer = serde_json::from_str(&json).unwrap();
        assert_eq!(back, layer);
        assert_eq!(back.frame_fill().unwrap().placement.scale, 1.5);
    }

    #[test]
    fn test_rotated_hit_test() {
        let mut layer = Layer::shape(ShapeKind::Rectangle, Bounds::new(0.0, 0.0, 100.0, 20.0));
        assert!(layer.contains_point(Point2D::new(90.0, 10.0)));
        layer.rotation = 90.0;
        // Rotated upright around (50, 10): the far right end is no longer covered.
        assert!(!layer.contains_point(Point2D::new(90.0, 10.0)));
        assert!(layer.contains_point(Point2D::new(50.0, 50.0)));
    }

    #[test]
    fn test_cover_placement_center_crops() {
        let placement = MediaPlacement::default();
        // 200x100 media in a 100x100 box: scaled to 200x100, center crop.
        let src = placement.source_rect(100.0, 100.0, 200.0, 100.0);
        assert!((src.x - 50.0).abs() < 1e-9);
        assert!((src.y - 0.0).abs() < 1e-9);
        assert!((src.width - 100.0).abs() < 1e-9);
        assert!((src.height - 100.0).abs() < 1e-9);
    }

    #[test]
    fn test_placement_clamp_never_reveals_empty_space() {
        let placement = MediaPlacement {
            scale: 2.0,
            offset_x: 500.0,
            offset_y: -500.0,
        };
        let clamped = placement.clamped(100.0, 100.0, 100.0, 100.0);
        // Content is 200x200, so offsets are bounded by 50 each way.
        assert_eq!(clamped.offset_x, 50.0);
        assert_eq!(clamped.offset_y, -50.0);

        let unscaled = MediaPlacement {
            scale: 0.5,
            offset_x: 10.0,
            offset_y: 0.0,
        }
        .clamped(100.0, 100.0, 100.0, 100.0);
        assert_eq!(unscaled.scale, 1.0);
        assert_eq!(unscaled.offset_x, 0.0);
    }

    #[test]
    fn test_video_trim_window() {
        let mut layer = Layer::video("v.mp4", Bounds::new(0.0, 0.0, 10.0, 10.0), 12.0);
        if let LayerKind::Video(video) = &mut layer.kind {
            video.start_time = 2.0;
            video.end_time = Some(8.0);
            assert_eq!(video.play_length(), 6.0);
            video.end_time = Some(50.0);
            assert_eq!(video.end(), 12.0);
        }
    }

    #[test]
    fn test_media_refs_cover_fill_and_original() {
        let mut layer = Layer::image("new.png", Bounds::new(0.0, 0.0, 10.0, 10.0));
        if let LayerKind::Image(img) = &mut layer.kind {
            img.original_src = Some(MediaRef::new("old.png"));
        }
        let srcs: Vec<&str> = layer.media_refs().iter().map(|m| m.src.as_str()).collect();
        assert_eq!(srcs, vec!["new.png", "old.png"]);
        assert!(layer.to_fill().is_some());
        assert!(Layer::text("hi", Bounds::new(0.0, 0.0, 1.0, 1.0))
            .to_fill()
            .is_none());
    }

    #[test]
    fn test_letter_case() {
        assert_eq!(LetterCase::Upper.apply("Hello"), "HELLO");
        assert_eq!(LetterCase::Lower.apply("Hello"), "hello");
        assert_eq!(LetterCase::None.apply("Hello"), "Hello");
    }
}

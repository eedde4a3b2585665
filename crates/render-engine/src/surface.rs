//! Drawing surfaces.
//!
//! The scene renderer talks to a small canvas-like [`Surface`] API: a
//! save/restore state stack holding the current transform, opacity and
//! clip, plus fill/stroke/image/text primitives. [`PixmapSurface`] is the
//! software implementation on top of `tiny-skia`; [`RecordingSurface`]
//! keeps a log of calls for tests and debugging.

use std::sync::Arc;

use tiny_skia::{
    BlendMode, Color, FillRule, FilterQuality, IntSize, LineCap, Mask, Paint, Path, PathBuilder,
    Pattern, Pixmap, PixmapPaint, Rect, SpreadMode, Stroke, StrokeDash, Transform,
};

use mosaic_common::error::{MosaicError, MosaicResult};
use mosaic_scene_model::{Bounds, Point2D, RgbaFrame, Rgba, TextAlign, TextDecoration};

use crate::fonts::FontBook;

/// Geometry accepted by the fill/stroke/clip primitives.
#[derive(Debug, Clone, PartialEq)]
pub enum Shape2D {
    Rect(Bounds),
    Ellipse(Bounds),
    Line { from: Point2D, to: Point2D },
    Polygon(Vec<Point2D>),
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct StrokeStyle {
    pub width: f64,
    pub round_cap: bool,
    /// On/off dash lengths.
    pub dash: Option<(f64, f64)>,
}

impl StrokeStyle {
    pub fn solid(width: f64) -> Self {
        Self {
            width,
            round_cap: false,
            dash: None,
        }
    }

    pub fn round(width: f64) -> Self {
        Self {
            round_cap: true,
            ..Self::solid(width)
        }
    }

    pub fn dashed(width: f64, on: f64, off: f64) -> Self {
        Self {
            dash: Some((on, off)),
            ..Self::solid(width)
        }
    }
}

/// One line of text. `y` is the vertical middle of the line; `x` is the
/// left edge, center or right edge depending on `align`.
#[derive(Debug, Clone, PartialEq)]
pub struct TextRun<'a> {
    pub text: &'a str,
    pub family: &'a str,
    pub size: f64,
    pub weight: u16,
    pub italic: bool,
    pub decoration: TextDecoration,
    pub align: TextAlign,
    pub color: Rgba,
    pub x: f64,
    pub y: f64,
}

/// Canvas-style 2D drawing target.
pub trait Surface {
    fn width(&self) -> u32;

    fn height(&self) -> u32;

    /// Replace every pixel with `color`, ignoring transform and clip.
    fn clear(&mut self, color: Rgba);

    fn save(&mut self);

    fn restore(&mut self);

    fn translate(&mut self, dx: f64, dy: f64);

    fn rotate(&mut self, degrees: f64);

    fn scale(&mut self, sx: f64, sy: f64);

    /// Multiply the current global alpha by `alpha`.
    fn multiply_opacity(&mut self, alpha: f64);

    /// Intersect the current clip with `shape`.
    fn clip(&mut self, shape: &Shape2D);

    fn fill(&mut self, shape: &Shape2D, color: Rgba);

    fn stroke(&mut self, shape: &Shape2D, style: &StrokeStyle, color: Rgba);

    /// Draw the `src` region of `frame` (frame pixels) stretched onto `dst`.
    fn draw_image(&mut self, frame: &RgbaFrame, src: Bounds, dst: Bounds);

    fn fill_text(&mut self, run: &TextRun<'_>);
}

// tiny-skia

#[derive(Clone)]
struct DrawState {
    transform: Transform,
    opacity: f32,
    clip: Option<Mask>,
}

impl Default for DrawState {
    fn default() -> Self {
        Self {
            transform: Transform::identity(),
            opacity: 1.0,
            clip: None,
        }
    }
}

/// Software surface backed by a premultiplied RGBA `tiny_skia::Pixmap`.
pub struct PixmapSurface {
    pixmap: Pixmap,
    state: DrawState,
    stack: Vec<DrawState>,
    fonts: Arc<FontBook>,
}

impl PixmapSurface {
    pub fn new(width: u32, height: u32, fonts: Arc<FontBook>) -> MosaicResult<Self> {
        let pixmap = Pixmap::new(width, height).ok_or_else(|| {
            MosaicError::render(format!("failed to allocate {width}x{height} surface"))
        })?;
        Ok(Self {
            pixmap,
            state: DrawState::default(),
            stack: Vec::new(),
            fonts,
        })
    }

    pub fn pixmap(&self) -> &Pixmap {
        &self.pixmap
    }

    /// Straight-alpha copy of the pixels.
    pub fn to_frame(&self) -> RgbaFrame {
        let mut pixels = Vec::with_capacity(self.pixmap.data().len());
        for px in self.pixmap.pixels() {
            let c = px.demultiply();
            pixels.extend_from_slice(&[c.red(), c.green(), c.blue(), c.alpha()]);
        }
        RgbaFrame {
            width: self.pixmap.width(),
            height: self.pixmap.height(),
            pixels,
        }
    }

    /// Consume the surface, handing its frame to the caller.
    pub fn into_frame(self) -> RgbaFrame {
        self.to_frame()
    }

    pub fn encode_png(&self) -> MosaicResult<Vec<u8>> {
        self.pixmap
            .encode_png()
            .map_err(|e| MosaicError::encode(format!("PNG encoding failed: {e}")))
    }

    fn paint_for(&self, color: Rgba) -> Paint<'static> {
        let alpha = (color.a as f32 * self.state.opacity).round().clamp(0.0, 255.0) as u8;
        let mut paint = Paint::default();
        paint.set_color(Color::from_rgba8(color.r, color.g, color.b, alpha));
        paint.anti_alias = true;
        paint
    }

    fn draw_text_run(&mut self, run: &TextRun<'_>) {
        let fonts = Arc::clone(&self.fonts);
        let Some(font) = fonts.select(run.family, run.weight, run.italic) else {
            tracing::debug!(family = run.family, "No font loaded, skipping text run");
            return;
        };
        let px = run.size as f32;
        let width = font.measure(run.text, px) as f64;
        let left = match run.align {
            TextAlign::Left => run.x,
            TextAlign::Center => run.x - width / 2.0,
            TextAlign::Right => run.x - width,
        };
        let (ascent, descent) = font.vertical_metrics(px);
        let baseline = run.y + (ascent + descent) as f64 / 2.0;

        let mut base = self.state.transform;
        if run.italic && !font.is_italic() {
            // Synthetic oblique around the baseline.
            base = base
                .pre_concat(Transform::from_translate(0.0, baseline as f32))
                .pre_concat(Transform::from_row(1.0, 0.0, -0.2, 1.0, 0.0, 0.0))
                .pre_concat(Transform::from_translate(0.0, -baseline as f32));
        }

        let paint = PixmapPaint {
            opacity: self.state.opacity,
            blend_mode: BlendMode::SourceOver,
            quality: FilterQuality::Bilinear,
        };
        for glyph in font.layout(run.text, px) {
            let Some(tile) = glyph_pixmap(&glyph.coverage, glyph.width, glyph.height, run.color)
            else {
                continue;
            };
            let gx = left as f32 + glyph.x;
            let gy = baseline as f32 - glyph.top;
            let ts = base.pre_concat(Transform::from_translate(gx, gy));
            self.pixmap
                .draw_pixmap(0, 0, tile.as_ref(), &paint, ts, self.state.clip.as_ref());
        }

        let thickness = (run.size / 14.0).max(1.0);
        let deco_y = match run.decoration {
            TextDecoration::None => None,
            TextDecoration::Underline => Some(baseline + thickness * 1.5),
            TextDecoration::LineThrough => Some(baseline - ascent as f64 * 0.3),
        };
        if let Some(y) = deco_y {
            if let Some(rect) = Rect::from_xywh(left as f32, y as f32, width as f32, thickness as f32) {
                let paint = self.paint_for(run.color);
                self.pixmap
                    .fill_rect(rect, &paint, base, self.state.clip.as_ref());
            }
        }
    }
}

impl Surface for PixmapSurface {
    fn width(&self) -> u32 {
        self.pixmap.width()
    }

    fn height(&self) -> u32 {
        self.pixmap.height()
    }

    fn clear(&mut self, color: Rgba) {
        self.pixmap
            .fill(Color::from_rgba8(color.r, color.g, color.b, color.a));
    }

    fn save(&mut self) {
        self.stack.push(self.state.clone());
    }

    fn restore(&mut self) {
        if let Some(state) = self.stack.pop() {
            self.state = state;
        }
    }

    fn translate(&mut self, dx: f64, dy: f64) {
        self.state.transform = self
            .state
            .transform
            .pre_concat(Transform::from_translate(dx as f32, dy as f32));
    }

    fn rotate(&mut self, degrees: f64) {
        self.state.transform = self
            .state
            .transform
            .pre_concat(Transform::from_rotate(degrees as f32));
    }

    fn scale(&mut self, sx: f64, sy: f64) {
        self.state.transform = self
            .state
            .transform
            .pre_concat(Transform::from_scale(sx as f32, sy as f32));
    }

    fn multiply_opacity(&mut self, alpha: f64) {
        self.state.opacity *= alpha.clamp(0.0, 1.0) as f32;
    }

    fn clip(&mut self, shape: &Shape2D) {
        let Some(path) = build_path(shape) else {
            return;
        };
        let transform = self.state.transform;
        match self.state.clip.as_mut() {
            Some(mask) => mask.intersect_path(&path, FillRule::Winding, true, transform),
            None => {
                if let Some(mut mask) = Mask::new(self.pixmap.width(), self.pixmap.height()) {
                    mask.fill_path(&path, FillRule::Winding, true, transform);
                    self.state.clip = Some(mask);
                }
            }
        }
    }

    fn fill(&mut self, shape: &Shape2D, color: Rgba) {
        let Some(path) = build_path(shape) else {
            return;
        };
        let paint = self.paint_for(color);
        self.pixmap.fill_path(
            &path,
            &paint,
            FillRule::Winding,
            self.state.transform,
            self.state.clip.as_ref(),
        );
    }

    fn stroke(&mut self, shape: &Shape2D, style: &StrokeStyle, color: Rgba) {
        let Some(path) = build_path(shape) else {
            return;
        };
        let mut stroke = Stroke {
            width: style.width as f32,
            line_cap: if style.round_cap {
                LineCap::Round
            } else {
                LineCap::Butt
            },
            ..Stroke::default()
        };
        if let Some((on, off)) = style.dash {
            stroke.dash = StrokeDash::new(vec![on as f32, off as f32], 0.0);
        }
        let paint = self.paint_for(color);
        self.pixmap.stroke_path(
            &path,
            &paint,
            &stroke,
            self.state.transform,
            self.state.clip.as_ref(),
        );
    }

    fn draw_image(&mut self, frame: &RgbaFrame, src: Bounds, dst: Bounds) {
        if src.width <= 0.0 || src.height <= 0.0 {
            return;
        }
        let Some(image) = frame_to_pixmap(frame) else {
            return;
        };
        let Some(rect) = Rect::from_xywh(
            dst.x as f32,
            dst.y as f32,
            dst.width as f32,
            dst.height as f32,
        ) else {
            return;
        };
        let sx = dst.width / src.width;
        let sy = dst.height / src.height;
        let pattern_ts = Transform::from_row(
            sx as f32,
            0.0,
            0.0,
            sy as f32,
            (dst.x - src.x * sx) as f32,
            (dst.y - src.y * sy) as f32,
        );
        let mut paint = Paint::default();
        paint.anti_alias = true;
        paint.shader = Pattern::new(
            image.as_ref(),
            SpreadMode::Pad,
            FilterQuality::Bilinear,
            self.state.opacity,
            pattern_ts,
        );
        self.pixmap
            .fill_rect(rect, &paint, self.state.transform, self.state.clip.as_ref());
    }

    fn fill_text(&mut self, run: &TextRun<'_>) {
        if run.text.is_empty() || !run.color.is_visible() {
            return;
        }
        self.draw_text_run(run);
    }
}

fn build_path(shape: &Shape2D) -> Option<Path> {
    match shape {
        Shape2D::Rect(b) => {
            let rect = Rect::from_xywh(b.x as f32, b.y as f32, b.width as f32, b.height as f32)?;
            Some(PathBuilder::from_rect(rect))
        }
        Shape2D::Ellipse(b) => {
            let rect = Rect::from_xywh(b.x as f32, b.y as f32, b.width as f32, b.height as f32)?;
            PathBuilder::from_oval(rect)
        }
        Shape2D::Line { from, to } => {
            let mut pb = PathBuilder::new();
            pb.move_to(from.x as f32, from.y as f32);
            pb.line_to(to.x as f32, to.y as f32);
            pb.finish()
        }
        Shape2D::Polygon(points) => {
            let (first, rest) = points.split_first()?;
            let mut pb = PathBuilder::new();
            pb.move_to(first.x as f32, first.y as f32);
            for p in rest {
                pb.line_to(p.x as f32, p.y as f32);
            }
            pb.close();
            pb.finish()
        }
    }
}

/// Premultiplied copy of a straight-alpha frame.
fn frame_to_pixmap(frame: &RgbaFrame) -> Option<Pixmap> {
    let size = IntSize::from_wh(frame.width, frame.height)?;
    let mut data = frame.pixels.clone();
    premultiply_rgba_in_place(&mut data);
    Pixmap::from_vec(data, size)
}

fn glyph_pixmap(coverage: &[u8], width: usize, height: usize, color: Rgba) -> Option<Pixmap> {
    let size = IntSize::from_wh(width as u32, height as u32)?;
    let mut data = Vec::with_capacity(width * height * 4);
    for &c in coverage {
        let a = (c as u16 * color.a as u16 + 127) / 255;
        data.extend_from_slice(&[color.r, color.g, color.b, a as u8]);
    }
    premultiply_rgba_in_place(&mut data);
    Pixmap::from_vec(data, size)
}

fn premultiply_rgba_in_place(bytes: &mut [u8]) {
    for pixel in bytes.chunks_exact_mut(4) {
        let alpha = pixel[3] as u16;
        pixel[0] = ((pixel[0] as u16 * alpha + 127) / 255) as u8;
        pixel[1] = ((pixel[1] as u16 * alpha + 127) / 255) as u8;
        pixel[2] = ((pixel[2] as u16 * alpha + 127) / 255) as u8;
    }
}

// Recording

/// One call made against a [`RecordingSurface`].
#[derive(Debug, Clone, PartialEq)]
pub enum DrawCommand {
    Clear(Rgba),
    Save,
    Restore,
    Translate(f64, f64),
    Rotate(f64),
    Scale(f64, f64),
    Opacity(f64),
    Clip(Shape2D),
    Fill(Shape2D, Rgba),
    Stroke(Shape2D, StrokeStyle, Rgba),
    Image { size: (u32, u32), src: Bounds, dst: Bounds },
    Text { text: String, align: TextAlign, x: f64, y: f64 },
}

/// Surface that only records what was drawn.
#[derive(Debug, Clone, Default)]
pub struct RecordingSurface {
    width: u32,
    height: u32,
    pub commands: Vec<DrawCommand>,
}

impl RecordingSurface {
    pub fn new(width: u32, height: u32) -> Self {
        Self {
            width,
            height,
            commands: Vec::new(),
        }
    }

    pub fn fills(&self) -> impl Iterator<Item = (&Shape2D, &Rgba)> {
        self.commands.iter().filter_map(|c| match c {
            DrawCommand::Fill(shape, color) => Some((shape, color)),
            _ => None,
        })
    }

    pub fn texts(&self) -> Vec<&str> {
        self.commands
            .iter()
            .filter_map(|c| match c {
                DrawCommand::Text { text, .. } => Some(text.as_str()),
                _ => None,
            })
            .collect()
    }
}

impl Surface for RecordingSurface {
    fn width(&self) -> u32 {
        self.width
    }

    fn height(&self) -> u32 {
        self.height
    }

    fn clear(&mut self, color: Rgba) {
        self.commands.push(DrawCommand::Clear(color));
    }

    fn save(&mut self) {
        self.commands.push(DrawCommand::Save);
    }

    fn restore(&mut self) {
        self.commands.push(DrawCommand::Restore);
    }

    fn translate(&mut self, dx: f64, dy: f64) {
        self.commands.push(DrawCommand::Translate(dx, dy));
    }

    fn rotate(&mut self, degrees: f64) {
        self.commands.push(DrawCommand::Rotate(degrees));
    }

    fn scale(&mut self, sx: f64, sy: f64) {
        self.commands.push(DrawCommand::Scale(sx, sy));
    }

    fn multiply_opacity(&mut self, alpha: f64) {
        self.commands.push(DrawCommand::Opacity(alpha));
    }

    fn clip(&mut self, shape: &Shape2D) {
        self.commands.push(DrawCommand::Clip(shape.clone()));
    }

    fn fill(&mut self, shape: &Shape2D, color: Rgba) {
        self.commands.push(DrawCommand::Fill(shape.clone(), color));
    }

    fn stroke(&mut self, shape: &Shape2D, style: &StrokeStyle, color: Rgba) {
        self.commands
            .push(DrawCommand::Stroke(shape.clone(), *style, color));
    }

    fn draw_image(&mut self, frame: &RgbaFrame, src: Bounds, dst: Bounds) {
        self.commands.push(DrawCommand::Image {
            size: (frame.width, frame.height),
            src,
            dst,
        });
    }

    fn fill_text(&mut self, run: &TextRun<'_>) {
        self.commands.push(DrawCommand::Text {
            text: run.text.to_string(),
            align: run.align,
            x: run.x,
            y: run.y,
        });
    }
}

//! Scene renderer.
//!
//! [`render`] paints a layer list onto any [`Surface`]: background first,
//! then every layer in array order with its opacity, rotation and flips
//! applied around the layer center. It reads nothing but its arguments,
//! so the live preview and the export pipeline draw identical frames.

use std::sync::Arc;

use mosaic_common::error::MosaicResult;
use mosaic_scene_model::{
    Bounds, CanvasConfig, FontStyle, FrameContent, Layer, LayerKind, MediaPlacement, MediaRef,
    Point2D, Rgba, ShapeContent, ShapeKind, TextAlign, TextContent,
};

use crate::fonts::FontBook;
use crate::media::MediaSynchronizer;
use crate::surface::{PixmapSurface, Shape2D, StrokeStyle, Surface, TextRun};

/// Line box height as a multiple of the font size.
pub const LINE_HEIGHT: f64 = 1.2;

const LOADING_FILL: Rgba = Rgba::new(148, 163, 184, 96);
const EMPTY_FRAME_FILL: Rgba = Rgba::new(148, 163, 184, 56);
const EMPTY_FRAME_BORDER: Rgba = Rgba::new(100, 116, 139, 200);

/// Paint `layers` over `background`.
pub fn render<S: Surface + ?Sized>(surface: &mut S, layers: &[Layer], background: Rgba) {
    surface.clear(background);
    for layer in layers {
        render_layer(surface, layer);
    }
}

/// Paint one layer with its own transform, restoring the surface state after.
pub fn render_layer<S: Surface + ?Sized>(surface: &mut S, layer: &Layer) {
    surface.save();
    surface.multiply_opacity(layer.opacity);
    let center = layer.center();
    surface.translate(center.x, center.y);
    surface.rotate(layer.rotation);
    if layer.flip_h || layer.flip_v {
        surface.scale(
            if layer.flip_h { -1.0 } else { 1.0 },
            if layer.flip_v { -1.0 } else { 1.0 },
        );
    }

    let local = Bounds::new(
        -layer.width / 2.0,
        -layer.height / 2.0,
        layer.width,
        layer.height,
    );
    if layer.is_loading {
        surface.fill(&Shape2D::Rect(local), LOADING_FILL);
    } else {
        match &layer.kind {
            LayerKind::Image(image) => {
                draw_media(surface, &image.src, image.placement, local);
            }
            LayerKind::Video(video) => {
                draw_media(surface, &video.src, video.placement, local);
            }
            LayerKind::Text(text) => draw_text(surface, text, local),
            LayerKind::Shape(shape) => draw_shape(surface, shape, local),
            LayerKind::Frame(frame) => draw_frame(surface, frame, local),
        }
    }
    surface.restore();
}

/// Cover-crop the media's current frame into `local`. Returns `false`
/// when there is nothing to draw yet.
fn draw_media<S: Surface + ?Sized>(
    surface: &mut S,
    media: &MediaRef,
    placement: MediaPlacement,
    local: Bounds,
) -> bool {
    let Some(frame) = media.handle.as_ref().and_then(|h| h.current_frame()) else {
        return false;
    };
    let source = placement.source_rect(
        local.width,
        local.height,
        frame.width as f64,
        frame.height as f64,
    );
    surface.draw_image(&frame, source, local);
    true
}

fn draw_text<S: Surface + ?Sized>(surface: &mut S, text: &TextContent, local: Bounds) {
    let content = text.letter_case.apply(&text.text);
    let lines: Vec<&str> = content
        .split('\n')
        .map(|l| l.strip_suffix('\r').unwrap_or(l))
        .collect();
    let line_height = text.font_size * LINE_HEIGHT;
    let top = -(line_height * lines.len() as f64) / 2.0;
    let x = match text.text_align {
        TextAlign::Left => local.left(),
        TextAlign::Center => 0.0,
        TextAlign::Right => local.right(),
    };
    let color = Rgba::parse_or(&text.color, Rgba::BLACK);
    let italic = matches!(text.font_style, FontStyle::Italic);

    for (i, line) in lines.iter().enumerate() {
        surface.fill_text(&TextRun {
            text: line,
            family: &text.font_family,
            size: text.font_size,
            weight: text.font_weight,
            italic,
            decoration: text.text_decoration,
            align: text.text_align,
            color,
            x,
            y: top + line_height * (i as f64 + 0.5),
        });
    }
}

fn draw_shape<S: Surface + ?Sized>(surface: &mut S, shape: &ShapeContent, local: Bounds) {
    let fill = Rgba::parse_or(&shape.fill, Rgba::TRANSPARENT);
    let stroke = Rgba::parse_or(&shape.stroke, Rgba::TRANSPARENT);
    match shape.shape {
        ShapeKind::Rectangle | ShapeKind::Ellipse => {
            let outline = outline_for(shape.shape, local);
            if fill.is_visible() {
                surface.fill(&outline, fill);
            }
            if stroke.is_visible() && shape.stroke_width > 0.0 {
                surface.stroke(&outline, &StrokeStyle::solid(shape.stroke_width), stroke);
            }
        }
        ShapeKind::Line | ShapeKind::Arrow => {
            let thickness = shape.stroke_width.max(1.0);
            let color = if stroke.is_visible() { stroke } else { fill };
            let from = Point2D::new(local.left() + thickness / 2.0, 0.0);
            let tip = Point2D::new(local.right() - thickness / 2.0, 0.0);
            if shape.shape == ShapeKind::Arrow {
                let head = arrowhead(from, tip, thickness);
                // Stop the shaft inside the head so the round cap stays hidden.
                let shaft_end = Point2D::lerp(&head[1], &head[2], 0.5);
                surface.stroke(
                    &Shape2D::Line {
                        from,
                        to: shaft_end,
                    },
                    &StrokeStyle::round(thickness),
                    color,
                );
                surface.fill(&Shape2D::Polygon(head.to_vec()), color);
            } else {
                surface.stroke(
                    &Shape2D::Line { from, to: tip },
                    &StrokeStyle::round(thickness),
                    color,
                );
            }
        }
    }
}

/// Triangle `[tip, left, right]` for an arrow running `from -> tip`.
pub fn arrowhead(from: Point2D, tip: Point2D, thickness: f64) -> [Point2D; 3] {
    let length = (thickness * 3.0).max(12.0);
    let half_width = length * 0.6;
    let (dx, dy) = from.delta_to(&tip);
    let norm = (dx * dx + dy * dy).sqrt().max(f64::EPSILON);
    let (ux, uy) = (dx / norm, dy / norm);
    let base = Point2D::new(tip.x - ux * length, tip.y - uy * length);
    [
        tip,
        Point2D::new(base.x - uy * half_width, base.y + ux * half_width),
        Point2D::new(base.x + uy * half_width, base.y - ux * half_width),
    ]
}

fn draw_frame<S: Surface + ?Sized>(surface: &mut S, frame: &FrameContent, local: Bounds) {
    let outline = outline_for(frame.shape, local);
    surface.save();
    surface.clip(&outline);
    let filled = match &frame.fill {
        Some(fill) => draw_media(surface, &fill.src, fill.placement, local),
        None => false,
    };
    if !filled {
        surface.fill(&outline, EMPTY_FRAME_FILL);
        let inset = Bounds::new(local.x + 1.0, local.y + 1.0, local.width - 2.0, local.height - 2.0);
        if inset.width > 0.0 && inset.height > 0.0 {
            surface.stroke(
                &outline_for(frame.shape, inset),
                &StrokeStyle::dashed(2.0, 8.0, 6.0),
                EMPTY_FRAME_BORDER,
            );
        }
    }
    surface.restore();
}

/// Frame clip shapes are boxes or ovals; line kinds clip to the box.
fn outline_for(shape: ShapeKind, local: Bounds) -> Shape2D {
    match shape {
        ShapeKind::Ellipse => Shape2D::Ellipse(local),
        ShapeKind::Rectangle | ShapeKind::Line | ShapeKind::Arrow => Shape2D::Rect(local),
    }
}

/// Background to clear with, honouring a transparent export request.
pub fn background_for(canvas: &CanvasConfig, transparent: bool) -> Rgba {
    if transparent {
        Rgba::TRANSPARENT
    } else {
        Rgba::parse_or(&canvas.background_color, Rgba::WHITE)
    }
}

/// Render options shared by one-shot renders and exports.
#[derive(Debug, Clone, Default)]
pub struct RenderContext {
    pub fonts: Arc<FontBook>,
    pub transparent: bool,
}

/// Render the scene at the canvas's native resolution.
pub fn render_to_pixmap(
    layers: &[Layer],
    canvas: &CanvasConfig,
    ctx: &RenderContext,
) -> MosaicResult<PixmapSurface> {
    let mut surface = PixmapSurface::new(canvas.width, canvas.height, Arc::clone(&ctx.fonts))?;
    render(&mut surface, layers, background_for(canvas, ctx.transparent));
    Ok(surface)
}

/// Seek every handle to `secs`, then render once. The playheads stay
/// leased until the pixels are drawn.
pub async fn render_frame_at(
    layers: &[Layer],
    canvas: &CanvasConfig,
    sync: &MediaSynchronizer,
    secs: f64,
    ctx: &RenderContext,
) -> MosaicResult<PixmapSurface> {
    let _lease = sync.lease().await;
    sync.seek_all_to(secs).await?;
    tracing::debug!(secs, layers = layers.len(), "Rendering frame");
    render_to_pixmap(layers, canvas, ctx)
}

//! Editor overlay: selection boxes, transform handles, snap guides.
//!
//! Drawn on top of the scene in canvas units. Every size is divided by
//! the viewport zoom so controls keep the same on-screen pixel size.

use mosaic_editor_core::{AlignmentGuide, Editor, GuideOrientation, Handle, InteractionConfig};
use mosaic_scene_model::{Bounds, Layer, LayerId, Point2D, Rgba};

use crate::surface::{Shape2D, StrokeStyle, Surface};

#[derive(Debug, Clone, Copy)]
pub struct OverlayStyle {
    pub accent: Rgba,
    pub handle_fill: Rgba,
    pub guide: Rgba,
    pub line_px: f64,
    pub handle_radius_px: f64,
    pub rotate_handle_offset_px: f64,
}

impl Default for OverlayStyle {
    fn default() -> Self {
        Self::from(&InteractionConfig::default())
    }
}

impl From<&InteractionConfig> for OverlayStyle {
    fn from(config: &InteractionConfig) -> Self {
        Self {
            accent: Rgba::new(59, 130, 246, 255),
            handle_fill: Rgba::WHITE,
            guide: Rgba::new(236, 72, 153, 255),
            line_px: 1.5,
            // Drawn a little smaller than the hit radius.
            handle_radius_px: config.handle_radius_px * 0.75,
            rotate_handle_offset_px: config.rotate_handle_offset_px,
        }
    }
}

/// Selection and guides of an editing session.
pub fn render_editor_overlay<S: Surface + ?Sized>(surface: &mut S, editor: &Editor) {
    let style = OverlayStyle::from(editor.interaction().config());
    let store = editor.store();
    render_overlay(
        surface,
        store.get_layers(),
        store.selection(),
        store.fill_edit(),
        editor.guides(),
        editor.viewport().zoom,
        &style,
    );
}

pub fn render_overlay<S: Surface + ?Sized>(
    surface: &mut S,
    layers: &[Layer],
    selection: &[LayerId],
    fill_edit: Option<&LayerId>,
    guides: &[AlignmentGuide],
    zoom: f64,
    style: &OverlayStyle,
) {
    let zoom = zoom.max(f64::EPSILON);
    let selected: Vec<&Layer> = layers
        .iter()
        .filter(|l| selection.contains(&l.id))
        .collect();
    let show_handles = selected.len() == 1 && fill_edit.is_none();

    for layer in &selected {
        surface.save();
        let c = layer.center();
        surface.translate(c.x, c.y);
        surface.rotate(layer.rotation);
        let local = Bounds::new(
            -layer.width / 2.0,
            -layer.height / 2.0,
            layer.width,
            layer.height,
        );
        surface.stroke(
            &Shape2D::Rect(local),
            &StrokeStyle::solid(style.line_px / zoom),
            style.accent,
        );
        if fill_edit == Some(&layer.id) {
            draw_fill_extent(surface, layer, zoom, style);
        }
        if show_handles {
            draw_handles(surface, layer, zoom, style);
        }
        surface.restore();
    }

    for guide in guides {
        let (from, to) = match guide.orientation {
            GuideOrientation::Vertical => (
                Point2D::new(guide.position, guide.start),
                Point2D::new(guide.position, guide.end),
            ),
            GuideOrientation::Horizontal => (
                Point2D::new(guide.start, guide.position),
                Point2D::new(guide.end, guide.position),
            ),
        };
        surface.stroke(
            &Shape2D::Line { from, to },
            &StrokeStyle::solid(1.0 / zoom),
            style.guide,
        );
    }
}

fn draw_handles<S: Surface + ?Sized>(surface: &mut S, layer: &Layer, zoom: f64, style: &OverlayStyle) {
    let r = style.handle_radius_px / zoom;
    let outline = StrokeStyle::solid(style.line_px / zoom);

    let top = Point2D::new(0.0, -layer.height / 2.0);
    let knob = Point2D::new(0.0, top.y - style.rotate_handle_offset_px / zoom);
    surface.stroke(&Shape2D::Line { from: top, to: knob }, &outline, style.accent);

    let mut centers: Vec<Point2D> = Handle::ALL
        .iter()
        .map(|h| h.local_position(layer.width, layer.height))
        .collect();
    centers.push(knob);
    for p in centers {
        let dot = Shape2D::Ellipse(Bounds::centered(p, r * 2.0, r * 2.0));
        surface.fill(&dot, style.handle_fill);
        surface.stroke(&dot, &outline, style.accent);
    }
}

/// Dashed outline of the whole fill content while panning it.
fn draw_fill_extent<S: Surface + ?Sized>(surface: &mut S, layer: &Layer, zoom: f64, style: &OverlayStyle) {
    let (Some(fill), Some((mw, mh))) = (layer.frame_fill(), layer.media_natural_size()) else {
        return;
    };
    let (cw, ch) = fill.placement.content_size(layer.width, layer.height, mw, mh);
    let extent = Bounds::centered(
        Point2D::new(fill.placement.offset_x, fill.placement.offset_y),
        cw,
        ch,
    );
    surface.stroke(
        &Shape2D::Rect(extent),
        &StrokeStyle::dashed(style.line_px / zoom, 6.0 / zoom, 4.0 / zoom),
        style.accent,
    );
}

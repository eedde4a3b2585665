//! Pointer gesture state machine.
//!
//! `idle → moving | resizing | rotating | panning-fill → idle`. During a
//! gesture the store is written continuously but nothing is committed;
//! pointer-up commits once, so a whole drag is one undo step. Each active
//! state keeps a copy of the manipulated layer(s) as they were at
//! pointer-down, and every move recomputes from that baseline.

use mosaic_common::config::EditorDefaults;
use mosaic_scene_model::geometry::{angle_deg, normalize_degrees, rotate_vec, to_canvas, to_local};
use mosaic_scene_model::{Bounds, Layer, LayerId, LayerKind, MediaPlacement, Point2D};

use crate::history::History;
use crate::input::Modifiers;
use crate::snap::{AlignmentGuide, SnapEngine};
use crate::store::LayerStore;

/// Resize handle on the selection box.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Handle {
    TopLeft,
    Top,
    TopRight,
    Right,
    BottomRight,
    Bottom,
    BottomLeft,
    Left,
}

impl Handle {
    pub const ALL: [Handle; 8] = [
        Handle::TopLeft,
        Handle::Top,
        Handle::TopRight,
        Handle::Right,
        Handle::BottomRight,
        Handle::Bottom,
        Handle::BottomLeft,
        Handle::Left,
    ];

    /// Direction of the handle from the box center, each component in {-1, 0, 1}.
    pub fn signs(&self) -> (f64, f64) {
        match self {
            Handle::TopLeft => (-1.0, -1.0),
            Handle::Top => (0.0, -1.0),
            Handle::TopRight => (1.0, -1.0),
            Handle::Right => (1.0, 0.0),
            Handle::BottomRight => (1.0, 1.0),
            Handle::Bottom => (0.0, 1.0),
            Handle::BottomLeft => (-1.0, 1.0),
            Handle::Left => (-1.0, 0.0),
        }
    }

    pub fn is_corner(&self) -> bool {
        let (sx, sy) = self.signs();
        sx != 0.0 && sy != 0.0
    }

    /// Position relative to the center of a `width`×`height` box.
    pub fn local_position(&self, width: f64, height: f64) -> Point2D {
        let (sx, sy) = self.signs();
        Point2D::new(sx * width / 2.0, sy * height / 2.0)
    }
}

/// What a pointer-down landed on among the selection's controls.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HandleHit {
    Resize(Handle),
    Rotate,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum GestureKind {
    Move,
    Resize,
    Rotate,
    PanFill,
}

#[derive(Debug, Clone, Default)]
pub enum InteractionState {
    #[default]
    Idle,
    Moving {
        target: LayerId,
        start: Point2D,
        baseline: Vec<Layer>,
    },
    Resizing {
        target: LayerId,
        handle: Handle,
        start: Point2D,
        baseline: Layer,
    },
    Rotating {
        target: LayerId,
        /// Pointer angle minus layer rotation at pointer-down.
        angle_offset: f64,
        baseline: Layer,
    },
    PanningFill {
        target: LayerId,
        start: Point2D,
        baseline: Layer,
    },
}

impl InteractionState {
    pub fn kind(&self) -> Option<GestureKind> {
        match self {
            InteractionState::Idle => None,
            InteractionState::Moving { .. } => Some(GestureKind::Move),
            InteractionState::Resizing { .. } => Some(GestureKind::Resize),
            InteractionState::Rotating { .. } => Some(GestureKind::Rotate),
            InteractionState::PanningFill { .. } => Some(GestureKind::PanFill),
        }
    }
}

/// Result of a finished gesture.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GestureEnd {
    pub kind: GestureKind,
    /// A new history entry was recorded.
    pub committed: bool,
    /// The moved media layer became this Frame's Fill.
    pub absorbed_into: Option<LayerId>,
}

/// Tunables, in screen pixels where applicable.
#[derive(Debug, Clone, Copy)]
pub struct InteractionConfig {
    pub min_size: f64,
    pub handle_radius_px: f64,
    pub rotate_handle_offset_px: f64,
    pub rotation_snap_degrees: f64,
    pub snap: SnapEngine,
}

impl From<&EditorDefaults> for InteractionConfig {
    fn from(defaults: &EditorDefaults) -> Self {
        Self {
            min_size: defaults.min_layer_size,
            handle_radius_px: defaults.handle_radius_px,
            rotate_handle_offset_px: defaults.rotate_handle_offset_px,
            rotation_snap_degrees: defaults.rotation_snap_degrees,
            snap: SnapEngine::new(defaults.snap_threshold_px),
        }
    }
}

impl Default for InteractionConfig {
    fn default() -> Self {
        Self::from(&EditorDefaults::default())
    }
}

#[derive(Debug, Clone, Default)]
pub struct InteractionEngine {
    state: InteractionState,
    config: InteractionConfig,
    guides: Vec<AlignmentGuide>,
}

impl InteractionEngine {
    pub fn new(config: InteractionConfig) -> Self {
        Self {
            state: InteractionState::Idle,
            config,
            guides: Vec::new(),
        }
    }

    pub fn state(&self) -> &InteractionState {
        &self.state
    }

    pub fn is_idle(&self) -> bool {
        matches!(self.state, InteractionState::Idle)
    }

    pub fn config(&self) -> &InteractionConfig {
        &self.config
    }

    /// Guides to draw for the current move, empty otherwise.
    pub fn guides(&self) -> &[AlignmentGuide] {
        &self.guides
    }

    /// Rotate-handle position relative to the layer center, in canvas units.
    pub fn rotate_handle_local(&self, layer: &Layer, zoom: f64) -> Point2D {
        Point2D::new(0.0, -layer.height / 2.0 - self.config.rotate_handle_offset_px / zoom)
    }

    /// Hit test the selection controls of `layer`.
    pub fn hit_handle(&self, layer: &Layer, point: Point2D, zoom: f64) -> Option<HandleHit> {
        let local = to_local(point, layer.center(), layer.rotation);
        let radius = self.config.handle_radius_px / zoom;
        if local.distance_to(&self.rotate_handle_local(layer, zoom)) <= radius {
            return Some(HandleHit::Rotate);
        }
        Handle::ALL
            .into_iter()
            .find(|h| local.distance_to(&h.local_position(layer.width, layer.height)) <= radius)
            .map(HandleHit::Resize)
    }

    /// Begin a gesture. `point` is in canvas units.
    pub fn pointer_down(
        &mut self,
        store: &mut LayerStore,
        point: Point2D,
        modifiers: Modifiers,
        zoom: f64,
    ) -> Option<GestureKind> {
        self.guides.clear();

        if let Some(selected) = store.single_selected() {
            match self.hit_handle(selected, point, zoom) {
                Some(HandleHit::Rotate) => {
                    let angle_offset = angle_deg(selected.center(), point) - selected.rotation;
                    self.state = InteractionState::Rotating {
                        target: selected.id.clone(),
                        angle_offset,
                        baseline: selected.clone(),
                    };
                    return self.started();
                }
                Some(HandleHit::Resize(handle)) => {
                    self.state = InteractionState::Resizing {
                        target: selected.id.clone(),
                        handle,
                        start: point,
                        baseline: selected.clone(),
                    };
                    return self.started();
                }
                None => {}
            }
        }

        if let Some(frame) = store.fill_edit().and_then(|id| store.layer(id)) {
            if frame.contains_point(point) {
                self.state = InteractionState::PanningFill {
                    target: frame.id.clone(),
                    start: point,
                    baseline: frame.clone(),
                };
                return self.started();
            }
        }

        let Some(index) = hit_test(store.get_layers(), point) else {
            store.clear_selection();
            self.state = InteractionState::Idle;
            return None;
        };
        let id = store.get_layers()[index].id.clone();

        if modifiers.shift {
            store.toggle_selected(id.clone());
            if !store.is_selected(&id) {
                return None;
            }
        } else if !store.is_selected(&id) {
            store.select(id.clone());
        } else if store.fill_edit().is_some_and(|f| f != &id) {
            store.exit_fill_edit();
        }

        let baseline = store
            .get_layers()
            .iter()
            .filter(|l| store.is_selected(&l.id))
            .cloned()
            .collect();
        self.state = InteractionState::Moving {
            target: id,
            start: point,
            baseline,
        };
        self.started()
    }

    /// Continue the active gesture. Writes to the store, never commits.
    pub fn pointer_move(&mut self, store: &mut LayerStore, point: Point2D, modifiers: Modifiers, zoom: f64) {
        let config = self.config;
        match &self.state {
            InteractionState::Idle => {}
            InteractionState::Moving { target, start, baseline } => {
                let (dx, dy) = start.delta_to(&point);
                let Some(hit) = baseline.iter().find(|l| &l.id == target) else {
                    return;
                };
                let unsnapped = Bounds::new(hit.x + dx, hit.y + dy, hit.width, hit.height);
                let others: Vec<Bounds> = store
                    .get_layers()
                    .iter()
                    .filter(|l| !baseline.iter().any(|b| b.id == l.id))
                    .map(Layer::bounds)
                    .collect();
                let canvas = store.canvas();
                let snapped = config.snap.snap(
                    unsnapped,
                    &others,
                    canvas.width as f64,
                    canvas.height as f64,
                    zoom,
                );
                let (cx, cy) = snapped.correction(&unsnapped);
                self.guides = snapped.guides;

                let baseline = baseline.clone();
                store.replace_layers(|layers| {
                    layers
                        .iter()
                        .map(|l| match baseline.iter().find(|b| b.id == l.id) {
                            Some(b) => Layer {
                                x: b.x + dx + cx,
                                y: b.y + dy + cy,
                                ..l.clone()
                            },
                            None => l.clone(),
                        })
                        .collect()
                });
            }
            InteractionState::Resizing { target, handle, start, baseline } => {
                let next = resize_layer(baseline, *handle, *start, point, modifiers.shift, config.min_size);
                store.update_layer(target, |_| next);
            }
            InteractionState::Rotating { target, angle_offset, baseline } => {
                let step = modifiers.shift.then_some(config.rotation_snap_degrees);
                let next = rotate_layer(baseline, *angle_offset, point, step);
                store.update_layer(target, |_| next);
            }
            InteractionState::PanningFill { target, start, baseline } => {
                let next = pan_fill(baseline, *start, point);
                store.update_layer(target, |_| next);
            }
        }
    }

    /// Finish the gesture and commit the result as one history entry.
    pub fn pointer_up(&mut self, store: &mut LayerStore, history: &mut History, point: Point2D) -> Option<GestureEnd> {
        let state = std::mem::take(&mut self.state);
        self.guides.clear();
        let kind = state.kind()?;

        let mut absorbed_into = None;
        if let InteractionState::Moving { target, baseline, .. } = &state {
            if baseline.len() == 1 {
                absorbed_into = absorb_into_frame(store, target, point);
            }
        }

        let committed = history.commit_store(store);
        tracing::debug!(?kind, committed, absorbed = absorbed_into.is_some(), "Gesture finished");
        Some(GestureEnd {
            kind,
            committed,
            absorbed_into,
        })
    }

    /// Abort the gesture and put the manipulated layers back.
    pub fn cancel(&mut self, store: &mut LayerStore) {
        let state = std::mem::take(&mut self.state);
        self.guides.clear();
        let baseline = match state {
            InteractionState::Idle => return,
            InteractionState::Moving { baseline, .. } => baseline,
            InteractionState::Resizing { baseline, .. }
            | InteractionState::Rotating { baseline, .. }
            | InteractionState::PanningFill { baseline, .. } => vec![baseline],
        };
        store.replace_layers(|layers| {
            layers
                .iter()
                .map(|l| baseline.iter().find(|b| b.id == l.id).unwrap_or(l).clone())
                .collect()
        });
        tracing::debug!("Gesture cancelled");
    }

    fn started(&self) -> Option<GestureKind> {
        let kind = self.state.kind();
        tracing::debug!(?kind, "Gesture started");
        kind
    }
}

/// Index of the top-most layer containing `point`.
pub fn hit_test(layers: &[Layer], point: Point2D) -> Option<usize> {
    layers.iter().rposition(|l| l.contains_point(point))
}

/// If `target` is a loaded Image/Video layer released over a Frame, move
/// its media into the Frame's Fill and delete it.
fn absorb_into_frame(store: &mut LayerStore, target: &LayerId, point: Point2D) -> Option<LayerId> {
    let layer = store.layer(target)?;
    if layer.is_loading {
        return None;
    }
    let fill = layer.to_fill()?;
    let frame_id = store
        .get_layers()
        .iter()
        .rev()
        .find(|l| l.is_frame() && &l.id != target && l.contains_point(point))
        .map(|l| l.id.clone())?;

    store.replace_layers(|layers| {
        layers
            .iter()
            .filter(|l| &l.id != target)
            .map(|l| {
                let mut next = l.clone();
                if next.id == frame_id {
                    if let LayerKind::Frame(frame) = &mut next.kind {
                        frame.fill = Some(fill.clone());
                    }
                }
                next
            })
            .collect()
    });
    store.select(frame_id.clone());
    tracing::debug!(layer = %target, frame = %frame_id, "Media absorbed into frame");
    Some(frame_id)
}

fn flip_signs(layer: &Layer) -> (f64, f64) {
    (
        if layer.flip_h { -1.0 } else { 1.0 },
        if layer.flip_v { -1.0 } else { 1.0 },
    )
}

/// Resize `baseline` by dragging `handle` from `start` to `current`.
///
/// Corners keep the aspect ratio unless `free` is set; edges change one
/// axis. The side opposite the handle stays fixed in canvas space. Edges on
/// Image, Video and filled Frame layers crop: the content keeps its size
/// and position on screen while the box changes.
pub fn resize_layer(baseline: &Layer, handle: Handle, start: Point2D, current: Point2D, free: bool, min_size: f64) -> Layer {
    let (sx, sy) = handle.signs();
    let (w0, h0) = (baseline.width, baseline.height);
    let (dx, dy) = rotate_vec(current.x - start.x, current.y - start.y, -baseline.rotation);
    let raw_w = w0 + sx * dx;
    let raw_h = h0 + sy * dy;

    let (w, h) = if handle.is_corner() {
        if free {
            (raw_w.max(min_size), raw_h.max(min_size))
        } else {
            let ratio = w0 / h0;
            let (mut w, mut h) = if (sx * dx).abs() >= (sy * dy).abs() {
                (raw_w, raw_w / ratio)
            } else {
                (raw_h * ratio, raw_h)
            };
            let (min_w, min_h) = if ratio >= 1.0 {
                (min_size * ratio, min_size)
            } else {
                (min_size, min_size / ratio)
            };
            if w < min_w || h < min_h {
                w = min_w;
                h = min_h;
            }
            (w, h)
        }
    } else if sx != 0.0 {
        (raw_w.max(min_size), h0)
    } else {
        (w0, raw_h.max(min_size))
    };

    let anchor = to_canvas(Point2D::new(-sx * w0 / 2.0, -sy * h0 / 2.0), baseline.center(), baseline.rotation);
    let (ax, ay) = rotate_vec(-sx * w / 2.0, -sy * h / 2.0, baseline.rotation);
    let center = Point2D::new(anchor.x - ax, anchor.y - ay);

    let mut next = baseline.clone();
    next.set_bounds(Bounds::centered(center, w, h));
    if !handle.is_corner() {
        crop_to_box(baseline, &mut next);
    }
    next
}

/// Re-derive media placement so content stays put while the box changes.
fn crop_to_box(baseline: &Layer, resized: &mut Layer) {
    let Some((_, placement)) = baseline.placed_media() else {
        return;
    };
    let (mw, mh) = baseline
        .media_natural_size()
        .unwrap_or((baseline.width, baseline.height));
    let old_cover = (baseline.width / mw).max(baseline.height / mh);
    let new_cover = (resized.width / mw).max(resized.height / mh);
    let scale = (placement.scale * old_cover / new_cover).max(1.0);

    let (fx, fy) = flip_signs(baseline);
    let content = to_canvas(
        Point2D::new(placement.offset_x * fx, placement.offset_y * fy),
        baseline.center(),
        baseline.rotation,
    );
    let local = to_local(content, resized.center(), resized.rotation);
    let next = MediaPlacement {
        scale,
        offset_x: local.x * fx,
        offset_y: local.y * fy,
    }
    .clamped(resized.width, resized.height, mw, mh);

    if let Some(p) = resized.placement_mut() {
        *p = next;
    }
}

/// Rotate so the pointer angle minus `angle_offset` becomes the rotation.
pub fn rotate_layer(baseline: &Layer, angle_offset: f64, pointer: Point2D, snap_step: Option<f64>) -> Layer {
    let mut rotation = angle_deg(baseline.center(), pointer) - angle_offset;
    if let Some(step) = snap_step.filter(|s| *s > 0.0) {
        rotation = (rotation / step).round() * step;
    }
    Layer {
        rotation: normalize_degrees(rotation),
        ..baseline.clone()
    }
}

/// Pan a Frame's Fill by the pointer delta, clamped so the Fill keeps
/// covering the frame.
pub fn pan_fill(baseline: &Layer, start: Point2D, current: Point2D) -> Layer {
    let mut next = baseline.clone();
    let natural = baseline.media_natural_size();
    let (fx, fy) = flip_signs(baseline);
    let (dx, dy) = rotate_vec(current.x - start.x, current.y - start.y, -baseline.rotation);
    let (w, h) = (baseline.width, baseline.height);

    if let LayerKind::Frame(frame) = &mut next.kind {
        if let Some(fill) = frame.fill.as_mut() {
            let (mw, mh) = natural.unwrap_or((w, h));
            fill.placement = MediaPlacement {
                scale: fill.placement.scale,
                offset_x: fill.placement.offset_x + dx * fx,
                offset_y: fill.placement.offset_y + dy * fy,
            }
            .clamped(w, h, mw, mh);
        }
    }
    next
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::history::HistoryEntry;
    use mosaic_scene_model::{CanvasConfig, Fill, FillKind, MediaRef, ShapeKind};

    fn approx(a: f64, b: f64) -> bool {
        (a - b).abs() < 1e-6
    }

    fn rect(id: &str, x: f64, y: f64, w: f64, h: f64) -> Layer {
        Layer::shape(ShapeKind::Rectangle, Bounds::new(x, y, w, h)).with_id(id)
    }

    fn setup(layers: Vec<Layer>) -> (LayerStore, History, InteractionEngine) {
        let store = LayerStore::with_contents(CanvasConfig::default(), layers, vec![]);
        let history = History::new(HistoryEntry::capture(&store), 100);
        (store, history, InteractionEngine::default())
    }

    #[test]
    fn test_hit_test_prefers_topmost() {
        let layers = vec![rect("a", 0.0, 0.0, 100.0, 100.0), rect("b", 50.0, 50.0, 100.0, 100.0)];
        assert_eq!(hit_test(&layers, Point2D::new(75.0, 75.0)), Some(1));
        assert_eq!(hit_test(&layers, Point2D::new(10.0, 10.0)), Some(0));
        assert_eq!(hit_test(&layers, Point2D::new(500.0, 500.0)), None);
    }

    #[test]
    fn test_click_empty_canvas_deselects() {
        let (mut store, _, mut engine) = setup(vec![rect("a", 0.0, 0.0, 100.0, 100.0)]);
        store.select(LayerId::from("a"));
        let started = engine.pointer_down(&mut store, Point2D::new(900.0, 900.0), Modifiers::NONE, 1.0);
        assert!(started.is_none());
        assert!(store.selection().is_empty());
        assert!(engine.is_idle());
    }

    #[test]
    fn test_drag_is_one_history_entry() {
        let (mut store, mut history, mut engine) = setup(vec![rect("a", 100.0, 100.0, 100.0, 100.0)]);
        engine.pointer_down(&mut store, Point2D::new(150.0, 150.0), Modifiers::NONE, 1.0);
        for step in 1..=10 {
            let p = Point2D::new(150.0 + step as f64 * 7.0, 150.0);
            engine.pointer_move(&mut store, p, Modifiers::NONE, 1.0);
        }
        assert_eq!(history.len(), 1);
        let end = engine.pointer_up(&mut store, &mut history, Point2D::new(220.0, 150.0)).unwrap();
        assert_eq!(end.kind, GestureKind::Move);
        assert!(end.committed);
        assert_eq!(history.len(), 2);
        assert_eq!(store.get_layers()[0].x, 170.0);
    }

    #[test]
    fn test_click_without_drag_commits_nothing() {
        let (mut store, mut history, mut engine) = setup(vec![rect("a", 100.0, 100.0, 100.0, 100.0)]);
        engine.pointer_down(&mut store, Point2D::new(150.0, 150.0), Modifiers::NONE, 1.0);
        let end = engine.pointer_up(&mut store, &mut history, Point2D::new(150.0, 150.0)).unwrap();
        assert!(!end.committed);
        assert_eq!(history.len(), 1);
    }

    #[test]
    fn test_move_snaps_center_to_canvas_center() {
        let (mut store, _, mut engine) = setup(vec![rect("a", 0.0, 0.0, 100.0, 100.0)]);
        engine.pointer_down(&mut store, Point2D::new(50.0, 50.0), Modifiers::NONE, 1.0);
        engine.pointer_move(&mut store, Point2D::new(537.0, 543.0), Modifiers::NONE, 1.0);
        let layer = &store.get_layers()[0];
        assert_eq!(layer.center(), Point2D::new(540.0, 540.0));
        assert_eq!(engine.guides().len(), 2);
    }

    #[test]
    fn test_multi_select_moves_together() {
        let (mut store, _, mut engine) = setup(vec![
            rect("a", 100.0, 100.0, 50.0, 50.0),
            rect("b", 300.0, 100.0, 50.0, 50.0),
        ]);
        store.select_all();
        engine.pointer_down(&mut store, Point2D::new(120.0, 120.0), Modifiers::NONE, 1.0);
        engine.pointer_move(&mut store, Point2D::new(140.0, 250.0), Modifiers::NONE, 1.0);
        let layers = store.get_layers();
        assert_eq!((layers[0].x, layers[0].y), (120.0, 230.0));
        assert_eq!((layers[1].x, layers[1].y), (320.0, 230.0));
    }

    #[test]
    fn test_corner_resize_keeps_ratio_and_anchor() {
        let layer = rect("a", 100.0, 100.0, 200.0, 100.0);
        let start = Point2D::new(300.0, 200.0);
        let next = resize_layer(&layer, Handle::BottomRight, start, Point2D::new(400.0, 210.0), false, 20.0);
        assert!(approx(next.width, 300.0));
        assert!(approx(next.height, 150.0));
        assert!(approx(next.x, 100.0) && approx(next.y, 100.0));

        let free = resize_layer(&layer, Handle::BottomRight, start, Point2D::new(400.0, 210.0), true, 20.0);
        assert!(approx(free.width, 300.0) && approx(free.height, 110.0));
    }

    #[test]
    fn test_resize_respects_min_size() {
        let layer = rect("a", 0.0, 0.0, 200.0, 100.0);
        let next = resize_layer(&layer, Handle::BottomRight, Point2D::new(200.0, 100.0), Point2D::new(-500.0, -500.0), false, 20.0);
        assert!(approx(next.height, 20.0));
        assert!(approx(next.width, 40.0));
        assert!(approx(next.x, 0.0) && approx(next.y, 0.0));

        let edge = resize_layer(&layer, Handle::Left, Point2D::new(0.0, 50.0), Point2D::new(400.0, 50.0), false, 20.0);
        assert!(approx(edge.width, 20.0));
        assert!(approx(edge.bounds().right(), 200.0));
    }

    #[test]
    fn test_rotated_resize_anchors_opposite_corner() {
        let mut layer = rect("a", 100.0, 100.0, 200.0, 100.0);
        layer.rotation = 30.0;
        let anchor_before = to_canvas(Handle::TopLeft.local_position(200.0, 100.0), layer.center(), 30.0);
        let grip = to_canvas(Handle::BottomRight.local_position(200.0, 100.0), layer.center(), 30.0);
        let next = resize_layer(&layer, Handle::BottomRight, grip, Point2D::new(grip.x + 40.0, grip.y + 25.0), false, 20.0);
        let anchor_after = to_canvas(Handle::TopLeft.local_position(next.width, next.height), next.center(), 30.0);
        assert!(approx(anchor_before.x, anchor_after.x));
        assert!(approx(anchor_before.y, anchor_after.y));
        assert!(approx(next.width / next.height, 2.0));
    }

    #[test]
    fn test_edge_resize_on_image_crops() {
        let layer = Layer::image("a.png", Bounds::new(0.0, 0.0, 200.0, 200.0)).with_id("img");
        // Drag the right edge 100 units left: box halves, content stays put.
        let next = resize_layer(&layer, Handle::Right, Point2D::new(200.0, 100.0), Point2D::new(100.0, 100.0), false, 20.0);
        assert!(approx(next.width, 100.0) && approx(next.x, 0.0));
        let (_, placement) = next.placed_media().unwrap();
        // Content stays 200x200 centered at x=100; the new box is centered at 50.
        assert!(approx(placement.scale, 1.0));
        assert!(approx(placement.offset_x, 50.0));
        assert!(approx(placement.offset_y, 0.0));
    }

    #[test]
    fn test_rotate_is_continuous_and_snaps() {
        let layer = rect("a", 0.0, 0.0, 100.0, 100.0);
        let center = layer.center();
        // Grab directly above the center: pointer angle -90, rotation 0.
        let offset = angle_deg(center, Point2D::new(50.0, -30.0)) - layer.rotation;
        let same = rotate_layer(&layer, offset, Point2D::new(50.0, -30.0), None);
        assert!(approx(same.rotation, 0.0));

        let right = rotate_layer(&layer, offset, Point2D::new(150.0, 50.0), None);
        assert!(approx(right.rotation, 90.0));

        let nudged = Point2D::new(center.x + 100.0, center.y + 100.0 * 5f64.to_radians().tan());
        let snapped = rotate_layer(&layer, offset, nudged, Some(15.0));
        assert!(approx(snapped.rotation, 90.0));
    }

    #[test]
    fn test_pan_fill_is_clamped() {
        let mut frame = Layer::frame(ShapeKind::Rectangle, Bounds::new(0.0, 0.0, 100.0, 100.0)).with_id("f");
        if let LayerKind::Frame(content) = &mut frame.kind {
            content.fill = Some(Fill {
                kind: FillKind::Image,
                src: MediaRef::new("a.png"),
                placement: MediaPlacement {
                    scale: 1.5,
                    offset_x: 0.0,
                    offset_y: 0.0,
                },
            });
        }
        let next = pan_fill(&frame, Point2D::new(50.0, 50.0), Point2D::new(500.0, 60.0));
        let placement = next.frame_fill().unwrap().placement;
        assert!(approx(placement.offset_x, 25.0));
        assert!(approx(placement.offset_y, 10.0));
    }

    #[test]
    fn test_drop_image_on_frame_becomes_fill() {
        let frame = Layer::frame(ShapeKind::Ellipse, Bounds::new(500.0, 500.0, 300.0, 300.0)).with_id("f");
        let image = Layer::image("a.png", Bounds::new(0.0, 0.0, 100.0, 100.0)).with_id("img");
        let (mut store, mut history, mut engine) = setup(vec![frame, image]);

        engine.pointer_down(&mut store, Point2D::new(50.0, 50.0), Modifiers::NONE, 1.0);
        engine.pointer_move(&mut store, Point2D::new(650.0, 650.0), Modifiers::NONE, 1.0);
        let end = engine.pointer_up(&mut store, &mut history, Point2D::new(650.0, 650.0)).unwrap();

        assert_eq!(end.absorbed_into, Some(LayerId::from("f")));
        assert_eq!(store.get_layers().len(), 1);
        assert_eq!(store.get_layers()[0].frame_fill().unwrap().src.src, "a.png");
        assert_eq!(history.len(), 2);

        history.undo(&mut store);
        assert_eq!(store.get_layers().len(), 2);
        assert!(store.get_layers()[0].frame_fill().is_none());
    }

    #[test]
    fn test_cancel_restores_baseline() {
        let (mut store, _, mut engine) = setup(vec![rect("a", 10.0, 10.0, 100.0, 100.0)]);
        engine.pointer_down(&mut store, Point2D::new(20.0, 20.0), Modifiers::NONE, 1.0);
        engine.pointer_move(&mut store, Point2D::new(300.0, 20.0), Modifiers::NONE, 1.0);
        engine.cancel(&mut store);
        assert_eq!(store.get_layers()[0].x, 10.0);
        assert!(engine.is_idle());
    }

    #[test]
    fn test_handles_hit_only_for_single_selection() {
        let (mut store, _, mut engine) = setup(vec![rect("a", 100.0, 100.0, 100.0, 100.0)]);
        store.select(LayerId::from("a"));
        let kind = engine.pointer_down(&mut store, Point2D::new(202.0, 202.0), Modifiers::NONE, 1.0);
        assert_eq!(kind, Some(GestureKind::Resize));
        engine.cancel(&mut store);

        // Rotate handle sits 28px above the top edge.
        let kind = engine.pointer_down(&mut store, Point2D::new(150.0, 72.0), Modifiers::NONE, 1.0);
        assert_eq!(kind, Some(GestureKind::Rotate));
    }
}

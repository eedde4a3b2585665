//! Alignment snapping for move gestures.
//!
//! The moving box's left/center/right (X) and top/center/bottom (Y) lines
//! are compared against the canvas center and the corresponding lines of
//! every other layer. The axes are resolved independently.
//!
//! Tie-break: a canvas-center match always wins. Otherwise the closest
//! candidate wins, and equal distances go to the lowest z-index, then to
//! the earlier line in left/center/right (top/center/bottom) order.

use mosaic_scene_model::Bounds;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum GuideOrientation {
    /// Constant x.
    Vertical,
    /// Constant y.
    Horizontal,
}

/// A line to draw while snapped. `start..end` runs along the line.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct AlignmentGuide {
    pub orientation: GuideOrientation,
    pub position: f64,
    pub start: f64,
    pub end: f64,
}

/// Corrected top-left plus the guides to show.
#[derive(Debug, Clone, PartialEq)]
pub struct SnapResult {
    pub x: f64,
    pub y: f64,
    pub guides: Vec<AlignmentGuide>,
}

impl SnapResult {
    pub fn correction(&self, unsnapped: &Bounds) -> (f64, f64) {
        (self.x - unsnapped.x, self.y - unsnapped.y)
    }
}

#[derive(Debug, Clone, Copy)]
pub struct SnapEngine {
    /// Screen pixels.
    pub threshold_px: f64,
}

#[derive(Debug, Clone, Copy)]
struct AxisMatch {
    delta: f64,
    distance: f64,
    target: Option<usize>,
    position: f64,
}

impl SnapEngine {
    pub fn new(threshold_px: f64) -> Self {
        Self { threshold_px }
    }

    /// Snap `moving` against the canvas and `others` (in z-order).
    pub fn snap(&self, moving: Bounds, others: &[Bounds], canvas_w: f64, canvas_h: f64, zoom: f64) -> SnapResult {
        let threshold = self.threshold_px / zoom.max(f64::EPSILON);

        let x_match = best_match(
            [moving.left(), moving.center_x(), moving.right()],
            canvas_w / 2.0,
            others.iter().map(|b| [b.left(), b.center_x(), b.right()]),
            threshold,
        );
        let y_match = best_match(
            [moving.top(), moving.center_y(), moving.bottom()],
            canvas_h / 2.0,
            others.iter().map(|b| [b.top(), b.center_y(), b.bottom()]),
            threshold,
        );

        let x = moving.x + x_match.map_or(0.0, |m| m.delta);
        let y = moving.y + y_match.map_or(0.0, |m| m.delta);
        let snapped = Bounds::new(x, y, moving.width, moving.height);

        let mut guides = Vec::new();
        if let Some(m) = x_match {
            let (start, end) = match m.target {
                None => (0.0, canvas_h),
                Some(i) => (snapped.top().min(others[i].top()), snapped.bottom().max(others[i].bottom())),
            };
            guides.push(AlignmentGuide {
                orientation: GuideOrientation::Vertical,
                position: m.position,
                start,
                end,
            });
        }
        if let Some(m) = y_match {
            let (start, end) = match m.target {
                None => (0.0, canvas_w),
                Some(i) => (snapped.left().min(others[i].left()), snapped.right().max(others[i].right())),
            };
            guides.push(AlignmentGuide {
                orientation: GuideOrientation::Horizontal,
                position: m.position,
                start,
                end,
            });
        }

        if !guides.is_empty() {
            tracing::trace!(x, y, guides = guides.len(), "Snapped");
        }
        SnapResult { x, y, guides }
    }
}

fn best_match(
    lines: [f64; 3],
    canvas_center: f64,
    others: impl Iterator<Item = [f64; 3]>,
    threshold: f64,
) -> Option<AxisMatch> {
    let center_distance = (canvas_center - lines[1]).abs();
    if center_distance <= threshold {
        return Some(AxisMatch {
            delta: canvas_center - lines[1],
            distance: center_distance,
            target: None,
            position: canvas_center,
        });
    }

    let mut best: Option<AxisMatch> = None;
    for (index, other) in others.enumerate() {
        for (line, target) in lines.iter().zip(other) {
            let distance = (target - line).abs();
            // Strict comparison keeps the earliest candidate on ties.
            if distance <= threshold && best.map_or(true, |b| distance < b.distance) {
                best = Some(AxisMatch {
                    delta: target - line,
                    distance,
                    target: Some(index),
                    position: target,
                });
            }
        }
    }
    best
}

#[cfg(test)]
mod tests {
    use super::*;

    const CANVAS: f64 = 1080.0;

    #[test]
    fn test_snaps_to_canvas_center() {
        let engine = SnapEngine::new(5.0);
        // Center x = 537 + 0 -> within 5 of 540.
        let moving = Bounds::new(487.0, 0.0, 100.0, 50.0);
        let result = engine.snap(moving, &[], CANVAS, CANVAS, 1.0);
        assert_eq!(result.x + 50.0, 540.0);
        assert_eq!(result.guides.len(), 1);
        let guide = result.guides[0];
        assert_eq!(guide.orientation, GuideOrientation::Vertical);
        assert_eq!((guide.start, guide.end), (0.0, CANVAS));
    }

    #[test]
    fn test_canvas_center_beats_closer_layer() {
        let engine = SnapEngine::new(5.0);
        let moving = Bounds::new(486.0, 0.0, 100.0, 50.0); // center 536
        let other = Bounds::new(486.0, 800.0, 100.0, 50.0); // same lines, distance 0
        let result = engine.snap(moving, &[other], CANVAS, CANVAS, 1.0);
        assert_eq!(result.x, 490.0);
    }

    #[test]
    fn test_closest_layer_wins_then_z_order() {
        let engine = SnapEngine::new(5.0);
        let moving = Bounds::new(100.0, 0.0, 50.0, 50.0);
        let far = Bounds::new(104.0, 300.0, 10.0, 10.0);
        let near = Bounds::new(102.0, 600.0, 10.0, 10.0);
        let result = engine.snap(moving, &[far, near], CANVAS, CANVAS, 1.0);
        assert_eq!(result.x, 102.0);

        let twin = Bounds::new(98.0, 900.0, 10.0, 10.0);
        let result = engine.snap(moving, &[twin, near], CANVAS, CANVAS, 1.0);
        assert_eq!(result.x, 98.0);
    }

    #[test]
    fn test_axes_are_independent() {
        let engine = SnapEngine::new(5.0);
        let moving = Bounds::new(0.0, 0.0, 100.0, 100.0);
        let a = Bounds::new(3.0, 700.0, 10.0, 10.0); // left edges align on x
        let b = Bounds::new(700.0, 102.0, 10.0, 10.0); // its top is near our bottom, which does not count
        let c = Bounds::new(700.0, -2.0, 10.0, 10.0); // tops align on y
        let result = engine.snap(moving, &[a, b, c], CANVAS, CANVAS, 1.0);
        assert_eq!((result.x, result.y), (3.0, -2.0));
        assert_eq!(result.guides.len(), 2);
    }

    #[test]
    fn test_threshold_scales_with_zoom() {
        let engine = SnapEngine::new(5.0);
        let moving = Bounds::new(0.0, 0.0, 10.0, 10.0);
        let other = Bounds::new(8.0, 500.0, 10.0, 10.0);
        // 8 canvas units is outside 5px at zoom 1 but inside at zoom 0.5.
        assert!(engine.snap(moving, &[other], CANVAS, CANVAS, 1.0).guides.is_empty());
        assert_eq!(engine.snap(moving, &[other], CANVAS, CANVAS, 0.5).x, 8.0);
    }

    #[test]
    fn test_guide_spans_both_layers() {
        let engine = SnapEngine::new(5.0);
        let moving = Bounds::new(5.0, 5.0, 200.0, 200.0);
        let other = Bounds::new(5.0, 400.0, 50.0, 50.0);
        let result = engine.snap(moving, &[other], CANVAS, CANVAS, 1.0);
        let guide = result.guides[0];
        assert_eq!(guide.position, 5.0);
        assert_eq!((guide.start, guide.end), (5.0, 450.0));
    }
}

//! Points, boxes, and the rotated-frame math shared by hit testing,
//! resizing, and rendering.

use serde::{Deserialize, Serialize};

/// A point in canvas coordinates.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct Point2D {
    pub x: f64,
    pub y: f64,
}

impl Point2D {
    pub fn new(x: f64, y: f64) -> Self {
        Self { x, y }
    }

    /// Euclidean distance to another point.
    pub fn distance_to(&self, other: &Point2D) -> f64 {
        ((self.x - other.x).powi(2) + (self.y - other.y).powi(2)).sqrt()
    }

    /// Vector from `self` to `other`.
    pub fn delta_to(&self, other: &Point2D) -> (f64, f64) {
        (other.x - self.x, other.y - self.y)
    }

    /// Linear interpolation between two points.
    pub fn lerp(a: &Point2D, b: &Point2D, t: f64) -> Point2D {
        let t = t.clamp(0.0, 1.0);
        Point2D {
            x: a.x + (b.x - a.x) * t,
            y: a.y + (b.y - a.y) * t,
        }
    }
}

/// An axis-aligned box: top-left corner plus size.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Bounds {
    pub x: f64,
    pub y: f64,
    pub width: f64,
    pub height: f64,
}

impl Bounds {
    pub fn new(x: f64, y: f64, width: f64, height: f64) -> Self {
        Self {
            x,
            y,
            width,
            height,
        }
    }

    /// A box of the given size centered on `center`.
    pub fn centered(center: Point2D, width: f64, height: f64) -> Self {
        Self {
            x: center.x - width / 2.0,
            y: center.y - height / 2.0,
            width,
            height,
        }
    }

    pub fn left(&self) -> f64 {
        self.x
    }

    pub fn right(&self) -> f64 {
        self.x + self.width
    }

    pub fn top(&self) -> f64 {
        self.y
    }

    pub fn bottom(&self) -> f64 {
        self.y + self.height
    }

    pub fn center_x(&self) -> f64 {
        self.x + self.width / 2.0
    }

    pub fn center_y(&self) -> f64 {
        self.y + self.height / 2.0
    }

    /// The center point of this box.
    pub fn center(&self) -> Point2D {
        Point2D::new(self.center_x(), self.center_y())
    }

    /// Check if a point is within this (unrotated) box.
    pub fn contains(&self, p: Point2D) -> bool {
        p.x >= self.x && p.x <= self.right() && p.y >= self.y && p.y <= self.bottom()
    }

    /// Width divided by height.
    pub fn aspect_ratio(&self) -> f64 {
        self.width / self.height
    }
}

/// Rotate the vector `(dx, dy)` by `degrees` (clockwise on a y-down canvas).
pub fn rotate_vec(dx: f64, dy: f64, degrees: f64) -> (f64, f64) {
    let (sin, cos) = degrees.to_radians().sin_cos();
    (dx * cos - dy * sin, dx * sin + dy * cos)
}

/// Translate a canvas point into the local, unrotated frame of a box
/// centered at `center` and rotated by `rotation_deg`.
///
/// The result is relative to the box center, so a point inside the box
/// satisfies `|x| <= w/2 && |y| <= h/2`.
pub fn to_local(point: Point2D, center: Point2D, rotation_deg: f64) -> Point2D {
    let (lx, ly) = rotate_vec(point.x - center.x, point.y - center.y, -rotation_deg);
    Point2D::new(lx, ly)
}

/// Inverse of [`to_local`].
pub fn to_canvas(local: Point2D, center: Point2D, rotation_deg: f64) -> Point2D {
    let (dx, dy) = rotate_vec(local.x, local.y, rotation_deg);
    Point2D::new(center.x + dx, center.y + dy)
}

/// Angle of `point` around `center` in degrees, `atan2` convention.
pub fn angle_deg(center: Point2D, point: Point2D) -> f64 {
    (point.y - center.y).atan2(point.x - center.x).to_degrees()
}

/// Normalize an angle into `[0, 360)`.
pub fn normalize_degrees(degrees: f64) -> f64 {
    let wrapped = degrees % 360.0;
    if wrapped < 0.0 {
        wrapped + 360.0
    } else {
        wrapped
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_bounds_edges() {
        let b = Bounds::new(10.0, 20.0, 100.0, 50.0);
        assert_eq!(b.right(), 110.0);
        assert_eq!(b.bottom(), 70.0);
        assert_eq!(b.center(), Point2D::new(60.0, 45.0));
        assert!(b.contains(Point2D::new(10.0, 20.0)));
        assert!(!b.contains(Point2D::new(9.9, 20.0)));
    }

    #[test]
    fn test_centered_bounds() {
        let b = Bounds::centered(Point2D::new(50.0, 50.0), 20.0, 10.0);
        assert_eq!(b.x, 40.0);
        assert_eq!(b.y, 45.0);
    }

    #[test]
    fn test_local_roundtrip_under_rotation() {
        let center = Point2D::new(100.0, 100.0);
        let p = Point2D::new(130.0, 90.0);
        let local = to_local(p, center, 37.0);
        let back = to_canvas(local, center, 37.0);
        assert!((back.x - p.x).abs() < 1e-9);
        assert!((back.y - p.y).abs() < 1e-9);
    }

    #[test]
    fn test_quarter_turn_maps_axes() {
        // A point to the right of the center, in a box rotated by 90 degrees,
        // sits on the box's local negative y axis.
        let local = to_local(Point2D::new(10.0, 0.0), Point2D::default(), 90.0);
        assert!(local.x.abs() < 1e-9);
        assert!((local.y + 10.0).abs() < 1e-9);
    }

    #[test]
    fn test_normalize_degrees() {
        assert_eq!(normalize_degrees(-90.0), 270.0);
        assert_eq!(normalize_degrees(360.0), 0.0);
        assert_eq!(normalize_degrees(45.0), 45.0);
    }

    #[test]
    fn test_angle_deg() {
        let c = Point2D::default();
        assert!((angle_deg(c, Point2D::new(0.0, 1.0)) - 90.0).abs() < 1e-9);
    }

    #[test]
    fn test_point2d_distance() {
        let a = Point2D::new(0.0, 0.0);
        let b = Point2D::new(3.0, 4.0);
        assert!((a.distance_to(&b) - 5.0).abs() < 1e-9);
    }
}

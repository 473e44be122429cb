use serde::{Deserialize, Serialize};

/// Distances below this are treated as coincident points.
pub const EPSILON: f64 = 1e-9;

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Point {
    pub x: f64,
    pub y: f64,
}

impl Point {
    pub const fn new(x: f64, y: f64) -> Self {
        Self { x, y }
    }

    /// Linear interpolation towards `other`; `t` in `[0, 1]`.
    pub fn lerp(&self, other: &Point, t: f64) -> Point {
        Point::new(
            self.x + (other.x - self.x) * t,
            self.y + (other.y - self.y) * t,
        )
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct BoundingBox {
    pub x: f64,
    pub y: f64,
    pub width: f64,
    pub height: f64,
}

impl BoundingBox {
    pub fn center(&self) -> Point {
        Point::new(self.x + self.width / 2.0, self.y + self.height / 2.0)
    }

    /// The larger side; used as the scale unit when normalizing strokes.
    pub fn extent(&self) -> f64 {
        self.width.max(self.height)
    }
}

pub fn distance(a: &Point, b: &Point) -> f64 {
    (b.x - a.x).hypot(b.y - a.y)
}

/// Direction from `a` to `b` in degrees, `(-180, 180]`. Coincident points yield 0.
pub fn angle(a: &Point, b: &Point) -> f64 {
    let dx = b.x - a.x;
    let dy = b.y - a.y;
    if dx.abs() < EPSILON && dy.abs() < EPSILON {
        return 0.0;
    }
    dy.atan2(dx).to_degrees()
}

/// Smallest absolute difference between two directions, in `[0, 180]`.
pub fn angle_difference(a: f64, b: f64) -> f64 {
    let diff = (a - b).rem_euclid(360.0);
    if diff > 180.0 { 360.0 - diff } else { diff }
}

/// Total length of the polyline through `points`.
pub fn path_length(points: &[Point]) -> f64 {
    points.windows(2).map(|w| distance(&w[0], &w[1])).sum()
}

/// Axis-aligned box around `points`, each point inflated by `radius`.
/// Returns `None` for an empty slice.
pub fn bounding_box(points: &[Point], radius: f64) -> Option<BoundingBox> {
    let first = points.first()?;
    let (mut left, mut top, mut right, mut bottom) = (first.x, first.y, first.x, first.y);
    for p in &points[1..] {
        left = left.min(p.x);
        right = right.max(p.x);
        top = top.min(p.y);
        bottom = bottom.max(p.y);
    }
    Some(BoundingBox {
        x: left - radius,
        y: top - radius,
        width: right - left + 2.0 * radius,
        height: bottom - top + 2.0 * radius,
    })
}

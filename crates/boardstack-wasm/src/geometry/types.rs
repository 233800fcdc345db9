//! Core planar geometry types shared by every layer.

use serde::Serialize;

/// 2D point in board coordinate space (millimetres).
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct Point {
    /// X coordinate.
    pub x: f64,
    /// Y coordinate.
    pub y: f64,
}

impl Point {
    /// Create a point.
    pub const fn new(x: f64, y: f64) -> Self {
        Self { x, y }
    }

    /// Euclidean distance to `other`.
    pub fn distance(self, other: Self) -> f64 {
        let dx = self.x - other.x;
        let dy = self.y - other.y;
        dx.mul_add(dx, dy * dy).sqrt()
    }

    /// Point shifted by `(dx, dy)`.
    pub fn offset(self, dx: f64, dy: f64) -> Self {
        Self::new(self.x + dx, self.y + dy)
    }

    /// Coordinates as an array, the vertex type used by the overlay engine.
    pub const fn to_array(self) -> [f64; 2] {
        [self.x, self.y]
    }

    /// Whether both coordinates are finite.
    pub fn is_finite(self) -> bool {
        self.x.is_finite() && self.y.is_finite()
    }
}

/// One closed contour, implicitly closed (last point not repeated).
pub type Ring = Vec<[f64; 2]>;

/// Polygon set in overlay layout: each entry is `[outer, hole, hole, ...]`.
pub type PolygonSet = Vec<Vec<Ring>>;

/// Axis-aligned bounding box.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct BoundingBox {
    /// Minimum X coordinate.
    pub min_x: f64,
    /// Minimum Y coordinate.
    pub min_y: f64,
    /// Maximum X coordinate.
    pub max_x: f64,
    /// Maximum Y coordinate.
    pub max_y: f64,
}

impl BoundingBox {
    /// Creates an empty bounding box that will expand with the first `update` call.
    pub const fn new() -> Self {
        Self {
            min_x: f64::INFINITY,
            min_y: f64::INFINITY,
            max_x: f64::NEG_INFINITY,
            max_y: f64::NEG_INFINITY,
        }
    }

    /// Expands the bounding box to include the given point.
    pub fn update(&mut self, x: f64, y: f64) {
        self.min_x = self.min_x.min(x);
        self.min_y = self.min_y.min(y);
        self.max_x = self.max_x.max(x);
        self.max_y = self.max_y.max(y);
    }

    /// Bounding box of every vertex in a polygon set.
    pub fn of_polygons(polygons: &PolygonSet) -> Self {
        let mut bounds = Self::new();
        for [x, y] in polygons.iter().flatten().flatten() {
            bounds.update(*x, *y);
        }
        bounds
    }

    /// True until the first point has been added.
    pub fn is_empty(&self) -> bool {
        self.min_x > self.max_x || self.min_y > self.max_y
    }

    /// Extent along X.
    pub fn width(&self) -> f64 {
        if self.is_empty() {
            0.0
        } else {
            self.max_x - self.min_x
        }
    }

    /// Extent along Y.
    pub fn height(&self) -> f64 {
        if self.is_empty() {
            0.0
        } else {
            self.max_y - self.min_y
        }
    }

    /// Whether the two boxes overlap with positive area.
    pub fn intersects(&self, other: &Self) -> bool {
        !self.is_empty()
            && !other.is_empty()
            && self.min_x < other.max_x
            && other.min_x < self.max_x
            && self.min_y < other.max_y
            && other.min_y < self.max_y
    }
}

impl Default for BoundingBox {
    fn default() -> Self {
        Self::new()
    }
}

/// Signed area of a ring; positive for counter-clockwise winding.
pub fn signed_area(ring: &[[f64; 2]]) -> f64 {
    let mut twice_area = 0.0;
    let mut previous = match ring.last() {
        Some(last) => *last,
        None => return 0.0,
    };
    for current in ring {
        twice_area += previous[0].mul_add(current[1], -(current[0] * previous[1]));
        previous = *current;
    }
    twice_area / 2.0
}

/// Net area of a polygon set (outer areas minus hole areas).
pub fn polygon_set_area(polygons: &PolygonSet) -> f64 {
    polygons
        .iter()
        .flatten()
        .map(|ring| signed_area(ring))
        .sum::<f64>()
        .abs()
}

/// Planar geometry of one layer after polarity resolution.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct LayerShape {
    /// Polygons with outer rings counter-clockwise and holes clockwise.
    pub polygons: PolygonSet,
}

impl LayerShape {
    /// Wrap an overlay result, normalising ring orientation.
    pub fn from_polygons(polygons: PolygonSet) -> Self {
        let polygons = polygons
            .into_iter()
            .map(|mut polygon| {
                for (index, ring) in polygon.iter_mut().enumerate() {
                    let want_ccw = index == 0;
                    if (signed_area(ring) > 0.0) != want_ccw {
                        ring.reverse();
                    }
                }
                polygon
            })
            .collect();
        Self { polygons }
    }

    /// Whether the shape has no polygons.
    pub fn is_empty(&self) -> bool {
        self.polygons.is_empty()
    }

    /// Net filled area.
    pub fn area(&self) -> f64 {
        polygon_set_area(&self.polygons)
    }

    /// Bounding box of every vertex.
    pub fn bounds(&self) -> BoundingBox {
        BoundingBox::of_polygons(&self.polygons)
    }

    /// Total number of rings, outer and hole.
    pub fn ring_count(&self) -> usize {
        self.polygons.iter().map(Vec::len).sum()
    }

    /// Number of hole rings.
    pub fn hole_count(&self) -> usize {
        self.polygons
            .iter()
            .map(|polygon| polygon.len().saturating_sub(1))
            .sum()
    }
}
